//! Journal notes, a sub-resource of each pet.
//!
//! A note lives in two places in memory: inside its pet in the flat list, and inside the
//! detail view's copy of that pet when it is the one open. Both are updated from the same
//! response in a single state transition, after the remote call has succeeded.

use crate::api::{Operation, SyncError};
use crate::collection::CollectionSync;
use crate::data_model::{Note, NoteCategory, Pet};

impl CollectionSync<Pet> {
    pub async fn add_note(
        &self,
        pet_id: &str,
        text: &str,
        category: NoteCategory,
    ) -> Result<Note, SyncError> {
        let result = self.api.add_note(pet_id, text, category).await;
        self.finish(Operation::AddNote, result, |state, note: Note| {
            for pet in state.items.iter_mut().filter(|pet| pet.id == pet_id) {
                pet.notes.push(note.clone());
            }
            if let Some(open) = state.open.as_mut().filter(|pet| pet.id == pet_id) {
                open.notes.push(note.clone());
            }
            note
        })
    }

    pub async fn delete_note(&self, pet_id: &str, note_id: &str) -> Result<(), SyncError> {
        let result = self.api.delete_note(pet_id, note_id).await;
        self.finish(Operation::DeleteNote, result, |state, ()| {
            for pet in state.items.iter_mut().filter(|pet| pet.id == pet_id) {
                pet.notes.retain(|note| note.id != note_id);
            }
            if let Some(open) = state.open.as_mut().filter(|pet| pet.id == pet_id) {
                open.notes.retain(|note| note.id != note_id);
            }
        })
    }
}
