//! Remote-authoritative lists (pets, identification history) mirrored in memory.
//!
//! The mirror is only touched after the matching remote call has succeeded, so a failed
//! call leaves it exactly as it was. There is no local persistence and no optimistic
//! update. Independent calls apply their effects in the order the network completes them.

use std::{cell::RefCell, rc::Rc};

use im::Vector;
use serde::de::DeserializeOwned;

use crate::api::{Api, Operation, SyncError};
use crate::data_model::{HistoryItem, Identification, NewPet, Pet};
use crate::listeners::{Listeners, Topic};

pub trait Resource: Clone + DeserializeOwned + 'static {
    const PATH: &'static str;
    const LIST: Operation;
    const DELETE: Operation;
    const TOPIC: Topic;

    fn id(&self) -> &str;
}

impl Resource for Pet {
    const PATH: &'static str = "/api/pets";
    const LIST: Operation = Operation::ListPets;
    const DELETE: Operation = Operation::DeletePet;
    const TOPIC: Topic = Topic::Pets;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Resource for HistoryItem {
    const PATH: &'static str = "/api/history";
    const LIST: Operation = Operation::ListHistory;
    const DELETE: Operation = Operation::DeleteHistory;
    const TOPIC: Topic = Topic::History;

    fn id(&self) -> &str {
        &self.id
    }
}

pub(crate) struct CollectionState<T: Clone> {
    pub(crate) items: Vector<T>,
    /// A copy of one item, shown in a detail view.
    pub(crate) open: Option<T>,
    pub(crate) error: Option<String>,
    pub(crate) loaded: bool,
}

#[derive(Clone)]
pub struct CollectionSync<T: Resource> {
    pub(crate) state: Rc<RefCell<CollectionState<T>>>,
    pub(crate) api: Api,
    listeners: Listeners,
}

pub type PetsSync = CollectionSync<Pet>;
pub type HistorySync = CollectionSync<HistoryItem>;

impl<T: Resource> CollectionSync<T> {
    pub fn new(api: Api, listeners: Listeners) -> Self {
        Self {
            state: Rc::new(RefCell::new(CollectionState {
                items: Vector::new(),
                open: None,
                error: None,
                loaded: false,
            })),
            api,
            listeners,
        }
    }

    pub fn items(&self) -> Vector<T> {
        self.state.borrow().items.clone()
    }

    /// The message of the last failed operation, cleared by the next success.
    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.state.borrow().loaded
    }

    pub fn open_item(&self) -> Option<T> {
        self.state.borrow().open.clone()
    }

    /// Shows a copy of the listed item with this id in the detail view.
    pub fn open(&self, id: &str) -> bool {
        let found = {
            let mut state = self.state.borrow_mut();
            let item = state.items.iter().find(|item| item.id() == id).cloned();
            let found = item.is_some();
            state.open = item;
            found
        };
        self.listeners.notify(T::TOPIC);
        found
    }

    pub fn close(&self) {
        self.state.borrow_mut().open = None;
        self.listeners.notify(T::TOPIC);
    }

    pub async fn list(&self) -> Result<(), SyncError> {
        let result = self.api.list::<T>().await;
        self.finish(T::LIST, result, |state, items| {
            state.items = items.into_iter().collect();
            state.loaded = true;
        })
    }

    pub async fn remove(&self, id: &str) -> Result<(), SyncError> {
        let result = self.api.delete::<T>(id).await;
        self.finish(T::DELETE, result, |state, ()| {
            state.items.retain(|item| item.id() != id);
            if state.open.as_ref().is_some_and(|open| open.id() == id) {
                state.open = None;
            }
        })
    }

    /// Empties the mirror. Used once the remote collection is known to be gone.
    pub(crate) fn clear(&self) {
        {
            let mut state = self.state.borrow_mut();
            state.items = Vector::new();
            state.open = None;
            state.error = None;
        }
        self.listeners.notify(T::TOPIC);
    }

    /// Applies a finished remote call to the mirror in one step, or records its error.
    /// Signed-out calls are "remote unavailable" and leave no error behind.
    pub(crate) fn finish<R, O>(
        &self,
        operation: Operation,
        result: Result<R, SyncError>,
        apply: impl FnOnce(&mut CollectionState<T>, R) -> O,
    ) -> Result<O, SyncError> {
        match result {
            Ok(value) => {
                let output = {
                    let mut state = self.state.borrow_mut();
                    state.error = None;
                    apply(&mut state, value)
                };
                self.listeners.notify(T::TOPIC);
                Ok(output)
            }
            Err(e) if e.is_signed_out() => {
                log::debug!("{operation:?} skipped, no session");
                Err(e)
            }
            Err(e) => {
                log::error!("{operation:?} failed: {e:?}");
                self.state.borrow_mut().error = Some(e.to_string());
                self.listeners.notify(T::TOPIC);
                Err(e)
            }
        }
    }
}

impl CollectionSync<Pet> {
    /// Appends the server's record once the upload has gone through.
    pub async fn create(&self, pet: NewPet) -> Result<Pet, SyncError> {
        let result = self.api.create_pet(&pet).await;
        self.finish(Operation::AddPet, result, |state, created: Pet| {
            state.items.push_back(created.clone());
            created
        })
    }
}

impl CollectionSync<HistoryItem> {
    /// Stores an identification in the user's history, if they asked us to keep one.
    /// The new item goes first, matching the service's newest-first order.
    pub async fn record(
        &self,
        identification: Identification,
        save_history: bool,
    ) -> Result<Option<HistoryItem>, SyncError> {
        if !save_history {
            log::debug!("History is turned off, not recording {}", identification.breed);
            return Ok(None);
        }
        let result = self.api.create_history(&identification).await;
        self.finish(Operation::RecordHistory, result, |state, item: HistoryItem| {
            state.items.push_front(item.clone());
            Some(item)
        })
    }
}

/// Loads both dashboard lists at once. Each list applies its own result independently.
pub async fn refresh_dashboard(
    pets: &PetsSync,
    history: &HistorySync,
) -> (Result<(), SyncError>, Result<(), SyncError>) {
    futures::join!(pets.list(), history.list())
}
