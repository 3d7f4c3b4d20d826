//! This is the state reconciliation layer of the Pawdentify client.
//! It was created for the Pawdentify web app, so it doesn't include much that was not needed for that project.
//!
//! Reconciliation strategy:
//! 1. Settings live in two places: the browser's local cache and the remote service. When the user is signed in the remote copy is the truth and the local copy is a backup; otherwise the local copy is all there is.
//! 2. Pets (with their notes) and identification history only exist remotely. We keep an in-memory mirror of the last successful read or write, and we only touch the mirror after the matching remote call has succeeded.
//! 3. The last identification result only exists locally, in a single cache slot.
//! 4. "Clear all data" deletes everything remotely (if the user agrees), then everything locally. If the remote part fails, nothing local is touched.
//!
//! Everything outside this crate (the HTTP transport, the auth provider, dialogs, the i18n runtime) is reached through the traits in [`ports`],
//! so the browser bindings live in the frontend crate and the tests here drive scripted versions of them.

pub mod api;
pub mod collection;
pub mod data_model;
pub mod eraser;
pub mod listeners;
pub mod local_cache;
pub mod notes;
pub mod ports;
pub mod prediction;
pub mod settings;

#[cfg(test)]
pub(crate) mod test_util;

pub use api::{Api, Operation, SyncError};
pub use collection::{CollectionSync, HistorySync, PetsSync, Resource};
pub use data_model::{
    HistoryItem, Identification, ImageQuality, ImageUpload, NewPet, Note, NoteCategory, Pet,
    PredictionCacheEntry, Settings, UnknownCategory,
};
pub use eraser::{BulkEraser, EraseOutcome};
pub use listeners::{ListenerKey, Listeners, Topic};
pub use local_cache::{LocalCache, LocalCacheError, MemoryCache};
pub use ports::{AuthError, AuthTokenProvider, ConfirmationPort, LocaleSwitcher, Notice, Prompt};
pub use prediction::PredictionCache;
pub use settings::{LoadGate, SaveOutcome, SettingsStore, WriteReceipt};
