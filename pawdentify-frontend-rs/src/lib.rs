mod js_ports;
mod storage;
mod transport;
mod utils;

use std::rc::Rc;
use std::sync::LazyLock;

use pawsync::{
    Api, BulkEraser, EraseOutcome, HistorySync, Identification, ImageUpload, ListenerKey,
    Listeners, LoadGate, LocalCache, MemoryCache, NewPet, NoteCategory, PetsSync,
    PredictionCache, PredictionCacheEntry, SaveOutcome, Settings, SettingsStore, SyncError,
    Topic,
};
use serde::Serialize;
use slotmap::{Key as _, KeyData};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

pub use js_ports::{HostNotice, PawdentifyHost};
pub use utils::ClientConfig;

use crate::js_ports::{BrowserSpawner, JsHost};
use crate::storage::WebStorage;
use crate::transport::FetchTransport;

// putting this inside LOGGER prevents us from accidentally initializing the logger more than once
#[allow(clippy::declare_interior_mutable_const)]
const LOGGER: LazyLock<()> = LazyLock::new(|| {
    utils::set_panic_hook();

    wasm_logger::init(wasm_logger::Config::default());
    log::info!("Logging initialized");
});

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {e:?}")))
}

fn from_js<T: serde::de::DeserializeOwned>(value: JsValue) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value)
        .map_err(|e| JsValue::from_str(&format!("Deserialization error: {e:?}")))
}

/// Being signed out means the cloud is out of reach, so the call quietly does
/// nothing. Any other failure becomes the message the UI should show.
fn settle<T>(result: Result<T, SyncError>) -> Result<Option<T>, String> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_signed_out() => {
            log::debug!("Skipped remote call, not signed in");
            Ok(None)
        }
        Err(e) => Err(e.to_string()),
    }
}

fn settle_for_js<T>(result: Result<T, SyncError>) -> Result<Option<T>, JsValue> {
    settle(result).map_err(|message| JsValue::from_str(&message))
}

fn parse_category(category: &str) -> Result<NoteCategory, String> {
    category
        .parse()
        .map_err(|e| format!("Deserialization error: {e}"))
}

fn parse_topic(topic: &str) -> Result<Topic, JsValue> {
    match topic {
        "settings" => Ok(Topic::Settings),
        "pets" => Ok(Topic::Pets),
        "history" => Ok(Topic::History),
        "prediction" => Ok(Topic::Prediction),
        other => Err(JsValue::from_str(&format!("Unknown topic: {other}"))),
    }
}

/// Everything the Pawdentify UI reads and writes, behind one handle.
/// Borrows of the stores are never held across an `.await`.
#[wasm_bindgen]
pub struct Pawdentify {
    settings: SettingsStore,
    pets: PetsSync,
    history: HistorySync,
    prediction: PredictionCache,
    eraser: BulkEraser,
    listeners: Listeners,
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
impl Pawdentify {
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen(constructor))]
    pub fn new(config: ClientConfig, host: PawdentifyHost) -> Self {
        // used to only initialize the logger once
        #[allow(clippy::borrow_interior_mutable_const)]
        *LOGGER;

        log::info!("Using API at {}", config.base_url());

        let host = Rc::new(JsHost::new(host));
        let local: Rc<dyn LocalCache> = match WebStorage::open() {
            Some(storage) => Rc::new(storage),
            None => {
                log::warn!("No localStorage, nothing will survive a reload");
                Rc::new(MemoryCache::new())
            }
        };
        let api = Api::new(Rc::new(FetchTransport::new(config.base_url())), host.clone());
        let listeners = Listeners::new();

        let settings = SettingsStore::new(
            api.clone(),
            local.clone(),
            host.clone(),
            Rc::new(BrowserSpawner),
            listeners.clone(),
        );
        let pets = PetsSync::new(api.clone(), listeners.clone());
        let history = HistorySync::new(api.clone(), listeners.clone());
        let prediction = PredictionCache::hydrate(local.clone(), listeners.clone());
        let eraser = BulkEraser::new(
            api,
            local,
            host,
            settings.clone(),
            pets.clone(),
            history.clone(),
            prediction.clone(),
        );

        Self {
            settings,
            pets,
            history,
            prediction,
            eraser,
            listeners,
        }
    }

    /// Calls `callback` whenever `topic` ("settings", "pets", "history", "prediction") changes.
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn subscribe(&self, topic: String, callback: js_sys::Function) -> Result<u64, JsValue> {
        let topic = parse_topic(&topic)?;
        let key = self.listeners.register(move |changed| {
            if changed == topic {
                let _ = callback.call0(&JsValue::null());
            }
        });
        Ok(key.data().as_ffi())
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn unsubscribe(&self, key: u64) {
        self.listeners
            .unregister(ListenerKey::from(KeyData::from_ffi(key)));
    }

    // Settings

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub async fn load_settings(&self) -> Result<JsValue, JsValue> {
        let settings = self.settings.load().await;
        to_js(&settings)
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn get_settings(&self) -> Result<JsValue, JsValue> {
        to_js(&self.settings.settings())
    }

    /// False until the first load has finished; saves are ignored until then.
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn settings_ready(&self) -> bool {
        self.settings.gate() == LoadGate::Ready
    }

    /// Returns as soon as the local write is done, with "suppressed" (not loaded yet),
    /// "localOnly" or "writeThrough". A remote write carries on in the background.
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn save_settings(&self, settings: JsValue) -> Result<String, JsValue> {
        let settings: Settings = from_js(settings)?;
        Ok(save_outcome_name(&self.settings.save(settings)).to_string())
    }

    /// Like `save_settings`, but resolves once the remote write has finished.
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub async fn save_settings_and_wait(&self, settings: JsValue) -> Result<(), JsValue> {
        let settings: Settings = from_js(settings)?;
        let Some(receipt) = self.settings.save(settings).into_receipt() else {
            return Ok(());
        };
        match receipt.await {
            Ok(result) => settle_for_js(result).map(|_| ()),
            Err(_) => Err(JsValue::from_str("Settings save was abandoned")),
        }
    }

    // Pets

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn get_pets(&self) -> Result<JsValue, JsValue> {
        to_js(&self.pets.items())
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn pets_error(&self) -> Option<String> {
        self.pets.error()
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn pets_loaded(&self) -> bool {
        self.pets.is_loaded()
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub async fn list_pets(&self) -> Result<(), JsValue> {
        settle_for_js(self.pets.list().await)?;
        Ok(())
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub async fn add_pet(
        &self,
        name: String,
        breed: String,
        birthday: Option<String>,
        image: web_sys::File,
    ) -> Result<JsValue, JsValue> {
        let buffer = JsFuture::from(image.array_buffer()).await?;
        let image = ImageUpload {
            file_name: image.name(),
            content_type: image.type_(),
            bytes: js_sys::Uint8Array::new(&buffer).to_vec(),
        };
        let result = self
            .pets
            .create(NewPet {
                name,
                breed,
                birthday: birthday.filter(|b| !b.is_empty()),
                image,
            })
            .await;
        match settle_for_js(result)? {
            Some(pet) => to_js(&pet),
            None => Ok(JsValue::NULL),
        }
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub async fn delete_pet(&self, pet_id: String) -> Result<(), JsValue> {
        settle_for_js(self.pets.remove(&pet_id).await)?;
        Ok(())
    }

    /// Opens the detail view on a listed pet. Returns false if it isn't in the list.
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn open_pet(&self, pet_id: String) -> bool {
        self.pets.open(&pet_id)
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn close_pet(&self) {
        self.pets.close()
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn get_open_pet(&self) -> Result<JsValue, JsValue> {
        to_js(&self.pets.open_item())
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub async fn add_note(
        &self,
        pet_id: String,
        text: String,
        category: String,
    ) -> Result<JsValue, JsValue> {
        let category = parse_category(&category).map_err(|e| JsValue::from_str(&e))?;
        let result = self.pets.add_note(&pet_id, &text, category).await;
        match settle_for_js(result)? {
            Some(note) => to_js(&note),
            None => Ok(JsValue::NULL),
        }
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub async fn delete_note(&self, pet_id: String, note_id: String) -> Result<(), JsValue> {
        settle_for_js(self.pets.delete_note(&pet_id, &note_id).await)?;
        Ok(())
    }

    // History

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn get_history(&self) -> Result<JsValue, JsValue> {
        to_js(&self.history.items())
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn history_error(&self) -> Option<String> {
        self.history.error()
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn history_loaded(&self) -> bool {
        self.history.is_loaded()
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub async fn list_history(&self) -> Result<(), JsValue> {
        settle_for_js(self.history.list().await)?;
        Ok(())
    }

    /// Saves an identification to the user's history, unless they turned history off.
    /// Resolves to the stored item, or `null` when nothing was stored.
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub async fn record_identification(
        &self,
        breed: String,
        confidence: String,
        image_url: String,
    ) -> Result<JsValue, JsValue> {
        let save_history = self.settings.settings().save_history;
        let result = self
            .history
            .record(
                Identification {
                    breed,
                    confidence,
                    image_url,
                },
                save_history,
            )
            .await;
        match settle_for_js(result)?.flatten() {
            Some(item) => to_js(&item),
            None => Ok(JsValue::NULL),
        }
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub async fn delete_history_item(&self, item_id: String) -> Result<(), JsValue> {
        settle_for_js(self.history.remove(&item_id).await)?;
        Ok(())
    }

    /// Loads pets and history together. Each list reports its own error.
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub async fn refresh_dashboard(&self) {
        let (pets, history) = pawsync::collection::refresh_dashboard(&self.pets, &self.history).await;
        if let Err(e) = pets.and(history) {
            log::debug!("Dashboard refresh incomplete: {e}");
        }
    }

    // Last prediction

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn get_prediction(&self) -> Result<JsValue, JsValue> {
        to_js(&self.prediction.current())
    }

    /// Pass `null` to forget the current prediction.
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub fn set_prediction(&self, entry: JsValue) -> Result<(), JsValue> {
        let entry: Option<PredictionCacheEntry> = from_js(entry)?;
        self.prediction.set(entry);
        Ok(())
    }

    // Clear all data

    /// Resolves to "cancelled", "localOnly" or "everything". Rejects with the
    /// message if deleting cloud data failed, in which case nothing local was removed.
    /// Losing the session halfway through counts as such a failure.
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
    pub async fn clear_all_data(&self) -> Result<String, JsValue> {
        let outcome = self
            .eraser
            .erase_all()
            .await
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(match outcome {
            EraseOutcome::Cancelled => "cancelled",
            EraseOutcome::LocalOnly => "localOnly",
            EraseOutcome::Everything => "everything",
        }
        .to_string())
    }
}

fn save_outcome_name(outcome: &SaveOutcome) -> &'static str {
    match outcome {
        SaveOutcome::Suppressed => "suppressed",
        SaveOutcome::LocalOnly => "localOnly",
        SaveOutcome::WriteThrough(_) => "writeThrough",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_out_calls_resolve_quietly() {
        assert_eq!(settle(Ok(5)), Ok(Some(5)));
        assert_eq!(settle::<()>(Err(SyncError::SignedOut)), Ok(None));
        assert_eq!(
            settle::<()>(Err(SyncError::Rejected {
                status: 404,
                detail: "Pet not found".to_string(),
            })),
            Err("Pet not found".to_string())
        );
    }

    #[test]
    fn unknown_note_categories_are_refused() {
        assert_eq!(parse_category("dailyLife"), Ok(NoteCategory::DailyLife));
        let refused = parse_category("Health").unwrap_err();
        assert!(refused.starts_with("Deserialization error"), "{refused}");
    }

    #[test]
    fn save_outcomes_have_names() {
        assert_eq!(save_outcome_name(&SaveOutcome::Suppressed), "suppressed");
        assert_eq!(save_outcome_name(&SaveOutcome::LocalOnly), "localOnly");
    }

    #[test]
    fn topics_by_name() {
        assert_eq!(parse_topic("pets").ok(), Some(Topic::Pets));
        assert_eq!(parse_topic("prediction").ok(), Some(Topic::Prediction));
    }

    #[test]
    fn listener_keys_survive_the_trip_through_js() {
        let listeners = Listeners::new();
        let key = listeners.register(|_| {});
        let round_tripped = ListenerKey::from(KeyData::from_ffi(key.data().as_ffi()));
        assert_eq!(round_tripped, key);
    }
}
