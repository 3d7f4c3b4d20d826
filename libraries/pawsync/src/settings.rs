//! User preferences, reconciled between the local cache and `/api/settings`.
//!
//! `load` walks remote → local → defaults and stops at the first source that has a record.
//! `save` writes locally right away and, when signed in, pushes the record to the
//! service in a detached task whose result nobody has to wait for.

use std::{cell::RefCell, rc::Rc};

use futures::channel::oneshot;
use futures::task::{LocalSpawn, LocalSpawnExt as _};

use crate::api::{Api, SyncError};
use crate::data_model::Settings;
use crate::listeners::{Listeners, Topic};
use crate::local_cache::{self, LocalCache, SETTINGS_KEY};
use crate::ports::LocaleSwitcher;

/// Resolves when the background remote write finishes. Dropping it does not cancel the write.
pub type WriteReceipt = oneshot::Receiver<Result<(), SyncError>>;

/// What happened to a save.
#[derive(Debug)]
pub enum SaveOutcome {
    /// Dropped: the first load hasn't finished, so nothing was written anywhere.
    Suppressed,
    /// Written to the local cache only (signed out).
    LocalOnly,
    /// Written locally, and a remote write is running in the background.
    WriteThrough(WriteReceipt),
}

impl SaveOutcome {
    pub fn into_receipt(self) -> Option<WriteReceipt> {
        match self {
            SaveOutcome::WriteThrough(receipt) => Some(receipt),
            SaveOutcome::Suppressed | SaveOutcome::LocalOnly => None,
        }
    }
}

/// Saves are only accepted once the first load has picked a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadGate {
    Pending,
    Loading,
    Ready,
}

struct State {
    settings: Settings,
    gate: LoadGate,
    /// The language the locale switcher was last told about.
    applied_language: Option<String>,
}

#[derive(Clone)]
pub struct SettingsStore {
    state: Rc<RefCell<State>>,
    api: Api,
    local: Rc<dyn LocalCache>,
    locale: Rc<dyn LocaleSwitcher>,
    spawner: Rc<dyn LocalSpawn>,
    listeners: Listeners,
}

impl SettingsStore {
    pub fn new(
        api: Api,
        local: Rc<dyn LocalCache>,
        locale: Rc<dyn LocaleSwitcher>,
        spawner: Rc<dyn LocalSpawn>,
        listeners: Listeners,
    ) -> Self {
        Self {
            state: Rc::new(RefCell::new(State {
                settings: Settings::default(),
                gate: LoadGate::Pending,
                applied_language: None,
            })),
            api,
            local,
            locale,
            spawner,
            listeners,
        }
    }

    pub fn settings(&self) -> Settings {
        self.state.borrow().settings.clone()
    }

    pub fn gate(&self) -> LoadGate {
        self.state.borrow().gate
    }

    pub async fn load(&self) -> Settings {
        self.state.borrow_mut().gate = LoadGate::Loading;

        let (settings, source) = self.resolve().await;
        log::info!("Settings loaded from {source}");

        self.apply(settings.clone(), Some(LoadGate::Ready));
        settings
    }

    async fn resolve(&self) -> (Settings, &'static str) {
        if self.api.is_signed_in() {
            match self.api.get_settings().await {
                Ok(settings) => {
                    // remote is the truth; the local copy becomes its backup
                    local_cache::write_json(&*self.local, SETTINGS_KEY, &settings);
                    return (settings, "the remote service");
                }
                Err(e) => log::warn!("Could not fetch remote settings, falling back: {e:?}"),
            }
        }

        if let Some(settings) = local_cache::read_json::<Settings>(&*self.local, SETTINGS_KEY) {
            return (settings, "local storage");
        }

        let detected = self.locale.detect_locale();
        (
            Settings::defaults_for_locale(detected.as_deref()),
            "defaults",
        )
    }

    /// Local write first, then (if signed in) a fire-and-forget remote write.
    /// The record is normalised the same way a loaded one is.
    pub fn save(&self, settings: Settings) -> SaveOutcome {
        let gate = self.gate();
        if gate != LoadGate::Ready {
            log::debug!("Ignoring settings save while the store is {gate:?}");
            return SaveOutcome::Suppressed;
        }

        let settings = settings.normalised();
        local_cache::write_json(&*self.local, SETTINGS_KEY, &settings);
        self.apply(settings.clone(), None);

        if !self.api.is_signed_in() {
            return SaveOutcome::LocalOnly;
        }
        SaveOutcome::WriteThrough(self.spawn_remote_write(settings))
    }

    /// Field-by-field edits from the UI.
    pub fn update(&self, edit: impl FnOnce(&mut Settings)) -> SaveOutcome {
        let mut settings = self.settings();
        edit(&mut settings);
        self.save(settings)
    }

    /// In-memory only. Used after "clear all data" has emptied the cache.
    pub fn reset_to_defaults(&self) {
        self.apply(Settings::default(), None);
    }

    fn spawn_remote_write(&self, settings: Settings) -> WriteReceipt {
        let (done, receipt) = oneshot::channel();
        let api = self.api.clone();

        let task = async move {
            let result = api.save_settings(&settings).await;
            match &result {
                Ok(()) => log::info!("Settings saved remotely"),
                Err(e) if e.is_signed_out() => {
                    log::debug!("Skipped remote settings save, no session")
                }
                Err(e) => log::warn!("Remote settings save failed: {e:?}"),
            }
            // the receipt may already be gone
            let _ = done.send(result);
        };

        if let Err(e) = self.spawner.spawn_local(task) {
            log::error!("Could not schedule the remote settings save: {e:?}");
        }
        receipt
    }

    /// Replaces the in-memory record and runs the language watch.
    fn apply(&self, settings: Settings, gate: Option<LoadGate>) {
        let switch_to = {
            let mut state = self.state.borrow_mut();
            if let Some(gate) = gate {
                state.gate = gate;
            }
            let changed = state.applied_language.as_deref() != Some(settings.language.as_str());
            if changed {
                state.applied_language = Some(settings.language.clone());
            }
            state.settings = settings;
            changed.then(|| state.settings.language.clone())
        };

        if let Some(language) = switch_to {
            self.locale.switch_locale(&language);
        }
        self.listeners.notify(Topic::Settings);
    }
}
