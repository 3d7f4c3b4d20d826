//! "Clear all data": remote pets, history and settings, then every local key we own.
//!
//! The local cache is only cleared when the remote phase either succeeded or was
//! declined. If the user asked for the cloud data to go and that failed, we stop
//! before touching anything local, so local never looks empty while remote still has data.

use std::rc::Rc;

use futures::FutureExt as _;
use futures::future::try_join_all;

use crate::api::{Api, SyncError};
use crate::collection::{HistorySync, PetsSync};
use crate::data_model::{HistoryItem, Pet};
use crate::local_cache::{self, LocalCache, NAMESPACE, PREDICTION_KEY, SETTINGS_KEY, THEME_KEY};
use crate::ports::{ConfirmationPort, Notice, Prompt};
use crate::prediction::PredictionCache;
use crate::settings::SettingsStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EraseOutcome {
    /// The user said no; nothing happened.
    Cancelled,
    /// Local data was cleared, cloud data was kept (declined, or not signed in).
    LocalOnly,
    Everything,
}

#[derive(Clone)]
pub struct BulkEraser {
    api: Api,
    local: Rc<dyn LocalCache>,
    confirm: Rc<dyn ConfirmationPort>,
    settings: SettingsStore,
    pets: PetsSync,
    history: HistorySync,
    prediction: PredictionCache,
}

impl BulkEraser {
    pub fn new(
        api: Api,
        local: Rc<dyn LocalCache>,
        confirm: Rc<dyn ConfirmationPort>,
        settings: SettingsStore,
        pets: PetsSync,
        history: HistorySync,
        prediction: PredictionCache,
    ) -> Self {
        Self {
            api,
            local,
            confirm,
            settings,
            pets,
            history,
            prediction,
        }
    }

    pub async fn erase_all(&self) -> Result<EraseOutcome, SyncError> {
        if !self.confirm.confirm(Prompt::ClearAllData).await {
            log::info!("Clear all data cancelled");
            return Ok(EraseOutcome::Cancelled);
        }

        let mut cloud = false;
        if self.api.is_signed_in() {
            if self.confirm.confirm(Prompt::DeleteCloudData).await {
                if let Err(e) = self.erase_cloud().await {
                    log::error!("Cloud erase failed, leaving local data alone: {e:?}");
                    self.confirm.notify(Notice::CloudError(e.to_string()));
                    return Err(e);
                }
                cloud = true;
            } else {
                log::info!("Keeping cloud data, clearing local data only");
            }
        }

        if self.erase_local(cloud) {
            self.confirm.notify(Notice::Erased { cloud });
        }

        Ok(if cloud {
            EraseOutcome::Everything
        } else {
            EraseOutcome::LocalOnly
        })
    }

    async fn erase_cloud(&self) -> Result<(), SyncError> {
        let (pets, history) =
            futures::try_join!(self.api.list::<Pet>(), self.api.list::<HistoryItem>())?;
        log::info!(
            "Deleting {} pets and {} history items",
            pets.len(),
            history.len()
        );

        let deletions = pets
            .iter()
            .map(|pet| self.api.delete::<Pet>(&pet.id).boxed_local())
            .chain(
                history
                    .iter()
                    .map(|item| self.api.delete::<HistoryItem>(&item.id).boxed_local()),
            );
        try_join_all(deletions).await?;

        self.api.reset_settings().await?;
        log::info!("Cloud data deleted");
        Ok(())
    }

    /// Returns whether every local key went. If one didn't, the in-memory settings
    /// and prediction are left alone so they still match what a reload would see.
    fn erase_local(&self, cloud: bool) -> bool {
        if cloud {
            self.pets.clear();
            self.history.clear();
        }

        let keys: Vec<String> = match self.local.keys() {
            Ok(keys) => keys
                .into_iter()
                .filter(|key| key.starts_with(NAMESPACE) && key != THEME_KEY)
                .collect(),
            Err(e) => {
                log::error!("Could not list local storage keys, removing the known ones: {e}");
                vec![SETTINGS_KEY.to_string(), PREDICTION_KEY.to_string()]
            }
        };
        let mut complete = true;
        for key in &keys {
            complete &= local_cache::remove_logged(&*self.local, key);
        }
        if !complete {
            log::error!("Local data was only partly cleared, keeping settings and prediction");
            return false;
        }

        self.settings.reset_to_defaults();
        self.prediction.clear();
        log::info!("Local data cleared");
        true
    }
}
