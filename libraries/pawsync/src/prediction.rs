use std::{cell::RefCell, rc::Rc};

use crate::data_model::PredictionCacheEntry;
use crate::listeners::{Listeners, Topic};
use crate::local_cache::{self, LocalCache, PREDICTION_KEY};

/// The last identification result, written through to a single local slot.
#[derive(Clone)]
pub struct PredictionCache {
    current: Rc<RefCell<Option<PredictionCacheEntry>>>,
    local: Rc<dyn LocalCache>,
    listeners: Listeners,
}

impl PredictionCache {
    /// Reads the slot left by a previous session.
    pub fn hydrate(local: Rc<dyn LocalCache>, listeners: Listeners) -> Self {
        let current = local_cache::read_json::<PredictionCacheEntry>(&*local, PREDICTION_KEY);
        if let Some(entry) = &current {
            log::info!("Restored last prediction: {}", entry.breed);
        }
        Self {
            current: Rc::new(RefCell::new(current)),
            local,
            listeners,
        }
    }

    pub fn current(&self) -> Option<PredictionCacheEntry> {
        self.current.borrow().clone()
    }

    pub fn set(&self, entry: Option<PredictionCacheEntry>) {
        match &entry {
            Some(entry) => {
                local_cache::write_json(&*self.local, PREDICTION_KEY, entry);
            }
            None => {
                local_cache::remove_logged(&*self.local, PREDICTION_KEY);
            }
        }
        *self.current.borrow_mut() = entry;
        self.listeners.notify(Topic::Prediction);
    }

    pub fn clear(&self) {
        self.set(None);
    }
}
