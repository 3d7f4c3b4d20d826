use pawsync::{LocalCache, LocalCacheError};
use wasm_bindgen::JsValue;

/// `window.localStorage`.
pub struct WebStorage {
    storage: web_sys::Storage,
}

impl WebStorage {
    /// `None` when there is no window or storage is disabled (private mode, sandboxed iframe).
    pub fn open() -> Option<Self> {
        let storage = web_sys::window()?
            .local_storage()
            .inspect_err(|e| log::warn!("localStorage is not accessible: {e:?}"))
            .ok()
            .flatten()?;
        Some(Self { storage })
    }
}

fn backend(e: JsValue) -> LocalCacheError {
    LocalCacheError::Backend(format!("{e:?}"))
}

impl LocalCache for WebStorage {
    fn get(&self, key: &str) -> Result<Option<String>, LocalCacheError> {
        self.storage.get_item(key).map_err(backend)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), LocalCacheError> {
        self.storage.set_item(key, value).map_err(backend)
    }

    fn remove(&self, key: &str) -> Result<(), LocalCacheError> {
        self.storage.remove_item(key).map_err(backend)
    }

    fn keys(&self) -> Result<Vec<String>, LocalCacheError> {
        let len = self.storage.length().map_err(backend)?;
        let mut keys = Vec::with_capacity(len as usize);
        for i in 0..len {
            if let Some(key) = self.storage.key(i).map_err(backend)? {
                keys.push(key);
            }
        }
        Ok(keys)
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn reads_back_what_it_wrote() {
        let storage = WebStorage::open().unwrap();
        storage.set("pawdentify-test", "1").unwrap();

        assert_eq!(storage.get("pawdentify-test").unwrap().as_deref(), Some("1"));
        assert!(storage.keys().unwrap().contains(&"pawdentify-test".to_string()));

        storage.remove("pawdentify-test").unwrap();
        assert_eq!(storage.get("pawdentify-test").unwrap(), None);
    }
}
