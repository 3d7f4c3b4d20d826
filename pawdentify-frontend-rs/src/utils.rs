pub fn set_panic_hook() {
    // When the `console_error_panic_hook` feature is enabled, we can call the
    // `set_panic_hook` function at least once during initialization, and then
    // we will get better error messages if our code ever panics.
    //
    // For more details see
    // https://github.com/rustwasm/console_error_panic_hook#readme
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Baked in at build time from `PAWDENTIFY_API_URL`, for builds that don't pass a config.
pub fn default_api_url() -> String {
    option_env!("PAWDENTIFY_API_URL")
        .unwrap_or("http://localhost:8000")
        .to_string()
}

#[derive(Clone, Debug, PartialEq, Eq, tsify::Tsify, serde::Serialize, serde::Deserialize)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Base URL of the Pawdentify API, without a trailing slash.
    #[serde(default = "default_api_url")]
    #[tsify(optional)]
    pub api_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
        }
    }
}

impl ClientConfig {
    pub(crate) fn base_url(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }
}
