//! The app's side of the ports: auth session, i18n, dialogs, and the task executor.

use futures::FutureExt as _;
use futures::future::LocalBoxFuture;
use futures::task::{LocalFutureObj, LocalSpawn, SpawnError};
use pawsync::{AuthError, AuthTokenProvider, ConfirmationPort, LocaleSwitcher, Notice, Prompt};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

#[wasm_bindgen(typescript_custom_section)]
const HOST_TS: &'static str = r#"
export interface PawdentifyHost {
    isSignedIn(): boolean;
    getToken(): Promise<string | null> | string | null;
    switchLocale(language: string): void;
    confirm(prompt: "clearAllData" | "deleteCloudData"): Promise<boolean> | boolean;
    notify(notice: HostNotice): void;
}
"#;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(typescript_type = "PawdentifyHost")]
    pub type PawdentifyHost;

    #[wasm_bindgen(method, js_name = isSignedIn)]
    fn is_signed_in(this: &PawdentifyHost) -> bool;

    #[wasm_bindgen(method, catch, js_name = getToken)]
    fn get_token(this: &PawdentifyHost) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(method, js_name = switchLocale)]
    fn switch_locale(this: &PawdentifyHost, language: &str);

    #[wasm_bindgen(method, catch)]
    fn confirm(this: &PawdentifyHost, prompt: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(method)]
    fn notify(this: &PawdentifyHost, notice: JsValue);
}

#[derive(Clone, Debug, tsify::Tsify, serde::Serialize)]
#[tsify(into_wasm_abi)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum HostNotice {
    Erased { cloud: bool },
    CloudError { message: String },
}

impl From<Notice> for HostNotice {
    fn from(notice: Notice) -> Self {
        match notice {
            Notice::Erased { cloud } => HostNotice::Erased { cloud },
            Notice::CloudError(message) => HostNotice::CloudError { message },
        }
    }
}

fn prompt_name(prompt: Prompt) -> &'static str {
    match prompt {
        Prompt::ClearAllData => "clearAllData",
        Prompt::DeleteCloudData => "deleteCloudData",
    }
}

/// Waits for `value` if it is a promise; plain values come back as they are.
async fn settle(value: JsValue) -> Result<JsValue, JsValue> {
    JsFuture::from(js_sys::Promise::resolve(&value)).await
}

pub struct JsHost {
    host: PawdentifyHost,
}

impl JsHost {
    pub fn new(host: PawdentifyHost) -> Self {
        Self { host }
    }
}

impl AuthTokenProvider for JsHost {
    fn is_signed_in(&self) -> bool {
        self.host.is_signed_in()
    }

    fn get_token(&self) -> LocalBoxFuture<'_, Result<Option<String>, AuthError>> {
        async move {
            let token = settle(self.host.get_token().map_err(auth_error)?)
                .await
                .map_err(auth_error)?;
            Ok(token.as_string().filter(|token| !token.is_empty()))
        }
        .boxed_local()
    }
}

fn auth_error(e: JsValue) -> AuthError {
    AuthError(format!("{e:?}"))
}

impl LocaleSwitcher for JsHost {
    fn switch_locale(&self, language: &str) {
        log::info!("Switching locale to {language}");
        self.host.switch_locale(language);
    }

    fn detect_locale(&self) -> Option<String> {
        web_sys::window()?.navigator().language()
    }
}

impl ConfirmationPort for JsHost {
    fn confirm(&self, prompt: Prompt) -> LocalBoxFuture<'_, bool> {
        async move {
            let answer = match self.host.confirm(prompt_name(prompt)) {
                Ok(answer) => settle(answer).await,
                Err(e) => Err(e),
            };
            answer
                .inspect_err(|e| log::error!("Confirmation dialog failed, treating as no: {e:?}"))
                .map(|answer| answer.as_bool().unwrap_or(false))
                .unwrap_or(false)
        }
        .boxed_local()
    }

    fn notify(&self, notice: Notice) {
        match serde_wasm_bindgen::to_value(&HostNotice::from(notice)) {
            Ok(notice) => self.host.notify(notice),
            Err(e) => log::error!("Could not serialize notice: {e:?}"),
        }
    }
}

/// Runs detached tasks on the browser's microtask queue.
pub struct BrowserSpawner;

impl LocalSpawn for BrowserSpawner {
    fn spawn_local_obj(&self, future: LocalFutureObj<'static, ()>) -> Result<(), SpawnError> {
        wasm_bindgen_futures::spawn_local(future);
        Ok(())
    }
}
