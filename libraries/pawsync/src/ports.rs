//! Capabilities the stores need from the outside world.
//! In the browser these are backed by the auth SDK, i18n and dialogs; in tests they are scripted.

use futures::future::LocalBoxFuture;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("could not get an access token: {0}")]
pub struct AuthError(pub String);

pub trait AuthTokenProvider {
    fn is_signed_in(&self) -> bool;

    /// `Ok(None)` means there is no session, which callers treat as "remote unavailable".
    fn get_token(&self) -> LocalBoxFuture<'_, Result<Option<String>, AuthError>>;
}

/// Switches the UI language. Must not write anything anywhere.
pub trait LocaleSwitcher {
    fn switch_locale(&self, language: &str);

    /// The environment's preferred locale tag, if known (e.g. `navigator.language`).
    fn detect_locale(&self) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    ClearAllData,
    DeleteCloudData,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Erased { cloud: bool },
    CloudError(String),
}

/// Blocking yes/no dialogs and alerts.
pub trait ConfirmationPort {
    fn confirm(&self, prompt: Prompt) -> LocalBoxFuture<'_, bool>;
    fn notify(&self, notice: Notice);
}
