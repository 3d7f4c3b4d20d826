//! Shared request plumbing: the remote transport boundary, token acquisition,
//! and the mapping from responses to [`SyncError`].

use std::{fmt, rc::Rc};

use futures::future::LocalBoxFuture;
use serde::de::DeserializeOwned;

use crate::collection::Resource;
use crate::data_model::{
    HistoryItem, Identification, ImageUpload, NewPet, Note, NoteCategory, Pet, Settings,
};
use crate::ports::{AuthError, AuthTokenProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    Json(serde_json::Value),
    Multipart(Vec<FormField>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub name: String,
    pub value: FormValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    Text(String),
    File(ImageUpload),
}

impl FormField {
    fn text(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            value: FormValue::Text(value.into()),
        }
    }
}

/// A request against the service. `path` is relative to the configured base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRequest {
    pub method: Method,
    pub path: String,
    pub bearer: Option<String>,
    pub body: Body,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteResponse {
    pub status: u16,
    pub body: String,
}

impl RemoteResponse {
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// No response at all (offline, DNS, CORS, ...).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

pub trait RemoteResourceClient {
    fn send(
        &self,
        request: RemoteRequest,
    ) -> LocalBoxFuture<'_, Result<RemoteResponse, TransportError>>;
}

/// What the user was trying to do; picks the message shown when the service gives us nothing better.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    LoadSettings,
    SaveSettings,
    ResetSettings,
    ListPets,
    AddPet,
    DeletePet,
    AddNote,
    DeleteNote,
    ListHistory,
    RecordHistory,
    DeleteHistory,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::LoadSettings => "Failed to load settings",
            Operation::SaveSettings => "Failed to save settings",
            Operation::ResetSettings => "Failed to reset settings",
            Operation::ListPets | Operation::ListHistory => "Failed to load data",
            Operation::AddPet => "Failed to add pet",
            Operation::DeletePet => "Failed to delete pet",
            Operation::AddNote => "Failed to add note",
            Operation::DeleteNote => "Failed to delete note",
            Operation::RecordHistory => "Failed to save history",
            Operation::DeleteHistory => "Failed to delete history",
        })
    }
}

/// The `Display` of every variant is the message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("Network error. Please check your connection and try again.")]
    Network(#[source] TransportError),

    #[error("{detail}")]
    Rejected { status: u16, detail: String },

    #[error("{operation}")]
    Failed { status: u16, operation: Operation },

    #[error("{operation}")]
    Decode { operation: Operation, message: String },

    #[error("Not signed in")]
    SignedOut,

    #[error("Network error. Please check your connection and try again.")]
    Auth(#[source] AuthError),
}

impl SyncError {
    /// Signed out is "remote unavailable", not something to show mid-flow.
    pub fn is_signed_out(&self) -> bool {
        matches!(self, SyncError::SignedOut)
    }
}

fn classify_failure(operation: Operation, response: &RemoteResponse) -> SyncError {
    let detail = serde_json::from_str::<serde_json::Value>(&response.body)
        .ok()
        .and_then(|body| body.get("detail")?.as_str().map(str::to_string));

    match detail {
        Some(detail) => SyncError::Rejected {
            status: response.status,
            detail,
        },
        None => SyncError::Failed {
            status: response.status,
            operation,
        },
    }
}

/// Typed access to the service's resource surface.
#[derive(Clone)]
pub struct Api {
    remote: Rc<dyn RemoteResourceClient>,
    auth: Rc<dyn AuthTokenProvider>,
}

impl Api {
    pub fn new(remote: Rc<dyn RemoteResourceClient>, auth: Rc<dyn AuthTokenProvider>) -> Self {
        Self { remote, auth }
    }

    pub fn is_signed_in(&self) -> bool {
        self.auth.is_signed_in()
    }

    async fn token(&self) -> Result<String, SyncError> {
        match self.auth.get_token().await {
            Ok(Some(token)) => Ok(token),
            Ok(None) => Err(SyncError::SignedOut),
            Err(e) => Err(SyncError::Auth(e)),
        }
    }

    /// Token first, then the request. A non-success status becomes an error.
    pub async fn send(
        &self,
        operation: Operation,
        method: Method,
        path: String,
        body: Body,
    ) -> Result<RemoteResponse, SyncError> {
        let token = self.token().await?;
        let request = RemoteRequest {
            method,
            path,
            bearer: Some(token),
            body,
        };

        let response = self
            .remote
            .send(request)
            .await
            .map_err(SyncError::Network)?;

        if !response.ok() {
            return Err(classify_failure(operation, &response));
        }
        Ok(response)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        operation: Operation,
        method: Method,
        path: String,
        body: Body,
    ) -> Result<T, SyncError> {
        let response = self.send(operation, method, path, body).await?;
        serde_json::from_str(&response.body).map_err(|e| SyncError::Decode {
            operation,
            message: format!("{e}: `{}`", response.body),
        })
    }

    pub async fn get_settings(&self) -> Result<Settings, SyncError> {
        self.fetch(
            Operation::LoadSettings,
            Method::Get,
            "/api/settings".to_string(),
            Body::Empty,
        )
        .await
    }

    pub async fn save_settings(&self, settings: &Settings) -> Result<(), SyncError> {
        let body = serde_json::to_value(settings).map_err(|e| SyncError::Decode {
            operation: Operation::SaveSettings,
            message: e.to_string(),
        })?;
        self.send(
            Operation::SaveSettings,
            Method::Post,
            "/api/settings".to_string(),
            Body::Json(body),
        )
        .await
        .map(drop)
    }

    pub async fn reset_settings(&self) -> Result<(), SyncError> {
        self.send(
            Operation::ResetSettings,
            Method::Delete,
            "/api/settings".to_string(),
            Body::Empty,
        )
        .await
        .map(drop)
    }

    pub async fn list<T: Resource>(&self) -> Result<Vec<T>, SyncError> {
        self.fetch(T::LIST, Method::Get, T::PATH.to_string(), Body::Empty)
            .await
    }

    pub async fn delete<T: Resource>(&self, id: &str) -> Result<(), SyncError> {
        self.send(
            T::DELETE,
            Method::Delete,
            format!("{}/{id}", T::PATH),
            Body::Empty,
        )
        .await
        .map(drop)
    }

    pub async fn create_pet(&self, pet: &NewPet) -> Result<Pet, SyncError> {
        let mut form = vec![
            FormField::text("name", &pet.name),
            FormField::text("breed", &pet.breed),
        ];
        if let Some(birthday) = &pet.birthday {
            form.push(FormField::text("birthday", birthday));
        }
        form.push(FormField {
            name: "image".to_string(),
            value: FormValue::File(pet.image.clone()),
        });

        self.fetch(
            Operation::AddPet,
            Method::Post,
            Pet::PATH.to_string(),
            Body::Multipart(form),
        )
        .await
    }

    pub async fn create_history(
        &self,
        identification: &Identification,
    ) -> Result<HistoryItem, SyncError> {
        let body = serde_json::to_value(identification).map_err(|e| SyncError::Decode {
            operation: Operation::RecordHistory,
            message: e.to_string(),
        })?;
        self.fetch(
            Operation::RecordHistory,
            Method::Post,
            HistoryItem::PATH.to_string(),
            Body::Json(body),
        )
        .await
    }

    pub async fn add_note(
        &self,
        pet_id: &str,
        text: &str,
        category: NoteCategory,
    ) -> Result<Note, SyncError> {
        let form = vec![
            FormField::text("text", text),
            FormField::text("category", category.as_str()),
        ];
        self.fetch(
            Operation::AddNote,
            Method::Post,
            format!("{}/{pet_id}/notes", Pet::PATH),
            Body::Multipart(form),
        )
        .await
    }

    pub async fn delete_note(&self, pet_id: &str, note_id: &str) -> Result<(), SyncError> {
        self.send(
            Operation::DeleteNote,
            Method::Delete,
            format!("{}/{pet_id}/notes/{note_id}", Pet::PATH),
            Body::Empty,
        )
        .await
        .map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{ScriptedRemote, StaticAuth};
    use futures::executor::block_on;
    use serde_json::json;

    fn api(remote: &Rc<ScriptedRemote>, token: Option<&str>) -> Api {
        Api::new(remote.clone(), Rc::new(StaticAuth::new(token)))
    }

    #[test]
    fn detail_is_surfaced_verbatim() {
        let remote = Rc::new(ScriptedRemote::new());
        remote.on(
            Method::Delete,
            "/api/pets/p1",
            404,
            json!({ "detail": "Pet not found" }),
        );

        let err = block_on(api(&remote, Some("t")).delete::<Pet>("p1")).unwrap_err();
        assert_eq!(
            err,
            SyncError::Rejected {
                status: 404,
                detail: "Pet not found".to_string()
            }
        );
        assert_eq!(err.to_string(), "Pet not found");
    }

    #[test]
    fn missing_detail_uses_the_operation_fallback() {
        let remote = Rc::new(ScriptedRemote::new());
        remote.on(Method::Post, "/api/pets/p1/notes", 500, json!("boom"));

        let err = block_on(api(&remote, Some("t")).add_note("p1", "hi", NoteCategory::Other))
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to add note");
    }

    #[test]
    fn transport_failure_is_a_network_error() {
        let remote = Rc::new(ScriptedRemote::new());
        remote.fail(Method::Get, "/api/history");

        let err = block_on(api(&remote, Some("t")).list::<HistoryItem>()).unwrap_err();
        assert!(matches!(err, SyncError::Network(_)));
        assert_eq!(
            err.to_string(),
            "Network error. Please check your connection and try again."
        );
    }

    #[test]
    fn no_token_means_no_request() {
        let remote = Rc::new(ScriptedRemote::new());
        let err = block_on(api(&remote, None).get_settings()).unwrap_err();
        assert!(err.is_signed_out());
        assert!(remote.requests().is_empty());
    }

    #[test]
    fn requests_carry_the_bearer_and_form() {
        let remote = Rc::new(ScriptedRemote::new());
        remote.on(
            Method::Post,
            "/api/pets/p1/notes",
            200,
            json!({ "id": "n1", "text": "Walked 5km", "category": "dailyLife", "date": "2025-10-05T08:00:00" }),
        );

        let note =
            block_on(api(&remote, Some("tok")).add_note("p1", "Walked 5km", NoteCategory::DailyLife))
                .unwrap();
        assert_eq!(note.category, NoteCategory::DailyLife);

        let requests = remote.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].bearer.as_deref(), Some("tok"));
        assert_eq!(
            requests[0].body,
            Body::Multipart(vec![
                FormField::text("text", "Walked 5km"),
                FormField::text("category", "dailyLife"),
            ])
        );
    }
}
