//! Scripted stand-ins for the browser, shared by the unit tests.

use std::{cell::RefCell, collections::VecDeque, future::Future, rc::Rc};

use futures::FutureExt as _;
use futures::channel::oneshot;
use futures::executor::LocalPool;
use futures::future::LocalBoxFuture;
use serde_json::{Value, json};

use crate::api::{Api, Method, RemoteRequest, RemoteResourceClient, RemoteResponse, TransportError};
use crate::collection::{HistorySync, PetsSync};
use crate::eraser::BulkEraser;
use crate::listeners::Listeners;
use crate::local_cache::MemoryCache;
use crate::ports::{AuthError, AuthTokenProvider, ConfirmationPort, LocaleSwitcher, Notice, Prompt};
use crate::prediction::PredictionCache;
use crate::settings::SettingsStore;

pub fn respond(status: u16, body: Value) -> RemoteResponse {
    RemoteResponse {
        status,
        body: body.to_string(),
    }
}

pub fn pet_json(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "breed": "Labrador Retriever",
        "birthday": "2020-06-15",
        "image": format!("https://res.cloudinary.com/demo/{id}.jpg"),
        "addedOn": "2025-09-30",
        "notes": [],
    })
}

pub fn history_json(id: &str, breed: &str) -> Value {
    json!({
        "id": id,
        "breed": breed,
        "confidence": "92.4",
        "image": format!("https://res.cloudinary.com/demo/{id}.jpg"),
        "searchedOn": "2025-10-01",
    })
}

pub fn note_json(id: &str, text: &str, category: &str) -> Value {
    json!({
        "id": id,
        "text": text,
        "category": category,
        "date": "2025-10-03T09:15:00.123456",
    })
}

enum Script {
    Respond(RemoteResponse),
    Fail,
    Hold(oneshot::Receiver<RemoteResponse>),
}

struct Route {
    method: Method,
    path: String,
    script: Script,
}

/// Answers requests from a list of routes. Later routes shadow earlier ones;
/// held routes answer a single request and then get out of the way.
#[derive(Default)]
pub struct ScriptedRemote {
    routes: RefCell<Vec<Route>>,
    requests: RefCell<Vec<RemoteRequest>>,
}

impl ScriptedRemote {
    pub fn new() -> Self {
        Self::default()
    }

    fn route(&self, method: Method, path: &str, script: Script) {
        self.routes.borrow_mut().push(Route {
            method,
            path: path.to_string(),
            script,
        });
    }

    pub fn on(&self, method: Method, path: &str, status: u16, body: Value) {
        self.route(method, path, Script::Respond(respond(status, body)));
    }

    /// The request never gets a response.
    pub fn fail(&self, method: Method, path: &str) {
        self.route(method, path, Script::Fail);
    }

    /// The next matching request waits until the returned sender is used.
    pub fn hold(&self, method: Method, path: &str) -> oneshot::Sender<RemoteResponse> {
        let (release, held) = oneshot::channel();
        self.route(method, path, Script::Hold(held));
        release
    }

    pub fn requests(&self) -> Vec<RemoteRequest> {
        self.requests.borrow().clone()
    }

    pub fn count(&self, method: Method) -> usize {
        self.requests
            .borrow()
            .iter()
            .filter(|request| request.method == method)
            .count()
    }
}

impl RemoteResourceClient for ScriptedRemote {
    fn send(
        &self,
        request: RemoteRequest,
    ) -> LocalBoxFuture<'_, Result<RemoteResponse, TransportError>> {
        let script = {
            let mut routes = self.routes.borrow_mut();
            let found = routes
                .iter()
                .rposition(|route| route.method == request.method && route.path == request.path);
            match found {
                None => Script::Respond(respond(404, json!({ "detail": "Not Found" }))),
                Some(i) if matches!(routes[i].script, Script::Hold(_)) => routes.remove(i).script,
                Some(i) => match &routes[i].script {
                    Script::Respond(response) => Script::Respond(response.clone()),
                    _ => Script::Fail,
                },
            }
        };
        self.requests.borrow_mut().push(request);

        async move {
            match script {
                Script::Respond(response) => Ok(response),
                Script::Fail => Err(TransportError("Failed to fetch".to_string())),
                Script::Hold(held) => held
                    .await
                    .map_err(|_| TransportError("request abandoned".to_string())),
            }
        }
        .boxed_local()
    }
}

pub struct StaticAuth {
    token: Option<String>,
}

impl StaticAuth {
    pub fn new(token: Option<&str>) -> Self {
        Self {
            token: token.map(str::to_string),
        }
    }
}

impl AuthTokenProvider for StaticAuth {
    fn is_signed_in(&self) -> bool {
        self.token.is_some()
    }

    fn get_token(&self) -> LocalBoxFuture<'_, Result<Option<String>, AuthError>> {
        let token = self.token.clone();
        async move { Ok(token) }.boxed_local()
    }
}

#[derive(Default)]
pub struct RecordingLocale {
    detected: Option<String>,
    switched: RefCell<Vec<String>>,
}

impl RecordingLocale {
    pub fn switched(&self) -> Vec<String> {
        self.switched.borrow().clone()
    }
}

impl LocaleSwitcher for RecordingLocale {
    fn switch_locale(&self, language: &str) {
        self.switched.borrow_mut().push(language.to_string());
    }

    fn detect_locale(&self) -> Option<String> {
        self.detected.clone()
    }
}

/// Answers prompts from a queue; an empty queue answers "no".
#[derive(Default)]
pub struct ScriptedConfirm {
    answers: RefCell<VecDeque<bool>>,
    asked: RefCell<Vec<Prompt>>,
    notices: RefCell<Vec<Notice>>,
}

impl ScriptedConfirm {
    pub fn answer(&self, answers: impl IntoIterator<Item = bool>) {
        self.answers.borrow_mut().extend(answers);
    }

    pub fn asked(&self) -> Vec<Prompt> {
        self.asked.borrow().clone()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.borrow().clone()
    }
}

impl ConfirmationPort for ScriptedConfirm {
    fn confirm(&self, prompt: Prompt) -> LocalBoxFuture<'_, bool> {
        self.asked.borrow_mut().push(prompt);
        let answer = self.answers.borrow_mut().pop_front().unwrap_or(false);
        async move { answer }.boxed_local()
    }

    fn notify(&self, notice: Notice) {
        self.notices.borrow_mut().push(notice);
    }
}

/// Every store wired to the same harness, the way the frontend wires them.
pub struct App {
    pub settings: SettingsStore,
    pub pets: PetsSync,
    pub history: HistorySync,
    pub prediction: PredictionCache,
    pub eraser: BulkEraser,
}

pub struct Harness {
    pub pool: LocalPool,
    pub remote: Rc<ScriptedRemote>,
    pub auth: Rc<StaticAuth>,
    pub local: Rc<MemoryCache>,
    pub locale: Rc<RecordingLocale>,
    pub confirm: Rc<ScriptedConfirm>,
    pub listeners: Listeners,
}

impl Harness {
    fn with_token(token: Option<&str>) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        Self {
            pool: LocalPool::new(),
            remote: Rc::new(ScriptedRemote::new()),
            auth: Rc::new(StaticAuth::new(token)),
            local: Rc::new(MemoryCache::new()),
            locale: Rc::new(RecordingLocale::default()),
            confirm: Rc::new(ScriptedConfirm::default()),
            listeners: Listeners::new(),
        }
    }

    pub fn signed_in() -> Self {
        Self::with_token(Some("test-token"))
    }

    pub fn signed_out() -> Self {
        Self::with_token(None)
    }

    pub fn with_detected_locale(mut self, locale: &str) -> Self {
        self.locale = Rc::new(RecordingLocale {
            detected: Some(locale.to_string()),
            ..RecordingLocale::default()
        });
        self
    }

    pub fn api(&self) -> Api {
        Api::new(self.remote.clone(), self.auth.clone())
    }

    pub fn settings_store(&self) -> SettingsStore {
        SettingsStore::new(
            self.api(),
            self.local.clone(),
            self.locale.clone(),
            Rc::new(self.pool.spawner()),
            self.listeners.clone(),
        )
    }

    pub fn pets(&self) -> PetsSync {
        PetsSync::new(self.api(), self.listeners.clone())
    }

    pub fn history(&self) -> HistorySync {
        HistorySync::new(self.api(), self.listeners.clone())
    }

    pub fn prediction(&self) -> PredictionCache {
        PredictionCache::hydrate(self.local.clone(), self.listeners.clone())
    }

    pub fn app(&self) -> App {
        let settings = self.settings_store();
        let pets = self.pets();
        let history = self.history();
        let prediction = self.prediction();
        let eraser = BulkEraser::new(
            self.api(),
            self.local.clone(),
            self.confirm.clone(),
            settings.clone(),
            pets.clone(),
            history.clone(),
            prediction.clone(),
        );
        App {
            settings,
            pets,
            history,
            prediction,
            eraser,
        }
    }

    /// Drives `future` and everything it spawned until it completes.
    pub fn run<F: Future>(&mut self, future: F) -> F::Output {
        self.pool.run_until(future)
    }
}
