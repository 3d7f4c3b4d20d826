use futures::FutureExt as _;
use futures::future::LocalBoxFuture;
use pawsync::api::{
    Body, FormField, FormValue, Method, RemoteRequest, RemoteResourceClient, RemoteResponse,
    TransportError,
};
use wasm_bindgen::{JsCast as _, JsValue};
use wasm_bindgen_futures::JsFuture;

#[derive(Debug, thiserror::Error)]
enum FetchError {
    #[error("request failed: {0:?}")]
    Fetch(fetch_happen::Error),

    #[error("browser fetch failed: {0:?}")]
    Browser(JsValue),

    #[error("no window to fetch from")]
    NoWindow,
}

impl From<JsValue> for FetchError {
    fn from(e: JsValue) -> Self {
        FetchError::Browser(e)
    }
}

/// Talks to the Pawdentify API. JSON and empty bodies go through `fetch_happen`;
/// uploads need a real `FormData`, so they go straight to `window.fetch`.
pub struct FetchTransport {
    base_url: String,
}

impl FetchTransport {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
        }
    }

    async fn fetch(&self, request: RemoteRequest) -> Result<RemoteResponse, FetchError> {
        let url = format!("{}{}", self.base_url, request.path);
        match request.body {
            Body::Multipart(fields) => {
                post_form(&url, request.bearer.as_deref(), &fields).await
            }
            Body::Empty | Body::Json(_) => self.fetch_json(&url, &request).await,
        }
    }

    async fn fetch_json(
        &self,
        url: &str,
        request: &RemoteRequest,
    ) -> Result<RemoteResponse, FetchError> {
        let client = fetch_happen::Client;
        let mut builder = match request.method {
            Method::Get => client.get(url),
            Method::Post => client.post(url),
            Method::Delete => client.delete(url),
        };
        if let Some(token) = &request.bearer {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        if let Body::Json(json) = &request.body {
            builder = builder.json(json).map_err(FetchError::Fetch)?;
        }

        let response = builder.send().await.map_err(FetchError::Fetch)?;
        let status: u16 = response.status().into();
        let body = response.text().await.map_err(FetchError::Fetch)?;
        Ok(RemoteResponse { status, body })
    }
}

async fn post_form(
    url: &str,
    bearer: Option<&str>,
    fields: &[FormField],
) -> Result<RemoteResponse, FetchError> {
    let form = web_sys::FormData::new()?;
    for field in fields {
        match &field.value {
            FormValue::Text(text) => form.append_with_str(&field.name, text)?,
            FormValue::File(upload) => {
                let bytes = js_sys::Uint8Array::from(upload.bytes.as_slice());
                let options = web_sys::BlobPropertyBag::new();
                options.set_type(&upload.content_type);
                let blob = web_sys::Blob::new_with_u8_array_sequence_and_options(
                    &js_sys::Array::of1(&bytes),
                    &options,
                )?;
                form.append_with_blob_and_filename(&field.name, &blob, &upload.file_name)?;
            }
        }
    }

    let headers = web_sys::Headers::new()?;
    if let Some(token) = bearer {
        headers.set("Authorization", &format!("Bearer {token}"))?;
    }
    let init = web_sys::RequestInit::new();
    init.set_method("POST");
    init.set_headers(&headers);
    init.set_body(&form);
    let request = web_sys::Request::new_with_str_and_init(url, &init)?;

    let window = web_sys::window().ok_or(FetchError::NoWindow)?;
    let response: web_sys::Response = JsFuture::from(window.fetch_with_request(&request))
        .await?
        .dyn_into()?;
    let status = response.status();
    let body = JsFuture::from(response.text()?)
        .await?
        .as_string()
        .unwrap_or_default();
    Ok(RemoteResponse { status, body })
}

impl RemoteResourceClient for FetchTransport {
    fn send(
        &self,
        request: RemoteRequest,
    ) -> LocalBoxFuture<'_, Result<RemoteResponse, TransportError>> {
        async move {
            let method = request.method;
            let path = request.path.clone();
            self.fetch(request).await.map_err(|e| {
                log::error!("{method:?} {path}: {e}");
                TransportError(e.to_string())
            })
        }
        .boxed_local()
    }
}
