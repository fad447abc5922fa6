//! Client for a hosted inference service.
//!
//! Speaks the Hugging Face Inference API shape: every model is reachable at
//! `{base_url}/models/{model_id}` and accepts either a JSON body or raw file
//! bytes.

use modelrun_abstraction::RunnerError;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error};

/// Default inference service.
pub const DEFAULT_BASE_URL: &str = "https://api-inference.huggingface.co";

/// Header form of `options.wait_for_model`, for bodies that are not JSON.
const WAIT_FOR_MODEL_HEADER: &str = "x-wait-for-model";

/// Connection settings for the inference service.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubSettings {
    /// Service root, without the `/models` suffix.
    pub base_url: String,

    /// Bearer token sent with every request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self { base_url: DEFAULT_BASE_URL.to_string(), api_token: None, timeout_secs: 120 }
    }
}

impl HubSettings {
    /// Settings pointing at `base_url` without authentication.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), ..Self::default() }
    }

    /// Returns the endpoint URL for `model_id`.
    pub fn model_url(&self, model_id: &str) -> String {
        format!("{}/models/{}", self.base_url.trim_end_matches('/'), model_id)
    }
}

impl fmt::Debug for HubSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HubSettings")
            .field("base_url", &self.base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// A loaded model handle: an HTTP client bound to one model's endpoint.
#[derive(Debug, Clone)]
pub struct Endpoint {
    model_id: String,
    url: String,
    client: Client,
}

#[derive(Serialize)]
struct Options {
    wait_for_model: bool,
}

#[derive(Serialize)]
struct JsonRequest<'a, P: Serialize> {
    inputs: &'a str,
    parameters: P,
    options: Options,
}

#[derive(Deserialize)]
struct ServiceError {
    error: String,
}

impl Endpoint {
    /// Builds the HTTP client for `model_id`.
    ///
    /// No request is made; connection problems surface on the first call.
    pub fn connect(settings: &HubSettings, model_id: &str) -> Result<Self, RunnerError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &settings.api_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| RunnerError::RequestError(format!("Invalid API token: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| RunnerError::RequestError(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { model_id: model_id.to_string(), url: settings.model_url(model_id), client })
    }

    /// The model's endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Sends `inputs` plus `parameters` as JSON and decodes a JSON reply.
    pub fn infer_json<P, T>(&self, inputs: &str, parameters: P) -> Result<T, RunnerError>
    where
        P: Serialize,
        T: DeserializeOwned,
    {
        let request = self.client.post(&self.url).json(&Self::body(inputs, parameters));
        let response = self.send(request)?;
        Self::decode(response)
    }

    /// Sends raw file bytes and decodes a JSON reply.
    ///
    /// Waits for a cold model like the JSON calls do.
    pub fn infer_bytes<T: DeserializeOwned>(&self, bytes: Vec<u8>) -> Result<T, RunnerError> {
        let request = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(WAIT_FOR_MODEL_HEADER, "true")
            .body(bytes);
        Self::decode(self.send(request)?)
    }

    /// Sends `inputs` plus `parameters` as JSON and returns the raw reply body
    /// with its content type.
    pub fn infer_binary<P: Serialize>(
        &self,
        inputs: &str,
        parameters: P,
    ) -> Result<(Vec<u8>, String), RunnerError> {
        let request = self.client.post(&self.url).json(&Self::body(inputs, parameters));
        let response = self.send(request)?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();

        if content_type.starts_with("application/json") {
            let text = response.text().unwrap_or_default();
            return Err(RunnerError::ModelResponseError(format!(
                "Expected binary output from '{}', got JSON: {}",
                self.model_id, text
            )));
        }

        let bytes = response
            .bytes()
            .map_err(|e| RunnerError::RequestError(format!("Failed to read response body: {e}")))?;
        Ok((bytes.to_vec(), content_type))
    }

    fn body<P: Serialize>(inputs: &str, parameters: P) -> JsonRequest<'_, P> {
        JsonRequest { inputs, parameters, options: Options { wait_for_model: true } }
    }

    fn send(&self, request: RequestBuilder) -> Result<Response, RunnerError> {
        debug!(model_id = %self.model_id, url = %self.url, "Sending inference request");

        let response = request.send().map_err(|e| {
            error!(error = %e, url = %self.url, "Failed to reach inference service");
            if e.is_timeout() {
                RunnerError::RequestError(format!("Request to {} timed out", self.url))
            } else if e.is_connect() {
                RunnerError::RequestError(format!(
                    "Inference service not reachable at {}",
                    self.url
                ))
            } else {
                RunnerError::RequestError(format!("Network error: {e}"))
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response.text().unwrap_or_else(|_| "Unknown error".to_string());
        error!(status = %status, error = %error_text, "Inference service returned error status");

        let detail = serde_json::from_str::<ServiceError>(&error_text)
            .map(|e| e.error)
            .unwrap_or(error_text);

        Err(match status.as_u16() {
            401 | 403 => RunnerError::RequestError(format!(
                "Authentication failed for '{}': {detail}. Set MODELRUN_HUB_TOKEN or HF_TOKEN.",
                self.model_id
            )),
            404 => RunnerError::ModelResponseError(format!("Model '{}' not found", self.model_id)),
            503 => RunnerError::ModelResponseError(format!(
                "Model '{}' is still loading on the inference service: {detail}",
                self.model_id
            )),
            _ => RunnerError::ModelResponseError(format!("API error ({status}): {detail}")),
        })
    }

    fn decode<T: DeserializeOwned>(response: Response) -> Result<T, RunnerError> {
        let text = response
            .text()
            .map_err(|e| RunnerError::RequestError(format!("Failed to read response body: {e}")))?;
        serde_json::from_str(&text).map_err(|e| {
            RunnerError::SerializationError(format!("Failed to parse response: {e}: {text}"))
        })
    }
}

/// The lazily created handle shared by every service-backed runner.
#[derive(Debug, Clone)]
pub struct HubModel {
    model_id: String,
    settings: HubSettings,
    endpoint: Option<Endpoint>,
}

impl HubModel {
    /// An unloaded handle for `model_id`.
    pub fn new(model_id: impl Into<String>, settings: HubSettings) -> Self {
        Self { model_id: model_id.into(), settings, endpoint: None }
    }

    /// The model identifier.
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Returns true once `load` has succeeded.
    pub fn is_loaded(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Creates (or recreates) the endpoint.
    pub fn load(&mut self) -> Result<(), RunnerError> {
        debug!(
            model_id = %self.model_id,
            base_url = %self.settings.base_url,
            "Loading model endpoint"
        );
        self.endpoint = Some(Endpoint::connect(&self.settings, &self.model_id)?);
        Ok(())
    }

    /// Returns the endpoint, creating it first if needed.
    pub fn endpoint(&mut self) -> Result<&Endpoint, RunnerError> {
        let endpoint = match self.endpoint.take() {
            Some(endpoint) => endpoint,
            None => Endpoint::connect(&self.settings, &self.model_id)?,
        };
        let endpoint: &Endpoint = self.endpoint.insert(endpoint);
        Ok(endpoint)
    }
}

/// Reads an input file for upload.
pub fn read_input_file(path: &Path) -> Result<Vec<u8>, RunnerError> {
    std::fs::read(path)
        .map_err(|e| RunnerError::InputError(format!("Failed to read {}: {e}", path.display())))
}
