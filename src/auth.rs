// Authenticated session against the store API. It owns the credentials
// (a macaroon, stored base64-encoded in the credentials file or handed in
// through the environment) and signs every request with them.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

use crate::user_agent::build_user_agent;

/// Paths that describe the store API shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoints {
    pub whoami: &'static str,
}

impl Endpoints {
    pub const CHARMHUB: Endpoints = Endpoints {
        whoami: "/v1/tokens/whoami",
    };
}

#[derive(Debug, Error)]
pub enum StoreClientError {
    #[error("Credentials not found. Please log in first.")]
    NotLoggedIn,

    #[error("Credentials could not be parsed: {0}")]
    Credentials(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Issue encountered while processing your request: [{status}] {message}")]
    Server { status: StatusCode, message: String },

    #[error("Credentials are taken from the {0} environment variable; unset it to change them.")]
    EnvironmentAuth(String),

    #[error("Could not access the credentials file: {0}")]
    CredentialsFile(#[from] std::io::Error),
}

impl StoreClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            StoreClientError::Server { status, .. } => Some(*status),
            StoreClientError::Network(err) => err.status(),
            _ => None,
        }
    }

    /// Build a server error from a non-success response, using the
    /// store's `error-list` when the body carries one.
    pub fn from_response(response: Response) -> Self {
        let status = response.status();
        let body = response.text().unwrap_or_default();
        StoreClientError::Server {
            status,
            message: error_message(status, &body),
        }
    }
}

#[derive(Deserialize)]
struct ErrorList {
    #[serde(rename = "error-list")]
    error_list: Vec<ErrorItem>,
}

#[derive(Deserialize)]
struct ErrorItem {
    code: Option<String>,
    message: String,
}

fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(list) = serde_json::from_str::<ErrorList>(body) {
        if !list.error_list.is_empty() {
            return list
                .error_list
                .iter()
                .map(|item| match &item.code {
                    Some(code) => format!("{} [code: {}]", item.message, code),
                    None => item.message.clone(),
                })
                .collect::<Vec<_>>()
                .join("; ");
        }
    }
    let body = body.trim();
    if body.is_empty() {
        status.canonical_reason().unwrap_or("unknown error").to_string()
    } else {
        body.to_string()
    }
}

/// Signed-request capability scoped to one store base URL and one
/// credentials file.
pub struct StoreSession {
    http: Client,
    base_url: String,
    credentials_path: PathBuf,
    environment_auth: Option<EnvironmentAuth>,
    endpoints: Endpoints,
}

/// Exported credentials read from an environment variable.
#[derive(Debug, Clone)]
pub struct EnvironmentAuth {
    pub variable: String,
    pub credentials: String,
}

impl StoreSession {
    pub fn new(
        http: Client,
        base_url: String,
        credentials_path: PathBuf,
        environment_auth: Option<EnvironmentAuth>,
        endpoints: Endpoints,
    ) -> Self {
        StoreSession {
            http,
            base_url,
            credentials_path,
            environment_auth,
            endpoints,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials_path(&self) -> &Path {
        &self.credentials_path
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Send `method` to `base_url + path` with the credentials in use.
    /// Non-success statuses are turned into [`StoreClientError::Server`].
    pub fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Response, StoreClientError> {
        let macaroon = self.credentials()?;
        self.signed_request(method, path, body, &macaroon)
    }

    /// Same as [`StoreSession::request`] but signed with the given exported
    /// credentials, leaving the stored ones untouched.
    pub fn request_with(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
        exported: &str,
    ) -> Result<Response, StoreClientError> {
        let macaroon = decode_credentials(exported.trim())?;
        self.signed_request(method, path, body, &macaroon)
    }

    fn signed_request(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
        macaroon: &str,
    ) -> Result<Response, StoreClientError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "store request");

        let mut req = self
            .http
            .request(method, &url)
            .headers(auth_headers(macaroon)?);
        if let Some(body) = body {
            req = req.json(body);
        }

        let res = req.send()?;
        if !res.status().is_success() {
            return Err(StoreClientError::from_response(res));
        }
        Ok(res)
    }

    /// Fails when credentials come from the environment, since the file
    /// would not be used.
    pub fn ensure_file_credentials(&self) -> Result<(), StoreClientError> {
        match &self.environment_auth {
            Some(env) => Err(StoreClientError::EnvironmentAuth(env.variable.clone())),
            None => Ok(()),
        }
    }

    /// Store exported (base64) credentials in the credentials file. The file
    /// is replaced in one step, so a failed write keeps the previous content.
    pub fn store_credentials(&self, exported: &str) -> Result<(), StoreClientError> {
        let exported = exported.trim();
        decode_credentials(exported)?;
        let parent = match self.credentials_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let mut tmp = NamedTempFile::new_in(parent)?;
        tmp.write_all(exported.as_bytes())?;
        tmp.persist(&self.credentials_path).map_err(|e| e.error)?;
        debug!(path = %self.credentials_path.display(), "credentials stored");
        Ok(())
    }

    /// Forget the stored credentials. Missing credentials are not an error.
    pub fn clear_credentials(&self) -> Result<(), StoreClientError> {
        match fs::remove_file(&self.credentials_path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Credentials in use: the environment override first, then the file.
    fn credentials(&self) -> Result<String, StoreClientError> {
        let exported = match &self.environment_auth {
            Some(env) => env.credentials.clone(),
            None => match fs::read_to_string(&self.credentials_path) {
                Ok(content) => content,
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    return Err(StoreClientError::NotLoggedIn)
                }
                Err(err) => return Err(err.into()),
            },
        };
        decode_credentials(exported.trim())
    }
}

fn auth_headers(macaroon: &str) -> Result<HeaderMap, StoreClientError> {
    let mut headers = HeaderMap::new();
    let auth = HeaderValue::from_str(&format!("Macaroon {}", macaroon))
        .map_err(|e| StoreClientError::Credentials(e.to_string()))?;
    headers.insert(AUTHORIZATION, auth);
    if let Ok(ua) = HeaderValue::from_str(&build_user_agent()) {
        headers.insert(USER_AGENT, ua);
    }
    Ok(headers)
}

fn decode_credentials(exported: &str) -> Result<String, StoreClientError> {
    if exported.is_empty() {
        return Err(StoreClientError::NotLoggedIn);
    }
    let raw = STANDARD
        .decode(exported)
        .map_err(|e| StoreClientError::Credentials(e.to_string()))?;
    String::from_utf8(raw).map_err(|e| StoreClientError::Credentials(e.to_string()))
}

/// Export a raw macaroon in the form accepted by `store_credentials` and
/// the `CHARMCRAFT_AUTH` variable.
pub fn encode_credentials(macaroon: &str) -> String {
    STANDARD.encode(macaroon)
}
