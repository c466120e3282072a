// API client module: a blocking client for the store API and the storage
// endpoint. Requests to the store go through the authenticated session;
// uploads stream the file straight from disk into the multipart body.

use reqwest::blocking::{multipart, Client as HttpClient, Response};
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use tracing::debug;

use crate::auth::{StoreClientError, StoreSession};
use crate::config::{default_credentials_path, StoreConfig};
use crate::error::{CommandError, Result};
use crate::progress::{ConsoleProgress, ProgressReader, ProgressState};
use crate::user_agent::build_user_agent;

/// Response of the storage endpoint after an upload.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    pub successful: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    upload_id: Option<String>,
}

impl UploadResult {
    /// The upload id, only handed out for a successful upload.
    pub fn upload_id(&self) -> Option<&str> {
        if self.successful {
            self.upload_id.as_deref()
        } else {
            None
        }
    }
}

/// Account details returned by the whoami endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Whoami {
    pub account: Account,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Store client: authenticated requests to the store API plus file
/// uploads to the storage endpoint.
pub struct Client {
    session: StoreSession,
    http: HttpClient,
    storage_base_url: String,
}

impl Client {
    /// Create a client for the given store and storage services, keeping
    /// credentials in the standard per-user location.
    pub fn new(api_base_url: &str, storage_base_url: &str) -> Result<Self> {
        Client::from_config(StoreConfig::new(api_base_url, storage_base_url))
    }

    pub fn from_config(config: StoreConfig) -> Result<Self> {
        let credentials_path = match config.credentials_path {
            Some(path) => path,
            None => default_credentials_path().ok_or_else(|| {
                StoreClientError::Credentials("no user configuration directory available".into())
            })?,
        };

        // no timeout here, the transport is configured by whoever needs one
        let http = HttpClient::builder().timeout(None).build()?;

        let session = StoreSession::new(
            http.clone(),
            config.api_base_url.trim_end_matches('/').to_string(),
            credentials_path,
            config.environment_auth,
            config.endpoints,
        );

        Ok(Client {
            session,
            http,
            storage_base_url: config.storage_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn api_base_url(&self) -> &str {
        self.session.base_url()
    }

    pub fn storage_base_url(&self) -> &str {
        &self.storage_base_url
    }

    pub fn credentials_path(&self) -> &Path {
        self.session.credentials_path()
    }

    /// Signed request to the store. Session failures come back as a
    /// [`CommandError`] with the session's message.
    pub fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Response> {
        Ok(self.session.request(method, path, body)?)
    }

    /// Like [`Client::request`], decoding the body as JSON.
    pub fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<T> {
        let res = self.request(method, path, body)?;
        decode_json(res)
    }

    /// Account behind the current credentials.
    pub fn whoami(&self) -> Result<Whoami> {
        let path = self.session.endpoints().whoami;
        self.request_json(Method::GET, path, None)
    }

    /// Check exported credentials against the store and keep them if the
    /// store accepts them. Credentials already stored are left as they were
    /// when the check fails.
    pub fn login_with_credentials(&self, exported: &str) -> Result<Whoami> {
        self.session.ensure_file_credentials()?;

        let path = self.session.endpoints().whoami;
        let res = self.session.request_with(Method::GET, path, None, exported)?;
        let whoami: Whoami = decode_json(res)?;

        self.session.store_credentials(exported)?;
        debug!(username = %whoami.account.username, "logged in");
        Ok(whoami)
    }

    /// Remove the stored credentials. Refused while credentials come from
    /// the environment, as they would stay in use.
    pub fn logout(&self) -> Result<()> {
        self.session.ensure_file_credentials()?;
        self.session.clear_credentials()?;
        Ok(())
    }

    /// Push the bytes of `filepath` to the storage, showing the progress on
    /// the terminal. Returns the upload id.
    pub fn push_file(&self, filepath: &Path) -> Result<String> {
        let progress = ConsoleProgress::new();
        let reporter = progress.clone();
        let result = self.push_file_with_progress(filepath, move |state| reporter.update(state));
        progress.finish();
        result
    }

    /// Same as [`Client::push_file`] with a custom progress callback, called
    /// once per chunk read from the file.
    pub fn push_file_with_progress<F>(&self, filepath: &Path, on_progress: F) -> Result<String>
    where
        F: FnMut(ProgressState) + Send + 'static,
    {
        debug!(path = %filepath.display(), "Starting to push");

        let file = File::open(filepath)?;
        let total_length = file.metadata()?.len();
        let file_name = filepath
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "binary".into());

        // the file handle lives inside the body and is dropped with it
        let reader = ProgressReader::new(file, total_length, on_progress);
        let part = multipart::Part::reader_with_length(reader, total_length)
            .file_name(file_name)
            .mime_str("application/octet-stream")?;
        let form = multipart::Form::new().part("binary", part);

        let payload: serde_json::Value = self.storage_push(form)?;
        let result: UploadResult = serde_json::from_value(payload.clone())
            .map_err(|e| CommandError::UnexpectedResponse(format!("{}: {}", e, payload)))?;

        if !result.successful {
            return Err(CommandError::UploadRejected { payload });
        }
        let upload_id = result
            .upload_id()
            .ok_or_else(|| CommandError::UnexpectedResponse(format!("missing upload_id in {}", payload)))?
            .to_string();

        debug!(%upload_id, "Uploading bytes ended");
        Ok(upload_id)
    }

    fn storage_push(&self, form: multipart::Form) -> Result<serde_json::Value> {
        let url = format!("{}/unscanned-upload/", self.storage_base_url);
        let res = self
            .http
            .post(&url)
            .header(USER_AGENT, build_user_agent())
            .header(ACCEPT, "application/json")
            .multipart(form)
            .send()?;
        if !res.status().is_success() {
            return Err(StoreClientError::from_response(res).into());
        }
        decode_json(res)
    }
}

fn decode_json<T: DeserializeOwned>(res: Response) -> Result<T> {
    let status = res.status();
    let bytes = res.bytes()?;
    serde_json::from_slice(&bytes).map_err(|source| CommandError::MalformedResponse { status, source })
}
