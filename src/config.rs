// Client configuration. Values come from the environment (with the public
// Charmhub services as defaults) or are set explicitly through the
// `with_*` setters, which is how tests point the client at a mock server
// and a scratch credentials file.

use crate::auth::{EnvironmentAuth, Endpoints};
use std::path::PathBuf;

pub const DEFAULT_API_URL: &str = "https://api.charmhub.io";
pub const DEFAULT_STORAGE_URL: &str = "https://storage.snapcraftcontent.com";

/// Environment variable that may carry exported credentials.
pub const DEFAULT_AUTH_ENV: &str = "CHARMCRAFT_AUTH";

/// File name of the credentials file inside the user config directory.
pub const CREDENTIALS_FILE_NAME: &str = "charmcraft.creds";

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub api_base_url: String,
    pub storage_base_url: String,
    /// Overrides the per-user credentials location.
    pub credentials_path: Option<PathBuf>,
    /// Exported credentials that take precedence over the file.
    pub environment_auth: Option<EnvironmentAuth>,
    pub endpoints: Endpoints,
}

impl StoreConfig {
    pub fn new(api_base_url: impl Into<String>, storage_base_url: impl Into<String>) -> Self {
        StoreConfig {
            api_base_url: api_base_url.into(),
            storage_base_url: storage_base_url.into(),
            credentials_path: None,
            environment_auth: None,
            endpoints: Endpoints::CHARMHUB,
        }
    }

    /// Build the configuration from `CHARMCRAFT_API_URL`,
    /// `CHARMCRAFT_STORAGE_URL` and `CHARMCRAFT_AUTH`, falling back to the
    /// public services.
    pub fn from_env() -> Self {
        let api = std::env::var("CHARMCRAFT_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.into());
        let storage =
            std::env::var("CHARMCRAFT_STORAGE_URL").unwrap_or_else(|_| DEFAULT_STORAGE_URL.into());
        StoreConfig::new(api, storage).with_auth_env(DEFAULT_AUTH_ENV)
    }

    /// Take exported credentials from `variable` when it is set and not
    /// blank; otherwise the credentials file is used.
    pub fn with_auth_env(mut self, variable: &str) -> Self {
        self.environment_auth = std::env::var(variable)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(|credentials| EnvironmentAuth {
                variable: variable.to_string(),
                credentials,
            });
        self
    }

    pub fn with_credentials_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_path = Some(path.into());
        self
    }

    pub fn with_environment_auth(mut self, variable: &str, credentials: impl Into<String>) -> Self {
        self.environment_auth = Some(EnvironmentAuth {
            variable: variable.to_string(),
            credentials: credentials.into(),
        });
        self
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }
}

/// Standard per-user location of the credentials file, independent of the
/// current directory. `None` when the platform has no config directory.
pub fn default_credentials_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CREDENTIALS_FILE_NAME))
}
