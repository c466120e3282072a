// User agent module: builds the string sent with every request to the
// store and to the storage endpoint. It is recomputed on each call so
// that changes in the environment are picked up.

use std::collections::HashMap;
use std::fs;

/// Product token placed at the start of the user agent.
pub const PRODUCT: &str = "charmcraft";

/// Environment variable prefixes that flag a CI or test-harness run.
pub const TESTING_ENV_PREFIXES: [&str; 2] = ["TRAVIS", "AUTOPKGTEST_TMP"];

/// Identity of the running platform as shown in the user agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsPlatform {
    pub system: String,
    pub release: String,
    pub machine: String,
}

impl OsPlatform {
    /// Inspect the current host. On Linux the distribution id and version
    /// are preferred over the kernel name and release.
    pub fn detect() -> Self {
        let machine = std::env::consts::ARCH.to_string();

        if std::env::consts::OS == "linux" {
            if let Ok(content) = fs::read_to_string("/etc/os-release") {
                let fields = parse_os_release(&content);
                if let (Some(id), Some(version)) = (fields.get("ID"), fields.get("VERSION_ID")) {
                    return OsPlatform {
                        system: id.clone(),
                        release: version.clone(),
                        machine,
                    };
                }
            }
            let release = fs::read_to_string("/proc/sys/kernel/osrelease")
                .map(|r| r.trim().to_string())
                .unwrap_or_else(|_| "unknown".into());
            return OsPlatform {
                system: "Linux".into(),
                release,
                machine,
            };
        }

        OsPlatform {
            system: system_name(std::env::consts::OS),
            release: "unknown".into(),
            machine,
        }
    }
}

impl std::fmt::Display for OsPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{} ({})", self.system, self.release, self.machine)
    }
}

fn system_name(os: &str) -> String {
    match os {
        "macos" => "Darwin".into(),
        "windows" => "Windows".into(),
        other => other.to_string(),
    }
}

/// Parse the `KEY=value` lines of an os-release file, dropping comments
/// and surrounding quotes.
pub fn parse_os_release(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| {
            let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
            (key.trim().to_string(), value.to_string())
        })
        .collect()
}

/// Build the user agent from an explicit environment snapshot and platform.
pub fn user_agent_for<I, K>(env_keys: I, platform: &OsPlatform) -> String
where
    I: IntoIterator<Item = K>,
    K: AsRef<str>,
{
    let testing = env_keys.into_iter().any(|key| {
        TESTING_ENV_PREFIXES
            .iter()
            .any(|prefix| key.as_ref().starts_with(prefix))
    });
    let marker = if testing { " (testing) " } else { " " };

    format!(
        "{}/{}{}{} rust/{}",
        PRODUCT,
        env!("CARGO_PKG_VERSION"),
        marker,
        platform,
        runtime_version()
    )
}

/// Build the user agent for the current process.
pub fn build_user_agent() -> String {
    let keys = std::env::vars_os().map(|(key, _)| key.to_string_lossy().into_owned());
    user_agent_for(keys, &OsPlatform::detect())
}

fn runtime_version() -> &'static str {
    match env!("CARGO_PKG_RUST_VERSION") {
        "" => "unknown",
        version => version,
    }
}
