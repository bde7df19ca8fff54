//! Configuration types and loading.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Main configuration for a probe run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProbeConfig {
    /// Language server endpoint.
    #[serde(default)]
    pub server: ServerAddr,

    /// Per-request deadline, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Workspace root advertised during the handshake. Defaults to the
    /// probed file's parent directory when unset.
    #[serde(default)]
    pub workspace_root: Option<PathBuf>,
}

// Derived Default would zero the timeout; the serde defaults only apply
// when deserializing.
impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            server: ServerAddr::default(),
            request_timeout_secs: default_request_timeout_secs(),
            workspace_root: None,
        }
    }
}

/// TCP endpoint of the language server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerAddr {
    /// Host name or address.
    #[serde(default = "default_host")]
    pub host: String,
    /// TCP port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerAddr {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerAddr {
    /// The `host:port` form accepted by `TcpStream::connect`.
    #[must_use]
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

const fn default_port() -> u16 {
    9999
}

const fn default_request_timeout_secs() -> u64 {
    10
}

impl ProbeConfig {
    /// Load configuration, searching in order:
    /// 1. `$LSPROBE_CONFIG`
    /// 2. `./lsprobe.toml`
    /// 3. `~/.config/lsprobe/lsprobe.toml`
    ///
    /// Falls back to defaults when no file is found.
    ///
    /// # Errors
    ///
    /// Returns an error if a found file cannot be read or parsed.
    pub fn load() -> Result<Self> {
        if let Ok(path) = std::env::var("LSPROBE_CONFIG") {
            return Self::load_from(Path::new(&path));
        }

        let local = Path::new("lsprobe.toml");
        if local.exists() {
            return Self::load_from(local);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user = config_dir.join("lsprobe").join("lsprobe.toml");
            if user.exists() {
                return Self::load_from(&user);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from an explicit path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}
