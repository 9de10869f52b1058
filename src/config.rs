use std::env;
use std::fmt::Display;
use std::fs::read_to_string;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;
use tracing::{info, warn};

use crate::Secret;

/// Directory holding mounted secret files.
pub const SECRETS_DIR: &str = "/run/secrets";

const HOST: &str = "PORTAL_HOST";
const PORT: &str = "PORTAL_PORT";
const ADMIN_TOKEN: &str = "PORTAL_ADMIN_TOKEN";
const PUBLIC_BLOB_URL: &str = "PORTAL_PUBLIC_BLOB_URL";
const MAX_BODY_BYTES: &str = "PORTAL_MAX_BODY_BYTES";
const SEED_PATH: &str = "PORTAL_SEED_PATH";

/// Startup configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A variable is set but cannot be parsed.
    #[error("invalid {key} value {value:?}: {reason}")]
    Invalid {
        /// Variable name
        key: &'static str,
        /// Offending value
        value: String,
        /// Parser message
        reason: String,
    },

    /// A secret file exists but cannot be read.
    #[error("cannot read secret {name}: {source}")]
    Secret {
        /// Secret name
        name: &'static str,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Runtime configuration of the portal.
#[derive(Debug)]
pub struct PortalConfig {
    /// Address to bind
    pub host: IpAddr,
    /// Port to bind
    pub port: u16,
    /// Bearer token required on every request; `None` disables the check
    pub admin_token: Option<Secret<String>>,
    /// Base URL under which uploaded blobs are served
    pub public_blob_url: String,
    /// Largest accepted request body
    pub max_body_bytes: usize,
    /// JSON snapshot used to seed the document store
    pub seed_path: Option<PathBuf>,
}

impl PortalConfig {
    /// Loads configuration from the process environment and `/run/secrets`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(|key| env::var(key).ok(), Path::new(SECRETS_DIR))
    }

    /// Loads configuration from an arbitrary variable lookup.
    ///
    /// The admin token is read from the `PORTAL_ADMIN_TOKEN` variable, or
    /// else from the file of that name under `secrets_dir`.
    pub fn load(
        lookup: impl Fn(&str) -> Option<String>,
        secrets_dir: &Path,
    ) -> Result<Self, ConfigError> {
        let admin_token = match non_empty(lookup(ADMIN_TOKEN)) {
            Some(token) => Some(token),
            None => read_secret(secrets_dir, ADMIN_TOKEN)?,
        };

        Ok(Self {
            host: try_load(&lookup, HOST, "0.0.0.0")?,
            port: try_load(&lookup, PORT, "8000")?,
            admin_token: admin_token.map(Secret::new),
            public_blob_url: try_load(&lookup, PUBLIC_BLOB_URL, "http://localhost:8000/blobs")?,
            max_body_bytes: try_load(&lookup, MAX_BODY_BYTES, "10485760")?,
            seed_path: non_empty(lookup(SEED_PATH)).map(PathBuf::from),
        })
    }

    /// Socket address to bind.
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn try_load<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: &str,
) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let value = non_empty(lookup(key)).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    value.parse().map_err(|e: T::Err| {
        warn!("Invalid {key} value: {e}");
        ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }
    })
}

fn read_secret(dir: &Path, name: &'static str) -> Result<Option<String>, ConfigError> {
    let path = dir.join(name);

    match read_to_string(&path) {
        Ok(contents) => Ok(non_empty(Some(contents))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ConfigError::Secret { name, source }),
    }
}
