//! Configuration file management for certexpiry.
//!
//! The configuration is a JSON document listing the sites to check. Entries
//! are either bare host names, which are checked on port 443, or objects with
//! a `host` and an optional `port`.
//!
//! # Example Configuration File
//!
//! ```json
//! {"sites": ["example.com", {"host": "example.org", "port": 8443}]}
//! ```
//!
//! Entries that are neither a string nor an object with a usable `host` are
//! skipped without failing the load.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::path::Path;

/// Sample configuration shipped with the crate, used when no `--config` is given.
pub const DEFAULT_CONFIG: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/config/sites.json");

/// Port used for entries that do not name one.
pub const DEFAULT_PORT: i64 = 443;

/// A host and port whose certificate should be checked.
///
/// `port` holds whatever integer the config gave; it is range checked when
/// the target is probed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub port: i64,
}

impl Target {
    pub fn new(host: impl Into<String>, port: i64) -> Self {
        Target {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// One element of the `sites` array, before filtering.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SiteEntry {
    Bare(String),
    Detailed(Map<String, Value>),
    Other(Value),
}

impl SiteEntry {
    /// Turns the entry into a target, `Ok(None)` for entries that are skipped.
    fn into_target(self) -> Result<Option<Target>, ConfigError> {
        match self {
            SiteEntry::Bare(host) => Ok(Some(Target::new(host, DEFAULT_PORT))),
            SiteEntry::Detailed(fields) => {
                let host = match fields.get("host") {
                    Some(Value::String(host)) if !host.is_empty() => host.clone(),
                    _ => return Ok(None),
                };
                let port = match fields.get("port") {
                    Some(value) => coerce_port(&host, value)?,
                    None => DEFAULT_PORT,
                };
                Ok(Some(Target::new(host, port)))
            }
            SiteEntry::Other(value) => {
                tracing::debug!("skipping site entry {}", value);
                Ok(None)
            }
        }
    }
}

/// Coerces a JSON port value to an integer.
///
/// Integers are taken as is, floats are truncated, booleans count as 0 or 1
/// and strings must hold an integer. The range is not checked here: a port
/// outside 0..=65535 fails only its own target when it is checked.
fn coerce_port(host: &str, value: &Value) -> Result<i64, ConfigError> {
    let invalid = || {
        ConfigError::Validation(format!("Invalid port {} for site '{}'", value, host))
    };

    match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(i),
            None => {
                let f = n.as_f64().ok_or_else(invalid)?;
                if !f.is_finite() {
                    return Err(invalid());
                }
                // saturating cast, anything this large is out of range anyway
                Ok(f.trunc() as i64)
            }
        },
        Value::Bool(b) => Ok(i64::from(*b)),
        Value::String(s) => {
            let n = s.trim().parse::<i128>().map_err(|_| invalid())?;
            Ok(n.clamp(i64::MIN as i128, i64::MAX as i128) as i64)
        }
        _ => Err(invalid()),
    }
}

/// Loads the list of sites to check from a JSON file.
///
/// # Returns
///
/// * `Ok(Vec<Target>)` - At least one target, in file order
/// * `Err(ConfigError::Io)` - File could not be read
/// * `Err(ConfigError::Parse)` - File is not valid JSON
/// * `Err(ConfigError::Validation)` - No `sites` array, a non-integer port, or no usable entries
///
/// # Example
///
/// ```no_run
/// # use certexpiry::config::load_sites;
/// let targets = load_sites("sites.json")?;
/// # Ok::<(), certexpiry::config::ConfigError>(())
/// ```
pub fn load_sites<P: AsRef<Path>>(path: P) -> Result<Vec<Target>, ConfigError> {
    let content = fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io(e.to_string()))?;
    parse_sites(&content)
}

/// Parses the contents of a sites file. See [`load_sites`].
pub fn parse_sites(content: &str) -> Result<Vec<Target>, ConfigError> {
    let mut document: Value =
        serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;

    let entries = match document.get_mut("sites").map(Value::take) {
        Some(Value::Array(entries)) => entries,
        _ => {
            return Err(ConfigError::Validation(
                "Config file must contain a 'sites' array".to_string(),
            ))
        }
    };

    let mut targets = Vec::with_capacity(entries.len());
    for entry in entries {
        let entry: SiteEntry =
            serde_json::from_value(entry).map_err(|e| ConfigError::Parse(e.to_string()))?;
        if let Some(target) = entry.into_target()? {
            targets.push(target);
        }
    }

    if targets.is_empty() {
        return Err(ConfigError::Validation(
            "Provide at least one site in the config file".to_string(),
        ));
    }

    Ok(targets)
}

/// Errors that can occur during configuration loading and parsing.
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error (file not found, permission denied, etc.)
    Io(String),
    /// JSON parsing error
    Parse(String),
    /// Validation error (missing sites array, non-integer port, no usable sites)
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "IO Error: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Parse Error: {}", msg),
            ConfigError::Validation(msg) => write!(f, "Validation Error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}
