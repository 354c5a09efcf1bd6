//! Connection configuration.
//!
//! The engine takes a single `key=value;key=value` string. `AdsConfig`
//! either carries such a string verbatim or builds one from ordered options,
//! and also selects the single-byte code page used for STRING columns.

use std::ops::BitOr;
use std::path::Path;

use adsdb_core::{Error, Result};
use encoding_rs::{Encoding, WINDOWS_1252};
use serde::{Deserialize, Serialize};

/// Environment variable holding a complete connection string.
pub const ENV_CONNECTION_STRING: &str = "ADSDB_CONNECTION_STRING";
/// Environment variable holding just a data source path.
pub const ENV_DATASOURCE: &str = "ADSDB_DATASOURCE";

/// Default code page for STRING columns.
pub const DEFAULT_ENCODING: &str = "windows-1252";

/// Server kinds the client may try, combined with `|`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerType(u32);

impl ServerType {
    /// Local server (in-process)
    pub const LOCAL: Self = Self(1);
    /// Remote database server
    pub const REMOTE: Self = Self(2);
    /// Internet server
    pub const INTERNET: Self = Self(4);

    pub const fn bits(self) -> u32 {
        self.0
    }
}

impl BitOr for ServerType {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Client-server transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommType {
    Udp,
    Tcp,
    Tls,
}

impl CommType {
    pub const fn as_str(self) -> &'static str {
        match self {
            CommType::Udp => "UDP_IP",
            CommType::Tcp => "TCP_IP",
            CommType::Tls => "TLS",
        }
    }
}

/// Record locking protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Proprietary,
    Compatible,
}

impl LockMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            LockMode::Proprietary => "PROPRIETARY",
            LockMode::Compatible => "COMPATIBLE",
        }
    }
}

/// Connection configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdsConfig {
    /// Complete connection string; when present `options` are ignored.
    pub connection_string: Option<String>,
    /// Ordered `key=value` pairs.
    pub options: Vec<(String, String)>,
    /// WHATWG label of the STRING code page (default: windows-1252)
    pub encoding: Option<String>,
}

impl AdsConfig {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a prebuilt connection string.
    pub fn from_connection_string(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: Some(connection_string.into()),
            ..Self::default()
        }
    }

    /// Read a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::interface(format!("invalid configuration: {e}")))
    }

    /// Read a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::interface(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    /// Configuration from `ADSDB_CONNECTION_STRING` or, failing that,
    /// `ADSDB_DATASOURCE`. `None` when neither is set.
    pub fn from_env() -> Option<Self> {
        if let Ok(cs) = std::env::var(ENV_CONNECTION_STRING) {
            return Some(Self::from_connection_string(cs));
        }
        let data_source = std::env::var(ENV_DATASOURCE).ok()?;
        Some(
            Self::new()
                .char_type("ANSI")
                .comm_type(CommType::Tcp)
                .data_source(data_source)
                .server_type(ServerType::REMOTE)
                .trim_trailing_spaces(true),
        )
    }

    /// Set an option, replacing an earlier value for the same key
    /// (case-insensitive) in place.
    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match self
            .options
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(&key))
        {
            Some(slot) => slot.1 = value,
            None => self.options.push((key, value)),
        }
        self
    }

    /// Path to the data dictionary or the table directory.
    pub fn data_source(self, path: impl Into<String>) -> Self {
        self.option("DataSource", path)
    }

    pub fn server_type(self, server_type: ServerType) -> Self {
        self.option("ServerType", server_type.bits().to_string())
    }

    pub fn comm_type(self, comm_type: CommType) -> Self {
        self.option("CommType", comm_type.as_str())
    }

    /// Collation, e.g. `ANSI` or `OEM`.
    pub fn char_type(self, char_type: impl Into<String>) -> Self {
        self.option("CharType", char_type)
    }

    pub fn user(self, user: impl Into<String>) -> Self {
        self.option("User ID", user)
    }

    pub fn password(self, password: impl Into<String>) -> Self {
        self.option("Password", password)
    }

    pub fn read_only(self, enabled: bool) -> Self {
        self.option("ReadOnly", flag(enabled))
    }

    pub fn trim_trailing_spaces(self, enabled: bool) -> Self {
        self.option("TrimTrailingSpaces", flag(enabled))
    }

    pub fn lock_mode(self, mode: LockMode) -> Self {
        self.option("LockMode", mode.as_str())
    }

    /// Code page for STRING columns, by WHATWG label.
    pub fn encoding(mut self, label: impl Into<String>) -> Self {
        self.encoding = Some(label.into());
        self
    }

    /// The string handed to the engine.
    pub fn connection_string(&self) -> String {
        if let Some(cs) = &self.connection_string {
            return cs.clone();
        }
        self.options
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Resolve the configured code page. Only single-byte encodings are
    /// accepted.
    pub fn resolve_encoding(&self) -> Result<&'static Encoding> {
        let Some(label) = &self.encoding else {
            return Ok(WINDOWS_1252);
        };
        let encoding = Encoding::for_label(label.as_bytes())
            .ok_or_else(|| Error::interface(format!("unknown encoding '{label}'")))?;
        if !encoding.is_single_byte() {
            return Err(Error::interface(format!(
                "encoding '{}' is not a single-byte code page",
                encoding.name()
            )));
        }
        Ok(encoding)
    }
}

fn flag(enabled: bool) -> &'static str {
    if enabled { "True" } else { "False" }
}
