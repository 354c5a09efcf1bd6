//! Process-level engine context.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use adsdb_core::{DatabaseError, Error, Result};
use encoding_rs::WINDOWS_1252;

use crate::config::AdsConfig;
use crate::connection::Connection;
use crate::ffi::API_VERSION;
use crate::native::AceApi;

/// Application tag reported to the engine at initialization.
pub const APP_NAME: &std::ffi::CStr = c"adsdb";

/// Count of resources that had to be released by `Drop` instead of an
/// explicit `close`/`free`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LeakReport {
    pub connections: usize,
    pub statements: usize,
}

struct EnvInner {
    api: Box<dyn AceApi>,
    version: u32,
    leaked_connections: Cell<usize>,
    leaked_statements: Cell<usize>,
}

impl Drop for EnvInner {
    fn drop(&mut self) {
        tracing::debug!("Finalizing ACE environment");
        self.api.fini();
    }
}

/// An initialized engine.
///
/// Created once per process with the engine implementation to use, and shared
/// by every connection opened from it; the engine is finalized when the
/// environment and all of its connections have been dropped.
#[derive(Clone)]
pub struct Environment {
    inner: Rc<EnvInner>,
}

impl Environment {
    /// Initialize `api`.
    ///
    /// Fails with [`Error::Internal`] if the engine cannot be initialized and
    /// with [`Error::NotSupported`] if it offers another API version.
    pub fn new(api: impl AceApi + 'static) -> Result<Self> {
        let Some(available) = api.init(APP_NAME, API_VERSION) else {
            return Err(Error::Internal(DatabaseError::local(
                "Error initializing libace",
            )));
        };
        if available != API_VERSION {
            api.fini();
            return Err(Error::NotSupported(DatabaseError::local(format!(
                "Incompatible libace version {available}. Required {API_VERSION}"
            ))));
        }
        tracing::debug!(version = available, "Initialized ACE environment");
        Ok(Self {
            inner: Rc::new(EnvInner {
                api: Box::new(api),
                version: available,
                leaked_connections: Cell::new(0),
                leaked_statements: Cell::new(0),
            }),
        })
    }

    /// Initialize the system libace.
    #[cfg(feature = "ace")]
    pub fn native() -> Result<Self> {
        Self::new(crate::native::AceLibrary)
    }

    /// Negotiated API version.
    pub fn api_version(&self) -> u32 {
        self.inner.version
    }

    /// Open a connection described by `config`.
    pub fn connect(&self, config: &AdsConfig) -> Result<Connection> {
        let encoding = config.resolve_encoding()?;
        Connection::open(self.clone(), &config.connection_string(), encoding)
    }

    /// Open a connection from a raw connection string, with the default
    /// code page.
    pub fn connect_str(&self, connection_string: &str) -> Result<Connection> {
        Connection::open(self.clone(), connection_string, WINDOWS_1252)
    }

    /// Resources cleaned up implicitly so far.
    pub fn leak_report(&self) -> LeakReport {
        LeakReport {
            connections: self.inner.leaked_connections.get(),
            statements: self.inner.leaked_statements.get(),
        }
    }

    pub(crate) fn api(&self) -> &dyn AceApi {
        self.inner.api.as_ref()
    }

    pub(crate) fn record_connection_leak(&self) {
        let n = &self.inner.leaked_connections;
        n.set(n.get() + 1);
    }

    pub(crate) fn record_statement_leak(&self) {
        let n = &self.inner.leaked_statements;
        n.set(n.get() + 1);
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("version", &self.inner.version)
            .field("leaks", &self.leak_report())
            .finish_non_exhaustive()
    }
}
