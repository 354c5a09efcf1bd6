//! Connections to an Advantage database.

use std::cell::Cell;
use std::ffi::CString;
use std::fmt;

use adsdb_core::{Error, Result};
use encoding_rs::Encoding;

use crate::cursor::Cursor;
use crate::diagnostics;
use crate::environment::Environment;
use crate::ffi::AE_TRANS_OUT_OF_SEQUENCE;
use crate::native::{AceApi, ConnHandle};

/// A connection to an Advantage database.
///
/// The native handle is present exactly while the connection is open.
/// Cursors borrow the connection, so it cannot be dropped while one is
/// alive; `close` is still allowed and makes the cursors fail with an
/// interface error.
pub struct Connection {
    env: Environment,
    handle: Cell<Option<ConnHandle>>,
    encoding: &'static Encoding,
}

impl Connection {
    /// Allocate a handle and connect it.
    ///
    /// The handle is released again if the engine refuses the connection.
    pub(crate) fn open(
        env: Environment,
        connection_string: &str,
        encoding: &'static Encoding,
    ) -> Result<Self> {
        if !connection_string.is_ascii() {
            return Err(Error::interface(
                "connection string must only contain ASCII characters",
            ));
        }
        let target = CString::new(connection_string)
            .map_err(|_| Error::interface("connection string contains a NUL byte"))?;

        let api = env.api();
        let Some(handle) = api.new_connection() else {
            return Err(Error::Internal(diagnostics::last_error(api, None)));
        };
        tracing::debug!(encoding = encoding.name(), "Connecting");
        if !api.connect(handle, &target) {
            let err = diagnostics::operational(api, Some(handle));
            api.free_connection(handle);
            tracing::debug!(error = %err, "Connect failed");
            return Err(err);
        }

        Ok(Self {
            env,
            handle: Cell::new(Some(handle)),
            encoding,
        })
    }

    /// Is the connection closed?
    pub fn is_closed(&self) -> bool {
        self.handle.get().is_none()
    }

    /// Code page used to decode STRING columns.
    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// The environment this connection was opened from.
    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// Open a cursor on this connection.
    pub fn cursor(&self) -> Result<Cursor<'_>> {
        self.handle()?;
        Ok(Cursor::new(self))
    }

    /// Commit the current transaction.
    ///
    /// Committing outside of a transaction is not an error.
    pub fn commit(&self) -> Result<()> {
        let handle = self.handle()?;
        tracing::debug!("Committing");
        self.end_transaction(handle, |api, h| api.commit(h))
    }

    /// Roll back the current transaction.
    pub fn rollback(&self) -> Result<()> {
        let handle = self.handle()?;
        tracing::debug!("Rolling back");
        self.end_transaction(handle, |api, h| api.rollback(h))
    }

    /// Close the connection: roll back, disconnect, release the handle.
    ///
    /// The handle is released even when rollback or disconnect fail; the
    /// first failure is returned. Closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        tracing::debug!("Closing connection");
        self.release(handle)
    }

    pub(crate) fn api(&self) -> &dyn AceApi {
        self.env.api()
    }

    pub(crate) fn handle(&self) -> Result<ConnHandle> {
        self.handle
            .get()
            .ok_or_else(|| Error::interface("connection closed"))
    }

    /// Rollback issued by a closing cursor; a closed connection is skipped.
    pub(crate) fn rollback_on_close(&self) -> Result<()> {
        match self.handle.get() {
            Some(handle) => self.end_transaction(handle, |api, h| api.rollback(h)),
            None => Ok(()),
        }
    }

    fn end_transaction(
        &self,
        handle: ConnHandle,
        op: impl Fn(&dyn AceApi, ConnHandle) -> bool,
    ) -> Result<()> {
        let api = self.api();
        if op(api, handle) {
            return Ok(());
        }
        let err = diagnostics::last_error(api, Some(handle));
        if err.code == AE_TRANS_OUT_OF_SEQUENCE {
            tracing::trace!("No transaction in progress");
            return Ok(());
        }
        Err(Error::Operational(err))
    }

    fn release(&self, handle: ConnHandle) -> Result<()> {
        let api = self.api();
        let mut first_error = None;

        if !api.rollback(handle) {
            let err = diagnostics::last_error(api, Some(handle));
            if err.code != AE_TRANS_OUT_OF_SEQUENCE {
                first_error = Some(Error::Operational(err));
            }
        }
        if !api.disconnect(handle) {
            let err = diagnostics::operational(api, Some(handle));
            first_error.get_or_insert(err);
        }
        api.free_connection(handle);

        first_error.map_or(Ok(()), Err)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            tracing::warn!("implicit connection cleanup");
            self.env.record_connection_leak();
            if let Err(e) = self.release(handle) {
                tracing::warn!(error = %e, "Error during implicit connection cleanup");
            }
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("open", &!self.is_closed())
            .field("encoding", &self.encoding.name())
            .finish_non_exhaustive()
    }
}
