//! Prepared statements.

use std::sync::Arc;

use adsdb_core::{ColumnDescription, ColumnInfo, Error, Param, Result, Row};

use crate::connection::Connection;
use crate::diagnostics;
use crate::native::{AceApi, BindParam, ConnHandle, StmtHandle};
use crate::types;

/// One prepared statement and the parameter buffers bound to it.
///
/// Bound buffers live in `params` until the statement is freed; the engine
/// reads them at execute time.
pub(crate) struct Statement<'c> {
    conn: &'c Connection,
    handle: StmtHandle,
    conn_handle: ConnHandle,
    params: Vec<BindParam>,
    exhausted: bool,
    freed: bool,
}

impl<'c> Statement<'c> {
    pub(crate) fn prepare(conn: &'c Connection, sql: &str) -> Result<Self> {
        let conn_handle = conn.handle()?;
        let api = conn.api();
        tracing::debug!(sql = %sql, "Preparing statement");
        let text = types::utf16_with_bom(sql);
        let handle = api
            .prepare(conn_handle, &text, true)
            .ok_or_else(|| diagnostics::operational(api, Some(conn_handle)))?;
        Ok(Self {
            conn,
            handle,
            conn_handle,
            params: Vec::new(),
            exhausted: false,
            freed: false,
        })
    }

    fn api(&self) -> &'c dyn AceApi {
        self.conn.api()
    }

    fn fail(&self) -> Error {
        diagnostics::operational(self.api(), Some(self.conn_handle))
    }

    pub(crate) fn num_params(&self) -> Result<usize> {
        let n = self.api().num_params(self.handle);
        usize::try_from(n).map_err(|_| self.fail())
    }

    /// Bind the leading parameters; values beyond the placeholder count are
    /// ignored, missing ones are left for the engine to report.
    pub(crate) fn bind_params(&mut self, params: &[Param]) -> Result<()> {
        let count = self.num_params()?.min(params.len());
        for (index, value) in params.iter().take(count).enumerate() {
            self.bind(index, value)?;
        }
        Ok(())
    }

    fn bind(&mut self, index: usize, value: &Param) -> Result<()> {
        let api = self.api();
        let position = u32::try_from(index)
            .map_err(|_| Error::interface(format!("parameter index {index} out of range")))?;
        let mut param = api
            .describe_bind_param(self.handle, position)
            .ok_or_else(|| self.fail())?;
        types::encode(&mut param, value)?;
        tracing::trace!(
            index,
            data_type = ?param.data_type,
            is_null = param.is_null(),
            "Binding parameter"
        );

        let slot = self.params.len();
        self.params.push(param);
        // SAFETY: the buffers live in the arena until the statement is freed
        // and are never touched again after this call
        let bound = unsafe { api.bind_param(self.handle, position, &mut self.params[slot]) };
        if bound { Ok(()) } else { Err(self.fail()) }
    }

    pub(crate) fn execute(&mut self) -> Result<()> {
        if !self.api().execute(self.handle) {
            return Err(self.fail());
        }
        self.exhausted = false;
        Ok(())
    }

    fn num_cols(&self) -> Result<u32> {
        let n = self.api().num_cols(self.handle);
        u32::try_from(n).map_err(|_| self.fail())
    }

    /// Column metadata, `None` when the statement produced no result set.
    pub(crate) fn describe(&self) -> Result<Option<Vec<ColumnDescription>>> {
        let n = self.num_cols()?;
        if n == 0 {
            return Ok(None);
        }
        (0..n).map(|i| self.column(i)).collect::<Result<Vec<_>>>().map(Some)
    }

    fn column(&self, index: u32) -> Result<ColumnDescription> {
        let info = self
            .api()
            .get_column_info(self.handle, index)
            .ok_or_else(|| self.fail())?;
        // Sizes of double-byte text columns are reported in bytes.
        let (internal_size, precision) = if info.native_type.is_double_byte_text() {
            (info.max_size / 2, info.precision / 2)
        } else {
            (info.max_size, info.precision)
        };
        Ok(ColumnDescription {
            name: info.name,
            type_code: info.native_type,
            display_size: None,
            internal_size,
            precision,
            scale: info.scale,
            null_ok: info.nullable,
        })
    }

    /// Rows in the result set, `-1` if unknown.
    pub(crate) fn num_rows(&self) -> i64 {
        match self.api().num_rows(self.handle) {
            n if n < 0 => -1,
            n => i64::from(n),
        }
    }

    /// Rows changed by the statement, `-1` if unknown.
    pub(crate) fn affected_rows(&self) -> i64 {
        match self.api().affected_rows(self.handle) {
            n if n < 0 => -1,
            n => i64::from(n),
        }
    }

    /// Fetch and decode the next row. Once the engine reports the end of the
    /// result it is not asked again.
    pub(crate) fn next_row(&mut self, columns: &Arc<ColumnInfo>) -> Result<Option<Row>> {
        if self.exhausted {
            return Ok(None);
        }
        let api = self.api();
        if !api.fetch_next(self.handle) {
            tracing::trace!("Result set exhausted");
            self.exhausted = true;
            return Ok(None);
        }

        let n = self.num_cols()?;
        let encoding = self.conn.encoding();
        let mut values = Vec::with_capacity(n as usize);
        for i in 0..n {
            let cell = api.get_column(self.handle, i).ok_or_else(|| self.fail())?;
            values.push(types::decode(&cell, encoding)?);
        }
        tracing::trace!(columns = n, "Fetched row");
        Ok(Some(Row::with_columns(Arc::clone(columns), values)))
    }

    /// Release the native statement and its parameter buffers.
    pub(crate) fn free(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.freed {
            self.freed = true;
            self.api().free_stmt(self.handle);
            self.params.clear();
        }
    }
}

impl Drop for Statement<'_> {
    fn drop(&mut self) {
        if !self.freed {
            tracing::warn!("implicit statement cleanup");
            self.conn.environment().record_statement_leak();
            self.release();
        }
    }
}
