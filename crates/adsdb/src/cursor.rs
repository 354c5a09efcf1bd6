//! Cursors: statement execution and result fetching.

use std::fmt;
use std::sync::Arc;

use adsdb_core::{ColumnDescription, ColumnInfo, Error, Param, Result, Row};

use crate::connection::Connection;
use crate::statement::Statement;

/// Default number of rows returned by [`Cursor::fetchmany`].
pub const DEFAULT_ARRAYSIZE: usize = 1;

/// A cursor over one connection.
///
/// Each `execute` replaces the previous statement. Results are fetched
/// lazily, forward-only, and only once.
pub struct Cursor<'c> {
    conn: &'c Connection,
    stmt: Option<Statement<'c>>,
    description: Option<Vec<ColumnDescription>>,
    columns: Arc<ColumnInfo>,
    rowcount: i64,
    arraysize: usize,
    closed: bool,
}

impl<'c> Cursor<'c> {
    pub(crate) fn new(conn: &'c Connection) -> Self {
        Self {
            conn,
            stmt: None,
            description: None,
            columns: Arc::new(ColumnInfo::new(Vec::new())),
            rowcount: -1,
            arraysize: DEFAULT_ARRAYSIZE,
            closed: false,
        }
    }

    /// The connection this cursor runs on.
    pub fn connection(&self) -> &'c Connection {
        self.conn
    }

    fn check_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::interface("cursor closed"));
        }
        self.conn.handle().map(|_| ())
    }

    fn reset(&mut self) {
        if let Some(stmt) = self.stmt.take() {
            stmt.free();
        }
        self.description = None;
        self.rowcount = -1;
    }

    /// Prepare and execute `sql`, binding `params` to its `?` placeholders.
    ///
    /// Afterwards `description` is set if the statement produced a result
    /// set, and `rowcount` holds the result size or the number of affected
    /// rows (`-1` when the engine does not know).
    #[tracing::instrument(level = "debug", skip(self, params), fields(params = params.len()))]
    pub fn execute(&mut self, sql: &str, params: &[Param]) -> Result<()> {
        self.check_open()?;
        self.reset();

        // Stored before binding so a failure still frees it on the next reset.
        let stmt = self.stmt.insert(Statement::prepare(self.conn, sql)?);
        stmt.bind_params(params)?;
        stmt.execute()?;

        match stmt.describe() {
            Ok(Some(description)) => {
                self.rowcount = stmt.num_rows();
                self.columns = Arc::new(ColumnInfo::from_descriptions(&description));
                self.description = Some(description);
            }
            Ok(None) => self.rowcount = stmt.affected_rows(),
            Err(e) => {
                self.description = None;
                self.rowcount = -1;
                return Err(e);
            }
        }
        tracing::debug!(rowcount = self.rowcount, "Statement executed");
        Ok(())
    }

    /// Execute `sql` once per parameter set.
    ///
    /// `rowcount` becomes the sum of the known counts, or keeps the last
    /// statement's value when no count was known.
    pub fn executemany<I, P>(&mut self, sql: &str, param_sets: I) -> Result<()>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<[Param]>,
    {
        self.check_open()?;
        let mut total = 0;
        let mut seen = false;
        for params in param_sets {
            self.execute(sql, params.as_ref())?;
            if self.rowcount >= 0 {
                total += self.rowcount;
                seen = true;
            }
        }
        if seen {
            self.rowcount = total;
        }
        Ok(())
    }

    /// Call a stored procedure with one placeholder per parameter.
    pub fn callproc(&mut self, name: &str, params: &[Param]) -> Result<()> {
        let sql = procedure_call(name, params.len());
        self.execute(&sql, params)
    }

    fn ensure_result(&self) -> Result<()> {
        self.check_open()?;
        if self.stmt.is_none() {
            return Err(Error::interface("No operation issued"));
        }
        if self.description.is_none() {
            return Err(Error::interface("No results to fetch"));
        }
        Ok(())
    }

    /// The next row, or `None` at the end of the result.
    pub fn fetchone(&mut self) -> Result<Option<Row>> {
        self.ensure_result()?;
        match self.stmt.as_mut() {
            Some(stmt) => stmt.next_row(&self.columns),
            None => Ok(None),
        }
    }

    /// Up to `size` rows (default: `arraysize`).
    pub fn fetchmany(&mut self, size: Option<usize>) -> Result<Vec<Row>> {
        self.ensure_result()?;
        let size = size.unwrap_or(self.arraysize);
        let mut rows = Vec::new();
        while rows.len() < size {
            match self.fetchone()? {
                Some(row) => rows.push(row),
                None => break,
            }
        }
        Ok(rows)
    }

    /// All remaining rows.
    pub fn fetchall(&mut self) -> Result<Vec<Row>> {
        self.ensure_result()?;
        let mut rows = Vec::new();
        while let Some(row) = self.fetchone()? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Iterate over the remaining rows.
    pub fn rows(&mut self) -> Rows<'_, 'c> {
        Rows {
            cursor: self,
            done: false,
        }
    }

    /// Close the cursor. Rolls back the connection's open transaction the
    /// first time; later calls do nothing.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        tracing::debug!("Closing cursor");
        let result = self.conn.rollback_on_close();
        self.reset();
        self.closed = true;
        result
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Columns of the current result set, `None` if the last statement
    /// produced none.
    pub fn description(&self) -> Result<Option<&[ColumnDescription]>> {
        self.check_open()?;
        Ok(self.description.as_deref())
    }

    /// Rows produced or affected by the last execute, `-1` if unknown.
    pub fn rowcount(&self) -> Result<i64> {
        self.check_open()?;
        Ok(self.rowcount)
    }

    pub fn arraysize(&self) -> usize {
        self.arraysize
    }

    pub fn set_arraysize(&mut self, arraysize: usize) {
        self.arraysize = arraysize;
    }
}

impl fmt::Debug for Cursor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("closed", &self.closed)
            .field("prepared", &self.stmt.is_some())
            .field("description", &self.description)
            .field("rowcount", &self.rowcount)
            .field("arraysize", &self.arraysize)
            .finish_non_exhaustive()
    }
}

fn procedure_call(name: &str, params: usize) -> String {
    format!("EXECUTE PROCEDURE {name}({})", vec!["?"; params].join(","))
}

/// Iterator returned by [`Cursor::rows`]. Stops after the first error.
pub struct Rows<'a, 'c> {
    cursor: &'a mut Cursor<'c>,
    done: bool,
}

impl Iterator for Rows<'_, '_> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.cursor.fetchone() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn procedure_call_shape() {
        assert_eq!(procedure_call("sp_mgGetInstallInfo", 0), "EXECUTE PROCEDURE sp_mgGetInstallInfo()");
        assert_eq!(procedure_call("p", 3), "EXECUTE PROCEDURE p(?,?,?)");
    }
}
