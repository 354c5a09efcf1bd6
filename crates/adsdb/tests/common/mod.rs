//! Scripted in-memory engine for driver tests.
//!
//! Each `prepare` consumes the next [`Script`] from the queue (or an empty
//! one). All calls are recorded in a shared [`State`] the test inspects
//! afterwards.

#![allow(dead_code, unsafe_code)]

use std::cell::{RefCell, RefMut};
use std::collections::{HashMap, VecDeque};
use std::ffi::{CStr, c_void};
use std::ptr::NonNull;
use std::rc::Rc;

use adsdb::{
    AceApi, BindParam, ConnHandle, DataType, Direction, Environment, NativeColumnInfo,
    NativeType, NativeValue, StmtHandle,
};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// What one prepared statement does.
#[derive(Debug, Clone, Default)]
pub struct Script {
    pub num_params: i32,
    pub param_types: Vec<DataType>,
    pub columns: Vec<NativeColumnInfo>,
    pub num_cols: Option<i32>,
    pub rows: Vec<Vec<NativeValue>>,
    pub num_rows: i32,
    pub affected_rows: i32,
    pub prepare_error: Option<(i32, String)>,
    pub execute_error: Option<(i32, String)>,
    pub column_info_error: bool,
}

impl Script {
    /// A statement returning `rows`.
    pub fn query(columns: Vec<NativeColumnInfo>, rows: Vec<Vec<NativeValue>>) -> Self {
        let num_rows = i32::try_from(rows.len()).unwrap();
        Self {
            columns,
            rows,
            num_rows,
            ..Self::default()
        }
    }

    /// A statement changing `affected` rows.
    pub fn update(affected: i32) -> Self {
        Self {
            affected_rows: affected,
            ..Self::default()
        }
    }

    pub fn params(mut self, n: i32) -> Self {
        self.num_params = n;
        self
    }

    pub fn param_types(mut self, types: &[DataType]) -> Self {
        self.num_params = i32::try_from(types.len()).unwrap();
        self.param_types = types.to_vec();
        self
    }

    pub fn num_rows(mut self, n: i32) -> Self {
        self.num_rows = n;
        self
    }

    pub fn fail_prepare(mut self, code: i32, message: &str) -> Self {
        self.prepare_error = Some((code, message.to_string()));
        self
    }

    pub fn fail_execute(mut self, code: i32, message: &str) -> Self {
        self.execute_error = Some((code, message.to_string()));
        self
    }
}

pub fn column(name: &str, data_type: DataType, native_type: NativeType, max_size: u32) -> NativeColumnInfo {
    NativeColumnInfo {
        name: name.to_string(),
        data_type: data_type.as_raw(),
        native_type,
        precision: u16::try_from(max_size).unwrap_or(u16::MAX),
        scale: 0,
        max_size,
        nullable: true,
    }
}

pub fn int(v: i32) -> NativeValue {
    NativeValue::new(DataType::Val32, v.to_ne_bytes())
}

pub fn text(s: &str) -> NativeValue {
    NativeValue::new(DataType::String, s.as_bytes())
}

/// A parameter as the engine saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bound {
    pub index: u32,
    pub data_type: DataType,
    pub bytes: Vec<u8>,
    pub length: u32,
    pub is_null: bool,
}

struct Active {
    script: Script,
    position: usize,
    // Raw views of the caller's buffers, read again at execute time.
    bound: Vec<(u32, *const u8, usize)>,
}

#[derive(Default)]
pub struct State {
    pub offered_version: Option<u32>,
    pub init_calls: usize,
    pub fini_calls: usize,

    pub new_connection_fails: bool,
    pub connect_error: Option<(i32, String)>,
    pub disconnect_error: Option<(i32, String)>,
    pub commit_error: Option<(i32, String)>,
    pub rollback_error: Option<(i32, String)>,
    pub connect_targets: Vec<String>,
    pub connections_allocated: usize,
    pub connections_freed: usize,
    pub disconnects: usize,
    pub commits: usize,
    pub rollbacks: usize,

    pub scripts: VecDeque<Script>,
    pub prepared: Vec<String>,
    pub statements_freed: usize,
    pub bound: Vec<Bound>,
    /// Buffer contents read through the bound pointers at execute time.
    pub executed: Vec<Vec<Vec<u8>>>,
    pub fetch_calls: usize,

    last_error: (i32, String),
    next_id: usize,
    active: HashMap<usize, Active>,
}

impl State {
    fn fail(&mut self, error: &(i32, String)) {
        self.last_error = error.clone();
    }

    fn next_handle(&mut self) -> NonNull<c_void> {
        self.next_id += 1;
        // Non-zero fake address, only used as a map key.
        NonNull::new(std::ptr::without_provenance_mut(self.next_id * 8)).unwrap()
    }

    fn active(&mut self, stmt: StmtHandle) -> &mut Active {
        self.active
            .get_mut(&stmt.as_ptr().addr())
            .expect("statement is not live")
    }
}

#[derive(Clone, Default)]
pub struct MockAce {
    state: Rc<RefCell<State>>,
}

impl MockAce {
    pub fn new() -> Self {
        let mock = Self::default();
        mock.state().offered_version = Some(1);
        mock
    }

    pub fn state(&self) -> RefMut<'_, State> {
        self.state.borrow_mut()
    }

    pub fn push(&self, script: Script) -> &Self {
        self.state().scripts.push_back(script);
        self
    }

    /// A live environment over this engine.
    pub fn environment(&self) -> Environment {
        Environment::new(self.clone()).unwrap()
    }
}

impl AceApi for MockAce {
    fn init(&self, _app_name: &CStr, _api_version: u32) -> Option<u32> {
        let mut s = self.state();
        s.init_calls += 1;
        s.offered_version
    }

    fn fini(&self) {
        self.state().fini_calls += 1;
    }

    fn new_connection(&self) -> Option<ConnHandle> {
        let mut s = self.state();
        if s.new_connection_fails {
            s.fail(&(6303, "Out of memory".to_string()));
            return None;
        }
        s.connections_allocated += 1;
        Some(ConnHandle::from_ptr(s.next_handle()))
    }

    fn free_connection(&self, _conn: ConnHandle) {
        self.state().connections_freed += 1;
    }

    fn connect(&self, _conn: ConnHandle, target: &CStr) -> bool {
        let mut s = self.state();
        s.connect_targets.push(target.to_string_lossy().into_owned());
        match s.connect_error.clone() {
            Some(err) => {
                s.fail(&err);
                false
            }
            None => true,
        }
    }

    fn disconnect(&self, _conn: ConnHandle) -> bool {
        let mut s = self.state();
        s.disconnects += 1;
        match s.disconnect_error.clone() {
            Some(err) => {
                s.fail(&err);
                false
            }
            None => true,
        }
    }

    fn commit(&self, _conn: ConnHandle) -> bool {
        let mut s = self.state();
        s.commits += 1;
        match s.commit_error.clone() {
            Some(err) => {
                s.fail(&err);
                false
            }
            None => true,
        }
    }

    fn rollback(&self, _conn: ConnHandle) -> bool {
        let mut s = self.state();
        s.rollbacks += 1;
        match s.rollback_error.clone() {
            Some(err) => {
                s.fail(&err);
                false
            }
            None => true,
        }
    }

    fn error(&self, _conn: Option<ConnHandle>, buffer: &mut [u8]) -> i32 {
        let s = self.state();
        let (code, message) = &s.last_error;
        let n = message.len().min(buffer.len().saturating_sub(1));
        buffer[..n].copy_from_slice(&message.as_bytes()[..n]);
        if n < buffer.len() {
            buffer[n] = 0;
        }
        *code
    }

    fn prepare(&self, _conn: ConnHandle, sql: &[u8], unicode: bool) -> Option<StmtHandle> {
        assert!(unicode);
        assert_eq!(&sql[..2], &[0xFF, 0xFE], "missing BOM");
        assert_eq!(&sql[sql.len() - 2..], &[0, 0], "missing terminator");
        let units: Vec<u16> = sql[2..sql.len() - 2]
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();

        let mut s = self.state();
        s.prepared.push(String::from_utf16(&units).unwrap());
        let script = s.scripts.pop_front().unwrap_or_default();
        if let Some(err) = &script.prepare_error {
            s.fail(err);
            return None;
        }
        let handle = s.next_handle();
        s.active.insert(
            handle.as_ptr().addr(),
            Active {
                script,
                position: 0,
                bound: Vec::new(),
            },
        );
        Some(StmtHandle::from_ptr(handle))
    }

    fn free_stmt(&self, stmt: StmtHandle) {
        let mut s = self.state();
        s.active.remove(&stmt.as_ptr().addr());
        s.statements_freed += 1;
    }

    fn num_params(&self, stmt: StmtHandle) -> i32 {
        self.state().active(stmt).script.num_params
    }

    fn describe_bind_param(&self, stmt: StmtHandle, index: u32) -> Option<BindParam> {
        let mut s = self.state();
        let (num_params, described) = {
            let script = &s.active(stmt).script;
            (script.num_params, script.param_types.get(index as usize).copied())
        };
        if i64::from(index) >= i64::from(num_params) {
            s.fail(&(5016, format!("Invalid parameter index {index}")));
            return None;
        }
        let data_type = described.unwrap_or(DataType::Invalid);
        Some(BindParam::new(Direction::Input, data_type, None))
    }

    unsafe fn bind_param(&self, stmt: StmtHandle, index: u32, param: &mut BindParam) -> bool {
        let mut s = self.state();
        s.bound.push(Bound {
            index,
            data_type: param.data_type,
            bytes: param.buffer().to_vec(),
            length: param.length(),
            is_null: param.is_null(),
        });
        let view = (index, param.buffer().as_ptr(), param.buffer().len());
        s.active(stmt).bound.push(view);
        true
    }

    fn execute(&self, stmt: StmtHandle) -> bool {
        let mut s = self.state();
        let (scripted, missing) = {
            let active = s.active(stmt);
            let declared = usize::try_from(active.script.num_params).unwrap_or(0);
            (active.script.execute_error.clone(), active.bound.len() < declared)
        };
        if let Some(err) = scripted {
            s.fail(&err);
            return false;
        }
        if missing {
            s.fail(&(7200, "Error 7200: AQE Error: State = 07002; NativeError = 2101; parameter not bound".to_string()));
            return false;
        }
        let active = s.active(stmt);
        // SAFETY: the driver promises the buffers outlive the statement
        let snapshot: Vec<Vec<u8>> = active
            .bound
            .iter()
            .map(|&(_, ptr, len)| unsafe { std::slice::from_raw_parts(ptr, len) }.to_vec())
            .collect();
        active.position = 0;
        s.executed.push(snapshot);
        true
    }

    fn affected_rows(&self, stmt: StmtHandle) -> i32 {
        self.state().active(stmt).script.affected_rows
    }

    fn num_cols(&self, stmt: StmtHandle) -> i32 {
        let mut s = self.state();
        let (forced, described) = {
            let script = &s.active(stmt).script;
            (script.num_cols, script.columns.len())
        };
        match forced {
            Some(n) => {
                if n < 0 {
                    s.fail(&(5034, "Statement has no result description".to_string()));
                }
                n
            }
            None => i32::try_from(described).unwrap(),
        }
    }

    fn num_rows(&self, stmt: StmtHandle) -> i32 {
        self.state().active(stmt).script.num_rows
    }

    fn get_column_info(&self, stmt: StmtHandle, index: u32) -> Option<NativeColumnInfo> {
        let mut s = self.state();
        let (failing, info) = {
            let script = &s.active(stmt).script;
            (script.column_info_error, script.columns.get(index as usize).cloned())
        };
        if failing {
            s.fail(&(5035, "Column information unavailable".to_string()));
            return None;
        }
        info
    }

    fn fetch_next(&self, stmt: StmtHandle) -> bool {
        let mut s = self.state();
        s.fetch_calls += 1;
        let active = s.active(stmt);
        if active.position < active.script.rows.len() {
            active.position += 1;
            true
        } else {
            false
        }
    }

    fn get_column(&self, stmt: StmtHandle, index: u32) -> Option<NativeValue> {
        let mut s = self.state();
        let active = s.active(stmt);
        let row = active.script.rows.get(active.position.checked_sub(1)?)?;
        row.get(index as usize).cloned()
    }
}
