//! Prepared statements and their execution state machine.
//!
//! ```text
//! Finalized --prepare--> Ready --step--> Row --step--> ... --step--> Done
//!                          ^                                          |
//!                          +------------------reset-------------------+
//! ```
//!
//! Bindings survive `reset`. `finalize` returns to `Finalized` from any
//! state, and `prepare` compiles the SQL text again.

use std::ffi::CString;
use std::os::raw::{c_char, c_int};
use std::ptr;

use rusqlite::ffi;
use tracing::trace;

use crate::cell::{Column, FromCell};
use crate::connection::Connection;
use crate::error::{Error, Misuse, Result};
use crate::transaction::{Transaction, TransactionKind};
use crate::value::{Bind, ValueRef};

/// Execution state of a [`Statement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// No compiled statement is held.
    Finalized,
    /// Compiled and ready to step.
    Ready,
    /// A result row is current.
    Row,
    /// Execution completed; a reset is required before stepping again.
    Done,
}

/// A compiled SQL statement borrowed from its [`Connection`].
pub struct Statement<'conn> {
    conn: &'conn Connection,
    raw: *mut ffi::sqlite3_stmt,
    sql: String,
    tail: String,
    state: State,
}

impl<'conn> Statement<'conn> {
    pub(crate) fn new(conn: &'conn Connection, sql: &str) -> Result<Self> {
        let mut stmt = Self {
            conn,
            raw: ptr::null_mut(),
            sql: sql.to_string(),
            tail: String::new(),
            state: State::Finalized,
        };
        stmt.prepare()?;
        Ok(stmt)
    }

    /// Compiles the SQL text, finalizing any previous compilation first.
    pub fn prepare(&mut self) -> Result<()> {
        self.finalize();
        let len = c_int::try_from(self.sql.len())
            .map_err(|_| Error::from_code(ffi::SQLITE_TOOBIG))?;
        let head = self.sql.as_ptr() as *const c_char;
        let mut raw = ptr::null_mut();
        let mut tail: *const c_char = ptr::null();
        let rc = unsafe { ffi::sqlite3_prepare_v2(self.conn.raw(), head, len, &mut raw, &mut tail) };
        if rc != ffi::SQLITE_OK {
            return Err(unsafe { Error::from_handle(self.conn.raw(), rc) });
        }
        self.raw = raw;
        self.tail = if tail.is_null() {
            String::new()
        } else {
            let consumed = tail as usize - head as usize;
            self.sql.get(consumed..).unwrap_or_default().to_string()
        };
        self.state = State::Ready;
        trace!(sql = %self.sql, "statement prepared");
        Ok(())
    }

    /// Releases the compiled statement. Calling it again is a no-op.
    pub fn finalize(&mut self) {
        if !self.raw.is_null() {
            unsafe { ffi::sqlite3_finalize(self.raw) };
            self.raw = ptr::null_mut();
        }
        self.state = State::Finalized;
    }

    /// Rewinds to `Ready`, keeping bound parameters.
    pub fn reset(&mut self) -> Result<()> {
        self.ensure_prepared()?;
        if !self.raw.is_null() {
            // The return code repeats the last step's error, which has
            // already been reported by `step`.
            unsafe { ffi::sqlite3_reset(self.raw) };
        }
        self.state = State::Ready;
        Ok(())
    }

    pub fn clear_bindings(&mut self) -> Result<()> {
        self.ensure_prepared()?;
        if !self.raw.is_null() {
            unsafe { ffi::sqlite3_clear_bindings(self.raw) };
        }
        Ok(())
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_prepared(&self) -> bool {
        self.state != State::Finalized
    }

    pub fn has_row(&self) -> bool {
        self.state == State::Row
    }

    pub fn is_exhausted(&self) -> bool {
        self.state == State::Done
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// SQL text left over after the first statement.
    pub fn tail(&self) -> &str {
        &self.tail
    }

    pub fn has_tail(&self) -> bool {
        !self.tail.trim().is_empty()
    }

    pub fn connection(&self) -> &'conn Connection {
        self.conn
    }

    pub fn parameter_count(&self) -> usize {
        if self.raw.is_null() {
            return 0;
        }
        unsafe { ffi::sqlite3_bind_parameter_count(self.raw) as usize }
    }

    /// 1-based index of a named parameter such as `:name`.
    pub fn parameter_index(&self, name: &str) -> Result<Option<usize>> {
        self.ensure_prepared()?;
        if self.raw.is_null() {
            return Ok(None);
        }
        let name = CString::new(name)?;
        let index = unsafe { ffi::sqlite3_bind_parameter_index(self.raw, name.as_ptr()) };
        Ok((index > 0).then_some(index as usize))
    }

    /// Binds `value` at the 1-based parameter `index`. Text and blobs are
    /// copied by the engine.
    pub fn bind<T: Bind + ?Sized>(&mut self, index: usize, value: &T) -> Result<()> {
        self.ensure_prepared()?;
        let count = self.parameter_count();
        if index == 0 || index > count {
            return Err(Misuse::ParameterOutOfRange { index, count }.into());
        }
        let index = index as c_int;
        let rc = unsafe {
            match value.to_value_ref() {
                ValueRef::Null => ffi::sqlite3_bind_null(self.raw, index),
                ValueRef::Integer(v) => ffi::sqlite3_bind_int64(self.raw, index, v),
                ValueRef::Real(v) => ffi::sqlite3_bind_double(self.raw, index, v),
                ValueRef::Text(v) => {
                    let len = length(v.len())?;
                    ffi::sqlite3_bind_text(
                        self.raw,
                        index,
                        v.as_ptr() as *const c_char,
                        len,
                        ffi::SQLITE_TRANSIENT(),
                    )
                }
                ValueRef::Blob(v) => {
                    let len = length(v.len())?;
                    ffi::sqlite3_bind_blob(
                        self.raw,
                        index,
                        v.as_ptr() as *const _,
                        len,
                        ffi::SQLITE_TRANSIENT(),
                    )
                }
            }
        };
        self.check(rc)
    }

    /// Binds every parameter positionally, starting at index 1.
    pub fn bind_all(&mut self, params: &[&dyn Bind]) -> Result<()> {
        let expected = self.parameter_count();
        if params.len() != expected {
            return Err(Misuse::ParameterCount {
                expected,
                actual: params.len(),
            }
            .into());
        }
        for (offset, param) in params.iter().enumerate() {
            self.bind(offset + 1, *param)?;
        }
        Ok(())
    }

    /// Advances execution. Returns `true` when a row is available.
    pub fn step(&mut self) -> Result<bool> {
        match self.state {
            State::Finalized => return Err(Misuse::NotPrepared.into()),
            State::Done => return Err(Misuse::Exhausted.into()),
            State::Ready | State::Row => {}
        }
        if self.raw.is_null() {
            self.state = State::Done;
            return Ok(false);
        }
        trace!(sql = %self.sql, "step");
        match unsafe { ffi::sqlite3_step(self.raw) } {
            ffi::SQLITE_ROW => {
                self.state = State::Row;
                Ok(true)
            }
            ffi::SQLITE_DONE => {
                self.state = State::Done;
                Ok(false)
            }
            rc => {
                self.state = State::Ready;
                Err(unsafe { Error::from_handle(self.conn.raw(), rc) })
            }
        }
    }

    /// Steps once and resets.
    pub fn execute(&mut self) -> Result<()> {
        self.step()?;
        self.reset()
    }

    pub fn column_count(&self) -> usize {
        if self.raw.is_null() {
            return 0;
        }
        unsafe { ffi::sqlite3_column_count(self.raw) as usize }
    }

    pub fn column_name(&self, index: usize) -> Result<&str> {
        self.ensure_prepared()?;
        self.ensure_column(index)?;
        let name = unsafe { ffi::sqlite3_column_name(self.raw, index as c_int) };
        if name.is_null() {
            return Err(Error::from_code(ffi::SQLITE_NOMEM));
        }
        Ok(unsafe { std::ffi::CStr::from_ptr(name) }.to_str()?)
    }

    /// Column `index` (0-based) of the current row.
    pub fn value(&self, index: usize) -> Result<Column<'_>> {
        match self.state {
            State::Row => {}
            State::Finalized => return Err(Misuse::NotPrepared.into()),
            State::Done => return Err(Misuse::Exhausted.into()),
            State::Ready => return Err(Misuse::NoRow.into()),
        }
        self.ensure_column(index)?;
        Ok(Column::new(self.raw, index))
    }

    pub fn get<T: FromCell>(&self, index: usize) -> Result<T> {
        T::from_cell(&self.value(index)?)
    }

    /// Runs the statement once per item of `source` inside a single
    /// transaction. Returns the number of executions.
    ///
    /// Any error rolls back the whole batch.
    pub fn execute_many<S>(&mut self, source: &mut S, kind: TransactionKind) -> Result<usize>
    where
        S: DataSource + ?Sized,
    {
        let mut tx = Transaction::begin(self.conn, kind)?;
        match self.run_batch(source) {
            Ok(count) => {
                tx.commit()?;
                Ok(count)
            }
            Err(err) => {
                // Reset first so the rollback is not blocked by this statement.
                let _ = self.reset();
                drop(tx);
                Err(err)
            }
        }
    }

    fn run_batch<S>(&mut self, source: &mut S) -> Result<usize>
    where
        S: DataSource + ?Sized,
    {
        let mut count = 0;
        while source.bind_next(self)? {
            self.execute()?;
            count += 1;
        }
        Ok(count)
    }

    fn ensure_prepared(&self) -> Result<()> {
        if self.state == State::Finalized {
            return Err(Misuse::NotPrepared.into());
        }
        Ok(())
    }

    fn ensure_column(&self, index: usize) -> Result<()> {
        let count = self.column_count();
        if index >= count {
            return Err(Misuse::ColumnOutOfRange { index, count }.into());
        }
        Ok(())
    }

    fn check(&self, rc: c_int) -> Result<()> {
        if rc == ffi::SQLITE_OK {
            Ok(())
        } else {
            Err(unsafe { Error::from_handle(self.conn.raw(), rc) })
        }
    }
}

impl Drop for Statement<'_> {
    fn drop(&mut self) {
        self.finalize();
    }
}

impl std::fmt::Debug for Statement<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Statement")
            .field("sql", &self.sql)
            .field("state", &self.state)
            .finish()
    }
}

fn length(len: usize) -> Result<c_int> {
    c_int::try_from(len).map_err(|_| Error::from_code(ffi::SQLITE_TOOBIG))
}

/// Supplies parameter sets to [`Statement::execute_many`].
pub trait DataSource {
    /// Binds the next item onto `statement`. Returns `false` when there
    /// are no more items.
    fn bind_next(&mut self, statement: &mut Statement<'_>) -> Result<bool>;
}

/// [`DataSource`] backed by a closure. See [`from_fn`].
pub struct FnSource<F> {
    bind: F,
}

/// Wraps a closure as a [`DataSource`].
pub fn from_fn<F>(bind: F) -> FnSource<F>
where
    F: FnMut(&mut Statement<'_>) -> Result<bool>,
{
    FnSource { bind }
}

impl<F> DataSource for FnSource<F>
where
    F: FnMut(&mut Statement<'_>) -> Result<bool>,
{
    fn bind_next(&mut self, statement: &mut Statement<'_>) -> Result<bool> {
        (self.bind)(statement)
    }
}

/// [`DataSource`] over an iterator of positional parameter rows.
///
/// ```
/// # use sqlite_veneer::{Connection, ParamRows, TransactionKind, Value};
/// let conn = Connection::open_in_memory()?;
/// conn.execute("CREATE TABLE t (id INTEGER, name TEXT)")?;
/// let rows = vec![
///     vec![Value::from(1), Value::from("a")],
///     vec![Value::from(2), Value::from("b")],
/// ];
/// let mut stmt = conn.prepare("INSERT INTO t VALUES (?, ?)")?;
/// let inserted = stmt.execute_many(&mut ParamRows::new(rows), TransactionKind::Immediate)?;
/// assert_eq!(inserted, 2);
/// # Ok::<_, sqlite_veneer::Error>(())
/// ```
pub struct ParamRows<I> {
    rows: I,
}

impl<I> ParamRows<I>
where
    I: Iterator,
{
    pub fn new<T>(rows: T) -> Self
    where
        T: IntoIterator<IntoIter = I>,
    {
        Self {
            rows: rows.into_iter(),
        }
    }
}

impl<I, R, V> DataSource for ParamRows<I>
where
    I: Iterator<Item = R>,
    R: IntoIterator<Item = V>,
    V: Bind,
{
    fn bind_next(&mut self, statement: &mut Statement<'_>) -> Result<bool> {
        let Some(row) = self.rows.next() else {
            return Ok(false);
        };
        for (offset, value) in row.into_iter().enumerate() {
            statement.bind(offset + 1, &value)?;
        }
        Ok(true)
    }
}
