use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_void;
use std::path::Path;
use std::ptr::{self, NonNull};

use rusqlite::ffi;
use tracing::{debug, error};

use crate::busy::{busy_callback, BusyPolicy};
use crate::config::ConnectionConfig;
use crate::error::{Error, Misuse, Result};
use crate::function::{call_scalar, Function};
use crate::statement::{DataSource, Statement};
use crate::transaction::{Transaction, TransactionKind};

/// An open database handle.
///
/// The connection owns its busy policy and every registered function.
/// It may be moved to another thread but not shared between threads;
/// statements borrow it and cannot outlive it.
pub struct Connection {
    raw: NonNull<ffi::sqlite3>,
    path: String,
    // Boxed so its address stays fixed while the engine holds it.
    busy: Box<BusyPolicy>,
    functions: RefCell<Vec<Box<Function>>>,
    open: bool,
}

// The handle is opened in multi-thread mode, so it may change threads
// as long as it is never used from two at once. `RefCell` keeps the type
// `!Sync`.
unsafe impl Send for Connection {}

impl Connection {
    /// Opens (creating if needed) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_str().ok_or(Misuse::InvalidPath)?;
        Self::open_with_config(&ConnectionConfig::new(path))
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::open_with_config(&ConnectionConfig::in_memory())
    }

    /// Opens a private on-disk database that the engine deletes on close.
    pub fn open_temporary() -> Result<Self> {
        Self::open_with_config(&ConnectionConfig::temporary())
    }

    pub fn open_with_config(config: &ConnectionConfig) -> Result<Self> {
        let c_path = CString::new(config.path.as_str())?;
        let mut db = ptr::null_mut();
        let rc = unsafe {
            ffi::sqlite3_open_v2(c_path.as_ptr(), &mut db, config.open_flags(), ptr::null())
        };
        if rc != ffi::SQLITE_OK {
            let err = unsafe { Error::from_handle(db, rc) };
            if !db.is_null() {
                unsafe { ffi::sqlite3_close(db) };
            }
            return Err(err);
        }
        let raw = NonNull::new(db).ok_or_else(|| Error::from_code(ffi::SQLITE_NOMEM))?;
        let connection = Self {
            raw,
            path: config.path.clone(),
            busy: Box::new(config.busy),
            functions: RefCell::new(Vec::new()),
            open: true,
        };
        connection.install_busy_handler()?;
        debug!(path = %connection.path, read_only = config.read_only, "database opened");
        Ok(connection)
    }

    fn install_busy_handler(&self) -> Result<()> {
        let policy = &*self.busy as *const BusyPolicy as *mut c_void;
        let rc = unsafe { ffi::sqlite3_busy_handler(self.raw(), Some(busy_callback), policy) };
        self.check(rc)
    }

    pub(crate) fn raw(&self) -> *mut ffi::sqlite3 {
        self.raw.as_ptr()
    }

    /// The path this connection was opened with.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn busy_policy(&self) -> BusyPolicy {
        *self.busy
    }

    pub fn set_busy_policy(&mut self, policy: BusyPolicy) {
        *self.busy = policy;
    }

    /// Closes the handle, then releases the registered functions.
    pub fn close(mut self) -> Result<()> {
        self.close_handle()
    }

    fn close_handle(&mut self) -> Result<()> {
        if !self.open {
            return Ok(());
        }
        let rc = unsafe { ffi::sqlite3_close(self.raw()) };
        if rc != ffi::SQLITE_OK {
            return Err(unsafe { Error::from_handle(self.raw(), rc) });
        }
        self.open = false;
        self.functions.get_mut().clear();
        debug!(path = %self.path, "database closed");
        Ok(())
    }

    pub fn prepare(&self, sql: &str) -> Result<Statement<'_>> {
        Statement::new(self, sql)
    }

    /// Prepares `sql`, steps it once and discards it. Text after the
    /// first statement is ignored.
    pub fn execute(&self, sql: &str) -> Result<()> {
        self.prepare(sql)?.execute()
    }

    /// Runs every statement in `sql`, stepping each to completion.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        let mut remaining = sql.to_string();
        while !remaining.trim().is_empty() {
            let mut stmt = self.prepare(&remaining)?;
            while stmt.step()? {}
            remaining = stmt.tail().to_string();
        }
        Ok(())
    }

    /// Prepares `sql` and runs it once per item of `source` inside one
    /// transaction.
    pub fn execute_many<S>(&self, sql: &str, source: &mut S, kind: TransactionKind) -> Result<usize>
    where
        S: DataSource + ?Sized,
    {
        self.prepare(sql)?.execute_many(source, kind)
    }

    /// Begins an `IMMEDIATE` transaction.
    pub fn transaction(&self) -> Result<Transaction<'_>> {
        Transaction::begin(self, TransactionKind::default())
    }

    pub fn transaction_with(&self, kind: TransactionKind) -> Result<Transaction<'_>> {
        Transaction::begin(self, kind)
    }

    pub fn in_transaction(&self) -> bool {
        unsafe { ffi::sqlite3_get_autocommit(self.raw()) == 0 }
    }

    pub fn last_insert_id(&self) -> i64 {
        unsafe { ffi::sqlite3_last_insert_rowid(self.raw()) }
    }

    /// Rows modified by the most recent INSERT, UPDATE or DELETE.
    pub fn changes(&self) -> u64 {
        unsafe { ffi::sqlite3_changes(self.raw()) as u64 }
    }

    /// Installs `function`. The connection owns it until close.
    ///
    /// A second registration with the same name and arity is rejected and
    /// the first stays in place.
    pub fn register_function(&self, function: Function) -> Result<()> {
        if self
            .functions
            .borrow()
            .iter()
            .any(|existing| existing.same_signature(&function))
        {
            return Err(Error::Sqlite {
                code: ffi::SQLITE_ERROR,
                message: format!(
                    "function {}/{} is already registered",
                    function.name(),
                    function.arity()
                ),
            });
        }
        let name = CString::new(function.name())?;
        let function = Box::new(function);
        let user_data = &*function as *const Function as *mut c_void;
        let rc = unsafe {
            ffi::sqlite3_create_function_v2(
                self.raw(),
                name.as_ptr(),
                function.arity(),
                function.text_flags(),
                user_data,
                Some(call_scalar),
                None,
                None,
                None,
            )
        };
        // On failure `function` is dropped here.
        self.check(rc)?;
        debug!(path = %self.path, function = function.name(), arity = function.arity(), "function registered");
        self.functions.borrow_mut().push(function);
        Ok(())
    }

    fn check(&self, rc: i32) -> Result<()> {
        if rc == ffi::SQLITE_OK {
            Ok(())
        } else {
            Err(unsafe { Error::from_handle(self.raw(), rc) })
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Err(err) = self.close_handle() {
            error!(path = %self.path, error = %err, "failed to close database");
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("path", &self.path)
            .field("functions", &self.functions.borrow().len())
            .finish()
    }
}
