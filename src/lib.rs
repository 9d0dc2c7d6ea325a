//! Thin RAII wrapper over the SQLite C interface.
//!
//! # Intention
//!
//! - Own connection handles, prepared statements, transactions and scalar
//!   functions in types that release their engine resources on drop.
//! - Report every failure as an [`Error`] carrying the engine's code and
//!   message, or a wrapper-logic sentinel code.
//! - Turn short write contention into a bounded, configurable retry loop
//!   ([`BusyPolicy`]).
//!
//! # Architectural Boundaries
//!
//! - Query planning, storage, locking and the SQL dialect belong to the
//!   engine, reached through `rusqlite::ffi`. Nothing here reimplements
//!   them.
//! - No locking of its own: a [`Connection`] may move between threads but
//!   must not be shared.
//!
//! # Example
//!
//! ```
//! use sqlite_veneer::{Cell, Connection};
//!
//! let conn = Connection::open_in_memory()?;
//! conn.execute("CREATE TABLE t (id INTEGER PRIMARY KEY, value TEXT)")?;
//!
//! let mut insert = conn.prepare("INSERT INTO t VALUES (?, ?)")?;
//! for (id, value) in [(1, "a"), (2, "b")] {
//!     insert.bind(1, &id)?;
//!     insert.bind(2, value)?;
//!     insert.execute()?;
//! }
//!
//! let mut select = conn.prepare("SELECT value FROM t WHERE id = ?")?;
//! select.bind(1, &1)?;
//! assert!(select.step()?);
//! assert_eq!(select.value(0)?.as_str()?, "a");
//! # Ok::<_, sqlite_veneer::Error>(())
//! ```

pub mod busy;
pub mod cell;
pub mod config;
pub mod connection;
pub mod error;
pub mod function;
pub mod statement;
pub mod transaction;
pub mod value;

pub use busy::{BusyAction, BusyPolicy};
pub use cell::{Argument, Cell, Column, FromCell};
pub use config::{ConnectionConfig, MEMORY_PATH, TEMPORARY_PATH};
pub use connection::Connection;
pub use error::{Error, ErrorKind, Misuse, Result, LOGIC_ERROR_CODE};
pub use function::{Arguments, Function, ScalarFunction};
pub use statement::{from_fn, DataSource, FnSource, ParamRows, State, Statement};
pub use transaction::{Transaction, TransactionKind};
pub use value::{Bind, Null, StorageClass, Value, ValueRef};

/// Version string of the linked SQLite library.
pub fn sqlite_version() -> &'static str {
    unsafe { std::ffi::CStr::from_ptr(rusqlite::ffi::sqlite3_libversion()) }
        .to_str()
        .unwrap_or("unknown")
}
