//! Error types shared by every wrapper type.
//!
//! Engine failures carry the engine's extended result code and message.
//! Wrapper-logic failures (contract violations such as stepping an
//! exhausted statement) are reported through the same [`Error`] type and
//! answer [`LOGIC_ERROR_CODE`] from [`Error::code`].

use std::ffi::CStr;
use std::os::raw::c_int;

use rusqlite::ffi;
use thiserror::Error;

/// Code reported by [`Error::code`] for wrapper-logic errors.
pub const LOGIC_ERROR_CODE: i32 = -1;

/// Alias for `Result<T, Error>`.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors produced by connections, statements, transactions and functions.
#[derive(Error, Debug)]
pub enum Error {
    /// The engine reported a failure.
    #[error("{message} (code {code})")]
    Sqlite { code: i32, message: String },

    /// The caller broke a wrapper contract.
    #[error("{0}")]
    Misuse(#[from] Misuse),

    /// A text value did not hold valid UTF-8.
    #[error("invalid UTF-8 in text value: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// A name or path contained an interior NUL byte.
    #[error("string contains an interior NUL byte: {0}")]
    Nul(#[from] std::ffi::NulError),
}

/// Wrapper-logic contract violations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Misuse {
    #[error("statement is not prepared")]
    NotPrepared,

    #[error("statement already done")]
    Exhausted,

    #[error("no current row")]
    NoRow,

    #[error("column index {index} out of range ({count} columns)")]
    ColumnOutOfRange { index: usize, count: usize },

    #[error("parameter index {index} out of range ({count} parameters)")]
    ParameterOutOfRange { index: usize, count: usize },

    #[error("argument index {index} out of range ({count} arguments)")]
    ArgumentOutOfRange { index: usize, count: usize },

    #[error("expected {expected} parameters, got {actual}")]
    ParameterCount { expected: usize, actual: usize },

    #[error("transaction already finished")]
    TransactionFinished,

    #[error("a transaction is already active on this connection")]
    TransactionActive,

    #[error("database path is not valid UTF-8")]
    InvalidPath,
}

/// Classification of a primary engine result code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Busy,
    Locked,
    NoMemory,
    Misuse,
    Constraint,
    Range,
    ReadOnly,
    CantOpen,
    TooBig,
    /// Wrapper-logic error, not reported by the engine.
    Logic,
    Other,
}

impl ErrorKind {
    /// Maps an engine result code (primary or extended) to its kind.
    pub fn from_code(code: i32) -> Self {
        match code & 0xff {
            ffi::SQLITE_BUSY => ErrorKind::Busy,
            ffi::SQLITE_LOCKED => ErrorKind::Locked,
            ffi::SQLITE_NOMEM => ErrorKind::NoMemory,
            ffi::SQLITE_MISUSE => ErrorKind::Misuse,
            ffi::SQLITE_CONSTRAINT => ErrorKind::Constraint,
            ffi::SQLITE_RANGE => ErrorKind::Range,
            ffi::SQLITE_READONLY => ErrorKind::ReadOnly,
            ffi::SQLITE_CANTOPEN => ErrorKind::CantOpen,
            ffi::SQLITE_TOOBIG => ErrorKind::TooBig,
            _ => ErrorKind::Other,
        }
    }

    /// Fixed message rendered for errors built from a bare code.
    pub fn message(self) -> &'static str {
        match self {
            ErrorKind::Busy => "database is busy",
            ErrorKind::Locked => "database table is locked",
            ErrorKind::NoMemory => "out of memory",
            ErrorKind::Misuse => "library routine called out of sequence",
            ErrorKind::Constraint => "constraint failed",
            ErrorKind::Range => "bind or column index out of range",
            ErrorKind::ReadOnly => "attempt to write a readonly database",
            ErrorKind::CantOpen => "unable to open database file",
            ErrorKind::TooBig => "string or blob too big",
            ErrorKind::Logic => "wrapper logic error",
            ErrorKind::Other => "general error",
        }
    }
}

impl Error {
    /// Builds an engine error from a bare result code, without a handle to
    /// ask for a diagnostic.
    pub fn from_code(code: i32) -> Self {
        Error::Sqlite {
            code,
            message: ErrorKind::from_code(code).message().to_string(),
        }
    }

    /// Reads the most recent error recorded on `db`.
    ///
    /// `rc` is the result code of the failed call. It is used when the
    /// handle does not carry an error of its own.
    ///
    /// # Safety
    /// `db` must be a live connection handle (or null).
    pub(crate) unsafe fn from_handle(db: *mut ffi::sqlite3, rc: c_int) -> Self {
        if db.is_null() {
            return Error::from_code(rc);
        }
        let code = ffi::sqlite3_extended_errcode(db);
        if code == ffi::SQLITE_OK {
            return Error::from_code(rc);
        }
        let message = ffi::sqlite3_errmsg(db);
        let message = if message.is_null() {
            ErrorKind::from_code(code).message().to_string()
        } else {
            CStr::from_ptr(message).to_string_lossy().into_owned()
        };
        Error::Sqlite { code, message }
    }

    /// Engine code (extended), or [`LOGIC_ERROR_CODE`] for wrapper errors.
    pub fn code(&self) -> i32 {
        match self {
            Error::Sqlite { code, .. } => *code,
            _ => LOGIC_ERROR_CODE,
        }
    }

    /// Primary engine code (the low byte of the extended code).
    pub fn primary_code(&self) -> i32 {
        match self {
            Error::Sqlite { code, .. } => code & 0xff,
            _ => LOGIC_ERROR_CODE,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Sqlite { code, .. } => ErrorKind::from_code(*code),
            _ => ErrorKind::Logic,
        }
    }

    /// Message without the code suffix.
    pub fn message(&self) -> String {
        match self {
            Error::Sqlite { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.kind() == ErrorKind::Busy
    }

    /// Returns the contract violation, if this is one.
    pub fn misuse(&self) -> Option<&Misuse> {
        match self {
            Error::Misuse(misuse) => Some(misuse),
            _ => None,
        }
    }
}
