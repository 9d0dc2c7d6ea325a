use serde::{Deserialize, Serialize};

use crate::busy::BusyPolicy;

/// Path given to the engine for a private in-memory database.
pub const MEMORY_PATH: &str = ":memory:";

/// Path given to the engine for a private on-disk temporary database.
pub const TEMPORARY_PATH: &str = "";

/// Options used to open a [`Connection`](crate::Connection).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Path to the database file, or one of the sentinels above.
    pub path: String,
    /// Open without write access.
    #[serde(default)]
    pub read_only: bool,
    /// Create the file when it does not exist. Ignored when `read_only`.
    #[serde(default = "default_create")]
    pub create: bool,
    /// Retry policy installed on the handle.
    #[serde(default)]
    pub busy: BusyPolicy,
}

const fn default_create() -> bool {
    true
}

impl ConnectionConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            read_only: false,
            create: true,
            busy: BusyPolicy::default(),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MEMORY_PATH)
    }

    pub fn temporary() -> Self {
        Self::new(TEMPORARY_PATH)
    }

    pub fn with_busy_policy(mut self, busy: BusyPolicy) -> Self {
        self.busy = busy;
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn create(mut self, create: bool) -> Self {
        self.create = create;
        self
    }

    pub(crate) fn open_flags(&self) -> i32 {
        use rusqlite::ffi;

        let access = if self.read_only {
            ffi::SQLITE_OPEN_READONLY
        } else if self.create {
            ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_CREATE
        } else {
            ffi::SQLITE_OPEN_READWRITE
        };
        access | ffi::SQLITE_OPEN_NOMUTEX | ffi::SQLITE_OPEN_URI
    }
}
