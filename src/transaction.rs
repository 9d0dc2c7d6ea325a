use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::connection::Connection;
use crate::error::{Misuse, Result};

/// Locking behaviour requested by `BEGIN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Deferred,
    #[default]
    Immediate,
    Exclusive,
}

impl TransactionKind {
    pub fn begin_sql(self) -> &'static str {
        match self {
            TransactionKind::Deferred => "BEGIN DEFERRED",
            TransactionKind::Immediate => "BEGIN IMMEDIATE",
            TransactionKind::Exclusive => "BEGIN EXCLUSIVE",
        }
    }
}

/// Scoped transaction. Rolls back on drop unless committed or rolled
/// back explicitly.
///
/// ```
/// # use sqlite_veneer::Connection;
/// let conn = Connection::open_in_memory()?;
/// conn.execute("CREATE TABLE t (id INTEGER)")?;
/// {
///     let _tx = conn.transaction()?;
///     conn.execute("INSERT INTO t VALUES (1)")?;
/// }
/// let mut stmt = conn.prepare("SELECT COUNT(*) FROM t")?;
/// stmt.step()?;
/// assert_eq!(stmt.get::<i64>(0)?, 0);
/// # Ok::<_, sqlite_veneer::Error>(())
/// ```
#[derive(Debug)]
#[must_use = "dropping the guard rolls the transaction back"]
pub struct Transaction<'conn> {
    conn: &'conn Connection,
    kind: TransactionKind,
    finished: bool,
}

impl<'conn> Transaction<'conn> {
    /// Issues `BEGIN` on `conn`. Fails if `conn` is already inside a
    /// transaction.
    pub fn begin(conn: &'conn Connection, kind: TransactionKind) -> Result<Self> {
        if conn.in_transaction() {
            return Err(Misuse::TransactionActive.into());
        }
        conn.execute(kind.begin_sql())?;
        debug!(path = conn.path(), ?kind, "transaction started");
        Ok(Self {
            conn,
            kind,
            finished: false,
        })
    }

    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn connection(&self) -> &'conn Connection {
        self.conn
    }

    /// A failed COMMIT leaves the guard open, so it can be retried or
    /// rolled back.
    pub fn commit(&mut self) -> Result<()> {
        self.finish("COMMIT")
    }

    pub fn rollback(&mut self) -> Result<()> {
        self.finish("ROLLBACK")
    }

    fn finish(&mut self, sql: &str) -> Result<()> {
        if self.finished {
            return Err(Misuse::TransactionFinished.into());
        }
        self.conn.execute(sql)?;
        self.finished = true;
        debug!(path = self.conn.path(), action = sql, "transaction finished");
        Ok(())
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        // The engine may already have rolled back on an error.
        if self.finished || !self.conn.in_transaction() {
            return;
        }
        if let Err(err) = self.rollback() {
            warn!(path = self.conn.path(), error = %err, "rollback on drop failed");
        }
    }
}
