//! User-defined scalar functions.
//!
//! The engine finds a function by name and arity and calls it through
//! [`call_scalar`], which rebuilds the [`Arguments`] view and runs the
//! user code. Each call produces exactly one result: the returned
//! [`Value`], or an error result carrying the error's message.

use std::os::raw::{c_char, c_int, c_void};
use std::panic::{self, AssertUnwindSafe};
use std::slice;

use rusqlite::ffi;

use crate::cell::Argument;
use crate::error::{Misuse, Result};
use crate::value::{Bind, Value, ValueRef};

/// Callable body of a scalar function.
pub trait ScalarFunction: Send + 'static {
    fn call(&self, args: &Arguments<'_>) -> anyhow::Result<Value>;
}

impl<F> ScalarFunction for F
where
    F: Fn(&Arguments<'_>) -> anyhow::Result<Value> + Send + 'static,
{
    fn call(&self, args: &Arguments<'_>) -> anyhow::Result<Value> {
        self(args)
    }
}

/// A named scalar function with a fixed argument count.
pub struct Function {
    name: String,
    arity: i32,
    deterministic: bool,
    body: Box<dyn ScalarFunction>,
}

impl Function {
    /// `arity` of `-1` accepts any number of arguments.
    pub fn new<F>(name: impl Into<String>, arity: i32, body: F) -> Self
    where
        F: Fn(&Arguments<'_>) -> anyhow::Result<Value> + Send + 'static,
    {
        Self::with_body(name, arity, body)
    }

    /// Like [`Function::new`], for a body implementing [`ScalarFunction`]
    /// directly.
    pub fn with_body(name: impl Into<String>, arity: i32, body: impl ScalarFunction) -> Self {
        Self {
            name: name.into(),
            arity,
            deterministic: false,
            body: Box::new(body),
        }
    }

    /// Marks the function as always returning the same result for the
    /// same arguments, which lets the planner factor calls out.
    pub fn deterministic(mut self, deterministic: bool) -> Self {
        self.deterministic = deterministic;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> i32 {
        self.arity
    }

    pub(crate) fn text_flags(&self) -> c_int {
        if self.deterministic {
            ffi::SQLITE_UTF8 | ffi::SQLITE_DETERMINISTIC
        } else {
            ffi::SQLITE_UTF8
        }
    }

    /// Same name (ASCII case-insensitive) and arity.
    pub(crate) fn same_signature(&self, other: &Function) -> bool {
        self.arity == other.arity && self.name.eq_ignore_ascii_case(&other.name)
    }
}

impl std::fmt::Debug for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("deterministic", &self.deterministic)
            .finish_non_exhaustive()
    }
}

/// Arguments of one scalar function call.
pub struct Arguments<'call> {
    values: &'call [*mut ffi::sqlite3_value],
}

impl<'call> Arguments<'call> {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<Argument<'_>> {
        match self.values.get(index) {
            Some(raw) => Ok(Argument::new(*raw)),
            None => Err(Misuse::ArgumentOutOfRange {
                index,
                count: self.len(),
            }
            .into()),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Argument<'_>> + '_ {
        self.values.iter().map(|raw| Argument::new(*raw))
    }
}

/// Engine entry point for every registered scalar function. The user
/// data pointer is the connection-owned [`Function`].
pub(crate) unsafe extern "C" fn call_scalar(
    ctx: *mut ffi::sqlite3_context,
    argc: c_int,
    argv: *mut *mut ffi::sqlite3_value,
) {
    let function = &*(ffi::sqlite3_user_data(ctx) as *const Function);
    let values = if argv.is_null() || argc <= 0 {
        &[][..]
    } else {
        slice::from_raw_parts(argv as *const *mut ffi::sqlite3_value, argc as usize)
    };
    let args = Arguments { values };

    match panic::catch_unwind(AssertUnwindSafe(|| function.body.call(&args))) {
        Ok(Ok(value)) => set_result(ctx, &value),
        Ok(Err(err)) => set_error(ctx, &format!("{err:#}")),
        Err(_) => set_error(ctx, &format!("function {} panicked", function.name)),
    }
}

unsafe fn set_result(ctx: *mut ffi::sqlite3_context, value: &Value) {
    match value.to_value_ref() {
        ValueRef::Null => ffi::sqlite3_result_null(ctx),
        ValueRef::Integer(v) => ffi::sqlite3_result_int64(ctx, v),
        ValueRef::Real(v) => ffi::sqlite3_result_double(ctx, v),
        ValueRef::Text(v) => match c_int::try_from(v.len()) {
            Ok(len) => ffi::sqlite3_result_text(
                ctx,
                v.as_ptr() as *const c_char,
                len,
                ffi::SQLITE_TRANSIENT(),
            ),
            Err(_) => ffi::sqlite3_result_error_toobig(ctx),
        },
        ValueRef::Blob(v) => match c_int::try_from(v.len()) {
            Ok(len) => ffi::sqlite3_result_blob(
                ctx,
                v.as_ptr() as *const c_void,
                len,
                ffi::SQLITE_TRANSIENT(),
            ),
            Err(_) => ffi::sqlite3_result_error_toobig(ctx),
        },
    }
}

unsafe fn set_error(ctx: *mut ffi::sqlite3_context, message: &str) {
    let len = message.len().min(c_int::MAX as usize) as c_int;
    ffi::sqlite3_result_error(ctx, message.as_ptr() as *const c_char, len);
}
