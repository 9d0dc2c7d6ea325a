use serde::{Deserialize, Serialize};

/// Owned SQLite value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    pub fn storage_class(&self) -> StorageClass {
        match self {
            Value::Null => StorageClass::Null,
            Value::Integer(_) => StorageClass::Integer,
            Value::Real(_) => StorageClass::Float,
            Value::Text(_) => StorageClass::Text,
            Value::Blob(_) => StorageClass::Blob,
        }
    }

    pub fn as_value_ref(&self) -> ValueRef<'_> {
        match self {
            Value::Null => ValueRef::Null,
            Value::Integer(v) => ValueRef::Integer(*v),
            Value::Real(v) => ValueRef::Real(*v),
            Value::Text(v) => ValueRef::Text(v),
            Value::Blob(v) => ValueRef::Blob(v),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v.into())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Integer(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Blob(v.to_vec())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Borrowed view of a value about to be handed to the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueRef<'a> {
    Null,
    Integer(i64),
    Real(f64),
    Text(&'a str),
    Blob(&'a [u8]),
}

/// The engine's dynamic storage class of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageClass {
    Integer,
    Float,
    Text,
    Blob,
    Null,
}

impl StorageClass {
    pub(crate) fn from_raw(raw: i32) -> Self {
        match raw {
            rusqlite::ffi::SQLITE_INTEGER => StorageClass::Integer,
            rusqlite::ffi::SQLITE_FLOAT => StorageClass::Float,
            rusqlite::ffi::SQLITE_TEXT => StorageClass::Text,
            rusqlite::ffi::SQLITE_BLOB => StorageClass::Blob,
            _ => StorageClass::Null,
        }
    }
}

/// Marker for binding SQL NULL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Null;

/// Anything that can be bound as a statement parameter or returned as a
/// function result.
pub trait Bind {
    fn to_value_ref(&self) -> ValueRef<'_>;
}

impl<T: Bind + ?Sized> Bind for &T {
    fn to_value_ref(&self) -> ValueRef<'_> {
        (**self).to_value_ref()
    }
}

impl Bind for Null {
    fn to_value_ref(&self) -> ValueRef<'_> {
        ValueRef::Null
    }
}

impl Bind for i32 {
    fn to_value_ref(&self) -> ValueRef<'_> {
        ValueRef::Integer((*self).into())
    }
}

impl Bind for i64 {
    fn to_value_ref(&self) -> ValueRef<'_> {
        ValueRef::Integer(*self)
    }
}

impl Bind for bool {
    fn to_value_ref(&self) -> ValueRef<'_> {
        ValueRef::Integer((*self).into())
    }
}

impl Bind for f64 {
    fn to_value_ref(&self) -> ValueRef<'_> {
        ValueRef::Real(*self)
    }
}

impl Bind for str {
    fn to_value_ref(&self) -> ValueRef<'_> {
        ValueRef::Text(self)
    }
}

impl Bind for String {
    fn to_value_ref(&self) -> ValueRef<'_> {
        ValueRef::Text(self)
    }
}

impl Bind for [u8] {
    fn to_value_ref(&self) -> ValueRef<'_> {
        ValueRef::Blob(self)
    }
}

impl Bind for Vec<u8> {
    fn to_value_ref(&self) -> ValueRef<'_> {
        ValueRef::Blob(self)
    }
}

impl Bind for Value {
    fn to_value_ref(&self) -> ValueRef<'_> {
        self.as_value_ref()
    }
}

impl Bind for ValueRef<'_> {
    fn to_value_ref(&self) -> ValueRef<'_> {
        *self
    }
}

impl<T: Bind> Bind for Option<T> {
    fn to_value_ref(&self) -> ValueRef<'_> {
        match self {
            Some(v) => v.to_value_ref(),
            None => ValueRef::Null,
        }
    }
}
