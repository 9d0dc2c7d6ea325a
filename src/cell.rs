//! Read access to a single typed cell.
//!
//! [`Cell`] is the one interface for reading a value out of the engine.
//! It has two backends: [`Column`] reads a column of the statement's
//! current row, and [`Argument`] reads an argument of an active scalar
//! function call. Both are borrows, so a cell cannot outlive the row or
//! call that produced it.
//!
//! Borrowed bytes only ever point at the cell's own TEXT or BLOB buffer,
//! read through the one accessor matching its storage class. A type
//! conversion may move that buffer inside the engine, so numeric cells
//! are converted into owned bytes instead.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::marker::PhantomData;
use std::os::raw::c_int;
use std::slice;

use rusqlite::ffi;

use crate::error::Result;
use crate::value::{StorageClass, Value};

/// Typed getters shared by row columns and function arguments.
///
/// Conversions follow the engine's rules. For example, reading an
/// integer from a TEXT cell parses the text, and reading a NULL cell as
/// a number yields zero.
pub trait Cell {
    fn storage_class(&self) -> StorageClass;

    fn as_i32(&self) -> i32;

    fn as_i64(&self) -> i64;

    fn as_f64(&self) -> f64;

    /// Bytes of a TEXT or BLOB cell as stored. Empty for other classes.
    fn stored_bytes(&self) -> &[u8];

    /// The engine's text rendering of a numeric cell, copied out.
    fn rendered_text(&self) -> Vec<u8>;

    fn is_null(&self) -> bool {
        self.storage_class() == StorageClass::Null
    }

    /// UTF-8 bytes of the text conversion. Empty for NULL.
    fn text_bytes(&self) -> Cow<'_, [u8]> {
        match self.storage_class() {
            StorageClass::Text | StorageClass::Blob => Cow::Borrowed(self.stored_bytes()),
            StorageClass::Integer | StorageClass::Float => Cow::Owned(self.rendered_text()),
            StorageClass::Null => Cow::Borrowed(&[]),
        }
    }

    /// Bytes of the blob conversion. Empty for NULL.
    ///
    /// The engine renders numbers as text before taking their bytes, so
    /// this matches [`Cell::text_bytes`] for every class.
    fn as_blob(&self) -> Cow<'_, [u8]> {
        self.text_bytes()
    }

    fn as_str(&self) -> Result<Cow<'_, str>> {
        Ok(match self.text_bytes() {
            Cow::Borrowed(bytes) => Cow::Borrowed(std::str::from_utf8(bytes)?),
            Cow::Owned(bytes) => {
                Cow::Owned(String::from_utf8(bytes).map_err(|err| err.utf8_error())?)
            }
        })
    }

    fn as_string(&self) -> Result<String> {
        self.as_str().map(Cow::into_owned)
    }

    /// Copies the cell out according to its storage class.
    fn to_value(&self) -> Result<Value> {
        Ok(match self.storage_class() {
            StorageClass::Null => Value::Null,
            StorageClass::Integer => Value::Integer(self.as_i64()),
            StorageClass::Float => Value::Real(self.as_f64()),
            StorageClass::Text => Value::Text(self.as_string()?),
            StorageClass::Blob => Value::Blob(self.stored_bytes().to_vec()),
        })
    }
}

unsafe fn bytes<'a>(ptr: *const u8, len: c_int) -> &'a [u8] {
    if ptr.is_null() || len <= 0 {
        &[]
    } else {
        slice::from_raw_parts(ptr, len as usize)
    }
}

/// A column of the current row of a [`Statement`](crate::Statement).
#[derive(Debug, Clone, Copy)]
pub struct Column<'stmt> {
    raw: *mut ffi::sqlite3_stmt,
    index: c_int,
    _row: PhantomData<&'stmt ()>,
}

impl<'stmt> Column<'stmt> {
    /// `raw` must have a current row and `index` must be a valid column.
    pub(crate) fn new(raw: *mut ffi::sqlite3_stmt, index: usize) -> Self {
        Self {
            raw,
            index: index as c_int,
            _row: PhantomData,
        }
    }

    pub fn index(&self) -> usize {
        self.index as usize
    }
}

impl Cell for Column<'_> {
    fn storage_class(&self) -> StorageClass {
        StorageClass::from_raw(unsafe { ffi::sqlite3_column_type(self.raw, self.index) })
    }

    fn as_i32(&self) -> i32 {
        unsafe { ffi::sqlite3_column_int(self.raw, self.index) }
    }

    fn as_i64(&self) -> i64 {
        unsafe { ffi::sqlite3_column_int64(self.raw, self.index) }
    }

    fn as_f64(&self) -> f64 {
        unsafe { ffi::sqlite3_column_double(self.raw, self.index) }
    }

    fn stored_bytes(&self) -> &[u8] {
        // The length must be read after the pointer.
        unsafe {
            let ptr = match self.storage_class() {
                StorageClass::Text => ffi::sqlite3_column_text(self.raw, self.index),
                StorageClass::Blob => ffi::sqlite3_column_blob(self.raw, self.index) as *const u8,
                _ => return &[],
            };
            bytes(ptr, ffi::sqlite3_column_bytes(self.raw, self.index))
        }
    }

    fn rendered_text(&self) -> Vec<u8> {
        unsafe {
            let ptr = ffi::sqlite3_column_text(self.raw, self.index);
            bytes(ptr, ffi::sqlite3_column_bytes(self.raw, self.index)).to_vec()
        }
    }
}

/// An argument of an active scalar function call.
#[derive(Debug, Clone, Copy)]
pub struct Argument<'call> {
    raw: *mut ffi::sqlite3_value,
    _call: PhantomData<&'call ()>,
}

impl<'call> Argument<'call> {
    pub(crate) fn new(raw: *mut ffi::sqlite3_value) -> Self {
        Self {
            raw,
            _call: PhantomData,
        }
    }
}

impl Cell for Argument<'_> {
    fn storage_class(&self) -> StorageClass {
        StorageClass::from_raw(unsafe { ffi::sqlite3_value_type(self.raw) })
    }

    fn as_i32(&self) -> i32 {
        unsafe { ffi::sqlite3_value_int(self.raw) }
    }

    fn as_i64(&self) -> i64 {
        unsafe { ffi::sqlite3_value_int64(self.raw) }
    }

    fn as_f64(&self) -> f64 {
        unsafe { ffi::sqlite3_value_double(self.raw) }
    }

    fn stored_bytes(&self) -> &[u8] {
        unsafe {
            let ptr = match self.storage_class() {
                StorageClass::Text => ffi::sqlite3_value_text(self.raw),
                StorageClass::Blob => ffi::sqlite3_value_blob(self.raw) as *const u8,
                _ => return &[],
            };
            bytes(ptr, ffi::sqlite3_value_bytes(self.raw))
        }
    }

    fn rendered_text(&self) -> Vec<u8> {
        unsafe {
            let ptr = ffi::sqlite3_value_text(self.raw);
            bytes(ptr, ffi::sqlite3_value_bytes(self.raw)).to_vec()
        }
    }
}

/// Conversion out of a [`Cell`].
pub trait FromCell: Sized {
    fn from_cell<C: Cell + ?Sized>(cell: &C) -> Result<Self>;
}

impl FromCell for i32 {
    fn from_cell<C: Cell + ?Sized>(cell: &C) -> Result<Self> {
        Ok(cell.as_i32())
    }
}

impl FromCell for i64 {
    fn from_cell<C: Cell + ?Sized>(cell: &C) -> Result<Self> {
        Ok(cell.as_i64())
    }
}

impl FromCell for f64 {
    fn from_cell<C: Cell + ?Sized>(cell: &C) -> Result<Self> {
        Ok(cell.as_f64())
    }
}

impl FromCell for bool {
    fn from_cell<C: Cell + ?Sized>(cell: &C) -> Result<Self> {
        Ok(cell.as_i64() != 0)
    }
}

impl FromCell for String {
    fn from_cell<C: Cell + ?Sized>(cell: &C) -> Result<Self> {
        cell.as_string()
    }
}

impl FromCell for Vec<u8> {
    fn from_cell<C: Cell + ?Sized>(cell: &C) -> Result<Self> {
        Ok(cell.as_blob().into_owned())
    }
}

impl FromCell for Value {
    fn from_cell<C: Cell + ?Sized>(cell: &C) -> Result<Self> {
        cell.to_value()
    }
}

impl<T: FromCell> FromCell for Option<T> {
    fn from_cell<C: Cell + ?Sized>(cell: &C) -> Result<Self> {
        if cell.is_null() {
            Ok(None)
        } else {
            T::from_cell(cell).map(Some)
        }
    }
}

/// Comparisons against literals: the cell is converted to the literal's
/// type and compared with that type's ordering.
macro_rules! impl_literal_cmp {
    ($cell:ident) => {
        impl PartialEq<i32> for $cell<'_> {
            fn eq(&self, other: &i32) -> bool {
                self.as_i32() == *other
            }
        }

        impl PartialOrd<i32> for $cell<'_> {
            fn partial_cmp(&self, other: &i32) -> Option<Ordering> {
                Some(self.as_i32().cmp(other))
            }
        }

        impl PartialEq<i64> for $cell<'_> {
            fn eq(&self, other: &i64) -> bool {
                self.as_i64() == *other
            }
        }

        impl PartialOrd<i64> for $cell<'_> {
            fn partial_cmp(&self, other: &i64) -> Option<Ordering> {
                Some(self.as_i64().cmp(other))
            }
        }

        impl PartialEq<f64> for $cell<'_> {
            fn eq(&self, other: &f64) -> bool {
                self.as_f64() == *other
            }
        }

        impl PartialOrd<f64> for $cell<'_> {
            fn partial_cmp(&self, other: &f64) -> Option<Ordering> {
                self.as_f64().partial_cmp(other)
            }
        }

        impl PartialEq<&str> for $cell<'_> {
            fn eq(&self, other: &&str) -> bool {
                *self.text_bytes() == *other.as_bytes()
            }
        }

        impl PartialOrd<&str> for $cell<'_> {
            fn partial_cmp(&self, other: &&str) -> Option<Ordering> {
                Some(self.text_bytes().as_ref().cmp(other.as_bytes()))
            }
        }

        impl PartialEq<&[u8]> for $cell<'_> {
            fn eq(&self, other: &&[u8]) -> bool {
                *self.as_blob() == **other
            }
        }

        impl PartialOrd<&[u8]> for $cell<'_> {
            fn partial_cmp(&self, other: &&[u8]) -> Option<Ordering> {
                Some(self.as_blob().as_ref().cmp(*other))
            }
        }
    };
}

impl_literal_cmp!(Column);
impl_literal_cmp!(Argument);
