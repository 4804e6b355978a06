//! The log record: raw field values extracted from one line.

use crate::error::{Error, Result};
use std::collections::HashMap;

/// Type alias for the underlying field storage.
/// All field values are stored as strings, with type conversion on demand.
pub type Fields = HashMap<String, String>;

/// A parsed log record containing field name-value pairs.
///
/// Entries are produced by [`Parser`](crate::Parser) and consumed by
/// [`AccessLogRow::from_entry`](crate::AccessLogRow::from_entry). They live
/// only as long as one line is being processed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Entry {
    fields: Fields,
}

impl Entry {
    /// Create a new empty entry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new entry from a fields map.
    pub fn from_fields(fields: Fields) -> Self {
        Self { fields }
    }

    /// Get a field value as a string.
    ///
    /// # Arguments
    ///
    /// * `name` - The field name to retrieve
    ///
    /// # Returns
    ///
    /// The field value as a string, or [`Error::FieldNotFound`] if the field
    /// doesn't exist.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use logload::Entry;
    /// let mut entry = Entry::new();
    /// entry.set_field("status", "200");
    ///
    /// assert_eq!(entry.field("status").unwrap(), "200");
    /// assert!(entry.field("nonexistent").is_err());
    /// ```
    pub fn field(&self, name: &str) -> Result<&str> {
        self.fields
            .get(name)
            .map(|s| s.as_str())
            .ok_or_else(|| Error::field_not_found(name))
    }

    /// Get a field value as a 32-bit integer.
    ///
    /// # Arguments
    ///
    /// * `name` - The field name to retrieve and convert
    ///
    /// # Returns
    ///
    /// The field value as an i32, or an error if the field doesn't exist or
    /// does not fit.
    pub fn int_field(&self, name: &str) -> Result<i32> {
        let value = self.field(name)?;
        value
            .parse::<i32>()
            .map_err(|e| Error::numeric_format(name, value, "i32", e))
    }

    /// Get a field value as a 64-bit integer.
    ///
    /// # Arguments
    ///
    /// * `name` - The field name to retrieve and convert
    ///
    /// # Returns
    ///
    /// The field value as an i64, or an error if the field doesn't exist or
    /// cannot be parsed.
    pub fn int64_field(&self, name: &str) -> Result<i64> {
        let value = self.field(name)?;
        value
            .parse::<i64>()
            .map_err(|e| Error::numeric_format(name, value, "i64", e))
    }

    /// Set a field value.
    ///
    /// # Arguments
    ///
    /// * `name` - The field name
    /// * `value` - The raw value, replacing any previous one
    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Get an iterator over all field names and values.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.fields.iter()
    }

    /// Get the number of fields in this entry.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if this entry has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<Fields> for Entry {
    fn from(fields: Fields) -> Self {
        Self::from_fields(fields)
    }
}
