//! Destination for gathered records and per-record errors.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Int(i64),
    Str(String),
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Str(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Str(value.to_string())
    }
}

pub type Fields = BTreeMap<String, FieldValue>;
pub type Tags = BTreeMap<String, String>;

/// Receives one record per entity, and errors that must not abort a batch.
pub trait MetricSink: Send + Sync {
    fn report_fields(&self, measurement: &str, fields: Fields, tags: Tags);
    fn report_error(&self, err: Error);
}

/// A record captured by [`CollectingSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub measurement: String,
    pub fields: Fields,
    pub tags: Tags,
}

/// Keeps everything it is given in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    records: Mutex<Vec<Record>>,
    errors: Mutex<Vec<String>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<Record> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Rendered error messages, in report order.
    pub fn errors(&self) -> Vec<String> {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl MetricSink for CollectingSink {
    fn report_fields(&self, measurement: &str, fields: Fields, tags: Tags) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Record {
                measurement: measurement.to_string(),
                fields,
                tags,
            });
    }

    fn report_error(&self, err: Error) {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(err.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_records_and_errors() {
        let sink = CollectingSink::new();
        let mut fields = Fields::new();
        fields.insert("id".to_string(), FieldValue::Int(1));
        fields.insert("name".to_string(), "Docs".into());
        let mut tags = Tags::new();
        tags.insert("source".to_string(), "wiki".to_string());

        sink.report_fields("confluence_space", fields.clone(), tags.clone());
        sink.report_error(Error::EmptySpaceName);

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].measurement, "confluence_space");
        assert_eq!(records[0].fields, fields);
        assert_eq!(records[0].tags, tags);
        assert_eq!(sink.errors(), vec!["error empty space name".to_string()]);
    }
}
