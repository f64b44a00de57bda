use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use indexmap::IndexMap;

/// Metadata key holding the zero-based row index.
pub const ROW_INDEX_KEY: &str = "_rowIndex";
/// Metadata key holding the row generation timestamp.
pub const TIMESTAMP_KEY: &str = "_timestamp";

/// Values generated so far for one row, in resolved field order.
pub type RowValues = IndexMap<String, String>;

/// Read-only metadata populated once per row before the field loop.
#[derive(Debug, Clone, PartialEq)]
pub struct RowMetadata {
    pub row_index: u64,
    pub timestamp: NaiveDateTime,
    pub extra: BTreeMap<String, String>,
}

impl RowMetadata {
    pub fn new(row_index: u64, timestamp: NaiveDateTime) -> Self {
        Self {
            row_index,
            timestamp,
            extra: BTreeMap::new(),
        }
    }

    /// Timestamp in ISO local date-time form with millisecond precision.
    pub fn timestamp_text(&self) -> String {
        self.timestamp.format("%Y-%m-%dT%H:%M:%S%.3f").to_string()
    }

    /// Look up a metadata entry by key.
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            ROW_INDEX_KEY => Some(self.row_index.to_string()),
            TIMESTAMP_KEY => Some(self.timestamp_text()),
            _ => self.extra.get(key).cloned(),
        }
    }
}

/// Per-row state owned by the task generating that row.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationContext {
    pub row: RowValues,
    pub metadata: RowMetadata,
}

impl GenerationContext {
    pub fn new(metadata: RowMetadata) -> Self {
        Self {
            row: RowValues::new(),
            metadata,
        }
    }

    pub fn with_row(row: RowValues, metadata: RowMetadata) -> Self {
        Self { row, metadata }
    }

    pub fn row_index(&self) -> u64 {
        self.metadata.row_index
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.row.contains_key(name)
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.row.get(name).map(String::as_str)
    }

    /// Record a generated value, making it visible to later fields of the row.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.row.insert(name.into(), value.into());
    }

    pub fn into_row(self) -> RowValues {
        self.row
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn timestamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .and_then(|date| date.and_hms_milli_opt(8, 5, 1, 20))
            .expect("valid timestamp")
    }

    #[test]
    fn metadata_exposes_reserved_keys() {
        let mut metadata = RowMetadata::new(7, timestamp());
        metadata.extra.insert("batch".to_string(), "b1".to_string());

        assert_eq!(metadata.get(ROW_INDEX_KEY).as_deref(), Some("7"));
        assert_eq!(
            metadata.get(TIMESTAMP_KEY).as_deref(),
            Some("2024-03-09T08:05:01.020")
        );
        assert_eq!(metadata.get("batch").as_deref(), Some("b1"));
        assert!(metadata.get("missing").is_none());
    }

    #[test]
    fn context_preserves_insertion_order() {
        let mut context = GenerationContext::new(RowMetadata::new(0, timestamp()));
        context.insert("b", "2");
        context.insert("a", "1");
        let names: Vec<_> = context.into_row().into_keys().collect();
        assert_eq!(names, vec!["b", "a"]);
    }
}
