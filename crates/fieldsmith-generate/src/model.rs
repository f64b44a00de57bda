use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use fieldsmith_core::RowValues;
use serde::{Deserialize, Serialize};

/// Options for one generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateOptions {
    /// Number of rows to produce.
    pub rows: u64,
    /// Base seed; each row derives its own random source from it.
    pub seed: u64,
    /// Generate rows on the rayon thread pool.
    pub parallel: bool,
    /// Fixed generation timestamp; `None` uses the current local time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<NaiveDateTime>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            rows: 10,
            seed: 42,
            parallel: false,
            timestamp: None,
        }
    }
}

/// Structured generation issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationIssue {
    pub level: String,
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<u64>,
}

impl GenerationIssue {
    pub fn warning(code: &str, message: impl Into<String>) -> Self {
        Self {
            level: "warning".to_string(),
            code: code.to_string(),
            message: message.into(),
            field: None,
            row: None,
        }
    }

    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self {
            level: "error".to_string(),
            ..Self::warning(code, message)
        }
    }

    pub fn for_field(mut self, field: &str) -> Self {
        self.field = Some(field.to_string());
        self
    }

    pub fn at_row(mut self, row: u64) -> Self {
        self.row = Some(row);
        self
    }
}

/// Report for a generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationReport {
    pub run_id: String,
    pub rows_requested: u64,
    pub rows_generated: u64,
    /// Values produced per generator key.
    pub generator_usage: BTreeMap<String, u64>,
    /// Fields computed from an expression.
    pub expression_fields: Vec<String>,
    /// Values carrying a failure marker.
    pub sentinel_count: u64,
    pub panicked_rows: u64,
    pub duration_ms: u64,
    pub warnings_by_code: BTreeMap<String, u64>,
    pub warnings: Vec<GenerationIssue>,
}

impl GenerationReport {
    pub fn new(run_id: String) -> Self {
        Self {
            run_id,
            rows_requested: 0,
            rows_generated: 0,
            generator_usage: BTreeMap::new(),
            expression_fields: Vec::new(),
            sentinel_count: 0,
            panicked_rows: 0,
            duration_ms: 0,
            warnings_by_code: BTreeMap::new(),
            warnings: Vec::new(),
        }
    }

    pub fn record_generator_usage(&mut self, id: &str) {
        self.record_generator_usage_count(id, 1);
    }

    pub fn record_generator_usage_count(&mut self, id: &str, count: u64) {
        *self.generator_usage.entry(id.to_string()).or_insert(0) += count;
    }

    pub fn record_sentinels(&mut self, count: u64) {
        self.sentinel_count += count;
    }

    pub fn record_warning(&mut self, issue: GenerationIssue) {
        *self.warnings_by_code.entry(issue.code.clone()).or_insert(0) += 1;
        self.warnings.push(issue);
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Rows produced by a run plus its report.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    /// One map per row; keys in resolved field order.
    pub rows: Vec<RowValues>,
    /// Field names in schema declaration order, used by writers.
    pub field_order: Vec<String>,
    pub report: GenerationReport,
}
