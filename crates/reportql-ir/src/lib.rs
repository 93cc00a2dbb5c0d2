//! ReportQL intermediate representation
//!
//! Dialect-neutral types shared by every stage of the generation pipeline.
//! All types serialize to canonical JSON deterministically, which is what the
//! result cache fingerprints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

mod statement;
pub use statement::*;

/// Target SQL dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Oracle,
    Postgres,
    Mysql,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Oracle => "oracle",
            Dialect::Postgres => "postgres",
            Dialect::Mysql => "mysql",
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified purpose of a natural-language request.
///
/// A request may carry several intents at once (e.g. Aggregation + Temporal).
/// `Unknown` is terminal: generation stops and reports a low-confidence result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QueryIntent {
    Aggregation,
    Ranking,
    Filter,
    Temporal,
    Join,
    Unknown,
}

/// Reported complexity of a generated statement.
///
/// Reporting/confidence only; never alters generation correctness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ComplexityTier {
    Simple,
    Moderate,
    Complex,
    Advanced,
}

/// Severity attached to a validator warning
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Machine-readable warning code plus human-readable text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    pub code: String,
    pub message: String,
    pub severity: Severity,
}

impl Warning {
    pub fn new(code: &str, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            severity,
        }
    }
}

/// Outcome of one pipeline run. Constructed once, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    pub sql: String,
    pub dialect: Dialect,
    pub valid: bool,
    pub warnings: Vec<Warning>,
    pub complexity: ComplexityTier,
    pub confidence: f64,
    pub generated_at: DateTime<Utc>,
}

impl GenerationResult {
    /// A terminal low-confidence result carrying no SQL, used when the
    /// pipeline stops before rendering (unrecognized pattern, disjoint
    /// entities, no aggregatable column).
    pub fn rejected(dialect: Dialect, warning: Warning) -> Self {
        Self {
            sql: String::new(),
            dialect,
            valid: false,
            warnings: vec![warning],
            complexity: ComplexityTier::Simple,
            confidence: 0.0,
            generated_at: Utc::now(),
        }
    }

    pub fn has_critical_warning(&self) -> bool {
        self.warnings.iter().any(|w| w.severity == Severity::Critical)
    }
}

/// Cache key fingerprint over (schema, normalized request, dialect).
///
/// SHA-256 so two requests that normalize identically share a key and repeated
/// generations short-circuit through the result cache.
pub fn request_fingerprint(schema: &str, normalized_request: &str, dialect: Dialect) -> String {
    let mut hasher = Sha256::new();
    hasher.update(schema.as_bytes());
    hasher.update([0u8]);
    hasher.update(normalized_request.as_bytes());
    hasher.update([0u8]);
    hasher.update(dialect.as_str().as_bytes());
    format!("{:x}", hasher.finalize())
}
