//! Crash-dump analysis for CrashDesk
//!
//! Three pieces, each usable on its own:
//! - [`scanner`]: finds candidate `.dmp` files in the configured locations
//! - [`signatures`] / [`report`]: classify a dump by byte signature or by
//!   parsing a textual debugger report
//! - [`kb`]: the JSON-file knowledge base mapping bug-check codes to
//!   remediation steps, updatable from resolved tickets

pub mod kb;
pub mod report;
pub mod scanner;
pub mod signatures;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub use kb::{FeedbackKind, KbEntry, KnowledgeBase, SolutionStep};
pub use scanner::{DumpFile, FileScanner, ScanConfig};
pub use signatures::SignatureClassifier;

/// Analyzer error type
#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("knowledge base error: {0}")]
    KnowledgeBase(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AnalyzerError>;

/// How sure the classifier is about its verdict
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    #[default]
    Medium,
    High,
}

/// Coarse root-cause bucket for a bug check
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Driver,
    Software,
    Hardware,
    System,
    #[default]
    Unknown,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Driver => "driver",
            Self::Software => "software",
            Self::Hardware => "hardware",
            Self::System => "system",
            Self::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// Structured classification of a crash dump
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Classification {
    /// Normalized bug-check code, e.g. `0X0000001E`
    pub error_code: String,
    pub error_name: String,
    pub category: Category,
    pub confidence: Confidence,
    pub method: String,
    pub faulting_module: Option<String>,
    pub process_name: Option<String>,
}

/// Outcome of classifying one dump file
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Classified(Classification),
    Unknown,
}

impl Verdict {
    pub fn classification(&self) -> Option<&Classification> {
        match self {
            Self::Classified(c) => Some(c),
            Self::Unknown => None,
        }
    }
}

/// Classifier seam consumed by the client application
pub trait Classifier: Send + Sync {
    fn classify(&self, dump: &DumpFile) -> Result<Verdict>;
}

/// Normalize an error code to the canonical `0X…` uppercase form used as
/// the knowledge-base key.
pub fn normalize_error_code(raw: &str) -> String {
    let code = raw.trim().to_uppercase();
    if let Some(stripped) = code.strip_prefix("0X") {
        format!("0X{stripped}")
    } else {
        format!("0X{code}")
    }
}
