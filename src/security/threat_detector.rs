//! Threat scoring for request payloads.
//!
//! A payload is reduced to a small feature vector (attack signatures plus
//! character statistics) and scored by a fixed-weight logistic model. The
//! score is a probability in `[0, 1]`; anything at or above
//! [`MALICIOUS_THRESHOLD`] is labelled malicious.

use std::{collections::VecDeque, sync::Arc};

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;
use serde::Serialize;
use uuid::Uuid;

pub const MALICIOUS_THRESHOLD: f64 = 0.5;

const BIAS: f64 = -4.0;
const W_SQL_KEYWORD: f64 = 1.4;
const W_SQL_PATTERN: f64 = 3.5;
const W_XSS: f64 = 4.5;
const W_TRAVERSAL: f64 = 4.5;
const W_SHELL: f64 = 4.0;
const W_ENCODED: f64 = 3.0;
const W_SPECIAL: f64 = 2.0;
const W_LENGTH: f64 = 0.3;

const EXCERPT_CHARS: usize = 200;

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid threat pattern")
}

static SQL_KEYWORDS: Lazy<Regex> = Lazy::new(|| {
    compile(r"(?i)\b(union|select|insert|update|delete|drop|truncate|exec|sleep|benchmark|information_schema)\b")
});

static SQL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        compile(r#"(?i)['"]\s*or\s*['"]?\w+['"]?\s*=\s*['"]?\w+"#),
        compile(r"(?i)union\s+(all\s+)?select"),
        compile(r"(--|#)\s*$|/\*"),
        compile(r"(?i);\s*(drop|delete|truncate|insert|update)\b"),
    ]
});

static XSS_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        compile(r"(?i)<\s*script"),
        compile(r"(?i)javascript\s*:"),
        compile(r"(?i)\bon(error|load|click|mouseover|focus)\s*="),
        compile(r"(?i)<\s*(iframe|object|embed|svg)"),
    ]
});

static TRAVERSAL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        compile(r"\.\.[/\\]"),
        compile(r"(?i)%2e%2e(%2f|%5c|/|\\)"),
        compile(r"(?i)/etc/(passwd|shadow)|c:\\windows"),
    ]
});

static SHELL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        compile(r"(?i)[;&|]\s*(rm|cat|wget|curl|bash|sh|nc|chmod|python)\b"),
        compile(r"\$\(|`"),
    ]
});

static PERCENT_ENCODED: Lazy<Regex> = Lazy::new(|| compile(r"%[0-9A-Fa-f]{2}"));

/// Feature vector extracted from one payload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThreatFeatures {
    pub sql_keywords: usize,
    pub sql_patterns: usize,
    pub xss_patterns: usize,
    pub traversal_patterns: usize,
    pub shell_patterns: usize,
    pub encoded_density: f64,
    pub special_ratio: f64,
    pub log_length: f64,
}

impl ThreatFeatures {
    pub fn extract(payload: &str) -> Self {
        let length: usize = payload.chars().count();
        if length == 0 {
            return Self::default();
        }

        let count = |patterns: &[Regex]| patterns.iter().filter(|re| re.is_match(payload)).count();

        let special: usize = payload
            .chars()
            .filter(|c| !c.is_alphanumeric() && !c.is_whitespace())
            .count();

        Self {
            sql_keywords: SQL_KEYWORDS.find_iter(payload).count(),
            sql_patterns: count(SQL_PATTERNS.as_slice()),
            xss_patterns: count(XSS_PATTERNS.as_slice()),
            traversal_patterns: count(TRAVERSAL_PATTERNS.as_slice()),
            shell_patterns: count(SHELL_PATTERNS.as_slice()),
            encoded_density: (PERCENT_ENCODED.find_iter(payload).count() * 3) as f64 / length as f64,
            special_ratio: special as f64 / length as f64,
            log_length: (1.0 + length as f64).ln() / 10.0,
        }
    }

    fn logit(&self) -> f64 {
        BIAS + W_SQL_KEYWORD * self.sql_keywords.min(5) as f64
            + W_SQL_PATTERN * self.sql_patterns as f64
            + W_XSS * self.xss_patterns as f64
            + W_TRAVERSAL * self.traversal_patterns as f64
            + W_SHELL * self.shell_patterns as f64
            + W_ENCODED * self.encoded_density
            + W_SPECIAL * self.special_ratio
            + W_LENGTH * self.log_length
    }

    fn categories(&self) -> Vec<ThreatCategory> {
        let mut categories: Vec<ThreatCategory> = Vec::new();
        if self.sql_patterns > 0 || self.sql_keywords >= 3 {
            categories.push(ThreatCategory::SqlInjection);
        }
        if self.xss_patterns > 0 {
            categories.push(ThreatCategory::Xss);
        }
        if self.traversal_patterns > 0 {
            categories.push(ThreatCategory::PathTraversal);
        }
        if self.shell_patterns > 0 {
            categories.push(ThreatCategory::CommandInjection);
        }
        if self.encoded_density > 0.3 {
            categories.push(ThreatCategory::Obfuscation);
        }
        categories
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatCategory {
    SqlInjection,
    Xss,
    PathTraversal,
    CommandInjection,
    Obfuscation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatLabel {
    Benign,
    Malicious,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThreatAssessment {
    pub score: f64,
    pub label: ThreatLabel,
    pub categories: Vec<ThreatCategory>,
}

impl ThreatAssessment {
    pub fn is_malicious(&self) -> bool {
        self.label == ThreatLabel::Malicious
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreatDetector;

impl ThreatDetector {
    pub fn new() -> Self {
        Self
    }

    pub fn assess(&self, payload: &str) -> ThreatAssessment {
        let features: ThreatFeatures = ThreatFeatures::extract(payload);
        let score: f64 = 1.0 / (1.0 + (-features.logit()).exp());

        ThreatAssessment {
            score: (score * 10_000.0).round() / 10_000.0,
            label: if score >= MALICIOUS_THRESHOLD {
                ThreatLabel::Malicious
            } else {
                ThreatLabel::Benign
            },
            categories: features.categories(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatSource {
    Api,
    Request,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThreatRecord {
    pub id: Uuid,
    pub detected_at: DateTime<Utc>,
    pub source: ThreatSource,
    pub score: f64,
    pub categories: Vec<ThreatCategory>,
    pub excerpt: String,
    pub reported_by: Option<String>,
}

/// Bounded history of malicious detections
#[derive(Debug, Clone)]
pub struct ThreatLog {
    capacity: usize,
    records: Arc<RwLock<VecDeque<ThreatRecord>>>,
}

impl ThreatLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            records: Arc::new(RwLock::new(VecDeque::new())),
        }
    }

    pub fn record(
        &self,
        source: ThreatSource,
        payload: &str,
        assessment: &ThreatAssessment,
        reported_by: Option<String>,
    ) -> ThreatRecord {
        let record: ThreatRecord = ThreatRecord {
            id: Uuid::new_v4(),
            detected_at: Utc::now(),
            source,
            score: assessment.score,
            categories: assessment.categories.clone(),
            excerpt: payload.chars().take(EXCERPT_CHARS).collect(),
            reported_by,
        };

        let mut records = self.records.write();
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(record.clone());
        record
    }

    /// Newest first
    pub fn recent(&self, limit: usize) -> Vec<ThreatRecord> {
        self.records.read().iter().rev().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
