//! Error log
//!
//! Process-wide sink for failures that leave the resilience layer. It is a
//! bounded ring: once full, recording a new failure drops the oldest one.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cache::lock;
use crate::error::{ApiError, ErrorKind};

/// Default number of records kept.
pub const DEFAULT_ERROR_LOG_CAPACITY: usize = 50;

// == Error Record ==
/// One recorded failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorRecord {
    pub kind: ErrorKind,
    pub message: String,
    pub url: String,
    pub status: Option<u16>,
    pub timestamp: DateTime<Utc>,
}

impl ErrorRecord {
    fn new(url: &str, error: &ApiError) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
            url: url.to_string(),
            status: error.status(),
            timestamp: Utc::now(),
        }
    }
}

// == Error Log ==
/// Cloneable handle to a shared, bounded error ring buffer.
#[derive(Debug, Clone)]
pub struct ErrorLog {
    records: Arc<Mutex<VecDeque<ErrorRecord>>>,
    capacity: usize,
}

impl Default for ErrorLog {
    fn default() -> Self {
        Self::new(DEFAULT_ERROR_LOG_CAPACITY)
    }
}

impl ErrorLog {
    /// Creates an empty log keeping at most `capacity` records (minimum one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    /// Records a failure observed for `url`.
    pub fn record(&self, url: &str, error: &ApiError) {
        let mut records = lock(&self.records);
        if records.len() >= self.capacity {
            records.pop_front();
        }
        records.push_back(ErrorRecord::new(url, error));
    }

    /// Returns a copy of the records, oldest first.
    pub fn entries(&self) -> Vec<ErrorRecord> {
        lock(&self.records).iter().cloned().collect()
    }

    /// Takes every record out of the log, oldest first.
    pub fn drain(&self) -> Vec<ErrorRecord> {
        lock(&self.records).drain(..).collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.records).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.records).is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
