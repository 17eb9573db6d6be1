//! Result collectors: sinks that receive every decoded symbol of an instance.
//!
//! Any [`ResultCollector`] can be attached to an instance's context. The
//! engine calls [`ResultCollector::add_result`] for each successful decode.
//! [`BoundedResultCollector`] is the stock implementation: it keeps up to
//! `capacity` results, drops blacklisted codes and anything the filter rejects,
//! and optionally keeps a copy of the frame each result came from.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::image_wrapper::ImageWrapper;
use crate::types::CodeResult;

/// A sink for decoded symbols.
pub trait ResultCollector: Send + Sync {
    fn add_result(&self, result: &CodeResult, frame: Option<&ImageWrapper>);
}

/// A `(code, format)` pair excluded from collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlacklistEntry {
    pub code: String,
    pub format: String,
}

impl BlacklistEntry {
    pub fn new(code: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            format: format.into(),
        }
    }

    fn matches(&self, result: &CodeResult) -> bool {
        self.code == result.code && self.format == result.format
    }
}

/// Predicate deciding whether a result is kept.
pub type ResultFilter = Arc<dyn Fn(&CodeResult) -> bool + Send + Sync>;

/// Settings for a [`BoundedResultCollector`].
#[derive(Clone)]
pub struct CollectorConfig {
    /// Maximum number of results kept
    pub capacity: usize,
    /// Keep a copy of the frame alongside each result
    pub capture: bool,
    /// Results never collected
    pub blacklist: Vec<BlacklistEntry>,
    /// Optional extra predicate
    pub filter: Option<ResultFilter>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            capacity: 20,
            capture: false,
            blacklist: Vec::new(),
            filter: None,
        }
    }
}

impl fmt::Debug for CollectorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectorConfig")
            .field("capacity", &self.capacity)
            .field("capture", &self.capture)
            .field("blacklist", &self.blacklist)
            .field("filter", &self.filter.is_some())
            .finish()
    }
}

/// A collected result.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectedResult {
    pub code_result: CodeResult,
    /// The frame, when capture is enabled
    pub frame: Option<ImageWrapper>,
}

/// Collector that keeps a bounded number of accepted results.
#[derive(Debug)]
pub struct BoundedResultCollector {
    config: CollectorConfig,
    results: Mutex<Vec<CollectedResult>>,
}

impl BoundedResultCollector {
    pub fn new(config: CollectorConfig) -> Self {
        Self {
            config,
            results: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of everything collected so far.
    pub fn results(&self) -> Vec<CollectedResult> {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn accepts(&self, result: &CodeResult) -> bool {
        if self.config.blacklist.iter().any(|entry| entry.matches(result)) {
            return false;
        }
        self.config.filter.as_ref().map_or(true, |filter| filter(result))
    }
}

impl ResultCollector for BoundedResultCollector {
    fn add_result(&self, result: &CodeResult, frame: Option<&ImageWrapper>) {
        if !self.accepts(result) {
            tracing::trace!("Collector rejected {} '{}'", result.format, result.code);
            return;
        }
        let mut results = self.results.lock().unwrap_or_else(PoisonError::into_inner);
        if results.len() >= self.config.capacity {
            return;
        }
        results.push(CollectedResult {
            code_result: result.clone(),
            frame: if self.config.capture {
                frame.cloned()
            } else {
                None
            },
        });
    }
}
