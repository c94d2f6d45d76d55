//! Bounded in-memory run log.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use stratus_model::CloudProvider;
use stratus_policy::Grade;
use uuid::Uuid;

use crate::verdict::Verdict;

/// One processed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub description: String,
    pub status: Verdict,
    pub score: u8,
    pub grade: Grade,
    pub providers: Vec<CloudProvider>,
}

/// Append-only log that evicts the oldest record once full.
#[derive(Debug)]
pub struct RunHistory {
    capacity: usize,
    records: RwLock<VecDeque<RunRecord>>,
}

impl RunHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            records: RwLock::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn record(&self, record: RunRecord) {
        let mut records = self.records.write();
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(record);
    }

    /// Up to `n` records, newest first.
    pub fn recent(&self, n: usize) -> Vec<RunRecord> {
        self.records.read().iter().rev().take(n).cloned().collect()
    }

    /// All records, oldest first.
    pub fn snapshot(&self) -> Vec<RunRecord> {
        self.records.read().iter().cloned().collect()
    }

    pub fn get(&self, run_id: Uuid) -> Option<RunRecord> {
        self.records.read().iter().find(|r| r.run_id == run_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}
