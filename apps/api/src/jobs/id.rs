//! Job identifiers

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Serialize, Serializer};

/// Identifier of one background fetch job
///
/// Serialized as a decimal string, the form clients see in `job_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(u64);

impl JobId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl Serialize for JobId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hands out strictly increasing job ids; never reuses one within a process
#[derive(Debug, Default)]
pub struct JobIdAllocator {
    last: AtomicU64,
}

impl JobIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next id (the first one is 1)
    pub fn next(&self) -> JobId {
        JobId(self.last.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Number of ids issued so far
    pub fn issued(&self) -> u64 {
        self.last.load(Ordering::Relaxed)
    }
}
