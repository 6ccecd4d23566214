use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use vhadmin_process::ActionOutcome;

/// Bounded, in-memory record of finished background actions.
///
/// Lost on restart. Only there so a failed start/stop/update leaves a trace
/// somewhere a caller can read it.
#[derive(Debug, Clone)]
pub struct OutcomeLog {
    inner: Arc<Mutex<VecDeque<ActionOutcome>>>,
    capacity: usize,
}

impl OutcomeLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    pub fn record(&self, outcome: ActionOutcome) {
        let mut q = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        while q.len() >= self.capacity {
            q.pop_front();
        }
        q.push_back(outcome);
    }

    /// Newest first.
    pub fn recent(&self) -> Vec<ActionOutcome> {
        let q = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        q.iter().rev().cloned().collect()
    }
}

pub(crate) fn unix_ms_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
