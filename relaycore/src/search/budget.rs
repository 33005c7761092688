use std::{
    sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering},
    time::Instant,
};

use super::outcome::Termination;

/// Nodes between clock reads.
const CLOCK_INTERVAL: u64 = 256;

const RUNNING: u8 = 0;
const NODE_LIMIT: u8 = 1;
const TIME_LIMIT: u8 = 2;

/// Node and time allowance shared by every worker of one search.
#[derive(Debug)]
pub struct Budget {
    node_limit: Option<u64>,
    deadline: Option<Instant>,
    nodes: AtomicU64,
    stopped: AtomicBool,
    reason: AtomicU8,
}

impl Budget {
    pub fn new(node_limit: Option<u64>, deadline: Option<Instant>) -> Self {
        Self {
            node_limit,
            deadline,
            nodes: AtomicU64::new(0),
            stopped: AtomicBool::new(false),
            reason: AtomicU8::new(RUNNING),
        }
    }

    pub fn unlimited() -> Self {
        Self::new(None, None)
    }

    /// Counts one node. Returns `false` once the search must stop.
    #[inline]
    pub fn tick(&self) -> bool {
        if self.stopped.load(Ordering::Relaxed) {
            return false;
        }

        let n = self.nodes.fetch_add(1, Ordering::Relaxed) + 1;

        if self.node_limit.is_some_and(|limit| n > limit) {
            self.stop(NODE_LIMIT);
            return false;
        }

        if n % CLOCK_INTERVAL == 0 && self.deadline.is_some_and(|d| Instant::now() >= d) {
            self.stop(TIME_LIMIT);
            return false;
        }

        true
    }

    fn stop(&self, reason: u8) {
        let _ = self
            .reason
            .compare_exchange(RUNNING, reason, Ordering::Relaxed, Ordering::Relaxed);
        self.stopped.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Relaxed)
    }

    pub fn termination(&self) -> Termination {
        match self.reason.load(Ordering::Relaxed) {
            NODE_LIMIT => Termination::NodeLimit,
            TIME_LIMIT => Termination::TimeLimit,
            _ => Termination::Exhausted,
        }
    }
}
