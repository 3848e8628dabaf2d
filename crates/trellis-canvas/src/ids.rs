//! Node id generation

use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

/// Length of generated node ids, matching what the host canvas produces.
pub const NODE_ID_LEN: usize = 16;

pub trait IdSource: Send + Sync {
    fn next_id(&self) -> String;
}

/// Random 16-character lowercase hex ids.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIds;

impl IdSource for RandomIds {
    fn next_id(&self) -> String {
        let mut id = Uuid::new_v4().simple().to_string();
        id.truncate(NODE_ID_LEN);
        id
    }
}

/// `{prefix}{n}` with `n` counting up from 1. Deterministic, for tests and scripted edits.
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        SequentialIds {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl IdSource for SequentialIds {
    fn next_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}{}", self.prefix, n)
    }
}
