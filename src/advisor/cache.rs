use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::gate::LearningPlan;

/// Process-wide cache of generated learning plans
///
/// Readers never block each other. A poisoned lock behaves like an empty
/// cache.
#[derive(Debug)]
pub struct PlanCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, (Instant, LearningPlan)>>,
}

impl PlanCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Cached plan for `key`, if it is younger than the TTL
    pub fn get(&self, key: &str) -> Option<LearningPlan> {
        let entries = self.entries.read().ok()?;
        let (stored_at, plan) = entries.get(key)?;
        if stored_at.elapsed() < self.ttl {
            debug!("Plan cache hit for {}", key);
            Some(plan.clone())
        } else {
            None
        }
    }

    pub fn insert(&self, key: String, plan: LearningPlan) {
        if let Ok(mut entries) = self.entries.write() {
            entries.retain(|_, (stored_at, _)| stored_at.elapsed() < self.ttl);
            entries.insert(key, (Instant::now(), plan));
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
