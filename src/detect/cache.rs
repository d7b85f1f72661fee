use crate::order::ModuleKey;
use crate::probe::DetectionOutcome;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Probe outcomes of one resolve call, keyed by module.
///
/// A module that appears in several candidate groups is probed once. Cancelled
/// outcomes are never stored.
#[derive(Debug, Default)]
pub struct RunCache {
    runs: Mutex<HashMap<ModuleKey, DetectionOutcome>>,
}

impl RunCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn runs(&self) -> MutexGuard<'_, HashMap<ModuleKey, DetectionOutcome>> {
        match self.runs.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn get(&self, key: &ModuleKey) -> Option<DetectionOutcome> {
        self.runs().get(key).cloned()
    }

    pub fn insert(&self, key: ModuleKey, outcome: DetectionOutcome) {
        if outcome.is_cancelled() {
            return;
        }
        self.runs().insert(key, outcome);
    }

    pub fn len(&self) -> usize {
        self.runs().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::Reference;

    #[test]
    fn test_cancelled_outcomes_are_not_stored() {
        let cache = RunCache::new();
        let key = Reference::new("A", "v1").key();

        cache.insert(key.clone(), DetectionOutcome::cancelled());
        assert!(cache.is_empty());

        cache.insert(key.clone(), DetectionOutcome::fail());
        assert_eq!(cache.get(&key), Some(DetectionOutcome::fail()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_kind_is_part_of_the_key() {
        let cache = RunCache::new();
        cache.insert(Reference::new("A", "v1").key(), DetectionOutcome::fail());
        assert!(cache.get(&Reference::extension("A", "v1").key()).is_none());
    }
}
