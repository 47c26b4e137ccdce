use std::collections::HashMap;

use primitive_types::U256;

/// Word-addressed account storage. Absent keys read as zero and storing
/// zero clears the entry, so the map only ever holds non-zero state.
///
/// A `Storage` instance is intended to outlive a single execution: the same
/// instance can back an init run and the runtime runs that follow it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Storage {
    slots: HashMap<U256, U256>,
}

impl Storage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self, key: U256) -> U256 {
        self.slots.get(&key).copied().unwrap_or_else(U256::zero)
    }

    pub fn store(&mut self, key: U256, value: U256) {
        if value.is_zero() {
            self.slots.remove(&key);
        } else {
            self.slots.insert(key, value);
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&U256, &U256)> {
        self.slots.iter()
    }

    /// Snapshot supporting all-or-nothing rollback of one execution.
    pub fn checkpoint(&self) -> Storage {
        self.clone()
    }

    pub fn revert(&mut self, checkpoint: Storage) {
        *self = checkpoint;
    }
}
