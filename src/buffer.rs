//! Pending buffered requests.
//!
//! Two independent ordered sequences, gets and sets, filled by
//! `get_buffered`/`set_buffered` and drained only by `clear`. Entries are
//! stored whether or not they resolved; failed entries surface again at
//! commit time. Nothing is deduplicated.

use bcr_core::SettingDefinition;

/// Ordered get and set requests waiting for a commit.
#[derive(Debug, Clone, Default)]
pub struct CommandBuffer {
    gets: Vec<SettingDefinition>,
    sets: Vec<SettingDefinition>,
}

/// Copy of a [`CommandBuffer`] owned by one commit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BufferSnapshot {
    /// Buffered gets in insertion order
    pub gets: Vec<SettingDefinition>,
    /// Buffered sets in insertion order
    pub sets: Vec<SettingDefinition>,
}

impl BufferSnapshot {
    /// True when there is nothing to commit.
    pub fn is_empty(&self) -> bool {
        self.gets.is_empty() && self.sets.is_empty()
    }
}

impl CommandBuffer {
    /// Empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a get request.
    pub fn push_get(&mut self, def: SettingDefinition) {
        self.gets.push(def);
    }

    /// Append a set request.
    pub fn push_set(&mut self, def: SettingDefinition) {
        self.sets.push(def);
    }

    /// Drop every pending request.
    pub fn clear(&mut self) {
        self.gets.clear();
        self.sets.clear();
    }

    /// Copy out the current contents. Later changes to the buffer do not
    /// affect the snapshot.
    pub fn snapshot(&self) -> BufferSnapshot {
        BufferSnapshot {
            gets: self.gets.clone(),
            sets: self.sets.clone(),
        }
    }

    /// Pending gets.
    pub fn gets(&self) -> &[SettingDefinition] {
        &self.gets
    }

    /// Pending sets.
    pub fn sets(&self) -> &[SettingDefinition] {
        &self.sets
    }

    /// Total number of pending requests.
    pub fn len(&self) -> usize {
        self.gets.len() + self.sets.len()
    }

    /// True when both sequences are empty.
    pub fn is_empty(&self) -> bool {
        self.gets.is_empty() && self.sets.is_empty()
    }
}
