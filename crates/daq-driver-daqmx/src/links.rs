//! Directed notification graph between channels.

use std::collections::HashMap;

use crate::channel::ChannelId;

/// Edges from a source channel to the channels that receive its output.
#[derive(Debug, Default, Clone)]
pub struct LinkGraph {
    edges: HashMap<ChannelId, Vec<ChannelId>>,
}

impl LinkGraph {
    /// Graph without edges.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `from -> to`. Returns false if the edge already existed.
    pub fn link(&mut self, from: ChannelId, to: ChannelId) -> bool {
        let targets = self.edges.entry(from).or_default();
        if targets.contains(&to) {
            return false;
        }
        targets.push(to);
        true
    }

    /// Remove `from -> to`. Returns false if there was no such edge.
    pub fn unlink(&mut self, from: ChannelId, to: ChannelId) -> bool {
        match self.edges.get_mut(&from) {
            Some(targets) => {
                let before = targets.len();
                targets.retain(|t| *t != to);
                targets.len() != before
            }
            None => false,
        }
    }

    /// Targets of `from`, in link order.
    pub fn linked(&self, from: ChannelId) -> &[ChannelId] {
        self.edges.get(&from).map(Vec::as_slice).unwrap_or(&[])
    }
}
