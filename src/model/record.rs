//! Optional per-step reaction diagnostics.

use super::geometry::Vec3;
use super::particle::ParticleId;
use super::reaction::{ReactionRegistry, ReactionType, type_pair};
use super::types::ParticleTypeId;
use std::collections::HashMap;

/// One executed reaction event.
#[derive(Debug, Clone, PartialEq)]
pub struct ReactionRecord {
    pub reaction_type: ReactionType,
    pub reaction_index: usize,
    /// Educt ids; order-1 events repeat the single educt.
    pub educts: [ParticleId; 2],
    pub types_from: [ParticleTypeId; 2],
    pub products: [Option<ParticleId>; 2],
    /// Midpoint of the educts, wrapped into the box.
    pub position: Vec3,
}

/// Executed-event counters, laid out like the reaction registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReactionCounts {
    pub order1: HashMap<ParticleTypeId, Vec<usize>>,
    pub order2: HashMap<(ParticleTypeId, ParticleTypeId), Vec<usize>>,
}

impl ReactionCounts {
    /// Creates zeroed counters for every registered reaction.
    pub fn for_registry(registry: &ReactionRegistry) -> Self {
        let mut counts = Self::default();
        counts.reset(registry);
        counts
    }

    pub fn reset(&mut self, registry: &ReactionRegistry) {
        self.order1 = registry
            .order1()
            .map(|(t, reactions)| (t, vec![0; reactions.len()]))
            .collect();
        self.order2 = registry
            .order2()
            .map(|(key, reactions)| (key, vec![0; reactions.len()]))
            .collect();
    }

    pub fn record_order1(&mut self, type_id: ParticleTypeId, reaction_index: usize) {
        if let Some(slot) = self
            .order1
            .get_mut(&type_id)
            .and_then(|v| v.get_mut(reaction_index))
        {
            *slot += 1;
        }
    }

    pub fn record_order2(&mut self, t1: ParticleTypeId, t2: ParticleTypeId, reaction_index: usize) {
        if let Some(slot) = self
            .order2
            .get_mut(&type_pair(t1, t2))
            .and_then(|v| v.get_mut(reaction_index))
        {
            *slot += 1;
        }
    }

    pub fn total(&self) -> usize {
        self.order1.values().flatten().sum::<usize>() + self.order2.values().flatten().sum::<usize>()
    }
}
