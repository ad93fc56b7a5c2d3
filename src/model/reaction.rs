//! Reaction rules.
//!
//! The set of reaction kinds is closed: order-1 reactions (conversion, decay,
//! fission) act on one particle, order-2 reactions (fusion, enzymatic) act on
//! a pair of particles closer than the educt distance.

use super::types::ParticleTypeId;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid reaction '{name}': {reason}")]
pub struct InvalidReactionError {
    pub name: String,
    pub reason: String,
}

impl InvalidReactionError {
    pub fn new(name: &str, reason: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Tag identifying the kind of a reaction, used in records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReactionType {
    Conversion,
    Decay,
    Fission,
    Fusion,
    Enzymatic,
}

impl fmt::Display for ReactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReactionType::Conversion => write!(f, "conversion"),
            ReactionType::Decay => write!(f, "decay"),
            ReactionType::Fission => write!(f, "fission"),
            ReactionType::Fusion => write!(f, "fusion"),
            ReactionType::Enzymatic => write!(f, "enzymatic"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReactionKind {
    /// `from -> to`
    Conversion {
        from: ParticleTypeId,
        to: ParticleTypeId,
    },
    /// `from -> ∅`
    Decay { from: ParticleTypeId },
    /// `from -> to1 + to2`, products placed `product_distance` apart.
    Fission {
        from: ParticleTypeId,
        to1: ParticleTypeId,
        to2: ParticleTypeId,
        product_distance: f64,
        weight1: f64,
        weight2: f64,
    },
    /// `from1 + from2 -> to`, product placed on the weighted connecting line.
    Fusion {
        from1: ParticleTypeId,
        from2: ParticleTypeId,
        to: ParticleTypeId,
        educt_distance: f64,
        weight1: f64,
        weight2: f64,
    },
    /// `catalyst + from -> catalyst + to`
    Enzymatic {
        catalyst: ParticleTypeId,
        from: ParticleTypeId,
        to: ParticleTypeId,
        educt_distance: f64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reaction {
    pub name: String,
    pub rate: f64,
    pub kind: ReactionKind,
}

impl Reaction {
    pub fn conversion(name: &str, from: ParticleTypeId, to: ParticleTypeId, rate: f64) -> Self {
        Self {
            name: name.to_string(),
            rate,
            kind: ReactionKind::Conversion { from, to },
        }
    }

    pub fn decay(name: &str, from: ParticleTypeId, rate: f64) -> Self {
        Self {
            name: name.to_string(),
            rate,
            kind: ReactionKind::Decay { from },
        }
    }

    /// Fission with equal product weights.
    pub fn fission(
        name: &str,
        from: ParticleTypeId,
        to1: ParticleTypeId,
        to2: ParticleTypeId,
        rate: f64,
        product_distance: f64,
    ) -> Self {
        Self {
            name: name.to_string(),
            rate,
            kind: ReactionKind::Fission {
                from,
                to1,
                to2,
                product_distance,
                weight1: 0.5,
                weight2: 0.5,
            },
        }
    }

    /// Fusion with the product placed halfway between the educts.
    pub fn fusion(
        name: &str,
        from1: ParticleTypeId,
        from2: ParticleTypeId,
        to: ParticleTypeId,
        rate: f64,
        educt_distance: f64,
    ) -> Self {
        Self {
            name: name.to_string(),
            rate,
            kind: ReactionKind::Fusion {
                from1,
                from2,
                to,
                educt_distance,
                weight1: 0.5,
                weight2: 0.5,
            },
        }
    }

    pub fn enzymatic(
        name: &str,
        catalyst: ParticleTypeId,
        from: ParticleTypeId,
        to: ParticleTypeId,
        rate: f64,
        educt_distance: f64,
    ) -> Self {
        Self {
            name: name.to_string(),
            rate,
            kind: ReactionKind::Enzymatic {
                catalyst,
                from,
                to,
                educt_distance,
            },
        }
    }

    /// Overrides the product (fission) or placement (fusion) weights.
    pub fn with_weights(mut self, w1: f64, w2: f64) -> Self {
        match &mut self.kind {
            ReactionKind::Fission {
                weight1, weight2, ..
            }
            | ReactionKind::Fusion {
                weight1, weight2, ..
            } => {
                *weight1 = w1;
                *weight2 = w2;
            }
            _ => {}
        }
        self
    }

    pub fn reaction_type(&self) -> ReactionType {
        match self.kind {
            ReactionKind::Conversion { .. } => ReactionType::Conversion,
            ReactionKind::Decay { .. } => ReactionType::Decay,
            ReactionKind::Fission { .. } => ReactionType::Fission,
            ReactionKind::Fusion { .. } => ReactionType::Fusion,
            ReactionKind::Enzymatic { .. } => ReactionType::Enzymatic,
        }
    }

    /// Number of educts: 1 or 2.
    pub fn order(&self) -> u8 {
        match self.kind {
            ReactionKind::Conversion { .. }
            | ReactionKind::Decay { .. }
            | ReactionKind::Fission { .. } => 1,
            ReactionKind::Fusion { .. } | ReactionKind::Enzymatic { .. } => 2,
        }
    }

    pub fn n_products(&self) -> u8 {
        match self.kind {
            ReactionKind::Decay { .. } => 0,
            ReactionKind::Conversion { .. } | ReactionKind::Fusion { .. } => 1,
            ReactionKind::Fission { .. } | ReactionKind::Enzymatic { .. } => 2,
        }
    }

    pub fn educts(&self) -> Vec<ParticleTypeId> {
        match self.kind {
            ReactionKind::Conversion { from, .. }
            | ReactionKind::Decay { from }
            | ReactionKind::Fission { from, .. } => vec![from],
            ReactionKind::Fusion { from1, from2, .. } => vec![from1, from2],
            ReactionKind::Enzymatic { catalyst, from, .. } => vec![from, catalyst],
        }
    }

    pub fn products(&self) -> Vec<ParticleTypeId> {
        match self.kind {
            ReactionKind::Conversion { to, .. } => vec![to],
            ReactionKind::Decay { .. } => vec![],
            ReactionKind::Fission { to1, to2, .. } => vec![to1, to2],
            ReactionKind::Fusion { to, .. } => vec![to],
            ReactionKind::Enzymatic { catalyst, to, .. } => vec![to, catalyst],
        }
    }

    pub fn educt_distance(&self) -> Option<f64> {
        match self.kind {
            ReactionKind::Fusion { educt_distance, .. }
            | ReactionKind::Enzymatic { educt_distance, .. } => Some(educt_distance),
            _ => None,
        }
    }

    #[inline]
    pub fn educt_distance_squared(&self) -> f64 {
        self.educt_distance().map_or(0.0, |d| d * d)
    }

    fn validate(&self) -> Result<(), InvalidReactionError> {
        if !self.rate.is_finite() || self.rate < 0.0 {
            return Err(InvalidReactionError::new(
                &self.name,
                format!("rate must be finite and non-negative, got {}", self.rate),
            ));
        }
        if let Some(d) = self.educt_distance()
            && !(d > 0.0 && d.is_finite())
        {
            return Err(InvalidReactionError::new(
                &self.name,
                format!("educt distance must be positive, got {}", d),
            ));
        }
        match self.kind {
            ReactionKind::Fission {
                product_distance,
                weight1,
                weight2,
                ..
            } => {
                if !(product_distance >= 0.0) {
                    return Err(InvalidReactionError::new(
                        &self.name,
                        format!("product distance must be non-negative, got {}", product_distance),
                    ));
                }
                check_weights(&self.name, weight1, weight2)
            }
            ReactionKind::Fusion {
                weight1, weight2, ..
            } => check_weights(&self.name, weight1, weight2),
            _ => Ok(()),
        }
    }
}

fn check_weights(name: &str, w1: f64, w2: f64) -> Result<(), InvalidReactionError> {
    if !(w1 >= 0.0 && w2 >= 0.0) {
        return Err(InvalidReactionError::new(
            name,
            format!("weights must be non-negative, got ({}, {})", w1, w2),
        ));
    }
    Ok(())
}

/// Location of a registered reaction inside the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReactionHandle {
    Order1 {
        type_id: ParticleTypeId,
        index: usize,
    },
    Order2 {
        types: (ParticleTypeId, ParticleTypeId),
        index: usize,
    },
}

/// Canonical key for an unordered type pair.
#[inline]
pub fn type_pair(t1: ParticleTypeId, t2: ParticleTypeId) -> (ParticleTypeId, ParticleTypeId) {
    if t1 <= t2 { (t1, t2) } else { (t2, t1) }
}

#[derive(Debug, Clone, Default)]
pub struct ReactionRegistry {
    order1: HashMap<ParticleTypeId, Vec<Reaction>>,
    order2: HashMap<(ParticleTypeId, ParticleTypeId), Vec<Reaction>>,
}

impl ReactionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and stores a reaction.
    ///
    /// The returned handle's `index` is the reaction index carried by events.
    pub fn add(&mut self, reaction: Reaction) -> Result<ReactionHandle, InvalidReactionError> {
        reaction.validate()?;
        let educts = reaction.educts();
        match reaction.order() {
            1 => {
                let list = self.order1.entry(educts[0]).or_default();
                list.push(reaction);
                Ok(ReactionHandle::Order1 {
                    type_id: educts[0],
                    index: list.len() - 1,
                })
            }
            _ => {
                let key = type_pair(educts[0], educts[1]);
                let list = self.order2.entry(key).or_default();
                list.push(reaction);
                Ok(ReactionHandle::Order2 {
                    types: key,
                    index: list.len() - 1,
                })
            }
        }
    }

    pub fn order1_by_type(&self, type_id: ParticleTypeId) -> &[Reaction] {
        self.order1.get(&type_id).map_or(&[], Vec::as_slice)
    }

    /// Order-2 reactions between two types, independent of argument order.
    pub fn order2_by_types(&self, t1: ParticleTypeId, t2: ParticleTypeId) -> &[Reaction] {
        self.order2
            .get(&type_pair(t1, t2))
            .map_or(&[], Vec::as_slice)
    }

    pub fn get(&self, handle: ReactionHandle) -> Option<&Reaction> {
        match handle {
            ReactionHandle::Order1 { type_id, index } => self.order1_by_type(type_id).get(index),
            ReactionHandle::Order2 { types, index } => {
                self.order2_by_types(types.0, types.1).get(index)
            }
        }
    }

    pub fn order1(&self) -> impl Iterator<Item = (ParticleTypeId, &[Reaction])> {
        self.order1.iter().map(|(t, v)| (*t, v.as_slice()))
    }

    pub fn order2(
        &self,
    ) -> impl Iterator<Item = ((ParticleTypeId, ParticleTypeId), &[Reaction])> {
        self.order2.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    pub fn has_order2(&self) -> bool {
        self.order2.values().any(|v| !v.is_empty())
    }

    /// Largest educt distance over all order-2 reactions, 0 if there are none.
    pub fn max_educt_distance(&self) -> f64 {
        self.order2
            .values()
            .flatten()
            .filter_map(Reaction::educt_distance)
            .fold(0.0, f64::max)
    }

    pub fn len(&self) -> usize {
        self.order1.values().map(Vec::len).sum::<usize>()
            + self.order2.values().map(Vec::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_and_products_per_kind() {
        let decay = Reaction::decay("d", 0, 1.0);
        assert_eq!(decay.order(), 1);
        assert_eq!(decay.n_products(), 0);

        let fission = Reaction::fission("f", 0, 1, 2, 1.0, 0.5);
        assert_eq!(fission.order(), 1);
        assert_eq!(fission.products(), vec![1, 2]);

        let fusion = Reaction::fusion("fu", 0, 1, 2, 1.0, 1.5);
        assert_eq!(fusion.order(), 2);
        assert_eq!(fusion.educt_distance_squared(), 2.25);

        let enz = Reaction::enzymatic("e", 3, 0, 1, 1.0, 1.0);
        assert_eq!(enz.educts(), vec![0, 3]);
        assert_eq!(enz.reaction_type(), ReactionType::Enzymatic);
    }

    #[test]
    fn registry_indexes_by_type_and_unordered_pair() {
        let mut registry = ReactionRegistry::new();
        let h1 = registry.add(Reaction::decay("d", 0, 1.0)).unwrap();
        let h2 = registry.add(Reaction::fusion("fu", 1, 0, 2, 1.0, 1.0)).unwrap();
        assert_eq!(h1, ReactionHandle::Order1 { type_id: 0, index: 0 });
        assert_eq!(
            h2,
            ReactionHandle::Order2 {
                types: (0, 1),
                index: 0
            }
        );
        assert_eq!(registry.order1_by_type(0).len(), 1);
        assert!(registry.order1_by_type(1).is_empty());
        assert_eq!(registry.order2_by_types(0, 1).len(), 1);
        assert_eq!(registry.order2_by_types(1, 0).len(), 1);
        assert_eq!(registry.get(h2).unwrap().name, "fu");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn max_educt_distance_over_order2() {
        let mut registry = ReactionRegistry::new();
        assert_eq!(registry.max_educt_distance(), 0.0);
        registry.add(Reaction::fusion("a", 0, 0, 1, 1.0, 1.2)).unwrap();
        registry.add(Reaction::enzymatic("b", 0, 1, 2, 1.0, 2.5)).unwrap();
        assert_eq!(registry.max_educt_distance(), 2.5);
    }

    #[test]
    fn errors_on_negative_rate() {
        let mut registry = ReactionRegistry::new();
        let result = registry.add(Reaction::decay("d", 0, -1.0));
        assert!(result.is_err());
    }

    #[test]
    fn errors_on_zero_educt_distance() {
        let mut registry = ReactionRegistry::new();
        let result = registry.add(Reaction::fusion("f", 0, 0, 1, 1.0, 0.0));
        assert!(result.is_err());
    }

    #[test]
    fn with_weights_overrides_fusion_weights() {
        let r = Reaction::fusion("f", 0, 1, 2, 1.0, 1.0).with_weights(0.2, 0.8);
        match r.kind {
            ReactionKind::Fusion {
                weight1, weight2, ..
            } => {
                assert_eq!(weight1, 0.2);
                assert_eq!(weight2, 0.8);
            }
            _ => panic!("expected fusion"),
        }
    }
}
