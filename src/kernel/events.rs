//! Tentative reaction events and their generation.
//!
//! An event is a candidate firing of one registered reaction on one particle
//! (order 1) or one particle pair (order 2). Events are created and consumed
//! within a single step and refer to particles by store index.

use super::neighbor_list::CellList;
use crate::model::context::Context;
use crate::model::store::ParticleDataStore;
use crate::model::types::ParticleTypeId;
use rand::Rng;

/// A tentative reaction of one or two store entries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Event {
    pub n_educts: u8,
    pub n_products: u8,
    pub idx1: usize,
    /// Second educt; equal to `idx1` for order-1 events.
    pub idx2: usize,
    pub rate: f64,
    /// Running sum of rates up to and including this event.
    pub cumulative_rate: f64,
    /// Index into the registry list for `t1` (order 1) or `(t1, t2)` (order 2).
    pub reaction_index: usize,
    pub t1: ParticleTypeId,
    pub t2: ParticleTypeId,
}

impl Event {
    pub fn order1(
        idx: usize,
        type_id: ParticleTypeId,
        reaction_index: usize,
        rate: f64,
        n_products: u8,
    ) -> Self {
        Self {
            n_educts: 1,
            n_products,
            idx1: idx,
            idx2: idx,
            rate,
            cumulative_rate: 0.0,
            reaction_index,
            t1: type_id,
            t2: type_id,
        }
    }

    pub fn order2(
        (idx1, t1): (usize, ParticleTypeId),
        (idx2, t2): (usize, ParticleTypeId),
        reaction_index: usize,
        rate: f64,
        n_products: u8,
    ) -> Self {
        Self {
            n_educts: 2,
            n_products,
            idx1,
            idx2,
            rate,
            cumulative_rate: 0.0,
            reaction_index,
            t1,
            t2,
        }
    }

    /// Store indices of the educts.
    pub fn participants(&self) -> impl Iterator<Item = usize> {
        let second = (self.n_educts == 2).then_some(self.idx2);
        std::iter::once(self.idx1).chain(second)
    }

    /// Whether any participant is flagged in `consumed`.
    #[inline]
    pub fn touches(&self, consumed: &[bool]) -> bool {
        consumed[self.idx1] || (self.n_educts == 2 && consumed[self.idx2])
    }

    /// Marks the educts as used for the rest of the pass.
    #[inline]
    pub fn consume(&self, consumed: &mut [bool]) {
        consumed[self.idx1] = true;
        consumed[self.idx2] = true;
    }
}

/// Probability that an event with `rate` fires within `dt`.
///
/// `exact` selects `1 - exp(-rate·dt)`; otherwise the linear `rate·dt` is used.
#[inline]
pub fn acceptance_probability(rate: f64, dt: f64, exact: bool) -> f64 {
    if exact {
        1.0 - (-rate * dt).exp()
    } else {
        rate * dt
    }
}

/// Draws once against [`acceptance_probability`].
pub fn should_perform_event<R: Rng + ?Sized>(rate: f64, dt: f64, exact: bool, rng: &mut R) -> bool {
    rng.gen_range(0.0..1.0) < acceptance_probability(rate, dt, exact)
}

/// Whether `index` is flagged in `mask`. Indices past the end are not.
#[inline]
pub fn is_masked(mask: &[bool], index: usize) -> bool {
    mask.get(index).copied().unwrap_or(false)
}

/// Enumerates all tentative events of the store entries in `indices`.
///
/// Order-2 events are only created towards neighbors with a larger index, so
/// each pair is considered once. Entries flagged in `bound` belong to a
/// topology and never take part in an event. A deactivated neighbor is an
/// invariant violation; it is logged and skipped.
pub fn gather_events<S, I>(
    ctx: &Context,
    store: &S,
    cell_list: Option<&CellList>,
    bound: &[bool],
    indices: I,
) -> Vec<Event>
where
    S: ParticleDataStore,
    I: IntoIterator<Item = usize>,
{
    let reactions = ctx.reactions();
    let has_order2 = reactions.has_order2();
    let mut events = Vec::new();

    for i in indices {
        let entry = store.entry_at(i);
        if entry.is_deactivated() || is_masked(bound, i) {
            continue;
        }
        let t1 = entry.type_id;
        for (k, reaction) in reactions.order1_by_type(t1).iter().enumerate() {
            if reaction.rate > 0.0 {
                events.push(Event::order1(i, t1, k, reaction.rate, reaction.n_products()));
            }
        }

        let Some(list) = cell_list.filter(|_| has_order2) else {
            continue;
        };
        for j in list.neighbors_of(i, store) {
            if j <= i || is_masked(bound, j) {
                continue;
            }
            let neighbor = store.entry_at(j);
            if neighbor.is_deactivated() {
                log::error!(
                    "critical: deactivated particle {} found in the neighbor list of {}",
                    j,
                    i
                );
                continue;
            }
            let t2 = neighbor.type_id;
            let candidates = reactions.order2_by_types(t1, t2);
            if candidates.is_empty() {
                continue;
            }
            let d2 = ctx.dist_squared(entry.position, neighbor.position);
            for (k, reaction) in candidates.iter().enumerate() {
                if reaction.rate > 0.0 && d2 < reaction.educt_distance_squared() {
                    events.push(Event::order2(
                        (i, t1),
                        (j, t2),
                        k,
                        reaction.rate,
                        reaction.n_products(),
                    ));
                }
            }
        }
    }
    events
}

/// Fills in cumulative rates and returns the total propensity.
pub fn assign_cumulative_rates(events: &mut [Event]) -> f64 {
    let mut alpha = 0.0;
    for event in events {
        alpha += event.rate;
        event.cumulative_rate = alpha;
    }
    alpha
}
