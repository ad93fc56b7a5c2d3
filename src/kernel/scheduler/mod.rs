//! Reaction schedulers.
//!
//! Every policy follows the same two phases. A read-only gather phase turns
//! the current store into a list of accepted events, possibly on the worker
//! pool. A single-threaded execution phase then applies them in order,
//! skipping any event whose participants were consumed earlier in the pass.
//!
//! - [`gillespie`] – Repeated rate-weighted single draws, serial.
//! - [`uncontrolled`] – Independent acceptance gathered on the pool, shuffled.
//! - [`parallel`] – Two spatial halves selected in parallel, halo events last.

mod gillespie;
mod parallel;
mod uncontrolled;

use super::config::SchedulerPolicy;
use super::events::Event;
use super::neighbor_list::CellList;
use super::reactions::perform_reaction;
use crate::model::context::Context;
use crate::model::record::{ReactionCounts, ReactionRecord};
use crate::model::store::{ParticleDataStore, ParticleUpdate};
use rand::Rng;
use rayon::ThreadPool;

/// Event statistics of one reaction pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    pub gathered: usize,
    pub accepted: usize,
    pub executed: usize,
    /// Accepted events dropped because a participant was already consumed.
    pub skipped: usize,
}

/// Everything one reaction pass reads and writes.
pub(crate) struct ReactionPass<'a, S> {
    pub ctx: &'a Context,
    pub store: &'a mut S,
    pub cell_list: Option<&'a CellList>,
    /// Store indices owned by a topology; empty when there are none.
    pub bound: &'a [bool],
    pub pool: &'a ThreadPool,
    pub dt: f64,
    pub exact: bool,
    pub records: Option<&'a mut Vec<ReactionRecord>>,
    pub counts: Option<&'a mut ReactionCounts>,
}

impl<S: ParticleDataStore + Sync> ReactionPass<'_, S> {
    /// Runs the pass under `policy` and returns the removals and insertions
    /// still to be applied to the store.
    pub(crate) fn run<R: Rng + ?Sized>(
        mut self,
        policy: SchedulerPolicy,
        rng: &mut R,
    ) -> (ParticleUpdate, PassStats) {
        let (update, stats) = match policy {
            SchedulerPolicy::Gillespie => gillespie::run(&mut self, rng),
            SchedulerPolicy::UncontrolledApproximation => uncontrolled::run(&mut self, rng),
            SchedulerPolicy::GillespieParallel => parallel::run(&mut self, rng),
        };
        log::debug!(
            "{:?} pass: {} gathered, {} accepted, {} executed, {} skipped",
            policy,
            stats.gathered,
            stats.accepted,
            stats.executed,
            stats.skipped
        );
        (update, stats)
    }

    /// Executes `events` in order, skipping those that touch a consumed index.
    fn execute<R: Rng + ?Sized>(
        &mut self,
        events: &[Event],
        consumed: &mut [bool],
        rng: &mut R,
        update: &mut ParticleUpdate,
        stats: &mut PassStats,
    ) {
        for event in events {
            if event.touches(consumed) {
                stats.skipped += 1;
                continue;
            }
            event.consume(consumed);
            let record = perform_reaction(self.ctx, &mut *self.store, event, rng, update);

            if let Some(counts) = self.counts.as_deref_mut() {
                if event.n_educts == 1 {
                    counts.record_order1(event.t1, event.reaction_index);
                } else {
                    counts.record_order2(event.t1, event.t2, event.reaction_index);
                }
            }
            if let Some(records) = self.records.as_deref_mut() {
                records.push(record);
            }
            stats.executed += 1;
        }
    }
}
