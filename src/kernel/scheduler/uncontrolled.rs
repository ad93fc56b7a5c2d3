use super::{PassStats, ReactionPass};
use crate::kernel::events::{Event, gather_events, should_perform_event};
use crate::model::store::{ParticleDataStore, ParticleUpdate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

pub(super) fn run<S, R>(pass: &mut ReactionPass<'_, S>, rng: &mut R) -> (ParticleUpdate, PassStats)
where
    S: ParticleDataStore + Sync,
    R: Rng + ?Sized,
{
    let seed = rng.next_u64();
    let (gathered, mut accepted) = accept_in_parallel(pass, seed);
    let mut stats = PassStats {
        gathered,
        accepted: accepted.len(),
        ..Default::default()
    };

    accepted.shuffle(rng);
    let mut consumed = vec![false; pass.store.size()];
    let mut update = ParticleUpdate::default();
    pass.execute(&accepted, &mut consumed, rng, &mut update, &mut stats);
    (update, stats)
}

/// Gathers and independently accepts events over contiguous index chunks,
/// one chunk per pool thread. Chunk `i` draws from a generator seeded with
/// `seed + i`, and results are concatenated in chunk order.
fn accept_in_parallel<S>(pass: &ReactionPass<'_, S>, seed: u64) -> (usize, Vec<Event>)
where
    S: ParticleDataStore + Sync,
{
    let (ctx, store, cell_list, bound) = (pass.ctx, &*pass.store, pass.cell_list, pass.bound);
    let (dt, exact) = (pass.dt, pass.exact);
    let size = store.size();
    let n_chunks = pass.pool.current_num_threads().max(1);
    let chunk = size.div_ceil(n_chunks).max(1);

    let parts: Vec<(usize, Vec<Event>)> = pass.pool.install(|| {
        (0..n_chunks)
            .into_par_iter()
            .map(|i| {
                let range = (i * chunk).min(size)..((i + 1) * chunk).min(size);
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(i as u64));
                let events = gather_events(ctx, store, cell_list, bound, range);
                let gathered = events.len();
                let accepted = events
                    .into_iter()
                    .filter(|e| should_perform_event(e.rate, dt, exact, &mut rng))
                    .collect();
                (gathered, accepted)
            })
            .collect()
    });

    let gathered = parts.iter().map(|(n, _)| n).sum();
    let accepted = parts.into_iter().flat_map(|(_, events)| events).collect();
    (gathered, accepted)
}
