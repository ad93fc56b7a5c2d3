//! Two-way spatial decomposition of the reaction pass.
//!
//! The box is cut in half at the center of its longest axis. Particles within
//! the maximum reaction radius of the cut (or of the outer faces, when that
//! axis is periodic) form the halo. Events whose participants are all outside
//! the halo are selected per half on separate workers with the Gillespie draw;
//! events touching the halo are accepted independently and resolved last,
//! shuffled, against the indices already consumed by both halves.

use super::gillespie;
use super::{PassStats, ReactionPass};
use crate::kernel::events::{Event, gather_events, should_perform_event};
use crate::model::geometry::{SimulationBox, Vec3};
use crate::model::store::{ParticleDataStore, ParticleUpdate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone, Copy)]
struct Decomposition {
    axis: usize,
    center: f64,
    lower: f64,
    upper: f64,
    periodic: bool,
    halo: f64,
}

impl Decomposition {
    fn new(simulation_box: &SimulationBox, halo: f64) -> Self {
        let axis = simulation_box.longest_axis();
        let lower = simulation_box.lower()[axis];
        let size = simulation_box.size[axis];
        Self {
            axis,
            center: lower + 0.5 * size,
            lower,
            upper: lower + size,
            periodic: simulation_box.periodic[axis],
            halo,
        }
    }

    fn half_of(&self, pos: Vec3) -> usize {
        usize::from(pos[self.axis] >= self.center)
    }

    fn in_halo(&self, pos: Vec3) -> bool {
        let x = pos[self.axis];
        if (x - self.center).abs() < self.halo {
            return true;
        }
        self.periodic && (x - self.lower < self.halo || self.upper - x < self.halo)
    }
}

struct HalfSelection {
    gathered: usize,
    interior: Vec<Event>,
    boundary: Vec<Event>,
}

pub(super) fn run<S, R>(pass: &mut ReactionPass<'_, S>, rng: &mut R) -> (ParticleUpdate, PassStats)
where
    S: ParticleDataStore + Sync,
    R: Rng + ?Sized,
{
    let (ctx, cell_list, bound) = (pass.ctx, pass.cell_list, pass.bound);
    let (dt, exact) = (pass.dt, pass.exact);
    let store = &*pass.store;
    let size = store.size();
    let decomposition = Decomposition::new(ctx.simulation_box(), ctx.reactions().max_educt_distance());

    let mut halves: [Vec<usize>; 2] = Default::default();
    let mut halo = vec![false; size];
    for (index, entry) in store.iter().enumerate() {
        if entry.is_deactivated() {
            continue;
        }
        halves[decomposition.half_of(entry.position)].push(index);
        halo[index] = decomposition.in_halo(entry.position);
    }

    let seed = rng.next_u64();
    let select_half = |half: usize| {
        let mut rng = StdRng::seed_from_u64(seed.wrapping_add(half as u64));
        let events = gather_events(ctx, store, cell_list, bound, halves[half].iter().copied());
        let gathered = events.len();
        let (interior, boundary): (Vec<Event>, Vec<Event>) = events
            .into_iter()
            .partition(|e| !e.participants().any(|p| halo[p]));

        let mut local = vec![false; size];
        let interior = gillespie::select(interior, dt, exact, &mut rng, &mut local);
        let boundary = boundary
            .into_iter()
            .filter(|e| should_perform_event(e.rate, dt, exact, &mut rng))
            .collect();
        HalfSelection {
            gathered,
            interior,
            boundary,
        }
    };
    let (first, second) = pass
        .pool
        .install(|| rayon::join(|| select_half(0), || select_half(1)));

    let mut stats = PassStats {
        gathered: first.gathered + second.gathered,
        accepted: first.interior.len()
            + second.interior.len()
            + first.boundary.len()
            + second.boundary.len(),
        ..Default::default()
    };
    log::debug!(
        "domain split on axis {}: {}/{} interior, {} halo events",
        decomposition.axis,
        first.interior.len(),
        second.interior.len(),
        first.boundary.len() + second.boundary.len()
    );

    let mut consumed = vec![false; size];
    let mut update = ParticleUpdate::default();
    pass.execute(&first.interior, &mut consumed, rng, &mut update, &mut stats);
    pass.execute(&second.interior, &mut consumed, rng, &mut update, &mut stats);

    let mut boundary = first.boundary;
    boundary.extend(second.boundary);
    boundary.shuffle(rng);
    pass.execute(&boundary, &mut consumed, rng, &mut update, &mut stats);
    (update, stats)
}
