use super::{PassStats, ReactionPass};
use crate::kernel::events::{Event, assign_cumulative_rates, gather_events, should_perform_event};
use crate::model::store::{ParticleDataStore, ParticleUpdate};
use rand::Rng;

pub(super) fn run<S, R>(pass: &mut ReactionPass<'_, S>, rng: &mut R) -> (ParticleUpdate, PassStats)
where
    S: ParticleDataStore + Sync,
    R: Rng + ?Sized,
{
    let size = pass.store.size();
    let events = gather_events(pass.ctx, &*pass.store, pass.cell_list, pass.bound, 0..size);
    let mut stats = PassStats {
        gathered: events.len(),
        ..Default::default()
    };

    let mut consumed = vec![false; size];
    let selected = select(events, pass.dt, pass.exact, rng, &mut consumed);
    stats.accepted = selected.len();

    consumed.fill(false);
    let mut update = ParticleUpdate::default();
    pass.execute(&selected, &mut consumed, rng, &mut update, &mut stats);
    (update, stats)
}

/// Draws events one at a time with probability proportional to their rate.
///
/// A drawn event is tested for acceptance. Accepted events mark their
/// participants in `consumed` and every remaining candidate touching them is
/// discarded; rejected events are discarded alone. The returned events are
/// pairwise disjoint, in selection order.
pub(super) fn select<R: Rng + ?Sized>(
    mut events: Vec<Event>,
    dt: f64,
    exact: bool,
    rng: &mut R,
    consumed: &mut [bool],
) -> Vec<Event> {
    let mut selected = Vec::new();
    events.retain(|e| !e.touches(consumed));
    let mut alpha = assign_cumulative_rates(&mut events);

    while !events.is_empty() && alpha > 0.0 {
        let x = rng.gen_range(0.0..alpha);
        let pos = events
            .partition_point(|e| e.cumulative_rate <= x)
            .min(events.len() - 1);
        let event = events[pos];

        if should_perform_event(event.rate, dt, exact, rng) {
            event.consume(consumed);
            selected.push(event);
            events.retain(|e| !e.touches(consumed));
        } else {
            events.remove(pos);
        }
        alpha = assign_cumulative_rates(&mut events);
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn selected_events_are_disjoint() {
        let events = vec![
            Event::order2((0, 0), (1, 0), 0, 5.0, 1),
            Event::order2((1, 0), (2, 0), 0, 5.0, 1),
            Event::order2((2, 0), (3, 0), 0, 5.0, 1),
            Event::order1(4, 0, 0, 5.0, 0),
        ];
        let mut rng = StdRng::seed_from_u64(5);
        let mut consumed = vec![false; 5];
        let selected = select(events, 1.0, true, &mut rng, &mut consumed);

        assert!(!selected.is_empty());
        let mut seen = [false; 5];
        for event in &selected {
            assert!(!event.touches(&seen));
            event.consume(&mut seen);
        }
        assert_eq!(seen, consumed.as_slice());
    }

    #[test]
    fn pre_consumed_indices_are_excluded() {
        let events = vec![Event::order1(0, 0, 0, 100.0, 0), Event::order1(1, 0, 0, 100.0, 0)];
        let mut rng = StdRng::seed_from_u64(1);
        let mut consumed = vec![true, false];
        let selected = select(events, 1.0, false, &mut rng, &mut consumed);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].idx1, 1);
    }

    #[test]
    fn zero_acceptance_selects_nothing() {
        let events = vec![Event::order1(0, 0, 0, 1.0, 0); 3];
        let mut rng = StdRng::seed_from_u64(1);
        let mut consumed = vec![false; 1];
        assert!(select(events, 0.0, true, &mut rng, &mut consumed).is_empty());
        assert!(!consumed[0]);
    }
}
