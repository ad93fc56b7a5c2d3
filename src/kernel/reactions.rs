//! Application of a single reaction event.
//!
//! Outcomes are written partly in place (retyping, moving, fresh ids) and
//! partly into a [`ParticleUpdate`] collected over the whole pass (removals and
//! new particles). Schedulers guarantee that no index is touched by two events
//! of the same pass, so in-place writes never race with pending removals.

use super::events::Event;
use crate::model::context::Context;
use crate::model::geometry::{add, scale};
use crate::model::particle::ParticleEntry;
use crate::model::reaction::{Reaction, ReactionKind};
use crate::model::record::ReactionRecord;
use crate::model::store::{ParticleDataStore, ParticleUpdate};
use rand::Rng;
use rand_distr::{Distribution, UnitSphere};

/// Looks up the reaction an event refers to.
pub fn reaction_of<'c>(ctx: &'c Context, event: &Event) -> &'c Reaction {
    let reactions = ctx.reactions();
    if event.n_educts == 1 {
        &reactions.order1_by_type(event.t1)[event.reaction_index]
    } else {
        &reactions.order2_by_types(event.t1, event.t2)[event.reaction_index]
    }
}

/// Executes `event` and returns a record describing it.
pub fn perform_reaction<S, R>(
    ctx: &Context,
    store: &mut S,
    event: &Event,
    rng: &mut R,
    update: &mut ParticleUpdate,
) -> ReactionRecord
where
    S: ParticleDataStore,
    R: Rng + ?Sized,
{
    let reaction = reaction_of(ctx, event);
    let (idx1, idx2) = (event.idx1, event.idx2);
    let e1 = store.entry_at(idx1).clone();
    let e2 = store.entry_at(idx2).clone();
    let half_diff = scale(ctx.shortest_difference(e1.position, e2.position), 0.5);

    let mut record = ReactionRecord {
        reaction_type: reaction.reaction_type(),
        reaction_index: event.reaction_index,
        educts: [e1.id, e2.id],
        types_from: [e1.type_id, e2.type_id],
        products: [None, None],
        position: ctx.simulation_box().wrapped(add(e1.position, half_diff)),
    };

    match reaction.kind {
        ReactionKind::Decay { .. } => {
            update.decayed.push(idx1);
        }
        ReactionKind::Conversion { to, .. } => {
            let entry = store.entry_at_mut(idx1);
            entry.type_id = to;
            record.products[0] = Some(entry.renew_id());
        }
        ReactionKind::Enzymatic { catalyst, to, .. } => {
            let (converted, catalyst_id) = if e1.type_id == catalyst {
                (idx2, e1.id)
            } else {
                (idx1, e2.id)
            };
            let entry = store.entry_at_mut(converted);
            entry.type_id = to;
            record.products = [Some(entry.renew_id()), Some(catalyst_id)];
        }
        ReactionKind::Fission {
            to1,
            to2,
            product_distance,
            weight1,
            weight2,
            ..
        } => {
            let direction: [f64; 3] = UnitSphere.sample(rng);
            let offset = scale(direction, product_distance);

            let mut pos2 = add(e1.position, scale(offset, -weight2));
            ctx.fix_position(&mut pos2);
            let product = ParticleEntry::new(to2, pos2);
            record.products[1] = Some(product.id);
            update.new_entries.push(product);

            let entry = store.entry_at_mut(idx1);
            entry.type_id = to1;
            entry.position = add(e1.position, scale(offset, weight1));
            ctx.fix_position(&mut entry.position);
            record.products[0] = Some(entry.renew_id());
            update.displaced.push(idx1);
        }
        ReactionKind::Fusion {
            from1,
            to,
            weight1,
            weight2,
            ..
        } => {
            let diff = ctx.shortest_difference(e1.position, e2.position);
            let weight = if from1 == e1.type_id { weight1 } else { weight2 };
            let entry = store.entry_at_mut(idx1);
            entry.type_id = to;
            entry.position = add(e1.position, scale(diff, weight));
            ctx.fix_position(&mut entry.position);
            record.products[0] = Some(entry.renew_id());
            update.displaced.push(idx1);
            update.decayed.push(idx2);
        }
    }
    record
}
