//! Spatial compartments with per-compartment type conversions.
//!
//! Once per step, every active normal-flavored particle is checked against
//! the compartments in registration order. Whenever a particle lies inside a
//! compartment that has a conversion for its current type, it is retyped.
//! Conversions chain: a particle converted by one compartment can be converted
//! again by a later one in the same pass.

use super::events::is_masked;
use crate::model::context::Context;
use crate::model::geometry::{SimulationBox, Vec3, dot, norm_squared};
use crate::model::store::{ParticleDataStore, ParticleStore};
use crate::model::types::{ParticleFlavor, ParticleTypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Custom membership predicate, evaluated on wrapped positions.
pub type RegionFn = dyn Fn(&Vec3) -> bool + Send + Sync;

/// Spatial extent of a compartment.
#[derive(Clone)]
pub enum Region {
    /// Inside (or, with `larger`, outside) a sphere, measured with the minimum image.
    Sphere {
        origin: Vec3,
        radius: f64,
        larger: bool,
    },
    /// The half space `normal · x < distance` (or `>` with `larger`).
    Plane {
        normal: Vec3,
        distance: f64,
        larger: bool,
    },
    Custom(Arc<RegionFn>),
}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Region::Sphere {
                origin,
                radius,
                larger,
            } => f
                .debug_struct("Sphere")
                .field("origin", origin)
                .field("radius", radius)
                .field("larger", larger)
                .finish(),
            Region::Plane {
                normal,
                distance,
                larger,
            } => f
                .debug_struct("Plane")
                .field("normal", normal)
                .field("distance", distance)
                .field("larger", larger)
                .finish(),
            Region::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl Region {
    /// Whether `pos` lies inside the region. Spheres use the minimum image.
    pub fn contains(&self, simulation_box: &SimulationBox, pos: Vec3) -> bool {
        match self {
            Region::Sphere {
                origin,
                radius,
                larger,
            } => {
                let d2 = norm_squared(simulation_box.shortest_difference(*origin, pos));
                if *larger {
                    d2 > radius * radius
                } else {
                    d2 < radius * radius
                }
            }
            Region::Plane {
                normal,
                distance,
                larger,
            } => {
                let signed = dot(*normal, pos) - distance;
                if *larger { signed > 0.0 } else { signed < 0.0 }
            }
            Region::Custom(f) => f(&pos),
        }
    }
}

/// A named region with type conversions applied to particles inside it.
#[derive(Debug, Clone)]
pub struct Compartment {
    pub name: String,
    pub region: Region,
    conversions: HashMap<ParticleTypeId, ParticleTypeId>,
}

impl Compartment {
    pub fn new(name: &str, region: Region) -> Self {
        Self {
            name: name.to_string(),
            region,
            conversions: HashMap::new(),
        }
    }

    /// Converts particles of type `from` to `to` while inside the region.
    /// A later conversion for the same `from` replaces the earlier one.
    pub fn with_conversion(mut self, from: ParticleTypeId, to: ParticleTypeId) -> Self {
        self.conversions.insert(from, to);
        self
    }

    /// Target type for particles of `type_id`, if this compartment converts them.
    pub fn conversion_for(&self, type_id: ParticleTypeId) -> Option<ParticleTypeId> {
        self.conversions.get(&type_id).copied()
    }
}

/// Compartments in registration order.
#[derive(Debug, Clone, Default)]
pub struct Compartments {
    compartments: Vec<Compartment>,
}

impl Compartments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a compartment and returns its index.
    pub fn add(&mut self, compartment: Compartment) -> usize {
        self.compartments.push(compartment);
        self.compartments.len() - 1
    }

    pub fn len(&self) -> usize {
        self.compartments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compartments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Compartment> {
        self.compartments.iter()
    }

    /// Applies all conversions and returns the number of retyped particles.
    ///
    /// Entries flagged in `bound` belong to a topology and are left alone.
    pub fn apply(&self, ctx: &Context, store: &mut ParticleStore, bound: &[bool]) -> usize {
        if self.compartments.is_empty() {
            return 0;
        }
        let types = ctx.particle_types();
        let indices: Vec<usize> = store.active_indices().collect();
        let mut converted = 0;
        for index in indices {
            let entry = store.entry_at_mut(index);
            if is_masked(bound, index)
                || types.flavor_of(entry.type_id) != Some(ParticleFlavor::Normal)
            {
                continue;
            }
            let before = entry.type_id;
            for compartment in &self.compartments {
                if let Some(to) = compartment.conversion_for(entry.type_id)
                    && compartment.region.contains(ctx.simulation_box(), entry.position)
                {
                    entry.type_id = to;
                }
            }
            if entry.type_id != before {
                converted += 1;
            }
        }
        converted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::particle::Particle;

    fn make_context() -> Context {
        let mut ctx = Context::new(SimulationBox::new([10.0; 3], [true; 3]));
        for name in ["A", "B", "C"] {
            ctx.add_particle_type(name, 1.0, 1.0, ParticleFlavor::Normal)
                .unwrap();
        }
        ctx.add_particle_type("T", 1.0, 1.0, ParticleFlavor::Topology)
            .unwrap();
        ctx
    }

    #[test]
    fn sphere_uses_minimum_image() {
        let bx = SimulationBox::new([10.0; 3], [true; 3]);
        let sphere = Region::Sphere {
            origin: [4.5, 0.0, 0.0],
            radius: 1.0,
            larger: false,
        };
        assert!(sphere.contains(&bx, [-4.8, 0.0, 0.0]));
        assert!(!sphere.contains(&bx, [0.0, 0.0, 0.0]));
    }

    #[test]
    fn plane_sides() {
        let bx = SimulationBox::default();
        let below = Region::Plane {
            normal: [0.0, 0.0, 1.0],
            distance: 1.0,
            larger: false,
        };
        assert!(below.contains(&bx, [0.0, 0.0, 0.5]));
        assert!(!below.contains(&bx, [0.0, 0.0, 1.5]));
    }

    #[test]
    fn conversions_apply_in_order_and_skip_topology_particles() {
        let ctx = make_context();
        let mut store = ParticleStore::new();
        store.add_particles([
            Particle::new(0, [0.0, 0.0, 0.0]),
            Particle::new(0, [3.0, 0.0, 0.0]),
            Particle::new(3, [0.0, 0.0, 0.0]),
        ]);
        let mut compartments = Compartments::new();
        let everywhere: Arc<RegionFn> = Arc::new(|_: &Vec3| true);
        compartments.add(
            Compartment::new(
                "core",
                Region::Sphere {
                    origin: [0.0; 3],
                    radius: 1.0,
                    larger: false,
                },
            )
            .with_conversion(0, 1),
        );
        compartments.add(Compartment::new("all", Region::Custom(everywhere)).with_conversion(1, 2));

        assert_eq!(compartments.apply(&ctx, &mut store, &[]), 1);
        assert_eq!(store.entry_at(0).type_id, 2);
        assert_eq!(store.entry_at(1).type_id, 0);
        assert_eq!(store.entry_at(2).type_id, 3);
    }
}
