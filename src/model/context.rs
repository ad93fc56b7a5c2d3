use super::geometry::{SimulationBox, Vec3};
use super::reaction::{InvalidReactionError, Reaction, ReactionHandle, ReactionRegistry};
use super::types::{
    ParticleFlavor, ParticleTypeId, ParticleTypeRegistry, RegisterTypeError,
    UnknownParticleTypeError,
};
use crate::topology::potentials::{
    AngleConfiguration, BondConfiguration, TopologyPotentialRegistry, TorsionConfiguration,
};

/// Static description of a simulated system.
///
/// The context is read-only during a simulation step; all of its geometric
/// queries are pure.
#[derive(Debug, Clone, Default)]
pub struct Context {
    simulation_box: SimulationBox,
    types: ParticleTypeRegistry,
    reactions: ReactionRegistry,
    topology_potentials: TopologyPotentialRegistry,
    interaction_cutoff: f64,
}

impl Context {
    pub fn new(simulation_box: SimulationBox) -> Self {
        Self {
            simulation_box,
            ..Self::default()
        }
    }

    #[inline]
    pub fn simulation_box(&self) -> &SimulationBox {
        &self.simulation_box
    }

    pub fn set_box_size(&mut self, size: Vec3) {
        self.simulation_box.size = size;
    }

    pub fn set_periodic_boundary(&mut self, periodic: [bool; 3]) {
        self.simulation_box.periodic = periodic;
    }

    #[inline]
    pub fn particle_types(&self) -> &ParticleTypeRegistry {
        &self.types
    }

    pub fn add_particle_type(
        &mut self,
        name: &str,
        diffusion_constant: f64,
        radius: f64,
        flavor: ParticleFlavor,
    ) -> Result<ParticleTypeId, RegisterTypeError> {
        self.types.add(name, diffusion_constant, radius, flavor)
    }

    pub fn type_id(&self, name: &str) -> Result<ParticleTypeId, UnknownParticleTypeError> {
        self.types.id_of(name)
    }

    #[inline]
    pub fn reactions(&self) -> &ReactionRegistry {
        &self.reactions
    }

    /// Registers a reaction after checking that all of its types exist and
    /// are of normal flavor.
    pub fn add_reaction(&mut self, reaction: Reaction) -> Result<ReactionHandle, InvalidReactionError> {
        for t in reaction.educts().into_iter().chain(reaction.products()) {
            match self.types.flavor_of(t) {
                None => {
                    return Err(InvalidReactionError::new(
                        &reaction.name,
                        format!("particle type id {} is not registered", t),
                    ));
                }
                Some(ParticleFlavor::Topology) => {
                    return Err(InvalidReactionError::new(
                        &reaction.name,
                        format!(
                            "particle type '{}' is topology-flavored",
                            self.types.name_of(t).unwrap_or_default()
                        ),
                    ));
                }
                Some(ParticleFlavor::Normal) => {}
            }
        }
        self.reactions.add(reaction)
    }

    #[inline]
    pub fn topology_potentials(&self) -> &TopologyPotentialRegistry {
        &self.topology_potentials
    }

    pub fn configure_topology_bond_potential(
        &mut self,
        type1: &str,
        type2: &str,
        config: BondConfiguration,
    ) -> Result<(), UnknownParticleTypeError> {
        let (t1, t2) = (self.types.id_of(type1)?, self.types.id_of(type2)?);
        self.topology_potentials.configure_bond(t1, t2, config);
        Ok(())
    }

    pub fn configure_topology_angle_potential(
        &mut self,
        type1: &str,
        type2: &str,
        type3: &str,
        config: AngleConfiguration,
    ) -> Result<(), UnknownParticleTypeError> {
        let t1 = self.types.id_of(type1)?;
        let t2 = self.types.id_of(type2)?;
        let t3 = self.types.id_of(type3)?;
        self.topology_potentials.configure_angle(t1, t2, t3, config);
        Ok(())
    }

    pub fn configure_topology_torsion_potential(
        &mut self,
        types: [&str; 4],
        config: TorsionConfiguration,
    ) -> Result<(), UnknownParticleTypeError> {
        let mut ids = [0; 4];
        for (slot, name) in ids.iter_mut().zip(types) {
            *slot = self.types.id_of(name)?;
        }
        self.topology_potentials
            .configure_torsion(ids[0], ids[1], ids[2], ids[3], config);
        Ok(())
    }

    /// Cutoff of externally evaluated pair interactions.
    pub fn set_interaction_cutoff(&mut self, cutoff: f64) {
        self.interaction_cutoff = cutoff;
    }

    /// Largest distance at which any pair of particles can interact or react.
    pub fn max_cutoff(&self) -> f64 {
        self.interaction_cutoff
            .max(self.reactions.max_educt_distance())
    }

    #[inline]
    pub fn shortest_difference(&self, from: Vec3, to: Vec3) -> Vec3 {
        self.simulation_box.shortest_difference(from, to)
    }

    #[inline]
    pub fn dist_squared(&self, a: Vec3, b: Vec3) -> f64 {
        self.simulation_box.dist_squared(a, b)
    }

    #[inline]
    pub fn fix_position(&self, pos: &mut Vec3) {
        self.simulation_box.fix_position(pos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_context() -> Context {
        let mut ctx = Context::new(SimulationBox::new([10.0; 3], [true; 3]));
        ctx.add_particle_type("A", 1.0, 1.0, ParticleFlavor::Normal)
            .unwrap();
        ctx.add_particle_type("B", 1.0, 1.0, ParticleFlavor::Normal)
            .unwrap();
        ctx.add_particle_type("T", 1.0, 1.0, ParticleFlavor::Topology)
            .unwrap();
        ctx
    }

    #[test]
    fn max_cutoff_combines_reactions_and_interactions() {
        let mut ctx = make_context();
        assert_eq!(ctx.max_cutoff(), 0.0);
        ctx.add_reaction(Reaction::fusion("f", 0, 1, 0, 1.0, 1.5))
            .unwrap();
        assert_eq!(ctx.max_cutoff(), 1.5);
        ctx.set_interaction_cutoff(2.0);
        assert_eq!(ctx.max_cutoff(), 2.0);
    }

    #[test]
    fn rejects_topology_flavored_educts() {
        let mut ctx = make_context();
        let result = ctx.add_reaction(Reaction::decay("d", 2, 1.0));
        assert!(result.is_err());
    }

    #[test]
    fn rejects_unregistered_types() {
        let mut ctx = make_context();
        let result = ctx.add_reaction(Reaction::conversion("c", 0, 42, 1.0));
        assert!(result.is_err());
    }

    #[test]
    fn configures_bond_potential_by_name() {
        let mut ctx = make_context();
        ctx.configure_topology_bond_potential(
            "T",
            "T",
            BondConfiguration {
                force_constant: 10.0,
                length: 1.0,
            },
        )
        .unwrap();
        assert!(ctx.topology_potentials().bond(2, 2).is_some());
        assert!(
            ctx.configure_topology_bond_potential(
                "T",
                "X",
                BondConfiguration {
                    force_constant: 1.0,
                    length: 1.0
                }
            )
            .is_err()
        );
    }
}
