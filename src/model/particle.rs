use super::geometry::Vec3;
use super::types::ParticleTypeId;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_PARTICLE_ID: AtomicU64 = AtomicU64::new(0);

/// Globally unique, monotonically increasing particle identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticleId(pub u64);

impl ParticleId {
    /// Draws a fresh id. Ids are never reused within a process.
    pub fn next() -> Self {
        Self(NEXT_PARTICLE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ParticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A free-standing particle, as handed to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub id: ParticleId,
    pub type_id: ParticleTypeId,
    pub position: Vec3,
}

impl Particle {
    pub fn new(type_id: ParticleTypeId, position: Vec3) -> Self {
        Self {
            id: ParticleId::next(),
            type_id,
            position,
        }
    }
}

/// Dense-table row of the particle store.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleEntry {
    pub id: ParticleId,
    pub type_id: ParticleTypeId,
    pub position: Vec3,
    pub force: Vec3,
    pub deactivated: bool,
}

impl ParticleEntry {
    pub fn new(type_id: ParticleTypeId, position: Vec3) -> Self {
        Self::from(Particle::new(type_id, position))
    }

    #[inline]
    pub fn is_deactivated(&self) -> bool {
        self.deactivated
    }

    /// Assigns a fresh identity, used whenever a reaction produces this entry anew.
    pub fn renew_id(&mut self) -> ParticleId {
        self.id = ParticleId::next();
        self.id
    }

    pub fn to_particle(&self) -> Particle {
        Particle {
            id: self.id,
            type_id: self.type_id,
            position: self.position,
        }
    }
}

impl From<Particle> for ParticleEntry {
    fn from(p: Particle) -> Self {
        Self {
            id: p.id,
            type_id: p.type_id,
            position: p.position,
            force: [0.0; 3],
            deactivated: false,
        }
    }
}
