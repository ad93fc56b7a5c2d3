use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Numeric particle type handle, dense and 0-based in registration order.
pub type ParticleTypeId = u16;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown particle type: '{0}'")]
pub struct UnknownParticleTypeError(pub String);

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegisterTypeError {
    /// Type names are unique.
    #[error("particle type '{0}' is already registered")]
    Duplicate(String),
    /// Diffusion constant or radius is negative or not finite.
    #[error("particle type '{name}' has invalid {property}: {value}")]
    InvalidProperty {
        name: String,
        property: &'static str,
        value: f64,
    },
    /// Every [`ParticleTypeId`] is in use.
    #[error("too many particle types registered")]
    Exhausted,
}

/// Capability class of a particle type.
///
/// Only `Topology`-flavored particles may be vertices of a topology graph
/// after a structural reaction; only `Normal` particles take part in
/// ordinary reactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticleFlavor {
    #[default]
    Normal,
    Topology,
}

impl fmt::Display for ParticleFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParticleFlavor::Normal => write!(f, "normal"),
            ParticleFlavor::Topology => write!(f, "topology"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParticleTypeInfo {
    pub name: String,
    pub diffusion_constant: f64,
    pub radius: f64,
    pub flavor: ParticleFlavor,
    pub type_id: ParticleTypeId,
}

#[derive(Debug, Clone, Default)]
pub struct ParticleTypeRegistry {
    infos: Vec<ParticleTypeInfo>,
    by_name: HashMap<String, ParticleTypeId>,
}

impl ParticleTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new type and returns its id.
    pub fn add(
        &mut self,
        name: &str,
        diffusion_constant: f64,
        radius: f64,
        flavor: ParticleFlavor,
    ) -> Result<ParticleTypeId, RegisterTypeError> {
        if self.by_name.contains_key(name) {
            return Err(RegisterTypeError::Duplicate(name.to_string()));
        }
        if !(diffusion_constant >= 0.0) {
            return Err(RegisterTypeError::InvalidProperty {
                name: name.to_string(),
                property: "diffusion constant",
                value: diffusion_constant,
            });
        }
        if !(radius >= 0.0) {
            return Err(RegisterTypeError::InvalidProperty {
                name: name.to_string(),
                property: "radius",
                value: radius,
            });
        }
        let type_id = ParticleTypeId::try_from(self.infos.len())
            .map_err(|_| RegisterTypeError::Exhausted)?;
        self.infos.push(ParticleTypeInfo {
            name: name.to_string(),
            diffusion_constant,
            radius,
            flavor,
            type_id,
        });
        self.by_name.insert(name.to_string(), type_id);
        Ok(type_id)
    }

    pub fn id_of(&self, name: &str) -> Result<ParticleTypeId, UnknownParticleTypeError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| UnknownParticleTypeError(name.to_string()))
    }

    pub fn info_of(&self, type_id: ParticleTypeId) -> Option<&ParticleTypeInfo> {
        self.infos.get(type_id as usize)
    }

    pub fn name_of(&self, type_id: ParticleTypeId) -> Option<&str> {
        self.info_of(type_id).map(|info| info.name.as_str())
    }

    /// Flavor of a registered type; unknown ids report `None`.
    pub fn flavor_of(&self, type_id: ParticleTypeId) -> Option<ParticleFlavor> {
        self.info_of(type_id).map(|info| info.flavor)
    }

    #[inline]
    pub fn contains(&self, type_id: ParticleTypeId) -> bool {
        (type_id as usize) < self.infos.len()
    }

    #[inline]
    pub fn n_types(&self) -> usize {
        self.infos.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParticleTypeInfo> {
        self.infos.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_registry() -> ParticleTypeRegistry {
        let mut types = ParticleTypeRegistry::new();
        types.add("A", 1.0, 1.0, ParticleFlavor::Normal).unwrap();
        types.add("T", 0.5, 1.0, ParticleFlavor::Topology).unwrap();
        types
    }

    #[test]
    fn ids_are_dense_in_registration_order() {
        let types = make_registry();
        assert_eq!(types.id_of("A").unwrap(), 0);
        assert_eq!(types.id_of("T").unwrap(), 1);
        assert_eq!(types.n_types(), 2);
        assert_eq!(types.name_of(1), Some("T"));
    }

    #[test]
    fn flavor_lookup() {
        let types = make_registry();
        assert_eq!(types.flavor_of(0), Some(ParticleFlavor::Normal));
        assert_eq!(types.flavor_of(1), Some(ParticleFlavor::Topology));
        assert_eq!(types.flavor_of(9), None);
    }

    #[test]
    fn errors_on_unknown_name() {
        let types = make_registry();
        assert_eq!(
            types.id_of("B"),
            Err(UnknownParticleTypeError("B".to_string()))
        );
    }

    #[test]
    fn errors_on_duplicate_name() {
        let mut types = make_registry();
        let result = types.add("A", 1.0, 1.0, ParticleFlavor::Normal);
        assert!(matches!(result, Err(RegisterTypeError::Duplicate(_))));
    }

    #[test]
    fn errors_on_negative_diffusion_constant() {
        let mut types = ParticleTypeRegistry::new();
        let result = types.add("X", -1.0, 1.0, ParticleFlavor::Normal);
        assert!(matches!(
            result,
            Err(RegisterTypeError::InvalidProperty {
                property: "diffusion constant",
                ..
            })
        ));
    }
}
