//! Dense particle table.
//!
//! Entries are addressed by their position in the table. Removing a particle
//! only flags its entry as deactivated and remembers the slot, so indices held
//! by the neighbor list or by topologies stay valid until [`ParticleStore::compact`]
//! is called explicitly.

use super::particle::{Particle, ParticleEntry};

/// Batched mutation produced by one reaction pass.
#[derive(Debug, Clone, Default)]
pub struct ParticleUpdate {
    /// Entries to insert.
    pub new_entries: Vec<ParticleEntry>,
    /// Indices to deactivate.
    pub decayed: Vec<usize>,
    /// Indices whose position changed in place.
    pub displaced: Vec<usize>,
}

impl ParticleUpdate {
    pub fn is_empty(&self) -> bool {
        self.new_entries.is_empty() && self.decayed.is_empty() && self.displaced.is_empty()
    }
}

/// Index-level summary of an applied [`ParticleUpdate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppliedUpdate {
    pub added: Vec<usize>,
    pub removed: Vec<usize>,
    pub displaced: Vec<usize>,
}

impl AppliedUpdate {
    pub fn n_changes(&self) -> usize {
        self.added.len() + self.removed.len() + self.displaced.len()
    }
}

/// Access contract the reaction machinery needs from a particle table.
pub trait ParticleDataStore {
    fn entry_at(&self, index: usize) -> &ParticleEntry;

    fn entry_at_mut(&mut self, index: usize) -> &mut ParticleEntry;

    /// Inserts particles and returns the indices they were stored at.
    fn add_particles<I>(&mut self, particles: I) -> Vec<usize>
    where
        I: IntoIterator<Item = Particle>;

    /// Number of slots, deactivated ones included.
    fn size(&self) -> usize;

    fn iter(&self) -> impl Iterator<Item = &ParticleEntry>;

    /// Applies removals first, then insertions.
    fn update(&mut self, update: ParticleUpdate) -> AppliedUpdate;
}

#[derive(Debug, Clone, Default)]
pub struct ParticleStore {
    entries: Vec<ParticleEntry>,
    blanks: Vec<usize>,
}

impl ParticleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            blanks: Vec::new(),
        }
    }

    /// Inserts one entry, reusing a deactivated slot if one is available.
    pub fn insert_entry(&mut self, mut entry: ParticleEntry) -> usize {
        entry.deactivated = false;
        match self.blanks.pop() {
            Some(index) => {
                self.entries[index] = entry;
                index
            }
            None => {
                self.entries.push(entry);
                self.entries.len() - 1
            }
        }
    }

    /// Flags an entry as deactivated. Returns `false` if it already was.
    pub fn deactivate(&mut self, index: usize) -> bool {
        let entry = &mut self.entries[index];
        if entry.deactivated {
            return false;
        }
        entry.deactivated = true;
        self.blanks.push(index);
        true
    }

    #[inline]
    pub fn is_active(&self, index: usize) -> bool {
        self.entries.get(index).is_some_and(|e| !e.deactivated)
    }

    #[inline]
    pub fn n_deactivated(&self) -> usize {
        self.blanks.len()
    }

    #[inline]
    pub fn n_active(&self) -> usize {
        self.entries.len() - self.blanks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n_active() == 0
    }

    /// Indices of all active entries in ascending order.
    pub fn active_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.deactivated)
            .map(|(i, _)| i)
    }

    pub fn entries(&self) -> &[ParticleEntry] {
        &self.entries
    }

    /// Removes deactivated entries while preserving the order of active ones.
    ///
    /// Returns the old-to-new index mapping; removed slots map to `None`.
    pub fn compact(&mut self) -> Vec<Option<usize>> {
        let mut mapping = Vec::with_capacity(self.entries.len());
        let mut next = 0;
        for entry in &self.entries {
            if entry.deactivated {
                mapping.push(None);
            } else {
                mapping.push(Some(next));
                next += 1;
            }
        }
        self.entries.retain(|e| !e.deactivated);
        self.blanks.clear();
        mapping
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.blanks.clear();
    }
}

impl ParticleDataStore for ParticleStore {
    #[inline]
    fn entry_at(&self, index: usize) -> &ParticleEntry {
        &self.entries[index]
    }

    #[inline]
    fn entry_at_mut(&mut self, index: usize) -> &mut ParticleEntry {
        &mut self.entries[index]
    }

    fn add_particles<I>(&mut self, particles: I) -> Vec<usize>
    where
        I: IntoIterator<Item = Particle>,
    {
        particles
            .into_iter()
            .map(|p| self.insert_entry(ParticleEntry::from(p)))
            .collect()
    }

    #[inline]
    fn size(&self) -> usize {
        self.entries.len()
    }

    fn iter(&self) -> impl Iterator<Item = &ParticleEntry> {
        self.entries.iter()
    }

    fn update(&mut self, update: ParticleUpdate) -> AppliedUpdate {
        let ParticleUpdate {
            new_entries,
            decayed,
            displaced,
        } = update;

        let mut removed = Vec::with_capacity(decayed.len());
        for index in decayed {
            if self.deactivate(index) {
                removed.push(index);
            }
        }
        let displaced = displaced
            .into_iter()
            .filter(|&i| self.is_active(i))
            .collect();
        let added = new_entries
            .into_iter()
            .map(|e| self.insert_entry(e))
            .collect();

        AppliedUpdate {
            added,
            removed,
            displaced,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_store(n: usize) -> ParticleStore {
        let mut store = ParticleStore::new();
        store.add_particles((0..n).map(|i| Particle::new(0, [i as f64, 0.0, 0.0])));
        store
    }

    #[test]
    fn add_particles_appends_in_order() {
        let store = make_store(3);
        assert_eq!(store.size(), 3);
        assert_eq!(store.n_active(), 3);
        assert_eq!(store.entry_at(2).position, [2.0, 0.0, 0.0]);
    }

    #[test]
    fn deactivate_is_idempotent() {
        let mut store = make_store(2);
        assert!(store.deactivate(1));
        assert!(!store.deactivate(1));
        assert_eq!(store.n_active(), 1);
        assert_eq!(store.n_deactivated(), 1);
    }

    #[test]
    fn update_reuses_freed_slots() {
        let mut store = make_store(3);
        let applied = store.update(ParticleUpdate {
            new_entries: vec![ParticleEntry::new(1, [9.0, 0.0, 0.0])],
            decayed: vec![1],
            displaced: vec![],
        });
        assert_eq!(applied.removed, vec![1]);
        assert_eq!(applied.added, vec![1]);
        assert_eq!(store.size(), 3);
        assert_eq!(store.entry_at(1).type_id, 1);
        assert!(!store.entry_at(1).is_deactivated());
    }

    #[test]
    fn update_drops_displacement_of_removed_entries() {
        let mut store = make_store(3);
        let applied = store.update(ParticleUpdate {
            new_entries: vec![],
            decayed: vec![0],
            displaced: vec![0, 2],
        });
        assert_eq!(applied.displaced, vec![2]);
    }

    #[test]
    fn compact_preserves_active_order() {
        let mut store = make_store(5);
        store.deactivate(1);
        store.deactivate(3);
        let ids: Vec<_> = [0, 2, 4].iter().map(|&i| store.entry_at(i).id).collect();
        let mapping = store.compact();
        assert_eq!(mapping, vec![Some(0), None, Some(1), None, Some(2)]);
        assert_eq!(store.size(), 3);
        assert_eq!(store.n_deactivated(), 0);
        let after: Vec<_> = store.iter().map(|e| e.id).collect();
        assert_eq!(after, ids);
    }

    #[test]
    fn active_indices_skip_deactivated() {
        let mut store = make_store(4);
        store.deactivate(2);
        let active: Vec<_> = store.active_indices().collect();
        assert_eq!(active, vec![0, 1, 3]);
    }
}
