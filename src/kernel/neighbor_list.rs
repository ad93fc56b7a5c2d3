//! Cell-list spatial index.
//!
//! The box is divided into a grid whose cells are at least one cutoff wide
//! along every axis, so all neighbors of a particle lie in its own cell or in
//! one of the (up to 26) adjacent cells. Along periodic axes, adjacency wraps
//! around; with only one or two cells along an axis, the wrapped neighbors
//! coincide and are visited once.

use super::error::Error;
use crate::model::geometry::{SimulationBox, Vec3};
use crate::model::store::{AppliedUpdate, ParticleDataStore};

/// Cell-list partition of the simulation box for pair searches within a cutoff.
#[derive(Debug, Clone)]
pub struct CellList {
    simulation_box: SimulationBox,
    cutoff: f64,
    n_cells: [usize; 3],
    cell_size: Vec3,
    /// Distinct cells adjacent to each cell, the cell itself included.
    adjacent: Vec<Vec<usize>>,
    /// Store indices per cell.
    cells: Vec<Vec<usize>>,
    /// Cell of each store index, `None` for indices not in the list.
    cell_of: Vec<Option<usize>>,
}

impl CellList {
    /// Lays out the grid for `simulation_box` and `cutoff`.
    ///
    /// A dimension shorter than twice the cutoff collapses to a single cell.
    pub fn set_up(simulation_box: SimulationBox, cutoff: f64) -> Result<Self, Error> {
        if !(cutoff > 0.0 && cutoff.is_finite()) {
            return Err(Error::InvalidCutoff(cutoff));
        }
        if simulation_box.size.iter().any(|&l| !(l > 0.0 && l.is_finite())) {
            return Err(Error::InvalidBox(format!(
                "edge lengths must be positive, got {:?}",
                simulation_box.size
            )));
        }

        let mut n_cells = [1; 3];
        let mut cell_size = simulation_box.size;
        for axis in 0..3 {
            let l = simulation_box.size[axis];
            if l >= 2.0 * cutoff {
                n_cells[axis] = ((l / cutoff).floor() as usize).max(1);
                cell_size[axis] = l / n_cells[axis] as f64;
            }
        }

        let total = n_cells[0] * n_cells[1] * n_cells[2];
        let mut list = Self {
            simulation_box,
            cutoff,
            n_cells,
            cell_size,
            adjacent: Vec::with_capacity(total),
            cells: vec![Vec::new(); total],
            cell_of: Vec::new(),
        };
        list.adjacent = (0..total).map(|c| list.adjacent_cells(c)).collect();
        Ok(list)
    }

    fn flat(&self, c: [usize; 3]) -> usize {
        (c[0] * self.n_cells[1] + c[1]) * self.n_cells[2] + c[2]
    }

    fn unflat(&self, c: usize) -> [usize; 3] {
        let z = c % self.n_cells[2];
        let y = (c / self.n_cells[2]) % self.n_cells[1];
        let x = c / (self.n_cells[1] * self.n_cells[2]);
        [x, y, z]
    }

    fn adjacent_cells(&self, cell: usize) -> Vec<usize> {
        let center = self.unflat(cell);
        let mut out = Vec::with_capacity(27);
        for dx in -1isize..=1 {
            for dy in -1isize..=1 {
                for dz in -1isize..=1 {
                    let mut coords = [0usize; 3];
                    let mut inside = true;
                    for (axis, d) in [dx, dy, dz].into_iter().enumerate() {
                        let n = self.n_cells[axis] as isize;
                        let mut c = center[axis] as isize + d;
                        if self.simulation_box.periodic[axis] {
                            c = c.rem_euclid(n);
                        } else if c < 0 || c >= n {
                            inside = false;
                            break;
                        }
                        coords[axis] = c as usize;
                    }
                    if inside {
                        out.push(self.flat(coords));
                    }
                }
            }
        }
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Cell containing `pos`. Positions outside the box are clamped to the border cells.
    pub fn cell_index(&self, pos: Vec3) -> usize {
        let pos = self.simulation_box.wrapped(pos);
        let lower = self.simulation_box.lower();
        let mut coords = [0usize; 3];
        for axis in 0..3 {
            let c = ((pos[axis] - lower[axis]) / self.cell_size[axis]).floor();
            let max = (self.n_cells[axis] - 1) as f64;
            coords[axis] = c.clamp(0.0, max) as usize;
        }
        self.flat(coords)
    }

    #[inline]
    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    /// Number of cells along each axis.
    #[inline]
    pub fn n_cells(&self) -> [usize; 3] {
        self.n_cells
    }

    /// Cell currently holding store entry `index`, or `None` if it is not indexed.
    pub fn cell_of(&self, index: usize) -> Option<usize> {
        self.cell_of.get(index).copied().flatten()
    }

    /// Number of indices currently assigned to a cell.
    pub fn len(&self) -> usize {
        self.cells.iter().map(Vec::len).sum()
    }

    /// Whether no entry is indexed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Assigns every active store entry to its cell, discarding the previous assignment.
    pub fn fill_cells<S: ParticleDataStore>(&mut self, store: &S) {
        for cell in &mut self.cells {
            cell.clear();
        }
        self.cell_of.clear();
        self.cell_of.resize(store.size(), None);
        for (index, entry) in store.iter().enumerate() {
            if entry.is_deactivated() {
                continue;
            }
            let cell = self.cell_index(entry.position);
            self.cells[cell].push(index);
            self.cell_of[index] = Some(cell);
        }
    }

    fn remove(&mut self, index: usize) {
        if let Some(cell) = self.cell_of.get_mut(index).and_then(Option::take) {
            let members = &mut self.cells[cell];
            if let Some(pos) = members.iter().position(|&i| i == index) {
                members.swap_remove(pos);
            }
        }
    }

    fn insert(&mut self, index: usize, pos: Vec3) {
        if index >= self.cell_of.len() {
            self.cell_of.resize(index + 1, None);
        }
        let cell = self.cell_index(pos);
        self.cells[cell].push(index);
        self.cell_of[index] = Some(cell);
    }

    /// Applies one batched store update.
    ///
    /// Falls back to a full [`fill_cells`](Self::fill_cells) if the number of
    /// changed entries exceeds `rebuild_threshold` times the number of indexed
    /// entries. Returns whether a full rebuild happened.
    pub fn update_data<S: ParticleDataStore>(
        &mut self,
        store: &S,
        applied: &AppliedUpdate,
        rebuild_threshold: f64,
    ) -> bool {
        let indexed = self.len().max(1);
        if applied.n_changes() as f64 > rebuild_threshold * indexed as f64 {
            self.fill_cells(store);
            return true;
        }
        for &index in &applied.removed {
            self.remove(index);
        }
        for &index in &applied.displaced {
            self.remove(index);
            let entry = store.entry_at(index);
            if !entry.is_deactivated() {
                self.insert(index, entry.position);
            }
        }
        for &index in &applied.added {
            self.remove(index);
            let entry = store.entry_at(index);
            if !entry.is_deactivated() {
                self.insert(index, entry.position);
            }
        }
        false
    }

    /// Lazily enumerates the indices within the cutoff of `index`.
    ///
    /// The iterator reflects the current cell assignment and must not be kept
    /// across a rebuild. Indices without a cell yield nothing.
    pub fn neighbors_of<'a, S: ParticleDataStore>(
        &'a self,
        index: usize,
        store: &'a S,
    ) -> NeighborIter<'a, S> {
        let adjacent: &[usize] = match self.cell_of(index) {
            Some(cell) => &self.adjacent[cell],
            None => &[],
        };
        NeighborIter {
            list: self,
            store,
            index,
            position: store.entry_at(index).position,
            cutoff_squared: self.cutoff * self.cutoff,
            adjacent,
            members: &[],
        }
    }
}

/// Neighbor sequence produced by [`CellList::neighbors_of`].
pub struct NeighborIter<'a, S> {
    list: &'a CellList,
    store: &'a S,
    index: usize,
    position: Vec3,
    cutoff_squared: f64,
    adjacent: &'a [usize],
    members: &'a [usize],
}

impl<S: ParticleDataStore> Iterator for NeighborIter<'_, S> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        loop {
            while let Some((&candidate, rest)) = self.members.split_first() {
                self.members = rest;
                if candidate == self.index {
                    continue;
                }
                let other = self.store.entry_at(candidate).position;
                let d2 = self
                    .list
                    .simulation_box
                    .dist_squared(self.position, other);
                if d2 < self.cutoff_squared {
                    return Some(candidate);
                }
            }
            let (&cell, rest) = self.adjacent.split_first()?;
            self.adjacent = rest;
            self.members = &self.list.cells[cell];
        }
    }
}
