//! Row compaction and same-colour region matching.

use super::grid::{Cell, Grid};

/// Remove every row whose fill fraction reaches `threshold`, shifting survivors down.
/// `scratch` must match `grid`'s dimensions. Returns the number of rows removed.
pub fn compact_rows(grid: &mut Grid<Cell>, scratch: &mut Grid<Cell>, threshold: f64) -> usize {
    scratch.fill(Cell::Empty);
    let width = grid.width();
    let mut cleared = 0;
    for y in (0..grid.height()).rev() {
        let filled = grid.row_fill(y);
        if filled as f64 / width as f64 >= threshold {
            cleared += 1;
        } else {
            scratch.row_mut(y + cleared).copy_from_slice(grid.row(y));
        }
    }
    if cleared > 0 {
        grid.copy_from(scratch);
    }
    cleared
}

#[rustfmt::skip]
const NEIGHBOURS_8: [(i32, i32); 8] = [
    (-1, -1), (0, -1), (1, -1),
    (-1, 0),           (1, 0),
    (-1, 1),  (0, 1),  (1, 1),
];

/// Result of removing a flagged region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchClear {
    pub removed: usize,
    /// Mean grain coordinate of the removed cells.
    pub centroid: (f64, f64),
}

/// Flood-fill detector with a single flash episode.
#[derive(Debug, Clone)]
pub struct MatchDetector {
    mask: Grid<bool>,
    visited: Grid<bool>,
    stack: Vec<usize>,
    group: Vec<usize>,
    min_cells: usize,
    /// Elapsed flash time in ms; `Some` while an episode is running.
    elapsed_ms: Option<f64>,
}

impl MatchDetector {
    pub fn new(width: usize, height: usize, min_cells: usize) -> Self {
        Self {
            mask: Grid::new(width, height),
            visited: Grid::new(width, height),
            stack: Vec::new(),
            group: Vec::new(),
            min_cells,
            elapsed_ms: None,
        }
    }

    pub fn mask(&self) -> &Grid<bool> {
        &self.mask
    }

    pub fn is_active(&self) -> bool {
        self.elapsed_ms.is_some()
    }

    pub fn elapsed_ms(&self) -> Option<f64> {
        self.elapsed_ms
    }

    /// Flag every 8-connected same-colour region of at least `min_cells`.
    ///
    /// Outside an episode the mask is rebuilt and a hit starts one. During an episode
    /// the mask only grows and the timer keeps running. Returns whether anything
    /// qualified this scan.
    pub fn scan(&mut self, grid: &Grid<Cell>) -> bool {
        let was_active = self.is_active();
        self.visited.fill(false);
        if !was_active {
            self.mask.fill(false);
        }

        let mut found = false;
        for seed in 0..grid.len() {
            let Cell::Sand(color) = grid.at(seed) else {
                continue;
            };
            if self.visited.at(seed) {
                continue;
            }
            self.group.clear();
            self.stack.clear();
            self.stack.push(seed);
            self.visited.put(seed, true);
            while let Some(idx) = self.stack.pop() {
                self.group.push(idx);
                let (x, y) = grid.coords(idx);
                for (dx, dy) in NEIGHBOURS_8 {
                    let Some(n) = grid.index(x + dx, y + dy) else {
                        continue;
                    };
                    if !self.visited.at(n) && grid.at(n) == Cell::Sand(color) {
                        self.visited.put(n, true);
                        self.stack.push(n);
                    }
                }
            }
            if self.group.len() >= self.min_cells {
                found = true;
                for &idx in &self.group {
                    self.mask.put(idx, true);
                }
            }
        }

        if found && !was_active {
            self.elapsed_ms = Some(0.0);
            tracing::debug!(cells = self.mask.count_set(), "match episode started");
        }
        found
    }

    /// Advance the flash timer; once it reaches `flash_ms`, zero every flagged cell
    /// and end the episode. Only grains actually removed are counted.
    pub fn advance(
        &mut self,
        grid: &mut Grid<Cell>,
        dt_ms: f64,
        flash_ms: f64,
    ) -> Option<MatchClear> {
        let elapsed = self.elapsed_ms.as_mut()?;
        *elapsed += dt_ms;
        if *elapsed < flash_ms {
            return None;
        }

        let mut removed = 0usize;
        let (mut sum_x, mut sum_y) = (0.0, 0.0);
        for idx in 0..self.mask.len() {
            if self.mask.at(idx) && !grid.at(idx).is_empty() {
                grid.put(idx, Cell::Empty);
                let (x, y) = grid.coords(idx);
                sum_x += f64::from(x);
                sum_y += f64::from(y);
                removed += 1;
            }
        }
        self.mask.fill(false);
        self.elapsed_ms = None;
        if removed == 0 {
            return None;
        }
        Some(MatchClear {
            removed,
            centroid: (sum_x / removed as f64, sum_y / removed as f64),
        })
    }
}
