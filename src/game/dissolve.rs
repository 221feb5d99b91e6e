//! Turning a landed piece into loose grains over time.

use super::grid::{Cell, Grid};
use super::piece::Piece;
use rand::Rng;
use rand::seq::SliceRandom;

/// Shuffled reveal queue for one landed piece.
#[derive(Debug, Clone, PartialEq)]
pub struct Dissolve {
    queue: Vec<usize>,
    revealed: usize,
    accumulator: f64,
    color: u8,
}

impl Dissolve {
    /// Queue every in-grid grain of `piece` in random order. Rows above the top edge
    /// are not part of the board and are dropped.
    pub fn new<R: Rng + ?Sized>(piece: &Piece, grid: &Grid<Cell>, block: i32, rng: &mut R) -> Self {
        let mut queue: Vec<usize> = piece
            .footprint(block)
            .filter_map(|(x, y)| grid.index(x, y))
            .collect();
        queue.shuffle(rng);
        Self {
            queue,
            revealed: 0,
            accumulator: 0.0,
            color: piece.color(),
        }
    }

    pub fn color(&self) -> u8 {
        self.color
    }

    /// Grains not yet written into the grid; these still block sand.
    pub fn pending(&self) -> &[usize] {
        &self.queue[self.revealed..]
    }

    pub fn total(&self) -> usize {
        self.queue.len()
    }

    pub fn is_done(&self) -> bool {
        self.revealed >= self.queue.len()
    }

    /// Reveal `dt_ms * rate` grains, carrying the fractional remainder. Returns the
    /// number written this call.
    pub fn advance(&mut self, grid: &mut Grid<Cell>, dt_ms: f64, rate: f64) -> usize {
        self.accumulator += dt_ms * rate;
        let budget = self.accumulator.floor();
        self.accumulator -= budget;

        let end = (self.revealed + budget as usize).min(self.queue.len());
        for &idx in &self.queue[self.revealed..end] {
            grid.put(idx, Cell::Sand(self.color));
        }
        let written = end - self.revealed;
        self.revealed = end;
        written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::piece::PieceKind;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn queue_skips_rows_above_the_board() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let grid = Grid::new(24, 24);
        // I lies on box row 1, so at y = -6 it sits exactly on row 0..6.
        let d = Dissolve::new(&Piece::new(PieceKind::I, 0, -6), &grid, 6, &mut rng);
        assert_eq!(d.total(), 4 * 36);
        let d = Dissolve::new(&Piece::new(PieceKind::I, 0, -9), &grid, 6, &mut rng);
        assert_eq!(d.total(), 4 * 18);
    }

    #[test]
    fn fractional_rate_carries_over() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut grid = Grid::new(24, 24);
        let mut d = Dissolve::new(&Piece::new(PieceKind::O, 0, 0), &grid, 6, &mut rng);
        assert_eq!(d.advance(&mut grid, 3.0, 0.2), 0);
        assert_eq!(d.advance(&mut grid, 3.0, 0.2), 1);
        assert_eq!(d.advance(&mut grid, 10.0, 0.2), 2);
        assert_eq!(grid.sand_count(), 3);
        assert_eq!(d.pending().len(), 144 - 3);
    }

    #[test]
    fn draining_writes_every_grain_once() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let mut grid = Grid::new(24, 24);
        let piece = Piece::new(PieceKind::T, 0, 6);
        let mut d = Dissolve::new(&piece, &grid, 6, &mut rng);
        while !d.is_done() {
            d.advance(&mut grid, 16.0, 0.2);
        }
        assert_eq!(grid.sand_count(), 144);
        assert!(d.pending().is_empty());
        for (x, y) in piece.footprint(6) {
            assert_eq!(grid.get(x, y), Some(Cell::Sand(PieceKind::T.color())));
        }
    }
}
