//! Cellular-automaton sand transport.
//!
//! One step copies the settled grid into a scratch buffer and walks it bottom to top,
//! moving each grain at most once. A cell counts as empty only when the scratch cell is
//! empty and no resident piece occupies it.

use super::config::GameConfig;
use super::grid::{Cell, Grid};
use rand::Rng;

/// Horizontal scan preference derived from the wind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
    /// Rows scan left to right, diagonals try +x first.
    Right,
    /// Rows scan right to left, diagonals try -x first.
    Left,
    /// Random per row and per grain.
    None,
}

impl Bias {
    pub fn from_wind(wind: f64, threshold: f64) -> Self {
        if wind > threshold {
            Self::Right
        } else if wind < -threshold {
            Self::Left
        } else {
            Self::None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SandRules {
    pub fall2_chance: f64,
    pub diagonal_chance: f64,
    pub slide_chance: f64,
}

impl From<&GameConfig> for SandRules {
    fn from(c: &GameConfig) -> Self {
        Self {
            fall2_chance: c.fall2_chance,
            diagonal_chance: c.diagonal_chance,
            slide_chance: c.slide_chance,
        }
    }
}

/// Scratch buffers reused across steps.
#[derive(Debug, Clone)]
pub struct SandSim {
    next: Grid<Cell>,
    moved: Grid<bool>,
}

impl SandSim {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            next: Grid::new(width, height),
            moved: Grid::new(width, height),
        }
    }

    /// Cells that moved (or settled) during the last step. Renderers use it for shimmer.
    pub fn moved(&self) -> &Grid<bool> {
        &self.moved
    }

    /// Run one transport step over `grid`. `blocked` marks cells held by a piece.
    pub fn step<R: Rng + ?Sized>(
        &mut self,
        grid: &mut Grid<Cell>,
        blocked: &Grid<bool>,
        bias: Bias,
        rules: &SandRules,
        rng: &mut R,
    ) {
        self.next.copy_from(grid);
        self.moved.fill(false);
        let w = grid.width() as i32;
        let h = grid.height() as i32;

        for y in (0..h).rev() {
            let forward = match bias {
                Bias::Right => true,
                Bias::Left => false,
                Bias::None => rng.gen_bool(0.5),
            };
            if forward {
                for x in 0..w {
                    self.move_cell(x, y, blocked, bias, rules, rng);
                }
            } else {
                for x in (0..w).rev() {
                    self.move_cell(x, y, blocked, bias, rules, rng);
                }
            }
        }
        grid.copy_from(&self.next);
    }

    fn is_free(&self, blocked: &Grid<bool>, x: i32, y: i32) -> bool {
        match self.next.index(x, y) {
            Some(i) => self.next.at(i).is_empty() && !blocked.at(i),
            None => false,
        }
    }

    fn relocate(&mut self, from: usize, to: usize, cell: Cell) {
        self.next.put(to, cell);
        self.next.put(from, Cell::Empty);
        self.moved.put(to, true);
    }

    fn move_cell<R: Rng + ?Sized>(
        &mut self,
        x: i32,
        y: i32,
        blocked: &Grid<bool>,
        bias: Bias,
        rules: &SandRules,
        rng: &mut R,
    ) {
        let Some(idx) = self.next.index(x, y) else {
            return;
        };
        let cell = self.next.at(idx);
        if cell.is_empty() || self.moved.at(idx) {
            return;
        }

        let below = y + 1;
        if below < self.next.height() as i32 {
            if self.is_free(blocked, x, below) {
                if self.is_free(blocked, x, below + 1) && rng.gen_bool(rules.fall2_chance) {
                    if let Some(to) = self.next.index(x, below + 1) {
                        self.relocate(idx, to, cell);
                        return;
                    }
                }
                if let Some(to) = self.next.index(x, below) {
                    self.relocate(idx, to, cell);
                    return;
                }
            }

            let order = match bias {
                Bias::Right => [1, -1],
                Bias::Left => [-1, 1],
                Bias::None if rng.gen_bool(0.5) => [1, -1],
                Bias::None => [-1, 1],
            };
            if rng.gen_bool(rules.diagonal_chance) {
                for dir in order {
                    if self.is_free(blocked, x + dir, below) {
                        if let Some(to) = self.next.index(x + dir, below) {
                            self.relocate(idx, to, cell);
                            return;
                        }
                    }
                }
            }
        }

        if rng.gen_bool(rules.slide_chance) {
            let sides = if rng.gen_bool(0.5) { [1, -1] } else { [-1, 1] };
            for dir in sides {
                if self.is_free(blocked, x + dir, y) {
                    if let Some(to) = self.next.index(x + dir, y) {
                        self.relocate(idx, to, cell);
                        return;
                    }
                }
            }
        }
        self.moved.put(idx, true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const STILL: SandRules = SandRules {
        fall2_chance: 0.0,
        diagonal_chance: 0.0,
        slide_chance: 0.0,
    };

    #[test]
    fn bias_follows_strong_wind_only() {
        assert_eq!(Bias::from_wind(0.9, 0.85), Bias::Right);
        assert_eq!(Bias::from_wind(-0.9, 0.85), Bias::Left);
        assert_eq!(Bias::from_wind(0.2, 0.85), Bias::None);
    }

    #[test]
    fn grain_falls_one_cell_per_step() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut grid = Grid::new(4, 6);
        let blocked = Grid::new(4, 6);
        grid.set(1, 0, Cell::Sand(3));
        let mut sim = SandSim::new(4, 6);
        sim.step(&mut grid, &blocked, Bias::None, &STILL, &mut rng);
        assert_eq!(grid.get(1, 1), Some(Cell::Sand(3)));
        for _ in 0..10 {
            sim.step(&mut grid, &blocked, Bias::None, &STILL, &mut rng);
        }
        assert_eq!(grid.get(1, 5), Some(Cell::Sand(3)));
        assert_eq!(grid.sand_count(), 1);
    }

    #[test]
    fn column_never_double_moves() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut grid = Grid::new(1, 5);
        let blocked = Grid::new(1, 5);
        grid.set(0, 0, Cell::Sand(1));
        grid.set(0, 1, Cell::Sand(2));
        let mut sim = SandSim::new(1, 5);
        sim.step(&mut grid, &blocked, Bias::None, &STILL, &mut rng);
        assert_eq!(grid.get(0, 1), Some(Cell::Sand(1)));
        assert_eq!(grid.get(0, 2), Some(Cell::Sand(2)));
    }

    #[test]
    fn blocked_cells_hold_sand_up() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut grid = Grid::new(3, 4);
        let mut blocked = Grid::new(3, 4);
        for x in 0..3 {
            blocked.set(x, 2, true);
        }
        grid.set(1, 0, Cell::Sand(4));
        let mut sim = SandSim::new(3, 4);
        let rules = SandRules {
            fall2_chance: 1.0,
            diagonal_chance: 1.0,
            slide_chance: 1.0,
        };
        for _ in 0..20 {
            sim.step(&mut grid, &blocked, Bias::None, &rules, &mut rng);
        }
        let (_, y) = (0..3)
            .flat_map(|x| (0..4).map(move |y| (x, y)))
            .find(|&(x, y)| grid.get(x, y) == Some(Cell::Sand(4)))
            .unwrap();
        assert_eq!(y, 1);
    }

    #[test]
    fn pile_spreads_with_diagonals() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut grid = Grid::new(9, 6);
        let blocked = Grid::new(9, 6);
        for y in 0..6 {
            grid.set(4, y, Cell::Sand(2));
        }
        let mut sim = SandSim::new(9, 6);
        let rules = SandRules {
            diagonal_chance: 1.0,
            ..STILL
        };
        for _ in 0..40 {
            sim.step(&mut grid, &blocked, Bias::Right, &rules, &mut rng);
        }
        assert_eq!(grid.sand_count(), 6);
        assert!(grid.row_fill(5) > 1);
    }
}
