//! Property-based tests for the sand engine using proptest
//!
//! - Grain conservation per colour across transport steps
//! - 7-bag coverage from any seed
//! - Four quarter turns restore a free piece
//! - Row compaction keeps exactly the rows under the threshold

use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sandtris::game::{Bag, Bias, Cell, Grid, PieceKind, SandRules, SandSim, compact_rows};
use sandtris::{GameConfig, GameState};

const W: usize = 24;
const H: usize = 18;

fn cell() -> impl Strategy<Value = Cell> {
    prop_oneof![
        3 => Just(Cell::Empty),
        1 => (1u8..=7).prop_map(Cell::Sand),
    ]
}

fn grid_from(cells: &[Cell], w: usize, h: usize) -> Grid<Cell> {
    let mut grid = Grid::new(w, h);
    for (i, &c) in cells.iter().enumerate() {
        grid.put(i, c);
    }
    grid
}

fn histogram(grid: &Grid<Cell>) -> [usize; 8] {
    let mut counts = [0; 8];
    for c in grid.as_slice() {
        counts[c.color().unwrap_or(0) as usize] += 1;
    }
    counts
}

fn bias() -> impl Strategy<Value = Bias> {
    prop_oneof![Just(Bias::Left), Just(Bias::Right), Just(Bias::None)]
}

fn kind() -> impl Strategy<Value = PieceKind> {
    prop::sample::select(PieceKind::ALL.to_vec())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn transport_conserves_every_colour(
        cells in prop::collection::vec(cell(), W * H),
        blocked in prop::collection::vec(prop::bool::weighted(0.1), W * H),
        bias in bias(),
        fall2 in 0.0f64..=1.0,
        diagonal in 0.0f64..=1.0,
        slide in 0.0f64..=1.0,
        steps in 1usize..30,
        seed: u64,
    ) {
        let mut grid = grid_from(&cells, W, H);
        let mut mask = Grid::new(W, H);
        for (i, &b) in blocked.iter().enumerate() {
            // grains never start inside a piece
            if grid.at(i).is_empty() {
                mask.put(i, b);
            }
        }
        let before = histogram(&grid);
        let rules = SandRules {
            fall2_chance: fall2,
            diagonal_chance: diagonal,
            slide_chance: slide,
        };
        let mut sim = SandSim::new(W, H);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        for _ in 0..steps {
            sim.step(&mut grid, &mask, bias, &rules, &mut rng);
            for i in 0..grid.len() {
                prop_assert!(!(mask.at(i) && !grid.at(i).is_empty()), "grain entered a piece cell");
            }
        }
        prop_assert_eq!(histogram(&grid), before);
    }

    #[test]
    fn every_bag_holds_each_kind_once(seed: u64, bags in 1usize..12) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut bag = Bag::new();
        for _ in 0..bags {
            let mut drawn: Vec<_> = (0..7).map(|_| bag.draw(&mut rng)).collect();
            drawn.sort_by_key(|k| k.color());
            prop_assert_eq!(drawn, PieceKind::ALL.to_vec());
        }
    }

    #[test]
    fn four_rotations_restore_a_free_piece(
        kind in kind(),
        col in 0i32..=6,
        y in 0i32..=96,
        dir in prop_oneof![Just(1i32), Just(-1i32)],
    ) {
        let mut game = GameState::new(GameConfig::default(), 1).unwrap();
        game.spawn(kind).unwrap();
        let start = *game.piece().unwrap();
        // any anchor whose 4x4 box is on the board leaves room for every rotation
        prop_assert!(game.move_piece(col * 6 - start.x, y - start.y));
        let placed = *game.piece().unwrap();
        for _ in 0..4 {
            prop_assert!(game.rotate(dir));
        }
        prop_assert_eq!(*game.piece().unwrap(), placed);
    }

    #[test]
    fn compaction_removes_exactly_the_full_rows(
        fills in prop::collection::vec(0usize..=W, H),
        threshold in 0.5f64..=1.0,
    ) {
        let mut grid: Grid<Cell> = Grid::new(W, H);
        for (y, &n) in fills.iter().enumerate() {
            for x in 0..n {
                grid.set(x as i32, y as i32, Cell::Sand((y % 7 + 1) as u8));
            }
        }
        let survivors: Vec<Vec<Cell>> = (0..H)
            .filter(|&y| (grid.row_fill(y) as f64 / W as f64) < threshold)
            .map(|y| grid.row(y).to_vec())
            .collect();
        let mut scratch = Grid::new(W, H);
        let removed = compact_rows(&mut grid, &mut scratch, threshold);

        prop_assert_eq!(removed, H - survivors.len());
        for y in 0..removed {
            prop_assert_eq!(grid.row_fill(y), 0);
        }
        for (i, row) in survivors.iter().enumerate() {
            prop_assert_eq!(grid.row(removed + i), &row[..]);
        }
    }
}
