//! End-to-end lifecycle scenarios against the public game API.

use sandtris::game::{Cell, PieceKind};
use sandtris::{GameConfig, GameEvent, GameState, PieceState, PlaceError};
use std::time::Duration;

const FRAME: Duration = Duration::from_millis(16);

/// Tick until the piece is gone, recording every lifecycle state seen.
fn run_until_idle(game: &mut GameState) -> Vec<&'static str> {
    let mut seen = vec![game.state().name()];
    for _ in 0..500 {
        game.tick(FRAME);
        let name = game.state().name();
        if seen.last() != Some(&name) {
            seen.push(name);
        }
        if game.is_idle() {
            break;
        }
    }
    seen
}

fn color_count(game: &GameState, color: u8) -> usize {
    game.grid()
        .as_slice()
        .iter()
        .filter(|&&c| c == Cell::Sand(color))
        .count()
}

#[test]
fn o_piece_lands_on_the_floor_and_becomes_sand() {
    let config = GameConfig {
        sand_steps: 0,
        ..GameConfig::default()
    };
    let mut game = GameState::new(config, 11).unwrap();
    game.spawn(PieceKind::O).unwrap();
    assert!(game.hard_drop());

    let piece = *game.piece().unwrap();
    assert_eq!(piece.y, 120 - 2 * 6);

    let states = run_until_idle(&mut game);
    assert_eq!(states, ["landing", "dissolving", "idle"]);

    // O covers box columns 1..=2: grains 24..36, rows 108..120
    let color = PieceKind::O.color();
    for y in 108..120 {
        for x in 0..60 {
            let expected = if (24..36).contains(&x) {
                Cell::Sand(color)
            } else {
                Cell::Empty
            };
            assert_eq!(game.grid().get(x, y), Some(expected), "grain ({x}, {y})");
        }
    }
    assert_eq!(game.grid().sand_count(), 4 * 36);
    assert_eq!(game.occupancy().count_set(), 0);
}

#[test]
fn dissolved_sand_settles_without_losing_grains() {
    let mut game = GameState::new(GameConfig::default(), 11).unwrap();
    game.spawn(PieceKind::O).unwrap();
    game.hard_drop();
    run_until_idle(&mut game);
    for _ in 0..120 {
        game.tick(FRAME);
    }

    let color = PieceKind::O.color();
    assert_eq!(color_count(&game, color), 144);
    // sand never climbs above the rows the piece covered
    for y in 0..108 {
        assert_eq!(game.grid().row_fill(y as usize), 0);
    }
    assert_eq!(game.lines(), 0);
}

#[test]
fn gravity_alone_brings_piece_down() {
    let mut game = GameState::new(GameConfig::default(), 4).unwrap();
    game.spawn(PieceKind::T).unwrap();
    let mut states = vec!["active"];
    for _ in 0..1000 {
        game.tick(FRAME);
        let name = game.state().name();
        if states.last() != Some(&name) {
            states.push(name);
        }
        if game.is_idle() {
            break;
        }
    }
    assert_eq!(states, ["active", "landing", "dissolving", "idle"]);
    assert_eq!(color_count(&game, PieceKind::T.color()), 144);
}

#[test]
fn dissolve_bonus_and_hard_drop_points() {
    let config = GameConfig {
        sand_steps: 0,
        ..GameConfig::default()
    };
    let mut game = GameState::new(config, 2).unwrap();
    game.spawn(PieceKind::I).unwrap();
    game.hard_drop();
    // I lies on box row 1: from y = -12 down to y = 120 - 12
    assert_eq!(game.score(), 120 * 2);
    run_until_idle(&mut game);
    assert_eq!(game.score(), 120 * 2 + 10);

    let events: Vec<_> = game.drain_events().collect();
    assert!(matches!(events.first(), Some(GameEvent::Placed { kind: PieceKind::I, slot: None })));
    assert!(events.contains(&GameEvent::Landed { kind: PieceKind::I }));
    assert!(events.contains(&GameEvent::Dissolved { grains: 144 }));
    assert_eq!(game.drain_events().count(), 0);
}

#[test]
fn same_seed_same_game() {
    let play = |seed| {
        let mut game = GameState::new(GameConfig::default(), seed).unwrap();
        for slot in [0, 1, 2, 0] {
            game.spawn_from_tray(slot).unwrap();
            game.shift(if slot == 1 { -1 } else { 1 });
            game.rotate(1);
            game.hard_drop();
            run_until_idle(&mut game);
        }
        (game.grid().clone(), game.score(), game.tray().slots().to_vec())
    };
    assert_eq!(play(77), play(77));
}

#[test]
fn full_rows_are_compacted_after_dissolve() {
    let config = GameConfig {
        sand_steps: 0,
        ..GameConfig::default()
    };
    let mut game = GameState::new(config, 3).unwrap();
    // two-colour checkerboard so no single colour region is large enough to match
    for y in 114..120 {
        for x in 0..60 {
            if !(24..36).contains(&x) {
                let color = if (x / 2 + y) % 2 == 0 { 1 } else { 4 };
                game.grid_mut().set(x, y, Cell::Sand(color));
            }
        }
    }
    game.spawn(PieceKind::O).unwrap();
    game.hard_drop();
    assert_eq!(game.piece().unwrap().y, 108);
    run_until_idle(&mut game);

    // the six floor rows are now full and removed; the O's upper half drops down
    assert_eq!(game.lines(), 6);
    assert_eq!(game.grid().sand_count(), 72);
    for y in 114..120 {
        for x in 24..36 {
            assert_eq!(game.grid().get(x, y), Some(Cell::Sand(PieceKind::O.color())));
        }
    }
    assert!(game.score() >= 6 * 10 + 10);
}

#[test]
fn rejected_placement_leaves_tray_and_state_alone() {
    let mut game = GameState::new(GameConfig::default(), 6).unwrap();
    for y in 0..120 {
        for x in 0..60 {
            game.grid_mut().set(x, y, Cell::Sand(2));
        }
    }
    let before = game.tray().slots().to_vec();
    for slot in 0..3 {
        assert_eq!(game.spawn_from_tray(slot), Err(PlaceError::Blocked));
    }
    assert_eq!(game.tray().slots(), &before[..]);
    assert!(matches!(game.state(), PieceState::Idle));
    assert!(game.board_full());
}

#[test]
fn busy_while_piece_in_flight() {
    let mut game = GameState::new(GameConfig::default(), 8).unwrap();
    game.spawn_from_tray(0).unwrap();
    assert_eq!(game.spawn_from_tray(1), Err(PlaceError::Busy));
    assert_eq!(game.place_from_tray(1, 0, 60), Err(PlaceError::Busy));
    assert_eq!(game.spawn(PieceKind::Z), Err(PlaceError::Busy));
    assert!(game.tray().get(1).is_some());
}
