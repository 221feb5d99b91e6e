//! Game state: board, piece lifecycle, dissolve, sand, row and match clearing.

mod bag;
mod clear;
mod config;
mod dissolve;
mod grid;
mod piece;
mod sand;

pub use bag::{Bag, Tray};
pub use clear::{MatchClear, MatchDetector, compact_rows};
pub use config::{ConfigError, GameConfig};
pub use dissolve::Dissolve;
pub use grid::{Cell, Grid};
pub use piece::{Bounds, Piece, PieceKind};
pub use sand::{Bias, SandRules, SandSim};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::VecDeque;
use std::f64::consts::TAU;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, trace};

/// Horizontal kick offsets (in blocks) tried when a rotation collides.
const KICKS: [i32; 5] = [0, 1, -1, 2, -2];

#[inline]
fn millis(d: Duration) -> f64 {
    d.as_micros() as f64 / 1000.0
}

/// Why a placement was refused. The tray is left untouched in every case.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PlaceError {
    #[error("a piece is already in play")]
    Busy,
    #[error("tray slot {0} does not exist")]
    BadSlot(usize),
    #[error("tray slot {0} is empty")]
    EmptySlot(usize),
    #[error("no room for the piece")]
    Blocked,
}

/// Piece lifecycle. Transitions: Idle -> Active (placement), Active -> Landing (blocked
/// below), Landing -> Dissolving (grace elapsed), Dissolving -> Idle (queue drained).
#[derive(Debug, Clone, PartialEq)]
pub enum PieceState {
    Idle,
    Active { piece: Piece, drop_timer_ms: f64 },
    Landing { piece: Piece, elapsed_ms: f64 },
    Dissolving(Dissolve),
}

impl PieceState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Active { .. } => "active",
            Self::Landing { .. } => "landing",
            Self::Dissolving(_) => "dissolving",
        }
    }
}

/// Notifications for the front end (toasts, logging).
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    Placed { kind: PieceKind, slot: Option<usize> },
    Landed { kind: PieceKind },
    Dissolved { grains: usize },
    RowsCleared { rows: usize, points: u32 },
    MatchStarted { cells: usize },
    MatchCleared { removed: usize, points: u32, centroid: (f64, f64) },
}

#[derive(Debug, Clone)]
pub struct GameState {
    config: GameConfig,
    rng: ChaCha8Rng,
    grid: Grid<Cell>,
    scratch: Grid<Cell>,
    occupancy: Grid<bool>,
    sand: SandSim,
    rules: SandRules,
    matcher: MatchDetector,
    state: PieceState,
    bag: Bag,
    tray: Tray,
    /// Tray slot that supplied the piece in play; refilled once it dissolves.
    active_slot: Option<usize>,
    soft_drop: bool,
    wind_phase: f64,
    wind: f64,
    score: u32,
    lines: u32,
    level: u32,
    events: VecDeque<GameEvent>,
}

impl GameState {
    /// New game with a deterministic RNG seed.
    pub fn new(config: GameConfig, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        let (w, h) = (config.grid_width(), config.grid_height());
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut bag = Bag::new();
        let tray = Tray::new(config.tray_size, &mut bag, &mut rng);
        let wind_phase = rng.gen_range(0.0..TAU);
        Ok(Self {
            rules: SandRules::from(&config),
            matcher: MatchDetector::new(w, h, config.match_min_cells()),
            grid: Grid::new(w, h),
            scratch: Grid::new(w, h),
            occupancy: Grid::new(w, h),
            sand: SandSim::new(w, h),
            state: PieceState::Idle,
            bag,
            tray,
            active_slot: None,
            soft_drop: false,
            wind: wind_phase.sin() * config.wind_factor,
            wind_phase,
            score: 0,
            lines: 0,
            level: 1,
            events: VecDeque::new(),
            rng,
            config,
        })
    }

    // ---- read side -------------------------------------------------------

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn grid(&self) -> &Grid<Cell> {
        &self.grid
    }

    /// Mutable board access for scripted setups (tests, puzzles).
    pub fn grid_mut(&mut self) -> &mut Grid<Cell> {
        &mut self.grid
    }

    pub fn state(&self) -> &PieceState {
        &self.state
    }

    /// Rigid piece on the board (active or landing).
    pub fn piece(&self) -> Option<&Piece> {
        match &self.state {
            PieceState::Active { piece, .. } | PieceState::Landing { piece, .. } => Some(piece),
            _ => None,
        }
    }

    /// Elapsed landing grace in ms, for blinking the piece.
    pub fn landing_elapsed_ms(&self) -> Option<f64> {
        match self.state {
            PieceState::Landing { elapsed_ms, .. } => Some(elapsed_ms),
            _ => None,
        }
    }

    pub fn dissolve(&self) -> Option<&Dissolve> {
        match &self.state {
            PieceState::Dissolving(d) => Some(d),
            _ => None,
        }
    }

    /// Cells currently held by a piece; sand cannot enter them.
    pub fn occupancy(&self) -> &Grid<bool> {
        &self.occupancy
    }

    pub fn match_mask(&self) -> &Grid<bool> {
        self.matcher.mask()
    }

    pub fn match_active(&self) -> bool {
        self.matcher.is_active()
    }

    pub fn match_elapsed(&self) -> Option<Duration> {
        self.matcher
            .elapsed_ms()
            .map(|ms| Duration::from_secs_f64(ms / 1000.0))
    }

    /// Blink phase of the match flash: true on the highlighted half-periods.
    pub fn match_flash_on(&self) -> bool {
        let period = millis(self.config.match_flash_interval);
        match self.matcher.elapsed_ms() {
            Some(ms) if period > 0.0 => (ms / period).floor() as u64 % 2 == 0,
            Some(_) => true,
            None => false,
        }
    }

    pub fn sand_moved(&self) -> &Grid<bool> {
        self.sand.moved()
    }

    pub fn tray(&self) -> &Tray {
        &self.tray
    }

    pub fn wind(&self) -> f64 {
        self.wind
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    /// Grain rows removed by compaction so far.
    pub fn lines(&self) -> u32 {
        self.lines
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, PieceState::Idle)
    }

    /// Current gravity interval in ms per grain step.
    pub fn drop_interval_ms(&self) -> f64 {
        let soft = if self.soft_drop {
            self.config.soft_drop_factor
        } else {
            1.0
        };
        self.config.drop_interval_ms(self.level) * self.config.fast_drop * soft
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = GameEvent> + '_ {
        self.events.drain(..)
    }

    // ---- commands --------------------------------------------------------

    #[inline]
    fn block(&self) -> i32 {
        self.config.block as i32
    }

    /// True if `piece` overlaps a wall, the floor or settled sand. Rows above the
    /// visible top are never checked against the grid.
    pub fn collides(&self, piece: &Piece) -> bool {
        let b = self.block();
        let (gw, gh) = (self.grid.width() as i32, self.grid.height() as i32);
        for (ox, oy) in piece.block_origins(b) {
            if ox < 0 || ox > gw - b || oy > gh - b {
                return true;
            }
            for y in oy.max(0)..oy + b {
                for x in ox..ox + b {
                    if self.grid.get(x, y).is_some_and(|c| !c.is_empty()) {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Top-centre spawn anchor, two blocks above the board.
    pub fn spawn_origin(&self) -> (i32, i32) {
        let b = self.block();
        let gw = self.grid.width() as i32;
        (gw / 2 - 2 * b, -2 * b)
    }

    /// Put a fresh piece of `kind` above the board centre.
    pub fn spawn(&mut self, kind: PieceKind) -> Result<(), PlaceError> {
        if !self.is_idle() {
            return Err(PlaceError::Busy);
        }
        let (x, y) = self.spawn_origin();
        let piece = Piece::new(kind, x, y);
        if self.collides(&piece) {
            debug!(?kind, "spawn blocked");
            return Err(PlaceError::Blocked);
        }
        self.activate(piece, None);
        Ok(())
    }

    /// Place the piece from tray `slot` with its box anchored near (x, y). The anchor
    /// is snapped to the block lattice and clamped inside the board; if that collides
    /// the candidate is nudged up one block at a time, never above the top edge and at
    /// most `placement_nudges` times.
    pub fn place_from_tray(&mut self, slot: usize, x: i32, y: i32) -> Result<(), PlaceError> {
        if !self.is_idle() {
            return Err(PlaceError::Busy);
        }
        if slot >= self.tray.len() {
            return Err(PlaceError::BadSlot(slot));
        }
        let kind = self.tray.get(slot).ok_or(PlaceError::EmptySlot(slot))?;

        let b = self.block();
        let min_y = -kind.bounds(0).min_y * b;
        let (x, y) = self.clamp_anchor(kind, x, y);
        let mut candidate = Piece::new(kind, x, y);
        let mut tries = 0;
        while self.collides(&candidate) {
            if tries >= self.config.placement_nudges || candidate.y - b < min_y {
                debug!(?kind, slot, x, y, "placement rejected");
                return Err(PlaceError::Blocked);
            }
            candidate.y -= b;
            tries += 1;
        }
        self.tray.take(slot);
        self.activate(candidate, Some(slot));
        Ok(())
    }

    /// Drop tray `slot` in at the top edge, its box anchored near column `x`.
    pub fn drop_from_tray(&mut self, slot: usize, x: i32) -> Result<(), PlaceError> {
        self.place_from_tray(slot, x, i32::MIN)
    }

    /// Place tray `slot` at the top centre, fully inside the board.
    pub fn spawn_from_tray(&mut self, slot: usize) -> Result<(), PlaceError> {
        let (x, _) = self.spawn_origin();
        self.drop_from_tray(slot, x)
    }

    /// True when no tray piece fits at the top edge of any column.
    pub fn board_full(&self) -> bool {
        let b = self.block();
        let gw = self.grid.width() as i32;
        self.tray.slots().iter().flatten().all(|&kind| {
            (-3..gw / b + 3).all(|col| {
                let (x, y) = self.clamp_anchor(kind, col * b, i32::MIN);
                self.collides(&Piece::new(kind, x, y))
            })
        })
    }

    fn clamp_anchor(&self, kind: PieceKind, x: i32, y: i32) -> (i32, i32) {
        let (gw, gh) = (self.grid.width() as i32, self.grid.height() as i32);
        kind.clamp_origin(x, y, self.block(), gw, gh)
    }

    fn activate(&mut self, piece: Piece, slot: Option<usize>) {
        debug!(kind = ?piece.kind, x = piece.x, y = piece.y, ?slot, "piece placed");
        self.active_slot = slot;
        self.state = PieceState::Active {
            piece,
            drop_timer_ms: 0.0,
        };
        self.events.push_back(GameEvent::Placed {
            kind: piece.kind,
            slot,
        });
        self.update_occupancy();
    }

    fn movable_piece(&mut self) -> Option<&mut Piece> {
        match &mut self.state {
            PieceState::Active { piece, .. } | PieceState::Landing { piece, .. } => Some(piece),
            _ => None,
        }
    }

    /// Shift the piece by (dx, dy) grains. Landing pieces can still be nudged.
    pub fn move_piece(&mut self, dx: i32, dy: i32) -> bool {
        let Some(current) = self.piece().copied() else {
            return false;
        };
        let moved = current.shifted(dx, dy, current.rotation);
        if self.collides(&moved) {
            return false;
        }
        if let Some(p) = self.movable_piece() {
            *p = moved;
        }
        self.update_occupancy();
        true
    }

    /// One block left (-1) or right (+1).
    pub fn shift(&mut self, dir: i32) -> bool {
        self.move_piece(dir * self.block(), 0)
    }

    /// Rotate by `dir` quarter turns (+1 clockwise), trying horizontal kicks then
    /// one upward nudge.
    pub fn rotate(&mut self, dir: i32) -> bool {
        let Some(current) = self.piece().copied() else {
            return false;
        };
        let next_rot = (i32::from(current.rotation) + dir).rem_euclid(4) as u8;
        let b = self.block();
        let accepted = KICKS
            .iter()
            .map(|k| current.shifted(k * b, 0, next_rot))
            .chain(std::iter::once(current.shifted(0, -b, next_rot)))
            .find(|candidate| !self.collides(candidate));
        let Some(rotated) = accepted else {
            return false;
        };
        if let Some(p) = self.movable_piece() {
            *p = rotated;
        }
        self.update_occupancy();
        true
    }

    /// Drop straight down, score two points per grain travelled, and start landing.
    pub fn hard_drop(&mut self) -> bool {
        let PieceState::Active { piece, .. } = self.state else {
            return false;
        };
        let mut dropped = piece;
        let mut travelled = 0u32;
        loop {
            let next = dropped.shifted(0, 1, dropped.rotation);
            if self.collides(&next) {
                break;
            }
            dropped = next;
            travelled += 1;
        }
        self.score += travelled * self.config.hard_drop_points;
        self.start_landing(dropped);
        self.update_occupancy();
        true
    }

    /// Held soft drop shortens the gravity interval.
    pub fn set_soft_drop(&mut self, held: bool) {
        self.soft_drop = held;
    }

    fn start_landing(&mut self, piece: Piece) {
        debug!(kind = ?piece.kind, x = piece.x, y = piece.y, "piece landing");
        self.events.push_back(GameEvent::Landed { kind: piece.kind });
        self.state = PieceState::Landing {
            piece,
            elapsed_ms: 0.0,
        };
    }

    // ---- simulation ------------------------------------------------------

    /// Advance the whole simulation by `dt` (clamped to `max_frame_dt`). A zero `dt`
    /// leaves the state untouched.
    pub fn tick(&mut self, dt: Duration) {
        let dt = dt.min(self.config.max_frame_dt);
        if dt.is_zero() {
            return;
        }
        let dt_ms = millis(dt);

        self.wind_phase = (self.wind_phase + dt_ms * self.config.wind_speed) % TAU;
        self.wind = self.wind_phase.sin() * self.config.wind_factor;

        self.update_piece(dt_ms);
        self.update_occupancy();

        let flash_ms = millis(self.config.match_flash);
        let flashing = self.matcher.is_active();
        if let Some(clear) = self.matcher.advance(&mut self.grid, dt_ms, flash_ms) {
            self.finish_match(clear);
        }
        if flashing && !self.matcher.is_active() {
            self.compact();
        }

        if !self.matcher.is_active() {
            let bias = Bias::from_wind(self.wind, self.config.wind_threshold);
            for _ in 0..self.config.sand_steps {
                self.sand
                    .step(&mut self.grid, &self.occupancy, bias, &self.rules, &mut self.rng);
            }
        }
        self.scan_matches();
    }

    fn update_piece(&mut self, dt_ms: f64) {
        match &mut self.state {
            PieceState::Idle => {}
            PieceState::Active { drop_timer_ms, .. } => {
                *drop_timer_ms += dt_ms;
                self.apply_gravity();
            }
            PieceState::Landing { piece, elapsed_ms } => {
                *elapsed_ms += dt_ms;
                if *elapsed_ms >= millis(self.config.landing_time) {
                    let piece = *piece;
                    self.start_dissolve(piece);
                }
            }
            PieceState::Dissolving(d) => {
                d.advance(&mut self.grid, dt_ms, self.config.dissolve_rate);
                if d.is_done() {
                    let grains = d.total();
                    self.finish_dissolve(grains);
                }
            }
        }
    }

    fn apply_gravity(&mut self) {
        let interval = self.drop_interval_ms();
        let PieceState::Active {
            mut piece,
            mut drop_timer_ms,
        } = self.state
        else {
            return;
        };
        let mut steps = 0;
        while drop_timer_ms >= interval && steps < self.config.gravity_step_cap {
            drop_timer_ms -= interval;
            let next = piece.shifted(0, 1, piece.rotation);
            if self.collides(&next) {
                break;
            }
            piece = next;
            steps += 1;
        }
        if steps > 0 {
            trace!(steps, y = piece.y, "gravity");
        }
        if self.collides(&piece.shifted(0, 1, piece.rotation)) {
            self.start_landing(piece);
        } else {
            self.state = PieceState::Active {
                piece,
                drop_timer_ms,
            };
        }
    }

    fn start_dissolve(&mut self, piece: Piece) {
        let dissolve = Dissolve::new(&piece, &self.grid, self.block(), &mut self.rng);
        debug!(kind = ?piece.kind, grains = dissolve.total(), "piece dissolving");
        self.state = PieceState::Dissolving(dissolve);
    }

    fn finish_dissolve(&mut self, grains: usize) {
        self.score += self.config.dissolve_bonus;
        self.state = PieceState::Idle;
        if let Some(slot) = self.active_slot.take() {
            self.tray.refill(slot, &mut self.bag, &mut self.rng);
        }
        debug!(grains, score = self.score, "dissolve finished");
        self.events.push_back(GameEvent::Dissolved { grains });
        self.update_occupancy();
        // the flash mask is in grid coordinates; rows shift once the episode ends
        if !self.matcher.is_active() {
            self.compact();
        }
        self.scan_matches();
    }

    fn compact(&mut self) {
        let rows = compact_rows(&mut self.grid, &mut self.scratch, self.config.clear_threshold);
        if rows == 0 {
            return;
        }
        let points = rows as u32 * self.config.row_clear_points * self.level;
        self.score += points;
        self.lines += rows as u32;
        let per_level = self.config.lines_per_level * self.config.block as u32;
        self.level = 1 + self.lines / per_level.max(1);
        info!(rows, points, lines = self.lines, level = self.level, "rows cleared");
        self.events.push_back(GameEvent::RowsCleared { rows, points });
    }

    fn scan_matches(&mut self) {
        let was_active = self.matcher.is_active();
        if self.matcher.scan(&self.grid) && !was_active {
            self.events.push_back(GameEvent::MatchStarted {
                cells: self.matcher.mask().count_set(),
            });
        }
    }

    fn finish_match(&mut self, clear: MatchClear) {
        let points = (clear.removed / 3) as u32;
        self.score += points;
        info!(removed = clear.removed, points, score = self.score, "match cleared");
        self.events.push_back(GameEvent::MatchCleared {
            removed: clear.removed,
            points,
            centroid: clear.centroid,
        });
    }

    /// Rebuild the piece mask from the current lifecycle state.
    fn update_occupancy(&mut self) {
        self.occupancy.fill(false);
        let b = self.block();
        match &self.state {
            PieceState::Active { piece, .. } | PieceState::Landing { piece, .. } => {
                for (x, y) in piece.footprint(b) {
                    self.occupancy.set(x, y, true);
                }
            }
            PieceState::Dissolving(d) => {
                for &idx in d.pending() {
                    self.occupancy.put(idx, true);
                }
            }
            PieceState::Idle => {}
        }
    }
}
