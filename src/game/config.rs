//! Simulation tunables. Defaults reproduce the reference browser game.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("board must be at least 4x4 blocks (got {cols}x{rows})")]
    BoardTooSmall { cols: usize, rows: usize },
    #[error("block size must be at least 1")]
    ZeroBlock,
    #[error("{name} must be within [0, 1] (got {value})")]
    Probability { name: &'static str, value: f64 },
    #[error("{name} must be positive (got {value})")]
    NotPositive { name: &'static str, value: f64 },
    #[error("tray needs at least one slot")]
    EmptyTray,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    /// Board width in blocks.
    pub cols: usize,
    /// Board height in blocks.
    pub rows: usize,
    /// Grains per block edge.
    pub block: usize,

    /// Sand sub-steps per tick.
    pub sand_steps: u32,
    /// Chance a falling grain skips one extra cell.
    pub fall2_chance: f64,
    /// Chance a blocked grain tries the lower diagonals.
    pub diagonal_chance: f64,
    /// Chance a stuck grain slides sideways.
    pub slide_chance: f64,

    /// Row fill fraction that counts as full.
    pub clear_threshold: f64,
    /// Minimum matched region, in blocks (block * block grains each).
    pub match_min_blocks: usize,
    pub match_flash: Duration,
    /// Blink period of the flash, for renderers.
    pub match_flash_interval: Duration,

    pub landing_time: Duration,
    /// Grains revealed per millisecond while dissolving.
    pub dissolve_rate: f64,
    pub dissolve_bonus: u32,

    pub base_drop_ms: f64,
    pub min_drop_ms: f64,
    pub drop_step_per_level_ms: f64,
    /// Multiplier on the level drop interval; gravity moves one grain, not one block.
    pub fast_drop: f64,
    /// Extra multiplier while soft drop is held.
    pub soft_drop_factor: f64,
    pub gravity_step_cap: u32,

    pub wind_factor: f64,
    /// Wind phase advance in radians per millisecond.
    pub wind_speed: f64,
    /// |wind| above this forces the scan direction.
    pub wind_threshold: f64,

    pub max_frame_dt: Duration,
    pub tray_size: usize,
    pub placement_nudges: u32,
    pub hard_drop_points: u32,
    pub row_clear_points: u32,
    /// Block rows (of grain rows) per level.
    pub lines_per_level: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            cols: 10,
            rows: 20,
            block: 6,
            sand_steps: 3,
            fall2_chance: 0.08,
            diagonal_chance: 0.35,
            slide_chance: 0.008,
            clear_threshold: 0.9,
            match_min_blocks: 8,
            match_flash: Duration::from_millis(1600),
            match_flash_interval: Duration::from_millis(220),
            landing_time: Duration::from_millis(120),
            dissolve_rate: 0.2,
            dissolve_bonus: 10,
            base_drop_ms: 380.0,
            min_drop_ms: 60.0,
            drop_step_per_level_ms: 45.0,
            fast_drop: 0.05,
            soft_drop_factor: 0.25,
            gravity_step_cap: 120,
            wind_factor: 0.2,
            wind_speed: 0.0009,
            wind_threshold: 0.85,
            max_frame_dt: Duration::from_millis(60),
            tray_size: 3,
            placement_nudges: 6,
            hard_drop_points: 2,
            row_clear_points: 10,
            lines_per_level: 10,
        }
    }
}

impl GameConfig {
    /// Board width in grains.
    pub fn grid_width(&self) -> usize {
        self.cols * self.block
    }

    /// Board height in grains.
    pub fn grid_height(&self) -> usize {
        self.rows * self.block
    }

    /// Minimum region size in grains.
    pub fn match_min_cells(&self) -> usize {
        self.block * self.block * self.match_min_blocks
    }

    /// Base gravity interval for `level`, before the fast-drop multiplier.
    pub fn drop_interval_ms(&self, level: u32) -> f64 {
        let steps = f64::from(level.saturating_sub(1));
        let slowed = self.base_drop_ms - steps * self.drop_step_per_level_ms;
        slowed.max(self.min_drop_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.block == 0 {
            return Err(ConfigError::ZeroBlock);
        }
        if self.cols < 4 || self.rows < 4 {
            return Err(ConfigError::BoardTooSmall {
                cols: self.cols,
                rows: self.rows,
            });
        }
        if self.tray_size == 0 {
            return Err(ConfigError::EmptyTray);
        }
        for (name, value) in [
            ("fall2_chance", self.fall2_chance),
            ("diagonal_chance", self.diagonal_chance),
            ("slide_chance", self.slide_chance),
            ("clear_threshold", self.clear_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Probability { name, value });
            }
        }
        for (name, value) in [
            ("dissolve_rate", self.dissolve_rate),
            ("base_drop_ms", self.base_drop_ms),
            ("min_drop_ms", self.min_drop_ms),
            ("fast_drop", self.fast_drop),
            ("soft_drop_factor", self.soft_drop_factor),
        ] {
            if value.is_nan() || value <= 0.0 {
                return Err(ConfigError::NotPositive { name, value });
            }
        }
        Ok(())
    }
}
