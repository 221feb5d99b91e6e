//! Sandtris: falling-sand tetromino puzzle in the terminal.

mod app;
mod input;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::Parser;
use sandtris::GameConfig;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use theme::{Palette, Theme};

fn main() -> Result<()> {
    let args = Args::parse();
    if let Some(path) = &args.log_file {
        init_logging(path)?;
    }
    let config = args.game_config();
    config.validate().context("invalid game settings")?;
    let seed = args.seed.unwrap_or_else(rand::random);
    tracing::info!(seed, cols = config.cols, rows = config.rows, "starting");

    let mut app = App::new(args, config, seed)?;
    app.run()
}

/// Log to a file; the terminal itself is taken by the game.
fn init_logging(path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sandtris=info".into()),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// Falling-sand tetromino puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "sandtris",
    version,
    about = "Falling-sand tetromino puzzle in the terminal. \
        Pieces dissolve into sand; big same-colour regions clear.",
    long_about = "Sandtris is a terminal puzzle game.\n\n\
        Aim with left/right, pick a piece from the tray and drop it. When it lands it \
        dissolves into coloured sand that tumbles and settles. A connected region of one \
        colour at least eight blocks large flashes and is removed; rows that fill up \
        are compacted away.\n\n\
        CONTROLS:\n  1 2 3       Place tray piece   Left/Right h/l  Move / aim\n  \
        Up k x      Rotate CW          z u             Rotate CCW\n  \
        Down j      Soft drop (hold)   Space/Enter     Hard drop\n  \
        P           Pause              R               Restart    Q / Esc  Quit"
)]
pub struct Args {
    /// RNG seed; the same seed replays the same bag and sand.
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Board width in blocks.
    #[arg(long, default_value = "10", value_name = "COLS")]
    pub width: usize,

    /// Board height in blocks.
    #[arg(long, default_value = "20", value_name = "ROWS")]
    pub height: usize,

    /// Sand grains per block edge.
    #[arg(long, default_value = "6", value_name = "N")]
    pub block: usize,

    /// Sand sub-steps per frame (2 is lighter on slow terminals).
    #[arg(long, default_value = "3", value_name = "N")]
    pub sand_steps: u32,

    /// Wind strength; above 0.85 it forces the sand to drift.
    #[arg(long, default_value = "0.2", value_name = "FACTOR")]
    pub wind: f64,

    /// Blink the match flash instead of fading it.
    #[arg(long)]
    pub no_animation: bool,

    /// Colour palette: normal, high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Target render frames per second.
    #[arg(long, default_value = "60.0", value_name = "RATE")]
    pub frame_rate: f64,

    /// Write tracing output here (filter with RUST_LOG).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

impl Args {
    pub fn game_config(&self) -> GameConfig {
        GameConfig {
            cols: self.width,
            rows: self.height,
            block: self.block,
            sand_steps: self.sand_steps,
            wind_factor: self.wind,
            ..GameConfig::default()
        }
    }

    pub fn theme(&self) -> Theme {
        Theme::new(self.palette)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_map_to_default_config() {
        let args = Args::parse_from(["sandtris"]);
        assert_eq!(args.game_config(), GameConfig::default());
        assert_eq!(args.palette, Palette::Normal);
    }

    #[test]
    fn flags_override_config() {
        let args = Args::parse_from([
            "sandtris",
            "--width",
            "8",
            "--sand-steps",
            "2",
            "--wind",
            "0.9",
            "--palette",
            "colourblind",
        ]);
        let config = args.game_config();
        assert_eq!(config.cols, 8);
        assert_eq!(config.sand_steps, 2);
        assert_eq!(config.wind_factor, 0.9);
        assert_eq!(args.palette, Palette::Colorblind);
    }
}
