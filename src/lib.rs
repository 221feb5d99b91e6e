//! Falling-sand tetromino puzzle engine.
//!
//! Pieces are placed from a tray, fall under gravity, and dissolve into grains once
//! they land. Grains are moved by a cellular automaton; large same-colour regions
//! flash and are removed, nearly full rows are compacted away.

pub mod game;

pub use game::{ConfigError, GameConfig, GameEvent, GameState, PieceKind, PieceState, PlaceError};
