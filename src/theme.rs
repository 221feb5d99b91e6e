//! Colour palettes for sand, board and sidebar.

use clap::ValueEnum;
use ratatui::style::Color;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}

#[derive(Debug, Clone)]
pub struct Theme {
    /// Sand colours for palette indices 1..=7 (I, O, T, S, Z, J, L).
    pub sand: [Color; 7],
    /// Empty board cells.
    pub bg: Color,
    pub div_line: Color,
    pub main_fg: Color,
    pub title: Color,
    /// Highlight for cells in a match flash.
    pub flash: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::new(Palette::Normal)
    }
}

impl Theme {
    pub fn new(palette: Palette) -> Self {
        let sand = match palette {
            Palette::Normal => [
                Color::Rgb(240, 218, 104),
                Color::Rgb(214, 174, 76),
                Color::Rgb(96, 198, 130),
                Color::Rgb(92, 156, 206),
                Color::Rgb(228, 142, 90),
                Color::Rgb(168, 128, 210),
                Color::Rgb(238, 156, 100),
            ],
            Palette::HighContrast => [
                Color::Rgb(255, 255, 0),
                Color::Rgb(255, 136, 0),
                Color::Rgb(0, 255, 0),
                Color::Rgb(0, 136, 255),
                Color::Rgb(255, 0, 0),
                Color::Rgb(255, 0, 255),
                Color::Rgb(0, 255, 255),
            ],
            // Tol "vibrant" set, distinguishable under the common colour deficiencies.
            Palette::Colorblind => [
                Color::Rgb(0, 119, 187),
                Color::Rgb(238, 119, 51),
                Color::Rgb(0, 153, 136),
                Color::Rgb(204, 51, 17),
                Color::Rgb(238, 51, 119),
                Color::Rgb(187, 187, 0),
                Color::Rgb(51, 187, 238),
            ],
        };
        Self {
            sand,
            bg: Color::Rgb(22, 30, 54),
            div_line: Color::Rgb(63, 68, 79),
            main_fg: Color::Rgb(171, 178, 191),
            title: Color::Rgb(229, 192, 123),
            flash: Color::Rgb(245, 245, 245),
        }
    }

    /// Colour for a grid palette index (1..=7). Out-of-range indices wrap.
    #[inline]
    pub fn sand_color(&self, index: u8) -> Color {
        self.sand[(index.saturating_sub(1) as usize) % self.sand.len()]
    }
}

/// Brighten (positive) or darken (negative) an RGB colour by `amount` per channel.
pub fn shade(color: Color, amount: i16) -> Color {
    let (r, g, b) = match color {
        Color::Rgb(r, g, b) => (r, g, b),
        Color::White => (255, 255, 255),
        Color::Black => (0, 0, 0),
        _ => return color,
    };
    let adjust = |c: u8| (i16::from(c) + amount).clamp(0, 255) as u8;
    Color::Rgb(adjust(r), adjust(g), adjust(b))
}
