//! Tetromino shapes, precomputed rotations and the piece anchor.
//!
//! Each shape lives in a 4x4 block box. Rotation turns the box about its centre, so
//! the anchor stays put and the cells move inside the box.

/// Tetromino kinds (I, O, T, S, Z, J, L).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceKind {
    I,
    O,
    T,
    S,
    Z,
    J,
    L,
}

type Shape = [(i8, i8); 4];

/// Base cells (block units) inside the 4x4 box, rotation 0.
const BASE_SHAPES: [Shape; 7] = [
    [(0, 1), (1, 1), (2, 1), (3, 1)],
    [(1, 0), (2, 0), (1, 1), (2, 1)],
    [(1, 0), (0, 1), (1, 1), (2, 1)],
    [(1, 0), (2, 0), (0, 1), (1, 1)],
    [(0, 0), (1, 0), (1, 1), (2, 1)],
    [(0, 0), (0, 1), (1, 1), (2, 1)],
    [(2, 0), (0, 1), (1, 1), (2, 1)],
];

const fn rotate_cell(x: i8, y: i8, rot: usize) -> (i8, i8) {
    match rot {
        0 => (x, y),
        1 => (3 - y, x),
        2 => (3 - x, 3 - y),
        _ => (y, 3 - x),
    }
}

const fn build_rotations() -> [[Shape; 4]; 7] {
    let mut out = [[[(0, 0); 4]; 4]; 7];
    let mut kind = 0;
    while kind < 7 {
        let mut rot = 0;
        while rot < 4 {
            let mut i = 0;
            while i < 4 {
                let (x, y) = BASE_SHAPES[kind][i];
                out[kind][rot][i] = rotate_cell(x, y, rot);
                i += 1;
            }
            rot += 1;
        }
        kind += 1;
    }
    out
}

static ROTATIONS: [[Shape; 4]; 7] = build_rotations();

/// Inclusive block-unit extent of a shape inside its box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl PieceKind {
    pub const ALL: [Self; 7] = [Self::I, Self::O, Self::T, Self::S, Self::Z, Self::J, Self::L];

    #[inline]
    fn ordinal(self) -> usize {
        self as usize
    }

    /// Palette index written into the grid (1..=7).
    pub fn color(self) -> u8 {
        self.ordinal() as u8 + 1
    }

    /// Block cells for rotation `rot` (taken mod 4).
    pub fn cells(self, rot: u8) -> &'static [(i8, i8); 4] {
        &ROTATIONS[self.ordinal()][(rot % 4) as usize]
    }

    pub fn bounds(self, rot: u8) -> Bounds {
        let mut b = Bounds {
            min_x: 4,
            min_y: 4,
            max_x: -1,
            max_y: -1,
        };
        for &(x, y) in self.cells(rot) {
            b.min_x = b.min_x.min(x.into());
            b.min_y = b.min_y.min(y.into());
            b.max_x = b.max_x.max(x.into());
            b.max_y = b.max_y.max(y.into());
        }
        b
    }

    /// Snap a requested rotation-0 anchor to the block lattice and clamp it so the
    /// whole shape lies inside a `grid_w` x `grid_h` board.
    pub fn clamp_origin(
        self,
        x: i32,
        y: i32,
        block: i32,
        grid_w: i32,
        grid_h: i32,
    ) -> (i32, i32) {
        let b = self.bounds(0);
        let step = f64::from(block);
        // float-to-int casts saturate
        let snap = |v: i32| ((f64::from(v) / step).round() * step) as i32;
        let min_x = -b.min_x * block;
        let max_x = grid_w - (b.max_x + 1) * block;
        let min_y = -b.min_y * block;
        let max_y = grid_h - (b.max_y + 1) * block;
        (snap(x).clamp(min_x, max_x), snap(y).clamp(min_y, max_y))
    }
}

/// Rigid piece: kind, rotation (0..4) and the top-left of its 4x4 box in grain units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece {
    pub kind: PieceKind,
    pub rotation: u8,
    pub x: i32,
    pub y: i32,
}

impl Piece {
    pub fn new(kind: PieceKind, x: i32, y: i32) -> Self {
        Self {
            kind,
            rotation: 0,
            x,
            y,
        }
    }

    pub fn color(&self) -> u8 {
        self.kind.color()
    }

    /// Top-left grain coordinate of each of the 4 blocks.
    pub fn block_origins(&self, block: i32) -> [(i32, i32); 4] {
        (*self.kind.cells(self.rotation)).map(|(bx, by)| {
            (
                self.x.saturating_add(i32::from(bx) * block),
                self.y.saturating_add(i32::from(by) * block),
            )
        })
    }

    /// Every grain covered by the piece, including rows above the visible grid.
    pub fn footprint(&self, block: i32) -> impl Iterator<Item = (i32, i32)> + use<> {
        self.block_origins(block).into_iter().flat_map(move |(ox, oy)| {
            (0..block).flat_map(move |dy| (0..block).map(move |dx| (ox + dx, oy + dy)))
        })
    }

    /// Same piece moved by (dx, dy) and set to `rotation`.
    pub fn shifted(&self, dx: i32, dy: i32, rotation: u8) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
            rotation: rotation % 4,
            ..*self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colours_are_distinct_and_nonzero() {
        let mut seen = std::collections::HashSet::new();
        for kind in PieceKind::ALL {
            assert!((1..=7).contains(&kind.color()));
            assert!(seen.insert(kind.color()));
        }
    }

    #[test]
    fn four_quarter_turns_are_identity() {
        for kind in PieceKind::ALL {
            for rot in 0..4u8 {
                assert_eq!(kind.cells(rot), kind.cells(rot + 4));
            }
            let mut p = Piece::new(kind, 0, 0);
            for _ in 0..4 {
                p = p.shifted(0, 0, p.rotation + 1);
            }
            assert_eq!(p, Piece::new(kind, 0, 0));
        }
    }

    #[test]
    fn rotations_stay_inside_the_box() {
        for kind in PieceKind::ALL {
            for rot in 0..4 {
                let b = kind.bounds(rot);
                assert!(b.min_x >= 0 && b.min_y >= 0 && b.max_x <= 3 && b.max_y <= 3);
            }
        }
    }

    #[test]
    fn i_piece_turns_vertical() {
        let b = PieceKind::I.bounds(1);
        assert_eq!(b.min_x, b.max_x);
        assert_eq!(b.max_y - b.min_y, 3);
    }

    #[test]
    fn footprint_covers_four_blocks() {
        let p = Piece::new(PieceKind::T, 6, -6);
        let cells: std::collections::HashSet<_> = p.footprint(6).collect();
        assert_eq!(cells.len(), 4 * 36);
        assert!(cells.contains(&(12, -6)));
    }

    #[test]
    fn clamp_keeps_shape_on_board() {
        // O occupies box columns 1..=2 and rows 0..=1.
        let (x, y) = PieceKind::O.clamp_origin(-100, 500, 6, 60, 120);
        assert_eq!(x, -6);
        assert_eq!(y, 120 - 12);
        let (x, _) = PieceKind::O.clamp_origin(100, 0, 6, 60, 120);
        assert_eq!(x, 60 - 18);
        let (x, y) = PieceKind::O.clamp_origin(13, 4, 6, 60, 120);
        assert_eq!((x, y), (12, 6));
    }

    #[test]
    fn extreme_anchors_saturate() {
        let (x, y) = PieceKind::I.clamp_origin(i32::MAX, i32::MIN, 7, 70, 140);
        assert_eq!((x, y), (70 - 28, -7));
        let p = Piece::new(PieceKind::I, i32::MAX, 0).shifted(5, i32::MIN, 0);
        assert_eq!((p.x, p.y), (i32::MAX, i32::MIN));
        assert!(p.block_origins(6).iter().all(|&(x, _)| x == i32::MAX));
    }
}
