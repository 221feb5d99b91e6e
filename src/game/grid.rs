//! Dense row-major 2D storage addressed in fine (grain) coordinates.

/// Single settled cell: either empty or sand of a palette colour (1..=7).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Cell {
    #[default]
    Empty,
    Sand(u8),
}

impl Cell {
    #[inline]
    pub fn is_empty(self) -> bool {
        matches!(self, Self::Empty)
    }

    #[inline]
    pub fn color(self) -> Option<u8> {
        match self {
            Self::Empty => None,
            Self::Sand(c) => Some(c),
        }
    }
}

/// Fixed-size grid. y = 0 is the top row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid<T> {
    width: usize,
    height: usize,
    cells: Vec<T>,
}

impl<T: Copy + Default> Grid<T> {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![T::default(); width * height],
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Flat index for signed coordinates; `None` when outside the grid.
    #[inline]
    pub fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        Some(y as usize * self.width + x as usize)
    }

    /// Inverse of [`Grid::index`].
    #[inline]
    pub fn coords(&self, index: usize) -> (i32, i32) {
        ((index % self.width) as i32, (index / self.width) as i32)
    }

    #[inline]
    pub fn get(&self, x: i32, y: i32) -> Option<T> {
        self.index(x, y).map(|i| self.cells[i])
    }

    /// Returns false when (x, y) is out of bounds.
    #[inline]
    pub fn set(&mut self, x: i32, y: i32, value: T) -> bool {
        match self.index(x, y) {
            Some(i) => {
                self.cells[i] = value;
                true
            }
            None => false,
        }
    }

    #[inline]
    pub fn at(&self, index: usize) -> T {
        self.cells[index]
    }

    #[inline]
    pub fn put(&mut self, index: usize, value: T) {
        self.cells[index] = value;
    }

    pub fn fill(&mut self, value: T) {
        self.cells.fill(value);
    }

    /// Overwrite with the contents of `other`; both grids must share dimensions.
    pub fn copy_from(&mut self, other: &Self) {
        debug_assert_eq!((self.width, self.height), (other.width, other.height));
        self.cells.copy_from_slice(&other.cells);
    }

    pub fn row(&self, y: usize) -> &[T] {
        let start = y * self.width;
        &self.cells[start..start + self.width]
    }

    pub fn row_mut(&mut self, y: usize) -> &mut [T] {
        let start = y * self.width;
        &mut self.cells[start..start + self.width]
    }

    pub fn as_slice(&self) -> &[T] {
        &self.cells
    }
}

impl Grid<Cell> {
    /// Number of non-empty cells.
    pub fn sand_count(&self) -> usize {
        self.cells.iter().filter(|c| !c.is_empty()).count()
    }

    /// Number of non-empty cells in row `y`.
    pub fn row_fill(&self, y: usize) -> usize {
        self.row(y).iter().filter(|c| !c.is_empty()).count()
    }
}

impl Grid<bool> {
    pub fn count_set(&self) -> usize {
        self.cells.iter().filter(|&&b| b).count()
    }
}
