//! Dense pixel grid mirroring the remote display.
//!
//! The buffer is row-major and fully dense: every `(row, column)` pair
//! inside the current dimensions has exactly one cell. There is no
//! delta path — every accepted snapshot replaces the whole grid, which
//! is fine because matrix sizes are bounded by the device hardware
//! (a few thousand cells).

use crate::error::JumboError;
use crate::pixel::Pixel;

// ── PixelBuffer ──────────────────────────────────────────────────

/// The last-known state of the remote matrix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PixelBuffer {
    rows: usize,
    columns: usize,
    cells: Vec<Pixel>,
}

impl PixelBuffer {
    /// An empty 0x0 buffer. Sized later via [`resize`](Self::resize).
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a zero-filled `rows x columns` grid, discarding any
    /// prior contents.
    ///
    /// Called exactly once per successful connection handshake, with
    /// the geometry the device reported.
    pub fn resize(&mut self, rows: usize, columns: usize) {
        self.rows = rows;
        self.columns = columns;
        self.cells = vec![Pixel::default(); rows * columns];
    }

    /// Swap in an entire snapshot grid.
    ///
    /// The swap is all-or-nothing: a geometry mismatch leaves the
    /// current contents untouched.
    pub fn replace(&mut self, grid: &[Vec<Pixel>]) -> Result<(), JumboError> {
        let got_rows = grid.len();
        let got_columns = grid.first().map(Vec::len).unwrap_or(0);
        if got_rows != self.rows
            || grid.iter().any(|row| row.len() != self.columns)
        {
            return Err(JumboError::DimensionMismatch {
                got_rows,
                got_columns,
                rows: self.rows,
                columns: self.columns,
            });
        }

        for (row_idx, row) in grid.iter().enumerate() {
            let start = row_idx * self.columns;
            self.cells[start..start + self.columns].copy_from_slice(row);
        }
        Ok(())
    }

    /// The cell at `(row, column)`.
    pub fn get(&self, row: usize, column: usize) -> Result<Pixel, JumboError> {
        if row >= self.rows || column >= self.columns {
            return Err(JumboError::OutOfRange {
                row,
                column,
                rows: self.rows,
                columns: self.columns,
            });
        }
        Ok(self.cells[row * self.columns + column])
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Total cell count (`rows * columns`).
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Iterate cells of one row.
    ///
    /// # Panics
    ///
    /// Panics if `row` is out of bounds; use [`get`](Self::get) for
    /// checked access.
    pub fn row(&self, row: usize) -> &[Pixel] {
        let start = row * self.columns;
        &self.cells[start..start + self.columns]
    }

    /// Content hash of the whole grid, used as the snapshot dedup key.
    ///
    /// Cells are packed row-major as `r g b brightness` bytes, so any
    /// single-channel change on any cell produces a different hash.
    pub fn content_hash(&self) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new();
        for cell in &self.cells {
            hasher.update(&[cell.r, cell.g, cell.b, cell.brightness]);
        }
        hasher.finalize()
    }

    /// Clone the grid out as nested rows (render-friendly shape).
    pub fn to_rows(&self) -> Vec<Vec<Pixel>> {
        (0..self.rows).map(|r| self.row(r).to_vec()).collect()
    }
}

/// Hash an incoming snapshot grid without copying it into a buffer.
///
/// Must agree byte-for-byte with [`PixelBuffer::content_hash`].
pub fn grid_hash(grid: &[Vec<Pixel>]) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    for row in grid {
        for cell in row {
            hasher.update(&[cell.r, cell.g, cell.b, cell.brightness]);
        }
    }
    hasher.finalize()
}

// ── Tests ────────────────────────────────────────────────────────
