//! Near-square grid tiling.
//!
//! [`GridLayout`] splits a rectangular area into `cols × rows` equal cells,
//! with `cols = ⌈√n⌉` and `rows = ⌈n / cols⌉`, and assigns item `i` to cell
//! `(i % cols, i / cols)`.  It is pure arithmetic; applying the cells to
//! real windows is [`layout`](crate::layout)'s job.

use crate::command::Bounds;

/// A grid of `n` cells laid over an area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    count: usize,
    cols: usize,
    rows: usize,
    cell_width: u32,
    cell_height: u32,
    origin: (i32, i32),
}

impl GridLayout {
    /// Compute the grid for `count` items over `area`.
    ///
    /// Returns `None` when there is nothing to place.
    pub fn new(count: usize, area: Bounds) -> Option<Self> {
        if count == 0 {
            return None;
        }
        let cols = ceil_sqrt(count);
        let rows = count.div_ceil(cols);
        Some(Self {
            count,
            cols,
            rows,
            cell_width: area.width / cols as u32,
            cell_height: area.height / rows as u32,
            origin: (area.left, area.top),
        })
    }

    /// Grid dimensions as `(cols, rows)`.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.cols, self.rows)
    }

    /// Cell size as `(width, height)`.
    pub fn cell_size(&self) -> (u32, u32) {
        (self.cell_width, self.cell_height)
    }

    /// `(col, row)` of item `index`.
    pub fn position(&self, index: usize) -> (usize, usize) {
        (index % self.cols, index / self.cols)
    }

    /// Screen rectangle of item `index`, or `None` if out of range.
    pub fn cell(&self, index: usize) -> Option<Bounds> {
        if index >= self.count {
            return None;
        }
        let (col, row) = self.position(index);
        Some(Bounds {
            left: self.origin.0 + (col as u32 * self.cell_width) as i32,
            top: self.origin.1 + (row as u32 * self.cell_height) as i32,
            width: self.cell_width,
            height: self.cell_height,
        })
    }

    /// Every cell in item order.
    pub fn cells(&self) -> impl Iterator<Item = Bounds> + '_ {
        (0..self.count).filter_map(|i| self.cell(i))
    }
}

/// Smallest `c` with `c * c >= n`.
fn ceil_sqrt(n: usize) -> usize {
    let mut c = (n as f64).sqrt() as usize;
    while c * c < n {
        c += 1;
    }
    while c > 1 && (c - 1) * (c - 1) >= n {
        c -= 1;
    }
    c.max(1)
}

//  Tests
