use crate::error::{Error, Result};

/// Per-step counting sort of particle indices into spatial cells.
///
/// After `bin`, `cell(c)` is the ordered list of particle indices whose position
/// falls in cell `c`. All buffers are reused across steps; a cell's list is only
/// valid until the next call to `bin`.
#[derive(Debug, Clone)]
pub struct CellBinner {
    num_cells: usize,
    cell_width: f64,
    cell_of: Vec<usize>,
    /// Start offset of each cell in `order`; `starts[num_cells] == N`.
    starts: Vec<usize>,
    cursor: Vec<usize>,
    order: Vec<usize>,
}

impl CellBinner {
    pub fn new(num_cells: usize, cell_width: f64) -> Result<Self> {
        if num_cells == 0 {
            return Err(Error::InvalidParam("num_cells must be > 0".into()));
        }
        if !cell_width.is_finite() || cell_width <= 0.0 {
            return Err(Error::InvalidParam(
                "cell_width must be finite and > 0".into(),
            ));
        }
        Ok(Self {
            num_cells,
            cell_width,
            cell_of: Vec::new(),
            starts: vec![0; num_cells + 1],
            cursor: vec![0; num_cells],
            order: Vec::new(),
        })
    }

    #[inline]
    pub fn num_cells(&self) -> usize {
        self.num_cells
    }

    /// Cell containing position `x`, assuming `x` is in [0, domain length).
    #[inline]
    pub fn cell_index(&self, x: f64) -> usize {
        // x / width can round up to num_cells for x just below the domain length
        ((x / self.cell_width) as usize).min(self.num_cells - 1)
    }

    /// Rebuild the per-cell index lists from `positions`. O(N + cells).
    pub fn bin(&mut self, positions: &[f64]) {
        let n = positions.len();
        self.cell_of.clear();
        self.cell_of.reserve(n);
        self.starts.iter_mut().for_each(|s| *s = 0);

        // counts land in starts[c + 1] so the prefix sum is in place
        for &x in positions {
            let c = self.cell_index(x);
            self.cell_of.push(c);
            self.starts[c + 1] += 1;
        }
        for c in 0..self.num_cells {
            self.starts[c + 1] += self.starts[c];
        }

        self.cursor.copy_from_slice(&self.starts[..self.num_cells]);
        self.order.resize(n, 0);
        for (i, &c) in self.cell_of.iter().enumerate() {
            self.order[self.cursor[c]] = i;
            self.cursor[c] += 1;
        }
    }

    /// Particle indices in cell `c`, in ascending index order.
    #[inline]
    pub fn cell(&self, c: usize) -> &[usize] {
        &self.order[self.starts[c]..self.starts[c + 1]]
    }

    /// Number of particles in each cell after the last `bin`.
    pub fn counts(&self) -> impl Iterator<Item = usize> + '_ {
        self.starts.windows(2).map(|w| w[1] - w[0])
    }

    /// Every cell's index list, in cell order.
    pub fn cells(&self) -> impl Iterator<Item = &[usize]> + '_ {
        (0..self.num_cells).map(move |c| self.cell(c))
    }
}
