use crate::error::{EngineError, Result};

pub const DEFAULT_MATRIX_SIZE: usize = 64;

/// The painted grid. Rows are pitch, columns are time. Always square; the only
/// way to change the size is `resized`, which also clears every cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Matrix {
    cells: Vec<Vec<bool>>,
    size: usize,
}

impl Matrix {
    pub fn new(size: usize) -> Self {
        Self {
            cells: vec![vec![false; size]; size],
            size,
        }
    }

    // takes ownership of a UI-built grid, rejecting anything not `size` x `size`
    pub fn from_rows(rows: Vec<Vec<bool>>, size: usize) -> Result<Self> {
        if rows.len() != size || rows.iter().any(|r| r.len() != size) {
            return Err(EngineError::InvalidMatrix { expected: size });
        }
        Ok(Self { cells: rows, size })
    }

    pub fn resized(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(EngineError::InvalidSize(size));
        }
        Ok(Self::new(size))
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, row: usize, col: usize) -> bool {
        self.cells
            .get(row)
            .and_then(|r| r.get(col))
            .copied()
            .unwrap_or(false)
    }

    pub fn set(&mut self, row: usize, col: usize, value: bool) -> Result<()> {
        let cell = self
            .cells
            .get_mut(row)
            .and_then(|r| r.get_mut(col))
            .ok_or(EngineError::CellOutOfRange { row, col })?;
        *cell = value;
        Ok(())
    }

    pub fn toggle(&mut self, row: usize, col: usize) -> Result<bool> {
        let next = !self.get(row, col);
        self.set(row, col, next)?;
        Ok(next)
    }

    pub fn clear(&mut self) {
        for row in &mut self.cells {
            row.fill(false);
        }
    }

    pub fn rows(&self) -> &[Vec<bool>] {
        &self.cells
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::new(DEFAULT_MATRIX_SIZE)
    }
}
