// column -> active rows, rebuilt from scratch on every matrix change.
// freehand strokes touch arbitrary cells so there's nothing worth diffing;
// a full pass over N^2 booleans is cheap at the sizes we draw.

use super::matrix::Matrix;

#[derive(Clone, Debug, Default)]
pub struct GridIndex {
    columns: Vec<Vec<usize>>,
    active: usize,
}

impl GridIndex {
    pub fn new(size: usize) -> Self {
        Self {
            columns: vec![Vec::new(); size],
            active: 0,
        }
    }

    pub fn from_matrix(matrix: &Matrix) -> Self {
        let mut index = Self::new(matrix.size());
        index.rescan(matrix);
        index
    }

    pub fn rescan(&mut self, matrix: &Matrix) {
        let size = matrix.size();
        self.columns.resize_with(size, Vec::new);
        self.columns.truncate(size);
        self.active = 0;

        for (col, rows) in self.columns.iter_mut().enumerate() {
            rows.clear();
            for row in 0..size {
                if matrix.get(row, col) {
                    rows.push(row); // row-major scan keeps each column sorted
                }
            }
            self.active += rows.len();
        }
    }

    pub fn clear(&mut self, size: usize) {
        self.columns = vec![Vec::new(); size];
        self.active = 0;
    }

    // empty slice for columns with nothing painted (or past the edge)
    pub fn active_rows(&self, column: usize) -> &[usize] {
        self.columns.get(column).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn count_active(&self) -> usize {
        self.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_cell_lands_in_its_column() {
        let mut m = Matrix::new(64);
        m.set(10, 3, true).unwrap();
        let index = GridIndex::from_matrix(&m);
        assert_eq!(index.active_rows(3), &[10]);
        assert_eq!(index.count_active(), 1);
        assert!(index.active_rows(4).is_empty());
    }

    #[test]
    fn rescan_matches_matrix_exactly() {
        let mut m = Matrix::new(12);
        let painted = [(0, 0), (11, 0), (5, 0), (3, 7), (3, 8), (9, 11), (2, 11)];
        for (r, c) in painted {
            m.set(r, c, true).unwrap();
        }
        let index = GridIndex::from_matrix(&m);
        for col in 0..12 {
            let expected: Vec<usize> = (0..12).filter(|&r| m.get(r, col)).collect();
            assert_eq!(index.active_rows(col), expected.as_slice(), "column {col}");
        }
        assert_eq!(index.count_active(), painted.len());
    }

    #[test]
    fn rescan_forgets_erased_cells() {
        let mut m = Matrix::new(4);
        m.set(1, 1, true).unwrap();
        let mut index = GridIndex::from_matrix(&m);
        m.set(1, 1, false).unwrap();
        m.set(2, 1, true).unwrap();
        index.rescan(&m);
        assert_eq!(index.active_rows(1), &[2]);
        assert_eq!(index.count_active(), 1);
    }

    #[test]
    fn rescan_follows_size_changes() {
        let mut index = GridIndex::from_matrix(&Matrix::new(8));
        let mut small = Matrix::new(3);
        small.set(1, 2, true).unwrap();
        index.rescan(&small);
        assert_eq!(index.active_rows(2), &[1]);
        assert!(index.active_rows(5).is_empty());
        index.clear(6);
        assert!((0..6).all(|c| index.active_rows(c).is_empty()));
        assert_eq!(index.count_active(), 0);
    }
}
