// state local to the tui: where the cursor is and how the grid is scrolled.
// `size` and `playing` are synced from DisplayState every loop
#[derive(Clone, Debug)]
pub struct TuiState {
    pub cursor_row: usize,
    pub cursor_col: usize,
    pub size: usize,
    pub playing: bool,
    // first visible row/col when the grid is bigger than the terminal
    pub scroll_row: usize,
    pub scroll_col: usize,
}

impl TuiState {
    pub fn new(size: usize) -> Self {
        Self {
            cursor_row: 0,
            cursor_col: 0,
            size,
            playing: false,
            scroll_row: 0,
            scroll_col: 0,
        }
    }

    pub fn sync_size(&mut self, size: usize) {
        if size != self.size {
            self.size = size;
            self.cursor_row = self.cursor_row.min(size.saturating_sub(1));
            self.cursor_col = self.cursor_col.min(size.saturating_sub(1));
            self.scroll_row = 0;
            self.scroll_col = 0;
        }
    }

    // moves with wraparound at the edges
    pub fn move_cursor(&mut self, d_row: isize, d_col: isize) {
        if self.size == 0 {
            return;
        }
        let n = self.size as isize;
        self.cursor_row = (self.cursor_row as isize + d_row).rem_euclid(n) as usize;
        self.cursor_col = (self.cursor_col as isize + d_col).rem_euclid(n) as usize;
    }

    // keep the cursor inside a `rows` x `cols` viewport
    pub fn follow_cursor(&mut self, rows: usize, cols: usize) {
        self.scroll_row = scroll_to(self.scroll_row, self.cursor_row, rows);
        self.scroll_col = scroll_to(self.scroll_col, self.cursor_col, cols);
    }
}

fn scroll_to(scroll: usize, cursor: usize, visible: usize) -> usize {
    if visible == 0 {
        return cursor;
    }
    if cursor < scroll {
        cursor
    } else if cursor >= scroll + visible {
        cursor + 1 - visible
    } else {
        scroll
    }
}
