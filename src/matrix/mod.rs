//! The logical terminal grid: dirty tracking, cursor bookkeeping, and the minimal
//! diff produced by `commit`.

mod cell;

pub use cell::{needs_update, Cell, CellUpdate};

use crate::geometry::{Point, Rect};
use crate::style::CellStyle;

/// The character grid plus everything needed to report a minimal diff of what
/// changed since the last `commit`.
///
/// Addressing is 1-based `(col, row)` from the upper-left for every public method;
/// storage is 0-based internally.
#[derive(Debug, Clone)]
pub struct Matrix {
    cols: i32,
    rows: i32,
    current: Vec<Cell>,
    old: Vec<Cell>,
    alternate: Vec<Cell>,
    alternate_active: bool,
    pos: Point,
    pos_old: Point,
    pos_last: Point,
    cursor_visible: bool,
    cursor_visible_old: bool,
    /// Set when the cursor sits past the last column after a `write` and the
    /// resulting line advance (and possible scroll) has been deferred until the
    /// next glyph actually needs the new row.
    wrap_pending: bool,
    /// Smallest region touched since the last commit, in 0-based cell coordinates.
    update_bounds: Rect,
}

impl Matrix {
    /// Create a matrix of the given size, blank and fully dirty.
    pub fn new(cols: i32, rows: i32) -> Self {
        let cols = cols.max(0);
        let rows = rows.max(0);
        let len = (cols * rows) as usize;
        let mut m = Matrix {
            cols,
            rows,
            current: vec![Cell::default(); len],
            old: vec![Cell::default(); len],
            alternate: vec![Cell::default(); len],
            alternate_active: false,
            pos: Point::new(1, 1),
            pos_old: Point::new(1, 1),
            pos_last: Point::new(1, 1),
            cursor_visible: true,
            cursor_visible_old: true,
            wrap_pending: false,
            update_bounds: Rect::invalid(),
        };
        m.update_bounds = m.full_bounds();
        m
    }

    pub fn cols(&self) -> i32 {
        self.cols
    }

    pub fn rows(&self) -> i32 {
        self.rows
    }

    /// Read the current contents of cell `(col0, row0)` (0-based), if in range.
    pub fn cell_at(&self, col0: i32, row0: i32) -> Option<&Cell> {
        self.index0(col0, row0).map(|idx| &self.current[idx])
    }

    fn full_bounds(&self) -> Rect {
        if self.cols <= 0 || self.rows <= 0 {
            Rect::invalid()
        } else {
            Rect::new(0, 0, self.cols - 1, self.rows - 1)
        }
    }

    fn index0(&self, col0: i32, row0: i32) -> Option<usize> {
        if col0 < 0 || row0 < 0 || col0 >= self.cols || row0 >= self.rows {
            None
        } else {
            Some((row0 * self.cols + col0) as usize)
        }
    }

    /// Convert a 1-based external point to a 0-based internal index, if in range.
    fn index_from_pos(&self, pos: Point) -> Option<usize> {
        self.index0(pos.x - 1, pos.y - 1)
    }

    fn clip_pos(&self, pos: Point) -> Point {
        if self.cols <= 0 || self.rows <= 0 {
            return Point::new(1, 1);
        }
        Point::new(pos.x.clamp(1, self.cols), pos.y.clamp(1, self.rows))
    }

    pub fn cursor_pos(&self) -> Point {
        self.pos
    }

    pub fn set_cursor_visible(&mut self, visible: bool) {
        self.cursor_visible = visible;
    }

    pub fn cursor_visible(&self) -> bool {
        self.cursor_visible
    }

    /// Grow the cell buffers to the new geometry, preserving existing contents
    /// within the common sub-grid and marking new cells dirty.
    pub fn resize(&mut self, cols: i32, rows: i32) {
        let cols = cols.max(0);
        let rows = rows.max(0);
        if cols == self.cols && rows == self.rows {
            return;
        }

        let mut new_current = vec![Cell::default(); (cols * rows) as usize];
        let mut new_old = vec![Cell::default(); (cols * rows) as usize];

        let common_cols = cols.min(self.cols);
        let common_rows = rows.min(self.rows);
        for row0 in 0..common_rows {
            for col0 in 0..common_cols {
                if let (Some(src), Some(dst)) = (
                    self.index0(col0, row0),
                    Some((row0 * cols + col0) as usize),
                ) {
                    new_current[dst] = self.current[src];
                    new_old[dst] = self.old[src];
                }
            }
        }

        self.current = new_current;
        self.old = new_old;
        self.alternate = vec![Cell::default(); (cols * rows) as usize];
        self.cols = cols;
        self.rows = rows;
        self.pos = self.clip_pos(self.pos);
        self.pos_old = self.clip_pos(self.pos_old);
        self.pos_last = self.clip_pos(self.pos_last);
        self.wrap_pending = false;
        self.update_bounds = self.update_bounds.clip(&self.full_bounds());
    }

    /// Clear current and alternate buffers to blank/default; cursor returns to
    /// `(1,1)` visible.
    pub fn reset(&mut self) {
        for c in self.current.iter_mut() {
            *c = Cell::default();
        }
        for c in self.alternate.iter_mut() {
            *c = Cell::default();
        }
        self.pos = Point::new(1, 1);
        self.cursor_visible = true;
        self.wrap_pending = false;
        self.update_bounds = self.full_bounds();
    }

    pub fn move_abs(&mut self, row: i32, col: i32) {
        self.pos = self.clip_pos(Point::new(col, row));
        self.wrap_pending = false;
    }

    /// Relative cursor motion, used for explicit cursor controls (not the
    /// per-character advance in `write`, which defers its wrap). With `wrap`, a
    /// column overflow advances to the next row (wrapping `col` back into range),
    /// and a row overflow beyond the bottom scrolls the whole grid up before
    /// clamping. Always resolves immediately; any pending deferred wrap from a
    /// prior `write` is cancelled, since explicit motion supersedes it.
    pub fn move_rel(&mut self, dy: i32, dx: i32, wrap: bool) {
        let mut col = self.pos.x + dx;
        let mut row = self.pos.y + dy;

        if wrap && self.cols > 0 {
            while col > self.cols {
                col -= self.cols;
                row += 1;
            }
        }

        if wrap && row > self.rows && self.rows > 0 {
            let overflow = row - self.rows;
            let full = self.full_bounds();
            self.scroll(0, CellStyle::default(), full, overflow, 0);
            row -= overflow;
        }

        self.pos = self.clip_pos(Point::new(col, row));
        self.wrap_pending = false;
    }

    /// Advance to the start of the next line, scrolling the grid up if that line
    /// falls past the last row. Applies a wrap deferred by `write`.
    fn advance_line(&mut self) {
        let mut row = self.pos.y + 1;
        if self.rows > 0 && row > self.rows {
            let overflow = row - self.rows;
            let full = self.full_bounds();
            self.scroll(0, CellStyle::default(), full, overflow, 0);
            row -= overflow;
        }
        self.pos = self.clip_pos(Point::new(1, row));
    }

    /// No-op if `pt` is out of range. Replaces the cell only if its `(glyph,
    /// style)` actually differs, marking it dirty and extending `update_bounds`.
    pub fn set(&mut self, glyph: u32, style: CellStyle, pt: Point) {
        let Some(idx) = self.index_from_pos(pt) else {
            return;
        };
        let existing = &self.current[idx];
        if existing.glyph == glyph && existing.style == style {
            return;
        }
        self.current[idx].glyph = glyph;
        self.current[idx].style = style;
        self.current[idx].dirty = true;
        self.update_bounds = self.update_bounds.grow_point(Point::new(pt.x - 1, pt.y - 1));
    }

    /// Stamp a glyph at the cursor and advance it by one column. If `replaces_last`
    /// is set, the cursor first jumps back to the previous write position (used for
    /// combining characters). Reaching the last column doesn't advance to the next
    /// row immediately: the advance (and any scroll it needs) is deferred until a
    /// following `write` actually needs the new row, so a glyph landing exactly in
    /// the bottom-right cell never triggers a scroll nobody asked for.
    pub fn write(&mut self, glyph: u32, style: CellStyle, replaces_last: bool) {
        if replaces_last {
            self.pos = self.pos_last;
            self.wrap_pending = false;
        } else if self.wrap_pending {
            self.wrap_pending = false;
            self.advance_line();
        }
        self.set(glyph, style, self.pos);
        self.pos_last = self.pos;
        if self.cols > 0 && self.pos.x >= self.cols {
            self.wrap_pending = true;
        } else {
            self.pos.x += 1;
        }
    }

    /// Inclusive rectangular fill, in reading order (row-major, `from` to `to`).
    pub fn fill(&mut self, glyph: u32, style: CellStyle, from: Point, to: Point) {
        let (x0, x1) = (from.x.min(to.x), from.x.max(to.x));
        let (y0, y1) = (from.y.min(to.y), from.y.max(to.y));
        for y in y0..=y1 {
            for x in x0..=x1 {
                self.set(glyph, style, Point::new(x, y));
            }
        }
    }

    /// Translate `rect`'s contents by `(-rightward, -downward)`; cells whose
    /// source position falls outside `rect` are replaced with `(glyph, style)`.
    /// `rect` is given in 0-based cell coordinates (as stored in `update_bounds`).
    pub fn scroll(&mut self, glyph: u32, style: CellStyle, rect: Rect, downward: i32, rightward: i32) {
        let bounds = rect.clip(&self.full_bounds());
        if !bounds.valid() {
            return;
        }

        if downward == 0 && rightward == 0 {
            return;
        }

        // Snapshot the source region first so we never read a value this same
        // scroll already overwrote, regardless of source/destination overlap.
        let mut snapshot = std::collections::HashMap::new();
        for y in bounds.y0..=bounds.y1 {
            for x in bounds.x0..=bounds.x1 {
                if let Some(idx) = self.index0(x, y) {
                    snapshot.insert((x, y), self.current[idx]);
                }
            }
        }

        for y in bounds.y0..=bounds.y1 {
            for x in bounds.x0..=bounds.x1 {
                let src = (x + rightward, y + downward);
                let new_cell = if bounds.contains_point(Point::new(src.0, src.1)) {
                    *snapshot.get(&src).unwrap()
                } else {
                    Cell {
                        glyph,
                        style,
                        cursor: false,
                        dirty: true,
                    }
                };
                if let Some(idx) = self.index0(x, y) {
                    if self.current[idx].glyph != new_cell.glyph || self.current[idx].style != new_cell.style {
                        self.current[idx].glyph = new_cell.glyph;
                        self.current[idx].style = new_cell.style;
                    }
                    self.current[idx].dirty = true;
                }
            }
        }

        self.pos_old = Point::new(self.pos_old.x - rightward, self.pos_old.y - downward);
        self.update_bounds = self.full_bounds();
    }

    /// Swap current and alternate buffers if `active` differs from the current
    /// state, marking every cell dirty.
    pub fn set_alternative_buffer_active(&mut self, active: bool) {
        if active == self.alternate_active {
            return;
        }
        std::mem::swap(&mut self.current, &mut self.alternate);
        self.alternate_active = active;
        for c in self.current.iter_mut() {
            c.dirty = true;
        }
        self.update_bounds = self.full_bounds();
    }

    fn set_cursor_bit(&mut self, pos: Point, value: bool) {
        if let Some(idx) = self.index_from_pos(pos) {
            if self.current[idx].cursor != value {
                self.current[idx].cursor = value;
                self.current[idx].dirty = true;
                self.update_bounds = self
                    .update_bounds
                    .grow_point(Point::new(pos.x - 1, pos.y - 1));
            }
        }
    }

    /// Materialize accumulated changes and emit a minimal diff of cells whose
    /// drawing-affecting attributes actually changed.
    pub fn commit(&mut self, updates: &mut Vec<CellUpdate>) {
        updates.clear();

        if self.cursor_visible_old {
            self.set_cursor_bit(self.pos_old, false);
        }
        if self.cursor_visible {
            self.set_cursor_bit(self.pos, true);
        }

        let bounds = self.update_bounds.clip(&self.full_bounds());
        if bounds.valid() {
            for y in bounds.y0..=bounds.y1 {
                for x in bounds.x0..=bounds.x1 {
                    let Some(idx) = self.index0(x, y) else { continue };
                    if !self.current[idx].dirty {
                        continue;
                    }
                    if needs_update(&self.current[idx], &self.old[idx]) {
                        updates.push(CellUpdate {
                            pos: Point::new(x + 1, y + 1),
                            current: self.current[idx],
                            old: self.old[idx],
                        });
                        self.old[idx] = self.current[idx];
                    }
                    self.current[idx].dirty = false;
                }
            }
        }

        self.pos_old = self.pos;
        self.cursor_visible_old = self.cursor_visible;
        self.update_bounds = Rect::invalid();
    }
}
