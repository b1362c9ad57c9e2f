//! The logical matrix cell and the update record `Matrix::commit` emits.

use crate::geometry::Point;
use crate::style::{CellStyle, Underline};

/// One character position in the terminal grid.
///
/// `glyph` is a Unicode scalar value; `0` means "empty". `cursor` marks this cell as
/// the current cursor position, maintained only by `Matrix::commit` (not by `set`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub glyph: u32,
    pub style: CellStyle,
    pub cursor: bool,
    pub dirty: bool,
}

impl Default for Cell {
    fn default() -> Self {
        Cell {
            glyph: 0,
            style: CellStyle::default(),
            cursor: false,
            dirty: true,
        }
    }
}

const SPACE: u32 = 0x20;

impl Cell {
    /// "Foreground-visible": whether this cell's glyph/fg comparison is meaningful.
    /// A cell with no strikethrough/underline and an empty or space glyph has no
    /// visible ink regardless of its foreground color.
    pub fn fg_visible(&self) -> bool {
        let glyph_invisible = self.glyph == 0 || self.glyph == SPACE;
        let no_decoration = self.style.underline == Underline::None && !self.style.strikethrough;
        !(self.style.concealed || (no_decoration && glyph_invisible))
    }

    /// The color that is actually drawn as ink, accounting for `inverse`.
    pub fn effective_fg(&self) -> crate::color::Color {
        if self.style.inverse {
            self.style.bg
        } else {
            self.style.fg
        }
    }

    /// The color that is actually drawn as the cell background, accounting for
    /// `inverse`.
    pub fn effective_bg(&self) -> crate::color::Color {
        if self.style.inverse {
            self.style.fg
        } else {
            self.style.bg
        }
    }
}

/// One materially-changed cell reported by `Matrix::commit`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellUpdate {
    /// 1-based `(col, row)` position, matching the external addressing contract.
    pub pos: Point,
    pub current: Cell,
    pub old: Cell,
}

/// The central optimization in `Matrix::commit`: decide whether a cell's contents
/// changed in a way that actually affects what is drawn.
pub fn needs_update(current: &Cell, old: &Cell) -> bool {
    if !current.dirty {
        return false;
    }

    let cur_cursor_inverse = current.cursor ^ current.style.inverse;
    let old_cursor_inverse = old.cursor ^ old.style.inverse;
    if cur_cursor_inverse != old_cursor_inverse {
        return true;
    }

    if current.fg_visible() || old.fg_visible() {
        if current.glyph != old.glyph {
            return true;
        }
        if current.effective_fg() != old.effective_fg() {
            return true;
        }
        if current.style.attr_bits() != old.style.attr_bits() {
            return true;
        }
    }

    if current.effective_bg() != old.effective_bg() {
        return true;
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;

    #[test]
    fn identical_cells_need_no_update() {
        let c = Cell {
            dirty: true,
            ..Default::default()
        };
        assert!(!needs_update(&c, &c));
    }

    #[test]
    fn not_dirty_short_circuits() {
        let mut c = Cell::default();
        c.dirty = false;
        c.glyph = 'x' as u32;
        let old = Cell::default();
        assert!(!needs_update(&c, &old));
    }

    #[test]
    fn cursor_toggle_triggers_update() {
        let old = Cell {
            dirty: true,
            cursor: false,
            ..Default::default()
        };
        let cur = Cell {
            dirty: true,
            cursor: true,
            ..Default::default()
        };
        assert!(needs_update(&cur, &old));
    }

    #[test]
    fn whitespace_color_change_is_invisible() {
        let old = Cell {
            dirty: true,
            glyph: SPACE,
            style: CellStyle::new().fg(Color::Indexed(1)),
            ..Default::default()
        };
        let cur = Cell {
            dirty: true,
            glyph: SPACE,
            style: CellStyle::new().fg(Color::Indexed(2)),
            ..Default::default()
        };
        // Same bg (default), differing invisible fg on blank glyphs: no update.
        assert!(!needs_update(&cur, &old));
    }

    #[test]
    fn bg_change_on_blank_cell_is_visible() {
        let old = Cell {
            dirty: true,
            glyph: SPACE,
            style: CellStyle::new().bg(Color::Indexed(1)),
            ..Default::default()
        };
        let cur = Cell {
            dirty: true,
            glyph: SPACE,
            style: CellStyle::new().bg(Color::Indexed(2)),
            ..Default::default()
        };
        assert!(needs_update(&cur, &old));
    }

    #[test]
    fn glyph_change_with_visible_fg_triggers_update() {
        let old = Cell {
            dirty: true,
            glyph: 'a' as u32,
            ..Default::default()
        };
        let cur = Cell {
            dirty: true,
            glyph: 'b' as u32,
            ..Default::default()
        };
        assert!(needs_update(&cur, &old));
    }
}
