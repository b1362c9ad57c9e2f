//! Per-cell style: colors plus the attribute bits that affect how a cell is drawn.

use crate::color::Color;

/// Underline weight. `0/1/2` in the source material map to `None/Single/Double`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Underline {
    #[default]
    None,
    Single,
    Double,
}

/// The full set of drawing-affecting attributes for one matrix cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellStyle {
    pub fg: Color,
    pub bg: Color,
    pub default_fg: bool,
    pub default_bg: bool,
    pub bold: bool,
    pub italic: bool,
    pub underline: Underline,
    pub strikethrough: bool,
    pub inverse: bool,
    pub concealed: bool,
}

impl Default for CellStyle {
    fn default() -> Self {
        CellStyle {
            fg: Color::Indexed(7),
            bg: Color::Indexed(0),
            default_fg: true,
            default_bg: true,
            bold: false,
            italic: false,
            underline: Underline::None,
            strikethrough: false,
            inverse: false,
            concealed: false,
        }
    }
}

impl CellStyle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fg(mut self, fg: Color) -> Self {
        self.fg = fg;
        self.default_fg = false;
        self
    }

    pub fn bg(mut self, bg: Color) -> Self {
        self.bg = bg;
        self.default_bg = false;
        self
    }

    pub fn bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }

    pub fn italic(mut self, italic: bool) -> Self {
        self.italic = italic;
        self
    }

    pub fn underline(mut self, underline: Underline) -> Self {
        self.underline = underline;
        self
    }

    pub fn strikethrough(mut self, strikethrough: bool) -> Self {
        self.strikethrough = strikethrough;
        self
    }

    pub fn inverse(mut self, inverse: bool) -> Self {
        self.inverse = inverse;
        self
    }

    pub fn concealed(mut self, concealed: bool) -> Self {
        self.concealed = concealed;
        self
    }

    /// Attribute bits relevant to `Matrix::needs_update`'s foreground comparison,
    /// excluding glyph/color which are compared separately.
    pub fn attr_bits(&self) -> (bool, bool, bool, Underline) {
        (self.bold, self.italic, self.strikethrough, self.underline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_style_uses_configured_defaults() {
        let s = CellStyle::default();
        assert!(s.default_fg);
        assert!(s.default_bg);
        assert!(!s.bold);
    }

    #[test]
    fn setting_fg_clears_default_flag() {
        let s = CellStyle::new().fg(Color::Indexed(2));
        assert!(!s.default_fg);
        assert_eq!(s.fg, Color::Indexed(2));
    }

    #[test]
    fn builder_chain_sets_all_attributes() {
        let s = CellStyle::new()
            .bold(true)
            .italic(true)
            .underline(Underline::Double)
            .strikethrough(true)
            .inverse(true)
            .concealed(true);
        assert!(s.bold && s.italic && s.strikethrough && s.inverse && s.concealed);
        assert_eq!(s.underline, Underline::Double);
    }
}
