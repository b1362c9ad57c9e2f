//! Color model: tagged indexed/RGB colors, a dense palette, and the backend
//! pixel-layout descriptor used when packing composited pixels for a display.

/// 8-8-8-8 RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba { r: 0, g: 0, b: 0, a: 0 };
    pub const BLACK: Rgba = Rgba { r: 0, g: 0, b: 0, a: 255 };
    pub const WHITE: Rgba = Rgba { r: 255, g: 255, b: 255, a: 255 };

    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Rgba { r, g, b, a }
    }

    pub fn opaque(r: u8, g: u8, b: u8) -> Self {
        Rgba::new(r, g, b, 255)
    }

    /// Multiply each color channel by the alpha channel (alpha unchanged).
    pub fn premultiply_alpha(&self) -> Rgba {
        let a = self.a as u32;
        Rgba::new(
            ((self.r as u32 * a) / 255) as u8,
            ((self.g as u32 * a) / 255) as u8,
            ((self.b as u32 * a) / 255) as u8,
            self.a,
        )
    }

    /// 4-bit grayscale using the luminance weights from the e-paper pipeline:
    /// `(77*r + 151*g + 28*b) >> 12`.
    pub fn to_grayscale4(&self) -> u8 {
        (((77u32 * self.r as u32) + (151 * self.g as u32) + (28 * self.b as u32)) >> 12) as u8
    }
}

impl std::ops::Not for Rgba {
    type Output = Rgba;
    fn not(self) -> Rgba {
        Rgba::new(!self.r, !self.g, !self.b, self.a)
    }
}

/// A logical cell color: either a palette index or a direct RGB value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Indexed(u8),
    Rgb(Rgba),
}

impl Color {
    /// Resolve this color to an opaque `Rgba` using `palette` for indexed colors.
    pub fn resolve(&self, palette: &Palette) -> Rgba {
        match self {
            Color::Rgb(rgba) => *rgba,
            Color::Indexed(idx) => palette.get(*idx),
        }
    }

    /// Shift an indexed color into the bright half (`+8`), used by the
    /// "bright-on-bold" renderer option. RGB colors are returned unchanged,
    /// per the spec's resolved Open Question.
    pub fn brighten(&self) -> Color {
        match self {
            Color::Indexed(idx) if *idx < 8 => Color::Indexed(idx + 8),
            other => *other,
        }
    }
}

/// A dense palette of up to 256 RGBA entries. Out-of-range indices resolve to black.
#[derive(Debug, Clone)]
pub struct Palette {
    entries: Vec<Rgba>,
}

impl Palette {
    pub fn new(entries: Vec<Rgba>) -> Self {
        Palette { entries }
    }

    /// The classic 16-color ANSI ramp, used as a sensible default palette.
    pub fn ansi16() -> Self {
        const RAMP: [(u8, u8, u8); 16] = [
            (0, 0, 0),
            (170, 0, 0),
            (0, 170, 0),
            (170, 85, 0),
            (0, 0, 170),
            (170, 0, 170),
            (0, 170, 170),
            (170, 170, 170),
            (85, 85, 85),
            (255, 85, 85),
            (85, 255, 85),
            (255, 255, 85),
            (85, 85, 255),
            (255, 85, 255),
            (85, 255, 255),
            (255, 255, 255),
        ];
        Palette::new(RAMP.iter().map(|(r, g, b)| Rgba::opaque(*r, *g, *b)).collect())
    }

    pub fn get(&self, index: u8) -> Rgba {
        self.entries
            .get(index as usize)
            .copied()
            .unwrap_or(Rgba::BLACK)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Describes how a display backend packs pixels: bit depth plus per-channel
/// shift/mask, used when a hardware backend needs something other than raw
/// 8-8-8-8 RGBA (e.g. RGB565 framebuffers).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorLayout {
    pub bits_per_pixel: u8,
    pub red_shift: u8,
    pub red_mask: u32,
    pub green_shift: u8,
    pub green_mask: u32,
    pub blue_shift: u8,
    pub blue_mask: u32,
    pub alpha_shift: u8,
    pub alpha_mask: u32,
}

impl ColorLayout {
    /// Standard packed 32-bpp RGBA layout (used by `MemoryDisplay`'s composite buffer).
    pub const RGBA8888: ColorLayout = ColorLayout {
        bits_per_pixel: 32,
        red_shift: 0,
        red_mask: 0xFF,
        green_shift: 8,
        green_mask: 0xFF,
        blue_shift: 16,
        blue_mask: 0xFF,
        alpha_shift: 24,
        alpha_mask: 0xFF,
    };

    /// Pack an `Rgba` value into a single integer following this layout.
    pub fn pack(&self, color: Rgba) -> u32 {
        ((color.r as u32 & self.red_mask) << self.red_shift)
            | ((color.g as u32 & self.green_mask) << self.green_shift)
            | ((color.b as u32 & self.blue_mask) << self.blue_shift)
            | ((color.a as u32 & self.alpha_mask) << self.alpha_shift)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn premultiply_scales_rgb_by_alpha() {
        let c = Rgba::new(200, 100, 50, 128);
        let p = c.premultiply_alpha();
        assert_eq!(p.a, 128);
        assert_eq!(p.r, (200u32 * 128 / 255) as u8);
    }

    #[test]
    fn bitwise_not_inverts_rgb_not_alpha() {
        let c = Rgba::new(0, 255, 10, 200);
        let inv = !c;
        assert_eq!(inv.r, 255);
        assert_eq!(inv.g, 0);
        assert_eq!(inv.b, 245);
        assert_eq!(inv.a, 200);
    }

    #[test]
    fn palette_out_of_range_is_black() {
        let pal = Palette::new(vec![Rgba::WHITE]);
        assert_eq!(pal.get(0), Rgba::WHITE);
        assert_eq!(pal.get(5), Rgba::BLACK);
    }

    #[test]
    fn indexed_color_resolves_via_palette() {
        let pal = Palette::ansi16();
        let c = Color::Indexed(1);
        assert_eq!(c.resolve(&pal), Rgba::opaque(170, 0, 0));
    }

    #[test]
    fn brighten_only_affects_low_indexed() {
        assert_eq!(Color::Indexed(3).brighten(), Color::Indexed(11));
        assert_eq!(Color::Indexed(12).brighten(), Color::Indexed(12));
        let rgb = Color::Rgb(Rgba::opaque(1, 2, 3));
        assert_eq!(rgb.brighten(), rgb);
    }

    #[test]
    fn grayscale_extremes() {
        assert_eq!(Rgba::BLACK.to_grayscale4(), 0);
        assert_eq!(Rgba::WHITE.to_grayscale4(), 15);
    }

    #[test]
    fn color_layout_packs_rgba8888() {
        let packed = ColorLayout::RGBA8888.pack(Rgba::new(0x11, 0x22, 0x33, 0x44));
        assert_eq!(packed, 0x4433_2211);
    }
}
