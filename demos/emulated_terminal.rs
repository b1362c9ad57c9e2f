//! Drives a `MatrixRenderer` against an in-memory emulated e-paper surface: no
//! real font or hardware, just enough to exercise the draft/promote draw cycle.

use anyhow::Result;
use epaper_term::{
    CellStyle, CommitRequest, DisplayBackend, DisplayError, GlyphBitmap, GlyphMetrics,
    GlyphProvider, MatrixRenderer, MemoryDisplay, Rect, RendererConfig,
};

struct EmulatedBackend {
    width: i32,
    height: i32,
    frames_written: u32,
}

impl DisplayBackend for EmulatedBackend {
    fn do_lock(&mut self) -> Result<Rect, DisplayError> {
        Ok(Rect::from_size(0, 0, self.width, self.height))
    }

    fn do_unlock(
        &mut self,
        requests: &[CommitRequest],
        _composite: &[u8],
        _stride: usize,
    ) -> Result<(), DisplayError> {
        self.frames_written += 1;
        eprintln!(
            "frame {}: {} region(s) committed",
            self.frames_written,
            requests.len()
        );
        Ok(())
    }
}

/// A fixed-width box glyph provider: every printable codepoint renders as a solid
/// block, enough to see the draft/promote passes move pixels around.
struct BoxFont;

impl GlyphProvider for BoxFont {
    fn metrics(&self, _size: u32) -> GlyphMetrics {
        GlyphMetrics {
            cell_w: 10,
            cell_h: 18,
            origin_y: 14,
        }
    }

    fn render(&self, codepoint: u32, _size: u32, _mono: bool, _orientation: u8) -> Option<GlyphBitmap> {
        if codepoint == 0 || codepoint == 0x20 {
            return None;
        }
        Some(GlyphBitmap {
            alpha: vec![255; 10 * 18],
            stride: 10,
            width: 10,
            height: 18,
            origin_x: 0,
            origin_y: 0,
        })
    }
}

fn main() {
    let backend = EmulatedBackend {
        width: 800,
        height: 480,
        frames_written: 0,
    };
    let display = MemoryDisplay::new(backend);
    let mut renderer = MatrixRenderer::new(display, RendererConfig::default());
    renderer.set_backend_bounds(800, 480);

    let fonts = BoxFont;
    renderer.draw(&fonts, true, 0);

    let style = CellStyle::default();
    for ch in "hello e-paper".chars() {
        renderer.matrix().write(ch as u32, style, false);
    }
    renderer.draw(&fonts, false, 16);
}
