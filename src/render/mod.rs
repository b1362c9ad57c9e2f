//! Translates `Matrix::commit` output into e-paper-appropriate display writes.
//!
//! Grounded on `render.rs`'s `DirtyRegion`/`Renderer` (dirty-rect accumulation,
//! begin/end-frame bracketing), generalized from an ANSI terminal writer into a
//! two-pass (low-quality draft, high-quality promotion) e-paper compositor.

pub mod dither;

use crate::backend::{DisplayBackend, GlyphProvider};
use crate::color::{Palette, Rgba};
use crate::config::RendererConfig;
use crate::display::{DrawMode, Layer, MemoryDisplay};
use crate::display::merger::RectangleMerger;
use crate::epaper::{MaskOp, OutputOp, UpdateMode};
use crate::geometry::{Point, Rect};
use crate::matrix::{Cell, Matrix};

/// Per-cell bookkeeping the renderer maintains between draw passes, separate from
/// `matrix::Cell` (which the `Matrix` itself owns).
#[derive(Debug, Clone, Copy)]
pub struct RenderCell {
    /// Contents as of the last successful draw of this cell.
    pub cell: Cell,
    pub last_update_ms: u32,
    pub operation_counter: u32,
    pub low_quality: bool,
    pub high_quality: bool,
    pub overdue: bool,
    pub dirty: bool,
}

impl Default for RenderCell {
    fn default() -> Self {
        RenderCell {
            cell: Cell::default(),
            last_update_ms: 0,
            operation_counter: 0,
            low_quality: false,
            high_quality: false,
            overdue: false,
            dirty: true,
        }
    }
}

/// Drives a `Matrix` onto a `MemoryDisplay` using overdue-aware, two-pass
/// (draft-then-promote) redraw policy suited to e-paper waveform costs.
pub struct MatrixRenderer<B: DisplayBackend> {
    matrix: Matrix,
    display: MemoryDisplay<B>,
    metadata: Vec<RenderCell>,
    config: RendererConfig,
    palette: Palette,
    default_fg: Rgba,
    default_bg: Rgba,
    backend_w: i32,
    backend_h: i32,
    cell_w: i32,
    cell_h: i32,
    pad_x: i32,
    pad_y: i32,
    orientation: u8,
    geometry_dirty: bool,
    update_bounds: Rect,
    merger: RectangleMerger,
    redraw_timeout: u32,
    counter_threshold: u32,
    font_size: u32,
}

impl<B: DisplayBackend> MatrixRenderer<B> {
    pub fn new(display: MemoryDisplay<B>, config: RendererConfig) -> Self {
        let redraw_timeout = config.redraw_timeout_high_ms;
        let counter_threshold = config.counter_threshold_high;
        MatrixRenderer {
            matrix: Matrix::new(0, 0),
            display,
            metadata: Vec::new(),
            config,
            palette: Palette::ansi16(),
            default_fg: Rgba::WHITE,
            default_bg: Rgba::BLACK,
            backend_w: 0,
            backend_h: 0,
            cell_w: 1,
            cell_h: 1,
            pad_x: 0,
            pad_y: 0,
            orientation: 0,
            geometry_dirty: true,
            update_bounds: Rect::invalid(),
            merger: RectangleMerger::new(config.merge_waste_ratio),
            redraw_timeout,
            counter_threshold,
            font_size: 16,
        }
    }

    pub fn matrix(&mut self) -> &mut Matrix {
        &mut self.matrix
    }

    pub fn set_font_size(&mut self, size: u32) {
        if size != self.font_size {
            self.font_size = size;
            self.geometry_dirty = true;
        }
    }

    pub fn set_palette(&mut self, palette: Palette) {
        self.palette = palette;
    }

    pub fn set_default_colors(&mut self, fg: Rgba, bg: Rgba) {
        self.default_fg = fg;
        self.default_bg = bg;
    }

    /// Report a backend surface size change (e.g. from an `Event::Resize`). Marks
    /// geometry dirty if the size actually changed.
    pub fn set_backend_bounds(&mut self, w: i32, h: i32) {
        if w != self.backend_w || h != self.backend_h {
            self.backend_w = w;
            self.backend_h = h;
            self.geometry_dirty = true;
        }
    }

    /// `set_orientation(o)` (mod 4): if changed, blanks both layers across the
    /// current bounds and marks geometry dirty.
    pub fn set_orientation<G: GlyphProvider>(&mut self, orientation: u8, _glyphs: &G) {
        let orientation = orientation % 4;
        if orientation == self.orientation {
            return;
        }
        self.orientation = orientation;
        let bounds = Rect::from_size(0, 0, self.backend_w, self.backend_h);
        if bounds.valid() {
            self.display.fill(Layer::Background, Rgba::BLACK, bounds);
            self.display.fill(Layer::Presentation, Rgba::TRANSPARENT, bounds);
        }
        self.geometry_dirty = true;
    }

    fn handle_geometry_change<G: GlyphProvider>(&mut self, glyphs: &G) {
        if !self.geometry_dirty {
            return;
        }
        self.geometry_dirty = false;

        let metrics = glyphs.metrics(self.font_size);
        self.cell_w = metrics.cell_w.max(1);
        self.cell_h = metrics.cell_h.max(1);

        let (eff_w, eff_h) = if self.orientation % 2 == 1 {
            (self.backend_h, self.backend_w)
        } else {
            (self.backend_w, self.backend_h)
        };

        let cols = (eff_w / self.cell_w).max(0);
        let rows = (eff_h / self.cell_h).max(0);
        self.pad_x = (eff_w - cols * self.cell_w) / 2;
        self.pad_y = (eff_h - rows * self.cell_h) / 2;

        log::debug!(
            "geometry recomputed: {cols}x{rows} cells, cell {}x{}, pad ({}, {})",
            self.cell_w, self.cell_h, self.pad_x, self.pad_y
        );
        self.matrix.resize(cols, rows);
        self.metadata = vec![RenderCell::default(); (cols * rows) as usize];
        self.update_bounds = Rect::invalid();
    }

    /// Pixel rectangle of cell `(col, row)` (0-based) in backend display
    /// coordinates, accounting for orientation (axis swap for odd orientations,
    /// mirrored origin for 2, 3).
    fn cell_rect(&self, col: i32, row: i32) -> Rect {
        let cols = self.matrix.cols();
        let rows = self.matrix.rows();
        let (x0, y0, w, h) = match self.orientation {
            0 => (
                self.pad_x + col * self.cell_w,
                self.pad_y + row * self.cell_h,
                self.cell_w,
                self.cell_h,
            ),
            1 => (
                self.pad_x + row * self.cell_h,
                self.pad_y + (cols - 1 - col) * self.cell_w,
                self.cell_h,
                self.cell_w,
            ),
            2 => (
                self.pad_x + (cols - 1 - col) * self.cell_w,
                self.pad_y + (rows - 1 - row) * self.cell_h,
                self.cell_w,
                self.cell_h,
            ),
            _ => (
                self.pad_x + (rows - 1 - row) * self.cell_h,
                self.pad_y + col * self.cell_w,
                self.cell_h,
                self.cell_w,
            ),
        };
        Rect::from_size(x0, y0, w, h)
    }

    fn resolve_colors(&self, cell: &Cell) -> (Rgba, Rgba) {
        let fg = if cell.style.default_fg {
            self.default_fg
        } else {
            let mut c = cell.style.fg;
            if self.config.bright_on_bold && cell.style.bold {
                c = c.brighten();
            }
            c.resolve(&self.palette)
        };
        let bg = if cell.style.default_bg {
            self.default_bg
        } else {
            cell.style.bg.resolve(&self.palette)
        };
        if cell.cursor ^ cell.style.inverse {
            (bg, fg)
        } else {
            (fg, bg)
        }
    }

    /// Draw (or erase) one cell. Returns the union of every pixel rect touched.
    fn draw_cell<G: GlyphProvider>(
        &mut self,
        glyphs: &G,
        col: i32,
        row: i32,
        cell: &Cell,
        erase: bool,
        low_quality: bool,
    ) -> Rect {
        let rect = self.cell_rect(col, row);
        let (fg, bg) = self.resolve_colors(cell);
        let mode = if erase { DrawMode::Erase } else { DrawMode::Write };
        let mut union = Rect::invalid();

        if low_quality {
            let g_bg = bg.to_grayscale4();
            if !erase {
                self.display.fill_dither(Layer::Background, g_bg, rect);
            }
            union = union.grow(&rect);

            if let Some(bitmap) = glyphs.render(cell.glyph, self.font_size, true, self.orientation) {
                let glyph_rect = Rect::from_size(
                    rect.x0 + bitmap.origin_x,
                    rect.y0 + bitmap.origin_y,
                    bitmap.width,
                    bitmap.height,
                );
                let snapped_fg = if g_bg >= 8 { Rgba::BLACK } else { Rgba::WHITE };
                self.display.blit(
                    Layer::Presentation,
                    snapped_fg,
                    &bitmap.alpha,
                    bitmap.stride,
                    glyph_rect,
                    mode,
                );
                union = union.grow(&glyph_rect);

                if !erase && (4..=11).contains(&g_bg) {
                    let shadow_rect = glyph_rect.translate(Point::new(1, 1));
                    self.display.blit(
                        Layer::Presentation,
                        !snapped_fg,
                        &bitmap.alpha,
                        bitmap.stride,
                        shadow_rect,
                        DrawMode::Write,
                    );
                    union = union.grow(&shadow_rect);
                }
            }
        } else {
            if !erase {
                self.display.fill(Layer::Background, bg, rect);
            }
            union = union.grow(&rect);

            if let Some(bitmap) = glyphs.render(cell.glyph, self.font_size, false, self.orientation) {
                let glyph_rect = Rect::from_size(
                    rect.x0 + bitmap.origin_x,
                    rect.y0 + bitmap.origin_y,
                    bitmap.width,
                    bitmap.height,
                );
                self.display.blit(
                    Layer::Presentation,
                    fg,
                    &bitmap.alpha,
                    bitmap.stride,
                    glyph_rect,
                    mode,
                );
                union = union.grow(&glyph_rect);
            }
        }

        union
    }

    fn metadata_index(&self, col: i32, row: i32) -> Option<usize> {
        let cols = self.matrix.cols();
        let rows = self.matrix.rows();
        if col < 0 || row < 0 || col >= cols || row >= rows {
            None
        } else {
            Some((row * cols + col) as usize)
        }
    }

    /// Run one draw pass: ingest matrix commits, tighten overdue thresholds as
    /// needed, then draft (Pass A) and promote (Pass B) dirty/overdue cells.
    pub fn draw<G: GlyphProvider>(&mut self, glyphs: &G, redraw: bool, dt_ms: u32) {
        self.handle_geometry_change(glyphs);

        if redraw {
            for m in self.metadata.iter_mut() {
                *m = RenderCell::default();
            }
            self.update_bounds = Rect::from_size(0, 0, self.matrix.cols(), self.matrix.rows());
        }

        for m in self.metadata.iter_mut() {
            m.last_update_ms = m.last_update_ms.saturating_add(dt_ms);
        }

        let mut updates = Vec::new();
        self.matrix.commit(&mut updates);
        for update in &updates {
            let col0 = update.pos.x - 1;
            let row0 = update.pos.y - 1;
            if let Some(idx) = self.metadata_index(col0, row0) {
                self.metadata[idx].dirty = true;
                self.update_bounds = self.update_bounds.grow_point(Point::new(col0, row0));
            }
        }

        self.redraw_timeout = self.config.redraw_timeout_high_ms;
        self.counter_threshold = self.config.counter_threshold_high;
        for m in self.metadata.iter() {
            if m.operation_counter > self.config.counter_threshold_high {
                self.counter_threshold = self.config.counter_threshold_low;
            }
            if m.low_quality && m.last_update_ms > self.config.redraw_timeout_high_ms {
                self.redraw_timeout = self.config.redraw_timeout_low_ms;
            }
        }
        if self.counter_threshold == self.config.counter_threshold_low
            || self.redraw_timeout == self.config.redraw_timeout_low_ms
        {
            log::debug!(
                "tightening overdue thresholds: counter={} timeout_ms={}",
                self.counter_threshold,
                self.redraw_timeout
            );
        }
        for m in self.metadata.iter_mut() {
            m.overdue = m.operation_counter >= self.counter_threshold
                || (m.low_quality && m.last_update_ms >= self.redraw_timeout);
        }

        if !self.update_bounds.valid() {
            return;
        }

        for m in self.metadata.iter_mut() {
            m.operation_counter = m.operation_counter.saturating_add(1);
        }

        self.display.lock();

        let bounds = self.update_bounds;

        self.merger.clear();
        for row in bounds.y0..=bounds.y1 {
            for col in bounds.x0..=bounds.x1 {
                let Some(idx) = self.metadata_index(col, row) else {
                    continue;
                };
                if !self.metadata[idx].dirty {
                    continue;
                }
                let old_cell = self.metadata[idx].cell;
                let old_low_quality = self.metadata[idx].low_quality;
                let mut union = self.draw_cell(glyphs, col, row, &old_cell, true, old_low_quality);

                let current_cell = *self
                    .matrix
                    .cell_at(col, row)
                    .unwrap_or(&Cell::default());
                union = union.grow(&self.draw_cell(glyphs, col, row, &current_cell, false, true));

                self.merger.insert(union);

                let m = &mut self.metadata[idx];
                m.cell = current_cell;
                m.last_update_ms = 0;
                m.operation_counter = 0;
                m.low_quality = true;
                m.high_quality = false;
                m.dirty = false;
                m.overdue = false;
            }
        }
        self.merger.merge();
        for rect in self.merger.iter().copied().collect::<Vec<_>>() {
            self.display.commit(
                rect,
                UpdateMode::new(OutputOp::Identity, MaskOp::SourceMono),
            );
        }

        self.merger.clear();
        for row in bounds.y0..=bounds.y1 {
            let overdue_cols: Vec<i32> = (bounds.x0..=bounds.x1)
                .filter(|&c| {
                    self.metadata_index(c, row)
                        .map(|i| self.metadata[i].overdue)
                        .unwrap_or(false)
                })
                .collect();
            for col in overdue_cols {
                let Some(idx) = self.metadata_index(col, row) else {
                    continue;
                };
                let old_cell = self.metadata[idx].cell;
                let mut union = self.draw_cell(glyphs, col, row, &old_cell, true, true);

                let current_cell = self.metadata[idx].cell;
                union = union.grow(&self.draw_cell(glyphs, col, row, &current_cell, false, false));

                self.merger.insert(union);

                let m = &mut self.metadata[idx];
                m.last_update_ms = 0;
                m.operation_counter = 0;
                m.low_quality = false;
                m.high_quality = true;
                m.overdue = false;
                m.dirty = false;
            }
        }
        self.merger.merge();
        for rect in self.merger.iter().copied().collect::<Vec<_>>() {
            self.display
                .commit(rect, UpdateMode::new(OutputOp::Identity, MaskOp::Partial));
        }

        self.display.unlock();
        self.update_bounds = Rect::invalid();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{CommitRequest, GlyphBitmap, GlyphMetrics};
    use crate::error::DisplayError;

    struct FakeBackend {
        rect: Rect,
    }

    impl DisplayBackend for FakeBackend {
        fn do_lock(&mut self) -> Result<Rect, DisplayError> {
            Ok(self.rect)
        }

        fn do_unlock(
            &mut self,
            _requests: &[CommitRequest],
            _composite: &[u8],
            _stride: usize,
        ) -> Result<(), DisplayError> {
            Ok(())
        }
    }

    struct FakeGlyphs;

    impl GlyphProvider for FakeGlyphs {
        fn metrics(&self, _size: u32) -> GlyphMetrics {
            GlyphMetrics {
                cell_w: 8,
                cell_h: 16,
                origin_y: 12,
            }
        }

        fn render(&self, codepoint: u32, _size: u32, _mono: bool, _orientation: u8) -> Option<GlyphBitmap> {
            if codepoint == 0 || codepoint == 0x20 {
                return None;
            }
            Some(GlyphBitmap {
                alpha: vec![255; 8 * 16],
                stride: 8,
                width: 8,
                height: 16,
                origin_x: 0,
                origin_y: 0,
            })
        }
    }

    fn new_renderer() -> MatrixRenderer<FakeBackend> {
        let backend = FakeBackend {
            rect: Rect::from_size(0, 0, 80, 160),
        };
        let display = MemoryDisplay::new(backend);
        MatrixRenderer::new(display, RendererConfig::default())
    }

    #[test]
    fn first_draw_establishes_geometry() {
        let mut r = new_renderer();
        r.set_backend_bounds(80, 160);
        r.draw(&FakeGlyphs, true, 0);
        assert_eq!(r.matrix.cols(), 10);
        assert_eq!(r.matrix.rows(), 10);
    }

    #[test]
    fn empty_matrix_draw_does_not_panic_without_geometry() {
        let mut r = new_renderer();
        r.draw(&FakeGlyphs, false, 16);
    }

    #[test]
    fn writing_a_glyph_then_drawing_clears_update_bounds() {
        let mut r = new_renderer();
        r.set_backend_bounds(80, 160);
        r.draw(&FakeGlyphs, true, 0);
        r.matrix().write('A' as u32, crate::style::CellStyle::default(), false);
        r.draw(&FakeGlyphs, false, 16);
        assert!(!r.update_bounds.valid());
    }

    #[test]
    fn dirty_cell_is_not_redrawn_once_clean_even_if_a_later_bounds_encloses_it() {
        let mut r = new_renderer();
        r.set_backend_bounds(80, 160);
        r.draw(&FakeGlyphs, true, 0);
        let style = crate::style::CellStyle::default();

        r.matrix().move_abs(5, 5);
        r.matrix().write('A' as u32, style, false);
        r.draw(&FakeGlyphs, false, 16);

        let idx = r.metadata_index(4, 4).unwrap();
        assert!(!r.metadata[idx].dirty, "cell should be clean right after its own draw");

        // Two unrelated edits whose bounding box encloses the cell above without
        // touching it again; it must stay clean rather than get redrawn for free.
        r.matrix().move_abs(2, 2);
        r.matrix().write('B' as u32, style, false);
        r.matrix().move_abs(8, 8);
        r.matrix().write('C' as u32, style, false);
        r.draw(&FakeGlyphs, false, 16);

        assert!(!r.metadata[idx].dirty, "cell must not be marked dirty by an enclosing bounds rect");
    }

    #[test]
    fn orientation_change_marks_geometry_dirty() {
        let mut r = new_renderer();
        r.set_backend_bounds(80, 160);
        r.draw(&FakeGlyphs, true, 0);
        r.set_orientation(1, &FakeGlyphs);
        assert!(r.geometry_dirty);
    }
}
