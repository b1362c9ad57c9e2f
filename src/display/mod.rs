//! Layered, scoped-lock drawing surface with deferred batched commit.
//!
//! Grounded on the teacher's `graphics/framebuffer.rs` raw pixel-buffer write path
//! plus `render.rs`'s dirty-region bookkeeping, generalized into a two-layer
//! (background/presentation) compositor that defers hardware writes until unlock.

pub mod merger;

use std::sync::{Condvar, Mutex};

use crate::backend::{CommitRequest, DisplayBackend};
use crate::color::Rgba;
use crate::epaper::UpdateMode;
use crate::geometry::{Point, Rect};
use crate::render::dither;

/// Nesting counter plus an in-flight-commit flag, guarded together so a lock
/// acquired while a prior unlock's batch is still being flushed blocks on the
/// condvar instead of racing it.
struct LockState {
    count: u32,
    committing: bool,
}

/// Which of the two pixel layers an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Background,
    Presentation,
}

/// Whether a `blit` writes pixels or clears them back to transparent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawMode {
    Write,
    Erase,
}

fn padded_stride(width: i32) -> usize {
    let bytes = width.max(0) as usize * 4;
    bytes.div_ceil(16) * 16
}

/// Two stacked RGBA layers (opaque background, alpha-blended presentation) plus
/// the composite buffer handed to a `DisplayBackend` on unlock.
pub struct MemoryDisplay<B: DisplayBackend> {
    backend: B,
    width: i32,
    height: i32,
    stride: usize,
    background: Vec<u8>,
    presentation: Vec<u8>,
    composite: Vec<u8>,
    queue: Vec<CommitRequest>,
    lock_state: Mutex<LockState>,
    lock_cond: Condvar,
    origin: Point,
    surface: Rect,
}

impl<B: DisplayBackend> MemoryDisplay<B> {
    pub fn new(backend: B) -> Self {
        MemoryDisplay {
            backend,
            width: 0,
            height: 0,
            stride: 0,
            background: Vec::new(),
            presentation: Vec::new(),
            composite: Vec::new(),
            queue: Vec::new(),
            lock_state: Mutex::new(LockState {
                count: 0,
                committing: false,
            }),
            lock_cond: Condvar::new(),
            origin: Point::default(),
            surface: Rect::invalid(),
        }
    }

    fn resize_if_needed(&mut self, display_rect: Rect) {
        let w = display_rect.width();
        let h = display_rect.height();
        if w == self.width && h == self.height {
            return;
        }
        self.width = w;
        self.height = h;
        self.stride = padded_stride(w);
        let len = self.stride * h.max(0) as usize;
        self.background = vec![0u8; len];
        self.presentation = vec![0u8; len];
        self.composite = vec![0u8; len];
    }

    /// Acquire the surface, returning it in local `(0,0)`-origin coordinates. On a
    /// 0→1 counter transition this calls the backend's `do_lock` hook; nested
    /// calls from an already-locked owner just bump the counter. Blocks on the
    /// condvar if a prior unlock's batch is still being flushed. Callers must pair
    /// every `lock()` with exactly one `unlock()`.
    pub fn lock(&mut self) -> Rect {
        let mut state = self.lock_state.lock().unwrap();
        while state.committing {
            state = self.lock_cond.wait(state).unwrap();
        }
        let first = state.count == 0;
        state.count += 1;
        drop(state);

        if first {
            match self.backend.do_lock() {
                Ok(rect) => {
                    self.origin = Point::new(rect.x0, rect.y0);
                    self.resize_if_needed(rect);
                    self.surface = Rect::from_size(0, 0, self.width, self.height);
                }
                Err(err) => {
                    log::warn!("display lock failed, degrading to empty surface: {err}");
                    self.surface = Rect::invalid();
                }
            }
        }
        self.surface
    }

    /// Release one nesting level. On a 1→0 transition, composes every queued
    /// commit rect, translates it back to display coordinates, and calls
    /// `do_unlock` exactly once with the whole batch, marking the state as
    /// committing for the duration so a concurrent `lock()` waits for it.
    pub fn unlock(&mut self) {
        let mut state = self.lock_state.lock().unwrap();
        if state.count == 0 {
            return;
        }
        state.count -= 1;
        let last = state.count == 0;
        if last {
            state.committing = true;
        }
        drop(state);

        if !last {
            return;
        }

        if !self.queue.is_empty() {
            for req in &self.queue {
                compose_rect(
                    req.rect,
                    self.width,
                    self.height,
                    self.stride,
                    &self.background,
                    &self.presentation,
                    &mut self.composite,
                );
            }
            let display_requests: Vec<CommitRequest> = self
                .queue
                .iter()
                .map(|r| CommitRequest {
                    rect: r.rect.translate(self.origin),
                    mode: r.mode,
                })
                .collect();
            if let Err(err) = self
                .backend
                .do_unlock(&display_requests, &self.composite, self.stride)
            {
                log::warn!("display unlock failed: {err}");
            }
            self.queue.clear();
        }

        self.lock_state.lock().unwrap().committing = false;
        self.lock_cond.notify_all();
    }

    /// Enqueue a commit for `rect` (clipped to the surface; an empty rect becomes
    /// the full surface) with the given waveform/mask hint. Valid only while
    /// locked.
    pub fn commit(&mut self, rect: Rect, mode: UpdateMode) {
        let clipped = if rect.valid() {
            rect.clip(&self.surface)
        } else {
            self.surface
        };
        if !clipped.valid() {
            return;
        }
        self.queue.push(CommitRequest {
            rect: clipped,
            mode,
        });
    }

    fn layer_mut(&mut self, layer: Layer) -> &mut Vec<u8> {
        match layer {
            Layer::Background => &mut self.background,
            Layer::Presentation => &mut self.presentation,
        }
    }

    fn pixel_offset(&self, x: i32, y: i32) -> usize {
        y as usize * self.stride + x as usize * 4
    }

    pub fn fill(&mut self, layer: Layer, rgba: Rgba, rect: Rect) {
        let clipped = rect.clip(&self.surface);
        if !clipped.valid() {
            return;
        }
        let premultiplied = rgba.premultiply_alpha();
        let stride = self.stride;
        let buf = self.layer_mut(layer);
        for y in clipped.y0..=clipped.y1 {
            for x in clipped.x0..=clipped.x1 {
                let off = y as usize * stride + x as usize * 4;
                buf[off] = premultiplied.r;
                buf[off + 1] = premultiplied.g;
                buf[off + 2] = premultiplied.b;
                buf[off + 3] = premultiplied.a;
            }
        }
    }

    /// Fill with an ordered-dithering binary black/white pattern approximating
    /// 4-bit grayscale level `g` (`0..=15`).
    pub fn fill_dither(&mut self, layer: Layer, g: u8, rect: Rect) {
        let clipped = rect.clip(&self.surface);
        if !clipped.valid() {
            return;
        }
        let stride = self.stride;
        let buf = self.layer_mut(layer);
        for y in clipped.y0..=clipped.y1 {
            for x in clipped.x0..=clipped.x1 {
                let off = y as usize * stride + x as usize * 4;
                let color = if dither::is_white(x, y, g) {
                    Rgba::WHITE
                } else {
                    Rgba::BLACK
                };
                buf[off] = color.r;
                buf[off + 1] = color.g;
                buf[off + 2] = color.b;
                buf[off + 3] = color.a;
            }
        }
    }

    /// Stamp `color` through an 8-bit alpha `mask` (row-major, `mask_stride`
    /// bytes/row, origin aligned to `rect`'s top-left). `DrawMode::Write` stores a
    /// premultiplied `(color, alpha)`; `DrawMode::Erase` zeroes touched pixels.
    /// Pixels with zero mask alpha are left untouched.
    pub fn blit(
        &mut self,
        layer: Layer,
        color: Rgba,
        mask: &[u8],
        mask_stride: usize,
        rect: Rect,
        mode: DrawMode,
    ) {
        let clipped = rect.clip(&self.surface);
        if !clipped.valid() {
            return;
        }
        let stride = self.stride;
        let buf = self.layer_mut(layer);
        for y in clipped.y0..=clipped.y1 {
            let mask_row = (y - rect.y0) as usize * mask_stride;
            for x in clipped.x0..=clipped.x1 {
                let mask_off = mask_row + (x - rect.x0) as usize;
                let Some(&a) = mask.get(mask_off) else {
                    continue;
                };
                if a == 0 {
                    continue;
                }
                let off = y as usize * stride + x as usize * 4;
                let out = match mode {
                    DrawMode::Write => {
                        let a32 = a as u32;
                        Rgba::new(
                            ((color.r as u32 * a32) / 255) as u8,
                            ((color.g as u32 * a32) / 255) as u8,
                            ((color.b as u32 * a32) / 255) as u8,
                            a,
                        )
                    }
                    DrawMode::Erase => Rgba::TRANSPARENT,
                };
                buf[off] = out.r;
                buf[off + 1] = out.g;
                buf[off + 2] = out.b;
                buf[off + 3] = out.a;
            }
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }
}

#[allow(clippy::too_many_arguments)]
fn compose_rect(
    rect: Rect,
    width: i32,
    height: i32,
    stride: usize,
    background: &[u8],
    presentation: &[u8],
    composite: &mut [u8],
) {
    let bounds = rect.clip(&Rect::from_size(0, 0, width, height));
    if !bounds.valid() {
        return;
    }
    for y in bounds.y0..=bounds.y1 {
        for x in bounds.x0..=bounds.x1 {
            let off = y as usize * stride + x as usize * 4;
            let bg = Rgba::new(
                background[off],
                background[off + 1],
                background[off + 2],
                255,
            );
            let pr = Rgba::new(
                presentation[off],
                presentation[off + 1],
                presentation[off + 2],
                presentation[off + 3],
            );
            let inv_a = 255 - pr.a as u32;
            composite[off] = ((bg.r as u32 * inv_a) / 255 + pr.r as u32) as u8;
            composite[off + 1] = ((bg.g as u32 * inv_a) / 255 + pr.g as u32) as u8;
            composite[off + 2] = ((bg.b as u32 * inv_a) / 255 + pr.b as u32) as u8;
            composite[off + 3] = 255;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DisplayError;

    struct FakeBackend {
        rect: Rect,
        unlocks: Vec<(Vec<CommitRequest>, Vec<u8>, usize)>,
    }

    impl FakeBackend {
        fn new(w: i32, h: i32) -> Self {
            FakeBackend {
                rect: Rect::from_size(0, 0, w, h),
                unlocks: Vec::new(),
            }
        }
    }

    impl DisplayBackend for FakeBackend {
        fn do_lock(&mut self) -> Result<Rect, DisplayError> {
            Ok(self.rect)
        }

        fn do_unlock(
            &mut self,
            requests: &[CommitRequest],
            composite: &[u8],
            stride: usize,
        ) -> Result<(), DisplayError> {
            self.unlocks
                .push((requests.to_vec(), composite.to_vec(), stride));
            Ok(())
        }
    }

    #[test]
    fn lock_unlock_round_trip_without_commit_skips_backend_call() {
        let mut d = MemoryDisplay::new(FakeBackend::new(4, 4));
        let surface = d.lock();
        assert_eq!(surface, Rect::from_size(0, 0, 4, 4));
        d.unlock();
        assert!(d.backend.unlocks.is_empty());
    }

    #[test]
    fn nested_lock_defers_until_outer_unlock() {
        let mut d = MemoryDisplay::new(FakeBackend::new(4, 4));
        d.lock();
        d.lock();
        d.commit(Rect::invalid(), UpdateMode::new(crate::epaper::OutputOp::Identity, crate::epaper::MaskOp::Full));
        d.unlock();
        assert!(d.backend.unlocks.is_empty());
        d.unlock();
        assert_eq!(d.backend.unlocks.len(), 1);
    }

    #[test]
    fn fill_background_then_compose_yields_opaque_color() {
        let mut d = MemoryDisplay::new(FakeBackend::new(2, 2));
        let surface = d.lock();
        d.fill(Layer::Background, Rgba::opaque(10, 20, 30), surface);
        d.commit(surface, UpdateMode::new(crate::epaper::OutputOp::Identity, crate::epaper::MaskOp::Full));
        d.unlock();
        let (_, composite, stride) = &d.backend.unlocks[0];
        assert_eq!(composite[0..3], [10, 20, 30]);
        assert_eq!(*stride, d.stride);
    }

    #[test]
    fn blit_with_zero_alpha_mask_leaves_pixels_untouched() {
        let mut d = MemoryDisplay::new(FakeBackend::new(2, 2));
        let surface = d.lock();
        d.fill(Layer::Presentation, Rgba::opaque(1, 2, 3), surface);
        let mask = [0u8; 4];
        d.blit(
            Layer::Presentation,
            Rgba::WHITE,
            &mask,
            2,
            surface,
            DrawMode::Write,
        );
        let off = d.pixel_offset(0, 0);
        assert_eq!(d.presentation[off], 1);
    }

    #[test]
    fn commit_with_empty_rect_targets_full_surface() {
        let mut d = MemoryDisplay::new(FakeBackend::new(2, 2));
        d.lock();
        d.commit(Rect::invalid(), UpdateMode::new(crate::epaper::OutputOp::Identity, crate::epaper::MaskOp::Full));
        assert_eq!(d.queue[0].rect, Rect::from_size(0, 0, 2, 2));
        d.unlock();
    }
}
