//! External collaborator interfaces: the display backend, the glyph provider, and
//! the input event source. Only their shapes are specified here — concrete
//! implementations (a vendor framebuffer driver, a font rasterizer, a PTY/X11 event
//! loop) live outside this crate.

use crate::epaper::UpdateMode;
use crate::error::DisplayError;
use crate::geometry::Rect;

/// A committed display region plus the waveform/mask hint it should be driven with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommitRequest {
    pub rect: Rect,
    pub mode: UpdateMode,
}

/// The physical pixel surface a `MemoryDisplay` drives on unlock.
///
/// `do_lock`/`do_unlock` are each called at most once per lock/unlock cycle, on the
/// unlocking thread (spec §5). Implementations must not change the surface size
/// while locked.
pub trait DisplayBackend {
    /// Obtain the physical display rectangle, in display coordinates. May block
    /// until a surface is available.
    fn do_lock(&mut self) -> Result<Rect, DisplayError>;

    /// Blit each commit rect from `composite` (an RGBA8888 buffer with the given
    /// byte `stride` per row) to the physical display, honoring each request's
    /// `UpdateMode`. Blocks until the update completes.
    fn do_unlock(
        &mut self,
        requests: &[CommitRequest],
        composite: &[u8],
        stride: usize,
    ) -> Result<(), DisplayError>;
}

/// Monospace cell metrics reported by a `GlyphProvider` for a given font size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlyphMetrics {
    pub cell_w: i32,
    pub cell_h: i32,
    pub origin_y: i32,
}

/// An immutable, alpha-only glyph bitmap. The pointer/slice is valid for the
/// lifetime of the glyph cache that produced it; the renderer only borrows it for
/// the duration of one draw pass (spec §3 Ownership summary).
#[derive(Debug, Clone)]
pub struct GlyphBitmap {
    pub alpha: Vec<u8>,
    pub stride: usize,
    pub width: i32,
    pub height: i32,
    pub origin_x: i32,
    pub origin_y: i32,
}

/// Renders Unicode codepoints into glyph bitmaps.
pub trait GlyphProvider {
    fn metrics(&self, size: u32) -> GlyphMetrics;

    /// Render `codepoint` at `size`. `monochrome` requests a 1-bit-quality hint
    /// bitmap suited to the renderer's low-quality draft pass. Returns `None` when
    /// the font has no glyph for the codepoint (the cell is then drawn with
    /// background only).
    fn render(
        &self,
        codepoint: u32,
        size: u32,
        monochrome: bool,
        orientation: u8,
    ) -> Option<GlyphBitmap>;
}

/// A key press, independent of any particular windowing toolkit's keysym space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key {
    pub code: u32,
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

/// Input/session events delivered by an `EventSource`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Key(Key),
    Text { bytes: Vec<u8>, mods: Key },
    PtyOutput(Vec<u8>),
    Resize { cols: u32, rows: u32 },
    Quit,
}

/// Which direction(s) a pollable file descriptor should be watched for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollMode {
    pub readable: bool,
    pub writable: bool,
    pub error: bool,
}

impl PollMode {
    pub fn readable() -> Self {
        PollMode {
            readable: true,
            writable: false,
            error: true,
        }
    }
}

/// A multiplexable source of input/session events (keyboard, PTY output, resize,
/// shutdown signals).
pub trait EventSource {
    /// A pollable file descriptor the host event loop can wait on alongside others.
    fn poll_fd(&self) -> i32;

    fn poll_mode(&self) -> PollMode;

    /// Drain at most one pending event for the given poll mode.
    fn event_get(&mut self, mode: PollMode) -> Option<Event>;
}
