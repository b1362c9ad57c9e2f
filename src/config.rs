//! Renderer configuration knobs.
//!
//! This crate owns the typed shape only; loading it from TOML and/or CLI flags is a
//! host-binary concern (see spec §1 — configuration loading is an external
//! collaborator). The struct is `serde::Deserialize` so a host can feed it straight
//! from a parsed TOML document, the same way `oxidized`'s `core-config` crate
//! deserializes its own settings.

use serde::Deserialize;

/// Tunable thresholds and ratios for the renderer's overdue-detection and
/// rectangle-merging policies.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Shift indexed foreground colors `[0,7]` into the bright half on bold cells.
    pub bright_on_bold: bool,
    /// Milliseconds a low-quality cell may sit before it becomes overdue (relaxed).
    pub redraw_timeout_high_ms: u32,
    /// Milliseconds a low-quality cell may sit before it becomes overdue (tightened).
    pub redraw_timeout_low_ms: u32,
    /// Operation-counter value at which a cell becomes overdue (relaxed).
    pub counter_threshold_high: u32,
    /// Operation-counter value at which a cell becomes overdue (tightened).
    pub counter_threshold_low: u32,
    /// Minimum fraction of a merged rectangle's area that must be covered by the
    /// rectangles contributing to it, for `RectangleMerger` to accept the merge.
    pub merge_waste_ratio: f32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        RendererConfig {
            bright_on_bold: true,
            redraw_timeout_high_ms: 1000,
            redraw_timeout_low_ms: 250,
            counter_threshold_high: 2000,
            counter_threshold_low: 1000,
            merge_waste_ratio: 0.75,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_spec_base_thresholds() {
        let cfg = RendererConfig::default();
        assert_eq!(cfg.redraw_timeout_high_ms, 1000);
        assert_eq!(cfg.redraw_timeout_low_ms, 250);
        assert_eq!(cfg.counter_threshold_high, 2000);
        assert_eq!(cfg.counter_threshold_low, 1000);
        assert!((cfg.merge_waste_ratio - 0.75).abs() < f32::EPSILON);
    }

    #[test]
    fn deserializes_partial_toml_with_defaults() {
        let cfg: RendererConfig = toml::from_str("bright_on_bold = false\n").unwrap();
        assert!(!cfg.bright_on_bold);
        assert_eq!(cfg.redraw_timeout_high_ms, 1000);
    }
}
