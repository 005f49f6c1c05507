//! Viewport scaling policy.
//!
//! When the viewhost declares candidate viewport specifications, the document
//! is laid out at a size inside one of them and the viewhost scales the result
//! to its real size. This module picks the candidate and derives the scale.
//!
//! Candidates are restricted to the device mode, then to the device shape if
//! any candidate matches it. Each remaining candidate is scored by how far the
//! scale strays from 1 (weighted by [`SCALING_BIAS`]) plus how much the
//! aspect ratio is distorted; the cheapest wins, ties to the earlier one.

use viewbridge_proto::{Outbound, ViewportShape, ViewportSpec};

use crate::engine::Metrics;

/// Weight of scale distance against aspect distortion.
pub const SCALING_BIAS: f64 = 10.0;

/// A shape match beats any cost difference.
pub const SHAPE_OVERRIDES_COST: bool = true;

/// Viewhost metrics plus the scaling chosen for them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaledMetrics {
    /// Metrics in core pixels, as the engine sees them
    pub metrics: Metrics,
    /// Viewhost pixels per core pixel
    pub scale_factor: f64,
    /// Viewhost width in pixels
    pub viewhost_width: f64,
    /// Viewhost height in pixels
    pub viewhost_height: f64,
    /// Candidate the scale was derived from; `None` when unscaled
    pub chosen: Option<ViewportSpec>,
}

impl ScaledMetrics {
    /// Metrics used as-is.
    pub fn unscaled(metrics: Metrics) -> Self {
        Self {
            metrics,
            scale_factor: 1.0,
            viewhost_width: metrics.width,
            viewhost_height: metrics.height,
            chosen: None,
        }
    }

    /// Choose among `specs` for viewhost `metrics`.
    ///
    /// No candidates, or none for the device mode, leaves the metrics
    /// unscaled with nothing chosen.
    pub fn choose(metrics: Metrics, specs: &[ViewportSpec]) -> Self {
        let round = metrics.shape == ViewportShape::Round;
        let mut candidates: Vec<&ViewportSpec> =
            specs.iter().filter(|spec| spec.mode == metrics.mode).collect();
        if SHAPE_OVERRIDES_COST && candidates.iter().any(|spec| spec.round == round) {
            candidates.retain(|spec| spec.round == round);
        }

        let (width_dp, height_dp) = (metrics.width_dp(), metrics.height_dp());
        let mut best: Option<(f64, f64, &ViewportSpec)> = None;
        for spec in candidates {
            let (scale, cost) = fit(width_dp, height_dp, spec);
            if best.is_none_or(|(best_cost, _, _)| cost < best_cost) {
                best = Some((cost, scale, spec));
            }
        }

        let Some((cost, scale, spec)) = best else {
            if !specs.is_empty() {
                tracing::warn!(mode = ?metrics.mode, "no viewport specification matches the device");
            }
            return Self::unscaled(metrics);
        };
        tracing::debug!(scale, cost, "chose viewport specification");

        Self {
            metrics: Metrics { width: metrics.width / scale, height: metrics.height / scale, ..metrics },
            scale_factor: scale,
            viewhost_width: metrics.width,
            viewhost_height: metrics.height,
            chosen: Some(*spec),
        }
    }

    /// Viewhost units to core units.
    pub fn to_core(&self, value: f64) -> f64 {
        value / self.scale_factor
    }

    /// Core units to viewhost units.
    pub fn to_viewhost(&self, value: f64) -> f64 {
        value * self.scale_factor
    }

    /// Viewhost pixel size in whole core pixels.
    pub fn core_pixel_size(&self, width: f64, height: f64) -> (i32, i32) {
        (self.to_core(width).round() as i32, self.to_core(height).round() as i32)
    }

    /// `scaling` message for the viewhost.
    pub fn scaling_message(&self) -> Outbound {
        Outbound::scaling(self.scale_factor, self.viewhost_width, self.viewhost_height)
    }
}

/// Scale that fits `width_dp` x `height_dp` inside `spec`, and its cost.
fn fit(width_dp: f64, height_dp: f64, spec: &ViewportSpec) -> (f64, f64) {
    let target_width = width_dp.clamp(spec.min_width, spec.max_width.max(spec.min_width));
    let target_height = height_dp.clamp(spec.min_height, spec.max_height.max(spec.min_height));
    let scale = (width_dp / target_width).max(height_dp / target_height);
    if !scale.is_finite() || scale <= 0.0 {
        return (1.0, f64::INFINITY);
    }

    let device_aspect = width_dp / height_dp;
    let target_aspect = target_width / target_height;
    let distortion = (device_aspect / target_aspect).ln().abs();
    (scale, SCALING_BIAS * scale.ln().abs() + distortion)
}
