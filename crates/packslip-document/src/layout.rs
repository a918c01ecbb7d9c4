// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Overlay layout — aspect-preserving downscale plus anchor resolution.
//
// Resolution runs in two passes: every request is sized independently with
// `fit`, then X/Y positions are assigned in one sweep over the requests in
// priority order. Bottom-band positions depend on the widths already placed,
// so the order of the request list is part of the result.

use packslip_core::types::{Anchor, Margins, ResolvedPlacement};
use tracing::debug;

/// Scale `(width, height)` down to fit inside the given bounds.
///
/// Never upscales; a missing bound leaves that axis unconstrained. The result
/// keeps the intrinsic aspect ratio.
pub fn fit(width: f32, height: f32, max_width: Option<f32>, max_height: Option<f32>) -> (f32, f32) {
    let mut scale: f32 = 1.0;
    if let Some(max_w) = max_width {
        scale = scale.min(max_w / width);
    }
    if let Some(max_h) = max_height {
        scale = scale.min(max_h / height);
    }
    (width * scale, height * scale)
}

/// Drawing surface, in points, with its lower-left corner at `(x0, y0)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Canvas {
    pub x0: f32,
    pub y0: f32,
    pub width: f32,
    pub height: f32,
}

impl Canvas {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            x0: 0.0,
            y0: 0.0,
            width,
            height,
        }
    }
}

/// One item to place: intrinsic size, anchor and optional bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementRequest {
    pub intrinsic_width: f32,
    pub intrinsic_height: f32,
    pub anchor: Anchor,
    pub max_width: Option<f32>,
    pub max_height: Option<f32>,
}

/// Resolves placement requests against a canvas.
#[derive(Debug, Clone, Copy)]
pub struct LayoutEngine {
    margins: Margins,
    band_spacing: f32,
}

impl LayoutEngine {
    pub fn new(margins: Margins, band_spacing: f32) -> Self {
        Self {
            margins,
            band_spacing,
        }
    }

    /// Resolve every request; the output is index-aligned with `requests`.
    ///
    /// Left-anchored items are packed rightwards from the left margin,
    /// right-anchored items leftwards from the right margin, each in request
    /// order. Centered items are centered on the full canvas width regardless
    /// of what else sits in the band. Overlap between bands or within a crowded
    /// band is not prevented.
    pub fn resolve(&self, canvas: Canvas, requests: &[PlacementRequest]) -> Vec<ResolvedPlacement> {
        // Pass 1: sizes.
        let sizes: Vec<(f32, f32)> = requests
            .iter()
            .map(|r| fit(r.intrinsic_width, r.intrinsic_height, r.max_width, r.max_height))
            .collect();

        // Pass 2: positions, in priority order.
        let m = &self.margins;
        let mut top_left_x = m.left;
        let mut bottom_left_x = m.left;
        let mut bottom_right_edge = canvas.width - m.right;

        let placements = requests
            .iter()
            .zip(sizes)
            .map(|(request, (width, height))| {
                let centered_x = (canvas.width - width) / 2.0;
                let x = match request.anchor {
                    Anchor::TopLeft => {
                        let x = top_left_x;
                        top_left_x += width + self.band_spacing;
                        x
                    }
                    Anchor::BottomLeft => {
                        let x = bottom_left_x;
                        bottom_left_x += width + self.band_spacing;
                        x
                    }
                    Anchor::TopCenter | Anchor::BottomCenter => centered_x,
                    Anchor::BottomRight => {
                        let x = bottom_right_edge - width;
                        bottom_right_edge = x - self.band_spacing;
                        x
                    }
                };
                let y = if request.anchor.is_bottom() {
                    m.bottom
                } else {
                    canvas.height - m.top - height
                };
                ResolvedPlacement {
                    x: canvas.x0 + x,
                    y: canvas.y0 + y,
                    width,
                    height,
                }
            })
            .collect::<Vec<_>>();

        debug!(?canvas, placed = placements.len(), "Layout resolved");
        placements
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-3;

    fn request(w: f32, h: f32, anchor: Anchor, max_w: f32, max_h: f32) -> PlacementRequest {
        PlacementRequest {
            intrinsic_width: w,
            intrinsic_height: h,
            anchor,
            max_width: Some(max_w),
            max_height: Some(max_h),
        }
    }

    fn engine() -> LayoutEngine {
        LayoutEngine::new(Margins::default(), 15.0)
    }

    #[test]
    fn wide_logo_is_width_bound() {
        assert_eq!(fit(800.0, 200.0, Some(200.0), Some(100.0)), (200.0, 50.0));
    }

    #[test]
    fn tall_image_is_height_bound() {
        let (w, h) = fit(300.0, 600.0, Some(180.0), Some(120.0));
        assert!((h - 120.0).abs() < EPS);
        assert!((w - 60.0).abs() < EPS);
    }

    #[test]
    fn never_upscales() {
        assert_eq!(fit(50.0, 40.0, Some(200.0), Some(100.0)), (50.0, 40.0));
        assert_eq!(fit(50.0, 40.0, None, None), (50.0, 40.0));
    }

    #[test]
    fn missing_bound_leaves_axis_free() {
        assert_eq!(fit(1000.0, 10.0, None, Some(5.0)), (500.0, 5.0));
        assert_eq!(fit(1000.0, 10.0, Some(100.0), None), (100.0, 1.0));
    }

    #[test]
    fn fit_bounds_and_ratio_hold_across_a_sweep() {
        let dims = [1.0, 7.0, 33.0, 180.0, 200.0, 999.0, 4096.0];
        let bounds = [1.0, 50.0, 120.0, 180.0, 640.0];
        for &w in &dims {
            for &h in &dims {
                for &max_w in &bounds {
                    for &max_h in &bounds {
                        let (fw, fh) = fit(w, h, Some(max_w), Some(max_h));
                        assert!(fw <= max_w + EPS, "{w}x{h} in {max_w}x{max_h}");
                        assert!(fh <= max_h + EPS, "{w}x{h} in {max_w}x{max_h}");
                        assert!(((fw / fh) - (w / h)).abs() / (w / h) < 1e-4);
                        if w <= max_w && h <= max_h {
                            assert_eq!((fw, fh), (w, h));
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn top_left_hangs_from_top_margin() {
        let canvas = Canvas::new(595.0, 842.0);
        let placed = engine().resolve(
            canvas,
            &[request(800.0, 200.0, Anchor::TopLeft, 200.0, 100.0)],
        );
        assert_eq!(
            placed[0],
            ResolvedPlacement {
                x: 40.0,
                y: 842.0 - 30.0 - 50.0,
                width: 200.0,
                height: 50.0
            }
        );
    }

    #[test]
    fn top_center_shares_top_y() {
        let placed = engine().resolve(
            Canvas::new(600.0, 800.0),
            &[request(100.0, 40.0, Anchor::TopCenter, 200.0, 100.0)],
        );
        assert_eq!(placed[0].x, 250.0);
        assert_eq!(placed[0].y, 800.0 - 30.0 - 40.0);
    }

    #[test]
    fn bottom_band_left_center_right() {
        let canvas = Canvas::new(600.0, 800.0);
        let placed = engine().resolve(
            canvas,
            &[
                request(360.0, 240.0, Anchor::BottomLeft, 180.0, 120.0),
                request(100.0, 100.0, Anchor::BottomCenter, 180.0, 120.0),
                request(90.0, 60.0, Anchor::BottomRight, 180.0, 120.0),
            ],
        );

        // Left: scaled to 180x120 at the left margin.
        assert_eq!((placed[0].x, placed[0].y), (40.0, 30.0));
        assert_eq!((placed[0].width, placed[0].height), (180.0, 120.0));
        // Center: uses the full canvas width.
        assert_eq!(placed[1].x, (600.0 - 100.0) / 2.0);
        assert_eq!(placed[1].y, 30.0);
        // Right: flush with the right margin.
        assert_eq!(placed[2].x, 600.0 - 40.0 - 90.0);
        assert_eq!(placed[2].y, 30.0);
    }

    #[test]
    fn left_items_pack_in_priority_order() {
        let placed = engine().resolve(
            Canvas::new(600.0, 800.0),
            &[
                request(100.0, 50.0, Anchor::BottomLeft, 180.0, 120.0),
                request(80.0, 50.0, Anchor::BottomLeft, 180.0, 120.0),
            ],
        );
        assert_eq!(placed[0].x, 40.0);
        assert_eq!(placed[1].x, 40.0 + 100.0 + 15.0);
    }

    #[test]
    fn right_items_pack_inwards() {
        let placed = engine().resolve(
            Canvas::new(600.0, 800.0),
            &[
                request(100.0, 50.0, Anchor::BottomRight, 180.0, 120.0),
                request(80.0, 50.0, Anchor::BottomRight, 180.0, 120.0),
            ],
        );
        assert_eq!(placed[0].x, 460.0);
        assert_eq!(placed[1].x, 460.0 - 15.0 - 80.0);
    }

    #[test]
    fn overlap_is_accepted_on_narrow_canvas() {
        let placed = engine().resolve(
            Canvas::new(200.0, 400.0),
            &[
                request(180.0, 120.0, Anchor::BottomLeft, 180.0, 120.0),
                request(180.0, 120.0, Anchor::BottomRight, 180.0, 120.0),
            ],
        );
        assert_eq!(placed[0].x, 40.0);
        assert_eq!(placed[1].x, 200.0 - 40.0 - 180.0);
        assert!(placed[1].x < placed[0].x + placed[0].width);
    }

    #[test]
    fn canvas_origin_offsets_everything() {
        let canvas = Canvas {
            x0: 10.0,
            y0: 20.0,
            width: 600.0,
            height: 800.0,
        };
        let placed = engine().resolve(
            canvas,
            &[request(100.0, 50.0, Anchor::BottomLeft, 180.0, 120.0)],
        );
        assert_eq!((placed[0].x, placed[0].y), (50.0, 50.0));
    }

    #[test]
    fn resolution_is_deterministic() {
        let requests = [
            request(640.0, 480.0, Anchor::TopLeft, 200.0, 100.0),
            request(300.0, 300.0, Anchor::BottomCenter, 180.0, 120.0),
            request(500.0, 200.0, Anchor::BottomRight, 180.0, 120.0),
        ];
        let canvas = Canvas::new(595.0, 842.0);
        assert_eq!(
            engine().resolve(canvas, &requests),
            engine().resolve(canvas, &requests)
        );
    }
}
