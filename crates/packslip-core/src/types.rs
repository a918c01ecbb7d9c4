// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for Packslip composition.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Raster formats the embedder understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RasterFormat {
    Jpeg,
    Png,
}

impl RasterFormat {
    /// Canonical MIME type string.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }
}

/// The closed set of things a declared media type can resolve to.
///
/// Classification happens once at ingestion; everything downstream matches on
/// this enum instead of comparing strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetKind {
    Image(RasterFormat),
    Document,
    /// Normalised form of the rejected declared type.
    Unsupported(String),
}

impl AssetKind {
    /// Classify a declared media type such as `image/png` or
    /// `application/pdf; charset=binary`.
    pub fn classify(declared: &str) -> Self {
        let essence = declared
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "image/jpeg" | "image/jpg" => Self::Image(RasterFormat::Jpeg),
            "image/png" => Self::Image(RasterFormat::Png),
            "application/pdf" => Self::Document,
            _ => Self::Unsupported(essence),
        }
    }

    /// Infer the declared media type from a file extension.
    pub fn mime_from_extension(ext: &str) -> Option<&'static str> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some("application/pdf"),
            "jpg" | "jpeg" => Some("image/jpeg"),
            "png" => Some("image/png"),
            _ => None,
        }
    }
}

/// One input buffer together with the media type its supplier declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceAsset {
    pub bytes: Vec<u8>,
    pub declared_media_type: String,
    /// Optional pixel dimensions reported by the supplier. The codec header
    /// is authoritative; these are only cross-checked.
    pub pixel_width: Option<u32>,
    pub pixel_height: Option<u32>,
}

impl SourceAsset {
    pub fn new(bytes: impl Into<Vec<u8>>, declared_media_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            declared_media_type: declared_media_type.into(),
            pixel_width: None,
            pixel_height: None,
        }
    }

    /// Attach the pixel size reported by the supplier.
    pub fn with_pixel_size(mut self, width: u32, height: u32) -> Self {
        self.pixel_width = Some(width);
        self.pixel_height = Some(height);
        self
    }

    pub fn kind(&self) -> AssetKind {
        AssetKind::classify(&self.declared_media_type)
    }
}

/// Named slots for the recurring static overlays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaticSlot {
    Logo,
    Coupon,
    Feedback,
    Social,
}

impl StaticSlot {
    pub const ALL: [StaticSlot; 4] = [Self::Logo, Self::Coupon, Self::Feedback, Self::Social];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Logo => "logo",
            Self::Coupon => "coupon",
            Self::Feedback => "feedback",
            Self::Social => "social",
        }
    }
}

impl std::fmt::Display for StaticSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The static overlay assets for one composition call.
///
/// Passed explicitly with every request; the core never remembers them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticAssets {
    assets: BTreeMap<StaticSlot, SourceAsset>,
}

impl StaticAssets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill (or replace) a slot.
    pub fn set(&mut self, slot: StaticSlot, asset: SourceAsset) {
        self.assets.insert(slot, asset);
    }

    /// Builder-style variant of [`StaticAssets::set`].
    pub fn with(mut self, slot: StaticSlot, asset: SourceAsset) -> Self {
        self.set(slot, asset);
        self
    }

    pub fn get(&self, slot: StaticSlot) -> Option<&SourceAsset> {
        self.assets.get(&slot)
    }

    pub fn slots(&self) -> impl Iterator<Item = StaticSlot> + '_ {
        self.assets.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

/// Everything one composition call consumes.
#[derive(Debug, Clone, Default)]
pub struct CompositionRequest {
    /// The base document. Required; kept optional so its absence is reported
    /// as an error rather than being unrepresentable at the call boundary.
    pub primary: Option<SourceAsset>,
    pub statics: StaticAssets,
    /// Appended after the primary's pages.
    pub secondary: Option<SourceAsset>,
}

impl CompositionRequest {
    pub fn new(primary: SourceAsset) -> Self {
        Self {
            primary: Some(primary),
            ..Self::default()
        }
    }

    pub fn with_static(mut self, slot: StaticSlot, asset: SourceAsset) -> Self {
        self.statics.set(slot, asset);
        self
    }

    pub fn with_secondary(mut self, asset: SourceAsset) -> Self {
        self.secondary = Some(asset);
        self
    }
}

/// Reference point a placement's bounding box is computed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Anchor {
    TopLeft,
    TopCenter,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

impl Anchor {
    /// Anchors in the bottom band share one horizontal line and must be
    /// resolved in priority order.
    pub fn is_bottom(&self) -> bool {
        matches!(self, Self::BottomLeft | Self::BottomCenter | Self::BottomRight)
    }
}

/// Size constraint for one static slot. Not resolved geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlacementSpec {
    pub slot: StaticSlot,
    pub anchor: Anchor,
    /// `None` leaves the axis unconstrained.
    #[serde(default)]
    pub max_width: Option<f32>,
    #[serde(default)]
    pub max_height: Option<f32>,
}

impl PlacementSpec {
    pub fn new(slot: StaticSlot, anchor: Anchor, max_width: f32, max_height: f32) -> Self {
        Self {
            slot,
            anchor,
            max_width: Some(max_width),
            max_height: Some(max_height),
        }
    }
}

/// Final geometry of one placement, in PDF points with a lower-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPlacement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Page dimensions in PDF points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    /// ISO A4 portrait in points.
    pub const A4: PageSize = PageSize {
        width: 595.0,
        height: 842.0,
    };

    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Page margins in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            top: 30.0,
            bottom: 30.0,
            left: 40.0,
            right: 40.0,
        }
    }
}
