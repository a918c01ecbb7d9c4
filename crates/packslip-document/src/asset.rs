// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Asset resolution — turn a declared media type plus bytes into either a
// raster image or a parsed document, exactly once per input.

use packslip_core::error::{PackslipError, Result};
use packslip_core::types::{AssetKind, RasterFormat, SourceAsset};
use tracing::{debug, instrument};

use crate::pdf::source::SourceDocument;

/// Raster bytes tagged with their format. Borrowed from the request; nothing
/// is decoded until the embedder needs it.
#[derive(Debug, Clone, Copy)]
pub struct RasterImage<'a> {
    pub bytes: &'a [u8],
    pub format: RasterFormat,
    /// Pixel size as reported by whoever supplied the asset.
    pub pixel_hint: Option<(u32, u32)>,
}

/// An input after classification.
pub enum ResolvedAsset<'a> {
    Image(RasterImage<'a>),
    Document(SourceDocument),
}

impl ResolvedAsset<'_> {
    pub fn media_type(&self) -> &'static str {
        match self {
            Self::Image(image) => image.format.mime_type(),
            Self::Document(_) => "application/pdf",
        }
    }
}

/// Classify `asset` by its declared media type and, for documents, parse it.
///
/// Fails with `UnsupportedMediaType` for anything outside JPEG/PNG/PDF and with
/// `DecodeError` if a declared PDF does not parse.
#[instrument(skip_all, fields(declared = %asset.declared_media_type, bytes_len = asset.bytes.len()))]
pub fn resolve(asset: &SourceAsset) -> Result<ResolvedAsset<'_>> {
    match asset.kind() {
        AssetKind::Image(format) => {
            let pixel_hint = asset.pixel_width.zip(asset.pixel_height);
            debug!(format = format.mime_type(), "Resolved raster asset");
            Ok(ResolvedAsset::Image(RasterImage {
                bytes: &asset.bytes,
                format,
                pixel_hint,
            }))
        }
        AssetKind::Document => {
            let document = SourceDocument::from_bytes(&asset.bytes)?;
            debug!(pages = document.page_count(), "Resolved document asset");
            Ok(ResolvedAsset::Document(document))
        }
        AssetKind::Unsupported(declared) => Err(PackslipError::UnsupportedMediaType(format!(
            "'{}' is neither JPEG, PNG nor PDF",
            declared
        ))),
    }
}
