// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// packslip-document — PDF composition engine for Packslip.
//
// Takes a primary PDF, up to four static raster overlays and an optional
// secondary asset, and produces one PDF: the primary's pages with the overlays
// stamped onto page 0, followed by the secondary's page(s).

pub mod asset;
pub mod image;
pub mod layout;
pub mod pdf;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export the entry points so callers can use `packslip_document::PageComposer` etc.
pub use asset::{RasterImage, ResolvedAsset, resolve};
pub use self::image::embed::{EmbeddedImage, ImageEmbedder};
pub use layout::{Canvas, LayoutEngine, PlacementRequest, fit};
pub use pdf::compose::{ImageDraw, OutputDocument, PageComposer, PageManifest, PageOrigin};
pub use pdf::source::{PageBox, SourceDocument};
pub use pdf::writer::PdfWriter;
