// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image embedder — register JPEG/PNG bytes as image XObjects in the output
// graph. Uses the `image` crate for header probing and PNG decoding; JPEG data
// is passed through untouched.

use std::collections::HashMap;
use std::io::Cursor;

use image::{ImageFormat, ImageReader};
use lopdf::{Document, ObjectId, Stream, dictionary};
use packslip_core::error::{PackslipError, Result};
use packslip_core::types::RasterFormat;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument, warn};

use crate::asset::RasterImage;

/// An image XObject living in the output document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedImage {
    /// Object ID of the image XObject.
    pub handle: ObjectId,
    /// Preferred name under a page's `/XObject` resources.
    pub resource_name: String,
    pub intrinsic_width: u32,
    pub intrinsic_height: u32,
}

/// Embeds raster images into one output document.
///
/// Holds a per-call cache keyed by content identity, so embedding the same
/// bytes twice yields the same handle. Create a fresh embedder for every
/// composition; never share one across documents.
#[derive(Debug, Default)]
pub struct ImageEmbedder {
    cache: HashMap<String, EmbeddedImage>,
}

impl ImageEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct images embedded so far.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Add `image` to `document` as an image XObject, or return the handle of
    /// an identical image embedded earlier.
    #[instrument(skip_all, fields(format = image.format.mime_type(), bytes_len = image.bytes.len()))]
    pub fn embed(&mut self, document: &mut Document, image: &RasterImage<'_>) -> Result<EmbeddedImage> {
        let key = content_key(image.format, image.bytes);
        if let Some(existing) = self.cache.get(&key) {
            debug!(handle = ?existing.handle, "Image already embedded, reusing");
            return Ok(existing.clone());
        }

        let (width, height) = header_dimensions(image.bytes, image.format)?;
        if let Some(hint) = image.pixel_hint
            && hint != (width, height)
        {
            warn!(?hint, width, height, "Declared pixel size disagrees with codec header");
        }

        let handle = match image.format {
            RasterFormat::Jpeg => embed_jpeg(document, image.bytes, width, height)?,
            RasterFormat::Png => embed_png(document, image.bytes)?,
        };

        let embedded = EmbeddedImage {
            handle,
            resource_name: format!("PsImg{}", self.cache.len()),
            intrinsic_width: width,
            intrinsic_height: height,
        };
        debug!(handle = ?handle, width, height, "Image embedded");
        self.cache.insert(key, embedded.clone());
        Ok(embedded)
    }
}

/// Content identity of an image: SHA-256 over the format tag and bytes.
pub fn content_key(format: RasterFormat, bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format.mime_type().as_bytes());
    hasher.update([0u8]);
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Read the pixel size from the codec header without decoding pixel data.
pub fn header_dimensions(bytes: &[u8], format: RasterFormat) -> Result<(u32, u32)> {
    let codec = match format {
        RasterFormat::Jpeg => ImageFormat::Jpeg,
        RasterFormat::Png => ImageFormat::Png,
    };
    let (width, height) = ImageReader::with_format(Cursor::new(bytes), codec)
        .into_dimensions()
        .map_err(|err| {
            PackslipError::DecodeError(format!(
                "failed to read {} header: {}",
                format.mime_type(),
                err
            ))
        })?;
    if width == 0 || height == 0 {
        return Err(PackslipError::DecodeError(format!(
            "{} has zero size ({}x{})",
            format.mime_type(),
            width,
            height
        )));
    }
    Ok((width, height))
}

/// Frame parameters read from a JPEG's marker segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JpegFrame {
    pub width: u32,
    pub height: u32,
    /// Number of colour components in the frame (1, 3 or 4).
    pub components: u8,
    /// An Adobe APP14 segment precedes the frame.
    pub adobe: bool,
}

/// Walk the marker segments up to the first start-of-frame.
///
/// The `image` decoder reports CMYK and YCCK data as RGB after conversion, so
/// the component count is taken from the SOF header itself.
pub fn read_jpeg_frame(bytes: &[u8]) -> Result<JpegFrame> {
    let malformed = |reason: &str| PackslipError::DecodeError(format!("malformed JPEG: {}", reason));
    if !bytes.starts_with(&[0xFF, 0xD8]) {
        return Err(malformed("missing SOI marker"));
    }

    let mut adobe = false;
    let mut pos = 2;
    loop {
        if bytes.get(pos) != Some(&0xFF) {
            return Err(malformed("expected a marker"));
        }
        while bytes.get(pos) == Some(&0xFF) {
            pos += 1;
        }
        let marker = *bytes.get(pos).ok_or_else(|| malformed("truncated marker"))?;
        pos += 1;

        match marker {
            // Standalone markers carry no length.
            0x01 | 0xD0..=0xD7 => continue,
            0xD9 | 0xDA => return Err(malformed("no frame header before scan data")),
            _ => {}
        }

        let length = match bytes.get(pos..pos + 2) {
            Some(&[hi, lo]) => usize::from(u16::from_be_bytes([hi, lo])),
            _ => return Err(malformed("truncated segment length")),
        };
        let segment = bytes
            .get(pos + 2..pos + length)
            .ok_or_else(|| malformed("truncated segment"))?;

        match marker {
            0xEE if segment.starts_with(b"Adobe") => adobe = true,
            // SOF0..SOF15 except DHT (C4), JPG (C8) and DAC (CC).
            0xC0..=0xCF if !matches!(marker, 0xC4 | 0xC8 | 0xCC) => {
                let &[_, h_hi, h_lo, w_hi, w_lo, components, ..] = segment else {
                    return Err(malformed("short frame header"));
                };
                return Ok(JpegFrame {
                    width: u32::from(u16::from_be_bytes([w_hi, w_lo])),
                    height: u32::from(u16::from_be_bytes([h_hi, h_lo])),
                    components,
                    adobe,
                });
            }
            _ => {}
        }
        pos += length;
    }
}

/// JPEG data goes in verbatim behind a `DCTDecode` filter.
fn embed_jpeg(document: &mut Document, bytes: &[u8], width: u32, height: u32) -> Result<ObjectId> {
    let frame = read_jpeg_frame(bytes)?;
    let color_space = match frame.components {
        1 => "DeviceGray",
        3 => "DeviceRGB",
        4 => "DeviceCMYK",
        n => {
            return Err(PackslipError::DecodeError(format!(
                "JPEG with {} colour components is not supported",
                n
            )));
        }
    };

    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => color_space,
        "BitsPerComponent" => 8,
        "Filter" => "DCTDecode",
    };
    // Adobe writes CMYK JPEGs inverted.
    if frame.components == 4 && frame.adobe {
        dict.set("Decode", vec![1.into(), 0.into(), 1.into(), 0.into(), 1.into(), 0.into(), 1.into(), 0.into()]);
    }
    debug!(color_space, adobe = frame.adobe, "JPEG passed through");

    let stream = Stream::new(dict, bytes.to_vec()).with_compression(false);
    Ok(document.add_object(stream))
}

/// PNG is decoded to 8-bit RGB; an alpha channel becomes a soft mask.
fn embed_png(document: &mut Document, bytes: &[u8]) -> Result<ObjectId> {
    let decoded = image::load_from_memory_with_format(bytes, ImageFormat::Png).map_err(|err| {
        PackslipError::DecodeError(format!("failed to decode PNG: {}", err))
    })?;
    let (width, height) = (decoded.width(), decoded.height());

    let (rgb, smask) = if decoded.color().has_alpha() {
        let rgba = decoded.to_rgba8();
        let mut rgb = Vec::with_capacity((width * height * 3) as usize);
        let mut alpha = Vec::with_capacity((width * height) as usize);
        for pixel in rgba.pixels() {
            rgb.extend_from_slice(&pixel.0[..3]);
            alpha.push(pixel.0[3]);
        }
        let smask_id = document.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            alpha,
        ));
        (rgb, Some(smask_id))
    } else {
        (decoded.to_rgb8().into_raw(), None)
    };

    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
    };
    if let Some(smask_id) = smask {
        dict.set("SMask", smask_id);
    }
    Ok(document.add_object(Stream::new(dict, rgb)))
}
