// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fixtures shared by the unit tests: small PDFs built with lopdf and raster
// images encoded with the `image` crate.

use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgb, RgbImage, Rgba, RgbaImage};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};

/// A PDF with one page per entry in `sizes`, each carrying its own MediaBox,
/// a line of text and a shared font resource held by reference.
pub(crate) fn pdf_bytes(sizes: &[(f32, f32)]) -> Vec<u8> {
    let boxes: Vec<[f32; 4]> = sizes.iter().map(|&(w, h)| [0.0, 0.0, w, h]).collect();
    save(document_with_boxes(&boxes))
}

/// A one-page PDF whose MediaBox is exactly `media_box` (llx, lly, urx, ury).
pub(crate) fn pdf_with_media_box(media_box: [f32; 4]) -> Vec<u8> {
    save(document_with_boxes(&[media_box]))
}

/// A PDF of `pages` A4 pages whose root `/Kids` array and `/Count` are both
/// indirect objects.
pub(crate) fn pdf_with_indirect_kids(pages: usize) -> Vec<u8> {
    let mut doc = document_with_boxes(&vec![[0.0, 0.0, 595.0, 842.0]; pages]);
    let root = pages_root(&doc);
    let kids = doc
        .get_dictionary(root)
        .and_then(|d| d.get(b"Kids"))
        .cloned()
        .unwrap();
    let kids_id = doc.add_object(kids);
    let count_id = doc.add_object(Object::Integer(pages as i64));
    let pages_dict = doc.get_dictionary_mut(root).unwrap();
    pages_dict.set("Kids", Object::Reference(kids_id));
    pages_dict.set("Count", Object::Reference(count_id));
    save(doc)
}

/// Like [`pdf_bytes`], but written with object streams and a cross-reference
/// stream instead of a classic xref table.
pub(crate) fn pdf_with_xref_stream(sizes: &[(f32, f32)]) -> Vec<u8> {
    let boxes: Vec<[f32; 4]> = sizes.iter().map(|&(w, h)| [0.0, 0.0, w, h]).collect();
    let mut doc = document_with_boxes(&boxes);
    let mut buffer = Vec::new();
    doc.save_modern(&mut buffer).unwrap();
    buffer
}

/// A PDF of `pages` pages whose MediaBox and Resources live only on the
/// `/Pages` root.
pub(crate) fn pdf_with_inherited_box(pages: usize, width: f32, height: f32) -> Vec<u8> {
    let mut doc = Document::with_version("1.4");
    let pages_id = doc.new_object_id();
    let resources_id = font_resources(&mut doc);

    let kids: Vec<Object> = (0..pages)
        .map(|index| {
            let content_id = text_stream(&mut doc, index);
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            Object::Reference(page_id)
        })
        .collect();

    finish(
        &mut doc,
        pages_id,
        dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
            "MediaBox" => media_box([0.0, 0.0, width, height]),
            "Resources" => resources_id,
        },
    );
    save(doc)
}

/// PNG of the given size; RGBA with a varying alpha channel when `alpha`.
pub(crate) fn png_bytes(width: u32, height: u32, alpha: bool) -> Vec<u8> {
    let image = if alpha {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
            Rgba([x as u8, y as u8, (x ^ y) as u8, 64 + (x % 128) as u8])
        }))
    } else {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([x as u8, y as u8, (x + y) as u8])
        }))
    };
    encode(&image, ImageFormat::Png)
}

/// Baseline RGB JPEG of the given size.
pub(crate) fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 3) as u8, (y * 5) as u8, 128])
    }));
    encode(&image, ImageFormat::Jpeg)
}

/// Baseline single-component JPEG of the given size.
pub(crate) fn gray_jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = DynamicImage::ImageLuma8(GrayImage::from_fn(width, height, |x, y| {
        Luma([(x + y) as u8])
    }));
    encode(&image, ImageFormat::Jpeg)
}

/// Baseline four-component (CMYK) JPEG of flat mid-grey, assembled marker by
/// marker: unit quantisation, one-symbol Huffman tables and all-zero blocks.
/// With `adobe` an APP14 "Adobe" segment (transform 0) precedes the frame.
pub(crate) fn cmyk_jpeg_bytes(width: u16, height: u16, adobe: bool) -> Vec<u8> {
    let mut out = vec![0xFF, 0xD8];
    if adobe {
        out.extend_from_slice(&[0xFF, 0xEE, 0x00, 0x0E]);
        out.extend_from_slice(b"Adobe");
        out.extend_from_slice(&[0x00, 0x64, 0x00, 0x00, 0x00, 0x00, 0x00]);
    }

    // DQT: table 0, all ones.
    out.extend_from_slice(&[0xFF, 0xDB, 0x00, 0x43, 0x00]);
    out.extend_from_slice(&[1u8; 64]);

    // SOF0: 8-bit, four components sampled 1x1 on table 0.
    out.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x14, 0x08]);
    out.extend_from_slice(&height.to_be_bytes());
    out.extend_from_slice(&width.to_be_bytes());
    out.push(4);
    for id in 1..=4u8 {
        out.extend_from_slice(&[id, 0x11, 0x00]);
    }

    // DHT: DC table 0 and AC table 0, each a single 1-bit code for symbol 0
    // (DC difference 0, AC end-of-block).
    for class in [0x00u8, 0x10] {
        out.extend_from_slice(&[0xFF, 0xC4, 0x00, 0x14, class, 1]);
        out.extend_from_slice(&[0u8; 15]);
        out.push(0x00);
    }

    // SOS: all four components interleaved.
    out.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x0E, 0x04]);
    for id in 1..=4u8 {
        out.extend_from_slice(&[id, 0x00]);
    }
    out.extend_from_slice(&[0x00, 0x3F, 0x00]);

    // One MCU holds four blocks of two zero bits each: one zero byte.
    let mcus = usize::from(width).div_ceil(8) * usize::from(height).div_ceil(8);
    out.extend(std::iter::repeat_n(0x00, mcus));

    out.extend_from_slice(&[0xFF, 0xD9]);
    out
}

fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, format).unwrap();
    buffer.into_inner()
}

fn document_with_boxes(boxes: &[[f32; 4]]) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let resources_id = font_resources(&mut doc);

    let kids: Vec<Object> = boxes
        .iter()
        .enumerate()
        .map(|(index, &page_box)| {
            let content_id = text_stream(&mut doc, index);
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => media_box(page_box),
                "Contents" => content_id,
                "Resources" => resources_id,
            });
            Object::Reference(page_id)
        })
        .collect();

    finish(
        &mut doc,
        pages_id,
        dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => boxes.len() as i64,
        },
    );
    doc
}

fn media_box([llx, lly, urx, ury]: [f32; 4]) -> Object {
    Object::Array(vec![
        Object::Real(llx),
        Object::Real(lly),
        Object::Real(urx),
        Object::Real(ury),
    ])
}

fn font_resources(doc: &mut Document) -> ObjectId {
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    })
}

fn text_stream(doc: &mut Document, index: usize) -> ObjectId {
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![72.into(), 720.into()]),
            Operation::new(
                "Tj",
                vec![Object::string_literal(format!("Order page {}", index + 1))],
            ),
            Operation::new("ET", vec![]),
        ],
    };
    doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()))
}

fn finish(doc: &mut Document, pages_id: ObjectId, pages: Dictionary) {
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
}

fn pages_root(doc: &Document) -> ObjectId {
    doc.catalog()
        .and_then(|c| c.get(b"Pages"))
        .and_then(Object::as_reference)
        .unwrap()
}

fn save(mut doc: Document) -> Vec<u8> {
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}
