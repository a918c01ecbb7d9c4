// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer — turn a composed object graph into bytes.
//
// Finalisation checks the page count against the composer's manifest, stamps
// the /Info dictionary, nulls out references to objects that do not exist,
// drops unreachable objects (e.g. the secondary's old catalog), renumbers and
// writes everything to memory. Nothing is returned unless every step passed.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use lopdf::{Document, Object, ObjectId, text_string};
use packslip_core::config::{ComposeConfig, DocumentMetadata};
use packslip_core::error::{PackslipError, Result};
use tracing::{debug, info, instrument, warn};

use crate::pdf::compose::OutputDocument;
use crate::pdf::source::resolved_dict;

/// Soft masks need PDF 1.4.
const MIN_VERSION: &str = "1.4";

/// Serializes composed documents.
pub struct PdfWriter {
    metadata: DocumentMetadata,
    /// Flate-compress streams that carry no filter yet.
    compress: bool,
}

impl PdfWriter {
    pub fn new(metadata: DocumentMetadata) -> Self {
        Self {
            metadata,
            compress: true,
        }
    }

    pub fn from_config(config: &ComposeConfig) -> Self {
        Self {
            metadata: config.metadata.clone(),
            compress: config.compress,
        }
    }

    /// Serialize `output` into a complete PDF byte buffer.
    #[instrument(skip_all, fields(pages = output.page_count()))]
    pub fn finalize(&self, output: OutputDocument) -> Result<Vec<u8>> {
        let OutputDocument {
            mut document,
            pages,
        } = output;

        let tree_pages = document.get_pages().len();
        if tree_pages != pages.len() {
            return Err(PackslipError::SerializationError(format!(
                "page tree holds {} pages but {} were composed",
                tree_pages,
                pages.len()
            )));
        }

        if document.version.as_str() < MIN_VERSION {
            document.version = MIN_VERSION.to_string();
        }
        write_info(&mut document, &self.metadata);

        let repaired = scrub_dangling(&mut document);
        if repaired > 0 {
            warn!(repaired, "Replaced references to missing objects with null");
        }

        let pruned = document.prune_objects();
        document.renumber_objects();
        if self.compress {
            document.compress();
        }
        debug!(pruned = pruned.len(), objects = document.objects.len(), "Object graph finalised");

        let mut buffer = Vec::new();
        document.save_to(&mut buffer).map_err(|err| {
            PackslipError::SerializationError(format!("failed to write PDF: {}", err))
        })?;

        info!(pages = pages.len(), bytes = buffer.len(), "PDF serialised");
        Ok(buffer)
    }
}

/// Merge the configured metadata into the trailer's `/Info` dictionary.
fn write_info(document: &mut Document, metadata: &DocumentMetadata) {
    let existing = document.trailer.get(b"Info").ok().cloned();
    let mut info = resolved_dict(document, existing.as_ref());

    // Text strings: PDFDocEncoding when ASCII, otherwise UTF-16BE with a BOM.
    info.set("Producer", text_string(&metadata.producer));
    if let Some(title) = &metadata.title {
        info.set("Title", text_string(title));
    }
    if let Some(created) = metadata.creation_date {
        let stamp = pdf_date(created);
        info.set("CreationDate", Object::string_literal(stamp.as_str()));
        info.set("ModDate", Object::string_literal(stamp.as_str()));
    }

    match existing {
        Some(Object::Reference(id)) if document.objects.contains_key(&id) => {
            document.objects.insert(id, Object::Dictionary(info));
        }
        _ => {
            let id = document.add_object(info);
            document.trailer.set("Info", Object::Reference(id));
        }
    }
}

/// PDF date string (ISO 32000-1, 7.9.4) in UTC.
pub fn pdf_date(timestamp: DateTime<Utc>) -> String {
    timestamp.format("D:%Y%m%d%H%M%SZ").to_string()
}

/// Replace every reference to a missing object with `null`; returns how many
/// were replaced.
fn scrub_dangling(document: &mut Document) -> usize {
    let known: BTreeSet<ObjectId> = document.objects.keys().copied().collect();
    let mut repaired = 0;
    for object in document.objects.values_mut() {
        repaired += scrub(object, &known);
    }
    for (_, value) in document.trailer.iter_mut() {
        repaired += scrub(value, &known);
    }
    repaired
}

fn scrub(object: &mut Object, known: &BTreeSet<ObjectId>) -> usize {
    if let Object::Reference(id) = *object {
        if known.contains(&id) {
            return 0;
        }
        *object = Object::Null;
        return 1;
    }
    match object {
        Object::Array(items) => items.iter_mut().map(|item| scrub(item, known)).sum(),
        Object::Dictionary(dict) => dict.iter_mut().map(|(_, value)| scrub(value, known)).sum(),
        Object::Stream(stream) => stream
            .dict
            .iter_mut()
            .map(|(_, value)| scrub(value, known))
            .sum(),
        _ => 0,
    }
}
