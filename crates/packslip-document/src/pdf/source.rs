// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Source documents — parse a PDF buffer with `lopdf`, inspect its page tree,
// and graft its pages into another document's object graph.

use std::collections::BTreeSet;

use lopdf::{Dictionary, Document, Object, ObjectId};
use packslip_core::PageSize;
use packslip_core::error::{PackslipError, Result};
use tracing::{debug, instrument, warn};

/// Page attributes a page may inherit from its ancestors in the page tree
/// (ISO 32000-1, 7.7.3.4).
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// A page's MediaBox, in default user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub llx: f32,
    pub lly: f32,
    pub urx: f32,
    pub ury: f32,
}

impl PageBox {
    pub fn from_size(size: PageSize) -> Self {
        Self {
            llx: 0.0,
            lly: 0.0,
            urx: size.width,
            ury: size.height,
        }
    }

    pub fn width(&self) -> f32 {
        (self.urx - self.llx).abs()
    }

    pub fn height(&self) -> f32 {
        (self.ury - self.lly).abs()
    }

    pub fn size(&self) -> PageSize {
        PageSize::new(self.width(), self.height())
    }

    /// Lower-left corner, normalised for boxes written with swapped corners.
    pub fn origin(&self) -> (f32, f32) {
        (self.llx.min(self.urx), self.lly.min(self.ury))
    }

    pub(crate) fn to_object(self) -> Object {
        Object::Array(vec![
            Object::Real(self.llx),
            Object::Real(self.lly),
            Object::Real(self.urx),
            Object::Real(self.ury),
        ])
    }
}

/// A parsed PDF whose pages are about to be copied into the output.
///
/// Wraps `lopdf::Document`; inspection never mutates the parsed graph.
pub struct SourceDocument {
    document: Document,
    /// Page object IDs in reading order.
    page_ids: Vec<ObjectId>,
    /// Effective MediaBox per page, parallel to `page_ids`.
    page_boxes: Vec<PageBox>,
}

impl SourceDocument {
    /// Parse raw PDF bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data).map_err(|err| {
            PackslipError::DecodeError(format!("failed to parse PDF: {}", err))
        })?;

        if document.is_encrypted() {
            return Err(PackslipError::DecodeError(
                "encrypted PDFs are not supported".to_string(),
            ));
        }

        // A document without a page tree root cannot take part in composition.
        pages_root(&document)?;

        let page_ids: Vec<ObjectId> = document.get_pages().values().copied().collect();
        let page_boxes = page_ids
            .iter()
            .map(|&id| {
                effective_media_box(&document, id).unwrap_or_else(|| {
                    warn!(?id, "page has no usable MediaBox, assuming A4");
                    PageBox::from_size(PageSize::A4)
                })
            })
            .collect();

        debug!(pages = page_ids.len(), version = %document.version, "PDF loaded from bytes");

        Ok(Self {
            document,
            page_ids,
            page_boxes,
        })
    }

    // -- Inspection -----------------------------------------------------------

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Intrinsic size of every page, in reading order.
    pub fn page_sizes(&self) -> Vec<PageSize> {
        self.page_boxes.iter().map(PageBox::size).collect()
    }

    /// MediaBox of the page at `index` (0-based).
    pub fn page_box(&self, index: usize) -> Option<PageBox> {
        self.page_boxes.get(index).copied()
    }

    pub fn page_ids(&self) -> &[ObjectId] {
        &self.page_ids
    }

    /// PDF header version, e.g. `"1.7"`.
    pub fn version(&self) -> &str {
        &self.document.version
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Give up the wrapper and take ownership of the parsed graph.
    pub fn into_document(self) -> Document {
        self.document
    }
}

/// Object ID of the root `/Pages` node.
pub(crate) fn pages_root(document: &Document) -> Result<ObjectId> {
    document
        .catalog()
        .map_err(|err| PackslipError::DecodeError(format!("no catalog: {}", err)))
        .and_then(|catalog| {
            catalog
                .get(b"Pages")
                .map_err(|err| PackslipError::DecodeError(format!("no /Pages: {}", err)))
                .and_then(|pages_ref| match pages_ref {
                    Object::Reference(id) => Ok(*id),
                    _ => Err(PackslipError::DecodeError(
                        "/Pages is not a reference".to_string(),
                    )),
                })
        })
}

/// Look up `key` on the page itself, then on each ancestor in turn.
///
/// Returns the first value found, cloned. Cycles in malformed `/Parent`
/// chains terminate the walk.
pub(crate) fn inherited_attribute(
    document: &Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<Object> {
    let mut visited = BTreeSet::new();
    let mut current = Some(page_id);
    while let Some(id) = current {
        if !visited.insert(id) {
            warn!(?id, "cycle in page tree /Parent chain");
            return None;
        }
        let dict = document.get_dictionary(id).ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value.clone());
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }
    None
}

/// Effective MediaBox of a page, following inheritance and indirect arrays.
pub(crate) fn effective_media_box(document: &Document, page_id: ObjectId) -> Option<PageBox> {
    let raw = inherited_attribute(document, page_id, b"MediaBox")?;
    let resolved = match raw {
        Object::Reference(id) => document.get_object(id).ok()?.clone(),
        other => other,
    };
    let arr = resolved.as_array().ok()?;
    if arr.len() != 4 {
        return None;
    }
    let page_box = PageBox {
        llx: number(document, &arr[0])?,
        lly: number(document, &arr[1])?,
        urx: number(document, &arr[2])?,
        ury: number(document, &arr[3])?,
    };
    if page_box.width() <= 0.0 || page_box.height() <= 0.0 {
        return None;
    }
    Some(page_box)
}

fn number(document: &Document, obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(f) => Some(*f),
        Object::Reference(id) => document.get_object(*id).ok().and_then(|o| number(document, o)),
        _ => None,
    }
}

/// Resolve a dictionary-valued entry that may be stored inline or by
/// reference. Missing or mistyped entries yield an empty dictionary.
pub(crate) fn resolved_dict(document: &Document, value: Option<&Object>) -> Dictionary {
    match value {
        Some(Object::Dictionary(d)) => d.clone(),
        Some(Object::Reference(id)) => document
            .get_object(*id)
            .ok()
            .and_then(|o| o.as_dict().ok())
            .cloned()
            .unwrap_or_default(),
        _ => Dictionary::new(),
    }
}

/// Copy inherited attributes onto the page so it can be re-parented without
/// losing its resources or geometry.
fn materialize_inherited(document: &mut Document, page_id: ObjectId) -> Result<()> {
    let mut missing = Vec::new();
    {
        let page = document.get_dictionary(page_id).map_err(|err| {
            PackslipError::DecodeError(format!("cannot read page {:?}: {}", page_id, err))
        })?;
        for key in INHERITABLE {
            if !page.has(key) {
                missing.push(key);
            }
        }
    }

    for key in missing {
        let value = match inherited_attribute(document, page_id, key) {
            Some(value) => value,
            None if key == b"MediaBox" => PageBox::from_size(PageSize::A4).to_object(),
            None => continue,
        };
        let page = document
            .get_dictionary_mut(page_id)
            .map_err(|err| PackslipError::DecodeError(format!("page {:?}: {}", page_id, err)))?;
        page.set(key.to_vec(), value);
    }
    Ok(())
}

/// Append `page_id` (already present in `document.objects`) as the last kid of
/// the root `/Pages` node. `/Kids` and `/Count` may be held by reference.
pub(crate) fn append_page(document: &mut Document, root: ObjectId, page_id: ObjectId) -> Result<()> {
    let (kids, count) = {
        let pages_dict = document
            .get_dictionary(root)
            .map_err(|err| PackslipError::DecodeError(format!("no /Pages dictionary: {}", err)))?;
        let count = match pages_dict.get(b"Count") {
            Ok(Object::Reference(id)) => document.get_object(*id).and_then(Object::as_i64).ok(),
            Ok(other) => other.as_i64().ok(),
            Err(_) => None,
        };
        (pages_dict.get(b"Kids").ok().cloned(), count.unwrap_or(0))
    };

    match kids {
        Some(Object::Reference(kids_id)) => {
            document
                .get_object_mut(kids_id)
                .and_then(Object::as_array_mut)
                .map_err(|err| {
                    PackslipError::DecodeError(format!("/Kids {:?} is not an array: {}", kids_id, err))
                })?
                .push(Object::Reference(page_id));
        }
        kids => {
            let mut kids = match kids {
                Some(Object::Array(kids)) => kids,
                _ => Vec::new(),
            };
            kids.push(Object::Reference(page_id));
            document
                .get_dictionary_mut(root)
                .map_err(|err| PackslipError::DecodeError(format!("no /Pages dictionary: {}", err)))?
                .set("Kids", Object::Array(kids));
        }
    }

    // /Count is always rewritten inline.
    document
        .get_dictionary_mut(root)
        .map_err(|err| PackslipError::DecodeError(format!("no /Pages dictionary: {}", err)))?
        .set("Count", Object::Integer(count + 1));

    let page_dict = document
        .get_dictionary_mut(page_id)
        .map_err(|err| PackslipError::DecodeError(format!("page {:?}: {}", page_id, err)))?;
    page_dict.set("Parent", Object::Reference(root));
    Ok(())
}

/// Graft every page of `source` onto the end of `target`'s page tree.
///
/// The source graph is renumbered above `target.max_id` and moved over
/// wholesale; its catalog and intermediate page-tree nodes become unreachable
/// and are pruned at serialization. Returns the new page IDs in order.
#[instrument(skip_all, fields(pages = source.page_count()))]
pub(crate) fn import_pages(target: &mut Document, source: SourceDocument) -> Result<Vec<ObjectId>> {
    let root = pages_root(target)?;
    if source.version() > target.version.as_str() {
        target.version = source.version().to_string();
    }
    let mut src = source.into_document();

    let original_ids: Vec<ObjectId> = src.get_pages().values().copied().collect();
    for &page_id in &original_ids {
        materialize_inherited(&mut src, page_id)?;
    }

    let start_id = target.max_id + 1;
    src.renumber_objects_with(start_id);
    let page_ids: Vec<ObjectId> = src.get_pages().values().copied().collect();
    if src.max_id > target.max_id {
        target.max_id = src.max_id;
    }
    target.objects.extend(src.objects);

    for &page_id in &page_ids {
        append_page(target, root, page_id)?;
    }

    debug!(imported = page_ids.len(), max_id = target.max_id, "Pages grafted");
    Ok(page_ids)
}
