// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page composer — build the output graph from the primary document, the static
// overlays and the secondary asset.
//
// The primary's parsed graph becomes the output document. Its pages stay where
// they are; page 0 gains the overlay draws on top of its existing content.
// The secondary asset is appended afterwards: a PDF contributes all of its
// pages verbatim, an image gets one page of its own pixel size.

use std::collections::HashMap;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use packslip_core::config::ComposeConfig;
use packslip_core::error::{PackslipError, Result};
use packslip_core::types::{
    CompositionRequest, PageSize, ResolvedPlacement, SourceAsset, StaticAssets, StaticSlot,
};
use tracing::{debug, info, instrument};

use crate::asset::{RasterImage, ResolvedAsset, resolve};
use crate::image::embed::{EmbeddedImage, ImageEmbedder};
use crate::layout::{Canvas, LayoutEngine, PlacementRequest};
use crate::pdf::source::{
    PageBox, SourceDocument, append_page, import_pages, inherited_attribute, pages_root,
    resolved_dict,
};
use crate::pdf::writer::PdfWriter;

/// Where an output page came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOrigin {
    /// Page `n` (0-based) of the primary document.
    Primary(usize),
    /// Canvas page added because the primary had no pages.
    Blank,
    /// Page `n` (0-based) of the secondary document.
    Secondary(usize),
    /// Page generated to hold a secondary image.
    SecondaryImage,
}

/// An image drawn onto an output page.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageDraw {
    /// The static slot the image came from; `None` for the secondary image.
    pub slot: Option<StaticSlot>,
    pub handle: ObjectId,
    /// Name under the page's `/XObject` resources.
    pub resource_name: String,
    pub placement: ResolvedPlacement,
}

/// What the composer did to one output page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageManifest {
    pub size: PageSize,
    pub origin: PageOrigin,
    /// Draws added by the composer, in painting order.
    pub draws: Vec<ImageDraw>,
}

/// The finished-but-unserialized composition.
pub struct OutputDocument {
    pub(crate) document: Document,
    pub(crate) pages: Vec<PageManifest>,
}

impl OutputDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// One entry per output page, in order.
    pub fn pages(&self) -> &[PageManifest] {
        &self.pages
    }

    pub fn document(&self) -> &Document {
        &self.document
    }
}

/// Composes order documents.
///
/// Stateless apart from its configuration: every call to
/// [`PageComposer::compose`] builds an isolated output graph, so one composer
/// can serve concurrent callers.
#[derive(Debug, Clone, Default)]
pub struct PageComposer {
    config: ComposeConfig,
}

impl PageComposer {
    pub fn new(config: ComposeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ComposeConfig {
        &self.config
    }

    /// Compose and serialize in one step.
    pub fn compose_to_bytes(&self, request: &CompositionRequest) -> Result<Vec<u8>> {
        let output = self.compose(request)?;
        PdfWriter::from_config(&self.config).finalize(output)
    }

    /// Build the output graph for `request`.
    #[instrument(skip_all, fields(statics = request.statics.len(), secondary = request.secondary.is_some()))]
    pub fn compose(&self, request: &CompositionRequest) -> Result<OutputDocument> {
        self.config.validate()?;
        for slot in request.statics.slots() {
            if self.config.slot(slot).is_none() {
                return Err(PackslipError::InvalidConfig(format!(
                    "asset supplied for slot {} but no layout is configured for it",
                    slot
                )));
            }
        }

        let primary = request
            .primary
            .as_ref()
            .ok_or_else(|| PackslipError::MissingRequiredInput("primary document".to_string()))?;
        let source = load_primary(primary)?;

        info!(
            primary_pages = source.page_count(),
            statics = request.statics.len(),
            "Composing document"
        );

        let mut pages: Vec<PageManifest> = source
            .page_sizes()
            .into_iter()
            .enumerate()
            .map(|(index, size)| PageManifest {
                size,
                origin: PageOrigin::Primary(index),
                draws: Vec::new(),
            })
            .collect();
        let first_box = source.page_box(0);
        let first_page = source.page_ids().first().copied();
        let mut document = source.into_document();
        let mut embedder = ImageEmbedder::new();

        let (canvas_page, canvas_box) = match (first_page, first_box) {
            (Some(id), Some(page_box)) => (id, page_box),
            _ => {
                let size = self.config.blank_canvas;
                debug!(?size, "Primary has no pages, adding a blank canvas");
                let id = add_blank_page(&mut document, size)?;
                pages.push(PageManifest {
                    size,
                    origin: PageOrigin::Blank,
                    draws: Vec::new(),
                });
                (id, PageBox::from_size(size))
            }
        };

        let mut draws =
            self.place_statics(&mut document, &mut embedder, &request.statics, canvas_box)?;
        if !draws.is_empty() {
            stamp_page(&mut document, canvas_page, &mut draws)?;
            pages[0].draws = draws;
        }

        if let Some(secondary) = &request.secondary {
            match resolve(secondary)? {
                ResolvedAsset::Document(secondary_doc) => {
                    let sizes = secondary_doc.page_sizes();
                    import_pages(&mut document, secondary_doc)?;
                    pages.extend(sizes.into_iter().enumerate().map(|(index, size)| {
                        PageManifest {
                            size,
                            origin: PageOrigin::Secondary(index),
                            draws: Vec::new(),
                        }
                    }));
                }
                ResolvedAsset::Image(image) => {
                    pages.push(append_image_page(&mut document, &mut embedder, &image)?);
                }
            }
        }

        info!(
            pages = pages.len(),
            images = embedder.len(),
            "Composition assembled"
        );
        Ok(OutputDocument { document, pages })
    }

    /// Embed every supplied static asset and lay them out on the canvas, in
    /// the configured priority order.
    fn place_statics(
        &self,
        document: &mut Document,
        embedder: &mut ImageEmbedder,
        statics: &StaticAssets,
        canvas_box: PageBox,
    ) -> Result<Vec<ImageDraw>> {
        let mut embedded: Vec<(StaticSlot, EmbeddedImage)> = Vec::new();
        let mut requests: Vec<PlacementRequest> = Vec::new();

        for spec in &self.config.slots {
            let Some(asset) = statics.get(spec.slot) else {
                continue;
            };
            let image = match resolve(asset)? {
                ResolvedAsset::Image(image) => image,
                other => {
                    return Err(PackslipError::UnsupportedMediaType(format!(
                        "slot {} needs a JPEG or PNG image, got {}",
                        spec.slot,
                        other.media_type()
                    )));
                }
            };
            let image = embedder.embed(document, &image)?;
            requests.push(PlacementRequest {
                intrinsic_width: image.intrinsic_width as f32,
                intrinsic_height: image.intrinsic_height as f32,
                anchor: spec.anchor,
                max_width: spec.max_width,
                max_height: spec.max_height,
            });
            embedded.push((spec.slot, image));
        }

        let (x0, y0) = canvas_box.origin();
        let canvas = Canvas {
            x0,
            y0,
            width: canvas_box.width(),
            height: canvas_box.height(),
        };
        let placements = LayoutEngine::new(self.config.margins, self.config.band_spacing)
            .resolve(canvas, &requests);

        Ok(embedded
            .into_iter()
            .zip(placements)
            .map(|((slot, image), placement)| {
                debug!(%slot, ?placement, "Overlay placed");
                ImageDraw {
                    slot: Some(slot),
                    handle: image.handle,
                    resource_name: image.resource_name,
                    placement,
                }
            })
            .collect())
    }
}

/// Resolve the primary asset, reporting every failure in terms of the primary.
fn load_primary(primary: &SourceAsset) -> Result<SourceDocument> {
    match resolve(primary) {
        Ok(ResolvedAsset::Document(document)) => Ok(document),
        Ok(ResolvedAsset::Image(image)) => Err(PackslipError::InvalidPrimaryFormat(format!(
            "primary must be application/pdf, got {}",
            image.format.mime_type()
        ))),
        Err(PackslipError::DecodeError(reason)) => Err(PackslipError::InvalidPrimaryFormat(reason)),
        Err(other) => Err(other),
    }
}

/// Append an empty page of `size` to the document's page tree.
fn add_blank_page(document: &mut Document, size: PageSize) -> Result<ObjectId> {
    let root = pages_root(document)?;
    let page_id = document.add_object(dictionary! {
        "Type" => "Page",
        "MediaBox" => PageBox::from_size(size).to_object(),
        "Resources" => Dictionary::new(),
    });
    append_page(document, root, page_id)?;
    Ok(page_id)
}

/// Append a page sized to the image's pixel dimensions showing the image at
/// full size.
fn append_image_page(
    document: &mut Document,
    embedder: &mut ImageEmbedder,
    image: &RasterImage<'_>,
) -> Result<PageManifest> {
    let embedded = embedder.embed(document, image)?;
    let size = PageSize::new(
        embedded.intrinsic_width as f32,
        embedded.intrinsic_height as f32,
    );
    let page_id = add_blank_page(document, size)?;
    let mut draws = vec![ImageDraw {
        slot: None,
        handle: embedded.handle,
        resource_name: embedded.resource_name,
        placement: ResolvedPlacement {
            x: 0.0,
            y: 0.0,
            width: size.width,
            height: size.height,
        },
    }];
    stamp_page(document, page_id, &mut draws)?;
    debug!(?size, "Secondary image page appended");
    Ok(PageManifest {
        size,
        origin: PageOrigin::SecondaryImage,
        draws,
    })
}

/// Register the draws' images in the page's resources and paint them above
/// the existing content.
///
/// Resource names are made unique against what the page already uses; the
/// final names are written back into `draws`.
fn stamp_page(document: &mut Document, page_id: ObjectId, draws: &mut [ImageDraw]) -> Result<()> {
    let inherited = inherited_attribute(document, page_id, b"Resources");
    let mut resources = resolved_dict(document, inherited.as_ref());
    let mut xobjects = resolved_dict(document, resources.get(b"XObject").ok());

    let mut names: HashMap<ObjectId, String> = HashMap::new();
    for draw in draws.iter_mut() {
        let name = match names.get(&draw.handle) {
            Some(name) => name.clone(),
            None => {
                let name = unique_name(&xobjects, &draw.resource_name);
                xobjects.set(name.as_bytes().to_vec(), Object::Reference(draw.handle));
                names.insert(draw.handle, name.clone());
                name
            }
        };
        draw.resource_name = name;
    }
    resources.set("XObject", Object::Dictionary(xobjects));

    let mut operations = Vec::with_capacity(draws.len() * 4);
    for draw in draws.iter() {
        let p = draw.placement;
        operations.push(Operation::new("q", vec![]));
        operations.push(Operation::new(
            "cm",
            vec![
                Object::Real(p.width),
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(p.height),
                Object::Real(p.x),
                Object::Real(p.y),
            ],
        ));
        operations.push(Operation::new(
            "Do",
            vec![Object::Name(draw.resource_name.as_bytes().to_vec())],
        ));
        operations.push(Operation::new("Q", vec![]));
    }
    let overlay = Content { operations }.encode().map_err(|err| {
        PackslipError::SerializationError(format!("failed to encode overlay content: {}", err))
    })?;

    let existing = existing_contents(document, page_id)?;
    // The existing content is bracketed by q/Q so any graphics state it leaves
    // behind does not apply to the overlay.
    let open = document.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let mut close_bytes = b"Q\n".to_vec();
    close_bytes.extend_from_slice(&overlay);
    let close = document.add_object(Stream::new(Dictionary::new(), close_bytes));

    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(Object::Reference(open));
    contents.extend(existing);
    contents.push(Object::Reference(close));

    let page = document.get_dictionary_mut(page_id).map_err(|err| {
        PackslipError::SerializationError(format!("cannot update page {:?}: {}", page_id, err))
    })?;
    page.set("Resources", Object::Dictionary(resources));
    page.set("Contents", Object::Array(contents));
    Ok(())
}

/// The page's content stream references, flattened into one list.
fn existing_contents(document: &Document, page_id: ObjectId) -> Result<Vec<Object>> {
    let page = document.get_dictionary(page_id).map_err(|err| {
        PackslipError::SerializationError(format!("cannot read page {:?}: {}", page_id, err))
    })?;
    Ok(match page.get(b"Contents") {
        Ok(Object::Reference(id)) => match document.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Array(items)) => items.clone(),
        _ => Vec::new(),
    })
}

/// `base`, or `base_1`, `base_2`, ... whichever is free in `xobjects`.
fn unique_name(xobjects: &Dictionary, base: &str) -> String {
    if !xobjects.has(base.as_bytes()) {
        return base.to_string();
    }
    (1..)
        .map(|n| format!("{base}_{n}"))
        .find(|candidate| !xobjects.has(candidate.as_bytes()))
        .unwrap_or_else(|| base.to_string())
}
