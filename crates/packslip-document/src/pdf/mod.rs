// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — parsing sources, composing the output graph, and serializing it.

pub mod compose;
pub mod source;
pub mod writer;

pub use compose::PageComposer;
pub use source::SourceDocument;
pub use writer::PdfWriter;
