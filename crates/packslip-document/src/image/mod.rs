// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module — embedding JPEG and PNG data as PDF image XObjects.

pub mod embed;

pub use embed::ImageEmbedder;
