// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Layout configuration, passed by value into every composition call.

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PackslipError, Result};
use crate::types::{Anchor, Margins, PageSize, PlacementSpec, StaticSlot};

/// Metadata written into the output's `/Info` dictionary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentMetadata {
    pub producer: String,
    pub title: Option<String>,
    /// Supplied by the caller; the core never reads the clock.
    pub creation_date: Option<DateTime<Utc>>,
}

impl Default for DocumentMetadata {
    fn default() -> Self {
        Self {
            producer: "packslip".to_string(),
            title: None,
            creation_date: None,
        }
    }
}

/// Composition settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposeConfig {
    /// Margins applied to page 0 when anchoring overlays.
    pub margins: Margins,
    /// Horizontal gap between neighbours in the same band.
    pub band_spacing: f32,
    /// Slot layouts in priority order. Bottom-band X positions depend on this
    /// order.
    pub slots: Vec<PlacementSpec>,
    /// Page size used when the primary document has no pages at all.
    pub blank_canvas: PageSize,
    pub metadata: DocumentMetadata,
    /// Flate-compress uncompressed streams on output.
    pub compress: bool,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            margins: Margins::default(),
            band_spacing: 15.0,
            slots: vec![
                PlacementSpec::new(StaticSlot::Logo, Anchor::TopLeft, 200.0, 100.0),
                PlacementSpec::new(StaticSlot::Coupon, Anchor::BottomLeft, 180.0, 120.0),
                PlacementSpec::new(StaticSlot::Social, Anchor::BottomCenter, 180.0, 120.0),
                PlacementSpec::new(StaticSlot::Feedback, Anchor::BottomRight, 180.0, 120.0),
            ],
            blank_canvas: PageSize::A4,
            metadata: DocumentMetadata::default(),
            compress: true,
        }
    }
}

impl ComposeConfig {
    /// Parse a (possibly partial) JSON document on top of the defaults and
    /// validate the result.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Layout entry for `slot`, if one is configured.
    pub fn slot(&self, slot: StaticSlot) -> Option<&PlacementSpec> {
        self.slots.iter().find(|spec| spec.slot == slot)
    }

    /// Reject geometry that would make layout meaningless.
    pub fn validate(&self) -> Result<()> {
        let m = &self.margins;
        for (name, value) in [
            ("margins.top", m.top),
            ("margins.bottom", m.bottom),
            ("margins.left", m.left),
            ("margins.right", m.right),
            ("band_spacing", self.band_spacing),
        ] {
            non_negative(name, value)?;
        }

        for (name, value) in [
            ("blank_canvas.width", self.blank_canvas.width),
            ("blank_canvas.height", self.blank_canvas.height),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(PackslipError::InvalidConfig(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }

        let mut seen = HashSet::new();
        for spec in &self.slots {
            if !seen.insert(spec.slot) {
                return Err(PackslipError::InvalidConfig(format!(
                    "slot {} configured more than once",
                    spec.slot
                )));
            }
            for (axis, bound) in [("max_width", spec.max_width), ("max_height", spec.max_height)] {
                if let Some(value) = bound
                    && (!value.is_finite() || value <= 0.0)
                {
                    return Err(PackslipError::InvalidConfig(format!(
                        "slot {} {axis} must be positive, got {value}",
                        spec.slot
                    )));
                }
            }
        }

        Ok(())
    }
}

fn non_negative(name: &str, value: f32) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(PackslipError::InvalidConfig(format!(
            "{name} must be a non-negative number, got {value}"
        )))
    }
}
