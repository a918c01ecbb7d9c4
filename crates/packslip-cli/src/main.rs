// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Packslip — order sheet composition from the command line.
//
// Entry point. Initialises logging, reads every input file concurrently, runs
// the composer on a blocking task and writes the result only once it succeeds.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use packslip_core::{AssetKind, ComposeConfig, CompositionRequest, PackslipError, SourceAsset, StaticSlot};
use packslip_document::PageComposer;

/// Stamp logo/coupon overlays onto an order PDF and append a shipping label.
#[derive(Parser, Debug)]
#[command(name = "packslip", version, about)]
struct Cli {
    /// Order document (PDF). Its first page receives the overlays.
    #[arg(long, env = "PACKSLIP_PRIMARY")]
    primary: PathBuf,

    /// Logo image (PNG/JPEG), placed top-left.
    #[arg(long, env = "PACKSLIP_LOGO")]
    logo: Option<PathBuf>,

    /// Coupon image, placed bottom-left.
    #[arg(long, env = "PACKSLIP_COUPON")]
    coupon: Option<PathBuf>,

    /// Feedback image, placed bottom-right.
    #[arg(long, env = "PACKSLIP_FEEDBACK")]
    feedback: Option<PathBuf>,

    /// Social image, placed bottom-center.
    #[arg(long, env = "PACKSLIP_SOCIAL")]
    social: Option<PathBuf>,

    /// Shipping label appended after the order pages (PDF or image).
    #[arg(long, env = "PACKSLIP_SECONDARY")]
    secondary: Option<PathBuf>,

    /// Layout configuration as JSON; missing fields keep their defaults.
    #[arg(long, env = "PACKSLIP_CONFIG")]
    config: Option<PathBuf>,

    /// Document title written to the PDF metadata.
    #[arg(long)]
    title: Option<String>,

    /// Record the current time as the creation date (output is no longer
    /// byte-reproducible).
    #[arg(long)]
    stamp_date: bool,

    /// Where to write the composed PDF.
    #[arg(short, long)]
    output: PathBuf,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();

    info!("Packslip starting");
    run(cli).await?;
    Ok(())
}

/// Compose according to `cli`; returns the number of bytes written.
async fn run(cli: Cli) -> Result<usize> {
    let mut config = match &cli.config {
        Some(path) => {
            let owned = path.clone();
            tokio::task::spawn_blocking(move || ComposeConfig::load(owned))
                .await
                .context("config task failed")?
                .with_context(|| format!("failed to load config {}", path.display()))?
        }
        None => ComposeConfig::default(),
    };
    if let Some(title) = cli.title.clone() {
        config.metadata.title = Some(title);
    }
    if cli.stamp_date {
        config.metadata.creation_date = Some(Utc::now());
    }

    let (primary, logo, coupon, feedback, social, secondary) = tokio::try_join!(
        read_asset(&cli.primary),
        read_optional(cli.logo.as_deref()),
        read_optional(cli.coupon.as_deref()),
        read_optional(cli.feedback.as_deref()),
        read_optional(cli.social.as_deref()),
        read_optional(cli.secondary.as_deref()),
    )?;

    let mut request = CompositionRequest::new(primary);
    for (slot, asset) in [
        (StaticSlot::Logo, logo),
        (StaticSlot::Coupon, coupon),
        (StaticSlot::Feedback, feedback),
        (StaticSlot::Social, social),
    ] {
        if let Some(asset) = asset {
            request.statics.set(slot, asset);
        }
    }
    request.secondary = secondary;
    debug!(statics = request.statics.len(), secondary = request.secondary.is_some(), "Inputs loaded");

    let composer = PageComposer::new(config);
    let bytes = tokio::task::spawn_blocking(move || composer.compose_to_bytes(&request))
        .await
        .context("composition task failed")??;

    tokio::fs::write(&cli.output, &bytes)
        .await
        .with_context(|| format!("failed to write {}", cli.output.display()))?;
    info!(output = %cli.output.display(), bytes = bytes.len(), "Composed PDF written");
    Ok(bytes.len())
}

/// Read a file and tag it with the media type its extension implies.
async fn read_asset(path: &Path) -> Result<SourceAsset> {
    let ext = path.extension().and_then(OsStr::to_str).unwrap_or_default();
    let media_type = AssetKind::mime_from_extension(ext).ok_or_else(|| {
        PackslipError::UnsupportedMediaType(format!(
            "cannot infer a media type for {}",
            path.display()
        ))
    })?;
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(SourceAsset::new(bytes, media_type))
}

async fn read_optional(path: Option<&Path>) -> Result<Option<SourceAsset>> {
    match path {
        Some(path) => read_asset(path).await.map(Some),
        None => Ok(None),
    }
}
