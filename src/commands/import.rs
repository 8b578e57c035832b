//! Replaces the working form with an imported document.

use crate::backup::FORM;
use crate::commands::Out;
use crate::model::Metadata;
use crate::{normalize, utils, Config, Result};
use anyhow::Context;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// What `import` did.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct ImportReport {
    pub source: PathBuf,
    pub backup: PathBuf,
    pub metadata: Metadata,
    pub funds: usize,
}

/// Parses `path` as a JSON or tagged HTML document and, if the whole document parses, backs up
/// the current form and replaces it. The form is left untouched on any error.
pub async fn import(config: &Config, path: &Path) -> Result<Out<ImportReport>> {
    let content = utils::read(path).await?;
    let dataset = normalize::import(Some(path), &content)
        .with_context(|| format!("Unable to import {}", path.display()))?;
    debug!("Parsed {} named rows from {}", dataset.named_items(), path.display());

    let current = config.load_form().await?;
    let backup = config.backup().save_json(FORM, &current).await?;
    config.save_form(&dataset).await?;

    let funds = dataset.named_items();
    let metadata = dataset.metadata().clone();
    Ok(Out::new(
        format!(
            "Imported {funds} fund{} for '{}' from {} (previous form saved to {})",
            if funds == 1 { "" } else { "s" },
            metadata.org,
            path.display(),
            backup.display()
        ),
        ImportReport {
            source: path.to_path_buf(),
            backup,
            metadata,
            funds,
        },
    ))
}
