use crate::args::InitArgs;
use crate::commands::Out;
use crate::model::Metadata;
use crate::{Config, Result};
use anyhow::{bail, Context};
use std::path::Path;

/// Creates the data directory, its backups subdirectory, an initial `config.json` and an empty
/// form with one blank row per category.
///
/// # Arguments
/// - `budget_home` - The directory that will be the root of data directory, e.g. `$HOME/budget`
/// - `args` - The organization, year and user recorded in the form.
///
/// # Errors
/// - Returns an error if `budget_home` already holds a configuration.
/// - Returns an error if any file operations fail.
pub async fn init(budget_home: &Path, args: &InitArgs) -> Result<Out<()>> {
    if Config::load(budget_home).await.is_ok() {
        bail!(
            "A budget directory already exists at {}",
            budget_home.display()
        );
    }
    let metadata = Metadata::new(args.org(), args.year(), args.user());
    let config = Config::create(budget_home, metadata)
        .await
        .context("Unable to create the data directory and configs")?;
    Ok(format!(
        "Successfully created the budget directory at {}",
        config.root().display()
    )
    .into())
}
