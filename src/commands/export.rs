//! Writes the working form to a file.

use crate::args::{ExportArgs, ExportFormat};
use crate::commands::Out;
use crate::error::BudgetError;
use crate::normalize::{self, StaticDocument};
use crate::{utils, Config, Result};
use anyhow::Context;
use serde::Serialize;
use std::path::PathBuf;

/// What `export` wrote.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct ExportReport {
    pub path: PathBuf,
    pub format: ExportFormat,
    /// The format actually written, which differs from `format` when the static report failed
    /// its self-check and the live document was written instead.
    pub written: ExportFormat,
    pub bytes: usize,
}

/// Serializes the form in the requested format and writes it to the output path.
///
/// # Errors
/// - `BudgetError::EmptyReport` when no user-entered field holds a value, unless forced.
/// - Returns an error if the file cannot be written.
pub async fn export(config: &Config, args: &ExportArgs) -> Result<Out<ExportReport>> {
    let form = config.load_form().await?;
    if !args.force() && !form.has_content() {
        return Err(BudgetError::EmptyReport.into());
    }

    let mut written = args.format();
    let mut note = String::new();
    let content = match args.format() {
        ExportFormat::Json => serde_json::to_string_pretty(&normalize::to_json(&form))
            .context("Unable to serialize the form")?,
        ExportFormat::Html => normalize::to_live_document(&form),
        ExportFormat::StaticHtml => {
            let StaticDocument { html, degraded } = normalize::to_static_document(&form);
            if let Some(e) = degraded {
                written = ExportFormat::Html;
                note = format!(" ({e}; wrote the editable form instead)");
            }
            html
        }
        ExportFormat::Csv => normalize::to_csv(&form)?,
    };

    let path = args.output().to_path_buf();
    utils::write(&path, &content).await?;

    Ok(Out::new(
        format!("Exported the form as {written} to {}{note}", path.display()),
        ExportReport {
            path,
            format: args.format(),
            written,
            bytes: content.len(),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::{FieldAssignment, RowAddArgs};
    use crate::commands::row_add;
    use crate::model::{CategoryId, FieldKey};
    use crate::test::TestEnv;

    #[tokio::test]
    async fn test_empty_report() {
        let env = TestEnv::new().await;
        let output = env.path("out.json");
        let err = export(
            &env.config(),
            &ExportArgs::new(ExportFormat::Json, &output, false),
        )
        .await
        .unwrap_err();
        assert_eq!(
            err.downcast_ref::<BudgetError>(),
            Some(&BudgetError::EmptyReport)
        );
        assert!(!output.exists());

        export(
            &env.config(),
            &ExportArgs::new(ExportFormat::Json, &output, true),
        )
        .await
        .unwrap();
        assert!(output.is_file());
    }

    #[tokio::test]
    async fn test_every_format() {
        let env = TestEnv::new().await;
        let config = env.config();
        row_add(
            &config,
            &RowAddArgs::new(
                CategoryId::Sp,
                vec![
                    FieldAssignment::new(FieldKey::Name, "特別收入"),
                    FieldAssignment::new(FieldKey::Source, "1200"),
                ],
            ),
        )
        .await
        .unwrap();

        for (format, name) in [
            (ExportFormat::Json, "out.json"),
            (ExportFormat::Html, "out.html"),
            (ExportFormat::StaticHtml, "static.html"),
            (ExportFormat::Csv, "out.csv"),
        ] {
            let output = env.path(name);
            let out = export(&config, &ExportArgs::new(format, &output, false))
                .await
                .unwrap();
            let report = out.structure().unwrap();
            assert_eq!(report.written, format);
            let content = utils::read(&output).await.unwrap();
            assert_eq!(report.bytes, content.len());
            assert!(content.contains("特別收入"), "{format}");
        }

        let html = utils::read(&env.path("static.html")).await.unwrap();
        assert!(html.contains("1,200"));
    }
}
