//! Conversion between the in-memory `Dataset` and its document representations: the JSON
//! document, the tagged HTML document and the CSV spreadsheet.

mod html;
mod json;
mod spreadsheet;

pub use html::{
    from_tagged_document, to_live_document, to_static_document, verify_tagged_fields, StaticDocument,
};
pub use json::{from_json, snapshot, to_json, JsonDocument, JsonSection};
pub use spreadsheet::to_csv;

use crate::error::BudgetError;
use crate::model::Dataset;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// The two document formats that can be imported.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Json,
    Html,
}

serde_plain::derive_display_from_serialize!(Format);
serde_plain::derive_fromstr_from_deserialize!(Format);

impl Format {
    /// Decides the format of a file. A known extension wins; otherwise the first
    /// non-whitespace character must be `{` (JSON) or `<` (HTML).
    pub fn sniff(path: Option<&Path>, content: &str) -> Result<Format, BudgetError> {
        let extension = path
            .and_then(Path::extension)
            .map(|e| e.to_string_lossy().to_lowercase());
        match extension.as_deref() {
            Some("json") => return Ok(Format::Json),
            Some("html") | Some("htm") => return Ok(Format::Html),
            _ => {}
        }

        match content.trim_start_matches('\u{feff}').trim_start().chars().next() {
            Some('{') => Ok(Format::Json),
            Some('<') => Ok(Format::Html),
            Some(c) => Err(BudgetError::format(format!(
                "cannot tell the document format from its first character '{c}'"
            ))),
            None => Err(BudgetError::format("the document is empty")),
        }
    }
}

/// Parses a JSON or tagged HTML document into a `Dataset`. Nothing is returned unless the whole
/// document parses.
///
/// `path` is used for format detection and, for HTML documents that carry no organization name,
/// the file stem becomes the organization.
pub fn import(path: Option<&Path>, content: &str) -> Result<Dataset, BudgetError> {
    let format = Format::sniff(path, content)?;
    debug!("Importing document as {format}");
    match format {
        Format::Json => from_json(content),
        Format::Html => {
            let stem = path
                .and_then(Path::file_stem)
                .map(|s| s.to_string_lossy().to_string());
            from_tagged_document(content, stem.as_deref())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_by_extension() {
        let p = Path::new("x/report.JSON");
        assert_eq!(Format::sniff(Some(p), "<html>").unwrap(), Format::Json);
        let p = Path::new("report.htm");
        assert_eq!(Format::sniff(Some(p), "{").unwrap(), Format::Html);
    }

    #[test]
    fn test_sniff_by_content() {
        assert_eq!(Format::sniff(None, "  \n{\"a\":1}").unwrap(), Format::Json);
        assert_eq!(
            Format::sniff(Some(Path::new("backup.txt")), "\u{feff}<!DOCTYPE html>").unwrap(),
            Format::Html
        );
    }

    #[test]
    fn test_sniff_rejects_unknown() {
        assert!(matches!(
            Format::sniff(None, "name,rev\n"),
            Err(BudgetError::Format(_))
        ));
        assert!(matches!(Format::sniff(None, "   "), Err(BudgetError::Format(_))));
    }

    #[test]
    fn test_import_html_uses_file_stem() {
        let html = r#"<table><tbody id="tbody-op"><tr><td><input class="v-name" value="甲"></td></tr></tbody></table>"#;
        let d = import(Some(Path::new("/tmp/臺北市.html")), html).unwrap();
        assert_eq!(d.metadata().org, "臺北市");
    }
}
