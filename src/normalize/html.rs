//! The tagged HTML document format.
//!
//! Both exporters lay the form out the same way so that either file can be imported again:
//!
//! - metadata elements have the ids `mgr-org`, `mgr-year` and `mgr-user`
//! - the rows of a category live in `<tbody id="tbody-<category>">`
//! - each field of a row is the element with class `v-<field>`
//! - totals live in `<tfoot id="tfoot-<category>">` with class `t-<field>`
//!
//! The live document keeps `<input>` elements with `value` attributes. The static document
//! replaces them with `<span>` text carrying the same classes, numbers written with thousands
//! separators.

use crate::error::BudgetError;
use crate::model::{strip_grouping, CategoryId, Dataset, FieldKey, LineItem, Metadata};
use crate::schema::{label_for, schema};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::fmt::Write;
use std::sync::LazyLock;
use tracing::{debug, warn};

static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\S.*?)\s+(\d+)\s*年度").expect("valid title regex")
});

const STYLE: &str = "body{font-family:sans-serif;margin:2rem;color:#1e293b}\
header label{margin-right:1.5rem}\
.section-card{border-top:4px solid;padding:1rem;margin-bottom:1.5rem}\
.budget-table{border-collapse:collapse;width:100%;font-size:.875rem}\
.budget-table th,.budget-table td{border:1px solid #cbd5e1;padding:.25rem .5rem;text-align:right}\
.budget-table .v-name{text-align:left}\
tfoot{font-weight:bold;background:#f8fafc}\
.neg{color:#dc2626}";

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum Mode {
    Live,
    Static,
}

/// The result of a static export.
#[derive(Debug, Clone)]
pub struct StaticDocument {
    pub html: String,
    /// Set when the static rendering failed its self-check and `html` is the live document.
    pub degraded: Option<BudgetError>,
}

/// Renders the form with editable fields.
pub fn to_live_document(dataset: &Dataset) -> String {
    render(dataset, Mode::Live)
}

/// Renders the form as a read-only report.
///
/// The rendered document is parsed back and its tagged fields counted. If the count does not
/// match the form, the live document is returned instead, since it is always importable.
pub fn to_static_document(dataset: &Dataset) -> StaticDocument {
    checked_static(dataset, render(dataset, Mode::Static))
}

/// Keeps the static rendering `html` of `dataset` if every tagged field can be found in it,
/// otherwise swaps in the live document.
fn checked_static(dataset: &Dataset, html: String) -> StaticDocument {
    let expected = dataset
        .sections()
        .iter()
        .map(|s| s.len() * s.schema().fields.len())
        .sum();
    match verify_tagged_fields(&html, expected) {
        Ok(()) => StaticDocument {
            html,
            degraded: None,
        },
        Err(e) => {
            warn!("{e}; exporting the editable document instead");
            StaticDocument {
                html: to_live_document(dataset),
                degraded: Some(e),
            }
        }
    }
}

/// Counts the static `v-<field>` elements inside the category bodies of `html`.
pub fn verify_tagged_fields(html: &str, expected: usize) -> Result<(), BudgetError> {
    let doc = Html::parse_document(html);
    let mut found = 0;
    for category in CategoryId::ALL {
        for &key in schema(category).fields {
            let sel = selector(&format!("#tbody-{category} span.v-{key}"))?;
            found += doc.select(&sel).count();
        }
    }
    if found != expected {
        return Err(BudgetError::StructuralMismatch { expected, found });
    }
    Ok(())
}

/// Parses a tagged HTML document.
///
/// Metadata is read from the `mgr-*` elements, then from a `<title>` of the form
/// `<org> <year>年度...`, and finally the organization falls back to `fallback_org` (the file
/// name). Rows without a name are dropped. Numbers are trimmed and their thousands separators
/// removed; every other value is taken verbatim.
pub fn from_tagged_document(
    content: &str,
    fallback_org: Option<&str>,
) -> Result<Dataset, BudgetError> {
    let doc = Html::parse_document(content);

    let mut dataset = Dataset::new(metadata(&doc, fallback_org)?);
    let mut tables = 0;
    for category in CategoryId::ALL {
        let body = selector(&format!("#tbody-{category}"))?;
        if doc.select(&body).next().is_none() {
            continue;
        }
        tables += 1;

        let rows = selector(&format!("#tbody-{category} tr"))?;
        let mut items = Vec::new();
        for row in doc.select(&rows) {
            let item = line_item(category, row)?;
            if item.has_name() {
                items.push(item);
            }
        }
        debug!("Read {} rows of '{category}'", items.len());
        dataset.set_items(category, items);
    }

    if tables == 0 {
        return Err(BudgetError::format(
            "the HTML document has no fund category tables",
        ));
    }
    dataset.ensure_rows();
    dataset.recompute();
    Ok(dataset)
}

fn selector(css: &str) -> Result<Selector, BudgetError> {
    Selector::parse(css).map_err(|_| BudgetError::format(format!("invalid selector '{css}'")))
}

/// The value of an editable element, or the text of a static one.
fn element_text(element: ElementRef<'_>) -> String {
    match element.value().attr("value") {
        Some(value) => value.to_string(),
        None => element.text().collect(),
    }
}

fn line_item(category: CategoryId, row: ElementRef<'_>) -> Result<LineItem, BudgetError> {
    let schema = schema(category);
    let mut values = Vec::new();
    for key in schema.raw_fields() {
        let sel = selector(&format!(".v-{key}"))?;
        let Some(element) = row.select(&sel).next() else {
            continue;
        };
        let text = element_text(element);
        let text = if key.is_numeric() {
            strip_grouping(text.trim())
        } else {
            text
        };
        values.push((key, text));
    }
    Ok(LineItem::from_raw(values))
}

fn metadata(doc: &Html, fallback_org: Option<&str>) -> Result<Metadata, BudgetError> {
    let field = |id: &str| -> Result<String, BudgetError> {
        let sel = selector(&format!("#{id}"))?;
        Ok(doc.select(&sel).next().map(element_text).unwrap_or_default())
    };
    let mut metadata = Metadata::new(field("mgr-org")?, field("mgr-year")?, field("mgr-user")?);

    if metadata.org.trim().is_empty() || metadata.year.trim().is_empty() {
        let title = doc
            .select(&selector("title")?)
            .next()
            .map(|t| t.text().collect::<String>())
            .unwrap_or_default();
        if let Some(caps) = TITLE_RE.captures(&title) {
            if metadata.org.trim().is_empty() {
                metadata.org = caps[1].trim().to_string();
            }
            if metadata.year.trim().is_empty() {
                metadata.year = caps[2].to_string();
            }
        }
    }

    if metadata.org.trim().is_empty() {
        if let Some(org) = fallback_org {
            metadata.org = org.to_string();
        }
    }
    Ok(metadata)
}

fn render(dataset: &Dataset, mode: Mode) -> String {
    let mut dataset = dataset.clone();
    let totals = dataset.recompute();
    let meta = dataset.metadata();

    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html lang=\"zh-Hant\">\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(
        out,
        "<title>{} {}年度預算</title>",
        escape(&meta.org),
        escape(&meta.year)
    );
    let _ = writeln!(out, "<style>{}</style>\n</head>\n<body>\n<header>", STYLE);
    for (id, label, value) in [
        ("mgr-org", "機關名稱", &meta.org),
        ("mgr-year", "年度", &meta.year),
        ("mgr-user", "填表人", &meta.user),
    ] {
        let _ = writeln!(out, "<label>{label} {}</label>", tagged(mode, id, value));
    }
    out.push_str("</header>\n<main id=\"sections-container\">\n");

    for (section, totals) in dataset.sections().iter().zip(&totals) {
        let schema = section.schema();
        let id = schema.id;
        let _ = writeln!(
            out,
            "<section class=\"section-card\" style=\"border-top-color:{0}\">\n\
             <h3 style=\"color:{0}\">{1}</h3>\n<table class=\"budget-table\">",
            schema.color, schema.title
        );
        out.push_str("<thead><tr>");
        for &key in schema.fields {
            let _ = write!(out, "<th>{}</th>", label_for(id, key));
        }
        out.push_str("</tr></thead>\n");

        let _ = writeln!(out, "<tbody id=\"tbody-{id}\">");
        for item in section.items() {
            out.push_str("<tr>");
            for cell in item.cells(schema) {
                let class = format!("v-{}", cell.key);
                let html = match mode {
                    Mode::Live => live_input(&class, &cell.text, cell.key, cell.derived),
                    Mode::Static => {
                        let class = if cell.negative {
                            format!("{class} neg")
                        } else {
                            class
                        };
                        format!("<span class=\"{class}\">{}</span>", escape(&cell.display()))
                    }
                };
                let _ = write!(out, "<td>{html}</td>");
            }
            out.push_str("</tr>\n");
        }
        out.push_str("</tbody>\n");

        let _ = write!(out, "<tfoot id=\"tfoot-{id}\"><tr><td>合計</td>");
        for (key, _) in totals.iter() {
            let neg = if totals.is_negative(key) { " neg" } else { "" };
            let _ = write!(out, "<td class=\"t-{key}{neg}\">{}</td>", totals.display(key));
        }
        out.push_str("</tr></tfoot>\n</table>\n</section>\n");
    }

    out.push_str("</main>\n</body>\n</html>\n");
    out
}

/// A metadata element, editable or static.
fn tagged(mode: Mode, id: &str, value: &str) -> String {
    match mode {
        Mode::Live => format!(
            "<input type=\"text\" id=\"{id}\" value=\"{}\">",
            escape(value)
        ),
        Mode::Static => format!("<span id=\"{id}\">{}</span>", escape(value)),
    }
}

fn live_input(class: &str, text: &str, key: FieldKey, derived: bool) -> String {
    let kind = if key.is_numeric() { "number" } else { "text" };
    let readonly = if derived { " readonly" } else { "" };
    format!(
        "<input type=\"{kind}\" class=\"{class}\" value=\"{}\"{readonly}>",
        escape(text)
    )
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use FieldKey::*;

    fn sample() -> Dataset {
        let mut d = Dataset::new(Metadata::new("新北市", "114", "林<小姐>"));
        d.set_items(
            CategoryId::Op,
            vec![LineItem::from_raw([
                (Name, "公車處 & 捷運"),
                (Rev, "1234567"),
                (Cost, "2000000"),
                (Tax, "x"),
            ])],
        );
        d.set_items(
            CategoryId::Cp,
            vec![
                LineItem::from_raw([(Name, "建設基金"), (Source, "1500.5"), (Begin, "10")]),
                LineItem::from_raw([(Source, "99")]),
            ],
        );
        d.ensure_rows();
        d.recompute();
        d
    }

    #[test]
    fn test_live_round_trip() {
        let original = sample();
        let html = to_live_document(&original);
        assert!(html.contains("id=\"tbody-op\""));
        assert!(html.contains("class=\"v-gross\" value=\"-765433\" readonly"));
        let back = from_tagged_document(&html, None).unwrap();
        assert_eq!(back.metadata(), original.metadata());
        let op = &back.section(CategoryId::Op).items()[0];
        assert_eq!(op.name(), "公車處 & 捷運");
        assert_eq!(op.raw(Rev), "1234567");
        assert_eq!(op.raw(Tax), "x");
        assert_eq!(op.value(Net), Decimal::from(-765433));
        // the unnamed capital-project row does not survive
        assert_eq!(back.section(CategoryId::Cp).len(), 1);
    }

    #[test]
    fn test_static_round_trip() {
        let original = sample();
        let export = to_static_document(&original);
        assert!(export.degraded.is_none());
        let html = export.html;
        assert!(!html.contains("<input"));
        assert!(html.contains("<span class=\"v-rev\">1,234,567</span>"));
        assert!(html.contains("<span class=\"v-gross neg\">-765,433</span>"));
        assert!(html.contains("class=\"t-cost\">2,000,000</td>"));

        let back = from_tagged_document(&html, None).unwrap();
        assert_eq!(back.metadata(), original.metadata());
        let op = &back.section(CategoryId::Op).items()[0];
        assert_eq!(op.raw(Rev), "1234567");
        let cp = &back.section(CategoryId::Cp).items()[0];
        assert_eq!(cp.raw(Source), "1500.5");
        assert_eq!(cp.value(End), Decimal::new(15105, 1));
    }

    #[test]
    fn test_failed_self_check_exports_live_document() {
        let d = sample();
        let html = render(&d, Mode::Static);
        let cut = html.find("id=\"tbody-cp\"").unwrap();
        let truncated = html[..cut].to_string();

        let export = checked_static(&d, truncated);
        assert_eq!(export.html, to_live_document(&d));
        assert!(matches!(
            export.degraded,
            Some(BudgetError::StructuralMismatch { expected, found }) if found < expected
        ));

        let export = checked_static(&d, html.clone());
        assert!(export.degraded.is_none());
        assert_eq!(export.html, html);
    }

    #[test]
    fn test_static_round_trip_keeps_long_numbers() {
        let mut d = Dataset::new(Metadata::new("臺北市", "114", "王"));
        d.set_items(
            CategoryId::Db,
            vec![LineItem::from_raw([
                (Name, "債務基金"),
                (Source, "12345678901234567"),
                (Use, "-9876543210987654.32"),
            ])],
        );
        d.recompute();

        let export = to_static_document(&d);
        assert!(export.degraded.is_none());
        assert!(export
            .html
            .contains("<span class=\"v-source\">12,345,678,901,234,567</span>"));

        let back = from_tagged_document(&export.html, None).unwrap();
        let db = &back.section(CategoryId::Db).items()[0];
        assert_eq!(db.raw(Source), "12345678901234567");
        assert_eq!(db.raw(Use), "-9876543210987654.32");
        assert_eq!(db.value(Surplus), d.section(CategoryId::Db).items()[0].value(Surplus));
    }

    #[test]
    fn test_names_keep_surrounding_spaces() {
        let mut d = Dataset::new(Metadata::new(" 新北市 ", "114", "林"));
        d.set_items(
            CategoryId::Sp,
            vec![LineItem::from_raw([(Name, "  觀光基金 "), (Source, "10")])],
        );
        d.recompute();

        for html in [to_live_document(&d), to_static_document(&d).html] {
            let back = from_tagged_document(&html, None).unwrap();
            assert_eq!(back.metadata(), d.metadata());
            assert_eq!(back.section(CategoryId::Sp).items()[0].name(), "  觀光基金 ");
        }
    }

    #[test]
    fn test_numbers_are_trimmed() {
        let html = r#"<table><tbody id="tbody-sp"><tr>
            <td><input class="v-name" value="觀光"></td>
            <td><input class="v-source" value=" 1,000 "></td>
            <td><span class="v-use">
                250
            </span></td>
            </tr></tbody></table>"#;
        let d = from_tagged_document(html, None).unwrap();
        let sp = &d.section(CategoryId::Sp).items()[0];
        assert_eq!(sp.raw(Source), "1000");
        assert_eq!(sp.raw(Use), "250");
        assert_eq!(sp.value(Surplus), Decimal::from(750));
    }

    #[test]
    fn test_verify_tagged_fields() {
        let d = sample();
        let html = to_static_document(&d).html;
        let expected: usize = d
            .sections()
            .iter()
            .map(|s| s.len() * s.schema().fields.len())
            .sum();
        assert!(verify_tagged_fields(&html, expected).is_ok());
        assert_eq!(
            verify_tagged_fields(&html, expected + 1),
            Err(BudgetError::StructuralMismatch {
                expected: expected + 1,
                found: expected
            })
        );
        // a live document carries no static fields at all
        assert!(verify_tagged_fields(&to_live_document(&d), expected).is_err());
    }

    #[test]
    fn test_metadata_from_title() {
        let html = r#"<html><head><title>臺中市 113年度預算書</title></head><body>
            <table><tbody id="tbody-wk"><tr>
              <td><span class="v-name">農產運銷</span></td>
              <td><span class="v-rev">2,000</span></td>
              <td><span class="v-cost">2,500</span></td>
            </tr></tbody></table></body></html>"#;
        let d = from_tagged_document(html, Some("ignored")).unwrap();
        assert_eq!(d.metadata().org, "臺中市");
        assert_eq!(d.metadata().year, "113");
        let wk = &d.section(CategoryId::Wk).items()[0];
        assert_eq!(wk.raw(Rev), "2000");
        assert_eq!(wk.value(Surplus), Decimal::from(-500));
        // categories without a table get a blank row
        assert_eq!(d.section(CategoryId::Op).len(), 1);
        assert!(!d.section(CategoryId::Op).items()[0].has_name());
    }

    #[test]
    fn test_metadata_falls_back_to_file_name() {
        let html = r#"<table><tbody id="tbody-db"></tbody></table>"#;
        let d = from_tagged_document(html, Some("高雄市")).unwrap();
        assert_eq!(d.metadata().org, "高雄市");
        assert_eq!(d.metadata().year, "");
    }

    #[test]
    fn test_rows_without_name_are_dropped() {
        let html = r#"<table><tbody id="tbody-sp">
            <tr><td><input class="v-name" value=""></td><td><input class="v-source" value="5"></td></tr>
            <tr><td><input class="v-name" value="觀光"></td><td><input class="v-source" value="1,000"></td></tr>
            </tbody></table>"#;
        let d = from_tagged_document(html, None).unwrap();
        let sp = d.section(CategoryId::Sp);
        assert_eq!(sp.len(), 1);
        assert_eq!(sp.items()[0].raw(Source), "1000");
    }

    #[test]
    fn test_no_tables_is_format_error() {
        let html = "<html><body><p>hello</p></body></html>";
        assert!(matches!(
            from_tagged_document(html, None),
            Err(BudgetError::Format(_))
        ));
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }
}
