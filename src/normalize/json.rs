//! The JSON document format.
//!
//! Export always writes the current shape:
//!
//! ```json
//! {
//!   "metadata": { "org": "臺北市", "year": "114", "user": "王小明" },
//!   "sections": [ { "id": "op", "items": [ { "name": "...", "rev": "1000", ... } ] } ]
//! }
//! ```
//!
//! Import also accepts the older flat shape, `{ "op": [ ... ], "wk": [ ... ] }`, where each
//! category id maps straight to its items.

use crate::error::BudgetError;
use crate::model::{CategoryId, Dataset, FieldKey, LineItem, Metadata};
use crate::schema::schema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::{debug, warn};

/// The serialized form of a `Dataset`.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct JsonDocument {
    pub metadata: Metadata,
    pub sections: Vec<JsonSection>,
}

/// One category of a `JsonDocument`. Every item holds every field of the category's layout as a
/// string, derived fields included.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct JsonSection {
    pub id: CategoryId,
    pub items: Vec<BTreeMap<String, String>>,
}

impl JsonDocument {
    /// Converts the document into a `Dataset`, with the same normalization as `from_json`.
    pub fn into_dataset(self) -> Dataset {
        let mut dataset = Dataset::new(self.metadata);
        for section in self.sections {
            let items = section
                .items
                .into_iter()
                .map(|item| line_item(section.id, item.into_iter()))
                .collect();
            append(&mut dataset, section.id, items);
        }
        finish(dataset)
    }
}

/// Serializes `dataset`. Rows without a name are left out.
pub fn to_json(dataset: &Dataset) -> JsonDocument {
    document(dataset, LineItem::has_name)
}

/// Serializes `dataset` with every row, named or not. Used for the working form, where a row may
/// be added before it is given a name.
pub fn snapshot(dataset: &Dataset) -> JsonDocument {
    document(dataset, |_| true)
}

fn document(dataset: &Dataset, keep: fn(&LineItem) -> bool) -> JsonDocument {
    let mut dataset = dataset.clone();
    dataset.recompute();
    let sections = dataset
        .sections()
        .iter()
        .map(|section| {
            let fields = section.schema().fields;
            JsonSection {
                id: section.category(),
                items: section
                    .items()
                    .iter()
                    .filter(|item| keep(item))
                    .map(|item| {
                        fields
                            .iter()
                            .map(|&k| (k.to_string(), item.text(k)))
                            .collect()
                    })
                    .collect(),
            }
        })
        .collect();
    JsonDocument {
        metadata: dataset.metadata().clone(),
        sections,
    }
}

/// Parses either JSON shape into a `Dataset`.
///
/// Values may be strings, numbers or `null`; numbers are kept in their JSON spelling and `null`
/// becomes an empty field. Keys that are not raw fields of the category are ignored since derived
/// fields are recomputed. Every category that ends up without rows gets one blank row.
pub fn from_json(content: &str) -> Result<Dataset, BudgetError> {
    let value: Value = serde_json::from_str(content)
        .map_err(|e| BudgetError::format(format!("the document is not valid JSON: {e}")))?;
    let root = value
        .as_object()
        .ok_or_else(|| BudgetError::format("the JSON root is not an object"))?;

    let mut dataset = Dataset::new(metadata(root.get("metadata"))?);
    match root.get("sections") {
        Some(sections) => current_shape(sections, &mut dataset)?,
        None => legacy_shape(root, &mut dataset)?,
    }
    Ok(finish(dataset))
}

fn finish(mut dataset: Dataset) -> Dataset {
    dataset.ensure_rows();
    dataset.recompute();
    dataset
}

fn append(dataset: &mut Dataset, category: CategoryId, items: Vec<LineItem>) {
    let mut all = dataset.section(category).items().to_vec();
    all.extend(items);
    dataset.set_items(category, all);
}

fn metadata(value: Option<&Value>) -> Result<Metadata, BudgetError> {
    let object = match value {
        None | Some(Value::Null) => return Ok(Metadata::default()),
        Some(Value::Object(object)) => object,
        Some(_) => return Err(BudgetError::format("`metadata` is not an object")),
    };
    let field = |key: &str| -> Result<String, BudgetError> {
        match object.get(key) {
            None => Ok(String::new()),
            Some(v) => text(key, v),
        }
    };
    Ok(Metadata {
        org: field("org")?,
        year: field("year")?,
        user: field("user")?,
    })
}

fn current_shape(sections: &Value, dataset: &mut Dataset) -> Result<(), BudgetError> {
    let sections = sections
        .as_array()
        .ok_or_else(|| BudgetError::format("`sections` is not an array"))?;
    for (ix, section) in sections.iter().enumerate() {
        let section = section
            .as_object()
            .ok_or_else(|| BudgetError::format(format!("section {ix} is not an object")))?;
        let id = section
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| BudgetError::format(format!("section {ix} has no `id`")))?;
        let category = match CategoryId::parse(id) {
            Ok(category) => category,
            Err(e) => {
                warn!("Skipping section {ix}: {e}");
                continue;
            }
        };
        let items = match section.get("items") {
            None | Some(Value::Null) => Vec::new(),
            Some(items) => items_of(category, items)?,
        };
        append(dataset, category, items);
    }
    Ok(())
}

fn legacy_shape(root: &Map<String, Value>, dataset: &mut Dataset) -> Result<(), BudgetError> {
    let mut found = 0;
    for (key, value) in root {
        if let Ok(category) = CategoryId::from_str(key) {
            append(dataset, category, items_of(category, value)?);
            found += 1;
        }
    }
    if found == 0 {
        return Err(BudgetError::format(
            "the document has neither `sections` nor any fund category key",
        ));
    }
    debug!("Read {found} categories from a legacy flat document");
    Ok(())
}

fn items_of(category: CategoryId, value: &Value) -> Result<Vec<LineItem>, BudgetError> {
    let items = value
        .as_array()
        .ok_or_else(|| BudgetError::format(format!("the items of '{category}' are not an array")))?;
    items
        .iter()
        .map(|item| {
            let object = item.as_object().ok_or_else(|| {
                BudgetError::format(format!("an item of '{category}' is not an object"))
            })?;
            let pairs = object
                .iter()
                .map(|(k, v)| Ok((k.clone(), text(k, v)?)))
                .collect::<Result<Vec<(String, String)>, BudgetError>>()?;
            Ok(line_item(category, pairs.into_iter()))
        })
        .collect()
}

/// Keeps the raw fields of `category` and drops everything else.
fn line_item(category: CategoryId, pairs: impl Iterator<Item = (String, String)>) -> LineItem {
    let schema = schema(category);
    LineItem::from_raw(pairs.filter_map(|(k, v)| {
        let key = FieldKey::from_str(&k).ok()?;
        (schema.contains(key) && !schema.is_derived(key)).then_some((key, v))
    }))
}

fn text(key: &str, value: &Value) -> Result<String, BudgetError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(BudgetError::format(format!(
            "field `{key}` holds an unsupported value: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use FieldKey::*;

    fn sample() -> Dataset {
        let mut d = Dataset::new(Metadata::new("臺北市", "114", "王小明"));
        d.set_items(
            CategoryId::Op,
            vec![LineItem::from_raw([
                (Name, "自來水事業"),
                (Rev, "1000"),
                (Cost, "400"),
                (Exp, "100"),
                (Nonrev, "50"),
                (Nonexp, "20"),
                (Tax, "60"),
            ])],
        );
        d.set_items(
            CategoryId::Db,
            vec![
                LineItem::from_raw([(Name, "債務基金"), (Source, "1,500"), (Use, "abc")]),
                LineItem::from_raw([(Source, "7")]),
            ],
        );
        d.recompute();
        d
    }

    #[test]
    fn test_to_json_items_hold_every_field() {
        let doc = to_json(&sample());
        assert_eq!(doc.sections.len(), 5);
        let op = &doc.sections[0];
        assert_eq!(op.id, CategoryId::Op);
        assert_eq!(op.items[0].len(), schema(CategoryId::Op).fields.len());
        assert_eq!(op.items[0]["net"], "470");
        assert_eq!(op.items[0]["gross"], "600");
        // the unnamed debt row is dropped
        assert_eq!(doc.sections[2].items.len(), 1);
        assert_eq!(doc.sections[2].items[0]["use"], "abc");
        assert_eq!(doc.sections[2].items[0]["remit"], "");
        assert!(doc.sections[1].items.is_empty());
    }

    #[test]
    fn test_to_json_shape() {
        let json = serde_json::to_value(to_json(&sample())).unwrap();
        assert_eq!(json["metadata"]["org"], "臺北市");
        assert_eq!(json["sections"][2]["id"], "db");
        assert_eq!(json["sections"][2]["items"][0]["end"], "1500");
    }

    #[test]
    fn test_round_trip() {
        let original = sample();
        let json = serde_json::to_string(&to_json(&original)).unwrap();
        let back = from_json(&json).unwrap();
        assert_eq!(back.metadata(), original.metadata());
        for category in CategoryId::ALL {
            let named: Vec<&LineItem> = original
                .section(category)
                .items()
                .iter()
                .filter(|i| i.has_name())
                .collect();
            let imported = back.section(category).items();
            if named.is_empty() {
                assert_eq!(imported.len(), 1);
                assert!(!imported[0].has_name());
                continue;
            }
            assert_eq!(imported.len(), named.len());
            let s = schema(category);
            for (a, b) in named.iter().zip(imported) {
                for &key in s.fields {
                    if s.is_derived(key) {
                        assert_eq!(a.value(key), b.value(key));
                    } else {
                        assert_eq!(a.raw(key), b.raw(key));
                    }
                }
            }
        }
    }

    #[test]
    fn test_legacy_shape() {
        let legacy = r#"{
            "op": [ { "name": "甲", "rev": "100", "cost": "40" } ],
            "wk": [ { "name": "乙", "rev": 20, "nonexp": null } ]
        }"#;
        let current = r#"{
            "sections": [
                { "id": "op", "items": [ { "name": "甲", "rev": "100", "cost": "40" } ] },
                { "id": "wk", "items": [ { "name": "乙", "rev": "20", "nonexp": "" } ] }
            ]
        }"#;
        let a = from_json(legacy).unwrap();
        let b = from_json(current).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.section(CategoryId::Op).items()[0].value(Gross), Decimal::from(60));
        assert_eq!(a.section(CategoryId::Wk).items()[0].raw(Rev), "20");
        assert_eq!(a.metadata(), &Metadata::default());
    }

    #[test]
    fn test_missing_sections_get_one_blank_row() {
        let d = from_json(r#"{"sections":[{"id":"op","items":[]}]}"#).unwrap();
        for section in d.sections() {
            assert_eq!(section.len(), 1);
            assert!(!section.items()[0].has_name());
        }
    }

    #[test]
    fn test_derived_and_unknown_keys_are_ignored() {
        let d = from_json(
            r#"{"sections":[{"id":"db","items":[{"name":"x","source":"10","end":"999","bogus":"1"}]}]}"#,
        )
        .unwrap();
        let item = &d.section(CategoryId::Db).items()[0];
        assert_eq!(item.raw(End), "");
        assert_eq!(item.value(End), Decimal::from(10));
    }

    #[test]
    fn test_unknown_section_id_is_skipped() {
        let d = from_json(r#"{"sections":[{"id":"zz","items":[{"name":"x"}]}]}"#).unwrap();
        assert_eq!(d.named_items(), 0);
    }

    #[test]
    fn test_format_errors() {
        for bad in [
            "not json",
            "[1, 2]",
            r#"{"foo": []}"#,
            r#"{"sections": {}}"#,
            r#"{"sections": [{"items": []}]}"#,
            r#"{"op": "x"}"#,
            r#"{"op": [{"name": true}]}"#,
            r#"{"metadata": 3, "op": []}"#,
        ] {
            assert!(
                matches!(from_json(bad), Err(BudgetError::Format(_))),
                "expected a format error for {bad}"
            );
        }
    }

    #[test]
    fn test_into_dataset_matches_from_json() {
        let doc = to_json(&sample());
        let json = serde_json::to_string(&doc).unwrap();
        assert_eq!(doc.into_dataset(), from_json(&json).unwrap());
    }

    #[test]
    fn test_snapshot_keeps_unnamed_rows() {
        let original = sample();
        let doc = snapshot(&original);
        assert_eq!(doc.sections[2].items.len(), 2);
        assert_eq!(doc.sections[2].items[1]["source"], "7");
        let back = doc.into_dataset();
        assert_eq!(back.section(CategoryId::Db).len(), 2);
        assert_eq!(back.section(CategoryId::Db).items()[1].raw(Source), "7");
    }
}
