use crate::model::amount::{plain, Amount};
use crate::model::FieldKey;
use crate::schema::FieldSchema;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

/// One fund's row within a category.
///
/// User-entered values are kept verbatim in `raw`, exactly as typed or imported. Computed values
/// live in `derived` and are only joined with the raw ones when a row is rendered or serialized.
#[derive(Default, Debug, Clone, Eq, PartialEq)]
pub struct LineItem {
    raw: BTreeMap<FieldKey, String>,
    derived: BTreeMap<FieldKey, Decimal>,
}

impl LineItem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an item from raw `(key, value)` pairs.
    pub fn from_raw<S, I>(values: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = (FieldKey, S)>,
    {
        Self {
            raw: values.into_iter().map(|(k, v)| (k, v.into())).collect(),
            derived: BTreeMap::new(),
        }
    }

    /// The raw text of `key`, or `""` if it was never set.
    pub fn raw(&self, key: FieldKey) -> &str {
        self.raw.get(&key).map(String::as_str).unwrap_or_default()
    }

    pub(crate) fn set_raw(&mut self, key: FieldKey, value: impl Into<String>) {
        self.raw.insert(key, value.into());
    }

    pub fn derived(&self, key: FieldKey) -> Option<Decimal> {
        self.derived.get(&key).copied()
    }

    pub(crate) fn set_derived(&mut self, values: impl IntoIterator<Item = (FieldKey, Decimal)>) {
        self.derived = values.into_iter().collect();
    }

    pub fn name(&self) -> &str {
        self.raw(FieldKey::Name)
    }

    /// Rows without a name are placeholders: they are not exported and are not counted as funds.
    pub fn has_name(&self) -> bool {
        !self.name().trim().is_empty()
    }

    /// The numeric value of `key`: the computed value for derived fields, otherwise the parsed
    /// raw text, with anything unparseable counting as zero.
    pub fn value(&self, key: FieldKey) -> Decimal {
        match self.derived(key) {
            Some(value) => value,
            None => Amount::parse_or_zero(self.raw(key)).value(),
        }
    }

    /// The text of `key` as it is serialized: derived values in plain decimal form, raw values
    /// verbatim.
    pub fn text(&self, key: FieldKey) -> String {
        match self.derived(key) {
            Some(value) => plain(value),
            None => self.raw(key).to_string(),
        }
    }

    /// Whether `key` should be displayed with negative-value styling.
    pub fn is_negative(&self, key: FieldKey) -> bool {
        key.is_numeric() && self.value(key) < Decimal::ZERO
    }

    /// Whether any user-entered field of the layout holds a non-blank value.
    pub fn has_raw_content(&self, schema: &FieldSchema) -> bool {
        schema
            .raw_fields()
            .any(|k| !self.raw(k).trim().is_empty())
    }

    /// Joins raw and derived values into the cells of one rendered row, in layout order.
    pub fn cells(&self, schema: &FieldSchema) -> Vec<Cell> {
        schema
            .fields
            .iter()
            .map(|&key| Cell {
                key,
                text: self.text(key),
                value: key.is_numeric().then(|| self.value(key)),
                derived: schema.is_derived(key),
                negative: self.is_negative(key),
            })
            .collect()
    }
}

/// One field of a rendered row.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct Cell {
    pub key: FieldKey,
    /// The stored text, unformatted.
    pub text: String,
    /// `None` for the name field.
    pub value: Option<Decimal>,
    pub derived: bool,
    pub negative: bool,
}

impl Cell {
    /// The text to show in a report: numbers that parse are written with thousands separators,
    /// anything else is shown as entered.
    pub fn display(&self) -> String {
        if !self.key.is_numeric() || self.text.trim().is_empty() {
            return self.text.clone();
        }
        match self.text.parse::<Amount>() {
            Ok(amount) => Amount::grouped(amount.value()).to_string(),
            Err(_) => self.text.clone(),
        }
    }
}
