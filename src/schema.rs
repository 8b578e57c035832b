//! The field schema registry: the static layout of the five fund categories.

use crate::calc;
use crate::model::{CategoryId, FieldKey};
use serde::Serialize;
use std::fmt::{Display, Formatter};

/// The layout of one fund category. `fields[0]` is always the line-item name.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct FieldSchema {
    pub id: CategoryId,
    pub title: &'static str,
    pub color: &'static str,
    pub fields: &'static [FieldKey],
}

use FieldKey::*;

const OPERATING_FIELDS: &[FieldKey] = &[
    Name, Rev, Cost, Gross, Exp, Opprofit, Nonrev, Nonexp, Nonprofit, Pretax, Tax, Net,
];
const WORKING_FIELDS: &[FieldKey] = &[Name, Rev, Cost, Surplus, Nonrev, Nonexp, Nonsurplus, Net];
const BALANCE_FIELDS: &[FieldKey] = &[Name, Source, Use, Surplus, Begin, Remit, End];

/// Indexed by `CategoryId::index`.
static SCHEMAS: [FieldSchema; 5] = [
    FieldSchema {
        id: CategoryId::Op,
        title: "一、營業基金",
        color: "#2563eb",
        fields: OPERATING_FIELDS,
    },
    FieldSchema {
        id: CategoryId::Wk,
        title: "二、作業基金",
        color: "#16a34a",
        fields: WORKING_FIELDS,
    },
    FieldSchema {
        id: CategoryId::Db,
        title: "三、債務基金",
        color: "#ea580c",
        fields: BALANCE_FIELDS,
    },
    FieldSchema {
        id: CategoryId::Sp,
        title: "四、特別收入基金",
        color: "#9333ea",
        fields: BALANCE_FIELDS,
    },
    FieldSchema {
        id: CategoryId::Cp,
        title: "五、資本計畫基金",
        color: "#0891b2",
        fields: BALANCE_FIELDS,
    },
];

/// Returns the schema of `id`.
pub fn schema(id: CategoryId) -> &'static FieldSchema {
    &SCHEMAS[id.index()]
}

/// Returns all schemas in form order.
pub fn schemas() -> &'static [FieldSchema] {
    &SCHEMAS
}

impl FieldSchema {
    pub fn contains(&self, key: FieldKey) -> bool {
        self.fields.contains(&key)
    }

    /// Whether `key` is computed by the category's formula rather than entered by the user.
    pub fn is_derived(&self, key: FieldKey) -> bool {
        calc::formula(self.id).derived.contains(&key)
    }

    /// The fields that take part in totals: everything except the name.
    pub fn numeric_fields(&self) -> &'static [FieldKey] {
        &self.fields[1..]
    }

    /// The user-entered fields, in layout order.
    pub fn raw_fields(&self) -> impl Iterator<Item = FieldKey> + '_ {
        self.fields.iter().copied().filter(|&k| !self.is_derived(k))
    }
}

/// The display label of a (category, field) pair.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Label {
    Known(&'static str),
    /// The field does not occur in the category's layout.
    Unknown,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Known(s) => s,
            Label::Unknown => "?",
        }
    }
}

impl Display for Label {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns the label of `key` within `category`, preferring the category's own wording (e.g.
/// 營業收入 vs 業務收入 for `rev`) over the generic one.
pub fn label_for(category: CategoryId, key: FieldKey) -> Label {
    if !schema(category).contains(key) {
        return Label::Unknown;
    }
    Label::Known(category_label(category, key).unwrap_or_else(|| key.generic_label()))
}

fn category_label(category: CategoryId, key: FieldKey) -> Option<&'static str> {
    match (category, key) {
        (CategoryId::Op, Rev) => Some("營業收入"),
        (CategoryId::Op, Cost) => Some("營業成本"),
        (CategoryId::Op, Nonrev) => Some("營業外收入"),
        (CategoryId::Op, Nonexp) => Some("營業外費用"),
        (CategoryId::Op, Nonprofit) => Some("營業外利益(損失)"),
        (CategoryId::Wk, Rev) => Some("業務收入"),
        (CategoryId::Wk, Cost) => Some("業務成本與費用"),
        (CategoryId::Wk, Surplus) => Some("業務賸餘(短絀)"),
        (CategoryId::Wk, Nonrev) => Some("業務外收入"),
        (CategoryId::Wk, Nonexp) => Some("業務外費用"),
        (CategoryId::Wk, Nonsurplus) => Some("業務外賸餘(短絀)"),
        (CategoryId::Wk, Net) => Some("本期賸餘(短絀)"),
        (CategoryId::Db | CategoryId::Sp | CategoryId::Cp, Surplus) => Some("本期賸餘(短絀)"),
        _ => None,
    }
}
