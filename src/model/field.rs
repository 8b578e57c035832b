use serde::{Deserialize, Serialize};

/// Every field key that appears in any category's layout. The serialized form is the key used in
/// JSON items and in the `v-<key>` / `t-<key>` classes of tagged HTML documents.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKey {
    Name,
    Rev,
    Cost,
    Gross,
    Exp,
    Opprofit,
    Nonrev,
    Nonexp,
    Nonprofit,
    Pretax,
    Tax,
    Net,
    Surplus,
    Nonsurplus,
    Source,
    Use,
    Begin,
    Remit,
    End,
}

serde_plain::derive_display_from_serialize!(FieldKey);
serde_plain::derive_fromstr_from_deserialize!(FieldKey);

impl FieldKey {
    /// The label used when a category does not override it.
    pub fn generic_label(self) -> &'static str {
        match self {
            FieldKey::Name => "基金名稱",
            FieldKey::Rev => "收入",
            FieldKey::Cost => "成本/費用",
            FieldKey::Gross => "營業毛利(毛損)",
            FieldKey::Exp => "營業費用",
            FieldKey::Opprofit => "營業利益(損失)",
            FieldKey::Nonrev => "外收入",
            FieldKey::Nonexp => "外費用",
            FieldKey::Nonprofit => "外利益(損失)",
            FieldKey::Pretax => "稅前淨利(淨損)",
            FieldKey::Tax => "所得稅費用(利益)",
            FieldKey::Net => "本期淨利(淨損)",
            FieldKey::Surplus => "賸餘(短絀)",
            FieldKey::Nonsurplus => "外賸餘(短絀)",
            FieldKey::Source => "基金來源",
            FieldKey::Use => "基金用途",
            FieldKey::Begin => "期初基金餘額",
            FieldKey::Remit => "解繳公庫",
            FieldKey::End => "期末基金餘額",
        }
    }

    /// Whether the field holds a number. Only the name field is free text.
    pub fn is_numeric(self) -> bool {
        self != FieldKey::Name
    }
}
