use crate::error::BudgetError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The five statutory fund categories. The serialized form (`op`, `wk`, ...) is the id used in
/// JSON documents and in the tagged HTML element ids.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryId {
    /// 營業基金, the operating fund.
    Op,
    /// 作業基金, the working fund.
    Wk,
    /// 債務基金, the debt fund.
    Db,
    /// 特別收入基金, the special-revenue fund.
    Sp,
    /// 資本計畫基金, the capital-project fund.
    Cp,
}

serde_plain::derive_display_from_serialize!(CategoryId);
serde_plain::derive_fromstr_from_deserialize!(CategoryId);

impl CategoryId {
    /// All categories in form order.
    pub const ALL: [CategoryId; 5] = [
        CategoryId::Op,
        CategoryId::Wk,
        CategoryId::Db,
        CategoryId::Sp,
        CategoryId::Cp,
    ];

    /// Parses a category id, reporting an unknown one as `BudgetError::UnknownCategory`.
    pub fn parse(s: &str) -> Result<Self, BudgetError> {
        CategoryId::from_str(s.trim()).map_err(|_| BudgetError::UnknownCategory(s.to_string()))
    }

    /// The position of this category in `ALL`.
    pub const fn index(self) -> usize {
        match self {
            CategoryId::Op => 0,
            CategoryId::Wk => 1,
            CategoryId::Db => 2,
            CategoryId::Sp => 3,
            CategoryId::Cp => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_id_round_trip() {
        for id in CategoryId::ALL {
            assert_eq!(CategoryId::from_str(&id.to_string()).unwrap(), id);
        }
        assert_eq!(CategoryId::Sp.to_string(), "sp");
        assert!(CategoryId::from_str("xx").is_err());
    }

    #[test]
    fn test_parse() {
        assert_eq!(CategoryId::parse(" cp "), Ok(CategoryId::Cp));
        assert_eq!(
            CategoryId::parse("zz"),
            Err(BudgetError::UnknownCategory("zz".to_string()))
        );
    }

    #[test]
    fn test_index_matches_all() {
        for (ix, id) in CategoryId::ALL.iter().enumerate() {
            assert_eq!(id.index(), ix);
        }
    }
}
