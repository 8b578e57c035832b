//! The derived-field calculator.
//!
//! Every category maps to a `Formula` entry. A formula reads only the raw fields of a row and
//! produces its derived fields, so recomputing is idempotent and never touches what the user
//! typed. Adding a category means adding an entry to `FORMULAS`.
//!
//! All arithmetic saturates: a result past the `Decimal` range is pinned to `Decimal::MAX` or
//! `Decimal::MIN` instead of failing, so a sum of valid amounts can always be computed.

use crate::model::{Amount, CategoryId, FieldKey, LineItem, Section};
use crate::schema::schema;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use FieldKey::*;

/// Read access to the parsed raw values of one row.
pub struct Inputs<'a>(&'a LineItem);

impl Inputs<'_> {
    /// The parsed raw value of `key`, or zero when it is blank or not a number.
    pub fn v(&self, key: FieldKey) -> Decimal {
        Amount::parse_or_zero(self.0.raw(key)).value()
    }
}

/// The computation strategy of one category.
pub struct Formula {
    /// The fields this formula writes. Everything else in the layout is user-entered.
    pub derived: &'static [FieldKey],
    compute: fn(&Inputs<'_>) -> Vec<(FieldKey, Decimal)>,
    scale: fn(&Inputs<'_>) -> Decimal,
}

impl Formula {
    /// Computes the derived fields of `item`.
    pub fn compute(&self, item: &LineItem) -> Vec<(FieldKey, Decimal)> {
        (self.compute)(&Inputs(item))
    }

    /// The revenue a row contributes to an aggregate's total scale.
    pub fn scale(&self, item: &LineItem) -> Decimal {
        (self.scale)(&Inputs(item))
    }
}

fn operating(i: &Inputs<'_>) -> Vec<(FieldKey, Decimal)> {
    let gross = i.v(Rev).saturating_sub(i.v(Cost));
    let opprofit = gross.saturating_sub(i.v(Exp));
    let nonprofit = i.v(Nonrev).saturating_sub(i.v(Nonexp));
    let pretax = opprofit.saturating_add(nonprofit);
    let net = pretax.saturating_sub(i.v(Tax));
    vec![
        (Gross, gross),
        (Opprofit, opprofit),
        (Nonprofit, nonprofit),
        (Pretax, pretax),
        (Net, net),
    ]
}

fn working(i: &Inputs<'_>) -> Vec<(FieldKey, Decimal)> {
    let surplus = i.v(Rev).saturating_sub(i.v(Cost));
    let nonsurplus = i.v(Nonrev).saturating_sub(i.v(Nonexp));
    vec![
        (Surplus, surplus),
        (Nonsurplus, nonsurplus),
        (Net, surplus.saturating_add(nonsurplus)),
    ]
}

fn balance(i: &Inputs<'_>) -> Vec<(FieldKey, Decimal)> {
    let surplus = i.v(Source).saturating_sub(i.v(Use));
    let end = i
        .v(Begin)
        .saturating_add(surplus)
        .saturating_sub(i.v(Remit));
    vec![(Surplus, surplus), (End, end)]
}

fn income_scale(i: &Inputs<'_>) -> Decimal {
    i.v(Rev).saturating_add(i.v(Nonrev))
}

fn source_scale(i: &Inputs<'_>) -> Decimal {
    i.v(Source)
}

const OPERATING: Formula = Formula {
    derived: &[Gross, Opprofit, Nonprofit, Pretax, Net],
    compute: operating,
    scale: income_scale,
};

const WORKING: Formula = Formula {
    derived: &[Surplus, Nonsurplus, Net],
    compute: working,
    scale: income_scale,
};

const BALANCE: Formula = Formula {
    derived: &[Surplus, End],
    compute: balance,
    scale: source_scale,
};

/// Indexed by `CategoryId::index`.
static FORMULAS: [Formula; 5] = [OPERATING, WORKING, BALANCE, BALANCE, BALANCE];

/// Returns the formula of `category`.
pub fn formula(category: CategoryId) -> &'static Formula {
    &FORMULAS[category.index()]
}

/// Per-field sums of one section. The name field is excluded.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct Totals {
    category: CategoryId,
    sums: BTreeMap<FieldKey, Decimal>,
}

impl Totals {
    pub fn category(&self) -> CategoryId {
        self.category
    }

    /// The sum of `key`, zero for keys outside the layout.
    pub fn get(&self, key: FieldKey) -> Decimal {
        self.sums.get(&key).copied().unwrap_or_default()
    }

    pub fn is_negative(&self, key: FieldKey) -> bool {
        self.get(key) < Decimal::ZERO
    }

    /// The sum of `key` with thousands separators.
    pub fn display(&self, key: FieldKey) -> String {
        Amount::grouped(self.get(key)).to_string()
    }

    /// `(key, sum)` pairs in layout order.
    pub fn iter(&self) -> impl Iterator<Item = (FieldKey, Decimal)> + '_ {
        schema(self.category)
            .numeric_fields()
            .iter()
            .map(|&k| (k, self.get(k)))
    }
}

/// Overwrites the derived fields of every row in `section` and returns the section totals.
pub fn recompute(section: &mut Section) -> Totals {
    let f = formula(section.category());
    for item in section.items_mut() {
        let values = f.compute(item);
        item.set_derived(values);
    }
    totals(section)
}

/// Sums every numeric field over the rows of `section`, using the current derived values.
pub fn totals(section: &Section) -> Totals {
    let fields = section.schema().numeric_fields();
    let mut sums: BTreeMap<FieldKey, Decimal> =
        fields.iter().map(|&k| (k, Decimal::ZERO)).collect();
    for item in section.items() {
        for &key in fields {
            let sum = sums.entry(key).or_default();
            *sum = sum.saturating_add(item.value(key));
        }
    }
    Totals {
        category: section.category(),
        sums,
    }
}
