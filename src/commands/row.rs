//! Row-level edits of the working form.

use crate::args::{FieldAssignment, RowAddArgs, RowRemoveArgs, RowSetArgs};
use crate::calc::Totals;
use crate::commands::Out;
use crate::model::{Cell, LineItem, Section};
use crate::{Config, Result};
use serde::Serialize;
use tracing::debug;

/// A row after an edit, together with the new totals of its category.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct RowChange {
    pub index: usize,
    pub cells: Vec<Cell>,
    pub totals: Totals,
}

/// Appends a row to a category. Every assigned field must be a user-entered field of the
/// category; nothing is saved otherwise.
pub async fn row_add(config: &Config, args: &RowAddArgs) -> Result<Out<RowChange>> {
    let mut form = config.load_form().await?;
    let section = form.section_mut(args.category());
    check(section, args.values())?;

    let item = LineItem::from_raw(args.values().iter().map(|a| (a.key(), a.value())));
    let totals = section.push(item);
    let index = section.len() - 1;
    let change = change(section, index, totals);
    config.save_form(&form).await?;

    Ok(Out::new(
        format!("Added row {index} to {}", args.category()),
        change,
    ))
}

/// Sets fields of an existing row. All assignments are applied or none are.
pub async fn row_set(config: &Config, args: &RowSetArgs) -> Result<Out<RowChange>> {
    let mut form = config.load_form().await?;
    let section = form.section_mut(args.category());
    check(section, args.values())?;

    let mut totals = None;
    for assignment in args.values() {
        totals = Some(section.set(args.index(), assignment.key(), assignment.value())?);
    }
    let totals = match totals {
        Some(totals) => totals,
        None => crate::calc::totals(section),
    };
    let change = change(section, args.index(), totals);
    config.save_form(&form).await?;

    Ok(Out::new(
        format!(
            "Updated {} field{} of row {} in {}",
            args.values().len(),
            if args.values().len() == 1 { "" } else { "s" },
            args.index(),
            args.category()
        ),
        change,
    ))
}

/// Removes a row. A category left without rows gets one blank row.
pub async fn row_remove(config: &Config, args: &RowRemoveArgs) -> Result<Out<Totals>> {
    let mut form = config.load_form().await?;
    let section = form.section_mut(args.category());
    let removed = section.remove(args.index())?;
    debug!("Removed row '{}' from {}", removed.name(), args.category());
    section.ensure_row();
    let totals = crate::calc::recompute(section);
    config.save_form(&form).await?;

    Ok(Out::new(
        format!("Removed row {} from {}", args.index(), args.category()),
        totals,
    ))
}

fn check(section: &Section, values: &[FieldAssignment]) -> Result<()> {
    for assignment in values {
        section.check_editable(assignment.key())?;
    }
    Ok(())
}

fn change(section: &Section, index: usize, totals: Totals) -> RowChange {
    let cells = section
        .items()
        .get(index)
        .map(|item| item.cells(section.schema()))
        .unwrap_or_default();
    RowChange {
        index,
        cells,
        totals,
    }
}
