//! Commands that read or describe the working form.

use crate::args::{CategoryFilter, MetaArgs};
use crate::calc::Totals;
use crate::commands::Out;
use crate::model::{CategoryId, Cell, FieldKey, Metadata};
use crate::schema::{label_for, schemas};
use crate::{Config, Result};
use serde::Serialize;
use std::fmt::Write;

/// One field of a category layout, as printed by `labels`.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct FieldView {
    pub category: CategoryId,
    pub key: FieldKey,
    pub label: &'static str,
    pub derived: bool,
}

/// One recomputed category of the form, as printed by `show`.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct SectionView {
    pub category: CategoryId,
    pub title: &'static str,
    pub rows: Vec<Vec<Cell>>,
    pub totals: Totals,
}

fn selected(filter: &CategoryFilter) -> impl Iterator<Item = CategoryId> + '_ {
    CategoryId::ALL
        .into_iter()
        .filter(move |&c| filter.category().map_or(true, |only| only == c))
}

/// Lists the fields of each category with their category-specific labels.
pub fn labels(filter: &CategoryFilter) -> Result<Out<Vec<FieldView>>> {
    let mut views = Vec::new();
    let mut message = String::new();
    for schema in schemas()
        .iter()
        .filter(|s| selected(filter).any(|c| c == s.id))
    {
        writeln!(message, "{} ({})", schema.title, schema.id)?;
        for &key in schema.fields {
            let view = FieldView {
                category: schema.id,
                key,
                label: label_for(schema.id, key).as_str(),
                derived: schema.is_derived(key),
            };
            writeln!(
                message,
                "  {:<10} {}{}",
                key,
                view.label,
                if view.derived { " (derived)" } else { "" }
            )?;
            views.push(view);
        }
    }
    Ok(Out::new(message.trim_end(), views))
}

/// Recomputes the form and prints every row and the totals of each selected category. Negative
/// values are marked with `*`.
pub async fn show(config: &Config, filter: &CategoryFilter) -> Result<Out<Vec<SectionView>>> {
    let mut form = config.load_form().await?;
    let totals = form.recompute();

    let meta = form.metadata();
    let mut message = format!(
        "{} {}年度預算 (填表人: {})\n",
        meta.org, meta.year, meta.user
    );
    let mut views = Vec::new();
    for (section, totals) in form.sections().iter().zip(totals) {
        if !selected(filter).any(|c| c == section.category()) {
            continue;
        }
        let schema = section.schema();
        writeln!(message, "\n{} ({})", schema.title, schema.id)?;

        let rows: Vec<Vec<Cell>> = section.items().iter().map(|i| i.cells(schema)).collect();
        for (index, cells) in rows.iter().enumerate() {
            let line = cells
                .iter()
                .map(|c| {
                    let label = label_for(schema.id, c.key);
                    let mark = if c.negative { "*" } else { "" };
                    format!("{label}: {}{mark}", c.display())
                })
                .collect::<Vec<_>>()
                .join(" | ");
            writeln!(message, "  [{index}] {line}")?;
        }
        let line = totals
            .iter()
            .map(|(key, _)| {
                let mark = if totals.is_negative(key) { "*" } else { "" };
                format!("{}: {}{mark}", label_for(schema.id, key), totals.display(key))
            })
            .collect::<Vec<_>>()
            .join(" | ");
        writeln!(message, "  合計 {line}")?;

        views.push(SectionView {
            category: section.category(),
            title: schema.title,
            rows,
            totals,
        });
    }
    Ok(Out::new(message.trim_end(), views))
}

/// Updates the metadata fields that are given and leaves the rest unchanged.
pub async fn meta(config: &Config, args: &MetaArgs) -> Result<Out<Metadata>> {
    let mut form = config.load_form().await?;
    let metadata = form.metadata_mut();
    if let Some(org) = args.org() {
        metadata.org = org.to_string();
    }
    if let Some(year) = args.year() {
        metadata.year = year.to_string();
    }
    if let Some(user) = args.user() {
        metadata.user = user.to_string();
    }
    let metadata = metadata.clone();
    config.save_form(&form).await?;
    Ok(Out::new(
        format!(
            "Updated the form metadata: {} / {} / {}",
            metadata.org, metadata.year, metadata.user
        ),
        metadata,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;

    #[test]
    fn test_labels_use_category_overrides() {
        let out = labels(&CategoryFilter::new(Some(CategoryId::Wk))).unwrap();
        let views = out.structure().unwrap();
        assert_eq!(views.len(), 8);
        assert!(views.iter().all(|v| v.category == CategoryId::Wk));
        let surplus = views.iter().find(|v| v.key == FieldKey::Surplus).unwrap();
        assert!(surplus.derived);
        assert_eq!(surplus.label, label_for(CategoryId::Wk, FieldKey::Surplus).as_str());
        let rev = views.iter().find(|v| v.key == FieldKey::Rev).unwrap();
        assert!(!rev.derived);
    }

    #[test]
    fn test_labels_all() {
        let out = labels(&CategoryFilter::default()).unwrap();
        assert_eq!(out.structure().unwrap().len(), 12 + 8 + 7 * 3);
    }

    #[tokio::test]
    async fn test_show_blank_form() {
        let env = TestEnv::new().await;
        let out = show(&env.config(), &CategoryFilter::default()).await.unwrap();
        let views = out.structure().unwrap();
        assert_eq!(views.len(), 5);
        assert!(views.iter().all(|v| v.rows.len() == 1));
        assert!(out.message().contains("一、營業基金"));
    }

    #[tokio::test]
    async fn test_meta_partial_update() {
        let env = TestEnv::new().await;
        let config = env.config();
        meta(
            &config,
            &MetaArgs::new(Some("臺北市".into()), Some("114".into()), None),
        )
        .await
        .unwrap();
        let out = meta(&config, &MetaArgs::new(None, Some("115".into()), None))
            .await
            .unwrap();
        let metadata = out.structure().unwrap();
        assert_eq!(metadata.org, "臺北市");
        assert_eq!(metadata.year, "115");
        assert_eq!(config.load_form().await.unwrap().metadata(), metadata);
    }
}
