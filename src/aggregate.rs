//! The aggregation view: many imported budget files folded into summary figures.

use crate::calc::formula;
use crate::error::BudgetError;
use crate::model::{group_thousands, Amount, Dataset, FieldKey};
use crate::normalize::{self, JsonDocument};
use crate::{utils, Result};
use anyhow::{anyhow, Context};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::task::JoinSet;
use tracing::{debug, error};

/// Input amounts are in thousands, so this divisor reports the total scale in units of 億.
const HUNDRED_MILLION_IN_THOUSANDS: i64 = 100_000;

/// Summary figures over a set of datasets.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize)]
pub struct Summary {
    pub organization_count: usize,
    pub fund_count: usize,
    pub total_scale: Decimal,
    pub surplus_count: usize,
    pub deficit_count: usize,
}

impl Summary {
    /// `total_scale` in units of 億, rounded to two decimals.
    pub fn scale_in_hundred_millions(&self) -> Decimal {
        (self.total_scale / Decimal::from(HUNDRED_MILLION_IN_THOUSANDS)).round_dp(2)
    }
}

impl Display for Summary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut hundred_millions = self.scale_in_hundred_millions();
        hundred_millions.rescale(2);
        writeln!(f, "機關總數: {}", self.organization_count)?;
        writeln!(f, "基金總數: {}", self.fund_count)?;
        writeln!(
            f,
            "總收入規模: {} (億: {})",
            Amount::grouped(self.total_scale),
            group_thousands(hundred_millions)
        )?;
        write!(
            f,
            "盈虧分佈: 盈 {} / 虧 {}",
            self.surplus_count, self.deficit_count
        )
    }
}

/// Folds `datasets` into a `Summary`. Always computed from scratch.
///
/// Every named row is one fund. Its revenue is `rev + nonrev` for the operating and working
/// categories and `source` for the balance-style ones. Its balance is the first non-zero of
/// `net` and `surplus`, else `end - begin`; a balance of zero counts as a surplus. Sums past
/// the `Decimal` range saturate, as in `calc`.
pub fn summarize<'a>(datasets: impl IntoIterator<Item = &'a Dataset>) -> Summary {
    let mut summary = Summary::default();
    for dataset in datasets {
        summary.organization_count += 1;
        for section in dataset.sections() {
            let f = formula(section.category());
            for item in section.items().iter().filter(|i| i.has_name()) {
                summary.fund_count += 1;
                summary.total_scale = summary.total_scale.saturating_add(f.scale(item));

                let net = item.value(FieldKey::Net);
                let surplus = item.value(FieldKey::Surplus);
                let balance = if !net.is_zero() {
                    net
                } else if !surplus.is_zero() {
                    surplus
                } else {
                    item.value(FieldKey::End)
                        .saturating_sub(item.value(FieldKey::Begin))
                };
                if balance >= Decimal::ZERO {
                    summary.surplus_count += 1;
                } else {
                    summary.deficit_count += 1;
                }
            }
        }
    }
    summary
}

/// One imported file.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Entry {
    /// Where the dataset came from, usually a file path.
    pub source: String,
    pub dataset: Dataset,
}

/// The list of datasets collected by the aggregation view.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct AggregatorSession {
    entries: Vec<Entry>,
}

/// The on-disk form of an `AggregatorSession`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SessionFile {
    entries: Vec<SessionFileEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionFileEntry {
    source: String,
    document: JsonDocument,
}

impl AggregatorSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push(&mut self, source: impl Into<String>, dataset: Dataset) {
        self.entries.push(Entry {
            source: source.into(),
            dataset,
        });
    }

    /// Removes the entry at `index`.
    pub fn remove(&mut self, index: usize) -> std::result::Result<Entry, BudgetError> {
        if index >= self.entries.len() {
            return Err(BudgetError::EntryIndex {
                index,
                len: self.entries.len(),
            });
        }
        Ok(self.entries.remove(index))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn summary(&self) -> Summary {
        summarize(self.entries.iter().map(|e| &e.dataset))
    }

    /// Loads a session saved with `save`. A missing file is an empty session.
    pub async fn load(path: &Path) -> Result<Self> {
        if !utils::is_file(path).await {
            debug!("No aggregation session at {}", path.display());
            return Ok(Self::new());
        }
        let content = utils::read(path).await?;
        let file: SessionFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse aggregation session {}", path.display()))?;
        let entries = file
            .entries
            .into_iter()
            .map(|e| Entry {
                source: e.source,
                dataset: e.document.into_dataset(),
            })
            .collect();
        Ok(Self { entries })
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        let file = SessionFile {
            entries: self
                .entries
                .iter()
                .map(|e| SessionFileEntry {
                    source: e.source.clone(),
                    document: normalize::to_json(&e.dataset),
                })
                .collect(),
        };
        let json = serde_json::to_string_pretty(&file)
            .context("Failed to serialize the aggregation session")?;
        utils::write(path, json).await
    }
}

/// Reads and parses every file in `paths` concurrently.
///
/// Results are returned in the order the reads complete, which need not be the order of `paths`.
/// A file that fails to read or parse yields an `Err` without affecting the others. Every path
/// gets exactly one outcome, even when its task dies.
pub async fn read_files(paths: Vec<PathBuf>) -> Vec<(PathBuf, Result<Dataset>)> {
    read_each(paths, |path| async move { read_file(&path).await }).await
}

async fn read_each<F, Fut>(paths: Vec<PathBuf>, read: F) -> Vec<(PathBuf, Result<Dataset>)>
where
    F: Fn(PathBuf) -> Fut,
    Fut: Future<Output = Result<Dataset>> + Send + 'static,
{
    let mut set = JoinSet::new();
    for path in paths.iter().cloned() {
        let task = read(path.clone());
        set.spawn(async move { (path, task.await) });
    }

    let mut unfinished = paths;
    let mut outcomes = Vec::new();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((path, result)) => {
                if let Some(i) = unfinished.iter().position(|p| *p == path) {
                    unfinished.swap_remove(i);
                }
                outcomes.push((path, result));
            }
            Err(e) => error!("A file import task failed: {e}"),
        }
    }

    // a task that panicked or was cancelled never handed its path back
    outcomes.extend(unfinished.into_iter().map(|path| {
        let e = anyhow!("The import of {} did not finish", path.display());
        (path, Err(e))
    }));
    outcomes
}

async fn read_file(path: &Path) -> Result<Dataset> {
    let content = utils::read(path).await?;
    let dataset = normalize::import(Some(path), &content)
        .with_context(|| format!("Unable to import {}", path.display()))?;
    Ok(dataset)
}
