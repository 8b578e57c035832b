//! The aggregation session commands.

use crate::aggregate::{read_files, Summary};
use crate::commands::Out;
use crate::{Config, Result};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, warn};

/// One entry of the session, as listed by `aggregate list`.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct EntryView {
    pub index: usize,
    pub source: String,
    pub org: String,
    pub year: String,
    pub funds: usize,
}

/// The outcome of `aggregate add`.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct AddReport {
    pub added: Vec<PathBuf>,
    /// Files that could not be imported, with the reason.
    pub failed: Vec<(PathBuf, String)>,
    pub summary: Summary,
}

/// Imports every file in `paths` concurrently and appends the ones that parse to the session, in
/// the order they finish. A file that fails is reported and skipped.
pub async fn aggregate_add(config: &Config, paths: &[PathBuf]) -> Result<Out<AddReport>> {
    let mut session = config.load_session().await?;
    let mut added = Vec::new();
    let mut failed = Vec::new();
    for (path, result) in read_files(paths.to_vec()).await {
        match result {
            Ok(dataset) => {
                debug!("Adding {} to the aggregation", path.display());
                session.push(path.display().to_string(), dataset);
                added.push(path);
            }
            Err(e) => {
                warn!("Skipping {}: {e:#}", path.display());
                failed.push((path, format!("{e:#}")));
            }
        }
    }
    config.save_session(&session).await?;

    let summary = session.summary();
    let mut message = format!(
        "Added {} of {} file{}; the session holds {} organization{}",
        added.len(),
        paths.len(),
        if paths.len() == 1 { "" } else { "s" },
        session.len(),
        if session.len() == 1 { "" } else { "s" },
    );
    for (path, reason) in &failed {
        message.push_str(&format!("\n  failed: {}: {reason}", path.display()));
    }
    Ok(Out::new(
        message,
        AddReport {
            added,
            failed,
            summary,
        },
    ))
}

/// Lists the session entries.
pub async fn aggregate_list(config: &Config) -> Result<Out<Vec<EntryView>>> {
    let session = config.load_session().await?;
    let views: Vec<EntryView> = session
        .entries()
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let meta = entry.dataset.metadata();
            EntryView {
                index,
                source: entry.source.clone(),
                org: meta.org.clone(),
                year: meta.year.clone(),
                funds: entry.dataset.named_items(),
            }
        })
        .collect();
    let message = if views.is_empty() {
        "The aggregation session is empty".to_string()
    } else {
        views
            .iter()
            .map(|v| {
                format!(
                    "[{}] {} {} ({} funds) {}",
                    v.index, v.org, v.year, v.funds, v.source
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };
    Ok(Out::new(message, views))
}

/// Removes one entry and reports the recomputed summary.
pub async fn aggregate_remove(config: &Config, index: usize) -> Result<Out<Summary>> {
    let mut session = config.load_session().await?;
    let removed = session.remove(index)?;
    config.save_session(&session).await?;
    let summary = session.summary();
    Ok(Out::new(
        format!("Removed {} from the aggregation\n{summary}", removed.source),
        summary,
    ))
}

/// Empties the session.
pub async fn aggregate_clear(config: &Config) -> Result<Out<Summary>> {
    let mut session = config.load_session().await?;
    let count = session.len();
    session.clear();
    config.save_session(&session).await?;
    Ok(Out::new(
        format!(
            "Removed {count} organization{} from the aggregation",
            if count == 1 { "" } else { "s" }
        ),
        session.summary(),
    ))
}

/// Reports the summary figures of the session.
pub async fn aggregate_summary(config: &Config) -> Result<Out<Summary>> {
    let summary = config.load_session().await?.summary();
    Ok(Out::new(summary.to_string(), summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BudgetError;
    use crate::test::TestEnv;
    use crate::utils;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn test_session_survives_between_commands() {
        let env = TestEnv::new().await;
        let config = env.config();
        let a = env.path("a.json");
        let b = env.path("b.html");
        let bad = env.path("bad.json");
        utils::write(&a, r#"{"op":[{"name":"甲","rev":"100","nonrev":"0"}]}"#)
            .await
            .unwrap();
        utils::write(
            &b,
            r#"<html><head><title>乙縣 114年度預算</title></head><body>
               <table><tbody id="tbody-db"><tr><td class="v-name">債務</td>
               <td class="v-source">50</td></tr></tbody></table></body></html>"#,
        )
        .await
        .unwrap();
        utils::write(&bad, "{").await.unwrap();

        let out = aggregate_add(&config, &[a.clone(), b.clone(), bad.clone()])
            .await
            .unwrap();
        let report = out.structure().unwrap();
        assert_eq!(report.added.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, bad);

        let summary = aggregate_summary(&config).await.unwrap();
        let summary = summary.structure().unwrap();
        assert_eq!(summary.organization_count, 2);
        assert_eq!(summary.fund_count, 2);
        assert_eq!(summary.total_scale, Decimal::from(150));

        let list = aggregate_list(&config).await.unwrap();
        let views = list.structure().unwrap();
        assert_eq!(views.len(), 2);
        let b_index = views.iter().position(|v| v.org == "乙縣").unwrap();
        assert_eq!(views[b_index].year, "114");

        let out = aggregate_remove(&config, b_index).await.unwrap();
        assert_eq!(out.structure().unwrap().total_scale, Decimal::from(100));

        let err = aggregate_remove(&config, 5).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BudgetError>(),
            Some(BudgetError::EntryIndex { index: 5, len: 1 })
        ));

        let out = aggregate_clear(&config).await.unwrap();
        assert_eq!(out.structure().unwrap(), &Summary::default());
        assert!(aggregate_list(&config)
            .await
            .unwrap()
            .structure()
            .unwrap()
            .is_empty());
    }
}
