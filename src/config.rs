//! Configuration file handling.
//!
//! The configuration file is stored at `$BUDGET_HOME/config.json`. It names the working form and
//! the aggregation session files and says how many backups of the form to keep.

use crate::aggregate::AggregatorSession;
use crate::backup::Backup;
use crate::model::{Dataset, Metadata};
use crate::normalize::{self, JsonDocument};
use crate::{utils, Result};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

const APP_NAME: &str = "budget";
const CONFIG_VERSION: u8 = 1;
const BACKUP_COPIES: u32 = 5;
const BACKUPS: &str = ".backups";
const CONFIG_JSON: &str = "config.json";
const FORM_JSON: &str = "form.json";
const AGGREGATE_JSON: &str = "aggregate.json";

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$BUDGET_HOME` and from there it loads `$BUDGET_HOME/config.json`. It provides
/// paths to the working form, the aggregation session and the backups directory.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    backups: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
}

impl Config {
    /// Creates the data directory, its backups subdirectory, an initial `config.json` and a blank
    /// working form carrying `metadata`.
    ///
    /// # Errors
    /// - Returns an error if any file operations fail.
    pub async fn create(dir: impl Into<PathBuf>, metadata: Metadata) -> Result<Self> {
        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the budget home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let backups = root.join(BACKUPS);
        utils::make_dir(&backups).await?;

        let config_path = root.join(CONFIG_JSON);
        let config_file = ConfigFile::default();
        config_file.save(&config_path).await?;

        let config = Self {
            root,
            backups,
            config_path,
            config_file,
        };
        config.save_form(&Dataset::blank(metadata)).await?;
        Ok(config)
    }

    /// This will
    /// - validate that `budget_home` and its config file exist
    /// - load the config file
    /// - validate that the backups directory exists
    pub async fn load(budget_home: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = budget_home.into();
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("Budget Home is missing, run `budget init` first")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;

        let config = Self {
            backups: root.join(BACKUPS),
            root,
            config_path,
            config_file,
        };
        if !config.backups.is_dir() {
            bail!(
                "The backups directory is missing '{}'",
                config.backups.display()
            )
        }
        Ok(config)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn backups(&self) -> &Path {
        &self.backups
    }

    pub fn backup_copies(&self) -> u32 {
        self.config_file.backup_copies
    }

    /// Creates a new `Backup` instance for managing backup files.
    pub fn backup(&self) -> Backup {
        Backup::new(self)
    }

    /// The working form, `form.json` unless the config file says otherwise.
    pub fn form_path(&self) -> PathBuf {
        self.resolve(self.config_file.form_path.as_deref(), FORM_JSON)
    }

    /// The saved aggregation session, `aggregate.json` unless the config file says otherwise.
    pub fn aggregate_path(&self) -> PathBuf {
        self.resolve(self.config_file.aggregate_path.as_deref(), AGGREGATE_JSON)
    }

    /// Loads the working form.
    pub async fn load_form(&self) -> Result<Dataset> {
        let path = self.form_path();
        let content = utils::read(&path).await?;
        let document: JsonDocument = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse the form at {}", path.display()))?;
        Ok(document.into_dataset())
    }

    /// Saves the working form, unnamed rows included.
    pub async fn save_form(&self, dataset: &Dataset) -> Result<()> {
        let path = self.form_path();
        debug!("Saving the form to {}", path.display());
        let json = serde_json::to_string_pretty(&normalize::snapshot(dataset))
            .context("Unable to serialize the form")?;
        utils::write(&path, json).await
    }

    pub async fn load_session(&self) -> Result<AggregatorSession> {
        AggregatorSession::load(&self.aggregate_path()).await
    }

    pub async fn save_session(&self, session: &AggregatorSession) -> Result<()> {
        session.save(&self.aggregate_path()).await
    }

    /// Returns `p` if it is absolute, `p` relative to the root if it is relative, and `default`
    /// under the root if there is no `p`.
    fn resolve(&self, p: Option<&Path>, default: &str) -> PathBuf {
        match p {
            Some(p) if p.is_absolute() => p.to_path_buf(),
            Some(p) => self.root.join(p),
            None => self.root.join(default),
        }
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "budget",
///   "config_version": 1,
///   "backup_copies": 5,
///   "form_path": "form.json",
///   "aggregate_path": "aggregate.json"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "budget"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// Number of backup copies of the form to keep
    backup_copies: u32,

    /// Path to the working form (optional, relative to the home directory or absolute)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    form_path: Option<PathBuf>,

    /// Path to the aggregation session (optional, relative to the home directory or absolute)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    aggregate_path: Option<PathBuf>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            backup_copies: BACKUP_COPIES,
            form_path: None,
            aggregate_path: None,
        }
    }
}

impl ConfigFile {
    /// Loads a ConfigFile asynchronously from the specified path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = utils::read(path).await?;

        let config: ConfigFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file at {}", path.display()))?;

        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );

        Ok(config)
    }

    /// Saves the ConfigFile to the specified path.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let p = path.as_ref();
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(p, data)
            .await
            .context("Unable to write config file")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_config_create() {
        let dir = TempDir::new().unwrap();
        let home_dir = dir.path().join("budget_home");

        let config = Config::create(&home_dir, Metadata::new("臺北市", "114", "王小明"))
            .await
            .unwrap();

        assert!(config.backups().is_dir());
        assert!(config.config_path().is_file());
        assert_eq!(config.form_path(), config.root().join(FORM_JSON));
        assert_eq!(config.backup_copies(), BACKUP_COPIES);

        let form = config.load_form().await.unwrap();
        assert_eq!(form.metadata().org, "臺北市");
        assert!(!form.has_content());
        for section in form.sections() {
            assert_eq!(section.len(), 1);
        }
    }

    #[tokio::test]
    async fn test_config_load() {
        let dir = TempDir::new().unwrap();
        Config::create(dir.path(), Metadata::default()).await.unwrap();
        let config = Config::load(dir.path()).await.unwrap();
        assert!(utils::read_dir(config.backups()).await.is_ok());
        assert_eq!(config.aggregate_path(), config.root().join(AGGREGATE_JSON));
    }

    #[tokio::test]
    async fn test_config_load_missing_home() {
        let dir = TempDir::new().unwrap();
        let result = Config::load(dir.path().join("nope")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_config_load_missing_backups() {
        let dir = TempDir::new().unwrap();
        let config = Config::create(dir.path(), Metadata::default()).await.unwrap();
        tokio::fs::remove_dir(config.backups()).await.unwrap();
        let err = Config::load(dir.path()).await.unwrap_err();
        assert!(err.to_string().contains("backups directory is missing"));
    }

    #[test]
    fn test_config_file_default() {
        let config = ConfigFile::default();
        assert_eq!(config.app_name, "budget");
        assert_eq!(config.backup_copies, 5);
        assert_eq!(config.form_path, None);
    }

    #[tokio::test]
    async fn test_config_file_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let original = ConfigFile {
            backup_copies: 7,
            form_path: Some(PathBuf::from("forms/current.json")),
            ..ConfigFile::default()
        };
        original.save(&config_path).await.unwrap();

        let loaded = ConfigFile::load(&config_path).await.unwrap();
        assert_eq!(original, loaded);
    }

    #[tokio::test]
    async fn test_config_file_load_with_minimal_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        let json = r#"{
            "app_name": "budget",
            "config_version": 1,
            "backup_copies": 3
        }"#;
        utils::write(&config_path, json).await.unwrap();

        let config = ConfigFile::load(&config_path).await.unwrap();
        assert_eq!(config.backup_copies, 3);
        assert_eq!(config.aggregate_path, None);
    }

    #[tokio::test]
    async fn test_config_file_load_invalid_app_name() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        let json = r#"{
            "app_name": "ledger",
            "config_version": 1,
            "backup_copies": 5
        }"#;
        utils::write(&config_path, json).await.unwrap();

        let result = ConfigFile::load(&config_path).await;
        assert!(result.unwrap_err().to_string().contains("Invalid app_name"));
    }

    #[test]
    fn test_config_file_serialization_omits_none_fields() {
        let json = serde_json::to_string(&ConfigFile::default()).unwrap();
        assert!(!json.contains("form_path"));
        assert!(!json.contains("aggregate_path"));
    }

    #[tokio::test]
    async fn test_custom_paths_resolve_against_root() {
        let dir = TempDir::new().unwrap();
        let config = Config::create(dir.path(), Metadata::default()).await.unwrap();
        let custom = ConfigFile {
            aggregate_path: Some(PathBuf::from("sessions/agg.json")),
            form_path: Some(dir.path().join("abs.json")),
            ..ConfigFile::default()
        };
        custom.save(config.config_path()).await.unwrap();

        let config = Config::load(dir.path()).await.unwrap();
        assert_eq!(
            config.aggregate_path(),
            config.root().join("sessions/agg.json")
        );
        assert_eq!(config.form_path(), dir.path().join("abs.json"));
    }

    #[tokio::test]
    async fn test_form_keeps_unnamed_rows() {
        use crate::model::{CategoryId, FieldKey, LineItem};
        let dir = TempDir::new().unwrap();
        let config = Config::create(dir.path(), Metadata::default()).await.unwrap();
        let mut form = config.load_form().await.unwrap();
        form.section_mut(CategoryId::Sp)
            .push(LineItem::from_raw([(FieldKey::Source, "3")]));
        config.save_form(&form).await.unwrap();

        let loaded = config.load_form().await.unwrap();
        assert_eq!(loaded.section(CategoryId::Sp).len(), 2);
    }
}
