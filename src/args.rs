//! These structs provide the CLI interface for the budget CLI.

use crate::model::{CategoryId, FieldKey};
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// budget: A command-line tool for fund-accounting budget forms.
///
/// Line items are entered per fund category (operating, working, debt, special-revenue and
/// capital-project funds). Derived fields such as gross profit, net income and the closing fund
/// balance are recomputed on every change. The form can be exported as JSON, as a tagged HTML
/// document or as CSV, and exported files from many organizations can be collected into an
/// aggregation session that reports summary figures.
#[derive(Debug, Parser, Clone)]
#[command(name = "budget")]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory, the configuration file and an empty form.
    ///
    /// This is the first command you should run. By default the data directory is $HOME/budget;
    /// pass --budget-home or set BUDGET_HOME to put it somewhere else.
    Init(InitArgs),
    /// Print the fields of each category with their labels and whether they are derived.
    Labels(CategoryFilter),
    /// Print the rows and totals of the form.
    Show(CategoryFilter),
    /// Update the organization, year or user of the form.
    Meta(MetaArgs),
    /// Add, edit or remove rows of the form.
    Row(RowArgs),
    /// Write the form to a file.
    Export(ExportArgs),
    /// Replace the form with the contents of a JSON or tagged HTML file.
    ///
    /// The current form is backed up first. Nothing changes unless the whole file parses.
    Import(ImportArgs),
    /// Collect exported files from many organizations and summarize them.
    Aggregate(AggregateArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where the form and configuration are held. Defaults to ~/budget
    #[arg(long, env = "BUDGET_HOME", default_value_t = default_budget_home())]
    budget_home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, budget_home: PathBuf) -> Self {
        Self {
            log_level,
            budget_home: budget_home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn budget_home(&self) -> &DisplayPath {
        &self.budget_home
    }
}

/// (Not shown): Args for the `budget init` command.
#[derive(Debug, Default, Parser, Clone)]
pub struct InitArgs {
    /// The organization the form belongs to.
    #[arg(long, default_value = "")]
    org: String,

    /// The fiscal year, e.g. 114.
    #[arg(long, default_value = "")]
    year: String,

    /// The person filling in the form.
    #[arg(long, default_value = "")]
    user: String,
}

impl InitArgs {
    pub fn new(org: impl Into<String>, year: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            org: org.into(),
            year: year.into(),
            user: user.into(),
        }
    }

    pub fn org(&self) -> &str {
        &self.org
    }

    pub fn year(&self) -> &str {
        &self.year
    }

    pub fn user(&self) -> &str {
        &self.user
    }
}

/// (Not shown): Restricts `show` and `labels` to one category.
#[derive(Debug, Default, Parser, Clone)]
pub struct CategoryFilter {
    /// One of op, wk, db, sp, cp. All categories when omitted.
    #[arg(long)]
    category: Option<CategoryId>,
}

impl CategoryFilter {
    pub fn new(category: Option<CategoryId>) -> Self {
        Self { category }
    }

    pub fn category(&self) -> Option<CategoryId> {
        self.category
    }
}

/// (Not shown): Args for the `budget meta` command. Omitted values are left unchanged.
#[derive(Debug, Default, Parser, Clone)]
pub struct MetaArgs {
    #[arg(long)]
    org: Option<String>,

    #[arg(long)]
    year: Option<String>,

    #[arg(long)]
    user: Option<String>,
}

impl MetaArgs {
    pub fn new(org: Option<String>, year: Option<String>, user: Option<String>) -> Self {
        Self { org, year, user }
    }

    pub fn org(&self) -> Option<&str> {
        self.org.as_deref()
    }

    pub fn year(&self) -> Option<&str> {
        self.year.as_deref()
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }
}

/// (Not shown): Args for the `budget row` command.
#[derive(Debug, Parser, Clone)]
pub struct RowArgs {
    #[command(subcommand)]
    action: RowSubcommand,
}

impl RowArgs {
    pub fn new(action: RowSubcommand) -> Self {
        Self { action }
    }

    pub fn action(&self) -> &RowSubcommand {
        &self.action
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum RowSubcommand {
    /// Append a row to a category, e.g. `budget row add op name=自來水事業 rev=1000`.
    Add(RowAddArgs),
    /// Set fields of an existing row, e.g. `budget row set op 0 cost=400`.
    Set(RowSetArgs),
    /// Remove a row. A category left without rows gets one blank row.
    Remove(RowRemoveArgs),
}

/// (Not shown): Args for `budget row add`.
#[derive(Debug, Parser, Clone)]
pub struct RowAddArgs {
    category: CategoryId,

    /// Field values as key=value.
    values: Vec<FieldAssignment>,
}

impl RowAddArgs {
    pub fn new(category: CategoryId, values: Vec<FieldAssignment>) -> Self {
        Self { category, values }
    }

    pub fn category(&self) -> CategoryId {
        self.category
    }

    pub fn values(&self) -> &[FieldAssignment] {
        &self.values
    }
}

/// (Not shown): Args for `budget row set`.
#[derive(Debug, Parser, Clone)]
pub struct RowSetArgs {
    category: CategoryId,

    /// The zero-based row index, as printed by `budget show`.
    index: usize,

    /// Field values as key=value.
    #[arg(required = true)]
    values: Vec<FieldAssignment>,
}

impl RowSetArgs {
    pub fn new(category: CategoryId, index: usize, values: Vec<FieldAssignment>) -> Self {
        Self {
            category,
            index,
            values,
        }
    }

    pub fn category(&self) -> CategoryId {
        self.category
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn values(&self) -> &[FieldAssignment] {
        &self.values
    }
}

/// (Not shown): Args for `budget row remove`.
#[derive(Debug, Parser, Clone)]
pub struct RowRemoveArgs {
    category: CategoryId,

    /// The zero-based row index, as printed by `budget show`.
    index: usize,
}

impl RowRemoveArgs {
    pub fn new(category: CategoryId, index: usize) -> Self {
        Self { category, index }
    }

    pub fn category(&self) -> CategoryId {
        self.category
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

/// A `key=value` pair from the command line. The value may be empty and may contain `=`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FieldAssignment {
    key: FieldKey,
    value: String,
}

impl FieldAssignment {
    pub fn new(key: FieldKey, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }

    pub fn key(&self) -> FieldKey {
        self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl FromStr for FieldAssignment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, value) = s
            .split_once('=')
            .ok_or_else(|| format!("expected key=value, got '{s}'"))?;
        let key = FieldKey::from_str(key.trim()).map_err(|_| format!("unknown field '{key}'"))?;
        Ok(Self::new(key, value))
    }
}

/// The file formats `budget export` can write.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ExportFormat {
    /// The JSON document, which `budget import` reads back.
    Json,
    /// An editable HTML form, which `budget import` reads back.
    Html,
    /// A read-only HTML report with grouped numbers, which `budget import` reads back.
    StaticHtml,
    /// A spreadsheet for printing or further processing.
    Csv,
}

serde_plain::derive_display_from_serialize!(ExportFormat);
serde_plain::derive_fromstr_from_deserialize!(ExportFormat);

/// (Not shown): Args for the `budget export` command.
#[derive(Debug, Parser, Clone)]
pub struct ExportArgs {
    #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
    format: ExportFormat,

    /// Where to write the file. An existing file is overwritten.
    #[arg(long)]
    output: PathBuf,

    /// Export even when nothing has been entered.
    #[arg(long)]
    force: bool,
}

impl ExportArgs {
    pub fn new(format: ExportFormat, output: impl Into<PathBuf>, force: bool) -> Self {
        Self {
            format,
            output: output.into(),
            force,
        }
    }

    pub fn format(&self) -> ExportFormat {
        self.format
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn force(&self) -> bool {
        self.force
    }
}

/// (Not shown): Args for the `budget import` command.
#[derive(Debug, Parser, Clone)]
pub struct ImportArgs {
    /// A .json or .html file written by `budget export`.
    path: PathBuf,
}

impl ImportArgs {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// (Not shown): Args for the `budget aggregate` command.
#[derive(Debug, Parser, Clone)]
pub struct AggregateArgs {
    #[command(subcommand)]
    action: AggregateSubcommand,
}

impl AggregateArgs {
    pub fn new(action: AggregateSubcommand) -> Self {
        Self { action }
    }

    pub fn action(&self) -> &AggregateSubcommand {
        &self.action
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum AggregateSubcommand {
    /// Import files into the session. Files that fail are reported and skipped.
    Add(AggregateAddArgs),
    /// List the files in the session.
    List,
    /// Remove one file from the session by its zero-based index.
    Remove(AggregateRemoveArgs),
    /// Remove every file from the session.
    Clear,
    /// Print the summary figures of the session.
    Summary,
}

/// (Not shown): Args for `budget aggregate add`.
#[derive(Debug, Parser, Clone)]
pub struct AggregateAddArgs {
    #[arg(required = true)]
    paths: Vec<PathBuf>,
}

impl AggregateAddArgs {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

/// (Not shown): Args for `budget aggregate remove`.
#[derive(Debug, Parser, Clone)]
pub struct AggregateRemoveArgs {
    index: usize,
}

impl AggregateRemoveArgs {
    pub fn new(index: usize) -> Self {
        Self { index }
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

fn default_budget_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("budget"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --budget-home or BUDGET_HOME instead of relying on the default \
                budget home directory. If you continue using the program right now, you may have \
                problems!",
            );
            PathBuf::from("budget")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn new(path: PathBuf) -> Self {
        Self(path)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}
