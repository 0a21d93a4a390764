//! Plugin manifest discovery and loading
//!
//! A plugin is a TOML manifest in the plugin directory declaring one or
//! more operations as formulas over `a` and `b`:
//!
//! ```toml
//! [plugin]
//! name = "extras"
//! description = "Percentages and spreads"
//!
//! [[operation]]
//! name = "percent"
//! formula = "a * b / 100"
//! description = "a percent of b"
//! ```

use crate::{Command, CommandRegistry, Formula, OperationMeta, OperationPlugin, OperationSource};
use abacus_core::{CalcError, Number};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// File extension of plugin manifests
pub const MANIFEST_EXTENSION: &str = "toml";

/// Index/initializer file stems that are never treated as plugins
const EXCLUDED_STEMS: [&str; 2] = ["mod", "index"];

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Manifest {
    plugin: Option<PluginSection>,
    #[serde(default, rename = "operation")]
    operations: Vec<OperationDecl>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PluginSection {
    name: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct OperationDecl {
    name: String,
    formula: String,
    description: Option<String>,
}

/// Operation declared by a manifest
#[derive(Debug, Clone)]
pub struct FormulaOperation {
    name: String,
    description: String,
    unit: String,
    formula: Arc<Formula>,
}

impl FormulaOperation {
    pub fn new(name: impl Into<String>, formula: Formula, unit: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            description: format!("{} = {}", name, formula),
            name,
            unit: unit.into(),
            formula: Arc::new(formula),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn formula(&self) -> &Formula {
        &self.formula
    }
}

impl OperationPlugin for FormulaOperation {
    fn meta(&self) -> OperationMeta {
        OperationMeta {
            name: self.name.clone(),
            description: self.description.clone(),
            usage: format!("{} <a> <b>  ({})", self.name, self.formula),
            source: OperationSource::Plugin(self.unit.clone()),
        }
    }

    fn construct(&self, a: Number, b: Number) -> Box<dyn Command> {
        Box::new(FormulaCommand {
            name: self.name.clone(),
            formula: Arc::clone(&self.formula),
            a,
            b,
        })
    }
}

struct FormulaCommand {
    name: String,
    formula: Arc<Formula>,
    a: Number,
    b: Number,
}

impl Command for FormulaCommand {
    fn operation(&self) -> &str {
        &self.name
    }

    fn operands(&self) -> (&Number, &Number) {
        (&self.a, &self.b)
    }

    fn execute(&self) -> Result<Number, CalcError> {
        self.formula.eval(&self.a, &self.b)
    }
}

/// A plugin unit that could not be loaded
#[derive(Debug, Clone)]
pub struct LoadFailure {
    /// File name of the manifest
    pub unit: String,
    pub error: CalcError,
}

/// Outcome of a [`PluginLoader::load_all`] pass
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Units loaded in this pass
    pub loaded: usize,
    /// Units skipped because an earlier pass already loaded them
    pub skipped: usize,
    /// Operation names registered, in load order
    pub operations: Vec<String>,
    /// Operation names that replaced an existing registration
    pub overridden: Vec<String>,
    pub failures: Vec<LoadFailure>,
}

impl LoadReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Loads manifest plugins into a [`CommandRegistry`].
///
/// Each manifest is loaded at most once per loader, however many times
/// `load_all` is called.
#[derive(Debug, Default)]
pub struct PluginLoader {
    loaded_units: HashSet<PathBuf>,
}

impl PluginLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every eligible manifest in `dir`.
    ///
    /// Units are visited in file-name order. A failing unit is recorded in
    /// the report and does not stop the remaining ones; only an unreadable
    /// directory is an error.
    pub fn load_all(&mut self, dir: &Path, registry: &mut CommandRegistry) -> Result<LoadReport, CalcError> {
        info!(dir = %dir.display(), "loading plugins");

        let units = discover(dir)?;
        let mut report = LoadReport::default();

        for path in units {
            let unit = unit_name(&path);
            let key = fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
            if self.loaded_units.contains(&key) {
                debug!(%unit, "plugin already loaded, skipping");
                report.skipped += 1;
                continue;
            }

            match load_unit(&path, &unit) {
                Ok(operations) => {
                    for op in operations {
                        let name = op.name.clone();
                        if registry.register(name.clone(), Arc::new(op)).is_some() {
                            report.overridden.push(name.clone());
                        }
                        report.operations.push(name);
                    }
                    self.loaded_units.insert(key);
                    report.loaded += 1;
                }
                Err(error) => {
                    warn!(%unit, %error, "plugin failed to load");
                    report.failures.push(LoadFailure { unit, error });
                }
            }
        }

        info!(
            loaded = report.loaded,
            skipped = report.skipped,
            failed = report.failures.len(),
            operations = report.operations.len(),
            "plugins loaded"
        );
        Ok(report)
    }
}

/// Eligible manifest paths in `dir`, sorted by file name
fn discover(dir: &Path) -> Result<Vec<PathBuf>, CalcError> {
    let entries = fs::read_dir(dir)
        .map_err(|e| CalcError::plugin_load(&dir.display().to_string(), e.to_string()))?;

    let mut units: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_eligible(path))
        .collect();
    units.sort_by_key(|path| unit_name(path));
    Ok(units)
}

fn is_eligible(path: &Path) -> bool {
    let has_extension = path
        .extension()
        .is_some_and(|ext| ext == MANIFEST_EXTENSION);
    let file_name = unit_name(path);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();

    has_extension
        && !file_name.starts_with('_')
        && !file_name.starts_with('.')
        && !EXCLUDED_STEMS.contains(&stem)
}

fn unit_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Parse and compile one manifest without touching the registry
fn load_unit(path: &Path, unit: &str) -> Result<Vec<FormulaOperation>, CalcError> {
    let text = fs::read_to_string(path)
        .map_err(|e| CalcError::plugin_load(unit, e.to_string()))?;
    let manifest: Manifest = toml::from_str(&text)
        .map_err(|e| CalcError::plugin_load(unit, e.to_string()))?;

    if let Some(plugin) = &manifest.plugin {
        debug!(%unit, plugin = %plugin.name, description = %plugin.description, "parsed manifest");
    }
    if manifest.operations.is_empty() {
        return Err(CalcError::plugin_load(unit, "manifest declares no operations"));
    }

    let mut seen = HashSet::new();
    let mut operations = Vec::with_capacity(manifest.operations.len());
    for decl in manifest.operations {
        let name = decl.name.trim().to_string();
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(CalcError::plugin_load(
                unit,
                format!("invalid operation name '{}': names must be a single word", decl.name),
            ));
        }
        if !seen.insert(name.clone()) {
            return Err(CalcError::plugin_load(unit, format!("operation '{}' declared twice", name)));
        }

        let formula = Formula::parse(&decl.formula)
            .map_err(|e| CalcError::plugin_load(unit, format!("operation '{}': {}", name, e.message)))?;
        let mut op = FormulaOperation::new(name, formula, unit);
        if let Some(description) = decl.description {
            op = op.with_description(description);
        }
        operations.push(op);
    }

    Ok(operations)
}
