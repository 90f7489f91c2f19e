// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use serde::Deserialize;

use crate::task::{FilePropertySpec, ImplementationSnapshot, TaskSpec, ValueSnapshot};
use crate::types::{CaseSensitivity, HistoryStorageMode, PathSensitivity};
use crate::vfs::path::normalize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [config]
/// case_sensitive = true
/// history = "file"
/// history_dir = ".snapcheck"
///
/// [default]
/// exclude = ["**/*.tmp"]
///
/// [task.compile]
/// implementation = "rustc 1.80 -O"
/// incremental = true
/// after = ["generate"]
/// properties = { target = "x86_64" }
/// inputs = [{ name = "sources", paths = ["src"], sensitivity = "relative" }]
/// outputs = [{ name = "classes", paths = ["build/classes"] }]
/// ```
///
/// This is the unvalidated form; convert it into a [`ConfigFile`] with
/// `ConfigFile::try_from`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub default: DefaultSection,

    /// All tasks from `[task.<name>]`, keyed by task name.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// A validated configuration: at least one task, known and acyclic `after`
/// references, well-formed file properties.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub default: DefaultSection,
    pub task: BTreeMap<String, TaskConfig>,
}

impl ConfigFile {
    /// Build without validation. Only the `TryFrom` impl should call this.
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        default: DefaultSection,
        task: BTreeMap<String, TaskConfig>,
    ) -> Self {
        Self {
            config,
            default,
            task,
        }
    }

    pub fn case_sensitivity(&self) -> CaseSensitivity {
        CaseSensitivity::from_flag(self.config.case_sensitive)
    }

    /// Directory holding persisted history, resolved against `base_dir`.
    pub fn history_dir(&self, base_dir: &Path) -> PathBuf {
        resolve(base_dir, &self.config.history_dir)
    }

    /// Task declarations with every path made absolute against `base_dir`,
    /// in task-name order.
    pub fn task_specs(&self, base_dir: &Path) -> Vec<TaskSpec> {
        self.task
            .iter()
            .map(|(name, task)| task.to_spec(name, base_dir))
            .collect()
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Whether path segments are compared case-sensitively.
    #[serde(default = "default_case_sensitive")]
    pub case_sensitive: bool,

    /// `"file"` (default) or `"memory"`.
    #[serde(default)]
    pub history: HistoryStorageMode,

    /// Where file history is kept, relative to the config file.
    #[serde(default = "default_history_dir")]
    pub history_dir: String,
}

fn default_case_sensitive() -> bool {
    true
}

fn default_history_dir() -> String {
    ".snapcheck".to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            case_sensitive: default_case_sensitive(),
            history: HistoryStorageMode::default(),
            history_dir: default_history_dir(),
        }
    }
}

/// `[default]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DefaultSection {
    /// Glob patterns skipped when scanning any declared root. A pattern
    /// matches either the absolute path or the file name.
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// Identity of the unit of work (e.g. a command line plus tool version).
    ///
    /// A task without one is never up to date and never cached.
    #[serde(default)]
    pub implementation: Option<String>,

    /// Whether the task can process an input delta instead of rebuilding.
    #[serde(default)]
    pub incremental: bool,

    #[serde(default = "default_cacheable")]
    pub cacheable: bool,

    /// Tasks evaluated before this one.
    #[serde(default)]
    pub after: Vec<String>,

    /// Non-file input values.
    #[serde(default)]
    pub properties: BTreeMap<String, toml::Value>,

    #[serde(default)]
    pub inputs: Vec<FilePropertyConfig>,

    /// Output properties. Their `sensitivity` is ignored: outputs are always
    /// fingerprinted by absolute path.
    #[serde(default)]
    pub outputs: Vec<FilePropertyConfig>,
}

fn default_cacheable() -> bool {
    true
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            implementation: None,
            incremental: false,
            cacheable: default_cacheable(),
            after: Vec::new(),
            properties: BTreeMap::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }
}

impl TaskConfig {
    pub fn to_spec(&self, name: &str, base_dir: &Path) -> TaskSpec {
        let implementation = match &self.implementation {
            Some(identity) => ImplementationSnapshot::from_identity(name, identity),
            None => ImplementationSnapshot::unknown(name),
        };

        let mut spec = TaskSpec::new(name, implementation);
        spec.incremental = self.incremental;
        spec.cacheable = self.cacheable;
        spec.depends_on = self.after.clone();
        spec.input_properties = self
            .properties
            .iter()
            .map(|(key, value)| (key.clone(), ValueSnapshot::of_str(&render_value(value))))
            .collect();
        spec.input_files = self
            .inputs
            .iter()
            .map(|p| p.to_spec(base_dir, p.sensitivity))
            .collect();
        spec.output_files = self
            .outputs
            .iter()
            .map(|p| p.to_spec(base_dir, PathSensitivity::Absolute))
            .collect();
        spec
    }
}

/// One entry of `inputs` / `outputs`.
#[derive(Debug, Clone, Deserialize)]
pub struct FilePropertyConfig {
    pub name: String,

    /// Roots of the property, relative to the config file unless absolute.
    pub paths: Vec<String>,

    #[serde(default)]
    pub sensitivity: PathSensitivity,
}

impl FilePropertyConfig {
    fn to_spec(&self, base_dir: &Path, sensitivity: PathSensitivity) -> FilePropertySpec {
        let roots = self
            .paths
            .iter()
            .map(|p| normalize(&resolve(base_dir, p).to_string_lossy()))
            .collect();
        FilePropertySpec::new(self.name.clone(), roots, sensitivity)
    }
}

/// Make `path` absolute against `base_dir` and drop `.` / `..` segments
/// lexically.
fn resolve(base_dir: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    };

    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Canonical text of a property value. Table keys are already sorted, so two
/// equal values always render the same.
fn render_value(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => format!("{s:?}"),
        toml::Value::Integer(i) => i.to_string(),
        toml::Value::Float(f) => f.to_string(),
        toml::Value::Boolean(b) => b.to_string(),
        toml::Value::Datetime(d) => d.to_string(),
        toml::Value::Array(items) => {
            let items: Vec<String> = items.iter().map(render_value).collect();
            format!("[{}]", items.join(","))
        }
        toml::Value::Table(table) => {
            let mut entries: Vec<String> = table
                .iter()
                .map(|(k, v)| format!("{k:?}={}", render_value(v)))
                .collect();
            entries.sort();
            format!("{{{}}}", entries.join(","))
        }
    }
}
