//! JSON config file handling and command-line overrides.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "ccprompt_config.json";
pub const DEFAULT_OUTPUT_FILE: &str = "extracted_code.txt";
pub const DEFAULT_LANGUAGE: &str = "python";

/// `target_name` may be a list or one comma-separated string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TargetNames {
    List(Vec<String>),
    Joined(String),
}

impl Default for TargetNames {
    fn default() -> Self {
        TargetNames::List(Vec::new())
    }
}

impl TargetNames {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            TargetNames::List(names) => names,
            TargetNames::Joined(joined) => joined.split(',').map(str::to_string).collect(),
        }
    }
}

/// Contents of the config file. Missing keys take their defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub target_name: TargetNames,
    pub project_path: String,
    pub venv_site_packages_path: String,
    pub exclude_venv: bool,
    pub output_file: String,
    pub language: String,
}

impl Default for FileConfig {
    fn default() -> Self {
        let project_path = std::env::current_dir()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            target_name: TargetNames::default(),
            project_path,
            venv_site_packages_path: String::new(),
            exclude_venv: false,
            output_file: DEFAULT_OUTPUT_FILE.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

/// Values given on the command line; `None` defers to the file.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub project_path: Option<PathBuf>,
    pub target_names: Vec<String>,
    pub exclude_venv: bool,
    pub output_file: Option<PathBuf>,
    pub language: Option<String>,
}

/// Fully merged run configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunConfig {
    pub target_names: Vec<String>,
    pub project_path: PathBuf,
    pub venv_site_packages_path: Option<PathBuf>,
    pub output_file: PathBuf,
    pub language: String,
}

impl RunConfig {
    /// Project first, then the venv when it is set.
    pub fn search_paths(&self) -> Vec<PathBuf> {
        let mut paths = vec![self.project_path.clone()];
        paths.extend(self.venv_site_packages_path.clone());
        paths
    }
}

/// Read `path`, writing the default config first when it is missing or
/// empty.
pub fn load_or_create(path: &Path) -> Result<FileConfig> {
    let needs_creation = match fs::metadata(path) {
        Err(_) => {
            println!(
                "No configuration file found. Creating default config file at {}.",
                path.display()
            );
            true
        }
        Ok(meta) if meta.len() == 0 => {
            println!(
                "Configuration file {} is empty. Writing default configurations.",
                path.display()
            );
            true
        }
        Ok(_) => false,
    };
    if needs_creation {
        let defaults = serde_json::to_string_pretty(&FileConfig::default())?;
        fs::write(path, defaults).with_context(|| {
            format!("Error creating default configuration file {}", path.display())
        })?;
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Error loading configuration file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Error loading configuration file {}", path.display()))
}

fn non_empty(value: String) -> Option<PathBuf> {
    if value.trim().is_empty() {
        None
    } else {
        Some(PathBuf::from(value))
    }
}

/// Command-line values win over file values.
pub fn merge(file: FileConfig, overrides: Overrides, config_path: &Path) -> Result<RunConfig> {
    let target_names = if overrides.target_names.is_empty() {
        file.target_name.into_vec()
    } else {
        overrides.target_names
    };
    let target_names: Vec<String> = target_names
        .into_iter()
        .filter(|name| !name.trim().is_empty())
        .collect();
    let project_path = overrides
        .project_path
        .or_else(|| non_empty(file.project_path));

    let Some(project_path) = project_path.filter(|_| !target_names.is_empty()) else {
        bail!(
            "You must provide both function/class names and a project path in the configuration \
             file or via command-line arguments.\nPlease update the configuration file at {} or \
             provide the required parameters via command-line.\n\nExample command-line usage:\n  \
             ccprompt --target-names MyFunction MyClass --project-path /path/to/project",
            config_path.display()
        );
    };

    let exclude_venv = overrides.exclude_venv || file.exclude_venv;
    let venv_site_packages_path = if exclude_venv {
        None
    } else {
        non_empty(file.venv_site_packages_path)
    };

    Ok(RunConfig {
        target_names,
        project_path,
        venv_site_packages_path,
        output_file: overrides
            .output_file
            .or_else(|| non_empty(file.output_file))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_FILE)),
        language: overrides.language.unwrap_or(file.language),
    })
}
