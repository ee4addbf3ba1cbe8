use std::fs;
use std::path::{Path, PathBuf};

use glob::Pattern;
use serde::{Deserialize, Serialize};

use crate::errors::{AirError, Result};

/// Name of the configuration file stored inside the `.air` directory.
pub const CONFIG_FILENAME: &str = "config.json";

/// Name of the hidden directory holding project settings.
pub const AIR_DIR: &str = ".air";

/// Configuration for an AIR project.
///
/// Controls which files are scanned by the forward pass and what goes into
/// the `<meta>` block of the generated PIR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AirConfig {
    /// Schema version of the configuration.
    pub version: u32,
    /// Root directory of the project.
    pub root_dir: String,
    /// Project name written as `name:`; the root directory name when empty.
    pub name: String,
    /// Value written as `profile:`.
    pub profile: String,
    /// Glob patterns for files to scan.
    pub include: Vec<String>,
    /// Glob patterns for files to skip. These win over `include`.
    pub exclude: Vec<String>,
    /// Files larger than this many bytes are skipped.
    pub max_file_size: u64,
}

impl Default for AirConfig {
    fn default() -> Self {
        Self {
            version: 1,
            root_dir: String::new(),
            name: String::new(),
            profile: "auto".to_string(),
            include: [
                "py", "c", "h", "cpp", "cc", "cxx", "hpp", "hh", "hxx", "rs", "java", "s", "S",
                "asm", "ld", "lds",
            ]
            .iter()
            .map(|ext| format!("**/*.{ext}"))
            .collect(),
            exclude: vec![
                ".git/**".to_string(),
                ".air/**".to_string(),
                "target/**".to_string(),
                "build/**".to_string(),
                "node_modules/**".to_string(),
                "__pycache__/**".to_string(),
                "**/__pycache__/**".to_string(),
                "venv/**".to_string(),
                ".venv/**".to_string(),
            ],
            max_file_size: 1_048_576,
        }
    }
}

/// Returns the path to the `.air` directory within the given project root.
pub fn get_air_dir(project_root: &Path) -> PathBuf {
    project_root.join(AIR_DIR)
}

/// Returns the path to `config.json` within the `.air` directory.
pub fn get_config_path(project_root: &Path) -> PathBuf {
    get_air_dir(project_root).join(CONFIG_FILENAME)
}

/// Loads the configuration from disk.
///
/// If the configuration file does not exist, returns a default configuration
/// with `root_dir` set to the given project root. Missing keys take their
/// default values.
pub fn load_config(project_root: &Path) -> Result<AirConfig> {
    let config_path = get_config_path(project_root);

    if !config_path.exists() {
        return Ok(AirConfig {
            root_dir: project_root.to_string_lossy().to_string(),
            ..AirConfig::default()
        });
    }

    let contents = fs::read_to_string(&config_path).map_err(|e| AirError::Config {
        message: format!(
            "failed to read config file '{}': {}",
            config_path.display(),
            e
        ),
    })?;

    serde_json::from_str(&contents).map_err(|e| AirError::Config {
        message: format!(
            "failed to parse config file '{}': {}",
            config_path.display(),
            e
        ),
    })
}

/// Saves the configuration atomically: written to a temporary file first,
/// then renamed into place.
pub fn save_config(project_root: &Path, config: &AirConfig) -> Result<()> {
    let air_dir = get_air_dir(project_root);
    fs::create_dir_all(&air_dir).map_err(|e| AirError::Config {
        message: format!(
            "failed to create directory '{}': {}",
            air_dir.display(),
            e
        ),
    })?;

    let config_path = get_config_path(project_root);
    let tmp_path = config_path.with_extension("tmp");

    let json = serde_json::to_string_pretty(config).map_err(|e| AirError::Config {
        message: format!("failed to serialize config: {}", e),
    })?;

    fs::write(&tmp_path, &json).map_err(|e| AirError::Config {
        message: format!(
            "failed to write temporary config file '{}': {}",
            tmp_path.display(),
            e
        ),
    })?;

    fs::rename(&tmp_path, &config_path).map_err(|e| AirError::Config {
        message: format!(
            "failed to rename '{}' to '{}': {}",
            tmp_path.display(),
            config_path.display(),
            e
        ),
    })?;

    Ok(())
}

/// Determines whether a project-relative path should be scanned.
///
/// A file is included only if it matches at least one include pattern and
/// no exclude pattern.
pub fn should_include_file(file_path: &str, config: &AirConfig) -> bool {
    let match_opts = glob::MatchOptions {
        case_sensitive: true,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    };
    let matches = |patterns: &[String]| {
        patterns.iter().any(|p| {
            Pattern::new(p)
                .map(|pattern| pattern.matches_with(file_path, match_opts))
                .unwrap_or(false)
        })
    };

    !matches(&config.exclude) && matches(&config.include)
}
