use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::cli::SyncArgs;
use crate::error::TetherError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_PARALLEL: usize = 4;

pub struct Config {
    pub remote_url: String,
    pub token: Option<String>,
    pub root_folder: String,
    pub local_root: PathBuf,
    pub parallel: usize,
    pub timeout: Duration,
    pub json_output: bool,
    pub verbose: bool,
}

/// On-disk config shape (~/.config/tether/config.toml or --config).
/// Every field is optional; command-line flags win over the file.
#[derive(Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ConfigFile {
    remote_url: Option<String>,
    token: Option<String>,
    root_folder: Option<String>,
    local_root: Option<PathBuf>,
    parallel: Option<usize>,
    /// humantime duration string, e.g. "30s" or "2m"
    timeout: Option<String>,
}

impl Config {
    pub fn from_sync_args(args: &SyncArgs) -> Result<Self, TetherError> {
        let file = load_file(args.config.as_deref())?;

        let remote_url = args
            .remote
            .clone()
            .or(file.remote_url)
            .ok_or_else(|| {
                TetherError::Config("no remote url (pass --remote or set remote-url)".to_string())
            })?;

        let timeout = match &args.timeout {
            Some(secs) => Duration::from_secs(*secs),
            None => match &file.timeout {
                Some(text) => humantime::parse_duration(text).map_err(|e| {
                    TetherError::Config(format!("bad timeout '{text}' in config file: {e}"))
                })?,
                None => DEFAULT_TIMEOUT,
            },
        };

        Ok(Config {
            remote_url,
            token: args.token.clone().or(file.token),
            root_folder: args
                .root
                .clone()
                .or(file.root_folder)
                .unwrap_or_else(|| "/".to_string()),
            local_root: args
                .dest
                .clone()
                .or(file.local_root)
                .unwrap_or_else(|| PathBuf::from(".")),
            parallel: args.parallel.or(file.parallel).unwrap_or(DEFAULT_PARALLEL),
            timeout,
            json_output: args.json,
            verbose: args.verbose,
        })
    }
}

/// Read the config file if one exists. An explicitly passed path must
/// exist and parse; the default location is allowed to be absent.
fn load_file(explicit: Option<&std::path::Path>) -> Result<ConfigFile, TetherError> {
    let (path, required) = match explicit {
        Some(path) => (path.to_path_buf(), true),
        None => match default_config_path() {
            Some(path) => (path, false),
            None => return Ok(ConfigFile::default()),
        },
    };

    if !path.exists() {
        if required {
            return Err(TetherError::Config(format!(
                "config file {} not found",
                path.display()
            )));
        }
        return Ok(ConfigFile::default());
    }

    let text = fs::read_to_string(&path).map_err(|e| {
        TetherError::Config(format!("cannot read config file {}: {e}", path.display()))
    })?;

    toml::from_str(&text).map_err(|e| {
        TetherError::Config(format!("cannot parse config file {}: {e}", path.display()))
    })
}

/// ~/.config/tether/config.toml on Linux, platform equivalent elsewhere.
fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "tether")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(argv: &[&str]) -> SyncArgs {
        let mut full = vec!["tether"];
        full.extend_from_slice(argv);
        SyncArgs::parse_from(full)
    }

    #[test]
    fn flags_fill_the_config() {
        let config = Config::from_sync_args(&args(&[
            "--remote",
            "http://example.test",
            "--root",
            "/proj",
            "--dest",
            "/tmp/work",
            "--parallel",
            "8",
            "--timeout",
            "5",
        ]))
        .unwrap();

        assert_eq!(config.remote_url, "http://example.test");
        assert_eq!(config.root_folder, "/proj");
        assert_eq!(config.local_root, PathBuf::from("/tmp/work"));
        assert_eq!(config.parallel, 8);
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn missing_remote_is_a_config_error() {
        let result = Config::from_sync_args(&args(&["--dest", "/tmp/work"]));
        assert!(matches!(result, Err(TetherError::Config(_))));
    }

    #[test]
    fn explicit_config_file_must_exist() {
        let result = Config::from_sync_args(&args(&[
            "--config",
            "/definitely/not/here.toml",
            "--remote",
            "http://example.test",
        ]));
        assert!(matches!(result, Err(TetherError::Config(_))));
    }

    #[test]
    fn file_values_parse_and_flags_win() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "remote-url = \"http://file.test\"\nroot-folder = \"/from-file\"\ntimeout = \"45s\"\n",
        )
        .unwrap();

        let config = Config::from_sync_args(&args(&[
            "--config",
            path.to_str().unwrap(),
            "--root",
            "/from-flag",
        ]))
        .unwrap();

        assert_eq!(config.remote_url, "http://file.test");
        assert_eq!(config.root_folder, "/from-flag");
        assert_eq!(config.timeout, Duration::from_secs(45));
    }
}
