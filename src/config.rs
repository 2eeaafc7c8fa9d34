use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub const DEFAULT_MAX_LINE: usize = 127;
pub const DEFAULT_MAX_CMDS: usize = 16;
pub const DEFAULT_MAX_ARGS: usize = 32;

/// Bounds applied while tokenizing and building a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Usable bytes per line, terminator excluded.
    pub max_line: usize,
    pub max_cmds: usize,
    pub max_args: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_line: DEFAULT_MAX_LINE,
            max_cmds: DEFAULT_MAX_CMDS,
            max_args: DEFAULT_MAX_ARGS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub prompt: String,
    pub limits: Limits,
}

impl Default for Config {
    fn default() -> Self {
        ConfigLoader::default_config()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn default_config() -> Config {
        Config {
            prompt: "bsh$ ".to_string(),
            limits: Limits::default(),
        }
    }

    /// `$BSH_CONFIG` if set, otherwise `~/.bshrc`.
    pub fn default_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os("BSH_CONFIG") {
            return Some(PathBuf::from(path));
        }
        std::env::var_os("HOME").map(|home| Path::new(&home).join(".bshrc"))
    }

    /// Loads the file at `default_path`, falling back to the defaults when
    /// there is none.
    pub fn load() -> Result<Config, ConfigError> {
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load_from_file(path),
            _ => Ok(Self::default_config()),
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let src = fs::read_to_string(path)?;
        Self::load_from_str(&src)
    }

    pub fn load_from_str(src: &str) -> Result<Config, ConfigError> {
        let mut config = Self::default_config();

        for (lineno, line) in src.lines().enumerate() {
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(ConfigError::Parse(format!("Line {}: No '=' found: {}", lineno + 1, line)));
            };

            match key.trim() {
                // Kept verbatim so a prompt can end in a space.
                "prompt" => config.prompt = value.to_string(),
                "max_line" => config.limits.max_line = parse_limit(lineno, line, value)?,
                "max_cmds" => config.limits.max_cmds = parse_limit(lineno, line, value)?,
                "max_args" => config.limits.max_args = parse_limit(lineno, line, value)?,
                k => return Err(ConfigError::Parse(format!("Line {}: Unknown key: {}", lineno + 1, k))),
            }
        }

        Ok(config)
    }
}

fn parse_limit(lineno: usize, line: &str, value: &str) -> Result<usize, ConfigError> {
    match value.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::Parse(format!("Line {}: Invalid limit: {}", lineno + 1, line))),
    }
}
