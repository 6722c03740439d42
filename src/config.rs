use anyhow::Result;
use clap::Parser;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "marginalia")]
#[command(about = "Runs the marginalia highlight service", long_about = None)]
pub struct Cli {
    #[arg(short = 'c', long = "config")]
    pub config_path: Option<String>,
}

pub fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".marginalia")
}

pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.yaml")
}

#[derive(Debug, Deserialize, Clone)]
pub struct App {
    #[serde(default = "default_port")]
    port: i32,
    // overrides <data dir>/highlights as the store root
    #[serde(default)]
    pub highlights_dir: Option<String>,
}

fn default_port() -> i32 {
    4170
}

impl Default for App {
    fn default() -> Self {
        App {
            port: default_port(),
            highlights_dir: None,
        }
    }
}

impl App {
    pub fn get_port(&self) -> i32 {
        self.port
    }

    pub fn store_root(&self, data_dir: &Path) -> PathBuf {
        match &self.highlights_dir {
            Some(dir) => PathBuf::from(dir),
            None => data_dir.join("highlights"),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub app: App,
}

impl Config {
    /// Loads the YAML config, substituting `${VAR}` and `${VAR:-default}`
    /// references from the environment. A missing file yields the defaults
    /// so the service works with zero setup.
    pub fn new(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            tracing::warn!(path = %path, "config file not found, using defaults");
            return Ok(Config::default());
        }
        let cfg = Config::load_config(path)?;
        Ok(cfg)
    }

    fn load_config(path: &str) -> Result<Config> {
        let yaml_str = fs::read_to_string(path)?;
        let yaml_with_env = Config::substitute_env_vars(&yaml_str)?;
        let config: Config = serde_yaml::from_str(&yaml_with_env)?;
        Ok(config)
    }

    fn substitute_env_vars(yaml_str: &str) -> Result<String> {
        let mut result = yaml_str.to_string();
        let mut offset = 0;

        while let Some(start) = result[offset..].find("${") {
            let actual_start = offset + start;
            if let Some(end) = result[actual_start..].find("}") {
                let var_name = &result[actual_start + 2..actual_start + end];

                // Handle default values like ${VAR:-default}
                let env_value = if let Some(default_start) = var_name.find(":-") {
                    let actual_var = &var_name[..default_start];
                    let default_val = &var_name[default_start + 2..];
                    env::var(actual_var).unwrap_or_else(|_| default_val.to_string())
                } else {
                    env::var(var_name).unwrap_or_else(|_| {
                        tracing::warn!("environment variable '{}' not found", var_name);
                        String::new()
                    })
                };

                result.replace_range(actual_start..actual_start + end + 1, &env_value);
                offset = actual_start + env_value.len();
            } else {
                break;
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_falls_back_to_defaults() {
        let cfg = Config::new("/nonexistent/marginalia-config.yaml").unwrap();
        assert_eq!(cfg.app.get_port(), default_port());
        assert!(cfg.app.highlights_dir.is_none());
    }

    #[test]
    fn test_env_substitution_with_default() {
        let yaml = "app:\n  port: ${MARGINALIA_TEST_UNSET_PORT:-4321}\n";
        let substituted = Config::substitute_env_vars(yaml).unwrap();
        assert!(substituted.contains("port: 4321"));
    }

    #[test]
    fn test_store_root_defaults_under_data_dir() {
        let app = App::default();
        assert_eq!(
            app.store_root(Path::new("/data")),
            PathBuf::from("/data/highlights")
        );
    }
}
