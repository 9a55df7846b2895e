use anyhow::Error;
use clap::Parser;
use serde::{Deserialize, Serialize};

const DEFAULT_MAX_BODY_SIZE: usize = 64 * 1024;

#[derive(Parser, Debug)]
#[command(version, long_version = crate::version::get_version_info())]
pub struct Cli {
    #[clap(long, default_value = "rtserver.toml")]
    pub conf: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub http_addr: String,
    /// Route the platform posts call events to
    pub path: String,
    pub log_level: Option<String>,
    pub log_file: Option<String>,
    /// Overrides the `User-Agent` banner of command responses
    pub server_name: Option<String>,
    pub max_body_size: usize,
    /// Media played by the built-in welcome application
    pub welcome_media: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_addr: "0.0.0.0:8080".to_string(),
            path: "/".to_string(),
            log_level: Some("info".to_string()),
            log_file: None,
            server_name: None,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            welcome_media: "welcome.wav".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self, Error> {
        let config = toml::from_str(
            &std::fs::read_to_string(path).map_err(|e| anyhow::anyhow!("{}: {}", e, path))?,
        )?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_partial_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
http_addr = "127.0.0.1:9090"
path = "/realtime"
server_name = "Realtime Basic Server 1.0"
"#
        )
        .unwrap();

        let config = Config::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.http_addr, "127.0.0.1:9090");
        assert_eq!(config.path, "/realtime");
        assert_eq!(config.server_name.as_deref(), Some("Realtime Basic Server 1.0"));
        assert_eq!(config.log_level.as_deref(), Some("info"));
        assert_eq!(config.max_body_size, DEFAULT_MAX_BODY_SIZE);
        assert_eq!(config.welcome_media, "welcome.wav");
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load("/nonexistent/rtserver.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/rtserver.toml"));
    }

    #[test]
    fn test_load_invalid_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "http_addr = ").unwrap();
        assert!(Config::load(file.path().to_str().unwrap()).is_err());
    }
}
