use crate::config::Config;
use serde::Serialize;
use std::{fmt, net::SocketAddr};
use tokio::net::TcpListener;

#[derive(Debug, Serialize)]
pub struct PreflightIssue {
    pub field: String,
    pub message: String,
}

#[derive(Debug)]
pub struct PreflightError {
    pub issues: Vec<PreflightIssue>,
}

impl PreflightError {
    pub fn new(issues: Vec<PreflightIssue>) -> Self {
        Self { issues }
    }
}

impl fmt::Display for PreflightError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self
            .issues
            .iter()
            .map(|issue| format!("{}: {}", issue.field, issue.message))
            .collect();
        write!(f, "preflight failed: {}", messages.join("; "))
    }
}

impl std::error::Error for PreflightError {}

/// Checks the environment can host the server before anything is started.
pub async fn validate_start(config: &Config) -> Result<(), PreflightError> {
    let mut issues = check_settings(config);

    match value_as_socket_addr("http_addr", &config.http_addr) {
        Ok(addr) => {
            if let Err(err) = TcpListener::bind(addr).await.map(drop) {
                issues.push(PreflightIssue {
                    field: "http_addr".to_string(),
                    message: format!("Address {} is unavailable ({})", addr, err),
                });
            }
        }
        Err(issue) => issues.push(issue),
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(PreflightError::new(issues))
    }
}

fn check_settings(config: &Config) -> Vec<PreflightIssue> {
    let mut issues = Vec::new();
    if !config.path.starts_with('/') {
        issues.push(PreflightIssue {
            field: "path".to_string(),
            message: format!("Webhook path `{}` must start with `/`", config.path),
        });
    }
    if config.max_body_size == 0 {
        issues.push(PreflightIssue {
            field: "max_body_size".to_string(),
            message: "max_body_size must be greater than zero".to_string(),
        });
    }
    issues
}

fn value_as_socket_addr(field: &str, value: &str) -> Result<SocketAddr, PreflightIssue> {
    value.parse::<SocketAddr>().map_err(|err| PreflightIssue {
        field: field.to_string(),
        message: format!("Invalid {} `{}` ({})", field, value, err),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_validate_start_ok() {
        let config = Config {
            http_addr: "127.0.0.1:0".to_string(),
            ..Default::default()
        };
        assert!(validate_start(&config).await.is_ok());
    }

    #[tokio::test]
    async fn test_validate_start_collects_issues() {
        let config = Config {
            http_addr: "not-an-address".to_string(),
            path: "realtime".to_string(),
            max_body_size: 0,
            ..Default::default()
        };
        let err = validate_start(&config).await.unwrap_err();
        let fields: Vec<&str> = err.issues.iter().map(|i| i.field.as_str()).collect();
        assert_eq!(fields, vec!["path", "max_body_size", "http_addr"]);
        assert!(err.to_string().starts_with("preflight failed:"));
    }

    #[tokio::test]
    async fn test_validate_start_address_in_use() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let config = Config {
            http_addr: addr.to_string(),
            ..Default::default()
        };
        let err = validate_start(&config).await.unwrap_err();
        assert_eq!(err.issues.len(), 1);
        assert_eq!(err.issues[0].field, "http_addr");
    }
}
