//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and value ranges (ceilings > 0, capacities > 0)
//! - Check asset definitions (unique paths, exactly one source)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: TapConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use axum::http::StatusCode;

use crate::config::schema::{AssetConfig, TapConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Validate a parsed configuration.
pub fn validate_config(config: &TapConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let primary = config.listener.bind_address.parse::<SocketAddr>();
    if let Err(e) = &primary {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("invalid socket address: {}", e),
        ));
    }

    match config.listener.observer_address() {
        Ok(observer) => {
            if let Ok(primary) = primary {
                if primary.port() != 0 && primary == observer {
                    errors.push(ValidationError::new(
                        "listener.observer_bind_address",
                        "must differ from listener.bind_address",
                    ));
                }
            }
        }
        Err(e) if config.listener.observer_bind_address.is_some() => {
            errors.push(ValidationError::new(
                "listener.observer_bind_address",
                format!("invalid socket address: {}", e),
            ));
        }
        Err(_) => {}
    }

    if config.listener.max_connections == 0 {
        errors.push(ValidationError::new("listener.max_connections", "must be > 0"));
    }
    if config.body.max_bytes == 0 {
        errors.push(ValidationError::new("body.max_bytes", "must be > 0"));
    }
    if config.observer.queue_capacity == 0 {
        errors.push(ValidationError::new("observer.queue_capacity", "must be > 0"));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "invalid socket address",
        ));
    }

    let mut seen = HashSet::new();
    for (i, asset) in config.assets.iter().enumerate() {
        validate_asset(i, asset, &mut seen, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_asset(
    index: usize,
    asset: &AssetConfig,
    seen: &mut HashSet<String>,
    errors: &mut Vec<ValidationError>,
) {
    let field = |name: &str| format!("assets[{}].{}", index, name);
    let path = asset.path.trim_start_matches('/');

    if path.is_empty() {
        errors.push(ValidationError::new(field("path"), "must not be empty"));
    } else if path.contains('?') || path.contains('#') {
        errors.push(ValidationError::new(
            field("path"),
            "must not contain a query or fragment",
        ));
    } else if !seen.insert(path.to_string()) {
        errors.push(ValidationError::new(
            field("path"),
            format!("duplicate asset path '/{}'", path),
        ));
    }

    match (&asset.file, &asset.content) {
        (Some(_), Some(_)) => errors.push(ValidationError::new(
            field("file"),
            "set either file or content, not both",
        )),
        (None, None) => errors.push(ValidationError::new(
            field("content"),
            "one of file or content is required",
        )),
        _ => {}
    }

    if StatusCode::from_u16(asset.status_code).is_err() {
        errors.push(ValidationError::new(
            field("status_code"),
            format!("invalid HTTP status {}", asset.status_code),
        ));
    }
    if asset.content_type.trim().is_empty() {
        errors.push(ValidationError::new(field("content_type"), "must not be empty"));
    }
}
