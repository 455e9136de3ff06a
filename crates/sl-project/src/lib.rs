//! sl-project: circuit description files and validation.

pub mod convert;
pub mod schema;
pub mod validate;

pub use schema::*;
pub use validate::{ValidationError, validate_description, validate_settings};

use tracing::debug;

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Schematic error: {0}")]
    Netlist(#[from] sl_netlist::NetlistError),

    #[error("Invalid value: {0}")]
    Core(#[from] sl_core::SlError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parse and validate a YAML description.
pub fn from_yaml_str(content: &str) -> ProjectResult<CircuitDescription> {
    let desc: CircuitDescription = serde_yaml::from_str(content)?;
    validate_description(&desc)?;
    Ok(desc)
}

/// Parse and validate a JSON description.
pub fn from_json_str(content: &str) -> ProjectResult<CircuitDescription> {
    let desc: CircuitDescription = serde_json::from_str(content)?;
    validate_description(&desc)?;
    Ok(desc)
}

pub fn load_yaml(path: &std::path::Path) -> ProjectResult<CircuitDescription> {
    let content = std::fs::read_to_string(path)?;
    let desc = from_yaml_str(&content)?;
    debug!(path = %path.display(), name = desc.name.as_str(), "loaded description");
    Ok(desc)
}

pub fn load_json(path: &std::path::Path) -> ProjectResult<CircuitDescription> {
    let content = std::fs::read_to_string(path)?;
    let desc = from_json_str(&content)?;
    debug!(path = %path.display(), name = desc.name.as_str(), "loaded description");
    Ok(desc)
}

/// Load by extension: `.json` as JSON, anything else as YAML.
pub fn load(path: &std::path::Path) -> ProjectResult<CircuitDescription> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => load_json(path),
        _ => load_yaml(path),
    }
}
