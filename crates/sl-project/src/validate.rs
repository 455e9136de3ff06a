//! Circuit description validation.

use std::collections::{HashMap, HashSet};

use sl_netlist::ComponentKind;

use crate::schema::{
    CircuitDescription, ComponentDef, LATEST_VERSION, MAX_TIME_STEPS, ParamDef, SimSettings,
    TerminalRefDef, WireDef,
};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Duplicate ID: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Missing reference: {id} in {context}")]
    MissingReference { id: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

fn invalid(field: impl Into<String>, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.into(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

pub fn validate_description(desc: &CircuitDescription) -> Result<(), ValidationError> {
    if desc.version == 0 || desc.version > LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: desc.version,
        });
    }

    validate_settings(&desc.settings)?;

    let mut terminals_by_component: HashMap<&str, Vec<String>> = HashMap::new();
    for component in &desc.components {
        if terminals_by_component.contains_key(component.id.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: component.id.clone(),
                context: "components".to_string(),
            });
        }
        validate_component(component)?;
        terminals_by_component.insert(&component.id, terminal_names(component));
    }

    for (i, wire) in desc.wires.iter().enumerate() {
        validate_wire(i, wire, &terminals_by_component)?;
    }

    Ok(())
}

/// Check solver settings on their own, e.g. after command-line overrides.
pub fn validate_settings(settings: &SimSettings) -> Result<(), ValidationError> {
    if !(settings.tolerance.is_finite() && settings.tolerance > 0.0) {
        return Err(invalid(
            "settings.tolerance",
            settings.tolerance,
            "must be positive",
        ));
    }
    if !(settings.dt.is_finite() && settings.dt > 0.0) {
        return Err(invalid("settings.dt", settings.dt, "must be positive"));
    }
    if !(settings.t_end.is_finite() && settings.t_end >= 0.0) {
        return Err(invalid(
            "settings.t_end",
            settings.t_end,
            "must be non-negative",
        ));
    }
    if settings.t_end / settings.dt > MAX_TIME_STEPS as f64 {
        return Err(invalid(
            "settings.dt",
            settings.dt,
            &format!("t_end / dt must not exceed {MAX_TIME_STEPS} steps"),
        ));
    }
    Ok(())
}

fn validate_component(component: &ComponentDef) -> Result<(), ValidationError> {
    let id = &component.id;
    if id.trim().is_empty() {
        return Err(invalid("component.id", "\"\"", "must not be empty"));
    }

    let [x, y] = component.position;
    if !(x.is_finite() && y.is_finite()) {
        return Err(invalid(
            format!("component '{id}' position"),
            format!("[{x}, {y}]"),
            "must be finite",
        ));
    }

    let r = component.rotation;
    if !r.is_finite() || r % 90.0 != 0.0 {
        return Err(invalid(
            format!("component '{id}' rotation"),
            r,
            "must be a multiple of 90 degrees",
        ));
    }

    if let Some(terminals) = &component.terminals {
        let mut names = HashSet::new();
        for t in terminals {
            if !names.insert(t.name.as_str()) {
                return Err(ValidationError::DuplicateId {
                    id: t.name.clone(),
                    context: format!("component '{id}' terminals"),
                });
            }
            let [ox, oy] = t.offset;
            if !(ox.is_finite() && oy.is_finite()) {
                return Err(invalid(
                    format!("component '{id}' terminal '{}' offset", t.name),
                    format!("[{ox}, {oy}]"),
                    "must be finite",
                ));
            }
        }
    }

    for (name, value) in &component.params {
        let finite = match value {
            ParamDef::Number(v) => v.is_finite() || (v.is_infinite() && is_bound(name)),
            ParamDef::List(vs) => vs.iter().all(|v| v.is_finite()),
            ParamDef::Flag(_) | ParamDef::Text(_) => true,
        };
        if !finite {
            return Err(invalid(
                format!("component '{id}' param '{name}'"),
                format!("{value:?}"),
                "must be finite",
            ));
        }
    }

    Ok(())
}

/// Limits and rates may be infinite to mean "unbounded".
fn is_bound(name: &str) -> bool {
    matches!(
        name,
        "out_min" | "out_max" | "lower" | "upper" | "rising_rate" | "falling_rate"
    )
}

fn terminal_names(component: &ComponentDef) -> Vec<String> {
    match &component.terminals {
        Some(terminals) => terminals.iter().map(|t| t.name.clone()).collect(),
        None => ComponentKind::from_tag(&component.kind)
            .default_terminals()
            .into_iter()
            .map(|t| t.name)
            .collect(),
    }
}

fn validate_wire(
    index: usize,
    wire: &WireDef,
    terminals_by_component: &HashMap<&str, Vec<String>>,
) -> Result<(), ValidationError> {
    for [[x0, y0], [x1, y1]] in &wire.segments {
        if ![x0, y0, x1, y1].iter().all(|v| v.is_finite()) {
            return Err(invalid(
                format!("wire {index} segment"),
                format!("[[{x0}, {y0}], [{x1}, {y1}]]"),
                "must be finite",
            ));
        }
    }

    for end in [&wire.start, &wire.end].into_iter().flatten() {
        check_reference(index, end, terminals_by_component)?;
    }
    Ok(())
}

fn check_reference(
    index: usize,
    r: &TerminalRefDef,
    terminals_by_component: &HashMap<&str, Vec<String>>,
) -> Result<(), ValidationError> {
    let Some(terminals) = terminals_by_component.get(r.component.as_str()) else {
        return Err(ValidationError::MissingReference {
            id: r.component.clone(),
            context: format!("wire {index} component"),
        });
    };
    if !terminals.iter().any(|t| *t == r.terminal) {
        return Err(ValidationError::MissingReference {
            id: format!("{}.{}", r.component, r.terminal),
            context: format!("wire {index} terminal"),
        });
    }
    Ok(())
}
