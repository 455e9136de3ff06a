//! Schematic construction errors.

use sl_core::ComponentId;
use thiserror::Error;

/// Errors raised while assembling a schematic.
///
/// Connectivity resolution itself never fails; these only cover malformed
/// edits such as duplicate ids or references to terminals that do not exist.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NetlistError {
    /// A component with this id is already placed.
    #[error("Component '{id}' already exists")]
    DuplicateComponent { id: ComponentId },

    /// No component with this id is placed.
    #[error("Component '{id}' does not exist")]
    UnknownComponent { id: ComponentId },

    /// The component has no terminal with this name.
    #[error("Component '{component}' has no terminal named '{terminal}'")]
    UnknownTerminal {
        component: ComponentId,
        terminal: String,
    },

    /// Two terminals of one component share a name.
    #[error("Component '{component}' declares terminal '{terminal}' more than once")]
    DuplicateTerminal {
        component: ComponentId,
        terminal: String,
    },

    /// Merge tolerance must be finite and non-negative.
    #[error("Merge tolerance must be finite and >= 0 (got {value})")]
    InvalidTolerance { value: f64 },
}

pub type NetlistResult<T> = Result<T, NetlistError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offender() {
        let err = NetlistError::UnknownTerminal {
            component: "R1".into(),
            terminal: "C".into(),
        };
        assert_eq!(err.to_string(), "Component 'R1' has no terminal named 'C'");

        let err = NetlistError::InvalidTolerance { value: -1.0 };
        assert_eq!(err.to_string(), "Merge tolerance must be finite and >= 0 (got -1)");
    }
}
