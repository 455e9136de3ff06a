use core::fmt;

/// Identifier of a placed component (circuit element or control block).
///
/// Identifiers come from the editing layer and are opaque strings; ordering is
/// lexical and only used for deterministic map iteration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(String);

impl ComponentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ComponentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ComponentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl core::borrow::Borrow<str> for ComponentId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Net identifier handed to the electrical solver.
///
/// `"0"` is reserved for ground; every other net is numbered from `"1"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NetId(String);

impl NetId {
    pub const GROUND: &'static str = "0";

    /// The reserved ground net.
    pub fn ground() -> Self {
        Self(Self::GROUND.to_string())
    }

    /// A non-ground net; `n` starts at 1.
    pub fn numbered(n: u32) -> Self {
        debug_assert!(n > 0, "net 0 is reserved for ground");
        Self(n.to_string())
    }

    pub fn is_ground(&self) -> bool {
        self.0 == Self::GROUND
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ground_is_reserved() {
        assert!(NetId::ground().is_ground());
        assert_eq!(NetId::ground().as_str(), "0");
        assert!(!NetId::numbered(1).is_ground());
        assert_eq!(NetId::numbered(12).to_string(), "12");
    }

    #[test]
    fn component_id_borrows_as_str() {
        let mut map = std::collections::HashMap::new();
        map.insert(ComponentId::new("R1"), 1.0);
        assert_eq!(map.get("R1"), Some(&1.0));
    }
}
