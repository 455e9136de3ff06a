//! Named component parameters.

use std::collections::BTreeMap;

/// A single parameter value as entered in the property panel.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Number(f64),
    List(Vec<f64>),
    Text(String),
    Flag(bool),
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<Vec<f64>> for ParamValue {
    fn from(v: Vec<f64>) -> Self {
        Self::List(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Flag(v)
    }
}

/// Ordered parameter map with typed accessors.
///
/// Accessors are lenient: a numeric text such as `"1.5"` reads as a number,
/// and a single number reads as a one-element list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Params(BTreeMap<String, ParamValue>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        match self.0.get(name)? {
            ParamValue::Number(v) => Some(*v),
            ParamValue::Text(s) => s.trim().parse().ok(),
            ParamValue::Flag(b) => Some(if *b { 1.0 } else { 0.0 }),
            ParamValue::List(_) => None,
        }
    }

    pub fn number_or(&self, name: &str, default: f64) -> f64 {
        self.number(name).unwrap_or(default)
    }

    pub fn list(&self, name: &str) -> Option<Vec<f64>> {
        match self.0.get(name)? {
            ParamValue::List(v) => Some(v.clone()),
            ParamValue::Number(v) => Some(vec![*v]),
            _ => None,
        }
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.0.get(name)? {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_access() {
        let params = Params::new()
            .with("gain", 1.5)
            .with("signs", vec![1.0, -1.0])
            .with("label", "ctrl")
            .with("numeric_text", "2.5");

        assert_eq!(params.number("gain"), Some(1.5));
        assert_eq!(params.number("numeric_text"), Some(2.5));
        assert_eq!(params.number("label"), None);
        assert_eq!(params.number_or("missing", 7.0), 7.0);
        assert_eq!(params.list("signs"), Some(vec![1.0, -1.0]));
        assert_eq!(params.list("gain"), Some(vec![1.5]));
        assert_eq!(params.text("label"), Some("ctrl"));
    }
}
