use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Which derived shapes a field should be left out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterScope {
    /// Excluded from input shapes (create/update payloads).
    #[serde(alias = "in")]
    Input,
    /// Excluded from output shapes (public projections).
    #[serde(alias = "out")]
    Output,
    /// Excluded from every derived shape.
    Any,
}

impl FilterScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterScope::Input => "input",
            FilterScope::Output => "output",
            FilterScope::Any => "any",
        }
    }
}

impl fmt::Display for FilterScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterScope {
    type Err = String;

    /// Accepts the long names as well as the `in`/`out` shorthands.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "input" | "in" => Ok(FilterScope::Input),
            "output" | "out" => Ok(FilterScope::Output),
            "any" => Ok(FilterScope::Any),
            _ => Err(format!("Unknown filter scope: {}", s)),
        }
    }
}

/// Opaque metadata attached to a field.
///
/// The pipeline never interprets markers except where a transformer is
/// explicitly configured to (marker-driven filtering, marker stripping).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Marker {
    /// Leave the field out of shapes of the given scope.
    Exclude { scope: FilterScope },
    /// Free-form tag.
    Tag { name: String },
    /// Named constraint such as `max_length = 50`.
    Constraint { name: String, value: Value },
}

impl Marker {
    pub fn exclude(scope: FilterScope) -> Self {
        Marker::Exclude { scope }
    }

    pub fn tag(name: impl Into<String>) -> Self {
        Marker::Tag { name: name.into() }
    }

    pub fn constraint(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Marker::Constraint {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Returns the exclusion scope if this is an exclusion marker.
    pub fn exclusion_scope(&self) -> Option<FilterScope> {
        match self {
            Marker::Exclude { scope } => Some(*scope),
            _ => None,
        }
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Marker::Exclude { scope } => write!(f, "exclude({scope})"),
            Marker::Tag { name } => write!(f, "#{name}"),
            Marker::Constraint { name, value } => write!(f, "{name}={value}"),
        }
    }
}
