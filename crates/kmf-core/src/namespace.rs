//! User namespace input

use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};

/// System namespaces that are never migrated
pub const DEFAULT_RESERVED_NAMESPACES: [&str; 3] = ["kube-system", "kube-public", "kube-node-lease"];

/// The namespaces a run should operate over, as the user gave them
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceSpec {
    /// Every namespace the source cluster has
    All,
    /// Named namespaces, in the order given, without duplicates
    Explicit(Vec<String>),
}

impl NamespaceSpec {
    /// Parse `all` or a comma separated list of names
    pub fn parse(raw: &str) -> Result<Self> {
        let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.eq_ignore_ascii_case("all") {
            return Ok(NamespaceSpec::All);
        }

        let mut names: Vec<String> = Vec::new();
        for name in compact.split(',').filter(|n| !n.is_empty()) {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }

        if names.is_empty() {
            return Err(CoreError::EmptyNamespaceSpec);
        }
        Ok(NamespaceSpec::Explicit(names))
    }

    pub fn is_all(&self) -> bool {
        matches!(self, NamespaceSpec::All)
    }
}

impl FromStr for NamespaceSpec {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        NamespaceSpec::parse(s)
    }
}

impl fmt::Display for NamespaceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamespaceSpec::All => f.write_str("all"),
            NamespaceSpec::Explicit(names) => f.write_str(&names.join(",")),
        }
    }
}
