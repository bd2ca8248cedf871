//! Container image references and the registries they come from

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Tag assumed when a reference carries none
pub const DEFAULT_TAG: &str = "latest";

/// A parsed `[host/]path[:tag][@digest]` image reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    /// Registry host, when the first path segment names one
    pub host: Option<String>,
    /// Repository path below the host
    pub path: String,
    pub tag: String,
    pub digest: Option<String>,
}

impl ImageReference {
    pub fn parse(reference: &str) -> Result<Self> {
        let invalid = |reason: &str| CoreError::InvalidImage {
            reference: reference.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = reference.trim();
        if trimmed.is_empty() {
            return Err(invalid("empty reference"));
        }

        let (name, digest) = match trimmed.split_once('@') {
            Some((name, digest)) if !digest.is_empty() => (name, Some(digest.to_string())),
            Some(_) => return Err(invalid("empty digest")),
            None => (trimmed, None),
        };

        let last_slash = name.rfind('/');
        let (name, tag) = match name.rfind(':') {
            Some(colon) if last_slash.is_none_or(|slash| colon > slash) => {
                let tag = &name[colon + 1..];
                if tag.is_empty() {
                    return Err(invalid("empty tag"));
                }
                (&name[..colon], tag.to_string())
            }
            _ => (name, DEFAULT_TAG.to_string()),
        };

        let (host, path) = match name.split_once('/') {
            Some((first, rest)) if is_host_segment(first) => (Some(first.to_string()), rest),
            _ => (None, name),
        };

        if path.is_empty() || path.split('/').any(str::is_empty) {
            return Err(invalid("empty repository path"));
        }

        Ok(Self {
            host,
            path: path.to_string(),
            tag,
            digest,
        })
    }

    /// Which well-known registry the image lives in
    pub fn registry(&self) -> RegistryClass {
        RegistryClass::classify(self.host.as_deref())
    }

    /// The reference this image gets once copied below `registry_host`
    pub fn mirrored_at(&self, registry_host: &str) -> String {
        format!("{}/{}:{}", registry_host, self.path, self.tag)
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(host) = &self.host {
            write!(f, "{}/", host)?;
        }
        write!(f, "{}:{}", self.path, self.tag)?;
        if let Some(digest) = &self.digest {
            write!(f, "@{}", digest)?;
        }
        Ok(())
    }
}

impl FromStr for ImageReference {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        ImageReference::parse(s)
    }
}

fn is_host_segment(segment: &str) -> bool {
    segment.contains('.') || segment.contains(':') || segment == "localhost"
}

/// Registries kmf knows how to mirror from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryClass {
    Gcr,
    #[serde(rename = "dockerhub")]
    DockerHub,
    Gitlab,
    /// Anything else, never mirrored
    Other,
}

impl RegistryClass {
    /// Classify a registry host; no host means Docker Hub
    pub fn classify(host: Option<&str>) -> Self {
        let Some(host) = host else {
            return RegistryClass::DockerHub;
        };
        let host = host.to_ascii_lowercase();
        match host.as_str() {
            "gcr.io" => RegistryClass::Gcr,
            h if h.ends_with(".gcr.io") => RegistryClass::Gcr,
            "docker.io" | "index.docker.io" | "registry-1.docker.io" => RegistryClass::DockerHub,
            "registry.gitlab.com" => RegistryClass::Gitlab,
            _ => RegistryClass::Other,
        }
    }

    /// Parse an allow-list entry (`gcr`, `dockerhub`, `gitlab`)
    pub fn from_short_name(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "gcr" => Ok(RegistryClass::Gcr),
            "dockerhub" => Ok(RegistryClass::DockerHub),
            "gitlab" => Ok(RegistryClass::Gitlab),
            _ => Err(CoreError::UnknownRegistry {
                name: name.to_string(),
            }),
        }
    }

    pub fn short_name(&self) -> &'static str {
        match self {
            RegistryClass::Gcr => "gcr",
            RegistryClass::DockerHub => "dockerhub",
            RegistryClass::Gitlab => "gitlab",
            RegistryClass::Other => "other",
        }
    }
}

impl fmt::Display for RegistryClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

impl FromStr for RegistryClass {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        RegistryClass::from_short_name(s)
    }
}

/// One image copied into the private registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryMirrorRecord {
    pub original: String,
    pub mirrored: String,
}
