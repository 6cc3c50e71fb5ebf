//! Data models for the project.
//!
//! This module defines the data structures exchanged between the scraper and
//! its host: queries, search candidates and resolved metadata records.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Genre tag applied to every resolved record
pub const ADULT_GENRE: &str = "Adult";

/// Official rating applied to every resolved record
pub const RATING_LABEL: &str = "XXX";

/// Name reported as the search provider of every candidate
pub const PROVIDER_NAME: &str = "Adult Metadata Provider";

/// Catalog website a result or identifier comes from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Gevi,
    Aebn,
}

impl ProviderKind {
    /// Every known provider, in default priority order
    pub const ALL: [ProviderKind; 2] = [ProviderKind::Gevi, ProviderKind::Aebn];

    /// Stable lowercase key used in configuration and identifier maps
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Gevi => "gevi",
            ProviderKind::Aebn => "aebn",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gevi" => Ok(ProviderKind::Gevi),
            "aebn" => Ok(ProviderKind::Aebn),
            _ => Err(anyhow::anyhow!("Unknown provider: {}", s)),
        }
    }
}

/// Identifier assigned to a title by one provider
///
/// The value is either a canonical detail URL or a provider-internal key
/// (a site-relative path).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderIdentifier {
    pub provider: ProviderKind,
    pub value: String,
}

/// Lookup request supplied by the host
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MovieQuery {
    /// Free-text title
    pub name: String,
    /// Previously stored identifiers, keyed by provider
    #[serde(default)]
    pub identifiers: BTreeMap<ProviderKind, String>,
}

impl MovieQuery {
    /// Query by title only
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identifiers: BTreeMap::new(),
        }
    }

    /// Attach a stored identifier for a provider
    pub fn with_identifier(mut self, provider: ProviderKind, value: impl Into<String>) -> Self {
        self.identifiers.insert(provider, value.into());
        self
    }
}

/// Unconfirmed search hit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CandidateResult {
    pub display_name: String,
    pub identifiers: BTreeMap<ProviderKind, String>,
    pub originating_provider: ProviderKind,
    pub search_provider_name: String,
    pub image_url: Option<String>,
}

impl CandidateResult {
    /// Create a candidate carrying a single identifier from `provider`
    pub fn new(provider: ProviderKind, display_name: impl Into<String>, url: impl Into<String>) -> Self {
        let mut identifiers = BTreeMap::new();
        identifiers.insert(provider, url.into());
        Self {
            display_name: display_name.into(),
            identifiers,
            originating_provider: provider,
            search_provider_name: PROVIDER_NAME.to_string(),
            image_url: None,
        }
    }

    pub fn with_image(mut self, image_url: Option<String>) -> Self {
        self.image_url = image_url;
        self
    }

    /// Identifier issued by the originating provider
    pub fn source_url(&self) -> Option<&str> {
        self.identifiers
            .get(&self.originating_provider)
            .map(String::as_str)
    }
}

/// Metadata resolved from exactly one detail page
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetadataRecord {
    pub title: String,
    pub description: String,
    pub genres: Vec<String>,
    pub studios: Vec<String>,
    pub rating: Option<String>,
    pub source: Option<ProviderIdentifier>,
}

impl MetadataRecord {
    /// Record built from a detail page of `provider`
    pub fn resolved(
        provider: ProviderKind,
        url: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            genres: vec![ADULT_GENRE.to_string()],
            studios: Vec::new(),
            rating: Some(RATING_LABEL.to_string()),
            source: Some(ProviderIdentifier {
                provider,
                value: url.into(),
            }),
        }
    }

    /// Well-formed record returned when no provider produced anything
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_none() && self.title.is_empty()
    }
}
