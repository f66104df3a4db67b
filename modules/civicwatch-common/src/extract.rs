//! Pattern-based entity and tag extraction over event text.
//!
//! Heuristic best-effort, no NLP. False negatives are expected and acceptable;
//! false positives are tolerated because humans review the resulting alerts.

use regex::Regex;
use std::sync::LazyLock;

use crate::types::{slugify, Entity, EntityType};

static ORG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b[A-Z][\w&'-]*(?:\s+(?:of|the|and|[A-Z][\w&'-]*)){0,5},?\s+(?:LLC|L\.L\.C|Corporation|Incorporated|Corp|Inc|Company|Co|LLP|LP|PLLC|P\.A|Trust)\b\.?",
    )
    .unwrap()
});

static STREET_ADDRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b\d{1,5}\s+(?:[NSEW][EW]?\s+)?(?:\d+(?:st|nd|rd|th)|[A-Z][a-z0-9]+)(?:\s+(?:\d+(?:st|nd|rd|th)|[A-Z][a-z0-9]+))*\s+(?:Street|Avenue|Boulevard|Drive|Lane|Road|Court|Place|Circle|Terrace|Trail|Highway|Parkway|St|Ave|Blvd|Dr|Ln|Rd|Way|Ct|Pl|Cir|Ter|Trl|Hwy|Pkwy)\b",
    )
    .unwrap()
});

/// Keyword -> tag dictionary applied to title/description text.
const KEYWORD_TAGS: &[(&str, &str)] = &[
    ("rezoning", "rezoning"),
    ("zoning change", "rezoning"),
    ("zoning", "zoning"),
    ("variance", "variance"),
    ("special exception", "special-exception"),
    ("comprehensive plan", "comp-plan"),
    ("land use", "land-use"),
    ("subdivision", "subdivision"),
    ("plat", "subdivision"),
    ("development", "development"),
    ("annexation", "annexation"),
    ("eminent domain", "eminent-domain"),
    ("wetland", "wetland"),
    ("stormwater", "stormwater"),
    ("dredge", "dredge-fill"),
    ("environmental resource permit", "erp"),
    ("water use permit", "wup"),
    ("well construction", "well"),
    ("public hearing", "public-hearing"),
    ("ordinance", "ordinance"),
    ("millage", "millage"),
    ("budget", "budget"),
    ("foreclosure", "foreclosure"),
    ("procurement", "procurement"),
    ("bid opening", "procurement"),
];

/// Scan text for organization-suffix and street-address patterns.
/// Entity ids are namespaced under the producing source so a re-scrape of the
/// same record yields the same ids.
pub fn extract_entities(namespace: &str, text: &str) -> Vec<Entity> {
    let mut out: Vec<Entity> = Vec::new();

    for m in ORG_RE.find_iter(text) {
        let name = m.as_str().trim().trim_end_matches([',', '.']).trim();
        let entity = Entity::new(
            format!("{namespace}-org-{}", slugify(name)),
            EntityType::Organization,
            name,
        );
        if !out.iter().any(|e| e.matches(&entity)) {
            out.push(entity);
        }
    }

    for m in STREET_ADDRESS_RE.find_iter(text) {
        let addr = m.as_str().trim();
        let entity = Entity::new(
            format!("{namespace}-addr-{}", slugify(addr)),
            EntityType::Address,
            addr,
        );
        if !out.iter().any(|e| e.matches(&entity)) {
            out.push(entity);
        }
    }

    out
}

/// Derive lowercase tags from the fixed keyword dictionary.
pub fn derive_tags(text: &str) -> Vec<String> {
    let haystack = text.to_lowercase();
    let mut tags: Vec<String> = Vec::new();
    for (keyword, tag) in KEYWORD_TAGS {
        if haystack.contains(keyword) && !tags.iter().any(|t| t == tag) {
            tags.push((*tag).to_string());
        }
    }
    tags
}
