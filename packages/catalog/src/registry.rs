//! Site registry: built-in profiles embedded from TOML.
//!
//! Each `.toml` file in `packages/catalog/sites/` is baked into the binary
//! at compile time via [`include_str!`]. Adding a shop means adding a file
//! and an entry below.

use crate::site_def::{SiteDefinition, parse_site_toml};

/// TOML profiles embedded at compile time.
const SITE_TOMLS: &[(&str, &str)] = &[
    ("osc_seeds", include_str!("../sites/osc_seeds.toml")),
    (
        "west_coast_seeds",
        include_str!("../sites/west_coast_seeds.toml"),
    ),
];

/// Total number of built-in profiles (used in tests).
#[cfg(test)]
const EXPECTED_SITE_COUNT: usize = 2;

/// Returns every built-in profile, parsed from embedded TOML.
///
/// # Panics
///
/// Panics if an embedded profile is malformed. The profiles ship with the
/// binary, so this is caught by the tests below.
#[must_use]
pub fn all_sites() -> Vec<SiteDefinition> {
    SITE_TOMLS
        .iter()
        .map(|(name, toml)| {
            parse_site_toml(toml).unwrap_or_else(|e| panic!("Failed to parse {name}.toml: {e}"))
        })
        .collect()
}

/// Looks up a built-in profile by id.
#[must_use]
pub fn find_site(id: &str) -> Option<SiteDefinition> {
    all_sites().into_iter().find(|site| site.id == id)
}
