//! Config-driven site profile.
//!
//! [`SiteDefinition`] is the deserialized form of a profile TOML. It is
//! checked with [`SiteDefinition::validate`] and turned into runtime rules
//! with [`SiteDefinition::compile`], which parses every CSS selector up
//! front so a typo is reported before any request is made.

use std::path::Path;

use garden_scrape_scraper::ScrapeError;
use garden_scrape_scraper::address::{PAGE_PLACEHOLDER, default_tracking_params, parse_http_url};
use garden_scrape_scraper::selector::{
    CandidateSelectorList, FieldRules, ItemSelectors, SelectorRule, TableRules, parse_selector,
};
use garden_scrape_scraper::walker::{DEFAULT_PAGE_TEMPLATE, LinkRules};
use serde::Deserialize;
use url::Url;

use crate::CatalogError;

// ── Top-level site definition ────────────────────────────────────────────

/// A complete storefront profile.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteDefinition {
    /// Unique identifier (e.g., `"osc_seeds"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Site root; relative links and listings resolve against it.
    pub base_url: String,
    /// Listing (category) addresses walked in order. Relative entries are
    /// resolved against [`Self::base_url`].
    pub listings: Vec<String>,
    /// How listing pages are paginated.
    #[serde(default)]
    pub pagination: PaginationDef,
    /// How item links are found on listing pages.
    pub links: LinksDef,
    /// How attributes are found on detail pages.
    pub fields: FieldsDef,
}

/// Pagination settings.
#[derive(Debug, Clone, Deserialize)]
pub struct PaginationDef {
    /// Path appended to the listing address for page 2 onwards; must
    /// contain `{page}`.
    #[serde(default = "default_path_template")]
    pub path_template: String,
    /// Maximum listing pages per listing. Falls back to the walker's
    /// ceiling when absent.
    pub max_pages: Option<u32>,
}

impl Default for PaginationDef {
    fn default() -> Self {
        Self {
            path_template: default_path_template(),
            max_pages: None,
        }
    }
}

fn default_path_template() -> String {
    DEFAULT_PAGE_TEMPLATE.to_owned()
}

/// Link discovery settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LinksDef {
    /// CSS selector for item link elements.
    pub selector: String,
    /// Only follow links whose `href` contains this substring.
    pub filter: Option<String>,
    /// Query parameters to strip. Defaults to common tracking parameters.
    pub strip_query_params: Option<Vec<String>>,
}

// ── Field definitions ────────────────────────────────────────────────────

/// One candidate selector.
///
/// A bare string extracts element text; a table extracts an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Candidate {
    /// Text of the first matching element.
    Text(String),
    /// Attribute of the first matching element.
    Attr {
        /// CSS selector.
        selector: String,
        /// Attribute name (e.g., `"src"`).
        attr: String,
    },
}

impl Candidate {
    fn compile(&self) -> Result<SelectorRule, ScrapeError> {
        match self {
            Self::Text(selector) => SelectorRule::text(selector),
            Self::Attr { selector, attr } => SelectorRule::attr(selector, attr),
        }
    }
}

/// Candidates for one text attribute.
///
/// Either a plain list of candidates, or a table with extra cleanup
/// options.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FieldDef {
    /// Candidates with the field's default cleanup.
    Candidates(Vec<Candidate>),
    /// Candidates with explicit cleanup options.
    Detailed {
        /// Candidates in precedence order.
        candidates: Vec<Candidate>,
        /// Collapse internal whitespace. Defaults per field: price and
        /// description collapse, name and SKU are only trimmed.
        collapse_whitespace: Option<bool>,
        /// Label removed from the start of the value.
        strip_prefix: Option<String>,
    },
}

impl Default for FieldDef {
    fn default() -> Self {
        Self::Candidates(Vec::new())
    }
}

impl FieldDef {
    /// Candidates in precedence order.
    #[must_use]
    pub fn candidates(&self) -> &[Candidate] {
        match self {
            Self::Candidates(candidates) | Self::Detailed { candidates, .. } => candidates,
        }
    }

    fn compile(&self, collapse_by_default: bool) -> Result<FieldRules, ScrapeError> {
        let mut rules = FieldRules::new(compile_candidates(self.candidates())?);
        let (collapse, strip_prefix) = match self {
            Self::Candidates(_) => (collapse_by_default, None),
            Self::Detailed {
                collapse_whitespace,
                strip_prefix,
                ..
            } => (
                collapse_whitespace.unwrap_or(collapse_by_default),
                strip_prefix.as_deref(),
            ),
        };
        if collapse {
            rules = rules.collapsing();
        }
        if let Some(prefix) = strip_prefix {
            rules = rules.with_strip_prefix(prefix);
        }
        Ok(rules)
    }
}

fn compile_candidates(candidates: &[Candidate]) -> Result<CandidateSelectorList, ScrapeError> {
    candidates
        .iter()
        .map(Candidate::compile)
        .collect::<Result<Vec<_>, _>>()
        .map(CandidateSelectorList::new)
}

/// Specification table settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SpecificationsDef {
    /// CSS selector for table rows.
    pub rows: String,
    /// CSS selector for cells within a row (default `"th, td"`).
    pub cells: Option<String>,
}

/// Detail-page attribute selectors.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FieldsDef {
    /// Product name.
    #[serde(default)]
    pub name: FieldDef,
    /// Displayed price.
    #[serde(default)]
    pub price: FieldDef,
    /// Stock-keeping unit.
    #[serde(default)]
    pub sku: FieldDef,
    /// Long description.
    #[serde(default)]
    pub description: FieldDef,
    /// Image reference candidates; usually `{ selector, attr = "src" }`.
    #[serde(default)]
    pub image: Vec<Candidate>,
    /// Optional key/value specification table.
    pub specifications: Option<SpecificationsDef>,
}

impl FieldsDef {
    fn is_empty(&self) -> bool {
        self.name.candidates().is_empty()
            && self.price.candidates().is_empty()
            && self.sku.candidates().is_empty()
            && self.description.candidates().is_empty()
            && self.image.is_empty()
            && self.specifications.is_none()
    }
}

// ── Compiled rules ───────────────────────────────────────────────────────

/// Runtime rules compiled from a [`SiteDefinition`].
#[derive(Debug, Clone)]
pub struct SiteRules {
    /// Profile id.
    pub id: String,
    /// Site root used to resolve item links.
    pub root: Url,
    /// Absolute listing addresses, in walk order.
    pub listings: Vec<String>,
    /// Link discovery rules.
    pub link_rules: LinkRules,
    /// Detail-page selectors.
    pub item_selectors: ItemSelectors,
    /// Configured page limit, if any.
    pub max_pages: Option<u32>,
}

impl SiteDefinition {
    fn invalid(&self, message: impl Into<String>) -> CatalogError {
        CatalogError::Invalid {
            site: self.id.clone(),
            message: message.into(),
        }
    }

    fn rules_error(&self, source: ScrapeError) -> CatalogError {
        CatalogError::Rules {
            site: self.id.clone(),
            source,
        }
    }

    /// Checks the profile for problems that do not require selector
    /// parsing.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Invalid`] for an empty id or name, no
    /// listings, a zero page limit, a template without `{page}`, an empty
    /// link selector or no field selectors at all, and
    /// [`CatalogError::Rules`] for a malformed base address.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.id.trim().is_empty() {
            return Err(self.invalid("id is empty"));
        }
        if self.name.trim().is_empty() {
            return Err(self.invalid("name is empty"));
        }
        parse_http_url(&self.base_url).map_err(|e| self.rules_error(e))?;
        if self.listings.is_empty() {
            return Err(self.invalid("no listing addresses"));
        }
        if self.pagination.max_pages == Some(0) {
            return Err(self.invalid("pagination.max_pages must be positive"));
        }
        if !self.pagination.path_template.contains(PAGE_PLACEHOLDER) {
            return Err(self.invalid(format!(
                "pagination.path_template must contain {PAGE_PLACEHOLDER}"
            )));
        }
        if self.links.selector.trim().is_empty() {
            return Err(self.invalid("links.selector is empty"));
        }
        if self.fields.is_empty() {
            return Err(self.invalid("no field selectors configured"));
        }
        Ok(())
    }

    /// Validates the profile and compiles it into runtime rules.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] if validation fails, a selector does not
    /// parse, or a listing address is malformed.
    pub fn compile(&self) -> Result<SiteRules, CatalogError> {
        self.validate()?;

        let root = parse_http_url(&self.base_url).map_err(|e| self.rules_error(e))?;

        let listings = self
            .listings
            .iter()
            .map(|listing| {
                root.join(listing)
                    .map_err(|e| ScrapeError::InvalidUrl {
                        url: listing.clone(),
                        message: e.to_string(),
                    })
                    .and_then(|url| parse_http_url(url.as_str()))
                    .map(String::from)
                    .map_err(|e| self.rules_error(e))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let link_rules = LinkRules {
            selector: parse_selector(&self.links.selector).map_err(|e| self.rules_error(e))?,
            filter: self.links.filter.clone().filter(|f| !f.is_empty()),
            strip_query_params: self
                .links
                .strip_query_params
                .clone()
                .unwrap_or_else(default_tracking_params),
            page_template: self.pagination.path_template.clone(),
        };

        let item_selectors = self
            .compile_fields()
            .map_err(|e| self.rules_error(e))?;

        log::debug!(
            "Compiled site '{}': {} listing(s), {} name candidate(s)",
            self.id,
            listings.len(),
            item_selectors.name.candidates.rules().len(),
        );

        Ok(SiteRules {
            id: self.id.clone(),
            root,
            listings,
            link_rules,
            item_selectors,
            max_pages: self.pagination.max_pages,
        })
    }

    fn compile_fields(&self) -> Result<ItemSelectors, ScrapeError> {
        let fields = &self.fields;
        Ok(ItemSelectors {
            name: fields.name.compile(false)?,
            price: fields.price.compile(true)?,
            sku: fields.sku.compile(false)?,
            description: fields.description.compile(true)?,
            image: compile_candidates(&fields.image)?,
            specifications: fields
                .specifications
                .as_ref()
                .map(|spec| {
                    TableRules::new(
                        &spec.rows,
                        spec.cells.as_deref().unwrap_or(TableRules::DEFAULT_CELLS),
                    )
                })
                .transpose()?,
        })
    }
}

/// Parses a TOML string into a [`SiteDefinition`].
///
/// # Errors
///
/// Returns [`CatalogError::Toml`] if the TOML is malformed or does not
/// match the expected structure.
pub fn parse_site_toml(toml_str: &str) -> Result<SiteDefinition, CatalogError> {
    Ok(toml::de::from_str(toml_str)?)
}

/// Reads and parses a profile file.
///
/// # Errors
///
/// Returns [`CatalogError::Read`] if the file cannot be read and
/// [`CatalogError::Toml`] if it does not parse.
pub fn load_site_file(path: &Path) -> Result<SiteDefinition, CatalogError> {
    let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_site_toml(&text)
}
