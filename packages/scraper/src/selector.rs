//! Ordered fallback selectors.
//!
//! Every scraped attribute is configured as a [`CandidateSelectorList`]: an
//! ordered list of [`SelectorRule`]s evaluated one after another. The first
//! rule that yields non-empty content wins and later rules are never
//! consulted, so list order decides which value is used when a page matches
//! more than one candidate.

use garden_scrape_catalog_models::Specifications;
use scraper::{ElementRef, Selector};

use crate::ScrapeError;

/// Parses a CSS selector string, returning a [`ScrapeError`] on failure.
///
/// # Errors
///
/// Returns [`ScrapeError::Selector`] if `css` is not a valid selector.
pub fn parse_selector(css: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(css).map_err(|e| ScrapeError::Selector {
        selector: css.to_owned(),
        message: e.to_string(),
    })
}

/// Trims `text` and collapses every internal whitespace run to one space.
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Concatenated text content of an element, trimmed.
fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_owned()
}

/// One candidate extraction rule: a CSS selector plus, optionally, the
/// attribute to read instead of the element's text.
#[derive(Debug, Clone)]
pub struct SelectorRule {
    css: String,
    selector: Selector,
    attr: Option<String>,
}

impl SelectorRule {
    /// Creates a rule that reads the text content of matching elements.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Selector`] if `css` is not a valid selector.
    pub fn text(css: &str) -> Result<Self, ScrapeError> {
        Ok(Self {
            css: css.to_owned(),
            selector: parse_selector(css)?,
            attr: None,
        })
    }

    /// Creates a rule that reads `attr` from matching elements.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Selector`] if `css` is not a valid selector.
    pub fn attr(css: &str, attr: &str) -> Result<Self, ScrapeError> {
        Ok(Self {
            css: css.to_owned(),
            selector: parse_selector(css)?,
            attr: Some(attr.to_owned()),
        })
    }

    /// The selector text as configured.
    #[must_use]
    pub fn css(&self) -> &str {
        &self.css
    }

    /// The attribute this rule reads, if any.
    #[must_use]
    pub fn attribute(&self) -> Option<&str> {
        self.attr.as_deref()
    }

    /// Non-empty trimmed values of every matching element, in document
    /// order. An element that matches but has no content is skipped rather
    /// than treated as a hit.
    pub fn values<'a>(&'a self, root: ElementRef<'a>) -> impl Iterator<Item = String> + 'a {
        root.select(&self.selector).filter_map(move |element| {
            let value = match self.attr.as_deref() {
                Some(attr) => element.value().attr(attr)?.trim().to_owned(),
                None => element_text(&element),
            };
            (!value.is_empty()).then_some(value)
        })
    }
}

/// Ordered candidate rules for one attribute.
#[derive(Debug, Clone, Default)]
pub struct CandidateSelectorList {
    rules: Vec<SelectorRule>,
}

impl CandidateSelectorList {
    /// Wraps an ordered list of rules.
    #[must_use]
    pub const fn new(rules: Vec<SelectorRule>) -> Self {
        Self { rules }
    }

    /// Builds a list of text rules from CSS selector strings.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Selector`] for the first invalid selector.
    pub fn parse_text(selectors: &[&str]) -> Result<Self, ScrapeError> {
        selectors
            .iter()
            .map(|css| SelectorRule::text(css))
            .collect::<Result<Vec<_>, _>>()
            .map(Self::new)
    }

    /// The rules in precedence order.
    #[must_use]
    pub fn rules(&self) -> &[SelectorRule] {
        &self.rules
    }

    /// Returns `true` if no rules are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluates rules in order and returns the first value accepted by
    /// `accept`, together with the index of the rule that produced it.
    pub fn first_map<T>(
        &self,
        root: ElementRef<'_>,
        mut accept: impl FnMut(String) -> Option<T>,
    ) -> Option<(usize, T)> {
        for (index, rule) in self.rules.iter().enumerate() {
            for value in rule.values(root) {
                if let Some(accepted) = accept(value) {
                    return Some((index, accepted));
                }
            }
        }
        None
    }

    /// Returns the first non-empty value and the index of the rule that
    /// produced it.
    #[must_use]
    pub fn select_first(&self, root: ElementRef<'_>) -> Option<(usize, String)> {
        self.first_map(root, Some)
    }
}

/// Extraction settings for one text attribute.
#[derive(Debug, Clone, Default)]
pub struct FieldRules {
    /// Candidate rules in precedence order.
    pub candidates: CandidateSelectorList,
    /// Collapse internal whitespace runs to single spaces.
    pub collapse_whitespace: bool,
    /// Label to remove from the start of the value (e.g. `"SKU:"`).
    pub strip_prefix: Option<String>,
}

impl FieldRules {
    /// Creates field rules that only trim surrounding whitespace.
    #[must_use]
    pub const fn new(candidates: CandidateSelectorList) -> Self {
        Self {
            candidates,
            collapse_whitespace: false,
            strip_prefix: None,
        }
    }

    /// Enables internal whitespace collapsing.
    #[must_use]
    pub const fn collapsing(mut self) -> Self {
        self.collapse_whitespace = true;
        self
    }

    /// Sets a label prefix to strip from extracted values.
    #[must_use]
    pub fn with_strip_prefix(mut self, prefix: &str) -> Self {
        self.strip_prefix = Some(prefix.to_owned());
        self
    }

    /// Extracts this attribute from `root`, or `None` if no candidate
    /// matched.
    #[must_use]
    pub fn extract(&self, root: ElementRef<'_>) -> Option<String> {
        self.candidates
            .first_map(root, |raw| self.clean(&raw))
            .map(|(_, value)| value)
    }

    fn clean(&self, raw: &str) -> Option<String> {
        let mut value = raw.trim();
        if let Some(prefix) = self.strip_prefix.as_deref()
            && let Some(rest) = strip_prefix_ignore_case(value, prefix)
        {
            value = rest.trim();
        }
        let value = if self.collapse_whitespace {
            collapse_whitespace(value)
        } else {
            value.to_owned()
        };
        (!value.is_empty()).then_some(value)
    }
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    let head = value.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &value[prefix.len()..])
}

/// Settings for a two-column specification table.
#[derive(Debug, Clone)]
pub struct TableRules {
    rows: Selector,
    cells: Selector,
}

impl TableRules {
    /// Default selector for cells within a row.
    pub const DEFAULT_CELLS: &'static str = "th, td";

    /// Creates table rules from row and cell selectors.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Selector`] if either selector is invalid.
    pub fn new(rows: &str, cells: &str) -> Result<Self, ScrapeError> {
        Ok(Self {
            rows: parse_selector(rows)?,
            cells: parse_selector(cells)?,
        })
    }

    /// Collects every row that has exactly two non-empty cells.
    #[must_use]
    pub fn extract(&self, root: ElementRef<'_>) -> Specifications {
        root.select(&self.rows)
            .filter_map(|row| {
                let cells: Vec<String> = row
                    .select(&self.cells)
                    .map(|cell| collapse_whitespace(&element_text(&cell)))
                    .collect();
                match cells.as_slice() {
                    [key, value] if !key.is_empty() && !value.is_empty() => {
                        Some((key.trim_end_matches(':').trim().to_owned(), value.clone()))
                    }
                    _ => None,
                }
            })
            .collect()
    }
}

/// Complete per-attribute configuration for detail pages.
#[derive(Debug, Clone, Default)]
pub struct ItemSelectors {
    /// Product name.
    pub name: FieldRules,
    /// Displayed price.
    pub price: FieldRules,
    /// Stock-keeping unit.
    pub sku: FieldRules,
    /// Long description.
    pub description: FieldRules,
    /// Image references; values are resolved to absolute addresses.
    pub image: CandidateSelectorList,
    /// Optional specification table.
    pub specifications: Option<TableRules>,
}

#[cfg(test)]
mod tests {
    use scraper::Html;

    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <h1 class="title">  Cherokee   Purple Tomato </h1>
          <span class="price"></span>
          <div class="price-box"><span class="amount">
              $4.95
              per   packet</span></div>
          <span class="sku">SKU: TM-114</span>
          <img class="lazy" data-src="/img/tomato.jpg">
          <table class="specs">
            <tr><th>Days to maturity:</th><td>80</td></tr>
            <tr><td colspan="2">Heirloom</td></tr>
            <tr><th>Fruit   size</th><td>10-12 oz</td></tr>
          </table>
        </body></html>
    "#;

    #[test]
    fn first_non_empty_candidate_wins() {
        let document = Html::parse_document(PAGE);
        let list =
            CandidateSelectorList::parse_text(&["span.price", ".price-box .amount", "h1"]).unwrap();

        let (index, value) = list.select_first(document.root_element()).unwrap();

        assert_eq!(index, 1);
        assert!(value.starts_with("$4.95"));
    }

    #[test]
    fn earlier_candidate_takes_precedence() {
        let document = Html::parse_document(PAGE);
        let list = CandidateSelectorList::parse_text(&["h1.title", ".price-box .amount"]).unwrap();

        let (index, _) = list.select_first(document.root_element()).unwrap();

        assert_eq!(index, 0);
    }

    #[test]
    fn collapsing_field_normalizes_internal_whitespace() {
        let document = Html::parse_document(PAGE);
        let rules = FieldRules::new(
            CandidateSelectorList::parse_text(&["span.price", ".price-box .amount"]).unwrap(),
        )
        .collapsing();

        assert_eq!(
            rules.extract(document.root_element()).as_deref(),
            Some("$4.95 per packet")
        );
    }

    #[test]
    fn plain_field_is_only_trimmed() {
        let document = Html::parse_document(PAGE);
        let rules = FieldRules::new(CandidateSelectorList::parse_text(&["h1.title"]).unwrap());

        assert_eq!(
            rules.extract(document.root_element()).as_deref(),
            Some("Cherokee   Purple Tomato")
        );
    }

    #[test]
    fn strips_label_prefix() {
        let document = Html::parse_document(PAGE);
        let rules = FieldRules::new(CandidateSelectorList::parse_text(&["span.sku"]).unwrap())
            .with_strip_prefix("sku:");

        assert_eq!(
            rules.extract(document.root_element()).as_deref(),
            Some("TM-114")
        );
    }

    #[test]
    fn no_match_yields_none() {
        let document = Html::parse_document(PAGE);
        let rules =
            FieldRules::new(CandidateSelectorList::parse_text(&[".missing", "#nope"]).unwrap());

        assert_eq!(rules.extract(document.root_element()), None);
    }

    #[test]
    fn empty_list_yields_none() {
        let document = Html::parse_document(PAGE);
        assert_eq!(FieldRules::default().extract(document.root_element()), None);
    }

    #[test]
    fn attribute_rule_reads_attribute() {
        let document = Html::parse_document(PAGE);
        let list = CandidateSelectorList::new(vec![
            SelectorRule::attr("img.lazy", "src").unwrap(),
            SelectorRule::attr("img.lazy", "data-src").unwrap(),
        ]);

        assert_eq!(
            list.select_first(document.root_element()),
            Some((1, "/img/tomato.jpg".to_owned()))
        );
    }

    #[test]
    fn table_keeps_two_cell_rows() {
        let document = Html::parse_document(PAGE);
        let table = TableRules::new("table.specs tr", TableRules::DEFAULT_CELLS).unwrap();

        let specs = table.extract(document.root_element());

        assert_eq!(specs.len(), 2);
        assert_eq!(specs.get("Days to maturity"), Some("80"));
        assert_eq!(specs.get("Fruit size"), Some("10-12 oz"));
    }

    #[test]
    fn rejects_invalid_selector() {
        let err = SelectorRule::text("div[").unwrap_err();
        assert!(matches!(err, ScrapeError::Selector { .. }));
    }
}
