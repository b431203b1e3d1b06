//! End-to-end walk and extraction scenarios driven by an in-memory fetcher.

use garden_scrape_scraper::extractor::ItemExtractor;
use garden_scrape_scraper::images::ImageStore;
use garden_scrape_scraper::memory::MemoryFetcher;
use garden_scrape_scraper::selector::{
    CandidateSelectorList, FieldRules, ItemSelectors, SelectorRule, parse_selector,
};
use garden_scrape_scraper::walker::{LinkRules, LinkWalker, StopReason, WalkLimits};
use url::Url;

const ROOT: &str = "https://garden.test";
const LISTING: &str = "https://garden.test/collections/seeds";

fn listing(ids: impl IntoIterator<Item = u32>) -> String {
    let items: String = ids
        .into_iter()
        .map(|id| {
            format!(
                r#"<li class="product"><a class="product-link" href="/products/seed-{id}?utm_source=list">Seed {id}</a></li>"#
            )
        })
        .collect();
    format!(r#"<html><body><ul class="grid">{items}</ul><a href="/cart">Cart</a></body></html>"#)
}

fn page(n: u32) -> String {
    format!("{LISTING}/page/{n}")
}

fn product(id: u32) -> String {
    format!("{ROOT}/products/seed-{id}")
}

fn walker(fetcher: &MemoryFetcher, limits: WalkLimits) -> LinkWalker<&MemoryFetcher> {
    let rules = LinkRules::new(parse_selector("li.product a.product-link").unwrap());
    LinkWalker::new(fetcher, Url::parse(ROOT).unwrap(), rules, limits).unwrap()
}

fn selectors() -> ItemSelectors {
    ItemSelectors {
        name: FieldRules::new(CandidateSelectorList::parse_text(&["h1.product-title", "h1"]).unwrap()),
        price: FieldRules::new(
            CandidateSelectorList::parse_text(&["span.price", "p.product-price"]).unwrap(),
        )
        .collapsing(),
        image: CandidateSelectorList::new(vec![
            SelectorRule::attr("img.product-main-image", "src").unwrap(),
        ]),
        ..ItemSelectors::default()
    }
}

#[test]
fn item_limit_fifteen_across_two_pages() {
    let fetcher = MemoryFetcher::new()
        .with_page(LISTING, &listing(1..=10))
        .with_page(&page(2), &listing(11..=20))
        .with_page(&page(3), &listing([]));

    let outcome = walker(
        &fetcher,
        WalkLimits {
            max_items: Some(15),
            max_pages: None,
        },
    )
    .walk(LISTING)
    .unwrap();

    let expected: Vec<String> = (1..=15).map(product).collect();
    assert_eq!(outcome.urls, expected);
    assert!(outcome.reached_item_limit());
    assert!(!fetcher.was_requested(&page(3)));
}

#[test]
fn small_catalog_returns_everything_once() {
    let fetcher = MemoryFetcher::new()
        .with_page(LISTING, &listing([1, 2, 3, 2]))
        .with_page(&page(2), &listing([3, 4]))
        .with_page(&page(3), &listing([]));

    let outcome = walker(
        &fetcher,
        WalkLimits {
            max_items: Some(100),
            max_pages: None,
        },
    )
    .walk(LISTING)
    .unwrap();

    let expected: Vec<String> = (1..=4).map(product).collect();
    assert_eq!(outcome.urls, expected);
    assert_eq!(
        outcome.listings[0].stop_reason,
        StopReason::EmptyPage { page: 3 }
    );
}

#[test]
fn endless_listing_stops_at_page_ceiling() {
    let mut fetcher = MemoryFetcher::new().with_page(LISTING, &listing([1]));
    for n in 2..=40 {
        fetcher = fetcher.with_page(&page(n), &listing([1]));
    }

    let outcome = walker(&fetcher, WalkLimits::default())
        .walk(LISTING)
        .unwrap();

    assert_eq!(outcome.urls, vec![product(1)]);
    assert_eq!(outcome.listings[0].pages_fetched, 30);
    assert_eq!(outcome.listings[0].stop_reason, StopReason::PageLimit);
    assert!(!fetcher.was_requested(&page(31)));
}

#[test]
fn repeated_walks_are_identical() {
    let fetcher = MemoryFetcher::new()
        .with_page(LISTING, &listing([5, 3, 9]))
        .with_page(&page(2), &listing([1, 3]))
        .with_page(&page(3), &listing([]));
    let walker = walker(&fetcher, WalkLimits::default());

    let first = walker.walk(LISTING).unwrap();
    let second = walker.walk(LISTING).unwrap();

    assert_eq!(first.urls, second.urls);
}

#[test]
fn listing_failure_keeps_collected_links() {
    let fetcher = MemoryFetcher::new()
        .with_page(LISTING, &listing([1, 2]))
        .with_status(&page(2), 503);

    let outcome = walker(&fetcher, WalkLimits::default())
        .walk(LISTING)
        .unwrap();

    assert_eq!(outcome.urls, vec![product(1), product(2)]);
    assert_eq!(outcome.failures().count(), 1);
}

#[test]
fn price_from_second_candidate_is_collapsed() {
    let url = product(1);
    let fetcher = MemoryFetcher::new().with_page(
        &url,
        r#"<h1>Chioggia Beet</h1>
           <p class="product-price">
               $2.95
               per   packet
           </p>"#,
    );

    let record = ItemExtractor::new(&fetcher, selectors())
        .extract(&url)
        .unwrap();

    assert_eq!(record.name.as_deref(), Some("Chioggia Beet"));
    assert_eq!(record.price.as_deref(), Some("$2.95 per packet"));
}

#[test]
fn unmatched_attributes_are_absent() {
    let url = product(2);
    let fetcher = MemoryFetcher::new().with_page(&url, "<main><p>Sold out</p></main>");

    let record = ItemExtractor::new(&fetcher, selectors())
        .extract(&url)
        .unwrap();

    assert_eq!(record.name, None);
    assert_eq!(record.price, None);
    assert_eq!(record.image_url, None);
    assert_eq!(record.source_url, url);
}

#[test]
fn image_not_found_leaves_image_empty() {
    let dir = std::env::temp_dir().join("garden_scrape_scenario_image_404");
    let _ = std::fs::remove_dir_all(&dir);
    let url = product(3);
    let fetcher = MemoryFetcher::new()
        .with_page(
            &url,
            r#"<h1>Dragon Tongue Bean</h1><img class="product-main-image" src="/cdn/bean.jpg">"#,
        )
        .with_status("https://garden.test/cdn/bean.jpg", 404);

    let outcome = ItemExtractor::new(&fetcher, selectors())
        .with_images(ImageStore::new(&dir))
        .extract_all(&[url.as_str()]);

    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.records[0].image_path, None);
    assert_eq!(outcome.images_saved(), 0);
    assert!(fetcher.was_requested("https://garden.test/cdn/bean.jpg"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn failed_detail_page_contributes_no_record() {
    let good = product(4);
    let bad = product(5);
    let fetcher = MemoryFetcher::new()
        .with_page(&good, "<h1>Lemon Cucumber</h1>")
        .with_status(&bad, 500);

    let outcome = ItemExtractor::new(&fetcher, selectors()).extract_all(&[bad.as_str(), good.as_str()]);

    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.records[0].source_url, good);
    assert_eq!(outcome.skipped[0].url, bad);
}
