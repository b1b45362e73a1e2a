mod common;

use common::{
    Counters, FailAt, FakeLauncher, META_DESCRIPTION, OG_DESCRIPTION, OG_TITLE, PageFixture, scraper,
};
use std::sync::Arc;
use std::time::Duration;
use url_digest::{PageScraper, ScrapeError};

const HELLO_PAGE: &str = "<html><head><title>Example Site</title></head>\
    <body><article><p>Hello world</p></article></body></html>";

const FALLBACK: &str = "Content extraction failed, but metadata was collected successfully.";

fn assert_released_once(counters: &Arc<Counters>) {
    assert_eq!(Counters::get(&counters.launched), 1);
    assert_eq!(Counters::get(&counters.engines_closed), 1);
    assert_eq!(
        Counters::get(&counters.contexts_closed),
        Counters::get(&counters.contexts_created)
    );
    assert!(Counters::get(&counters.contexts_closed) <= 1);
}

#[tokio::test]
async fn example_site_is_scraped_end_to_end() {
    let launcher = FakeLauncher::new(
        PageFixture::new(HELLO_PAGE)
            .title("Example Site")
            .meta(OG_TITLE, "Example Site")
            .meta(OG_DESCRIPTION, "A sample page."),
    );
    let counters = launcher.counters.clone();

    let result = scraper(launcher).scrape("https://example.com").await.unwrap();

    assert_eq!(result.metadata.title, "Example Site");
    assert_eq!(result.metadata.description, "A sample page.");
    assert_eq!(result.metadata.site_name, "");
    assert_eq!(result.content, "Hello world");

    assert_released_once(&counters);
    assert_eq!(Counters::get(&counters.contexts_closed), 1);
    assert_eq!(Counters::get(&counters.image_strips), 1);
}

#[tokio::test]
async fn failed_readability_falls_back_to_description() {
    let launcher = FakeLauncher::new(
        PageFixture::new(HELLO_PAGE)
            .title("Docs")
            .meta(META_DESCRIPTION, "Fallback desc")
            .unreadable(),
    );
    let counters = launcher.counters.clone();

    let result = scraper(launcher).scrape("https://example.com/docs").await.unwrap();

    assert_eq!(result.metadata.title, "Docs");
    assert_eq!(result.content, "Fallback desc");
    assert_released_once(&counters);
}

#[tokio::test]
async fn failed_readability_without_description_uses_notice() {
    let launcher = FakeLauncher::new(PageFixture::new(HELLO_PAGE).unreadable());
    let counters = launcher.counters.clone();

    let result = scraper(launcher).scrape("https://example.com").await.unwrap();

    assert_eq!(result.metadata.title, "Untitled");
    assert_eq!(result.content, FALLBACK);
    assert_released_once(&counters);
}

#[tokio::test]
async fn heading_titles_a_page_without_title_tags() {
    let launcher = FakeLauncher::new(PageFixture::new(HELLO_PAGE).h1("  Only Heading "));

    let result = scraper(launcher).scrape("https://example.com").await.unwrap();

    assert_eq!(result.metadata.title, "Only Heading");
}

#[tokio::test(start_paused = true)]
async fn unresponsive_page_still_completes_within_probe_timeout() {
    let launcher = FakeLauncher::new(
        PageFixture::new("<html><head></head><body></body></html>").hanging(),
    );
    let counters = launcher.counters.clone();
    let started = tokio::time::Instant::now();

    let result = scraper(launcher).scrape("https://slow.example.com").await.unwrap();

    assert!(started.elapsed() <= Duration::from_secs(11));
    assert_eq!(result.metadata.title, "Untitled");
    assert_eq!(result.metadata.description, "");
    assert_eq!(result.metadata.site_name, "");
    assert!(!result.content.is_empty());
    assert_released_once(&counters);
}

#[tokio::test]
async fn launch_failure_is_fatal_and_leaks_nothing() {
    let launcher = FakeLauncher::new(PageFixture::new(HELLO_PAGE)).failing_at(FailAt::Launch);
    let counters = launcher.counters.clone();

    let err = scraper(launcher).scrape("https://example.com").await.unwrap_err();

    assert!(matches!(err, ScrapeError::Launch(_)));
    assert_eq!(Counters::get(&counters.launched), 0);
    assert_eq!(Counters::get(&counters.engines_closed), 0);
}

#[tokio::test]
async fn context_failure_closes_the_browser() {
    let launcher = FakeLauncher::new(PageFixture::new(HELLO_PAGE)).failing_at(FailAt::Context);
    let counters = launcher.counters.clone();

    let err = scraper(launcher).scrape("https://example.com").await.unwrap_err();

    assert!(matches!(err, ScrapeError::Context(_)));
    assert_released_once(&counters);
    assert_eq!(Counters::get(&counters.contexts_created), 0);
}

#[tokio::test]
async fn navigation_failure_closes_context_and_browser() {
    let launcher = FakeLauncher::new(PageFixture::new(HELLO_PAGE)).failing_at(FailAt::Navigation);
    let counters = launcher.counters.clone();

    let err = scraper(launcher).scrape("https://nowhere.invalid").await.unwrap_err();

    assert!(matches!(&err, ScrapeError::Navigation { url, .. } if url == "https://nowhere.invalid"));
    assert!(!err.is_timeout());
    assert_released_once(&counters);
    assert_eq!(Counters::get(&counters.contexts_closed), 1);
    assert_eq!(Counters::get(&counters.pages_opened), 0);
}

#[tokio::test(start_paused = true)]
async fn navigation_timeout_is_reported_and_cleaned_up() {
    let launcher =
        FakeLauncher::new(PageFixture::new(HELLO_PAGE)).failing_at(FailAt::NavigationTimeout);
    let counters = launcher.counters.clone();

    let err = scraper(launcher).scrape("https://slow.example.com").await.unwrap_err();

    assert!(err.is_timeout());
    assert_released_once(&counters);
    assert_eq!(Counters::get(&counters.contexts_closed), 1);
}
