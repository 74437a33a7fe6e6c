// tests/fixtures_parse.rs
//
// Real-world shaped RSS and Atom documents through fetch + normalize.

use ai_news_aggregator::ingest::fetcher::FixtureFetcher;
use ai_news_aggregator::ingest::normalize::SUMMARY_PLACEHOLDER;
use ai_news_aggregator::ingest::{run_round, RoundSettings};
use ai_news_aggregator::{Source, WarningKind};

const TECHCRUNCH_XML: &str = include_str!("fixtures/techcrunch_rss.xml");
const DEEPMIND_XML: &str = include_str!("fixtures/deepmind_atom.xml");
const EMPTY_XML: &str = include_str!("fixtures/empty_rss.xml");

fn sources() -> Vec<Source> {
    vec![
        Source::new("TechCrunch", "https://techcrunch.com/feed/"),
        Source::new("Deepmind", "https://deepmind.google/blog/rss.xml"),
        Source::new("Quiet", "https://quiet.test/rss"),
    ]
}

fn fetcher() -> FixtureFetcher {
    FixtureFetcher::new()
        .with("TechCrunch", TECHCRUNCH_XML)
        .with("Deepmind", DEEPMIND_XML)
        .with("Quiet", EMPTY_XML)
}

#[tokio::test]
async fn rss_fixture_is_normalized_and_sanitized() {
    let result = run_round(&sources()[..1], &fetcher(), None, &RoundSettings::default()).await;

    // five entries considered, one of them malformed, the sixth never read
    let titles: Vec<_> = result.items.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(
        titles,
        vec![
            "Startup raises $40M to build AI agents for logistics",
            "Open-source model tops coding benchmark",
            "Chipmaker unveils inference accelerator",
            "Robotics firm opens lab in Berlin",
        ]
    );
    assert_eq!(
        result.items[0].summary,
        "The company says its agents can plan routes faster."
    );
    assert_eq!(result.items[1].summary, "A new open model beats larger rivals.");
    assert_eq!(result.items[2].summary, SUMMARY_PLACEHOLDER);
    assert!(result.items[2].published_at.is_none());
    assert_eq!(result.items[3].summary, "Hiring & expansion plans.");
    assert_eq!(result.items[0].display_date(), "02/05/2024 14:30");

    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].kind, WarningKind::MalformedEntry);
}

#[tokio::test]
async fn atom_fixture_uses_published_time_only() {
    let result = run_round(&sources()[1..2], &fetcher(), None, &RoundSettings::default()).await;
    assert_eq!(result.items.len(), 2);
    assert_eq!(result.items[0].summary, "New results on protein folding.");
    assert!(result.items[0].published_at.is_some());
    assert!(result.items[1].published_at.is_none());
    assert!(result.items.iter().all(|i| i.source == "Deepmind"));
}

#[tokio::test]
async fn mixed_round_keeps_source_order_and_reports_empty() {
    let result = run_round(&sources(), &fetcher(), Some("PROTEIN"), &RoundSettings::default()).await;
    assert_eq!(result.items.len(), 1);
    assert_eq!(result.items[0].source, "Deepmind");

    let kinds: Vec<_> = result
        .warnings
        .iter()
        .map(|w| (w.source.as_str(), w.kind))
        .collect();
    assert_eq!(
        kinds,
        vec![
            ("TechCrunch", WarningKind::MalformedEntry),
            ("Quiet", WarningKind::EmptySource),
        ]
    );
}
