mod common;

use std::sync::Arc;

use aprwatch_common::Addressing;
use aprwatch_scrape::DomLocator;
use aprwatch_scrape::browser::BrowserSession;
use aprwatch_scrape::locator::{DEFAULT_LABEL_SELECTOR, marker_selector};
use common::{FakeNode, FakeSession, PageFixture, Stats, panel};
use url::Url;

const URL: &str = "https://farms.test/farms";

async fn label_text(fixture: PageFixture, addressing: &Addressing) -> Option<String> {
    let stats = Arc::new(Stats::default());
    let mut session = FakeSession::new(stats).page(URL, fixture);
    let page = session.open_page(&Url::parse(URL).unwrap()).await.unwrap();
    let node = DomLocator::default()
        .locate(page.as_ref(), addressing)
        .await
        .unwrap()?;
    Some(node.inner_text().await.unwrap())
}

fn by_attr(key: &str) -> Addressing {
    Addressing::ByAttributeSubstring {
        attribute: "data-farm-id".into(),
        key: key.into(),
    }
}

#[tokio::test]
async fn sibling_with_longer_key_is_not_matched() {
    common::init_test_tracing();
    let addressing = by_attr("3514-r");
    // `*=` in CSS also matches the longer key, so both come back as candidates.
    let fixture = PageFixture::ready()
        .with(
            &marker_selector(&addressing),
            panel(DEFAULT_LABEL_SELECTOR, "99%").attr("data-farm-id", "farms/13514-r"),
        )
        .with(
            &marker_selector(&addressing),
            panel(DEFAULT_LABEL_SELECTOR, "12.5%").attr("data-farm-id", "farms/3514-r"),
        );

    assert_eq!(label_text(fixture, &addressing).await.as_deref(), Some("12.5%"));
}

#[tokio::test]
async fn shorter_key_does_not_match_a_dashed_sibling() {
    let addressing = by_attr("3514");
    let fixture = PageFixture::ready()
        .with(
            &marker_selector(&addressing),
            panel(DEFAULT_LABEL_SELECTOR, "99%").attr("data-farm-id", "farms/3514-r"),
        )
        .with(
            &marker_selector(&addressing),
            panel(DEFAULT_LABEL_SELECTOR, "4%").attr("data-farm-id", "farms/3514"),
        );

    assert_eq!(label_text(fixture, &addressing).await.as_deref(), Some("4%"));
}

#[tokio::test]
async fn only_dashed_sibling_present_yields_nothing() {
    let addressing = by_attr("3514");
    let fixture = PageFixture::ready().with(
        &marker_selector(&addressing),
        panel(DEFAULT_LABEL_SELECTOR, "99%").attr("data-farm-id", "farms/3514-r"),
    );

    assert_eq!(label_text(fixture, &addressing).await, None);
}

#[tokio::test]
async fn first_visible_candidate_with_a_label_wins() {
    let addressing = Addressing::ByElementId("1889".into());
    let selector = marker_selector(&addressing);
    let fixture = PageFixture::ready()
        .with(&selector, FakeNode::new())
        .with(&selector, panel(DEFAULT_LABEL_SELECTOR, "8%"))
        .with(&selector, panel(DEFAULT_LABEL_SELECTOR, "9%"));

    assert_eq!(label_text(fixture, &addressing).await.as_deref(), Some("8%"));
}

#[tokio::test]
async fn hidden_markers_are_never_candidates() {
    let addressing = Addressing::ByElementId("1923".into());
    // Only the unfiltered selector knows about the panel, as with a `.hidden` one.
    let fixture = PageFixture::ready().with(
        r#"div[id="1923"]"#,
        panel(DEFAULT_LABEL_SELECTOR, "40%").attr("class", "hidden"),
    );

    assert_eq!(label_text(fixture, &addressing).await, None);
}

#[tokio::test]
async fn marker_without_label_yields_nothing() {
    let addressing = Addressing::ByElementId("535".into());
    let fixture = PageFixture::ready().with(
        &marker_selector(&addressing),
        FakeNode::new().child("span.other", FakeNode::new().text("1%")),
    );

    assert_eq!(label_text(fixture, &addressing).await, None);
}
