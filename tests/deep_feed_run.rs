use chrono::{TimeZone, Utc};
use std::sync::Arc;
use topic_harvester::Harvester;
use topic_harvester::api::HackerNewsApi;
use topic_harvester::config::Settings;
use topic_harvester::extraction::JinaRenderer;
use topic_harvester::models::{ActionType, LogStatus, SourceConfig};
use topic_harvester::store::MemoryStore;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn item(title: &str, link: &str, pub_date: Option<&str>) -> String {
    let date = pub_date
        .map(|d| format!("<pubDate>{d}</pubDate>"))
        .unwrap_or_default();
    format!("<item><title>{title}</title><link>{link}</link>{date}<description>teaser</description></item>")
}

async fn mount(server: &MockServer, p: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(p))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

fn article(topic: &str) -> String {
    format!("# {topic}\n\n{}", format!("Long-form notes on {topic} for practitioners. ").repeat(8))
}

#[tokio::test]
async fn deep_feed_filters_by_date_and_keeps_undated_entries() {
    let server = MockServer::start().await;
    let feed = format!(
        "<rss><channel><title>News</title>{}{}{}</channel></rss>",
        item("Fresh", "https://news.x.com/fresh", Some("Fri, 02 May 2025 03:00:00 GMT")),
        item("Stale", "https://news.x.com/stale", Some("Mon, 28 Apr 2025 03:00:00 GMT")),
        item("Undated", "https://news.x.com/undated", None),
    );
    mount(&server, "/feed.xml", feed).await;
    mount(&server, "/render/https://news.x.com/fresh", article("fresh")).await;
    mount(&server, "/render/https://news.x.com/stale", article("stale")).await;
    mount(&server, "/render/https://news.x.com/undated", article("undated")).await;

    let source = SourceConfig {
        source_id: "news".into(),
        fetch_type: "RSS_DEEP".into(),
        target_url: format!("{}/feed.xml", server.uri()),
        status: "active".into(),
        phase: Some(1),
        site_name: "News".into(),
        ..SourceConfig::default()
    };
    let store = Arc::new(MemoryStore::new(vec![source]));
    let settings = Settings {
        render_base_url: format!("{}/render/", server.uri()),
        render_delay_ms: 0,
        force_https_sources: false,
        ..Settings::default()
    };
    let http = reqwest::Client::new();
    let harvester = Harvester::new(
        store.clone(),
        Arc::new(JinaRenderer::new(http.clone(), settings.render_base_url.clone(), None)),
        Arc::new(HackerNewsApi::new(http.clone(), server.uri())),
        http,
        settings,
    )
    .unwrap();

    // 17:00 local on 2025-05-02
    let now = Utc.with_ymd_and_hms(2025, 5, 2, 8, 0, 0).unwrap();
    let summary = harvester.run(now).await.unwrap();
    assert_eq!(summary.written, 2);

    let mut urls: Vec<_> = store.rows().into_iter().map(|r| r.raw_url).collect();
    urls.sort();
    assert_eq!(urls, ["https://news.x.com/fresh", "https://news.x.com/undated"]);

    let logs = store.logs();
    let warns: Vec<_> = logs
        .iter()
        .filter(|l| l.action_type == ActionType::ItemNoDateWarn)
        .collect();
    assert_eq!(warns.len(), 1);
    assert_eq!(warns[0].status, LogStatus::Warn);
    assert_eq!(warns[0].message, "news | Could not parse date: ");
    let done = logs.last().unwrap();
    assert_eq!((done.action_type, done.status), (ActionType::SourceDone, LogStatus::Ok));

    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| !r.url.path().ends_with("/stale")));
}
