//! Integration tests for the harvester
//!
//! These tests use wiremock to serve a seed page, item pages and media, and
//! run the full harvest end-to-end against a temporary resources directory.

use podcast_harvest::config::{parse_config, Config};
use podcast_harvest::crawler::harvest;
use podcast_harvest::storage::{load_staged_records, MediaStore};
use podcast_harvest::{HarvestError, ItemRecord, ItemState};
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ITEM_COUNT: usize = 10;
const FAILING_ITEM: usize = 4;

/// Creates a test configuration pointing at the mock server
fn create_test_config(base_url: &str, resources: &Path, concurrency: usize) -> Config {
    parse_config(&format!(
        r#"
[crawler]
seed-url = "{}/"
concurrency-limit = {}
max-tracks-per-item = 2
request-timeout-secs = 5
connect-timeout-secs = 2
user-agent = "TestHarvester/1.0"

[output]
resources-dir = "{}"
database-path = "{}"
"#,
        base_url,
        concurrency,
        resources.display(),
        resources.join("podcasts.db").display()
    ))
    .expect("test config should be valid")
}

fn seed_page() -> String {
    let links: String = (0..ITEM_COUNT)
        .map(|i| format!(r#"<a href="./feed/show{}?hl=en">Show {}</a>"#, i, i))
        .collect();
    format!(
        r#"<html><body><a href="./about">About</a>{}</body></html>"#,
        links
    )
}

fn item_page(base_url: &str, i: usize) -> String {
    format!(
        r#"<html><body>
        <div class="wv3SK">Show Number {i}</div>
        <div jsname="YGHahd">Episodes about <i>{i}</i></div>
        <img class="BhVIWc" src="{base}/img/shared.jpg">
        <div jsmodel="kY0ub" jsdata="Kwyn5e;{base}/audio/{i}-a.mp3"></div>
        <div jsmodel="kY0ub" jsdata="Kwyn5e;{base}/audio/{i}-b.mp3"></div>
        <div jsmodel="kY0ub" jsdata="Kwyn5e;{base}/audio/{i}-c.mp3"></div>
        </body></html>"#,
        i = i,
        base = base_url
    )
}

/// Mounts the seed, items (one failing) and media on the mock server
async fn mount_site(server: &MockServer, item_fetches: u64) {
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(seed_page()))
        .expect(1)
        .mount(server)
        .await;

    for i in 0..ITEM_COUNT {
        let response = if i == FAILING_ITEM {
            ResponseTemplate::new(500)
        } else {
            ResponseTemplate::new(200).set_body_string(item_page(&base, i))
        };
        let expected = if i == FAILING_ITEM { item_fetches } else { 1 };

        Mock::given(method("GET"))
            .and(path(format!("/feed/show{}", i)))
            .respond_with(response)
            .expect(expected)
            .mount(server)
            .await;
    }

    // Shared by every item: must be fetched once in total
    Mock::given(method("GET"))
        .and(path("/img/shared.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg-bytes".to_vec()))
        .expect(1)
        .mount(server)
        .await;

    for i in 0..ITEM_COUNT {
        for part in ["a", "b"] {
            Mock::given(method("GET"))
                .and(path(format!("/audio/{}-{}.mp3", i, part)))
                .respond_with(ResponseTemplate::new(200).set_body_bytes(b"mp3-bytes".to_vec()))
                .expect(if i == FAILING_ITEM { 0 } else { 1 })
                .mount(server)
                .await;
        }
        // Beyond max-tracks-per-item
        Mock::given(method("GET"))
            .and(path(format!("/audio/{}-c.mp3", i)))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"mp3-bytes".to_vec()))
            .expect(0)
            .mount(server)
            .await;
    }
}

fn read_staged(resources: &Path, key: &str) -> ItemRecord {
    let file = resources.join("metadata").join(format!("{}.json", key));
    let bytes = std::fs::read(&file).unwrap_or_else(|_| panic!("{} should be staged", key));
    serde_json::from_slice(&bytes).expect("staged record should be valid JSON")
}

#[tokio::test]
async fn test_full_harvest_isolates_failing_item() {
    let server = MockServer::start().await;
    mount_site(&server, 1).await;
    let base = server.uri();

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base, dir.path(), ITEM_COUNT);

    let summary = harvest(&config).await.expect("harvest should complete");

    assert_eq!(summary.attempted, ITEM_COUNT);
    assert_eq!(summary.succeeded, ITEM_COUNT - 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.failures[0].index, FAILING_ITEM);
    assert_eq!(summary.failures[0].stage, ItemState::Fetching);

    for i in (0..ITEM_COUNT).filter(|i| *i != FAILING_ITEM) {
        let record = read_staged(dir.path(), &format!("show_number_{}", i));

        assert_eq!(record.title, format!("Show Number {}", i));
        assert_eq!(record.description, format!("Episodes about {}", i));
        assert_eq!(
            record.source_url,
            format!("{}/feed/show{}?hl=en", base, i)
        );
        assert_eq!(
            record.poster,
            format!("{}.jpeg", MediaStore::object_id(&format!("{}/img/shared.jpg", base)))
        );
        let expected_tracks: Vec<_> = ["a", "b"]
            .iter()
            .map(|part| {
                format!(
                    "{}.mp3",
                    MediaStore::object_id(&format!("{}/audio/{}-{}.mp3", base, i, part))
                )
            })
            .collect();
        assert_eq!(record.tracks, expected_tracks);

        for track in &record.tracks {
            assert!(dir.path().join("tracks").join(track).exists());
        }
    }

    assert!(!dir
        .path()
        .join("metadata")
        .join(format!("show_number_{}.json", FAILING_ITEM))
        .exists());

    let images = std::fs::read_dir(dir.path().join("images")).unwrap().count();
    assert_eq!(images, 1);

    server.verify().await;
}

#[tokio::test]
async fn test_rerun_only_retries_failed_items() {
    let server = MockServer::start().await;
    // The failing item is requested once per run; everything else once in total
    mount_site(&server, 2).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path(), ITEM_COUNT);

    let first = harvest(&config).await.unwrap();
    let staged_before = read_staged(dir.path(), "show_number_0");

    let second = harvest(&config).await.unwrap();
    let staged_after = read_staged(dir.path(), "show_number_0");

    assert_eq!(first.succeeded, ITEM_COUNT - 1);
    assert_eq!(second.succeeded, ITEM_COUNT - 1);
    assert_eq!(second.duplicates, ITEM_COUNT - 1);
    assert_eq!(second.failed, 1);
    assert_eq!(staged_before, staged_after);

    server.verify().await;
}

#[tokio::test]
async fn test_concurrency_limit_bounds_items_taken() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(seed_page()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/feed/show0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body><div class="ZfMIwb">Zero</div></body></html>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/feed/show1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body><div class="ZfMIwb">One</div></body></html>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base, dir.path(), 2);

    let summary = harvest(&config).await.unwrap();

    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.succeeded, 2);
    // Items without poster, description or tracks are still staged
    let record = read_staged(dir.path(), "zero");
    assert_eq!(record.poster, "");
    assert_eq!(record.description, "");
    assert!(record.tracks.is_empty());

    server.verify().await;
}

#[tokio::test]
async fn test_seed_failure_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path(), 5);

    let result = harvest(&config).await;
    assert!(matches!(result, Err(HarvestError::Fetch(_))));
}

#[tokio::test]
async fn test_staged_records_load_into_sqlite() {
    let server = MockServer::start().await;
    mount_site(&server, 1).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path(), ITEM_COUNT);
    harvest(&config).await.unwrap();

    let database = Path::new(&config.output.database_path);
    let summary = load_staged_records(database, &config.output.metadata_dir()).unwrap();
    assert_eq!(summary.loaded as usize, ITEM_COUNT - 1);
    assert_eq!(summary.failed, 0);

    let rerun = load_staged_records(database, &config.output.metadata_dir()).unwrap();
    assert_eq!(rerun.loaded, 0);
    assert_eq!(rerun.skipped as usize, ITEM_COUNT - 1);
}
