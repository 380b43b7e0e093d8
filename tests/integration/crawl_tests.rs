//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run crawl jobs end-to-end
//! through the HTTP renderer and a SQLite-backed job store.

use fanout_crawler::config::UserAgentConfig;
use fanout_crawler::crawler::{
    build_http_client, CollectingScheduler, ContentExtractor, CrawlEngine, CrawlTask,
    ExecutorOptions, FsAttachmentStore, GenericExtractor, HttpRenderer, HttpSchemaExtractor,
    JobConfig, JobId, LocalExecutor, PageContent, Renderer,
};
use fanout_crawler::storage::{JobStateStore, KvBackend, SqliteKv};
use fanout_crawler::SkipReason;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    }
}

fn open_backend(dir: &TempDir) -> Arc<dyn KvBackend> {
    Arc::new(SqliteKv::new(&dir.path().join("state.db")).expect("Failed to open store"))
}

fn engine(backend: Arc<dyn KvBackend>) -> CrawlEngine {
    let renderer = HttpRenderer::new(&user_agent()).expect("Failed to build renderer");
    CrawlEngine::new(backend, Arc::new(renderer))
}

fn executor(engine: CrawlEngine) -> LocalExecutor {
    LocalExecutor::new(
        engine,
        ExecutorOptions {
            concurrency: 3,
            task_timeout: Duration::from_secs(10),
        },
    )
}

fn seed(base_url: &str, job: &str, job_config: JobConfig) -> CrawlTask {
    CrawlTask::seed(&format!("{}/", base_url), JobId::new(job), job_config)
        .expect("Failed to build seed task")
}

async fn mount_html(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(body.into_bytes(), "text/html"),
        )
        .mount(server)
        .await;
}

/// Mounts a small site: `/` links to `/page1`, `/page2` and an external host;
/// `/page1` links to `/page2` and `/page3`
async fn mount_site(server: &MockServer) {
    let base = server.uri();

    mount_html(
        server,
        "/",
        format!(
            r#"<html><head><title>Home</title></head><body>
            <a href="{base}/page1">Page 1</a>
            <a href="/page2">Page 2</a>
            <a href="https://external.invalid/elsewhere">Elsewhere</a>
            </body></html>"#
        ),
    )
    .await;

    mount_html(
        server,
        "/page1",
        r#"<html><head><title>Page 1</title></head><body>
        <a href="/page2">Page 2 again</a>
        <a href="/page3#top">Page 3</a>
        </body></html>"#
            .to_string(),
    )
    .await;

    mount_html(
        server,
        "/page2",
        r#"<html><head><title>Page 2</title></head><body><a href="/">Home</a></body></html>"#
            .to_string(),
    )
    .await;

    mount_html(
        server,
        "/page3",
        r#"<html><head><title>Page 3</title></head><body><p>Leaf</p></body></html>"#
            .to_string(),
    )
    .await;
}

#[tokio::test]
async fn test_full_job_single_domain() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let dir = TempDir::new().unwrap();
    let backend = open_backend(&dir);

    let report = executor(engine(backend.clone()))
        .run(seed(&server.uri(), "job-full", JobConfig::default()))
        .await;

    assert!(report.is_clean(), "unexpected failures: {:?}", report.failures);
    assert_eq!(report.pages_processed, 4);
    assert_eq!(report.depth_breakdown.get(&0), Some(&1));
    assert_eq!(report.depth_breakdown.get(&2), Some(&1));

    let home = report
        .results()
        .iter()
        .find(|r| r.depth == 0)
        .expect("seed result missing");
    assert_eq!(home.links_found, 3);
    assert_eq!(home.links_queued, 2);
    match &home.content {
        Some(PageContent::Markdown { title, .. }) => assert_eq!(title.as_deref(), Some("Home")),
        other => panic!("expected markdown content, got {:?}", other),
    }

    let store = JobStateStore::new(backend, JobId::new("job-full"));
    assert_eq!(store.page_count().await.unwrap(), 4);
    let stored = store.get_config().await.unwrap().expect("config not stored");
    assert_eq!(stored.base_domain, "127.0.0.1");
}

#[tokio::test]
async fn test_crawl_with_depth_limit() {
    let server = MockServer::start().await;

    // Only depth 0 and 1 may be fetched; mounted first so it wins over the site's page
    Mock::given(method("GET"))
        .and(path("/page3"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .named("page3 beyond depth limit")
        .mount(&server)
        .await;
    mount_site(&server).await;

    let dir = TempDir::new().unwrap();
    let job_config = JobConfig {
        max_depth: 1,
        ..JobConfig::default()
    };

    let report = executor(engine(open_backend(&dir)))
        .run(seed(&server.uri(), "job-depth", job_config))
        .await;

    assert!(report.is_clean());
    assert_eq!(report.pages_processed, 3);
    assert!(report.results().iter().all(|r| r.depth <= 1));
}

#[tokio::test]
async fn test_page_budget() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let dir = TempDir::new().unwrap();
    let backend = open_backend(&dir);
    let job_config = JobConfig {
        max_pages: 2,
        ..JobConfig::default()
    };

    let engine = engine(backend.clone());
    let report = LocalExecutor::new(
        engine,
        ExecutorOptions {
            concurrency: 1,
            task_timeout: Duration::from_secs(10),
        },
    )
    .run(seed(&server.uri(), "job-budget", job_config))
    .await;

    assert_eq!(report.pages_processed, 2);
    assert!(report.skipped_over_budget >= 1);

    let store = JobStateStore::new(backend, JobId::new("job-budget"));
    assert_eq!(store.page_count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_content_type_handling() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_html(
        &server,
        "/",
        format!(r#"<a href="{base}/data">Data</a><a href="{base}/about">About</a>"#),
    )
    .await;
    mount_html(&server, "/about", "<h1>About</h1>".to_string()).await;

    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(r#"{"not": "html"}"#.as_bytes().to_vec(), "application/json"),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let report = executor(engine(open_backend(&dir)))
        .run(seed(&base, "job-content", JobConfig::default()))
        .await;

    assert_eq!(report.pages_processed, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].url, format!("{}/data", base));
    assert!(report.failures[0].message.contains("application/json"));
}

#[tokio::test]
async fn test_http_error_is_task_fatal() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_html(&server, "/", format!(r#"<a href="{base}/broken">Broken</a>"#)).await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let report = executor(engine(open_backend(&dir)))
        .run(seed(&base, "job-broken", JobConfig::default()))
        .await;

    assert_eq!(report.pages_processed, 1);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].message.contains("500"));
}

#[tokio::test]
async fn test_resubmitted_seed_is_skipped() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let dir = TempDir::new().unwrap();
    let backend = open_backend(&dir);

    let first = executor(engine(backend.clone()))
        .run(seed(&server.uri(), "job-again", JobConfig::default()))
        .await;
    assert_eq!(first.pages_processed, 4);

    let second = executor(engine(backend))
        .run(seed(&server.uri(), "job-again", JobConfig::default()))
        .await;
    assert_eq!(second.pages_processed, 0);
    assert_eq!(second.skipped_duplicate, 1);
}

#[tokio::test]
async fn test_state_shared_across_store_handles() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let dir = TempDir::new().unwrap();

    // A separate connection to the same file sees the visited markers
    executor(engine(open_backend(&dir)))
        .run(seed(&server.uri(), "job-shared", JobConfig::default()))
        .await;

    let reopened = open_backend(&dir);
    let bridge = CollectingScheduler::new();
    let task = seed(&server.uri(), "job-shared", JobConfig::default());
    let result = engine(reopened).handle(task, &bridge).await.unwrap();

    assert!(result.skipped);
    assert_eq!(result.skip_reason, Some(SkipReason::AlreadyVisited));
    assert!(bridge.is_empty());
}

#[tokio::test]
async fn test_aborted_job_processes_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .named("no fetch after abort")
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let backend = open_backend(&dir);
    JobStateStore::new(backend.clone(), JobId::new("job-abort"))
        .abort()
        .await
        .unwrap();

    let report = executor(engine(backend))
        .run(seed(&server.uri(), "job-abort", JobConfig::default()))
        .await;

    assert_eq!(report.pages_processed, 0);
    assert_eq!(report.skipped_aborted, 1);
}

#[tokio::test]
async fn test_step_emits_children_without_scheduling() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let dir = TempDir::new().unwrap();
    let task = seed(&server.uri(), "job-step", JobConfig::default());
    let outcome = engine(open_backend(&dir)).step(&task).await.unwrap();

    let mut children: Vec<_> = outcome.tasks.iter().map(|t| t.url.clone()).collect();
    children.sort();
    assert_eq!(
        children,
        vec![
            format!("{}/page1", server.uri()),
            format!("{}/page2", server.uri()),
        ]
    );
    assert!(outcome.tasks.iter().all(|t| t.depth == 1));
    assert!(outcome
        .tasks
        .iter()
        .all(|t| t.job_id == JobId::new("job-step")));
}

#[tokio::test]
async fn test_attachments_are_stored() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_html(
        &server,
        "/",
        r#"<a href="/files/report.pdf">Report</a><a href="/files/report.pdf">Again</a>"#
            .to_string(),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/files/report.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(b"%PDF-1.4 test".to_vec(), "application/pdf"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let attachments_dir = dir.path().join("attachments");
    let engine = engine(open_backend(&dir))
        .with_attachment_store(Arc::new(FsAttachmentStore::new(&attachments_dir)));
    let job_config = JobConfig {
        include_attachments: true,
        ..JobConfig::default()
    };

    let report = executor(engine)
        .run(seed(&base, "job-files", job_config))
        .await;

    assert!(report.is_clean());
    assert_eq!(report.pages_processed, 1);
    assert_eq!(report.attachments, 1);

    let attachment = &report.results()[0].attachments[0];
    assert_eq!(attachment.url, format!("{}/files/report.pdf", base));
    assert!(attachment.key.ends_with(".pdf"));
    assert!(attachment.signed_url.starts_with("file://"));

    let stored = std::fs::read(attachments_dir.join(Path::new(&attachment.key))).unwrap();
    assert_eq!(stored, b"%PDF-1.4 test");
}

#[tokio::test]
async fn test_links_resolve_against_final_url() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", format!("{base}/new/").as_str()))
        .mount(&server)
        .await;
    mount_html(&server, "/new/", r#"<a href="child">Child</a>"#.to_string()).await;

    let renderer = HttpRenderer::new(&user_agent()).unwrap();
    let page = renderer.navigate(&format!("{base}/old")).await.unwrap();

    assert_eq!(page.requested_url, format!("{base}/old"));
    assert_eq!(page.final_url, format!("{base}/new/"));
    assert_eq!(renderer.extract_links(&page), vec![format!("{base}/new/child")]);
}

#[tokio::test]
async fn test_schema_extraction_service() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_html(&server, "/", "<h1>Widget</h1><p>$10</p>".to_string()).await;
    Mock::given(method("POST"))
        .and(path("/extract"))
        .and(body_partial_json(json!({ "schema": { "type": "object" } })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": { "name": "Widget" } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let schema_extractor = HttpSchemaExtractor::new(
        build_http_client(&user_agent()).unwrap(),
        format!("{base}/extract"),
    );
    let generic = GenericExtractor::new().with_schema_extractor(Arc::new(schema_extractor));
    let job_config = JobConfig {
        extraction_schema: Some(json!({ "type": "object" })),
        ..JobConfig::default()
    };

    let renderer = HttpRenderer::new(&user_agent()).unwrap();
    let page = renderer.navigate(&format!("{base}/")).await.unwrap();
    let content = generic.extract(&page, &job_config).await.unwrap();

    match content {
        PageContent::Structured { data, .. } => assert_eq!(data, json!({ "name": "Widget" })),
        other => panic!("expected structured content, got {:?}", other),
    }
}
