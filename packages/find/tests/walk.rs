use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::json;

use entryfs_find::{find, FindConfig, FindReport, Query, ReferenceInstant, WalkOp};
use entryfs_plugin::testing::MockEntry;
use entryfs_plugin::{Attributes, Context, Entry, ExternalEntry};

fn node(entry: impl Entry + 'static) -> Arc<dyn Entry> {
    Arc::new(entry)
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

/// ```text
/// /
/// ├── pods/
/// │   ├── web      metadata, readable, modified 3h ago
/// │   ├── db       metadata, execable, modified 30m ago
/// │   └── broken/  listing fails
/// ├── logs/
/// │   └── app.log  readable, 4 KiB
/// └── config       external, declares read and write
/// ```
fn tree() -> Arc<dyn Entry> {
    let web = MockEntry::builder("web")
        .metadata(json!({"labels": {"app": "web"}, "replicas": 3}))
        .content("<html>")
        .attributes(Attributes::new().with_mtime(now() - Duration::hours(3)))
        .build();
    let db = MockEntry::builder("db")
        .metadata(json!({"labels": {"app": "db"}, "replicas": 1}))
        .exec_output(0, "ok")
        .attributes(Attributes::new().with_mtime(now() - Duration::minutes(30)))
        .build();
    let broken = MockEntry::builder("broken")
        .failing_list("connection refused")
        .build();
    let pods = MockEntry::builder("pods")
        .children(vec![node(web), node(db), node(broken)])
        .build();

    let app_log = MockEntry::builder("app.log")
        .content(vec![0u8; 4096])
        .attributes(Attributes::new().with_size(4096))
        .build();
    let logs = MockEntry::builder("logs")
        .children(vec![node(app_log)])
        .build();

    let config =
        ExternalEntry::from_methods(node(MockEntry::builder("config").build()), ["read", "write"]);

    node(
        MockEntry::builder("root")
            .children(vec![node(pods), node(logs), node(config)])
            .build(),
    )
}

async fn run(tokens: &[&str], config: FindConfig) -> FindReport {
    let query = Query::compile(tokens, ReferenceInstant::at(now())).unwrap();
    find(&Context::new(), tree(), &config, &query).await.unwrap()
}

fn paths(report: &FindReport) -> Vec<&str> {
    report.matches.iter().map(|e| e.path.as_str()).collect()
}

#[tokio::test]
async fn test_walk_is_preorder_in_listing_order() {
    let report = run(&[], FindConfig::default()).await;
    assert_eq!(
        paths(&report),
        vec![
            "/",
            "/pods",
            "/pods/web",
            "/pods/db",
            "/pods/broken",
            "/logs",
            "/logs/app.log",
            "/config",
        ]
    );
    assert_eq!(report.visited, 8);
}

#[tokio::test]
async fn test_list_failures_are_collected() {
    let report = run(&[], FindConfig::default()).await;
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].path, "/pods/broken");
    assert_eq!(report.errors[0].op, WalkOp::List);
}

#[tokio::test]
async fn test_name_and_time_primaries() {
    let report = run(&["-mtime", "+1h"], FindConfig::default()).await;
    assert_eq!(paths(&report), vec!["/pods/web"]);

    let report = run(&["-mtime", "-1h"], FindConfig::default()).await;
    assert_eq!(paths(&report), vec!["/pods/db"]);

    let report = run(
        &["(", "-name", "web", "-o", "-name", "*.log", ")", "-not", "-mtime", "+1h"],
        FindConfig::default(),
    )
    .await;
    assert_eq!(paths(&report), vec!["/logs/app.log"]);
}

#[tokio::test]
async fn test_size_primary() {
    let report = run(&["-size", "+4095"], FindConfig::default()).await;
    assert_eq!(paths(&report), vec!["/logs/app.log"]);
}

#[tokio::test]
async fn test_action_primary_covers_external_entries() {
    let report = run(&["-action", "write"], FindConfig::default()).await;
    assert_eq!(paths(&report), vec!["/config"]);

    let report = run(&["-action", "read"], FindConfig::default()).await;
    assert_eq!(paths(&report), vec!["/pods/web", "/logs/app.log", "/config"]);

    let report = run(&["-action", "exec"], FindConfig::default()).await;
    assert_eq!(paths(&report), vec!["/pods/db"]);
}

#[tokio::test]
async fn test_meta_primary_fetches_metadata() {
    let report = run(&["-meta", ".labels.app", "web"], FindConfig::default()).await;
    assert_eq!(paths(&report), vec!["/pods/web"]);
    assert!(report.matches[0].metadata.is_some());

    let report = run(&["-meta", ".replicas", "-2"], FindConfig::default()).await;
    assert_eq!(paths(&report), vec!["/pods/db"]);
}

#[tokio::test]
async fn test_metadata_is_not_fetched_unless_needed() {
    let report = run(&["-name", "web"], FindConfig::default()).await;
    assert!(report.matches[0].metadata.is_none());

    let config = FindConfig::default().with_fetch_metadata(true);
    let report = run(&["-name", "web"], config).await;
    assert!(report.matches[0].metadata.is_some());
}

#[tokio::test]
async fn test_depth_limits() {
    let config = FindConfig::from_json(r#"{"maxdepth": 1}"#).unwrap();
    let report = run(&[], config).await;
    assert_eq!(paths(&report), vec!["/", "/pods", "/logs", "/config"]);
    assert!(report.errors.is_empty());

    let config = FindConfig::default().with_mindepth(2);
    let report = run(&[], config).await;
    assert_eq!(
        paths(&report),
        vec!["/pods/web", "/pods/db", "/pods/broken", "/logs/app.log"]
    );
}

#[tokio::test]
async fn test_depth_of_snapshots() {
    let report = run(&["-name", "app.log"], FindConfig::default()).await;
    assert_eq!(report.matches[0].depth, 2);
    assert_eq!(report.matches[0].name, "app.log");
}

#[tokio::test]
async fn test_cancelled_walk_fails() {
    let ctx = Context::new();
    ctx.cancel();
    let query = Query::parse::<&str>(&[]).unwrap();
    let err = find(&ctx, tree(), &FindConfig::default(), &query)
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let config = FindConfig {
        mindepth: 2,
        maxdepth: Some(1),
        fetch_metadata: false,
    };
    let query = Query::parse::<&str>(&[]).unwrap();
    let err = find(&Context::new(), tree(), &config, &query)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("mindepth"));
}

fn external_group(declared: &[&str]) -> Arc<dyn Entry> {
    let inner = MockEntry::builder("ext")
        .children(vec![node(MockEntry::builder("hidden").build())])
        .build();
    let ext = ExternalEntry::from_methods(node(inner), declared.iter().copied());
    node(MockEntry::builder("root").children(vec![node(ext)]).build())
}

#[tokio::test]
async fn test_walk_descends_only_where_list_is_declared() {
    let query = Query::parse::<&str>(&[]).unwrap();
    let ctx = Context::new();

    let report = find(&ctx, external_group(&["exec"]), &FindConfig::default(), &query)
        .await
        .unwrap();
    assert_eq!(paths(&report), vec!["/", "/ext"]);
    assert_eq!(report.visited, 2);
    assert!(report.errors.is_empty());

    let report = find(&ctx, external_group(&["list"]), &FindConfig::default(), &query)
        .await
        .unwrap();
    assert_eq!(paths(&report), vec!["/", "/ext", "/ext/hidden"]);
}

#[tokio::test]
async fn test_metadata_failures_are_collected() {
    let flaky = MockEntry::builder("flaky")
        .failing_metadata("etcd timed out")
        .build();
    let web = MockEntry::builder("web")
        .metadata(json!({"labels": {"app": "web"}}))
        .build();
    let root = node(
        MockEntry::builder("root")
            .children(vec![node(flaky), node(web)])
            .build(),
    );

    let query =
        Query::compile(&["-meta", ".labels.app", "web"], ReferenceInstant::at(now())).unwrap();
    let report = find(&Context::new(), root, &FindConfig::default(), &query)
        .await
        .unwrap();

    assert_eq!(paths(&report), vec!["/web"]);
    assert_eq!(report.visited, 3);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].path, "/flaky");
    assert_eq!(report.errors[0].op, WalkOp::Metadata);
    assert!(report.errors[0].to_string().contains("etcd timed out"));
}
