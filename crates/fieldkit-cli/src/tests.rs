use std::path::{Path, PathBuf};

use fieldkit_core::config::ClientConfig;
use fieldkit_core::models::{MutationItem, RetryPolicy, SyncSettings};
use fieldkit_core::services::DatabaseService;
use fieldkit_core::sync::{HaltReason, SyncReport};
use fieldkit_core::{MutationKind, Resource};
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::{tempdir, TempDir};

use crate::cli::CompletionShell;
use crate::commands::common::{
    format_failed_lines, format_mutation_lines, format_relative_time, format_timestamp,
    parse_payload, resolve_db_path,
};
use crate::commands::completions::run_completions;
use crate::commands::enqueue::run_enqueue;
use crate::commands::failed::{parse_mutation_id, run_failed_clear, run_failed_retry};
use crate::commands::photo::run_photo_add;
use crate::commands::settings::{run_settings_set, run_settings_show};
use crate::commands::sync::{format_report_lines, run_sync};
use crate::commands::template::{load_template, parse_answers, run_template_score};
use crate::error::CliError;

const TEMPLATE: &str = r#"
{
  "pages": [{ "id": "p1", "title": "Attic", "sections": [{ "id": "s1", "title": "Insulation",
    "items": [
      { "id": "access", "type": "select", "label": "Attic accessible?",
        "options": [{ "value": "yes" }, { "value": "no" }] },
      { "id": "insulated", "type": "select", "label": "Insulated?",
        "options": [{ "value": "Y", "score": 10 }, { "value": "N", "score": 0 }],
        "required": true, "weight": 2 },
      { "id": "depth", "type": "slider", "label": "Depth rating" }
    ] }] }],
  "logic": [{ "conditions": [{ "questionId": "access", "operator": "equals", "value": "yes" }],
              "action": "show", "targetId": "insulated" }]
}
"#;

fn test_db() -> (TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("fieldkit.db");
    (dir, path)
}

fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn parse_payload_requires_object() {
    assert_eq!(
        parse_payload(r#"{ "title": "Blower door" }"#).unwrap(),
        json!({ "title": "Blower door" })
    );
    assert!(matches!(parse_payload("[1, 2]"), Err(CliError::InvalidPayload)));
    assert!(matches!(
        parse_payload("not json"),
        Err(CliError::Serialization(_))
    ));
}

#[test]
fn resolve_db_path_prefers_flag() {
    let path = resolve_db_path(Some(PathBuf::from("/tmp/custom.db"))).unwrap();
    assert_eq!(path, PathBuf::from("/tmp/custom.db"));
}

#[test]
fn parse_mutation_id_rejects_garbage() {
    assert!(matches!(
        parse_mutation_id("nope"),
        Err(CliError::InvalidMutationId(id)) if id == "nope"
    ));
    let item = MutationItem::new(MutationKind::Create, Resource::Job, json!({}));
    assert_eq!(parse_mutation_id(&format!(" {} ", item.id)).unwrap(), item.id);
}

#[test]
fn format_relative_time_units() {
    let now = 10_000_000_000;
    assert_eq!(format_relative_time(now - 30_000, now), "just now");
    assert_eq!(format_relative_time(now - 120_000, now), "2m ago");
    assert_eq!(format_relative_time(now - 2 * 60 * 60_000, now), "2h ago");
    assert_eq!(format_relative_time(now - 3 * 24 * 60 * 60_000, now), "3d ago");
}

#[test]
fn format_timestamp_returns_utc_label() {
    assert_eq!(format_timestamp(0), "1970-01-01 00:00:00 UTC");
}

#[test]
fn format_mutation_lines_include_key_and_error() {
    let mut item = MutationItem::new(MutationKind::Update, Resource::Equipment, json!({}));
    item.record_failure("HTTP 502");

    let lines = format_mutation_lines(&[item]);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("equipment:UPDATE"));
    assert!(lines[0].contains("retries=1"));
    assert!(lines[0].contains("last error: HTTP 502"));
}

#[test]
fn format_report_lines_mention_halt_reason() {
    let report = SyncReport {
        processed: 2,
        halted: Some(HaltReason::Offline),
        ..SyncReport::default()
    };
    let lines = format_report_lines(&report);
    assert_eq!(lines[0], "processed=2 failed=0 dead_lettered=0 dropped=0");
    assert_eq!(lines.last().unwrap(), "halted: offline");
}

#[tokio::test(flavor = "multi_thread")]
async fn enqueue_without_api_keeps_mutation_queued() {
    let (_dir, db_path) = test_db();

    let id = run_enqueue(
        Resource::Job,
        MutationKind::Create,
        Some(r#"{ "customer": "Okafor", "address": "12 Elm" }"#),
        &ClientConfig::default(),
        &db_path,
    )
    .await
    .unwrap();

    let db = DatabaseService::open_path(&db_path).await.unwrap();
    let queue = db.get_mutation_queue().await.unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].id, id);
    assert_eq!(queue[0].payload["customer"], "Okafor");
}

#[tokio::test(flavor = "multi_thread")]
async fn offline_config_skips_sync_pass() {
    let (_dir, db_path) = test_db();
    let config = ClientConfig {
        api_base_url: Some("https://api.example.com".to_string()),
        offline: true,
        ..ClientConfig::default()
    };

    let report = run_sync(true, &config, &db_path).await.unwrap();
    assert_eq!(report.halted, Some(HaltReason::Offline));
    assert_eq!(report.processed, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn sync_requires_api_base_url() {
    let (_dir, db_path) = test_db();
    let error = run_sync(false, &ClientConfig::default(), &db_path)
        .await
        .unwrap_err();
    assert!(error.to_string().contains("api_base_url"));
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_retry_and_clear() {
    let (_dir, db_path) = test_db();
    let db = DatabaseService::open_path(&db_path).await.unwrap();

    let mut retried = MutationItem::new(MutationKind::Create, Resource::Invoice, json!({}));
    retried.retry_count = 3;
    retried.error = Some("rejected".to_string());
    let dropped = MutationItem::new(MutationKind::Delete, Resource::Report, json!({}));
    db.add_failed_mutation(&retried).await.unwrap();
    db.add_failed_mutation(&dropped).await.unwrap();

    let lines = format_failed_lines(&db.list_failed_mutations().await.unwrap());
    assert!(lines.iter().any(|line| line.contains("invoice:CREATE")));

    let id = run_failed_retry(&retried.id.to_string(), &db_path).await.unwrap();
    assert_eq!(id, retried.id);
    let queue = db.get_mutation_queue().await.unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].retry_count, 0);

    assert_eq!(run_failed_clear(&db_path).await.unwrap(), 1);
    assert!(db.list_failed_mutations().await.unwrap().is_empty());

    let missing = run_failed_retry(&dropped.id.to_string(), &db_path).await;
    assert!(matches!(
        missing,
        Err(CliError::Core(fieldkit_core::Error::NotFound { .. }))
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn photo_add_stores_file_with_metadata() {
    let (dir, db_path) = test_db();
    let image = dir.path().join("furnace.JPG");
    std::fs::write(&image, [0xFF, 0xD8, 0xFF]).unwrap();

    let id = run_photo_add(&image, "insp-7", Some("Nameplate"), Some("hvac"), &db_path)
        .await
        .unwrap();

    let db = DatabaseService::open_path(&db_path).await.unwrap();
    let photos = db.list_photos("insp-7").await.unwrap();
    assert_eq!(photos.len(), 1);
    assert_eq!(photos[0].id, id);
    assert_eq!(photos[0].mime_type, "image/jpeg");
    assert_eq!(photos[0].caption, "Nameplate");
    assert_eq!(photos[0].content, vec![0xFF, 0xD8, 0xFF]);

    let empty = write_file(dir.path(), "empty.png", "");
    assert!(matches!(
        run_photo_add(&empty, "insp-7", None, None, &db_path).await,
        Err(CliError::EmptyPhoto(_))
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn settings_set_persists_and_config_overrides() {
    let (_dir, db_path) = test_db();

    assert!(matches!(
        run_settings_set(None, None, None, &db_path).await,
        Err(CliError::NoSettingsChange)
    ));

    let saved = run_settings_set(Some(RetryPolicy::FailFast), Some(5), None, &db_path)
        .await
        .unwrap();
    assert_eq!(saved.policy, RetryPolicy::FailFast);
    assert_eq!(saved.max_retries, 5);
    assert_eq!(saved.backoff_base_ms, 1_000);

    let shown = run_settings_show(true, &ClientConfig::default(), &db_path)
        .await
        .unwrap();
    assert_eq!(shown, saved);

    let config = ClientConfig {
        sync: Some(SyncSettings::default()),
        ..ClientConfig::default()
    };
    let shown = run_settings_show(true, &config, &db_path).await.unwrap();
    assert_eq!(shown, SyncSettings::default());
}

#[test]
fn template_score_hides_and_scores() {
    let dir = tempdir().unwrap();
    let template = write_file(dir.path(), "attic.json", TEMPLATE);
    let answers = write_file(
        dir.path(),
        "answers.json",
        r#"{ "access": "yes", "insulated": "Y", "depth": 50 }"#,
    );

    let report = run_template_score(&template, &answers, true).unwrap();
    assert!(report.questions.iter().all(|row| row.visible));
    assert!(report.missing_required.is_empty());
    assert_eq!(report.score.score, 70.0);
    assert_eq!(report.score.max_score, 120.0);

    let answers = write_file(
        dir.path(),
        "hidden.json",
        r#"[{ "questionId": "access", "value": "no" },
            { "questionId": "insulated", "value": "Y" }]"#,
    );
    let report = run_template_score(&template, &answers, false).unwrap();
    let insulated = report
        .questions
        .iter()
        .find(|row| row.id == "insulated")
        .unwrap();
    assert!(!insulated.visible);
    assert_eq!(report.score.score, 0.0);
    assert_eq!(report.score.max_score, 100.0);
}

#[test]
fn template_load_rejects_dangling_rules() {
    let dir = tempdir().unwrap();
    let broken = TEMPLATE.replace(r#""targetId": "insulated""#, r#""targetId": "windows""#);
    let path = write_file(dir.path(), "broken.json", &broken);

    assert!(matches!(
        load_template(&path),
        Err(CliError::InvalidTemplate(message)) if message.contains("windows")
    ));
}

#[test]
fn parse_answers_rejects_scalars() {
    assert!(matches!(parse_answers("42"), Err(CliError::InvalidAnswers)));
    assert!(matches!(
        parse_answers(r#"[{ "value": 1 }]"#),
        Err(CliError::InvalidAnswers)
    ));
}

#[test]
fn run_completions_writes_bash_script_file() {
    let dir = tempdir().unwrap();
    let output_path = dir.path().join("fieldkit.bash");

    run_completions(CompletionShell::Bash, Some(output_path.as_path())).unwrap();

    let script = std::fs::read_to_string(&output_path).unwrap();
    assert!(script.contains("_fieldkit()"));
    assert!(script.contains("complete -F _fieldkit"));
}

#[test]
fn run_completions_supports_powershell() {
    let dir = tempdir().unwrap();
    let output_path = dir.path().join("fieldkit.ps1");

    run_completions(CompletionShell::PowerShell, Some(output_path.as_path())).unwrap();

    let script = std::fs::read_to_string(&output_path).unwrap();
    assert!(script.contains("Register-ArgumentCompleter"));
    assert!(script.contains("'fieldkit'"));
}
