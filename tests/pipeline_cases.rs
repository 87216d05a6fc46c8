mod common;

use std::fs;

use chrono::{DateTime, Utc};
use idsp_pipeline::csv_pipeline::extract_run_blocking;
use idsp_pipeline::dataset::aggregate_run;
use idsp_pipeline::models::RunSummary;
use idsp_pipeline::{DocumentFailurePolicy, PipelineConfig, PipelineError, RunContext};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

const REPORT_ROWS: &str = "\"Maharashtra\",\"Cholera\",\"12\"\n\"Kerala\",\"Measles\",\"7\"\n";

fn context(base_dir: &std::path::Path, policy: DocumentFailurePolicy) -> RunContext {
    let date: DateTime<Utc> = "2017-04-18T00:00:00Z".parse().expect("valid datetime");
    RunContext::new(
        PipelineConfig {
            base_dir: base_dir.to_path_buf(),
            failure_policy: policy,
            ..PipelineConfig::default()
        },
        date,
    )
}

#[test]
fn extracts_table_pages_after_front_matter() {
    let dir = tempdir().expect("tempdir should be created");
    let ctx = context(dir.path(), DocumentFailurePolicy::SkipDocument);
    let run_dir = ctx.run_dir();
    fs::create_dir_all(&run_dir).expect("create run dir");
    common::create_report_pdf(&run_dir.join("week-9.pdf"), &common::weekly_report())
        .expect("create fixture pdf");

    let summary = extract_run_blocking(&ctx).expect("extract run");

    assert_eq!(summary.documents.len(), 1);
    assert_eq!(summary.documents[0].document, "week-9");
    assert_eq!(summary.documents[0].pages.len(), 1);
    assert_eq!(summary.documents[0].pages[0].page, 3);
    assert_eq!(summary.documents[0].pages[0].rows, 2);
    assert_eq!(summary.documents[0].pages[0].columns, 3);

    let page_dir = run_dir.join("week-9");
    assert!(!page_dir.join("page-1.pdf").exists());
    assert!(page_dir.join("page-3.pdf").exists());
    assert_eq!(
        fs::read_to_string(page_dir.join("page-3.csv")).expect("read page records"),
        REPORT_ROWS
    );

    let written: RunSummary = serde_json::from_slice(
        &fs::read(ctx.summary_path()).expect("read summary"),
    )
    .expect("parse summary");
    assert_eq!(written, summary);
}

#[test]
fn broken_document_is_skipped_and_reported() {
    let dir = tempdir().expect("tempdir should be created");
    let ctx = context(dir.path(), DocumentFailurePolicy::SkipDocument);
    let run_dir = ctx.run_dir();
    fs::create_dir_all(&run_dir).expect("create run dir");
    fs::write(run_dir.join("week-10.pdf"), b"not a pdf").expect("write broken pdf");
    common::create_report_pdf(&run_dir.join("week-9.pdf"), &common::weekly_report())
        .expect("create fixture pdf");

    let summary = extract_run_blocking(&ctx).expect("extract run");

    assert_eq!(summary.failed_documents(), 1);
    assert_eq!(summary.documents[0].document, "week-10");
    assert!(summary.documents[0].error.is_some());
    assert_eq!(summary.row_count(), 2);
    assert!(run_dir.join("week-9").join("page-3.csv").exists());
}

#[test]
fn abort_policy_stops_at_first_broken_document() {
    let dir = tempdir().expect("tempdir should be created");
    let ctx = context(dir.path(), DocumentFailurePolicy::AbortRun);
    let run_dir = ctx.run_dir();
    fs::create_dir_all(&run_dir).expect("create run dir");
    fs::write(run_dir.join("week-10.pdf"), b"not a pdf").expect("write broken pdf");
    common::create_report_pdf(&run_dir.join("week-9.pdf"), &common::weekly_report())
        .expect("create fixture pdf");

    let error = extract_run_blocking(&ctx).expect_err("abort policy should fail");

    assert!(matches!(error, PipelineError::Extract { .. }));
    assert!(!run_dir.join("week-9").join("page-3.csv").exists());
}

#[test]
fn aggregate_appends_run_records_to_dataset() {
    let dir = tempdir().expect("tempdir should be created");
    let ctx = context(dir.path(), DocumentFailurePolicy::SkipDocument);
    let run_dir = ctx.run_dir();
    fs::create_dir_all(&run_dir).expect("create run dir");
    common::create_report_pdf(&run_dir.join("week-9.pdf"), &common::weekly_report())
        .expect("create fixture pdf");

    extract_run_blocking(&ctx).expect("extract run");
    let report = aggregate_run(&ctx).expect("aggregate run");

    assert_eq!(report.files, 1);
    assert_eq!(
        fs::read_to_string(ctx.config.dataset_path()).expect("read dataset"),
        REPORT_ROWS
    );
}

#[test]
fn extraction_forbidden_report_is_skipped_and_siblings_continue() {
    let dir = tempdir().expect("tempdir should be created");
    let ctx = context(dir.path(), DocumentFailurePolicy::SkipDocument);
    let run_dir = ctx.run_dir();
    fs::create_dir_all(&run_dir).expect("create run dir");
    common::create_locked_report_pdf(&run_dir.join("week-10.pdf"), &common::weekly_report())
        .expect("create locked fixture pdf");
    common::create_report_pdf(&run_dir.join("week-9.pdf"), &common::weekly_report())
        .expect("create fixture pdf");

    let summary = extract_run_blocking(&ctx).expect("extract run");

    assert_eq!(summary.documents[0].document, "week-10");
    assert_eq!(
        summary.documents[0].error_code.as_deref(),
        Some("extraction_forbidden")
    );
    assert!(!run_dir.join("week-10").join("page-3.pdf").exists());
    assert_eq!(summary.documents[1].error, None);
    assert_eq!(summary.row_count(), 2);
    assert!(run_dir.join("week-9").join("page-3.csv").exists());
    assert!(ctx.summary_path().exists());
}

#[test]
fn failed_record_write_discards_the_document_only() {
    let dir = tempdir().expect("tempdir should be created");
    let ctx = context(dir.path(), DocumentFailurePolicy::SkipDocument);
    let run_dir = ctx.run_dir();
    fs::create_dir_all(&run_dir).expect("create run dir");
    common::create_report_pdf(&run_dir.join("week-10.pdf"), &common::two_table_report())
        .expect("create fixture pdf");
    common::create_report_pdf(&run_dir.join("week-9.pdf"), &common::weekly_report())
        .expect("create fixture pdf");
    // A directory where the second page's record file belongs.
    fs::create_dir_all(run_dir.join("week-10").join("page-4.csv")).expect("create blocker");

    let summary = extract_run_blocking(&ctx).expect("extract run");

    assert_eq!(summary.documents[0].document, "week-10");
    assert_eq!(summary.documents[0].error_code.as_deref(), Some("io_error"));
    assert!(!run_dir.join("week-10").join("page-3.csv").exists());
    assert_eq!(
        fs::read_to_string(run_dir.join("week-9").join("page-3.csv")).expect("read page records"),
        REPORT_ROWS
    );
    assert!(ctx.summary_path().exists());
}
