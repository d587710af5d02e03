//! Tests for input discovery and the batch runner

use super::*;
use crate::app::models::FailureKind;
use crate::app::services::workflow::{
    BatchRunner, NoopObserver, Stage, StageObserver, Workflow, discover_inputs,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn runner(workers: usize) -> BatchRunner {
    BatchRunner::new(
        Arc::new(Workflow::new(&ascii_config(), None).unwrap()),
        workers,
    )
}

#[test]
fn test_discover_flat_is_case_insensitive_and_sorted() {
    let dir = TempDir::new().unwrap();
    write_input(dir.path(), "b.log", "");
    write_input(dir.path(), "a.LOG", "");
    write_input(dir.path(), "c.txt", "");
    std::fs::create_dir(dir.path().join("nested")).unwrap();
    write_input(&dir.path().join("nested"), "d.log", "");

    let files = discover_inputs(dir.path(), ".log", false).unwrap();

    assert_eq!(
        files,
        vec![dir.path().join("a.LOG"), dir.path().join("b.log")]
    );
}

#[test]
fn test_discover_recursive() {
    let dir = TempDir::new().unwrap();
    write_input(dir.path(), "b.log", "");
    std::fs::create_dir(dir.path().join("nested")).unwrap();
    write_input(&dir.path().join("nested"), "a.log", "");

    let files = discover_inputs(dir.path(), ".log", true).unwrap();

    assert_eq!(
        files,
        vec![dir.path().join("b.log"), dir.path().join("nested").join("a.log")]
    );
}

#[test]
fn test_discover_rejects_shared_stems() {
    let dir = TempDir::new().unwrap();
    for folder in ["a", "b"] {
        std::fs::create_dir(dir.path().join(folder)).unwrap();
        write_input(&dir.path().join(folder), "trip.log", "");
    }

    let error = discover_inputs(dir.path(), ".log", true).unwrap_err();

    assert!(matches!(error, crate::Error::Configuration { .. }));
    assert!(error.to_string().contains("trip"));
}

#[test]
fn test_discover_rejects_missing_directory() {
    let dir = TempDir::new().unwrap();
    assert!(discover_inputs(&dir.path().join("nope"), ".log", false).is_err());
}

#[tokio::test]
async fn test_corrupt_file_does_not_stop_batch() {
    let input_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    let inputs = vec![
        write_input(input_dir.path(), "1.log", &scenario_log()),
        write_input(input_dir.path(), "2.log", "\u{0}\u{1}garbage"),
        write_input(input_dir.path(), "3.log", &scenario_log()),
    ];

    let report = runner(2)
        .run(
            inputs,
            output_dir.path(),
            Arc::new(NoopObserver),
            CancellationToken::new(),
        )
        .await;

    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, 1);
    assert!(report.not_attempted.is_empty());
    let ids: Vec<&str> = report.results.iter().map(|r| r.file_id.as_str()).collect();
    assert_eq!(ids, vec!["1.log", "2.log", "3.log"]);
    assert_eq!(
        report.results[1].failure_kind(),
        Some(FailureKind::DecodeError)
    );
    assert!(output_dir.path().join("1.csv").exists());
    assert!(!output_dir.path().join("2.csv").exists());
    assert!(output_dir.path().join("3.csv").exists());
    assert_eq!(report.observations_written(), 2);
}

#[tokio::test]
async fn test_cancelled_run_submits_nothing() {
    let input_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    let inputs = vec![
        write_input(input_dir.path(), "1.log", &scenario_log()),
        write_input(input_dir.path(), "2.log", &scenario_log()),
    ];
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = runner(1)
        .run(inputs.clone(), output_dir.path(), Arc::new(NoopObserver), cancel)
        .await;

    assert!(report.results.is_empty());
    assert_eq!(report.not_attempted, inputs);
    assert_eq!(report.total(), 2);
    assert!(!report.all_succeeded());
}

#[tokio::test]
async fn test_cancel_during_run_leaves_rest_unattempted() {
    let input_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    let inputs: Vec<_> = (1..=3)
        .map(|n| write_input(input_dir.path(), &format!("{}.log", n), &scenario_log()))
        .collect();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let observer: Arc<dyn StageObserver> = Arc::new(move |event: &StageEvent| {
        if event.stage == Stage::Write && event.status == StageStatus::Succeeded {
            trigger.cancel();
        }
    });

    let report = runner(1)
        .run(inputs.clone(), output_dir.path(), observer, cancel)
        .await;

    assert_eq!(report.succeeded, 1);
    assert_eq!(report.not_attempted, inputs[1..].to_vec());
}

#[tokio::test]
async fn test_file_budget_expiry_records_timeout() {
    let input_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    let inputs = vec![write_input(input_dir.path(), "slow.log", &scenario_log())];
    // Hold the worker inside the load stage past the budget
    let observer: Arc<dyn StageObserver> = Arc::new(|event: &StageEvent| {
        if event.stage == Stage::Load && event.status == StageStatus::Started {
            std::thread::sleep(Duration::from_millis(300));
        }
    });

    let report = runner(1)
        .with_file_timeout(Some(Duration::from_millis(50)))
        .run(inputs, output_dir.path(), observer, CancellationToken::new())
        .await;

    let result = &report.results[0];
    assert_eq!(result.failure_kind(), Some(FailureKind::ExternalTimeout));
    assert_eq!(result.error.as_ref().unwrap().stage, Stage::ExtractDepth);
    assert!(result.outputs.is_empty());
    assert!(!output_dir.path().join("slow.csv").exists());
}

#[tokio::test]
async fn test_inputs_sharing_outputs_do_not_overwrite() {
    let input_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    let inputs: Vec<_> = ["a", "b"]
        .iter()
        .map(|folder| {
            let folder = input_dir.path().join(folder);
            std::fs::create_dir(&folder).unwrap();
            write_input(&folder, "trip.log", &scenario_log())
        })
        .collect();
    let observer = Arc::new(RecordingObserver::default());

    let report = runner(2)
        .run(
            inputs.clone(),
            output_dir.path(),
            observer.clone(),
            CancellationToken::new(),
        )
        .await;

    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 1);
    assert!(report.results[0].success);
    let second = &report.results[1];
    assert_eq!(second.input, inputs[1]);
    assert_eq!(second.failure_kind(), Some(FailureKind::WriteFailed));
    assert!(
        second.error.as_ref().unwrap().messages[0]
            .contains(&inputs[0].display().to_string())
    );
    assert!(second.outputs.is_empty());
    let failed_writes = observer
        .transitions()
        .into_iter()
        .filter(|(stage, status)| stage == "write" && *status == StageStatus::Failed)
        .count();
    assert_eq!(failed_writes, 1);
    assert_eq!(std::fs::read_dir(output_dir.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn test_lost_worker_is_attributed_to_its_stage() {
    let input_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    let inputs = vec![write_input(input_dir.path(), "trip.log", &scenario_log())];
    // Panics again while the failure itself is being reported
    let observer: Arc<dyn StageObserver> = Arc::new(|event: &StageEvent| {
        if event.stage == Stage::Write {
            panic!("observer bug");
        }
    });

    let report = runner(1)
        .run(inputs, output_dir.path(), observer, CancellationToken::new())
        .await;

    let result = &report.results[0];
    assert!(!result.success);
    assert_eq!(result.failure_kind(), Some(FailureKind::WriteFailed));
    assert_eq!(result.error.as_ref().unwrap().stage, Stage::Write);
    assert!(!output_dir.path().join("trip.csv").exists());
}
