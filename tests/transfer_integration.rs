use std::cell::RefCell;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{Local, TimeZone};
use picksync::destination::{ValidatedPath, validate};
use picksync::path_set::PathSet;
use picksync::prompt::ProgressSink;
use picksync::transfer::{self, Outcome, SyncEngine};

static TEST_DIR_COUNTER: AtomicU64 = AtomicU64::new(1);

fn unique_dir(tag: &str) -> PathBuf {
    let now_ns = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let pid = std::process::id();
    let cnt = TEST_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!("picksync_transfer_{}_{}_{}_{}", tag, now_ns, pid, cnt));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn destination(dir: &Path) -> ValidatedPath {
    validate(dir.to_str().unwrap(), Path::new("/"), |_| false).unwrap()
}

/// Fails every source whose basename is listed; records invocation order.
struct FakeEngine {
    fail: Vec<&'static str>,
    calls: RefCell<Vec<(PathBuf, PathBuf)>>,
}

impl FakeEngine {
    fn failing(fail: &[&'static str]) -> Self {
        Self { fail: fail.to_vec(), calls: RefCell::new(Vec::new()) }
    }
}

impl SyncEngine for FakeEngine {
    fn sync(&self, source: &Path, target: &Path, log: &mut File) -> Outcome {
        self.calls.borrow_mut().push((source.to_path_buf(), target.to_path_buf()));
        writeln!(log, "fake sync {} -> {}", source.display(), target.display()).unwrap();
        let name = source.file_name().unwrap().to_string_lossy().to_string();
        if self.fail.contains(&name.as_str()) {
            Outcome::Failed { code: Some(23), reason: "partial transfer".into() }
        } else {
            Outcome::Success
        }
    }
}

#[derive(Default)]
struct RecordingProgress {
    events: Vec<(usize, usize, String)>,
}

impl ProgressSink for RecordingProgress {
    fn on_progress(&mut self, current: usize, total: usize, label: &str) {
        self.events.push((current, total, label.to_string()));
    }
}

fn outcome_lines(summary: &str) -> Vec<&str> {
    summary
        .lines()
        .filter(|l| l.starts_with("[OK]") || l.starts_with("[FAILED]"))
        .collect()
}

#[test]
fn two_sources_produce_matching_artifacts() {
    let dest_dir = unique_dir("scenario");
    let dest = destination(&dest_dir);
    let mut sources = PathSet::new();
    sources.add("/a/docs");
    sources.add("/a/proj");
    let started = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();

    let engine = FakeEngine::failing(&[]);
    let mut progress = RecordingProgress::default();
    let result = transfer::run_at(&sources, &dest, &engine, &mut progress, started).unwrap();

    assert_eq!(result.log_path, dest_dir.join("backup_20240309_070501.log"));
    assert_eq!(result.summary_path, dest_dir.join("backup_summary_20240309_070501.txt"));
    assert!(result.log_path.exists());

    let summary = fs::read_to_string(&result.summary_path).unwrap();
    assert!(summary.contains("Sources:     2"));
    assert!(summary.contains("  1. /a/docs"));
    assert!(summary.contains("  2. /a/proj"));
    assert!(summary.contains("Log file:    backup_20240309_070501.log"));
    assert!(summary.contains("Completed:"));
    let lines = outcome_lines(&summary);
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("/a/docs ->"));
    assert!(lines[1].contains("/a/proj ->"));

    let calls = engine.calls.borrow();
    assert_eq!(calls[0], (PathBuf::from("/a/docs"), dest_dir.join("docs")));
    assert_eq!(calls[1], (PathBuf::from("/a/proj"), dest_dir.join("proj")));
    let _ = fs::remove_dir_all(&dest_dir);
}

#[test]
fn a_failing_source_does_not_stop_the_run() {
    let dest_dir = unique_dir("partial");
    let dest = destination(&dest_dir);
    let mut sources = PathSet::new();
    for p in ["/src/one", "/src/two", "/src/three"] {
        sources.add(p);
    }
    let engine = FakeEngine::failing(&["two"]);
    let mut progress = RecordingProgress::default();
    let result = transfer::run(&sources, &dest, &engine, &mut progress).unwrap();

    assert_eq!(engine.calls.borrow().len(), 3);
    assert_eq!(result.succeeded(), 2);
    assert_eq!(result.failed(), 1);
    assert_eq!(result.last_failure_code(), Some(23));

    let summary = fs::read_to_string(&result.summary_path).unwrap();
    let lines = outcome_lines(&summary);
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("[OK]") && lines[0].contains("/src/one"));
    assert!(lines[1].starts_with("[FAILED]") && lines[1].contains("/src/two") && lines[1].ends_with("(exit 23)"));
    assert!(lines[2].starts_with("[OK]") && lines[2].contains("/src/three"));

    let log = fs::read_to_string(&result.log_path).unwrap();
    assert!(log.contains("=== [2/3] /src/two ->"));
    assert!(log.contains("!!! partial transfer"));
    let _ = fs::remove_dir_all(&dest_dir);
}

#[test]
fn progress_is_reported_before_each_item_and_once_at_the_end() {
    let dest_dir = unique_dir("progress");
    let dest = destination(&dest_dir);
    let mut sources = PathSet::new();
    sources.add("/a/docs");
    sources.add("/a/proj");
    let engine = FakeEngine::failing(&[]);
    let mut progress = RecordingProgress::default();
    transfer::run(&sources, &dest, &engine, &mut progress).unwrap();

    assert_eq!(
        progress.events,
        vec![
            (0, 2, "docs".to_string()),
            (1, 2, "proj".to_string()),
            (2, 2, "Done".to_string()),
        ]
    );
    let _ = fs::remove_dir_all(&dest_dir);
}

#[test]
fn same_second_runs_append_to_the_same_artifacts() {
    let dest_dir = unique_dir("append");
    let dest = destination(&dest_dir);
    let mut sources = PathSet::new();
    sources.add("/a/docs");
    let started = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
    let engine = FakeEngine::failing(&[]);

    let first = transfer::run_at(&sources, &dest, &engine, &mut RecordingProgress::default(), started).unwrap();
    let second = transfer::run_at(&sources, &dest, &engine, &mut RecordingProgress::default(), started).unwrap();
    assert_eq!(first.summary_path, second.summary_path);

    let summary = fs::read_to_string(&second.summary_path).unwrap();
    assert_eq!(outcome_lines(&summary).len(), 2);
    assert_eq!(summary.matches("Backup Summary").count(), 2);
    let _ = fs::remove_dir_all(&dest_dir);
}

/// Fails the first source, then swaps the run log for a device that rejects
/// every write, like a destination whose disk just filled up.
#[cfg(target_os = "linux")]
struct DiskFullEngine {
    calls: RefCell<usize>,
}

#[cfg(target_os = "linux")]
impl SyncEngine for DiskFullEngine {
    fn sync(&self, _source: &Path, _target: &Path, log: &mut File) -> Outcome {
        *self.calls.borrow_mut() += 1;
        *log = fs::OpenOptions::new().write(true).open("/dev/full").unwrap();
        if *self.calls.borrow() == 1 {
            Outcome::Failed { code: Some(11), reason: "disk full".into() }
        } else {
            Outcome::Success
        }
    }
}

#[cfg(target_os = "linux")]
#[test]
fn log_write_failures_do_not_stop_the_run() {
    let dest_dir = unique_dir("diskfull");
    let dest = destination(&dest_dir);
    let mut sources = PathSet::new();
    for p in ["/src/one", "/src/two", "/src/three"] {
        sources.add(p);
    }
    let engine = DiskFullEngine { calls: RefCell::new(0) };
    let mut progress = RecordingProgress::default();
    let result = transfer::run(&sources, &dest, &engine, &mut progress).unwrap();

    assert_eq!(*engine.calls.borrow(), 3);
    assert_eq!(result.records.len(), 3);
    assert_eq!(result.failed(), 1);
    assert_eq!(result.with_write_errors(), 3);
    assert!(result.records[0].write_errors[0].contains("No space left"));
    assert_eq!(progress.events.len(), 4);

    let summary = fs::read_to_string(&result.summary_path).unwrap();
    assert_eq!(outcome_lines(&summary).len(), 3);
    assert!(summary.contains("Completed:"));
    let _ = fs::remove_dir_all(&dest_dir);
}
