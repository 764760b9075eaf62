#![cfg(unix)]

use std::fs::{self, File, OpenOptions};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use picksync::destination::validate;
use picksync::path_set::PathSet;
use picksync::prompt::ProgressSink;
use picksync::transfer::{self, Outcome, RsyncEngine, SyncEngine};

fn unique_dir(tag: &str) -> PathBuf {
    let now_ns = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let dir = std::env::temp_dir().join(format!("picksync_e2e_{}_{}_{}", tag, now_ns, std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_script(dir: &Path, name: &str, exit_code: i32) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\necho \"fake-rsync $*\"\necho \"to stderr\" >&2\nexit {}\n", exit_code)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn open_log(path: &Path) -> File {
    OpenOptions::new().create(true).append(true).open(path).unwrap()
}

struct Silent;

impl ProgressSink for Silent {
    fn on_progress(&mut self, _current: usize, _total: usize, _label: &str) {}
}

// one test so the scripts are never written while another test thread forks
#[test]
fn fake_rsync_scripts_end_to_end() {
    let work = unique_dir("engine");
    let ok = write_script(&work, "rsync-ok", 0);
    let failing = write_script(&work, "rsync-fail", 3);
    let log_path = work.join("engine.log");

    // success: arguments and both output streams land in the log
    let engine = RsyncEngine::new(&ok, vec!["*.tmp".to_string()]);
    let mut log = open_log(&log_path);
    let outcome = engine.sync(Path::new("/a/docs"), Path::new("/b/docs"), &mut log);
    assert_eq!(outcome, Outcome::Success);
    drop(log);
    let text = fs::read_to_string(&log_path).unwrap();
    assert!(text.contains("fake-rsync -a -v -h --delete --stats --exclude=*.tmp /a/docs/ /b/docs"));
    assert!(text.contains("to stderr"));

    // non-zero exit becomes a failure with its status
    let engine = RsyncEngine::new(&failing, Vec::new());
    let mut log = open_log(&log_path);
    match engine.sync(Path::new("/a/docs"), Path::new("/b/docs"), &mut log) {
        Outcome::Failed { code, .. } => assert_eq!(code, Some(3)),
        other => panic!("expected failure, got {:?}", other),
    }

    // a program that cannot be started fails without a status
    let engine = RsyncEngine::new(work.join("does-not-exist"), Vec::new());
    match engine.sync(Path::new("/a/docs"), Path::new("/b/docs"), &mut log) {
        Outcome::Failed { code, reason } => {
            assert_eq!(code, None);
            assert!(reason.contains("cannot start"));
        }
        other => panic!("expected failure, got {:?}", other),
    }

    // whole run through the orchestrator with the failing script
    let dest_dir = work.join("dest");
    fs::create_dir_all(&dest_dir).unwrap();
    let dest = validate(dest_dir.to_str().unwrap(), Path::new("/"), |_| false).unwrap();
    let mut sources = PathSet::new();
    sources.add("/a/docs");
    sources.add("/a/proj");
    let engine = RsyncEngine::new(&failing, Vec::new());
    let result = transfer::run(&sources, &dest, &engine, &mut Silent).unwrap();
    assert_eq!(result.failed(), 2);
    assert_eq!(result.last_failure_code(), Some(3));
    let log = fs::read_to_string(&result.log_path).unwrap();
    assert_eq!(log.matches("fake-rsync").count(), 2);

    let _ = fs::remove_dir_all(&work);
}
