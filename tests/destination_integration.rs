use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use picksync::ValidationError;
use picksync::destination::{is_writable, validate};

static TEST_DIR_COUNTER: AtomicU64 = AtomicU64::new(1);

fn unique_dir(tag: &str) -> PathBuf {
    let now_ns = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let pid = std::process::id();
    let cnt = TEST_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!("picksync_dest_{}_{}_{}_{}", tag, now_ns, pid, cnt));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn home() -> &'static Path {
    Path::new("/nonexistent-home")
}

#[test]
fn writable_directory_is_accepted_modulo_trailing_separator() {
    let dir = unique_dir("ok");
    let raw = format!("{}/", dir.display());
    let mut asked = false;
    let got = validate(&raw, home(), |_| {
        asked = true;
        true
    })
    .unwrap();
    assert_eq!(got.as_path().display().to_string(), dir.display().to_string());
    assert!(!asked, "existing directory must not trigger the create prompt");
    // no probe file left behind
    assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn missing_directory_is_created_after_confirmation() {
    let base = unique_dir("create");
    let target = base.join("nested").join("backup");
    let mut asked_for = None;
    let got = validate(target.to_str().unwrap(), home(), |p| {
        asked_for = Some(p.to_path_buf());
        true
    })
    .unwrap();
    assert_eq!(asked_for, Some(target.clone()));
    assert!(target.is_dir());
    assert_eq!(got.into_inner(), target);
    let _ = fs::remove_dir_all(&base);
}

#[test]
fn declined_creation_leaves_disk_untouched() {
    let base = unique_dir("decline");
    let target = base.join("never");
    let res = validate(target.to_str().unwrap(), home(), |_| false);
    assert_eq!(res, Err(ValidationError::CreationDeclined(target.clone())));
    assert!(!target.exists());
    let _ = fs::remove_dir_all(&base);
}

#[test]
fn creation_failure_is_reported() {
    let base = unique_dir("blocked");
    let file = base.join("plain-file");
    fs::write(&file, b"x").unwrap();
    let res = validate(file.to_str().unwrap(), home(), |_| true);
    match res {
        Err(ValidationError::CreateFailed { path, .. }) => assert_eq!(path, file),
        other => panic!("expected CreateFailed, got {:?}", other),
    }
    let _ = fs::remove_dir_all(&base);
}

#[test]
fn empty_input_is_rejected() {
    assert_eq!(validate("", home(), |_| true), Err(ValidationError::EmptyPath));
}

#[test]
fn tilde_resolves_against_home() {
    let fake_home = unique_dir("home");
    fs::create_dir_all(fake_home.join("Backups")).unwrap();
    let got = validate("~/Backups", &fake_home, |_| false).unwrap();
    assert_eq!(got.as_path(), fake_home.join("Backups"));
    let _ = fs::remove_dir_all(&fake_home);
}

#[cfg(unix)]
#[test]
fn read_only_directory_is_not_writable() {
    use std::os::unix::fs::PermissionsExt;

    let dir = unique_dir("ro");
    fs::set_permissions(&dir, fs::Permissions::from_mode(0o555)).unwrap();
    if is_writable(&dir) {
        // running as root: permission bits do not apply
        fs::set_permissions(&dir, fs::Permissions::from_mode(0o755)).unwrap();
        let _ = fs::remove_dir_all(&dir);
        return;
    }
    let res = validate(dir.to_str().unwrap(), home(), |_| true);
    assert_eq!(res, Err(ValidationError::NotWritable(dir.clone())));
    fs::set_permissions(&dir, fs::Permissions::from_mode(0o755)).unwrap();
    let _ = fs::remove_dir_all(&dir);
}

// /proc refuses new files for every user, root included
#[cfg(target_os = "linux")]
#[test]
fn proc_is_never_writable() {
    assert!(!is_writable(Path::new("/proc")));
    let res = validate("/proc/", home(), |_| panic!("existing directory must not be created"));
    assert_eq!(res, Err(ValidationError::NotWritable(PathBuf::from("/proc"))));
}
