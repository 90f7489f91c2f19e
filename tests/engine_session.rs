// tests/engine_session.rs

mod common;
use crate::common::{init_tracing, with_timeout};

use std::sync::Arc;

use snapcheck::config::{parse_str, ConfigFile};
use snapcheck::engine::{Runtime, RuntimeEvent, Session};
use snapcheck::fs::mock::MockFileSystem;
use snapcheck::history::MemoryHistoryStore;
use snapcheck::task::Verdict;
use snapcheck::watch::WatchEvent;
use tokio::sync::mpsc;

const CONFIG: &str = r#"
[task.generate]
implementation = "gen v1"
inputs = [{ name = "protos", paths = ["proto"] }]
outputs = [{ name = "sources", paths = ["gen"] }]

[task.compile]
implementation = "cc v1"
incremental = true
after = ["generate"]
inputs = [{ name = "sources", paths = ["src", "gen"], sensitivity = "relative" }]
outputs = [{ name = "objects", paths = ["out"] }]
"#;

fn config() -> ConfigFile {
    ConfigFile::try_from(parse_str(CONFIG).unwrap()).unwrap()
}

fn project() -> MockFileSystem {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("/p/proto/api.proto", "message A {}");
    fs.add_file("/p/gen/api.rs", "struct A;");
    fs.add_file("/p/src/main.rs", "fn main() {}");
    fs.add_file("/p/out/main.o", "obj");
    fs
}

fn memory_session(fs: &MockFileSystem) -> Session {
    Session::with_history(
        &config(),
        "/p",
        Arc::new(fs.clone()),
        Box::new(MemoryHistoryStore::new()),
    )
    .unwrap()
}

fn verdicts(reports: &[snapcheck::engine::TaskReport]) -> Vec<(&str, Verdict)> {
    reports.iter().map(|r| (r.task.as_str(), r.verdict)).collect()
}

#[test]
fn tasks_are_evaluated_in_dependency_order() {
    let fs = project();
    let session = memory_session(&fs);

    let names: Vec<_> = session.tasks().iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["generate", "compile"]);
    assert_eq!(
        session.roots(),
        vec!["/p/proto", "/p/gen", "/p/src", "/p/out"]
    );
    assert!(session.task("compile").is_some());
    assert!(session.task("link").is_none());
}

#[test]
fn check_without_record_never_writes_history() {
    let fs = project();
    let session = memory_session(&fs);

    for _ in 0..2 {
        let reports = session.check_all(false).unwrap();
        assert_eq!(
            verdicts(&reports),
            vec![("generate", Verdict::Rebuild), ("compile", Verdict::Rebuild)]
        );
        assert_eq!(reports[0].reasons, vec!["No history is available.".to_string()]);
        assert_eq!(reports[0].recorded_outputs, None);
    }
}

#[test]
fn recorded_tasks_become_up_to_date() {
    let fs = project();
    let session = memory_session(&fs);

    let recorded = session.check_all(true).unwrap();
    assert_eq!(recorded[0].recorded_outputs, Some(1));
    assert_eq!(recorded[1].recorded_outputs, Some(1));

    let reports = session.check_all(false).unwrap();
    assert_eq!(
        verdicts(&reports),
        vec![("generate", Verdict::UpToDate), ("compile", Verdict::UpToDate)]
    );
    let build = session.checker().build_invocation_id().to_string();
    assert_eq!(reports[1].origin_build.as_deref(), Some(build.as_str()));
    assert!(reports[1].to_string().contains(&format!("[outputs from build {build}]")));
}

#[test]
fn watch_event_selects_only_affected_tasks() {
    let fs = project();
    let session = memory_session(&fs);
    session.check_all(true).unwrap();

    let version = session.vfs().current_version();
    fs.add_file("/p/src/main.rs", "fn main() { run() }");
    session
        .vfs()
        .apply_watch_event(&WatchEvent::modified("/p/src/main.rs"));

    let changed: Vec<_> = session
        .tasks_changed_since(version)
        .iter()
        .map(|t| t.name.clone())
        .collect();
    assert_eq!(changed, vec!["compile"]);

    let reports = session.recheck_changed(version, false).unwrap();
    assert_eq!(verdicts(&reports), vec![("compile", Verdict::Incremental)]);
    assert_eq!(reports[0].input_changes, 1);

    let text = reports[0].to_string();
    assert!(text.starts_with("compile: INCREMENTAL (cache key "), "{text}");
    assert!(
        text.ends_with("\n    - Input property 'sources' file /p/src/main.rs has changed."),
        "{text}"
    );
}

#[test]
fn vanished_output_is_caught_before_reporting_up_to_date() {
    let fs = project();
    let session = memory_session(&fs);
    session.check_all(true).unwrap();

    // No watch event: the VFS still believes the file exists.
    fs.remove("/p/out/main.o");

    let reports = session.check_all(false).unwrap();
    assert_eq!(reports[1].verdict, Verdict::Rebuild);
    assert_eq!(
        reports[1].reasons,
        vec!["Output file /p/out/main.o no longer exists.".to_string()]
    );
}

#[test]
fn runtime_step_only_reports_new_changes() {
    let fs = project();
    let session = memory_session(&fs);
    session.check_all(true).unwrap();

    let (_tx, rx) = mpsc::unbounded_channel();
    let mut runtime = Runtime::new(session, rx, false);
    assert_eq!(runtime.step().unwrap(), 0);

    fs.add_file("/p/proto/api.proto", "message B {}");
    runtime
        .session()
        .vfs()
        .apply_watch_event(&WatchEvent::modified("/p/proto/api.proto"));

    assert_eq!(runtime.step().unwrap(), 1);
    assert_eq!(runtime.step().unwrap(), 0);
}

#[tokio::test]
async fn runtime_records_changes_and_exits_when_senders_close() {
    let fs = project();
    let cfg = config();
    let session = Session::from_config(&cfg, "/p", Arc::new(fs.clone())).unwrap();
    session.check_all(true).unwrap();

    let (tx, rx) = mpsc::unbounded_channel();
    let runtime = Runtime::new(session, rx, true);

    fs.add_file("/p/src/main.rs", "fn main() { changed() }");
    tx.send(RuntimeEvent::FileChanged(WatchEvent::modified("/p/src/main.rs")))
        .unwrap();
    drop(tx);

    with_timeout(runtime.run()).await.unwrap();

    // A fresh session reads the history the runtime wrote.
    let session = Session::from_config(&cfg, "/p", Arc::new(fs.clone())).unwrap();
    let reports = session.check_all(false).unwrap();
    assert_eq!(
        verdicts(&reports),
        vec![("generate", Verdict::UpToDate), ("compile", Verdict::UpToDate)]
    );
}

#[tokio::test]
async fn runtime_stops_on_shutdown_request() {
    let fs = project();
    let session = memory_session(&fs);

    let (tx, rx) = mpsc::unbounded_channel();
    let runtime = Runtime::new(session, rx, false);
    tx.send(RuntimeEvent::ShutdownRequested).unwrap();

    // `tx` is still alive, so only the request can end the loop.
    with_timeout(runtime.run()).await.unwrap();
    drop(tx);
}
