//! Integration tests for the debounced auto-save against a Workspace
//!
//! Run on tokio's paused clock so the 2000 ms debounce elapses instantly.

use control_center::models::AUTOSAVE_DELAY_MS;
use control_center::{
    AppSettings, AutoSaveStatus, FixedClock, MemoryStore, SectionPatch, Workspace,
};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio::time::{Duration, sleep};

fn delay() -> Duration {
    Duration::from_millis(AUTOSAVE_DELAY_MS)
}

fn create_test_workspace() -> (Workspace, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let workspace = Workspace::with_store(
        AppSettings::default(),
        store.clone(),
        Arc::new(FixedClock::epoch()),
    )
    .unwrap();
    (workspace, store)
}

#[tokio::test(start_paused = true)]
async fn test_rapid_edits_write_once() {
    let (workspace, store) = create_test_workspace();
    let writes_before = store.put_count();
    let autosave = workspace.autosave();
    let id = workspace.state().list_sections()[0].id.clone();

    for n in 0..10 {
        autosave.edit(&id, SectionPatch::content(format!("draft {n}")));
        sleep(Duration::from_millis(100)).await;
    }
    assert_eq!(store.put_count(), writes_before);

    sleep(delay()).await;

    assert_eq!(store.put_count(), writes_before + 1);
    assert_eq!(workspace.state().list_sections()[0].content, "draft 9");
    assert_eq!(workspace.repository().load().unwrap().sections[0].content, "draft 9");
    assert_eq!(workspace.metrics().autosave_coalesced.load(Ordering::Relaxed), 9);
}

#[tokio::test(start_paused = true)]
async fn test_sections_debounce_independently() {
    let (workspace, store) = create_test_workspace();
    let writes_before = store.put_count();
    let autosave = workspace.autosave();
    let sections = workspace.state().list_sections();

    autosave.edit(&sections[0].id, SectionPatch::title("First"));
    sleep(Duration::from_millis(1500)).await;
    autosave.edit(&sections[1].id, SectionPatch::title("Second"));

    sleep(Duration::from_millis(600)).await;
    assert_eq!(store.put_count(), writes_before + 1);
    assert_eq!(autosave.pending_sections(), vec![sections[1].id.clone()]);

    sleep(delay()).await;
    assert_eq!(store.put_count(), writes_before + 2);
}

#[tokio::test(start_paused = true)]
async fn test_failure_reported_and_retried() {
    let (workspace, store) = create_test_workspace();
    let autosave = workspace.autosave();
    let mut status = autosave.subscribe_status();
    let id = workspace.state().list_sections()[0].id.clone();

    store.set_unavailable(true);
    autosave.edit(&id, SectionPatch::enabled(false));
    sleep(delay() + Duration::from_millis(1)).await;

    let failed = status.borrow_and_update().clone();
    assert!(matches!(failed, AutoSaveStatus::Failed { ref section_id, .. } if *section_id == id));
    assert_eq!(workspace.metrics().save_failures.load(Ordering::Relaxed), 1);

    store.set_unavailable(false);
    assert!(autosave.retry(&id));
    sleep(delay() + Duration::from_millis(1)).await;

    assert!(matches!(autosave.status(), AutoSaveStatus::Saved { .. }));
    assert!(!workspace.repository().load().unwrap().sections[0].enabled);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_coordinator_discards_pending_edit() {
    let (workspace, store) = create_test_workspace();
    let writes_before = store.put_count();
    let id = workspace.state().list_sections()[0].id.clone();

    {
        let autosave = workspace.autosave();
        autosave.edit(&id, SectionPatch::content("never saved"));
    }
    sleep(delay() * 2).await;

    assert_eq!(store.put_count(), writes_before);
    assert_ne!(workspace.state().list_sections()[0].content, "never saved");
}

#[tokio::test(start_paused = true)]
async fn test_edit_of_deleted_section_fails_cleanly() {
    let (workspace, store) = create_test_workspace();
    let writes_before = store.put_count();
    let autosave = workspace.autosave();
    let id = workspace.state().list_sections()[0].id.clone();

    autosave.edit(&id, SectionPatch::content("late"));
    workspace.state().delete_section(&id);
    sleep(delay() + Duration::from_millis(1)).await;

    assert!(matches!(autosave.status(), AutoSaveStatus::Failed { .. }));
    assert!(autosave.pending_sections().is_empty());
    assert_eq!(store.put_count(), writes_before);
}
