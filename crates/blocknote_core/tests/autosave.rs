use blocknote_core::{
    AutosaveScheduler, BlockKind, BlockSnapshot, MemoryNoteStore, NoteStore, SaveRequest,
    SaveStatus, StoreError, StoreResult, StoredNote,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

/// Holds its first write until the test opens the gate.
struct GatedStore {
    gate: Mutex<Option<mpsc::Receiver<()>>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
    started: Mutex<Vec<String>>,
    inner: MemoryNoteStore,
}

impl GatedStore {
    fn new(gate: mpsc::Receiver<()>) -> Self {
        Self {
            gate: Mutex::new(Some(gate)),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            started: Mutex::new(Vec::new()),
            inner: MemoryNoteStore::new(),
        }
    }
}

impl NoteStore for GatedStore {
    fn load(&self, note_id: &str) -> StoreResult<Option<StoredNote>> {
        self.inner.load(note_id)
    }

    fn save(&self, note_id: &str, title: &str, blocks: &[BlockSnapshot]) -> StoreResult<()> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        self.started.lock().unwrap().push(title.to_string());

        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.recv();
        }
        let result = self.inner.save(note_id, title, blocks);
        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Fails the first write, accepts the rest.
struct FlakyStore {
    attempts: AtomicUsize,
    inner: MemoryNoteStore,
}

impl NoteStore for FlakyStore {
    fn load(&self, note_id: &str) -> StoreResult<Option<StoredNote>> {
        self.inner.load(note_id)
    }

    fn save(&self, note_id: &str, title: &str, blocks: &[BlockSnapshot]) -> StoreResult<()> {
        if self.attempts.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(StoreError::Unavailable("database is locked".to_string()));
        }
        self.inner.save(note_id, title, blocks)
    }
}

fn snapshot(version: u64) -> SaveRequest {
    SaveRequest {
        note_id: "n1".to_string(),
        title: format!("draft {version}"),
        blocks: vec![BlockSnapshot::new(
            "a",
            BlockKind::Text,
            format!("revision {version}"),
        )],
        generation: version,
    }
}

#[tokio::test(start_paused = true)]
async fn burst_of_notifies_produces_one_write_with_latest_snapshot() {
    let store = Arc::new(MemoryNoteStore::new());
    let scheduler = AutosaveScheduler::spawn(Arc::clone(&store), Duration::from_millis(1000));

    for version in 1..=5 {
        scheduler.notify(snapshot(version)).unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
    }
    assert_eq!(store.save_count(), 0);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(store.save_count(), 1);
    let saved = store.load("n1").unwrap().unwrap();
    assert_eq!(saved.title, "draft 5");
    assert_eq!(saved.blocks[0].content, "revision 5");
    assert_eq!(scheduler.status(), SaveStatus::Saved { generation: 5 });
}

#[tokio::test(start_paused = true)]
async fn each_notify_restarts_the_quiet_interval() {
    let store = Arc::new(MemoryNoteStore::new());
    let scheduler = AutosaveScheduler::spawn(Arc::clone(&store), Duration::from_millis(500));

    for version in 1..=4 {
        scheduler.notify(snapshot(version)).unwrap();
        tokio::time::sleep(Duration::from_millis(400)).await;
    }
    assert_eq!(store.save_count(), 0);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(store.save_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn separated_edits_are_saved_separately() {
    let store = Arc::new(MemoryNoteStore::new());
    let scheduler = AutosaveScheduler::spawn(Arc::clone(&store), Duration::from_millis(200));

    scheduler.notify(snapshot(1)).unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    scheduler.notify(snapshot(2)).unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert_eq!(store.save_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_scheduler_flushes_pending_snapshot() {
    let store = Arc::new(MemoryNoteStore::new());
    let scheduler = AutosaveScheduler::spawn(Arc::clone(&store), Duration::from_millis(1000));
    scheduler.notify(snapshot(9)).unwrap();
    drop(scheduler);

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(store.save_count(), 1);
    assert_eq!(store.load("n1").unwrap().unwrap().title, "draft 9");
}

#[tokio::test]
async fn write_in_flight_delays_the_next_one() {
    let (open_gate, gate) = mpsc::channel();
    let store = Arc::new(GatedStore::new(gate));
    let scheduler = AutosaveScheduler::spawn(Arc::clone(&store), Duration::from_millis(50));
    let mut status = scheduler.subscribe();

    scheduler.notify(snapshot(1)).unwrap();
    tokio::time::timeout(
        Duration::from_secs(5),
        status.wait_for(|status| *status == SaveStatus::Saving { generation: 1 }),
    )
    .await
    .unwrap()
    .unwrap();

    scheduler.notify(snapshot(2)).unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(store.started.lock().unwrap().as_slice(), &["draft 1".to_string()]);

    open_gate.send(()).unwrap();
    tokio::time::timeout(
        Duration::from_secs(5),
        status.wait_for(|status| *status == SaveStatus::Saved { generation: 2 }),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(
        store.started.lock().unwrap().as_slice(),
        &["draft 1".to_string(), "draft 2".to_string()]
    );
    assert_eq!(store.max_active.load(Ordering::SeqCst), 1);
    assert_eq!(store.load("n1").unwrap().unwrap().title, "draft 2");
}

#[tokio::test(start_paused = true)]
async fn next_notify_after_a_failure_retries_and_succeeds() {
    let store = Arc::new(FlakyStore {
        attempts: AtomicUsize::new(0),
        inner: MemoryNoteStore::new(),
    });
    let scheduler = AutosaveScheduler::spawn(Arc::clone(&store), Duration::from_millis(100));
    let mut status = scheduler.subscribe();

    scheduler.notify(snapshot(1)).unwrap();
    status
        .wait_for(|status| matches!(status, SaveStatus::Failed { generation: 1, .. }))
        .await
        .unwrap();
    assert!(store.load("n1").unwrap().is_none());

    scheduler.notify(snapshot(2)).unwrap();
    status
        .wait_for(|status| *status == SaveStatus::Saved { generation: 2 })
        .await
        .unwrap();
    assert_eq!(store.attempts.load(Ordering::SeqCst), 2);
    assert_eq!(scheduler.status(), SaveStatus::Saved { generation: 2 });
    assert_eq!(store.load("n1").unwrap().unwrap().title, "draft 2");
}
