use nckit_core::{AppEvent, EventCategory, EventFilter, IndexError, JobError, JobEvent};
use nckit_interpreter::{DiagnosticKind, Job, JobState, Playback};
use parking_lot::Mutex;
use std::io::Write;
use std::sync::{mpsc, Arc};
use std::time::Duration;

const SQUARE: &str = "G90\nG1 X10 Y0\nG1 Y10\nG1 X0";

fn record_job_events(job: &Job) -> Arc<Mutex<Vec<JobEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    job.events().subscribe(
        EventFilter::Categories(vec![EventCategory::Job]),
        move |event| {
            if let AppEvent::Job(event) = event {
                sink.lock().push(event);
            }
        },
    );
    events
}

#[tokio::test]
async fn background_load_publishes_snapshot() {
    let job = Job::default();
    let events = record_job_events(&job);

    let handle = job.load(SQUARE, "square.nc").expect("runtime available");
    assert_eq!(handle.generation(), 1);
    let snapshot = handle.wait().await.expect("processed");

    assert_eq!(job.state(), JobState::Ready);
    assert_eq!(snapshot.move_count(), 3);
    assert_eq!(
        job.snapshot().map(|s| s.generation),
        Some(snapshot.generation)
    );

    let events = events.lock();
    assert_eq!(events.len(), 3);
    assert!(matches!(events[0], JobEvent::Loaded { line_count: 4, .. }));
    assert!(matches!(events[1], JobEvent::ProcessingStarted { .. }));
    assert_eq!(
        events[2],
        JobEvent::ProcessingFinished {
            generation: 1,
            identity: "square.nc".to_string(),
            move_count: 3,
            diagnostic_count: 0,
        }
    );
}

#[tokio::test]
async fn cancel_then_reload_never_publishes_cancelled_run() {
    let job = Job::default();
    let events = record_job_events(&job);

    // hold the first run right after it starts
    let (started_tx, started_rx) = mpsc::channel();
    let (resume_tx, resume_rx) = mpsc::channel::<()>();
    let started_tx = Mutex::new(started_tx);
    let resume_rx = Mutex::new(resume_rx);
    job.events().subscribe(
        EventFilter::Categories(vec![EventCategory::Job]),
        move |event| {
            if let AppEvent::Job(JobEvent::ProcessingStarted { generation: 1, .. }) = event {
                let _ = started_tx.lock().send(());
                let _ = resume_rx.lock().recv_timeout(Duration::from_secs(5));
            }
        },
    );

    let first = job.load(SQUARE, "square.nc").expect("runtime available");
    started_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("first run started");
    assert_eq!(job.state(), JobState::Processing);
    assert!(job.cancel());
    let second = job.reload().expect("program bound");
    resume_tx.send(()).expect("first run waiting");

    assert_eq!(
        first.wait().await.err(),
        Some(JobError::Superseded { generation: 1 })
    );

    let snapshot = second.wait().await.expect("processed");
    assert_eq!(snapshot.generation, 2);
    assert_eq!(job.state(), JobState::Ready);
    assert_eq!(job.generation(), 2);

    let finished: Vec<u64> = events
        .lock()
        .iter()
        .filter_map(|event| match event {
            JobEvent::ProcessingFinished { generation, .. } => Some(*generation),
            _ => None,
        })
        .collect();
    assert_eq!(finished, vec![2]);
}

#[tokio::test]
async fn new_load_withdraws_published_moves() {
    let job = Job::default();
    job.load_blocking(SQUARE, "a.nc").expect("processed");
    let old_index = job.selection_index().expect("published");

    let (started_tx, started_rx) = mpsc::channel();
    let (resume_tx, resume_rx) = mpsc::channel::<()>();
    let started_tx = Mutex::new(started_tx);
    let resume_rx = Mutex::new(resume_rx);
    job.events().subscribe(
        EventFilter::Categories(vec![EventCategory::Job]),
        move |event| {
            if let AppEvent::Job(JobEvent::ProcessingStarted { generation: 2, .. }) = event {
                let _ = started_tx.lock().send(());
                let _ = resume_rx.lock().recv_timeout(Duration::from_secs(5));
            }
        },
    );

    let second = job.load("G0 X1", "b.nc").expect("runtime available");
    started_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("second run started");

    assert_eq!(job.state(), JobState::Processing);
    assert!(job.snapshot().is_none());
    assert!(old_index.is_stale());
    assert!(matches!(old_index.move_at(2), Err(IndexError::Stale { .. })));
    assert_eq!(job.select_index(2).err(), Some(IndexError::NotReady));

    assert!(job.cancel());
    resume_tx.send(()).expect("second run waiting");
    assert!(matches!(
        second.wait().await,
        Err(JobError::Cancelled { .. })
    ));

    assert_eq!(job.state(), JobState::Failed);
    assert_eq!(
        job.program().map(|p| p.identity().to_string()),
        Some("b.nc".to_string())
    );
    assert!(job.snapshot().is_none());
    assert!(old_index.is_stale());
}

#[tokio::test]
async fn unreadable_file_withdraws_published_moves() {
    let job = Job::default();
    job.load_blocking(SQUARE, "a.nc").expect("processed");
    let old_index = job.selection_index().expect("published");

    let dir = tempfile::tempdir().expect("temp dir");
    let result = job.load_file(dir.path().join("missing.nc")).await;
    assert!(matches!(result, Err(JobError::Unreadable { .. })));
    assert_eq!(job.state(), JobState::Failed);
    assert!(job.snapshot().is_none());
    assert!(matches!(old_index.move_at(0), Err(IndexError::Stale { .. })));
}

#[tokio::test]
async fn explicit_cancel_fails_the_job() {
    let job = Job::default();
    let canceller = job.clone();
    job.events().subscribe(
        EventFilter::Categories(vec![EventCategory::Job]),
        move |event| {
            if let AppEvent::Job(JobEvent::ProcessingStarted { .. }) = event {
                assert!(canceller.cancel());
            }
        },
    );

    let result = job
        .load(SQUARE, "square.nc")
        .expect("runtime available")
        .wait()
        .await;
    assert!(matches!(result, Err(JobError::Cancelled { .. })));
    assert_eq!(job.state(), JobState::Failed);
    assert!(job.snapshot().is_none());

    let failure = job.failure();
    assert_eq!(failure.len(), 1);
    assert_eq!(failure[0].kind, DiagnosticKind::Cancellation);
    assert!(!job.cancel());
}

#[tokio::test]
async fn load_file_from_disk() {
    let mut file = tempfile::Builder::new()
        .suffix(".nc")
        .tempfile()
        .expect("temp file");
    write!(file, "G0 X1 Y1\r\nG1 Z-1 F100\r\n").expect("write");

    let job = Job::default();
    let snapshot = job
        .load_file(file.path())
        .await
        .expect("readable")
        .wait()
        .await
        .expect("processed");
    assert_eq!(snapshot.move_count(), 2);
    assert_eq!(snapshot.program.line_count(), 3);
    assert_eq!(snapshot.identity, file.path().display().to_string());
}

#[tokio::test]
async fn unreadable_file_reports_io_failure() {
    let job = Job::default();
    let events = record_job_events(&job);

    let dir = tempfile::tempdir().expect("temp dir");
    let result = job.load_file(dir.path().join("missing.nc")).await;
    assert!(matches!(result, Err(JobError::Unreadable { .. })));
    assert_eq!(job.state(), JobState::Failed);
    assert_eq!(job.failure()[0].kind, DiagnosticKind::Io);
    assert!(matches!(
        events.lock().last(),
        Some(JobEvent::ProcessingFailed { .. })
    ));
}

#[tokio::test]
async fn new_publish_makes_old_index_stale() {
    let job = Job::default();
    job.load("G0 X1\nG0 X2", "a.nc")
        .expect("runtime available")
        .wait()
        .await
        .expect("processed");
    let old_index = job.selection_index().expect("published");
    let old_id = old_index.move_at(1).expect("in range").id;

    job.load("G0 Y1", "b.nc")
        .expect("runtime available")
        .wait()
        .await
        .expect("processed");

    assert!(old_index.is_stale());
    assert!(matches!(
        old_index.index_of(old_id),
        Err(IndexError::Stale {
            index_generation: 1,
            current_generation: 2
        })
    ));
    assert!(matches!(
        job.select_move(old_id),
        Err(IndexError::UnknownMove { .. })
    ));

    let fresh = job.selection_index().expect("published");
    for i in 0..fresh.len() {
        let mv = fresh.move_at(i).expect("in range");
        assert_eq!(fresh.index_of(mv.id), Ok(i));
    }
}

#[tokio::test]
async fn playback_follows_background_loads() {
    let job = Job::default();
    let playback = Playback::new(job.clone());
    playback.follow();

    job.load(SQUARE, "square.nc")
        .expect("runtime available")
        .wait()
        .await
        .expect("processed");
    assert_eq!(playback.maximum(), 2);

    let mut selections = job.events().receiver();
    playback.step().expect("published");
    match selections.recv().await {
        Ok(AppEvent::Selection(nckit_core::SelectionEvent::MoveSelected { index, line, .. })) => {
            assert_eq!(index, 1);
            assert_eq!(line, 2);
        }
        other => panic!("unexpected event {:?}", other),
    }
    assert_eq!(playback.highlight_line(), Some(2));
}
