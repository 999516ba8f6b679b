use nckit_core::{EventBus, MotionKind, Position};
use nckit_interpreter::{Job, Playback};
use nckit_settings::Config;
use std::sync::Arc;
use std::time::Duration;

fn config_from(toml: &str) -> Config {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("settings.toml");
    std::fs::write(&path, toml).expect("write");
    Config::load_from_file(&path).expect("valid settings")
}

#[tokio::test]
async fn initial_modes_come_from_settings() {
    let config = config_from(
        r#"
[interpreter]
initial_motion_mode = "linear"
initial_distance_mode = "incremental"

[job]
event_history = true
"#,
    );
    let events = Arc::new(EventBus::with_config(config.job.event_bus_config()));
    let job = Job::with_events(config.interpreter.clone(), events);

    let snapshot = job
        .load("X5\nX5 Y1", "relative.nc")
        .expect("runtime available")
        .wait()
        .await
        .expect("processed");

    let moves = snapshot.moves.as_slice();
    assert_eq!(moves.len(), 2);
    assert!(moves.iter().all(|m| m.kind == MotionKind::Linear));
    assert_eq!(moves[1].end, Position::new(10.0, 1.0, 0.0));
    assert!(!job.events().history(None).is_empty());
}

#[tokio::test(start_paused = true)]
async fn playback_interval_comes_from_settings() {
    let config = config_from("[playback]\nstep_interval_ms = 40\n");
    let job = Job::new(config.interpreter.clone());
    job.load_blocking("G0 X1\nG0 X2\nG0 X3", "steps.nc")
        .expect("processed");

    let playback = Playback::new(job);
    playback.toggle_play();
    let started = tokio::time::Instant::now();
    let steps = playback
        .run(config.playback.step_interval())
        .await
        .expect("published");

    assert_eq!(steps, 2);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(80), "{:?}", elapsed);
    assert!(elapsed < Duration::from_millis(120), "{:?}", elapsed);
}
