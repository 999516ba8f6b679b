//! Playback cursor
//!
//! Scrubber model over the published move list: a current index, single
//! steps in either direction, and a timer-driven play mode. Every move the
//! cursor lands on is selected through the job, so renderers and editors
//! follow along through `MoveSelected` notifications.

use nckit_core::{
    AppEvent, EventBus, EventCategory, EventFilter, IndexError, JobEvent, PlaybackEvent,
    SubscriptionId,
};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;

use crate::job::Job;
use crate::moves::Move;

/// Default step interval while playing
pub const DEFAULT_STEP_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug, Default)]
struct Cursor {
    position: usize,
    maximum: usize,
    playing: bool,
    /// Job generation the range was taken from
    generation: u64,
}

/// Playback cursor bound to one job
#[derive(Debug, Clone)]
pub struct Playback {
    job: Job,
    cursor: Arc<Mutex<Cursor>>,
}

impl Playback {
    /// Create a cursor sized to the job's current snapshot
    pub fn new(job: Job) -> Self {
        let playback = Self {
            job,
            cursor: Arc::new(Mutex::new(Cursor::default())),
        };
        playback.refresh();
        playback
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    pub fn position(&self) -> usize {
        self.cursor.lock().position
    }

    /// Highest selectable index
    pub fn maximum(&self) -> usize {
        self.cursor.lock().maximum
    }

    pub fn is_playing(&self) -> bool {
        self.cursor.lock().playing
    }

    /// Resize to the published move list and rewind to the first move
    pub fn refresh(&self) -> usize {
        let (maximum, generation) = self
            .job
            .snapshot()
            .map(|snapshot| (snapshot.max_index(), snapshot.generation))
            .unwrap_or((0, self.job.generation()));
        set_range(&self.cursor, self.job.events(), maximum, generation);
        maximum
    }

    /// Refresh automatically whenever the job publishes a new move list
    ///
    /// Notifications from runs older than the current range are ignored.
    pub fn follow(&self) -> SubscriptionId {
        let cursor: Weak<Mutex<Cursor>> = Arc::downgrade(&self.cursor);
        let events: Weak<EventBus> = Arc::downgrade(self.job.events());
        self.job.events().subscribe(
            EventFilter::Categories(vec![EventCategory::Job]),
            move |event| {
                let AppEvent::Job(JobEvent::ProcessingFinished {
                    generation,
                    move_count,
                    ..
                }) = event
                else {
                    return;
                };
                if let (Some(cursor), Some(events)) = (cursor.upgrade(), events.upgrade()) {
                    set_range(&cursor, &events, move_count.saturating_sub(1), generation);
                }
            },
        )
    }

    /// Advance one move; `None` when already at the end
    pub fn step(&self) -> Result<Option<Move>, IndexError> {
        let next = {
            let cursor = self.cursor.lock();
            if cursor.position >= cursor.maximum {
                return Ok(None);
            }
            cursor.position + 1
        };
        self.land_on(next).map(Some)
    }

    /// Go back one move; `None` when already at the start
    pub fn step_back(&self) -> Result<Option<Move>, IndexError> {
        let previous = {
            let cursor = self.cursor.lock();
            if cursor.position == 0 {
                return Ok(None);
            }
            cursor.position - 1
        };
        self.land_on(previous).map(Some)
    }

    /// Jump to an index
    pub fn seek(&self, index: usize) -> Result<Move, IndexError> {
        let maximum = self.maximum();
        if index > maximum {
            return Err(IndexError::OutOfRange {
                index,
                len: maximum + 1,
            });
        }
        self.land_on(index)
    }

    /// Move under the cursor, without raising a selection
    pub fn current(&self) -> Result<Move, IndexError> {
        let snapshot = self.job.snapshot().ok_or(IndexError::NotReady)?;
        let mv = snapshot.index.move_at(self.position())?;
        Ok(mv.clone())
    }

    /// Source line to highlight in an editor
    ///
    /// `None` when nothing is published or the line is past the end of the
    /// program text.
    pub fn highlight_line(&self) -> Option<usize> {
        let snapshot = self.job.snapshot()?;
        let line = snapshot.index.line_of(self.position()).ok()?;
        (line < snapshot.program.line_count()).then_some(line)
    }

    /// Flip between playing and paused; returns the new state
    pub fn toggle_play(&self) -> bool {
        let playing = {
            let mut cursor = self.cursor.lock();
            cursor.playing = !cursor.playing;
            cursor.playing
        };
        self.announce(PlaybackEvent::PlayStateChanged { playing });
        playing
    }

    pub fn pause(&self) {
        let was_playing = std::mem::replace(&mut self.cursor.lock().playing, false);
        if was_playing {
            self.announce(PlaybackEvent::PlayStateChanged { playing: false });
        }
    }

    /// Step on a timer while playing
    ///
    /// Returns the number of steps taken once playback is paused or the
    /// last move is reached.
    pub async fn run(&self, interval: Duration) -> Result<usize, IndexError> {
        let mut ticker = tokio::time::interval(interval);
        // the first tick completes immediately
        ticker.tick().await;

        let mut steps = 0;
        while self.is_playing() {
            ticker.tick().await;
            if !self.is_playing() {
                break;
            }
            if self.step()?.is_some() {
                steps += 1;
            }
            if self.position() >= self.maximum() {
                self.pause();
                self.announce(PlaybackEvent::ReachedEnd);
                break;
            }
        }
        tracing::debug!("Playback stopped after {} steps", steps);
        Ok(steps)
    }

    fn land_on(&self, index: usize) -> Result<Move, IndexError> {
        let mv = self.job.select_index(index)?;
        self.cursor.lock().position = index;
        Ok(mv)
    }

    fn announce(&self, event: PlaybackEvent) {
        self.job.events().notify(AppEvent::Playback(event));
    }
}

fn set_range(cursor: &Mutex<Cursor>, events: &EventBus, maximum: usize, generation: u64) {
    {
        let mut cursor = cursor.lock();
        if generation < cursor.generation {
            tracing::trace!("Ignoring range from superseded run {}", generation);
            return;
        }
        cursor.maximum = maximum;
        cursor.position = 0;
        cursor.generation = generation;
    }
    events.notify(AppEvent::Playback(PlaybackEvent::RangeChanged { maximum }));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded(text: &str) -> Playback {
        let job = Job::default();
        job.load_blocking(text, "p.nc").expect("processed");
        Playback::new(job)
    }

    #[test]
    fn test_range_follows_snapshot() {
        let playback = loaded("G0 X1\nG0 X2\nG0 X3");
        assert_eq!(playback.maximum(), 2);
        assert_eq!(playback.position(), 0);

        let empty = Playback::new(Job::default());
        assert_eq!(empty.maximum(), 0);
        assert_eq!(empty.step(), Ok(None));
    }

    #[test]
    fn test_step_and_step_back() {
        let playback = loaded("G0 X1\nG0 X2\nG0 X3");
        assert_eq!(playback.step_back(), Ok(None));

        let mv = playback.step().expect("published").expect("not at end");
        assert_eq!(mv.index, 1);
        playback.step().expect("published");
        assert_eq!(playback.step(), Ok(None));
        assert_eq!(playback.position(), 2);

        let back = playback.step_back().expect("published").expect("not at start");
        assert_eq!(back.index, 1);
    }

    #[test]
    fn test_seek_bounds() {
        let playback = loaded("G0 X1\nG0 X2");
        assert_eq!(playback.seek(1).map(|m| m.line), Ok(1));
        assert!(matches!(
            playback.seek(5),
            Err(IndexError::OutOfRange { index: 5, len: 2 })
        ));
        assert_eq!(playback.position(), 1);
        assert_eq!(playback.current().map(|m| m.index), Ok(1));
    }

    #[test]
    fn test_highlight_line() {
        let playback = loaded("(start)\nG0 X1\nG0 X2");
        assert_eq!(playback.highlight_line(), Some(1));
        playback.step().expect("published");
        assert_eq!(playback.highlight_line(), Some(2));
        assert_eq!(Playback::new(Job::default()).highlight_line(), None);
    }

    #[test]
    fn test_follow_refreshes_on_publish() {
        let job = Job::default();
        let playback = Playback::new(job.clone());
        playback.follow();

        job.load_blocking("G0 X1\nG0 X2\nG0 X3\nG0 X4", "p.nc")
            .expect("processed");
        assert_eq!(playback.maximum(), 3);

        playback.seek(2).expect("in range");
        job.load_blocking("G0 X1\nG0 X2", "q.nc").expect("processed");
        assert_eq!(playback.maximum(), 1);
        assert_eq!(playback.position(), 0);
    }

    #[test]
    fn test_follow_ignores_late_notifications() {
        let job = Job::default();
        let playback = Playback::new(job.clone());
        playback.follow();

        job.load_blocking("G0 X1\nG0 X2\nG0 X3", "p.nc")
            .expect("processed");
        job.load_blocking("G0 X1\nG0 X2", "q.nc").expect("processed");
        assert_eq!(playback.maximum(), 1);

        // first run's notification delivered after the second one
        job.events().notify(AppEvent::Job(JobEvent::ProcessingFinished {
            generation: 1,
            identity: "p.nc".to_string(),
            move_count: 3,
            diagnostic_count: 0,
        }));
        assert_eq!(playback.maximum(), 1);
    }

    #[test]
    fn test_toggle_play() {
        let playback = loaded("G0 X1");
        assert!(playback.toggle_play());
        assert!(playback.is_playing());
        assert!(!playback.toggle_play());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_until_end() {
        let playback = loaded("G0 X1\nG0 X2\nG0 X3\nG0 X4");
        let mut events = playback.job().events().receiver();

        playback.toggle_play();
        let steps = playback
            .run(DEFAULT_STEP_INTERVAL)
            .await
            .expect("published");
        assert_eq!(steps, 3);
        assert_eq!(playback.position(), 3);
        assert!(!playback.is_playing());

        let mut reached_end = false;
        while let Ok(event) = events.try_recv() {
            if event == AppEvent::Playback(PlaybackEvent::ReachedEnd) {
                reached_end = true;
            }
        }
        assert!(reached_end);
    }

    #[tokio::test]
    async fn test_run_when_paused_returns_immediately() {
        let playback = loaded("G0 X1\nG0 X2");
        let steps = playback
            .run(Duration::from_millis(1))
            .await
            .expect("published");
        assert_eq!(steps, 0);
        assert_eq!(playback.position(), 0);
    }
}
