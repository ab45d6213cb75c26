use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{ Duration, Instant };
use tokio::time::{ self, Interval, MissedTickBehavior };
use tokio_util::sync::CancellationToken;

use crate::aggregate::select_window;
use crate::clock::{ ClockReading, ReplayClock };
use crate::config::{ ReplayConfig, ReplaySettings };
use crate::error::{ DatasetError, LoadError, SurfaceError };
use crate::frame::{ build_frame, Frame, Palette, RenderSurface };
use crate::loader::{ Dataset, DatasetLoader };
use crate::state::ReplayState;
use crate::trails::TrailTracker;

/// Source of animation frames. Each `Some` is one tick at the given wall-clock instant,
/// `None` means no more frames will come.
#[allow(async_fn_in_trait)]
pub trait FrameScheduler {
    async fn next_frame(&mut self) -> Option<Instant>;
}

/// Real-time frames at a fixed rate. Frames missed while a tick ran long are skipped.
pub struct IntervalScheduler {
    interval: Interval,
}

impl IntervalScheduler {
    pub fn new(period: Duration) -> Self {
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval }
    }
}

impl FrameScheduler for IntervalScheduler {
    async fn next_frame(&mut self) -> Option<Instant> {
        Some(self.interval.tick().await.into_std())
    }
}

/// Hands out a fixed list of instants, then stops
#[derive(Debug, Clone, Default)]
pub struct ScriptedScheduler {
    frames: VecDeque<Instant>,
}

impl ScriptedScheduler {
    pub fn new(frames: impl IntoIterator<Item = Instant>) -> Self {
        Self { frames: frames.into_iter().collect() }
    }

    /// Frames at `base + offset` for each offset
    pub fn from_offsets(base: Instant, offsets: impl IntoIterator<Item = Duration>) -> Self {
        Self::new(offsets.into_iter().map(|d| base + d))
    }
}

impl FrameScheduler for ScriptedScheduler {
    async fn next_frame(&mut self) -> Option<Instant> {
        self.frames.pop_front()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Created,
    Running,
    Stopped,
}

/// Result of one tick
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub reading: ClockReading,
    pub visible: usize,
    pub trails: usize,
    pub emitted: bool,
}

/// One independent replay of a dataset: `new -> start -> tick* -> stop`
pub struct ReplaySession {
    dataset: Arc<Dataset>,
    clock: ReplayClock,
    window_seconds: f64,
    palette: Palette,
    trails: TrailTracker,
    start_wall_time: Option<Instant>,
    cycle: u64,
    phase: SessionPhase,
    state: ReplayState,
}

impl ReplaySession {
    pub fn new(dataset: Arc<Dataset>, settings: &ReplaySettings, palette: Palette, state: ReplayState) -> Self {
        let clock = ReplayClock::for_dataset(settings.animation_duration(), &dataset);

        Self {
            dataset,
            clock,
            window_seconds: settings.window_seconds,
            palette,
            trails: TrailTracker::new(settings.max_trail_points),
            start_wall_time: None,
            cycle: 0,
            phase: SessionPhase::Created,
            state,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn trails(&self) -> &TrailTracker {
        &self.trails
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn start(&mut self) {
        if self.phase == SessionPhase::Running {
            return;
        }
        self.start_wall_time = None;
        self.cycle = 0;
        self.trails.clear();
        self.phase = SessionPhase::Running;
        self.state.update(|s| *s = Default::default());
        self.state.set_running(true);

        tracing::info!(
            "Replaying {} state vectors of {} ({} s compressed into {} ms)",
            self.dataset.len(),
            self.dataset.date(),
            self.dataset.duration(),
            self.clock.period().as_millis()
        );
    }

    pub fn stop(&mut self) {
        if self.phase != SessionPhase::Running {
            return;
        }
        self.phase = SessionPhase::Stopped;
        self.trails.clear();
        self.state.set_running(false);
        tracing::info!("Replay stopped");
    }

    /// One frame: clock, window selection, trails, emit. Returns `None` unless running.
    pub fn tick<R: RenderSurface>(&mut self, now: Instant, surface: &mut R) -> Option<TickReport> {
        if self.phase != SessionPhase::Running {
            return None;
        }

        let start = *self.start_wall_time.get_or_insert(now);
        let reading = self.clock.reading(now.saturating_duration_since(start));

        if reading.cycle != self.cycle {
            tracing::debug!("replay pass {} starts, resetting trails", reading.cycle);
            self.trails.clear();
            self.cycle = reading.cycle;
        }

        let selection = select_window(&self.dataset, reading.sim_time, self.window_seconds);
        self.trails.update(&selection);

        let frame = build_frame(&selection, &self.trails, &self.palette);
        let visible = frame.positions.features.len();
        let trails = frame.trails.features.len();

        let emitted = match surface.replace_sources(frame) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to emit frame at {:.0}: {}", reading.sim_time, e);
                false
            }
        };

        self.state.update(|s| {
            s.ticks += 1;
            s.cycle = reading.cycle;
            s.sim_time = Some(reading.sim_time);
            s.visible = visible;
            s.trails = trails;
            if !emitted {
                s.failed_emits += 1;
            }
        });

        Some(TickReport { reading, visible, trails, emitted })
    }

    /// Tick once per scheduled frame until cancelled or the scheduler runs dry
    pub async fn run<S, R>(&mut self, scheduler: &mut S, surface: &mut R, cancel: &CancellationToken)
        where S: FrameScheduler, R: RenderSurface
    {
        self.start();

        loop {
            let now = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                frame = scheduler.next_frame() => match frame {
                    Some(now) => now,
                    None => break,
                },
            };

            if cancel.is_cancelled() {
                break;
            }
            self.tick(now, surface);
        }

        self.stop();
    }
}

/// How `replay_source` ended
#[derive(Debug)]
pub enum ReplayOutcome {
    /// The loop ran until cancelled or out of frames
    Replayed { records: usize },
    /// Dataset held no usable records, the loop never started
    Empty,
    /// Dataset could not be loaded, the loop never started
    LoadFailed(LoadError),
}

/// Empty the surface, load the configured source and replay it.
///
/// An empty or unloadable dataset leaves the surface with empty sources and `state` untouched.
/// Only a surface that refuses the initial empty frame is an error.
pub async fn replay_source<S, R>(
    config: &ReplayConfig,
    loader: &DatasetLoader,
    state: ReplayState,
    scheduler: &mut S,
    surface: &mut R,
    cancel: &CancellationToken
) -> Result<ReplayOutcome, SurfaceError>
    where S: FrameScheduler, R: RenderSurface
{
    // Sources exist (empty) before anything is loaded
    surface.replace_sources(Frame::empty())?;

    let dataset = match loader.load(&config.data.source).await {
        Ok(dataset) => dataset,
        Err(DatasetError::Empty { date }) => {
            tracing::info!("Nothing to replay: dataset '{}' has no usable state vectors", date);
            return Ok(ReplayOutcome::Empty);
        }
        Err(DatasetError::Load(e)) => {
            tracing::error!("Failed to load dataset from {}: {}", config.data.source, e);
            return Ok(ReplayOutcome::LoadFailed(e));
        }
    };

    tracing::info!(
        "Loaded {} state vectors captured {} ({} malformed skipped)",
        dataset.len(),
        dataset.date(),
        dataset.malformed()
    );
    let records = dataset.len();

    let mut session = ReplaySession::new(
        Arc::new(dataset),
        &config.replay,
        Palette::new(config.colors.palette.clone()),
        state
    );
    session.run(scheduler, surface, cancel).await;

    Ok(ReplayOutcome::Replayed { records })
}
