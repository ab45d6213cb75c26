use chrono::{ DateTime, Utc };
use parking_lot::RwLock;
use std::sync::Arc;

/// Snapshot of the replay loop, written by the tick loop and read by the status reporter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplayStatus {
    /// Whether a session is between start and stop
    pub running: bool,

    /// Ticks executed since start
    pub ticks: u64,

    /// Completed passes over the dataset
    pub cycle: u64,

    /// Simulated epoch seconds of the last tick
    pub sim_time: Option<f64>,

    /// Aircraft in the current window
    pub visible: usize,

    /// Trails with at least two points in the last frame
    pub trails: usize,

    /// Frames the rendering surface refused
    pub failed_emits: u64,
}

impl ReplayStatus {
    /// Simulated time as UTC, if it is a valid epoch
    pub fn sim_datetime(&self) -> Option<DateTime<Utc>> {
        self.sim_time.and_then(|t| DateTime::from_timestamp(t.floor() as i64, 0))
    }
}

/// Shared handle on the replay status
#[derive(Debug, Clone, Default)]
pub struct ReplayState {
    status: Arc<RwLock<ReplayStatus>>,
}

impl ReplayState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> ReplayStatus {
        self.status.read().clone()
    }

    pub fn update(&self, f: impl FnOnce(&mut ReplayStatus)) {
        f(&mut self.status.write());
    }

    pub fn set_running(&self, running: bool) {
        self.status.write().running = running;
    }

    /// Log one status line
    pub fn report(&self) {
        let status = self.status();
        let sim = status
            .sim_datetime()
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "-".to_string());

        tracing::info!(
            "replay pass {} at {}: {} aircraft, {} trails ({} ticks, {} failed emits)",
            status.cycle,
            sim,
            status.visible,
            status.trails,
            status.ticks,
            status.failed_emits
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn updates_are_visible_through_clones() {
        let state = ReplayState::new();
        let reader = state.clone();

        state.update(|s| {
            s.ticks = 3;
            s.visible = 7;
        });
        state.set_running(true);

        let status = reader.status();
        assert!(status.running);
        assert_eq!(status.ticks, 3);
        assert_eq!(status.visible, 7);
    }

    #[test]
    fn sim_time_formats_as_utc() {
        let status = ReplayStatus { sim_time: Some(1_656_288_000.7), ..Default::default() };
        let dt = status.sim_datetime().unwrap();
        assert_eq!(dt.to_rfc3339(), "2022-06-27T00:00:00+00:00");
    }
}
