/// Where a race currently stands. Transitions only go forward until a reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RacePhase {
    #[default]
    Idle,
    Running,
    Finished,
}

impl RacePhase {
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Running => "Running",
            Self::Finished => "Finished",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeferredReset {
    pub due_at: f64,
}

/// Race clock for one session. Timestamps are seconds on the frame clock.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RaceTimer {
    phase: RacePhase,
    start_timestamp: Option<f64>,
    finish_timestamp: Option<f64>,
    elapsed_seconds: f64,
    pending_reset: Option<DeferredReset>,
}

impl RaceTimer {
    pub fn phase(&self) -> RacePhase {
        self.phase
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed_seconds
    }

    pub fn start_timestamp(&self) -> Option<f64> {
        self.start_timestamp
    }

    pub fn finish_timestamp(&self) -> Option<f64> {
        self.finish_timestamp
    }

    pub fn pending_reset(&self) -> Option<DeferredReset> {
        self.pending_reset
    }

    /// Seconds left before the scheduled auto-reset, if one is pending.
    pub fn reset_countdown(&self, now: f64) -> Option<f64> {
        self.pending_reset
            .map(|pending| (pending.due_at - now).max(0.0))
    }

    /// Returns true when this call moved the race from `Idle` to `Running`.
    pub fn start(&mut self, now: f64) -> bool {
        if self.phase != RacePhase::Idle {
            return false;
        }
        self.phase = RacePhase::Running;
        self.start_timestamp = Some(now);
        self.elapsed_seconds = 0.0;
        true
    }

    /// Records the finish and schedules the auto-reset. Ignored unless running.
    pub fn record_finish(&mut self, now: f64, auto_reset_seconds: f64) -> Option<f64> {
        if self.phase != RacePhase::Running {
            return None;
        }
        let start = self.start_timestamp?;

        self.phase = RacePhase::Finished;
        self.finish_timestamp = Some(now);
        self.elapsed_seconds = now - start;
        self.pending_reset = Some(DeferredReset {
            due_at: now + auto_reset_seconds,
        });
        Some(self.elapsed_seconds)
    }

    pub fn update_elapsed(&mut self, now: f64) {
        if self.phase != RacePhase::Running {
            return;
        }
        if let Some(start) = self.start_timestamp {
            self.elapsed_seconds = now - start;
        }
    }

    /// Consumes the pending auto-reset once its deadline has passed.
    pub fn take_due_reset(&mut self, now: f64) -> bool {
        match self.pending_reset {
            Some(pending) if now >= pending.due_at => {
                self.pending_reset = None;
                true
            }
            _ => false,
        }
    }

    /// Back to `Idle` with every field cleared, cancelling any pending auto-reset.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Formats seconds the way the HUD shows them, e.g. `12.34s`.
pub fn format_race_time(seconds: f64) -> String {
    format!("{:.2}s", seconds.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_only_from_idle() {
        let mut timer = RaceTimer::default();

        assert!(timer.start(1.0));
        assert!(!timer.start(2.0));
        assert_eq!(timer.phase(), RacePhase::Running);
        assert_eq!(timer.start_timestamp(), Some(1.0));
    }

    #[test]
    fn elapsed_tracks_the_clock_while_running() {
        let mut timer = RaceTimer::default();
        timer.update_elapsed(5.0);
        assert_eq!(timer.elapsed_seconds(), 0.0);

        timer.start(10.0);
        timer.update_elapsed(12.5);

        assert!((timer.elapsed_seconds() - 2.5).abs() < 1.0e-9);
    }

    #[test]
    fn finish_is_recorded_once_and_freezes_elapsed() {
        let mut timer = RaceTimer::default();
        timer.start(10.0);

        let final_time = timer.record_finish(22.34, 3.0).expect("running race finishes");
        assert!((final_time - 12.34).abs() < 1.0e-9);
        assert_eq!(timer.record_finish(23.0, 3.0), None);
        timer.update_elapsed(30.0);

        assert_eq!(timer.phase(), RacePhase::Finished);
        assert_eq!(timer.finish_timestamp(), Some(22.34));
        assert!((timer.elapsed_seconds() - 12.34).abs() < 1.0e-9);
    }

    #[test]
    fn finish_while_idle_is_ignored() {
        let mut timer = RaceTimer::default();

        assert_eq!(timer.record_finish(4.0, 3.0), None);
        assert_eq!(timer.phase(), RacePhase::Idle);
        assert!(timer.pending_reset().is_none());
    }

    #[test]
    fn auto_reset_comes_due_after_the_delay() {
        let mut timer = RaceTimer::default();
        timer.start(0.0);
        timer.record_finish(10.0, 3.0);

        assert!(!timer.take_due_reset(12.9));
        assert_eq!(timer.reset_countdown(12.0), Some(1.0));
        assert!(timer.take_due_reset(13.0));
        assert!(!timer.take_due_reset(14.0));
    }

    #[test]
    fn reset_cancels_the_pending_auto_reset() {
        let mut timer = RaceTimer::default();
        timer.start(0.0);
        timer.record_finish(10.0, 3.0);

        timer.reset();

        assert_eq!(timer, RaceTimer::default());
        assert!(!timer.take_due_reset(100.0));
    }

    #[test]
    fn race_time_uses_two_decimals() {
        assert_eq!(format_race_time(12.345_6), "12.35s");
        assert_eq!(format_race_time(0.0), "0.00s");
        assert_eq!(format_race_time(-1.0), "0.00s");
    }
}
