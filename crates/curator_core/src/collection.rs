/// Tunables of the auto-scroll loop, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionSettings {
    pub scroll_step: i64,
    /// Movement beyond this since the last tick is treated as manual scrolling.
    pub manual_scroll_tolerance: i64,
}

impl Default for CollectionSettings {
    fn default() -> Self {
        Self {
            scroll_step: 300,
            manual_scroll_tolerance: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickAction {
    /// The loop is not running.
    Idle,
    /// A pass is in flight; try again next tick.
    Busy,
    /// Scroll forward by this many pixels, then schedule a pass.
    Scroll { pixels: i64 },
    /// The user moved the page; adopt the new position and leave it alone this tick.
    Resync,
}

/// Auto-advancing scroll driver. Start and stop are idempotent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CollectionLoop {
    running: bool,
    last_position: i64,
    settings: CollectionSettings,
}

impl CollectionLoop {
    pub fn new(settings: CollectionSettings) -> Self {
        Self {
            running: false,
            last_position: 0,
            settings,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn last_position(&self) -> i64 {
        self.last_position
    }

    /// Returns true when the loop was not already running.
    pub fn start(&mut self) -> bool {
        let changed = !self.running;
        self.running = true;
        changed
    }

    /// Returns true when the loop was running.
    pub fn stop(&mut self) -> bool {
        let changed = self.running;
        self.running = false;
        changed
    }

    /// Adopts where an automatic scroll actually left the page. At the end
    /// of the feed that is short of a full step.
    pub fn landed(&mut self, position: i64) {
        if self.running {
            self.last_position = position;
        }
    }

    pub fn tick(&mut self, processing: bool, position: i64) -> TickAction {
        if !self.running {
            return TickAction::Idle;
        }
        if processing {
            return TickAction::Busy;
        }
        if (position - self.last_position).abs() < self.settings.manual_scroll_tolerance {
            self.last_position = position + self.settings.scroll_step;
            TickAction::Scroll {
                pixels: self.settings.scroll_step,
            }
        } else {
            self.last_position = position;
            TickAction::Resync
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_and_stop_are_idempotent() {
        let mut lp = CollectionLoop::default();
        assert!(lp.start());
        assert!(!lp.start());
        assert!(lp.stop());
        assert!(!lp.stop());
    }

    #[test]
    fn stopped_loop_is_idle() {
        let mut lp = CollectionLoop::default();
        assert_eq!(lp.tick(false, 0), TickAction::Idle);
    }

    #[test]
    fn busy_pass_suppresses_scroll_without_moving_anchor() {
        let mut lp = CollectionLoop::default();
        lp.start();
        assert_eq!(lp.tick(true, 0), TickAction::Busy);
        assert_eq!(lp.last_position(), 0);
    }

    #[test]
    fn scrolls_when_close_to_last_position() {
        let mut lp = CollectionLoop::default();
        lp.start();
        assert_eq!(lp.tick(false, 50), TickAction::Scroll { pixels: 300 });
        assert_eq!(lp.last_position(), 350);
        assert_eq!(lp.tick(false, 350), TickAction::Scroll { pixels: 300 });
        assert_eq!(lp.last_position(), 650);
    }

    #[test]
    fn manual_scroll_resyncs_for_one_tick() {
        let mut lp = CollectionLoop::default();
        lp.start();
        assert_eq!(lp.tick(false, 1200), TickAction::Resync);
        assert_eq!(lp.last_position(), 1200);
        assert_eq!(lp.tick(false, 1200), TickAction::Scroll { pixels: 300 });
    }

    #[test]
    fn stalled_scroll_at_the_bottom_keeps_scrolling() {
        let mut lp = CollectionLoop::default();
        lp.start();
        assert_eq!(lp.tick(false, 1000), TickAction::Resync);
        for _ in 0..4 {
            assert_eq!(lp.tick(false, 1000), TickAction::Scroll { pixels: 300 });
            lp.landed(1000);
            assert_eq!(lp.last_position(), 1000);
        }
    }

    #[test]
    fn landing_is_ignored_while_stopped() {
        let mut lp = CollectionLoop::default();
        lp.landed(500);
        assert_eq!(lp.last_position(), 0);
    }

    #[test]
    fn movement_of_exactly_the_tolerance_counts_as_manual() {
        let mut lp = CollectionLoop::default();
        lp.start();
        assert_eq!(lp.tick(false, 100), TickAction::Resync);
        assert_eq!(lp.tick(false, 199), TickAction::Scroll { pixels: 300 });
    }
}
