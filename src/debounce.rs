//! The single button's sampled-counter debouncer (§4.E).
//!
//! This is deliberately the simpler of the two debounce designs grounded in
//! this crate's lineage: the teacher's own `QuickDraw` Schmitt trigger
//! (`keyberon`/`trigger.rs`) reports a change the instant it sees one and
//! only suppresses the bounces that follow, trading a larger state machine
//! for zero added latency. Spec's button debouncer instead counts
//! consecutive agreeing samples before committing to a new state, the
//! simpler and more common shape for a single low-rate UI button where a
//! few tens of milliseconds of latency don't matter.

use shared_types::ButtonEdge;

/// Samples a single button's raw state on a fixed cadence (nominally every
/// 10 ms, per §4.E) and emits a debounced press/release edge.
#[derive(Debug, Copy, Clone, PartialEq, Eq, defmt::Format)]
pub struct SampledDebouncer {
    press_ticks: u32,
    release_ticks: u32,
    debounced_pressed: bool,
    /// The raw state currently being confirmed, and how many more
    /// agreeing samples it needs before it becomes the debounced state.
    /// `None` means the raw state currently agrees with the debounced one.
    pending: Option<(bool, u32)>,
}

impl SampledDebouncer {
    /// `check_ms` is the sampling period; `press_ms`/`release_ms` are the
    /// number of milliseconds a raw disagreement must persist before it is
    /// accepted, converted here to a tick count (`N = duration_ms /
    /// check_ms`, §4.E).
    pub fn new(check_ms: u32, press_ms: u32, release_ms: u32) -> SampledDebouncer {
        SampledDebouncer {
            press_ticks: (press_ms / check_ms).max(1),
            release_ticks: (release_ms / check_ms).max(1),
            debounced_pressed: false,
            pending: None,
        }
    }

    fn threshold_for(&self, pressed: bool) -> u32 {
        if pressed {
            self.press_ticks
        } else {
            self.release_ticks
        }
    }

    pub fn is_pressed(&self) -> bool {
        self.debounced_pressed
    }

    /// Consume one raw sample of the button's state, returning whether the
    /// debounced state changed this sample and in which direction.
    pub fn sample(&mut self, raw_pressed: bool) -> ButtonEdge {
        if raw_pressed == self.debounced_pressed {
            self.pending = None;
            return ButtonEdge::None;
        }

        let remaining = match self.pending {
            Some((target, remaining)) if target == raw_pressed => remaining,
            _ => self.threshold_for(raw_pressed),
        };
        let remaining = remaining.saturating_sub(1);

        if remaining == 0 {
            self.debounced_pressed = raw_pressed;
            self.pending = None;
            if raw_pressed {
                ButtonEdge::Pressed
            } else {
                ButtonEdge::Released
            }
        } else {
            self.pending = Some((raw_pressed, remaining));
            ButtonEdge::None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // check_ms=10, press_ms=50 (5 ticks), release_ms=100 (10 ticks)
    fn debouncer() -> SampledDebouncer {
        SampledDebouncer::new(10, 50, 100)
    }

    #[test]
    fn noise_within_press_ms_emits_nothing() {
        let mut d = debouncer();
        // Flickers for 3 samples, well under the 5-tick press threshold,
        // never holding still long enough to confirm.
        assert_eq!(d.sample(true), ButtonEdge::None);
        assert_eq!(d.sample(false), ButtonEdge::None);
        assert_eq!(d.sample(true), ButtonEdge::None);
        assert!(!d.is_pressed());
    }

    #[test]
    fn edge_held_for_press_ms_emits_exactly_one_change() {
        let mut d = debouncer();
        assert_eq!(d.sample(true), ButtonEdge::None);
        assert_eq!(d.sample(true), ButtonEdge::None);
        assert_eq!(d.sample(true), ButtonEdge::None);
        assert_eq!(d.sample(true), ButtonEdge::None);
        assert_eq!(d.sample(true), ButtonEdge::Pressed);
        assert!(d.is_pressed());
        // Continuing to hold emits nothing further.
        assert_eq!(d.sample(true), ButtonEdge::None);
    }

    #[test]
    fn release_uses_its_own_threshold() {
        let mut d = debouncer();
        for _ in 0..5 {
            d.sample(true);
        }
        assert!(d.is_pressed());
        for _ in 0..9 {
            assert_eq!(d.sample(false), ButtonEdge::None);
        }
        assert_eq!(d.sample(false), ButtonEdge::Released);
        assert!(!d.is_pressed());
    }

    #[test]
    fn a_bounce_back_to_the_debounced_state_resets_the_count() {
        let mut d = debouncer();
        d.sample(true);
        d.sample(true);
        d.sample(true);
        d.sample(true);
        // Back to released right before the 5th confirming sample: resets.
        assert_eq!(d.sample(false), ButtonEdge::None);
        assert!(!d.is_pressed());
        // Needs a fresh full run to confirm now.
        for _ in 0..4 {
            assert_eq!(d.sample(true), ButtonEdge::None);
        }
        assert_eq!(d.sample(true), ButtonEdge::Pressed);
    }
}
