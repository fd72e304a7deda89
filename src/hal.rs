//! The seam between this crate's pure logic and real silicon.
//!
//! Everything here is a trait: pin mux, NVIC priorities, clock trees and
//! board bring-up are out of scope (see spec §1/§6) and live in whatever
//! crate wires a concrete MCU's HAL (`stm32f1xx-hal` and friends) to these
//! traits. `embedded-hal`'s own `digital::v2` traits are still the
//! dependency that does the talking to real GPIO; the traits below restate
//! them with infallible, bool-returning signatures because every caller in
//! this crate treats a failed pin read/write the way the teacher firmware
//! does — as a programming error, not a recoverable condition.

use embedded_hal::digital::v2::InputPin;

/// A pin that can be sampled.
pub trait InPin {
    fn is_high(&self) -> bool;
}

/// A pin that can be driven.
pub trait OutPin {
    fn set_high(&mut self);
    fn set_low(&mut self);
}

/// A bidirectional, open-collector pin, as used for the PS/2 `clk`/`data`
/// lines (§4.C) and the plugboard's 26 sweep pins (§4.B): both idle high
/// (or pulled down, for the plugboard) and are driven low only by whichever
/// side is signalling.
pub trait OpenDrainPin: InPin + OutPin {}
impl<T: InPin + OutPin> OpenDrainPin for T {}

/// A monotonic millisecond tick, standing in for the HAL's `tick_ms()`
/// (§6). Wraps at `u32::MAX`; every consumer in this crate compares
/// timestamps with wrapping subtraction so a wraparound never produces a
/// spurious watchdog trip.
pub trait TickSource {
    fn tick_ms(&self) -> u32;
}

/// Scope-bounded interrupt control (§6: "scope-bounded `disable_irq` /
/// `enable_irq`"). A board binds this to its NVIC; this crate only ever
/// asks for the bracket, never the specific interrupt line, matching the
/// "disable interrupt, touch state, restore" discipline in §4.C's
/// "Concurrency discipline" note.
pub trait IrqControl {
    fn disable_irq(&self);
    fn enable_irq(&self);
}

/// RAII bracket around an [`IrqControl`]: disables on construction,
/// restores on drop. Used by the PS/2 driver's host-to-device transmit
/// setup, which must not let a receive edge land mid-setup.
pub struct IrqGuard<'a, C: IrqControl> {
    ctrl: &'a C,
}

impl<'a, C: IrqControl> IrqGuard<'a, C> {
    pub fn new(ctrl: &'a C) -> Self {
        ctrl.disable_irq();
        IrqGuard { ctrl }
    }
}

impl<'a, C: IrqControl> Drop for IrqGuard<'a, C> {
    fn drop(&mut self) {
        self.ctrl.enable_irq();
    }
}

/// Blanket bridge from `embedded-hal`'s fallible v2 digital traits. Every
/// HAL-provided GPIO pin with an `Infallible` error type (the overwhelming
/// common case for a microcontroller's own GPIO banks, as in the teacher's
/// `PA0<Input<PullDown>>` etc.) gets `InPin`/`OutPin` for free.
impl<T> InPin for T
where
    T: InputPin,
{
    fn is_high(&self) -> bool {
        self.is_high().unwrap_or(false)
    }
}

/// A pure-software pin usable from tests and the host-side demo, where
/// there is no real GPIO bank to bridge from `embedded-hal`.
#[derive(Debug, Copy, Clone, Default)]
pub struct MockPin {
    pub high: bool,
}

impl InPin for MockPin {
    fn is_high(&self) -> bool {
        self.high
    }
}

impl OutPin for MockPin {
    fn set_high(&mut self) {
        self.high = true;
    }
    fn set_low(&mut self) {
        self.high = false;
    }
}

/// A no-op `embedded-hal` shim so the blanket `InPin` impl above has
/// something concrete to exercise in tests without pulling in a real PAC.
#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use core::cell::Cell;
    use core::convert::Infallible;

    #[derive(Default)]
    pub struct CountingTick(pub Cell<u32>);

    impl TickSource for CountingTick {
        fn tick_ms(&self) -> u32 {
            self.0.get()
        }
    }

    #[derive(Default)]
    pub struct NoopIrq;

    impl IrqControl for NoopIrq {
        fn disable_irq(&self) {}
        fn enable_irq(&self) {}
    }

    pub struct EhMockPin(pub bool);

    impl InputPin for EhMockPin {
        type Error = Infallible;
        fn is_high(&self) -> Result<bool, Infallible> {
            Ok(self.0)
        }
        fn is_low(&self) -> Result<bool, Infallible> {
            Ok(!self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{CountingTick, EhMockPin};
    use super::*;

    #[test]
    fn embedded_hal_input_pin_bridges_through_blanket_impl() {
        let high = EhMockPin(true);
        let low = EhMockPin(false);
        assert!(InPin::is_high(&high));
        assert!(!InPin::is_high(&low));
    }

    #[test]
    fn counting_tick_reports_the_set_value() {
        let tick = CountingTick::default();
        assert_eq!(tick.tick_ms(), 0);
        tick.0.set(42);
        assert_eq!(tick.tick_ms(), 42);
    }
}
