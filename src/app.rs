//! The application FSM (§4.F): a three-state supervisor orchestrating the
//! cipher engine, the plugboard scanner, the rotary-encoder reader, the
//! button debouncer and the display sink.
//!
//! Per §9's redesign note ("replace [the teacher's] function-pointer table
//! for FSM behavior... with a sum type over modes plus a dispatch that
//! matches and calls pure per-mode step functions"), [`AppMode`] is a sum
//! type and each state's behavior lives in its own method on
//! [`AppSession`] rather than a table of function pointers.

use crate::cipher::{CipherEngine, CipherError};
use crate::debounce::SampledDebouncer;
use crate::display::DisplaySink;
use crate::encoder::QuadratureDecoder;
use crate::hal::InPin;
use crate::plugboard::{Plugboard, PlugboardPins, PlugboardScanner};
use shared_types::{ButtonEdge, KeyEvent};

/// The rotary label shown while introducing a rotor slot in
/// `CONFIG_ROTOR` (§4.F "Entry actions": "run the Roman-numeral intro
/// animation for 700 ms, then switch to numeric display").
const ROTOR_INTRO_MS: u32 = 700;

/// The plugboard scan cadence while in `CONFIG_PB` (§4.F "Entry actions").
const PLUGBOARD_SCAN_PERIOD_MS: u32 = 500;

/// §4.F "States": `ENCRYPT` (initial), `CONFIG_PB`, `CONFIG_ROTOR`. The
/// rotor sub-progression (`0..=2`) is carried as the variant's payload,
/// "a counter inside CONFIG_ROTOR that advances before the state tag
/// does" (§4.F "Transition trigger").
#[derive(Debug, Copy, Clone, PartialEq, Eq, defmt::Format)]
pub enum AppMode {
    Encrypt,
    ConfigPlugboard,
    ConfigRotor(u8),
}

/// The session-scoped configuration (§3 "Application session").
#[derive(Debug, Copy, Clone, PartialEq, Eq, defmt::Format)]
pub struct SessionConfig {
    pub rotor_choice: [u8; 3],
    pub reflector_choice: u8,
}

/// The application's top-level coordinator (§4.F). Owns the cipher
/// engine, the plugboard permutation staged between sessions, the button
/// debouncer, the rotary-encoder reader, and the mode/rotor-position
/// state; the display sink and any GPIO pins are supplied per call so
/// this type stays generic-free.
pub struct AppSession {
    mode: AppMode,
    engine: CipherEngine,
    plugboard: Plugboard,
    rotor_positions: [u8; 3],
    button: SampledDebouncer,
    encoder: QuadratureDecoder,
    plugboard_scanner: PlugboardScanner,
    pb_scan_due_ms: u32,
    rotor_intro_until_ms: Option<u32>,
}

impl AppSession {
    /// Boots the session in `ENCRYPT` (§4.F "States"), which is never
    /// destroyed thereafter (§3 "Application session").
    pub fn new(
        config: SessionConfig,
        button_check_ms: u32,
        button_press_ms: u32,
        button_release_ms: u32,
    ) -> Result<AppSession, CipherError> {
        let engine = CipherEngine::init(config.rotor_choice, config.reflector_choice, [0, 0, 0])?;
        Ok(AppSession {
            mode: AppMode::Encrypt,
            engine,
            plugboard: Plugboard::identity(),
            rotor_positions: [0, 0, 0],
            button: SampledDebouncer::new(button_check_ms, button_press_ms, button_release_ms),
            encoder: QuadratureDecoder::new(),
            plugboard_scanner: PlugboardScanner::init(),
            pb_scan_due_ms: 0,
            rotor_intro_until_ms: None,
        })
    }

    pub fn mode(&self) -> AppMode {
        self.mode
    }

    pub fn rotor_positions(&self) -> [u8; 3] {
        self.rotor_positions
    }

    /// Samples the debounced button (§4.E) and advances the mode on a
    /// release edge (§4.F "Transition trigger": "one debounced
    /// press-and-release"). Returns the mode just entered, if any, so
    /// the caller can react to entry actions this crate doesn't own
    /// (enabling/disabling the PS/2 interrupt, per §4.F "Concurrency and
    /// ordering").
    pub fn sample_button(&mut self, raw_pressed: bool, now_ms: u32) -> Option<AppMode> {
        match self.button.sample(raw_pressed) {
            ButtonEdge::Released => {
                self.advance_mode(now_ms);
                Some(self.mode)
            }
            _ => None,
        }
    }

    fn advance_mode(&mut self, now_ms: u32) {
        self.mode = match self.mode {
            AppMode::Encrypt => AppMode::ConfigPlugboard,
            AppMode::ConfigPlugboard => AppMode::ConfigRotor(0),
            AppMode::ConfigRotor(i) if i < 2 => AppMode::ConfigRotor(i + 1),
            AppMode::ConfigRotor(_) => AppMode::Encrypt,
        };
        self.run_entry_actions(now_ms);
    }

    /// §4.F "Entry actions".
    fn run_entry_actions(&mut self, now_ms: u32) {
        match self.mode {
            AppMode::Encrypt => {
                // "snapshot current plugboard permutation into the cipher
                // engine, reinitialize engine offsets from
                // `rotor_positions`" — InvalidPlugboard/InvalidOffset can't
                // actually fire here: `self.plugboard` is always a valid
                // involution and `rotor_positions` are always in 0..=25.
                let _ = self.engine.set_plugboard(self.plugboard);
                let _ = self.engine.set_offsets(self.rotor_positions);
            }
            AppMode::ConfigPlugboard => {
                self.pb_scan_due_ms = now_ms;
            }
            AppMode::ConfigRotor(i) => {
                self.rotor_positions[i as usize] = self.engine.rotor_offset(i as usize);
                self.rotor_intro_until_ms = Some(now_ms.wrapping_add(ROTOR_INTRO_MS));
            }
        }
    }

    /// `ENCRYPT` per-state behavior (§4.F): drain translated key events,
    /// encrypt each make of an uppercase letter, ship the ciphertext to
    /// the display.
    pub fn run_encrypt(&mut self, key_events: impl Iterator<Item = u16>, display: &mut impl DisplaySink) {
        if self.mode != AppMode::Encrypt {
            return;
        }
        for raw in key_events {
            let event = KeyEvent::from_u16(raw);
            if event.brk {
                continue;
            }
            if (b'A'..=b'Z').contains(&event.key_code) {
                let cipher_char = self.engine.encrypt(event.key_code);
                display.draw_char(cipher_char);
            }
        }
    }

    /// `CONFIG_PB` per-state behavior (§4.F): scan the plugboard every
    /// 500 ms, scroll the "PLUG" label continuously.
    pub fn run_config_plugboard<P: PlugboardPins>(
        &mut self,
        now_ms: u32,
        pins: &mut P,
        display: &mut impl DisplaySink,
    ) {
        if self.mode != AppMode::ConfigPlugboard {
            return;
        }
        if now_ms.wrapping_sub(self.pb_scan_due_ms) < (1u32 << 31) {
            self.plugboard = self.plugboard_scanner.scan(pins);
            self.pb_scan_due_ms = now_ms.wrapping_add(PLUGBOARD_SCAN_PERIOD_MS);
        }
        display.shift_text("PLUG", false);
    }

    /// `CONFIG_ROTOR` per-state behavior (§4.F): sample the rotary
    /// encoder, clamp the selected rotor's position to `0..=25`, redraw
    /// on change. Shows the Roman-numeral intro for the first
    /// [`ROTOR_INTRO_MS`] after entry, then the numeric position.
    pub fn run_config_rotor(
        &mut self,
        now_ms: u32,
        clk: &impl InPin,
        data: &impl InPin,
        display: &mut impl DisplaySink,
    ) {
        let i = match self.mode {
            AppMode::ConfigRotor(i) => i,
            _ => return,
        };

        if let Some(until) = self.rotor_intro_until_ms {
            display.draw_roman(i + 1);
            if now_ms.wrapping_sub(until) < (1u32 << 31) {
                self.rotor_intro_until_ms = None;
            } else {
                return;
            }
        }

        let delta = self.encoder.read(clk, data);
        if delta != 0 {
            let current = self.rotor_positions[i as usize] as i16;
            let updated = (current + delta as i16).clamp(0, 25) as u8;
            if updated != self.rotor_positions[i as usize] {
                self.rotor_positions[i as usize] = updated;
                display.draw_number(updated);
            }
        } else {
            display.draw_number(self.rotor_positions[i as usize]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::test_support::MockSink;
    use crate::hal::MockPin;

    fn config() -> SessionConfig {
        SessionConfig {
            rotor_choice: [3, 2, 1],
            reflector_choice: 1,
        }
    }

    fn session() -> AppSession {
        AppSession::new(config(), 10, 50, 100).unwrap()
    }

    fn press_release(s: &mut AppSession, ms: &mut u32) -> Option<AppMode> {
        let mut result = None;
        for _ in 0..5 {
            s.sample_button(true, *ms);
            *ms += 10;
        }
        for _ in 0..10 {
            if let Some(m) = s.sample_button(false, *ms) {
                result = Some(m);
            }
            *ms += 10;
        }
        result
    }

    #[test]
    fn starts_in_encrypt() {
        assert_eq!(session().mode(), AppMode::Encrypt);
    }

    #[test]
    fn full_cycle_returns_to_encrypt() {
        let mut s = session();
        let mut ms = 0u32;
        assert_eq!(press_release(&mut s, &mut ms), Some(AppMode::ConfigPlugboard));
        assert_eq!(press_release(&mut s, &mut ms), Some(AppMode::ConfigRotor(0)));
        assert_eq!(press_release(&mut s, &mut ms), Some(AppMode::ConfigRotor(1)));
        assert_eq!(press_release(&mut s, &mut ms), Some(AppMode::ConfigRotor(2)));
        assert_eq!(press_release(&mut s, &mut ms), Some(AppMode::Encrypt));
    }

    #[test]
    fn encrypt_mode_drains_uppercase_key_events_only() {
        let mut s = session();
        let mut display = MockSink::default();
        let make_a = KeyEvent {
            brk: false,
            shift: false,
            ctrl: false,
            caps: false,
            alt: false,
            alt_gr: false,
            gui: false,
            function: false,
            key_code: b'A',
        }
        .to_u16();
        let break_a = KeyEvent {
            brk: true,
            ..KeyEvent::from_u16(make_a)
        }
        .to_u16();
        let non_letter = KeyEvent {
            brk: false,
            key_code: 0x01,
            ..KeyEvent::from_u16(make_a)
        }
        .to_u16();

        s.run_encrypt([make_a, break_a, non_letter].into_iter(), &mut display);
        assert_eq!(display.last_char, Some(b'B')); // scenario 1
    }

    #[test]
    fn config_rotor_clamps_at_zero() {
        let mut s = session();
        // Force into ConfigRotor(0) without caring about exact entry action math.
        s.mode = AppMode::ConfigRotor(0);
        s.rotor_intro_until_ms = None;
        s.rotor_positions = [0, 0, 0];
        let mut display = MockSink::default();
        // Counter-clockwise full detent from a standing start at 0 must clamp.
        let ccw = [(false, false), (true, false), (true, true), (false, true)];
        for &(clk, data) in ccw.iter() {
            s.run_config_rotor(0, &MockPin { high: clk }, &MockPin { high: data }, &mut display);
        }
        assert_eq!(s.rotor_positions[0], 0);
    }
}
