//! The bit-level PS/2 receive/transmit state machine and scan-code
//! translator (§4.C), owned by a single [`Ps2Driver`] instance (§9's
//! redesign note: "re-architect as an owning instance... tests can
//! instantiate many drivers").

use arraydeque::{ArrayDeque, Saturating};
use embedded_hal::blocking::delay::DelayUs;
use shared_types::{KeyEvent, LockBit, LockMask};

use super::scancode::{self, PAUSE_SCANCODE_SENTINEL};
use crate::hal::{IrqControl, IrqGuard, OpenDrainPin};

const RAW_RING_CAPACITY: usize = 16;
const EVENT_RING_CAPACITY: usize = 16;
const PENDING_CAPACITY: usize = 8;

/// The only error this driver surfaces to a caller (§7): everything else
/// (parity, resync, overrun) is recovered internally.
#[derive(Debug, Copy, Clone, PartialEq, Eq, defmt::Format)]
pub enum Ps2Error {
    InvalidArg,
}

/// Which edge of `clk` fired. Receive only ever runs on the falling edge;
/// during host-to-device transmission the rising edge is also observed
/// (§4.C "Scheduling model") to clock bits onto `data`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, defmt::Format)]
pub enum ClkEdge {
    Falling,
    Rising,
}

/// The inter-bit watchdog, §4.C: "if ≥250 ms since last edge, reset
/// `bitcount=0`, `sr=0`."
const FRAME_WATCHDOG_MS: u32 = 250;

/// The E0/E1/BREAK decoder's tagged state (§9's redesign note, replacing
/// the bit-packed `_ps2mode`). `AwaitingExtendedBreak` is the one
/// combination spec.md's flag-word description needs that a flat `e0`
/// bool can't express cleanly in a sum type: the sequence `E0, F0, code`
/// (an extended key's break).
#[derive(Debug, Copy, Clone, PartialEq, Eq, defmt::Format)]
enum Ps2Mode {
    Idle,
    AwaitingExtended,
    AwaitingExtendedBreak,
    AwaitingExtendedPause(u8),
    AwaitingBreak,
}

/// A decoded raw scan code plus the prefix/break flags it arrived with
/// (§3 "PS/2 decoder state" / §4.C "Translation"), queued in the raw ring.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct RawScan {
    code: u8,
    e0: bool,
    brk: bool,
}

/// One outstanding outbound byte (§4.C "Transmit"). The expected-response
/// count a command needs is tracked separately (`expected_acks`,
/// `response_capture_remaining`) rather than as queue entries, since it
/// is the device's replies, not the host's sends, that size it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct PendingByte(u8);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum TxState {
    Idle,
    ShiftingData { byte: u8, bit_index: u8, parity: bool },
    ShiftingParity { parity: bool },
    ShiftingStop,
    AwaitingAck,
}

/// The five tracked hold-down modifiers (§4.C "Modifier keys"). Lock
/// state (Caps/Num/Scroll) lives in [`LockMask`] instead, since it
/// persists across keystrokes rather than tracking "currently held".
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, defmt::Format)]
struct ModifierState {
    shift: bool,
    ctrl: bool,
    alt: bool,
    alt_gr: bool,
    gui: bool,
}

impl ModifierState {
    fn get(&self, kind: scancode::ModifierKind) -> bool {
        match kind {
            scancode::ModifierKind::Shift => self.shift,
            scancode::ModifierKind::Ctrl => self.ctrl,
            scancode::ModifierKind::Alt => self.alt,
            scancode::ModifierKind::AltGr => self.alt_gr,
            scancode::ModifierKind::Gui => self.gui,
        }
    }

    fn set(&mut self, kind: scancode::ModifierKind, value: bool) {
        match kind {
            scancode::ModifierKind::Shift => self.shift = value,
            scancode::ModifierKind::Ctrl => self.ctrl = value,
            scancode::ModifierKind::Alt => self.alt = value,
            scancode::ModifierKind::AltGr => self.alt_gr = value,
            scancode::ModifierKind::Gui => self.gui = value,
        }
    }
}

/// The lock/modifier mutations one `translate` call would make, withheld
/// until its event is confirmed enqueued (see `Ps2Driver::commit`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
struct TranslateEffects {
    lock_toggle: Option<LockBit>,
    modifier: Option<(scancode::ModifierKind, bool)>,
}

impl TranslateEffects {
    const NONE: TranslateEffects = TranslateEffects { lock_toggle: None, modifier: None };
}

/// The PS/2 keyboard driver (§4.C). Owns both ring buffers, the bit-level
/// receive frame state, the decoder's tagged mode, modifier/lock
/// tracking, and the transmit path. The ISR is the only caller of
/// [`on_clk_edge`]; everything else is polled cooperatively from the
/// foreground (§5).
pub struct Ps2Driver<D, K>
where
    D: OpenDrainPin,
    K: OpenDrainPin,
{
    data_pin: D,
    clk_pin: K,

    irq_enabled: bool,

    // Receive frame state (§3 "PS/2 receive frame").
    sr: u16,
    bitcount: u8,
    parity_acc: bool,
    parity_ok: bool,
    last_edge_ms: u32,

    // Decoder state (§3 "PS/2 decoder state", §9 redesign note).
    mode: Ps2Mode,
    last_valid: Option<u8>,
    we_sent_echo: bool,
    expected_acks: u8,
    response_capture_remaining: u8,
    response_buf: [u8; 2],
    response_len: u8,

    // Translation state (§4.C "Translation").
    modifiers: ModifierState,
    lock_mask: LockMask,
    no_breaks: bool,
    no_repeats: bool,

    // Transmit path (§4.C "Transmit").
    tx: TxState,
    pending: ArrayDeque<[PendingByte; PENDING_CAPACITY], Saturating>,
    last_sent: Option<u8>,

    raw_ring: ArrayDeque<[RawScan; RAW_RING_CAPACITY], Saturating>,
    event_ring: ArrayDeque<[u16; EVENT_RING_CAPACITY], Saturating>,
}

impl<D, K> Ps2Driver<D, K>
where
    D: OpenDrainPin,
    K: OpenDrainPin,
{
    /// `init(data_pin, clk_pin)` (§4.C "Observable API"). The PS/2
    /// interrupt starts disabled; the caller (the application FSM, §4.F)
    /// enables it on entering `ENCRYPT`.
    pub fn init(data_pin: D, clk_pin: K) -> Self {
        Ps2Driver {
            data_pin,
            clk_pin,
            irq_enabled: false,
            sr: 0,
            bitcount: 0,
            parity_acc: false,
            parity_ok: true,
            last_edge_ms: 0,
            mode: Ps2Mode::Idle,
            last_valid: None,
            we_sent_echo: false,
            expected_acks: 0,
            response_capture_remaining: 0,
            response_buf: [0; 2],
            response_len: 0,
            modifiers: ModifierState::default(),
            lock_mask: LockMask::empty(),
            no_breaks: false,
            no_repeats: false,
            tx: TxState::Idle,
            pending: ArrayDeque::new(),
            last_sent: None,
            raw_ring: ArrayDeque::new(),
            event_ring: ArrayDeque::new(),
        }
    }

    pub fn enable_irq(&mut self) {
        self.irq_enabled = true;
    }

    pub fn disable_irq(&mut self) {
        self.irq_enabled = false;
    }

    pub fn get_lock(&self) -> LockMask {
        self.lock_mask
    }

    /// `set_lock(mask)`: installs the mask locally and queues the
    /// `0xED` LED-update command (§4.C "Lock keys").
    pub fn set_lock(&mut self, mask: LockMask) {
        self.lock_mask = mask;
        self.queue_byte(0xED);
        self.queue_byte(mask.bits());
    }

    pub fn set_no_breaks(&mut self, value: bool) {
        self.no_breaks = value;
    }

    pub fn set_no_repeats(&mut self, value: bool) {
        self.no_repeats = value;
    }

    pub fn echo(&mut self) {
        self.we_sent_echo = true;
        self.queue_byte(0xEE);
    }

    /// `read_id()`: queues `0xF2`; the (up to two) ID bytes the keyboard
    /// replies with are captured rather than mistaken for scan codes and
    /// left readable via [`last_response`](Self::last_response).
    pub fn read_id(&mut self) {
        self.response_capture_remaining = 2;
        self.response_len = 0;
        self.queue_byte(0xF2);
    }

    pub fn get_scancode_set(&mut self) {
        self.response_capture_remaining = 1;
        self.response_len = 0;
        self.queue_byte(0xF0);
        self.queue_byte(0x00);
    }

    /// `typematic(rate, delay)`: `InvalidArg` if either is out of range
    /// (§4.C), never mutates state on rejection.
    pub fn typematic(&mut self, rate: u8, delay: u8) -> Result<(), Ps2Error> {
        if rate > 31 || delay > 3 {
            return Err(Ps2Error::InvalidArg);
        }
        self.queue_byte(0xF3);
        self.queue_byte((delay << 5) | rate);
        Ok(())
    }

    pub fn reset(&mut self) {
        self.queue_byte(0xFF);
    }

    /// The last `read_id`/`get_scancode_set` reply bytes captured so far.
    pub fn last_response(&self) -> &[u8] {
        &self.response_buf[..self.response_len as usize]
    }

    fn queue_byte(&mut self, byte: u8) {
        let _ = self.pending.push_back(PendingByte(byte));
    }

    /// Pumps the transmit path: if the bus is idle and a command is
    /// queued, begins sending it (§4.C "When the bus is idle and a
    /// pending command exists, `send_now(b)`..."). Called from the
    /// cooperative foreground loop, not the ISR.
    ///
    /// Returns the `nb` non-blocking idiom the teacher's own serial-polling
    /// code uses (`fw/src/bin/right.rs`'s `nb::Error::WouldBlock` loop):
    /// `WouldBlock` while the bus is busy shifting a previous byte or
    /// nothing is queued, `Ok(())` once a new transmission has begun.
    pub fn service_tx<I: IrqControl, De: DelayUs<u16>>(
        &mut self,
        irq: &I,
        delay: &mut De,
    ) -> nb::Result<(), core::convert::Infallible> {
        if self.tx != TxState::Idle {
            return Err(nb::Error::WouldBlock);
        }
        match self.pending.pop_front() {
            Some(PendingByte(byte)) => {
                self.begin_transmit(byte, irq, delay);
                Ok(())
            }
            None => Err(nb::Error::WouldBlock),
        }
    }

    /// Host-to-device transmission setup (§4.C "Bus model"): pull `clk`
    /// low for ≥100 µs, pull `data` low (the start bit), then release
    /// `clk` to the device. The IRQ is disabled across this bracket
    /// (§4.C "Concurrency discipline") so a spurious edge during setup
    /// can't be mistaken for a real one.
    fn begin_transmit<I: IrqControl, De: DelayUs<u16>>(&mut self, byte: u8, irq: &I, delay: &mut De) {
        let _guard = IrqGuard::new(irq);
        self.clk_pin.set_low();
        delay.delay_us(100u16);
        self.data_pin.set_low();
        self.clk_pin.set_high();

        self.last_sent = Some(byte);
        let parity = byte.count_ones() % 2 == 0; // odd parity overall
        self.tx = TxState::ShiftingData {
            byte,
            bit_index: 0,
            parity,
        };
    }

    /// The ISR entry point (§9 redesign note). Bound by the caller's real
    /// interrupt handler on both edges of `clk`; only the falling edge
    /// matters while receiving, only the rising edge while transmitting.
    pub fn on_clk_edge(&mut self, edge: ClkEdge, now_ms: u32) {
        if !self.irq_enabled {
            return;
        }
        match self.tx {
            TxState::Idle => {
                if edge == ClkEdge::Falling {
                    self.on_receive_falling_edge(now_ms);
                }
            }
            _ => {
                if edge == ClkEdge::Rising {
                    self.on_transmit_rising_edge();
                }
            }
        }
    }

    fn on_receive_falling_edge(&mut self, now_ms: u32) {
        if self.bitcount > 0 && now_ms.wrapping_sub(self.last_edge_ms) >= FRAME_WATCHDOG_MS {
            self.bitcount = 0;
            self.sr = 0;
            self.parity_acc = false;
        }
        self.last_edge_ms = now_ms;

        let data = self.data_pin.is_high();
        self.bitcount += 1;

        match self.bitcount {
            1 => {
                // Start bit: must be 0, else resync without consuming a frame.
                if data {
                    self.bitcount = 0;
                }
            }
            2..=9 => {
                let bit_index = self.bitcount - 2;
                if data {
                    self.sr |= 1 << bit_index;
                    self.parity_acc = !self.parity_acc;
                }
            }
            10 => {
                // Odd parity: `parity_acc XOR parity_bit` must be 1.
                self.parity_ok = self.parity_acc ^ data;
                if !self.parity_ok {
                    self.queue_byte(0xFE);
                    self.bitcount = 0;
                    self.sr = 0;
                    self.parity_acc = false;
                }
            }
            11 => {
                if self.parity_ok {
                    let byte = (self.sr & 0xFF) as u8;
                    self.decode_byte(byte);
                }
                self.bitcount = 0;
                self.sr = 0;
                self.parity_acc = false;
            }
            _ => {
                self.bitcount = 0;
                self.sr = 0;
                self.parity_acc = false;
            }
        }
    }

    fn on_transmit_rising_edge(&mut self) {
        match self.tx {
            TxState::ShiftingData {
                byte,
                bit_index,
                parity,
            } => {
                if (byte >> bit_index) & 1 != 0 {
                    self.data_pin.set_high();
                } else {
                    self.data_pin.set_low();
                }
                self.tx = if bit_index + 1 == 8 {
                    TxState::ShiftingParity { parity }
                } else {
                    TxState::ShiftingData {
                        byte,
                        bit_index: bit_index + 1,
                        parity,
                    }
                };
            }
            TxState::ShiftingParity { parity } => {
                if parity {
                    self.data_pin.set_high();
                } else {
                    self.data_pin.set_low();
                }
                self.tx = TxState::ShiftingStop;
            }
            TxState::ShiftingStop => {
                self.data_pin.set_high();
                self.tx = TxState::AwaitingAck;
            }
            TxState::AwaitingAck => {
                let acked = !self.data_pin.is_high();
                self.tx = TxState::Idle;
                if acked {
                    self.expected_acks = self.expected_acks.saturating_add(1);
                }
            }
            TxState::Idle => {}
        }
    }

    /// Post-byte classification (§4.C "Decoder"). The `E1` pause sequence
    /// is absorbed here, bypassing the ordinary byte-value matches below
    /// (its trailing bytes happen to include `0xF0`, which would
    /// otherwise be mistaken for a break prefix).
    fn decode_byte(&mut self, b: u8) {
        if let Ps2Mode::AwaitingExtendedPause(remaining) = self.mode {
            if remaining > 1 {
                self.mode = Ps2Mode::AwaitingExtendedPause(remaining - 1);
            } else {
                self.mode = Ps2Mode::Idle;
                self.push_raw(RawScan {
                    code: PAUSE_SCANCODE_SENTINEL,
                    e0: false,
                    brk: false,
                });
            }
            return;
        }

        match b {
            0xAA => {
                self.last_valid = Some(b);
                self.expected_acks = 0;
                self.mode = Ps2Mode::Idle;
            }
            0xFC => {
                self.last_valid = Some(b);
                self.expected_acks = 0;
                self.mode = Ps2Mode::Idle;
                // BAT fail (§7 "Device-reported errors"): surface it the same
                // way OVERRUN is, so the application can observe it via
                // `read()` and decide to reset the driver.
                self.push_event_raw(b);
            }
            0xFA => {
                if self.expected_acks > 0 {
                    self.expected_acks -= 1;
                }
            }
            0xFE => {
                if let Some(byte) = self.last_sent {
                    let _ = self.pending.push_front(PendingByte(byte));
                }
            }
            0xEE => {
                self.last_valid = Some(b);
                if !self.we_sent_echo {
                    self.queue_byte(0xEE);
                }
                self.we_sent_echo = false;
            }
            0xE0 => {
                self.mode = match self.mode {
                    Ps2Mode::AwaitingBreak => Ps2Mode::AwaitingExtendedBreak,
                    _ => Ps2Mode::AwaitingExtended,
                };
            }
            0xE1 => {
                self.mode = Ps2Mode::AwaitingExtendedPause(7);
            }
            0xF0 => {
                self.mode = match self.mode {
                    Ps2Mode::AwaitingExtended => Ps2Mode::AwaitingExtendedBreak,
                    _ => Ps2Mode::AwaitingBreak,
                };
            }
            0xFF | 0x00 => {
                self.hard_reset();
                // Surface the device-reported error directly (§7): not a
                // scan code, so it bypasses translation and the raw ring.
                self.push_event_raw(b);
            }
            code => {
                if self.response_capture_remaining > 0 {
                    self.response_capture_remaining -= 1;
                    if (self.response_len as usize) < self.response_buf.len() {
                        self.response_buf[self.response_len as usize] = code;
                        self.response_len += 1;
                    }
                    return;
                }
                match self.mode {
                    Ps2Mode::AwaitingExtended => {
                        self.push_raw(RawScan {
                            code,
                            e0: true,
                            brk: false,
                        });
                        self.mode = Ps2Mode::Idle;
                    }
                    Ps2Mode::AwaitingExtendedBreak => {
                        self.push_raw(RawScan {
                            code,
                            e0: true,
                            brk: true,
                        });
                        self.mode = Ps2Mode::Idle;
                    }
                    Ps2Mode::AwaitingBreak => {
                        self.push_raw(RawScan {
                            code,
                            e0: false,
                            brk: true,
                        });
                        self.mode = Ps2Mode::Idle;
                    }
                    Ps2Mode::Idle | Ps2Mode::AwaitingExtendedPause(_) => {
                        self.push_raw(RawScan {
                            code,
                            e0: false,
                            brk: false,
                        });
                    }
                }
            }
        }
    }

    /// `0xFF`/`0x00` (OVERRUN): "hard reset of all driver state" (§4.C),
    /// clearing the decoder back to a known-idle baseline (§7).
    fn hard_reset(&mut self) {
        self.mode = Ps2Mode::Idle;
        self.bitcount = 0;
        self.sr = 0;
        self.parity_acc = false;
        self.tx = TxState::Idle;
        self.response_capture_remaining = 0;
    }

    /// Enqueue a raw scan to the raw ring (producer = ISR). Full ring
    /// drops the newest entry (§7 "Saturation"); `ArrayDeque<_, Saturating>`
    /// does this for free by rejecting the push instead of evicting
    /// anything already queued.
    fn push_raw(&mut self, raw: RawScan) {
        let _ = self.raw_ring.push_back(raw);
    }

    fn push_event_raw(&mut self, byte: u8) {
        let _ = self.event_ring.push_back(
            KeyEvent {
                brk: false,
                shift: false,
                ctrl: false,
                caps: false,
                alt: false,
                alt_gr: false,
                gui: false,
                function: true,
                key_code: byte,
            }
            .to_u16(),
        );
    }

    /// `available()`: advances translation from the raw ring into the
    /// event ring as far as the event ring's capacity allows, then
    /// returns the event count (§4.C "Observable API", §7 "event ring
    /// signals saturation by refusing to advance translation"). Lock and
    /// modifier state only changes once the translated event has actually
    /// been enqueued, so a full event ring leaves a raw scan untouched
    /// (and retried, unmutated, on the next call) rather than re-applying
    /// its lock toggle / LED command every retry.
    pub fn available(&mut self) -> usize {
        while let Some(&raw) = self.raw_ring.front() {
            match self.translate(raw) {
                Some((event, effects)) => {
                    if self.event_ring.push_back(event).is_err() {
                        break;
                    }
                    self.raw_ring.pop_front();
                    self.commit(effects);
                }
                None => {
                    self.raw_ring.pop_front();
                }
            }
        }
        self.event_ring.len()
    }

    /// `read()`: pop one translated event, or `0` if empty (§4.C).
    pub fn read(&mut self) -> u16 {
        self.event_ring.pop_front().unwrap_or(0)
    }

    /// Applies the lock/modifier side effects a successfully-enqueued
    /// `translate` computed. Split out of `translate` so `available` can
    /// withhold it until the event ring actually accepts the event.
    fn commit(&mut self, effects: TranslateEffects) {
        if let Some(lock_bit) = effects.lock_toggle {
            self.lock_mask.toggle(lock_bit);
            self.queue_byte(0xED);
            self.queue_byte(self.lock_mask.bits());
        }
        if let Some((modifier, value)) = effects.modifier {
            self.modifiers.set(modifier, value);
        }
    }

    /// The translation step (§4.C "Translation"): two-table scan-code
    /// lookup plus the lock/modifier/numpad special cases. Computes the
    /// would-be lock/modifier mutations against local copies of
    /// `lock_mask`/`modifiers` rather than `self` directly, returning them
    /// as [`TranslateEffects`] for the caller to commit only once the
    /// event is confirmed enqueued.
    fn translate(&mut self, raw: RawScan) -> Option<(u16, TranslateEffects)> {
        if raw.code == PAUSE_SCANCODE_SENTINEL {
            return Some((
                KeyEvent {
                    brk: false,
                    shift: self.modifiers.shift,
                    ctrl: self.modifiers.ctrl,
                    caps: self.lock_mask.is_set(LockBit::Caps),
                    alt: self.modifiers.alt,
                    alt_gr: self.modifiers.alt_gr,
                    gui: self.modifiers.gui,
                    function: true,
                    key_code: scancode::KC_PAUSE,
                }
                .to_u16(),
                TranslateEffects::NONE,
            ));
        }

        let mut key_code = if raw.e0 {
            scancode::translate_extended(raw.code)?
        } else {
            scancode::translate_single(raw.code)?
        };

        let mut effects = TranslateEffects::NONE;
        let mut lock_mask = self.lock_mask;
        let mut modifiers = self.modifiers;

        if let Some(lock_bit) = scancode::lock_bit_for(key_code) {
            if !raw.brk {
                lock_mask.toggle(lock_bit);
                effects.lock_toggle = Some(lock_bit);
            } else if self.no_breaks {
                return None;
            }
        }

        if let Some(modifier) = scancode::modifier_for(key_code) {
            let already_held = modifiers.get(modifier);
            if !raw.brk {
                if self.no_repeats && already_held {
                    return None;
                }
                modifiers.set(modifier, true);
                effects.modifier = Some((modifier, true));
            } else {
                modifiers.set(modifier, false);
                effects.modifier = Some((modifier, false));
            }
        }

        if scancode::is_numpad_digit_or_dot(key_code) {
            let num_lock_on = lock_mask.is_set(LockBit::Num);
            if !num_lock_on || modifiers.shift {
                if let Some(remapped) = scancode::numpad_remap(key_code) {
                    key_code = remapped;
                }
            }
        }

        if raw.brk && self.no_breaks {
            return None;
        }

        let function = scancode::is_function_class(key_code) || raw.e0;

        Some((
            KeyEvent {
                brk: raw.brk,
                shift: modifiers.shift,
                ctrl: modifiers.ctrl,
                caps: lock_mask.is_set(LockBit::Caps),
                alt: modifiers.alt,
                alt_gr: modifiers.alt_gr,
                gui: modifiers.gui,
                function,
                key_code,
            }
            .to_u16(),
            effects,
        ))
    }
}
