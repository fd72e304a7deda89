#![no_std]
//! Wire types shared between the firmware core and any off-device tooling
//! that wants to observe it (a debugger, a host-side demo, a log decoder).

use packed_struct::prelude::*;

/// One entry of the modifier/lock flag mask that rides in the upper byte of
/// a [`KeyEvent`]. Matches the bit numbering fixed in the external-interface
/// table: 15 break, 14 shift, 13 ctrl, 12 caps, 11 alt, 10 alt_gr, 9 gui,
/// 8 function.
#[derive(Debug, Copy, Clone, PartialEq, Eq, defmt::Format)]
#[repr(u8)]
pub enum LockBit {
    Scroll = 0,
    Num = 1,
    Caps = 2,
    Extra = 3,
}

/// The 4-bit keyboard-LED mirror described in §3 ("Lock state"). Backed by
/// a `u8` so it can be handed straight to the `0xED` command byte.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, defmt::Format)]
pub struct LockMask(u8);

impl LockMask {
    pub const fn empty() -> Self {
        LockMask(0)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn from_bits(bits: u8) -> Self {
        LockMask(bits & 0x0f)
    }

    pub fn is_set(self, bit: LockBit) -> bool {
        self.0 & (1 << bit as u8) != 0
    }

    pub fn set(&mut self, bit: LockBit, value: bool) {
        if value {
            self.0 |= 1 << bit as u8;
        } else {
            self.0 &= !(1 << bit as u8);
        }
    }

    pub fn toggle(&mut self, bit: LockBit) {
        self.0 ^= 1 << bit as u8;
    }
}

/// The outcome of one sample of the debounced button (§4.E): whether the
/// debounced state changed this sample, and in which direction.
#[derive(Debug, Copy, Clone, PartialEq, Eq, defmt::Format)]
pub enum ButtonEdge {
    Pressed,
    Released,
    None,
}

/// A translated PS/2 key event (§3 "Key event"): an 8-bit key code plus the
/// modifier/lock flag byte above it, packed exactly as the external
/// interface table specifies so it can be handed to a HID report builder or
/// logged as a raw `u16` without re-deriving the bit layout at each call
/// site.
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq, Eq)]
#[packed_struct(bit_numbering = "msb0", endian = "msb")]
pub struct KeyEvent {
    #[packed_field(bits = "0")]
    pub brk: bool,
    #[packed_field(bits = "1")]
    pub shift: bool,
    #[packed_field(bits = "2")]
    pub ctrl: bool,
    #[packed_field(bits = "3")]
    pub caps: bool,
    #[packed_field(bits = "4")]
    pub alt: bool,
    #[packed_field(bits = "5")]
    pub alt_gr: bool,
    #[packed_field(bits = "6")]
    pub gui: bool,
    #[packed_field(bits = "7")]
    pub function: bool,
    #[packed_field(bits = "8..=15")]
    pub key_code: u8,
}

impl KeyEvent {
    pub fn to_u16(self) -> u16 {
        let bytes = self.pack().unwrap_or([0, 0]);
        u16::from_be_bytes(bytes)
    }

    pub fn from_u16(value: u16) -> Self {
        // A 2-byte packed_struct can only fail to unpack if the byte slice
        // is the wrong length, which can't happen from a `u16`.
        Self::unpack(&value.to_be_bytes()).unwrap_or(KeyEvent {
            brk: false,
            shift: false,
            ctrl: false,
            caps: false,
            alt: false,
            alt_gr: false,
            gui: false,
            function: false,
            key_code: 0,
        })
    }
}

impl defmt::Format for KeyEvent {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "KeyEvent {{ code: {=u8:#04x}, brk: {=bool}, shift: {=bool}, ctrl: {=bool}, caps: {=bool}, alt: {=bool}, alt_gr: {=bool}, gui: {=bool}, fn: {=bool} }}",
            self.key_code,
            self.brk,
            self.shift,
            self.ctrl,
            self.caps,
            self.alt,
            self.alt_gr,
            self.gui,
            self.function
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_mask_round_trips_bits() {
        let mut m = LockMask::empty();
        m.set(LockBit::Caps, true);
        assert!(m.is_set(LockBit::Caps));
        assert!(!m.is_set(LockBit::Num));
        assert_eq!(m.bits(), 0b0100);
        m.toggle(LockBit::Caps);
        assert!(!m.is_set(LockBit::Caps));
    }

    #[test]
    fn key_event_packs_break_into_bit15() {
        let ev = KeyEvent {
            brk: true,
            shift: false,
            ctrl: false,
            caps: false,
            alt: false,
            alt_gr: false,
            gui: false,
            function: false,
            key_code: 0x41,
        };
        assert_eq!(ev.to_u16(), 0x8041);
    }

    #[test]
    fn key_event_round_trips_through_u16() {
        let ev = KeyEvent {
            brk: false,
            shift: true,
            ctrl: false,
            caps: false,
            alt: false,
            alt_gr: false,
            gui: false,
            function: true,
            key_code: 0x1c,
        };
        let back = KeyEvent::from_u16(ev.to_u16());
        assert_eq!(ev, back);
    }
}
