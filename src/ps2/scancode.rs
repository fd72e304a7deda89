//! Scan Code Set 2 → translated `key_code` lookup (§4.C "Translation", §6).
//!
//! spec.md fixes the byte *ranges* a translated key code lives in but not a
//! literal table (it only pins down two worked examples: `0xE0,0x75` must
//! land on `up_arrow` with `function` set, and `0x1C` must land on `A`).
//! Table below is the standard Scan Code Set 2 main array; printable keys
//! reuse their ASCII value (so `translate_single` for a letter key just
//! returns that letter), matching §6's "digits 0x30..0x39, uppercase
//! 0x41..0x5A" allocation exactly.

use shared_types::LockBit;

pub const KC_ESCAPE: u8 = 0x01;
pub const KC_BACKSPACE: u8 = 0x08;
pub const KC_TAB: u8 = 0x09;
pub const KC_ENTER: u8 = 0x0D;
pub const KC_UP: u8 = 0x11;
pub const KC_DOWN: u8 = 0x12;
pub const KC_LEFT: u8 = 0x13;
pub const KC_RIGHT: u8 = 0x14;
pub const KC_INSERT: u8 = 0x15;
pub const KC_DELETE: u8 = 0x16;
pub const KC_HOME: u8 = 0x17;
pub const KC_END: u8 = 0x18;
pub const KC_PAGE_UP: u8 = 0x19;
pub const KC_PAGE_DOWN: u8 = 0x1A;
pub const KC_PAUSE: u8 = 0x1B;

pub const KC_F1: u8 = 0x61;
pub const KC_F2: u8 = 0x62;
pub const KC_F3: u8 = 0x63;
pub const KC_F4: u8 = 0x64;
pub const KC_F5: u8 = 0x65;
pub const KC_F6: u8 = 0x66;
pub const KC_F7: u8 = 0x67;
pub const KC_F8: u8 = 0x68;
pub const KC_F9: u8 = 0x69;
pub const KC_F10: u8 = 0x6A;
pub const KC_F11: u8 = 0x6B;
pub const KC_F12: u8 = 0x6C;

pub const KC_LSHIFT: u8 = 0x70;
pub const KC_RSHIFT: u8 = 0x71;
pub const KC_LCTRL: u8 = 0x72;
pub const KC_RCTRL: u8 = 0x73;
pub const KC_LALT: u8 = 0x74;
pub const KC_RALT: u8 = 0x75;
pub const KC_LGUI: u8 = 0x76;
pub const KC_RGUI: u8 = 0x77;
pub const KC_CAPS_LOCK: u8 = 0x78;
pub const KC_NUM_LOCK: u8 = 0x79;
pub const KC_SCROLL_LOCK: u8 = 0x7A;

pub const KC_NUMPAD0: u8 = 0x80;
pub const KC_NUMPAD1: u8 = 0x81;
pub const KC_NUMPAD2: u8 = 0x82;
pub const KC_NUMPAD3: u8 = 0x83;
pub const KC_NUMPAD4: u8 = 0x84;
pub const KC_NUMPAD5: u8 = 0x85;
pub const KC_NUMPAD6: u8 = 0x86;
pub const KC_NUMPAD7: u8 = 0x87;
pub const KC_NUMPAD8: u8 = 0x88;
pub const KC_NUMPAD9: u8 = 0x89;
pub const KC_NUMPAD_DOT: u8 = 0x8A;
/// The extra key present on ISO/European keyboard layouts between LShift
/// and Z, reserved per §6 rather than assigned a translation here.
pub const KC_EXTRA_EUROPEAN: u8 = 0x8B;
pub const KC_NUMPAD_PLUS: u8 = 0x8C;
pub const KC_NUMPAD_MINUS: u8 = 0x8D;
pub const KC_NUMPAD_STAR: u8 = 0x8E;
pub const KC_NUMPAD_SLASH: u8 = 0x8F;
pub const KC_NUMPAD_ENTER: u8 = 0x90;

/// A raw byte the 0xE1 (Pause) sequence absorber hands to translation once
/// all 7 trailing bytes of the sequence have been consumed. Not a real
/// scan code the device ever sends, so it can't collide with a table entry.
pub const PAUSE_SCANCODE_SENTINEL: u8 = 0xC0;

/// The single-byte (no `0xE0` prefix) portion of the Scan Code Set 2 main
/// array.
pub fn translate_single(code: u8) -> Option<u8> {
    Some(match code {
        0x1C => b'A',
        0x32 => b'B',
        0x21 => b'C',
        0x23 => b'D',
        0x24 => b'E',
        0x2B => b'F',
        0x34 => b'G',
        0x33 => b'H',
        0x43 => b'I',
        0x3B => b'J',
        0x42 => b'K',
        0x4B => b'L',
        0x3A => b'M',
        0x31 => b'N',
        0x44 => b'O',
        0x4D => b'P',
        0x15 => b'Q',
        0x2D => b'R',
        0x1B => b'S',
        0x2C => b'T',
        0x3C => b'U',
        0x2A => b'V',
        0x1D => b'W',
        0x22 => b'X',
        0x35 => b'Y',
        0x1A => b'Z',

        0x45 => b'0',
        0x16 => b'1',
        0x1E => b'2',
        0x26 => b'3',
        0x25 => b'4',
        0x2E => b'5',
        0x36 => b'6',
        0x3D => b'7',
        0x3E => b'8',
        0x46 => b'9',

        0x29 => b' ',
        0x76 => KC_ESCAPE,
        0x66 => KC_BACKSPACE,
        0x0D => KC_TAB,
        0x5A => KC_ENTER,

        0x05 => KC_F1,
        0x06 => KC_F2,
        0x04 => KC_F3,
        0x0C => KC_F4,
        0x03 => KC_F5,
        0x0B => KC_F6,
        0x83 => KC_F7,
        0x0A => KC_F8,
        0x01 => KC_F9,
        0x09 => KC_F10,
        0x78 => KC_F11,
        0x07 => KC_F12,

        0x12 => KC_LSHIFT,
        0x59 => KC_RSHIFT,
        0x14 => KC_LCTRL,
        0x11 => KC_LALT,
        0x58 => KC_CAPS_LOCK,
        0x77 => KC_NUM_LOCK,
        0x7E => KC_SCROLL_LOCK,

        0x70 => KC_NUMPAD0,
        0x69 => KC_NUMPAD1,
        0x72 => KC_NUMPAD2,
        0x7A => KC_NUMPAD3,
        0x6B => KC_NUMPAD4,
        0x73 => KC_NUMPAD5,
        0x74 => KC_NUMPAD6,
        0x6C => KC_NUMPAD7,
        0x75 => KC_NUMPAD8,
        0x7D => KC_NUMPAD9,
        0x71 => KC_NUMPAD_DOT,
        0x79 => KC_NUMPAD_PLUS,
        0x7B => KC_NUMPAD_MINUS,
        0x7C => KC_NUMPAD_STAR,

        _ => return None,
    })
}

/// The `0xE0`-prefixed portion of the table.
pub fn translate_extended(code: u8) -> Option<u8> {
    Some(match code {
        0x75 => KC_UP,
        0x72 => KC_DOWN,
        0x6B => KC_LEFT,
        0x74 => KC_RIGHT,
        0x70 => KC_INSERT,
        0x71 => KC_DELETE,
        0x6C => KC_HOME,
        0x69 => KC_END,
        0x7D => KC_PAGE_UP,
        0x7A => KC_PAGE_DOWN,
        0x14 => KC_RCTRL,
        0x11 => KC_RALT,
        0x1F => KC_LGUI,
        0x27 => KC_RGUI,
        0x5A => KC_NUMPAD_ENTER,
        0x4A => KC_NUMPAD_SLASH,
        _ => return None,
    })
}

pub fn lock_bit_for(key_code: u8) -> Option<LockBit> {
    match key_code {
        KC_CAPS_LOCK => Some(LockBit::Caps),
        KC_NUM_LOCK => Some(LockBit::Num),
        KC_SCROLL_LOCK => Some(LockBit::Scroll),
        _ => None,
    }
}

/// Which of the five tracked modifiers a key code drives, irrespective of
/// its left/right hand.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ModifierKind {
    Shift,
    Ctrl,
    Alt,
    AltGr,
    Gui,
}

pub fn modifier_for(key_code: u8) -> Option<ModifierKind> {
    match key_code {
        KC_LSHIFT | KC_RSHIFT => Some(ModifierKind::Shift),
        KC_LCTRL | KC_RCTRL => Some(ModifierKind::Ctrl),
        KC_LALT => Some(ModifierKind::Alt),
        KC_RALT => Some(ModifierKind::AltGr),
        KC_LGUI | KC_RGUI => Some(ModifierKind::Gui),
        _ => None,
    }
}

pub fn is_numpad_digit_or_dot(key_code: u8) -> bool {
    (KC_NUMPAD0..=KC_NUMPAD_DOT).contains(&key_code)
}

/// The fixed navigation remap used "when Num Lock is off (or Shift is
/// held)" (§4.C). Numpad 5 has no navigation equivalent and is left as-is.
pub fn numpad_remap(key_code: u8) -> Option<u8> {
    Some(match key_code {
        KC_NUMPAD0 => KC_INSERT,
        KC_NUMPAD1 => KC_END,
        KC_NUMPAD2 => KC_DOWN,
        KC_NUMPAD3 => KC_PAGE_DOWN,
        KC_NUMPAD4 => KC_LEFT,
        KC_NUMPAD6 => KC_RIGHT,
        KC_NUMPAD7 => KC_HOME,
        KC_NUMPAD8 => KC_UP,
        KC_NUMPAD9 => KC_PAGE_UP,
        KC_NUMPAD_DOT => KC_DELETE,
        _ => return None,
    })
}

/// "Function keys & space/tab/enter/etc.: set the `function` flag" (§4.C).
pub fn is_function_class(key_code: u8) -> bool {
    (KC_ESCAPE..=KC_PAUSE).contains(&key_code)
        || (KC_F1..=KC_NUMPAD_ENTER).contains(&key_code)
        || key_code == b' '
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_make_translates_to_ascii_a() {
        assert_eq!(translate_single(0x1C), Some(b'A'));
    }

    #[test]
    fn extended_0x75_is_up_arrow() {
        assert_eq!(translate_extended(0x75), Some(KC_UP));
        assert!(is_function_class(KC_UP));
    }

    #[test]
    fn unknown_codes_translate_to_none() {
        assert_eq!(translate_single(0xFF), None);
        assert_eq!(translate_extended(0x00), None);
    }

    #[test]
    fn numpad_remap_covers_all_but_five() {
        assert_eq!(numpad_remap(KC_NUMPAD5), None);
        assert_eq!(numpad_remap(KC_NUMPAD8), Some(KC_UP));
        assert_eq!(numpad_remap(KC_NUMPAD_DOT), Some(KC_DELETE));
    }

    #[test]
    fn space_is_function_class_despite_being_printable() {
        assert!(is_function_class(b' '));
        assert!(!is_function_class(b'A'));
    }
}
