//! The rotor/reflector/plugboard permutation network (spec §3, §4.A).
//!
//! All of the string-indexed lookups the historical reference
//! implementations use are precomputed once, at rotor selection, into plain
//! indexed arrays of `u8` (§9's redesign note: "the permutation pipeline
//! becomes plain indexed reads into 26-element arrays... eliminating the
//! string-search").

use crate::plugboard::Plugboard;

pub const ALPHA_LEN: usize = 26;

/// `index(c) == c as u8 - b'A'`, used throughout as the canonical
/// char<->index conversion for the fixed alphabet Σ = {A..Z}.
pub fn index(c: u8) -> u8 {
    c - b'A'
}

pub fn letter(i: u8) -> u8 {
    b'A' + (i % ALPHA_LEN as u8)
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, defmt::Format)]
pub enum CipherError {
    InvalidRotorIndex,
    InvalidOffset,
    InvalidReflectorIndex,
    InvalidPlugboard,
}

/// Rotor wirings and notch/turnover sets, §6. Wiring is a bijection Σ→Σ
/// expressed as the forward permutation at offset 0: `wiring[i]` is the
/// letter that an input at index `i` maps to.
struct RotorSpec {
    wiring: &'static [u8; ALPHA_LEN],
    notches: &'static [u8],
    turnovers: &'static [u8],
}

macro_rules! rotor_spec {
    ($wiring:expr, $notches:expr, $turnovers:expr) => {
        RotorSpec {
            wiring: $wiring,
            notches: $notches,
            turnovers: $turnovers,
        }
    };
}

#[rustfmt::skip]
static ROTOR_SPECS: [RotorSpec; 8] = [
    rotor_spec!(b"EKMFLGDQVZNTOWYHXUSPAIBRCJ", b"Q",  b"R"),
    rotor_spec!(b"AJDKSIRUXBLHWTMCQGZNPYFVOE", b"E",  b"F"),
    rotor_spec!(b"BDFHJLCPRTXVZNYEIWGAKMUSQO", b"V",  b"W"),
    rotor_spec!(b"ESOVPZJAYQUIRHXLNFTGKDCMWB", b"J",  b"K"),
    rotor_spec!(b"VZBRGITYUPSDNHLXAWMJQOFECK", b"Z",  b"A"),
    rotor_spec!(b"JPGVOUMFYQBENHZRDKASXLICTW", b"ZM", b"AN"),
    rotor_spec!(b"NZJHGRCXMYSWBOUFAIVLPEKQDT", b"ZM", b"AN"),
    rotor_spec!(b"FKQHTLXOCBJSPDZRAMEWNIUYGV", b"ZM", b"AN"),
];

#[rustfmt::skip]
static REFLECTOR_WIRINGS: [&[u8; ALPHA_LEN]; 3] = [
    b"EJMZALYXVBWFCRQUONTSPIKHGD",
    b"YRUHQSLDPXNGOKMIEBFZCWVJAT",
    b"FVPJIAOYEDRZXWGCTKUQSBNMHL",
];

/// A single rotor's precomputed state: the forward table, its inverse (used
/// by [`Rotor::reverse`]), a bitmask of notch positions, a bitmask of
/// turnover positions, the current offset, and the transient `step_next`
/// flag described in §3.
#[derive(Debug, Copy, Clone, PartialEq, Eq, defmt::Format)]
pub struct Rotor {
    wiring: [u8; ALPHA_LEN],
    inv_wiring: [u8; ALPHA_LEN],
    notch_mask: u32,
    turnover_mask: u32,
    offset: u8,
    step_next: bool,
}

fn mask_of(letters: &[u8]) -> u32 {
    let mut mask = 0u32;
    for &c in letters {
        mask |= 1 << index(c);
    }
    mask
}

impl Rotor {
    fn from_index(choice: u8) -> Result<Rotor, CipherError> {
        if choice < 1 || choice > 8 {
            return Err(CipherError::InvalidRotorIndex);
        }
        let spec = &ROTOR_SPECS[(choice - 1) as usize];
        let mut wiring = [0u8; ALPHA_LEN];
        let mut inv_wiring = [0u8; ALPHA_LEN];
        for i in 0..ALPHA_LEN {
            let out = index(spec.wiring[i]);
            wiring[i] = out;
            inv_wiring[out as usize] = i as u8;
        }
        Ok(Rotor {
            wiring,
            inv_wiring,
            notch_mask: mask_of(spec.notches),
            turnover_mask: mask_of(spec.turnovers),
            offset: 0,
            step_next: false,
        })
    }

    fn set_offset(&mut self, offset: u8) -> Result<(), CipherError> {
        if offset as usize >= ALPHA_LEN {
            return Err(CipherError::InvalidOffset);
        }
        self.offset = offset;
        Ok(())
    }

    pub fn offset(&self) -> u8 {
        self.offset
    }

    fn at_notch(&self) -> bool {
        self.notch_mask & (1 << self.offset) != 0
    }

    fn at_turnover(&self) -> bool {
        self.turnover_mask & (1 << self.offset) != 0
    }

    /// Advance by one position (mod 26) and report whether the new offset
    /// landed on a turnover, per §4.A step 1/3 ("mark `step_next = true`").
    fn advance(&mut self) {
        self.offset = (self.offset + 1) % ALPHA_LEN as u8;
        if self.at_turnover() {
            self.step_next = true;
        }
    }

    /// `forward(R, x) = index(wiring(R)[(x + offset) mod 26]) - offset mod 26`
    fn forward(&self, x: u8) -> u8 {
        let shifted = (x + self.offset) % ALPHA_LEN as u8;
        let out = self.wiring[shifted as usize];
        (out + ALPHA_LEN as u8 - self.offset) % ALPHA_LEN as u8
    }

    /// `reverse(R, x) = index(alpha, x') where wiring(R)[x'] == alpha[(x+offset) mod 26]`,
    /// i.e. the inverse permutation of [`forward`].
    fn reverse(&self, x: u8) -> u8 {
        let shifted = (x + self.offset) % ALPHA_LEN as u8;
        let inv = self.inv_wiring[shifted as usize];
        (inv + ALPHA_LEN as u8 - self.offset) % ALPHA_LEN as u8
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, defmt::Format)]
pub struct Reflector {
    wiring: [u8; ALPHA_LEN],
}

impl Reflector {
    fn from_index(choice: u8) -> Result<Reflector, CipherError> {
        let wiring_bytes = REFLECTOR_WIRINGS
            .get(choice as usize)
            .ok_or(CipherError::InvalidReflectorIndex)?;
        let mut wiring = [0u8; ALPHA_LEN];
        for i in 0..ALPHA_LEN {
            wiring[i] = index(wiring_bytes[i]);
        }
        Ok(Reflector { wiring })
    }

    fn reflect(&self, x: u8) -> u8 {
        self.wiring[x as usize]
    }
}

/// The cipher engine: three rotors in fast→slow order, a reflector and a
/// plugboard (spec §3 "Enigma state"). `encrypt` both steps the rotors and
/// permutes, per §4.A.
#[derive(Debug, Copy, Clone, PartialEq, Eq, defmt::Format)]
pub struct CipherEngine {
    rotors: [Rotor; 3],
    reflector: Reflector,
    plugboard: Plugboard,
}

impl CipherEngine {
    /// `init(rotor_choice[3], reflector_choice, offsets[3])`, §4.A. Rotors
    /// are given fast→slow, matching every other array in this module.
    /// There is no hidden default reflector (§9 Design Decision 2): the
    /// caller always names one of the three reflectors in §6's table.
    pub fn init(
        rotor_choice: [u8; 3],
        reflector_choice: u8,
        offsets: [u8; 3],
    ) -> Result<CipherEngine, CipherError> {
        let mut rotors = [
            Rotor::from_index(rotor_choice[0])?,
            Rotor::from_index(rotor_choice[1])?,
            Rotor::from_index(rotor_choice[2])?,
        ];
        for (rotor, &offset) in rotors.iter_mut().zip(offsets.iter()) {
            rotor.set_offset(offset)?;
        }
        let reflector = Reflector::from_index(reflector_choice)?;
        Ok(CipherEngine {
            rotors,
            reflector,
            plugboard: Plugboard::identity(),
        })
    }

    /// `set_plugboard(P)`, §4.A: install a 26-letter involution.
    pub fn set_plugboard(&mut self, plugboard: Plugboard) -> Result<(), CipherError> {
        if !plugboard.is_involution() {
            return Err(CipherError::InvalidPlugboard);
        }
        self.plugboard = plugboard;
        Ok(())
    }

    pub fn rotor_offset(&self, i: usize) -> u8 {
        self.rotors[i].offset()
    }

    /// Re-seats all three rotor offsets without re-selecting wirings,
    /// used by the application FSM's `ENCRYPT` entry action (§4.F) to
    /// restore `rotor_positions` after a `CONFIG_ROTOR` session.
    pub fn set_offsets(&mut self, offsets: [u8; 3]) -> Result<(), CipherError> {
        for (rotor, &offset) in self.rotors.iter_mut().zip(offsets.iter()) {
            rotor.set_offset(offset)?;
        }
        Ok(())
    }

    /// The stepping algorithm, executed before permutation, exactly as
    /// numbered in §4.A:
    ///
    /// 1. Advance R1; if its new offset is a turnover, arm `R1.step_next`.
    /// 2. If R2's *current* (pre-step) offset is at its notch, double-step
    ///    R2 (the middle-rotor anomaly) and propagate its own turnover flag.
    /// 3. For i in 1..2: if `R_i.step_next`, clear it and advance
    ///    `R_{i+1}`, arming that rotor's own `step_next` if it lands on a
    ///    turnover.
    ///
    /// Step 2 reads R2's offset as it stood *before* step 1 touched R1 —
    /// the textbook double-step anomaly (§9 Design Decision 1): R2 can
    /// self-step and also be carried by R1 on the same keystroke.
    fn step(&mut self) {
        let r2_was_at_notch = self.rotors[1].at_notch();

        self.rotors[0].advance();

        if r2_was_at_notch {
            self.rotors[1].advance();
        }

        for i in 0..2 {
            if self.rotors[i].step_next {
                self.rotors[i].step_next = false;
                self.rotors[i + 1].advance();
            }
        }
    }

    /// The five-step permutation pipeline of §4.A, run after stepping.
    /// `c` must already be an uppercase letter in Σ; non-letter handling is
    /// the caller's responsibility (§4.A, §7 "Domain errors").
    pub fn encrypt(&mut self, c: u8) -> u8 {
        self.step();

        let mut x = index(self.plugboard.map(c));
        for rotor in self.rotors.iter() {
            x = rotor.forward(x);
        }
        x = self.reflector.reflect(x);
        for rotor in self.rotors.iter().rev() {
            x = rotor.reverse(x);
        }
        self.plugboard.map(letter(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> CipherEngine {
        // rotors III, II, I fast->slow; reflector B; offsets 0,0,0
        CipherEngine::init([3, 2, 1], 1, [0, 0, 0]).unwrap()
    }

    #[test]
    fn scenario_1_single_letter() {
        let mut e = engine();
        assert_eq!(e.encrypt(b'A'), b'B');
    }

    #[test]
    fn scenario_2_repeated_letter() {
        let mut e = engine();
        let out: ByteBuf = "AAAAA".bytes().map(|c| e.encrypt(c)).collect();
        assert_eq!(out.as_slice(), b"BDZGO");
    }

    #[test]
    fn scenario_3_hello_world() {
        let mut e = engine();
        let out: ByteBuf = "HELLOWORLD".bytes().map(|c| e.encrypt(c)).collect();
        assert_eq!(out.as_slice(), b"ILBDAAMTAZ");
    }

    #[test]
    fn scenario_4_round_trip() {
        let mut e = engine();
        let out: ByteBuf = "ILBDAAMTAZ".bytes().map(|c| e.encrypt(c)).collect();
        assert_eq!(out.as_slice(), b"HELLOWORLD");
    }

    #[test]
    fn reflector_has_no_fixed_point_through_encryption() {
        let mut e = engine();
        for c in b'A'..=b'Z' {
            let out = e.encrypt(c);
            assert_ne!(out, c);
        }
    }

    #[test]
    fn single_step_is_an_involution_on_a_frozen_state() {
        let mut e = engine();
        let snapshot = e;
        let out = e.encrypt(b'G');
        let mut e2 = snapshot;
        assert_eq!(e2.encrypt(out), b'G');
    }

    #[test]
    fn plugboard_applied_at_both_ends() {
        let mut e = engine();
        let mut pb = Plugboard::identity();
        pb.pair(b'A', b'B').unwrap();
        e.set_plugboard(pb).unwrap();
        // P(A) = B, engine maps B forward/back through the rotors to
        // whatever scenario 1 produced for 'A' (still B, by the
        // involution it replaces), then P is applied again on the way out.
        let out = e.encrypt(b'A');
        assert_eq!(out, b'A');
    }

    #[test]
    fn r1_steps_every_keystroke() {
        let mut e = engine();
        let before = e.rotor_offset(0);
        e.encrypt(b'A');
        assert_eq!(e.rotor_offset(0), (before + 1) % 26);
    }

    #[test]
    fn r2_steps_within_26_keystrokes() {
        let mut e = engine();
        let before = e.rotor_offset(1);
        let mut moved = false;
        for _ in 0..26 {
            e.encrypt(b'A');
            if e.rotor_offset(1) != before {
                moved = true;
                break;
            }
        }
        assert!(moved);
    }

    #[test]
    fn r3_steps_within_26_times_25_keystrokes() {
        // §8 property 3: R3 is only carried by R2's turnover, which itself
        // only arrives via R1's turnover or the double-step anomaly, so R3's
        // slowest-possible advance is bounded by 26*25 keystrokes.
        let mut e = engine();
        let before = e.rotor_offset(2);
        let mut moved = false;
        for _ in 0..(26 * 25) {
            e.encrypt(b'A');
            if e.rotor_offset(2) != before {
                moved = true;
                break;
            }
        }
        assert!(moved);
    }

    #[test]
    fn invalid_rotor_index_is_rejected() {
        assert_eq!(
            CipherEngine::init([9, 2, 1], 1, [0, 0, 0]).unwrap_err(),
            CipherError::InvalidRotorIndex
        );
    }

    #[test]
    fn set_offsets_reseats_without_reselecting_wirings() {
        let mut e = engine();
        e.encrypt(b'A');
        assert_ne!(e.rotor_offset(0), 0);
        e.set_offsets([0, 0, 0]).unwrap();
        assert_eq!(e.rotor_offset(0), 0);
        assert_eq!(e.encrypt(b'A'), b'B'); // back to scenario 1's behavior
    }

    #[test]
    fn invalid_offset_is_rejected() {
        assert_eq!(
            CipherEngine::init([3, 2, 1], 1, [0, 26, 0]).unwrap_err(),
            CipherError::InvalidOffset
        );
    }

    #[test]
    fn invalid_reflector_index_is_rejected() {
        assert_eq!(
            CipherEngine::init([3, 2, 1], 3, [0, 0, 0]).unwrap_err(),
            CipherError::InvalidReflectorIndex
        );
    }

    // A tiny fixed-capacity byte collector so these tests don't need `std`
    // or an extra dev-dependency just to gather encrypt() output.
    struct ByteBuf {
        buf: [u8; 16],
        len: usize,
    }

    impl ByteBuf {
        fn as_slice(&self) -> &[u8] {
            &self.buf[..self.len]
        }
    }

    impl FromIterator<u8> for ByteBuf {
        fn from_iter<I: IntoIterator<Item = u8>>(iter: I) -> Self {
            let mut buf = [0u8; 16];
            let mut len = 0;
            for b in iter {
                buf[len] = b;
                len += 1;
            }
            ByteBuf { buf, len }
        }
    }
}
