//! The plugboard permutation (spec §3) and its scanner (§4.B).

use crate::cipher::{index, letter, ALPHA_LEN};
use crate::hal::{InPin, OutPin};

#[derive(Debug, Copy, Clone, PartialEq, Eq, defmt::Format)]
pub enum PlugboardError {
    NotAnInvolution,
}

/// A self-inverse permutation Σ→Σ (spec §3): `map[c]` is either `c` itself
/// (unplugged) or some `d != c` with `map[d] == c` (paired).
#[derive(Debug, Copy, Clone, PartialEq, Eq, defmt::Format)]
pub struct Plugboard {
    map: [u8; ALPHA_LEN],
}

impl Plugboard {
    pub fn identity() -> Plugboard {
        let mut map = [0u8; ALPHA_LEN];
        for (i, slot) in map.iter_mut().enumerate() {
            *slot = i as u8;
        }
        Plugboard { map }
    }

    /// Builds a plugboard directly from a 26-entry index table, as produced
    /// by [`PlugboardScanner::scan`] or decoded off the wire. Rejects
    /// anything that isn't an involution (§4.A `InvalidPlugboard`).
    pub fn from_map(map: [u8; ALPHA_LEN]) -> Result<Plugboard, PlugboardError> {
        let pb = Plugboard { map };
        if pb.is_involution() {
            Ok(pb)
        } else {
            Err(PlugboardError::NotAnInvolution)
        }
    }

    pub fn is_involution(&self) -> bool {
        (0..ALPHA_LEN).all(|i| (self.map[self.map[i] as usize] as usize) == i)
    }

    /// `P(c)`, applied by the cipher engine before and after the rotor
    /// core (§3, §9 Design Decision 3).
    pub fn map(&self, c: u8) -> u8 {
        letter(self.map[index(c) as usize])
    }

    /// Pair two letters, unplugging whatever either was previously paired
    /// with. Used by tests and by the scanner while it builds up a result.
    pub fn pair(&mut self, a: u8, b: u8) -> Result<(), PlugboardError> {
        let (ia, ib) = (index(a) as usize, index(b) as usize);
        let prev_a = self.map[ia] as usize;
        let prev_b = self.map[ib] as usize;
        self.map[prev_a] = prev_a as u8;
        self.map[prev_b] = prev_b as u8;
        self.map[ia] = ib as u8;
        self.map[ib] = ia as u8;
        Ok(())
    }
}

/// The 26 physical pins the scanner sweeps, one per letter (§4.B). Each pin
/// must be switchable between a pulled-down input and a push-pull output,
/// matching the sweep's "drive pin i high... sample every other pin" cycle.
pub trait PlugboardPins {
    type Pin: InPin + OutPin;
    fn pin(&mut self, letter_index: usize) -> &mut Self::Pin;
}

/// Derives the plugboard involution from a conductivity sweep (§4.B).
pub struct PlugboardScanner;

impl PlugboardScanner {
    /// `init()`: nothing to hold state for beyond the pins themselves,
    /// which the caller owns and passes to [`scan`](Self::scan). Kept as a
    /// unit type so call sites read the same as the rest of this crate's
    /// `Foo::init()` constructors.
    pub fn init() -> PlugboardScanner {
        PlugboardScanner
    }

    /// One full sweep (§4.B): cooperative, one call per invocation. For
    /// each letter `i`, drive pin `i` high and sample every other pin;
    /// the first peer found high pairs with `i` (ties broken by the
    /// smallest index, §4.B "Guarantees and policies"). Pins are restored
    /// to pulled-down inputs before moving on.
    pub fn scan<P: PlugboardPins>(&mut self, pins: &mut P) -> Plugboard {
        let mut map = [0u8; ALPHA_LEN];
        for (i, slot) in map.iter_mut().enumerate() {
            *slot = i as u8;
        }

        for i in 0..ALPHA_LEN {
            pins.pin(i).set_high();
            let mut partner = None;
            for j in 0..ALPHA_LEN {
                if j == i {
                    continue;
                }
                if pins.pin(j).is_high() {
                    partner = Some(j);
                    break;
                }
            }
            if let Some(j) = partner {
                map[i] = j as u8;
                map[j] = i as u8;
            }
            pins.pin(i).set_low();
        }

        // `map` is symmetric by construction, so this can't fail; built
        // this way rather than via `Plugboard::from_map` to avoid a
        // spurious error path for a result that is an involution by
        // construction.
        Plugboard { map }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// A pin on a simulated wiring harness: reading it returns whatever
    /// level is currently on its shared line, and driving it also drives
    /// whichever pin (if any) is physically shorted to it — the same
    /// behavior a soldered plugboard wire has on real silicon.
    #[derive(Clone)]
    struct WiredPin {
        index: usize,
        lines: Rc<RefCell<[bool; ALPHA_LEN]>>,
        links: Rc<[Option<usize>; ALPHA_LEN]>,
    }

    impl InPin for WiredPin {
        fn is_high(&self) -> bool {
            self.lines.borrow()[self.index]
        }
    }

    impl OutPin for WiredPin {
        fn set_high(&mut self) {
            let mut lines = self.lines.borrow_mut();
            lines[self.index] = true;
            if let Some(j) = self.links[self.index] {
                lines[j] = true;
            }
        }
        fn set_low(&mut self) {
            let mut lines = self.lines.borrow_mut();
            lines[self.index] = false;
            if let Some(j) = self.links[self.index] {
                lines[j] = false;
            }
        }
    }

    struct MockPlugboardPins {
        pins: [WiredPin; ALPHA_LEN],
    }

    impl MockPlugboardPins {
        fn new(pairs: &[(usize, usize)]) -> Self {
            let mut links = [None; ALPHA_LEN];
            for &(a, b) in pairs {
                links[a] = Some(b);
                links[b] = Some(a);
            }
            let lines = Rc::new(RefCell::new([false; ALPHA_LEN]));
            let links = Rc::new(links);
            let pins: Vec<WiredPin> = (0..ALPHA_LEN)
                .map(|index| WiredPin {
                    index,
                    lines: lines.clone(),
                    links: links.clone(),
                })
                .collect();
            MockPlugboardPins {
                pins: pins.try_into().unwrap_or_else(|_| unreachable!()),
            }
        }
    }

    impl PlugboardPins for MockPlugboardPins {
        type Pin = WiredPin;
        fn pin(&mut self, letter_index: usize) -> &mut WiredPin {
            &mut self.pins[letter_index]
        }
    }

    fn scan_wired(pairs: &[(usize, usize)]) -> Plugboard {
        let mut scanner = PlugboardScanner::init();
        let mut pins = MockPlugboardPins::new(pairs);
        scanner.scan(&mut pins)
    }

    #[test]
    fn unconnected_letters_map_to_themselves() {
        let pb = scan_wired(&[]);
        for c in b'A'..=b'Z' {
            assert_eq!(pb.map(c), c);
        }
    }

    #[test]
    fn a_wire_produces_a_symmetric_pair() {
        let pb = scan_wired(&[(0, 1)]);
        assert_eq!(pb.map(b'A'), b'B');
        assert_eq!(pb.map(b'B'), b'A');
        assert_eq!(pb.map(b'C'), b'C');
    }

    #[test]
    fn scan_result_is_always_an_involution() {
        let pb = scan_wired(&[(0, 1), (2, 3), (25, 10)]);
        for c in b'A'..=b'Z' {
            assert_eq!(pb.map(pb.map(c)), c);
        }
    }

    #[test]
    fn identity_is_an_involution() {
        assert!(Plugboard::identity().is_involution());
    }

    #[test]
    fn pair_unplugs_previous_partners() {
        let mut pb = Plugboard::identity();
        pb.pair(b'A', b'B').unwrap();
        pb.pair(b'A', b'C').unwrap();
        assert_eq!(pb.map(b'B'), b'B');
        assert_eq!(pb.map(b'A'), b'C');
        assert_eq!(pb.map(b'C'), b'A');
    }

    #[test]
    fn scanner_init_then_scan_smoke() {
        let pb = scan_wired(&[(4, 5)]);
        assert_eq!(pb.map(b'E'), b'F');
    }
}
