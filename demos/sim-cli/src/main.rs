//! A terminal-only exercise of the Enigma core: types typed at a prompt are
//! clocked through a software PS/2 wire into `Ps2Driver`, decoded the same
//! way a real keyboard's bytes would be, and driven through `AppSession`
//! with a print-based `DisplaySink`. No real silicon involved, mirroring
//! how `state-slurp` reads firmware state off a debug probe without this
//! crate ever touching a board.
//!
//! Commands (one per line):
//!   <letters>     encrypted in ENCRYPT mode, one PS/2 frame per letter
//!   :mode         press-and-release the mode button, advancing the FSM
//!   :plug A B     wire two plugboard pins together (before ":scan")
//!   :scan         run one plugboard sweep in CONFIG_PB mode
//!   :cw / :ccw    turn the rotary encoder one detent in CONFIG_ROTOR mode
//!   :quit         exit

use std::cell::Cell;
use std::io::{self, BufRead, Write};
use std::rc::Rc;

use enigma_core::hal::{InPin, OutPin};
use enigma_core::plugboard::PlugboardPins;
use enigma_core::{AppMode, AppSession, DisplaySink, SessionConfig};
use enigma_core::{ClkEdge, Ps2Driver};

/// A software PS/2 (or quadrature) wire: both the driver and the host side
/// hold a handle to the same cell, exactly as `plugboard.rs`'s `WiredPin`
/// test harness shares a line between two pin handles.
#[derive(Clone)]
struct WirePin(Rc<Cell<bool>>);

impl WirePin {
    fn new(initial: bool) -> Self {
        WirePin(Rc::new(Cell::new(initial)))
    }
}

impl InPin for WirePin {
    fn is_high(&self) -> bool {
        self.0.get()
    }
}

impl OutPin for WirePin {
    fn set_high(&mut self) {
        self.0.set(true);
    }
    fn set_low(&mut self) {
        self.0.set(false);
    }
}

/// Raw Scan Code Set 2 codes for the 26 letters (inverse of
/// `ps2::scancode::translate_single`'s letter arm), enough for this
/// terminal demo's alphabetic input.
fn raw_scancode_for(letter: u8) -> Option<u8> {
    Some(match letter {
        b'A' => 0x1C,
        b'B' => 0x32,
        b'C' => 0x21,
        b'D' => 0x23,
        b'E' => 0x24,
        b'F' => 0x2B,
        b'G' => 0x34,
        b'H' => 0x33,
        b'I' => 0x43,
        b'J' => 0x3B,
        b'K' => 0x42,
        b'L' => 0x4B,
        b'M' => 0x3A,
        b'N' => 0x31,
        b'O' => 0x44,
        b'P' => 0x4D,
        b'Q' => 0x15,
        b'R' => 0x2D,
        b'S' => 0x1B,
        b'T' => 0x2C,
        b'U' => 0x3C,
        b'V' => 0x2A,
        b'W' => 0x1D,
        b'X' => 0x22,
        b'Y' => 0x35,
        b'Z' => 0x1A,
        _ => return None,
    })
}

/// Clocks one 11-bit PS/2 frame (start/8 data LSB-first/odd parity/stop)
/// for `byte` into `driver`, driving `data` and `clk` the way a real
/// device's open-drain lines would toggle. `now_ms` is advanced by one
/// tick per bit.
fn send_frame(
    driver: &mut Ps2Driver<WirePin, WirePin>,
    data: &mut WirePin,
    clk: &mut WirePin,
    now_ms: &mut u32,
    byte: u8,
) {
    let mut parity_acc = false;
    let mut bits = [false; 11];
    bits[0] = false; // start bit
    for i in 0..8 {
        let bit = (byte >> i) & 1 != 0;
        bits[1 + i] = bit;
        if bit {
            parity_acc = !parity_acc;
        }
    }
    bits[9] = !parity_acc; // odd parity
    bits[10] = true; // stop bit

    for &bit in bits.iter() {
        if bit {
            data.set_high();
        } else {
            data.set_low();
        }
        clk.set_low();
        driver.on_clk_edge(ClkEdge::Falling, *now_ms);
        clk.set_high();
        *now_ms = now_ms.wrapping_add(1);
    }
}

/// Sends a full make, then break (`0xF0` prefix + the same code), for one
/// letter's raw scan code.
fn send_key(
    driver: &mut Ps2Driver<WirePin, WirePin>,
    data: &mut WirePin,
    clk: &mut WirePin,
    now_ms: &mut u32,
    raw: u8,
) {
    send_frame(driver, data, clk, now_ms, raw);
    send_frame(driver, data, clk, now_ms, 0xF0);
    send_frame(driver, data, clk, now_ms, raw);
}

/// A full clockwise quadrature detent, reused verbatim from
/// `encoder.rs`'s own test fixture.
const CW_SEQUENCE: [(bool, bool); 4] = [(false, false), (false, true), (true, true), (true, false)];
const CCW_SEQUENCE: [(bool, bool); 4] = [(false, false), (true, false), (true, true), (false, true)];

fn turn_encoder(
    session: &mut AppSession,
    now_ms: u32,
    clk: &mut WirePin,
    data: &mut WirePin,
    display: &mut PrintSink,
    sequence: &[(bool, bool); 4],
) {
    for &(c, d) in sequence.iter() {
        if c {
            clk.set_high();
        } else {
            clk.set_low();
        }
        if d {
            data.set_high();
        } else {
            data.set_low();
        }
        session.run_config_rotor(now_ms, &*clk, &*data, display);
    }
}

/// A plugboard pin on a simulated wiring harness: reading it returns
/// whatever level is currently on its shared line, and driving it also
/// drives whichever pin (if any) is physically shorted to it. Lifted
/// straight from `plugboard.rs`'s own `WiredPin` test fixture, since this
/// demo needs exactly the same "soldered wire" behavior that harness
/// proves the scanner against.
#[derive(Clone)]
struct LinkedPin {
    index: usize,
    lines: Rc<Cell<[bool; 26]>>,
    links: Rc<[Option<usize>; 26]>,
}

impl InPin for LinkedPin {
    fn is_high(&self) -> bool {
        self.lines.get()[self.index]
    }
}

impl OutPin for LinkedPin {
    fn set_high(&mut self) {
        let mut lines = self.lines.get();
        lines[self.index] = true;
        if let Some(j) = self.links[self.index] {
            lines[j] = true;
        }
        self.lines.set(lines);
    }
    fn set_low(&mut self) {
        let mut lines = self.lines.get();
        lines[self.index] = false;
        if let Some(j) = self.links[self.index] {
            lines[j] = false;
        }
        self.lines.set(lines);
    }
}

/// 26 independently-wireable plugboard pins, with the same "drive pin i,
/// does a peer go high too" semantics `PlugboardScanner::scan` expects.
struct CliPlugboardPins {
    pins: Vec<LinkedPin>,
    links: Rc<[Option<usize>; 26]>,
}

impl CliPlugboardPins {
    fn new() -> Self {
        let links = Rc::new([None; 26]);
        let lines = Rc::new(Cell::new([false; 26]));
        let pins = (0..26)
            .map(|index| LinkedPin {
                index,
                lines: lines.clone(),
                links: links.clone(),
            })
            .collect();
        CliPlugboardPins { pins, links }
    }

    /// Rewires the shared link table and every pin's handle to it. The
    /// `Rc<[Option<usize>; 26]>` is swapped wholesale rather than mutated
    /// in place since it's shared read-only state once pins hold clones.
    fn wire(&mut self, a: usize, b: usize) {
        let mut links = *self.links;
        links[a] = Some(b);
        links[b] = Some(a);
        self.links = Rc::new(links);
        for pin in self.pins.iter_mut() {
            pin.links = self.links.clone();
        }
    }
}

impl PlugboardPins for CliPlugboardPins {
    type Pin = LinkedPin;

    fn pin(&mut self, letter_index: usize) -> &mut LinkedPin {
        &mut self.pins[letter_index]
    }
}

/// A print-based `DisplaySink`: stands in for the LED-matrix board the
/// firmware would otherwise drive.
struct PrintSink;

impl DisplaySink for PrintSink {
    fn draw_char(&mut self, c: u8) {
        println!("display: {}", c as char);
    }
    fn draw_number(&mut self, n: u8) {
        println!("display: {:02}", n);
    }
    fn draw_roman(&mut self, n: u8) {
        let roman = match n {
            1 => "I",
            2 => "II",
            3 => "III",
            _ => "?",
        };
        println!("display: {}", roman);
    }
    fn shift_text(&mut self, text: &str, _reset: bool) -> bool {
        println!("display: {}", text);
        true
    }
    fn wait_input(&mut self, _reset: bool) -> bool {
        true
    }
    fn loading(&mut self, _reset: bool) -> bool {
        true
    }
}

fn main() {
    let config = SessionConfig {
        rotor_choice: [1, 2, 3],
        reflector_choice: 1,
    };
    let mut session = AppSession::new(config, 10, 50, 100).expect("valid default rotor/reflector choice");

    let mut data = WirePin::new(true);
    let mut clk = WirePin::new(true);
    let mut driver = Ps2Driver::init(data.clone(), clk.clone());
    driver.enable_irq();

    let mut rotor_clk = WirePin::new(false);
    let mut rotor_data = WirePin::new(false);
    let mut pb_pins = CliPlugboardPins::new();
    let mut display = PrintSink;
    let mut now_ms: u32 = 0;

    println!("enigma-core terminal demo. Type letters, or a ':' command. ':quit' to exit.");
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };
        let line = line.trim();

        if line == ":quit" {
            break;
        } else if line == ":mode" {
            // one press-and-release, long enough to clear both thresholds
            for _ in 0..10 {
                session.sample_button(true, now_ms);
                now_ms += 10;
            }
            for _ in 0..15 {
                session.sample_button(false, now_ms);
                now_ms += 10;
            }
            println!("mode: {:?}", session.mode());
        } else if line == ":scan" {
            session.run_config_plugboard(now_ms, &mut pb_pins, &mut display);
        } else if let Some(rest) = line.strip_prefix(":plug ") {
            let letters: Vec<&str> = rest.split_whitespace().collect();
            if let [a, b] = letters.as_slice() {
                if let (Some(a), Some(b)) = (a.bytes().next(), b.bytes().next()) {
                    let (ia, ib) = ((a - b'A') as usize, (b - b'A') as usize);
                    if ia < 26 && ib < 26 {
                        pb_pins.wire(ia, ib);
                        println!("wired {} <-> {}", a as char, b as char);
                    }
                }
            }
        } else if line == ":cw" {
            turn_encoder(&mut session, now_ms, &mut rotor_clk, &mut rotor_data, &mut display, &CW_SEQUENCE);
        } else if line == ":ccw" {
            turn_encoder(&mut session, now_ms, &mut rotor_clk, &mut rotor_data, &mut display, &CCW_SEQUENCE);
        } else {
            if session.mode() != AppMode::Encrypt {
                println!("not in ENCRYPT mode ({:?}); use :mode to cycle back", session.mode());
                continue;
            }
            for ch in line.bytes() {
                let upper = ch.to_ascii_uppercase();
                if let Some(raw) = raw_scancode_for(upper) {
                    send_key(&mut driver, &mut data, &mut clk, &mut now_ms, raw);
                }
            }
            let available = driver.available();
            let events: Vec<u16> = (0..available).map(|_| driver.read()).collect();
            session.run_encrypt(events.into_iter(), &mut display);
        }
        io::stdout().flush().ok();
    }
}
