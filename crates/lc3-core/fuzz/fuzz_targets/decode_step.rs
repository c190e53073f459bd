#![no_main]

use lc3_core::{BufferedConsole, CancelToken, Decoder, Machine, PROGRAM_ORIGIN};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let words: Vec<u16> = data
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();

    for word in &words {
        let _ = Decoder::decode(*word);
    }

    let mut machine = Machine::new();
    if machine.load_words(PROGRAM_ORIGIN, &words).is_err() {
        return;
    }
    let mut console = BufferedConsole::with_input(data);
    let _ = machine.run_for(&mut console, &CancelToken::new(), 1_024);
});
