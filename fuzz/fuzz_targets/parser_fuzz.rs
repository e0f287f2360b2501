//! Compiler fuzz target: feed arbitrary bytes to the format compiler, then run any plan it
//! accepts over the same input as a document.
//! Neither stage may panic; both return Ok or a reported error.
//! Build with: cargo fuzz run parser_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let s = match std::str::from_utf8(data) {
        Ok(x) => x,
        Err(_) => return,
    };
    if let Ok(plan) = instaparse::compile(s) {
        let _ = instaparse::DocumentParser::new(&plan).parse_str(s);
    }
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run parser_fuzz");
}
