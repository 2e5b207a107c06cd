#![no_main]

use libfuzzer_sys::fuzz_target;

use connectors::http::{error_message, MAX_ERROR_MESSAGE_CHARS};

fuzz_target!(|data: &[u8]| {
    // Arbitrary provider error bodies: malformed JSON, invalid UTF-8, deep
    // nesting. The derived message is always bounded.
    let message = error_message(data);
    assert!(message.chars().count() <= MAX_ERROR_MESSAGE_CHARS);
});
