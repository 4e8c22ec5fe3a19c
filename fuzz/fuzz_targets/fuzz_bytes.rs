#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Classification and hex rendering must accept any byte sequence
    let shown = ldbview::utils::classify(data);
    if !ldbview::utils::is_binary(data) {
        assert_eq!(shown.as_bytes(), data);
    }

    let hex = ldbview::utils::to_hex(data);
    assert_eq!(ldbview::utils::parse_hex(&hex).as_deref(), Some(data));
});
