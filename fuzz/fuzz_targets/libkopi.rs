#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let batch = libkopi::parse(data);
    let streamed: Vec<_> = libkopi::stream(std::io::Cursor::new(data.to_vec())).collect();

    // A clean batch parse means the stream saw no errors and the same transactions.
    if let Ok(ledger) = batch {
        for transaction in &ledger {
            assert!(transaction.is_balanced());
        }
        let mut streamed: Vec<_> = streamed.into_iter().filter_map(Result::ok).collect();
        streamed.sort_by_key(|t| t.date);
        assert_eq!(ledger, streamed);
    }
});
