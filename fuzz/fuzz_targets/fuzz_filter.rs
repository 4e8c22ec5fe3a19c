#![no_main]

use arbitrary::Arbitrary;
use ldbview::index::{Record, RecordIndex};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Input {
    records: Vec<(Vec<u8>, Vec<u8>)>,
    query: String,
}

fuzz_target!(|input: Input| {
    let index = RecordIndex::from_records(
        input
            .records
            .into_iter()
            .map(|(k, v)| Record::new(k, v))
            .collect(),
    );

    let view = ldbview::query::filter(&index, &input.query);
    assert!(view.len() <= index.len());
    assert!(view.positions().windows(2).all(|w| w[0] < w[1]));

    // Parallel filtering must agree with the sequential path
    let parallel = ldbview::query::filter_with_threshold(&index, &input.query, 1);
    assert_eq!(view.positions(), parallel.positions());
});
