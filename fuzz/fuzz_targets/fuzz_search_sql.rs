#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Input {
    terms: u8,
    ignores: u8,
    file_mode: bool,
    patterns: Vec<String>,
}

fuzz_target!(|input: Input| {
    let term_count = (input.terms % 16) as usize + 1;
    let ignore_count = (input.ignores % 8) as usize;
    let plan = finja::query::SearchPlan::new(term_count, ignore_count, input.file_mode);

    let tokens: Vec<i64> = (0..term_count as i64).collect();
    let ignores: Vec<String> = input.patterns.into_iter().take(ignore_count).collect();
    let values = plan.bind(&tokens, &ignores);
    assert_eq!(values.len(), term_count + ignores.len());
});
