#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Tokenizing arbitrary text must never panic, with or without interpunct splitting
    let _ = finja::utils::is_binary(data);
    let text = String::from_utf8_lossy(data);
    for interpunct in [false, true] {
        let tokenizer = finja::utils::Tokenizer::new(interpunct);
        let tokens = tokenizer.tokenize(&text);
        assert!(tokens.pairs.len() <= tokens.emitted);
    }
    let _ = finja::utils::cleanup(&text);
});
