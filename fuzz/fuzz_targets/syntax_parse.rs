#![no_main]

use libfuzzer_sys::fuzz_target;
use stmig_syntax::{parse, tokenize, TokenKind};

const MAX_SOURCE_BYTES: usize = 8192;

fuzz_target!(|data: &[u8]| {
    let capped = &data[..data.len().min(MAX_SOURCE_BYTES)];
    let source = String::from_utf8_lossy(capped);

    let tokens = tokenize(&source);
    assert_eq!(tokens.iter().filter(|token| token.kind == TokenKind::Eof).count(), 1);
    assert_eq!(tokens.last().map(|token| token.kind), Some(TokenKind::Eof));
    let mut previous_end = 0;
    for token in &tokens {
        let start = usize::from(token.range.start());
        let end = usize::from(token.range.end());
        assert!(previous_end <= start && start <= end && end <= source.len());
        assert!(token.start_line >= 1 && token.start_col >= 1);
        previous_end = end;
    }

    let result = parse(&source, "fuzz.st");
    assert_eq!(result.success, result.fatal_errors().next().is_none());
    for pou in &result.pous {
        let (first, last) = pou.line_span();
        assert!(first <= last);
    }
});
