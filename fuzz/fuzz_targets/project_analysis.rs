#![no_main]

use libfuzzer_sys::fuzz_target;
use stmig_analyzer::{analyze_project, AnalysisConfig, ParseCache, SourceFile};

const MAX_SOURCE_BYTES: usize = 4096;

fn decode_source(bytes: &[u8]) -> String {
    let capped = &bytes[..bytes.len().min(MAX_SOURCE_BYTES)];
    String::from_utf8_lossy(capped).into_owned()
}

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let split_a = usize::from(data[0]) % (data.len() + 1);
    let split_b = usize::from(*data.get(1).unwrap_or(&0)) % (data.len() + 1);
    let (lo, hi) = if split_a <= split_b {
        (split_a, split_b)
    } else {
        (split_b, split_a)
    };

    let files = vec![
        SourceFile::new(
            "lib.st",
            format!("FUNCTION_BLOCK FB_Fuzz\n{}\nEND_FUNCTION_BLOCK\n", decode_source(&data[..lo])),
        ),
        SourceFile::new(
            "main.st",
            format!(
                "PROGRAM Main\nVAR fb : FB_Fuzz; nState : INT; END_VAR\n{}\nEND_PROGRAM\n",
                decode_source(&data[lo..hi])
            ),
        ),
        SourceFile::new("raw.st", decode_source(&data[hi..])),
    ];

    let config = AnalysisConfig::default();
    let analysis = analyze_project(&files, &config);
    assert_eq!(analysis.files.len(), files.len());
    assert_eq!(analysis.migration.migration_order.len(), analysis.summary.pous);
    for unit in &analysis.migration.pou_scores {
        assert!((0.0..=100.0).contains(&unit.overall_score));
    }
    for pair in analysis.migration.migration_order.windows(2) {
        assert!(pair[0].blocker_count <= pair[1].blocker_count);
    }

    // Parse, invalidate, reparse.
    let mut cache = ParseCache::new();
    let units = cache.get_or_parse("fuzz", &files, &config.parse).len();
    assert_eq!(units, analysis.summary.pous);
    cache.invalidate("fuzz");
    assert_eq!(cache.get_or_parse("fuzz", &files, &config.parse).len(), units);
});
