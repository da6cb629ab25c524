#![no_main]

use libfuzzer_sys::fuzz_target;
use stmig_extract::{
    extract_blocks, extract_comments, extract_safety, extract_state_machines, extract_timers,
    extract_tribal_knowledge, extract_variables, render_mermaid, render_text, SafetyPatterns,
    StateMachineOptions,
};

const MAX_SOURCE_BYTES: usize = 8192;

fuzz_target!(|data: &[u8]| {
    let capped = &data[..data.len().min(MAX_SOURCE_BYTES)];
    let source = String::from_utf8_lossy(capped);
    let file = "fuzz.st";

    let _ = extract_blocks(&source, file);
    let _ = extract_variables(&source, file);
    let _ = extract_comments(&source, file);
    let _ = extract_timers(&source, file);
    let _ = extract_tribal_knowledge(&source, file);

    let machines = extract_state_machines(&source, file, None, &StateMachineOptions::default());
    for machine in &machines.state_machines {
        let _ = render_mermaid(machine);
        let _ = render_text(machine);
        for transition in &machine.transitions {
            assert!(machine.state(&transition.from_state_id).is_some());
        }
    }

    let safety = extract_safety(&source, file, &SafetyPatterns::default());
    assert_eq!(safety.summary.total_interlocks, safety.interlocks.len());
    assert_eq!(safety.summary.total_bypasses, safety.bypasses.len());
});
