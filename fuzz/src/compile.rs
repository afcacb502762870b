#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let engine = dustr::Engine::new();
    if let Ok(template) = engine.compile(data) {
        // compiling the same source twice yields the same tree
        assert_eq!(engine.compile(data).ok().as_ref(), Some(&template));
    }
});
