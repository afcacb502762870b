#![no_main]

use std::collections::BTreeMap;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use serde::Serialize;

#[derive(Debug, Serialize, Arbitrary)]
#[serde(untagged)]
enum Value {
    None,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

fuzz_target!(|data: (&str, Vec<(&str, &str)>, Value)| {
    let (root, partials, value) = data;
    let engine = dustr::Engine::new();
    if engine.add_template("fuzz", root).is_err() {
        return;
    }
    for (name, source) in partials {
        let _ = engine.add_template(name, source);
    }
    let _ = engine.render("fuzz", &value);
});
