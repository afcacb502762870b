use std::sync::Arc;

use dustr::{value, Engine, Helper, Value};
use parking_lot::Mutex;

fn render(source: &str, data: Value) -> String {
    let engine = Engine::new();
    let template = engine.compile(source).unwrap();
    engine.render_template(&template, data).unwrap()
}

fn render_err(source: &str, data: Value) -> (String, String) {
    let engine = Engine::new();
    let template = engine.compile(source).unwrap();
    let rendered = engine.renderer(&template, data).to_output().unwrap();
    let msg = rendered.error().expect("expected an error").message().to_owned();
    (rendered.into_text(), msg)
}

#[test]
fn helper_eq() {
    let source = "{@eq key=a value=1}yes{:else}no{/eq}";
    assert_eq!(render(source, value! { a: 1 }), "yes");
    assert_eq!(render(source, value! { a: "1" }), "yes");
    assert_eq!(render(source, value! { a: 2 }), "no");
    assert_eq!(render(source, value! {}), "no");
}

#[test]
fn helper_eq_strings_and_type_cast() {
    assert_eq!(
        render(r#"{@eq key=name value="ann"}hi {name}{/eq}"#, value! { name: "ann" }),
        "hi ann"
    );
    assert_eq!(
        render(r#"{@eq key=a value="01" type="number"}y{/eq}"#, value! { a: 1 }),
        "y"
    );
    assert_eq!(
        render(r#"{@eq key=a value="false" type="boolean"}y{/eq}"#, value! { a: false }),
        "y"
    );
}

#[test]
fn helper_orderings() {
    let result = render(
        "{@lt key=1 value=2}a{/lt}{@lte key=2 value=2}b{/lte}{@gt key=3 value=2}c{/gt}\
         {@gte key=2 value=3}d{:else}e{/gte}{@ne key=1 value=2}f{/ne}{@not key=1 value=1}g{/not}",
        value! {},
    );
    assert_eq!(result, "abcef");
}

#[test]
fn helper_compare_strings_numerically() {
    assert_eq!(render("{@lt key=a value=b}y{/lt}", value! { a: "9", b: "10" }), "y");
    assert_eq!(render("{@lt key=a value=b}y{/lt}", value! { a: "b", b: "a" }), "");
}

#[test]
fn helper_compare_err_no_key() {
    let (text, msg) = render_err("a{@eq value=1}b{/eq}", value! {});
    assert_eq!(text, "a");
    assert_eq!(msg, "comparison requires a `key` parameter");
}

#[test]
fn helper_select() {
    let source = "{@select key=x}{@eq value=1}one{/eq}{@eq value=2}two{/eq}\
                  {@none}other{/none}{@any}!{/any}{/select}";
    assert_eq!(render(source, value! { x: 2 }), "two!");
    assert_eq!(render(source, value! { x: 5 }), "other");
}

#[test]
fn helper_select_first_match_wins() {
    let source = "{@select key=x}{@eq value=1}a{/eq}{@lte value=1}b{/lte}{/select}";
    assert_eq!(render(source, value! { x: 1 }), "a");
    assert_eq!(render(source, value! { x: 0 }), "b");
}

#[test]
fn helper_select_default() {
    let source = "{@select key=x}{@eq value=1}one{/eq}{@default}fallback{/default}{/select}";
    assert_eq!(render(source, value! { x: 1 }), "one");
    assert_eq!(render(source, value! { x: 3 }), "fallback");
}

#[test]
fn helper_any_outside_select() {
    let (_, msg) = render_err("{@any}x{/any}", value! {});
    assert_eq!(msg, "any must be inside a select");
}

#[test]
fn helper_first_and_last() {
    let result = render(
        "{#l}{@first}[{/first}{.}{@last}]{/last}{/l}",
        value! { l: [1, 2, 3] },
    );
    assert_eq!(result, "[123]");
}

#[test]
fn helper_sep() {
    let result = render("{#l}{.}{@sep},{/sep}{/l}", value! { l: [1, 2, 3, 4, 5] });
    assert_eq!(result, "1,2,3,4,5");
}

#[test]
fn helper_sep_renders_for_all_but_the_last() {
    let engine = Engine::new();
    let template = engine.compile("{#l}{@sep}{$idx}{/sep}{/l}").unwrap();
    let result = engine
        .render_template(&template, value! { l: ["a", "b", "c", "d", "e"] })
        .unwrap();
    assert_eq!(result, "0123");
}

#[test]
fn helper_sep_start_and_end() {
    let result = render(
        "{#l}{.}{@sep start=1 end=2}|{/sep}{/l}",
        value! { l: ["a", "b", "c", "d", "e"] },
    );
    assert_eq!(result, "ab|c|de");
}

#[test]
fn helper_sep_outside_iteration() {
    let (text, msg) = render_err("a{@sep},{/sep}b", value! {});
    assert_eq!(text, "ab");
    assert_eq!(msg, "Sep must be inside an array");
}

#[test]
fn helper_math() {
    assert_eq!(render("{@math key=x add=3/}", value! { x: 5 }), "8");
    assert_eq!(render("{@math key=10 method=\"divide\" operand=4/}", value! {}), "2.5");
    assert_eq!(render("{@math key=10 divide=5/}", value! {}), "2");
    assert_eq!(render("{@math key=7 mod=2/}", value! {}), "1");
    assert_eq!(render("{@math key=x subtract=y/}", value! { x: 1, y: 1.5 }), "-0.5");
    assert_eq!(render("{@math key=2.7 floor=true/}", value! {}), "2");
    assert_eq!(render("{@math key=-3 abs=true/}", value! {}), "3");
}

#[test]
fn helper_math_key_names_a_value() {
    assert_eq!(render("{@math key=\"x\" add=3}{.}{/math}", value! { x: 5 }), "8");
    assert_eq!(
        render("{@math key=\"a.b\" multiply=2/}", value! { a: { b: 21 } }),
        "42"
    );
}

#[test]
fn helper_math_body_selects_on_result() {
    let source = "{@math key=n mod=2}{@eq value=0}even{:else}odd{/eq}{/math}";
    assert_eq!(render(source, value! { n: 4 }), "even");
    assert_eq!(render(source, value! { n: 3 }), "odd");
}

#[test]
fn helper_math_errors() {
    let (_, msg) = render_err("{@math key=1 divide=0/}", value! {});
    assert_eq!(
        msg,
        "math divide failed, operands must be numbers and not divide by zero"
    );
    let (_, msg) = render_err("{@math key=label add=1/}", value! { label: "x", x: 5 });
    assert_eq!(msg, "math add failed, operands must be numbers and not divide by zero");
    let (_, msg) = render_err("{@math key=1/}", value! {});
    assert_eq!(msg, "math requires a method");
    let (_, msg) = render_err("{@math key=1 method=\"pow\" operand=2/}", value! {});
    assert_eq!(msg, "math method `pow` is not supported");
}

#[test]
fn helper_set() {
    assert_eq!(
        render(r#"{@set key="count" add=1/}{count}"#, value! { count: 1 }),
        "2"
    );
    assert_eq!(
        render(r#"{@set key="name" value="Bob"/}{name}"#, value! { name: "Ann" }),
        "Bob"
    );
    assert_eq!(render(r#"{@set key="c" subtract=5/}{c}"#, value! {}), "-5");
}

#[test]
fn helper_set_is_visible_everywhere() {
    let result = render(
        r#"{#l}{@set key="n" add=1/}{n}{/l}|{n}"#,
        value! { l: [1, 2, 3] },
    );
    assert_eq!(result, "123|3");
}

#[test]
fn helper_set_errors_are_written() {
    let cases = [
        ("{@set value=1/}", "set helper error: No key specified."),
        ("{@set key=1 value=2/}", "set helper error: Key is not a string."),
        (r#"{@set key="c"/}"#, "set helper error: No action specified."),
        (r#"{@set key="c" add="x"/}"#, "set helper error: add value is not a number."),
        ("{@unset/}", "unset helper error: No key specified."),
    ];
    for (source, expected) in cases {
        assert_eq!(render(source, value! {}), expected);
    }
}

#[test]
fn helper_set_on_non_map_data() {
    let source = r#"a{@set key="x" value=1/}b"#;
    assert_eq!(
        render(source, Value::from(vec![1, 2])),
        "aset helper error: Data is not a map, found list.b"
    );
    assert_eq!(
        render(source, Value::from(5)),
        "aset helper error: Data is not a map, found integer.b"
    );
    assert_eq!(
        render(r#"{@set key="x" add=1/}"#, Value::from("s")),
        "set helper error: Data is not a map, found string."
    );
    assert_eq!(
        render(r#"{@unset key="x"/}!"#, Value::from(true)),
        "unset helper error: Data is not a map, found bool.!"
    );
}

#[test]
fn helper_unset() {
    assert_eq!(render(r#"{@unset key="a"/}[{a}]"#, value! { a: 1 }), "[]");
}

#[test]
fn helper_if() {
    let source = "{@if cond=flag}on{:else}off{/if}";
    assert_eq!(render(source, value! { flag: true }), "on");
    assert_eq!(render(source, value! { flag: [] }), "off");
    assert_eq!(render(source, value! {}), "off");
}

#[test]
fn helper_default() {
    assert_eq!(
        render(r#"{@default key=missing value="fallback"/}"#, value! {}),
        "fallback"
    );
    assert_eq!(
        render(r#"{@default key=name value="fallback"/}"#, value! { name: "<b>" }),
        "&lt;b&gt;"
    );
}

#[test]
fn helper_size() {
    let data = value! { list: [1, 2, 3], map: { a: 1, b: 2 }, name: "abc" };
    assert_eq!(render("{@size key=list/}", data.clone()), "3");
    assert_eq!(render("{@size key=map/}", data.clone()), "2");
    assert_eq!(render("{@size key=name/}", data.clone()), "1");
    assert_eq!(render("{@size key=missing/}", data), "0");
}

#[test]
fn helper_get() {
    let data = value! { user: { name: "<Ann>" } };
    assert_eq!(render(r#"{@get object=user key="name"/}"#, data.clone()), "<Ann>");
    assert_eq!(
        render(r#"{@get key="name"/}"#, data.clone()),
        "get helper error: No object specified."
    );
    assert_eq!(
        render("{@get object=user/}", data),
        "get helper error: No key specified."
    );
}

#[test]
fn helper_context_dump() {
    let data = value! { a: 1, items: [{ b: "<x>" }] };
    assert_eq!(
        render("{@contextDump/}", data.clone()),
        "{\n  \"a\": 1,\n  \"items\": [\n    {\n      \"b\": \"<x>\"\n    }\n  ]\n}"
    );
    assert_eq!(
        render("{#items}{@contextDump/}{/items}", data.clone()),
        "{\n  \"b\": \"<x>\"\n}"
    );
    let full = render(r#"{#items}{@contextDump key="full"/}{/items}"#, data);
    let full: serde_json::Value = serde_json::from_str(&full).unwrap();
    assert_eq!(full["stack"]["head"]["b"], "<x>");
    assert_eq!(full["stack"]["tail"]["head"]["a"], 1);
}

#[test]
fn helper_custom_init() {
    let mut engine = Engine::new();
    engine.add_helper(
        "repeat",
        Helper::init(|chunk, ctx, bodies, params| {
            let times = params.get("times").and_then(|v| v.as_f64()).unwrap_or(1.0) as usize;
            for _ in 0..times {
                chunk.render(bodies.block(), ctx);
            }
            Ok(())
        }),
    );
    let template = engine.compile("{@repeat times=3}{x}{/repeat}").unwrap();
    let result = engine.render_template(&template, value! { x: "ab" }).unwrap();
    assert_eq!(result, "ababab");
}

#[test]
fn helper_custom_output_is_not_escaped() {
    let mut engine = Engine::new();
    engine.add_helper(
        "bold",
        Helper::output(|_, params| {
            let text = params.get_str("text").unwrap_or_default();
            Ok(Value::from(format!("<b>{text}</b>")))
        }),
    );
    let template = engine.compile(r#"{@bold text="{name}"/}"#).unwrap();
    let result = engine.render_template(&template, value! { name: "&" }).unwrap();
    assert_eq!(result, "<b>&amp;</b>");
}

#[test]
fn helper_custom_prerun_does_nothing_when_rendering() {
    let calls = Arc::new(Mutex::new(0));
    let mut engine = Engine::new();
    let counter = Arc::clone(&calls);
    engine.add_helper(
        "probe",
        Helper::prerun(move |_, _| {
            *counter.lock() += 1;
        }),
    );
    let template = engine.compile("a{@probe/}b").unwrap();
    assert_eq!(engine.render_template(&template, value! {}).unwrap(), "ab");
    assert_eq!(*calls.lock(), 0);
}

#[test]
fn helper_custom_error_is_recorded() {
    let mut engine = Engine::new();
    engine.add_helper(
        "fail",
        Helper::init(|chunk, _, _, _| {
            chunk.write("partial");
            Err(dustr::Error::new("failed on purpose"))
        }),
    );
    let template = engine.compile("{@fail/} rest").unwrap();
    let rendered = engine.renderer(&template, value! {}).to_output().unwrap();
    assert_eq!(rendered.text(), "partial rest");
    assert_eq!(rendered.error().unwrap().message(), "failed on purpose");
}
