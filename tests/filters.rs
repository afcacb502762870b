use dustr::{value, Engine, Value};

fn render(engine: &Engine, source: &str, data: Value) -> String {
    let template = engine.compile(source).unwrap();
    engine.render_template(&template, data).unwrap()
}

#[test]
fn filter_js_string() {
    let result = render(
        &Engine::new(),
        "var s = '{s|j|s}';",
        value! { s: "it's \"quoted\"\n</script>" },
    );
    assert_eq!(result, r#"var s = 'it\'s \"quoted\"\n<\/script>';"#);
}

#[test]
fn filter_uri() {
    let engine = Engine::new();
    let data = value! { url: "/a b?q=é&x=1" };
    assert_eq!(render(&engine, "{url|u|s}", data.clone()), "/a%20b?q=%C3%A9&x=1");
    assert_eq!(
        render(&engine, "{url|uc|s}", data.clone()),
        "%2Fa%20b%3Fq%3D%C3%A9%26x%3D1"
    );
    assert_eq!(render(&engine, "{url|u}", data), "/a%20b?q=%C3%A9&amp;x=1");
}

#[test]
fn filter_json() {
    let engine = Engine::new();
    let data = value! { obj: { a: [1, 2], b: "x" }, raw: "{\"c\": true}" };
    assert_eq!(render(&engine, "{obj|js|s}", data.clone()), r#"{"a":[1,2],"b":"x"}"#);
    assert_eq!(
        render(&engine, "{obj|js}", data.clone()),
        "{&quot;a&quot;:[1,2],&quot;b&quot;:&quot;x&quot;}"
    );
    assert_eq!(render(&engine, "{raw|jp|js|s}", data), r#"{"c":true}"#);
}

#[test]
fn filter_chain_order() {
    let mut engine = Engine::new();
    engine.add_filter("upper", |v: Value| Value::from(v.to_string().to_uppercase()));
    engine.add_filter("exclaim", |v: Value| Value::from(format!("{v}!")));
    let data = value! { name: "ann" };
    assert_eq!(render(&engine, "{name|upper|exclaim}", data.clone()), "ANN!");
    assert_eq!(render(&engine, "{name|exclaim|upper}", data), "ANN!");
}

#[test]
fn filter_custom_output_is_escaped() {
    let mut engine = Engine::new();
    engine.add_filter("tag", |v: Value| Value::from(format!("<{v}>")));
    let data = value! { name: "b" };
    assert_eq!(render(&engine, "{name|tag}", data.clone()), "&lt;b&gt;");
    assert_eq!(render(&engine, "{name|tag|s}", data), "<b>");
}

#[test]
fn filter_automatic_filters() {
    let mut engine = Engine::new();
    let data = value! { html: "<i>x</i>" };

    engine.set_automatic_filters(Vec::<String>::new());
    assert_eq!(render(&engine, "{html}", data.clone()), "<i>x</i>");
    assert_eq!(render(&engine, "{html|h}", data.clone()), "&lt;i&gt;x&lt;/i&gt;");

    engine.add_filter("upper", |v: Value| Value::from(v.to_string().to_uppercase()));
    engine.set_automatic_filters(["upper", "h", "upper"]);
    assert_eq!(render(&engine, "{html}", data.clone()), "&lt;I&gt;X&lt;/I&gt;");
    assert_eq!(render(&engine, "{html|s}", data), "<i>x</i>");
}

#[test]
fn filter_escapes_numbers_unchanged() {
    let result = render(&Engine::new(), "{n|h} {f|u}", value! { n: 42, f: 1.5 });
    assert_eq!(result, "42 1.5");
}
