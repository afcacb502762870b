use dustr::{value, Engine, Value, Whitespace};

fn render(source: &str, data: Value) -> String {
    let engine = Engine::new();
    let template = engine.compile(source).unwrap();
    engine.render_template(&template, data).unwrap()
}

#[test]
fn render_reference() {
    let result = render("Hello {name}!", value! { name: "World" });
    assert_eq!(result, "Hello World!");
}

#[test]
fn render_reference_scalars() {
    let result = render(
        "{i} {f} {b} {n}",
        value! { i: 123, f: 12.5, b: true, n: None },
    );
    assert_eq!(result, "123 12.5 true ");
}

#[test]
fn render_reference_path() {
    let result = render(
        "{a.b} {list[1]} {list.0} {list[idx]}",
        value! { a: { b: "x" }, list: ["p", "q"], idx: 1 },
    );
    assert_eq!(result, "x q p q");
}

#[test]
fn render_reference_missing_is_empty() {
    let result = render("[{missing}][{a.missing.deep}]", value! { a: {} });
    assert_eq!(result, "[][]");
}

#[test]
fn render_reference_list_and_map_are_empty() {
    let result = render("[{list}][{map}]", value! { list: [1, 2], map: { a: 1 } });
    assert_eq!(result, "[][]");
}

#[test]
fn render_reference_escapes_html() {
    let data = value! { html: "<b>Tom & 'Jerry'</b>" };
    assert_eq!(
        render("{html}", data.clone()),
        "&lt;b&gt;Tom &amp; &#39;Jerry&#39;&lt;/b&gt;"
    );
    assert_eq!(render("{html|s}", data.clone()), "<b>Tom & 'Jerry'</b>");
    assert_eq!(
        render("{html|h}", data),
        "&lt;b&gt;Tom &amp; &#39;Jerry&#39;&lt;/b&gt;"
    );
}

#[test]
fn render_section_truthiness() {
    let falsy = [
        value! {},
        value! { v: None },
        value! { v: false },
        value! { v: 0 },
        value! { v: 0.0 },
        value! { v: "" },
        value! { v: [] },
        value! { v: {} },
    ];
    for data in falsy {
        assert_eq!(render("{#v}T{:else}F{/v}", data), "F");
    }
    let truthy = [
        value! { v: true },
        value! { v: 1 },
        value! { v: -0.5 },
        value! { v: "x" },
        value! { v: [0] },
        value! { v: { a: None } },
    ];
    for data in truthy {
        assert_eq!(render("{#v}T{:else}F{/v}", data), "T");
    }
}

#[test]
fn render_section_iterates_list() {
    let result = render(
        "{#list}{.}:{$idx}/{$len};{/list}",
        value! { list: ["a", "b", "c"] },
    );
    assert_eq!(result, "a:0/3;b:1/3;c:2/3;");
}

#[test]
fn render_section_iteration_number() {
    let result = render(
        "{#list}{$iter}:{$key};{/list}",
        value! { list: [None, None, None] },
    );
    assert_eq!(result, "1:0;2:1;3:2;");
}

#[test]
fn render_section_map_and_scalar() {
    let data = value! { user: { name: "Ann", age: 30 }, name: "x" };
    assert_eq!(render("{#user}{name} {age}{/user}", data.clone()), "Ann 30");
    assert_eq!(render("{#name}[{.}]{/name}", data), "[x]");
}

#[test]
fn render_section_walks_up_the_context() {
    let result = render(
        "{#items}{name}{suffix} {/items}",
        value! { items: [{ name: "a" }, { name: "b" }], suffix: "!" },
    );
    assert_eq!(result, "a! b! ");
}

#[test]
fn render_section_current_anchor() {
    let result = render(
        "{#items}[{.name}]{/items}",
        value! { items: [{ name: "a" }, { other: 1 }], name: "root" },
    );
    assert_eq!(result, "[a][]");
}

#[test]
fn render_section_nested() {
    let result = render(
        "{#rows}{#cells}{.}{/cells};{/rows}",
        value! { rows: [{ cells: [1, 2] }, { cells: [3] }] },
    );
    assert_eq!(result, "12;3;");
}

#[test]
fn render_section_params() {
    let result = render(
        r#"{#list sep="-" n=count}{.}{sep}{n}{/list}"#,
        value! { list: [1, 2], count: 7 },
    );
    assert_eq!(result, "1-72-7");
}

#[test]
fn render_exists_and_not_exists() {
    let source = "{?a}yes{:else}no{/a}|{^b}none{:else}some{/b}";
    assert_eq!(render(source, value! { a: 1, b: [] }), "yes|none");
    assert_eq!(render(source, value! { a: "", b: [1] }), "no|some");
}

#[test]
fn render_exists_does_not_push() {
    let result = render("{?user}{name}{/user}", value! { user: { name: "inner" }, name: "outer" });
    assert_eq!(result, "outer");
}

#[test]
fn render_specials_raw_and_comments() {
    assert_eq!(render("a{~n}b{~s}{~lb}{~rb}", value! {}), "a\nb {}");
    assert_eq!(render("{`{name}`}", value! { name: "x" }), "{name}");
    assert_eq!(render("a{! hidden !}b", value! {}), "ab");
}

#[test]
fn render_literal_braces() {
    let source = "function() { return { a: 1 }; }";
    assert_eq!(render(source, value! {}), source);
}

#[test]
fn render_blocks() {
    assert_eq!(
        render("{<title}Home{/title}<h1>{+title}Default{/title}</h1>", value! {}),
        "<h1>Home</h1>"
    );
    assert_eq!(render("<h1>{+title}Default{/title}</h1>", value! {}), "<h1>Default</h1>");
    assert_eq!(render("<h1>{+title/}</h1>", value! {}), "<h1></h1>");
}

#[test]
fn render_whitespace_compress() {
    let mut engine = Engine::new();
    engine.set_whitespace(Whitespace::Compress);
    let template = engine.compile("<ul>\n  <li>{a}</li>\n</ul>").unwrap();
    let result = engine.render_template(&template, value! { a: "x" }).unwrap();
    assert_eq!(result, "<ul><li>x</li></ul>");
}

#[test]
fn render_whitespace_preserve() {
    let result = render("<ul>\n  <li>{a}</li>\n</ul>", value! { a: "x" });
    assert_eq!(result, "<ul>\n  <li>x</li>\n</ul>");
}

#[test]
fn render_globals() {
    let engine = Engine::new();
    let template = engine.compile("{greeting} {name}").unwrap();
    let result = engine
        .renderer(&template, value! { name: "World" })
        .with_globals(value! { greeting: "Hello", name: "ignored" })
        .to_string()
        .unwrap();
    assert_eq!(result, "Hello World");
}

#[test]
fn render_serializable_struct() {
    #[derive(serde::Serialize)]
    struct Page {
        title: &'static str,
        tags: Vec<&'static str>,
    }

    let engine = Engine::new();
    let template = engine.compile("{title}:{#tags} {.}{/tags}").unwrap();
    let page = Page {
        title: "Post",
        tags: vec!["a", "b"],
    };
    assert_eq!(engine.render_template(&template, &page).unwrap(), "Post: a b");
}

#[test]
fn render_is_deterministic() {
    let engine = Engine::new();
    let template = engine.compile("{#m}{.}{/m}{#l}{.}{@sep},{/sep}{/l}").unwrap();
    let data = value! { m: { b: 2, a: 1 }, l: [3, 2, 1] };
    let first = engine.render_template(&template, data.clone()).unwrap();
    for _ in 0..3 {
        assert_eq!(engine.render_template(&template, data.clone()).unwrap(), first);
    }
}

#[test]
fn render_err_unknown_filter() {
    let engine = Engine::new();
    let template = engine.compile("{a|nope} done").unwrap();

    let rendered = engine
        .renderer(&template, value! { a: "x" })
        .to_output()
        .unwrap();
    assert_eq!(rendered.text(), "x done");
    assert_eq!(rendered.error().unwrap().message(), "unknown filter `nope`");

    let err = engine
        .render_template(&template, value! { a: "x" })
        .unwrap_err();
    assert_eq!(
        format!("{:#}", err),
        "
   |
 1 | {a|nope} done
   |    ^^^^ unknown filter `nope`
"
    );
}

#[test]
fn render_err_unknown_helper() {
    let engine = Engine::new();
    let template = engine.compile("a{@nope/}b").unwrap();
    let rendered = engine.renderer(&template, value! {}).to_output().unwrap();
    assert_eq!(rendered.text(), "ab");
    assert_eq!(rendered.error().unwrap().message(), "unknown helper `nope`");
}

#[test]
fn render_err_inside_quoted_param() {
    let engine = Engine::new();
    engine.add_template("card", "[{t}]").unwrap();
    let cases = [
        (r#"{@eq key="{@nope/}" value=""}yes{/eq}"#, "yes", "unknown helper `nope`"),
        (r#"{@eq key="{x|bogus}" value="1"}yes{/eq}"#, "yes", "unknown filter `bogus`"),
        (r#"{#x p="{@nope/}"}({p}){/x}"#, "()", "unknown helper `nope`"),
        (r#"{>card t="{x|bogus}"/}"#, "[1]", "unknown filter `bogus`"),
    ];
    for (source, text, msg) in cases {
        let template = engine.compile(source).unwrap();
        let rendered = engine
            .renderer(&template, value! { x: 1 })
            .to_output()
            .unwrap();
        assert_eq!(rendered.text(), text, "{source}");
        assert_eq!(rendered.error().unwrap().message(), msg, "{source}");
        assert!(engine.render_template(&template, value! { x: 1 }).is_err());
    }
}

#[test]
fn render_err_only_first_is_kept() {
    let engine = Engine::new();
    let template = engine.compile("{@first/}{@a/}{@b/}").unwrap();
    let rendered = engine.renderer(&template, value! {}).to_output().unwrap();
    assert_eq!(rendered.error().unwrap().message(), "unknown helper `a`");
}
