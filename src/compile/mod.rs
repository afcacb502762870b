//! Compile template source into an AST that can be evaluated by the
//! renderer.
//!
//! This process has two stages:
//! - The lexer chunks the template source into tokens.
//! - The parser constructs an AST from the token stream.

mod lex;
mod parse;

use crate::types::ast;
use crate::Result;

/// How whitespace in raw template text is treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Whitespace {
    /// Keep all text exactly as written.
    #[default]
    Preserve,
    /// Drop every newline together with the indentation that follows it.
    Compress,
}

/// Compile a template.
pub fn template(source: &str, whitespace: Whitespace) -> Result<ast::Template> {
    let (body, blocks) = parse::Parser::new(source, whitespace).parse_template()?;
    tracing::trace!(parts = body.parts.len(), blocks = blocks.len(), "compiled template");
    Ok(ast::Template {
        source: source.to_owned(),
        body,
        blocks,
        path: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ast::*;
    use crate::types::span::Span;

    fn parse(source: &str) -> Vec<Part> {
        template(source, Whitespace::Preserve).unwrap().body.parts
    }

    #[test]
    fn compile_text_and_reference() {
        let parts = parse("Hi {name|s}!");
        assert_eq!(
            parts,
            [
                Part::Text("Hi ".into()),
                Part::Reference(Reference {
                    path: Path {
                        anchor: Anchor::Relative,
                        keys: vec![Key::Name("name".into())],
                        span: Span { m: 4, n: 8 },
                    },
                    filters: vec![Ident {
                        name: "s".into(),
                        span: Span { m: 9, n: 10 },
                    }],
                    span: Span { m: 3, n: 11 },
                }),
                Part::Text("!".into()),
            ]
        );
    }

    #[test]
    fn compile_paths() {
        let parts = parse("{.}{.a}{a[0].b}{a[b.c]}");
        let paths: Vec<_> = parts
            .into_iter()
            .map(|part| match part {
                Part::Reference(r) => (r.path.anchor, r.path.keys),
                _ => panic!("expected reference"),
            })
            .collect();
        assert_eq!(
            paths,
            [
                (Anchor::Current, vec![]),
                (Anchor::Current, vec![Key::Name("a".into())]),
                (
                    Anchor::Relative,
                    vec![Key::Name("a".into()), Key::Index(0), Key::Name("b".into())]
                ),
                (
                    Anchor::Relative,
                    vec![
                        Key::Name("a".into()),
                        Key::Expr(Path {
                            anchor: Anchor::Relative,
                            keys: vec![Key::Name("b".into()), Key::Name("c".into())],
                            span: Span { m: 18, n: 21 },
                        })
                    ]
                ),
            ]
        );
    }

    #[test]
    fn compile_section_with_else() {
        let parts = parse("{#items}x{:else}y{/items}");
        match &parts[..] {
            [Part::Section(section)] => {
                assert_eq!(section.kind, SectionKind::Section);
                assert_eq!(section.body, Some(Body { parts: vec![Part::Text("x".into())] }));
                assert_eq!(
                    section.bodies.get("else"),
                    Some(&Body { parts: vec![Part::Text("y".into())] })
                );
            }
            parts => panic!("unexpected parts {parts:?}"),
        }
    }

    #[test]
    fn compile_helper_params() {
        let parts = parse(r#"{@eq key=a value="x {b}" n=-2 f=1.5 s="plain"/}"#);
        let call = match &parts[..] {
            [Part::Helper(call)] => call,
            parts => panic!("unexpected parts {parts:?}"),
        };
        assert_eq!(call.name.name, "eq");
        assert!(call.body.is_none());
        let names: Vec<_> = call.params.iter().map(|p| p.name.name.as_str()).collect();
        assert_eq!(names, ["key", "value", "n", "f", "s"]);
        assert!(matches!(call.params[0].value, ParamValue::Path(_)));
        assert!(matches!(call.params[1].value, ParamValue::Interpolated(_)));
        assert_eq!(call.params[2].value, ParamValue::Literal(Literal::Integer(-2)));
        assert_eq!(call.params[3].value, ParamValue::Literal(Literal::Float(1.5)));
        assert_eq!(
            call.params[4].value,
            ParamValue::Literal(Literal::String("plain".into()))
        );
    }

    #[test]
    fn compile_inline_partials_are_collected() {
        let t = template("{<title}Home{/title}{>base/}", Whitespace::Preserve).unwrap();
        assert_eq!(
            t.blocks.get("title"),
            Some(&Body { parts: vec![Part::Text("Home".into())] })
        );
        assert_eq!(t.body.parts.len(), 1);
        assert_eq!(t.partials(), ["base"]);
    }

    #[test]
    fn compile_specials_merge_into_text() {
        let parts = parse("a{~n}b{~lb}{~rb}{`{raw}`}");
        assert_eq!(parts, [Part::Text("a\nb{}{raw}".into())]);
    }

    #[test]
    fn compile_whitespace_compress() {
        let t = template("<ul>\n    <li>{x}</li>\r\n</ul>\n", Whitespace::Compress).unwrap();
        assert_eq!(t.body.parts[0], Part::Text("<ul><li>".into()));
        assert_eq!(t.body.parts[2], Part::Text("</li></ul>".into()));
    }

    #[test]
    fn compile_is_deterministic() {
        let source = "{#a}{@sep}, {/sep}{b|h}{:else}none{/a}{>p:c x=1/}{+blk}d{/blk}";
        let one = template(source, Whitespace::Preserve).unwrap();
        let two = template(source, Whitespace::Preserve).unwrap();
        assert_eq!(one, two);
    }

    #[test]
    fn compile_helpers_used() {
        let source = "{@select key=a}{@eq value=1}{@math key=2 add=1/}{/eq}{/select}{@eq/}";
        let t = template(source, Whitespace::Preserve).unwrap();
        assert_eq!(t.helpers(), ["select", "eq", "math"]);
    }
}
