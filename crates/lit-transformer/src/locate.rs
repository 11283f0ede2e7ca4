//! Locating markup tagged-template expressions.

use crate::parse::ParsedProgram;
use source_map::Span;
use swc_ecma_ast::{Expr, MemberProp, TaggedTpl};
use swc_ecma_visit::{Visit, VisitWith};

/// A tagged template whose tag resolved to the markup tag name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateMatch {
    /// The inner span of the literal, strictly between the backticks.
    pub span: Span,
    /// The raw text of that span.
    pub raw: String,
}

/// Walks the whole tree collecting templates tagged with `tag_name`.
///
/// The traversal descends into interpolation sub-expressions, so templates
/// nested inside dynamic holes are found and matched independently. Matches
/// come back in source order.
pub fn locate(parsed: &ParsedProgram, text: &str, tag_name: &str) -> Vec<TemplateMatch> {
    let mut locator = TemplateLocator {
        text,
        tag_name,
        base: parsed.base(),
        matches: Vec::new(),
    };
    parsed.program.visit_with(&mut locator);
    locator.matches.sort_by_key(|m| m.span.start);
    locator.matches
}

struct TemplateLocator<'a> {
    text: &'a str,
    tag_name: &'a str,
    base: u32,
    matches: Vec<TemplateMatch>,
}

impl Visit for TemplateLocator<'_> {
    fn visit_tagged_tpl(&mut self, node: &TaggedTpl) {
        if tag_matches(&node.tag, self.tag_name) {
            let lo = node.tpl.span.lo.0 - self.base;
            let hi = node.tpl.span.hi.0 - self.base;
            // The literal's span covers both backticks; the match is what's
            // between them.
            if hi > lo + 1 {
                let span = Span::new(lo + 1, hi - 1);
                let raw = self.text[span.to_range()].to_string();
                self.matches.push(TemplateMatch { span, raw });
            }
        }
        node.visit_children_with(self);
    }
}

/// A tag matches when it is the bare identifier or the property of a member
/// access (`html` or `lib.html`).
fn tag_matches(tag: &Expr, name: &str) -> bool {
    match tag {
        Expr::Ident(ident) => ident.sym.as_str() == name,
        Expr::Member(member) => match &member.prop {
            MemberProp::Ident(prop) => prop.sym.as_str() == name,
            _ => false,
        },
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::{parse, ParserOptions};
    use crate::DEFAULT_TAG;
    use pretty_assertions::assert_eq;

    fn matches_in(source: &str) -> Vec<TemplateMatch> {
        let parsed = parse(source, &ParserOptions::default()).unwrap();
        locate(&parsed, source, DEFAULT_TAG)
    }

    #[test]
    fn test_identifier_tag() {
        let source = "const t = html`<p>x</p>`;";
        let matches = matches_in(source);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].raw, "<p>x</p>");
        assert_eq!(&source[matches[0].span.to_range()], "<p>x</p>");
    }

    #[test]
    fn test_member_tag() {
        let matches = matches_in("const t = lib.html`<p>x</p>`;");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].raw, "<p>x</p>");
    }

    #[test]
    fn test_other_tags_ignored() {
        assert!(matches_in("const s = css`p { color: red; }`;").is_empty());
        assert!(matches_in("const t = tag`<p>x</p>`;").is_empty());
    }

    #[test]
    fn test_untagged_template_ignored() {
        assert!(matches_in("const t = `<p>${x}</p>`;").is_empty());
    }

    #[test]
    fn test_computed_member_ignored() {
        assert!(matches_in("const t = lib[\"html\"]`<p>x</p>`;").is_empty());
    }

    #[test]
    fn test_nested_template_in_hole_found() {
        let source = "const t = html`<ul>${xs.map(x => html`<li>${x}</li>`)}</ul>`;";
        let matches = matches_in(source);
        assert_eq!(matches.len(), 2);
        // Source order: the outer template starts first.
        assert!(matches[0].span.start < matches[1].span.start);
        assert!(matches[0].span.contains_span(matches[1].span));
        assert_eq!(matches[1].raw, "<li>${x}</li>");
    }

    #[test]
    fn test_custom_tag_name() {
        let source = "const t = markup`<p>x</p>`;";
        let parsed = parse(source, &ParserOptions::default()).unwrap();
        assert_eq!(locate(&parsed, source, "markup").len(), 1);
        assert!(locate(&parsed, source, DEFAULT_TAG).is_empty());
    }

    #[test]
    fn test_raw_spans_interpolations() {
        let source = "html`<div>${expr}</div>`";
        let matches = matches_in(source);
        assert_eq!(matches[0].raw, "<div>${expr}</div>");
    }
}
