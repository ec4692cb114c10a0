//! CSS minification capability.
//!
//! The pipeline consumes minification through the [`CssMinifier`] trait so
//! the algorithm stays swappable. The built-in implementation strips
//! comments and collapses whitespace; it is pure, total, and a fixed point
//! on its own output (minifying minified text is a no-op).

/// Pure text-to-text CSS minification.
///
/// Implementations must be side-effect-free and total: malformed input
/// passes through structurally untouched rather than erroring.
pub trait CssMinifier: Send + Sync {
    fn minify(&self, css: &str) -> String;
}

/// Built-in whitespace/comment minifier.
#[derive(Debug, Default)]
pub struct BasicCssMinifier;

impl CssMinifier for BasicCssMinifier {
    fn minify(&self, css: &str) -> String {
        collapse_whitespace(&strip_comments(css))
    }
}

/// Remove `/* ... */` comments. An unterminated comment runs to the end,
/// matching how browsers recover.
fn strip_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;

    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        match rest[start + 2..].find("*/") {
            Some(end) => rest = &rest[start + 2 + end + 2..],
            None => return out,
        }
    }

    out.push_str(rest);
    out
}

/// Characters that never need an adjacent space in CSS.
const NO_SPACE_AROUND: &[char] = &['{', '}', ':', ';', ',', '>'];

/// Collapse whitespace runs to a single space and drop spaces adjacent to
/// structural punctuation. String literals are left untouched.
fn collapse_whitespace(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut in_string: Option<char> = None;
    let mut pending_space = false;

    for c in css.chars() {
        if let Some(quote) = in_string {
            out.push(c);
            if c == quote {
                in_string = None;
            }
            continue;
        }

        match c {
            '"' | '\'' => {
                let after = out.chars().next_back();
                let no_space = after.is_none_or(|p| NO_SPACE_AROUND.contains(&p));
                if pending_space && !no_space {
                    out.push(' ');
                }
                pending_space = false;
                in_string = Some(c);
                out.push(c);
            }
            c if c.is_whitespace() => pending_space = true,
            c => {
                let after = out.chars().next_back();
                let no_space = NO_SPACE_AROUND.contains(&c)
                    || after.is_none_or(|p| NO_SPACE_AROUND.contains(&p));
                if pending_space && !no_space {
                    out.push(' ');
                }
                pending_space = false;
                out.push(c);
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minify(css: &str) -> String {
        BasicCssMinifier.minify(css)
    }

    #[test]
    fn test_strips_comments() {
        assert_eq!(minify("a { /* red */ color: red; }"), "a{color:red;}");
    }

    #[test]
    fn test_collapses_whitespace() {
        let css = "body  {\n    margin:   0;\n    padding : 0 ;\n}\n";
        assert_eq!(minify(css), "body{margin:0;padding:0;}");
    }

    #[test]
    fn test_preserves_meaningful_spaces() {
        assert_eq!(minify("margin: 0 auto;"), "margin:0 auto;");
        assert_eq!(minify("a b { color: red; }"), "a b{color:red;}");
    }

    #[test]
    fn test_preserves_string_contents() {
        let css = r#"a::before { content: "  hi  "; }"#;
        assert_eq!(minify(css), r#"a::before{content:"  hi  ";}"#);
    }

    #[test]
    fn test_no_space_between_colon_and_string() {
        assert_eq!(minify(r#"a { content: "x"; }"#), r#"a{content:"x";}"#);
        assert_eq!(
            minify(r#"p { font-family: "Fira Sans" , serif; }"#),
            r#"p{font-family:"Fira Sans",serif;}"#
        );
    }

    #[test]
    fn test_child_combinator_spaces_dropped() {
        assert_eq!(minify("ul > li { margin: 0; }"), "ul>li{margin:0;}");
    }

    #[test]
    fn test_unterminated_comment_runs_to_end() {
        assert_eq!(minify("a { color: red; } /* oops"), "a{color:red;}");
    }

    #[test]
    fn test_fixed_point() {
        let inputs = [
            "body  {\n    margin:   0;\n}\n",
            "a { /* x */ color: red }",
            "ul > li , ol > li { padding : 0 }",
            r#"q { quotes: "«" "»"; }"#,
        ];
        for css in inputs {
            let once = minify(css);
            assert_eq!(minify(&once), once, "not a fixed point for {css:?}");
        }
    }

    #[test]
    fn test_malformed_input_total() {
        // Not valid CSS, but the minifier must not panic or error.
        let garbage = "}}}{{{ ;;; \"unterminated";
        let _ = minify(garbage);
    }
}
