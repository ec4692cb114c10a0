//! Minimal glob matching for passthrough and watch patterns.
//!
//! Supports `*` (within one path segment), `?`, and `**` (any number of
//! segments). Patterns are matched against `/`-separated relative paths.

use regex::Regex;

/// A compiled glob pattern.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    pattern: String,
    regex: Regex,
}

impl GlobPattern {
    /// Compile a glob pattern. Invalid patterns cannot occur since every
    /// glob char maps to valid regex, but the signature stays fallible to
    /// keep config loading honest about it.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&glob_to_regex(pattern))?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    /// Match a `/`-separated relative path against this pattern.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.regex.is_match(rel_path)
    }

    /// The source pattern text.
    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Longest literal directory prefix before the first glob char.
    ///
    /// `css/vendor/**/*.css` → `css/vendor`. Used to pick the walk root so
    /// matching does not scan the whole project.
    pub fn literal_prefix(&self) -> &str {
        let end = self
            .pattern
            .find(['*', '?', '['])
            .unwrap_or(self.pattern.len());
        match self.pattern[..end].rfind('/') {
            Some(slash) => &self.pattern[..slash],
            None => "",
        }
    }
}

/// Translate a glob pattern into an anchored regex.
fn glob_to_regex(pattern: &str) -> String {
    let mut out = String::from("^");
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    // `**/` may match zero segments
                    if chars.peek() == Some(&'/') {
                        chars.next();
                        out.push_str("(?:[^/]+/)*");
                    } else {
                        out.push_str(".*");
                    }
                } else {
                    out.push_str("[^/]*");
                }
            }
            '?' => out.push_str("[^/]"),
            c => out.push_str(&regex::escape(&c.to_string())),
        }
    }

    out.push('$');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(pattern: &str, path: &str) -> bool {
        GlobPattern::new(pattern).unwrap().matches(path)
    }

    #[test]
    fn test_star_stays_within_segment() {
        assert!(matches("css/*.css", "css/site.css"));
        assert!(!matches("css/*.css", "css/vendor/site.css"));
    }

    #[test]
    fn test_double_star_spans_segments() {
        assert!(matches("css/**/*.css", "css/site.css"));
        assert!(matches("css/**/*.css", "css/vendor/deep/site.css"));
        assert!(!matches("css/**/*.css", "js/site.js"));
    }

    #[test]
    fn test_question_mark() {
        assert!(matches("img/pic?.png", "img/pic1.png"));
        assert!(!matches("img/pic?.png", "img/pic10.png"));
    }

    #[test]
    fn test_literal_dots_escaped() {
        assert!(!matches("*.css", "sitexcss"));
        assert!(matches("*.css", "site.css"));
    }

    #[test]
    fn test_full_match_required() {
        assert!(!matches("css/*.css", "src/css/site.css"));
    }

    #[test]
    fn test_literal_prefix() {
        assert_eq!(GlobPattern::new("css/vendor/**/*.css").unwrap().literal_prefix(), "css/vendor");
        assert_eq!(GlobPattern::new("*.css").unwrap().literal_prefix(), "");
        assert_eq!(GlobPattern::new("static/logo.png").unwrap().literal_prefix(), "static");
    }
}
