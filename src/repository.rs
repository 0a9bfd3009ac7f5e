use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::trace;

/// Coarse render-order bucket within a Repository.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    First,
    Middle,
    #[default]
    Last,
}

impl Position {
    pub const ALL: [Position; 3] = [Position::First, Position::Middle, Position::Last];

    pub fn as_str(self) -> &'static str {
        match self {
            Position::First => "first",
            Position::Middle => "middle",
            Position::Last => "last",
        }
    }

    fn index(self) -> usize {
        match self {
            Position::First => 0,
            Position::Middle => 1,
            Position::Last => 2,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const WRAP_PLACEHOLDER: &str = "%s";
const INDENT: &str = "    ";

/// Position-ordered accumulator of code fragments for one output group.
#[derive(Debug, Clone)]
pub struct Repository {
    name: String,
    buckets: [Vec<Vec<String>>; 3],
    wrapper: Option<String>,
    wrap_size: usize,
    included: bool,
}

impl Repository {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            buckets: Default::default(),
            wrapper: None,
            wrap_size: 1,
            included: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Format string with a single `%s` for the assembled body.
    pub fn set_wrapper(&mut self, wrapper: impl Into<String>) -> &mut Self {
        self.wrapper = Some(trim_blank_lines(&normalize_eol(&wrapper.into())).join("\n"));
        self
    }

    pub fn wrapper(&self) -> Option<&str> {
        self.wrapper.as_deref()
    }

    /// Indentation depth (in four-space levels) of the wrapped body.
    pub fn set_wrap_size(&mut self, size: usize) -> &mut Self {
        self.wrap_size = size;
        self
    }

    pub fn clear(&mut self) -> &mut Self {
        self.buckets = Default::default();
        self.included = false;
        self
    }

    /// Appends a fragment. Line endings are normalized and leading/trailing
    /// blank lines dropped; an all-blank fragment is ignored.
    pub fn add(&mut self, content: &str, position: Position) -> &mut Self {
        let normalized = normalize_eol(content);
        let lines = trim_blank_lines(&normalized);
        if lines.is_empty() {
            return self;
        }
        trace!("repository {}: {} line(s) at {position}", self.name, lines.len());
        self.buckets[position.index()].push(lines.into_iter().map(str::to_string).collect());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(Vec::is_empty)
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        Position::ALL
            .into_iter()
            .flat_map(move |p| self.buckets[p.index()].iter())
            .flatten()
            .map(String::as_str)
    }

    /// Renders first, middle, then last content joined by `eol`, wrapped when
    /// a wrapper with a `%s` placeholder is set.
    pub fn render(&self, eol: &str) -> String {
        if self.is_empty() {
            return String::new();
        }

        match self.wrapper.as_deref().filter(|w| w.contains(WRAP_PLACEHOLDER)) {
            Some(wrapper) => {
                let indent = INDENT.repeat(self.wrap_size);
                let body = self
                    .lines()
                    .map(|l| if l.trim().is_empty() { String::new() } else { format!("{indent}{l}") })
                    .collect::<Vec<_>>()
                    .join(eol);
                let wrapper = wrapper.replace('\n', eol);
                wrapper.replacen(WRAP_PLACEHOLDER, &format!("{eol}{body}{eol}"), 1)
            }
            None => self.lines().collect::<Vec<_>>().join(eol),
        }
    }

    /// One-shot emission: the first call returns the rendered text, later
    /// calls return `None` until the repository is cleared.
    pub fn take_content(&mut self, eol: &str) -> Option<String> {
        if self.included {
            return None;
        }
        self.included = true;
        Some(self.render(eol))
    }
}

fn normalize_eol(content: &str) -> String {
    content.replace("\r\n", "\n").replace('\r', "\n")
}

fn trim_blank_lines(content: &str) -> Vec<&str> {
    let lines: Vec<&str> = content.split('\n').collect();
    let start = lines.iter().position(|l| !l.trim().is_empty());
    let end = lines.iter().rposition(|l| !l.trim().is_empty());
    match (start, end) {
        (Some(s), Some(e)) => lines[s..=e].to_vec(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positions_render_in_bucket_order() {
        let mut repo = Repository::new("r");
        repo.add("last1", Position::Last)
            .add("mid1", Position::Middle)
            .add("first1", Position::First)
            .add("last2", Position::Last)
            .add("first2", Position::First);
        assert_eq!(repo.render("\n"), "first1\nfirst2\nmid1\nlast1\nlast2");
    }

    #[test]
    fn test_add_strips_outer_blank_lines_only() {
        let mut repo = Repository::new("r");
        repo.add("\r\n\n  a();\r\n\r\n  b();\n\n", Position::Last);
        assert_eq!(repo.render("\n"), "  a();\n\n  b();");
        assert_eq!(repo.render("\r\n"), "  a();\r\n\r\n  b();");
    }

    #[test]
    fn test_blank_fragment_is_ignored() {
        let mut repo = Repository::new("r");
        repo.add("\n \n", Position::First);
        assert!(repo.is_empty());
        assert_eq!(repo.render("\n"), "");
    }

    #[test]
    fn test_take_content_is_one_shot() {
        let mut repo = Repository::new("r");
        repo.add("x();", Position::Last);
        assert_eq!(repo.take_content("\n").as_deref(), Some("x();"));
        assert_eq!(repo.take_content("\n"), None);
        repo.clear();
        assert_eq!(repo.take_content("\n").as_deref(), Some(""));
    }

    #[test]
    fn test_wrapper_indents_body() {
        let mut repo = Repository::new("jquery");
        repo.set_wrapper("\n(function($) {%s})(jQuery);\n");
        repo.add("a();\n\nb();", Position::Last);
        assert_eq!(repo.render("\n"), "(function($) {\n    a();\n\n    b();\n})(jQuery);");

        repo.set_wrap_size(2);
        assert_eq!(repo.render("\n"), "(function($) {\n        a();\n\n        b();\n})(jQuery);");
    }

    #[test]
    fn test_wrapper_without_placeholder_is_ignored() {
        let mut repo = Repository::new("r");
        repo.set_wrapper("no placeholder");
        repo.add("x();", Position::Last);
        assert_eq!(repo.render("\n"), "x();");
    }

    #[test]
    fn test_empty_repository_is_not_wrapped() {
        let mut repo = Repository::new("r");
        repo.set_wrapper("(%s)");
        assert_eq!(repo.render("\n"), "");
    }
}
