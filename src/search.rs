use regex::{Regex, RegexBuilder};

use crate::classify::CatalogItem;

/// Upper bound on the compiled size of a search pattern built from request input.
const PATTERN_SIZE_LIMIT: usize = 256 * 1024;

/// Ordered, gap tolerant match of whitespace separated tokens against display names.
///
/// `star wars` matches `Star Wars` as well as `Star: A New Wars Hope`, but not `Wars Star`.
#[derive(Debug, Clone)]
pub struct SearchMatcher {
    pattern: Regex,
}

impl SearchMatcher {
    pub fn new(text: &str) -> Result<Self, regex::Error> {
        let pattern = text
            .split_whitespace()
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");

        let pattern = RegexBuilder::new(&pattern)
            .case_insensitive(true)
            .size_limit(PATTERN_SIZE_LIMIT)
            .build()?;

        Ok(Self { pattern })
    }

    pub fn is_match(&self, name: &str) -> bool {
        self.pattern.is_match(name)
    }

    pub fn filter<'a>(&self, items: &'a [CatalogItem]) -> Vec<&'a CatalogItem> {
        items.iter().filter(|item| self.is_match(item.name())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(text: &str) -> SearchMatcher {
        SearchMatcher::new(text).unwrap()
    }

    #[test]
    fn matches_tokens_in_order_case_insensitively() {
        let search = matcher("the matrix");
        assert!(search.is_match("The Matrix Reloaded"));
        assert!(search.is_match("THE MATRIX"));
        assert!(!search.is_match("Matrix Revolutions"));
        assert!(!search.is_match("The Notebook"));

        let search = matcher("matrix");
        assert!(search.is_match("The Matrix Reloaded"));
        assert!(search.is_match("Matrix Revolutions"));
    }

    #[test]
    fn tolerates_gaps_between_tokens() {
        let search = matcher("star wars");
        assert!(search.is_match("Star Wars"));
        assert!(search.is_match("Star: A New Wars Hope"));
        assert!(search.is_match("ROGUE ONE A STAR WARS STORY"));
        assert!(!search.is_match("Wars Star"));
    }

    #[test]
    fn requires_every_token() {
        let search = matcher("blade runner 2049");
        assert!(search.is_match("Blade.Runner.2049.2160p"));
        assert!(!search.is_match("Blade Runner 1982"));
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        let search = matcher("c++ (2020) [x]");
        assert!(search.is_match("Learn C++ (2020) [x] edition"));
        assert!(!search.is_match("Learn C (2020) x"));

        let dot = matcher("a.b");
        assert!(dot.is_match("a.b"));
        assert!(!dot.is_match("axb"));
    }

    #[test]
    fn collapses_runs_of_whitespace() {
        let search = matcher("  the \t  matrix  ");
        assert!(search.is_match("the matrix"));
    }

    #[test]
    fn whitespace_only_matches_everything() {
        assert!(matcher("   ").is_match("anything"));
    }

    #[test]
    fn oversized_search_is_rejected() {
        let text = vec!["ab"; 15_000].join(" ");
        let err = SearchMatcher::new(&text).unwrap_err();
        assert!(matches!(err, regex::Error::CompiledTooBig(_)), "{err}");

        let long_but_sane = vec!["word"; 50].join(" ");
        assert!(SearchMatcher::new(&long_but_sane).is_ok());
    }
}
