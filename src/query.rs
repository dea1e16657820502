use crate::stremio::ACTIONS_GENRE;

/// Search, skip and genre directives carried in the catalog `extra` path segment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryDirectives {
    pub search: Option<String>,
    pub skip: usize,
    pub genre: Option<String>,
}

impl QueryDirectives {
    /// Parses `search=...&skip=...&genre=...`. Unknown keys and malformed values are ignored;
    /// the first occurrence of a key wins.
    pub fn parse(extra: &str) -> Self {
        let mut directives = Self::default();
        let mut seen_search = false;
        let mut seen_skip = false;
        let mut seen_genre = false;

        for (key, value) in url::form_urlencoded::parse(extra.trim().as_bytes()) {
            match &*key {
                "search" if !seen_search => {
                    seen_search = true;
                    if !value.trim().is_empty() {
                        directives.search = Some(value.into_owned());
                    }
                }
                "skip" if !seen_skip => {
                    seen_skip = true;
                    directives.skip = parse_skip(&value);
                }
                "genre" if !seen_genre => {
                    seen_genre = true;
                    if !value.is_empty() {
                        directives.genre = Some(value.into_owned());
                    }
                }
                _ => {}
            }
        }

        directives
    }

    pub fn wants_actions(&self) -> bool {
        self.genre.as_deref() == Some(ACTIONS_GENRE)
    }
}

fn parse_skip(value: &str) -> usize {
    value
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(|skip| usize::try_from(skip.max(0)).ok())
        .unwrap_or(0)
}
