use regex::{Regex, RegexBuilder};

use crate::buffer::LogBuffer;

/// Case-insensitive literal search over raw lines
#[derive(Clone, Default)]
pub struct SearchQuery {
    /// Query text as typed
    text: String,

    /// Compiled matcher, `None` for the empty query
    regex: Option<Regex>,

    /// Lowercased text, used if the matcher could not be built
    lowered: String,
}

impl SearchQuery {
    /// Create a query; the empty string matches everything
    pub fn new(text: &str) -> Self {
        let regex = if text.is_empty() {
            None
        } else {
            RegexBuilder::new(&regex::escape(text))
                .case_insensitive(true)
                .build()
                .ok()
        };

        Self {
            text: text.to_string(),
            regex,
            lowered: text.to_lowercase(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Check if the query is empty (identity filter)
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Check if a line contains the query, ignoring case
    pub fn matches(&self, line: &str) -> bool {
        if self.text.is_empty() {
            return true;
        }
        match &self.regex {
            Some(re) => re.is_match(line),
            None => line.to_lowercase().contains(&self.lowered),
        }
    }

    /// Find all match positions in a string (for highlighting)
    pub fn find_matches(&self, text: &str) -> Vec<(usize, usize)> {
        match &self.regex {
            Some(re) => re.find_iter(text).map(|m| (m.start(), m.end())).collect(),
            None => Vec::new(),
        }
    }
}

impl From<&str> for SearchQuery {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl std::fmt::Debug for SearchQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchQuery")
            .field("text", &self.text)
            .finish()
    }
}

/// Subsequence of `lines` matching `query`, in input order
pub fn filter_lines<'a, I>(lines: I, query: &SearchQuery) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    lines.into_iter().filter(|line| query.matches(line)).collect()
}

/// Memoized filter result for one buffer
///
/// Keyed on the buffer's generation and the query text; stores indices into
/// the buffer so no lines are copied.
#[derive(Default)]
pub struct FilterCache {
    key: Option<(u64, String)>,
    indices: Vec<usize>,
}

impl FilterCache {
    /// Check if the cached result is stale for this buffer and query
    pub fn needs_refresh(&self, buffer: &LogBuffer, query: &SearchQuery) -> bool {
        match &self.key {
            Some((generation, text)) => {
                *generation != buffer.generation() || text != query.as_str()
            }
            None => true,
        }
    }

    /// Recompute the cached indices if stale
    pub fn refresh(&mut self, buffer: &LogBuffer, query: &SearchQuery) {
        if !self.needs_refresh(buffer, query) {
            return;
        }

        self.indices = buffer
            .iter()
            .enumerate()
            .filter(|(_, line)| query.matches(line))
            .map(|(i, _)| i)
            .collect();
        self.key = Some((buffer.generation(), query.as_str().to_string()));
    }

    /// Cached indices, if fresh for this buffer and query
    pub fn indices(&self, buffer: &LogBuffer, query: &SearchQuery) -> Option<&[usize]> {
        if self.needs_refresh(buffer, query) {
            None
        } else {
            Some(&self.indices)
        }
    }
}
