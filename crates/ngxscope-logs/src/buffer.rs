use std::collections::VecDeque;

/// Default number of lines retained per channel
pub const MAX_LOG_LINES: usize = 1000;

/// Sliding window of raw lines for one channel
///
/// Oldest lines are evicted first once the window is full. Every mutation
/// bumps [`LogBuffer::generation`], which filter caches use as the identity
/// of the current contents.
#[derive(Clone, Debug)]
pub struct LogBuffer {
    /// Internal storage, oldest first
    lines: VecDeque<String>,

    /// Maximum capacity
    capacity: usize,

    /// Mutation counter, never reset
    generation: u64,
}

impl LogBuffer {
    /// Create a new log buffer with the given capacity
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
            generation: 0,
        }
    }

    /// Append one line, evicting the oldest if at capacity
    pub fn push(&mut self, line: String) {
        if self.lines.len() >= self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
        self.generation += 1;
    }

    /// Replace the contents with a fetched snapshot, keeping the newest lines
    pub fn replace(&mut self, lines: Vec<String>) {
        let skip = lines.len().saturating_sub(self.capacity);
        self.lines.clear();
        self.lines.extend(lines.into_iter().skip(skip));
        self.generation += 1;
    }

    /// Clear all lines
    pub fn clear(&mut self) {
        self.lines.clear();
        self.generation += 1;
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Line at `index`, oldest first
    pub fn get(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    /// Iterate lines, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.lines.iter().map(String::as_str)
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(MAX_LOG_LINES)
    }
}
