use regex::Regex;
use std::sync::LazyLock;

/// `// README_SNIPPET <id> <anything>` on a line of its own, modulo whitespace.
static BOOKEND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*//\s*README_SNIPPET\s+(?P<id>\w+)\s*.*$").expect("bookend pattern is valid")
});

/// A named block of source text captured between two bookend markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snippet {
    id: String,
    text: String,
}

impl Snippet {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_parts(self) -> (String, String) {
        (self.id, self.text)
    }

    /// Scan `source` and return its snippets in the order they were first opened.
    pub fn extract(source: &str, chop: usize) -> Vec<Snippet> {
        let mut scanner = SnippetScanner::new(chop);
        for line in source.split_inclusive('\n') {
            scanner.feed(line);
        }
        scanner.finish()
    }
}

#[derive(Debug, Clone, Copy)]
enum State {
    Outside,
    /// Capturing into `buckets[index]`.
    Inside(usize),
}

/// Line-at-a-time bookend scanner.
///
/// Only one region can be open at a time. While one is open, a marker carrying a
/// different id is dropped: it neither closes the region nor becomes content. A region
/// still open at end of input keeps what it captured. An id that is opened again later
/// keeps appending to the same snippet.
#[derive(Debug)]
pub struct SnippetScanner {
    chop: usize,
    state: State,
    buckets: Vec<(String, String)>,
}

impl SnippetScanner {
    /// `chop` characters are cut from the front of every captured line.
    pub fn new(chop: usize) -> Self {
        Self {
            chop,
            state: State::Outside,
            buckets: Vec::new(),
        }
    }

    /// Feed one line, terminator included.
    pub fn feed(&mut self, line: &str) {
        let terminated = line.strip_suffix('\n');
        let bare = terminated.map_or(line, |l| l.strip_suffix('\r').unwrap_or(l));
        let marker = BOOKEND.captures(bare).map(|caps| caps["id"].to_owned());

        self.state = match (self.state, marker) {
            (State::Outside, Some(id)) => State::Inside(self.bucket(id)),
            (State::Inside(index), Some(id)) if self.buckets[index].0 == id => State::Outside,
            (inside @ State::Inside(_), Some(_)) => inside,
            (State::Inside(index), None) => {
                // Captured lines always end in a bare '\n', whatever the source used.
                let line = match terminated {
                    Some(_) => format!("{bare}\n"),
                    None => bare.to_owned(),
                };
                self.buckets[index].1.push_str(chop_chars(&line, self.chop));
                State::Inside(index)
            }
            (State::Outside, None) => State::Outside,
        };
    }

    pub fn finish(self) -> Vec<Snippet> {
        self.buckets.into_iter().map(|(id, text)| Snippet { id, text }).collect()
    }

    fn bucket(&mut self, id: String) -> usize {
        match self.buckets.iter().position(|(existing, _)| *existing == id) {
            Some(index) => index,
            None => {
                self.buckets.push((id, String::new()));
                self.buckets.len() - 1
            }
        }
    }
}

fn chop_chars(line: &str, n: usize) -> &str {
    line.char_indices().nth(n).map_or("", |(i, _)| &line[i..])
}
