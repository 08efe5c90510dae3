//! Recursive character text splitter.
//!
//! Splits scraped page text into overlapping chunks for the knowledge
//! store, preferring paragraph boundaries, then line boundaries, then
//! word boundaries, and only falling back to raw character runs for
//! unbroken text. Lengths are counted in characters, not bytes.

/// Splits text into chunks of at most `chunk_size` characters with
/// `chunk_overlap` characters carried between adjacent chunks.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self::new(1000, 200)
    }
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            chunk_overlap: chunk_overlap.min(chunk_size.saturating_sub(1)),
            separators: vec![
                "\n\n".to_string(),
                "\n".to_string(),
                " ".to_string(),
                String::new(),
            ],
        }
    }

    /// Split `text` into overlapping chunks. Whitespace-only chunks are
    /// dropped; empty input yields no chunks.
    pub fn split(&self, text: &str) -> Vec<String> {
        self.split_with(text, &self.separators)
    }

    fn split_with(&self, text: &str, separators: &[String]) -> Vec<String> {
        let (separator, rest) = match separators.split_first() {
            Some((first, rest)) => (first.as_str(), rest),
            None => ("", &[][..]),
        };

        let splits: Vec<String> = if separator.is_empty() {
            text.chars().map(|c| c.to_string()).collect()
        } else {
            text.split(separator).map(|s| s.to_string()).collect()
        };

        let mut chunks = Vec::new();
        let mut pending: Vec<String> = Vec::new();

        for piece in splits {
            if piece.chars().count() <= self.chunk_size {
                pending.push(piece);
                continue;
            }

            if !pending.is_empty() {
                chunks.extend(self.merge(&pending, separator));
                pending.clear();
            }

            if rest.is_empty() {
                // No finer separator left; keep the oversized run whole.
                chunks.push(piece);
            } else {
                chunks.extend(self.split_with(&piece, rest));
            }
        }

        if !pending.is_empty() {
            chunks.extend(self.merge(&pending, separator));
        }

        chunks
    }

    /// Greedily pack small splits into chunks, retaining up to
    /// `chunk_overlap` trailing characters when starting the next chunk.
    fn merge(&self, splits: &[String], separator: &str) -> Vec<String> {
        let sep_len = separator.chars().count();
        let mut chunks = Vec::new();
        let mut window: Vec<String> = Vec::new();
        let mut total = 0usize;

        for piece in splits {
            let piece_len = piece.chars().count();
            let join_cost = if window.is_empty() { 0 } else { sep_len };

            if total + join_cost + piece_len > self.chunk_size && !window.is_empty() {
                push_chunk(&mut chunks, &window.join(separator));

                // Drop leading pieces until the carried tail fits both the
                // overlap budget and the incoming piece.
                while total > self.chunk_overlap
                    || (total + sep_len + piece_len > self.chunk_size && total > 0)
                {
                    let head_len = window[0].chars().count();
                    total -= head_len + if window.len() > 1 { sep_len } else { 0 };
                    window.remove(0);
                }
            }

            total += piece_len + if window.is_empty() { 0 } else { sep_len };
            window.push(piece.clone());
        }

        push_chunk(&mut chunks, &window.join(separator));
        chunks
    }
}

fn push_chunk(chunks: &mut Vec<String>, chunk: &str) {
    let trimmed = chunk.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}
