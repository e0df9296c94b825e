//! Fixed-size overlapping chunk splitter
//!
//! Sizes are counted in characters so a chunk never cuts a UTF-8 code point.
//! Consecutive chunks share `overlap` characters; the last chunk ends at the
//! end of the text.

use crate::error::AgentError;
use crate::models::TransactionChunk;
use crate::Result;

#[derive(Debug, Clone, Copy)]
pub struct ChunkSplitter {
    chunk_size: usize,
    overlap: usize,
}

impl ChunkSplitter {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(AgentError::ConfigError(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        if overlap >= chunk_size {
            return Err(AgentError::ConfigError(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                overlap, chunk_size
            )));
        }

        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split `text` into chunks in order of appearance.
    pub fn split(&self, text: &str) -> Vec<TransactionChunk> {
        // Byte offset of every char boundary, including the end of the text.
        let boundaries: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let char_count = boundaries.len() - 1;
        let stride = self.chunk_size - self.overlap;

        let mut chunks = Vec::with_capacity(char_count / stride + 1);
        let mut first = 0;

        while first < char_count {
            let last = (first + self.chunk_size).min(char_count);
            let (start, end) = (boundaries[first], boundaries[last]);

            chunks.push(TransactionChunk {
                position: chunks.len(),
                text: text[start..end].to_string(),
                start,
                end,
            });

            if last == char_count {
                break;
            }
            first += stride;
        }

        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Stitch chunks back together, skipping the bytes each chunk shares
    /// with its predecessor.
    fn rejoin(chunks: &[TransactionChunk]) -> String {
        let mut out = String::new();
        let mut covered: usize = 0;
        for chunk in chunks {
            let skip = covered.saturating_sub(chunk.start);
            out.push_str(&chunk.text[skip..]);
            covered = chunk.end;
        }
        out
    }

    #[test]
    fn test_rejects_degenerate_configuration() {
        assert!(matches!(
            ChunkSplitter::new(0, 0),
            Err(AgentError::ConfigError(_))
        ));
        assert!(matches!(
            ChunkSplitter::new(100, 100),
            Err(AgentError::ConfigError(_))
        ));
        assert!(matches!(
            ChunkSplitter::new(100, 250),
            Err(AgentError::ConfigError(_))
        ));
        assert!(ChunkSplitter::new(100, 99).is_ok());
    }

    #[test]
    fn test_empty_text_has_no_chunks() {
        let splitter = ChunkSplitter::new(10, 2).unwrap();
        assert!(splitter.split("").is_empty());
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let splitter = ChunkSplitter::new(1000, 200).unwrap();
        let text = "2024-01-05,Groceries,54.20\n2024-01-12,Groceries,30.10";
        let chunks = splitter.split(text);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, text);
        assert_eq!(chunks[0].byte_range(), 0..text.len());
    }

    #[test]
    fn test_overlap_between_neighbours() {
        let splitter = ChunkSplitter::new(4, 1).unwrap();
        let chunks = splitter.split("abcdefghij");
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();

        assert_eq!(texts, vec!["abcd", "defg", "ghij"]);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.position, i);
        }
    }

    #[test]
    fn test_deterministic() {
        let splitter = ChunkSplitter::new(7, 3).unwrap();
        let text = "2024-02-01,Rent,1200.00\n2024-02-03,Coffee,4.50\n";
        assert_eq!(splitter.split(text), splitter.split(text));
    }

    #[test]
    fn test_multibyte_characters_stay_whole() {
        let splitter = ChunkSplitter::new(3, 1).unwrap();
        let text = "café€ü£x";
        let chunks = splitter.split(text);

        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 3);
            assert_eq!(&text[chunk.byte_range()], chunk.text);
        }
        assert_eq!(rejoin(&chunks), text);
    }

    #[test]
    fn test_rejoin_reproduces_source() {
        let texts = [
            "a",
            "abcdefghijklmnopqrstuvwxyz",
            "2024-01-05,Groceries,54.20\n2024-01-12,Groceries,30.10\n2024-01-15,Fuel,61.00\n",
            "ünïcödé,ŧëxŧ,€12.00\r\n日本,食料品,¥3400\r\n",
        ];
        let settings = [(1, 0), (2, 1), (5, 0), (5, 4), (8, 3), (1000, 200)];

        for text in texts {
            for (size, overlap) in settings {
                let splitter = ChunkSplitter::new(size, overlap).unwrap();
                let chunks = splitter.split(text);
                assert_eq!(
                    rejoin(&chunks),
                    text,
                    "size={} overlap={}",
                    size,
                    overlap
                );
                assert!(chunks.windows(2).all(|w| w[0].start < w[1].start));
            }
        }
    }

    proptest! {
        #[test]
        fn test_rejoin_reproduces_any_text(
            text in "(\\PC|\n|\r\n){0,300}",
            size in 1usize..64,
            overlap_seed in 0usize..64,
        ) {
            let overlap = overlap_seed % size;
            let splitter = ChunkSplitter::new(size, overlap).unwrap();
            let chunks = splitter.split(&text);

            prop_assert_eq!(rejoin(&chunks), text.clone());
            for (i, chunk) in chunks.iter().enumerate() {
                prop_assert_eq!(chunk.position, i);
                prop_assert!(chunk.text.chars().count() <= size);
                prop_assert_eq!(&text[chunk.byte_range()], chunk.text.as_str());
            }
        }
    }
}
