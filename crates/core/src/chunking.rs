use crate::error::IngestError;
use crate::models::{Chunk, IngestionOptions, PageDocument};
use sha2::{Digest, Sha256};
use std::collections::VecDeque;
use tracing::info;

/// Cut points tried in order: paragraph break, line break, space, then any character.
pub const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    pub max_chars: usize,
    pub overlap_chars: usize,
}

impl From<&IngestionOptions> for ChunkingConfig {
    fn from(value: &IngestionOptions) -> Self {
        Self {
            max_chars: value.chunk_max_chars,
            overlap_chars: value.chunk_overlap_chars,
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.max_chars == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        if self.overlap_chars >= self.max_chars {
            return Err(IngestError::InvalidChunkConfig(format!(
                "chunk overlap {} must be smaller than chunk size {}",
                self.overlap_chars, self.max_chars
            )));
        }
        Ok(())
    }
}

/// Splits text on the coarsest separator that yields pieces under the size limit,
/// then greedily merges pieces back up to the limit while carrying an overlap tail.
///
/// Lengths are counted in `char`s. Separators stay attached to the start of the
/// piece that follows them; merged chunks are trimmed of surrounding whitespace.
#[derive(Debug, Clone)]
pub struct RecursiveCharacterSplitter {
    config: ChunkingConfig,
    separators: Vec<String>,
}

impl RecursiveCharacterSplitter {
    pub fn new(config: ChunkingConfig) -> Result<Self, IngestError> {
        config.validate()?;
        Ok(Self {
            config,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        })
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut separator = separators.last().map(String::as_str).unwrap_or("");
        let mut finer: &[String] = &[];
        for (index, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = "";
                break;
            }
            if text.contains(candidate.as_str()) {
                separator = candidate.as_str();
                finer = &separators[index + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut fitting: Vec<&str> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.config.max_chars {
                fitting.push(piece);
                continue;
            }

            if !fitting.is_empty() {
                chunks.extend(self.merge_pieces(&fitting));
                fitting.clear();
            }

            if finer.is_empty() {
                chunks.push(piece.to_string());
            } else {
                chunks.extend(self.split_recursive(piece, finer));
            }
        }

        if !fitting.is_empty() {
            chunks.extend(self.merge_pieces(&fitting));
        }

        chunks
    }

    fn merge_pieces(&self, pieces: &[&str]) -> Vec<String> {
        let ChunkingConfig {
            max_chars,
            overlap_chars,
        } = self.config;

        let mut merged = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);

            if total + len > max_chars && !window.is_empty() {
                push_trimmed(&mut merged, &window);

                while total > overlap_chars || (total + len > max_chars && total > 0) {
                    let Some(front) = window.pop_front() else {
                        break;
                    };
                    total -= char_len(front);
                }
            }

            window.push_back(piece);
            total += len;
        }

        push_trimmed(&mut merged, &window);
        merged
    }

    pub fn split_documents(&self, pages: &[PageDocument]) -> Vec<Chunk> {
        let mut chunks = Vec::new();

        for page in pages {
            for (index, text) in self.split_text(&page.text).into_iter().enumerate() {
                chunks.push(Chunk {
                    chunk_id: make_chunk_id(&page.source_path, page.page_number, index, &text),
                    text,
                    page_number: page.page_number,
                    source_path: page.source_path.clone(),
                });
            }
        }

        chunks
    }
}

/// Chunks every page with the configured size and overlap. Chunks never span pages.
pub fn build_chunks(
    pages: &[PageDocument],
    options: &IngestionOptions,
) -> Result<Vec<Chunk>, IngestError> {
    let config = ChunkingConfig::from(options);
    let splitter = RecursiveCharacterSplitter::new(config)?;
    let chunks = splitter.split_documents(pages);

    info!(
        chunks = chunks.len(),
        size = config.max_chars,
        overlap = config.overlap_chars,
        "split pages into chunks"
    );

    Ok(chunks)
}

fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(start, ch)| &text[start..start + ch.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut last = 0;
    for (start, _) in text.match_indices(separator) {
        pieces.push(&text[last..start]);
        last = start;
    }
    pieces.push(&text[last..]);

    pieces.retain(|piece| !piece.is_empty());
    pieces
}

fn push_trimmed(target: &mut Vec<String>, window: &VecDeque<&str>) {
    let joined = window.iter().copied().collect::<String>();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        target.push(trimmed.to_string());
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn make_chunk_id(source_path: &str, page: u32, index: usize, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_path.as_bytes());
    hasher.update(page.to_le_bytes());
    hasher.update((index as u64).to_le_bytes());
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn splitter(max_chars: usize, overlap_chars: usize) -> RecursiveCharacterSplitter {
        RecursiveCharacterSplitter::new(ChunkingConfig {
            max_chars,
            overlap_chars,
        })
        .unwrap()
    }

    fn page(number: u32, text: &str) -> PageDocument {
        PageDocument {
            text: text.to_string(),
            source_path: "/tmp/doc.pdf".to_string(),
            page_number: number,
        }
    }

    #[test]
    fn text_without_separators_falls_back_to_character_slices() {
        let text: String = (0..1200).map(|i| (b'a' + (i % 26) as u8) as char).collect();

        let chunks = splitter(500, 100).split_text(&text);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], text[0..500]);
        assert_eq!(chunks[1], text[400..900]);
        assert_eq!(chunks[2], text[800..1200]);
    }

    #[test]
    fn long_line_of_words_yields_three_overlapping_chunks_without_gaps() {
        let text = (0..200)
            .map(|i| format!("w{i:04}"))
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(text.len(), 1199);

        let chunks = splitter(500, 100).split_text(&text);
        assert_eq!(chunks.len(), 3);

        let mut previous_end = 0;
        for (index, chunk) in chunks.iter().enumerate() {
            assert!(chunk.chars().count() <= 500);
            let offset = text.find(chunk.as_str()).expect("chunk is a substring");
            if index == 0 {
                assert_eq!(offset, 0);
            } else {
                assert!(offset < previous_end, "chunks must overlap");
                assert!(previous_end - offset <= 100);
            }
            previous_end = offset + chunk.len();
        }
        assert_eq!(previous_end, text.len());
    }

    #[test]
    fn paragraph_breaks_are_preferred_over_finer_cuts() {
        let text = "alpha beta gamma delta\n\nepsilon zeta eta theta";

        let chunks = splitter(30, 5).split_text(text);

        assert_eq!(chunks, vec!["alpha beta gamma delta", "epsilon zeta eta theta"]);
    }

    #[test]
    fn chunks_respect_size_on_mixed_text() {
        let sentence = "The pump delivers 40 bar at 1500 rpm under nominal load.";
        let text = (0..30)
            .map(|i| {
                if i % 5 == 0 {
                    format!("{sentence}\n\n")
                } else if i % 3 == 0 {
                    format!("{sentence}\n")
                } else {
                    format!("{sentence} ")
                }
            })
            .collect::<String>();

        let chunks = splitter(120, 20).split_text(&text);

        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|chunk| chunk.chars().count() <= 120));
        assert!(chunks.iter().all(|chunk| !chunk.trim().is_empty()));
    }

    #[test]
    fn multibyte_text_is_cut_on_char_boundaries() {
        let text = "é".repeat(25);

        let chunks = splitter(10, 2).split_text(&text);

        assert!(chunks.iter().all(|chunk| chunk.chars().count() <= 10));
        assert_eq!(chunks[1].chars().take(2).collect::<String>(), "éé");
    }

    #[test]
    fn chunks_keep_their_page_and_never_span_pages() {
        let pages = vec![page(1, "short first page"), page(3, &"x".repeat(25))];

        let chunks = splitter(10, 2).split_documents(&pages);

        let boundary = chunks
            .iter()
            .position(|chunk| chunk.page_number == 3)
            .expect("page 3 has chunks");
        assert!(boundary > 0);
        assert!(chunks[..boundary].iter().all(|chunk| chunk.page_number == 1));
        assert!(chunks[boundary..].iter().all(|chunk| chunk.page_number == 3));
        assert!(chunks
            .iter()
            .filter(|chunk| chunk.page_number == 3)
            .all(|chunk| chunk.text.chars().all(|ch| ch == 'x')));
        assert!(chunks.iter().all(|chunk| chunk.source_path == "/tmp/doc.pdf"));
    }

    #[test]
    fn chunk_ids_are_stable() {
        let pages = vec![page(2, "some page text")];
        let first = splitter(50, 10).split_documents(&pages);
        let second = splitter(50, 10).split_documents(&pages);
        assert_eq!(first[0].chunk_id, second[0].chunk_id);
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let zero = RecursiveCharacterSplitter::new(ChunkingConfig {
            max_chars: 0,
            overlap_chars: 0,
        });
        assert!(matches!(zero, Err(IngestError::InvalidChunkConfig(_))));

        let overlap = build_chunks(
            &[page(1, "text")],
            &IngestionOptions {
                chunk_max_chars: 100,
                chunk_overlap_chars: 100,
            },
        );
        assert!(matches!(overlap, Err(IngestError::InvalidChunkConfig(_))));
    }
}
