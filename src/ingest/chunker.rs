/// Chunk text with overlap.
///
/// Sizes are in bytes of UTF-8 text, which equals characters for ASCII
/// material. Chunks prefer to end on whitespace or sentence punctuation
/// found in the last 20% of the window. All slices land on character
/// boundaries.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    if text.trim().is_empty() || chunk_size == 0 {
        return Vec::new();
    }

    // Next character boundary at or before a byte position
    let floor_boundary = |byte_pos: usize| -> usize {
        if byte_pos >= text.len() {
            return text.len();
        }
        (0..=byte_pos)
            .rev()
            .find(|&i| text.is_char_boundary(i))
            .unwrap_or(0)
    };

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        start = floor_boundary(start);

        let mut end = floor_boundary((start + chunk_size).min(text.len()));
        if end <= start {
            // Window smaller than one character: take the whole character
            end = text[start..]
                .char_indices()
                .nth(1)
                .map(|(offset, _)| start + offset)
                .unwrap_or(text.len());
        }

        let chunk_end = if end < text.len() {
            let search_start = floor_boundary(end.saturating_sub(chunk_size / 5).max(start));
            text.get(search_start..end)
                .and_then(|window| {
                    window
                        .char_indices()
                        .rev()
                        .find(|(_, c)| c.is_whitespace() || matches!(c, '.' | '!' | '?'))
                        .map(|(offset, c)| search_start + offset + c.len_utf8())
                })
                .filter(|&boundary| boundary > start)
                .unwrap_or(end)
        } else {
            end
        };

        let piece = text[start..chunk_end].trim();
        if !piece.is_empty() {
            chunks.push(piece.to_string());
        }

        if chunk_end >= text.len() {
            break;
        }

        let next_start = floor_boundary(chunk_end.saturating_sub(overlap));
        start = if next_start <= start || next_start >= chunk_end {
            chunk_end
        } else {
            next_start
        };
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_text_with_overlap() {
        let text = "word ".repeat(500);
        let chunks = chunk_text(&text, 1000, 150);

        assert!(chunks.len() >= 3);
        for chunk in &chunks {
            assert!(chunk.len() <= 1000);
        }
        // The tail of one chunk reappears at the head of the next
        let tail: String = chunks[0].chars().rev().take(40).collect::<String>().chars().rev().collect();
        assert!(chunks[1].contains(tail.trim()));
    }

    #[test]
    fn test_chunk_short_text_is_single_chunk() {
        let chunks = chunk_text("Cells are the unit of life.", 1000, 150);
        assert_eq!(chunks, vec!["Cells are the unit of life."]);
    }

    #[test]
    fn test_chunk_empty_text() {
        assert!(chunk_text("", 1000, 150).is_empty());
        assert!(chunk_text("   \n", 1000, 150).is_empty());
    }

    #[test]
    fn test_chunk_multibyte_text() {
        let text = "📚 FILE: émigré.pdf\n".repeat(200);
        let chunks = chunk_text(&text, 97, 13);
        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|c| !c.is_empty()));
    }

    #[test]
    fn test_overlap_larger_than_chunk_terminates() {
        let text = "abcdefghij".repeat(10);
        let chunks = chunk_text(&text, 10, 50);
        assert_eq!(chunks.len(), 10);
    }
}
