use std::borrow::Cow;

const CONDENSE_THRESHOLD_CHARS: usize = 6000;
const CONDENSE_EDGE_CHARS: usize = 3000;
const CONTINUATION: &str = "\n...[content continues]...\n";

/// Material longer than 6000 characters keeps its first and last 3000
pub fn condense_material(material: &str) -> Cow<'_, str> {
    let total = material.chars().count();
    if total <= CONDENSE_THRESHOLD_CHARS {
        return Cow::Borrowed(material);
    }

    let head_end = material
        .char_indices()
        .nth(CONDENSE_EDGE_CHARS)
        .map(|(idx, _)| idx)
        .unwrap_or(material.len());
    let tail_start = material
        .char_indices()
        .nth(total - CONDENSE_EDGE_CHARS)
        .map(|(idx, _)| idx)
        .unwrap_or(material.len());

    Cow::Owned(format!(
        "{}{}{}",
        &material[..head_end],
        CONTINUATION,
        &material[tail_start..]
    ))
}

/// Single multiple-choice question prompt over the whole material
pub fn build_quiz_prompt(material: &str) -> String {
    format!(
        r#"
Create ONE multiple-choice question based on the provided material from ALL files/chapters.

IMPORTANT RULES:
- Generate exactly 1 question with 4 choices (A, B, C, D)
- Make sure all choices are plausible but only one is correct
- Base everything strictly on the provided material from ALL files
- Draw questions from content across ALL chapters/files
- Keep explanation concise (2-3 lines)
- Ensure the question tests understanding of key concepts from the entire material

MATERIAL:
{material}

FORMAT EXACTLY LIKE THIS - NO DEVIATIONS:
QUESTION: [Your question here?]
A) [Choice A]
B) [Choice B]
C) [Choice C]
D) [Choice D]
CORRECT: [A/B/C/D]
EXPLANATION: [Brief explanation here in 2-3 lines]
"#,
        material = condense_material(material),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_material_is_untouched() {
        let text = "x".repeat(6000);
        assert!(matches!(condense_material(&text), Cow::Borrowed(_)));
    }

    #[test]
    fn test_long_material_keeps_both_ends() {
        let text = format!("{}{}{}", "h".repeat(3000), "m".repeat(10), "t".repeat(3000));
        let condensed = condense_material(&text);
        assert_eq!(
            condensed,
            format!("{}{}{}", "h".repeat(3000), CONTINUATION, "t".repeat(3000))
        );
    }

    #[test]
    fn test_condense_counts_characters_not_bytes() {
        let text = "é".repeat(6001);
        let condensed = condense_material(&text);
        assert_eq!(condensed.chars().filter(|c| *c == 'é').count(), 6000);
    }

    #[test]
    fn test_quiz_prompt_contains_format_block() {
        let prompt = build_quiz_prompt("Cells divide.");
        assert!(prompt.contains("MATERIAL:\nCells divide.\n"));
        assert!(prompt.contains("CORRECT: [A/B/C/D]"));
        assert!(prompt.contains("EXPLANATION:"));
    }
}
