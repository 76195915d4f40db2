use super::clip;
use crate::material::FileSection;

const CONTENT_LIMIT_CHARS: usize = 800;
const CONTENT_KEEP_CHARS: usize = 600;

fn format_sections(sections: &[FileSection]) -> String {
    let mut formatted = String::new();
    for section in sections {
        formatted.push_str(&format!(
            "\n--- {} ---\n{}\n",
            section.file_name,
            clip(&section.content, CONTENT_LIMIT_CHARS, CONTENT_KEEP_CHARS)
        ));
    }
    formatted
}

/// Bullet-summary prompt, one `📘` header per section
pub fn build_summary_prompt(sections: &[FileSection]) -> String {
    let names = sections
        .iter()
        .map(|s| s.file_name.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"CRITICAL: You MUST format the response EXACTLY as shown below. Use ONLY bullet points (•) and file headers (📘).

EXAMPLE FORMAT:
📘 File Name 1
• First key point from this file
• Second key point from this file
• Third key point from this file
• Fourth key point from this file

📘 File Name 2
• First key point from this file
• Second key point from this file
• Third key point from this file

RULES:
- Use ONLY bullet points (•) - no numbers, no dashes, no paragraphs
- Each bullet must start with • followed by a space
- Maximum 6-8 bullet points per file
- Keep each bullet point to 1 line
- Include page references like (p.4) when available
- Use the exact file names provided below

FILES TO SUMMARIZE: {names}

CONTENT:
{content}

Now create the summary following EXACTLY the format above. Use ONLY bullet points:"#,
        names = names,
        content = format_sections(sections),
    )
}
