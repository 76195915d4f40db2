use super::clip;
use crate::material::FileGroupedContent;

const CONTENT_LIMIT_CHARS: usize = 800;
const CONTENT_KEEP_CHARS: usize = 700;

/// `--- <name> ---` blocks, one per file, content joined by spaces and clipped
pub fn format_grouped_content(grouped: &FileGroupedContent) -> String {
    let mut formatted = String::new();
    for group in grouped.iter() {
        let combined = group.chunks.join(" ");
        formatted.push_str(&format!(
            "\n--- {} ---\n{}\n",
            group.file_name,
            clip(&combined, CONTENT_LIMIT_CHARS, CONTENT_KEEP_CHARS)
        ));
    }
    formatted
}

/// Question-answering prompt over file-grouped retrieved content
pub fn build_rag_prompt(question: &str, grouped: &FileGroupedContent) -> String {
    format!(
        r#"You are an educational assistant. Create a comprehensive explanation using the provided materials.

IMPORTANT RULES:
1. Create ONE clear section for each file that has relevant content
2. Use the exact file names provided
3. Format each file section like this:
   📘 [EXACT FILE NAME]
   (Explained simply — based on your PDF)

   [Content from that file...]

4. Use numbered sections (1., 2., 3.) for main topics
5. Use → for definitions
6. Include specific page references like (p.4) when available
7. Use bullet points for lists
8. Cover the main concepts from each file
9. If a file doesn't have specific information about the query, still include its main topics

USER'S QUESTION: {question}

CONTENT BY FILE:
{content}

Create a comprehensive explanation covering the main content from each file. Include all files that have educational content:"#,
        question = question,
        content = format_grouped_content(grouped),
    )
}
