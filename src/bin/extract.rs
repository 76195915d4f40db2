use anyhow::Result;
use clap::Parser;
use coursemate::ingest::{extract_documents, load_directory, ExtractorRegistry, PREVIEW_CHARS};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "extract")]
#[command(about = "Extract text from course material and report per-file word counts")]
struct Args {
    /// Directory holding PDFs, images or text files
    dir: PathBuf,

    /// Characters of each file to preview
    #[arg(short, long, default_value_t = PREVIEW_CHARS)]
    preview: usize,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", "info")
    ).init();

    let args = Args::parse();

    let files = load_directory(&args.dir)?;
    if files.is_empty() {
        println!("No supported files found in {}.", args.dir.display());
        return Ok(());
    }

    let registry = ExtractorRegistry::new();
    let documents = extract_documents(&files, &registry);

    println!("\n=== Coursemate Extraction Report ===\n");
    println!("{:-<60}", "");
    println!("{:<45} {:>12}", "File", "Words");
    println!("{:-<60}", "");
    for doc in &documents {
        println!("{:<45} {:>12}", doc.name, doc.word_count());
    }
    println!("{:-<60}", "");

    let total_words: usize = documents.iter().map(|d| d.word_count()).sum();
    println!("{:<45} {:>12}", "Total", total_words);

    let skipped: Vec<&str> = files
        .iter()
        .map(|f| f.name.as_str())
        .filter(|name| !documents.iter().any(|d| d.name == *name))
        .collect();
    if !skipped.is_empty() {
        println!("\nSkipped (no extractable text): {}", skipped.join(", "));
    }

    for doc in &documents {
        println!("\n📚 {}\n{}", doc.name, doc.preview(args.preview));
    }
    println!();

    Ok(())
}
