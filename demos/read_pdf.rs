/// Parses a PDF file and prints its structure summary.
///
/// Run with: cargo run --example read_pdf -- <file.pdf>
use pdf_graph::{Document, Value};

fn main() {
    let Some(path) = std::env::args().nth(1) else {
        eprintln!("Usage: read_pdf <file.pdf>");
        std::process::exit(1);
    };

    let doc = match Document::from_file(&path) {
        Ok(doc) => doc,
        Err(err) => {
            eprintln!("Failed to parse {path}: {err}");
            std::process::exit(1);
        }
    };

    println!("PDF version: {}", doc.version().unwrap_or("unknown"));
    println!("Pages: {}", doc.page_count());

    for page in doc.pages() {
        print!("  page {}: ", page.index() + 1);
        match page.media_box() {
            Some(Value::Array(media_box)) => {
                let dims: Vec<String> = media_box
                    .iter()
                    .map(|v| v.as_number().unwrap_or(f64::NAN).to_string())
                    .collect();
                print!("MediaBox [{}]", dims.join(" "));
            }
            _ => print!("no MediaBox"),
        }
        match page.contents() {
            Some(Value::Stream(stream)) => {
                println!(", {} content bytes", stream.data.len());
            }
            Some(Value::Array(parts)) => println!(", {} content streams", parts.len()),
            _ => println!(", no contents"),
        }
    }
}
