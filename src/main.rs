use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use docxide_ooxml::model::{Node, PageType};
use docxide_ooxml::{Document, Validator};

#[derive(Parser)]
#[command(name = "docxide-ooxml")]
#[command(version, about = "Inspect the structure of a DOCX package", long_about = None)]
struct Cli {
    /// Input DOCX file
    input: PathBuf,

    /// Run the structural validator and report its findings
    #[arg(long)]
    validate: bool,

    /// List the style definitions of the package
    #[arg(long)]
    styles: bool,
}

#[derive(Default)]
struct Counts {
    paragraphs: usize,
    runs: usize,
    tables: usize,
    lists: usize,
    images: usize,
    shapes: usize,
}

fn count(nodes: &[Node], counts: &mut Counts) {
    for node in nodes {
        match node {
            Node::Paragraph(p) => {
                counts.paragraphs += 1;
                count(&p.children, counts);
            }
            Node::Run(_) => counts.runs += 1,
            Node::Table(t) => {
                counts.tables += 1;
                for cell in t.rows.iter().flat_map(|r| &r.cells) {
                    count(&cell.children, counts);
                }
            }
            Node::List(l) => {
                counts.lists += 1;
                for item in &l.items {
                    count(&item.children, counts);
                }
            }
            Node::Image(_) => counts.images += 1,
            Node::Shape(s) => {
                counts.shapes += 1;
                count(&s.children, counts);
            }
        }
    }
}

fn print_summary(doc: &Document) {
    let mut counts = Counts::default();
    count(&doc.nodes, &mut counts);
    println!(
        "{} paragraphs, {} runs, {} tables, {} lists, {} images, {} shapes",
        counts.paragraphs, counts.runs, counts.tables, counts.lists, counts.images, counts.shapes
    );
    for (i, section) in doc.sections.iter().enumerate() {
        let size = match section.page_dimensions() {
            Some((w, h)) => format!("{w:.1}x{h:.1}pt"),
            None => "unknown size".to_string(),
        };
        println!(
            "section {i}: {:?} {:?} {size}, margins {:.1}/{:.1}/{:.1}/{:.1}pt",
            section.page_size,
            section.orientation,
            section.margin_top,
            section.margin_right,
            section.margin_bottom,
            section.margin_left,
        );
    }
    for hf in &doc.headers_footers {
        let page = match hf.page_type {
            PageType::Default => "default",
            PageType::First => "first",
            PageType::Even => "even",
        };
        println!("{:?} ({page}): {} ({} nodes)", hf.kind, hf.part, hf.nodes.len());
    }
    for font in &doc.fonts {
        println!(
            "embedded font: {} bold={} italic={} ({} bytes)",
            font.family,
            font.bold,
            font.italic,
            font.data.len()
        );
    }
}

fn print_styles(bytes: &[u8]) -> docxide_ooxml::Result<()> {
    let catalog = docxide_ooxml::docx::load_styles(bytes)?;
    let mut styles: Vec<_> = catalog.iter().collect();
    styles.sort_by(|a, b| a.id.cmp(&b.id));
    for style in styles {
        let based_on = style
            .based_on
            .as_deref()
            .map(|b| format!(" <- {b}"))
            .unwrap_or_default();
        let default = if style.is_default { " (default)" } else { "" };
        println!("{:?} {}{based_on}{default}", style.kind, style.id);
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let bytes = match std::fs::read(&cli.input) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error: {}: {e}", cli.input.display());
            return ExitCode::FAILURE;
        }
    };
    let doc = match docxide_ooxml::load(&bytes) {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    print_summary(&doc);

    if cli.styles
        && let Err(e) = print_styles(&bytes)
    {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }

    if cli.validate {
        let mut validator = Validator::new();
        let ok = validator.validate(&doc);
        for issue in &validator.warnings {
            println!("warning: {issue}");
        }
        for issue in &validator.errors {
            println!("error: {issue}");
        }
        if !ok {
            return ExitCode::FAILURE;
        }
    }

    ExitCode::SUCCESS
}
