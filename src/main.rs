//! pagewright - EPUB reading core CLI

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use pagewright::layout::PositionedElement;
use pagewright::rsvp::{CancelToken, Pulse, PulseEvent};
use pagewright::{
    DirCoverStore, FixedAdvanceMeasurer, PulsePlayer, ReaderConfig, ReadingSession, WordInfo,
    extract_cover, load_config, parse_book, parse_book_report, search,
};

#[derive(Parser)]
#[command(name = "pagewright")]
#[command(version, about = "Parse, paginate and speed-read EPUB books", long_about = None)]
#[command(after_help = "EXAMPLES:
    pagewright info book.epub                  Show metadata and chapter count
    pagewright pages book.epub --page 3        Print the fourth page
    pagewright search book.epub whale          Find every occurrence
    pagewright pulse book.epub --wpm 450       Print RSVP timing")]
struct Cli {
    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show title, author and chapter summary
    Info {
        #[arg(value_name = "BOOK")]
        book: PathBuf,
    },
    /// List chapters that have titles
    Toc {
        #[arg(value_name = "BOOK")]
        book: PathBuf,
    },
    /// Paginate the book and show a page
    Pages {
        #[arg(value_name = "BOOK")]
        book: PathBuf,
        /// Reader configuration (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Zero-based page to print
        #[arg(short, long)]
        page: Option<usize>,
    },
    /// Case-insensitive full-text search
    Search {
        #[arg(value_name = "BOOK")]
        book: PathBuf,
        query: String,
    },
    /// Emit RSVP words with pivot and timing
    Pulse {
        #[arg(value_name = "BOOK")]
        book: PathBuf,
        /// Words per minute (defaults to the configured value)
        #[arg(short, long)]
        wpm: Option<u32>,
        /// Global index of the first word
        #[arg(short, long, default_value_t = 0)]
        start: usize,
        /// Maximum number of words
        #[arg(short = 'n', long, default_value_t = 50)]
        count: usize,
        /// Pace output in real time
        #[arg(long)]
        realtime: bool,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Extract the cover image into a directory
    Cover {
        #[arg(value_name = "BOOK")]
        book: PathBuf,
        #[arg(short, long)]
        out: PathBuf,
        /// File stem for the stored cover (defaults to the book's stem)
        #[arg(long)]
        id: Option<String>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "pagewright=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Info { book } => show_info(&book, cli.json),
        Command::Toc { book } => show_toc(&book, cli.json),
        Command::Pages { book, config, page } => show_pages(&book, config.as_deref(), page, cli.json),
        Command::Search { book, query } => run_search(&book, &query, cli.json),
        Command::Pulse {
            book,
            wpm,
            start,
            count,
            realtime,
            config,
        } => run_pulse(&book, config.as_deref(), wpm, start, count, realtime, cli.json),
        Command::Cover { book, out, id } => run_cover(&book, &out, id),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), String> {
    let text = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{text}");
    Ok(())
}

fn reader_config(path: Option<&Path>) -> ReaderConfig {
    path.map(load_config).unwrap_or_default()
}

#[derive(Serialize)]
struct InfoSummary<'a> {
    title: &'a str,
    author: &'a str,
    chapters: usize,
    listed_chapters: usize,
    toc_entries: usize,
    skipped: Vec<String>,
}

fn show_info(path: &Path, json: bool) -> Result<(), String> {
    let report = parse_book_report(path).map_err(|e| e.to_string())?;
    let doc = &report.document;
    let summary = InfoSummary {
        title: &doc.title,
        author: &doc.author,
        chapters: doc.chapters.len(),
        listed_chapters: doc.table_of_contents().count(),
        toc_entries: report.toc.len(),
        skipped: report.skipped.iter().map(ToString::to_string).collect(),
    };

    if json {
        return print_json(&summary);
    }

    println!("File: {}", path.display());
    println!("Title: {}", summary.title);
    println!("Author: {}", summary.author);
    println!("Chapters: {} ({} listed)", summary.chapters, summary.listed_chapters);
    println!("TOC entries: {}", summary.toc_entries);
    for skipped in &summary.skipped {
        println!("Skipped: {skipped}");
    }
    Ok(())
}

fn show_toc(path: &Path, json: bool) -> Result<(), String> {
    let doc = parse_book(path).map_err(|e| e.to_string())?;
    let entries: Vec<(usize, &str)> = doc
        .table_of_contents()
        .map(|(i, chapter)| (i, chapter.title.as_str()))
        .collect();

    if json {
        return print_json(&entries);
    }
    for (index, title) in entries {
        println!("{index:>4}  {title}");
    }
    Ok(())
}

fn open_session(path: &Path, config: ReaderConfig) -> Result<ReadingSession, String> {
    let doc = parse_book(path).map_err(|e| e.to_string())?;
    ReadingSession::new(doc, config, Arc::new(FixedAdvanceMeasurer::default()))
        .map_err(|e| e.to_string())
}

fn show_pages(
    path: &Path,
    config: Option<&Path>,
    page: Option<usize>,
    json: bool,
) -> Result<(), String> {
    let mut session = open_session(path, reader_config(config))?;
    let Some(index) = page else {
        if json {
            return print_json(session.pages());
        }
        println!("Pages: {}", session.page_count());
        return Ok(());
    };

    if index >= session.page_count() {
        return Err(format!(
            "page {index} out of range ({} pages)",
            session.page_count()
        ));
    }
    session.go_to_page(index);
    let Some(page) = session.page() else {
        return Err("book has no pages".to_string());
    };
    if json {
        return print_json(page);
    }

    println!(
        "Page {} of {} ({:.1}%)",
        index + 1,
        session.page_count(),
        session.progress() * 100.0
    );
    for part in &page.parts {
        match &part.element {
            PositionedElement::Text { text, .. } => println!("{}", text.trim_end()),
            PositionedElement::Image { image, .. } => {
                println!("[image: {}]", image.resource_path)
            }
            PositionedElement::Table { rows, first_row, .. } => {
                for (i, row) in rows.iter().enumerate() {
                    let cells: Vec<String> = row.cells.iter().map(|c| c.text()).collect();
                    println!("{:>3} | {}", first_row + i, cells.join(" | "));
                }
            }
        }
    }
    Ok(())
}

fn run_search(path: &Path, query: &str, json: bool) -> Result<(), String> {
    let doc = parse_book(path).map_err(|e| e.to_string())?;
    let results = search(&doc, query);
    if json {
        return print_json(&results);
    }
    for r in &results {
        println!("{}:{}  {}", r.chapter_index, r.element_index, r.snippet);
    }
    println!("{} matches", results.len());
    Ok(())
}

fn run_pulse(
    path: &Path,
    config: Option<&Path>,
    wpm: Option<u32>,
    start: usize,
    count: usize,
    realtime: bool,
    json: bool,
) -> Result<(), String> {
    let config = reader_config(config);
    let wpm = wpm.unwrap_or(config.rsvp.wpm);
    let session = open_session(path, config)?;
    let all = session.words();
    let end = start.saturating_add(count).min(all.len());
    let words: Arc<[WordInfo]> = all.get(..end).unwrap_or_default().into();

    let print = move |event: &PulseEvent| match event {
        PulseEvent::Word { word, index } if json => {
            if let Ok(line) = serde_json::to_string(&(index, word)) {
                println!("{line}");
            }
        }
        PulseEvent::Word { word, index } => {
            let text = &word.word;
            let marked = match text.char_indices().nth(word.pivot_index) {
                Some((i, c)) => {
                    let rest = i + c.len_utf8();
                    format!("{}[{c}]{}", &text[..i], &text[rest..])
                }
                None => text.clone(),
            };
            println!("{index:>6}  {marked}  {}ms", word.delay_ms);
        }
        PulseEvent::Finished if !json => println!("-- finished --"),
        PulseEvent::Finished => {}
    };

    if realtime {
        PulsePlayer::start(words, start, wpm, Box::new(print)).wait();
    } else {
        Pulse::new(words, start, wpm, CancelToken::new()).for_each(|event| print(&event));
    }
    Ok(())
}

fn run_cover(path: &Path, out: &Path, id: Option<String>) -> Result<(), String> {
    let id = id
        .or_else(|| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "cover".to_string());
    let store = DirCoverStore::new(out);
    match extract_cover(path, &id, &store) {
        Some(saved) => {
            println!("{}", saved.display());
            Ok(())
        }
        None => Err("no cover found".to_string()),
    }
}
