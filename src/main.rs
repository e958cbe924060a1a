//! recital - read EPUB books aloud, one sentence at a time

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc::{self, UnboundedSender};

use recital::{
    Archive, ImportOutcome, MemoryLibrary, PlaybackConfig, PlaybackEngine, PlaybackState,
    SettingsLayers, SpeechEvent, Speaker, Utterance, chapter_sentences, import_book, read_book,
};

#[derive(Parser)]
#[command(name = "recital")]
#[command(version, about = "Read EPUB books aloud, one sentence at a time", long_about = None)]
#[command(after_help = "EXAMPLES:
    recital info book.epub                   Show metadata and chapters
    recital sentences book.epub -c 3         Print the sentences of chapter 3
    recital read book.epub --from-chapter 2  Read aloud to the console")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show title, author, cover and chapter list
    Info {
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },
    /// Print the sentences a chapter would be read as
    Sentences {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Chapter index (0-based); all chapters when omitted
        #[arg(short, long)]
        chapter: Option<usize>,
    },
    /// Play the book through a console speaker
    Read {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Chapter index (0-based) to start from
        #[arg(long, default_value_t = 0)]
        from_chapter: usize,

        /// Voice settings JSON file
        #[arg(long, value_name = "PATH")]
        settings: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Info { input } => show_info(&input),
        Command::Sentences { input, chapter } => show_sentences(&input, chapter),
        Command::Read {
            input,
            from_chapter,
            settings,
        } => read_aloud(&input, from_chapter, settings.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn show_info(path: &Path) -> Result<(), String> {
    let book = read_book(path).map_err(|e| e.to_string())?;

    println!("File: {}", path.display());
    println!("Title: {}", book.title);
    println!("Author: {}", book.author);
    match &book.cover {
        Some(cover) => println!("Cover: {} ({} bytes)", cover.media_type, cover.data.len()),
        None => println!("Cover: none"),
    }
    println!("Chapters: {}", book.chapters.len());
    for chapter in &book.chapters {
        println!("  {:>3}  {}  ({})", chapter.spine_index, chapter.title, chapter.href);
    }

    Ok(())
}

fn show_sentences(path: &Path, chapter: Option<usize>) -> Result<(), String> {
    let book = read_book(path).map_err(|e| e.to_string())?;
    let mut archive = Archive::open_path(path).map_err(|e| e.to_string())?;

    let selected: Vec<_> = match chapter {
        Some(index) => {
            let descriptor = book.chapters.get(index).ok_or_else(|| {
                format!(
                    "chapter {index} out of range (book has {})",
                    book.chapters.len()
                )
            })?;
            vec![descriptor]
        }
        None => book.chapters.iter().collect(),
    };

    for descriptor in selected {
        println!("# {} {}", descriptor.spine_index, descriptor.title);
        match archive.read_chapter(&descriptor.href) {
            Ok(markup) => {
                for sentence in chapter_sentences(&markup) {
                    println!("{sentence}");
                }
            }
            Err(e) => eprintln!("warning: {e}"),
        }
        println!();
    }

    Ok(())
}

/// Queues utterances for the read loop, which prints each one and reports it
/// finished.
struct ConsoleSpeaker {
    queue: UnboundedSender<Utterance>,
}

#[async_trait]
impl Speaker for ConsoleSpeaker {
    async fn speak(&self, utterance: Utterance) -> recital::Result<()> {
        self.queue
            .send(utterance)
            .map_err(|e| recital::Error::Utterance(e.to_string()))
    }

    async fn cancel(&self) {}
}

fn read_aloud(path: &Path, from_chapter: usize, settings: Option<&Path>) -> Result<(), String> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| e.to_string())?;
    runtime.block_on(play(path, from_chapter, settings))
}

async fn play(path: &Path, from_chapter: usize, settings: Option<&Path>) -> Result<(), String> {
    let bytes = std::fs::read(path).map_err(|e| format!("{}: {e}", path.display()))?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let library = Arc::new(MemoryLibrary::new());
    let book_id = match import_book(library.as_ref(), library.as_ref(), &filename, bytes)
        .await
        .map_err(|e| e.to_string())?
    {
        ImportOutcome::Imported(record) => {
            println!("== {} by {} ==", record.title, record.author);
            record.id
        }
        ImportOutcome::Duplicate(id) => id,
    };

    let voice = match settings {
        Some(path) => SettingsLayers::load(path)
            .map_err(|e| e.to_string())?
            .resolve(Some(book_id)),
        None => Default::default(),
    };

    let (queue, mut utterances) = mpsc::unbounded_channel();
    let speaker = Arc::new(ConsoleSpeaker { queue });
    let (mut engine, mut updates) = PlaybackEngine::new(
        library.clone(),
        library,
        speaker,
        PlaybackConfig::default(),
    );
    engine.set_voice(voice);

    engine.open(book_id).await.map_err(|e| e.to_string())?;
    if from_chapter > 0 {
        engine.jump_to(from_chapter, 0).await;
    }

    engine.play().await;
    let mut chapter = None;
    while engine.state() == PlaybackState::Playing {
        while let Ok(update) = updates.try_recv() {
            if chapter != Some(update.chap_idx) && !update.chapter_title.is_empty() {
                chapter = Some(update.chap_idx);
                println!();
                println!("-- {} --", update.chapter_title);
            }
        }
        let Ok(utterance) = utterances.try_recv() else {
            break;
        };
        println!("{}", utterance.text);
        engine.handle_speech(SpeechEvent::finished(utterance.id)).await;
    }
    engine.destroy().await;

    Ok(())
}
