mod config;

use std::sync::Arc;

use config::{Args, Command, prepare_sqlite_file};
use folio_core::model::{Book, ScrollSample, UserId};
use services::{AppServices, Clock, SessionHandle, ThrottleConfig};
use tracing_subscriber::{EnvFilter, fmt::SubscriberBuilder};

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  app record  --user <id> --book-file <book.json> --chapter <idx> --scroll <px> --height <px>");
    eprintln!("  app show    --user <id> --book <id> [--book-file <book.json>]");
    eprintln!("  app reset   --user <id> --book <id>");
    eprintln!("  app add     --user <id> --book <id>");
    eprintln!("  app remove  --user <id> --book <id>");
    eprintln!("  app library --user <id>");
    eprintln!("  app stats   --user <id>");
    eprintln!();
    eprintln!("Common flags:");
    eprintln!("  --db <sqlite_url>   default sqlite://folio.sqlite3");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  FOLIO_DB_URL, FOLIO_USER_ID, FOLIO_THROTTLE_MS, RUST_LOG");
}

fn init_tracing() {
    let default_filter = format!(
        "{}=info,services=info,storage=warn,sqlx=warn",
        env!("CARGO_PKG_NAME")
    );
    let env_filter = std::env::var("RUST_LOG").unwrap_or(default_filter);
    SubscriberBuilder::default()
        .with_env_filter(EnvFilter::new(env_filter))
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();
}

fn load_book(path: &std::path::Path) -> Result<Book, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);
    let cmd = match argv.next().as_deref() {
        None | Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    let args = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // The CLI user stands in for the signed-in session; without one every command is unauthorized.
    let session = args
        .user_id
        .map_or_else(SessionHandle::new, SessionHandle::signed_in);
    let user_id = args.user_id.unwrap_or_else(|| UserId::new(0));

    prepare_sqlite_file(&args.db_url)?;
    let app = AppServices::new_sqlite(
        &args.db_url,
        Clock::system(),
        Arc::new(session),
        ThrottleConfig {
            interval: args.throttle,
        },
    )
    .await?;
    tracing::info!(db = %args.db_url, ?cmd, "opened progress store");

    match cmd {
        Command::Record => {
            let book = Arc::new(load_book(args.book_file()?)?);
            let writer = app.writer();
            writer.submit(
                user_id,
                Arc::clone(&book),
                ScrollSample::new(args.chapter, args.scroll, args.height),
            );
            // A one-shot process exits right away, which is the unload case.
            for record in writer.flush().await? {
                println!("{}", serde_json::to_string_pretty(&record)?);
            }
        }
        Command::Show => {
            let book_id = args.book_id()?;
            match app.progress().get_progress_for_book(user_id, book_id).await? {
                Some(record) => {
                    println!("{}", serde_json::to_string_pretty(&record)?);
                    if let Some(path) = &args.book_file {
                        let book = load_book(path)?;
                        if let Some(point) = record.resume_point(&book) {
                            println!(
                                "resume at chapter index {} ({}px)",
                                point.chapter_index, point.scroll_position
                            );
                        }
                    }
                }
                None => println!("no progress for book {book_id}"),
            }
        }
        Command::Reset => {
            let book_id = args.book_id()?;
            app.progress().clear_progress(user_id, book_id).await?;
            println!("progress cleared for book {book_id}");
        }
        Command::Add => {
            let book_id = args.book_id()?;
            app.library().add_book(user_id, book_id).await?;
            println!("book {book_id} added to library");
        }
        Command::Remove => {
            let book_id = args.book_id()?;
            let removed = app.library().remove_book(user_id, book_id).await?;
            if removed {
                println!("book {book_id} removed from library");
            } else {
                println!("book {book_id} was not in the library");
            }
        }
        Command::Library => {
            let shelves = app.library().shelves(user_id).await?;
            println!("{}", serde_json::to_string_pretty(&shelves)?);
        }
        Command::Stats => {
            let stats = app.library().stats(user_id).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
