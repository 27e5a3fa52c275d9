//! Bookshelf CLI
//!
//! Searches books and manages the local search history and favorites.

use std::path::PathBuf;

use bookshelf::{
    api::{BookSearchApi, BookSearchClient},
    error::{AppError, Result},
    models::{Book, Config, SearchParams, SearchTarget, SortOrder},
    pagination::Paginator,
    session::SearchSession,
    storage::{FileFavoritesDb, FileStorage},
    store::{FavoritesStore, SearchHistoryStore},
};
use chrono::DateTime;
use clap::{Parser, Subcommand};

/// Bookshelf - Book Search and Favorites
#[derive(Parser, Debug)]
#[command(
    name = "bookshelf",
    version,
    about = "Search books and keep a list of favorites"
)]
struct Cli {
    /// Directory holding the search history, favorites and config.toml
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Path to the config file (default: {storage_dir}/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search books and record the query in the history
    Search {
        query: String,

        /// accuracy or latest
        #[arg(long)]
        sort: Option<SortOrder>,

        /// Restrict the search to title, isbn, publisher or person
        #[arg(long)]
        target: Option<SearchTarget>,

        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Results per page (default: search.page_size)
        #[arg(long)]
        size: Option<u32>,
    },

    /// Show or edit the search history
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Show or edit the favorites
    Favorites {
        #[command(subcommand)]
        action: FavoritesAction,
    },

    /// Validate the configuration file
    Validate,
}

#[derive(Subcommand, Debug)]
enum HistoryAction {
    List,
    Remove { id: String },
    Clear,
}

#[derive(Subcommand, Debug)]
enum FavoritesAction {
    List {
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Look up a book by ISBN and add it
    Add { isbn: String },
    Remove { id: String },
    /// Look up a book by ISBN and add or remove it
    Toggle { isbn: String },
    Clear,
    Count,
}

/// Initialize logging; `RUST_LOG` overrides the given default level.
fn init_logging(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Find the book with the given ISBN.
async fn lookup_isbn(client: &BookSearchClient, isbn: &str) -> Result<Book> {
    let params = SearchParams::new(isbn)
        .with_target(SearchTarget::Isbn)
        .with_size(1);
    client
        .search_books(&params)
        .await?
        .books
        .into_iter()
        .next()
        .ok_or_else(|| AppError::validation(format!("No book found for ISBN {isbn}")))
}

fn print_book(book: &Book, favorite: bool) {
    let marker = if favorite { "*" } else { " " };
    println!(
        "{} {} - {} ({}, {} won)",
        marker,
        book.title(),
        book.document.authors.join(", "),
        book.document.publisher,
        book.effective_price()
    );
    println!("    id: {}", book.id);
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| cli.storage_dir.join("config.toml"));
    // Logging starts before the config load so a load failure is reported.
    let level = if cli.verbose {
        "debug".to_string()
    } else {
        Config::load(&config_path)
            .map(|config| config.logging.level)
            .unwrap_or_else(|_| "info".to_string())
    };
    init_logging(&level);

    let config = Config::load_or_default(&config_path);

    let storage = FileStorage::new(&cli.storage_dir);
    let history = SearchHistoryStore::new(storage, &config.history);
    let favorites_db = FileFavoritesDb::new(&cli.storage_dir, &config.favorites);
    let favorites = FavoritesStore::new(favorites_db);

    match cli.command {
        Command::Search {
            query,
            sort,
            target,
            page,
            size,
        } => {
            let client = BookSearchClient::new(&config.api)?;
            let size = size.unwrap_or(config.search.page_size);
            let mut session = SearchSession::new(client, history, size)
                .with_sort(sort.unwrap_or(config.search.sort));

            let searched = match target {
                Some(target) => session.search_with_target(&query, target).await?,
                None => session.search(&query).await?,
            };
            if !searched {
                return Err(AppError::validation("Search query is empty"));
            }
            if page > 1 && !session.go_to_page(page).await? {
                log::warn!(
                    "Page {} is out of range, showing page {}",
                    page,
                    session.paginator().current_page()
                );
            }

            favorites.init().await;
            let favorite_ids = favorites.favorites_map();
            for book in session.books() {
                print_book(book, favorite_ids.contains(&book.id));
            }

            let info = session.page_info();
            println!(
                "{} (page {}/{})",
                info.showing,
                session.paginator().current_page(),
                session.paginator().total_pages()
            );
        }

        Command::History { action } => match action {
            HistoryAction::List => {
                let items = history.get_snapshot();
                if items.is_empty() {
                    log::info!("No search history yet.");
                }
                for item in items.iter() {
                    let when = DateTime::from_timestamp_millis(item.timestamp)
                        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                        .unwrap_or_default();
                    println!("{}  {}  {}", item.id, when, item.query);
                }
            }
            HistoryAction::Remove { id } => {
                history.remove_query(&id);
                log::info!("Removed history entry {}", id);
            }
            HistoryAction::Clear => {
                history.clear_history();
                log::info!("Search history cleared");
            }
        },

        Command::Favorites { action } => {
            favorites.open_database().await;

            match action {
                FavoritesAction::List { page } => {
                    let books = favorites.favorites().await;
                    let mut paginator = Paginator::new(config.search.page_size as usize);
                    paginator.set_total_items(books.len());
                    if page != paginator.current_page() && !paginator.go_to_page(page) {
                        log::warn!("Page {} is out of range, showing page 1", page);
                    }

                    for book in paginator.page_slice(books.as_slice()) {
                        print_book(book, true);
                    }
                    println!("{}", paginator.page_info().showing);
                }
                FavoritesAction::Add { isbn } => {
                    let client = BookSearchClient::new(&config.api)?;
                    let book = lookup_isbn(&client, &isbn).await?;
                    if favorites.add(&book).await {
                        log::info!("Added '{}' to favorites", book.title());
                    } else {
                        log::info!("'{}' is already a favorite", book.title());
                    }
                }
                FavoritesAction::Remove { id } => {
                    favorites.remove(&id).await;
                    log::info!("Removed favorite {}", id);
                }
                FavoritesAction::Toggle { isbn } => {
                    let client = BookSearchClient::new(&config.api)?;
                    let book = lookup_isbn(&client, &isbn).await?;
                    if favorites.toggle(&book).await {
                        log::info!("Added '{}' to favorites", book.title());
                    } else {
                        log::info!("Removed '{}' from favorites", book.title());
                    }
                }
                FavoritesAction::Clear => {
                    favorites.clear().await;
                    log::info!("Favorites cleared");
                }
                FavoritesAction::Count => {
                    println!("{}", favorites.count().await);
                }
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            if config.api.resolved_api_key().trim().is_empty() {
                log::warn!("No API key set in api.api_key or KAKAO_API_KEY");
            }

            log::info!("All validations passed!");
        }
    }

    Ok(())
}
