use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use news_core::{
    Article, ArticleFeed, Category, FavoriteStore, JsonFileEngine, NewsClient, NewsConfig,
};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "newsreader", about = "Read the news and keep favorites")]
struct Cli {
    /// Config file to use instead of the one in the user config directory.
    #[arg(long, global = true)]
    config: Option<std::path::PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch a category and list its articles.
    Fetch { category: CategoryArg },
    /// Toggle the favorite state of the n-th article (1-based) of a category.
    Favorite { category: CategoryArg, index: usize },
    /// Remove a favorite by id.
    Unfavorite { id: String },
    /// List stored favorites.
    Favorites,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CategoryArg {
    Everything,
    TopHeadlines,
}

impl From<CategoryArg> for Category {
    fn from(arg: CategoryArg) -> Self {
        match arg {
            CategoryArg::Everything => Category::Everything,
            CategoryArg::TopHeadlines => Category::TopHeadlines,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("Something went wrong: {message}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(path: Option<&std::path::Path>) -> NewsConfig {
    match path {
        Some(path) => match NewsConfig::load_from(path) {
            Ok(mut config) => {
                config.apply_env();
                config
            }
            Err(e) => {
                error!(error = %e, path = %path.display(), "falling back to default configuration");
                let mut config = NewsConfig::default();
                config.apply_env();
                config
            }
        },
        None => NewsConfig::load(),
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    let config = load_config(cli.config.as_deref());
    let favorites_path = config.favorites_path().map_err(|e| e.to_string())?;
    let favorites = FavoriteStore::open(Arc::new(JsonFileEngine::new(favorites_path))).await;

    match cli.command {
        Command::Fetch { category } => {
            let feed = build_feed(&config)?;
            let category = Category::from(category);
            feed.refresh(category).await.map_err(|e| e.to_string())?;
            for (n, article) in feed.articles(category).await.iter().enumerate() {
                print_article(n + 1, article, favorites.is_favorited(article));
            }
        }
        Command::Favorite { category, index } => {
            let feed = build_feed(&config)?;
            let category = Category::from(category);
            feed.refresh(category).await.map_err(|e| e.to_string())?;
            let articles = feed.articles(category).await;
            let article = index
                .checked_sub(1)
                .and_then(|i| articles.get(i))
                .ok_or_else(|| format!("no article #{index} in {category}"))?;
            let favorited = favorites.toggle(article).await.map_err(|e| e.to_string())?;
            let verb = if favorited { "Saved" } else { "Removed" };
            println!("{verb}: {}", display_title(article));
        }
        Command::Unfavorite { id } => {
            if favorites.delete(&id).await.map_err(|e| e.to_string())? {
                println!("Removed: {id}");
            } else {
                println!("Not a favorite: {id}");
            }
        }
        Command::Favorites => {
            favorites.reload().await.map_err(|e| e.to_string())?;
            for (n, article) in favorites.articles().iter().enumerate() {
                print_article(n + 1, article, true);
            }
        }
    }
    Ok(())
}

fn build_feed(config: &NewsConfig) -> Result<ArticleFeed, String> {
    let client = NewsClient::from_config(config).map_err(|e| e.to_string())?;
    Ok(ArticleFeed::new(client))
}

fn display_title(article: &Article) -> &str {
    article
        .title
        .as_deref()
        .filter(|t| !t.is_empty())
        .or(article.description.as_deref())
        .unwrap_or("(untitled)")
}

fn print_article(n: usize, article: &Article, favorited: bool) {
    let marker = if favorited { '*' } else { ' ' };
    println!("{n:>3} [{marker}] {}", display_title(article));
    if let Some(author) = &article.author {
        println!("        by {author}");
    }
    if let Some(published) = article.published_at {
        println!("        {}", published.format("%Y-%m-%d %H:%M"));
    }
    println!("        {}", article.id);
}
