use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fieldguide_backend::config;
use fieldguide_backend::content::{self, Languages};
use fieldguide_backend::db;
use fieldguide_backend::search::{PreviewRenderer, SearchIndex, SearchIndexer};

#[derive(Parser)]
#[command(name = "fieldguide-backend", about = "Content loading and search indexing")]
struct Cli {
    /// Path to config.json (defaults to the working directory) / 配置文件路径
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load chapters, interactives and glossary terms from the content directory
    #[command(name = "load_content")]
    LoadContent,

    /// Delete the search index and rebuild it from the database
    #[command(name = "rebuild_search_indexes")]
    RebuildSearchIndexes,

    /// Query the search index
    Search {
        query: String,

        #[arg(short, long)]
        language: Option<String>,

        #[arg(long)]
        limit: Option<usize>,
    },

    /// Print version and build information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fieldguide_backend=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    if let Command::Version = cli.command {
        println!("fieldguide-backend {}", env!("CARGO_PKG_VERSION"));
        println!("Built:   {}", env!("BUILD_TIME"));
        println!("Git SHA: {}", config::git_sha());
        return Ok(());
    }

    // Load configuration / 加载配置
    let config_path = cli.config.unwrap_or_else(config::get_config_path);
    let app_config = config::load_config(&config_path).map_err(anyhow::Error::msg)?;
    let languages = Languages::from_config(&app_config.content);

    // Create data directory if not exists / 创建数据目录
    let data_dir = app_config.get_data_dir();
    if !data_dir.exists() {
        std::fs::create_dir_all(&data_dir)?;
        tracing::info!("Created data directory: {:?}", data_dir);
    }

    let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| app_config.get_database_url());
    let pool = db::connect(&database_url).await?;
    db::run_migrations(&pool).await?;
    SearchIndex::new(pool.clone()).init().await?;

    match cli.command {
        Command::LoadContent => {
            let content_dir = app_config.get_content_dir();
            tracing::info!("Loading content from {:?}", content_dir);
            let results = content::load_all(&pool, &content_dir, &languages).await?;
            for (name, summary) in results {
                println!("{} {} loaded!", summary.total(), name);
            }
        }
        Command::RebuildSearchIndexes => {
            let renderer = PreviewRenderer::from_config(&app_config);
            let summary = SearchIndexer::new(pool.clone(), languages, renderer)
                .rebuild()
                .await?;
            println!(
                "Search index rebuilt: {} instances, {} rows.",
                summary.instances, summary.rows
            );
        }
        Command::Search { query, language, limit } => {
            let language = language.unwrap_or_else(|| app_config.content.default_language.clone());
            if !app_config.content.is_valid_language(&language) {
                anyhow::bail!(
                    "Unknown language '{}', expected one of: {}",
                    language,
                    app_config.content.language_codes().join(", ")
                );
            }

            let index = SearchIndex::new(pool.clone());
            let limit = limit.unwrap_or(app_config.search.result_limit);
            let hits = index.search(&query, &language, limit).await?;
            let stats = index.get_stats().await;

            println!("{} results for '{}' ({} items indexed)", hits.len(), query, stats.item_count);
            for hit in hits {
                println!(
                    "[{:.3}] {} #{}\n{}\n",
                    hit.score, hit.object_type_name, hit.object_id, hit.result_preview
                );
            }
        }
        Command::Version => {}
    }

    pool.close().await;
    Ok(())
}
