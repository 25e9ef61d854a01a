//! `luminary` — the CLI front end over the provider execution runtime.
//!
//! Subcommands: `providers`, `search <query>`, `list`, `info <providerId:mangaId>`,
//! `download <providerId:chapterId>...`. With `--api`, every command prints one
//! JSON envelope (`{status, data?, error?}`) per line instead of formatted text;
//! `download` additionally emits a leading `downloading` envelope before its
//! terminal `success`/`error` one. Exit code is 0 on success, 1 on any
//! user-visible failure.

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use luminary::error::TrackedError;
use luminary::prelude::*;
use luminary::types::{combined_id, split_combined_id};

#[derive(Parser)]
#[command(name = "luminary", version, about = "Search, inspect, and download manga across registered providers")]
struct Cli {
    /// Emit one JSON envelope per line instead of formatted text.
    #[arg(long, global = true)]
    api: bool,

    /// Bounded parallelism for multi-page/multi-item operations.
    #[arg(long, global = true, default_value_t = 4)]
    concurrency: usize,

    /// Raise the default log level to debug.
    #[arg(long, global = true)]
    verbose: bool,

    /// Also log to stderr at trace level (implies --verbose).
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List every registered provider.
    Providers,
    /// Search across providers.
    Search {
        query: String,
        #[arg(long)]
        provider: Option<String>,
        #[arg(long, default_value_t = 0)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        pages: usize,
        #[arg(long, value_enum, default_value_t = SortArg::Relevance)]
        sort: SortArg,
        #[arg(long)]
        filter: Vec<String>,
        #[arg(long)]
        alt_titles: bool,
        #[arg(long, value_enum)]
        fields: Vec<SearchFieldArg>,
    },
    /// List latest manga from a provider (empty-query search).
    List {
        #[arg(long)]
        provider: Option<String>,
        #[arg(long, default_value_t = 0)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        pages: usize,
    },
    /// Show full metadata and chapter list for a manga.
    Info {
        /// `providerId:mangaId`
        id: String,
        #[arg(long, default_value = "text")]
        format: String,
        /// Include chapters in every language, not just English.
        #[arg(long)]
        all_langs: bool,
    },
    /// Download one or more chapters.
    Download {
        /// One or more `providerId:chapterId`.
        ids: Vec<String>,
        #[arg(long, default_value = "./downloads")]
        output: PathBuf,
        #[arg(long)]
        vol: Option<String>,
        #[arg(long, default_value_t = 4)]
        concurrent: usize,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum SortArg {
    Relevance,
    Name,
    Newest,
    Updated,
    Popularity,
}

impl From<SortArg> for SortKey {
    fn from(s: SortArg) -> Self {
        match s {
            SortArg::Relevance => SortKey::Relevance,
            SortArg::Name => SortKey::Name,
            SortArg::Newest => SortKey::Newest,
            SortArg::Updated => SortKey::Updated,
            SortArg::Popularity => SortKey::Popularity,
        }
    }
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum SearchFieldArg {
    Title,
    Author,
    Genre,
}

impl From<SearchFieldArg> for SearchField {
    fn from(f: SearchFieldArg) -> Self {
        match f {
            SearchFieldArg::Title => SearchField::Title,
            SearchFieldArg::Author => SearchField::Author,
            SearchFieldArg::Genre => SearchField::Genre,
        }
    }
}

fn build_registry() -> Registry {
    let registry = Registry::new();
    #[cfg(feature = "provider-mangadex")]
    let _ = registry.register(Arc::new(luminary::providers::MangaDexProvider::new()));
    #[cfg(feature = "provider-kissmanga")]
    let _ = registry.register(Arc::new(luminary::providers::KissMangaProvider::new()));
    registry
}

fn print_success(api: bool, data: impl Serialize, human: impl FnOnce(&serde_json::Value)) {
    let value = serde_json::to_value(&data).unwrap_or(json!(null));
    if api {
        println!("{}", json!({"status": "success", "data": value}));
    } else {
        human(&value);
    }
}

fn print_error(api: bool, err: &TrackedError) {
    if api {
        println!("{}", json!({"status": "error", "error": err.to_string()}));
    } else {
        eprintln!("error: {err}");
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let _guard = luminary::logging::init(cli.verbose || cli.debug);

    let registry = build_registry();

    match run(&cli, &registry).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            print_error(cli.api, &e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli, registry: &Registry) -> Result<(), TrackedError> {
    match &cli.command {
        Command::Providers => {
            let providers: Vec<_> = registry
                .list()
                .iter()
                .map(|p| json!({"id": p.id(), "name": p.name(), "description": p.description(), "siteUrl": p.site_url()}))
                .collect();
            print_success(cli.api, &providers, |v| {
                for p in v.as_array().unwrap() {
                    println!("{}  {}  {}", p["id"].as_str().unwrap(), p["name"].as_str().unwrap(), p["siteUrl"].as_str().unwrap());
                }
            });
            Ok(())
        }
        Command::Search { query, provider, limit, pages, sort, filter, alt_titles, fields } => {
            let mut builder = registry
                .search(query.clone())
                .limit(*limit)
                .pages(*pages)
                .sort((*sort).into())
                .include_alt_titles(*alt_titles)
                .fields(fields.iter().map(|f| (*f).into()).collect())
                .concurrency(cli.concurrency);
            for f in filter {
                if let Some((k, v)) = f.split_once('=') {
                    builder = builder.filter(k, v);
                }
            }

            let results = match provider {
                Some(id) => builder.from_provider(id).await,
                None => builder.flatten().await,
            }
            .map_err(luminary::error::TrackedError::from)?;

            print_success(cli.api, &results, |v| {
                for m in v.as_array().unwrap() {
                    println!(
                        "{}  {}",
                        combined_id(m["provider_id"].as_str().unwrap_or(""), m["id"].as_str().unwrap_or("")),
                        m["title"].as_str().unwrap_or("")
                    );
                }
            });
            Ok(())
        }
        Command::List { provider, limit, pages } => {
            let builder = registry.search("").limit(*limit).pages(*pages).concurrency(cli.concurrency);
            let results = match provider {
                Some(id) => builder.from_provider(id).await,
                None => builder.flatten().await,
            }
            .map_err(luminary::error::TrackedError::from)?;

            print_success(cli.api, &results, |v| {
                for m in v.as_array().unwrap() {
                    println!(
                        "{}  {}",
                        combined_id(m["provider_id"].as_str().unwrap_or(""), m["id"].as_str().unwrap_or("")),
                        m["title"].as_str().unwrap_or("")
                    );
                }
            });
            Ok(())
        }
        Command::Info { id, format, all_langs } => {
            let (provider_id, manga_id) = split_combined_id(id).ok_or_else(|| {
                TrackedError::from(luminary::error::Error::invalid_input(format!(
                    "expected providerId:mangaId, got {id}"
                )))
            })?;
            let provider = registry.get(provider_id)?;
            let info = provider.get_manga_with_languages(manga_id, *all_langs).await?;

            print_success(cli.api, &info, |v| {
                if format == "json" {
                    println!("{}", serde_json::to_string_pretty(v).unwrap_or_default());
                } else {
                    println!("{}", v["title"].as_str().unwrap_or(""));
                    if let Some(desc) = v["description"].as_str() {
                        println!("{desc}");
                    }
                    println!("chapters: {}", v["chapters"].as_array().map(|a| a.len()).unwrap_or(0));
                }
            });
            Ok(())
        }
        Command::Download { ids, output, vol, concurrent } => {
            let options = DownloadOptions {
                concurrency: Some(*concurrent),
                volume: vol.clone(),
            };
            for id in ids {
                let (provider_id, chapter_id) = split_combined_id(id).ok_or_else(|| {
                    TrackedError::from(luminary::error::Error::invalid_input(format!(
                        "expected providerId:chapterId, got {id}"
                    )))
                })?;
                let provider = registry.get(provider_id)?;

                if cli.api {
                    println!(
                        "{}",
                        json!({
                            "status": "downloading",
                            "data": {
                                "chapterId": chapter_id,
                                "provider": provider_id,
                                "providerName": provider.name(),
                                "outputDir": output.display().to_string(),
                            }
                        })
                    );
                } else {
                    println!("downloading {id} -> {}", output.display());
                }

                let result = provider.download_chapter(chapter_id, output, &options).await;
                match result {
                    Ok(path) => {
                        print_success(cli.api, json!({"path": path.display().to_string()}), |v| {
                            println!("saved to {}", v["path"].as_str().unwrap_or(""));
                        });
                    }
                    Err(e) => {
                        print_error(cli.api, &e);
                        return Err(e);
                    }
                }
            }
            Ok(())
        }
    }
}
