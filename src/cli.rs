//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use crate::adapters::cache::CachedFundamentals;
use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::yahoo_adapter::YahooAdapter;
use crate::domain::comparison::{compare_latest, compare_ratios};
use crate::domain::config_validation::{ServerSettings, StoreBackend, validate_server_config};
use crate::domain::error::DashboardError;
use crate::domain::pivot::build_statement_table;
use crate::domain::provider::{SharedQuotes, SharedStore, load_bundle, load_statement};
use crate::domain::ratios::{latest_ratios, ratio_table};
use crate::domain::statement::{DataSource, PeriodType, StatementKind, latest};
use crate::ports::config_port::ConfigPort;
use crate::ports::fundamentals_port::FundamentalsPort;

#[derive(Parser, Debug)]
#[command(name = "findash", about = "Financial dashboard backend")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the JSON API server
    Serve {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Create the fundamentals tables in the SQLite store
    InitDb {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Load DoltHub CSV exports ({table}.csv) into the SQLite store
    Import {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        dir: PathBuf,
        /// Only import this statement type
        #[arg(long)]
        statement: Option<String>,
    },
    /// Print a pivoted statement table
    Statement {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        ticker: String,
        #[arg(short, long, default_value = "income")]
        statement: String,
        #[arg(short, long, default_value = "annual")]
        period: String,
        #[arg(long, default_value = "dolthub")]
        source: String,
        /// Show year-over-year changes instead of values
        #[arg(long)]
        yoy: bool,
    },
    /// Print key financial ratios per reporting period
    Ratios {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        ticker: String,
        #[arg(short, long, default_value = "annual")]
        period: String,
    },
    /// Compare the latest figures of several companies
    Compare {
        #[arg(short, long)]
        config: PathBuf,
        /// Comma-separated tickers
        #[arg(short, long)]
        tickers: String,
        /// A statement type, or `ratios`
        #[arg(short, long, default_value = "ratios")]
        statement: String,
        #[arg(short, long, default_value = "annual")]
        period: String,
    },
    /// List symbols present in the fundamentals store
    Symbols {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Serve { config } => run_serve(&config),
        Command::InitDb { config } => run_init_db(&config),
        Command::Import {
            config,
            dir,
            statement,
        } => run_import(&config, &dir, statement.as_deref()),
        Command::Statement {
            config,
            ticker,
            statement,
            period,
            source,
            yoy,
        } => run_statement(&config, &ticker, &statement, &period, &source, yoy),
        Command::Ratios {
            config,
            ticker,
            period,
        } => run_ratios(&config, &ticker, &period),
        Command::Compare {
            config,
            tickers,
            statement,
            period,
        } => run_compare(&config, &tickers, &statement, &period),
        Command::Symbols { config } => run_symbols(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, DashboardError> {
    tracing::info!("loading config from {}", path.display());
    FileConfigAdapter::from_file(path)
}

fn runtime() -> Result<tokio::runtime::Runtime, DashboardError> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}

fn share<P>(port: P, ttl: Option<Duration>) -> SharedStore
where
    P: FundamentalsPort + Send + Sync + 'static,
{
    match ttl {
        Some(ttl) => Arc::new(CachedFundamentals::new(port, ttl)),
        None => Arc::new(port),
    }
}

fn feature_missing(backend: StoreBackend) -> DashboardError {
    DashboardError::ConfigInvalid {
        section: "store".to_string(),
        key: "backend".to_string(),
        reason: format!("findash was built without the {backend} feature"),
    }
}

/// The configured fundamentals store, or `None` for `backend = none`.
/// A `ttl` wraps the store in a read-through cache.
pub fn open_store(
    config: &dyn ConfigPort,
    backend: StoreBackend,
    ttl: Option<Duration>,
) -> Result<Option<SharedStore>, DashboardError> {
    tracing::info!(%backend, "opening fundamentals store");
    match backend {
        StoreBackend::Sqlite => {
            #[cfg(feature = "sqlite")]
            {
                let adapter = crate::adapters::sqlite_adapter::SqliteAdapter::from_config(config)?;
                Ok(Some(share(adapter, ttl)))
            }
            #[cfg(not(feature = "sqlite"))]
            {
                Err(feature_missing(backend))
            }
        }
        StoreBackend::Postgres => {
            #[cfg(feature = "postgres")]
            {
                let adapter =
                    crate::adapters::postgres_adapter::PostgresAdapter::from_config(config)?;
                Ok(Some(share(adapter, ttl)))
            }
            #[cfg(not(feature = "postgres"))]
            {
                Err(feature_missing(backend))
            }
        }
        StoreBackend::Csv => {
            let dir = config
                .get_string("csv", "dir")
                .ok_or_else(|| DashboardError::ConfigMissing {
                    section: "csv".to_string(),
                    key: "dir".to_string(),
                })?;
            Ok(Some(share(CsvAdapter::new(PathBuf::from(dir)), ttl)))
        }
        StoreBackend::None => Ok(None),
    }
}

fn open_quotes(
    config: &dyn ConfigPort,
    settings: &ServerSettings,
) -> Result<SharedQuotes, DashboardError> {
    Ok(Arc::new(YahooAdapter::from_config(
        config,
        settings.http_timeout,
    )?))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), DashboardError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| DashboardError::invalid(format!("cannot encode output: {e}")))?;
    println!("{text}");
    Ok(())
}

fn run_serve(config_path: &Path) -> Result<(), DashboardError> {
    #[cfg(feature = "web")]
    {
        use crate::adapters::fred_adapter::FredAdapter;
        use crate::adapters::gemini_adapter::GeminiAdapter;
        use crate::adapters::page_fetch_adapter::PageFetchAdapter;
        use crate::adapters::web::{AppState, build_router};
        use crate::domain::macro_series::{SharedLlm, SharedMacro};

        let config = load_config(config_path)?;
        let settings = validate_server_config(&config)?;

        let store = open_store(&config, settings.backend, Some(settings.cache_ttl))?;
        let quotes = open_quotes(&config, &settings)?;
        let macro_port = FredAdapter::from_config(&config, settings.http_timeout)?
            .map(|a| Arc::new(a) as SharedMacro);
        let llm = GeminiAdapter::from_config(&config, settings.http_timeout)?
            .map(|a| Arc::new(a) as SharedLlm);
        let fetcher = Arc::new(PageFetchAdapter::new(settings.http_timeout)?);

        let state = AppState {
            store,
            quotes,
            macro_port,
            llm,
            fetcher,
        };
        let router = build_router(state, &settings.cors_origins);

        runtime()?.block_on(async {
            let listener = tokio::net::TcpListener::bind(settings.listen).await?;
            tracing::info!("listening on {}", settings.listen);
            axum::serve(listener, router).await?;
            Ok::<(), DashboardError>(())
        })
    }

    #[cfg(not(feature = "web"))]
    {
        let _ = config_path;
        Err(DashboardError::NotConfigured {
            service: "web server (build with the web feature)".to_string(),
        })
    }
}

#[cfg(feature = "sqlite")]
fn open_sqlite(
    config: &dyn ConfigPort,
) -> Result<crate::adapters::sqlite_adapter::SqliteAdapter, DashboardError> {
    let adapter = crate::adapters::sqlite_adapter::SqliteAdapter::from_config(config)?;
    adapter.initialize_schema()?;
    Ok(adapter)
}

fn run_init_db(config_path: &Path) -> Result<(), DashboardError> {
    #[cfg(feature = "sqlite")]
    {
        let config = load_config(config_path)?;
        open_sqlite(&config)?;
        println!("schema ready");
        Ok(())
    }

    #[cfg(not(feature = "sqlite"))]
    {
        let _ = config_path;
        Err(feature_missing(StoreBackend::Sqlite))
    }
}

fn run_import(
    config_path: &Path,
    dir: &Path,
    statement: Option<&str>,
) -> Result<(), DashboardError> {
    let kinds = match statement {
        Some(name) => vec![StatementKind::from_path(name)?],
        None => StatementKind::ALL.to_vec(),
    };

    #[cfg(feature = "sqlite")]
    {
        use crate::adapters::csv_adapter::read_statement_file;

        let config = load_config(config_path)?;
        let adapter = open_sqlite(&config)?;
        let exports = CsvAdapter::new(dir.to_path_buf());

        let mut total = 0;
        for kind in kinds {
            let path = exports.csv_path(kind);
            if !path.exists() {
                tracing::warn!("{} not found, skipping {kind}", path.display());
                continue;
            }
            let rows = read_statement_file(&path)?;
            let written = adapter.insert_rows(kind, &rows)?;
            println!("{}: {written} rows", kind.table_name());
            total += written;
        }
        if total == 0 {
            return Err(DashboardError::NoData {
                what: format!("CSV exports in {}", dir.display()),
            });
        }
        Ok(())
    }

    #[cfg(not(feature = "sqlite"))]
    {
        let _ = (config_path, dir, kinds);
        Err(feature_missing(StoreBackend::Sqlite))
    }
}

fn run_statement(
    config_path: &Path,
    ticker: &str,
    statement: &str,
    period: &str,
    source: &str,
    yoy: bool,
) -> Result<(), DashboardError> {
    let kind = StatementKind::from_path(statement)?;
    let period: PeriodType = period.parse()?;
    let source: DataSource = source.parse()?;

    let config = load_config(config_path)?;
    let settings = validate_server_config(&config)?;
    let store = open_store(&config, settings.backend, None)?;
    let quotes = open_quotes(&config, &settings)?;

    let sourced = runtime()?.block_on(load_statement(
        store.as_ref(),
        &quotes,
        ticker,
        kind,
        source,
    ))?;
    tracing::info!(source = sourced.source.name(), rows = sourced.rows.len(), "statement loaded");

    let table = build_statement_table(kind, &sourced.rows, period).ok_or_else(|| {
        DashboardError::NoData {
            what: format!("{} {} for {}", period, kind.label(), ticker.to_uppercase()),
        }
    })?;
    let rendered = if yoy {
        table.render_yoy()
    } else {
        table.render()
    };
    print!("{}", rendered.to_text());
    Ok(())
}

fn required_store(config: &dyn ConfigPort) -> Result<SharedStore, DashboardError> {
    let settings = validate_server_config(config)?;
    open_store(config, settings.backend, None)?.ok_or_else(|| DashboardError::NotConfigured {
        service: "fundamentals store".to_string(),
    })
}

fn run_ratios(config_path: &Path, ticker: &str, period: &str) -> Result<(), DashboardError> {
    let period: PeriodType = period.parse()?;
    let config = load_config(config_path)?;
    let store = required_store(&config)?;

    let bundle = runtime()?.block_on(load_bundle(&store, ticker));
    let missing = bundle.missing();
    if !missing.is_empty() {
        let names: Vec<&str> = missing.iter().map(|k| k.label()).collect();
        return Err(DashboardError::NoData {
            what: format!("{} ({})", ticker.to_uppercase(), names.join(", ")),
        });
    }

    let table = ratio_table(&bundle, period).ok_or_else(|| DashboardError::NoData {
        what: format!("{period} ratios for {}", ticker.to_uppercase()),
    })?;
    print_json(&table.render())
}

fn run_compare(
    config_path: &Path,
    tickers: &str,
    statement: &str,
    period: &str,
) -> Result<(), DashboardError> {
    let period: PeriodType = period.parse()?;
    let tickers: Vec<String> = tickers
        .split(',')
        .map(|t| t.trim().to_uppercase())
        .filter(|t| !t.is_empty())
        .collect();
    if tickers.is_empty() {
        return Err(DashboardError::invalid("no tickers given"));
    }

    let config = load_config(config_path)?;
    let store = required_store(&config)?;
    let rt = runtime()?;

    let table = if statement == "ratios" {
        let mut sets = Vec::new();
        for ticker in &tickers {
            let bundle = rt.block_on(load_bundle(&store, ticker));
            match latest_ratios(&bundle, period) {
                Some(set) => sets.push((ticker.clone(), set)),
                None => tracing::warn!(ticker, "not enough statements for ratios"),
            }
        }
        compare_ratios(&sets)
    } else {
        let kind = StatementKind::from_path(statement)?;
        let mut snapshots = Vec::new();
        for ticker in &tickers {
            let rows = store.fetch_statement(ticker, kind)?;
            snapshots.push((ticker.clone(), latest(&rows, period).cloned()));
        }
        compare_latest(&snapshots)
    };

    let table = table.ok_or_else(|| DashboardError::NoData {
        what: tickers.join(", "),
    })?;
    print_json(&table)
}

fn run_symbols(config_path: &Path) -> Result<(), DashboardError> {
    let config = load_config(config_path)?;
    let store = required_store(&config)?;
    let symbols = store.list_symbols()?;
    if symbols.is_empty() {
        tracing::warn!("no symbols in the fundamentals store");
    }
    for symbol in &symbols {
        println!("{symbol}");
    }
    tracing::info!("{} symbols found", symbols.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn config_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{content}").unwrap();
        file
    }

    #[test]
    fn parses_statement_subcommand() {
        let cli = Cli::try_parse_from([
            "findash",
            "statement",
            "-c",
            "findash.ini",
            "-t",
            "AAPL",
            "--statement",
            "cash_flow",
            "--yoy",
        ])
        .unwrap();
        match cli.command {
            Command::Statement {
                ticker,
                statement,
                period,
                source,
                yoy,
                ..
            } => {
                assert_eq!(ticker, "AAPL");
                assert_eq!(statement, "cash_flow");
                assert_eq!(period, "annual");
                assert_eq!(source, "dolthub");
                assert!(yoy);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn compare_defaults_to_ratios() {
        let cli =
            Cli::try_parse_from(["findash", "compare", "-c", "x.ini", "-t", "AAPL,MSFT"]).unwrap();
        match cli.command {
            Command::Compare { statement, .. } => assert_eq!(statement, "ratios"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn open_store_none_backend() {
        let file = config_file("[store]\nbackend = none\n");
        let config = load_config(file.path()).unwrap();
        assert!(open_store(&config, StoreBackend::None, None).unwrap().is_none());
        assert!(matches!(
            required_store(&config),
            Err(DashboardError::NotConfigured { .. })
        ));
    }

    #[test]
    fn open_store_csv_requires_dir() {
        let file = config_file("[store]\nbackend = csv\n");
        let config = load_config(file.path()).unwrap();
        assert!(matches!(
            open_store(&config, StoreBackend::Csv, None),
            Err(DashboardError::ConfigMissing { .. })
        ));
    }

    #[test]
    fn unknown_statement_exits_with_input_code() {
        let result = run_statement(
            Path::new("/nonexistent.ini"),
            "AAPL",
            "balance",
            "annual",
            "dolthub",
            false,
        );
        let err = result.unwrap_err();
        assert!(matches!(err, DashboardError::UnknownStatement { .. }));
        assert_eq!(ExitCode::from(&err), ExitCode::from(4));
    }
}
