// kubesage — ask questions about your cluster in plain language.
// Thin front-end over kubesage-core: argument parsing, config persistence
// and terminal I/O live here; every engine decision lives in the core.

mod config;

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use log::debug;
use tokio_util::sync::CancellationToken;

use kubesage_core::atoms::types::{ProviderConfig, ProviderKind, SessionContext};
use kubesage_core::engine::agent::ClusterAgent;
use kubesage_core::engine::dispatcher::TaskDispatcher;
use kubesage_core::engine::handlers::{register_default_handlers, Kubectl};
use kubesage_core::engine::providers::AnyProvider;
use kubesage_core::engine::retrieval::{DocIndexer, DocRetriever, EmbeddingClient, EmbeddingConfig};
use kubesage_core::engine::store::{default_db_path, InteractionStore};
use kubesage_core::engine::validation::DefaultValidator;

use config::CliConfig;

#[derive(Parser)]
#[command(name = "kubesage", version, about = "Natural-language interface for Kubernetes clusters")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Completion provider base URL.
    #[arg(long, global = true, env = "KUBESAGE_BASE_URL")]
    base_url: Option<String>,

    /// Completion model name.
    #[arg(long, global = true, env = "KUBESAGE_MODEL")]
    model: Option<String>,

    /// API key for the completion provider.
    #[arg(long, global = true, env = "KUBESAGE_API_KEY")]
    api_key: Option<String>,

    /// Namespace for this session.
    #[arg(short, long, global = true)]
    namespace: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask one question and exit.
    Ask {
        /// The request, in plain language.
        query: Vec<String>,
    },
    /// Interactive session.
    Repl,
    /// Index documentation files (.md/.txt) into the retrieval corpus.
    Index { path: PathBuf },
    /// Show recent interactions and their outcomes.
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Print the effective configuration; --init writes it to disk.
    Config {
        #[arg(long)]
        init: bool,
    },
    /// Generate shell completions.
    Completions { shell: Shell },
}

fn effective_config(cli: &Cli) -> kubesage_core::EngineResult<CliConfig> {
    let mut cfg = CliConfig::load()?;
    if let Some(v) = &cli.base_url {
        cfg.base_url = v.clone();
    }
    if let Some(v) = &cli.model {
        cfg.model = v.clone();
    }
    if let Some(v) = &cli.api_key {
        cfg.api_key = v.clone();
    }
    if let Some(v) = &cli.namespace {
        cfg.namespace = v.clone();
    }
    Ok(cfg)
}

fn open_store(cfg: &CliConfig) -> kubesage_core::EngineResult<Arc<InteractionStore>> {
    let path = if cfg.db_path.is_empty() {
        default_db_path()
    } else {
        PathBuf::from(&cfg.db_path)
    };
    InteractionStore::open(&path).map(Arc::new)
}

fn build_agent(cfg: &CliConfig, store: Arc<InteractionStore>) -> ClusterAgent {
    let provider = Arc::new(AnyProvider::from_config(&ProviderConfig {
        kind: ProviderKind::Custom,
        api_key: cfg.api_key.clone(),
        base_url: Some(cfg.base_url.clone()),
        model: cfg.model.clone(),
    }));
    let retriever = Arc::new(DocRetriever::new(
        EmbeddingClient::new(EmbeddingConfig {
            base_url: cfg.embedding_base_url.clone(),
            model: cfg.embedding_model.clone(),
            api_key: String::new(),
        }),
        store.clone(),
    ));

    let mut dispatcher = TaskDispatcher::new(Box::new(DefaultValidator));
    register_default_handlers(&mut dispatcher, Arc::new(Kubectl::new(cfg.kubectl_binary.clone())));

    ClusterAgent::new(
        provider,
        retriever,
        store,
        dispatcher,
        SessionContext { current_context: String::new(), current_namespace: cfg.namespace.clone() },
    )
}

/// Cancellation token wired to Ctrl-C for the duration of a turn.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let watcher = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("ctrl-c received, cancelling turn");
            watcher.cancel();
        }
    });
    cancel
}

async fn run_turn(agent: &mut ClusterAgent, query: &str) -> bool {
    let cancel = cancel_on_ctrl_c();
    match agent.process_query(query, &["cli".into()], &cancel).await {
        Ok(result) => {
            println!("{}", result.output);
            for suggestion in &result.suggestions {
                println!("hint: {}", suggestion);
            }
            result.success
        }
        Err(e) => {
            eprintln!("error: {}", e);
            false
        }
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let cfg = match effective_config(&cli) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(2);
        }
    };

    let code = match cli.command {
        Commands::Ask { query } => {
            let query = query.join(" ");
            if query.trim().is_empty() {
                eprintln!("error: empty query");
                2
            } else {
                match open_store(&cfg) {
                    Ok(store) => {
                        let mut agent = build_agent(&cfg, store);
                        if run_turn(&mut agent, &query).await {
                            0
                        } else {
                            1
                        }
                    }
                    Err(e) => {
                        eprintln!("error: {}", e);
                        2
                    }
                }
            }
        }

        Commands::Repl => match open_store(&cfg) {
            Ok(store) => {
                let mut agent = build_agent(&cfg, store);
                println!("kubesage — type a request, or 'exit' to quit.");
                let stdin = std::io::stdin();
                loop {
                    print!("> ");
                    std::io::stdout().flush().ok();
                    let mut line = String::new();
                    match stdin.lock().read_line(&mut line) {
                        Ok(0) => break,
                        Ok(_) => {}
                        Err(e) => {
                            eprintln!("error: {}", e);
                            break;
                        }
                    }
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    if matches!(line, "exit" | "quit") {
                        break;
                    }
                    run_turn(&mut agent, line).await;
                }
                0
            }
            Err(e) => {
                eprintln!("error: {}", e);
                2
            }
        },

        Commands::Index { path } => match open_store(&cfg) {
            Ok(store) => {
                let indexer = DocIndexer::new(
                    EmbeddingClient::new(EmbeddingConfig {
                        base_url: cfg.embedding_base_url.clone(),
                        model: cfg.embedding_model.clone(),
                        api_key: String::new(),
                    }),
                    store,
                );
                match indexer.index_path(&path).await {
                    Ok(count) => {
                        println!("indexed {} chunk(s) from {:?}", count, path);
                        0
                    }
                    Err(e) => {
                        eprintln!("error: {}", e);
                        1
                    }
                }
            }
            Err(e) => {
                eprintln!("error: {}", e);
                2
            }
        },

        Commands::History { limit } => match open_store(&cfg) {
            Ok(store) => match store.recent_interactions(limit) {
                Ok(interactions) => {
                    for i in interactions {
                        let mark = if i.success { "ok " } else { "err" };
                        println!("[{}] {} {}", mark, i.created_at, i.query);
                    }
                    0
                }
                Err(e) => {
                    eprintln!("error: {}", e);
                    1
                }
            },
            Err(e) => {
                eprintln!("error: {}", e);
                2
            }
        },

        Commands::Config { init } => {
            let mut display = cfg.clone();
            if !display.api_key.is_empty() {
                display.api_key = "<redacted>".into();
            }
            match serde_json::to_string_pretty(&display) {
                Ok(text) => println!("{}", text),
                Err(e) => eprintln!("error: {}", e),
            }
            if init {
                match cfg.save() {
                    Ok(path) => {
                        println!("written to {:?}", path);
                        0
                    }
                    Err(e) => {
                        eprintln!("error: {}", e);
                        1
                    }
                }
            } else {
                0
            }
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
            0
        }
    };

    std::process::exit(code);
}
