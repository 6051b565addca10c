//! Monkeypad command-line client.
//!
//! Provides the `monkeypad` binary: a terminal front end for the code
//! service. It drives the same `SampleStore` and `ExecutionSession` an
//! editor would, and prints their state.
//!
//! The backend origin comes from `--backend` or `MONKEYPAD_BACKEND_URL`.
//! Diagnostics go to stderr through `tracing`; set `RUST_LOG` to see them.

use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use monkeypad_client::{
    ClientConfig, ClientError, CodeApi, ExecutionSession, HttpTransport, SampleStore,
};
use monkeypad_core::ExecutionStatus;

const EXIT_OK: i32 = 0;
const EXIT_FAILURE: i32 = 1;
const EXIT_USAGE: i32 = 2;
const EXIT_CONFIG: i32 = 3;

const HELLO_FAILED_MESSAGE: &str = "Failed to fetch data. Please try again later.";

/// Browse code samples and run Monkey code on a remote interpreter.
#[derive(Parser)]
#[command(name = "monkeypad", about = "Browse code samples and run Monkey code remotely")]
struct Cli {
    /// Backend base URL, e.g. http://localhost:8000.
    #[arg(long, global = true, env = "MONKEYPAD_BACKEND_URL")]
    backend: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// List code samples, optionally filtered by name.
    List {
        /// Case-insensitive substring to match against sample names.
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Print the source of the sample with the given name.
    Show {
        /// Sample name, matched exactly by the service.
        name: String,
    },

    /// Add a code sample.
    Add {
        /// Display name for the new sample.
        name: String,

        #[command(flatten)]
        code: CodeInput,
    },

    /// Execute code on the backend.
    Run {
        #[command(flatten)]
        source: RunInput,
    },

    /// Check that the backend answers.
    Hello,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct CodeInput {
    /// Read the sample's code from a file.
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Use the given text as the sample's code.
    #[arg(short, long)]
    code: Option<String>,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct RunInput {
    /// File containing the code to run.
    file: Option<PathBuf>,

    /// Code to run.
    #[arg(short, long)]
    code: Option<String>,

    /// Run the stored sample with this name.
    #[arg(short, long)]
    sample: Option<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let api = match connect(cli.backend.as_deref()) {
        Ok(api) => api,
        Err(err) => {
            eprintln!("Error: {}", err);
            process::exit(EXIT_CONFIG);
        }
    };

    let exit_code = match cli.command {
        Commands::List { search } => run_list(api, search.as_deref()).await,
        Commands::Show { name } => run_show(api, &name).await,
        Commands::Add { name, code } => run_add(api, &name, code).await,
        Commands::Run { source } => run_code(api, source).await,
        Commands::Hello => run_hello(api).await,
    };
    process::exit(exit_code);
}

fn connect(backend: Option<&str>) -> Result<CodeApi<HttpTransport>, ClientError> {
    let backend = backend.ok_or_else(|| {
        ClientError::Config("no backend URL: pass --backend or set MONKEYPAD_BACKEND_URL".into())
    })?;
    let config = ClientConfig::new(backend)?;
    tracing::debug!(base_url = %config.base_url, "using backend");
    Ok(CodeApi::new(HttpTransport::new(config)))
}

/// Prints the store's user-facing message for a failed operation, falling
/// back to the error itself, and returns the matching exit code.
fn report(store: &SampleStore<HttpTransport>, err: &ClientError) -> i32 {
    match err {
        ClientError::Validation(inner) => {
            eprintln!("Error: {}", inner);
            EXIT_USAGE
        }
        _ => {
            let message = store.snapshot().error.unwrap_or_else(|| err.to_string());
            eprintln!("Error: {}", message);
            EXIT_FAILURE
        }
    }
}

async fn run_list(api: CodeApi<HttpTransport>, search: Option<&str>) -> i32 {
    let store = SampleStore::new(api);
    if let Some(term) = search {
        store.set_search_term(term);
    }

    if let Err(err) = store.on_attach().await {
        return report(&store, &err);
    }
    let snapshot = store.snapshot();
    store.on_detach();

    for sample in &snapshot.filtered {
        println!("{}\t{}", sample.id, sample.name);
    }
    EXIT_OK
}

async fn run_show(api: CodeApi<HttpTransport>, name: &str) -> i32 {
    let store = SampleStore::new(api);
    match store.fetch_content_by_name(name).await {
        Ok(code) => {
            println!("{}", code);
            EXIT_OK
        }
        Err(err) => report(&store, &err),
    }
}

async fn run_add(api: CodeApi<HttpTransport>, name: &str, input: CodeInput) -> i32 {
    let code = match (input.file, input.code) {
        (Some(path), _) => match std::fs::read_to_string(&path) {
            Ok(code) => code,
            Err(err) => {
                eprintln!("Error: failed to read '{}': {}", path.display(), err);
                return EXIT_USAGE;
            }
        },
        (None, code) => code.unwrap_or_default(),
    };

    let store = SampleStore::new(api);
    store.open_add_form();
    match store.add_sample(name, &code).await {
        Ok(()) => {
            let snapshot = store.snapshot();
            println!(
                "Added '{}'. {} sample(s) in collection.",
                name,
                snapshot.samples.len()
            );
            if let Some(warning) = snapshot.error {
                eprintln!("Warning: {}", warning);
            }
            EXIT_OK
        }
        Err(err) => report(&store, &err),
    }
}

async fn run_code(api: CodeApi<HttpTransport>, input: RunInput) -> i32 {
    let source = if let Some(name) = input.sample {
        let store = SampleStore::new(api.clone());
        match store.fetch_content_by_name(&name).await {
            Ok(code) => code,
            Err(err) => return report(&store, &err),
        }
    } else if let Some(path) = input.file {
        match std::fs::read_to_string(&path) {
            Ok(code) => code,
            Err(err) => {
                eprintln!("Error: failed to read '{}': {}", path.display(), err);
                return EXIT_USAGE;
            }
        }
    } else {
        input.code.unwrap_or_default()
    };

    let session = ExecutionSession::new(api);
    let mut updates = session.subscribe();
    let watcher = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let status = updates.borrow_and_update().request.status.clone();
            tracing::debug!(?status, "execution state changed");
        }
    });

    let result = session.execute(source).await;
    session.on_detach();
    drop(session);
    watcher.await.ok();

    match result {
        Ok(ExecutionStatus::Succeeded { output }) => {
            println!("{}", output);
            EXIT_OK
        }
        Ok(ExecutionStatus::Failed { message }) => {
            eprintln!("{}", message);
            EXIT_FAILURE
        }
        Ok(status) => {
            eprintln!("Error: unexpected execution state {:?}", status);
            EXIT_FAILURE
        }
        Err(err) => {
            eprintln!("Error: {}", err);
            EXIT_FAILURE
        }
    }
}

async fn run_hello(api: CodeApi<HttpTransport>) -> i32 {
    match api.hello().await {
        Ok(body) => {
            let text = serde_json::to_string_pretty(&body).unwrap_or_else(|_| body.to_string());
            println!("{}", text);
            EXIT_OK
        }
        Err(err) => {
            tracing::warn!("greeting probe failed: {}", err);
            eprintln!("{}", HELLO_FAILED_MESSAGE);
            EXIT_FAILURE
        }
    }
}
