mod fetcher;

use std::path::{Path, PathBuf};

use fetcher::FileFetcher;
use miette::{IntoDiagnostic, WrapErr};
use spiralgen::suggest::suggestions;
use spiralgen::{Config, MemoryDocument, ParameterBag};

const USAGE: &str = "\
Usage:
  spiralgen-host run <document.json> <command> [key=value ...] [--config <file>]
  spiralgen-host suggest <key> [query]

Commands:
  generate-shapes        count=<n>
  fetch-and-render       requestUrl=<url>
  place-image            imageUrl=<url> [width=<px> height=<px>]
  invert-image-colors
  inspect-selected-text";

#[tokio::main]
async fn main() -> miette::Result<()> {
    // stdout carries the close message, logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("run") => match RunArgs::parse(&args[1..]) {
            Ok(run_args) => run(run_args).await,
            Err(message) => usage_error(&message),
        },
        Some("suggest") => match &args[1..] {
            [key] => print_suggestions(key, ""),
            [key, query] => print_suggestions(key, query),
            _ => usage_error("suggest takes a key and an optional query"),
        },
        Some(other) => usage_error(&format!("unknown subcommand `{other}`")),
        None => usage_error("missing subcommand"),
    }
}

fn usage_error(message: &str) -> ! {
    eprintln!("error: {message}\n\n{USAGE}");
    std::process::exit(2);
}

#[derive(Debug, PartialEq)]
struct RunArgs {
    document: PathBuf,
    command: String,
    params: Vec<(String, String)>,
    config: Option<PathBuf>,
}

impl RunArgs {
    fn parse(args: &[String]) -> Result<Self, String> {
        let mut positional = Vec::new();
        let mut params = Vec::new();
        let mut config = None;

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            if arg == "--config" {
                let path = iter.next().ok_or("--config needs a file")?;
                config = Some(PathBuf::from(path));
            } else if positional.len() < 2 {
                positional.push(arg.clone());
            } else {
                let (key, value) = arg
                    .split_once('=')
                    .ok_or_else(|| format!("expected key=value, got `{arg}`"))?;
                params.push((key.to_string(), value.to_string()));
            }
        }

        let [document, command]: [String; 2] = positional
            .try_into()
            .map_err(|_| "run needs a document and a command".to_string())?;
        Ok(RunArgs {
            document: PathBuf::from(document),
            command,
            params,
            config,
        })
    }
}

fn load_config(path: Option<&Path>) -> miette::Result<Config> {
    let config = match path {
        Some(path) => {
            let source = std::fs::read_to_string(path)
                .into_diagnostic()
                .wrap_err_with(|| format!("reading config {}", path.display()))?;
            Config::from_json(&path.display().to_string(), &source)?
        }
        None => Config::default(),
    };
    Ok(config.with_env_overrides())
}

async fn run(args: RunArgs) -> miette::Result<()> {
    let name = args.document.display().to_string();
    let source = std::fs::read_to_string(&args.document)
        .into_diagnostic()
        .wrap_err_with(|| format!("reading document {name}"))?;
    let doc = MemoryDocument::from_json(&name, &source)?;
    let config = load_config(args.config.as_deref())?;

    let params = (!args.params.is_empty()).then(|| ParameterBag::from_pairs(args.params));
    let base = args
        .document
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let seen = doc.notifications().len();

    let (outcome, doc) = spiralgen::run_on_snapshot(
        doc,
        FileFetcher::new(base),
        config,
        &args.command,
        params.as_ref(),
    )
    .await;

    for note in &doc.notifications()[seen..] {
        eprintln!("notice: {note}");
    }
    std::fs::write(&args.document, doc.to_json()?)
        .into_diagnostic()
        .wrap_err_with(|| format!("writing document {name}"))?;

    println!("{}", outcome.message);
    if !outcome.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_suggestions(key: &str, query: &str) -> ! {
    let Some(list) = suggestions(key, query) else {
        eprintln!("no suggestions for `{key}`");
        std::process::exit(1);
    };
    for item in list {
        println!("{item}");
    }
    std::process::exit(0);
}
