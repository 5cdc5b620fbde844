use std::io::Read;
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use wormbait::config::{ConfigLoader, Overrides, ResolvedConfig};
use wormbait::domain::EntityKind;
use wormbait::error::WormbaitError;
use wormbait::output::{Console, JsonOutput, OutputMode};
use wormbait::pipeline::{CancelToken, Pipeline, RunRequest};
use wormbait::wormbase::{WormbaseClient, WormbaseHttpClient};

#[derive(Parser)]
#[command(name = "wormbait")]
#[command(about = "Collect WormBase annotations for Cuffdiff XLOC ids into one CSV table")]
#[command(version, author, args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(flatten)]
    run: RunArgs,

    #[arg(long, global = true)]
    config: Option<String>,

    #[arg(long, global = true)]
    service_base: Option<String>,

    #[arg(long, global = true, value_name = "SECS")]
    timeout: Option<u64>,

    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Fetch a single WormBase field and print its data payload")]
    Field(FieldArgs),
}

#[derive(Args, Clone, Default)]
struct RunArgs {
    /// XLOC ids; separated by whitespace, commas or newlines
    ids: Vec<String>,

    /// Read ids from a file (`-` for stdin)
    #[arg(long, value_name = "FILE")]
    ids_file: Option<String>,

    /// Cuffdiff differential expression table (CSV, optionally .gz)
    #[arg(short, long, value_name = "FILE")]
    database: Option<Utf8PathBuf>,

    /// Destination CSV
    #[arg(short, long, value_name = "FILE")]
    output: Option<Utf8PathBuf>,

    /// Do not remember the inputs in wormbait.json
    #[arg(long)]
    no_save: bool,
}

#[derive(Args)]
struct FieldArgs {
    kind: EntityKind,
    id: String,
    field: String,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<WormbaitError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &WormbaitError) -> u8 {
    match error {
        WormbaitError::InvalidInput(_)
        | WormbaitError::MissingDatabasePath
        | WormbaitError::MissingOutputPath => 2,
        WormbaitError::MalformedTable { .. }
        | WormbaitError::MalformedHeader(_)
        | WormbaitError::DatabaseRead { .. } => 3,
        WormbaitError::OutputWrite { .. } => 4,
        WormbaitError::Cancelled => 130,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Console
    };
    let overrides = Overrides {
        identifiers: read_identifiers(&cli.run)?,
        database: cli.run.database.clone(),
        output: cli.run.output.clone(),
        service_base: cli.service_base.clone(),
        timeout_secs: cli.timeout,
    };
    let resolved = ConfigLoader::resolve(cli.config.as_deref(), overrides)?;
    let client = WormbaseHttpClient::with_settings(&resolved.service_base, resolved.timeout)?;

    match cli.command {
        Some(Commands::Field(args)) => run_field(args, client),
        None => run_aggregate(cli.run, resolved, client, output_mode),
    }
}

fn read_identifiers(args: &RunArgs) -> miette::Result<Option<String>> {
    if !args.ids.is_empty() {
        return Ok(Some(args.ids.join("\n")));
    }
    match args.ids_file.as_deref() {
        Some("-") => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .into_diagnostic()?;
            Ok(Some(text))
        }
        Some(path) => std::fs::read_to_string(path).into_diagnostic().map(Some),
        None => Ok(None),
    }
}

fn run_aggregate(
    args: RunArgs,
    resolved: ResolvedConfig,
    client: WormbaseHttpClient,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let request = RunRequest {
        identifiers: resolved.identifiers.clone().unwrap_or_default(),
        database: resolved.database.clone(),
        output: resolved.output.clone(),
    };
    let pipeline = Pipeline::new(client).with_gene_prefix(&resolved.gene_prefix);
    let cancel = CancelToken::new();

    let summary = match output_mode {
        OutputMode::Json => {
            let summary = pipeline.run(&request, &JsonOutput, &cancel)?;
            JsonOutput::print_summary(&summary).into_diagnostic()?;
            summary
        }
        OutputMode::Console => {
            let summary = Console::run(move |sink| pipeline.run(&request, sink, &cancel))?;
            Console::print_summary(&summary);
            summary
        }
    };

    if !args.no_save {
        let mut preferences = ConfigLoader::load(&resolved.path).unwrap_or_default();
        preferences.remember(&summary.identifiers, &summary.database, &summary.output);
        if let Err(err) = preferences.save(&resolved.path) {
            warn!(error = %err, path = %resolved.path.display(), "could not save preferences");
        }
    }
    Ok(())
}

fn run_field<C: WormbaseClient>(args: FieldArgs, client: C) -> miette::Result<()> {
    let value = client.fetch_field(args.kind, &args.id, &args.field)?;
    let json = serde_json::to_string_pretty(&value).into_diagnostic()?;
    println!("{json}");
    Ok(())
}
