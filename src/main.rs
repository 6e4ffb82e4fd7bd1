use clap::{Parser, ValueEnum};
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use treeplate::{Configuration, Result, Settings, TreeplateError, load_configuration};

const LONG_HELP: &str = r#"
Layout (relative to --rootdir):
  config/config.properties        - base key=value pairs (required)
  config/config-<profile>.properties - overlay per profile, later profiles win
  input/**                        - files to render
  output/**                       - rendered files, same relative paths

Placeholders:
  {{ key }}  - replaced by the value of `key`, or nothing if undefined

Examples:
  # Render /workspace/input into /workspace/output
  treeplate
  # Use another root and two overlay profiles
  treeplate --rootdir ./deploy --profiles prod,eu
  # Print rendered files to stdout, write nothing
  treeplate --dryrun
  # Skip backup files and a vendored directory
  treeplate -x '*.bak' -x vendor
  # Show the merged configuration as JSON
  treeplate --profiles prod --list=json
"#;

/// Render a directory tree of `{{key}}` templates from layered properties files.
///
/// Licensed under the EUPL v1.2.
#[derive(Parser, Debug)]
#[command(
    name = "treeplate",
    version,
    about = "Render a directory tree of {{key}} templates from layered properties files.",
    after_long_help = LONG_HELP
)]
struct Cli {
    /// Root directory the other directories are resolved against
    #[arg(
        long = "rootdir",
        alias = "root-dir",
        value_name = "DIR",
        env = "TREEPLATE_ROOT_DIR",
        default_value = "/workspace"
    )]
    root_dir: PathBuf,

    /// Config directory relative to the root directory
    #[arg(long = "configdir", alias = "config-dir", value_name = "DIR", default_value = "./config")]
    config_dir: PathBuf,

    /// Input directory of files to process, relative to the root directory
    #[arg(long = "inputdir", alias = "input-dir", value_name = "DIR", default_value = "./input")]
    input_dir: PathBuf,

    /// Output directory for processed files, relative to the root directory
    #[arg(long = "outputdir", alias = "output-dir", value_name = "DIR", default_value = "./output")]
    output_dir: PathBuf,

    /// Comma separated list of profiles, later profiles override earlier ones
    #[arg(long, value_name = "LIST", value_delimiter = ',')]
    profiles: Vec<String>,

    /// Write processed files to stdout instead of the output directory
    #[arg(long = "dryrun", alias = "dry-run", conflicts_with = "list")]
    dry_run: bool,

    /// Exclude glob patterns (repeatable), relative to the input directory
    #[arg(short = 'x', long = "exclude", value_name = "GLOB", action = clap::ArgAction::Append)]
    exclude: Vec<String>,

    /// Print the merged configuration and exit (optionally with format: plain, json)
    #[arg(long, value_name = "FORMAT", num_args = 0..=1, default_missing_value = "plain")]
    list: Option<ListFormat>,

    /// Increase verbosity (can be used multiple times)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all logging except errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq)]
enum ListFormat {
    /// One key=value per line
    Plain,
    /// JSON object for scripting
    Json,
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    let mut settings = Settings::from_root(
        &cli.root_dir,
        &cli.config_dir,
        &cli.input_dir,
        &cli.output_dir,
    );
    settings.profiles = cli.profiles.clone();
    settings.dry_run = cli.dry_run;
    settings.exclude = cli.exclude.clone();
    tracing::debug!(?settings, "Parameters");

    let result = if let Some(format) = cli.list {
        list_configuration(&settings, format)
    } else {
        treeplate::run(&settings).map(|_| ())
    };

    match result {
        Ok(()) => {}
        Err(e @ TreeplateError::Glob(_)) => {
            eprintln!("Error: Invalid exclude pattern: {e}");
            std::process::exit(2);
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

/// Installs the stderr subscriber once; `RUST_LOG` directives are honored on
/// top of the level chosen by `-q`/`-v`
fn init_logging(cli: &Cli) {
    let level = match (cli.quiet, cli.verbose) {
        (true, _) => LevelFilter::ERROR,
        (false, 0) => LevelFilter::WARN,
        (false, 1) => LevelFilter::INFO,
        (false, 2) => LevelFilter::DEBUG,
        (false, _) => LevelFilter::TRACE,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(io::stderr().is_terminal())
                .with_target(false),
        )
        .with(filter)
        .try_init();
}

fn list_configuration(settings: &Settings, format: ListFormat) -> Result<()> {
    let configuration = load_configuration(&settings.config_dir, &settings.profiles)?;
    let rendered = render_configuration(&configuration, format)?;

    let mut stdout = io::stdout().lock();
    stdout.write_all(rendered.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

fn render_configuration(configuration: &Configuration, format: ListFormat) -> Result<String> {
    match format {
        ListFormat::Plain => Ok(configuration
            .iter()
            .map(|(key, value)| format!("{key}={value}\n"))
            .collect()),
        ListFormat::Json => {
            let mut json = serde_json::to_string_pretty(configuration)?;
            json.push('\n');
            Ok(json)
        }
    }
}
