use clap::{Parser as ClapParser, Subcommand};
use quill_lang::{
    EvalOptions, Format, FunctionRegistry, RunConfig, TypeDiscipline,
    cli::{self, CheckOptions, CheckResult, CliError, RunOptions},
};
use std::{
    io::{self, Read},
    path::PathBuf,
};
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

/// Status for failures nobody anticipated (panics).
const INTERNAL_ERROR: i32 = 3;

#[derive(ClapParser)]
#[command(name = "quill")]
#[command(about = "Quill - derive document fields with small, auditable expressions")]
#[command(version)]
struct Cli {
    /// More logging on stderr (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the syntax of a script
    Check {
        /// The script to check
        script: String,
    },

    /// Evaluate a script against a document and print the result
    Eval {
        /// The script to evaluate
        script: String,

        /// Document file (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Document format (json or xml); guessed from the file extension
        #[arg(short, long)]
        format: Option<Format>,

        /// Use the strict type discipline
        #[arg(long)]
        strict: bool,

        /// Directory holding Lookups/ and LookupConfigs/
        #[arg(long)]
        tables: Option<PathBuf>,
    },

    /// Run a pipeline definition against a document
    Run {
        /// Pipeline definition (JSON)
        #[arg(short, long)]
        pipeline: PathBuf,

        /// Input document
        #[arg(short, long)]
        input: PathBuf,

        /// Output document (printed to stdout if not provided)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Input format (json or xml); guessed from the file extension
        #[arg(short, long)]
        format: Option<Format>,

        /// Directory for per-instruction snapshots
        #[arg(long)]
        intermediate: Option<PathBuf>,

        /// Directory holding Lookups/ and LookupConfigs/
        #[arg(long)]
        tables: Option<PathBuf>,

        /// Run configuration (JSON); flags take precedence
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Use the strict type discipline
        #[arg(long)]
        strict: bool,
    },

    /// List built-in functions
    Functions,

    /// List documentation categories
    Docs,

    /// Show documentation for a specific category
    Doc {
        /// Category name (use 'quill docs' to list categories)
        category: String,
    },
}

fn main() {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("internal error: {}", info);
        std::process::exit(INTERNAL_ERROR);
    }));

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Check { script } => run_check(script),
        Commands::Eval {
            script,
            input,
            format,
            strict,
            tables,
        } => run_eval(script, input, format, strict, tables),
        Commands::Run {
            pipeline,
            input,
            output,
            format,
            intermediate,
            tables,
            config,
            strict,
        } => run_pipeline(
            pipeline,
            input,
            output,
            format,
            intermediate,
            tables,
            config,
            strict,
        ),
        Commands::Functions => {
            print!(
                "{}",
                cli::function_reference(&FunctionRegistry::with_builtins(), None)
            );
            Ok(())
        }
        Commands::Docs => {
            print!("{}", cli::get_docs_overview());
            Ok(())
        }
        Commands::Doc { category } => {
            cli::get_doc_category(&category, &FunctionRegistry::with_builtins())
                .map(|content| print!("{}", content))
        }
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(e.exit_code());
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn options(strict: bool) -> EvalOptions {
    EvalOptions {
        discipline: if strict {
            TypeDiscipline::Strict
        } else {
            TypeDiscipline::Coercive
        },
        ..Default::default()
    }
}

fn run_check(script: String) -> Result<(), CliError> {
    let options = CheckOptions {
        script,
        syntax_only: true,
        ..Default::default()
    };
    cli::execute_check(&options)?;
    println!("Syntax is valid");
    Ok(())
}

fn run_eval(
    script: String,
    input: Option<PathBuf>,
    format: Option<Format>,
    strict: bool,
    tables: Option<PathBuf>,
) -> Result<(), CliError> {
    let (input, format) = match input {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| quill_lang::Error::io(&path, e))?;
            (Some(text), format.or(Some(Format::from_path(&path))))
        }
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            let format = format.or_else(|| {
                buffer
                    .trim_start()
                    .starts_with('<')
                    .then_some(Format::Xml)
            });
            (Some(buffer), format)
        }
        None => (None, format),
    };

    let options = CheckOptions {
        script,
        input,
        format,
        options: options(strict),
        tables,
        syntax_only: false,
    };

    match cli::execute_check(&options)? {
        CheckResult::SyntaxValid => println!("Syntax is valid"),
        CheckResult::Success(value) => println!("{}", value),
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_pipeline(
    pipeline: PathBuf,
    input: PathBuf,
    output: Option<PathBuf>,
    format: Option<Format>,
    intermediate: Option<PathBuf>,
    tables: Option<PathBuf>,
    config: Option<PathBuf>,
    strict: bool,
) -> Result<(), CliError> {
    let mut config = match config {
        Some(path) => RunConfig::load(&path)?,
        None => RunConfig::default(),
    };
    if strict {
        config.options.discipline = TypeDiscipline::Strict;
    }
    if intermediate.is_some() {
        config.intermediate_dir = intermediate;
    }
    if tables.is_some() {
        config.tables_dir = tables;
    }

    let print_result = output.is_none();
    let options = RunOptions {
        pipeline,
        input,
        output,
        format,
        config,
    };
    let report = cli::execute_run(&options)?;

    for warning in &report.warnings {
        eprintln!("warning: {}", warning);
    }
    if print_result {
        println!("{}", report.document.render()?);
    }
    Ok(())
}
