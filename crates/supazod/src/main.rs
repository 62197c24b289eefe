use anyhow::Context;
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use supazod::SupazodConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "supazod")]
#[command(version)]
#[command(about = "Generate Zod schemas from Supabase database types")]
struct Cli {
    /// Supabase type declarations (output of `supabase gen types typescript`)
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// File to write the generated schemas to
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Config file (default: ./supazod.toml when present)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Database schema to generate
    #[arg(short, long, value_name = "NAME")]
    schema: Option<String>,

    /// Only generate declarations whose name matches (repeatable)
    #[arg(long, value_name = "REGEX")]
    include: Vec<String>,

    /// Skip declarations whose name matches (repeatable)
    #[arg(long, value_name = "REGEX")]
    exclude: Vec<String>,

    /// Skip declarations carrying this JSDoc tag (repeatable)
    #[arg(long, value_name = "TAG")]
    exclude_tag: Vec<String>,

    /// Keep JSDoc comments in the generated schemas
    #[arg(long)]
    keep_comments: bool,

    /// Do not turn JSDoc tags into refinements
    #[arg(long)]
    skip_parse_jsdoc: bool,

    /// Do not re-check the generated schemas
    #[arg(long)]
    skip_validation: bool,

    /// Maximum dependency-ordering passes
    #[arg(long, value_name = "N")]
    max_run: Option<usize>,

    /// External formatter argv, `{path}` is replaced by the output path (repeatable)
    #[arg(long = "format-command", value_name = "ARG", allow_hyphen_values = true)]
    format_command: Vec<String>,

    /// Print the run report as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    /// Apply flags on top of file configuration.
    fn apply(self, config: &mut SupazodConfig) {
        if let Some(input) = self.input {
            config.input = Some(input);
        }
        if let Some(output) = self.output {
            config.output = Some(output);
        }
        if let Some(schema) = self.schema {
            config.schema = schema;
        }
        config.filter.include.extend(self.include);
        config.filter.exclude.extend(self.exclude);
        config.filter.exclude_tags.extend(self.exclude_tag);
        config.convert.keep_comments |= self.keep_comments;
        config.convert.skip_parse_jsdoc |= self.skip_parse_jsdoc;
        config.convert.skip_validation |= self.skip_validation;
        if let Some(max_run) = self.max_run {
            config.convert.max_run = max_run;
        }
        if !self.format_command.is_empty() {
            config.format.command = self.format_command;
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir().context("failed to determine working directory")?;
    let mut config = SupazodConfig::load(&cwd, cli.config.as_deref())?;
    let json = cli.json;
    cli.apply(&mut config);

    let options = config.to_options()?;
    let converter = config.converter()?;
    let formatter = config.formatter(&options.output)?;

    let report = supazod::generate(&options, converter, formatter.as_ref())
        .with_context(|| format!("failed to generate {}", options.output.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    if !report.diagnostics.is_empty() {
        eprintln!("{} warning(s)", report.diagnostics.len());
    }
    println!("Generated {}", report.output.display());
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("supazod: {:#}", e);
        std::process::exit(1);
    }
}
