//! SC-017: CLI subcommands: compile, fingerprint, schema.

pub mod config;

use crate::core::{compile_template, schema, Parameters, ParseResult};
use crate::fingerprint::hasher;
use clap::{Args, Subcommand};
use config::{OutputFormat, ProjectConfig, CONFIG_FILE, DEFAULT_TEMPLATE};
use std::path::{Path, PathBuf};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compile a template and print the resolved function/resource specs
    Compile {
        #[command(flatten)]
        input: TemplateArgs,

        /// Output format (default: samc.toml `format`, then yaml)
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Print BLAKE3 fingerprints of the compiled output
    Fingerprint {
        #[command(flatten)]
        input: TemplateArgs,
    },

    /// Print the JSON Schema of the compile output
    Schema,
}

/// Template location and parameter overrides shared by subcommands.
#[derive(Args, Debug, Clone)]
pub struct TemplateArgs {
    /// Template path (default: samc.toml `template`, then template.yaml)
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Parameter override, repeatable: --param Stage=prod
    #[arg(short, long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,

    /// Project config file
    #[arg(long, default_value = CONFIG_FILE)]
    pub config: PathBuf,
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<(), String> {
    match cmd {
        Commands::Compile { input, format } => cmd_compile(&input, format),
        Commands::Fingerprint { input } => cmd_fingerprint(&input),
        Commands::Schema => cmd_schema(),
    }
}

/// Everything needed to run one compile.
#[derive(Debug)]
struct Inputs {
    template: PathBuf,
    parameters: Parameters,
    format: OutputFormat,
}

/// Precedence: flags, then samc.toml, then built-in defaults.
fn resolve_inputs(args: &TemplateArgs, format: Option<OutputFormat>) -> Result<Inputs, String> {
    let config = ProjectConfig::load(&args.config)?;
    let template = args
        .file
        .clone()
        .or_else(|| config.template_path())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_TEMPLATE));

    let mut parameters = config.parameters();
    for raw in &args.params {
        let (key, value) = parse_param(raw)?;
        parameters.insert(key, value);
    }

    Ok(Inputs {
        template,
        parameters,
        format: format.or(config.format).unwrap_or_default(),
    })
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("invalid --param {:?}: expected KEY=VALUE", raw)),
    }
}

fn compile_file(inputs: &Inputs) -> Result<ParseResult, String> {
    let content = std::fs::read_to_string(&inputs.template)
        .map_err(|e| format!("cannot read {}: {}", inputs.template.display(), e))?;
    let result = compile_template(&content, &inputs.parameters)
        .map_err(|e| format!("{}: {}", inputs.template.display(), e))?;
    for warning in &result.warnings {
        eprintln!("warning: {}", warning);
    }
    Ok(result)
}

fn render(result: &ParseResult, format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(result).map_err(|e| format!("serialize error: {}", e))
        }
        OutputFormat::Yaml => {
            serde_yaml_ng::to_string(result).map_err(|e| format!("serialize error: {}", e))
        }
    }
}

fn cmd_compile(args: &TemplateArgs, format: Option<OutputFormat>) -> Result<(), String> {
    let inputs = resolve_inputs(args, format)?;
    let result = compile_file(&inputs)?;
    println!("{}", render(&result, inputs.format)?.trim_end());
    Ok(())
}

fn fingerprint_report(template: &Path, result: &ParseResult) -> Result<String, String> {
    let prints = hasher::fingerprint_result(result)?;
    let mut out = String::new();
    out.push_str(&format!("template   {}\n", hasher::hash_file(template)?));
    out.push_str(&format!("result     {}\n", prints.result));
    out.push_str(&format!("resources  {}\n", prints.resources));
    for (logical_id, digest) in &prints.functions {
        out.push_str(&format!("function   {}  {}\n", digest, logical_id));
    }
    Ok(out)
}

fn cmd_fingerprint(args: &TemplateArgs) -> Result<(), String> {
    let inputs = resolve_inputs(args, None)?;
    let result = compile_file(&inputs)?;
    print!("{}", fingerprint_report(&inputs.template, &result)?);
    Ok(())
}

fn cmd_schema() -> Result<(), String> {
    let text = serde_json::to_string_pretty(schema::output_schema())
        .map_err(|e| format!("serialize error: {}", e))?;
    println!("{}", text);
    Ok(())
}
