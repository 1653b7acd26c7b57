//! Minimal CLI: check documents against a schema, or describe the compiled schema
use std::path::{Path as FsPath, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context as _};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;

use crate::compiler::Validator;
use crate::field::{self, ErrorKind, ErrorList, FieldError, Path};
use crate::ir::Schema;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// compile validation directives from a schema document and run them against JSON records
#[derive(Parser, Debug)]
#[command(name = "json-vgen")]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// validate documents and print their errors
    Check(CheckOut),
    /// print the compiled plan (directives, list-access modes, unions) as JSON
    Describe(DescribeOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /spec/template)
    #[arg(long)]
    json_pointer: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct CheckOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// schema document (.json)
    #[arg(long)]
    schema: PathBuf,

    /// record type to validate (the schema's root type if omitted)
    #[arg(long = "type")]
    type_name: Option<String>,

    /// previous version of the record; validates every input as an update of it
    #[arg(long)]
    old: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(clap::Parser, Debug)]
struct DescribeOut {
    /// schema document (.json)
    #[arg(long)]
    schema: PathBuf,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

/// One record to validate, with where it came from.
#[derive(Debug)]
struct Document {
    source: String,
    value: Value,
}

#[derive(Serialize)]
struct Report<'a> {
    source: &'a str,
    valid: bool,
    errors: &'a ErrorList,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn load_documents(&self) -> anyhow::Result<Vec<Document>> {
        let source_paths = resolve_file_path_patterns(&self.input).context("failed to resolve input file paths")?;
        let mut documents = Vec::new();
        for source_path in source_paths {
            let source_path_str = source_path.to_string_lossy().to_string();
            let source = std::fs::read_to_string(&source_path)
                .with_context(|| format!("failed to read source file ({source_path_str})"))?;
            if self.ndjson {
                for (line_no, line) in source.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let value = serde_json::from_str::<Value>(line).with_context(|| {
                        format!("failed to parse JSON line ({source_path_str}:{})", line_no + 1)
                    })?;
                    documents.push(Document {
                        source: format!("{source_path_str}:{}", line_no + 1),
                        value: self.select(value, &source_path_str)?,
                    });
                }
            } else {
                let value = serde_json::from_str::<Value>(&source)
                    .with_context(|| format!("failed to parse JSON source file ({source_path_str})"))?;
                documents.push(Document {
                    value: self.select(value, &source_path_str)?,
                    source: source_path_str,
                });
            }
        }
        Ok(documents)
    }

    fn select(&self, value: Value, source: &str) -> anyhow::Result<Value> {
        select_pointer(value, self.json_pointer.as_deref(), source)
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> anyhow::Result<ExitCode> {
        match &self.cmd {
            Command::Check(target) => target.run(),
            Command::Describe(target) => {
                let validator = compile_schema(&target.schema)?;
                let plan_src = serde_json::to_string_pretty(validator.plan())?;
                write_output(target.out.as_deref(), &plan_src)?;
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}

impl CheckOut {
    fn run(&self) -> anyhow::Result<ExitCode> {
        let validator = compile_schema(&self.schema)?;
        let type_name = match self.type_name.as_deref().or(validator.root()) {
            Some(name) => name.to_string(),
            None => bail!("no record type given: pass --type or set \"root\" in the schema"),
        };
        if !validator.type_names().any(|t| t == type_name) {
            bail!("schema has no record type {type_name:?}");
        }

        let old = match &self.old {
            Some(path) => {
                let src = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read old document ({})", path.display()))?;
                let value = serde_json::from_str::<Value>(&src)
                    .with_context(|| format!("failed to parse old document ({})", path.display()))?;
                let source = path.to_string_lossy();
                Some(select_pointer(value, self.input_settings.json_pointer.as_deref(), &source)?)
            }
            None => None,
        };

        let documents = self.input_settings.load_documents()?;
        let results: Vec<ErrorList> = documents
            .par_iter()
            .map(|doc| {
                let result = match &old {
                    Some(old) => validator.validate_update(&type_name, &doc.value, old),
                    None => validator.validate(&type_name, &doc.value),
                };
                result.unwrap_or_else(|err| field::internal(&Path::root(), err.to_string()).into())
            })
            .collect();

        let mut invalid = 0usize;
        let mut reports = Vec::with_capacity(documents.len());
        for (doc, errors) in documents.iter().zip(&results) {
            tracing::info!(source = %doc.source, errors = errors.len(), "validated");
            if !errors.is_empty() {
                invalid += 1;
            }
            reports.push(Report { source: &doc.source, valid: errors.is_empty(), errors });
        }

        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
            OutputFormat::Text => {
                for report in &reports {
                    print_report(report);
                }
            }
        }
        Ok(if invalid == 0 { ExitCode::SUCCESS } else { ExitCode::from(1) })
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn compile_schema(path: &FsPath) -> anyhow::Result<Validator> {
    let bytes = std::fs::read(path).with_context(|| format!("failed to read schema ({})", path.display()))?;
    let schema: Schema = crate::path_de::from_slice_with_path(&bytes)
        .with_context(|| format!("failed to parse schema ({})", path.display()))?;
    let validator = Validator::compile(&schema)
        .with_context(|| format!("failed to compile schema ({})", path.display()))?;
    Ok(validator)
}

fn select_pointer(value: Value, pointer: Option<&str>, source: &str) -> anyhow::Result<Value> {
    let Some(pointer) = pointer else { return Ok(value) };
    match value.pointer(pointer) {
        Some(node) => Ok(node.clone()),
        None => bail!("JSON pointer {pointer:?} selects nothing in {source}"),
    }
}

fn write_output(out: Option<&FsPath>, contents: &str) -> anyhow::Result<()> {
    match out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(out, contents).with_context(|| format!("failed to write {}", out.display()))?;
        }
        None => println!("{contents}"),
    }
    Ok(())
}

fn print_report(report: &Report<'_>) {
    if report.valid {
        println!("{} {}", "✓".green(), report.source);
        return;
    }
    println!("{} {} ({} errors)", "✗".red(), report.source.bold(), report.errors.len());
    for error in report.errors {
        println!("    {}", render_error(error));
    }
}

fn render_error(error: &FieldError) -> String {
    let label = match error.kind {
        ErrorKind::Required | ErrorKind::Forbidden => error.kind.label().yellow(),
        ErrorKind::Internal => error.kind.label().magenta(),
        _ => error.kind.label().red(),
    };
    let mut out = String::new();
    if !error.path.is_root() {
        out.push_str(&format!("{}: ", error.path.to_string().bold()));
    }
    out.push_str(&label.to_string());
    if let Some(value) = &error.bad_value {
        out.push_str(&format!(": {value}"));
    }
    if !error.detail.is_empty() {
        out.push_str(&format!(": {}", error.detail));
    }
    if let Some(origin) = &error.origin {
        out.push_str(&format!(" {}", format!("[{origin}]").dimmed()));
    }
    out
}

fn resolve_file_path_patterns<I>(patterns: I) -> anyhow::Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'['))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
