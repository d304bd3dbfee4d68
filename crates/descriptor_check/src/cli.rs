use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use descriptor_core::{to_document, to_yaml_string, EffectiveDescriptor};
use tracing::info;

use crate::outcome::{check_path, CheckOutcome};

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "descriptor-check",
    about = "Validate and normalize serverless deployment descriptors",
    long_about = "Loads a serverless.yml-shaped deployment descriptor, reports every\n\
                  validation error in one pass and prints normalization warnings.\n\
                  Exit codes: 0 valid, 1 invalid, 2 unreadable or malformed input."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check a descriptor and print a one-line summary
    Validate(CheckArgs),
    /// Check a descriptor and print its effective form with defaults applied
    Normalize {
        #[command(flatten)]
        args: CheckArgs,
        /// Document format for the effective descriptor
        #[arg(value_enum, long, default_value_t = OutputFormat::Yaml)]
        output: OutputFormat,
    },
}

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Descriptor file (.yml/.yaml or .json)
    #[arg(env = "DESCRIPTOR_PATH", default_value = "serverless.yml")]
    pub path: PathBuf,
    /// Exit with status 1 when normalization produced warnings
    /// (the variable takes `1`/`0`, `yes`/`no`, `on`/`off`, `true`/`false`)
    #[arg(
        long,
        env = "DESCRIPTOR_DENY_WARNINGS",
        action = ArgAction::SetTrue,
        value_parser = BoolishValueParser::new()
    )]
    pub deny_warnings: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Yaml,
    Json,
}

impl Command {
    pub fn args(&self) -> &CheckArgs {
        match self {
            Self::Validate(args) | Self::Normalize { args, .. } => args,
        }
    }
}

// ── execution ──────────────────────────────────────────────────────

/// Runs one check, writing command output to `stdout` and diagnostics to
/// `stderr`. Returns the process exit code.
pub fn run(cli: &Cli, stdout: &mut dyn Write, stderr: &mut dyn Write) -> anyhow::Result<i32> {
    let args = cli.command.args();
    let path = args.path.display();
    info!(path = %args.path.display(), deny_warnings = args.deny_warnings, "checking descriptor");

    let report = check_path(&args.path);
    match &report.outcome {
        CheckOutcome::LoadFailed(error) => {
            writeln!(stderr, "error: {error}")?;
        }
        CheckOutcome::Invalid(errors) => {
            for error in errors {
                writeln!(stderr, "error: {error}")?;
            }
            writeln!(stdout, "{path}: invalid, {} error(s)", errors.len())?;
        }
        CheckOutcome::Warnings(warnings) => {
            for warning in warnings {
                writeln!(stderr, "warning: {warning}")?;
            }
        }
        CheckOutcome::Clean => {}
    }

    if let Some(effective) = &report.effective {
        match &cli.command {
            Command::Validate(_) => writeln!(
                stdout,
                "{path}: {}",
                summary(effective, args.deny_warnings)
            )?,
            Command::Normalize { output, .. } => {
                let document = render(effective, *output)?;
                write!(stdout, "{document}")?;
            }
        }
    }

    let code = report.outcome.exit_code(args.deny_warnings);
    info!(path = %args.path.display(), exit_code = code, "descriptor check finished");
    Ok(code)
}

fn summary(effective: &EffectiveDescriptor, deny_warnings: bool) -> String {
    let warnings = effective.warnings.len();
    let status = match warnings {
        0 => "ok".to_string(),
        _ if deny_warnings => format!("failed, {warnings} warning(s) denied"),
        _ => format!("ok with {warnings} warning(s)"),
    };
    format!(
        "{status} ({} route(s), fingerprint {})",
        effective.routes.len(),
        effective.fingerprint()
    )
}

fn render(effective: &EffectiveDescriptor, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Yaml => {
            to_yaml_string(&effective.descriptor).context("failed to encode descriptor as YAML")
        }
        OutputFormat::Json => {
            let mut text = serde_json::to_string_pretty(&to_document(&effective.descriptor))
                .context("failed to encode descriptor as JSON")?;
            text.push('\n');
            Ok(text)
        }
    }
}
