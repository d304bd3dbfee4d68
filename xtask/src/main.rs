use std::process::{exit, Command, ExitStatus};

use clap::{Parser, Subcommand, ValueEnum};

const FIXTURE_DESCRIPTOR: &str = "crates/descriptor_core/tests/fixtures/serverless.yml";

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "xtask",
    about = "Task runner for the deployment descriptor workspace",
    long_about = "A unified CLI for checking deployment descriptors and running\n\
                  CI checks in the deployment descriptor workspace."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a descriptor with the release build of descriptor-check
    CheckDescriptor {
        /// Descriptor file
        #[arg(default_value = "serverless.yml")]
        path: String,
        /// Fail on normalization warnings
        #[arg(long)]
        deny_warnings: bool,
    },
    /// Print the effective form of a descriptor
    Normalize {
        /// Descriptor file
        #[arg(default_value = "serverless.yml")]
        path: String,
        /// Output format passed through to descriptor-check
        #[arg(long, default_value = "yaml")]
        output: String,
    },
    /// Run CI checks (fmt, clippy, tests, fixture descriptor)
    Ci {
        /// Job to run
        #[arg(value_enum, default_value_t = CiJob::Check)]
        job: CiJob,
    },
}

#[derive(Clone, ValueEnum)]
enum CiJob {
    /// Formatting, clippy, and tests
    Check,
    /// Run descriptor-check against the bundled fixture
    Fixture,
    /// Run check + fixture
    All,
}

// ── helpers ────────────────────────────────────────────────────────

fn step(label: &str) {
    eprintln!("\n=== {label} ===");
}

fn cargo(args: &[&str]) -> ExitStatus {
    eprintln!("+ cargo {}", args.join(" "));
    Command::new("cargo")
        .args(args)
        .status()
        .expect("failed to execute cargo")
}

fn run_cargo(args: &[&str]) {
    let status = cargo(args);
    if !status.success() {
        exit(status.code().unwrap_or(1));
    }
}

fn descriptor_check(subcommand: &str, extra: &[&str]) {
    let mut args = vec![
        "run",
        "--quiet",
        "--release",
        "-p",
        "descriptor_check",
        "--",
        subcommand,
    ];
    args.extend_from_slice(extra);
    run_cargo(&args);
}

// ── CI jobs ────────────────────────────────────────────────────────

fn ci_check() {
    step("Check formatting");
    run_cargo(&["fmt", "--all", "--", "--check"]);

    step("Clippy");
    run_cargo(&[
        "clippy",
        "--all-targets",
        "--all-features",
        "--",
        "-D",
        "warnings",
    ]);

    step("Test descriptor_core");
    run_cargo(&["test", "-p", "descriptor_core"]);

    step("Test descriptor_check");
    run_cargo(&["test", "-p", "descriptor_check"]);
}

fn ci_fixture() {
    step("Check fixture descriptor");
    descriptor_check("validate", &["--deny-warnings", FIXTURE_DESCRIPTOR]);
}

// ── main ───────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::CheckDescriptor {
            path,
            deny_warnings,
        } => {
            let mut extra = vec![path.as_str()];
            if deny_warnings {
                extra.push("--deny-warnings");
            }
            descriptor_check("validate", &extra);
        }
        Commands::Normalize { path, output } => {
            descriptor_check("normalize", &[&path, "--output", &output]);
        }
        Commands::Ci { job } => match job {
            CiJob::Check => ci_check(),
            CiJob::Fixture => ci_fixture(),
            CiJob::All => {
                ci_check();
                ci_fixture();
            }
        },
    }
}
