use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod audit;
mod check;
mod diagnostics;
mod manifest;
mod render;
mod report;

use manifest::{Manifest, Requirement};
use render::Format;

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "reqlint")]
#[command(about = "Lint, format and audit requirements manifests", long_about = None)]
struct Cli {
    /// Log debug details to stderr (RUST_LOG overrides).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Args)]
struct ManifestArg {
    /// Manifest file to read.
    #[arg(env = "REQLINT_MANIFEST", default_value = "requirements.txt")]
    manifest: String,
}

#[derive(Args)]
struct CheckArgs {
    /// Treat unpinned requirements as errors.
    #[arg(long, env = "REQLINT_REQUIRE_PINS")]
    require_pins: bool,

    /// Warn about names not written in normalized form.
    #[arg(long)]
    strict_names: bool,
}

#[derive(Args)]
struct AuditArgs {
    /// Map an import name to its distribution, e.g. `PIL=pillow`.
    #[arg(long = "map", value_name = "MODULE=PACKAGE")]
    maps: Vec<String>,

    /// Distribution to leave out of the audit (repeatable).
    #[arg(long = "ignore", value_name = "PACKAGE")]
    ignore: Vec<String>,
}

impl AuditArgs {
    fn run(&self, manifest: &Manifest, src: &str) -> Result<audit::AuditReport> {
        let mut map = audit::ModuleMap::default();
        for spec in &self.maps {
            map.apply_override(spec)?;
        }
        let opts = audit::AuditOptions::with_ignored(&self.ignore);
        let imports = audit::scan_tree(src)?;
        Ok(audit::audit(manifest, &imports, &map, &opts))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Check manifest hygiene (duplicates, conflicting pins, unpinned entries).
    Check {
        #[command(flatten)]
        input: ManifestArg,

        #[command(flatten)]
        opts: CheckArgs,

        #[arg(long, value_enum, env = "REQLINT_FORMAT", default_value_t)]
        format: Format,
    },

    /// Print the manifest in canonical form.
    Fmt {
        #[command(flatten)]
        input: ManifestArg,

        /// Drop redundant duplicate entries.
        #[arg(long)]
        dedupe: bool,

        /// Exit non-zero if the file is not already canonical.
        #[arg(long, conflicts_with = "write")]
        check: bool,

        /// Rewrite the file in place.
        #[arg(long)]
        write: bool,
    },

    /// List parsed requirements.
    List {
        #[command(flatten)]
        input: ManifestArg,

        #[arg(long, value_enum, env = "REQLINT_FORMAT", default_value_t)]
        format: Format,
    },

    /// Compare the imports of a Python source tree with the manifest.
    Audit {
        #[command(flatten)]
        input: ManifestArg,

        /// Source directory to scan.
        #[arg(long)]
        src: String,

        #[command(flatten)]
        audit: AuditArgs,

        #[arg(long, value_enum, env = "REQLINT_FORMAT", default_value_t)]
        format: Format,
    },

    /// Generate an HTML report.
    Report {
        #[command(flatten)]
        input: ManifestArg,

        #[command(flatten)]
        opts: CheckArgs,

        /// Also audit imports under this directory.
        #[arg(long)]
        src: Option<String>,

        #[command(flatten)]
        audit: AuditArgs,

        #[arg(short = 'o', long)]
        out: String,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// 1 when anything failed, 0 otherwise.
fn exit_status(failed: bool) -> u8 {
    u8::from(failed)
}

fn exit_code(failed: bool) -> ExitCode {
    ExitCode::from(exit_status(failed))
}

fn write_output(path: &str, contents: &str) -> Result<()> {
    fs::write(path, contents)
        .with_context(|| diagnostics::error_message(format!("write {}", path)))?;
    println!("Wrote {}", path);
    Ok(())
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.cmd {
        Commands::Check {
            input,
            opts,
            format,
        } => {
            let manifest = Manifest::read(&input.manifest)?;
            if manifest.is_empty() {
                diagnostics::warn(format!("{} declares no requirements", input.manifest));
            }
            let report = check::check(
                &manifest,
                &check::CheckOptions {
                    require_pins: opts.require_pins,
                    strict_names: opts.strict_names,
                },
            );
            tracing::debug!(findings = report.findings.len(), "checked {}", input.manifest);

            match format {
                Format::Text => print!("{}", render::render_check_text(&input.manifest, &report)),
                Format::Json => print!("{}", render::to_json(&report)?),
            }
            Ok(exit_code(report.has_errors()))
        }

        Commands::Fmt {
            input,
            dedupe,
            check,
            write,
        } => {
            let (original, manifest) = Manifest::read_with_text(&input.manifest)?;
            let outcome = manifest.format_against(&original, dedupe);
            for r in &outcome.removed {
                diagnostics::warn(diagnostics::located(
                    &input.manifest,
                    r.line,
                    format!("removed duplicate {}", r.render()),
                ));
            }

            if check {
                if !outcome.canonical {
                    eprintln!("{} is not canonically formatted", input.manifest);
                }
                return Ok(exit_code(!outcome.canonical));
            }

            if write {
                if !outcome.canonical {
                    write_output(&input.manifest, &outcome.rendered)?;
                }
            } else {
                print!("{}", outcome.rendered);
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::List { input, format } => {
            let manifest = Manifest::read(&input.manifest)?;
            match format {
                Format::Text => print!("{}", render::render_list_text(&manifest)),
                Format::Json => {
                    let records: Vec<&Requirement> = manifest.requirements().collect();
                    print!("{}", render::to_json(&records)?);
                }
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Audit {
            input,
            src,
            audit,
            format,
        } => {
            let manifest = Manifest::read(&input.manifest)?;
            let report = audit.run(&manifest, &src)?;

            match format {
                Format::Text => print!("{}", render::render_audit_text(&input.manifest, &report)),
                Format::Json => print!("{}", render::to_json(&report)?),
            }
            Ok(exit_code(report.has_errors()))
        }

        Commands::Report {
            input,
            opts,
            src,
            audit,
            out,
        } => {
            let manifest = Manifest::read(&input.manifest)?;
            let checked = check::check(
                &manifest,
                &check::CheckOptions {
                    require_pins: opts.require_pins,
                    strict_names: opts.strict_names,
                },
            );

            let audited = match &src {
                Some(dir) => Some(audit.run(&manifest, dir)?),
                None => None,
            };

            let data = report::build_report_data(
                &input.manifest,
                &manifest,
                &checked,
                audited.as_ref(),
            );
            let html = render::render_html_report(&data)?;
            write_output(&out, &html)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
