// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
use anyhow::{Context, Result};
use asp_cli::commands::{SchemaKind, schema_json};
use asp_cli::config::{CliConfig, default_harness, load_cli_config};
use asp_cli::format;
use asp_core::{HarnessId, SpaceRef};
use asp_harness::PathOracle;
use asp_invoke::{SequencedSink, events::NullSink};
use asp_ops::{InstallOptions, OpsContext, RunConfig};
use asp_store::AspHome;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Exit code for runtime errors.
const EXIT_RUNTIME_ERROR: i32 = 1;

#[derive(Parser, Debug)]
#[command(name = "asp", version, about = "Agent Spaces CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// ASP home directory (defaults to $ASP_HOME, then ~/.asp).
    #[arg(long, global = true)]
    asp_home: Option<PathBuf>,

    /// Registry checkout path or git URL (defaults to <asp-home>/registry).
    /// URLs are cloned into the home and fetched on each use.
    #[arg(long, global = true)]
    registry: Option<String>,

    /// Enable debug logging.
    #[arg(long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve targets without touching the store or disk.
    Resolve {
        /// Restrict to one target.
        target: Option<String>,
    },

    /// Resolve, pin, snapshot, and compose targets.
    Install {
        /// Restrict to one target.
        target: Option<String>,

        /// Harness to compose for.
        #[arg(long)]
        harness: Option<HarnessId>,

        /// Ignore the existing lock and re-resolve everything.
        #[arg(long)]
        no_lock: bool,
    },

    /// Install one target and print its bundle location.
    Build {
        /// The target to build.
        target: String,

        /// Harness to compose for.
        #[arg(long)]
        harness: Option<HarnessId>,
    },

    /// Compose (or reload) a target bundle and launch the harness.
    Run {
        /// The target to run.
        target: String,

        /// Harness to run.
        #[arg(long)]
        harness: Option<HarnessId>,

        /// One-shot prompt.
        #[arg(short, long)]
        prompt: Option<String>,

        /// Interactive session.
        #[arg(long)]
        interactive: bool,

        /// Model override.
        #[arg(long)]
        model: Option<String>,

        /// Skip permission prompts.
        #[arg(long)]
        yolo: bool,

        /// Print the command instead of spawning.
        #[arg(long)]
        dry_run: bool,

        /// Rebuild the bundle even when one exists.
        #[arg(long)]
        refresh: bool,

        /// Stable external session id.
        #[arg(long)]
        session: Option<String>,
    },

    /// Run a single space reference without a project.
    RunSpace {
        /// The reference, e.g. `space:base@stable`.
        reference: String,

        /// Harness to run.
        #[arg(long)]
        harness: Option<HarnessId>,

        /// One-shot prompt.
        #[arg(short, long)]
        prompt: Option<String>,

        /// Print the command instead of spawning.
        #[arg(long)]
        dry_run: bool,

        /// Skip permission prompts.
        #[arg(long)]
        yolo: bool,
    },

    /// Run a space working directory in dev mode.
    RunLocal {
        /// Directory containing `space.toml`.
        dir: PathBuf,

        /// Harness to run.
        #[arg(long)]
        harness: Option<HarnessId>,

        /// One-shot prompt.
        #[arg(short, long)]
        prompt: Option<String>,

        /// Print the command instead of spawning.
        #[arg(long)]
        dry_run: bool,

        /// Skip permission prompts.
        #[arg(long)]
        yolo: bool,
    },

    /// Show what the lock pinned for each target, and why.
    Explain {
        /// Restrict to one target.
        target: Option<String>,

        /// Harness whose artifacts to inspect.
        #[arg(long)]
        harness: Option<HarnessId>,

        /// Print JSON instead of pretty output.
        #[arg(long)]
        json: bool,
    },

    /// Compare a fresh resolution against the lock.
    Diff {
        /// The target to diff.
        target: String,
    },

    /// List the targets the project declares.
    List,

    /// Probe the home layout, registry, and harness binaries.
    Doctor,

    /// Sweep the store for snapshots no live lock references.
    Gc {
        /// Report without deleting.
        #[arg(long)]
        dry_run: bool,
    },

    /// Print a JSON schema.
    Schema {
        /// Which schema to print.
        #[arg(value_enum)]
        kind: SchemaKind,
    },
}

fn init_tracing(verbose: bool, configured: Option<&str>) {
    let default = if verbose {
        "debug"
    } else {
        configured.unwrap_or("warn")
    };
    let filter = EnvFilter::try_from_env("ASP_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn home_of(cli: &Cli) -> AspHome {
    match &cli.asp_home {
        Some(path) => AspHome::new(path),
        None => AspHome::from_env(),
    }
}

fn context(cli: &Cli, user_config: &CliConfig) -> Result<OpsContext> {
    let home = home_of(cli);
    let source = cli
        .registry
        .clone()
        .or_else(|| user_config.registry.clone())
        .unwrap_or_else(|| home.root().join("registry").display().to_string());
    let registry = if source.contains("://") || source.starts_with("git@") {
        asp_registry::ensure_local_checkout(&source, home.root())
            .with_context(|| format!("prepare registry checkout for '{source}'"))?
    } else {
        PathBuf::from(source)
    };
    let project_root = std::env::current_dir().context("determine working directory")?;
    Ok(OpsContext::new(home, &registry, &project_root))
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let user_config = match load_cli_config(home_of(&cli).root()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(EXIT_RUNTIME_ERROR);
        }
    };
    init_tracing(cli.verbose, user_config.log.as_deref());

    match dispatch(cli, &user_config).await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(EXIT_RUNTIME_ERROR);
        }
    }
}

async fn dispatch(cli: Cli, user_config: &CliConfig) -> Result<i32> {
    let ctx = context(&cli, user_config)?;
    let oracle = PathOracle;
    let fallback = default_harness(user_config);

    match cli.command {
        Commands::Resolve { target } => {
            let resolved = asp_ops::resolve_targets(&ctx, target.as_deref())?;
            for (name, target) in &resolved {
                println!("target {name}");
                for key in &target.closure.load_order {
                    println!("  {key}");
                }
            }
            Ok(0)
        }

        Commands::Install {
            target,
            harness,
            no_lock,
        } => {
            let outcome = asp_ops::install(
                &ctx,
                &InstallOptions {
                    harness: harness.unwrap_or(fallback),
                    target,
                    use_lock: !no_lock,
                },
            )?;
            for (name, composed) in &outcome.bundles {
                println!("installed {name} -> {}", composed.bundle.root_dir.display());
                print!("{}", format::render_warnings(&composed.warnings));
            }
            Ok(0)
        }

        Commands::Build { target, harness } => {
            let outcome = asp_ops::build(&ctx, &target, harness.unwrap_or(fallback))?;
            println!("{}", outcome.bundle.root_dir.display());
            print!("{}", format::render_warnings(&outcome.warnings));
            Ok(0)
        }

        Commands::Run {
            target,
            harness,
            prompt,
            interactive,
            model,
            yolo,
            dry_run,
            refresh,
            session,
        } => {
            let cfg = RunConfig {
                harness: harness.unwrap_or(fallback),
                model,
                yolo,
                interactive,
                prompt,
                dry_run,
                refresh,
                session_id: session,
            };
            let mut sink = SequencedSink::new(NullSink);
            let report =
                asp_ops::run_target(&ctx, &target, &cfg, &oracle, &mut sink).await?;
            finish_run(report)
        }

        Commands::RunSpace {
            reference,
            harness,
            prompt,
            dry_run,
            yolo,
        } => {
            let reference: SpaceRef = reference.parse()?;
            let cfg = RunConfig {
                harness: harness.unwrap_or(fallback),
                model: None,
                yolo,
                interactive: prompt.is_none(),
                prompt,
                dry_run,
                refresh: true,
                session_id: None,
            };
            let mut sink = SequencedSink::new(NullSink);
            let report =
                asp_ops::run_global_space(&ctx, &reference, &cfg, &oracle, &mut sink).await?;
            finish_run(report)
        }

        Commands::RunLocal {
            dir,
            harness,
            prompt,
            dry_run,
            yolo,
        } => {
            let cfg = RunConfig {
                harness: harness.unwrap_or(fallback),
                model: None,
                yolo,
                interactive: prompt.is_none(),
                prompt,
                dry_run,
                refresh: true,
                session_id: None,
            };
            let mut sink = SequencedSink::new(NullSink);
            let report =
                asp_ops::run_local_space(&ctx, &dir, &cfg, &oracle, &mut sink).await?;
            finish_run(report)
        }

        Commands::Explain {
            target,
            harness,
            json,
        } => {
            let reports = asp_ops::explain(&ctx, harness.unwrap_or(fallback), target.as_deref())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                print!("{}", format::render_explain(&reports));
            }
            Ok(0)
        }

        Commands::Diff { target } => {
            let diff = asp_ops::diff(&ctx, &target)?;
            print!("{}", format::render_diff(&diff));
            Ok(0)
        }

        Commands::List => {
            for (name, compose, description) in asp_ops::list_targets(&ctx)? {
                match description {
                    Some(text) => println!("{name}: {text} [{}]", compose.join(", ")),
                    None => println!("{name}: [{}]", compose.join(", ")),
                }
            }
            Ok(0)
        }

        Commands::Doctor => {
            let report = asp_ops::doctor(&ctx, &oracle);
            print!("{}", format::render_doctor(&report));
            Ok(0)
        }

        Commands::Gc { dry_run } => {
            let outcome = asp_ops::gc(&ctx, dry_run)?;
            print!("{}", format::render_gc(&outcome, dry_run));
            Ok(0)
        }

        Commands::Schema { kind } => {
            println!("{}", schema_json(kind)?);
            Ok(0)
        }
    }
}

/// Print a run report and translate it into an exit code.
fn finish_run(report: asp_ops::RunReport) -> Result<i32> {
    eprint!("{}", format::render_warnings(&report.warnings));
    match report.exit_code {
        // Dry run: show the command and succeed.
        None => {
            println!("{}", report.command);
            Ok(0)
        }
        Some(code) => Ok(code),
    }
}
