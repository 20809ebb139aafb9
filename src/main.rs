use std::fs;
use std::io::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use anyhow::{Context, Result};
use clap::{ArgGroup, Args, Parser, Subcommand};
use subsync::SyncError;
use subsync::config::{Squashing, SubsyncConfig};
use subsync::manifest::{self, ManifestSource};
use subsync::patch::{Patch, display_path, normalize_path};
use subsync::workflow::{self, RunOptions, RunOutcome, Workflow};
use subsync::workflow_state::WorkflowState;
use subsync::telemetry;
use subsync_git::{CliRepo, GitRepo};

/// Carry upstream history into subdirectories of this repository
///
/// Each manifest line names an upstream path to track:
///
///   <remote_name> <remote_ref> <local_path> [<remote_path>]
///
/// For every line, subsync finds the newest upstream commit whose content
/// already exists locally, turns the newer upstream commits into a patch,
/// and applies it with git am on a staging branch. When all lines are done
/// the staging branch is merged into the current branch.
///
/// CONFLICTS:
///
///   subsync stops and leaves you on the topic branch inside git am.
///   Resolve, run 'git am --continue', then:
///
///   subsync --continue   # merge the resolved patch and go on
///   subsync --skip       # drop this remote for this run
///   subsync --abort      # undo everything, back to the original branch
#[derive(Parser)]
#[command(name = "subsync")]
#[command(version, about)]
#[command(args_conflicts_with_subcommands = true, subcommand_negates_reqs = true)]
#[command(group(ArgGroup::new("action").args(["cont", "skip", "abort", "status"])))]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Manifest files; `-` reads standard input
    #[arg(value_name = "MANIFEST", required_unless_present_any = ["cont", "skip", "abort", "status"])]
    manifests: Vec<String>,

    /// Resume after resolving a conflict
    #[arg(long = "continue", conflicts_with_all = ["manifests", "dry_run"])]
    cont: bool,

    /// Skip the remote that conflicted and resume
    #[arg(long, conflicts_with_all = ["manifests", "dry_run"])]
    skip: bool,

    /// Abort the run and restore the original branch
    #[arg(long, conflicts_with_all = ["manifests", "dry_run"])]
    abort: bool,

    /// Show the run in progress, if any
    #[arg(long, conflicts_with_all = ["manifests", "dry_run"])]
    status: bool,

    /// Build the staging branch and show what would be merged, then discard it
    #[arg(long)]
    dry_run: bool,

    /// Treat the upstream commit with this id prefix as already applied
    #[arg(long, value_name = "COMMIT")]
    since: Option<String>,

    /// Collapse pending commits into one patch [default: from .subsync.toml, else auto]
    #[arg(long, value_name = "never|auto|always")]
    squashing: Option<Squashing>,

    /// Run as if started in DIR
    #[arg(short = 'C', value_name = "DIR", global = true)]
    directory: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the patch that would bring a local path up to an upstream path
    ///
    /// Nothing is applied. Useful for inspecting what a run would do for a
    /// single path, or for feeding git am by hand.
    FormatPatch(FormatPatchArgs),
}

#[derive(Args)]
struct FormatPatchArgs {
    /// Upstream revision (must be available locally, e.g. after git fetch)
    rev: String,

    /// Path at the upstream revision (`/` for the root)
    source_path: String,

    /// Local path on HEAD (`/` for the root)
    dest_path: String,

    /// Treat the upstream commit with this id prefix as already applied
    #[arg(long, value_name = "COMMIT")]
    since: Option<String>,

    /// Collapse pending commits into one patch
    #[arg(long, value_name = "never|auto|always")]
    squashing: Option<Squashing>,

    /// Write to FILE instead of standard output
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output: Option<PathBuf>,
}

fn main() -> ExitCode {
    telemetry::init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let dir = cli.directory.clone().unwrap_or_else(|| PathBuf::from("."));
    let repo = CliRepo::open(&dir)
        .with_context(|| format!("{} is not inside a git working tree", dir.display()))?;
    let config = SubsyncConfig::load_from_root(repo.root())?;

    if let Some(Commands::FormatPatch(args)) = cli.command {
        return format_patch(&repo, &config, &args);
    }

    // Manifests are read before the handlers go in: with only a flag set
    // on SIGINT, a blocked stdin read would never return.
    let start = if cli.status || cli.cont || cli.skip || cli.abort {
        None
    } else {
        let sources: Vec<ManifestSource> = cli
            .manifests
            .iter()
            .map(|m| ManifestSource::from_arg(m))
            .collect();
        let definitions = manifest::load(&sources)?;
        let options = RunOptions {
            dry_run: cli.dry_run,
            since: cli.since.clone(),
            squashing: cli.squashing.unwrap_or(config.patch.squashing),
        };
        Some((definitions, options))
    };

    let interrupt = Arc::new(AtomicBool::new(false));
    for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        signal_hook::flag::register(signal, Arc::clone(&interrupt))
            .context("failed to install signal handler")?;
    }

    let mut workflow = Workflow::new(&repo, config.clone()).with_interrupt(interrupt);
    let result = if let Some((definitions, options)) = start {
        workflow.start(definitions, &options)
    } else if cli.status {
        print_status(workflow.status()?.as_ref());
        return Ok(ExitCode::SUCCESS);
    } else if cli.cont {
        workflow.resume()
    } else if cli.skip {
        workflow.skip()
    } else {
        workflow.abort()
    };
    match result {
        Ok(outcome) => Ok(report(&outcome)),
        Err(e) if leaves_run_open(&e) && workflow.store().exists() => {
            eprintln!("error: {e}");
            eprintln!();
            eprintln!("The run is still in progress.");
            eprintln!("  To drop this remote:  subsync --skip");
            eprintln!("  To undo the run:      subsync --abort");
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e.into()),
    }
}

/// Failures that stop a run midway, as opposed to refusals that leave the
/// persisted state exactly as it was.
fn leaves_run_open(e: &SyncError) -> bool {
    !matches!(
        e,
        SyncError::RunInProgress { .. }
            | SyncError::NoRunInProgress
            | SyncError::BranchState { .. }
            | SyncError::BranchExists { .. }
            | SyncError::InvalidPhase { .. }
            | SyncError::ApplyInProgress
            | SyncError::DirtyWorktree
            | SyncError::Interrupted
    )
}

fn report(outcome: &RunOutcome) -> ExitCode {
    match outcome {
        RunOutcome::Paused { definition, detail } => {
            eprintln!("{detail}");
            eprintln!();
            eprintln!("Patch for '{definition}' did not apply cleanly.");
            eprintln!("  To fix: resolve the conflict, then run 'git am --continue'");
            eprintln!("  and finally: subsync --continue");
            eprintln!("  To drop this remote:  subsync --skip");
            eprintln!("  To undo the run:      subsync --abort");
            ExitCode::FAILURE
        }
        RunOutcome::Merged { .. }
        | RunOutcome::NothingToApply
        | RunOutcome::DryRun { .. }
        | RunOutcome::Aborted => ExitCode::SUCCESS,
    }
}

fn print_status(state: Option<&WorkflowState>) {
    let Some(state) = state else {
        println!("no run in progress");
        return;
    };
    println!("phase:    {}", state.phase);
    println!("branch:   {} (at {})", state.original_branch, state.initial_head.short());
    println!(
        "progress: {}/{} remote(s)",
        state.current_index,
        state.definitions.len()
    );
    if state.dry_run {
        println!("mode:     dry run");
    }
    for (idx, def) in state.definitions.iter().enumerate() {
        let mark = match idx.cmp(&state.current_index) {
            std::cmp::Ordering::Less => "done",
            std::cmp::Ordering::Equal => "current",
            std::cmp::Ordering::Greater => "pending",
        };
        println!(
            "  [{mark:>7}] {} {} ({} => {})",
            def.remote_name,
            def.remote_ref,
            display_path(&def.remote_path),
            display_path(&def.local_path)
        );
    }
}

fn format_patch(repo: &CliRepo, config: &SubsyncConfig, args: &FormatPatchArgs) -> Result<ExitCode> {
    let source_rev = repo
        .rev_parse(&args.rev)
        .with_context(|| format!("cannot resolve revision '{}'", args.rev))?;
    let patch = workflow::build_patch(
        repo,
        &source_rev,
        &normalize_path(&args.source_path),
        &normalize_path(&args.dest_path),
        args.since.as_deref(),
        args.squashing.unwrap_or(config.patch.squashing),
    )?;

    let Patch::Mailbox { bytes, commits, squashed } = patch else {
        eprintln!("no changes");
        return Ok(ExitCode::SUCCESS);
    };
    match &args.output {
        Some(path) => {
            fs::write(path, &bytes).with_context(|| format!("write {}", path.display()))?;
            eprintln!(
                "wrote {} ({commits} commit(s){})",
                path.display(),
                if squashed { ", squashed" } else { "" }
            );
        }
        None => std::io::stdout()
            .write_all(&bytes)
            .context("write patch to stdout")?,
    }
    Ok(ExitCode::SUCCESS)
}
