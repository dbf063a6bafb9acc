use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use project_patcher::config::{self, PatcherConfig};
use project_patcher::metadata::{self, ProjectMetadata};
use project_patcher::{store, CleanStatus, Patch, SourceRegistry, Workspace};
use std::env;
use std::path::{Component, Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "project-patcher")]
#[command(about = "Keep local edits to a third-party project as patches", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file, merged above all other layers
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Project root (defaults to the current directory)
    #[arg(short = 'C', long = "directory", global = true)]
    directory: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the clean tree from the declared sources
    Clean {
        /// Delete the clean tree and fetch every source again
        #[arg(long)]
        invalidate_cache: bool,

        #[command(flatten)]
        import: ImportArgs,
    },

    /// Fetch the clean tree, then build the working tree
    Init {
        /// Delete the clean tree and fetch every source again
        #[arg(long)]
        invalidate_cache: bool,

        #[command(flatten)]
        import: ImportArgs,

        #[command(flatten)]
        hidden: HiddenArgs,
    },

    /// Rebuild the working tree from the clean tree, patches and new files
    Src {
        #[command(flatten)]
        import: ImportArgs,

        #[command(flatten)]
        hidden: HiddenArgs,
    },

    /// Write patches and new files from the working tree
    Output {
        #[command(flatten)]
        hidden: HiddenArgs,
    },

    /// Show the patch `output` would write for one working-tree file
    Diff {
        /// Path inside the working tree, or relative to it
        path: PathBuf,

        #[command(flatten)]
        hidden: HiddenArgs,
    },
}

#[derive(Args)]
struct ImportArgs {
    /// Metadata JSON to use instead of the project's own; saved over it
    #[arg(short = 'I', long, value_name = "PATH|URL")]
    import_metadata: Option<String>,
}

#[derive(Args)]
struct HiddenArgs {
    /// Carry dotfiles and dot-directories between the trees
    #[arg(short = 'a', short_alias = 'A', long)]
    include_hidden: bool,
}

impl Commands {
    fn import_location(&self) -> Option<&str> {
        match self {
            Commands::Clean { import, .. }
            | Commands::Init { import, .. }
            | Commands::Src { import, .. } => import.import_metadata.as_deref(),
            Commands::Output { .. } | Commands::Diff { .. } => None,
        }
    }

    fn include_hidden(&self) -> bool {
        match self {
            Commands::Init { hidden, .. }
            | Commands::Src { hidden, .. }
            | Commands::Output { hidden }
            | Commands::Diff { hidden, .. } => hidden.include_hidden,
            Commands::Clean { .. } => false,
        }
    }
}

struct Session {
    root: PathBuf,
    config: PatcherConfig,
    project: ProjectMetadata,
    workspace: Workspace,
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        error!(error = %format!("{err:#}"), "command failed");
        eprintln!("{} {:#}", "✗".red(), err);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let root = match cli.directory {
        Some(dir) => dir,
        None => env::current_dir().context("failed to read the current directory")?,
    };

    let layers = config::default_layers(cli.config.as_deref(), &root);
    let config = config::load_layers(&layers)?;
    init_tracing(&config.log.level, cli.verbose);

    let registry = SourceRegistry::builtin();
    let metadata_path = root.join(&config.project.metadata);
    let project = match cli.command.import_location() {
        Some(location) => import_metadata(location, &root, &metadata_path, &registry)?,
        None => metadata::load_from_path(&metadata_path, &registry)?,
    };
    let workspace = project
        .workspace(&root)
        .with_hidden(cli.command.include_hidden());
    let ctx = Session {
        root,
        config,
        project,
        workspace,
    };

    match cli.command {
        Commands::Clean {
            invalidate_cache, ..
        } => cmd_clean(&ctx, invalidate_cache),
        Commands::Init {
            invalidate_cache, ..
        } => cmd_init(&ctx, invalidate_cache),
        Commands::Src { .. } => cmd_src(&ctx),
        Commands::Output { .. } => cmd_output(&ctx),
        Commands::Diff { ref path, .. } => cmd_diff(&ctx, path),
    }
}

/// Decode metadata from `location`, then keep it as the project's own.
fn import_metadata(
    location: &str,
    root: &Path,
    metadata_path: &Path,
    registry: &SourceRegistry,
) -> Result<ProjectMetadata> {
    let document = metadata::read_document(location, root)?;
    let project = metadata::load_from_str(&document, registry)
        .with_context(|| format!("invalid metadata imported from {location}"))?;
    store::write_atomic(metadata_path, document.as_bytes())?;
    info!(from = location, to = %metadata_path.display(), "imported project metadata");
    Ok(project)
}

fn init_tracing(level: &str, verbose: bool) {
    let fallback = if verbose { "debug" } else { level };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn warn_before_fetch(ctx: &Session, invalidate_cache: bool) -> Result<()> {
    if !ctx.config.project.display_warning_message || ctx.project.sources.is_empty() {
        return Ok(());
    }
    let pending = if invalidate_cache {
        ctx.project.sources.keys()
    } else {
        ctx.workspace.pending_sources(&ctx.project.sources)?
    };
    if pending.is_empty() {
        return Ok(());
    }

    eprintln!(
        "{}",
        "Warning: files are about to be downloaded from third-party sources.".yellow()
    );
    eprintln!(
        "{}",
        "Their licenses apply to the clean tree; review them before redistributing.".yellow()
    );
    for key in pending {
        eprintln!("  {}", key.dimmed());
    }
    Ok(())
}

fn cmd_clean(ctx: &Session, invalidate_cache: bool) -> Result<()> {
    warn_before_fetch(ctx, invalidate_cache)?;
    let status = ctx
        .workspace
        .ensure_clean(&ctx.project.sources, invalidate_cache)?;
    report_clean(ctx, &status);
    if !status.is_complete() {
        anyhow::bail!("{status}");
    }
    Ok(())
}

fn report_clean(ctx: &Session, status: &CleanStatus) {
    let clean = ctx.workspace.layout().clean.display();
    match status {
        CleanStatus::Cached | CleanStatus::Fetched => {
            println!("{} {} ({})", "✓".green(), status, clean)
        }
        CleanStatus::Partial { failed } => {
            for failure in failed {
                eprintln!("  {} {}", "✗".red(), failure);
            }
        }
    }
}

fn cmd_init(ctx: &Session, invalidate_cache: bool) -> Result<()> {
    cmd_clean(ctx, invalidate_cache)?;
    cmd_src(ctx)
}

fn cmd_src(ctx: &Session) -> Result<()> {
    let report = ctx.workspace.build_working()?;
    println!(
        "{} working tree ready at {}: {} files, {} new, {} patched",
        "✓".green(),
        ctx.workspace.layout().working.display(),
        report.seeded.len(),
        report.restored.len(),
        report.patched.len()
    );
    Ok(())
}

fn cmd_output(ctx: &Session) -> Result<()> {
    let report = ctx.workspace.reconcile_reverse()?;
    println!(
        "{} {} patched, {} new, {} overwritten, {} unchanged, {} ignored",
        "✓".green(),
        format!("{}", report.patched.len()).green(),
        format!("{}", report.new.len()).green(),
        report.overwritten.len(),
        report.unchanged.len(),
        report.ignored.len()
    );
    Ok(())
}

fn cmd_diff(ctx: &Session, path: &Path) -> Result<()> {
    let working = &ctx.workspace.layout().working;
    let candidate = ctx.root.join(path);
    let relative: PathBuf = match candidate.strip_prefix(working) {
        Ok(inside) => inside.to_path_buf(),
        Err(_) if path.is_relative() => path
            .components()
            .filter(|component| !matches!(component, Component::CurDir))
            .collect(),
        Err(_) => anyhow::bail!("{} is outside {}", path.display(), working.display()),
    };
    match ctx.workspace.preview_patch(&relative)? {
        Some(patch) => print_patch(&patch),
        None => println!(
            "{}",
            format!("{}: no patch (unchanged, new, ignored or copied verbatim)", relative.display())
                .dimmed()
        ),
    }
    Ok(())
}

fn print_patch(patch: &Patch) {
    for line in patch.to_string().lines() {
        if line.starts_with("---") || line.starts_with("+++") {
            println!("{}", line.bold());
        } else if line.starts_with("@@") {
            println!("{}", line.cyan());
        } else if line.starts_with('+') {
            println!("{}", line.green());
        } else if line.starts_with('-') {
            println!("{}", line.red());
        } else {
            println!("{}", line);
        }
    }
}
