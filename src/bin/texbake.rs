use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "texbake", version)]
struct Cli {
    /// Force debug logging regardless of `TEXBAKE_LOG`.
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the execution queue a jobs file produces.
    Plan(PlanArgs),
    /// Run every bake step and report the results.
    Bake(BakeArgs),
    /// Show the record left by an unfinished session.
    Status(StatusArgs),
    /// Strip temporary bake artefacts from a scene.
    Cleanup(CleanupArgs),
}

#[derive(Parser, Debug)]
struct PlanArgs {
    /// Input scene JSON.
    #[arg(long)]
    scene: PathBuf,

    /// Jobs JSON (`{"jobs": [{"job": .., "bindings": ..}]}`).
    #[arg(long)]
    jobs: PathBuf,
}

#[derive(Parser, Debug)]
struct BakeArgs {
    /// Input scene JSON.
    #[arg(long)]
    scene: PathBuf,

    /// Jobs JSON.
    #[arg(long)]
    jobs: PathBuf,

    /// Write the scene after baking.
    #[arg(long)]
    out_scene: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct StatusArgs {
    /// Remove the record after printing it.
    #[arg(long)]
    clear: bool,
}

#[derive(Parser, Debug)]
struct CleanupArgs {
    /// Input scene JSON.
    #[arg(long)]
    scene: PathBuf,

    /// Output path; defaults to overwriting the input.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);
    match cli.cmd {
        Command::Plan(args) => cmd_plan(args),
        Command::Bake(args) => cmd_bake(args),
        Command::Status(args) => cmd_status(args),
        Command::Cleanup(args) => cmd_cleanup(args),
    }
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("TEXBAKE_LOG").unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_scene_json(path: &Path) -> anyhow::Result<texbake::Scene> {
    let f = File::open(path).with_context(|| format!("open scene '{}'", path.display()))?;
    let r = BufReader::new(f);
    let mut scene: texbake::Scene =
        serde_json::from_reader(r).with_context(|| "parse scene JSON")?;
    scene.filepath = Some(path.to_path_buf());
    Ok(scene)
}

fn write_scene_json(scene: &texbake::Scene, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    let f = File::create(path).with_context(|| format!("create scene '{}'", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(f), scene)
        .with_context(|| format!("write scene '{}'", path.display()))?;
    Ok(())
}

fn load_plan(
    scene_path: &Path,
    jobs_path: &Path,
) -> anyhow::Result<(texbake::Scene, texbake::ExecutionPlan)> {
    let scene = read_scene_json(scene_path)?;
    let (jobs, report) = texbake::config::load_jobs(jobs_path, &scene)
        .with_context(|| format!("load jobs '{}'", jobs_path.display()))?;
    tracing::debug!(jobs = jobs.len(), report = %report, "jobs loaded");
    let plan = texbake::prepare_execution_queue(&scene, &jobs);
    Ok((scene, plan))
}

fn cmd_plan(args: PlanArgs) -> anyhow::Result<()> {
    let (scene, plan) = load_plan(&args.scene, &args.jobs)?;
    for (i, step) in plan.steps.iter().enumerate() {
        let channels: Vec<&str> = step.channels.iter().map(|c| c.key.as_str()).collect();
        let frame = step
            .frame_info
            .map(|f| format!(" frame {}", f.frame))
            .unwrap_or_default();
        println!(
            "{:>3}. [{}] {} <- {}{frame}: {}",
            i + 1,
            step.job.name,
            step.task.base_name,
            scene.object_name(step.task.active),
            channels.join(", "),
        );
    }
    for line in &plan.diagnostics {
        eprintln!("skipped: {line}");
    }
    eprintln!("{} step(s)", plan.len());
    Ok(())
}

fn cmd_bake(args: BakeArgs) -> anyhow::Result<()> {
    let (mut scene, plan) = load_plan(&args.scene, &args.jobs)?;
    let tracker = texbake::SessionStateTracker::new();
    if tracker.has_crash_record() {
        tracing::warn!(
            path = %tracker.path().display(),
            "previous session did not finish; run `texbake cleanup` on its scene"
        );
    }

    let mut runner =
        texbake::QueueRunner::new(plan, texbake::render::Services::reference()).with_tracker(tracker);
    let outcome = runner.run(&mut scene);
    let status = runner.status();

    for result in &status.results {
        match &result.path {
            Some(path) => println!("{} [{}] -> {}", result.image_name, result.channel, path.display()),
            None => println!("{} [{}] (in scene)", result.image_name, result.channel),
        }
    }
    if !status.error_log.is_empty() {
        eprint!("{}", status.error_log);
    }

    if let Some(out) = &args.out_scene {
        write_scene_json(&scene, out)?;
        eprintln!("wrote {}", out.display());
    }
    if outcome == texbake::Tick::Cancelled {
        anyhow::bail!("bake cancelled");
    }
    Ok(())
}

fn cmd_status(args: StatusArgs) -> anyhow::Result<()> {
    let tracker = texbake::SessionStateTracker::new();
    match tracker.read() {
        Some(record) => {
            println!("{}", serde_json::to_string_pretty(&record)?);
            if args.clear {
                tracker.finish();
                eprintln!("cleared {}", tracker.path().display());
            }
        }
        None if tracker.has_crash_record() => {
            eprintln!("unreadable session record at {}", tracker.path().display());
            if args.clear {
                tracker.finish();
            }
        }
        None => eprintln!("no unfinished session"),
    }
    Ok(())
}

fn cmd_cleanup(args: CleanupArgs) -> anyhow::Result<()> {
    let mut scene = read_scene_json(&args.scene)?;
    let report = texbake::emergency_cleanup(&mut scene);
    let out = args.out.as_deref().unwrap_or(&args.scene);
    write_scene_json(&scene, out)?;
    println!(
        "removed {} item(s): {} uv layer(s), {} node(s), {} image(s), {} attribute(s)",
        report.total(),
        report.uv_layers,
        report.nodes,
        report.images,
        report.attributes
    );
    Ok(())
}
