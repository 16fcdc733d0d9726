use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "text-render", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode a command buffer (JSON array of numbers) into boxes and drawing commands.
    Decode(DecodeArgs),
    /// List the font families a job needs, in first-use order.
    Families(JobArgs),
    /// Print a job the way the engine receives it.
    Normalize(JobArgs),
}

#[derive(Parser, Debug)]
struct DecodeArgs {
    /// Input buffer JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Write the decoded result here instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Pretty-print the JSON output.
    #[arg(long, default_value_t = false)]
    pretty: bool,
}

#[derive(Parser, Debug)]
struct JobArgs {
    /// Input job JSON.
    #[arg(long = "in")]
    in_path: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Decode(args) => cmd_decode(args),
        Command::Families(args) => cmd_families(args),
        Command::Normalize(args) => cmd_normalize(args),
    }
}

fn read_json(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("read '{}'", path.display()))
}

fn cmd_decode(args: DecodeArgs) -> anyhow::Result<()> {
    let raw = read_json(&args.in_path)?;
    let buffer: Vec<f32> = serde_json::from_str(&raw)
        .with_context(|| format!("parse buffer '{}'", args.in_path.display()))?;
    let decoded = text_render::decode(&buffer)?;
    tracing::debug!(
        boxes = decoded.boxes.len(),
        commands = decoded.commands.len(),
        "decoded buffer"
    );

    let json = if args.pretty {
        serde_json::to_string_pretty(&decoded)?
    } else {
        serde_json::to_string(&decoded)?
    };
    match args.out {
        Some(out) => {
            if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create output dir '{}'", parent.display()))?;
            }
            std::fs::write(&out, json).with_context(|| format!("write '{}'", out.display()))?;
            eprintln!("wrote {}", out.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn load_job(path: &Path) -> anyhow::Result<text_render::TextData> {
    let raw = read_json(path)?;
    text_render::TextData::from_json_str(&raw)
        .with_context(|| format!("load job '{}'", path.display()))
}

fn cmd_families(args: JobArgs) -> anyhow::Result<()> {
    let job = load_job(&args.in_path)?;
    for family in job.font_families() {
        println!("{family}");
    }
    Ok(())
}

fn cmd_normalize(args: JobArgs) -> anyhow::Result<()> {
    let job = load_job(&args.in_path)?;
    println!("{}", serde_json::to_string_pretty(&job.normalized())?);
    Ok(())
}
