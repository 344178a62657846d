use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use patchedit::script::{self, ScriptEvent};
use patchedit::timer::ManualClock;
use patchedit::{EditorConfig, EditorContext, PatchDoc, Session};

#[derive(Parser, Debug)]
#[command(author, version, about = "Replay editing gestures against a patch and print it as JSON", long_about = None)]
struct Cli {
    /// Patch file: JSON, or the binary format written by --save-binary
    #[arg(value_name = "PATCH_FILE")]
    patch_file: String,

    /// JSON array of mouse, key and verb events to replay
    #[arg(long, value_name = "SCRIPT")]
    script: Option<String>,

    /// Editor configuration (JSON)
    #[arg(long, value_name = "CONFIG")]
    config: Option<String>,

    /// Also write the result in binary form
    #[arg(long, value_name = "OUT")]
    save_binary: Option<String>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => EditorConfig::from_file(path)?,
        None => EditorConfig::default(),
    };

    let path = Utf8PathBuf::from(&cli.patch_file);
    let doc = if path.extension() == Some("json") {
        PatchDoc::load_json(&path).with_context(|| format!("Failed to read {}", path))?
    } else {
        PatchDoc::load_from_binary(&path).with_context(|| format!("Failed to read {}", path))?
    };

    let clock = ManualClock::new();
    let mut session = Session::new(EditorContext::new(config).with_clock(clock.clone()));
    let canvas = session.new_canvas();
    session
        .load_doc(canvas, &doc)
        .with_context(|| format!("Failed to load {}", path))?;

    if let Some(script_path) = &cli.script {
        let script_path = Utf8PathBuf::from(script_path);
        let text = std::fs::read_to_string(&script_path)
            .with_context(|| format!("Open {}", script_path))?;
        let events: Vec<ScriptEvent> = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse {}", script_path))?;
        let failed = script::replay(&mut session, &clock, canvas, &events);
        if failed > 0 {
            tracing::warn!("{failed} of {} script events failed", events.len());
        }
    }

    let result = session
        .to_doc(canvas)
        .context("canvas vanished during replay")?;
    if let Some(out) = &cli.save_binary {
        let out = Utf8PathBuf::from(out);
        result
            .save_to_binary(&out)
            .with_context(|| format!("Failed to write {}", out))?;
    }

    let json = serde_json::to_string_pretty(&result)?;
    println!("{}", json);
    Ok(())
}
