use anyhow::Context;
use clap::Parser;
use easm_rewrite::{rewrite_source_with_report, ModuleTable};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "easm-rewrite", version, about)]
struct Args {
    /// JSON module table replacing the built-in `@easm/*` entries.
    #[arg(long, env = "EASM_MODULES")]
    modules: Option<PathBuf>,

    /// Write each rewritten file here under its original file name instead
    /// of printing to stdout.
    #[arg(long, env = "EASM_OUT_DIR")]
    out_dir: Option<PathBuf>,

    /// Exit with status 1 if any recognized call could not be rewritten.
    #[arg(long)]
    check: bool,

    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let modules = match args.modules.as_ref() {
        Some(path) => match ModuleTable::from_path(path) {
            Ok(table) => table,
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(2);
            }
        },
        None => ModuleTable::default(),
    };

    if let Some(dir) = &args.out_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output directory {}", dir.display()))?;
    }

    let mut skipped = 0usize;
    let stdout = std::io::stdout();
    for input in &args.inputs {
        if is_typescript(input) {
            eprintln!("{}: TypeScript sources are not supported", input.display());
            std::process::exit(2);
        }
        let source = match std::fs::read_to_string(input) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("failed to read {}: {e}", input.display());
                std::process::exit(2);
            }
        };
        let (output, report) = match rewrite_source_with_report(&source, &modules) {
            Ok(rewritten) => rewritten,
            Err(e) => {
                eprintln!("{}:{e}", input.display());
                std::process::exit(2);
            }
        };

        for call in &report.skipped {
            tracing::warn!(
                file = %input.display(),
                function = %call.function,
                reason = %call.reason,
                "call left unchanged"
            );
        }
        tracing::info!(
            file = %input.display(),
            rewritten = report.rewritten.len(),
            skipped = report.skipped.len(),
            "rewrote file"
        );
        skipped += report.skipped.len();

        match &args.out_dir {
            Some(dir) => {
                let target = output_path(dir, input)?;
                std::fs::write(&target, output)
                    .with_context(|| format!("failed to write {}", target.display()))?;
            }
            None => stdout
                .lock()
                .write_all(output.as_bytes())
                .context("failed to write to stdout")?,
        }
    }

    if args.check && skipped > 0 {
        eprintln!("{skipped} call(s) could not be rewritten");
        return Ok(ExitCode::from(1));
    }
    Ok(ExitCode::SUCCESS)
}

fn output_path(dir: &Path, input: &Path) -> anyhow::Result<PathBuf> {
    let name = input
        .file_name()
        .with_context(|| format!("input {} has no file name", input.display()))?;
    Ok(dir.join(name))
}

fn is_typescript(input: &Path) -> bool {
    input
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| matches!(ext, "ts" | "tsx" | "mts" | "cts"))
}
