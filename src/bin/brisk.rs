use std::{
    fs,
    path::{Path, PathBuf},
    process::{Command, ExitCode},
};

use anyhow::{bail, Context as _, Result};
use clap::Parser;
use log::{error, info, warn, LevelFilter};

/// Compiles a brisk program into a static x86-64 Linux executable.
#[derive(Parser)]
#[command(version)]
struct Cli {
    /// Source file to compile.
    input: PathBuf,

    /// Path of the produced executable. Defaults to the input's file stem.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Only write the assembly file, without assembling nor linking it.
    #[arg(short = 'S', long)]
    emit_asm: bool,

    /// Keep the assembly file after linking.
    #[arg(long)]
    keep_asm: bool,

    #[arg(long, env = "BRISK_AS", default_value = "yasm")]
    assembler: String,

    #[arg(long, env = "BRISK_LD", default_value = "ld")]
    linker: String,

    /// Raise the log level (repeat for more detail).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let src = fs::read_to_string(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))?;

    let path = cli.input.display().to_string();
    let asm = match brisk::pipeline::compile(&path, &src) {
        Ok(asm) => asm,
        Err(diagnostics) => {
            eprintln!("{diagnostics}");
            eprintln!("{} error(s) found", diagnostics.error_count());
            return Ok(ExitCode::FAILURE);
        }
    };

    let exe = match &cli.output {
        Some(output) => output.clone(),
        None => stem(&cli.input)?,
    };
    if exe == cli.input {
        bail!("output would overwrite the input {}", exe.display());
    }
    let asm_path = exe.with_extension("asm");
    let obj_path = exe.with_extension("o");

    fs::write(&asm_path, asm)
        .with_context(|| format!("failed to write {}", asm_path.display()))?;
    if cli.emit_asm {
        return Ok(ExitCode::SUCCESS);
    }

    let mut assemble = Command::new(&cli.assembler);
    assemble
        .args(["-f", "elf64"])
        .arg(&asm_path)
        .arg("-o")
        .arg(&obj_path);
    exec(assemble)?;

    let mut link = Command::new(&cli.linker);
    link.arg(&obj_path).arg("-o").arg(&exe);
    let linked = exec(link);

    remove(&obj_path);
    if !cli.keep_asm {
        remove(&asm_path);
    }
    linked?;

    Ok(ExitCode::SUCCESS)
}

/// Runs the external tool, failing if it exits unsuccessfully.
fn exec(mut cmd: Command) -> Result<()> {
    info!("cmd: {cmd:?}");
    let program = cmd.get_program().to_string_lossy().into_owned();
    let out = cmd
        .output()
        .with_context(|| format!("failed to run `{program}`"))?;
    if !out.status.success() {
        let stderr = String::from_utf8_lossy(&out.stderr);
        bail!("`{program}` failed ({}):\n{}", out.status, stderr.trim_end());
    }
    Ok(())
}

fn stem(input: &Path) -> Result<PathBuf> {
    match input.file_stem() {
        Some(stem) => Ok(input.with_file_name(stem)),
        None => bail!("cannot derive an output name from {}", input.display()),
    }
}

fn remove(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        warn!("failed to remove {}: {e}", path.display());
    }
}
