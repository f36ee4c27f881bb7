use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use cmm_compiler::{compile_with_options, parse, CodegenOptions, LimitStrategy};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "cmmc")]
#[command(about = "A C-- compiler targeting Jasmin JVM assembly")]
struct Args {
    /// Path to the .cmm source file; reads stdin when omitted
    file: Option<PathBuf>,

    /// Where to write the assembly; `-` writes to stdout.
    /// Defaults to `<base name>.j` next to the input
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Class name of the generated program (default: input file stem, or `a`)
    #[arg(long)]
    base_name: Option<String>,

    /// How `.limit stack` / `.limit locals` are chosen
    #[arg(long, value_enum, default_value_t = LimitOpt::Computed)]
    limits: LimitOpt,

    /// Bound used for both limits with `--limits fixed`
    #[arg(long, default_value_t = 50)]
    stack_limit: u32,

    /// Print the parsed syntax tree instead of compiling
    #[arg(long)]
    ast: bool,

    /// Increase log output (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum LimitOpt {
    Computed,
    Fixed,
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(args) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn run(args: Args) -> Result<()> {
    let src = match &args.file {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("reading '{}'", path.display()))?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("reading stdin")?;
            buf
        }
    };

    if args.ast {
        let program = parse(&src).context("compilation failed")?;
        println!("{:#?}", program);
        return Ok(());
    }

    let base_name = match &args.base_name {
        Some(name) => name.clone(),
        None => default_base_name(args.file.as_deref())?,
    };
    let limits = match args.limits {
        LimitOpt::Computed => LimitStrategy::Computed,
        LimitOpt::Fixed => LimitStrategy::Fixed(args.stack_limit),
    };
    let options = CodegenOptions::new(base_name.as_str()).with_limits(limits);
    log::debug!("compiling as class {base_name} with {limits:?}");

    let asm = compile_with_options(&src, &options).context("compilation failed")?;
    let text = asm.join();

    let output = args
        .output
        .unwrap_or_else(|| default_output(args.file.as_deref(), &base_name));
    if output.as_os_str() == "-" {
        io::stdout()
            .write_all(text.as_bytes())
            .context("writing to stdout")?;
    } else {
        fs::write(&output, text).with_context(|| format!("writing '{}'", output.display()))?;
        println!("Output written to {}", output.display());
    }
    Ok(())
}

/// Class name derived from the input path: the file stem.
fn default_base_name(file: Option<&Path>) -> Result<String> {
    let Some(path) = file else {
        return Ok("a".to_string());
    };
    let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
        bail!("cannot derive a class name from '{}'", path.display());
    };
    Ok(stem.to_string())
}

fn default_output(file: Option<&Path>, base_name: &str) -> PathBuf {
    let name = format!("{base_name}.j");
    match file.and_then(Path::parent) {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}
