use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};

use yarut::option::is_optional;
use yarut::result::is_fallible;
use yarut::{Codec, Fallible, Optional, Value, default_serializer, yaml};

#[derive(Parser)]
#[command(name = "yarut", version, about = "Optional and fallible value tooling")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Cbor,
}

#[derive(Subcommand)]
enum Command {
    /// Serialize a tagged-YAML value into a document
    Encode {
        /// YAML input using tags like !present, !absent, !success, !failure
        file: PathBuf,
        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,
        /// Indent JSON output
        #[arg(long)]
        pretty: bool,
        /// Write to PATH instead of stdout
        #[arg(short = 'o', long = "out", value_name = "PATH")]
        out: Option<PathBuf>,
    },
    /// Decode a serialized document and print the value
    Decode {
        file: PathBuf,
        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,
    },
    /// Collect a YAML sequence of unions, failing if any item is absent or failed
    All { file: PathBuf },
    /// Collect the present or successful items of a YAML sequence of unions
    Any { file: PathBuf },
    /// Verify a YAML value survives JSON and CBOR round trips
    Check { file: PathBuf },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Combine {
    All,
    Any,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Encode {
            file,
            format,
            pretty,
            out,
        } => cmd_encode(&file, format, pretty, out.as_deref()),
        Command::Decode { file, format } => cmd_decode(&file, format),
        Command::All { file } => cmd_combine(&file, Combine::All),
        Command::Any { file } => cmd_combine(&file, Combine::Any),
        Command::Check { file } => cmd_check(&file),
    }
}

fn cmd_encode(file: &Path, format: Format, pretty: bool, out: Option<&Path>) -> Result<()> {
    let value = yaml::parse_value_from_file(file)?;
    let bytes = encode(&value, format, pretty)?;
    match out {
        Some(path) => {
            fs::write(path, &bytes).with_context(|| format!("failed to write {}", path.display()))?;
            println!("wrote {} bytes to {}", bytes.len(), path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&bytes)?;
            if format == Format::Json {
                writeln!(stdout)?;
            }
        }
    }
    Ok(())
}

fn cmd_decode(file: &Path, format: Format) -> Result<()> {
    let bytes = fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    println!("{}", decode(&bytes, format)?);
    Ok(())
}

fn cmd_combine(file: &Path, mode: Combine) -> Result<()> {
    let value = yaml::parse_value_from_file(file)?;
    println!("{}", combine(value, mode)?);
    Ok(())
}

fn cmd_check(file: &Path) -> Result<()> {
    let value = yaml::parse_value_from_file(file)?;
    check_round_trip(&value)?;
    println!("ok: {value}");
    Ok(())
}

fn check_round_trip(value: &Value) -> Result<()> {
    for format in [Format::Json, Format::Cbor] {
        let back = decode(&encode(value, format, false)?, format)?;
        if !back.same_as(value) {
            bail!("{format:?} round trip changed the value: {value} became {back}");
        }
    }
    Ok(())
}

fn encode(value: &Value, format: Format, pretty: bool) -> Result<Vec<u8>> {
    let serializer = default_serializer();
    match format {
        Format::Json if pretty => Ok(serializer.to_json_pretty(value)?.into_bytes()),
        Format::Json => Ok(serializer.stringify(value)?.into_bytes()),
        Format::Cbor => serializer.to_cbor(value),
    }
}

fn decode(bytes: &[u8], format: Format) -> Result<Value> {
    let serializer = default_serializer();
    match format {
        Format::Json => {
            let text = std::str::from_utf8(bytes).context("JSON document is not UTF-8")?;
            serializer.parse(text)
        }
        Format::Cbor => serializer.from_cbor(bytes),
    }
}

// An empty sequence counts as a sequence of optionals.
fn combine(value: Value, mode: Combine) -> Result<Value> {
    let Value::Seq(items) = value else {
        bail!("expected a sequence of unions, found {}", value.kind());
    };
    if items.iter().all(is_optional) {
        let items = items.into_iter().filter_map(Value::into_optional);
        let out = match mode {
            Combine::All => Optional::all(items),
            Combine::Any => Optional::any(items),
        };
        return Ok(out.into());
    }
    if items.iter().all(is_fallible) {
        let items = items.into_iter().filter_map(Value::into_fallible);
        let out = match mode {
            Combine::All => Fallible::all(items),
            Combine::Any => Fallible::any(items),
        };
        return Ok(out.into());
    }
    bail!("sequence must hold only optional or only fallible values")
}
