//! `sable` — outil de diagnostic du cœur Sable
//!
//! Construit un chunk (l'échantillon `1.2 / OP_RETURN`, ou les constantes
//! passées en argument), puis l'affiche désassemblé ou en JSON.
//!
//! Exemples :
//!   sable
//!   sable --constants 1,2.5,-3 --line 10 --stats
//!   sable --raw 255 --verify
//!   sable --json | jq
//!   RUST_LOG=sable::memory=trace sable --stats

#![forbid(unsafe_code)]

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use sable_core::{
    bytecode::{decode, disassemble_chunk, validate_chunk, Instruction},
    memory::{self, HeapStats},
    print_value, Chunk, OpCode, Value,
};

// ──────────────────────────── CLI (clap) ────────────────────────────

#[derive(Debug, Parser)]
#[command(name = "sable", version, about = "Sable — construit, désassemble et inspecte un chunk de bytecode", long_about = None)]
struct Opt {
    /// Constantes à charger, une instruction OP_CONSTANT chacune (défaut : 1.2)
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    constants: Vec<f64>,

    /// Ligne source de la première instruction (les suivantes s'incrémentent)
    #[arg(long, default_value_t = 123)]
    line: u32,

    /// Octets bruts ajoutés après OP_RETURN (pour exercer --verify)
    #[arg(long, value_delimiter = ',')]
    raw: Vec<u8>,

    /// Titre du listing
    #[arg(long, default_value = "test chunk")]
    name: String,

    /// Sortie JSON (instructions décodées + comptabilité du tas)
    #[arg(long)]
    json: bool,

    /// Affiche la comptabilité du tas après construction puis après libération
    #[arg(long)]
    stats: bool,

    /// Valide le chunk (opcodes, opérandes, index de constantes)
    #[arg(long)]
    verify: bool,

    /// Filtre de traces (syntaxe `RUST_LOG`), prioritaire sur -v
    #[arg(long = "log")]
    log: Option<String>,

    /// Augmente la verbosité (-v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

// ──────────────────────────── main ────────────────────────────

fn main() -> ExitCode {
    if let Err(e) = real_main() {
        eprintln!("error: {e:#}");
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn real_main() -> Result<()> {
    let opt = Opt::parse();
    init_telemetry(opt.verbose, opt.log.as_deref());

    let mut chunk = build_chunk(&opt.constants, opt.line, &opt.raw)?;
    info!(bytes = chunk.len(), constants = chunk.constants().len(), "chunk built");

    if opt.verify {
        validate_chunk(&chunk).context("chunk invalide")?;
        debug!("chunk validated");
    }

    let built = memory::stats();
    if opt.json {
        let report = Report::new(&opt.name, &chunk, built)?;
        println!("{}", serde_json::to_string_pretty(&report).context("sérialisation JSON")?);
    } else {
        print!("{}", disassemble_chunk(&chunk, &opt.name));
        print_constants(&chunk);
        if opt.stats {
            println!(";; heap (built): {built}");
        }
    }

    chunk.free();
    if opt.stats && !opt.json {
        println!(";; heap (freed): {}", memory::stats());
    }
    Ok(())
}

fn init_telemetry(verbose: u8, filter: Option<&str>) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = filter
        .and_then(|f| EnvFilter::try_new(f).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

// ──────────────────────────── Construction ────────────────────────────

/// One `OP_CONSTANT` per value (line `first_line + i`), then `OP_RETURN` on the
/// last line used, then `raw` bytes. No values means the `1.2` sample.
fn build_chunk(values: &[f64], first_line: u32, raw: &[u8]) -> Result<Chunk> {
    let values = if values.is_empty() { &[1.2][..] } else { values };

    let mut chunk = Chunk::new();
    let mut line = first_line;
    for (i, &x) in values.iter().enumerate() {
        line = first_line
            .checked_add(u32::try_from(i).context("trop de constantes")?)
            .context("numéro de ligne hors limites")?;
        let index = chunk.add_constant(x);
        let operand = u8::try_from(index)
            .with_context(|| format!("l'index de constante {index} ne tient pas sur un octet (max 255)"))?;
        chunk.write_op(OpCode::Constant, line);
        chunk.write_byte(operand, line);
    }
    chunk.write_op(OpCode::Return, line);
    for &byte in raw {
        chunk.write_byte(byte, line);
    }
    Ok(chunk)
}

fn print_constants(chunk: &Chunk) {
    if chunk.constants().is_empty() {
        return;
    }
    print!(";; constants:");
    for (_, value) in chunk.constants().iter() {
        print!(" ");
        print_value(value);
    }
    println!();
}

// ──────────────────────────── JSON ────────────────────────────

#[derive(Debug, Serialize)]
struct Report<'a> {
    name: &'a str,
    bytes: usize,
    constants: &'a [Value],
    instructions: Vec<Instruction>,
    heap: HeapStats,
}

impl<'a> Report<'a> {
    fn new(name: &'a str, chunk: &'a Chunk, heap: HeapStats) -> Result<Self> {
        Ok(Self {
            name,
            bytes: chunk.len(),
            constants: chunk.constants().as_slice(),
            instructions: decode(chunk).context("décodage des instructions")?,
            heap,
        })
    }
}
