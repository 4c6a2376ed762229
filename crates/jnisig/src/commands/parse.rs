//! The `parse` command: check a header outside any session.

use anyhow::{bail, Context, Result};
use clap::Args;
use jnisig_analysis::{
    parse_declarations, synthesize, Function, MethodMetadata, Platform, BASE_UNIT, COMMON_CLASS,
    EXTENDED_UNIT,
};
use jnisig_formats::{Architecture, Endianness};
use jnisig_types::ParserOptions;
use std::fs;
use std::path::PathBuf;

#[derive(Args)]
pub struct ParseArgs {
    /// C header to parse
    pub header: PathBuf,

    /// Append a prototype for every method in this metadata file
    #[arg(short, long)]
    pub metadata: Option<PathBuf>,

    /// Target architecture for struct layout
    #[arg(short, long, default_value = "arm64")]
    pub arch: String,

    /// Show only function declarations
    #[arg(long)]
    pub functions: bool,

    /// Print the parsed unit as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn handle_parse_command(args: ParseArgs) -> Result<()> {
    let header = fs::read_to_string(&args.header)
        .with_context(|| format!("Failed to read header: {}", args.header.display()))?;
    let arch: Architecture = args.arch.parse()?;
    let platform = Platform::from_architecture(arch, Endianness::Little);

    let (source, unit_name) = match &args.metadata {
        Some(path) => {
            let metadata = MethodMetadata::load(path)?;
            // Without a binary every method counts as present.
            let synthesis = synthesize(&header, &metadata, COMMON_CLASS, |name| {
                Ok(vec![Function::new(0, name)])
            })?;
            log::info!("synthesized {} prototypes", synthesis.prototypes);
            (synthesis.source, EXTENDED_UNIT)
        }
        None => (header, BASE_UNIT),
    };

    let Some(unit) = parse_declarations(&source, unit_name, &platform, ParserOptions::jni()) else {
        bail!("Failed to parse {}", args.header.display());
    };

    if args.json {
        println!("{}", unit.to_json()?);
        return Ok(());
    }

    if !args.functions {
        println!("Types:");
        for entry in unit.types() {
            let layout = unit.layout_of(&entry.ty)?;
            let keyword = entry.kind.keyword().unwrap_or("typedef");
            println!("  {:<8} {:<32} size {:#x}", keyword, entry.name, layout.size);
        }
        println!();
    }

    println!("Functions:");
    for proto in unit.functions() {
        println!("  {};", proto.to_c_string());
    }

    let stats = unit.stats();
    println!(
        "\n{} types, {} typedefs, {} functions",
        stats.type_count, stats.typedef_count, stats.function_count
    );
    Ok(())
}
