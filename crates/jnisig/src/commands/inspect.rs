//! Session inspection commands.

use crate::session::{FunctionFilter, Session};
use anyhow::{bail, Result};
use jnisig_analysis::DISPATCH_PREFIX;
use jnisig_types::CType;
use std::path::Path;

pub fn handle_functions_command(
    session_path: &Path,
    filter: FunctionFilter,
    clear_pending: bool,
) -> Result<()> {
    let session = Session::open(session_path)?;
    let records = session.function_records(filter)?;

    println!("{:<18} {:<8} {:<4} {}", "Address", "State", "Gen", "Function");
    println!("{}", "-".repeat(70));
    for record in &records {
        let state = match (record.pending, record.ty.is_some()) {
            (true, _) => "pending",
            (false, true) => "typed",
            (false, false) => "-",
        };
        let shown = match &record.ty {
            Some(ty) => ty.to_c_string(Some(&record.function.short_name)),
            None => record.function.short_name.clone(),
        };
        println!(
            "{:#016x} {:<8} {:<4} {}",
            record.function.start, state, record.generation, shown
        );
    }
    println!("\n{} functions", records.len());

    if clear_pending {
        let cleared = session.clear_pending()?;
        println!("Marked {} functions as analyzed", cleared);
    }
    Ok(())
}

pub fn handle_types_command(session_path: &Path, name: Option<&str>) -> Result<()> {
    let session = Session::open(session_path)?;

    if let Some(name) = name {
        let Some(ty) = session.user_type(name)? else {
            bail!("Type '{}' not found in session", name);
        };
        println!("{}", describe_type(name, &ty));
        return Ok(());
    }

    let types = session.user_types()?;
    println!("{:<8} {}", "Kind", "Name");
    println!("{}", "-".repeat(40));
    for (name, ty) in &types {
        println!("{:<8} {}", kind_name(ty), name);
    }
    println!("\n{} user types", types.len());
    Ok(())
}

pub fn handle_info_command(session_path: &Path) -> Result<()> {
    let session = Session::open(session_path)?;
    let stats = session.stats(DISPATCH_PREFIX)?;
    let meta = &session.meta;

    println!("Session Information");
    println!("===================");
    println!("Session file:    {}", session.session_path.display());
    println!("ID:              {}", meta.id);
    println!("Binary:          {}", meta.binary_path);
    println!("SHA-256:         {}", meta.binary_hash);
    match session.verify_binary() {
        Ok(true) => println!("Binary status:   unchanged"),
        Ok(false) => println!("Binary status:   CHANGED since import"),
        Err(_) => println!("Binary status:   missing"),
    }
    println!(
        "Platform:        {} ({}-bit, {} endian)",
        meta.platform.name,
        meta.platform.arch.pointer_size * 8,
        if meta.platform.arch.big_endian { "big" } else { "little" }
    );
    println!("Created:         {}", meta.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("Last accessed:   {}", meta.last_accessed.format("%Y-%m-%d %H:%M:%S UTC"));
    println!();
    println!("Functions:       {}", stats.functions);
    println!("  typed:         {}", stats.typed);
    println!("  pending:       {}", stats.pending);
    println!("  dispatch stubs: {}", stats.dispatch_stubs);
    println!("User types:      {}", stats.user_types);
    Ok(())
}

fn kind_name(ty: &CType) -> &'static str {
    match ty {
        CType::Struct(_) => "struct",
        CType::Union(_) => "union",
        CType::Enum(_) => "enum",
        _ => "typedef",
    }
}

/// C rendition of a user type, with field offsets for structs.
fn describe_type(name: &str, ty: &CType) -> String {
    match ty {
        CType::Struct(s) => {
            let mut out = format!("struct {} {{\n", name);
            for field in &s.fields {
                out.push_str(&format!(
                    "    {}; // offset {:#x}\n",
                    field.field_type.to_c_string(Some(&field.name)),
                    field.offset
                ));
            }
            out.push_str(&format!("}}; // size: {:#x}", s.size));
            out
        }
        CType::Union(u) => {
            let mut out = format!("union {} {{\n", name);
            for member in &u.members {
                out.push_str(&format!(
                    "    {};\n",
                    member.member_type.to_c_string(Some(&member.name))
                ));
            }
            out.push_str("};");
            out
        }
        CType::Enum(e) => {
            let mut out = format!("enum {} {{\n", name);
            for (variant, value) in &e.values {
                out.push_str(&format!("    {} = {},\n", variant, value));
            }
            out.push_str("};");
            out
        }
        other => format!("typedef {};", other.to_c_string(Some(name))),
    }
}
