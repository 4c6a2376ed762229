//! Session creation from a binary.

use crate::session::{default_session_path, Session};
use anyhow::{bail, Context, Result};
use jnisig_analysis::DISPATCH_PREFIX;
use std::fs;
use std::path::{Path, PathBuf};

/// Create a session for `binary`, written to `output` or `<binary>.jnisig`.
pub fn handle_import_command(binary: &Path, output: Option<PathBuf>, force: bool) -> Result<()> {
    let session_path = output.unwrap_or_else(|| default_session_path(binary));
    if session_path.exists() {
        if !force {
            bail!(
                "Session {} already exists (use --force to replace it)",
                session_path.display()
            );
        }
        fs::remove_file(&session_path).with_context(|| {
            format!("Failed to remove old session: {}", session_path.display())
        })?;
    }

    let session = Session::create(binary, &session_path)?;
    let stats = session.stats(DISPATCH_PREFIX)?;

    println!("Created session {}", session_path.display());
    println!("Binary:          {}", session.meta.binary_path);
    println!("Platform:        {}", session.meta.platform.name);
    println!("Functions:       {}", stats.functions);
    println!("Dispatch stubs:  {}", stats.dispatch_stubs);
    Ok(())
}
