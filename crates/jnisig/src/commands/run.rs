//! The `run` command: signature recovery against a session.

use crate::prompt::ReadlinePrompt;
use crate::session::Session;
use anyhow::{Context, Result};
use clap::Args;
use jnisig_analysis::{FilePrompt, HelperConfig, JniHelper, NoPrompt, RunReport};
use std::path::PathBuf;

#[derive(Args)]
pub struct RunArgs {
    /// Session file created by `jnisig import`
    pub session: PathBuf,

    /// JNI header to use instead of the bundled headers/jni.h
    #[arg(long)]
    pub header: Option<PathBuf>,

    /// Method metadata (signature.json); prompted for when omitted
    #[arg(short, long)]
    pub metadata: Option<PathBuf>,

    /// Never prompt; a missing file skips the step that needs it
    #[arg(long)]
    pub batch: bool,

    /// Skip typing `_JNIEnv::` dispatch stubs
    #[arg(long)]
    pub no_fix_dispatch: bool,

    /// Run against a copy of the session and discard the result
    #[arg(long)]
    pub dry_run: bool,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    fn config(&self) -> HelperConfig {
        let mut config = HelperConfig::default().with_fix_dispatch(!self.no_fix_dispatch);
        if let Some(header) = &self.header {
            config = config.with_header(header);
        }
        if let Some(metadata) = &self.metadata {
            config = config.with_metadata(metadata);
        }
        config
    }
}

pub fn handle_run_command(args: RunArgs) -> Result<()> {
    let mut session = Session::open(&args.session)?;
    match session.verify_binary() {
        Ok(true) => {}
        Ok(false) => log::warn!("{} changed since import", session.meta.binary_path),
        Err(e) => log::warn!("{:#}", e),
    }

    let config = args.config();
    let mut prompt: Box<dyn FilePrompt> = if args.batch {
        Box::new(NoPrompt)
    } else {
        Box::new(ReadlinePrompt::new()?)
    };

    // Each step commits on its own; a failing step discards only its changes.
    let report = if args.dry_run {
        let mut db = session.to_memory()?;
        JniHelper::new(&mut db, prompt.as_mut(), config).run()
    } else {
        JniHelper::new(&mut session, prompt.as_mut(), config).run()
    }
    .context("Signature recovery failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, args.dry_run);
    }
    Ok(())
}

fn print_report(report: &RunReport, dry_run: bool) {
    println!("Signature Recovery{}", if dry_run { " (dry run)" } else { "" });
    println!("==================");
    if !report.header_loaded {
        println!("Header:            not loaded, nothing done");
        return;
    }
    println!("Header:            loaded");

    match &report.apply {
        Some(apply) => {
            println!("Prototypes:        {}", apply.prototypes_synthesized);
            println!("Types defined:     {}", apply.types_defined);
            println!("Functions typed:   {}", apply.functions_typed);
            println!("Methods missing:   {}", apply.methods_missing);
            if apply.duplicate_mangles > 0 {
                println!("Duplicate mangles: {}", apply.duplicate_mangles);
            }
        }
        None => println!("Signatures:        not applied"),
    }

    match (&report.fix, &report.fix_error) {
        (Some(fix), _) => {
            println!("Dispatch stubs:    {} of {} fixed", fix.fixed, fix.stubs);
            if !fix.unresolved.is_empty() {
                println!("Unresolved slots:  {}", fix.unresolved.join(", "));
            }
        }
        (None, Some(error)) => println!("Dispatch stubs:    aborted ({})", error),
        (None, None) => println!("Dispatch stubs:    skipped"),
    }
}
