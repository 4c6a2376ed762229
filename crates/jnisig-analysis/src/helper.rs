//! The orchestrator: header, then signatures, then dispatch stubs.

use crate::apply::{apply_signatures, ApplyReport};
use crate::config::HelperConfig;
use crate::database::AnalysisDatabase;
use crate::error::Result;
use crate::fixup::{self, FixReport};
use crate::header::{load_header, Header};
use crate::prompt::FilePrompt;
use jnisig_types::ParsedUnit;
use serde::Serialize;

/// What a [`JniHelper::run`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// The base header was loaded and parsed.
    pub header_loaded: bool,
    /// Present if signatures were applied.
    pub apply: Option<ApplyReport>,
    /// Present if the dispatch stub fixer ran to completion.
    pub fix: Option<FixReport>,
    /// Why the fixer stopped, if it did.
    pub fix_error: Option<String>,
}

/// Runs the signature recovery steps against one database.
pub struct JniHelper<'a, D: ?Sized, P: ?Sized> {
    db: &'a mut D,
    prompt: &'a mut P,
    config: HelperConfig,
    header: Option<Header>,
    unit: Option<ParsedUnit>,
}

impl<'a, D, P> JniHelper<'a, D, P>
where
    D: AnalysisDatabase + ?Sized,
    P: FilePrompt + ?Sized,
{
    pub fn new(db: &'a mut D, prompt: &'a mut P, config: HelperConfig) -> Self {
        Self {
            db,
            prompt,
            config,
            header: None,
            unit: None,
        }
    }

    /// Run every step.
    ///
    /// Stops after the header step if no header could be loaded. Each
    /// mutating step is its own database step: a failing step discards only
    /// its own changes. A missing or malformed interface struct stops only
    /// the fixer; signatures that were already applied stay applied.
    pub fn run(&mut self) -> Result<RunReport> {
        let mut report = RunReport::default();
        if !self.init_header() {
            return Ok(report);
        }
        report.header_loaded = true;
        report.apply = self.step(Self::apply_signatures)?;

        if self.config.fix_dispatch {
            match self.step(Self::fix_dispatch_stubs) {
                Ok(fix) => report.fix = Some(fix),
                Err(e) if e.is_interface_error() => {
                    log::error!("dispatch stub fix aborted: {}", e);
                    report.fix_error = Some(e.to_string());
                }
                Err(e) => return Err(e),
            }
        }
        Ok(report)
    }

    fn step<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.db.begin_step()?;
        let result = f(self);
        self.db.end_step(result.is_ok())?;
        result
    }

    /// Load the base header. Returns false if none is available.
    pub fn init_header(&mut self) -> bool {
        let platform = self.db.platform();
        self.header = load_header(&self.config, &platform, &mut *self.prompt);
        self.header.is_some()
    }

    /// Apply metadata signatures on top of the loaded header. Keeps the
    /// extended unit for [`fix_dispatch_stubs`](Self::fix_dispatch_stubs).
    pub fn apply_signatures(&mut self) -> Result<Option<ApplyReport>> {
        let Some(header) = &self.header else {
            return Ok(None);
        };
        let applied = apply_signatures(&mut *self.db, &mut *self.prompt, &header.text, &self.config)?;
        Ok(applied.map(|applied| {
            self.unit = Some(applied.unit);
            applied.report
        }))
    }

    pub fn fix_dispatch_stubs(&mut self) -> Result<FixReport> {
        fixup::fix_dispatch_stubs(&mut *self.db, self.unit.as_ref(), &self.config)
    }

    /// The loaded base header.
    pub fn header(&self) -> Option<&Header> {
        self.header.as_ref()
    }

    /// The extended unit from the last successful application.
    pub fn parsed_unit(&self) -> Option<&ParsedUnit> {
        self.unit.as_ref()
    }
}
