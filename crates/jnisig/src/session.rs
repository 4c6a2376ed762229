//! Persistent analysis sessions.
//!
//! A session is a SQLite file holding the functions discovered in one
//! binary, the user types defined by signature recovery and the type and
//! analysis state of each function. It implements [`AnalysisDatabase`] so
//! the recovery pipeline can run against it directly.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use jnisig_analysis::{AnalysisDatabase, DatabaseError, Function, MemoryDatabase, Platform};
use jnisig_formats::Elf;
use jnisig_types::CType;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Session metadata stored in SQLite
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMeta {
    pub id: String,
    pub name: String,
    pub binary_path: String,
    pub binary_hash: String,
    pub platform: Platform,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
}

/// A function row with its recovered state.
#[derive(Debug, Clone, Serialize)]
pub struct FunctionRecord {
    pub function: Function,
    pub ty: Option<CType>,
    /// Incremented by every re-analysis request.
    pub generation: u32,
    /// Re-analysis was requested and has not been acknowledged.
    pub pending: bool,
}

/// Filter for [`Session::function_records`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FunctionFilter {
    pub typed: bool,
    pub pending: bool,
}

/// Session statistics
#[derive(Debug)]
pub struct SessionStats {
    pub functions: usize,
    pub typed: usize,
    pub pending: usize,
    pub dispatch_stubs: usize,
    pub user_types: usize,
}

/// SQLite-backed analysis session
pub struct Session {
    conn: Connection,
    pub meta: SessionMeta,
    pub session_path: PathBuf,
}

impl Session {
    /// Create a session from the function symbols of an ELF binary
    pub fn create(binary_path: &Path, session_path: &Path) -> Result<Self> {
        let binary_data = fs::read(binary_path)
            .with_context(|| format!("Failed to read binary: {}", binary_path.display()))?;
        let elf = Elf::parse(&binary_data)
            .with_context(|| format!("Failed to parse ELF file: {}", binary_path.display()))?;

        let platform = Platform::from_architecture(elf.architecture(), elf.endianness());
        let functions: Vec<Function> = elf.functions().iter().map(Function::from_symbol).collect();

        let conn = Connection::open(session_path).with_context(|| {
            format!("Failed to create session file: {}", session_path.display())
        })?;
        Self::init_schema(&conn)?;

        let meta = SessionMeta {
            id: Uuid::new_v4().to_string(),
            name: binary_path
                .file_name()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "unnamed".to_string()),
            binary_path: binary_path
                .canonicalize()
                .unwrap_or_else(|_| binary_path.to_path_buf())
                .to_string_lossy()
                .to_string(),
            binary_hash: compute_hash(&binary_data),
            platform,
            created_at: Utc::now(),
            last_accessed: Utc::now(),
        };

        conn.execute(
            "INSERT INTO session_meta (id, name, binary_path, binary_hash, platform, created_at, last_accessed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                &meta.id,
                &meta.name,
                &meta.binary_path,
                &meta.binary_hash,
                serde_json::to_string(&meta.platform)?,
                meta.created_at.to_rfc3339(),
                meta.last_accessed.to_rfc3339(),
            ],
        )?;

        let mut session = Self {
            conn,
            meta,
            session_path: session_path.to_path_buf(),
        };
        session.insert_functions(&functions)?;
        log::info!(
            "imported {} functions from {} ({})",
            functions.len(),
            session.meta.name,
            session.meta.platform.name
        );
        Ok(session)
    }

    /// Open an existing session
    pub fn open(session_path: &Path) -> Result<Self> {
        if !session_path.is_file() {
            anyhow::bail!("Session not found: {}", session_path.display());
        }
        let conn = Connection::open(session_path)
            .with_context(|| format!("Failed to open session: {}", session_path.display()))?;

        let (meta, platform_json) = conn
            .query_row(
                "SELECT id, name, binary_path, binary_hash, platform, created_at, last_accessed FROM session_meta LIMIT 1",
                [],
                |row| {
                    let created_str: String = row.get(5)?;
                    let accessed_str: String = row.get(6)?;
                    let platform_json: String = row.get(4)?;
                    Ok((
                        SessionMeta {
                            id: row.get(0)?,
                            name: row.get(1)?,
                            binary_path: row.get(2)?,
                            binary_hash: row.get(3)?,
                            platform: Platform::default(),
                            created_at: parse_timestamp(&created_str),
                            last_accessed: parse_timestamp(&accessed_str),
                        },
                        platform_json,
                    ))
                },
            )
            .context("Failed to load session metadata")?;
        let meta = SessionMeta {
            platform: serde_json::from_str(&platform_json)
                .context("Corrupt platform in session metadata")?,
            ..meta
        };

        conn.execute(
            "UPDATE session_meta SET last_accessed = ?1",
            params![Utc::now().to_rfc3339()],
        )?;

        Ok(Self {
            conn,
            meta,
            session_path: session_path.to_path_buf(),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS session_meta (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                binary_path TEXT NOT NULL,
                binary_hash TEXT NOT NULL,
                platform TEXT NOT NULL,
                created_at TEXT NOT NULL,
                last_accessed TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS functions (
                address INTEGER PRIMARY KEY,
                type_json TEXT,
                generation INTEGER NOT NULL DEFAULT 0,
                pending INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS symbols (
                address INTEGER NOT NULL REFERENCES functions(address),
                raw_name TEXT NOT NULL,
                short_name TEXT NOT NULL,
                PRIMARY KEY (address, raw_name)
            );

            CREATE TABLE IF NOT EXISTS user_types (
                name TEXT PRIMARY KEY,
                type_json TEXT NOT NULL,
                defined_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_symbols_raw_name ON symbols(raw_name);
            CREATE INDEX IF NOT EXISTS idx_symbols_short_name ON symbols(short_name);
        "#,
        )?;
        Ok(())
    }

    /// Every name is kept as a symbol; names sharing an address share one
    /// function row.
    fn insert_functions(&mut self, functions: &[Function]) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut function_stmt =
                tx.prepare("INSERT OR IGNORE INTO functions (address) VALUES (?1)")?;
            let mut symbol_stmt = tx.prepare(
                "INSERT OR IGNORE INTO symbols (address, raw_name, short_name) VALUES (?1, ?2, ?3)",
            )?;
            for f in functions {
                function_stmt.execute(params![f.start as i64])?;
                symbol_stmt.execute(params![f.start as i64, &f.raw_name, &f.short_name])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Verify the binary hash matches
    pub fn verify_binary(&self) -> Result<bool> {
        let binary_data = fs::read(&self.meta.binary_path)
            .with_context(|| format!("Failed to read binary: {}", self.meta.binary_path))?;
        Ok(compute_hash(&binary_data) == self.meta.binary_hash)
    }

    /// Function symbols with the recovered state of their function, in
    /// address order. Aliases are listed once per name.
    pub fn function_records(&self, filter: FunctionFilter) -> Result<Vec<FunctionRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT s.address, s.raw_name, s.short_name, f.type_json, f.generation, f.pending
             FROM symbols s JOIN functions f ON f.address = s.address
             ORDER BY s.address, s.rowid",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, i32>(5)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (address, raw_name, short_name, type_json, generation, pending) = row?;
            let ty = type_json
                .map(|json| serde_json::from_str::<CType>(&json))
                .transpose()
                .with_context(|| format!("Corrupt type for function at {:#x}", address))?;
            let record = FunctionRecord {
                function: Function {
                    start: address as u64,
                    raw_name,
                    short_name,
                },
                ty,
                generation: generation as u32,
                pending: pending != 0,
            };
            if filter.typed && record.ty.is_none() {
                continue;
            }
            if filter.pending && !record.pending {
                continue;
            }
            records.push(record);
        }
        Ok(records)
    }

    /// User types by name
    pub fn user_types(&self) -> Result<Vec<(String, CType)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, type_json FROM user_types ORDER BY name")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut types = Vec::new();
        for row in rows {
            let (name, json) = row?;
            let ty = serde_json::from_str(&json)
                .with_context(|| format!("Corrupt user type {}", name))?;
            types.push((name, ty));
        }
        Ok(types)
    }

    /// A single user type
    pub fn user_type(&self, name: &str) -> Result<Option<CType>> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT type_json FROM user_types WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        json.map(|j| serde_json::from_str(&j))
            .transpose()
            .with_context(|| format!("Corrupt user type {}", name))
    }

    /// Mark every pending function as analyzed
    pub fn clear_pending(&self) -> Result<usize> {
        Ok(self
            .conn
            .execute("UPDATE functions SET pending = 0 WHERE pending = 1", [])?)
    }

    /// Copy of the session's functions for a run that must not persist
    pub fn to_memory(&self) -> Result<MemoryDatabase> {
        let mut db = MemoryDatabase::new(self.meta.platform.clone());
        for record in self.function_records(FunctionFilter::default())? {
            db.add_function(record.function.start, record.function.raw_name);
        }
        Ok(db)
    }

    /// Get session statistics
    pub fn stats(&self, dispatch_prefix: &str) -> Result<SessionStats> {
        let count = |sql: &str| -> Result<usize> {
            let n: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
            Ok(n as usize)
        };
        let dispatch_stubs: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT address) FROM symbols WHERE substr(short_name, 1, length(?1)) = ?1",
            params![dispatch_prefix],
            |row| row.get(0),
        )?;

        Ok(SessionStats {
            functions: count("SELECT COUNT(*) FROM functions")?,
            typed: count("SELECT COUNT(*) FROM functions WHERE type_json IS NOT NULL")?,
            pending: count("SELECT COUNT(*) FROM functions WHERE pending = 1")?,
            dispatch_stubs: dispatch_stubs as usize,
            user_types: count("SELECT COUNT(*) FROM user_types")?,
        })
    }
}

impl AnalysisDatabase for Session {
    fn platform(&self) -> Platform {
        self.meta.platform.clone()
    }

    fn functions(&self) -> Result<Vec<Function>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare("SELECT address, raw_name, short_name FROM symbols ORDER BY address, rowid")
            .map_err(backend)?;
        let rows = stmt.query_map([], function_from_row).map_err(backend)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(backend)
    }

    fn functions_by_name(&self, name: &str) -> Result<Vec<Function>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT address, raw_name, short_name FROM symbols
                 WHERE raw_name = ?1 OR short_name = ?1 ORDER BY address, rowid",
            )
            .map_err(backend)?;
        let rows = stmt
            .query_map(params![name], function_from_row)
            .map_err(backend)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(backend)
    }

    fn define_user_type(&mut self, name: &str, ty: &CType) -> Result<(), DatabaseError> {
        let json = serde_json::to_string(ty).map_err(backend)?;
        self.conn
            .execute(
                "INSERT OR REPLACE INTO user_types (name, type_json, defined_at) VALUES (?1, ?2, ?3)",
                params![name, json, Utc::now().to_rfc3339()],
            )
            .map_err(backend)?;
        Ok(())
    }

    fn set_function_type(&mut self, start: u64, ty: &CType) -> Result<(), DatabaseError> {
        let json = serde_json::to_string(ty).map_err(backend)?;
        let changed = self
            .conn
            .execute(
                "UPDATE functions SET type_json = ?1 WHERE address = ?2",
                params![json, start as i64],
            )
            .map_err(backend)?;
        if changed == 0 {
            return Err(DatabaseError::UnknownFunction(start));
        }
        Ok(())
    }

    fn reanalyze(&mut self, start: u64) -> Result<(), DatabaseError> {
        let changed = self
            .conn
            .execute(
                "UPDATE functions SET generation = generation + 1, pending = 1 WHERE address = ?1",
                params![start as i64],
            )
            .map_err(backend)?;
        if changed == 0 {
            return Err(DatabaseError::UnknownFunction(start));
        }
        Ok(())
    }

    /// Each pipeline step runs in its own transaction.
    fn begin_step(&mut self) -> Result<(), DatabaseError> {
        self.conn.execute_batch("BEGIN").map_err(backend)
    }

    fn end_step(&mut self, keep: bool) -> Result<(), DatabaseError> {
        let sql = if keep { "COMMIT" } else { "ROLLBACK" };
        self.conn.execute_batch(sql).map_err(backend)
    }
}

fn function_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Function> {
    Ok(Function {
        start: row.get::<_, i64>(0)? as u64,
        raw_name: row.get(1)?,
        short_name: row.get(2)?,
    })
}

fn backend(e: impl std::fmt::Display) -> DatabaseError {
    DatabaseError::Backend(e.to_string())
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Compute SHA256 hash of data
fn compute_hash(data: &[u8]) -> String {
    Sha256::digest(data)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Default session path for a binary: `<binary>.jnisig`
pub fn default_session_path(binary: &Path) -> PathBuf {
    let mut name = binary.as_os_str().to_owned();
    name.push(".jnisig");
    PathBuf::from(name)
}
