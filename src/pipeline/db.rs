//! SQLite schema migration loader
//!
//! Reads numbered `.sql` files from a schema directory and executes them in
//! sorted order. All files must use `IF NOT EXISTS` clauses so the loader is
//! idempotent across restarts.

use super::error::PipelineError;
use rusqlite::Connection;
use std::fs;
use std::path::Path;

/// Run schema migrations from SQL files.
///
/// Enables WAL mode first (concurrent readers while a run is writing), then
/// executes every `.sql` file in the directory, ordered by filename
/// (`01_`, `02_`, ...).
pub fn run_schema_migrations(conn: &mut Connection, schema_dir: &str) -> Result<(), PipelineError> {
    let schema_path = Path::new(schema_dir);

    if !schema_path.exists() {
        return Err(PipelineError::Config(format!(
            "Schema directory not found: {}",
            schema_dir
        )));
    }

    conn.pragma_update(None, "journal_mode", "WAL")?;
    log::info!("📊 Enabled WAL mode for SQLite database");

    let mut sql_files: Vec<_> = fs::read_dir(schema_path)
        .map_err(|e| PipelineError::Config(format!("cannot read {}: {}", schema_dir, e)))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().extension().and_then(|s| s.to_str()) == Some("sql"))
        .collect();

    sql_files.sort_by_key(|entry| entry.file_name());

    log::info!("🔧 Running schema migrations from: {}", schema_dir);

    for entry in sql_files {
        let path = entry.path();
        let filename = path.file_name().unwrap().to_string_lossy().into_owned();

        let sql_content = fs::read_to_string(&path)
            .map_err(|e| PipelineError::Config(format!("cannot read {}: {}", filename, e)))?;

        conn.execute_batch(&sql_content)?;

        log::info!("   └─ ✅ Applied: {}", filename);
    }

    log::info!("✅ All schema migrations completed");

    Ok(())
}
