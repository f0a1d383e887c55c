//! SQLite database layer.
//!
//! Persists the flat key-value mapping that plays the role of the extension's
//! local storage area.

mod migrations;

use rusqlite::Connection;
use std::path::PathBuf;

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").field("path", &self.path).finish()
    }
}

impl Database {
    /// Open the database at the default location.
    ///
    /// Default path: `~/.local/share/vtabs/vtabs.db`
    pub fn open() -> anyhow::Result<Self> {
        let path = Self::default_path()?;
        Self::open_at(path)
    }

    /// Open the database at a specific path.
    ///
    /// Creates parent directories if they don't exist.
    pub fn open_at(path: PathBuf) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&path)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Err(e) = std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
            {
                tracing::warn!(path = %path.display(), error = %e, "Failed to set database file permissions");
            }
        }

        Ok(Self {
            conn,
            path: Some(path),
        })
    }

    /// Open a throwaway in-memory database.
    pub fn open_in_memory() -> anyhow::Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
            path: None,
        })
    }

    /// Get the default database path.
    pub fn default_path() -> anyhow::Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".local/share")))
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;

        Ok(data_dir.join("vtabs").join("vtabs.db"))
    }

    /// Run database migrations. Safe to call multiple times.
    pub fn migrate(&mut self) -> anyhow::Result<()> {
        migrations::run_migrations(&mut self.conn)?;
        Ok(())
    }

    // =========================================================================
    // Settings Storage
    // =========================================================================

    /// Save a setting (upsert).
    pub fn set_setting(&self, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO settings (key, value, updated_at) VALUES (?, ?, unixepoch())
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            [key, value],
        )?;
        Ok(())
    }

    /// Get a setting. Returns `None` if it doesn't exist.
    pub fn get_setting(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM settings WHERE key = ?")?;
        let result = stmt.query_row([key], |row| row.get(0));
        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// All stored settings as (key, value) pairs, ordered by key.
    pub fn list_settings(&self) -> Result<Vec<(String, String)>, rusqlite::Error> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value FROM settings ORDER BY key")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_db() -> (TempDir, Database) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let mut db = Database::open_at(db_path).unwrap();
        db.migrate().unwrap();
        (temp_dir, db)
    }

    #[test]
    fn test_open_at_creates_parent_directories() {
        let tmp = TempDir::new().unwrap();
        let nested_path = tmp.path().join("deep").join("nested").join("test.db");

        assert!(!nested_path.parent().unwrap().exists());
        let _db = Database::open_at(nested_path.clone()).unwrap();
        assert!(nested_path.exists());
    }

    #[test]
    fn test_open_at_reuses_existing_database() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("test.db");

        {
            let mut db = Database::open_at(path.clone()).unwrap();
            db.migrate().unwrap();
            db.set_setting("width", "300").unwrap();
        }

        {
            let db = Database::open_at(path).unwrap();
            assert_eq!(db.get_setting("width").unwrap(), Some("300".to_string()));
        }
    }

    #[test]
    fn test_default_path_returns_valid_path() {
        if let Ok(path) = Database::default_path() {
            assert!(path.ends_with("vtabs/vtabs.db"));
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_open_at_sets_restrictive_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("secure.db");
        let _db = Database::open_at(path.clone()).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn test_set_setting_upserts_existing() {
        let (_temp, db) = setup_test_db();

        db.set_setting("theme", "\"light\"").unwrap();
        db.set_setting("theme", "\"dark\"").unwrap();

        assert_eq!(db.get_setting("theme").unwrap(), Some("\"dark\"".to_string()));
    }

    #[test]
    fn test_get_setting_returns_none_for_missing() {
        let (_temp, db) = setup_test_db();
        assert!(db.get_setting("nonexistent").unwrap().is_none());
    }

    #[test]
    fn test_list_settings_sorted() {
        let (_temp, db) = setup_test_db();

        db.set_setting("width", "250").unwrap();
        db.set_setting("debug", "false").unwrap();

        let rows = db.list_settings().unwrap();
        assert_eq!(
            rows,
            vec![
                ("debug".to_string(), "false".to_string()),
                ("width".to_string(), "250".to_string()),
            ]
        );
    }

    #[test]
    fn test_set_setting_without_migration_fails() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.set_setting("width", "250").is_err());
    }
}
