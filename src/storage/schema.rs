//! Database schema definitions

/// SQL to create the uploads table
pub const CREATE_UPLOADS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS uploads (
    id INTEGER PRIMARY KEY,
    repository_id INTEGER NOT NULL,
    commit_rev TEXT NOT NULL,
    root TEXT NOT NULL DEFAULT '',
    indexer TEXT NOT NULL,
    state TEXT NOT NULL,
    finished_at INTEGER
)
"#;

/// SQL to create the hovers table
pub const CREATE_HOVERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS hovers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    upload_id INTEGER NOT NULL,
    path TEXT NOT NULL,
    start_line INTEGER NOT NULL,
    start_character INTEGER NOT NULL,
    end_line INTEGER NOT NULL,
    end_character INTEGER NOT NULL,
    text TEXT NOT NULL
)
"#;

/// SQL to create the definitions table
pub const CREATE_DEFINITIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS definitions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    upload_id INTEGER NOT NULL,
    path TEXT NOT NULL,
    start_line INTEGER NOT NULL,
    start_character INTEGER NOT NULL,
    end_line INTEGER NOT NULL,
    end_character INTEGER NOT NULL,
    target_path TEXT NOT NULL,
    target_start_line INTEGER NOT NULL,
    target_start_character INTEGER NOT NULL,
    target_end_line INTEGER NOT NULL,
    target_end_character INTEGER NOT NULL
)
"#;

/// SQL to create the references table ("refs": "references" is reserved)
pub const CREATE_REFS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS refs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    upload_id INTEGER NOT NULL,
    path TEXT NOT NULL,
    start_line INTEGER NOT NULL,
    start_character INTEGER NOT NULL,
    end_line INTEGER NOT NULL,
    end_character INTEGER NOT NULL,
    target_path TEXT NOT NULL,
    target_start_line INTEGER NOT NULL,
    target_start_character INTEGER NOT NULL,
    target_end_line INTEGER NOT NULL,
    target_end_character INTEGER NOT NULL
)
"#;

/// SQL to create the monikers table
pub const CREATE_MONIKERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS monikers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    upload_id INTEGER NOT NULL,
    path TEXT NOT NULL,
    start_line INTEGER NOT NULL,
    start_character INTEGER NOT NULL,
    end_line INTEGER NOT NULL,
    end_character INTEGER NOT NULL,
    scheme TEXT NOT NULL,
    identifier TEXT NOT NULL,
    kind TEXT NOT NULL,
    package_information_id TEXT
)
"#;

/// SQL to create the symbol_locations table, the per-upload moniker
/// location lists keyed by (scheme, identifier, table_name)
pub const CREATE_SYMBOL_LOCATIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS symbol_locations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    upload_id INTEGER NOT NULL,
    scheme TEXT NOT NULL,
    identifier TEXT NOT NULL,
    table_name TEXT NOT NULL,
    path TEXT NOT NULL,
    start_line INTEGER NOT NULL,
    start_character INTEGER NOT NULL,
    end_line INTEGER NOT NULL,
    end_character INTEGER NOT NULL
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_uploads_repository ON uploads(repository_id, state)",
    "CREATE INDEX IF NOT EXISTS idx_hovers_lookup ON hovers(upload_id, path, start_line)",
    "CREATE INDEX IF NOT EXISTS idx_definitions_lookup ON definitions(upload_id, path, start_line)",
    "CREATE INDEX IF NOT EXISTS idx_refs_lookup ON refs(upload_id, path, start_line)",
    "CREATE INDEX IF NOT EXISTS idx_monikers_lookup ON monikers(upload_id, path, start_line)",
    "CREATE INDEX IF NOT EXISTS idx_monikers_identity ON monikers(scheme, identifier, kind)",
    "CREATE INDEX IF NOT EXISTS idx_symbol_locations_lookup ON symbol_locations(upload_id, scheme, identifier, table_name)",
];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![
        CREATE_UPLOADS_TABLE,
        CREATE_HOVERS_TABLE,
        CREATE_DEFINITIONS_TABLE,
        CREATE_REFS_TABLE,
        CREATE_MONIKERS_TABLE,
        CREATE_SYMBOL_LOCATIONS_TABLE,
    ];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
