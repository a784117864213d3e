//! SQLite storage implementation

use super::schema;
use crate::position::{Position, Range};
use crate::selector::strip_root;
use crate::store::{BundleStore, UploadStore};
use crate::upload::{Location, LocationTable, Moniker, MonikerKind, Upload, UploadState};
use async_trait::async_trait;
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite-backed index store serving both the upload metadata and the
/// per-upload bundle data.
///
/// Lookups are cheap point reads, so they run on the caller's thread
/// behind a connection mutex rather than a blocking pool.
pub struct SqliteIndexStore {
    conn: Mutex<Connection>,
}

impl SqliteIndexStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> anyhow::Result<()> {
        let conn = self.conn()?;
        for stmt in schema::all_schema_statements() {
            conn.execute(stmt, [])?;
        }
        Ok(())
    }

    fn conn(&self) -> anyhow::Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("database connection lock poisoned"))
    }

    // ========== Writer Operations ==========

    /// Insert or replace an upload record
    pub fn insert_upload(&self, upload: &Upload) -> anyhow::Result<()> {
        self.conn()?.execute(
            r#"
            INSERT OR REPLACE INTO uploads (id, repository_id, commit_rev, root, indexer, state, finished_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                upload.id,
                upload.repository_id,
                upload.commit,
                upload.root,
                upload.indexer,
                upload.state.as_str(),
                upload.finished_at,
            ],
        )?;
        Ok(())
    }

    /// Attach hover text to a range of a bundle document
    pub fn insert_hover(
        &self,
        upload_id: i64,
        path: &str,
        range: Range,
        text: &str,
    ) -> anyhow::Result<()> {
        self.conn()?.execute(
            r#"
            INSERT INTO hovers (upload_id, path, start_line, start_character, end_line, end_character, text)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                upload_id,
                path,
                range.start.line,
                range.start.character,
                range.end.line,
                range.end.character,
                text,
            ],
        )?;
        Ok(())
    }

    /// Map a source occurrence to its definition within the same bundle
    pub fn insert_definition(
        &self,
        upload_id: i64,
        path: &str,
        source: Range,
        target_path: &str,
        target: Range,
    ) -> anyhow::Result<()> {
        self.insert_occurrence("definitions", upload_id, path, source, target_path, target)
    }

    /// Map a source occurrence to one of its references within the same bundle
    pub fn insert_reference(
        &self,
        upload_id: i64,
        path: &str,
        source: Range,
        target_path: &str,
        target: Range,
    ) -> anyhow::Result<()> {
        self.insert_occurrence("refs", upload_id, path, source, target_path, target)
    }

    fn insert_occurrence(
        &self,
        table: &str,
        upload_id: i64,
        path: &str,
        source: Range,
        target_path: &str,
        target: Range,
    ) -> anyhow::Result<()> {
        let sql = format!(
            r#"
            INSERT INTO {table} (upload_id, path, start_line, start_character, end_line, end_character,
                                 target_path, target_start_line, target_start_character, target_end_line, target_end_character)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#
        );
        self.conn()?.execute(
            &sql,
            params![
                upload_id,
                path,
                source.start.line,
                source.start.character,
                source.end.line,
                source.end.character,
                target_path,
                target.start.line,
                target.start.character,
                target.end.line,
                target.end.character,
            ],
        )?;
        Ok(())
    }

    /// Attach a moniker to a range of a bundle document
    pub fn insert_moniker(
        &self,
        upload_id: i64,
        path: &str,
        range: Range,
        moniker: &Moniker,
    ) -> anyhow::Result<()> {
        self.conn()?.execute(
            r#"
            INSERT INTO monikers (upload_id, path, start_line, start_character, end_line, end_character,
                                  scheme, identifier, kind, package_information_id)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                upload_id,
                path,
                range.start.line,
                range.start.character,
                range.end.line,
                range.end.character,
                moniker.scheme,
                moniker.identifier,
                moniker.kind.as_str(),
                moniker.package_information_id,
            ],
        )?;
        Ok(())
    }

    /// Record one location of a symbol's per-bundle location list
    pub fn insert_symbol_location(
        &self,
        upload_id: i64,
        moniker: &Moniker,
        table: LocationTable,
        path: &str,
        range: Range,
    ) -> anyhow::Result<()> {
        self.conn()?.execute(
            r#"
            INSERT INTO symbol_locations (upload_id, scheme, identifier, table_name, path,
                                          start_line, start_character, end_line, end_character)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                upload_id,
                moniker.scheme,
                moniker.identifier,
                table.as_str(),
                path,
                range.start.line,
                range.start.character,
                range.end.line,
                range.end.character,
            ],
        )?;
        Ok(())
    }

    // ========== Row Helpers ==========

    fn row_to_upload(row: &Row) -> rusqlite::Result<Upload> {
        let state_str: String = row.get(5)?;
        let state: UploadState = state_str.parse().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                5,
                rusqlite::types::Type::Text,
                Box::new(std::io::Error::other(format!("{e}"))),
            )
        })?;
        Ok(Upload {
            id: row.get(0)?,
            repository_id: row.get(1)?,
            commit: row.get(2)?,
            root: row.get(3)?,
            indexer: row.get(4)?,
            state,
            finished_at: row.get(6)?,
        })
    }

    fn range_at(row: &Row, first_column: usize) -> rusqlite::Result<Range> {
        Ok(Range::new(
            Position::new(row.get(first_column)?, row.get(first_column + 1)?),
            Position::new(row.get(first_column + 2)?, row.get(first_column + 3)?),
        ))
    }
}

fn span(range: &Range) -> (u32, u32) {
    (
        range.end.line - range.start.line,
        if range.end.line == range.start.line {
            range.end.character.saturating_sub(range.start.character)
        } else {
            u32::MAX
        },
    )
}

#[async_trait]
impl BundleStore for SqliteIndexStore {
    async fn hover(
        &self,
        upload_id: i64,
        path: &str,
        position: Position,
    ) -> anyhow::Result<Option<(String, Range)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT start_line, start_character, end_line, end_character, text
            FROM hovers WHERE upload_id = ?1 AND path = ?2
            "#,
        )?;
        let rows = stmt.query_map(params![upload_id, path], |row| {
            let range = Self::range_at(row, 0)?;
            let text: String = row.get(4)?;
            Ok((text, range))
        })?;

        // Narrowest containing range wins
        let mut best: Option<(String, Range)> = None;
        for row in rows {
            let (text, range) = row?;
            if !range.contains(position) {
                continue;
            }
            if best
                .as_ref()
                .is_none_or(|(_, current)| span(&range) < span(current))
            {
                best = Some((text, range));
            }
        }
        Ok(best)
    }

    async fn definitions(
        &self,
        upload_id: i64,
        path: &str,
        position: Position,
    ) -> anyhow::Result<Vec<Location>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT start_line, start_character, end_line, end_character,
                   target_path, target_start_line, target_start_character, target_end_line, target_end_character
            FROM definitions WHERE upload_id = ?1 AND path = ?2 ORDER BY id
            "#,
        )?;
        let rows = stmt.query_map(params![upload_id, path], |row| {
            let source = Self::range_at(row, 0)?;
            let target_path: String = row.get(4)?;
            let target = Self::range_at(row, 5)?;
            Ok((source, target_path, target))
        })?;

        let mut locations = Vec::new();
        for row in rows {
            let (source, target_path, target) = row?;
            if source.contains(position) {
                locations.push(Location {
                    upload_id,
                    path: target_path,
                    range: target,
                });
            }
        }
        Ok(locations)
    }

    async fn references(
        &self,
        upload_id: i64,
        path: &str,
        position: Position,
        limit: usize,
        offset: usize,
    ) -> anyhow::Result<(Vec<Location>, usize)> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT start_line, start_character, end_line, end_character,
                   target_path, target_start_line, target_start_character, target_end_line, target_end_character
            FROM refs WHERE upload_id = ?1 AND path = ?2 ORDER BY id
            "#,
        )?;
        let rows = stmt.query_map(params![upload_id, path], |row| {
            let source = Self::range_at(row, 0)?;
            let target_path: String = row.get(4)?;
            let target = Self::range_at(row, 5)?;
            Ok((source, target_path, target))
        })?;

        let mut all = Vec::new();
        for row in rows {
            let (source, target_path, target) = row?;
            if source.contains(position) {
                all.push(Location {
                    upload_id,
                    path: target_path,
                    range: target,
                });
            }
        }
        let total = all.len();
        let page = all.into_iter().skip(offset).take(limit).collect();
        Ok((page, total))
    }

    async fn monikers_at(
        &self,
        upload_id: i64,
        path: &str,
        position: Position,
    ) -> anyhow::Result<Vec<Moniker>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT start_line, start_character, end_line, end_character,
                   scheme, identifier, kind, package_information_id
            FROM monikers WHERE upload_id = ?1 AND path = ?2 ORDER BY id
            "#,
        )?;
        let rows = stmt.query_map(params![upload_id, path], |row| {
            let range = Self::range_at(row, 0)?;
            let scheme: String = row.get(4)?;
            let identifier: String = row.get(5)?;
            let kind_str: String = row.get(6)?;
            let package_information_id: Option<String> = row.get(7)?;
            Ok((range, scheme, identifier, kind_str, package_information_id))
        })?;

        let mut monikers = Vec::new();
        for row in rows {
            let (range, scheme, identifier, kind_str, package_information_id) = row?;
            if !range.contains(position) {
                continue;
            }
            let kind: MonikerKind = match kind_str.parse() {
                Ok(kind) => kind,
                Err(_) => continue,
            };
            monikers.push(Moniker {
                scheme,
                identifier,
                kind,
                package_information_id,
            });
        }
        Ok(monikers)
    }

    async fn moniker_locations(
        &self,
        upload_id: i64,
        moniker: &Moniker,
        table: LocationTable,
        limit: usize,
        offset: usize,
    ) -> anyhow::Result<(Vec<Location>, usize)> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT path, start_line, start_character, end_line, end_character
            FROM symbol_locations
            WHERE upload_id = ?1 AND scheme = ?2 AND identifier = ?3 AND table_name = ?4
            ORDER BY id
            "#,
        )?;
        let rows = stmt.query_map(
            params![upload_id, moniker.scheme, moniker.identifier, table.as_str()],
            |row| {
                let path: String = row.get(0)?;
                let range = Self::range_at(row, 1)?;
                Ok(Location {
                    upload_id,
                    path,
                    range,
                })
            },
        )?;

        let all: Vec<Location> = rows.collect::<rusqlite::Result<_>>()?;
        let total = all.len();
        let page = all.into_iter().skip(offset).take(limit).collect();
        Ok((page, total))
    }
}

#[async_trait]
impl UploadStore for SqliteIndexStore {
    async fn uploads_covering_path(
        &self,
        repository_id: i64,
        path: &str,
    ) -> anyhow::Result<Vec<Upload>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, repository_id, commit_rev, root, indexer, state, finished_at
            FROM uploads WHERE repository_id = ?1 AND state = 'completed'
            "#,
        )?;
        let rows = stmt.query_map([repository_id], Self::row_to_upload)?;

        // Root coverage is a path-prefix rule, checked outside SQL
        let mut uploads = Vec::new();
        for row in rows {
            let upload = row?;
            if strip_root(&upload.root, path).is_some() {
                uploads.push(upload);
            }
        }
        Ok(uploads)
    }

    async fn uploads_with_export_moniker(
        &self,
        moniker: &Moniker,
    ) -> anyhow::Result<Vec<Upload>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT DISTINCT u.id, u.repository_id, u.commit_rev, u.root, u.indexer, u.state, u.finished_at
            FROM monikers m
            JOIN uploads u ON u.id = m.upload_id
            WHERE m.scheme = ?1 AND m.identifier = ?2 AND m.kind = 'export' AND u.state = 'completed'
            ORDER BY u.finished_at DESC, u.id DESC
            "#,
        )?;
        let rows = stmt.query_map(
            params![moniker.scheme, moniker.identifier],
            Self::row_to_upload,
        )?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::completed_upload;

    fn range(sl: u32, sc: u32, el: u32, ec: u32) -> Range {
        Range::new(Position::new(sl, sc), Position::new(el, ec))
    }

    #[tokio::test]
    async fn test_hover_returns_narrowest_containing_range() {
        let store = SqliteIndexStore::open_in_memory().unwrap();
        store
            .insert_hover(1, "a.go", range(0, 0, 20, 0), "package doc")
            .unwrap();
        store
            .insert_hover(1, "a.go", range(4, 0, 4, 8), "func Foo()")
            .unwrap();

        let (text, r) = store
            .hover(1, "a.go", Position::new(4, 2))
            .await
            .unwrap()
            .expect("hover");
        assert_eq!(text, "func Foo()");
        assert_eq!(r, range(4, 0, 4, 8));

        // Outside both ranges
        assert!(store
            .hover(1, "a.go", Position::new(30, 0))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_definitions_match_containing_source_range() {
        let store = SqliteIndexStore::open_in_memory().unwrap();
        store
            .insert_definition(1, "a.go", range(4, 0, 4, 3), "b.go", range(9, 4, 9, 7))
            .unwrap();

        let hit = store
            .definitions(1, "a.go", Position::new(4, 1))
            .await
            .unwrap();
        assert_eq!(hit.len(), 1);
        assert_eq!(hit[0].path, "b.go");
        assert_eq!(hit[0].range, range(9, 4, 9, 7));

        let miss = store
            .definitions(1, "a.go", Position::new(5, 0))
            .await
            .unwrap();
        assert!(miss.is_empty());
    }

    #[tokio::test]
    async fn test_references_window_and_total() {
        let store = SqliteIndexStore::open_in_memory().unwrap();
        for line in 0..5 {
            store
                .insert_reference(
                    1,
                    "a.go",
                    range(4, 0, 4, 3),
                    "a.go",
                    range(line, 0, line, 3),
                )
                .unwrap();
        }

        let (page, total) = store
            .references(1, "a.go", Position::new(4, 1), 2, 3)
            .await
            .unwrap();
        assert_eq!(total, 5);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].range, range(3, 0, 3, 3));
        assert_eq!(page[1].range, range(4, 0, 4, 3));
    }

    #[tokio::test]
    async fn test_moniker_locations_filtered_by_table() {
        let store = SqliteIndexStore::open_in_memory().unwrap();
        let moniker = Moniker::new("mod", "pkg.Foo", MonikerKind::Export);
        store
            .insert_symbol_location(1, &moniker, LocationTable::Definitions, "a.go", range(9, 4, 9, 7))
            .unwrap();
        store
            .insert_symbol_location(1, &moniker, LocationTable::References, "b.go", range(2, 0, 2, 3))
            .unwrap();

        let (defs, total) = store
            .moniker_locations(1, &moniker, LocationTable::Definitions, 10, 0)
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(defs[0].path, "a.go");
    }

    #[tokio::test]
    async fn test_uploads_covering_path_applies_root_rule() {
        let store = SqliteIndexStore::open_in_memory().unwrap();
        store
            .insert_upload(&completed_upload(1, 42, "c1", "", Some(100)))
            .unwrap();
        store
            .insert_upload(&completed_upload(2, 42, "c1", "lib/", Some(100)))
            .unwrap();
        store
            .insert_upload(&completed_upload(3, 42, "c1", "cmd/", Some(100)))
            .unwrap();
        let mut queued = completed_upload(4, 42, "c1", "", None);
        queued.state = UploadState::Queued;
        store.insert_upload(&queued).unwrap();

        let uploads = store.uploads_covering_path(42, "lib/a.go").await.unwrap();
        let mut ids: Vec<i64> = uploads.iter().map(|u| u.id).collect();
        ids.sort();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_export_join_orders_by_freshness() {
        let store = SqliteIndexStore::open_in_memory().unwrap();
        store
            .insert_upload(&completed_upload(1, 42, "c1", "", Some(100)))
            .unwrap();
        store
            .insert_upload(&completed_upload(2, 7, "d1", "", Some(300)))
            .unwrap();
        let export = Moniker::new("mod", "pkg.Foo", MonikerKind::Export);
        store
            .insert_moniker(1, "a.go", range(9, 4, 9, 7), &export)
            .unwrap();
        store
            .insert_moniker(2, "b.go", range(0, 0, 0, 3), &export)
            .unwrap();
        // Imports never satisfy an export join
        store
            .insert_moniker(
                1,
                "c.go",
                range(1, 0, 1, 3),
                &Moniker::new("mod", "pkg.Bar", MonikerKind::Import),
            )
            .unwrap();

        let uploads = store
            .uploads_with_export_moniker(&Moniker::new("mod", "pkg.Foo", MonikerKind::Import))
            .await
            .unwrap();
        assert_eq!(uploads.iter().map(|u| u.id).collect::<Vec<_>>(), vec![2, 1]);

        let none = store
            .uploads_with_export_moniker(&Moniker::new("mod", "pkg.Bar", MonikerKind::Import))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_monikers_at_position() {
        let store = SqliteIndexStore::open_in_memory().unwrap();
        let import = Moniker::new("mod", "pkg.Foo", MonikerKind::Import);
        store
            .insert_moniker(1, "a.go", range(4, 0, 4, 3), &import)
            .unwrap();

        let hit = store.monikers_at(1, "a.go", Position::new(4, 1)).await.unwrap();
        assert_eq!(hit, vec![import]);
        let miss = store.monikers_at(1, "a.go", Position::new(9, 0)).await.unwrap();
        assert!(miss.is_empty());
    }
}
