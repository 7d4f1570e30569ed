//! Multi-row writes.
//!
//! A batch becomes one `INSERT` statement. Rows failing validation are left
//! out and logged; the report tells how many rows the statement affected.
//! Batches too large for one statement are split by [`write_bulk_chunked`].

use crate::error::CatalogResult;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::fmt;
use tracing::{debug, error, info, warn};

/// Bound parameters one statement may carry in the bundled SQLite
pub const MAX_BOUND_PARAMETERS: usize = 32766;

const STATEMENT_FAILED: &str = "the bulk statement could not be executed";

/// Conflict behaviour of a bulk statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertMode {
    Insert,
    InsertOrIgnore,
    /// Updates the existing row in place so its id is kept
    InsertOrReplace,
    InsertOrAbort,
    InsertOrFail,
    InsertOrRollback,
}

impl InsertMode {
    fn verb(self) -> &'static str {
        match self {
            InsertMode::Insert | InsertMode::InsertOrReplace => "INSERT",
            InsertMode::InsertOrIgnore => "INSERT OR IGNORE",
            InsertMode::InsertOrAbort => "INSERT OR ABORT",
            InsertMode::InsertOrFail => "INSERT OR FAIL",
            InsertMode::InsertOrRollback => "INSERT OR ROLLBACK",
        }
    }
}

/// Entity that can be written by [`write_bulk`]
pub trait BulkRow {
    const TABLE: &'static str;
    /// Written columns, in the order of [`BulkRow::values`]
    const COLUMNS: &'static [&'static str];
    /// Columns of the unique natural key index
    const CONFLICT_KEY: &'static [&'static str];

    fn check(&self) -> CatalogResult<()>;
    fn describe(&self) -> String;
    fn values(&self) -> CatalogResult<Vec<Value>>;
}

/// Outcome of a bulk statement
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkReport {
    pub submitted: usize,
    pub skipped: usize,
    pub affected: usize,
    pub message: String,
}

impl BulkReport {
    /// At least one row was written
    pub fn is_success(&self) -> bool {
        self.affected > 0
    }
}

impl fmt::Display for BulkReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} rows affected ({} skipped): {}",
            self.affected, self.submitted, self.skipped, self.message
        )
    }
}

/// Build the statement text for `rows` rows
fn statement<T: BulkRow>(mode: InsertMode, rows: usize) -> String {
    let placeholders = format!("({})", vec!["?"; T::COLUMNS.len()].join(", "));
    let mut sql = format!(
        "{} INTO {} ({}) VALUES {}",
        mode.verb(),
        T::TABLE,
        T::COLUMNS.join(", "),
        vec![placeholders; rows].join(", ")
    );

    if mode == InsertMode::InsertOrReplace {
        let updates: Vec<String> = T::COLUMNS
            .iter()
            .filter(|c| !T::CONFLICT_KEY.contains(c))
            .map(|c| format!("{0} = excluded.{0}", c))
            .collect();
        if updates.is_empty() {
            sql.push_str(&format!(" ON CONFLICT({}) DO NOTHING", T::CONFLICT_KEY.join(", ")));
        } else {
            sql.push_str(&format!(
                " ON CONFLICT({}) DO UPDATE SET {}",
                T::CONFLICT_KEY.join(", "),
                updates.join(", ")
            ));
        }
    }

    sql
}

/// Write `rows` in one statement
pub fn write_bulk<T: BulkRow>(conn: &Connection, rows: &[T], mode: InsertMode) -> BulkReport {
    let submitted = rows.len();
    let mut params: Vec<Value> = Vec::with_capacity(submitted * T::COLUMNS.len());
    let mut accepted = 0;

    for row in rows {
        let values = row.check().and_then(|_| row.values());
        match values {
            Ok(values) => {
                params.extend(values);
                accepted += 1;
            }
            Err(e) => {
                warn!(table = T::TABLE, row = %row.describe(), error = %e, "Skipping invalid row");
            }
        }
    }

    let skipped = submitted - accepted;

    if accepted == 0 {
        return BulkReport {
            submitted,
            skipped,
            affected: 0,
            message: "no valid rows to write".to_string(),
        };
    }

    let sql = statement::<T>(mode, accepted);
    debug!(table = T::TABLE, rows = accepted, mode = ?mode, "Executing bulk statement");

    match conn.execute(&sql, params_from_iter(params)) {
        Ok(affected) => {
            let message = summary(submitted, skipped, affected);
            info!(
                table = T::TABLE,
                submitted,
                skipped,
                affected,
                "Bulk write complete"
            );
            BulkReport {
                submitted,
                skipped,
                affected,
                message,
            }
        }
        Err(e) => {
            error!(table = T::TABLE, rows = accepted, error = %e, "Bulk statement failed");
            BulkReport {
                submitted,
                skipped,
                affected: 0,
                message: STATEMENT_FAILED.to_string(),
            }
        }
    }
}

fn summary(submitted: usize, skipped: usize, affected: usize) -> String {
    if affected == submitted {
        "all rows written".to_string()
    } else {
        format!(
            "{} of {} rows written, {} skipped as invalid",
            affected, submitted, skipped
        )
    }
}

/// Rows of `T` that fit in one statement
pub fn rows_per_statement<T: BulkRow>() -> usize {
    (MAX_BOUND_PARAMETERS / T::COLUMNS.len()).max(1)
}

/// Write `rows` with one multi-row statement per chunk
///
/// Each chunk stays under [`MAX_BOUND_PARAMETERS`]; the reports are merged.
pub fn write_bulk_chunked<T: BulkRow>(conn: &Connection, rows: &[T], mode: InsertMode) -> BulkReport {
    let chunk_rows = rows_per_statement::<T>();
    if rows.len() <= chunk_rows {
        return write_bulk(conn, rows, mode);
    }

    let mut total = BulkReport::default();
    let mut failed = 0;
    for chunk in rows.chunks(chunk_rows) {
        let report = write_bulk(conn, chunk, mode);
        if report.message == STATEMENT_FAILED {
            failed += 1;
        }
        total.submitted += report.submitted;
        total.skipped += report.skipped;
        total.affected += report.affected;
    }

    let chunks = rows.len().div_ceil(chunk_rows);
    total.message = if failed == 0 {
        summary(total.submitted, total.skipped, total.affected)
    } else {
        format!(
            "{} of {} statements could not be executed; {}",
            failed,
            chunks,
            summary(total.submitted, total.skipped, total.affected)
        )
    };
    debug!(table = T::TABLE, chunks, failed, "Chunked bulk write complete");
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support::temp_catalog;
    use crate::enums::{CategoryType, Section};
    use crate::models::{Category, SheetIndex};
    use anyhow::Result;

    fn index(url: &str, name: &str) -> SheetIndex {
        SheetIndex::new(Section::Anime, url, name)
    }

    #[test]
    fn test_statement_shapes() {
        let sql = statement::<SheetIndex>(InsertMode::InsertOrIgnore, 2);
        assert!(sql.starts_with("INSERT OR IGNORE INTO sheet_index"));
        assert_eq!(sql.matches('?').count(), 2 * SheetIndex::COLUMNS.len());

        let sql = statement::<SheetIndex>(InsertMode::InsertOrReplace, 1);
        assert!(sql.contains("ON CONFLICT(url) DO UPDATE SET"));
        assert!(!sql.contains("url = excluded.url"));
    }

    #[test]
    fn test_invalid_urls_are_skipped() -> Result<()> {
        let (_dir, catalog) = temp_catalog()?;
        let rows = vec![
            index("https://anime.example.org/anime/1/a.html", "A"),
            index("not-a-url", "B"),
            index("https://anime.example.org/anime/3/c.html", "C"),
            index("/relative/4.html", "D"),
            index("https://anime.example.org/anime/5/e.html", "E"),
        ];

        let report = write_bulk(catalog.conn(), &rows, InsertMode::Insert);
        assert_eq!(report.submitted, 5);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.affected, 3);
        assert!(report.is_success());
        assert_eq!(catalog.sheet_index().count()?, 3);
        Ok(())
    }

    #[test]
    fn test_all_invalid_is_a_failure() -> Result<()> {
        let (_dir, catalog) = temp_catalog()?;
        let rows = vec![index("nope", "A"), index("https://anime.example.org/x", "")];

        let report = write_bulk(catalog.conn(), &rows, InsertMode::Insert);
        assert!(!report.is_success());
        assert_eq!(report.skipped, 2);
        assert_eq!(catalog.sheet_index().count()?, 0);
        Ok(())
    }

    #[test]
    fn test_replace_keeps_row_id() -> Result<()> {
        let (_dir, catalog) = temp_catalog()?;
        let url = "https://anime.example.org/anime/1/a.html";

        write_bulk(catalog.conn(), &[index(url, "Old name")], InsertMode::Insert);
        let before = catalog.sheet_index().id_by_url(url)?;

        let report = write_bulk(catalog.conn(), &[index(url, "New name")], InsertMode::InsertOrReplace);
        assert_eq!(report.affected, 1);

        let stored = catalog.sheet_index().single_by_url(url)?.expect("row exists");
        assert_eq!(stored.id, before);
        assert_eq!(stored.name, "New name");
        Ok(())
    }

    #[test]
    fn test_large_batch_is_split_into_statements() -> Result<()> {
        let (_dir, catalog) = temp_catalog()?;
        let count = rows_per_statement::<SheetIndex>() + 500;
        let rows: Vec<SheetIndex> = (1..=count)
            .map(|n| index(&format!("https://anime.example.org/anime/{}/s.html", n), "Sheet"))
            .collect();

        let report = write_bulk_chunked(catalog.conn(), &rows, InsertMode::InsertOrReplace);
        assert_eq!(report.submitted, count);
        assert_eq!(report.affected, count);
        assert_eq!(report.message, "all rows written");
        assert_eq!(catalog.sheet_index().count()?, count as i64);

        // Replaying the listing updates in place
        let again = write_bulk_chunked(catalog.conn(), &rows, InsertMode::InsertOrReplace);
        assert_eq!(again.affected, count);
        assert_eq!(catalog.sheet_index().count()?, count as i64);
        Ok(())
    }

    #[test]
    fn test_ignore_and_plain_insert_on_duplicates() -> Result<()> {
        let (_dir, catalog) = temp_catalog()?;
        let rows = vec![
            Category::new(Section::Anime, CategoryType::Genre, "Action"),
            Category::new(Section::Anime, CategoryType::Theme, "Action"),
        ];

        let first = write_bulk(catalog.conn(), &rows, InsertMode::InsertOrIgnore);
        assert_eq!(first.affected, 2);

        let again = write_bulk(catalog.conn(), &rows, InsertMode::InsertOrIgnore);
        assert_eq!(again.affected, 0);
        assert!(!again.is_success());

        let plain = write_bulk(catalog.conn(), &rows, InsertMode::Insert);
        assert!(!plain.is_success());
        assert_eq!(catalog.categories().count()?, 2);
        Ok(())
    }
}
