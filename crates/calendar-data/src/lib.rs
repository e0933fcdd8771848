//! SQLite-backed implementations of `calendar-core`'s store facades.
//!
//! Schema: `days(pdist, month, day, title, subtitle, feast_name,
//! feast_level, service_note, saint, fast, fast_exception)`,
//! `readings(pdist, source, desc, month, day, book, pericope, ordering)`
//! joined with `pericopes(book, pericope, display, sdisplay)`, and
//! `bible(book, chapter, verse, content)`. Construction and population of
//! these tables (the XML importer) lives outside this crate; callers point
//! `SqliteStores::open` at an already-populated database file.

use std::path::Path;
use std::sync::Mutex;

use calendar_core::cancel::CancellationToken;
use calendar_core::error::{Error, Result};
use calendar_core::scripture::{PassageSpec, VerseClause};
use calendar_core::store::{BibleStore, CommemorationStore, ReadingPredicate, ReadingStore};
use calendar_core::types::{CommemorationRow, ReadingRow, Verse};
use rusqlite::{Connection, OptionalExtension};

fn store_err(err: rusqlite::Error) -> Error {
    Error::StoreUnavailable {
        message: err.to_string(),
    }
}

fn check_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    Ok(())
}

/// A SQLite connection behind a mutex, matching the teacher's own
/// cache-under-a-plain-mutex pattern rather than an async pool: these are
/// local file reads, held only for the duration of one query.
pub struct SqliteCommemorationStore {
    conn: Mutex<Connection>,
}

impl SqliteCommemorationStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

impl CommemorationStore for SqliteCommemorationStore {
    fn query(
        &self,
        pdist: i32,
        float_index: Option<i32>,
        month: i32,
        day: i32,
        cancel: &CancellationToken,
    ) -> Result<Vec<CommemorationRow>> {
        check_cancelled(cancel)?;
        let conn = self.conn.lock().expect("sqlite connection mutex poisoned");

        let sql = if float_index.is_some() {
            "SELECT pdist, month, day, title, subtitle, feast_name, feast_level, \
             service_note, saint, fast, fast_exception FROM days \
             WHERE pdist = ?1 OR pdist = ?2 OR (month = ?3 AND day = ?4)"
        } else {
            "SELECT pdist, month, day, title, subtitle, feast_name, feast_level, \
             service_note, saint, fast, fast_exception FROM days \
             WHERE pdist = ?1 OR (month = ?3 AND day = ?4)"
        };

        let mut stmt = conn.prepare(sql).map_err(store_err)?;
        let second = float_index.unwrap_or(pdist);
        let rows = stmt
            .query_map([pdist, second, month, day], |row| {
                Ok(CommemorationRow {
                    pdist: row.get(0)?,
                    month: row.get(1)?,
                    day: row.get(2)?,
                    title: row.get(3)?,
                    subtitle: row.get(4)?,
                    feast_name: row.get(5)?,
                    feast_level: row.get(6)?,
                    service_note: row.get(7)?,
                    saint: row.get(8)?,
                    fast: row.get(9)?,
                    fast_exception: row.get(10)?,
                })
            })
            .map_err(store_err)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(store_err)?;
        Ok(rows)
    }
}

/// Joins `readings` with `pericopes` and assembles the dynamic disjunction
/// `DayFactory::add_readings` builds, as bound parameters rather than
/// interpolated SQL text.
pub struct SqliteReadingStore {
    conn: Mutex<Connection>,
}

impl SqliteReadingStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

impl ReadingStore for SqliteReadingStore {
    fn query(&self, predicate: &ReadingPredicate, cancel: &CancellationToken) -> Result<Vec<ReadingRow>> {
        check_cancelled(cancel)?;
        let conn = self.conn.lock().expect("sqlite connection mutex poisoned");

        let mut clauses: Vec<String> = Vec::new();
        let mut binds: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(pdist) = predicate.gospel_pdist {
            let mut clause = "(r.pdist = ? AND r.source = 'Gospel'".to_string();
            binds.push(Box::new(pdist));
            if predicate.exclude_departed {
                clause.push_str(" AND r.desc != 'Departed'");
            }
            clause.push(')');
            clauses.push(clause);
        }
        if let Some(pdist) = predicate.epistle_pdist {
            let mut clause = "(r.pdist = ? AND r.source = 'Epistle'".to_string();
            binds.push(Box::new(pdist));
            if predicate.exclude_departed {
                clause.push_str(" AND r.desc != 'Departed'");
            }
            clause.push(')');
            clauses.push(clause);
        }
        if let Some(pdist) = predicate.fixed_pdist {
            clauses.push("(r.pdist = ? AND r.source NOT IN ('Epistle', 'Gospel'))".to_string());
            binds.push(Box::new(pdist));
        }
        if let Some(index) = predicate.float_pdist {
            clauses.push("(r.pdist = ?)".to_string());
            binds.push(Box::new(index));
        }
        if let Some(matins_pdist) = predicate.matins_gospel_pdist {
            clauses.push("(r.pdist = ?)".to_string());
            binds.push(Box::new(matins_pdist));
        }
        if let Some((month, day)) = predicate.vespers_month_day {
            clauses.push("(r.month = ? AND r.day = ? AND r.source = 'Vespers')".to_string());
            binds.push(Box::new(month));
            binds.push(Box::new(day));
        }
        if let Some((month, day)) = predicate.fixed_month_day {
            let mut clause = "(r.month = ? AND r.day = ?".to_string();
            binds.push(Box::new(month));
            binds.push(Box::new(day));
            if predicate.exclude_matins_gospel {
                clause.push_str(" AND r.source != 'Matins Gospel'");
            }
            if predicate.exclude_vespers {
                clause.push_str(" AND r.source != 'Vespers'");
            }
            if predicate.exclude_theotokos {
                clause.push_str(" AND r.desc != 'Theotokos'");
            }
            clause.push(')');
            clauses.push(clause);
        }

        if clauses.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT r.pdist, r.source, r.desc, r.month, r.day, r.book, r.pericope, \
             r.ordering, p.display, p.sdisplay \
             FROM readings r JOIN pericopes p ON r.book = p.book AND r.pericope = p.pericope \
             WHERE {} ORDER BY r.ordering",
            clauses.join(" OR ")
        );

        let mut stmt = conn.prepare(&sql).map_err(store_err)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = binds.iter().map(|b| b.as_ref()).collect();
        let rows = stmt
            .query_map(param_refs.as_slice(), |row| {
                Ok(ReadingRow {
                    pdist: row.get(0)?,
                    source: row.get(1)?,
                    description: row.get(2)?,
                    month: row.get(3)?,
                    day: row.get(4)?,
                    book: row.get(5)?,
                    pericope: row.get(6)?,
                    ordering: row.get(7)?,
                    display: row.get(8)?,
                    short_display: row.get(9)?,
                })
            })
            .map_err(store_err)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(store_err)?;
        Ok(rows)
    }
}

/// Resolves parsed scripture references against the `bible` table.
pub struct SqliteBibleStore {
    conn: Mutex<Connection>,
}

impl SqliteBibleStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

impl BibleStore for SqliteBibleStore {
    fn lookup(&self, passages: &[PassageSpec], cancel: &CancellationToken) -> Result<Vec<Verse>> {
        check_cancelled(cancel)?;
        let conn = self.conn.lock().expect("sqlite connection mutex poisoned");

        let mut verses = Vec::new();
        for passage in passages {
            let mut clauses: Vec<String> = Vec::new();
            let mut binds: Vec<i32> = Vec::new();
            let mut book_binds: Vec<String> = Vec::new();

            for clause in &passage.clauses {
                match *clause {
                    VerseClause::Single { chapter, verse } => {
                        clauses.push("(book = ? AND chapter = ? AND verse = ?)".to_string());
                        book_binds.push(passage.book.clone());
                        binds.push(chapter);
                        binds.push(verse);
                    }
                    VerseClause::WithinChapter { chapter, from, to } => {
                        clauses.push("(book = ? AND chapter = ? AND verse BETWEEN ? AND ?)".to_string());
                        book_binds.push(passage.book.clone());
                        binds.push(chapter);
                        binds.push(from);
                        binds.push(to);
                    }
                    VerseClause::AcrossChapters {
                        chapter_from,
                        verse_from,
                        chapter_to,
                        verse_to,
                    } => {
                        clauses.push(
                            "(book = ? AND ((chapter = ? AND verse >= ?) OR (chapter = ? AND verse <= ?)))"
                                .to_string(),
                        );
                        book_binds.push(passage.book.clone());
                        book_binds.push(passage.book.clone());
                        binds.push(chapter_from);
                        binds.push(verse_from);
                        binds.push(chapter_to);
                        binds.push(verse_to);
                    }
                }
            }

            if clauses.is_empty() {
                continue;
            }

            let sql = format!(
                "SELECT book, chapter, verse, content FROM bible WHERE {} ORDER BY book, chapter, verse",
                clauses.join(" OR ")
            );

            // Interleave book/int binds back into call order: every
            // clause above binds its book name(s) first, then its
            // integer columns, so we zip them per-clause instead of
            // passing two flat lists.
            let mut stmt = conn.prepare(&sql).map_err(store_err)?;
            let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
            let mut book_iter = book_binds.into_iter();
            let mut int_iter = binds.into_iter();
            for clause in &passage.clauses {
                match clause {
                    VerseClause::Single { .. } | VerseClause::WithinChapter { .. } => {
                        params.push(Box::new(book_iter.next().unwrap()));
                        params.push(Box::new(int_iter.next().unwrap()));
                        if matches!(clause, VerseClause::WithinChapter { .. }) {
                            params.push(Box::new(int_iter.next().unwrap()));
                        }
                        params.push(Box::new(int_iter.next().unwrap()));
                    }
                    VerseClause::AcrossChapters { .. } => {
                        params.push(Box::new(book_iter.next().unwrap()));
                        params.push(Box::new(int_iter.next().unwrap()));
                        params.push(Box::new(int_iter.next().unwrap()));
                        params.push(Box::new(book_iter.next().unwrap()));
                        params.push(Box::new(int_iter.next().unwrap()));
                        params.push(Box::new(int_iter.next().unwrap()));
                    }
                }
            }

            let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|b| b.as_ref()).collect();
            let rows = stmt
                .query_map(param_refs.as_slice(), |row| {
                    Ok(Verse {
                        book: row.get(0)?,
                        chapter: row.get(1)?,
                        verse: row.get(2)?,
                        content: row.get(3)?,
                    })
                })
                .map_err(store_err)?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(store_err)?;
            verses.extend(rows);
        }

        Ok(verses)
    }
}

/// Opens the three store facades against a single SQLite database file.
pub struct SqliteStores {
    pub commemorations: SqliteCommemorationStore,
    pub readings: SqliteReadingStore,
    pub bible: SqliteBibleStore,
}

impl SqliteStores {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let commemorations = Connection::open(path).map_err(store_err)?;
        let readings = Connection::open(path).map_err(store_err)?;
        let bible = Connection::open(path).map_err(store_err)?;

        // Confirm the database actually has the tables this crate expects
        // before handing out stores that would otherwise fail lazily on
        // first query.
        let has_days: Option<String> = commemorations
            .query_row(
                "SELECT name FROM sqlite_master WHERE type='table' AND name='days'",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(store_err)?;
        if has_days.is_none() {
            return Err(Error::StoreUnavailable {
                message: format!("{} has no 'days' table", path.display()),
            });
        }

        Ok(Self {
            commemorations: SqliteCommemorationStore::new(commemorations),
            readings: SqliteReadingStore::new(readings),
            bible: SqliteBibleStore::new(bible),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE days (
                pdist INTEGER, month INTEGER, day INTEGER, title TEXT, subtitle TEXT,
                feast_name TEXT, feast_level INTEGER, service_note TEXT, saint TEXT,
                fast INTEGER, fast_exception INTEGER
            );
            INSERT INTO days VALUES (0, 4, 8, 'Pascha', '', 'Holy Pascha', 8, '', '', 0, 11);

            CREATE TABLE pericopes (book TEXT, pericope INTEGER, display TEXT, sdisplay TEXT);
            INSERT INTO pericopes VALUES ('Acts', 1, 'Acts 1:1-8', 'Acts 1.1-8');

            CREATE TABLE readings (
                pdist INTEGER, source TEXT, desc TEXT, month INTEGER, day INTEGER,
                book TEXT, pericope INTEGER, ordering INTEGER
            );
            INSERT INTO readings VALUES (0, 'Epistle', '', 4, 8, 'Acts', 1, 1);

            CREATE TABLE bible (book TEXT, chapter INTEGER, verse INTEGER, content TEXT);
            INSERT INTO bible VALUES ('Acts', 1, 1, 'In the first book...');
            INSERT INTO bible VALUES ('Acts', 1, 2, 'Until the day...');",
        )
        .unwrap();
        conn
    }

    #[test]
    fn commemoration_store_matches_on_pdist() {
        let store = SqliteCommemorationStore::new(seeded_connection());
        let token = CancellationToken::new();
        let rows = store.query(0, None, 4, 8, &token).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "Pascha");
    }

    #[test]
    fn reading_store_joins_pericopes() {
        let store = SqliteReadingStore::new(seeded_connection());
        let token = CancellationToken::new();
        let predicate = ReadingPredicate {
            fixed_pdist: Some(0),
            ..Default::default()
        };
        let rows = store.query(&predicate, &token).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].short_display, "Acts 1.1-8");
    }

    #[test]
    fn bible_store_resolves_a_verse_range() {
        let store = SqliteBibleStore::new(seeded_connection());
        let token = CancellationToken::new();
        let passages = calendar_core::scripture::parse("Acts 1.1-2").unwrap();
        let verses = store.lookup(&passages, &token).unwrap();
        assert_eq!(verses.len(), 2);
    }

    #[test]
    fn open_rejects_a_database_without_the_expected_schema() {
        let file = tempfile::NamedTempFile::new().unwrap();
        Connection::open(file.path())
            .unwrap()
            .execute_batch("CREATE TABLE unrelated (x INTEGER);")
            .unwrap();
        assert!(SqliteStores::open(file.path()).is_err());
    }
}
