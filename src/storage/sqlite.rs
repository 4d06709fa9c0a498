use crate::fetch::Resource;
use crate::frontier::{Frontier, FrontierCounters};
use crate::sink::{ErrorSink, ResultSink};
use crate::url::NormalizedUrl;
use crate::{CrawlError, ErrorKind, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Mutex;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS urls (
    id          INTEGER PRIMARY KEY,
    url         TEXT NOT NULL UNIQUE,
    authority   TEXT NOT NULL,
    is_robots   INTEGER NOT NULL DEFAULT 0,
    issued      INTEGER NOT NULL DEFAULT 0,
    repeats     INTEGER NOT NULL DEFAULT 0,
    added_at    TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_urls_pending ON urls (issued, is_robots);

CREATE TABLE IF NOT EXISTS links (
    source      TEXT NOT NULL,
    target      TEXT NOT NULL,
    count       INTEGER NOT NULL DEFAULT 1,
    PRIMARY KEY (source, target)
);

CREATE TABLE IF NOT EXISTS redirects (
    source      TEXT NOT NULL,
    target      TEXT NOT NULL,
    PRIMARY KEY (source, target)
);

CREATE TABLE IF NOT EXISTS pages (
    url          TEXT PRIMARY KEY,
    status       INTEGER NOT NULL,
    content_type TEXT,
    content_hash TEXT,
    bytes        INTEGER NOT NULL,
    content      TEXT,
    fetched_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS failures (
    id          INTEGER PRIMARY KEY,
    url         TEXT NOT NULL,
    kind        TEXT NOT NULL,
    message     TEXT NOT NULL,
    recorded_at TEXT NOT NULL
);
";

/// Database-backed frontier and sinks in one handle.
///
/// URLs keep their pending/issued state in the database, so a crawl opened
/// against an existing file picks up the URLs a previous run discovered but
/// never fetched. A single connection behind a mutex is plenty here: the
/// database is touched between network requests, never inside them.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        tracing::info!(path = %path.display(), "crawl database opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    #[cfg(test)]
    fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Re-queues URLs a previous run claimed but never completed, so a
    /// resumed crawl retries them. Call before starting the workers.
    pub fn requeue_unfinished(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let requeued = conn.execute(
            "UPDATE urls SET issued = 0
             WHERE issued = 1 AND url NOT IN (SELECT url FROM pages)",
            [],
        )?;
        if requeued > 0 {
            tracing::info!(requeued, "unfinished URLs returned to the frontier");
        }
        Ok(requeued)
    }

    /// End-of-run totals: pages stored, bytes stored, failures recorded.
    pub fn report(&self) -> Result<(u64, u64, u64)> {
        let conn = self.conn.lock().unwrap();
        let (pages, bytes) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(bytes), 0) FROM pages",
            [],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
        )?;
        let failures: i64 = conn.query_row("SELECT COUNT(*) FROM failures", [], |row| row.get(0))?;
        Ok((pages as u64, bytes as u64, failures as u64))
    }

    fn insert_url(conn: &Connection, url: &NormalizedUrl, is_robots: bool) -> Result<()> {
        conn.execute(
            "INSERT OR IGNORE INTO urls (url, authority, is_robots, added_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                url.as_str(),
                url.authority(),
                is_robots,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }
}

impl Frontier for SqliteStore {
    fn add(&self, url: &NormalizedUrl) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        Self::insert_url(&conn, url, false)?;
        Self::insert_url(&conn, &url.robots_url(), true)?;
        Ok(())
    }

    fn add_link(&self, source: &NormalizedUrl, target: &NormalizedUrl) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO links (source, target) VALUES (?1, ?2)
             ON CONFLICT (source, target) DO UPDATE SET count = count + 1",
            params![source.as_str(), target.as_str()],
        )?;
        Ok(())
    }

    fn add_redirect(&self, source: &NormalizedUrl, target: &NormalizedUrl) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO redirects (source, target) VALUES (?1, ?2)",
            params![source.as_str(), target.as_str()],
        )?;
        Ok(())
    }

    fn check(&self, url: &NormalizedUrl) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let seen = conn.execute(
            "UPDATE urls SET repeats = repeats + 1 WHERE url = ?1",
            params![url.as_str()],
        )?;
        if seen > 0 {
            return Err(CrawlError::DuplicateUrl {
                url: url.to_string(),
            });
        }
        Ok(())
    }

    fn next(&self) -> Result<Option<NormalizedUrl>> {
        let conn = self.conn.lock().unwrap();
        let row: Option<(i64, String)> = conn
            .query_row(
                "SELECT id, url FROM urls WHERE issued = 0
                 ORDER BY is_robots DESC, id ASC LIMIT 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let (id, url) = match row {
            Some(row) => row,
            None => return Ok(None),
        };
        conn.execute("UPDATE urls SET issued = 1 WHERE id = ?1", params![id])?;
        let url = NormalizedUrl::parse(&url)?;
        Ok(Some(url))
    }

    fn counters(&self) -> FrontierCounters {
        let conn = self.conn.lock().unwrap();
        let query = |sql: &str| -> u64 {
            conn.query_row(sql, [], |row| row.get::<_, i64>(0))
                .unwrap_or(0) as u64
        };
        FrontierCounters {
            links: query("SELECT COALESCE(SUM(count), 0) FROM links"),
            redirects: query("SELECT COUNT(*) FROM redirects"),
            repeats: query("SELECT COALESCE(SUM(repeats), 0) FROM urls"),
        }
    }
}

impl ResultSink for SqliteStore {
    fn dump(&self, resource: &Resource) -> Result<()> {
        // The hash covers the bytes as fetched; the stored text is the
        // decoded view of the same body.
        let content_hash = resource
            .content
            .as_ref()
            .map(|c| hex::encode(Sha256::digest(c)));
        let content_text = resource.text().map(|t| t.into_owned());
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO pages
             (url, status, content_type, content_hash, bytes, content, fetched_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                resource.url.as_str(),
                resource.status,
                resource.content_type(),
                content_hash,
                resource.content_len(),
                content_text,
                Utc::now().to_rfc3339()
            ],
        )?;
        tracing::info!(url = %resource.url, bytes = resource.content_len(), "crawled");
        Ok(())
    }
}

impl ErrorSink for SqliteStore {
    fn record(&self, url: &NormalizedUrl, kind: ErrorKind, message: &str) {
        tracing::warn!(url = %url, ?kind, "{message}");
        let conn = self.conn.lock().unwrap();
        let result = conn.execute(
            "INSERT INTO failures (url, kind, message, recorded_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                url.as_str(),
                format!("{kind:?}"),
                message,
                Utc::now().to_rfc3339()
            ],
        );
        if let Err(err) = result {
            tracing::error!(%err, "failed to persist failure record");
        }
    }
}
