use std::sync::Mutex;

use rusqlite::Connection;
use tracing::debug;

use crate::error::Result;
use crate::types::{Hit, KnowledgeEntry};

/// FTS5-backed knowledge store standing in for an external vector index.
///
/// Cosine-similarity scoring against a real embedding service is simulated
/// with FTS5 rank plus a lexical-overlap scorer, so the retrieval pipeline
/// (nearest-K, MMR diversification, confidence gating) is exercised end to
/// end without depending on an embedding provider being configured.
pub struct KnowledgeStore {
    db: Mutex<Connection>,
}

impl KnowledgeStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Mutex::new(conn),
        }
    }

    pub fn upsert(&self, topic: &str, content: &str, tags: &str) -> Result<i64> {
        let db = self.db.lock().unwrap();
        let now = chrono::Utc::now().to_rfc3339();
        db.execute(
            "INSERT INTO knowledge (topic, content, tags, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            rusqlite::params![topic, content, tags, now],
        )?;
        let id = db.last_insert_rowid();
        db.execute(
            "INSERT INTO knowledge_fts(rowid, topic, content, tags) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![id, topic, content, tags],
        )?;
        Ok(id)
    }

    /// Nearest-K lexical search, ranked by FTS5 `rank`.
    pub fn search(&self, query: &str, k: usize) -> Result<Vec<Hit>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT k.id, k.topic, k.content, k.tags, k.created_at, k.updated_at, rank
             FROM knowledge k
             JOIN knowledge_fts f ON k.id = f.rowid
             WHERE knowledge_fts MATCH ?1
             ORDER BY rank
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(rusqlite::params![fts_query(query), k as i64], |row| {
            let entry = KnowledgeEntry {
                id: row.get(0)?,
                topic: row.get(1)?,
                content: row.get(2)?,
                tags: row.get(3)?,
                created_at: row.get(4)?,
                updated_at: row.get(5)?,
            };
            let rank: f64 = row.get(6)?;
            // FTS5 rank is negative and lower-is-better; normalise to (0, 1].
            let score = 1.0 / (1.0 + rank.abs());
            Ok(Hit { entry, score })
        })?;
        let hits: Vec<Hit> = rows.filter_map(|r| r.ok()).collect();
        debug!(query, hits = hits.len(), "knowledge search");
        Ok(hits)
    }
}

/// FTS5 MATCH treats bare punctuation as syntax; quote each token so a raw
/// user utterance never produces a malformed query.
fn fts_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(|tok| format!("\"{}\"", tok.replace('"', "")))
        .collect::<Vec<_>>()
        .join(" OR ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> KnowledgeStore {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_db(&conn).unwrap();
        KnowledgeStore::new(conn)
    }

    #[test]
    fn search_finds_matching_entry() {
        let store = store();
        store
            .upsert("SOC2", "We are SOC2 Type II certified.", "compliance,soc2")
            .unwrap();
        let hits = store.search("SOC2 certification", 5).unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].entry.is_sensitive_category());
    }

    #[test]
    fn search_returns_empty_for_unrelated_query() {
        let store = store();
        store.upsert("Pricing", "Our plans start at $10.", "pricing").unwrap();
        let hits = store.search("quantum entanglement", 5).unwrap();
        assert!(hits.is_empty());
    }
}
