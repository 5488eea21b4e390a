use std::collections::HashMap;

use anyhow::Result;
use edushare_types::models::{TargetKind, TargetRef};
use rusqlite::Connection;
use rusqlite::types::Value;
use tracing::warn;

use crate::models::{ContentRow, SpendOutcome, TagRow};
use crate::users::cas_spend;
use crate::{Database, OptionalExt};

/// Posts and questions share one shape; this picks the tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Post,
    Question,
}

impl ContentKind {
    fn table(self) -> &'static str {
        match self {
            Self::Post => "posts",
            Self::Question => "questions",
        }
    }

    fn tag_table(self) -> &'static str {
        match self {
            Self::Post => "post_tags",
            Self::Question => "question_tags",
        }
    }

    /// Column naming this kind in join tables and on `comments`.
    pub(crate) fn fk(self) -> &'static str {
        match self {
            Self::Post => "post_id",
            Self::Question => "question_id",
        }
    }

    pub fn target_kind(self) -> TargetKind {
        match self {
            Self::Post => TargetKind::Post,
            Self::Question => TargetKind::Question,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContentFilter {
    pub tag: Option<String>,
    pub author_id: Option<String>,
    pub limit: u32,
    pub offset: u32,
}

impl Default for ContentFilter {
    fn default() -> Self {
        Self {
            tag: None,
            author_id: None,
            limit: 20,
            offset: 0,
        }
    }
}

/// Trims, lowercases and dedupes tag names, keeping first-seen order.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let name = tag.trim().to_lowercase();
        if !name.is_empty() && !out.contains(&name) {
            out.push(name);
        }
    }
    out
}

impl Database {
    pub fn create_content(
        &self,
        kind: ContentKind,
        id: &str,
        author_id: &str,
        title: &str,
        content: &str,
        images: &[String],
        tags: &[String],
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            insert_content(&tx, kind, id, author_id, title, content, images)?;
            attach_tags(&tx, kind, id, tags)?;
            tx.commit()?;
            Ok(())
        })
    }

    /// Debits `cost` from a balance read as `expected_points` and inserts the
    /// question in the same transaction. Nothing is written unless the debit
    /// lands.
    #[allow(clippy::too_many_arguments)]
    pub fn create_question_paid(
        &self,
        id: &str,
        author_id: &str,
        expected_points: i64,
        cost: i64,
        title: &str,
        content: &str,
        images: &[String],
        tags: &[String],
    ) -> Result<SpendOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            let outcome = cas_spend(&tx, author_id, expected_points, cost)?;
            if let SpendOutcome::Spent { .. } = outcome {
                insert_content(&tx, ContentKind::Question, id, author_id, title, content, images)?;
                attach_tags(&tx, ContentKind::Question, id, tags)?;
                tx.commit()?;
            }
            Ok(outcome)
        })
    }

    pub fn get_content(&self, kind: ContentKind, id: &str) -> Result<Option<ContentRow>> {
        self.with_conn(|conn| {
            let mut rows = query_content(
                conn,
                kind,
                "c.id = ?",
                "c.created_at DESC",
                "",
                vec![Value::Text(id.to_string())],
            )?;
            attach_tag_names(conn, kind, &mut rows)?;
            Ok(rows.pop())
        })
    }

    /// Newest first, optionally narrowed to one tag or author.
    pub fn list_content(&self, kind: ContentKind, filter: &ContentFilter) -> Result<Vec<ContentRow>> {
        self.with_conn(|conn| {
            let mut clauses = vec!["1 = 1".to_string()];
            let mut params = Vec::new();

            if let Some(tag) = &filter.tag {
                clauses.push(format!(
                    "c.id IN (SELECT jt.{fk} FROM {jt} jt JOIN tags t ON t.id = jt.tag_id WHERE t.name = ?)",
                    fk = kind.fk(),
                    jt = kind.tag_table(),
                ));
                params.push(Value::Text(tag.trim().to_lowercase()));
            }
            if let Some(author_id) = &filter.author_id {
                clauses.push("c.author_id = ?".to_string());
                params.push(Value::Text(author_id.clone()));
            }

            params.push(Value::Integer(filter.limit as i64));
            params.push(Value::Integer(filter.offset as i64));

            let mut rows = query_content(
                conn,
                kind,
                &clauses.join(" AND "),
                "c.created_at DESC, c.id ASC",
                " LIMIT ? OFFSET ?",
                params,
            )?;
            attach_tag_names(conn, kind, &mut rows)?;
            Ok(rows)
        })
    }

    /// Items created at or after `since`, ranked by
    /// `upvotes + favorites + comments * 5`. Ties go to the newer item, then
    /// the lower id.
    pub fn top_content(&self, kind: ContentKind, since: &str, limit: u32) -> Result<Vec<ContentRow>> {
        self.with_conn(|conn| {
            let mut rows = query_content(
                conn,
                kind,
                "c.created_at >= ?",
                "(COALESCE(up.n, 0) + COALESCE(fav.n, 0) + COALESCE(cm.n, 0) * 5) DESC, c.created_at DESC, c.id ASC",
                " LIMIT ?",
                vec![Value::Text(since.to_string()), Value::Integer(limit as i64)],
            )?;
            attach_tag_names(conn, kind, &mut rows)?;
            Ok(rows)
        })
    }

    pub fn set_question_solved(&self, question_id: &str, solved: bool) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let affected = conn.execute(
                "UPDATE questions SET is_solved = ?1 WHERE id = ?2",
                rusqlite::params![solved, question_id],
            )?;
            Ok(affected == 1)
        })
    }

    /// Author of the target, or `None` if the target does not exist.
    pub fn target_owner(&self, target: &TargetRef) -> Result<Option<String>> {
        let table = match target.kind() {
            TargetKind::Post => "posts",
            TargetKind::Question => "questions",
            TargetKind::Comment => "comments",
        };
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT author_id FROM {table} WHERE id = ?1"),
                [target.id().to_string()],
                |row| row.get(0),
            )
            .optional()
        })
    }

    pub fn list_tags(&self) -> Result<Vec<TagRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT name, post_count, question_count FROM (
                    SELECT t.name AS name,
                        (SELECT COUNT(*) FROM post_tags pt WHERE pt.tag_id = t.id) AS post_count,
                        (SELECT COUNT(*) FROM question_tags qt WHERE qt.tag_id = t.id) AS question_count
                    FROM tags t
                 )
                 ORDER BY post_count + question_count DESC, name ASC",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(TagRow {
                        name: row.get(0)?,
                        post_count: row.get(1)?,
                        question_count: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn insert_content(
    conn: &Connection,
    kind: ContentKind,
    id: &str,
    author_id: &str,
    title: &str,
    content: &str,
    images: &[String],
) -> Result<()> {
    let images = serde_json::to_string(images)?;
    conn.execute(
        &format!(
            "INSERT INTO {} (id, author_id, title, content, images) VALUES (?1, ?2, ?3, ?4, ?5)",
            kind.table()
        ),
        rusqlite::params![id, author_id, title, content, images],
    )?;
    Ok(())
}

/// Find-or-create each tag by name and link it to the item.
fn attach_tags(conn: &Connection, kind: ContentKind, id: &str, tags: &[String]) -> Result<()> {
    for name in normalize_tags(tags) {
        conn.execute(
            "INSERT INTO tags (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
            [&name],
        )?;
        let tag_id: i64 = conn.query_row("SELECT id FROM tags WHERE name = ?1", [&name], |r| r.get(0))?;
        conn.execute(
            &format!(
                "INSERT OR IGNORE INTO {} ({}, tag_id) VALUES (?1, ?2)",
                kind.tag_table(),
                kind.fk()
            ),
            rusqlite::params![id, tag_id],
        )?;
    }
    Ok(())
}

/// One query for the items and their counts. `params` bind the filter first,
/// then the limit clause.
fn query_content(
    conn: &Connection,
    kind: ContentKind,
    filter_sql: &str,
    order_sql: &str,
    limit_sql: &str,
    params: Vec<Value>,
) -> Result<Vec<ContentRow>> {
    let target_type = kind.target_kind().as_str();
    let solved_col = match kind {
        ContentKind::Post => "NULL",
        ContentKind::Question => "c.is_solved",
    };

    let sql = format!(
        "SELECT c.id, c.author_id, u.name, c.title, c.content, c.images, {solved_col}, c.created_at,
                COALESCE(up.n, 0), COALESCE(down.n, 0), COALESCE(fav.n, 0), COALESCE(cm.n, 0)
         FROM {table} c
         LEFT JOIN users u ON u.id = c.author_id
         LEFT JOIN (SELECT target_id, COUNT(*) AS n FROM upvotes
                    WHERE target_type = '{target_type}' GROUP BY target_id) up ON up.target_id = c.id
         LEFT JOIN (SELECT target_id, COUNT(*) AS n FROM downvotes
                    WHERE target_type = '{target_type}' GROUP BY target_id) down ON down.target_id = c.id
         LEFT JOIN (SELECT target_id, COUNT(*) AS n FROM favorites
                    WHERE target_type = '{target_type}' GROUP BY target_id) fav ON fav.target_id = c.id
         LEFT JOIN (SELECT {fk} AS item_id, COUNT(*) AS n FROM comments
                    WHERE {fk} IS NOT NULL GROUP BY {fk}) cm ON cm.item_id = c.id
         WHERE {filter_sql}
         ORDER BY {order_sql}{limit_sql}",
        table = kind.table(),
        fk = kind.fk(),
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(params), |row| {
            let id: String = row.get(0)?;
            let images: String = row.get(5)?;
            Ok(ContentRow {
                images: decode_images(&id, &images),
                id,
                author_id: row.get(1)?,
                author_name: row
                    .get::<_, Option<String>>(2)?
                    .unwrap_or_else(|| "unknown".to_string()),
                title: row.get(3)?,
                content: row.get(4)?,
                is_solved: row.get(6)?,
                created_at: row.get(7)?,
                upvotes: row.get(8)?,
                downvotes: row.get(9)?,
                favorites: row.get(10)?,
                comments_count: row.get(11)?,
                tags: Vec::new(),
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// The images column holds a JSON array of URLs.
fn decode_images(id: &str, raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        warn!("Corrupt images on content '{}': {}", id, e);
        Vec::new()
    })
}

/// Second query: tag names for the fetched ids, merged by id.
fn attach_tag_names(conn: &Connection, kind: ContentKind, rows: &mut [ContentRow]) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }

    let placeholders: Vec<String> = (1..=rows.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "SELECT jt.{fk}, t.name FROM {jt} jt JOIN tags t ON t.id = jt.tag_id
         WHERE jt.{fk} IN ({}) ORDER BY t.name",
        placeholders.join(", "),
        fk = kind.fk(),
        jt = kind.tag_table(),
    );

    let mut stmt = conn.prepare(&sql)?;
    let ids = rows.iter().map(|r| r.id.as_str());
    let pairs = stmt
        .query_map(rusqlite::params_from_iter(ids), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut by_id: HashMap<String, Vec<String>> = HashMap::new();
    for (id, name) in pairs {
        by_id.entry(id).or_default().push(name);
    }

    for row in rows.iter_mut() {
        row.tags = by_id.remove(&row.id).unwrap_or_default();
    }
    if !by_id.is_empty() {
        warn!("{} tag rows matched no fetched item", by_id.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use edushare_types::models::{TargetRef, VoteKind};
    use uuid::Uuid;

    use super::*;
    use crate::models::CommentParent;
    use crate::test_support;

    fn strings(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn normalizes_and_dedupes_tags() {
        assert_eq!(
            normalize_tags(&strings(&[" Rust", "rust", "", "SQL "])),
            strings(&["rust", "sql"])
        );
    }

    #[test]
    fn tags_are_created_once_and_merged_by_id() {
        let db = test_support::db();
        let uid = test_support::user(&db, "ana", 0);

        let a = Uuid::new_v4().to_string();
        let b = Uuid::new_v4().to_string();
        db.create_content(ContentKind::Post, &a, &uid, "a", "x", &[], &strings(&["Rust", "db"]))
            .unwrap();
        db.create_content(ContentKind::Post, &b, &uid, "b", "x", &[], &strings(&["rust"]))
            .unwrap();
        test_support::set_created_at(&db, "posts", &a, "2026-01-01 00:00:00.000");
        test_support::set_created_at(&db, "posts", &b, "2026-01-02 00:00:00.000");

        let listed = db.list_content(ContentKind::Post, &ContentFilter::default()).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, b);
        assert_eq!(listed[0].tags, strings(&["rust"]));
        assert_eq!(listed[1].tags, strings(&["db", "rust"]));

        let all = db.list_tags().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "rust");
        assert_eq!(all[0].post_count, 2);
    }

    #[test]
    fn list_filters_by_tag_and_paginates() {
        let db = test_support::db();
        let uid = test_support::user(&db, "ana", 0);
        for i in 0..3 {
            let id = Uuid::new_v4().to_string();
            db.create_content(ContentKind::Question, &id, &uid, &format!("q{i}"), "x", &[], &strings(&["math"]))
                .unwrap();
        }
        test_support::question(&db, &uid, "untagged");

        let filter = ContentFilter {
            tag: Some("MATH".into()),
            limit: 2,
            ..ContentFilter::default()
        };
        assert_eq!(db.list_content(ContentKind::Question, &filter).unwrap().len(), 2);

        let rest = ContentFilter { offset: 2, ..filter };
        let page = db.list_content(ContentKind::Question, &rest).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].is_solved, Some(false));
    }

    #[test]
    fn corrupt_images_column_reads_as_empty() {
        let db = test_support::db();
        let owner = test_support::user(&db, "owner", 0);
        let id = test_support::post(&db, &owner, "t");
        db.with_conn_mut(|conn| {
            conn.execute("UPDATE posts SET images = 'not json' WHERE id = ?1", [&id])?;
            Ok(())
        })
        .unwrap();

        let row = db.get_content(ContentKind::Post, &id).unwrap().unwrap();
        assert!(row.images.is_empty());
        assert_eq!(row.title, "t");
    }

    #[test]
    fn detail_carries_counts_and_images() {
        let db = test_support::db();
        let owner = test_support::user(&db, "owner", 0);
        let fan = test_support::user(&db, "fan", 0);
        let id = Uuid::new_v4().to_string();
        db.create_content(
            ContentKind::Post,
            &id,
            &owner,
            "t",
            "c",
            &strings(&["https://img/1.png"]),
            &[],
        )
        .unwrap();

        let target = TargetRef::Post(id.parse().unwrap());
        db.add_vote(&fan, &target, VoteKind::Upvote).unwrap();
        db.add_vote(&fan, &target, VoteKind::Favorite).unwrap();
        db.insert_comment("c1", &fan, "nice", &CommentParent::Post(id.clone()))
            .unwrap();

        let row = db.get_content(ContentKind::Post, &id).unwrap().unwrap();
        assert_eq!(row.author_name, "owner");
        assert_eq!(row.images, strings(&["https://img/1.png"]));
        assert_eq!((row.upvotes, row.downvotes, row.favorites, row.comments_count), (1, 0, 1, 1));
        assert_eq!(row.is_solved, None);
        assert!(db.get_content(ContentKind::Post, "missing").unwrap().is_none());
    }

    #[test]
    fn top_ranks_by_weighted_score_within_window() {
        let db = test_support::db();
        let owner = test_support::user(&db, "owner", 0);
        let voters: Vec<String> = (0..4)
            .map(|i| test_support::user(&db, &format!("v{i}"), 0))
            .collect();

        let quiet = test_support::post(&db, &owner, "quiet");
        let voted = test_support::post(&db, &owner, "voted");
        let discussed = test_support::post(&db, &owner, "discussed");
        let favored = test_support::post(&db, &owner, "favored");
        let stale = test_support::post(&db, &owner, "stale");
        for (id, ts) in [
            (&quiet, "2026-10-19 10:00:00.000"),
            (&voted, "2026-10-19 10:00:01.000"),
            (&discussed, "2026-10-19 10:00:02.000"),
            (&favored, "2026-10-19 10:00:03.000"),
            (&stale, "2026-10-17 10:00:00.000"),
        ] {
            test_support::set_created_at(&db, "posts", id, ts);
        }

        let post = |id: &String| TargetRef::Post(id.parse().unwrap());
        // voted: 4 upvotes, 3 downvotes -> 4
        for v in &voters {
            db.add_vote(v, &post(&voted), VoteKind::Upvote).unwrap();
        }
        for v in &voters[..3] {
            db.add_vote(v, &post(&stale), VoteKind::Upvote).unwrap();
            db.add_vote(v, &post(&quiet), VoteKind::Downvote).unwrap();
        }
        // discussed: 1 comment -> 5
        db.insert_comment("c1", &voters[0], "hm", &CommentParent::Post(discussed.clone()))
            .unwrap();
        // favored: 2 favorites + 2 upvotes -> 4, ties with voted but newer
        for v in &voters[..2] {
            db.add_vote(v, &post(&favored), VoteKind::Favorite).unwrap();
            db.add_vote(v, &post(&favored), VoteKind::Upvote).unwrap();
        }

        let top = db
            .top_content(ContentKind::Post, "2026-10-18 12:00:00.000", 3)
            .unwrap();
        let titles: Vec<&str> = top.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, ["discussed", "favored", "voted"]);
        assert_eq!(top.iter().map(|r| r.score()).collect::<Vec<_>>(), [5, 4, 4]);
    }

    #[test]
    fn paid_question_spends_and_inserts_together() {
        let db = test_support::db();
        let uid = test_support::user(&db, "ana", 20);

        let first = db
            .create_question_paid("q1", &uid, 20, 20, "t", "c", &[], &strings(&["x"]))
            .unwrap();
        assert_eq!(first, SpendOutcome::Spent { balance: 0 });

        let stale = db
            .create_question_paid("q2", &uid, 20, 20, "t", "c", &[], &[])
            .unwrap();
        assert_eq!(stale, SpendOutcome::RaceLost);
        assert!(db.get_content(ContentKind::Question, "q2").unwrap().is_none());

        let broke = db
            .create_question_paid("q3", &uid, 0, 20, "t", "c", &[], &[])
            .unwrap();
        assert_eq!(broke, SpendOutcome::Insufficient { balance: 0 });
        assert_eq!(db.user_counts(&uid).unwrap().questions, 1);
    }

    #[test]
    fn owner_lookup_covers_every_target_kind() {
        let db = test_support::db();
        let uid = test_support::user(&db, "ana", 0);
        let qid = test_support::question(&db, &uid, "q");
        let cid = Uuid::new_v4();
        db.insert_comment(&cid.to_string(), &uid, "a", &CommentParent::Question(qid.clone()))
            .unwrap();

        let q = TargetRef::Question(qid.parse().unwrap());
        assert_eq!(db.target_owner(&q).unwrap(), Some(uid.clone()));
        assert_eq!(db.target_owner(&TargetRef::Comment(cid)).unwrap(), Some(uid));
        assert_eq!(db.target_owner(&TargetRef::Post(Uuid::new_v4())).unwrap(), None);

        assert!(db.set_question_solved(&qid, true).unwrap());
        let row = db.get_content(ContentKind::Question, &qid).unwrap().unwrap();
        assert_eq!(row.is_solved, Some(true));
    }
}
