use anyhow::Result;
use rusqlite::{Connection, Row};

use crate::content::ContentKind;
use crate::models::{CommentParent, CommentRow, HelpfulOutcome};
use crate::{Database, OptionalExt};

const COMMENT_SELECT: &str = "
    SELECT c.id, c.author_id, u.name, c.content, c.is_helpful,
           c.post_id, c.question_id, c.parent_id, c.created_at,
           (SELECT COUNT(*) FROM upvotes v WHERE v.target_type = 'comment' AND v.target_id = c.id),
           (SELECT COUNT(*) FROM downvotes v WHERE v.target_type = 'comment' AND v.target_id = c.id),
           (SELECT COUNT(*) FROM favorites v WHERE v.target_type = 'comment' AND v.target_id = c.id)
    FROM comments c
    LEFT JOIN users u ON u.id = c.author_id";

impl Database {
    pub fn insert_comment(
        &self,
        id: &str,
        author_id: &str,
        content: &str,
        parent: &CommentParent,
    ) -> Result<()> {
        let (post_id, question_id, parent_id) = match parent {
            CommentParent::Post(pid) => (Some(pid.as_str()), None, None),
            CommentParent::Question(qid) => (None, Some(qid.as_str()), None),
            CommentParent::Reply(cid) => (None, None, Some(cid.as_str())),
        };

        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO comments (id, author_id, content, post_id, question_id, parent_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![id, author_id, content, post_id, question_id, parent_id],
            )?;
            Ok(())
        })
    }

    pub fn get_comment(&self, id: &str) -> Result<Option<CommentRow>> {
        self.with_conn(|conn| {
            conn.query_row(&format!("{COMMENT_SELECT} WHERE c.id = ?1"), [id], map_comment)
                .optional()
        })
    }

    /// Top-level comments of a post or question plus their replies, oldest
    /// first.
    pub fn list_comments(&self, kind: ContentKind, item_id: &str) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| query_thread(conn, kind, item_id))
    }

    /// Marks `comment_id` as the helpful answer of `question_id`, clearing any
    /// previous one in the same transaction.
    pub fn set_helpful_comment(&self, question_id: &str, comment_id: &str) -> Result<HelpfulOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;

            let belongs: Option<i64> = tx
                .query_row(
                    "SELECT 1 FROM comments WHERE id = ?1 AND question_id = ?2",
                    [comment_id, question_id],
                    |r| r.get(0),
                )
                .optional()?;
            if belongs.is_none() {
                return Ok(HelpfulOutcome::NotAnAnswer);
            }

            tx.execute(
                "UPDATE comments SET is_helpful = 0 WHERE question_id = ?1 AND is_helpful = 1",
                [question_id],
            )?;
            tx.execute("UPDATE comments SET is_helpful = 1 WHERE id = ?1", [comment_id])?;
            tx.commit()?;
            Ok(HelpfulOutcome::Marked)
        })
    }
}

fn query_thread(conn: &Connection, kind: ContentKind, item_id: &str) -> Result<Vec<CommentRow>> {
    let fk = kind.fk();
    let mut stmt = conn.prepare(&format!(
        "{COMMENT_SELECT}
         WHERE c.{fk} = ?1
            OR c.parent_id IN (SELECT id FROM comments WHERE {fk} = ?1)
         ORDER BY c.created_at ASC, c.id ASC"
    ))?;

    let rows = stmt
        .query_map([item_id], map_comment)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn map_comment(row: &Row<'_>) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        id: row.get(0)?,
        author_id: row.get(1)?,
        author_name: row
            .get::<_, Option<String>>(2)?
            .unwrap_or_else(|| "unknown".to_string()),
        content: row.get(3)?,
        is_helpful: row.get(4)?,
        post_id: row.get(5)?,
        question_id: row.get(6)?,
        parent_id: row.get(7)?,
        created_at: row.get(8)?,
        upvotes: row.get(9)?,
        downvotes: row.get(10)?,
        favorites: row.get(11)?,
    })
}

#[cfg(test)]
mod tests {
    use edushare_types::models::{TargetRef, VoteKind};
    use uuid::Uuid;

    use super::*;
    use crate::test_support;

    #[test]
    fn thread_contains_replies_of_own_comments_only() {
        let db = test_support::db();
        let uid = test_support::user(&db, "ana", 0);
        let post = test_support::post(&db, &uid, "p");
        let other = test_support::post(&db, &uid, "other");

        db.insert_comment("c1", &uid, "top", &CommentParent::Post(post.clone())).unwrap();
        db.insert_comment("r1", &uid, "reply", &CommentParent::Reply("c1".into())).unwrap();
        db.insert_comment("c2", &uid, "elsewhere", &CommentParent::Post(other.clone())).unwrap();
        db.insert_comment("r2", &uid, "elsewhere reply", &CommentParent::Reply("c2".into())).unwrap();

        let thread = db.list_comments(ContentKind::Post, &post).unwrap();
        let ids: Vec<&str> = thread.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"c1") && ids.contains(&"r1"));

        let reply = db.get_comment("r1").unwrap().unwrap();
        assert_eq!(reply.parent_id.as_deref(), Some("c1"));
        assert_eq!(reply.post_id, None);
    }

    #[test]
    fn comment_counts_votes() {
        let db = test_support::db();
        let uid = test_support::user(&db, "ana", 0);
        let fan = test_support::user(&db, "fan", 0);
        let post = test_support::post(&db, &uid, "p");
        let cid = Uuid::new_v4();
        db.insert_comment(&cid.to_string(), &uid, "hi", &CommentParent::Post(post)).unwrap();

        db.add_vote(&fan, &TargetRef::Comment(cid), VoteKind::Downvote).unwrap();
        let row = db.get_comment(&cid.to_string()).unwrap().unwrap();
        assert_eq!((row.upvotes, row.downvotes, row.favorites), (0, 1, 0));
        assert_eq!(row.author_name, "ana");
    }

    #[test]
    fn helpful_flag_moves_and_stays_unique() {
        let db = test_support::db();
        let uid = test_support::user(&db, "ana", 0);
        let q = test_support::question(&db, &uid, "q");
        let other_q = test_support::question(&db, &uid, "other");

        db.insert_comment("a1", &uid, "first", &CommentParent::Question(q.clone())).unwrap();
        db.insert_comment("a2", &uid, "second", &CommentParent::Question(q.clone())).unwrap();
        db.insert_comment("r1", &uid, "reply", &CommentParent::Reply("a1".into())).unwrap();
        db.insert_comment("x1", &uid, "foreign", &CommentParent::Question(other_q)).unwrap();

        assert_eq!(db.set_helpful_comment(&q, "a1").unwrap(), HelpfulOutcome::Marked);
        assert_eq!(db.set_helpful_comment(&q, "a2").unwrap(), HelpfulOutcome::Marked);
        assert_eq!(db.set_helpful_comment(&q, "r1").unwrap(), HelpfulOutcome::NotAnAnswer);
        assert_eq!(db.set_helpful_comment(&q, "x1").unwrap(), HelpfulOutcome::NotAnAnswer);

        let helpful: Vec<String> = db
            .list_comments(ContentKind::Question, &q)
            .unwrap()
            .into_iter()
            .filter(|c| c.is_helpful)
            .map(|c| c.id)
            .collect();
        assert_eq!(helpful, ["a2"]);
    }
}
