use anyhow::Result;
use edushare_types::models::{TargetRef, VoteKind};
use rusqlite::Connection;
use uuid::Uuid;

use crate::models::{VoteChange, VoteTally};
use crate::Database;

impl Database {
    /// Records `kind` from `actor` on `target`. An existing row makes this a
    /// no-op; an opposing up/down vote is deleted in the same transaction.
    pub fn add_vote(&self, actor: &str, target: &TargetRef, kind: VoteKind) -> Result<VoteChange> {
        let target_type = target.kind().as_str();
        let target_id = target.id().to_string();

        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;

            let removed_opposite = match kind.opposite() {
                Some(opposite) => delete_vote(&tx, opposite, actor, target_type, &target_id)?,
                None => false,
            };

            let inserted = tx.execute(
                &format!(
                    "INSERT OR IGNORE INTO {} (id, user_id, target_type, target_id) VALUES (?1, ?2, ?3, ?4)",
                    kind.table()
                ),
                rusqlite::params![Uuid::new_v4().to_string(), actor, target_type, target_id],
            )? == 1;

            tx.commit()?;
            Ok(VoteChange {
                inserted,
                removed_opposite,
            })
        })
    }

    /// Idempotent; returns whether a row was actually deleted.
    pub fn remove_vote(&self, actor: &str, target: &TargetRef, kind: VoteKind) -> Result<bool> {
        let target_id = target.id().to_string();
        self.with_conn_mut(|conn| delete_vote(conn, kind, actor, target.kind().as_str(), &target_id))
    }

    pub fn count_votes(&self, target: &TargetRef, kind: VoteKind) -> Result<i64> {
        self.with_conn(|conn| {
            let n = conn.query_row(
                &format!(
                    "SELECT COUNT(*) FROM {} WHERE target_type = ?1 AND target_id = ?2",
                    kind.table()
                ),
                rusqlite::params![target.kind().as_str(), target.id().to_string()],
                |r| r.get(0),
            )?;
            Ok(n)
        })
    }

    pub fn vote_tally(&self, target: &TargetRef, viewer: &str) -> Result<VoteTally> {
        let target_type = target.kind().as_str();
        let target_id = target.id().to_string();

        self.with_conn(|conn| {
            let mut tally = VoteTally::default();
            for kind in VoteKind::ALL {
                let (count, mine): (i64, bool) = conn.query_row(
                    &format!(
                        "SELECT COUNT(*), COALESCE(SUM(user_id = ?3), 0) > 0 FROM {}
                         WHERE target_type = ?1 AND target_id = ?2",
                        kind.table()
                    ),
                    rusqlite::params![target_type, target_id, viewer],
                    |r| Ok((r.get(0)?, r.get(1)?)),
                )?;
                match kind {
                    VoteKind::Upvote => (tally.upvotes, tally.upvoted) = (count, mine),
                    VoteKind::Downvote => (tally.downvotes, tally.downvoted) = (count, mine),
                    VoteKind::Favorite => (tally.favorites, tally.favorited) = (count, mine),
                }
            }
            Ok(tally)
        })
    }
}

fn delete_vote(
    conn: &Connection,
    kind: VoteKind,
    actor: &str,
    target_type: &str,
    target_id: &str,
) -> Result<bool> {
    let affected = conn.execute(
        &format!(
            "DELETE FROM {} WHERE user_id = ?1 AND target_type = ?2 AND target_id = ?3",
            kind.table()
        ),
        [actor, target_type, target_id],
    )?;
    Ok(affected > 0)
}
