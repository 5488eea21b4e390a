use anyhow::Result;
use edushare_types::models::{NotificationType, TargetRef};
use rusqlite::Row;
use tracing::debug;
use uuid::Uuid;

use crate::models::{NotificationActorRow, NotificationRow, NotifyOutcome};
use crate::{Database, OptionalExt};

const NOW: &str = "strftime('%Y-%m-%d %H:%M:%f', 'now')";

const NOTIFICATION_COLUMNS: &str = "id, recipient_id, target_type, target_id, notification_type, \
     last_notify_user_id, is_read, created_at, updated_at";

impl Database {
    /// Records that `actor` did something of `kind` on `target`, owned by
    /// `recipient`. One row exists per (target, kind): a repeat event points it
    /// at the newest actor and marks it unread again. Self-triggered events are
    /// dropped.
    pub fn notify(
        &self,
        recipient: &str,
        actor: &str,
        target: &TargetRef,
        kind: NotificationType,
    ) -> Result<NotifyOutcome> {
        if recipient == actor {
            return Ok(NotifyOutcome::Suppressed);
        }

        let target_type = target.kind().as_str();
        let target_id = target.id().to_string();

        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;

            let existing: Option<String> = tx
                .query_row(
                    "SELECT id FROM notifications
                     WHERE target_type = ?1 AND target_id = ?2 AND notification_type = ?3",
                    [target_type, target_id.as_str(), kind.as_str()],
                    |r| r.get(0),
                )
                .optional()?;

            let (id, outcome) = match existing {
                Some(id) => {
                    tx.execute(
                        &format!(
                            "UPDATE notifications
                             SET last_notify_user_id = ?1, recipient_id = ?2, is_read = 0, updated_at = {NOW}
                             WHERE id = ?3"
                        ),
                        [actor, recipient, id.as_str()],
                    )?;
                    (id, NotifyOutcome::Refreshed)
                }
                None => {
                    let id = Uuid::new_v4().to_string();
                    tx.execute(
                        "INSERT INTO notifications
                            (id, recipient_id, target_type, target_id, notification_type, last_notify_user_id)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                        [id.as_str(), recipient, target_type, target_id.as_str(), kind.as_str(), actor],
                    )?;
                    (id, NotifyOutcome::Created)
                }
            };

            tx.execute(
                &format!(
                    "INSERT INTO notification_actors (notification_id, actor_id) VALUES (?1, ?2)
                     ON CONFLICT(notification_id, actor_id) DO UPDATE SET notified_at = {NOW}"
                ),
                [id.as_str(), actor],
            )?;

            tx.commit()?;
            debug!("notification {} for {} on {}: {:?}", id, recipient, target, outcome);
            Ok(outcome)
        })
    }

    /// Flips the recipient's unread notifications on `target` to read.
    pub fn mark_target_read(&self, recipient: &str, target: &TargetRef) -> Result<usize> {
        let target_id = target.id().to_string();
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "UPDATE notifications SET is_read = 1
                 WHERE recipient_id = ?1 AND target_type = ?2 AND target_id = ?3 AND is_read = 0",
                [recipient, target.kind().as_str(), target_id.as_str()],
            )?;
            Ok(n)
        })
    }

    pub fn list_notifications(&self, recipient: &str, unread_only: bool) -> Result<Vec<NotificationRow>> {
        self.with_conn(|conn| {
            let filter = if unread_only { " AND is_read = 0" } else { "" };
            let mut stmt = conn.prepare(&format!(
                "SELECT {NOTIFICATION_COLUMNS} FROM notifications
                 WHERE recipient_id = ?1{filter}
                 ORDER BY updated_at DESC, id ASC"
            ))?;
            let rows = stmt
                .query_map([recipient], map_notification)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_notification(&self, id: &str) -> Result<Option<NotificationRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?1"),
                [id],
                map_notification,
            )
            .optional()
        })
    }

    /// Batch-fetch actor history for a set of notifications, latest first.
    pub fn get_actors_for_notifications(&self, ids: &[String]) -> Result<Vec<NotificationActorRow>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT notification_id, actor_id, notified_at FROM notification_actors
                 WHERE notification_id IN ({})
                 ORDER BY notified_at DESC",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(ids), |row| {
                    Ok(NotificationActorRow {
                        notification_id: row.get(0)?,
                        actor_id: row.get(1)?,
                        notified_at: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Returns false if the notification does not exist or belongs to someone else.
    pub fn mark_notification_read(&self, recipient: &str, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "UPDATE notifications SET is_read = 1 WHERE id = ?1 AND recipient_id = ?2",
                [id, recipient],
            )?;
            Ok(n == 1)
        })
    }

    pub fn mark_all_notifications_read(&self, recipient: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "UPDATE notifications SET is_read = 1 WHERE recipient_id = ?1 AND is_read = 0",
                [recipient],
            )?;
            Ok(n)
        })
    }

    pub fn unread_notification_count(&self, recipient: &str) -> Result<i64> {
        self.with_conn(|conn| {
            let n = conn.query_row(
                "SELECT COUNT(*) FROM notifications WHERE recipient_id = ?1 AND is_read = 0",
                [recipient],
                |r| r.get(0),
            )?;
            Ok(n)
        })
    }
}

fn map_notification(row: &Row<'_>) -> rusqlite::Result<NotificationRow> {
    Ok(NotificationRow {
        id: row.get(0)?,
        recipient_id: row.get(1)?,
        target_type: row.get(2)?,
        target_id: row.get(3)?,
        notification_type: row.get(4)?,
        last_notify_user_id: row.get(5)?,
        is_read: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    fn setup() -> (Database, String, TargetRef) {
        let db = test_support::db();
        let owner = test_support::user(&db, "owner", 0);
        let post = test_support::post(&db, &owner, "p");
        (db, owner, TargetRef::Post(post.parse().unwrap()))
    }

    #[test]
    fn distinct_actors_collapse_into_one_row() {
        let (db, owner, target) = setup();
        let actors: Vec<String> = (0..4)
            .map(|i| test_support::user(&db, &format!("a{i}"), 0))
            .collect();

        let outcomes: Vec<NotifyOutcome> = actors
            .iter()
            .map(|a| db.notify(&owner, a, &target, NotificationType::Comment).unwrap())
            .collect();
        assert_eq!(outcomes[0], NotifyOutcome::Created);
        assert!(outcomes[1..].iter().all(|o| *o == NotifyOutcome::Refreshed));

        let rows = db.list_notifications(&owner, false).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].last_notify_user_id, actors[3]);
        assert!(!rows[0].is_read);

        let mut recorded: Vec<String> = db
            .get_actors_for_notifications(&[rows[0].id.clone()])
            .unwrap()
            .into_iter()
            .map(|a| a.actor_id)
            .collect();
        recorded.sort();
        let mut expected = actors.clone();
        expected.sort();
        assert_eq!(recorded, expected);
    }

    #[test]
    fn owner_events_are_suppressed() {
        let (db, owner, target) = setup();
        let outcome = db
            .notify(&owner, &owner, &target, NotificationType::Interaction)
            .unwrap();
        assert_eq!(outcome, NotifyOutcome::Suppressed);
        assert!(db.list_notifications(&owner, false).unwrap().is_empty());
    }

    #[test]
    fn comment_and_interaction_keys_are_separate() {
        let (db, owner, target) = setup();
        let actor = test_support::user(&db, "actor", 0);
        db.notify(&owner, &actor, &target, NotificationType::Comment).unwrap();
        db.notify(&owner, &actor, &target, NotificationType::Interaction).unwrap();
        assert_eq!(db.unread_notification_count(&owner).unwrap(), 2);
    }

    #[test]
    fn read_notification_flips_back_to_unread() {
        let (db, owner, target) = setup();
        let first = test_support::user(&db, "first", 0);
        let second = test_support::user(&db, "second", 0);

        db.notify(&owner, &first, &target, NotificationType::Comment).unwrap();
        assert_eq!(db.mark_target_read(&owner, &target).unwrap(), 1);
        assert_eq!(db.unread_notification_count(&owner).unwrap(), 0);
        assert_eq!(db.mark_target_read(&owner, &target).unwrap(), 0);

        let again = db.notify(&owner, &second, &target, NotificationType::Comment).unwrap();
        assert_eq!(again, NotifyOutcome::Refreshed);

        let unread = db.list_notifications(&owner, true).unwrap();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].last_notify_user_id, second);
    }

    #[test]
    fn mark_read_is_scoped_to_recipient() {
        let (db, owner, target) = setup();
        let actor = test_support::user(&db, "actor", 0);
        db.notify(&owner, &actor, &target, NotificationType::Comment).unwrap();
        let id = db.list_notifications(&owner, false).unwrap()[0].id.clone();

        assert!(!db.mark_notification_read(&actor, &id).unwrap());
        assert!(db.mark_notification_read(&owner, &id).unwrap());
        assert!(db.get_notification(&id).unwrap().unwrap().is_read);
    }

    #[test]
    fn mark_all_read_counts_only_unread() {
        let (db, owner, target) = setup();
        let actor = test_support::user(&db, "actor", 0);
        db.notify(&owner, &actor, &target, NotificationType::Comment).unwrap();
        db.notify(&owner, &actor, &target, NotificationType::Interaction).unwrap();

        assert_eq!(db.mark_all_notifications_read(&owner).unwrap(), 2);
        assert_eq!(db.mark_all_notifications_read(&owner).unwrap(), 0);
    }
}
