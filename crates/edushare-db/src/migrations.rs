use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);"
    )?;

    let version: i64 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (users, content, comments, tags)");
        apply(
            conn,
            1,
            "
            CREATE TABLE users (
                id              TEXT PRIMARY KEY,
                email           TEXT NOT NULL UNIQUE,
                name            TEXT NOT NULL,
                password        TEXT NOT NULL,
                points          INTEGER NOT NULL DEFAULT 0,
                last_sign_date  TEXT,
                created_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
            );

            CREATE TABLE posts (
                id          TEXT PRIMARY KEY,
                author_id   TEXT NOT NULL REFERENCES users(id),
                title       TEXT NOT NULL,
                content     TEXT NOT NULL,
                images      TEXT NOT NULL DEFAULT '[]',
                created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
            );

            CREATE INDEX idx_posts_created ON posts(created_at);

            CREATE TABLE questions (
                id          TEXT PRIMARY KEY,
                author_id   TEXT NOT NULL REFERENCES users(id),
                title       TEXT NOT NULL,
                content     TEXT NOT NULL,
                images      TEXT NOT NULL DEFAULT '[]',
                is_solved   INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
            );

            CREATE INDEX idx_questions_created ON questions(created_at);

            -- Exactly one of post_id / question_id / parent_id is set.
            CREATE TABLE comments (
                id          TEXT PRIMARY KEY,
                author_id   TEXT NOT NULL REFERENCES users(id),
                content     TEXT NOT NULL,
                is_helpful  INTEGER NOT NULL DEFAULT 0,
                post_id     TEXT REFERENCES posts(id),
                question_id TEXT REFERENCES questions(id),
                parent_id   TEXT REFERENCES comments(id),
                created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
                CHECK ((post_id IS NOT NULL) + (question_id IS NOT NULL) + (parent_id IS NOT NULL) = 1)
            );

            CREATE INDEX idx_comments_post ON comments(post_id);
            CREATE INDEX idx_comments_question ON comments(question_id);
            CREATE INDEX idx_comments_parent ON comments(parent_id);

            CREATE TABLE tags (
                id      INTEGER PRIMARY KEY AUTOINCREMENT,
                name    TEXT NOT NULL UNIQUE
            );

            CREATE TABLE post_tags (
                post_id TEXT NOT NULL REFERENCES posts(id),
                tag_id  INTEGER NOT NULL REFERENCES tags(id),
                PRIMARY KEY (post_id, tag_id)
            );

            CREATE TABLE question_tags (
                question_id TEXT NOT NULL REFERENCES questions(id),
                tag_id      INTEGER NOT NULL REFERENCES tags(id),
                PRIMARY KEY (question_id, tag_id)
            );
            "
        )?;
    }

    if version < 2 {
        info!("Running migration v2 (vote ledgers)");
        let mut sql = String::new();
        for table in ["upvotes", "downvotes", "favorites"] {
            sql.push_str(&format!(
                "
                CREATE TABLE {table} (
                    id          TEXT PRIMARY KEY,
                    user_id     TEXT NOT NULL REFERENCES users(id),
                    target_type TEXT NOT NULL CHECK (target_type IN ('post', 'question', 'comment')),
                    target_id   TEXT NOT NULL,
                    created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
                    UNIQUE(user_id, target_type, target_id)
                );

                CREATE INDEX idx_{table}_target ON {table}(target_type, target_id);
                "
            ));
        }
        apply(conn, 2, &sql)?;
    }

    if version < 3 {
        info!("Running migration v3 (notifications)");
        apply(
            conn,
            3,
            "
            CREATE TABLE notifications (
                id                  TEXT PRIMARY KEY,
                recipient_id        TEXT NOT NULL REFERENCES users(id),
                target_type         TEXT NOT NULL,
                target_id           TEXT NOT NULL,
                notification_type   TEXT NOT NULL CHECK (notification_type IN ('comment', 'interaction')),
                last_notify_user_id TEXT NOT NULL REFERENCES users(id),
                is_read             INTEGER NOT NULL DEFAULT 0,
                created_at          TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
                updated_at          TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
                UNIQUE(target_type, target_id, notification_type)
            );

            CREATE INDEX idx_notifications_recipient
                ON notifications(recipient_id, is_read, updated_at);

            CREATE TABLE notification_actors (
                notification_id TEXT NOT NULL REFERENCES notifications(id),
                actor_id        TEXT NOT NULL REFERENCES users(id),
                notified_at     TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
                PRIMARY KEY (notification_id, actor_id)
            );
            "
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

/// One schema step and its version row, committed together.
fn apply(conn: &Connection, version: i64, sql: &str) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(sql)?;
    tx.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    tx.commit()?;
    Ok(())
}
