use anyhow::Result;
use rusqlite::Connection;
use tracing::debug;

use crate::models::{CreateUserOutcome, SignOutcome, SpendOutcome, UserCounts, UserRow};
use crate::{Database, OptionalExt};

const USER_COLUMNS: &str = "id, email, name, password, points, last_sign_date, created_at";

impl Database {
    /// Inserts a user. The UNIQUE index on `email` is the authority for
    /// duplicates, so a registration racing another with the same email
    /// still gets `EmailTaken` rather than an error.
    pub fn create_user(
        &self,
        id: &str,
        email: &str,
        name: &str,
        password_hash: &str,
        points: i64,
    ) -> Result<CreateUserOutcome> {
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (id, email, name, password, points) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, email, name, password_hash, points],
            );
            match inserted {
                Ok(_) => Ok(CreateUserOutcome::Created),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
                {
                    debug!("email {} already registered", email);
                    Ok(CreateUserOutcome::EmailTaken)
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    pub fn user_counts(&self, id: &str) -> Result<UserCounts> {
        self.with_conn(|conn| {
            let counts = conn.query_row(
                "SELECT
                    (SELECT COUNT(*) FROM posts WHERE author_id = ?1),
                    (SELECT COUNT(*) FROM questions WHERE author_id = ?1),
                    (SELECT COUNT(*) FROM comments WHERE author_id = ?1)",
                [id],
                |row| {
                    Ok(UserCounts {
                        posts: row.get(0)?,
                        questions: row.get(1)?,
                        comments: row.get(2)?,
                    })
                },
            )?;
            Ok(counts)
        })
    }

    /// Conditional debit against a previously read balance.
    pub fn spend_points(&self, user_id: &str, expected: i64, cost: i64) -> Result<SpendOutcome> {
        self.with_conn_mut(|conn| cas_spend(conn, user_id, expected, cost))
    }

    /// Credits the daily reward if the user has not signed on `today`.
    /// `expected_points` and `expected_last` are the values read beforehand;
    /// if either changed in between the update affects no row.
    pub fn daily_sign(
        &self,
        user_id: &str,
        expected_points: i64,
        expected_last: Option<&str>,
        today: &str,
        reward: i64,
    ) -> Result<SignOutcome> {
        if expected_last == Some(today) {
            return Ok(SignOutcome::AlreadySigned);
        }

        self.with_conn_mut(|conn| {
            let affected = conn.execute(
                "UPDATE users SET points = points + ?1, last_sign_date = ?2
                 WHERE id = ?3 AND points = ?4 AND last_sign_date IS ?5",
                rusqlite::params![reward, today, user_id, expected_points, expected_last],
            )?;

            if affected == 1 {
                Ok(SignOutcome::Signed {
                    points: expected_points + reward,
                })
            } else {
                debug!("daily sign lost race for user {}", user_id);
                Ok(SignOutcome::RaceLost)
            }
        })
    }
}

/// `UPDATE .. WHERE points = expected`; zero affected rows means another
/// writer got there first.
pub(crate) fn cas_spend(
    conn: &Connection,
    user_id: &str,
    expected: i64,
    cost: i64,
) -> Result<SpendOutcome> {
    if expected < cost {
        return Ok(SpendOutcome::Insufficient { balance: expected });
    }

    let affected = conn.execute(
        "UPDATE users SET points = points - ?1 WHERE id = ?2 AND points = ?3",
        rusqlite::params![cost, user_id, expected],
    )?;

    if affected == 1 {
        Ok(SpendOutcome::Spent {
            balance: expected - cost,
        })
    } else {
        debug!("points spend lost race for user {}", user_id);
        Ok(SpendOutcome::RaceLost)
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let mut stmt =
        conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1"))?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                email: row.get(1)?,
                name: row.get(2)?,
                password: row.get(3)?,
                points: row.get(4)?,
                last_sign_date: row.get(5)?,
                created_at: row.get(6)?,
            })
        })
        .optional()?;

    Ok(row)
}
