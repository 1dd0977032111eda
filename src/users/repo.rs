use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::users::repo_types::{PublicUser, RepoError, UpdateOutcome, User, UserChanges};

impl User {
    /// Insert a new user and return the id assigned by the store.
    pub async fn create(
        db: &SqlitePool,
        email: &str,
        password_hash: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<i64, RepoError> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO users (email, password_hash, first_name, last_name)
            VALUES (?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(first_name)
        .bind(last_name)
        .fetch_one(db)
        .await?;
        debug!(user_id = id, "user row inserted");
        Ok(id)
    }

    /// Find a user by email, hash included.
    pub async fn find_by_email(db: &SqlitePool, email: &str) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, first_name, last_name
            FROM users
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &SqlitePool, id: i64) -> Result<Option<PublicUser>, RepoError> {
        let user = sqlx::query_as::<_, PublicUser>(
            r#"
            SELECT id, email, first_name, last_name
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn list_all(db: &SqlitePool) -> Result<Vec<PublicUser>, RepoError> {
        let users = sqlx::query_as::<_, PublicUser>(
            r#"
            SELECT id, email, first_name, last_name
            FROM users
            ORDER BY id
            "#,
        )
        .fetch_all(db)
        .await?;
        Ok(users)
    }

    /// Delete by id. Returns the affected row count; `0` means no such user.
    pub async fn delete_by_id(db: &SqlitePool, id: i64) -> Result<u64, RepoError> {
        let res = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(db)
            .await?;
        Ok(res.rows_affected())
    }

    /// Rewrite only the supplied fields that differ from the stored row.
    ///
    /// The read and the write are separate statements, so a concurrent update
    /// to the same row between them is not detected; last writer wins. A row
    /// deleted in that window yields `NotFound`.
    pub async fn update_partial(
        db: &SqlitePool,
        id: i64,
        changes: UserChanges,
    ) -> Result<UpdateOutcome, RepoError> {
        let current = Self::find_by_id(db, id).await?.ok_or(RepoError::NotFound)?;

        let diff = changes.diff_against(&current);
        if diff.is_empty() {
            debug!(user_id = id, "update skipped, nothing differs");
            return Ok(UpdateOutcome::NoChanges);
        }

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE users SET ");
        let mut set = qb.separated(", ");
        if let Some(email) = diff.email {
            set.push("email = ").push_bind_unseparated(email);
        }
        if let Some(first_name) = diff.first_name {
            set.push("first_name = ").push_bind_unseparated(first_name);
        }
        if let Some(last_name) = diff.last_name {
            set.push("last_name = ").push_bind_unseparated(last_name);
        }
        qb.push(" WHERE id = ").push_bind(id);

        let affected = qb.build().execute(db).await?.rows_affected();
        if affected == 0 {
            return Err(RepoError::NotFound);
        }
        debug!(user_id = id, affected, "user row updated");
        Ok(UpdateOutcome::Updated(affected))
    }
}

impl UserChanges {
    /// Keep only the fields whose value differs from `current`.
    fn diff_against(self, current: &PublicUser) -> UserChanges {
        UserChanges {
            email: self.email.filter(|v| *v != current.email),
            first_name: self.first_name.filter(|v| *v != current.first_name),
            last_name: self.last_name.filter(|v| *v != current.last_name),
        }
    }
}
