//! Users, profiles, password resets, roles and permissions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use domains::{
    Actor, DomainError, DomainResult, NewUser, PasswordResetRecord, PasswordResetRepository,
    Permission, PermissionOracle, Profile, ProfileChanges, RoleStore, User, UserId,
    UserRepository,
};

use super::rows::{ProfileRow, ResetRow, UserRow, PROFILE_COLUMNS, USER_COLUMNS};
use super::{db_err, PgStore};

impl PgStore {
    async fn user_where(&self, column: &str, value: &str) -> DomainResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.map(Into::into))
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn create(&self, user: NewUser) -> DomainResult<User> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let sql = format!(
            "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3) \
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(user.username)
            .bind(user.email)
            .bind(user.password_hash)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_err)?;
        let created: User = row.into();

        sqlx::query("INSERT INTO profiles (user_id) VALUES ($1)")
            .bind(created.id.0)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(created)
    }

    async fn find_by_id(&self, id: UserId) -> DomainResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.map(Into::into))
    }

    async fn find_by_username(&self, username: &str) -> DomainResult<Option<User>> {
        self.user_where("username", username).await
    }

    async fn find_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        self.user_where("email", email).await
    }

    async fn update_password(&self, id: UserId, password_hash: &str) -> DomainResult<()> {
        let result =
            sqlx::query("UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1")
                .bind(id.0)
                .bind(password_hash)
                .execute(&self.pool)
                .await
                .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("user", id));
        }
        Ok(())
    }

    async fn mark_email_verified(&self, id: UserId, at: DateTime<Utc>) -> DomainResult<()> {
        let result = sqlx::query(
            "UPDATE users SET email_verified_at = COALESCE(email_verified_at, $2) WHERE id = $1",
        )
        .bind(id.0)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("user", id));
        }
        Ok(())
    }

    async fn profile(&self, id: UserId) -> DomainResult<Profile> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = $1");
        sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .map(Into::into)
            .ok_or_else(|| DomainError::not_found("profile", id))
    }

    async fn update_profile(&self, id: UserId, changes: ProfileChanges) -> DomainResult<Profile> {
        let sql = format!(
            "UPDATE profiles SET preferred_name = $2, first_name = $3, last_name = $4, bio = $5 \
             WHERE user_id = $1 RETURNING {PROFILE_COLUMNS}"
        );
        sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(id.0)
            .bind(changes.preferred_name)
            .bind(changes.first_name)
            .bind(changes.last_name)
            .bind(changes.bio)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .map(Into::into)
            .ok_or_else(|| DomainError::not_found("profile", id))
    }

    async fn list_profiles(&self) -> DomainResult<Vec<Profile>> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles ORDER BY user_id");
        let rows = sqlx::query_as::<_, ProfileRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl PasswordResetRepository for PgStore {
    async fn put(&self, record: PasswordResetRecord) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO password_resets (email, token_hash, created_at) VALUES ($1, $2, $3) \
             ON CONFLICT (email) DO UPDATE \
             SET token_hash = EXCLUDED.token_hash, created_at = EXCLUDED.created_at",
        )
        .bind(record.email)
        .bind(record.token_hash)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn find(&self, email: &str) -> DomainResult<Option<PasswordResetRecord>> {
        let row = sqlx::query_as::<_, ResetRow>(
            "SELECT email, token_hash, created_at FROM password_resets WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.map(Into::into))
    }

    async fn delete(&self, email: &str) -> DomainResult<()> {
        sqlx::query("DELETE FROM password_resets WHERE email = $1")
            .bind(email)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

#[async_trait]
impl PermissionOracle for PgStore {
    async fn can(&self, actor: &Actor, permission: &Permission) -> DomainResult<bool> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM user_roles ur \
             JOIN role_permissions rp ON rp.role = ur.role \
             WHERE ur.user_id = $1 AND rp.permission = $2)",
        )
        .bind(actor.id.0)
        .bind(permission.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }
}

#[async_trait]
impl RoleStore for PgStore {
    async fn ensure_role(&self, role: &str) -> DomainResult<()> {
        sqlx::query("INSERT INTO roles (name) VALUES ($1) ON CONFLICT DO NOTHING")
            .bind(role)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn role_exists(&self, role: &str) -> DomainResult<bool> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM roles WHERE name = $1)")
            .bind(role)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn grant(&self, role: &str, permission: &Permission) -> DomainResult<()> {
        if !self.role_exists(role).await? {
            return Err(DomainError::not_found("role", role));
        }
        sqlx::query(
            "INSERT INTO role_permissions (role, permission) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(role)
        .bind(permission.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn assign_role(&self, user: UserId, role: &str) -> DomainResult<()> {
        if !self.role_exists(role).await? {
            return Err(DomainError::not_found("role", role));
        }
        if self.find_by_id(user).await?.is_none() {
            return Err(DomainError::not_found("user", user));
        }
        sqlx::query("INSERT INTO user_roles (user_id, role) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(user.0)
            .bind(role)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn roles_of(&self, user: UserId) -> DomainResult<Vec<String>> {
        sqlx::query_scalar("SELECT role FROM user_roles WHERE user_id = $1 ORDER BY assigned_at, role")
            .bind(user.0)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)
    }
}
