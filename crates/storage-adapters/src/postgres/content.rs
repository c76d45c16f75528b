//! Categories, threads and replies.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};

use domains::{
    Category, CategoryFields, CategoryId, CategoryRepository, DomainError, DomainResult, NewReply,
    NewThread, Page, Reply, ReplyId, ReplyRepository, ResourceStore, Scope, Thread, ThreadFields,
    ThreadId, ThreadQuery, ThreadRepository,
};

use super::rows::{CategoryRow, ReplyRow, ThreadRow, CATEGORY_COLUMNS, REPLY_COLUMNS, THREAD_COLUMNS};
use super::{db_err, scope_sql, PgStore};

macro_rules! resource_store {
    ($resource:ty, $id:ty, $row:ty, $table:literal, $alias:literal, $columns:expr) => {
        #[async_trait]
        impl ResourceStore<$resource> for PgStore {
            async fn find(&self, id: $id, scope: Scope) -> DomainResult<Option<$resource>> {
                let sql = format!(
                    "SELECT {} FROM {} {} WHERE {}.id = $1 AND {}",
                    $columns,
                    $table,
                    $alias,
                    $alias,
                    scope_sql($alias, scope)
                );
                let row = sqlx::query_as::<_, $row>(&sql)
                    .bind(id.0)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(db_err)?;
                Ok(row.map(Into::into))
            }

            async fn soft_delete(&self, id: $id, at: DateTime<Utc>) -> DomainResult<bool> {
                let sql = concat!(
                    "UPDATE ",
                    $table,
                    " SET deleted_at = $2 WHERE id = $1 AND deleted_at IS NULL"
                );
                let result = sqlx::query(sql)
                    .bind(id.0)
                    .bind(at)
                    .execute(&self.pool)
                    .await
                    .map_err(db_err)?;
                Ok(result.rows_affected() == 1)
            }

            async fn restore(&self, id: $id) -> DomainResult<bool> {
                let sql = concat!(
                    "UPDATE ",
                    $table,
                    " SET deleted_at = NULL WHERE id = $1 AND deleted_at IS NOT NULL"
                );
                let result = sqlx::query(sql)
                    .bind(id.0)
                    .execute(&self.pool)
                    .await
                    .map_err(db_err)?;
                Ok(result.rows_affected() == 1)
            }

            /// Child rows go with it through `ON DELETE CASCADE`.
            async fn hard_delete(&self, id: $id) -> DomainResult<bool> {
                let result = sqlx::query(concat!("DELETE FROM ", $table, " WHERE id = $1"))
                    .bind(id.0)
                    .execute(&self.pool)
                    .await
                    .map_err(db_err)?;
                Ok(result.rows_affected() == 1)
            }
        }
    };
}

resource_store!(Category, CategoryId, CategoryRow, "categories", "c", CATEGORY_COLUMNS);
resource_store!(Thread, ThreadId, ThreadRow, "threads", "t", THREAD_COLUMNS);
resource_store!(Reply, ReplyId, ReplyRow, "replies", "r", REPLY_COLUMNS);

// ── Categories ───────────────────────────────────────────────────────────────

#[async_trait]
impl CategoryRepository for PgStore {
    async fn insert(&self, fields: CategoryFields) -> DomainResult<Category> {
        let sql = format!(
            "INSERT INTO categories AS c (name, slug, description) VALUES ($1, $2, $3) \
             RETURNING {CATEGORY_COLUMNS}"
        );
        let row = sqlx::query_as::<_, CategoryRow>(&sql)
            .bind(fields.name)
            .bind(fields.slug)
            .bind(fields.description)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.into())
    }

    async fn update(&self, id: CategoryId, fields: CategoryFields) -> DomainResult<Category> {
        let sql = format!(
            "UPDATE categories AS c SET name = $2, slug = $3, description = $4, updated_at = now() \
             WHERE c.id = $1 RETURNING {CATEGORY_COLUMNS}"
        );
        sqlx::query_as::<_, CategoryRow>(&sql)
            .bind(id.0)
            .bind(fields.name)
            .bind(fields.slug)
            .bind(fields.description)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .map(Into::into)
            .ok_or_else(|| DomainError::not_found("category", id))
    }

    async fn find_by_slug(&self, slug: &str, scope: Scope) -> DomainResult<Option<Category>> {
        let sql = format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories c WHERE c.slug = $1 AND {}",
            scope_sql("c", scope)
        );
        let row = sqlx::query_as::<_, CategoryRow>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.map(Into::into))
    }

    async fn list(&self) -> DomainResult<Vec<Category>> {
        let sql = format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories c WHERE c.deleted_at IS NULL \
             ORDER BY c.created_at DESC, c.id DESC"
        );
        let rows = sqlx::query_as::<_, CategoryRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

// ── Threads ──────────────────────────────────────────────────────────────────

fn push_thread_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &ThreadQuery) {
    qb.push(" WHERE t.deleted_at IS NULL");
    if let Some(category) = query.category_id {
        qb.push(" AND t.category_id = ").push_bind(category.0);
    }
    if let Some(owner) = query.owner_id {
        qb.push(" AND t.owner_id = ").push_bind(owner.0);
    }
    if query.unanswered {
        qb.push(
            " AND NOT EXISTS (SELECT 1 FROM replies u \
             WHERE u.thread_id = t.id AND u.deleted_at IS NULL)",
        );
    }
}

impl PgStore {
    async fn thread_by_id(&self, id: ThreadId) -> DomainResult<Thread> {
        ResourceStore::<Thread>::find(self, id, Scope::WithTrashed)
            .await?
            .ok_or_else(|| DomainError::not_found("thread", id))
    }
}

#[async_trait]
impl ThreadRepository for PgStore {
    async fn insert(&self, thread: NewThread) -> DomainResult<Thread> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO threads (owner_id, category_id, title, slug, body) \
             VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(thread.owner_id.0)
        .bind(thread.fields.category_id.0)
        .bind(thread.fields.title)
        .bind(thread.fields.slug)
        .bind(thread.fields.body)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        self.thread_by_id(ThreadId(id)).await
    }

    async fn update(&self, id: ThreadId, fields: ThreadFields) -> DomainResult<Thread> {
        let result = sqlx::query(
            "UPDATE threads SET category_id = $2, title = $3, slug = $4, body = $5, \
             updated_at = now() WHERE id = $1",
        )
        .bind(id.0)
        .bind(fields.category_id.0)
        .bind(fields.title)
        .bind(fields.slug)
        .bind(fields.body)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("thread", id));
        }
        self.thread_by_id(id).await
    }

    async fn find_by_slug(&self, slug: &str, scope: Scope) -> DomainResult<Option<Thread>> {
        let sql = format!(
            "SELECT {THREAD_COLUMNS} FROM threads t WHERE t.slug = $1 AND {}",
            scope_sql("t", scope)
        );
        let row = sqlx::query_as::<_, ThreadRow>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.map(Into::into))
    }

    async fn list(&self, query: &ThreadQuery) -> DomainResult<Page<Thread>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM threads t");
        push_thread_filters(&mut count, query);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {THREAD_COLUMNS} FROM threads t"));
        push_thread_filters(&mut select, query);
        if query.popular {
            select.push(" ORDER BY replies_count DESC, t.created_at DESC, t.id DESC");
        } else {
            select.push(" ORDER BY t.created_at DESC, t.id DESC");
        }
        select
            .push(" LIMIT ")
            .push_bind(i64::from(query.per_page))
            .push(" OFFSET ")
            .push_bind(query.offset() as i64);

        let rows = select
            .build_query_as::<ThreadRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(Page::new(
            rows.into_iter().map(Into::into).collect(),
            query.page,
            query.per_page,
            total.max(0) as u64,
        ))
    }
}

// ── Replies ──────────────────────────────────────────────────────────────────

#[async_trait]
impl ReplyRepository for PgStore {
    async fn insert(&self, reply: NewReply) -> DomainResult<Reply> {
        let sql = format!(
            "INSERT INTO replies AS r (owner_id, thread_id, body) VALUES ($1, $2, $3) \
             RETURNING {REPLY_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ReplyRow>(&sql)
            .bind(reply.owner_id.0)
            .bind(reply.thread_id.0)
            .bind(reply.body)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.into())
    }

    async fn update(&self, id: ReplyId, body: String) -> DomainResult<Reply> {
        let sql = format!(
            "UPDATE replies AS r SET body = $2, updated_at = now() WHERE r.id = $1 \
             RETURNING {REPLY_COLUMNS}"
        );
        sqlx::query_as::<_, ReplyRow>(&sql)
            .bind(id.0)
            .bind(body)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .map(Into::into)
            .ok_or_else(|| DomainError::not_found("reply", id))
    }

    async fn list_for_thread(&self, thread: ThreadId) -> DomainResult<Vec<Reply>> {
        let sql = format!(
            "SELECT {REPLY_COLUMNS} FROM replies r WHERE r.thread_id = $1 AND r.deleted_at IS NULL \
             ORDER BY r.created_at, r.id"
        );
        let rows = sqlx::query_as::<_, ReplyRow>(&sql)
            .bind(thread.0)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
