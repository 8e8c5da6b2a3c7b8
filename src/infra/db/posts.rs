use async_trait::async_trait;
use sqlx::QueryBuilder;
use time::OffsetDateTime;

use crate::application::repos::{
    CreatePostParams, PostScope, PostsRepo, RepoError, UpdatePostParams,
};
use crate::domain::entities::{AuthorRef, GroupRef, PostEntry, PostRecord, display_name};

use super::{PostgresRepositories, map_sqlx_error};

const POST_ENTRY_SELECT: &str = "SELECT p.id, p.author_id, p.group_id, p.text, p.image, p.created_at, \
     u.username AS author_username, u.first_name AS author_first_name, \
     u.last_name AS author_last_name, g.slug AS group_slug, g.title AS group_title \
     FROM posts p \
     INNER JOIN users u ON u.id = p.author_id \
     LEFT JOIN post_groups g ON g.id = p.group_id \
     WHERE 1=1 ";

const POST_RETURNING: &str = "RETURNING id, author_id, group_id, text, image, created_at";

#[derive(sqlx::FromRow)]
struct PostRow {
    id: i64,
    author_id: i64,
    group_id: Option<i64>,
    text: String,
    image: Option<String>,
    created_at: OffsetDateTime,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            author_id: row.author_id,
            group_id: row.group_id,
            text: row.text,
            image: row.image,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PostEntryRow {
    id: i64,
    author_id: i64,
    group_id: Option<i64>,
    text: String,
    image: Option<String>,
    created_at: OffsetDateTime,
    author_username: String,
    author_first_name: String,
    author_last_name: String,
    group_slug: Option<String>,
    group_title: Option<String>,
}

impl From<PostEntryRow> for PostEntry {
    fn from(row: PostEntryRow) -> Self {
        let author = AuthorRef {
            id: row.author_id,
            full_name: display_name(
                &row.author_username,
                &row.author_first_name,
                &row.author_last_name,
            ),
            username: row.author_username,
        };
        let group = match (row.group_id, row.group_slug, row.group_title) {
            (Some(id), Some(slug), Some(title)) => Some(GroupRef { id, slug, title }),
            _ => None,
        };
        Self {
            post: PostRecord {
                id: row.id,
                author_id: row.author_id,
                group_id: row.group_id,
                text: row.text,
                image: row.image,
                created_at: row.created_at,
            },
            author,
            group,
        }
    }
}

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn count_posts(&self, scope: PostScope) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM posts p WHERE 1=1 ");
        Self::apply_post_scope(&mut qb, scope);

        let count: i64 = qb
            .build_query_scalar::<i64>()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Self::convert_count(count)
    }

    async fn list_posts(
        &self,
        scope: PostScope,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<PostEntry>, RepoError> {
        let offset = i64::try_from(offset).map_err(|_| RepoError::InvalidInput {
            message: "page offset exceeds supported range".to_string(),
        })?;

        let mut qb = QueryBuilder::new(POST_ENTRY_SELECT);
        Self::apply_post_scope(&mut qb, scope);
        qb.push(" ORDER BY p.created_at DESC, p.id DESC LIMIT ");
        qb.push_bind(i64::from(limit));
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        let rows = qb
            .build_query_as::<PostEntryRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(PostEntry::from).collect())
    }

    async fn find_post(&self, id: i64) -> Result<Option<PostEntry>, RepoError> {
        let mut qb = QueryBuilder::new(POST_ENTRY_SELECT);
        qb.push(" AND p.id = ");
        qb.push_bind(id);

        let row = qb
            .build_query_as::<PostEntryRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(PostEntry::from))
    }

    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let sql = format!(
            "INSERT INTO posts (author_id, group_id, text, image) VALUES ($1, $2, $3, $4) {POST_RETURNING}"
        );
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(params.author_id)
            .bind(params.group_id)
            .bind(params.text)
            .bind(params.image)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let sql = format!(
            "UPDATE posts SET group_id = $2, text = $3, image = $4 WHERE id = $1 {POST_RETURNING}"
        );
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(params.id)
            .bind(params.group_id)
            .bind(params.text)
            .bind(params.image)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }
}
