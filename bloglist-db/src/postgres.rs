use crate::{
    record::{PostRecord, UserPostRecord, UserRecord, likes_to_db},
    repository::{IdSource, Repository, RepositoryError, Result},
};
use async_trait::async_trait;
use bloglist_common::{
    model::{
        Id,
        post::{CreatePost, Post, PostMarker},
        user::{CreateUser, User, UserMarker, Username},
    },
    snowflake::{ProcessId, WorkerId},
};
use sqlx::{PgPool, query, query_as, query_scalar};
use std::collections::HashMap;
use tracing::{debug, info};

const USER_COLUMNS: &str = "users.user_snowflake, users.username, users.name, users.password_hash";
const POST_COLUMNS: &str =
    "posts.post_snowflake, posts.title, posts.author, posts.url, posts.likes, posts.user_snowflake";

#[derive(Debug)]
pub struct PgRepository {
    pool: PgPool,
    ids: IdSource,
}

impl PgRepository {
    #[must_use]
    pub fn new(pool: PgPool, worker_id: WorkerId, process_id: ProcessId) -> Self {
        Self {
            pool,
            ids: IdSource::new(worker_id, process_id),
        }
    }

    pub async fn connect(
        database_url: &str,
        worker_id: WorkerId,
        process_id: ProcessId,
    ) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        info!("Connected to PostgreSQL");
        Ok(Self::new(pool, worker_id, process_id))
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        debug!("Database migrations applied");
        Ok(())
    }

    async fn user_posts(&self, user_id: Id<UserMarker>) -> Result<Vec<i64>> {
        let posts = query_scalar::<_, i64>(
            "
            SELECT post_snowflake FROM users.user_posts
            WHERE user_snowflake = $1
            ORDER BY position
            ",
        )
        .bind(user_id.snowflake().get().cast_signed())
        .fetch_all(&self.pool)
        .await?;

        Ok(posts)
    }

    async fn user_from_record(&self, record: Option<UserRecord>) -> Result<Option<User>> {
        let Some(record) = record else {
            return Ok(None);
        };
        let blogs = self
            .user_posts(record.user_snowflake.cast_unsigned().into())
            .await?;

        Ok(Some(record.into_user(blogs)?))
    }
}

#[async_trait]
impl Repository for PgRepository {
    async fn find_user_by_id(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users.users WHERE users.user_snowflake = $1"
        ))
        .bind(user_id.snowflake().get().cast_signed())
        .fetch_optional(&self.pool)
        .await?;

        self.user_from_record(record).await
    }

    async fn find_user_by_username(&self, username: &Username) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users.users WHERE users.username = $1"
        ))
        .bind(username.get())
        .fetch_optional(&self.pool)
        .await?;

        self.user_from_record(record).await
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let records = query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users.users ORDER BY users.user_snowflake"
        ))
        .fetch_all(&self.pool)
        .await?;

        let links = query_as::<_, UserPostRecord>(
            "SELECT user_snowflake, post_snowflake FROM users.user_posts ORDER BY position",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut blogs: HashMap<i64, Vec<i64>> = HashMap::new();
        for link in links {
            blogs
                .entry(link.user_snowflake)
                .or_default()
                .push(link.post_snowflake);
        }

        records
            .into_iter()
            .map(|record| {
                let owned = blogs.remove(&record.user_snowflake).unwrap_or_default();
                record.into_user(owned).map_err(RepositoryError::from)
            })
            .collect()
    }

    async fn create_user(&self, user: CreateUser) -> Result<User> {
        let user_id: Id<UserMarker> = self.ids.next()?;

        let inserted = query(
            "
            INSERT INTO users.users (user_snowflake, username, name, password_hash)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(user_id.snowflake().get().cast_signed())
        .bind(user.username.get())
        .bind(&user.name)
        .bind(user.password_hash.as_str())
        .execute(&self.pool)
        .await;

        match inserted {
            Ok(_) => {}
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                return Err(RepositoryError::DuplicateUsername(user.username));
            }
            Err(err) => return Err(err.into()),
        }

        Ok(User {
            id: user_id,
            username: user.username,
            name: user.name,
            password_hash: user.password_hash,
            blogs: Vec::new(),
        })
    }

    async fn append_user_post(
        &self,
        user_id: Id<UserMarker>,
        post_id: Id<PostMarker>,
    ) -> Result<()> {
        let inserted = query(
            "
            INSERT INTO users.user_posts (user_snowflake, post_snowflake)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(user_id.snowflake().get().cast_signed())
        .bind(post_id.snowflake().get().cast_signed())
        .execute(&self.pool)
        .await;

        match inserted {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(err)) if err.is_foreign_key_violation() => {
                Err(RepositoryError::MissingUser(user_id))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn remove_user_post(
        &self,
        user_id: Id<UserMarker>,
        post_id: Id<PostMarker>,
    ) -> Result<()> {
        query("DELETE FROM users.user_posts WHERE user_snowflake = $1 AND post_snowflake = $2")
            .bind(user_id.snowflake().get().cast_signed())
            .bind(post_id.snowflake().get().cast_signed())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn find_post_by_id(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let record = query_as::<_, PostRecord>(&format!(
            "SELECT {POST_COLUMNS} FROM posts.posts WHERE posts.post_snowflake = $1"
        ))
        .bind(post_id.snowflake().get().cast_signed())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Post::try_from).transpose()?)
    }

    async fn list_posts(&self) -> Result<Vec<Post>> {
        let records = query_as::<_, PostRecord>(&format!(
            "SELECT {POST_COLUMNS} FROM posts.posts ORDER BY posts.position"
        ))
        .fetch_all(&self.pool)
        .await?;

        records
            .into_iter()
            .map(|record| Post::try_from(record).map_err(RepositoryError::from))
            .collect()
    }

    async fn create_post(&self, post: CreatePost) -> Result<Post> {
        let post = post.into_post(self.ids.next()?);

        let inserted = query(
            "
            INSERT INTO posts.posts (post_snowflake, title, author, url, likes, user_snowflake)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(post.id.snowflake().get().cast_signed())
        .bind(&post.title)
        .bind(&post.author)
        .bind(&post.url)
        .bind(likes_to_db(post.likes)?)
        .bind(post.user.snowflake().get().cast_signed())
        .execute(&self.pool)
        .await;

        match inserted {
            Ok(_) => Ok(post),
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                Err(RepositoryError::DuplicatePostId(post.id))
            }
            Err(sqlx::Error::Database(err)) if err.is_foreign_key_violation() => {
                Err(RepositoryError::MissingUser(post.user))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn save_post(&self, post: Post) -> Result<Post> {
        let record = query_as::<_, PostRecord>(&format!(
            "
            INSERT INTO posts.posts (post_snowflake, title, author, url, likes, user_snowflake)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (post_snowflake) DO UPDATE
            SET title = EXCLUDED.title,
                author = EXCLUDED.author,
                url = EXCLUDED.url,
                likes = EXCLUDED.likes
            RETURNING {POST_COLUMNS}
            "
        ))
        .bind(post.id.snowflake().get().cast_signed())
        .bind(&post.title)
        .bind(&post.author)
        .bind(&post.url)
        .bind(likes_to_db(post.likes)?)
        .bind(post.user.snowflake().get().cast_signed())
        .fetch_one(&self.pool)
        .await;

        match record {
            Ok(record) => Ok(Post::try_from(record)?),
            Err(sqlx::Error::Database(err)) if err.is_foreign_key_violation() => {
                Err(RepositoryError::MissingUser(post.user))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn delete_post_by_id(&self, post_id: Id<PostMarker>) -> Result<bool> {
        let deleted = query("DELETE FROM posts.posts WHERE post_snowflake = $1")
            .bind(post_id.snowflake().get().cast_signed())
            .execute(&self.pool)
            .await?;

        Ok(deleted.rows_affected() > 0)
    }
}
