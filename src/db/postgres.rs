use super::{BookQuery, CatalogStore, InterestStore, LibraryStore};
use crate::{
    error::Result,
    models::{
        Audiobook, Book, BookForm, BookId, Genre, GenreId, RecentlyViewed, Review, SavedBook,
        UserInterest,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool, Postgres, QueryBuilder};
use tracing::{debug, info};
use uuid::Uuid;

/// Book columns with the genre name joined in; every book query starts here.
const BOOK_SELECT: &str = "\
    SELECT b.id, b.title, b.author, b.isbn, b.genre_id, g.name AS genre_name, b.summary, b.bio \
    FROM books b LEFT JOIN genres g ON g.id = b.genre_id";

const MAX_CONNECTIONS: u32 = 10;

/// A book joined with a per-user timestamp (saved or viewed).
#[derive(Debug, FromRow)]
struct LibraryRow {
    user_id: Uuid,
    stamped_at: DateTime<Utc>,
    #[sqlx(flatten)]
    book: Book,
}

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool and apply pending migrations.
    pub async fn connect(database_url: &str) -> Result<Self> {
        info!("Connecting to Postgres");
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Database migrations applied");

        Ok(Self::new(pool))
    }

    async fn library_rows(
        &self,
        table: &str,
        stamp_column: &str,
        user_id: Uuid,
        genre_id: Option<GenreId>,
    ) -> Result<Vec<LibraryRow>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT l.user_id, l.{stamp_column} AS stamped_at, \
             b.id, b.title, b.author, b.isbn, b.genre_id, g.name AS genre_name, b.summary, b.bio \
             FROM {table} l \
             JOIN books b ON b.id = l.book_id \
             LEFT JOIN genres g ON g.id = b.genre_id \
             WHERE l.user_id = "
        ));
        builder.push_bind(user_id);
        if let Some(genre_id) = genre_id {
            builder.push(" AND b.genre_id = ").push_bind(genre_id);
        }
        builder.push(format!(" ORDER BY l.{stamp_column}, b.id"));

        Ok(builder
            .build_query_as::<LibraryRow>()
            .fetch_all(&self.pool)
            .await?)
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn list_genres(&self) -> Result<Vec<Genre>> {
        Ok(
            sqlx::query_as::<_, Genre>("SELECT id, name FROM genres ORDER BY id")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn find_genre(&self, id: GenreId) -> Result<Option<Genre>> {
        Ok(
            sqlx::query_as::<_, Genre>("SELECT id, name FROM genres WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn list_books(&self, query: &BookQuery) -> Result<Vec<Book>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(BOOK_SELECT);
        builder.push(" WHERE TRUE");

        if let Some(ids) = &query.ids {
            builder.push(" AND b.id = ANY(").push_bind(ids.clone()).push(")");
        }
        if let Some(genre_id) = query.genre_id {
            builder.push(" AND b.genre_id = ").push_bind(genre_id);
        }
        if query.has_audiobook {
            builder.push(" AND EXISTS (SELECT 1 FROM audiobooks a WHERE a.book_id = b.id)");
        }
        builder.push(" ORDER BY b.id");

        debug!("Listing books with {:?}", query);
        Ok(builder
            .build_query_as::<Book>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn find_book(&self, id: BookId) -> Result<Option<Book>> {
        let sql = format!("{BOOK_SELECT} WHERE b.id = $1");
        Ok(sqlx::query_as::<_, Book>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_book(&self, form: &BookForm) -> Result<Book> {
        let sql = "WITH inserted AS ( \
                INSERT INTO books (title, author, isbn, genre_id, summary, bio) \
                VALUES ($1, $2, $3, $4, $5, $6) RETURNING * \
            ) \
            SELECT b.id, b.title, b.author, b.isbn, b.genre_id, g.name AS genre_name, \
                   b.summary, b.bio \
            FROM inserted b LEFT JOIN genres g ON g.id = b.genre_id";

        Ok(sqlx::query_as::<_, Book>(sql)
            .bind(&form.title)
            .bind(&form.author)
            .bind(&form.isbn)
            .bind(form.genre_id)
            .bind(&form.summary)
            .bind(&form.bio)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_book(&self, id: BookId, form: &BookForm) -> Result<Option<Book>> {
        let sql = "WITH updated AS ( \
                UPDATE books SET title = $2, author = $3, isbn = $4, genre_id = $5, \
                    summary = $6, bio = $7 \
                WHERE id = $1 RETURNING * \
            ) \
            SELECT b.id, b.title, b.author, b.isbn, b.genre_id, g.name AS genre_name, \
                   b.summary, b.bio \
            FROM updated b LEFT JOIN genres g ON g.id = b.genre_id";

        Ok(sqlx::query_as::<_, Book>(sql)
            .bind(id)
            .bind(&form.title)
            .bind(&form.author)
            .bind(&form.isbn)
            .bind(form.genre_id)
            .bind(&form.summary)
            .bind(&form.bio)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_book(&self, id: BookId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn audiobooks_for(&self, book_id: BookId) -> Result<Vec<Audiobook>> {
        Ok(sqlx::query_as::<_, Audiobook>(
            "SELECT id, book_id, narrator, audio_url FROM audiobooks \
             WHERE book_id = $1 ORDER BY id",
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn moderated_reviews(&self, book_id: BookId) -> Result<Vec<Review>> {
        Ok(sqlx::query_as::<_, Review>(
            "SELECT id, book_id, user_id, rating, content, is_moderated, created_at \
             FROM reviews WHERE book_id = $1 AND is_moderated ORDER BY created_at, id",
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?)
    }
}

#[async_trait]
impl InterestStore for PgStore {
    async fn insert_interest(&self, user_id: Uuid, query: &str) -> Result<UserInterest> {
        Ok(sqlx::query_as::<_, UserInterest>(
            "INSERT INTO user_interests (user_id, query) VALUES ($1, $2) \
             RETURNING id, user_id, query, created_at",
        )
        .bind(user_id)
        .bind(query)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn interests_for(&self, user_id: Uuid) -> Result<Vec<UserInterest>> {
        Ok(sqlx::query_as::<_, UserInterest>(
            "SELECT id, user_id, query, created_at FROM user_interests \
             WHERE user_id = $1 ORDER BY created_at, id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn genre_preferences(&self, user_id: Uuid) -> Result<Vec<String>> {
        Ok(sqlx::query_scalar::<_, String>(
            "SELECT genre_name FROM user_genres WHERE user_id = $1 ORDER BY genre_name",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn replace_genre_preferences(
        &self,
        user_id: Uuid,
        genre_names: &[String],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM user_genres WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        for name in genre_names {
            sqlx::query(
                "INSERT INTO user_genres (user_id, genre_name) VALUES ($1, $2) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(user_id)
            .bind(name)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl LibraryStore for PgStore {
    async fn save_book(&self, user_id: Uuid, book_id: BookId) -> Result<()> {
        sqlx::query(
            "INSERT INTO saved_books (user_id, book_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(book_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn unsave_book(&self, user_id: Uuid, book_id: BookId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM saved_books WHERE user_id = $1 AND book_id = $2")
            .bind(user_id)
            .bind(book_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn is_saved(&self, user_id: Uuid, book_id: BookId) -> Result<bool> {
        Ok(sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM saved_books WHERE user_id = $1 AND book_id = $2)",
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn saved_books(&self, user_id: Uuid) -> Result<Vec<SavedBook>> {
        let rows = self
            .library_rows("saved_books", "created_at", user_id, None)
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| SavedBook {
                user_id: row.user_id,
                book: row.book,
                saved_at: row.stamped_at,
            })
            .collect())
    }

    async fn record_view(&self, user_id: Uuid, book_id: BookId) -> Result<()> {
        sqlx::query(
            "INSERT INTO recently_viewed (user_id, book_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(book_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn recently_viewed(
        &self,
        user_id: Uuid,
        genre_id: Option<GenreId>,
    ) -> Result<Vec<RecentlyViewed>> {
        let rows = self
            .library_rows("recently_viewed", "viewed_at", user_id, genre_id)
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| RecentlyViewed {
                user_id: row.user_id,
                book: row.book,
                viewed_at: row.stamped_at,
            })
            .collect())
    }
}
