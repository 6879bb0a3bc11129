use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use std::collections::HashMap;

use crate::{
    db::store::{CandidateQuery, CatalogStore, FeedbackStore, InteractionStore},
    error::{AppError, AppResult},
    models::{
        BookId, BookSummary, Candidate, FeedbackCreate, Genre, GenreAffinity,
        RecommendationFeedback, RecommendationType, ServedTotals, UserId,
    },
};

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Applies the embedded analytics migrations
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

#[derive(FromRow)]
struct GenreCountRow {
    id: i32,
    name: String,
    genre_count: i64,
}

#[derive(FromRow)]
struct CandidateRow {
    id: i32,
    title: String,
    author: String,
    published_year: Option<i32>,
    cover_url: Option<String>,
    average_rating: Option<f64>,
    review_count: i64,
    favorite_count: i64,
}

#[derive(FromRow)]
struct BookGenreRow {
    book_id: i32,
    genre_id: i32,
    genre_name: String,
}

#[derive(FromRow)]
struct FeedbackRow {
    id: i32,
    user_id: i32,
    book_id: i32,
    recommendation_type: String,
    is_positive: bool,
    context_data: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<FeedbackRow> for RecommendationFeedback {
    type Error = AppError;

    fn try_from(row: FeedbackRow) -> AppResult<Self> {
        Ok(RecommendationFeedback {
            id: row.id,
            user_id: row.user_id,
            book_id: row.book_id,
            recommendation_type: row
                .recommendation_type
                .parse()
                .map_err(AppError::Internal)?,
            is_positive: row.is_positive,
            context_data: row.context_data,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct ServedRow {
    recommendation_type: String,
    served_count: i64,
    score_sum: f64,
}

/// Postgres-backed implementation of every store the engine consumes
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Loads genre tags for a batch of books, keyed by book id
    async fn genres_for_books(&self, book_ids: &[BookId]) -> AppResult<HashMap<BookId, Vec<Genre>>> {
        if book_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, BookGenreRow>(
            r#"
            SELECT bg.book_id, g.id AS genre_id, g.name AS genre_name
            FROM book_genres bg
            JOIN genres g ON g.id = bg.genre_id
            WHERE bg.book_id = ANY($1)
            ORDER BY bg.book_id, g.id
            "#,
        )
        .bind(book_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut genres: HashMap<BookId, Vec<Genre>> = HashMap::new();
        for row in rows {
            genres.entry(row.book_id).or_default().push(Genre {
                id: row.genre_id,
                name: row.genre_name,
            });
        }

        Ok(genres)
    }
}

#[async_trait::async_trait]
impl CatalogStore for PgStore {
    async fn favorite_genres(&self, user_id: UserId) -> AppResult<Vec<GenreAffinity>> {
        let rows = sqlx::query_as::<_, GenreCountRow>(
            r#"
            SELECT g.id, g.name, COUNT(*) AS genre_count
            FROM favorites f
            JOIN book_genres bg ON bg.book_id = f.book_id
            JOIN genres g ON g.id = bg.genre_id
            WHERE f.user_id = $1
            GROUP BY g.id, g.name
            ORDER BY genre_count DESC, g.id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| GenreAffinity {
                genre: Genre {
                    id: row.id,
                    name: row.name,
                },
                favorite_count: row.genre_count,
            })
            .collect())
    }

    async fn candidates(&self, query: &CandidateQuery) -> AppResult<Vec<Candidate>> {
        let exclude: Vec<BookId> = query.exclude.iter().copied().collect();

        let rows = sqlx::query_as::<_, CandidateRow>(
            r#"
            SELECT b.id, b.title, b.author, b.published_year, b.cover_url,
                   AVG(r.rating)::float8 AS average_rating,
                   COUNT(DISTINCT r.id) AS review_count,
                   COUNT(DISTINCT f.id) AS favorite_count
            FROM books b
            LEFT JOIN reviews r ON r.book_id = b.id
            LEFT JOIN favorites f ON f.book_id = b.id
            WHERE ($1::int4[] IS NULL OR EXISTS (
                    SELECT 1 FROM book_genres bg
                    WHERE bg.book_id = b.id AND bg.genre_id = ANY($1)))
              AND NOT (b.id = ANY($2))
            GROUP BY b.id
            HAVING COUNT(DISTINCT r.id) >= $3
               AND ($4::float8 IS NULL OR AVG(r.rating) >= $4)
            ORDER BY average_rating DESC NULLS LAST,
                     review_count DESC,
                     favorite_count DESC,
                     b.id ASC
            LIMIT $5
            "#,
        )
        .bind(query.genre_ids.as_deref())
        .bind(&exclude)
        .bind(query.min_reviews)
        .bind(query.min_rating)
        .bind(query.limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let book_ids: Vec<BookId> = rows.iter().map(|row| row.id).collect();
        let mut genres = self.genres_for_books(&book_ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| Candidate {
                book: BookSummary {
                    id: row.id,
                    title: row.title,
                    author: row.author,
                    published_year: row.published_year,
                    cover_url: row.cover_url,
                    genres: genres.remove(&row.id).unwrap_or_default(),
                },
                average_rating: row.average_rating,
                review_count: row.review_count,
                favorite_count: row.favorite_count,
            })
            .collect())
    }
}

#[async_trait::async_trait]
impl InteractionStore for PgStore {
    async fn favorited_book_ids(&self, user_id: UserId) -> AppResult<Vec<BookId>> {
        let ids = sqlx::query_scalar::<_, i32>("SELECT book_id FROM favorites WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    async fn reviewed_book_ids(&self, user_id: UserId) -> AppResult<Vec<BookId>> {
        let ids = sqlx::query_scalar::<_, i32>("SELECT book_id FROM reviews WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }
}

#[async_trait::async_trait]
impl FeedbackStore for PgStore {
    async fn insert_feedback(
        &self,
        user_id: UserId,
        feedback: &FeedbackCreate,
    ) -> AppResult<RecommendationFeedback> {
        let row = sqlx::query_as::<_, FeedbackRow>(
            r#"
            INSERT INTO recommendation_feedback
                (user_id, book_id, recommendation_type, is_positive, context_data)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, book_id, recommendation_type, is_positive,
                      context_data, created_at
            "#,
        )
        .bind(user_id)
        .bind(feedback.book_id)
        .bind(feedback.recommendation_type.as_str())
        .bind(feedback.is_positive)
        .bind(feedback.context_data.as_deref())
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn list_feedback(
        &self,
        recommendation_type: Option<RecommendationType>,
    ) -> AppResult<Vec<RecommendationFeedback>> {
        let rows = sqlx::query_as::<_, FeedbackRow>(
            r#"
            SELECT id, user_id, book_id, recommendation_type, is_positive,
                   context_data, created_at
            FROM recommendation_feedback
            WHERE ($1::text IS NULL OR recommendation_type = $1)
            ORDER BY id
            "#,
        )
        .bind(recommendation_type.map(|t| t.as_str()))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(RecommendationFeedback::try_from).collect()
    }

    async fn record_served(
        &self,
        recommendation_type: RecommendationType,
        item_count: i64,
        score_sum: f64,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO recommendation_serves (recommendation_type, served_count, score_sum)
            VALUES ($1, $2, $3)
            ON CONFLICT (recommendation_type) DO UPDATE
            SET served_count = recommendation_serves.served_count + EXCLUDED.served_count,
                score_sum = recommendation_serves.score_sum + EXCLUDED.score_sum
            "#,
        )
        .bind(recommendation_type.as_str())
        .bind(item_count)
        .bind(score_sum)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn served_totals(&self) -> AppResult<Vec<ServedTotals>> {
        let rows = sqlx::query_as::<_, ServedRow>(
            "SELECT recommendation_type, served_count, score_sum FROM recommendation_serves",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> AppResult<ServedTotals> {
                Ok(ServedTotals {
                    recommendation_type: row
                        .recommendation_type
                        .parse()
                        .map_err(AppError::Internal)?,
                    served_count: row.served_count,
                    score_sum: row.score_sum,
                })
            })
            .collect()
    }
}
