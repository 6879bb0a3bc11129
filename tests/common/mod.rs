use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex},
};

use chrono::Utc;
use plottwist_recommender::{
    config::RecommenderConfig,
    db::{CandidateQuery, CatalogStore, FeedbackStore, InteractionStore},
    error::AppResult,
    models::{
        BookId, BookSummary, Candidate, FeedbackCreate, Genre, GenreAffinity, GenreId,
        RecommendationFeedback, RecommendationType, ServedTotals, UserId,
    },
    routes::{create_router, AppState},
    services::RecommendationEngine,
};

#[derive(Default)]
struct Data {
    genres: HashMap<GenreId, String>,
    books: BTreeMap<BookId, (String, Vec<GenreId>)>,
    reviews: Vec<(UserId, BookId, f64)>,
    favorites: Vec<(UserId, BookId)>,
    feedback: Vec<RecommendationFeedback>,
    served: BTreeMap<RecommendationType, (i64, f64)>,
}

/// In-memory catalog with the same query semantics as the Postgres store
#[derive(Default, Clone)]
pub struct MemoryStore {
    data: Arc<Mutex<Data>>,
}

impl MemoryStore {
    pub fn genre(&self, id: GenreId, name: &str) -> &Self {
        self.data.lock().unwrap().genres.insert(id, name.to_string());
        self
    }

    pub fn book(&self, id: BookId, title: &str, genres: &[GenreId]) -> &Self {
        self.data
            .lock()
            .unwrap()
            .books
            .insert(id, (title.to_string(), genres.to_vec()));
        self
    }

    /// Adds `count` reviews of `rating` from distinct reviewers
    pub fn reviews(&self, book_id: BookId, count: usize, rating: f64) -> &Self {
        let mut data = self.data.lock().unwrap();
        for n in 0..count {
            data.reviews.push((1000 + n as UserId, book_id, rating));
        }
        self
    }

    pub fn review_by(&self, user_id: UserId, book_id: BookId, rating: f64) -> &Self {
        self.data.lock().unwrap().reviews.push((user_id, book_id, rating));
        self
    }

    pub fn favorite(&self, user_id: UserId, book_id: BookId) -> &Self {
        self.data.lock().unwrap().favorites.push((user_id, book_id));
        self
    }

    fn summary(data: &Data, id: BookId) -> BookSummary {
        let (title, genre_ids) = &data.books[&id];
        BookSummary {
            id,
            title: title.clone(),
            author: "Test Author".to_string(),
            published_year: None,
            cover_url: None,
            genres: genre_ids
                .iter()
                .map(|gid| Genre {
                    id: *gid,
                    name: data.genres[gid].clone(),
                })
                .collect(),
        }
    }
}

#[async_trait::async_trait]
impl CatalogStore for MemoryStore {
    async fn favorite_genres(&self, user_id: UserId) -> AppResult<Vec<GenreAffinity>> {
        let data = self.data.lock().unwrap();
        let mut counts: BTreeMap<GenreId, i64> = BTreeMap::new();
        for (_, book_id) in data.favorites.iter().filter(|(u, _)| *u == user_id) {
            for gid in &data.books[book_id].1 {
                *counts.entry(*gid).or_default() += 1;
            }
        }

        let mut affinity: Vec<GenreAffinity> = counts
            .into_iter()
            .map(|(id, favorite_count)| GenreAffinity {
                genre: Genre {
                    id,
                    name: data.genres[&id].clone(),
                },
                favorite_count,
            })
            .collect();
        affinity.sort_by(|a, b| b.favorite_count.cmp(&a.favorite_count));
        Ok(affinity)
    }

    async fn candidates(&self, query: &CandidateQuery) -> AppResult<Vec<Candidate>> {
        let data = self.data.lock().unwrap();

        let mut candidates: Vec<Candidate> = data
            .books
            .iter()
            .filter(|(id, (_, genres))| {
                !query.exclude.contains(*id)
                    && query
                        .genre_ids
                        .as_ref()
                        .map_or(true, |wanted| genres.iter().any(|g| wanted.contains(g)))
            })
            .map(|(id, _)| {
                let ratings: Vec<f64> = data
                    .reviews
                    .iter()
                    .filter(|(_, b, _)| b == id)
                    .map(|(_, _, r)| *r)
                    .collect();
                let average_rating = if ratings.is_empty() {
                    None
                } else {
                    Some(ratings.iter().sum::<f64>() / ratings.len() as f64)
                };
                Candidate {
                    book: Self::summary(&data, *id),
                    average_rating,
                    review_count: ratings.len() as i64,
                    favorite_count: data.favorites.iter().filter(|(_, b)| b == id).count() as i64,
                }
            })
            .filter(|c| c.review_count >= query.min_reviews)
            .filter(|c| {
                query
                    .min_rating
                    .map_or(true, |floor| c.average_rating.is_some_and(|r| r >= floor))
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.average_rating
                .unwrap_or(-1.0)
                .total_cmp(&a.average_rating.unwrap_or(-1.0))
                .then(b.review_count.cmp(&a.review_count))
                .then(b.favorite_count.cmp(&a.favorite_count))
                .then(a.book.id.cmp(&b.book.id))
        });
        candidates.truncate(query.limit);
        Ok(candidates)
    }
}

#[async_trait::async_trait]
impl InteractionStore for MemoryStore {
    async fn favorited_book_ids(&self, user_id: UserId) -> AppResult<Vec<BookId>> {
        let data = self.data.lock().unwrap();
        Ok(data
            .favorites
            .iter()
            .filter(|(u, _)| *u == user_id)
            .map(|(_, b)| *b)
            .collect())
    }

    async fn reviewed_book_ids(&self, user_id: UserId) -> AppResult<Vec<BookId>> {
        let data = self.data.lock().unwrap();
        Ok(data
            .reviews
            .iter()
            .filter(|(u, _, _)| *u == user_id)
            .map(|(_, b, _)| *b)
            .collect())
    }
}

#[async_trait::async_trait]
impl FeedbackStore for MemoryStore {
    async fn insert_feedback(
        &self,
        user_id: UserId,
        feedback: &FeedbackCreate,
    ) -> AppResult<RecommendationFeedback> {
        let mut data = self.data.lock().unwrap();
        let row = RecommendationFeedback {
            id: data.feedback.len() as i32 + 1,
            user_id,
            book_id: feedback.book_id,
            recommendation_type: feedback.recommendation_type,
            is_positive: feedback.is_positive,
            context_data: feedback.context_data.clone(),
            created_at: Utc::now(),
        };
        data.feedback.push(row.clone());
        Ok(row)
    }

    async fn list_feedback(
        &self,
        recommendation_type: Option<RecommendationType>,
    ) -> AppResult<Vec<RecommendationFeedback>> {
        let data = self.data.lock().unwrap();
        Ok(data
            .feedback
            .iter()
            .filter(|f| recommendation_type.map_or(true, |t| f.recommendation_type == t))
            .cloned()
            .collect())
    }

    async fn record_served(
        &self,
        recommendation_type: RecommendationType,
        item_count: i64,
        score_sum: f64,
    ) -> AppResult<()> {
        let mut data = self.data.lock().unwrap();
        let entry = data.served.entry(recommendation_type).or_default();
        entry.0 += item_count;
        entry.1 += score_sum;
        Ok(())
    }

    async fn served_totals(&self) -> AppResult<Vec<ServedTotals>> {
        let data = self.data.lock().unwrap();
        Ok(data
            .served
            .iter()
            .map(|(t, (count, sum))| ServedTotals {
                recommendation_type: *t,
                served_count: *count,
                score_sum: *sum,
            })
            .collect())
    }
}

/// A small catalog: user 1 favours fantasy, user 2 has no history
pub fn seeded_store() -> MemoryStore {
    let store = MemoryStore::default();
    store
        .genre(1, "Fantasy")
        .genre(2, "Mystery")
        .genre(3, "Romance")
        .genre(4, "Science Fiction");

    store
        .book(1, "The Hobbit", &[1])
        .book(2, "Mistborn", &[1, 4])
        .book(3, "The Name of the Wind", &[1])
        .book(4, "Gone Girl", &[2])
        .book(5, "Pride and Prejudice", &[3])
        .book(6, "Dune", &[4])
        .book(7, "Good Omens", &[1, 3])
        .book(8, "Unreviewed", &[1]);

    store
        .reviews(1, 10, 4.8)
        .reviews(2, 6, 4.5)
        .reviews(3, 2, 5.0)
        .reviews(4, 120, 4.6)
        .reviews(5, 10, 4.6)
        .reviews(6, 40, 3.9)
        .reviews(7, 4, 4.1);

    store
        .favorite(1, 1)
        .favorite(1, 6)
        .review_by(1, 5, 4.0);

    for user in 100..140 {
        store.favorite(user, 4);
    }
    for user in 100..105 {
        store.favorite(user, 5);
    }

    store
}

pub fn engine(store: &MemoryStore) -> RecommendationEngine {
    let shared = Arc::new(store.clone());
    RecommendationEngine::new(
        shared.clone(),
        shared.clone(),
        shared,
        RecommenderConfig::default(),
    )
}

pub fn app(store: &MemoryStore) -> axum::Router {
    create_router(AppState::new(engine(store)))
}
