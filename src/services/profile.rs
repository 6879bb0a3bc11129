use std::collections::HashSet;

use crate::{
    db::{CatalogStore, InteractionStore},
    error::AppResult,
    models::{BookId, Genre, UserId},
};

/// Derives the user's affinity set: the most frequent genres across their
/// favorited books, at most `max_genres` of them
///
/// An empty result means the user has no favorites yet. Callers treat that as
/// a signal to fall back, not as an error.
pub async fn extract_affinity(
    catalog: &dyn CatalogStore,
    user_id: UserId,
    max_genres: usize,
) -> AppResult<Vec<Genre>> {
    let mut genres = catalog.favorite_genres(user_id).await?;
    genres.truncate(max_genres);

    tracing::debug!(
        user_id,
        genres = ?genres.iter().map(|g| g.genre.id).collect::<Vec<_>>(),
        "Resolved genre affinity"
    );

    Ok(genres.into_iter().map(|affinity| affinity.genre).collect())
}

/// Books the user already favorited or reviewed, or nothing when exclusion is off
pub async fn build_exclusion_set(
    interactions: &dyn InteractionStore,
    user_id: UserId,
    exclude_user_books: bool,
) -> AppResult<HashSet<BookId>> {
    if !exclude_user_books {
        return Ok(HashSet::new());
    }

    let mut exclusion: HashSet<BookId> = interactions
        .favorited_book_ids(user_id)
        .await?
        .into_iter()
        .collect();
    exclusion.extend(interactions.reviewed_book_ids(user_id).await?);

    Ok(exclusion)
}
