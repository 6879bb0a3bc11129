use serde::{Deserialize, Serialize};

pub type UserId = i32;
pub type BookId = i32;
pub type GenreId = i32;

/// A genre tag attached to catalog books
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Genre {
    pub id: GenreId,
    pub name: String,
}

/// Book reference returned inside a recommendation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookSummary {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub published_year: Option<i32>,
    pub cover_url: Option<String>,
    pub genres: Vec<Genre>,
}

/// A catalog book plus the aggregate quality signals used for ranking
///
/// Sourced per request from the catalog store and never mutated here.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub book: BookSummary,
    /// Mean rating over existing reviews, `None` when the book has no reviews
    pub average_rating: Option<f64>,
    pub review_count: i64,
    pub favorite_count: i64,
}

impl Candidate {
    pub fn id(&self) -> BookId {
        self.book.id
    }

    pub fn genre_ids(&self) -> impl Iterator<Item = GenreId> + '_ {
        self.book.genres.iter().map(|g| g.id)
    }
}

/// A genre the user favours, with how many of their favorites carry it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenreAffinity {
    pub genre: Genre,
    pub favorite_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_genre_ids_follow_tag_order() {
        let candidate = Candidate {
            book: BookSummary {
                id: 7,
                title: "Dune".to_string(),
                author: "Frank Herbert".to_string(),
                published_year: Some(1965),
                cover_url: None,
                genres: vec![
                    Genre { id: 3, name: "Science Fiction".to_string() },
                    Genre { id: 1, name: "Classics".to_string() },
                ],
            },
            average_rating: Some(4.4),
            review_count: 12,
            favorite_count: 4,
        };

        assert_eq!(candidate.id(), 7);
        assert_eq!(candidate.genre_ids().collect::<Vec<_>>(), vec![3, 1]);
    }

    #[test]
    fn test_book_summary_serializes_genres() {
        let book = BookSummary {
            id: 1,
            title: "Emma".to_string(),
            author: "Jane Austen".to_string(),
            published_year: None,
            cover_url: None,
            genres: vec![Genre { id: 2, name: "Romance".to_string() }],
        };

        let json = serde_json::to_value(&book).unwrap();
        assert_eq!(json["genres"][0]["name"], "Romance");
        assert!(json["published_year"].is_null());
    }
}
