//! In-memory movie collection.

use tokio::sync::RwLock;
use uuid::Uuid;

use super::model::{Movie, MovieFilter, Page};

/// Errors raised by [`MovieStore`] writes.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("a movie with id {0} already exists")]
    DuplicateId(String),
}

/// Movie documents kept in insertion order.
///
/// Readers share the lock; every write takes it exclusively for the duration
/// of one operation, so each call is atomic on its own.
#[derive(Debug, Default)]
pub struct MovieStore {
    movies: RwLock<Vec<Movie>>,
}

impl MovieStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `movie`, assigning a fresh id when it has none.
    pub async fn insert(&self, mut movie: Movie) -> Result<Movie, StoreError> {
        if movie.id.is_empty() {
            movie.id = Uuid::new_v4().to_string();
        }
        let mut movies = self.movies.write().await;
        if movies.iter().any(|m| m.id == movie.id) {
            return Err(StoreError::DuplicateId(movie.id));
        }
        movies.push(movie.clone());
        Ok(movie)
    }

    /// Insert a batch. Fails without writing anything if any id collides.
    pub async fn insert_many(&self, batch: Vec<Movie>) -> Result<usize, StoreError> {
        let mut movies = self.movies.write().await;
        let mut pending: Vec<Movie> = Vec::with_capacity(batch.len());
        for mut movie in batch {
            if movie.id.is_empty() {
                movie.id = Uuid::new_v4().to_string();
            }
            let taken = movies.iter().chain(pending.iter()).any(|m| m.id == movie.id);
            if taken {
                return Err(StoreError::DuplicateId(movie.id));
            }
            pending.push(movie);
        }
        let inserted = pending.len();
        movies.extend(pending);
        Ok(inserted)
    }

    pub async fn find_all(&self) -> Vec<Movie> {
        self.movies.read().await.clone()
    }

    /// Movies matching `filter`, windowed by `page`.
    pub async fn find(&self, filter: &MovieFilter, page: Page) -> Vec<Movie> {
        self.movies
            .read()
            .await
            .iter()
            .filter(|m| filter.matches(m))
            .skip(page.skip())
            .take(page.limit())
            .cloned()
            .collect()
    }

    pub async fn count(&self, filter: &MovieFilter) -> usize {
        self.movies.read().await.iter().filter(|m| filter.matches(m)).count()
    }

    pub async fn find_by_id(&self, id: &str) -> Option<Movie> {
        self.movies.read().await.iter().find(|m| m.id == id).cloned()
    }

    /// Apply the set fields of `patch` to the movie with `id` and return the
    /// updated document.
    pub async fn update(&self, id: &str, patch: Movie) -> Option<Movie> {
        let mut movies = self.movies.write().await;
        let movie = movies.iter_mut().find(|m| m.id == id)?;
        movie.merge(patch);
        Some(movie.clone())
    }

    /// Remove the movie with `id`, returning it.
    pub async fn delete(&self, id: &str) -> Option<Movie> {
        let mut movies = self.movies.write().await;
        let index = movies.iter().position(|m| m.id == id)?;
        Some(movies.remove(index))
    }

    pub async fn len(&self) -> usize {
        self.movies.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.movies.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titled(title: &str, genre: &str) -> Movie {
        Movie {
            title: Some(title.into()),
            genre: Some(genre.into()),
            ..Movie::default()
        }
    }

    #[tokio::test]
    async fn insert_assigns_unique_ids() {
        let store = MovieStore::new();
        let a = store.insert(titled("Heat", "Crime")).await.unwrap();
        let b = store.insert(titled("Heat", "Crime")).await.unwrap();
        assert!(!a.id.is_empty());
        assert_ne!(a.id, b.id);
        assert!(Uuid::parse_str(&a.id).is_ok());
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_id() {
        let store = MovieStore::new();
        let movie = Movie {
            id: "fixed".into(),
            ..Movie::default()
        };
        store.insert(movie.clone()).await.unwrap();
        assert_eq!(
            store.insert(movie).await,
            Err(StoreError::DuplicateId("fixed".into()))
        );
    }

    #[tokio::test]
    async fn insert_many_is_all_or_nothing() {
        let store = MovieStore::new();
        let dup = Movie {
            id: "x".into(),
            ..Movie::default()
        };
        let err = store.insert_many(vec![titled("A", "B"), dup.clone(), dup]).await;
        assert!(err.is_err());
        assert!(store.is_empty().await);

        assert_eq!(store.insert_many(vec![titled("A", "B"), titled("C", "D")]).await, Ok(2));
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn find_filters_then_pages_in_insertion_order() {
        let store = MovieStore::new();
        for i in 0..7 {
            let genre = if i % 2 == 0 { "Drama" } else { "Comedy" };
            store.insert(titled(&format!("m{i}"), genre)).await.unwrap();
        }
        let drama = MovieFilter {
            genre: Some("drama".into()),
            ..MovieFilter::default()
        };
        assert_eq!(store.count(&drama).await, 4);

        let page = Page { number: 2, limit: 3 };
        let titles: Vec<_> = store
            .find(&drama, page)
            .await
            .into_iter()
            .filter_map(|m| m.title)
            .collect();
        assert_eq!(titles, vec!["m6"]);

        let everything = store.find(&MovieFilter::default(), Page { number: 1, limit: 100 }).await;
        assert_eq!(everything.len(), 7);
        assert_eq!(everything, store.find_all().await);
    }

    #[tokio::test]
    async fn update_merges_and_delete_removes() {
        let store = MovieStore::new();
        let heat = store.insert(titled("Heat", "Crime")).await.unwrap();

        let patch = Movie {
            is_fav: Some(true),
            ..Movie::default()
        };
        let updated = store.update(&heat.id, patch).await.unwrap();
        assert_eq!(updated.is_fav, Some(true));
        assert_eq!(updated.title.as_deref(), Some("Heat"));
        assert_eq!(store.find_by_id(&heat.id).await, Some(updated.clone()));

        assert!(store.update("missing", Movie::default()).await.is_none());
        assert_eq!(store.delete(&heat.id).await, Some(updated));
        assert!(store.delete(&heat.id).await.is_none());
        assert!(store.find_by_id(&heat.id).await.is_none());
    }
}
