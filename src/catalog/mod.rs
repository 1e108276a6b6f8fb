//! The movie catalog: documents, storage, and the `/movies` endpoints.
//!
//! [`router`] assembles the whole application: logging and CORS for every
//! request, and the response cache in front of the four listing endpoints.

use std::future::Future;
use std::sync::Arc;

pub mod handlers;
pub mod model;
pub mod store;

pub use model::{ErrorMessage, Movie, MovieFilter, MoviePage, Page, PageError};
pub use store::{MovieStore, StoreError};

use crate::cache::ResponseCache;
use crate::context::Context;
use crate::metadata::MetadataLookup;
use crate::middleware::{LoggerMiddleware, from_middleware};
use crate::router::IntoHandler;
use crate::security::CorsMiddleware;
use crate::{Response, Router};

/// Shared state of the catalog endpoints.
pub struct Catalog {
    movies: MovieStore,
    metadata: Arc<dyn MetadataLookup>,
}

impl Catalog {
    pub fn new(movies: MovieStore, metadata: Arc<dyn MetadataLookup>) -> Self {
        Self { movies, metadata }
    }

    pub fn movies(&self) -> &MovieStore {
        &self.movies
    }
}

// Bind a handler taking the catalog to a plain `Context` handler.
fn bind<F, Fut>(catalog: &Arc<Catalog>, handler: F) -> impl IntoHandler
where
    F: Fn(Arc<Catalog>, Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    let catalog = Arc::clone(catalog);
    move |ctx: Context| handler(Arc::clone(&catalog), ctx)
}

/// Register the `/movies` routes on `router`. The listing endpoints are
/// wrapped by `cache`.
pub fn mount(router: &mut Router, catalog: &Arc<Catalog>, cache: ResponseCache) {
    let cached = vec![from_middleware(Arc::new(cache))];

    router.put("/movies/add-fav/:id", bind(catalog, handlers::add_favorite));
    router.get_with(
        "/movies/movies-genre",
        cached.clone(),
        bind(catalog, handlers::movies_by_genre),
    );
    router.get_with(
        "/movies/movies-per-page",
        cached.clone(),
        bind(catalog, handlers::movies_per_page),
    );
    router.get_with(
        "/movies/search-movies",
        cached.clone(),
        bind(catalog, handlers::search_movies),
    );
    router.delete("/movies/delete-movie/:id", bind(catalog, handlers::delete_movie));
    router.put("/movies/update-movie/:id", bind(catalog, handlers::update_movie));
    router.get("/movies/find-movie/:id", bind(catalog, handlers::find_movie));
    router.post("/movies/create-movie", bind(catalog, handlers::create_movie));
    router.get_with(
        "/movies/list-movies",
        cached,
        bind(catalog, handlers::list_movies),
    );
    router.get(
        "/movies/populate-movies-database",
        bind(catalog, handlers::populate_movies),
    );
}

/// The full application router: request logging, permissive CORS, and the
/// catalog routes.
pub fn router(catalog: Arc<Catalog>, cache: ResponseCache) -> Router {
    let mut router = Router::new();
    router.layer(from_middleware(Arc::new(LoggerMiddleware)));
    router.layer(from_middleware(Arc::new(CorsMiddleware::permissive())));
    mount(&mut router, &catalog, cache);
    router
}
