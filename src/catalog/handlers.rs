//! Endpoint handlers for `/movies/*`.
//!
//! Every JSON answer goes through [`Context::send_json`] so a cache layer in
//! front of the route can capture it. "Not found" answers for a single movie
//! are plain text and therefore never cached.

use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};

use super::Catalog;
use super::model::{ErrorMessage, Movie, MovieFilter, MoviePage, Page};
use crate::context::Context;
use crate::{Response, StatusCode};

/// Demo documents inserted by [`populate_movies`].
pub const DEMO_MOVIES: &str = include_str!("../../data/movies.json");

fn movie_id(ctx: &Context) -> String {
    ctx.params().get("id").unwrap_or_default().to_owned()
}

fn no_movie(id: &str) -> Response {
    Response::new(StatusCode::NotFound).body(format!("No Movie with id: {id}"))
}

async fn paginate(catalog: &Catalog, ctx: &Context, filter: MovieFilter) -> Response {
    let page = match Page::from_request(ctx.request()) {
        Ok(page) => page,
        Err(e) => return ctx.send_json(StatusCode::NotFound, &ErrorMessage::new(e)),
    };

    let total_movies = catalog.movies.count(&filter).await;
    let movies = catalog.movies.find(&filter, page).await;

    ctx.send_json(
        StatusCode::Ok,
        &MoviePage {
            current_page: page.number,
            total_pages: page.total_pages(total_movies),
            total_movies,
            movies,
        },
    )
}

/// `GET /movies/list-movies`: every movie, unpaginated.
pub async fn list_movies(catalog: Arc<Catalog>, ctx: Context) -> Response {
    let movies = catalog.movies.find_all().await;
    ctx.send_json(StatusCode::Ok, &movies)
}

/// `GET /movies/movies-per-page?page=&limit=`
pub async fn movies_per_page(catalog: Arc<Catalog>, ctx: Context) -> Response {
    paginate(&catalog, &ctx, MovieFilter::default()).await
}

/// `GET /movies/movies-genre?genre=&page=&limit=`
pub async fn movies_by_genre(catalog: Arc<Catalog>, ctx: Context) -> Response {
    let filter = MovieFilter::genre_from(ctx.request());
    paginate(&catalog, &ctx, filter).await
}

/// `GET /movies/search-movies?title=&director=&year=&country=&genre=&page=&limit=`
pub async fn search_movies(catalog: Arc<Catalog>, ctx: Context) -> Response {
    let filter = MovieFilter::search_from(ctx.request());
    paginate(&catalog, &ctx, filter).await
}

pub async fn find_movie(catalog: Arc<Catalog>, ctx: Context) -> Response {
    let id = movie_id(&ctx);
    match catalog.movies.find_by_id(&id).await {
        Some(movie) => ctx.send_json(StatusCode::Ok, &movie),
        None => no_movie(&id),
    }
}

pub async fn create_movie(catalog: Arc<Catalog>, ctx: Context) -> Response {
    let movie: Movie = match ctx.body_json() {
        Ok(movie) => movie,
        Err(e) => return ctx.send_json(StatusCode::Conflict, &ErrorMessage::new(e)),
    };
    match catalog.movies.insert(movie).await {
        Ok(created) => {
            info!(id = %created.id, "movie created");
            ctx.send_json(StatusCode::Created, &created)
        }
        Err(e) => ctx.send_json(StatusCode::Conflict, &ErrorMessage::new(e)),
    }
}

/// `PUT /movies/update-movie/:id`: fields present in the body overwrite the
/// stored ones. The id in the path always wins over one in the body.
pub async fn update_movie(catalog: Arc<Catalog>, ctx: Context) -> Response {
    let id = movie_id(&ctx);
    let patch: Movie = match ctx.body_json() {
        Ok(patch) => patch,
        Err(e) => return ctx.send_json(StatusCode::BadRequest, &ErrorMessage::new(e)),
    };
    match catalog.movies.update(&id, patch).await {
        Some(movie) => ctx.send_json(StatusCode::Ok, &movie),
        None => no_movie(&id),
    }
}

pub async fn delete_movie(catalog: Arc<Catalog>, ctx: Context) -> Response {
    let id = movie_id(&ctx);
    match catalog.movies.delete(&id).await {
        Some(movie) => {
            info!(id = %id, "movie deleted");
            ctx.send_json(StatusCode::Ok, &movie)
        }
        None => no_movie(&id),
    }
}

/// `PUT /movies/add-fav/:id`: mark as favorite and copy the overview and
/// vote statistics of the best metadata match for the title.
pub async fn add_favorite(catalog: Arc<Catalog>, ctx: Context) -> Response {
    let id = movie_id(&ctx);
    let Some(movie) = catalog.movies.find_by_id(&id).await else {
        return no_movie(&id);
    };

    let title = movie.title.unwrap_or_default();
    let details = match catalog.metadata.search(&title).await {
        Ok(Some(details)) => details,
        Ok(None) => {
            let message = ErrorMessage::new(format!("no metadata found for {title:?}"));
            return ctx.send_json(StatusCode::InternalServerError, &message);
        }
        Err(e) => {
            warn!(id = %id, error = %e, "metadata lookup failed");
            return ctx.send_json(StatusCode::InternalServerError, &ErrorMessage::new(e));
        }
    };

    let patch = Movie {
        is_fav: Some(true),
        overview: details.overview,
        vote_count: details.vote_count,
        vote_average: details.vote_average,
        ..Movie::default()
    };
    match catalog.movies.update(&id, patch).await {
        Some(movie) => ctx.send_json(StatusCode::Ok, &movie),
        // Deleted while the lookup was in flight.
        None => no_movie(&id),
    }
}

/// `GET /movies/populate-movies-database`: insert the bundled demo movies.
///
/// Each call inserts a fresh copy with new ids.
pub async fn populate_movies(catalog: Arc<Catalog>, ctx: Context) -> Response {
    let movies: Vec<Movie> = match serde_json::from_str(DEMO_MOVIES) {
        Ok(movies) => movies,
        Err(e) => {
            warn!(error = %e, "bundled demo data is invalid");
            return ctx.send_json(StatusCode::InternalServerError, &ErrorMessage::new(e));
        }
    };
    match catalog.movies.insert_many(movies).await {
        Ok(inserted) => {
            info!(inserted, "all movies added successfully");
            ctx.send_json(
                StatusCode::Ok,
                &json!({ "message": "All movies added successfully", "inserted": inserted }),
            )
        }
        Err(e) => ctx.send_json(StatusCode::InternalServerError, &ErrorMessage::new(e)),
    }
}
