//! End-to-end behavior of the `/movies` routes, driven through the router.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use movie_catalog::cache::{CacheStore, ResponseCache};
use movie_catalog::catalog::{self, Catalog, Movie, MoviePage, MovieStore};
use movie_catalog::metadata::{LookupFuture, MetadataError, MetadataLookup, MovieDetails, Unconfigured};
use movie_catalog::{Request, Response, Router, StatusCode};
use serde_json::{Value, json};

struct FakeLookup {
    calls: AtomicUsize,
    details: Option<MovieDetails>,
}

impl MetadataLookup for FakeLookup {
    fn search<'a>(&'a self, _title: &'a str) -> LookupFuture<'a> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let details = self.details.clone();
        Box::pin(async move { Ok::<_, MetadataError>(details) })
    }
}

struct App {
    router: Router,
    cache: Arc<CacheStore>,
}

fn app_with(metadata: Arc<dyn MetadataLookup>, ttl: Duration) -> App {
    let cache = Arc::new(CacheStore::new(ttl));
    let catalog = Arc::new(Catalog::new(MovieStore::new(), metadata));
    let router = catalog::router(catalog, ResponseCache::new(Arc::clone(&cache)));
    App { router, cache }
}

fn app() -> App {
    app_with(Arc::new(Unconfigured), Duration::from_secs(3600))
}

impl App {
    async fn send(&self, method: &str, target: &str, body: Option<Value>) -> Response {
        let body = body.map(|b| b.to_string()).unwrap_or_default();
        let raw = format!(
            "{method} {target} HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        );
        let (req, _) = Request::parse(raw.as_bytes()).unwrap();
        self.router.route(req).await
    }

    async fn get(&self, target: &str) -> Response {
        self.send("GET", target, None).await
    }

    async fn create(&self, movie: Value) -> Movie {
        let res = self.send("POST", "/movies/create-movie", Some(movie)).await;
        assert_eq!(res.status(), StatusCode::Created);
        json_of(&res)
    }
}

fn json_of<T: serde::de::DeserializeOwned>(res: &Response) -> T {
    serde_json::from_slice(res.content()).unwrap()
}

#[tokio::test]
async fn create_then_find_update_delete() {
    let app = app();
    let heat = app
        .create(json!({"title": "Heat", "director": "Michael Mann", "year": 1995, "genre": "Crime"}))
        .await;
    assert_eq!(heat.year.as_deref(), Some("1995"));

    let found = app.get(&format!("/movies/find-movie/{}", heat.id)).await;
    assert_eq!(found.status(), StatusCode::Ok);
    assert_eq!(json_of::<Movie>(&found), heat);

    let updated = app
        .send(
            "PUT",
            &format!("/movies/update-movie/{}", heat.id),
            Some(json!({"_id": "ignored", "genre": "Thriller"})),
        )
        .await;
    assert_eq!(updated.status(), StatusCode::Ok);
    let updated: Movie = json_of(&updated);
    assert_eq!(updated.id, heat.id);
    assert_eq!(updated.genre.as_deref(), Some("Thriller"));
    assert_eq!(updated.title.as_deref(), Some("Heat"));

    let deleted = app
        .send("DELETE", &format!("/movies/delete-movie/{}", heat.id), None)
        .await;
    assert_eq!(deleted.status(), StatusCode::Ok);

    let gone = app.get(&format!("/movies/find-movie/{}", heat.id)).await;
    assert_eq!(gone.status(), StatusCode::NotFound);
    assert_eq!(gone.content(), format!("No Movie with id: {}", heat.id).as_bytes());
}

#[tokio::test]
async fn missing_ids_answer_plain_text_404() {
    let app = app();
    for (method, target) in [
        ("GET", "/movies/find-movie/nope"),
        ("DELETE", "/movies/delete-movie/nope"),
        ("PUT", "/movies/update-movie/nope"),
        ("PUT", "/movies/add-fav/nope"),
    ] {
        let body = (method == "PUT").then(|| json!({}));
        let res = app.send(method, target, body).await;
        assert_eq!(res.status(), StatusCode::NotFound, "{method} {target}");
        assert_eq!(res.content(), b"No Movie with id: nope");
    }
}

#[tokio::test]
async fn bad_create_body_is_409_with_message() {
    let app = app();
    let res = app
        .send("POST", "/movies/create-movie", Some(json!({"year": {"nested": true}})))
        .await;
    assert_eq!(res.status(), StatusCode::Conflict);
    let body: Value = json_of(&res);
    assert!(body["message"].as_str().unwrap().contains("year"));
}

#[tokio::test]
async fn duplicate_id_on_create_is_409() {
    let app = app();
    app.create(json!({"_id": "heat", "title": "Heat"})).await;
    let res = app
        .send("POST", "/movies/create-movie", Some(json!({"_id": "heat"})))
        .await;
    assert_eq!(res.status(), StatusCode::Conflict);
}

#[tokio::test]
async fn listing_is_cached_until_ttl_expires() {
    let app = app();
    app.create(json!({"title": "Heat"})).await;

    let first: Vec<Movie> = json_of(&app.get("/movies/list-movies").await);
    assert_eq!(first.len(), 1);
    assert!(app.cache.contains_key("/movies/list-movies"));

    // Writes do not invalidate; the cached listing is served until it expires.
    app.create(json!({"title": "Alien"})).await;
    let second: Vec<Movie> = json_of(&app.get("/movies/list-movies").await);
    assert_eq!(second, first);
}

#[tokio::test(start_paused = true)]
async fn expired_listing_is_recomputed() {
    let app = app_with(Arc::new(Unconfigured), Duration::from_secs(60));
    app.create(json!({"title": "Heat"})).await;
    app.get("/movies/list-movies").await;
    app.create(json!({"title": "Alien"})).await;

    tokio::time::advance(Duration::from_secs(60)).await;
    let fresh: Vec<Movie> = json_of(&app.get("/movies/list-movies").await);
    assert_eq!(fresh.len(), 2);
}

#[tokio::test]
async fn pagination_payload_and_key_order() {
    let app = app();
    for i in 0..25 {
        app.create(json!({"title": format!("Movie {i}"), "genre": "Drama"})).await;
    }

    let res = app.get("/movies/movies-per-page?page=3&limit=10").await;
    assert_eq!(res.status(), StatusCode::Ok);
    let page: MoviePage = json_of(&res);
    assert_eq!(page.current_page, 3);
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.total_movies, 25);
    assert_eq!(page.movies.len(), 5);
    assert_eq!(page.movies[0].title.as_deref(), Some("Movie 20"));

    app.get("/movies/movies-per-page?limit=10&page=3").await;
    assert!(app.cache.contains_key("/movies/movies-per-page?page=3&limit=10"));
    assert!(app.cache.contains_key("/movies/movies-per-page?limit=10&page=3"));
    assert_eq!(app.cache.len(), 2);
}

#[tokio::test]
async fn genre_and_search_filters() {
    let app = app();
    app.create(json!({"title": "Heat", "director": "Michael Mann", "year": "1995", "country": "USA", "genre": "Crime"})).await;
    app.create(json!({"title": "Alien", "director": "Ridley Scott", "year": "1979", "country": "UK", "genre": "Horror"})).await;
    app.create(json!({"title": "The Insider", "director": "Michael Mann", "year": "1999", "country": "USA", "genre": "Drama"})).await;

    let crime: MoviePage = json_of(&app.get("/movies/movies-genre?genre=CRI").await);
    assert_eq!(crime.total_movies, 1);
    assert_eq!(crime.movies[0].title.as_deref(), Some("Heat"));

    let mann: MoviePage = json_of(&app.get("/movies/search-movies?director=mann&country=usa").await);
    assert_eq!(mann.total_movies, 2);
    assert_eq!(mann.total_pages, 1);

    let year: MoviePage = json_of(&app.get("/movies/search-movies?director=mann&year=1999").await);
    assert_eq!(year.total_movies, 1);
    assert_eq!(year.movies[0].title.as_deref(), Some("The Insider"));

    let none: MoviePage = json_of(&app.get("/movies/search-movies?title=zzz").await);
    assert_eq!(none.total_movies, 0);
    assert_eq!(none.total_pages, 0);
    assert!(none.movies.is_empty());
}

#[tokio::test]
async fn invalid_paging_is_a_cached_404_message() {
    let app = app();
    let first = app.get("/movies/movies-per-page?page=abc").await;
    assert_eq!(first.status(), StatusCode::NotFound);
    let body: Value = json_of(&first);
    assert!(body["message"].as_str().unwrap().contains("page"));

    // The error payload was captured, so the replay comes back as 200.
    let second = app.get("/movies/movies-per-page?page=abc").await;
    assert_eq!(second.status(), StatusCode::Ok);
    assert_eq!(second.content(), first.content());
}

#[tokio::test]
async fn uncached_routes_leave_the_store_alone() {
    let app = app();
    let heat = app.create(json!({"title": "Heat"})).await;
    app.get(&format!("/movies/find-movie/{}", heat.id)).await;
    app.get("/movies/find-movie/missing").await;
    assert!(app.cache.is_empty());
}

#[tokio::test]
async fn add_favorite_copies_metadata() {
    let lookup = Arc::new(FakeLookup {
        calls: AtomicUsize::new(0),
        details: Some(MovieDetails {
            overview: Some("A crew of thieves".into()),
            vote_count: Some(7000),
            vote_average: Some(7.9),
        }),
    });
    let app = app_with(lookup.clone(), Duration::from_secs(3600));
    let heat = app.create(json!({"title": "Heat"})).await;

    let res = app
        .send("PUT", &format!("/movies/add-fav/{}", heat.id), None)
        .await;
    assert_eq!(res.status(), StatusCode::Ok);
    let fav: Movie = json_of(&res);
    assert_eq!(fav.is_fav, Some(true));
    assert_eq!(fav.overview.as_deref(), Some("A crew of thieves"));
    assert_eq!(fav.vote_count, Some(7000));
    assert_eq!(fav.vote_average, Some(7.9));
    assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn add_favorite_failures_are_500_messages() {
    let app = app();
    let heat = app.create(json!({"title": "Heat"})).await;
    let res = app
        .send("PUT", &format!("/movies/add-fav/{}", heat.id), None)
        .await;
    assert_eq!(res.status(), StatusCode::InternalServerError);
    let body: Value = json_of(&res);
    assert_eq!(body["message"], "metadata service is not configured");

    let empty = Arc::new(FakeLookup {
        calls: AtomicUsize::new(0),
        details: None,
    });
    let app = app_with(empty, Duration::from_secs(3600));
    let heat = app.create(json!({"title": "Heat"})).await;
    let res = app
        .send("PUT", &format!("/movies/add-fav/{}", heat.id), None)
        .await;
    assert_eq!(res.status(), StatusCode::InternalServerError);
}

#[tokio::test]
async fn populate_inserts_demo_movies() {
    let app = app();
    let res = app.get("/movies/populate-movies-database").await;
    assert_eq!(res.status(), StatusCode::Ok);
    let summary: Value = json_of(&res);
    let inserted = summary["inserted"].as_u64().unwrap();
    assert!(inserted > 0);

    let all: Vec<Movie> = json_of(&app.get("/movies/list-movies").await);
    assert_eq!(all.len() as u64, inserted);
    assert!(all.iter().all(|m| !m.id.is_empty()));
}

#[tokio::test]
async fn cors_preflight_and_headers() {
    let app = app();
    let raw = "OPTIONS /movies/create-movie HTTP/1.1\r\nOrigin: http://localhost:3000\r\n\r\n";
    let (req, _) = Request::parse(raw.as_bytes()).unwrap();
    let res = app.router.route(req).await;
    assert_eq!(res.status(), StatusCode::NoContent);
    assert_eq!(res.header_value("access-control-allow-origin"), Some("*"));

    let raw = "GET /movies/list-movies HTTP/1.1\r\nOrigin: http://localhost:3000\r\n\r\n";
    let (req, _) = Request::parse(raw.as_bytes()).unwrap();
    let res = app.router.route(req).await;
    assert_eq!(res.status(), StatusCode::Ok);
    assert_eq!(res.header_value("access-control-allow-origin"), Some("*"));
}

#[tokio::test]
async fn unknown_route_is_404() {
    let app = app();
    let res = app.get("/movies/unknown").await;
    assert_eq!(res.status(), StatusCode::NotFound);
}
