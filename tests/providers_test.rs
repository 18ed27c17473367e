//! Payload normalization for each provider, driven through the manager
//! against mocked upstream responses.

mod common;

use common::TestHarness;
use metaforged::metadata::SearchHints;
use metaforged::ContentKind;
use serde_json::json;
use wiremock::matchers::{header, headers, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

// ---------------------------------------------------------------------------
// Music
// ---------------------------------------------------------------------------

#[tokio::test]
async fn musicbrainz_recordings() {
    let user_agent = "metaforged-tests/1.0 (ops@example.org)";
    let h = TestHarness::new(&[("MUSICBRAINZ_USER_AGENT", user_agent)]).await;
    Mock::given(method("GET"))
        .and(path("/musicbrainz/recording"))
        .and(query_param("fmt", "json"))
        .and(query_param("query", "recording:\"Time\" AND artist:\"Hans Zimmer\""))
        .and(header("User-Agent", user_agent))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 2,
            "recordings": [
                {
                    "id": "a3e8c9d0-0000-4000-8000-000000000001",
                    "title": "Time",
                    "score": 100,
                    "artist-credit": [{"name": "Hans Zimmer", "artist": {"name": "Hans Zimmer"}}],
                    "releases": [
                        {"title": "Inception: Deluxe", "date": "2011-05-01"},
                        {"title": "Inception", "date": "2010-07-13"}
                    ],
                    "tags": [{"name": "soundtrack", "count": 3}]
                },
                {
                    "id": "a3e8c9d0-0000-4000-8000-000000000002",
                    "title": "Time (undated bootleg)",
                    "artist-credit": [{"name": "Hans Zimmer"}],
                    "releases": []
                }
            ]
        })))
        .expect(1)
        .mount(&h.server)
        .await;

    let hints = SearchHints::default().with_artist("Hans Zimmer");
    let result = h.manager.search("music", "Time", &hints).await.unwrap();

    assert_eq!(result.source, "musicbrainz");
    // The undated recording has no year and is dropped.
    assert_eq!(result.matches.len(), 1);
    assert_eq!(result.total, 2);

    let track = &result.matches[0].metadata;
    assert_eq!(track.kind, ContentKind::Track);
    assert_eq!(track.year, 2010);
    assert_eq!(track.artist.as_deref(), Some("Hans Zimmer"));
    assert_eq!(track.album.as_deref(), Some("Inception"));
    assert_eq!(track.genres, vec!["soundtrack"]);
    assert_eq!(track.description, None);
}

#[tokio::test]
async fn discogs_releases_with_both_credentials() {
    let h = TestHarness::new(&[
        ("DISCOGS_CONSUMER_KEY", "ck"),
        ("DISCOGS_CONSUMER_SECRET", "cs"),
        ("MUSICBRAINZ_USER_AGENT", "metaforged-tests/1.0"),
    ])
    .await;
    Mock::given(method("GET"))
        .and(path("/musicbrainz/release"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"count": 0, "releases": []})))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/discogs/database/search"))
        .and(query_param("type", "release"))
        .and(headers("Authorization", vec!["Discogs key=ck", "secret=cs"]))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "pagination": {"page": 1, "pages": 1, "items": 1},
            "results": [{
                "id": 2455301,
                "title": "Hans Zimmer - Inception (Music From The Motion Picture)",
                "year": "2010",
                "thumb": "https://i.discogs.com/thumb.jpg",
                "cover_image": "https://i.discogs.com/cover.jpg",
                "genre": ["Stage & Screen"],
                "style": ["Soundtrack", "Score"]
            }]
        })))
        .expect(1)
        .mount(&h.server)
        .await;

    let result = h
        .manager
        .search("musics", "Inception", &SearchHints::kind(ContentKind::Album))
        .await
        .unwrap();

    assert_eq!(result.source, "discogs");
    let album = &result.matches[0].metadata;
    assert_eq!(result.matches[0].id, "discogs_album_2455301");
    assert_eq!(album.artist.as_deref(), Some("Hans Zimmer"));
    assert_eq!(album.title, "Inception (Music From The Motion Picture)");
    assert_eq!(album.year, 2010);
    assert_eq!(album.genres, vec!["Stage & Screen", "Soundtrack", "Score"]);
    assert_eq!(album.thumbnail_url.as_deref(), Some("https://i.discogs.com/thumb.jpg"));
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fanart_movie_artwork() {
    let h = TestHarness::new(&[("FANARTTV_API_KEY", "fanart-key")]).await;
    Mock::given(method("GET"))
        .and(path("/fanarttv/movies/27205"))
        .and(query_param("api_key", "fanart-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "Inception",
            "tmdb_id": "27205",
            "imdb_id": "tt1375666",
            "movieposter": [
                {"id": "1", "url": "https://assets.fanart.tv/movieposter/inception-1.jpg"},
                {"id": "2", "url": "https://assets.fanart.tv/movieposter/inception-2.jpg"}
            ],
            "moviebackground": [
                {"id": "3", "url": "https://assets.fanart.tv/moviebackground/inception.jpg"}
            ]
        })))
        .expect(1)
        .mount(&h.server)
        .await;

    let hints = SearchHints::kind(ContentKind::Movie)
        .with_tmdb_id("27205")
        .with_year(2010);
    let result = h.manager.search("images", "Inception", &hints).await.unwrap();

    assert_eq!(result.source, "fanarttv");
    assert_eq!(result.total, 1);
    let art = &result.matches[0];
    assert_eq!(art.id, "fanarttv_image_27205");
    assert_eq!(art.metadata.year, 2010);
    assert_eq!(
        art.metadata.thumbnail_url.as_deref(),
        Some("https://assets.fanart.tv/movieposter/inception-1.jpg")
    );
    assert_eq!(
        art.metadata.backdrop_url.as_deref(),
        Some("https://assets.fanart.tv/moviebackground/inception.jpg")
    );
}

#[tokio::test]
async fn fanart_without_an_id_makes_no_request() {
    let h = TestHarness::new(&[("FANARTTV_API_KEY", "fanart-key")]).await;

    let result = h
        .manager
        .search("pictures", "Inception", &SearchHints::default().with_year(2010))
        .await;
    assert!(result.is_none());
    assert_eq!(h.request_count().await, 0);
}

// ---------------------------------------------------------------------------
// Books
// ---------------------------------------------------------------------------

#[tokio::test]
async fn openlibrary_search_and_details() {
    let h = TestHarness::new(&[]).await;
    Mock::given(method("GET"))
        .and(path("/openlibrary/search.json"))
        .and(query_param("q", "The Hobbit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "numFound": 754,
            "docs": [
                {
                    "key": "/works/OL262758W",
                    "title": "The Hobbit",
                    "first_publish_year": 1937,
                    "cover_i": 14627509,
                    "subject": ["Fantasy fiction", "Dragons"]
                },
                {"key": "/works/OL1W", "title": "Hobbit notes"}
            ]
        })))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/openlibrary/works/OL262758W.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "key": "/works/OL262758W",
            "title": "The Hobbit",
            "description": {"type": "/type/text", "value": "Bilbo goes there and back again."},
            "covers": [14627509],
            "subjects": ["Fantasy fiction"]
        })))
        .expect(1)
        .mount(&h.server)
        .await;

    let result = h
        .manager
        .search("books", "The Hobbit", &SearchHints::default())
        .await
        .unwrap();
    assert_eq!(result.source, "openlibrary");
    assert_eq!(result.total, 754);
    assert_eq!(result.matches.len(), 1);
    let book = &result.matches[0].metadata;
    assert_eq!(book.source_id, "OL262758W");
    assert_eq!(book.year, 1937);
    assert_eq!(
        book.thumbnail_url.as_deref(),
        Some("https://covers.openlibrary.org/b/id/14627509-M.jpg")
    );

    // Work payloads have no dependable year; the hint fills it in.
    let hints = SearchHints::default().with_year(1937);
    let details = h
        .manager
        .get_details("books", "OL262758W", "openlibrary", &hints)
        .await
        .unwrap();
    assert_eq!(
        details.description.as_deref(),
        Some("Bilbo goes there and back again.")
    );
    assert_eq!(details.year, 1937);
}

#[tokio::test]
async fn comic_searches_skip_openlibrary() {
    let h = TestHarness::new(&[("COMICVINE_API_KEY", "cv-key")]).await;
    Mock::given(method("GET"))
        .and(path("/comicvine/search/"))
        .and(query_param("resources", "volume"))
        .and(query_param("format", "json"))
        .and(query_param("api_key", "cv-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": "OK",
            "status_code": 1,
            "number_of_total_results": 1,
            "results": [{
                "id": 49901,
                "name": "Saga",
                "start_year": "2012",
                "deck": "Space opera from Vaughan and Staples.",
                "image": {
                    "thumb_url": "https://comicvine.gamespot.com/a/thumb/saga.jpg",
                    "super_url": "https://comicvine.gamespot.com/a/super/saga.jpg"
                },
                "resource_type": "volume"
            }]
        })))
        .expect(1)
        .mount(&h.server)
        .await;

    let result = h
        .manager
        .search("comics", "Saga", &SearchHints::kind(ContentKind::Comic))
        .await
        .unwrap();

    assert_eq!(result.source, "comicvine");
    assert_eq!(result.matches[0].id, "comicvine_comic_49901");
    assert_eq!(result.matches[0].metadata.year, 2012);
    // Only Comic Vine was asked.
    assert_eq!(h.request_count().await, 1);
}

#[tokio::test]
async fn comicvine_envelope_errors_are_absences() {
    let h = TestHarness::new(&[("COMICVINE_API_KEY", "revoked")]).await;
    Mock::given(method("GET"))
        .and(path("/comicvine/volume/4050-49901/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": "Invalid API Key",
            "status_code": 100,
            "results": []
        })))
        .expect(1)
        .mount(&h.server)
        .await;

    let details = h
        .manager
        .get_details("books", "49901", "comicvine", &SearchHints::default())
        .await;
    assert!(details.is_none());
}

#[tokio::test]
async fn comicvine_error_envelopes_are_not_cached() {
    let h = TestHarness::new(&[
        ("COMICVINE_API_KEY", "cv-key"),
        ("COMICVINE_RATE_LIMIT", "10/1000"),
    ])
    .await;
    Mock::given(method("GET"))
        .and(path("/comicvine/volume/4050-49901/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": "Rate limit exceeded",
            "status_code": 107,
            "results": []
        })))
        .up_to_n_times(1)
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/comicvine/volume/4050-49901/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": "OK",
            "status_code": 1,
            "results": {"id": 49901, "name": "Saga", "start_year": "2012"}
        })))
        .expect(1)
        .mount(&h.server)
        .await;

    let hints = SearchHints::default();
    let first = h
        .manager
        .get_details("books", "49901", "comicvine", &hints)
        .await;
    assert!(first.is_none());

    // The upstream has recovered; the rejection was not replayed from cache.
    let second = h
        .manager
        .get_details("books", "49901", "comicvine", &hints)
        .await
        .unwrap();
    assert_eq!(second.title, "Saga");
    assert_eq!(h.request_count().await, 2);

    // The successful answer is cached.
    let third = h
        .manager
        .get_details("books", "49901", "comicvine", &hints)
        .await;
    assert!(third.is_some());
    assert_eq!(h.request_count().await, 2);
}

#[tokio::test]
async fn omdb_server_errors_are_not_cached() {
    let h = TestHarness::new(&[("OMDB_API_KEY", "omdb-key")]).await;
    Mock::given(method("GET"))
        .and(path("/omdb"))
        .and(query_param("i", "tt1375666"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Response": "False",
            "Error": "Error getting data."
        })))
        .up_to_n_times(1)
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/omdb"))
        .and(query_param("i", "tt1375666"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Response": "True",
            "imdbID": "tt1375666",
            "Title": "Inception",
            "Year": "2010",
            "Type": "movie"
        })))
        .expect(1)
        .mount(&h.server)
        .await;

    let hints = SearchHints::default();
    let first = h
        .manager
        .get_details("videos", "tt1375666", "omdb", &hints)
        .await;
    assert!(first.is_none());

    let details = h
        .manager
        .get_details("videos", "tt1375666", "omdb", &hints)
        .await
        .unwrap();
    assert_eq!(details.year, 2010);
    assert_eq!(h.request_count().await, 2);
}

#[tokio::test]
async fn omdb_definite_misses_are_cached() {
    let h = TestHarness::new(&[("OMDB_API_KEY", "omdb-key")]).await;
    Mock::given(method("GET"))
        .and(path("/omdb"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Response": "False",
            "Error": "Incorrect IMDb ID."
        })))
        .expect(1)
        .mount(&h.server)
        .await;

    let hints = SearchHints::default();
    for _ in 0..2 {
        let details = h
            .manager
            .get_details("videos", "tt0000000", "omdb", &hints)
            .await;
        assert!(details.is_none());
    }
    assert_eq!(h.request_count().await, 1);
}
