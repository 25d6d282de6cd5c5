//! End-to-end integration tests
//!
//! Scan a library, serve it through the router and stream tracks, all
//! against the fake tools from the fixtures.

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures_util::StreamExt;
use serde_json::json;
use std::collections::HashSet;
use std::time::Duration;
use tower::util::ServiceExt;

use crate::http::create_router;
use crate::index::CatalogSource;
use crate::integration::fixtures::{id_of, TestLibrary, PASSWORD};
use crate::transcode::EncodeStream;

fn get(uri: &str) -> Request<Body> {
    let credentials = STANDARD.encode(format!("listener:{}", PASSWORD));
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Basic {}", credentials))
        .body(Body::empty())
        .unwrap()
}

async fn collect(mut stream: EncodeStream) -> Vec<u8> {
    let mut body = Vec::new();
    while let Some(chunk) = stream.next().await {
        body.extend_from_slice(&chunk.unwrap());
    }
    body
}

fn ogg(content: &str) -> Vec<u8> {
    let mut expected = b"OggS".to_vec();
    expected.extend_from_slice(content.as_bytes());
    expected
}

#[test]
fn test_scan_keeps_only_audio_files() {
    let library = TestLibrary::new();
    library.add_song("a.flac", "alpha", "Alpha");
    library.add_song("albums/one/b.mp3", "bravo", "Bravo");
    library.add_track(
        "cover.jpg",
        "jpeg",
        json!({ "streams": [{ "codec_type": "video", "codec_name": "mjpeg" }] }),
        json!({ "format": {} }),
    );
    library.add_file("notes.txt", "not music");

    let (catalog, source) = library.open_catalog();
    match source {
        CatalogSource::Scanned(summary) => {
            assert_eq!(summary.files_seen, 4);
            assert_eq!(summary.tracks_added, 2);
            assert_eq!(summary.files_skipped, 2);
        }
        CatalogSource::Snapshot => panic!("expected a fresh scan"),
    }
    let paths: HashSet<_> = catalog.songs.values().map(|t| t.path.as_str()).collect();
    assert_eq!(paths, HashSet::from(["a.flac", "albums/one/b.mp3"]));
    assert!(library.snapshot.exists());

    // the second start reuses the snapshot and its IDs
    let (reloaded, source) = library.open_catalog();
    assert!(matches!(source, CatalogSource::Snapshot));
    assert_eq!(reloaded.songs, catalog.songs);
}

#[test]
fn test_non_utf8_file_names_are_not_cataloged() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let library = TestLibrary::new();
    library.add_song("a.flac", "alpha", "Alpha");

    // the inspector would accept this file if it were asked
    let name = OsStr::from_bytes(b"caf\xe9.flac");
    std::fs::write(library.root.join(name), "latin-1").unwrap();
    let audio = serde_json::to_vec(&json!({ "streams": [{ "codec_type": "audio" }] })).unwrap();
    let mut sidecar = name.to_os_string();
    sidecar.push(".streams.json");
    std::fs::write(library.meta.join(&sidecar), &audio).unwrap();
    let mut sidecar = name.to_os_string();
    sidecar.push(".format.json");
    std::fs::write(library.meta.join(&sidecar), br#"{ "format": {} }"#).unwrap();

    let (catalog, source) = library.open_catalog();
    match source {
        CatalogSource::Scanned(summary) => {
            assert_eq!(summary.files_seen, 2);
            assert_eq!(summary.files_skipped, 1);
        }
        CatalogSource::Snapshot => panic!("expected a fresh scan"),
    }
    assert_eq!(catalog.len(), 1);
    for track in catalog.songs.values() {
        assert!(catalog.source_path(track).is_file(), "{}", track.path);
    }
}

#[test]
fn test_last_stream_tag_wins() {
    let library = TestLibrary::new();
    library.add_track(
        "a.flac",
        "alpha",
        json!({ "streams": [
            { "codec_type": "audio", "tags": { "title": "First", "genre": "Jazz" } },
            { "codec_type": "audio", "tags": { "title": "Second", "track": 3 } }
        ] }),
        json!({ "format": { "tags": { "title": "Container", "album": "Album" } } }),
    );

    let (catalog, _) = library.open_catalog();
    let track = catalog.get(&id_of(&catalog, "a.flac")).unwrap();
    assert_eq!(track.tags["title"], "Second");
    assert_eq!(track.tags["album"], "Album");
    assert_eq!(track.tags["genre"], "Jazz");
    assert_eq!(track.tags["track"], "3");
}

#[tokio::test]
async fn test_catalog_endpoint() {
    let library = TestLibrary::new();
    library.add_song("a.flac", "alpha", "Alpha");
    let state = library.state(2);
    let id = id_of(&state.catalog, "a.flac");
    let app = create_router(state);

    let response = app.oneshot(get("/songs")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["songs"][&id]["path"], "a.flac");
    assert_eq!(json["songs"][&id]["tags"]["title"], "Alpha");
    assert_eq!(json["library"], library.root.to_str().unwrap());
}

#[tokio::test]
async fn test_stream_opus() {
    let library = TestLibrary::new();
    library.add_song("a.flac", "alpha", "Alpha");
    let state = library.state(2);
    let id = id_of(&state.catalog, "a.flac");
    let app = create_router(state);

    let response = app
        .oneshot(get(&format!("/songs/{}.opus", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/ogg");
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(body.to_vec(), ogg("alpha"));

    let calls = library.encoder_calls();
    assert_eq!(calls.len(), 1);
    let expected_input = library.root.join("a.flac");
    assert!(calls[0].contains(&format!("-i {}", expected_input.display())));
    assert!(calls[0].ends_with("-c opus -compression_level 10 -f opus -"));
}

#[tokio::test]
async fn test_stream_mp3() {
    let library = TestLibrary::new();
    library.add_song("a.flac", "alpha", "Alpha");
    let state = library.state(2);
    let id = id_of(&state.catalog, "a.flac");
    let app = create_router(state);

    let response = app
        .oneshot(get(&format!("/songs/{}.mp3", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/mpeg");
    to_bytes(response.into_body(), usize::MAX).await.unwrap();

    assert!(library.encoder_calls()[0].ends_with("-c libmp3lame -q 0 -f mp3 -"));
}

#[tokio::test]
async fn test_stream_rejections_start_no_encoder() {
    let library = TestLibrary::new();
    library.add_song("a.flac", "alpha", "Alpha");
    let state = library.state(2);
    let id = id_of(&state.catalog, "a.flac");
    let app = create_router(state);

    let cases = [
        (format!("/songs/{}.xyz", id), StatusCode::BAD_REQUEST),
        (format!("/songs/{}", id), StatusCode::NOT_FOUND),
        ("/songs/zzzzzzzz.opus".to_string(), StatusCode::NOT_FOUND),
    ];
    for (uri, expected) in cases {
        let response = app.clone().oneshot(get(&uri)).await.unwrap();
        assert_eq!(response.status(), expected, "{}", uri);
    }
    assert!(library.encoder_calls().is_empty());
}

#[tokio::test]
async fn test_concurrent_streams_do_not_interleave() {
    let library = TestLibrary::new();
    let first = "a".repeat(256 * 1024);
    let second = "b".repeat(256 * 1024);
    library.add_song("first.flac", &first, "First");
    library.add_song("second.flac", &second, "Second");
    let state = library.state(4);
    let first_id = id_of(&state.catalog, "first.flac");
    let second_id = id_of(&state.catalog, "second.flac");
    let app = create_router(state);

    let fetch = |uri: String| {
        let app = app.clone();
        async move {
            let response = app.oneshot(get(&uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            to_bytes(response.into_body(), usize::MAX).await.unwrap()
        }
    };

    let (a, b) = tokio::join!(
        fetch(format!("/songs/{}.opus", first_id)),
        fetch(format!("/songs/{}.mp3", second_id)),
    );
    assert_eq!(a.to_vec(), ogg(&first));
    assert_eq!(b.to_vec(), ogg(&second));
}

#[tokio::test]
async fn test_dropping_one_stream_leaves_the_other() {
    let library = TestLibrary::new();
    library.add_song("slow.flac", "never sent", "Slow");
    library.add_song("a.flac", "alpha", "Alpha");
    let state = library.state(4);
    let slow_id = id_of(&state.catalog, "slow.flac");
    let id = id_of(&state.catalog, "a.flac");

    let (_, mut slow) = state.open_stream(&format!("{}.opus", slow_id)).await.unwrap();
    let (_, other) = state.open_stream(&format!("{}.opus", id)).await.unwrap();

    let magic = slow.next().await.unwrap().unwrap();
    assert_eq!(&magic[..], b"OggS");
    drop(slow);

    assert_eq!(collect(other).await, ogg("alpha"));
    // the dropped stream's slot is free again
    assert_eq!(state.transcoder.available_permits(), 4);
}

#[tokio::test]
async fn test_encoder_failure_aborts_body() {
    let library = TestLibrary::new();
    library.add_song("fail.flac", "charlie", "Fail");
    let state = library.state(2);
    let id = id_of(&state.catalog, "fail.flac");
    let app = create_router(state);

    let response = app
        .oneshot(get(&format!("/songs/{}.opus", id)))
        .await
        .unwrap();
    // headers were already sent when the encoder died
    assert_eq!(response.status(), StatusCode::OK);
    assert!(to_bytes(response.into_body(), usize::MAX).await.is_err());
}

#[tokio::test]
async fn test_transcode_limit() {
    let library = TestLibrary::new();
    library.add_song("slow.flac", "never sent", "Slow");
    library.add_song("a.flac", "alpha", "Alpha");
    let state = library.state(1);
    let slow_id = id_of(&state.catalog, "slow.flac");
    let id = id_of(&state.catalog, "a.flac");
    let file = format!("{}.opus", id);

    let (_, slow) = state.open_stream(&format!("{}.opus", slow_id)).await.unwrap();
    assert_eq!(state.transcoder.available_permits(), 0);

    // a second encode waits while the only slot is taken
    let waiting = tokio::time::timeout(Duration::from_millis(300), state.open_stream(&file)).await;
    assert!(waiting.is_err());

    drop(slow);
    let (_, stream) = tokio::time::timeout(Duration::from_secs(5), state.open_stream(&file))
        .await
        .expect("slot released")
        .unwrap();
    assert_eq!(collect(stream).await, ogg("alpha"));
}
