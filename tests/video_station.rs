mod utils;

use serde_json::json;
use syno_station::SynoError;
use syno_station::client::{Capability, SynoClient};
use syno_station::error::ApplicationError;
use syno_station::query::{ListOptions, SortBy, SortDirection};
use syno_station::session::LoginRequest;
use syno_station::video_station::API_STREAMING;
use syno_station::video_station::entities::{PosterKind, StreamFormat, StreamSession};
use tokio_util::sync::CancellationToken;
use utils::{SID, failure, mount_discovery, mount_login, query_order, setup_client, success};
use wiremock::matchers::{method, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn logged_in_video_station() -> (MockServer, SynoClient) {
    let capability = Capability::video_station();
    let (server, client) = setup_client(capability.clone()).await;
    mount_discovery(&server, &capability).await;
    mount_login(&server).await;
    client
        .login(&LoginRequest::new("test", "test123"), &CancellationToken::new())
        .await
        .unwrap();
    (server, client)
}

async fn mount_open(server: &MockServer, format: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(query_param("api", API_STREAMING))
        .and(query_param("method", "open"))
        .and(query_param("file", "{\"id\":300}"))
        .and(query_param("format", format))
        .respond_with(response)
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_close(server: &MockServer, stream_id: &str) {
    Mock::given(method("GET"))
        .and(query_param("api", API_STREAMING))
        .and(query_param("method", "close"))
        .and(query_param("stream_id", stream_id))
        .and(query_param("_sid", SID))
        .respond_with(success(json!(null)))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_require_libraries_fails_when_empty() {
    let (server, client) = logged_in_video_station().await;
    Mock::given(method("GET"))
        .and(query_param("api", "SYNO.VideoStation2.Library"))
        .respond_with(success(json!({ "offset": 0, "total": 0, "libraries": [] })))
        .mount(&server)
        .await;

    let err = client
        .video_station()
        .require_libraries(&CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SynoError::Application(ApplicationError::NoVideoLibraries)
    ));
}

#[tokio::test]
async fn test_list_movies_modifier_order() {
    let (server, client) = logged_in_video_station().await;
    Mock::given(method("GET"))
        .and(query_param("api", "SYNO.VideoStation2.Movie"))
        .and(query_order([
            "api",
            "version",
            "method",
            "library_id",
            "offset",
            "limit",
            "sort_by",
            "sort_direction",
            "additional",
            "_sid",
        ]))
        .and(query_param("version", "1"))
        .and(query_param("sort_by", "original_available"))
        .and(query_param("sort_direction", "desc"))
        .respond_with(success(json!({
            "offset": 0,
            "total": 1,
            "movies": [{ "id": 42, "title": "Alien", "mapper_id": 99 }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let options = ListOptions::page(0, 50).sorted(SortBy::ReleaseDate, SortDirection::Desc);
    let movies = client
        .video_station()
        .list_movies(0, &options, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(movies.movies[0].title, "Alien");
}

#[tokio::test]
async fn test_invalid_limit_is_rejected() {
    let (_server, client) = logged_in_video_station().await;
    let err = client
        .video_station()
        .list_tv_shows(0, &ListOptions::page(0, 0), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, SynoError::InvalidArgument(_)));
}

#[tokio::test]
async fn test_with_stream_reads_media_and_closes() {
    let (server, client) = logged_in_video_station().await;
    mount_open(&server, "hls", success(json!({ "stream_id": "s1", "format": "hls" }))).await;
    Mock::given(method("GET"))
        .and(query_param("method", "stream"))
        .and(query_param("stream_id", "s1"))
        .and(query_param("format", "hls"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "video/mp2t")
                .set_body_bytes(b"media-bytes".to_vec()),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_close(&server, "s1").await;

    let token = CancellationToken::new();
    let cancel = &token;
    let video = client.video_station();
    let bytes = video
        .with_stream(300, StreamFormat::Hls, cancel, |session| async move {
            video.stream(&session, cancel).await?.bytes(cancel).await
        })
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"media-bytes");
}

#[tokio::test]
async fn test_with_stream_closes_after_consumer_error() {
    let (server, client) = logged_in_video_station().await;
    mount_open(&server, "raw", success(json!({ "stream_id": "s2", "format": "raw" }))).await;
    mount_close(&server, "s2").await;

    let err = client
        .video_station()
        .with_stream(300, StreamFormat::Raw, &CancellationToken::new(), |_| async {
            Err::<(), _>(SynoError::InvalidArgument("player failed".into()))
        })
        .await
        .unwrap_err();
    assert!(matches!(err, SynoError::InvalidArgument(_)));
}

#[tokio::test]
async fn test_with_stream_closes_after_cancellation() {
    let (server, client) = logged_in_video_station().await;
    mount_open(&server, "raw", success(json!({ "stream_id": "s3", "format": "raw" }))).await;
    mount_close(&server, "s3").await;

    let cancel = CancellationToken::new();
    let err = client
        .video_station()
        .with_stream(300, StreamFormat::Raw, &cancel, |_| async {
            cancel.cancel();
            Err::<(), _>(SynoError::Canceled)
        })
        .await
        .unwrap_err();
    assert!(err.is_canceled());
}

#[tokio::test]
async fn test_open_falls_back_to_raw() {
    let (server, client) = logged_in_video_station().await;
    mount_open(&server, "hls", failure(1201)).await;
    mount_open(&server, "raw", success(json!({ "stream_id": "s4", "format": "raw" }))).await;

    let session = client
        .video_station()
        .open_with_fallback(300, StreamFormat::Hls, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(session.stream_id, "s4");
    assert_eq!(session.format, StreamFormat::Raw);
}

#[tokio::test]
async fn test_raw_open_failure_is_not_retried() {
    let (server, client) = logged_in_video_station().await;
    mount_open(&server, "raw", failure(1200)).await;

    let err = client
        .video_station()
        .open_with_fallback(300, StreamFormat::Raw, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.protocol_code(), Some(1200));
}

#[tokio::test]
async fn test_stream_request_carries_session() {
    let (_server, client) = logged_in_video_station().await;
    let session: StreamSession =
        serde_json::from_value(json!({ "stream_id": "s5", "format": "hls_remux" })).unwrap();

    let request = client
        .video_station()
        .stream_request(&session, &CancellationToken::new())
        .await
        .unwrap();
    let query = request.url().query().unwrap();
    assert!(query.ends_with(&format!("stream_id=s5&format=hls_remux&_sid={SID}")));
}

#[tokio::test]
async fn test_poster_streams_image() {
    let (server, client) = logged_in_video_station().await;
    Mock::given(method("GET"))
        .and(query_param("api", "SYNO.VideoStation2.Poster"))
        .and(query_param("id", "42"))
        .and(query_param("type", "movie"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/jpeg")
                .set_body_bytes(b"\xFF\xD8\xFF".to_vec()),
        )
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let poster = client
        .video_station()
        .poster(PosterKind::Movie, 42, &cancel)
        .await
        .unwrap();
    assert_eq!(poster.content_type(), Some("image/jpeg"));
    let bytes = poster.bytes(&cancel).await.unwrap();
    assert_eq!(&bytes[..], b"\xFF\xD8\xFF");
}

#[tokio::test]
async fn test_backdrop_envelope_is_an_error() {
    let (server, client) = logged_in_video_station().await;
    Mock::given(method("GET"))
        .and(query_param("api", "SYNO.VideoStation2.Backdrop"))
        .and(query_param("mapper_id", "99"))
        .respond_with(failure(1001))
        .mount(&server)
        .await;

    let err = client
        .video_station()
        .backdrop(99, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.protocol_code(), Some(1001));
}

#[tokio::test]
async fn test_subtitles_and_watch_status() {
    let (server, client) = logged_in_video_station().await;
    Mock::given(method("GET"))
        .and(query_param("api", "SYNO.VideoStation2.Subtitle"))
        .and(query_param("method", "list"))
        .and(query_param("id", "300"))
        .respond_with(success(json!({
            "subtitles": [{ "id": "sub-1", "lang": "eng", "format": "srt", "embedded": false }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("api", "SYNO.VideoStation2.Subtitle"))
        .and(query_param("method", "get"))
        .and(query_param("subtitle_id", "sub-1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/plain")
                .set_body_string("1\n00:00:01,000 --> 00:00:02,000\nHello\n"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("api", "SYNO.VideoStation2.WatchStatus"))
        .and(query_param("method", "setinfo"))
        .and(query_param("id", "300"))
        .and(query_param("position", "120"))
        .respond_with(success(json!(null)))
        .expect(1)
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let video = client.video_station();
    let subtitles = video.list_subtitles(300, &cancel).await.unwrap();
    assert_eq!(subtitles.subtitles[0].lang, "eng");

    let body = video
        .fetch_subtitle(300, &subtitles.subtitles[0].id, &cancel)
        .await
        .unwrap()
        .bytes(&cancel)
        .await
        .unwrap();
    assert!(body.starts_with(b"1\n"));

    video.set_watch_status(300, 120, &cancel).await.unwrap();
}
