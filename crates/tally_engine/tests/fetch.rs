use tally_engine::{
    ErrorClass, FailureKind, FetchSettings, Fetcher, OccurrenceCounter, ReqwestFetcher,
    SubstringCounter,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher(settings: FetchSettings) -> ReqwestFetcher {
    ReqwestFetcher::new(settings).expect("client builds")
}

#[tokio::test]
async fn fetcher_returns_body_and_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/doc"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("go gopher go", "text/plain; charset=utf-8"),
        )
        .mount(&server)
        .await;

    let url = format!("{}/doc", server.uri());
    let output = fetcher(FetchSettings::default())
        .fetch(&url)
        .await
        .expect("fetch ok");

    assert_eq!(output.bytes, b"go gopher go");
    assert_eq!(output.metadata.original_url, url);
    assert_eq!(output.metadata.final_url, url);
    assert_eq!(output.metadata.byte_len, 12);
    assert!(output
        .metadata
        .content_type
        .unwrap()
        .starts_with("text/plain"));
}

#[tokio::test]
async fn fetcher_fails_on_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let url = format!("{}/missing", server.uri());
    let err = fetcher(FetchSettings::default())
        .fetch(&url)
        .await
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::HttpStatus(404));
    assert_eq!(err.class(), ErrorClass::Transport);
}

#[tokio::test]
async fn fetcher_rejects_too_large_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/large"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Length", "11")
                .set_body_string("01234567890"),
        )
        .mount(&server)
        .await;

    let settings = FetchSettings {
        max_bytes: Some(10),
        ..FetchSettings::default()
    };
    let url = format!("{}/large", server.uri());
    let err = fetcher(settings).fetch(&url).await.unwrap_err();

    assert_eq!(
        err.kind,
        FailureKind::TooLarge {
            max_bytes: 10,
            actual: Some(11)
        }
    );
    assert_eq!(err.class(), ErrorClass::Read);
}

#[tokio::test]
async fn default_settings_read_large_bodies_in_full() {
    let server = MockServer::start().await;
    let body = "go ".repeat(2_200_000);
    Mock::given(method("GET"))
        .and(path("/big"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.clone()))
        .mount(&server)
        .await;

    let url = format!("{}/big", server.uri());
    let output = fetcher(FetchSettings::default())
        .fetch(&url)
        .await
        .expect("large body is not capped");

    assert!(output.bytes.len() > 6 * 1024 * 1024);
    assert_eq!(output.metadata.byte_len, body.len() as u64);
    assert_eq!(SubstringCounter::new("go").count(&output.bytes), 2_200_000);
}

#[tokio::test]
async fn fetcher_follows_redirects_and_records_final_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/new"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(ResponseTemplate::new(200).set_body_string("go go"))
        .mount(&server)
        .await;

    let url = format!("{}/old", server.uri());
    let output = fetcher(FetchSettings::default())
        .fetch(&url)
        .await
        .expect("redirect followed");

    assert_eq!(output.bytes, b"go go");
    assert_eq!(output.metadata.original_url, url);
    assert_eq!(output.metadata.final_url, format!("{}/new", server.uri()));
}

#[tokio::test]
async fn fetcher_stops_after_redirect_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/loop"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/loop"))
        .mount(&server)
        .await;

    let settings = FetchSettings {
        redirect_limit: 2,
        ..FetchSettings::default()
    };
    let url = format!("{}/loop", server.uri());
    let err = fetcher(settings).fetch(&url).await.unwrap_err();

    assert_eq!(err.kind, FailureKind::RedirectLimitExceeded);
}

#[tokio::test]
async fn fetcher_reports_invalid_url() {
    let err = fetcher(FetchSettings::default())
        .fetch("not a url")
        .await
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::InvalidUrl);
    assert_eq!(err.class(), ErrorClass::Transport);
}
