use std::time::Duration;

use journal_catalogue::error::FetchError;
use journal_catalogue::fetch::{HttpFetcher, PageFetcher};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher() -> HttpFetcher {
    HttpFetcher::new("Mozilla/5.0", "ru-RU,ru;q=0.9", Duration::from_secs(1)).unwrap()
}

fn query(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

#[tokio::test]
async fn sends_headers_and_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ru/record-sources/"))
        .and(header("user-agent", "Mozilla/5.0"))
        .and(header("accept-language", "ru-RU,ru;q=0.9"))
        .and(query_param("vak", "true"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/ru/record-sources/", server.uri());
    let body = fetcher()
        .fetch(&url, &query(&[("vak", "true"), ("page", "3")]))
        .await
        .unwrap();
    assert_eq!(body, "<html>ok</html>");
}

#[tokio::test]
async fn non_ok_status_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = fetcher().fetch(&server.uri(), &[]).await.unwrap_err();
    assert!(matches!(err, FetchError::Status { status: 503, .. }));
}

#[tokio::test]
async fn only_200_counts_as_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/moved"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let err = fetcher()
        .fetch(&format!("{}/moved", server.uri()), &[])
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Status { status: 204, .. }));
}

#[tokio::test]
async fn slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let err = fetcher().fetch(&server.uri(), &[]).await.unwrap_err();
    assert!(matches!(err, FetchError::Transport { .. }));
}
