use pagesplit_http::{HttpClient, HttpError, RequestOpts};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn returns_decoded_body_on_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/article"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html; charset=utf-8")
                .set_body_string("<html><body><p>こんにちは</p></body></html>"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new().unwrap();
    let body = client
        .get_text(&format!("{}/article", server.uri()), RequestOpts::default())
        .await
        .unwrap();
    assert!(body.contains("こんにちは"));
}

#[tokio::test]
async fn non_success_status_is_an_error_and_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new().unwrap();
    let err = client
        .get_text(&format!("{}/gone", server.uri()), RequestOpts::default())
        .await
        .unwrap_err();
    match err {
        HttpError::Status { status, .. } => assert_eq!(status.as_u16(), 503),
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn slow_server_hits_the_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("late")
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let client = HttpClient::new()
        .unwrap()
        .with_timeout(Duration::from_millis(50));
    let err = client
        .get_text(&server.uri(), RequestOpts::default())
        .await
        .unwrap_err();
    assert!(matches!(err, HttpError::Timeout(_)), "got {err:?}");
}

#[tokio::test]
async fn relative_url_is_rejected() {
    let client = HttpClient::new().unwrap();
    let err = client
        .get_text("/no-host", RequestOpts::default())
        .await
        .unwrap_err();
    assert!(matches!(err, HttpError::Url(_)));
}
