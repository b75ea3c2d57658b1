//! Resolver boundary mapping against a mocked HTTP bridge.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{HttpClient, HttpRequest, HttpResponse, HttpStreamResponse};
use bytes::Bytes;
use core_library::VideoId;
use core_playback::{Backoff, FetchPolicy, PlaybackError, RetryFetch, SourceResolver};
use mockall::{mock, Sequence};
use provider_youtube::{AgatzConversionResolver, YtdlpStreamResolver};
use tokio_util::sync::CancellationToken;

mock! {
    HttpClient {}

    #[async_trait]
    impl HttpClient for HttpClient {
        async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        async fn execute_stream(&self, request: HttpRequest) -> BridgeResult<HttpStreamResponse>;
    }
}

fn reply(status: u16, body: &'static str) -> BridgeResult<HttpResponse> {
    Ok(HttpResponse {
        status,
        headers: HashMap::new(),
        body: Bytes::from_static(body.as_bytes()),
    })
}

fn fetch(mock: MockHttpClient) -> RetryFetch {
    RetryFetch::new(Arc::new(mock))
}

fn conversion_policy() -> FetchPolicy {
    FetchPolicy {
        max_attempts: 3,
        attempt_timeout: Duration::from_secs(25),
        backoff: Backoff::Fixed(Duration::from_secs(25)),
    }
}

#[tokio::test]
async fn test_stream_resolver_request_shape() {
    let mut mock_http = MockHttpClient::new();
    mock_http
        .expect_execute()
        .withf(|req| {
            req.url
                == "https://ytdlpyton.nvlgroup.my.id/download/audio?url=https%3A%2F%2Fyoutube.com%2Fwatch%3Fv%3DdQw4w9WgXcQ&mode=Url"
                && req.headers.get("Accept").map(String::as_str) == Some("application/json")
        })
        .times(1)
        .returning(|_| reply(200, r#"{"status":"Success","download_url":"https://cdn/x.m4a"}"#));

    let resolver = YtdlpStreamResolver::new(fetch(mock_http), FetchPolicy::default());
    let resolved = resolver
        .resolve(&VideoId::from("dQw4w9WgXcQ"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(resolved.candidates.len(), 1);
    assert_eq!(resolved.candidates[0].url, "https://cdn/x.m4a");
}

#[tokio::test]
async fn test_stream_resolver_rejects_non_success_status() {
    let mut mock_http = MockHttpClient::new();
    mock_http
        .expect_execute()
        .times(1)
        .returning(|_| reply(200, r#"{"status":"Error","download_url":null}"#));

    let resolver = YtdlpStreamResolver::new(fetch(mock_http), FetchPolicy::default());
    let err = resolver
        .resolve(&VideoId::from("abc"), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, PlaybackError::Resolution { ref video_id, .. } if video_id == "abc"));
}

#[tokio::test]
async fn test_conversion_resolver_picks_best_quality() {
    let mut mock_http = MockHttpClient::new();
    mock_http
        .expect_execute()
        .withf(|req| req.url == "https://api.agatz.xyz/api/ytmp3?url=https://youtube.com/watch?v=abc")
        .times(1)
        .returning(|_| {
            reply(
                200,
                r#"{"status":200,"data":[
                    {"quality":"128kbps","downloadUrl":"https://dl/128"},
                    {"quality":"320","downloadUrl":"https://dl/320"},
                    {"quality":320,"downloadUrl":"https://dl/320-dup"},
                    {"quality":"64"}
                ]}"#,
            )
        });

    let resolver = AgatzConversionResolver::new(fetch(mock_http), conversion_policy());
    let id = VideoId::from("abc");
    let resolved = resolver.resolve(&id, &CancellationToken::new()).await.unwrap();

    // The entry without a URL is dropped
    assert_eq!(resolved.candidates.len(), 3);
    assert_eq!(resolved.best(&id).unwrap().url, "https://dl/320");
}

#[tokio::test]
async fn test_conversion_resolver_rejects_bad_status() {
    let mut mock_http = MockHttpClient::new();
    mock_http
        .expect_execute()
        .times(1)
        .returning(|_| reply(200, r#"{"status":500,"data":[]}"#));

    let resolver = AgatzConversionResolver::new(fetch(mock_http), conversion_policy());
    let err = resolver
        .resolve(&VideoId::from("abc"), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, PlaybackError::Resolution { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_conversion_retries_with_fixed_delay() {
    let mut mock_http = MockHttpClient::new();
    let mut seq = Sequence::new();
    mock_http
        .expect_execute()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| reply(429, ""));
    mock_http
        .expect_execute()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| reply(200, r#"{"status":200,"data":[{"quality":128,"downloadUrl":"https://dl/128"}]}"#));

    let resolver = AgatzConversionResolver::new(fetch(mock_http), conversion_policy());
    let started = tokio::time::Instant::now();
    let resolved = resolver
        .resolve(&VideoId::from("abc"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(resolved.candidates[0].quality, Some(128));
    assert_eq!(started.elapsed(), Duration::from_secs(25));
}

#[tokio::test(start_paused = true)]
async fn test_network_exhaustion_is_not_a_resolution_error() {
    let mut mock_http = MockHttpClient::new();
    mock_http
        .expect_execute()
        .times(3)
        .returning(|_| reply(503, ""));

    let resolver = YtdlpStreamResolver::new(fetch(mock_http), FetchPolicy::default());
    let err = resolver
        .resolve(&VideoId::from("abc"), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, PlaybackError::Network { attempts: 3, .. }));
}
