use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures_util::{stream::BoxStream, StreamExt, TryStreamExt};
use reqwest::Client;

use super::error::FetchError;

pub type ByteStream = BoxStream<'static, Result<Bytes, FetchError>>;

/// Source of original images.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Starts a GET for `url` and hands back the body as it arrives.
    async fn open(&self, url: &str) -> Result<ByteStream, FetchError>;
}

pub struct HttpUpstream {
    client: Client,
}

impl HttpUpstream {
    pub fn new(timeout: Option<Duration>) -> anyhow::Result<HttpUpstream> {
        let mut c = reqwest::ClientBuilder::new();

        if let Some(timeout) = timeout {
            c = c.timeout(timeout);
        }

        let client = c.build().context("building upstream http client")?;
        Ok(HttpUpstream { client })
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn open(&self, url: &str) -> Result<ByteStream, FetchError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(FetchError::Request)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        Ok(resp.bytes_stream().map_err(FetchError::Body).boxed())
    }
}

/// Drains `stream` into memory, giving up once more than `limit` bytes
/// have arrived.
pub async fn collect_body(mut stream: ByteStream, limit: u64) -> Result<Bytes, FetchError> {
    let mut body = BytesMut::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if (body.len() + chunk.len()) as u64 > limit {
            return Err(FetchError::TooLarge(limit));
        }
        body.extend_from_slice(&chunk);
    }

    Ok(body.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn chunks(parts: &[&'static [u8]]) -> ByteStream {
        let items: Vec<Result<Bytes, FetchError>> =
            parts.iter().map(|p| Ok(Bytes::from_static(p))).collect();
        stream::iter(items).boxed()
    }

    #[tokio::test]
    async fn collects_chunks_in_order() {
        let body = collect_body(chunks(&[&b"ab"[..], b"cd", b"e"]), 10).await.unwrap();
        assert_eq!(&body[..], b"abcde");
    }

    #[tokio::test]
    async fn stops_past_limit() {
        let err = collect_body(chunks(&[&b"abc"[..], b"def"]), 5).await.unwrap_err();
        assert!(matches!(err, FetchError::TooLarge(5)));

        let body = collect_body(chunks(&[&b"abc"[..], b"de"]), 5).await.unwrap();
        assert_eq!(body.len(), 5);
    }

    #[tokio::test]
    async fn connection_refused_is_a_request_error() {
        let upstream = HttpUpstream::new(Some(Duration::from_secs(5))).unwrap();
        let err = upstream.open("http://127.0.0.1:1/real.jpg").await.err().unwrap();
        assert!(matches!(err, FetchError::Request(_)));
    }
}
