//! HTTP helpers for talking to a test server.

#![allow(dead_code)]

use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::error::Error;
use std::net::SocketAddr;
use std::time::Duration;

type TestResult<T> = Result<T, Box<dyn Error>>;

/// Client with a short timeout so a hung server fails the test
pub fn create_test_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .expect("Failed to build test HTTP client")
}

pub fn build_url(addr: &SocketAddr, path_and_query: &str) -> Url {
    Url::parse(&format!("http://{}{}", addr, path_and_query)).expect("Failed to parse URL")
}

/// GET a path, returning the status and the body parsed as JSON
pub async fn get(addr: &SocketAddr, path: &str) -> TestResult<(StatusCode, serde_json::Value)> {
    let url = build_url(addr, path);
    println!("GET {}", url);
    let response = create_test_client().get(url).send().await?;
    let status = response.status();
    Ok((status, response.json().await?))
}

/// GET a path that must succeed and decode into `T`
pub async fn get_json<T: DeserializeOwned>(addr: &SocketAddr, path: &str) -> TestResult<T> {
    let (status, body) = get(addr, path).await?;
    if status != StatusCode::OK {
        return Err(format!("{} returned {}: {}", path, status, body).into());
    }
    Ok(serde_json::from_value(body)?)
}

/// GET a path that must fail, returning its status and error body
pub async fn get_error(
    addr: &SocketAddr,
    path: &str,
) -> TestResult<(StatusCode, serde_json::Value)> {
    let (status, body) = get(addr, path).await?;
    if status.is_success() {
        return Err(format!("{} unexpectedly succeeded with {}", path, body).into());
    }
    Ok((status, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url_keeps_query() {
        let addr: SocketAddr = ([127, 0, 0, 1], 8000).into();
        let url = build_url(&addr, "/point?dataset=heat&quantity=temp_at_depth:10");
        assert_eq!(url.path(), "/point");
        assert_eq!(url.query(), Some("dataset=heat&quantity=temp_at_depth:10"));
    }
}
