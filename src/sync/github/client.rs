use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::sync::config::{RepoInfo, SyncConfig};
use crate::sync::remote::{RemoteError, RemoteFile, RemoteStore};

const ACCEPT: &str = "application/vnd.github.v3+json";
const USER_AGENT: &str = concat!("lexis/", env!("CARGO_PKG_VERSION"));

/// Client for the GitHub repository contents API
pub struct GitHubClient {
    client: Client,
    api_base_url: String,
    owner: String,
    repo: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    content: String,
    sha: String,
}

#[derive(Debug, Serialize)]
struct PutRequest<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct PutResponse {
    content: PutContent,
}

#[derive(Debug, Deserialize)]
struct PutContent {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct RepoResponse {
    full_name: String,
    private: bool,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    message: Option<String>,
}

impl GitHubClient {
    pub fn new(api_base_url: &str, config: &SyncConfig, timeout: Duration) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            owner: config.owner.clone(),
            repo: config.repo.clone(),
            token: config.token.clone(),
        })
    }

    fn repo_url(&self) -> String {
        format!("{}/repos/{}/{}", self.api_base_url, self.owner, self.repo)
    }

    fn contents_url(&self, path: &str) -> String {
        format!("{}/contents/{}", self.repo_url(), path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", ACCEPT)
    }
}

/// Error text from a failed response, preferring the API's `message` field
async fn error_message(response: Response) -> String {
    let text = response.text().await.unwrap_or_default();
    message_from_body(&text)
}

fn message_from_body(body: &str) -> String {
    serde_json::from_str::<ApiMessage>(body)
        .ok()
        .and_then(|m| m.message)
        .unwrap_or_else(|| body.trim().to_string())
}

/// Decode the base64 payload of a contents response
fn decode_content(encoded: &str) -> Result<String, RemoteError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = BASE64
        .decode(compact)
        .map_err(|e| RemoteError::Decode(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| RemoteError::Decode(e.to_string()))
}

#[async_trait]
impl RemoteStore for GitHubClient {
    async fn fetch_file(&self, path: &str, reference: &str) -> Result<RemoteFile, RemoteError> {
        let response = self
            .request(Method::GET, &self.contents_url(path))
            .query(&[("ref", reference)])
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED => return Err(RemoteError::AuthFailed),
            StatusCode::NOT_FOUND => return Err(RemoteError::NotFound(path.to_string())),
            status if !status.is_success() => {
                return Err(RemoteError::Transport {
                    status: status.as_u16(),
                    message: error_message(response).await,
                });
            }
            _ => {}
        }

        let body: ContentsResponse = response.json().await?;
        log::debug!("Fetched {} at {} (sha {})", path, reference, body.sha);

        Ok(RemoteFile {
            content: decode_content(&body.content)?,
            sha: body.sha,
        })
    }

    async fn put_file(
        &self,
        path: &str,
        content: &str,
        message: &str,
        branch: &str,
        expected_sha: Option<&str>,
    ) -> Result<String, RemoteError> {
        let body = PutRequest {
            message,
            content: BASE64.encode(content.as_bytes()),
            branch,
            sha: expected_sha,
        };

        let response = self
            .request(Method::PUT, &self.contents_url(path))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Conflict {
                status: status.as_u16(),
                message: error_message(response).await,
            });
        }

        let result: PutResponse = response.json().await?;
        log::debug!("Wrote {} on {} (sha {})", path, branch, result.content.sha);
        Ok(result.content.sha)
    }

    async fn get_repo_info(&self) -> Result<RepoInfo, RemoteError> {
        let response = self.request(Method::GET, &self.repo_url()).send().await?;

        match response.status() {
            StatusCode::UNAUTHORIZED => return Err(RemoteError::AuthFailed),
            StatusCode::NOT_FOUND => {
                return Err(RemoteError::NotFound(format!("{}/{}", self.owner, self.repo)));
            }
            status if !status.is_success() => {
                return Err(RemoteError::Transport {
                    status: status.as_u16(),
                    message: error_message(response).await,
                });
            }
            _ => {}
        }

        let repo: RepoResponse = response.json().await?;
        Ok(RepoInfo {
            repo_name: repo.full_name,
            private: repo.private,
        })
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    /// Serve a single canned HTTP response and hand back the raw request
    async fn serve_once(status: &'static str, body: String) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text[..end]
                        .lines()
                        .find_map(|l| {
                            let lower = l.to_ascii_lowercase();
                            lower
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap())
                        })
                        .unwrap_or(0);
                    if request.len() >= end + 4 + length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&request).to_string()
        });

        (format!("http://{}", addr), handle)
    }

    fn client(base_url: &str) -> GitHubClient {
        let config = SyncConfig::new("ghp_test", "alice", "vocab", None);
        GitHubClient::new(base_url, &config, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_decode_content_ignores_line_breaks() {
        let encoded = BASE64.encode("{\"words\": [\"苹果\"]}");
        let wrapped = format!("{}\n{}\n", &encoded[..10], &encoded[10..]);
        assert_eq!(decode_content(&wrapped).unwrap(), "{\"words\": [\"苹果\"]}");
        assert!(matches!(decode_content("!!!"), Err(RemoteError::Decode(_))));
    }

    #[test]
    fn test_message_from_body() {
        assert_eq!(message_from_body(r#"{"message": "sha does not match"}"#), "sha does not match");
        assert_eq!(message_from_body("Bad Gateway\n"), "Bad Gateway");
    }

    #[test]
    fn test_urls() {
        let client = client("https://api.github.com/");
        assert_eq!(client.repo_url(), "https://api.github.com/repos/alice/vocab");
        assert_eq!(
            client.contents_url("/data/vocabulary-data.json"),
            "https://api.github.com/repos/alice/vocab/contents/data/vocabulary-data.json"
        );
    }

    #[tokio::test]
    async fn test_fetch_file_decodes_content() {
        let body = serde_json::json!({
            "content": BASE64.encode("hello"),
            "sha": "abc123",
            "encoding": "base64"
        })
        .to_string();
        let (url, server) = serve_once("200 OK", body).await;

        let file = client(&url).fetch_file("data/v.json", "main").await.unwrap();
        assert_eq!(file.content, "hello");
        assert_eq!(file.sha, "abc123");

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /repos/alice/vocab/contents/data/v.json?ref=main"));
        assert!(request.to_ascii_lowercase().contains("authorization: token ghp_test"));
        assert!(request.contains(ACCEPT));
    }

    #[tokio::test]
    async fn test_fetch_missing_file() {
        let (url, _server) = serve_once("404 Not Found", r#"{"message": "Not Found"}"#.to_string()).await;
        let err = client(&url).fetch_file("data/v.json", "main").await.unwrap_err();
        assert!(matches!(err, RemoteError::NotFound(path) if path == "data/v.json"));
    }

    #[tokio::test]
    async fn test_put_file_sends_sha_and_returns_new_one() {
        let body = r#"{"content": {"sha": "new-sha"}, "commit": {}}"#.to_string();
        let (url, server) = serve_once("200 OK", body).await;

        let sha = client(&url)
            .put_file("data/v.json", "hello", "Update", "main", Some("old-sha"))
            .await
            .unwrap();
        assert_eq!(sha, "new-sha");

        let request = server.await.unwrap();
        assert!(request.starts_with("PUT /repos/alice/vocab/contents/data/v.json"));
        assert!(request.contains(r#""sha":"old-sha""#));
        assert!(request.contains(&format!(r#""content":"{}""#, BASE64.encode("hello"))));
    }

    #[tokio::test]
    async fn test_put_file_rejection_is_conflict() {
        let (url, _server) = serve_once(
            "409 Conflict",
            r#"{"message": "data/v.json does not match old-sha"}"#.to_string(),
        )
        .await;

        let err = client(&url)
            .put_file("data/v.json", "hello", "Update", "main", Some("old-sha"))
            .await
            .unwrap_err();
        match err {
            RemoteError::Conflict { status, message } => {
                assert_eq!(status, 409);
                assert_eq!(message, "data/v.json does not match old-sha");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_repo_info() {
        let body = r#"{"full_name": "alice/vocab", "private": true}"#.to_string();
        let (url, _server) = serve_once("200 OK", body).await;

        let info = client(&url).get_repo_info().await.unwrap();
        assert_eq!(info.repo_name, "alice/vocab");
        assert!(info.private);
    }

    #[tokio::test]
    async fn test_repo_info_bad_token() {
        let (url, _server) = serve_once("401 Unauthorized", r#"{"message": "Bad credentials"}"#.to_string()).await;
        assert!(matches!(
            client(&url).get_repo_info().await,
            Err(RemoteError::AuthFailed)
        ));
    }
}
