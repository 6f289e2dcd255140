//! API client for communicating with the AI-Ops bot

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use url::Url;

/// Query string pairs; `None` values are left out
pub type QueryParams<'a> = [(&'a str, Option<String>)];

/// API client for the AI-Ops bot
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    ///
    /// Self-heal waits for a rollout, so the timeout is generous.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).context("Invalid path")
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &QueryParams<'_>) -> Result<T> {
        let request = self.client.get(self.url(path)?).query(&present(query));
        Self::send(request).await
    }

    /// Make a POST request with query parameters and a JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        query: &QueryParams<'_>,
        body: &B,
    ) -> Result<T> {
        let request = self
            .client
            .post(self.url(path)?)
            .query(&present(query))
            .json(body);
        Self::send(request).await
    }

    async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T> {
        let response = request.send().await.context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }
}

fn present<'a>(query: &'a QueryParams<'a>) -> Vec<(&'a str, &'a str)> {
    query
        .iter()
        .filter_map(|(k, v)| v.as_deref().map(|v| (*k, v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use ops_lib::{ActionOutcome, ErrorSummary};
    use serde_json::json;

    #[tokio::test]
    async fn test_get_sends_only_present_params() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/logs/error_summary")
            .match_query(Matcher::UrlEncoded("minutes".into(), "45".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"lookback_minutes":45,"summary":{"orders":2,"users":0}}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let summary: ErrorSummary = client
            .get(
                "logs/error_summary",
                &[("minutes", Some("45".to_string())), ("limit", None)],
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(summary.errors_for("orders"), Some(2));
    }

    #[tokio::test]
    async fn test_post_action_with_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/k8s/restart_deployment")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("deployment".into(), "orders-deployment".into()),
                Matcher::UrlEncoded("namespace".into(), "cloudshop".into()),
            ]))
            .with_status(200)
            .with_body(
                json!({
                    "command": "kubectl rollout restart deployment/orders-deployment -n cloudshop",
                    "exit_code": 0,
                    "stdout": "deployment.apps/orders-deployment restarted",
                    "stderr": ""
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let outcome: ActionOutcome = client
            .post(
                "k8s/restart_deployment",
                &[
                    ("deployment", Some("orders-deployment".to_string())),
                    ("namespace", Some("cloudshop".to_string())),
                ],
                &json!({}),
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(outcome.succeeded());
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/logs/top_endpoints")
            .with_status(502)
            .with_body(r#"{"error":"logs backend returned 503: down"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client
            .get::<serde_json::Value>("logs/top_endpoints", &[])
            .await
            .unwrap_err();

        assert!(err.to_string().contains("502"));
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(ApiClient::new("not a url").is_err());
    }
}
