use crate::application::ports::{CredentialProvider, RemoteGateway};
use crate::domain::value_objects::{RecordPayload, SyncOperation, SyncTable};
use crate::infrastructure::remote::error::GatewayError;
use crate::shared::config::RemoteConfig;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::RequestBuilder;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// `GET /api/sync/{table}` のレスポンスボディ。
#[derive(Debug, Deserialize)]
struct PullResponse {
    data: Vec<RecordPayload>,
}

/// `RemoteGateway` のHTTP実装。
///
/// エンドポイントとメソッドは (テーブル, 操作) の組から決まる:
/// INSERT→POST コレクション、UPDATE→PUT 個別、DELETE→DELETE 個別。
/// トークンが得られれば `Authorization: Bearer` を付与する。
pub struct HttpRemoteGateway {
    client: reqwest::Client,
    base_url: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl HttpRemoteGateway {
    pub fn new(
        config: &RemoteConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, AppError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout))
            .default_headers(headers)
            .build()
            .map_err(|err| {
                AppError::ConfigurationError(format!("Failed to build HTTP client: {}", err))
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn with_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match self.credentials.bearer_token().await {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(GatewayError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl RemoteGateway for HttpRemoteGateway {
    async fn push_mutation(
        &self,
        table: SyncTable,
        operation: SyncOperation,
        record_id: i64,
        payload: Option<&RecordPayload>,
    ) -> Result<(), AppError> {
        let request = match operation {
            SyncOperation::Insert => self.client.post(self.url(&table.collection_path())),
            SyncOperation::Update => self.client.put(self.url(&table.record_path(record_id))),
            SyncOperation::Delete => self.client.delete(self.url(&table.record_path(record_id))),
        };

        let mut request = self.with_auth(request).await;
        if let Some(payload) = payload {
            request = request.json(payload.as_json());
        }

        debug!("Pushing {} {} record {}", operation, table, record_id);

        let response = request.send().await.map_err(GatewayError::from)?;
        Self::ensure_success(response).await?;
        Ok(())
    }

    async fn pull_changes(
        &self,
        table: SyncTable,
        since: DateTime<Utc>,
    ) -> Result<Vec<RecordPayload>, AppError> {
        let request = self
            .client
            .get(self.url(&table.pull_path()))
            .query(&[("since", since.to_rfc3339())]);
        let request = self.with_auth(request).await;

        let response = request.send().await.map_err(GatewayError::from)?;
        let response = Self::ensure_success(response).await?;

        let body: PullResponse = response.json().await.map_err(GatewayError::from)?;
        debug!("Pulled {} remote {} records", body.data.len(), table);
        Ok(body.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoCredentials;

    #[async_trait]
    impl CredentialProvider for NoCredentials {
        async fn bearer_token(&self) -> Option<String> {
            None
        }
    }

    fn gateway(base_url: &str) -> HttpRemoteGateway {
        let config = RemoteConfig {
            base_url: base_url.to_string(),
            request_timeout: 30,
        };
        HttpRemoteGateway::new(&config, Arc::new(NoCredentials)).unwrap()
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        let gateway = gateway("https://api.example.com/");
        assert_eq!(
            gateway.url(&SyncTable::Invoices.collection_path()),
            "https://api.example.com/api/invoices"
        );
        assert_eq!(
            gateway.url(&SyncTable::Invoices.record_path(7)),
            "https://api.example.com/api/invoices/7"
        );
        assert_eq!(
            gateway.url(&SyncTable::ChatMessages.pull_path()),
            "https://api.example.com/api/sync/chat_messages"
        );
    }
}
