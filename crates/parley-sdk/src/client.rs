//! Gateway client implementation.

use async_trait::async_trait;
use futures::future::join_all;
use parley_core::{
    CreatedNegotiation, NegotiationBackend, NegotiationRequest, NegotiationSession, ParleyError,
    Product, RawRecord, Result, StatusSnapshot,
};
use reqwest::{Response, Url};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::envelope::{
    list_from_envelope, CONVERSATION_KEYS, NEGOTIATION_KEYS, PRODUCT_KEYS, SUPPLIER_KEYS,
};
use crate::policy::Endpoint;

/// Client for the negotiation backend's HTTP API.
///
/// This is the only place that talks HTTP. Transport failures become
/// [`ParleyError`]s here, and each endpoint's [`FailurePolicy`](crate::FailurePolicy)
/// decides whether they reach the caller.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    /// Connection settings.
    config: ClientConfig,

    /// HTTP client.
    http_client: reqwest::Client,
}

impl GatewayClient {
    /// Create a client. No request is made until the first call.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| ParleyError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Create a client configured from the environment.
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env())
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, endpoint: Endpoint, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.config.url(endpoint.path())).map_err(|e| {
            ParleyError::InvalidInput(format!("Invalid base URL {}: {}", self.config.base_url, e))
        })?;
        if !segments.is_empty() {
            url.path_segments_mut()
                .map_err(|_| {
                    ParleyError::InvalidInput(format!("Base URL {} cannot carry a path", self.config.base_url))
                })?
                .extend(segments);
        }
        Ok(url)
    }

    /// Map a reqwest failure onto the error taxonomy.
    fn transport_error(&self, endpoint: Endpoint, err: reqwest::Error) -> ParleyError {
        if err.is_timeout() {
            let duration_ms = self
                .config
                .request_timeout
                .map(|t| t.as_millis() as u64)
                .unwrap_or(0);
            ParleyError::Timeout {
                duration_ms,
                message: format!("{}: {}", endpoint.operation(), err),
            }
        } else if err.is_decode() {
            ParleyError::SerializationError(format!("{}: {}", endpoint.operation(), err))
        } else {
            ParleyError::BackendUnreachable {
                base_url: self.config.base_url.clone(),
                message: err.to_string(),
            }
        }
    }

    /// Turn non-2xx responses into `HttpStatus` errors.
    async fn check_status(endpoint: Endpoint, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = if body.trim().is_empty() {
            status.canonical_reason().unwrap_or_default().to_string()
        } else {
            body.trim().to_string()
        };
        Err(ParleyError::HttpStatus {
            operation: endpoint.operation().to_string(),
            status: status.as_u16(),
            message,
        })
    }

    async fn read_json(&self, endpoint: Endpoint, response: Response) -> Result<Value> {
        let response = Self::check_status(endpoint, response).await?;
        response
            .json::<Value>()
            .await
            .map_err(|e| self.transport_error(endpoint, e))
    }

    async fn get_json(&self, endpoint: Endpoint, segments: &[&str], query: &[(&str, &str)]) -> Result<Value> {
        let url = self.url(endpoint, segments)?;
        debug!(url = %url, "GET");

        let mut request = self.http_client.get(url);
        if !query.is_empty() {
            request = request.query(query);
        }
        let response = request
            .send()
            .await
            .map_err(|e| self.transport_error(endpoint, e))?;

        self.read_json(endpoint, response).await
    }

    async fn fetch_rows(&self, endpoint: Endpoint, keys: &[&str]) -> Result<Vec<RawRecord>> {
        let body = self.get_json(endpoint, &[], &[]).await?;
        Ok(list_from_envelope(&body, keys, endpoint.operation())
            .into_iter()
            .filter_map(RawRecord::from_value)
            .collect())
    }

    async fn fetch_history(&self) -> Result<Vec<NegotiationSession>> {
        let body = self.get_json(Endpoint::Negotiations, &[], &[]).await?;
        Ok(list_from_envelope(&body, NEGOTIATION_KEYS, Endpoint::Negotiations.operation())
            .into_iter()
            .filter_map(RawRecord::from_value)
            .filter_map(|row| NegotiationSession::from_record(&row))
            .collect())
    }

    async fn fetch_status(&self, negotiation_id: &str) -> Result<Option<StatusSnapshot>> {
        let body = self
            .get_json(Endpoint::NegotiationStatus, &[negotiation_id], &[])
            .await?;

        match RawRecord::from_value(body) {
            Some(record) => Ok(Some(StatusSnapshot::from_record(negotiation_id, &record))),
            None => {
                warn!(negotiation_id, "Status response is not an object");
                Ok(None)
            }
        }
    }

    async fn fetch_conversation(&self, negotiation_id: &str, supplier_id: &str) -> Result<Vec<Value>> {
        let body = self
            .get_json(Endpoint::Conversation, &[negotiation_id, supplier_id], &[])
            .await?;
        Ok(list_from_envelope(&body, CONVERSATION_KEYS, Endpoint::Conversation.operation()))
    }
}

#[async_trait]
impl NegotiationBackend for GatewayClient {
    async fn check_health(&self) -> bool {
        let url = match self.url(Endpoint::Health, &[]) {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "Health check skipped");
                return false;
            }
        };

        match self
            .http_client
            .get(url)
            .timeout(self.config.health_timeout)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!(base_url = %self.config.base_url, error = %e, "Health check failed");
                false
            }
        }
    }

    async fn search_products(&self, query: &str) -> Result<Vec<Product>> {
        let body = self
            .get_json(Endpoint::Search, &[], &[("product", query)])
            .await?;

        let products = list_from_envelope(&body, PRODUCT_KEYS, Endpoint::Search.operation())
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<Product>(item) {
                Ok(product) => Some(product),
                Err(e) => {
                    warn!(error = %e, "Skipping malformed search hit");
                    None
                }
            })
            .collect::<Vec<_>>();

        debug!(query, hits = products.len(), "Search complete");
        Ok(products)
    }

    async fn list_suppliers(&self) -> Result<Vec<RawRecord>> {
        let result = self.fetch_rows(Endpoint::Suppliers, SUPPLIER_KEYS).await;
        Endpoint::Suppliers.settle(result)
    }

    async fn list_products(&self) -> Result<Vec<RawRecord>> {
        let result = self.fetch_rows(Endpoint::Products, PRODUCT_KEYS).await;
        Endpoint::Products.settle(result)
    }

    async fn create_negotiation(&self, request: &NegotiationRequest) -> Result<CreatedNegotiation> {
        let endpoint = Endpoint::Negotiate;
        let payload = request.to_payload();

        let response = self
            .http_client
            .post(self.url(endpoint, &[])?)
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.transport_error(endpoint, e))?;
        let body = self.read_json(endpoint, response).await?;

        let created = RawRecord::from_value(body)
            .and_then(|record| CreatedNegotiation::from_record(&record))
            .ok_or_else(|| {
                ParleyError::SerializationError("Create response carried no negotiation id".to_string())
            })?;

        info!(
            negotiation_id = %created.id,
            suppliers = payload.suppliers.len(),
            status = %created.status,
            "Negotiation created"
        );
        Ok(created)
    }

    /// History listing, with each session's suppliers filled in from its status.
    ///
    /// Status lookups run concurrently; one failing leaves that session's
    /// supplier list empty and nothing else.
    async fn list_negotiations(&self) -> Vec<NegotiationSession> {
        let result = self.fetch_history().await;
        let mut sessions = Endpoint::Negotiations.settle(result).unwrap_or_default();

        let snapshots = join_all(sessions.iter().map(|s| self.negotiation_status(&s.id))).await;
        for (session, snapshot) in sessions.iter_mut().zip(snapshots) {
            if let Some(snapshot) = snapshot {
                session.set_supplier_ids(snapshot.supplier_ids());
            }
        }

        debug!(count = sessions.len(), "Loaded negotiation history");
        sessions
    }

    async fn negotiation_status(&self, negotiation_id: &str) -> Option<StatusSnapshot> {
        let result = self.fetch_status(negotiation_id).await;
        Endpoint::NegotiationStatus.settle(result).ok().flatten()
    }

    async fn conversation(&self, negotiation_id: &str, supplier_id: &str) -> Vec<Value> {
        let result = self.fetch_conversation(negotiation_id, supplier_id).await;
        Endpoint::Conversation.settle(result).unwrap_or_default()
    }
}
