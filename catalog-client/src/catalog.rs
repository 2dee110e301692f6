use std::collections::BTreeMap;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::Method;
use serde_json::Value;
use shared::protocol::{
    CATALOG_DEREGISTER_PATH, CATALOG_REGISTER_PATH, CATALOG_SERVICES_PATH, HEALTH_SERVICE_PATH,
    TAG_QUERY_PARAM,
};
use shared::types::{Deregistration, ObservedRecord, Registration};
use crate::endpoint;
use crate::error::{CatalogError, CatalogResult};
use crate::executor::{ClientConfig, Reply, RequestExecutor};

/// Everything but RFC 3986 unreserved characters is escaped in a path segment
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Typed catalog operations on top of the retrying executor
#[derive(Debug, Clone)]
pub struct CatalogClient {
    executor: RequestExecutor,
}

impl CatalogClient {
    pub fn new(config: &ClientConfig) -> CatalogResult<Self> {
        Ok(Self::from_executor(RequestExecutor::new(config)?))
    }

    pub fn from_executor(executor: RequestExecutor) -> Self {
        Self { executor }
    }

    /// Service name -> tags for every service carrying `tag`
    pub async fn services_tagged(&self, tag: &str) -> CatalogResult<BTreeMap<String, Vec<String>>> {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair(TAG_QUERY_PARAM, tag)
            .finish();
        let body = self.get(&format!("{}?{}", CATALOG_SERVICES_PATH, query)).await?;

        // An empty directory may come back as `[]`
        if matches!(&body, Value::Array(items) if items.is_empty()) {
            return Ok(BTreeMap::new());
        }

        let services: BTreeMap<String, Option<Vec<String>>> = serde_json::from_value(body)
            .map_err(|e| CatalogError::decode("service directory", e))?;

        Ok(services
            .into_iter()
            .map(|(name, tags)| (name, tags.unwrap_or_default()))
            .collect())
    }

    /// All endpoints of a service, including ones without health checks
    pub async fn service_endpoints(&self, name: &str) -> CatalogResult<Vec<ObservedRecord>> {
        let segment = utf8_percent_encode(name, PATH_SEGMENT);
        let body = self.get(&format!("{}/{}", HEALTH_SERVICE_PATH, segment)).await?;
        endpoint::decode_all(body)
    }

    /// Create or update by node and service ID
    pub async fn register(&self, registration: &Registration) -> CatalogResult<()> {
        self.put(CATALOG_REGISTER_PATH, registration).await
    }

    pub async fn deregister(&self, node: &str, service_id: &str) -> CatalogResult<()> {
        let body = Deregistration {
            node: node.to_string(),
            service_id: service_id.to_string(),
        };
        self.put(CATALOG_DEREGISTER_PATH, &body).await
    }

    async fn get(&self, path: &str) -> CatalogResult<Value> {
        match self.executor.request(Method::GET, path, None).await? {
            Reply::Json(value) => Ok(value),
            Reply::Accepted => Ok(Value::Null),
        }
    }

    async fn put<P: serde::Serialize>(&self, path: &str, payload: &P) -> CatalogResult<()> {
        let payload = serde_json::to_value(payload)
            .map_err(|e| CatalogError::decode(format!("payload for {}", path), e))?;
        self.executor.request(Method::PUT, path, Some(&payload)).await?;
        Ok(())
    }
}
