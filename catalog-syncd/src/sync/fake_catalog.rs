//! In-process catalog backend for tests: registrations are stored and served
//! back through the directory and health endpoints.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde_json::{json, Value};
use catalog_client::{CatalogClient, ClientConfig, RequestExecutor};

/// A health entry as the catalog returns it
pub fn entry(
    node: &str,
    address: &str,
    service: &str,
    id: &str,
    service_address: Option<&str>,
    tags: &[&str],
    port: u16,
) -> Value {
    // The real catalog reports an unset service address as ""
    json!({
        "Node": {"Node": node, "Address": address},
        "Service": {
            "ID": id,
            "Service": service,
            "Address": service_address.unwrap_or_default(),
            "Tags": tags,
            "Port": port,
        },
        "Checks": [],
    })
}

#[derive(Default)]
struct FakeState {
    entries: Vec<Value>,
    writes: Vec<(String, Value)>,
    paths: Vec<String>,
    fail_writes: bool,
}

#[derive(Clone, Default)]
pub struct FakeCatalog {
    state: Arc<Mutex<FakeState>>,
    health_delay: Duration,
    health_in_flight: Arc<AtomicUsize>,
    health_peak: Arc<AtomicUsize>,
}

impl FakeCatalog {
    pub fn with_entries(entries: Vec<Value>) -> Self {
        let fake = Self::default();
        fake.state.lock().unwrap().entries = entries;
        fake
    }

    /// Hold every endpoint-list response for `delay`
    pub fn with_health_delay(mut self, delay: Duration) -> Self {
        self.health_delay = delay;
        self
    }

    /// Most endpoint-list requests served at the same time
    pub fn health_peak(&self) -> usize {
        self.health_peak.load(Ordering::SeqCst)
    }

    /// Answer every write with a 500
    pub fn fail_writes(&self) {
        self.state.lock().unwrap().fail_writes = true;
    }

    /// ("register" | "deregister", body) in the order received
    pub fn writes(&self) -> Vec<(String, Value)> {
        self.state.lock().unwrap().writes.clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.state.lock().unwrap().paths.clone()
    }

    pub fn hits(&self) -> usize {
        self.state.lock().unwrap().paths.len()
    }

    /// Serve on a random local port and return a client without retry delays
    pub async fn client(&self) -> CatalogClient {
        let app = Router::new()
            .route("/v1/catalog/services", get(services))
            .route("/v1/health/service/:name", get(health))
            .route("/v1/catalog/register", put(register))
            .route("/v1/catalog/deregister", put(deregister))
            .with_state(self.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let config = ClientConfig {
            url: format!("http://{}", addr),
            params: Vec::new(),
            timeout: Duration::from_secs(5),
        };
        let executor = RequestExecutor::new(&config)
            .unwrap()
            .with_backoff(vec![Duration::ZERO; 4]);
        CatalogClient::from_executor(executor)
    }

    fn record_path(&self, uri: &OriginalUri) {
        self.state.lock().unwrap().paths.push(uri.path().to_string());
    }
}

fn tags_of(entry: &Value) -> Vec<String> {
    entry["Service"]["Tags"]
        .as_array()
        .map(|tags| {
            tags.iter()
                .filter_map(|tag| tag.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Service name -> union of its endpoints' tags, restricted to `?tag=`
async fn services(
    State(fake): State<FakeCatalog>,
    uri: OriginalUri,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    fake.record_path(&uri);
    let state = fake.state.lock().unwrap();

    let mut directory: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for entry in &state.entries {
        let name = entry["Service"]["Service"].as_str().unwrap_or_default().to_string();
        directory.entry(name).or_default().extend(tags_of(entry));
    }
    if let Some(tag) = query.get("tag") {
        directory.retain(|_, tags| tags.contains(tag));
    }

    Json(json!(directory))
}

async fn health(
    State(fake): State<FakeCatalog>,
    uri: OriginalUri,
    Path(name): Path<String>,
) -> Json<Value> {
    fake.record_path(&uri);

    let running = fake.health_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    fake.health_peak.fetch_max(running, Ordering::SeqCst);
    tokio::time::sleep(fake.health_delay).await;
    fake.health_in_flight.fetch_sub(1, Ordering::SeqCst);

    let state = fake.state.lock().unwrap();
    let endpoints: Vec<Value> = state
        .entries
        .iter()
        .filter(|entry| entry["Service"]["Service"] == name.as_str())
        .cloned()
        .collect();
    Json(Value::Array(endpoints))
}

fn same_registration(entry: &Value, node: &Value, id: &Value) -> bool {
    entry["Node"]["Node"] == *node && entry["Service"]["ID"] == *id
}

async fn register(
    State(fake): State<FakeCatalog>,
    uri: OriginalUri,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    fake.record_path(&uri);
    let mut state = fake.state.lock().unwrap();
    if state.fail_writes {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!("write failed")));
    }
    state.writes.push(("register".to_string(), body.clone()));

    let mut service = body["Service"].clone();
    // Like the real catalog, the service name doubles as ID when none is given
    if service.get("ID").is_none() {
        service["ID"] = service["Service"].clone();
    }
    if service.get("Address").is_none() {
        service["Address"] = json!("");
    }
    let stored = json!({
        "Node": {"Node": body["Node"], "Address": body["Address"]},
        "Service": service,
        "Checks": [],
    });

    let node = stored["Node"]["Node"].clone();
    let id = stored["Service"]["ID"].clone();
    match state
        .entries
        .iter()
        .position(|entry| same_registration(entry, &node, &id))
    {
        Some(index) => state.entries[index] = stored,
        None => state.entries.push(stored),
    }

    (StatusCode::OK, Json(json!(true)))
}

async fn deregister(
    State(fake): State<FakeCatalog>,
    uri: OriginalUri,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    fake.record_path(&uri);
    let mut state = fake.state.lock().unwrap();
    if state.fail_writes {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!("write failed")));
    }
    state.writes.push(("deregister".to_string(), body.clone()));
    state
        .entries
        .retain(|entry| !same_registration(entry, &body["Node"], &body["ServiceID"]));

    (StatusCode::OK, Json(json!(true)))
}
