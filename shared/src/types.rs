use serde::{Serialize, Deserialize};

/// A registration the caller wants to exist in the catalog.
///
/// Optional fields stay `None` when omitted, which is not the same as an
/// empty string: an omitted `service_id` narrows the keep match to the node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredDefinition {
    /// Node name, e.g. "db1.example.com"
    pub node: String,

    /// Service name; absent means the entry is only known by its node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,

    /// The catalog reports an unset service address as "", so declare `""`
    /// rather than omitting it to stay in sync across runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_address: Option<String>,

    /// Node address
    pub address: String,

    #[serde(default)]
    pub tags: Vec<String>,

    pub port: u16,

    /// Preserve the entry as-is when found, never update or create it
    #[serde(default)]
    pub keep: bool,
}

impl DesiredDefinition {
    /// Whether the catalog will report this entry under the identity it was
    /// registered with. Without a `service_id` the catalog falls back to the
    /// service name as ID, which never matches an absent `service_id`, so a
    /// non-keep definition flips between add and remove on every other run.
    pub fn has_stable_identity(&self) -> bool {
        self.keep || self.service_id.is_some()
    }

    /// Short human-readable label used in log lines
    pub fn describe(&self) -> String {
        let service = self
            .service
            .as_deref()
            .or(self.service_id.as_deref())
            .unwrap_or("<any service>");
        format!("{} on {}", service, self.node)
    }
}

/// A registration currently held by the catalog, decoded from a health entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedRecord {
    pub node: String,

    /// Node IP address
    pub address: String,

    pub service: String,
    pub service_id: String,
    pub service_address: Option<String>,

    /// Always kept sorted so tag sets compare as sequences
    pub tags: Vec<String>,

    pub port: u16,
}

impl ObservedRecord {
    pub fn describe(&self) -> String {
        format!("{} on {}", self.service, self.node)
    }
}

/// Body of `PUT /v1/catalog/register`. Creates or updates by node and service ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Registration {
    pub node: String,
    pub address: String,
    pub service: RegisteredService,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RegisteredService {
    #[serde(rename = "ID", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    pub port: u16,
}

impl From<&DesiredDefinition> for Registration {
    fn from(definition: &DesiredDefinition) -> Self {
        Self {
            node: definition.node.clone(),
            address: definition.address.clone(),
            service: RegisteredService {
                id: definition.service_id.clone(),
                service: definition.service.clone(),
                address: definition.service_address.clone(),
                tags: definition.tags.clone(),
                port: definition.port,
            },
        }
    }
}

/// Body of `PUT /v1/catalog/deregister`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deregistration {
    #[serde(rename = "Node")]
    pub node: String,

    #[serde(rename = "ServiceID")]
    pub service_id: String,
}
