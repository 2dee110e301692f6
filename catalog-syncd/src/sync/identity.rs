use std::collections::BTreeSet;
use shared::types::{DesiredDefinition, ObservedRecord};

/// A field compared when deciding whether two registrations are the same
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Node,
    ServiceId,
    Service,
    ServiceAddress,
    Address,
    Tags,
    Port,
}

/// Same registration, possibly with different attributes
pub const IDENTIFYING: &[Key] = &[Key::Node, Key::ServiceId];

/// Same registration with identical attributes
pub const INTERESTING: &[Key] = &[
    Key::Node,
    Key::ServiceId,
    Key::Service,
    Key::ServiceAddress,
    Key::Address,
    Key::Tags,
    Key::Port,
];

const NODE_ONLY: &[Key] = &[Key::Node];

impl Key {
    /// Absent optional fields on the desired side only match absent fields
    pub fn matches(self, desired: &DesiredDefinition, observed: &ObservedRecord) -> bool {
        match self {
            Key::Node => desired.node == observed.node,
            Key::ServiceId => desired.service_id.as_deref() == Some(observed.service_id.as_str()),
            Key::Service => desired.service.as_deref() == Some(observed.service.as_str()),
            Key::ServiceAddress => desired.service_address == observed.service_address,
            Key::Address => desired.address == observed.address,
            Key::Tags => desired.tags == observed.tags,
            Key::Port => desired.port == observed.port,
        }
    }
}

pub fn matches_on(keys: &[Key], desired: &DesiredDefinition, observed: &ObservedRecord) -> bool {
    keys.iter().all(|key| key.matches(desired, observed))
}

/// Keys used to find the entry a `keep` definition protects. Without a
/// service ID the node alone identifies it.
pub fn keep_keys(desired: &DesiredDefinition) -> &'static [Key] {
    if desired.service_id.is_some() {
        IDENTIFYING
    } else {
        NODE_ONLY
    }
}

/// Union of both tag lists, deduplicated and sorted
pub fn canonical_tags(tags: &[String], required: &[String]) -> Vec<String> {
    tags.iter()
        .chain(required)
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Whether `tags` is a superset of `required`
pub fn has_all_tags(tags: &[String], required: &[String]) -> bool {
    required.iter().all(|tag| tags.contains(tag))
}
