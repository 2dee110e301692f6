//! Pure classification of desired definitions against what the catalog holds.

use shared::types::{DesiredDefinition, ObservedRecord};
use super::identity::{keep_keys, matches_on, Key, IDENTIFYING, INTERESTING};

/// Records observed in the catalog for one run. Each match removes the
/// record, so a record is consumed by at most one definition.
#[derive(Debug, Clone, Default)]
pub struct ObservedSet {
    records: Vec<ObservedRecord>,
}

impl ObservedSet {
    pub fn new(records: Vec<ObservedRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn position(&self, desired: &DesiredDefinition, keys: &[Key]) -> Option<usize> {
        self.records
            .iter()
            .position(|observed| matches_on(keys, desired, observed))
    }

    /// Remove and return the first record matching `desired` on `keys`
    pub fn take_match(&mut self, desired: &DesiredDefinition, keys: &[Key]) -> Option<ObservedRecord> {
        self.position(desired, keys).map(|index| self.records.remove(index))
    }

    /// Whatever no definition claimed
    pub fn into_surplus(self) -> Vec<ObservedRecord> {
        self.records
    }
}

/// What to do about one definition or one surplus record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Already registered exactly as desired
    InSync(DesiredDefinition),
    /// Flagged keep and found; left untouched
    Kept(DesiredDefinition),
    /// Flagged keep but not in the catalog; nothing is created
    KeepMissing(DesiredDefinition),
    /// Registered with different attributes; re-register
    Update {
        desired: DesiredDefinition,
        previous: ObservedRecord,
    },
    /// Not registered at all
    Add(DesiredDefinition),
    /// Registered but not desired
    Remove(ObservedRecord),
}

impl Step {
    pub fn is_mutation(&self) -> bool {
        matches!(self, Step::Update { .. } | Step::Add(_) | Step::Remove(_))
    }
}

/// Classify one definition, consuming its match from `observed`
pub fn classify(desired: &DesiredDefinition, observed: &mut ObservedSet) -> Step {
    if desired.keep {
        return match observed.take_match(desired, keep_keys(desired)) {
            Some(_) => Step::Kept(desired.clone()),
            None => Step::KeepMissing(desired.clone()),
        };
    }

    if observed.take_match(desired, INTERESTING).is_some() {
        return Step::InSync(desired.clone());
    }

    match observed.take_match(desired, IDENTIFYING) {
        Some(previous) => Step::Update {
            desired: desired.clone(),
            previous,
        },
        None => Step::Add(desired.clone()),
    }
}

/// Definitions in input order, followed by removals of everything unclaimed.
/// Definitions must already carry canonical tags.
pub fn plan(definitions: &[DesiredDefinition], mut observed: ObservedSet) -> Vec<Step> {
    let mut steps: Vec<Step> = definitions
        .iter()
        .map(|desired| classify(desired, &mut observed))
        .collect();

    steps.extend(observed.into_surplus().into_iter().map(Step::Remove));
    steps
}
