//! Scenario store and matcher (C4): canned `(method, path) → response`
//! records consulted before the section engine on every request.

use crate::error::MockError;
use crate::routing::{split_path, Pattern};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub uuid: Uuid,
    pub request_path: String,
    pub status_code: Option<u16>,
    pub content_type: Option<String>,
    pub location: Option<String>,
    pub data: Option<serde_json::Value>,
}

impl Scenario {
    fn parse_request_path(&self) -> Option<(&str, &str)> {
        self.request_path.split_once(' ')
    }
}

struct Inner {
    by_uuid: HashMap<Uuid, Scenario>,
    order: Vec<Uuid>,
}

/// Same `Arc<RwLock<...>>` shape as the resource store — independent lock,
/// simpler shape (no composite-key / path-index split needed).
#[derive(Clone)]
pub struct ScenarioStore {
    inner: Arc<RwLock<Inner>>,
}

impl Default for ScenarioStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ScenarioStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                by_uuid: HashMap::new(),
                order: Vec::new(),
            })),
        }
    }

    /// Insert a scenario at load time or via admin CRUD. Generates a uuid
    /// if absent; rejects a duplicate uuid with `Conflict`.
    pub fn create(&self, mut scenario: Scenario, generate_uuid: bool) -> Result<Scenario, MockError> {
        if generate_uuid && scenario.uuid.is_nil() {
            scenario.uuid = Uuid::new_v4();
        }
        let mut inner = self.inner.write().unwrap();
        if inner.by_uuid.contains_key(&scenario.uuid) {
            return Err(MockError::Conflict(scenario.uuid.to_string()));
        }
        inner.order.push(scenario.uuid);
        inner.by_uuid.insert(scenario.uuid, scenario.clone());
        Ok(scenario)
    }

    pub fn get(&self, uuid: Uuid) -> Option<Scenario> {
        self.inner.read().unwrap().by_uuid.get(&uuid).cloned()
    }

    pub fn list(&self) -> Vec<Scenario> {
        let inner = self.inner.read().unwrap();
        inner
            .order
            .iter()
            .filter_map(|u| inner.by_uuid.get(u).cloned())
            .collect()
    }

    pub fn update(&self, uuid: Uuid, scenario: Scenario) -> Result<Scenario, MockError> {
        let mut inner = self.inner.write().unwrap();
        if !inner.by_uuid.contains_key(&uuid) {
            return Err(MockError::NotFound);
        }
        let mut scenario = scenario;
        scenario.uuid = uuid;
        inner.by_uuid.insert(uuid, scenario.clone());
        Ok(scenario)
    }

    pub fn delete(&self, uuid: Uuid) -> Result<(), MockError> {
        let mut inner = self.inner.write().unwrap();
        if inner.by_uuid.remove(&uuid).is_none() {
            return Err(MockError::NotFound);
        }
        inner.order.retain(|u| *u != uuid);
        Ok(())
    }

    /// Match `(method, path)` against scenarios in insertion order,
    /// returning the first hit. `path` may carry a query string, which is
    /// ignored (spec §9 design note (b)).
    pub fn match_request(&self, method: &str, path: &str) -> Option<Scenario> {
        let path_segments = split_path(path);
        let inner = self.inner.read().unwrap();
        for uuid in &inner.order {
            let scenario = inner.by_uuid.get(uuid)?;
            let Some((scenario_method, scenario_path)) = scenario.parse_request_path() else {
                continue;
            };
            if scenario_method != method {
                continue;
            }
            let Ok(pattern) = Pattern::compile(scenario_path, true) else {
                continue;
            };
            if pattern.matches(&path_segments) {
                return Some(scenario.clone());
            }
        }
        None
    }
}
