//! Concurrency-safe multi-key resource store (C3).

use crate::error::MockError;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// A synthetic stored resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub path: String,
    pub ids: Vec<String>,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl Resource {
    pub fn primary_id(&self) -> &str {
        &self.ids[0]
    }

    pub fn location(&self) -> String {
        format!("{}/{}", self.path, self.primary_id())
    }
}

/// Visibility scope of a composite key, per spec §4.3 / §9 "Strict vs
/// flexible scoping" design note: a tagged variant instead of a boolean,
/// carried inside the key itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Scope {
    Path(String),
    Section(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CompositeKey {
    scope: Scope,
    id: String,
}

struct ResourceStoreInner {
    by_key: HashMap<CompositeKey, Arc<Resource>>,
    /// path (or location) -> composite keys created under it. Consulted
    /// for `GetByPath`'s exact-match step.
    by_path: HashMap<String, Vec<CompositeKey>>,
    /// primary keys in creation order, consulted by `GetByPath`'s prefix
    /// fallback so collection results stay insertion-ordered (spec §4.1).
    insertion_order: Vec<CompositeKey>,
}

/// `Arc`-wrapped, cheaply cloneable handle over the store. A single
/// reader-writer lock protects both `by_key` and `by_path` together, so
/// that no operation can observe a partially re-indexed resource (spec
/// §4.3/§5).
#[derive(Clone)]
pub struct ResourceStore {
    inner: Arc<RwLock<ResourceStoreInner>>,
}

impl Default for ResourceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(ResourceStoreInner {
                by_key: HashMap::new(),
                by_path: HashMap::new(),
                insertion_order: Vec::new(),
            })),
        }
    }

    fn scope_for(strict_path: bool, section_name: &str, path: &str) -> Scope {
        if strict_path {
            Scope::Path(path.to_string())
        } else {
            Scope::Section(section_name.to_string())
        }
    }

    /// Create a resource. `ids` may be empty, in which case a fresh id is
    /// generated and used as the sole identifier (invariant 1).
    pub fn create(
        &self,
        section_name: &str,
        strict_path: bool,
        path: &str,
        ids: Vec<String>,
        content_type: String,
        body: Vec<u8>,
    ) -> Result<Arc<Resource>, MockError> {
        let path = crate::routing::normalize_path(path);
        let ids = if ids.is_empty() {
            vec![uuid::Uuid::new_v4().to_string()]
        } else {
            ids
        };
        let scope = Self::scope_for(strict_path, section_name, &path);

        let mut inner = self.inner.write().unwrap();
        for id in &ids {
            let key = CompositeKey {
                scope: scope.clone(),
                id: id.clone(),
            };
            if inner.by_key.contains_key(&key) {
                return Err(MockError::Conflict(id.clone()));
            }
        }

        let resource = Arc::new(Resource {
            path: path.clone(),
            ids: ids.clone(),
            content_type,
            body,
        });

        for id in &ids {
            let key = CompositeKey {
                scope: scope.clone(),
                id: id.clone(),
            };
            inner.by_key.insert(key.clone(), resource.clone());
        }
        let primary_key = CompositeKey {
            scope,
            id: resource.primary_id().to_string(),
        };
        inner
            .by_path
            .entry(path.clone())
            .or_default()
            .push(primary_key.clone());
        inner
            .by_path
            .entry(resource.location())
            .or_default()
            .push(primary_key.clone());
        inner.insertion_order.push(primary_key);

        Ok(resource)
    }

    /// Look up a resource by `(section, strict_path, base_path, id)`.
    /// `base_path` is the request path with the trailing id segment
    /// removed; it is only meaningful when `strict_path` is true.
    pub fn get(
        &self,
        section_name: &str,
        strict_path: bool,
        base_path: &str,
        id: &str,
    ) -> Option<Arc<Resource>> {
        let scope = Self::scope_for(strict_path, section_name, base_path);
        let key = CompositeKey {
            scope,
            id: id.to_string(),
        };
        let inner = self.inner.read().unwrap();
        inner.by_key.get(&key).cloned()
    }

    /// Exact-then-prefix lookup by stored path, per spec §4.3 `GetByPath`.
    pub fn get_by_path(&self, path: &str) -> Result<Vec<Arc<Resource>>, MockError> {
        let path = crate::routing::normalize_path(path);
        let inner = self.inner.read().unwrap();

        if let Some(keys) = inner.by_path.get(&path) {
            let mut seen = Vec::new();
            let mut out = Vec::new();
            for key in keys {
                if let Some(r) = inner.by_key.get(key) {
                    if seen.iter().all(|s| !Arc::ptr_eq(s, r)) {
                        seen.push(r.clone());
                        out.push(r.clone());
                    }
                }
            }
            if !out.is_empty() {
                return Ok(out);
            }
        }

        let prefix = format!("{}/", path);
        let mut seen: Vec<Arc<Resource>> = Vec::new();
        for key in &inner.insertion_order {
            let Some(r) = inner.by_key.get(key) else {
                continue;
            };
            if r.path.starts_with(&prefix) && seen.iter().all(|s| !Arc::ptr_eq(s, r)) {
                seen.push(r.clone());
            }
        }
        if seen.is_empty() {
            Err(MockError::NotFound)
        } else {
            Ok(seen)
        }
    }

    /// Update an existing resource in the scope implied by the caller's
    /// `strict_path` flag. `ids` are preserved from the original resource —
    /// clients cannot relabel a resource via update.
    pub fn update(
        &self,
        section_name: &str,
        strict_path: bool,
        base_path: &str,
        id: &str,
        new_path: &str,
        content_type: String,
        body: Vec<u8>,
    ) -> Result<Arc<Resource>, MockError> {
        let new_path = crate::routing::normalize_path(new_path);
        let scope = Self::scope_for(strict_path, section_name, base_path);
        let key = CompositeKey {
            scope: scope.clone(),
            id: id.to_string(),
        };

        let mut inner = self.inner.write().unwrap();
        let existing = match inner.by_key.get(&key).cloned() {
            Some(r) => r,
            None => return Err(MockError::NotFound),
        };

        // remove all old composite keys and path-index entries
        for old_id in &existing.ids {
            let old_key = CompositeKey {
                scope: scope.clone(),
                id: old_id.clone(),
            };
            inner.by_key.remove(&old_key);
        }
        remove_from_path_index(&mut inner.by_path, &existing.path, &scope, &existing.ids);
        remove_from_path_index(
            &mut inner.by_path,
            &existing.location(),
            &scope,
            &existing.ids,
        );

        let updated = Arc::new(Resource {
            path: new_path.clone(),
            ids: existing.ids.clone(),
            content_type,
            body,
        });

        for id in &updated.ids {
            let key = CompositeKey {
                scope: scope.clone(),
                id: id.clone(),
            };
            inner.by_key.insert(key, updated.clone());
        }
        let primary_key = CompositeKey {
            scope: scope.clone(),
            id: updated.primary_id().to_string(),
        };
        inner
            .by_path
            .entry(new_path)
            .or_default()
            .push(primary_key.clone());
        inner
            .by_path
            .entry(updated.location())
            .or_default()
            .push(primary_key);

        Ok(updated)
    }

    /// Create-or-update in flexible mode (upsert), used by PUT when
    /// `strict_path=false` and no existing resource is found.
    pub fn upsert(
        &self,
        section_name: &str,
        strict_path: bool,
        path: &str,
        ids: Vec<String>,
        content_type: String,
        body: Vec<u8>,
    ) -> Result<Arc<Resource>, MockError> {
        self.create(section_name, strict_path, path, ids, content_type, body)
    }

    pub fn delete(
        &self,
        section_name: &str,
        strict_path: bool,
        base_path: &str,
        id: &str,
    ) -> Result<(), MockError> {
        let scope = Self::scope_for(strict_path, section_name, base_path);
        let key = CompositeKey {
            scope: scope.clone(),
            id: id.to_string(),
        };

        let mut inner = self.inner.write().unwrap();
        let existing = match inner.by_key.get(&key).cloned() {
            Some(r) => r,
            None => return Err(MockError::NotFound),
        };

        for id in &existing.ids {
            let k = CompositeKey {
                scope: scope.clone(),
                id: id.clone(),
            };
            inner.by_key.remove(&k);
        }
        remove_from_path_index(&mut inner.by_path, &existing.path, &scope, &existing.ids);
        remove_from_path_index(
            &mut inner.by_path,
            &existing.location(),
            &scope,
            &existing.ids,
        );
        let primary_id = existing.primary_id().to_string();
        inner
            .insertion_order
            .retain(|k| !(k.scope == scope && k.id == primary_id));
        Ok(())
    }
}

fn remove_from_path_index(
    by_path: &mut HashMap<String, Vec<CompositeKey>>,
    path: &str,
    scope: &Scope,
    ids: &[String],
) {
    if let Some(keys) = by_path.get_mut(path) {
        keys.retain(|k| !(k.scope == *scope && ids.contains(&k.id)));
        if keys.is_empty() {
            by_path.remove(path);
        }
    }
}
