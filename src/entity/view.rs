//! Field-restricted projections of an entity schema.
//!
//! The create view is the full schema minus internal fields; the update
//! view is the create view minus immutable fields. Both are derived by
//! exclusion from the adapter, never listed by hand.

use std::marker::PhantomData;

use serde_json::{Map, Value};

use super::{Entity, CORE_FIELDS, CORE_IMMUTABLE_FIELDS, INTERNAL_FIELDS};

/// Field sets of one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<&'static str>,
    immutable: Vec<&'static str>,
    required: Vec<&'static str>,
}

impl Schema {
    pub fn of<E: Entity>() -> Self {
        let fields = CORE_FIELDS
            .iter()
            .chain(E::FIELDS.iter())
            .map(|f| f.name)
            .collect();
        let immutable = CORE_IMMUTABLE_FIELDS
            .iter()
            .chain(E::IMMUTABLE.iter())
            .copied()
            .collect();
        let required = CORE_FIELDS
            .iter()
            .chain(E::FIELDS.iter())
            .filter(|f| f.is_required() && !INTERNAL_FIELDS.contains(&f.name))
            .map(|f| f.name)
            .collect();
        Self {
            fields,
            immutable,
            required,
        }
    }

    /// Every column, internal ones included.
    pub fn fields(&self) -> &[&'static str] {
        &self.fields
    }

    pub fn create_view(&self) -> Vec<&'static str> {
        exclude(&self.fields, INTERNAL_FIELDS)
    }

    pub fn update_view(&self) -> Vec<&'static str> {
        exclude(&self.create_view(), &self.immutable)
    }

    /// Create-view fields a payload must carry with a non-null value.
    pub fn required(&self) -> &[&'static str] {
        &self.required
    }

    /// Required fields absent from `body` or set to null, in schema order.
    pub fn missing(&self, body: &Map<String, Value>) -> Vec<&'static str> {
        self.required
            .iter()
            .filter(|f| body.get(**f).map_or(true, Value::is_null))
            .copied()
            .collect()
    }

    /// Whether the entity has anything to update at all.
    pub fn is_updatable(&self) -> bool {
        !self.update_view().is_empty()
    }

    /// Keep only the keys of `body` that belong to `view`.
    pub fn project(view: &[&str], body: Map<String, Value>) -> Map<String, Value> {
        body.into_iter()
            .filter(|(key, _)| view.contains(&key.as_str()))
            .collect()
    }
}

fn exclude(fields: &[&'static str], excluded: &[&str]) -> Vec<&'static str> {
    fields
        .iter()
        .filter(|f| !excluded.contains(f))
        .copied()
        .collect()
}

/// Update payload restricted to an entity's update view.
///
/// The only constructor projects through [`Schema::update_view`], so an
/// immutable or internal field can never reach the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Patch<E: Entity> {
    fields: Map<String, Value>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Patch<E> {
    pub fn new(body: Map<String, Value>) -> Self {
        let view = Schema::of::<E>().update_view();
        Self {
            fields: Schema::project(&view, body),
            _entity: PhantomData,
        }
    }

    pub fn empty() -> Self {
        Self::new(Map::new())
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Overlay this patch onto the serialized attributes of a prior version.
    pub fn apply(&self, base: Map<String, Value>) -> Map<String, Value> {
        let mut merged = base;
        for (key, value) in &self.fields {
            merged.insert(key.clone(), value.clone());
        }
        merged
    }
}
