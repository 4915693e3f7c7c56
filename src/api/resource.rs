//! Generic REST bindings for one entity.
//!
//! Routes, per collection `{c}`:
//! - `GET /{c}` active records, or a search when query parameters are given
//! - `GET /{c}/+history` every version, same query parameters
//! - `POST /{c}` create from the create view
//! - `GET /{c}/{identifier}` the active version
//! - `GET /{c}/{identifier}/+history` every version of one record
//! - `PUT /{c}/{identifier}` update from the update view, only when the
//!   entity has updatable fields
//! - `DELETE /{c}/{identifier}` retire the active version

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::routing::{get, MethodRouter};
use axum::{Json, Router};
use orchestrix_client::{BaseResult, ListResult, RecordResult};
use serde_json::{Map, Value};
use tracing::debug;

use super::error::ApiError;
use crate::entity::{Entity, NewRecord, Patch, Record, Schema};
use crate::store::{SearchQuery, VersionedStore};

/// Shared state for one entity's handlers.
type Store<E> = Arc<dyn VersionedStore<E>>;

type ListResponse<E> = Json<ListResult<Record<<E as Entity>::Attributes>>>;
type RecordResponse<E> = Json<RecordResult<Record<<E as Entity>::Attributes>>>;

/// Build the router exposing `store` under `/{E::COLLECTION}`.
pub fn resource_router<E: Entity>(store: Store<E>) -> Router {
    let collection = format!("/{}", E::COLLECTION);
    let collection_history = format!("/{}/+history", E::COLLECTION);
    let item = format!("/{}/{{identifier}}", E::COLLECTION);
    let item_history = format!("/{}/{{identifier}}/+history", E::COLLECTION);

    let mut item_routes: MethodRouter<Store<E>> =
        get(get_record::<E>).delete(delete_record::<E>);
    if Schema::of::<E>().is_updatable() {
        item_routes = item_routes.put(update_record::<E>);
    }

    Router::new()
        .route(&collection, get(list_records::<E>).post(create_record::<E>))
        .route(&collection_history, get(list_history::<E>))
        .route(&item, item_routes)
        .route(&item_history, get(record_history::<E>))
        .with_state(store)
}

/// Turn query parameters into a search. `offset` and `limit` window the
/// result; every other parameter is an equality filter.
fn search_query(
    mut params: BTreeMap<String, String>,
    only_active: bool,
) -> Result<SearchQuery, ApiError> {
    let offset = match params.remove("offset") {
        Some(raw) => parse_window("offset", &raw)?,
        None => 0,
    };
    let limit = params
        .remove("limit")
        .map(|raw| parse_window("limit", &raw))
        .transpose()?;

    Ok(SearchQuery {
        offset,
        limit,
        filters: params,
        only_active,
    })
}

fn parse_window(param: &str, raw: &str) -> Result<u64, ApiError> {
    raw.parse().map_err(|_| {
        ApiError::invalid(
            vec!["query".to_string(), param.to_string()],
            format!("'{}' is not a non-negative integer", raw),
        )
    })
}

/// Parse a request body as a JSON object. An empty body is an empty object.
fn parse_object(body: &Bytes) -> Result<Map<String, Value>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ApiError::invalid(
            vec!["body".to_string()],
            "expected a JSON object",
        )),
        Err(e) => Err(ApiError::invalid(vec!["body".to_string()], e.to_string())),
    }
}

async fn list<E: Entity>(
    store: &Store<E>,
    params: BTreeMap<String, String>,
    only_active: bool,
) -> Result<ListResponse<E>, ApiError> {
    let records = if params.is_empty() && only_active {
        store.list_active().await?
    } else if params.is_empty() {
        store.list_history().await?
    } else {
        store.search(search_query(params, only_active)?).await?
    };
    Ok(Json(ListResult::success(records)))
}

async fn list_records<E: Entity>(
    State(store): State<Store<E>>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<ListResponse<E>, ApiError> {
    list(&store, params, true).await
}

async fn list_history<E: Entity>(
    State(store): State<Store<E>>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<ListResponse<E>, ApiError> {
    list(&store, params, false).await
}

async fn create_record<E: Entity>(
    State(store): State<Store<E>>,
    body: Bytes,
) -> Result<RecordResponse<E>, ApiError> {
    let schema = Schema::of::<E>();
    let payload = Schema::project(&schema.create_view(), parse_object(&body)?);
    let missing = schema.missing(&payload);
    if !missing.is_empty() {
        return Err(ApiError::missing(&missing));
    }

    let data: NewRecord<E::Attributes> =
        serde_json::from_value(Value::Object(payload)).map_err(ApiError::from_body)?;

    let record = store.create(data).await?;
    Ok(Json(RecordResult::success(record)))
}

async fn get_record<E: Entity>(
    State(store): State<Store<E>>,
    Path(identifier): Path<String>,
) -> Result<RecordResponse<E>, ApiError> {
    let record = store.get(&identifier).await?;
    Ok(Json(RecordResult::success(record)))
}

async fn record_history<E: Entity>(
    State(store): State<Store<E>>,
    Path(identifier): Path<String>,
) -> Result<ListResponse<E>, ApiError> {
    let records = store.get_history(&identifier).await?;
    Ok(Json(ListResult::success(records)))
}

async fn update_record<E: Entity>(
    State(store): State<Store<E>>,
    Path(identifier): Path<String>,
    body: Bytes,
) -> Result<RecordResponse<E>, ApiError> {
    let patch = Patch::<E>::new(parse_object(&body)?);
    debug!(
        entity = E::ENTITY_TYPE,
        identifier = %identifier,
        fields = ?patch.fields().keys().collect::<Vec<_>>(),
        "update requested"
    );

    let record = store.update(&identifier, patch).await?;
    Ok(Json(RecordResult::success(record)))
}

async fn delete_record<E: Entity>(
    State(store): State<Store<E>>,
    Path(identifier): Path<String>,
) -> Result<Json<BaseResult>, ApiError> {
    store.delete(&identifier).await?;
    Ok(Json(BaseResult::success()))
}
