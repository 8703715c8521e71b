//! Resource endpoints, shared by books, members and borrows
//!
//! - GET   /library/{collection}       list with filter[..] and page[..]
//! - POST  /library/{collection}       create (201)
//! - GET   /library/{collection}/{id}  fetch one
//! - PATCH /library/{collection}/{id}  partial update

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use library_core::{parse, Record, ResourceSchema};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::db::ResourceRepo;
use crate::http::error::ApiError;
use crate::http::server::AppState;
use crate::serializer::Serializer;

/// JSON:API request document: `{ "data": { "attributes": { .. } } }`
#[derive(Debug, Deserialize)]
pub struct ResourceDocument {
    pub data: ResourceData,
}

#[derive(Debug, Deserialize)]
pub struct ResourceData {
    #[serde(rename = "type")]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

fn schema_for(collection: &str) -> Result<&'static ResourceSchema, ApiError> {
    ResourceSchema::by_collection(collection)
        .ok_or_else(|| ApiError::UnknownCollection(collection.to_owned()))
}

fn repo<'a>(state: &'a AppState, schema: &'static ResourceSchema) -> ResourceRepo<'a> {
    ResourceRepo::new(state.provider.as_ref(), schema, &state.settings)
}

/// GET /library/{collection}
async fn list_resources(
    State(state): State<Arc<AppState>>,
    Path(collection): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let schema = schema_for(&collection)?;
    let query: BTreeMap<String, String> = params.into_iter().collect();
    let parsed = parse(query.iter().map(|(k, v)| (k.as_str(), v.clone())));

    let page = repo(&state, schema).list(&parsed).await?;
    let doc = Serializer::new(schema, &state.api_base_url).serialize_collection(&page, &query);
    Ok(Json(doc))
}

/// POST /library/{collection}
async fn create_resource(
    State(state): State<Arc<AppState>>,
    Path(collection): Path<String>,
    Json(doc): Json<ResourceDocument>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let schema = schema_for(&collection)?;
    warn_on_type_mismatch(schema, &doc.data);

    let created = repo(&state, schema)
        .create(Record::from(doc.data.attributes))
        .await?;
    let serializer = Serializer::new(schema, &state.api_base_url);
    let body = serializer.serialize_resource(&created, &serializer.collection_url());
    Ok((StatusCode::CREATED, Json(body)))
}

/// GET /library/{collection}/{id}
async fn get_resource(
    State(state): State<Arc<AppState>>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let schema = schema_for(&collection)?;
    let record = repo(&state, schema)
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound {
            resource: schema.resource_type,
            id: id.clone(),
        })?;

    let serializer = Serializer::new(schema, &state.api_base_url);
    Ok(Json(serializer.serialize_resource(&record, &serializer.resource_url(&id))))
}

/// PATCH /library/{collection}/{id}
async fn update_resource(
    State(state): State<Arc<AppState>>,
    Path((collection, id)): Path<(String, String)>,
    Json(doc): Json<ResourceDocument>,
) -> Result<Json<Value>, ApiError> {
    let schema = schema_for(&collection)?;
    warn_on_type_mismatch(schema, &doc.data);

    let record = repo(&state, schema)
        .update(&id, Record::from(doc.data.attributes))
        .await?
        .ok_or_else(|| ApiError::NotFound {
            resource: schema.resource_type,
            id: id.clone(),
        })?;

    let serializer = Serializer::new(schema, &state.api_base_url);
    Ok(Json(serializer.serialize_resource(&record, &serializer.resource_url(&id))))
}

fn warn_on_type_mismatch(schema: &ResourceSchema, data: &ResourceData) {
    if let Some(ty) = data.resource_type.as_deref() {
        if ty != schema.resource_type {
            tracing::warn!(expected = schema.resource_type, got = ty, "request type mismatch");
        }
    }
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/library/{collection}",
            get(list_resources).post(create_resource),
        )
        .route(
            "/library/{collection}/{id}",
            get(get_resource).patch(update_resource),
        )
}
