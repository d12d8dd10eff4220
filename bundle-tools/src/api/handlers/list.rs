use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};

use crate::api::router::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Only list entries whose names start with this
    #[serde(default)]
    prefix: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntryInfo {
    pub name: String,
    pub size: u64,
    pub compressed: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListResponse {
    pub prefix: String,
    pub count: usize,
    pub entries: Vec<EntryInfo>,
}

/// GET /
/// Bundle directory, sorted by name
pub async fn list_handler(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Json<ListResponse> {
    let entries: Vec<EntryInfo> = state
        .index
        .directory(&query.prefix)
        .into_iter()
        .map(|e| EntryInfo {
            name: e.name().to_string(),
            size: e.size(),
            compressed: e.is_compressed(),
        })
        .collect();

    Json(ListResponse {
        prefix: query.prefix,
        count: entries.len(),
        entries,
    })
}
