//! REST API handlers

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use pylon_core::{CycleEdge, CycleGroup, Direction, FileId, TreeNode};
use serde::{Deserialize, Serialize};

use crate::ServerState;

/// Payload consumed by the tree renderer. Labels are drawn with `root_path`
/// stripped.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeResponse {
    pub root: TreeNode,
    pub root_path: String,
    pub cycles: Vec<CycleEdge>,
    pub truncated: bool,
}

#[derive(Debug, Deserialize)]
pub struct TreeQuery {
    pub file: PathBuf,
    #[serde(default)]
    pub direction: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CyclesResponse {
    pub groups: Vec<CycleGroup>,
}

#[derive(Debug, Serialize)]
pub struct FailureResponse {
    pub file: FileId,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct RebuildResponse {
    pub files: usize,
    pub failures: Vec<FailureResponse>,
    /// Why the cache file was not written, if it was not.
    #[serde(rename = "persistenceFailure", skip_serializing_if = "Option::is_none")]
    pub persistence_failure: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClearCacheResponse {
    pub removed: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub files: usize,
}

/// Error body: `{ "error": "..." }` with a matching status.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(message: impl ToString) -> Self {
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}

/// Forward (`dependent`) or reverse (`be-dependent`) tree for one file.
pub async fn get_tree(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<TreeQuery>,
) -> Result<Json<TreeResponse>, ApiError> {
    let direction = match query.direction.as_deref() {
        None | Some("") => Direction::default(),
        Some(value) => value.parse::<Direction>().map_err(ApiError::bad_request)?,
    };

    let tree = state.indexer.tree(&query.file, direction).await;
    Ok(Json(TreeResponse {
        root: tree.root,
        root_path: state.indexer.root_path().to_string_lossy().into_owned(),
        cycles: tree.cycles,
        truncated: tree.truncated,
    }))
}

pub async fn get_cycles(State(state): State<Arc<ServerState>>) -> Json<CyclesResponse> {
    Json(CyclesResponse {
        groups: state.indexer.cycle_groups().await,
    })
}

/// Full rebuild. Per-file failures and a failed cache write are reported in
/// the body, not as an error.
pub async fn rebuild(State(state): State<Arc<ServerState>>) -> Result<Json<RebuildResponse>, ApiError> {
    let outcome = state.indexer.rebuild().await.map_err(|e| {
        tracing::warn!("rebuild requested over HTTP failed: {e}");
        ApiError::internal(e)
    })?;

    Ok(Json(RebuildResponse {
        files: outcome.files,
        failures: outcome
            .failures
            .into_iter()
            .map(|failure| FailureResponse {
                file: failure.file,
                error: failure.error.to_string(),
            })
            .collect(),
        persistence_failure: outcome.persistence_failure,
    }))
}

pub async fn clear_cache(State(state): State<Arc<ServerState>>) -> Result<Json<ClearCacheResponse>, ApiError> {
    let removed = state.indexer.clear_cache().await.map_err(ApiError::internal)?;
    Ok(Json(ClearCacheResponse { removed }))
}

pub async fn health_check(State(state): State<Arc<ServerState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        files: state.indexer.snapshot().await.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pylon_core::Config;
    use pylon_indexer::Indexer;
    use std::fs;
    use tempfile::TempDir;

    async fn state_for(files: &[(&str, &str)]) -> (TempDir, Arc<ServerState>) {
        let dir = TempDir::new().unwrap();
        for (name, contents) in files {
            fs::write(dir.path().join(name), contents).unwrap();
        }
        let indexer = Indexer::new(Config::load(dir.path()).unwrap()).unwrap();
        indexer.activate().await.unwrap();
        (dir, Arc::new(ServerState::new(Arc::new(indexer))))
    }

    fn query(file: &str, direction: Option<&str>) -> Query<TreeQuery> {
        Query(TreeQuery {
            file: PathBuf::from(file),
            direction: direction.map(str::to_string),
        })
    }

    #[tokio::test]
    async fn test_tree_payload_is_camel_case() {
        let (_dir, state) = state_for(&[("a.js", "import './b';"), ("b.js", "import './a';")]).await;

        let Json(response) = get_tree(State(state.clone()), query("a.js", None)).await.unwrap();
        let root_path = state.indexer.root_path().to_path_buf();
        assert_eq!(response.root.name.label(&root_path), "a.js");
        assert_eq!(response.cycles.len(), 1);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["rootPath"].as_str(), root_path.to_str());
        assert_eq!(json["truncated"], false);
        assert!(json["cycles"][0]["source"].as_str().unwrap().ends_with("b.js"));
    }

    #[tokio::test]
    async fn test_reverse_tree() {
        let (_dir, state) = state_for(&[("a.js", "import './b';"), ("b.js", "")]).await;
        let root_path = state.indexer.root_path().to_path_buf();

        let Json(response) = get_tree(State(state), query("b.js", Some("be-dependent")))
            .await
            .unwrap();
        let children: Vec<String> = response
            .root
            .children
            .iter()
            .map(|child| child.name.label(&root_path))
            .collect();
        assert_eq!(children, vec!["a.js"]);
    }

    #[tokio::test]
    async fn test_bad_direction_is_rejected() {
        let (_dir, state) = state_for(&[("a.js", "")]).await;
        let error = get_tree(State(state), query("a.js", Some("sideways")))
            .await
            .unwrap_err();
        assert_eq!(error.status, StatusCode::BAD_REQUEST);
        assert!(error.message.contains("sideways"));
    }

    #[tokio::test]
    async fn test_rebuild_and_clear_cache() {
        let (_dir, state) = state_for(&[("a.js", ""), ("b.js", "")]).await;

        let Json(rebuilt) = rebuild(State(state.clone())).await.unwrap();
        assert_eq!(rebuilt.files, 2);
        assert!(rebuilt.failures.is_empty());
        let json = serde_json::to_value(&rebuilt).unwrap();
        assert!(json.get("persistenceFailure").is_none());

        let Json(cleared) = clear_cache(State(state.clone())).await.unwrap();
        assert!(cleared.removed);
        let Json(cleared) = clear_cache(State(state)).await.unwrap();
        assert!(!cleared.removed);
    }

    #[tokio::test]
    async fn test_rebuild_reports_unwritable_cache() {
        let (_dir, state) = state_for(&[
            ("blocker", ""),
            ("pylon.toml", "cache_dir = \"blocker\"\n"),
            ("a.js", "import './b';"),
            ("b.js", ""),
        ])
        .await;

        let Json(rebuilt) = rebuild(State(state.clone())).await.unwrap();
        assert_eq!(rebuilt.files, 2);
        assert!(rebuilt.persistence_failure.is_some());

        let json = serde_json::to_value(&rebuilt).unwrap();
        assert!(json["persistenceFailure"].as_str().unwrap().contains("blocker"));
        assert_eq!(state.indexer.snapshot().await.len(), 2);
    }

    #[tokio::test]
    async fn test_cycles_endpoint() {
        let (_dir, state) = state_for(&[("a.js", "import './b';"), ("b.js", "import './a';"), ("c.js", "")]).await;
        let Json(response) = get_cycles(State(state)).await;
        assert_eq!(response.groups.len(), 1);
        assert_eq!(response.groups[0].len(), 2);
    }

    #[tokio::test]
    async fn test_health_check() {
        let (_dir, state) = state_for(&[("a.js", "")]).await;
        let Json(health) = health_check(State(state)).await;
        assert_eq!(health.status, "ok");
        assert_eq!(health.files, 1);
    }

    #[test]
    fn test_error_body() {
        let response = ApiError::bad_request("nope").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
