//! Owner-scoped file and folder operations.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use fileshelf_core::models::{FileNode, ParentRef, UploadRequest};
use serde::Deserialize;

use super::parse_id;
use crate::auth::UserContext;
use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub parent_id: Option<String>,
    pub page: Option<String>,
}

impl ListQuery {
    /// `Err(())` when `parentId` cannot name any node, so the page is empty.
    fn parent(&self) -> Result<Option<ParentRef>, ()> {
        match self.parent_id.as_deref() {
            None => Ok(None),
            Some(raw) => ParentRef::from_query(raw).map(Some).ok_or(()),
        }
    }

    /// Zero-indexed; anything unparseable is the first page.
    fn page(&self) -> u32 {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(0)
    }
}

/// `POST /files`
#[tracing::instrument(skip_all, fields(operation = "upload", user_id = %ctx.user_id))]
pub async fn upload(
    State(state): State<Arc<AppState>>,
    ctx: UserContext,
    ValidatedJson(request): ValidatedJson<UploadRequest>,
) -> Result<(StatusCode, Json<FileNode>), HttpAppError> {
    let node = state.files.upload(ctx.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(node)))
}

/// `GET /files/{id}`
pub async fn show(
    State(state): State<Arc<AppState>>,
    ctx: UserContext,
    Path(id): Path<String>,
) -> Result<Json<FileNode>, HttpAppError> {
    let id = parse_id(&id)?;
    Ok(Json(state.files.show(ctx.user_id, id).await?))
}

/// `GET /files?parentId=&page=`
pub async fn index(
    State(state): State<Arc<AppState>>,
    ctx: UserContext,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<FileNode>>, HttpAppError> {
    let Ok(parent) = query.parent() else {
        return Ok(Json(Vec::new()));
    };
    let nodes = state.files.index(ctx.user_id, parent, query.page()).await?;
    Ok(Json(nodes))
}

/// `PUT /files/{id}/publish`
pub async fn publish(
    State(state): State<Arc<AppState>>,
    ctx: UserContext,
    Path(id): Path<String>,
) -> Result<Json<FileNode>, HttpAppError> {
    let id = parse_id(&id)?;
    Ok(Json(state.files.set_visibility(ctx.user_id, id, true).await?))
}

/// `PUT /files/{id}/unpublish`
pub async fn unpublish(
    State(state): State<Arc<AppState>>,
    ctx: UserContext,
    Path(id): Path<String>,
) -> Result<Json<FileNode>, HttpAppError> {
    let id = parse_id(&id)?;
    Ok(Json(state.files.set_visibility(ctx.user_id, id, false).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(parent_id: Option<&str>, page: Option<&str>) -> ListQuery {
        ListQuery {
            parent_id: parent_id.map(String::from),
            page: page.map(String::from),
        }
    }

    #[test]
    fn test_list_query_parent() {
        assert_eq!(query(None, None).parent(), Ok(None));
        assert_eq!(query(Some("0"), None).parent(), Ok(Some(ParentRef::Root)));
        assert!(query(Some("nope"), None).parent().is_err());

        let id = uuid::Uuid::new_v4();
        assert_eq!(
            query(Some(&id.to_string()), None).parent(),
            Ok(Some(ParentRef::Folder(id)))
        );
    }

    #[test]
    fn test_list_query_page() {
        assert_eq!(query(None, None).page(), 0);
        assert_eq!(query(None, Some("3")).page(), 3);
        assert_eq!(query(None, Some("-1")).page(), 0);
        assert_eq!(query(None, Some("abc")).page(), 0);
    }
}
