use crate::model::Highlight;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct PathQuery {
    pub path: String,
}

/// Body of a replace request. The highlight list is the complete desired
/// state, not a delta; missing ids are generated on save.
#[derive(Debug, Deserialize)]
pub struct ReplaceHighlightsRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub highlights: Vec<Highlight>,
}

#[derive(Debug, Serialize)]
pub struct ExistsResponse {
    pub path: String,
    pub exists: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
