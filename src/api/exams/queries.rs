use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(super) struct ListExamsQuery {
    #[serde(default, alias = "createdBy")]
    pub(super) created_by: Option<String>,
    #[serde(default)]
    pub(super) search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct DeleteExamQuery {
    #[serde(default)]
    #[serde(alias = "forceDelete")]
    pub(super) force_delete: bool,
}
