/// Path builder for the target's REST layout:
/// `{api_prefix}/workspace/{workspace}/knowledge/...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiLayout {
    pub api_prefix: String,
    pub workspace: String,
}

impl Default for ApiLayout {
    fn default() -> Self {
        Self {
            api_prefix: "/admin/api".to_string(),
            workspace: "default".to_string(),
        }
    }
}

impl ApiLayout {
    pub fn api_path(&self, suffix: &str) -> String {
        format!("{}/{}", self.api_prefix, suffix.trim_start_matches('/'))
    }

    /// A collection under an arbitrary workspace, e.g. `application`.
    pub fn workspace_path(&self, workspace: &str, leaf: &str) -> String {
        format!("{}/workspace/{}/{}", self.api_prefix, workspace, leaf)
    }

    pub fn knowledge_collection(&self) -> String {
        self.workspace_path(&self.workspace, "knowledge")
    }

    pub fn knowledge(&self, id: &str) -> String {
        format!("{}/{}", self.knowledge_collection(), id)
    }

    pub fn documents(&self, knowledge_id: &str) -> String {
        format!("{}/document", self.knowledge(knowledge_id))
    }

    pub fn document(&self, knowledge_id: &str, document_id: &str) -> String {
        format!("{}/{}", self.documents(knowledge_id), document_id)
    }

    pub fn user_profile(&self) -> String {
        self.api_path("user/profile")
    }

    pub fn user(&self, id: &str) -> String {
        self.api_path(&format!("user/{}", id))
    }

    /// Upload path templates tried in order during resolution.
    pub fn default_upload_candidates(&self) -> Vec<String> {
        let kb = format!("{}/{{resource_id}}", self.knowledge_collection());
        vec![
            format!("{}/document", kb),
            format!("{}/document/upload", kb),
            format!("{}/document/web", kb),
            format!("{}/file", kb),
            self.api_path("dataset/{resource_id}/document"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout_paths() {
        let layout = ApiLayout::default();
        assert_eq!(layout.knowledge_collection(), "/admin/api/workspace/default/knowledge");
        assert_eq!(layout.documents("ds1"), "/admin/api/workspace/default/knowledge/ds1/document");
        assert_eq!(layout.document("ds1", "d2"), "/admin/api/workspace/default/knowledge/ds1/document/d2");
        assert_eq!(layout.user_profile(), "/admin/api/user/profile");
        assert_eq!(layout.workspace_path("other", "application"), "/admin/api/workspace/other/application");
    }

    #[test]
    fn test_custom_workspace() {
        let layout = ApiLayout { api_prefix: "/api".into(), workspace: "team".into() };
        assert_eq!(layout.knowledge("x"), "/api/workspace/team/knowledge/x");
        assert_eq!(layout.api_path("/user/list"), "/api/user/list");
    }

    #[test]
    fn test_upload_candidates_are_templates() {
        let candidates = ApiLayout::default().default_upload_candidates();
        assert_eq!(candidates.len(), 5);
        assert!(candidates.iter().all(|c| c.contains("{resource_id}")));
        assert_eq!(candidates[0], "/admin/api/workspace/default/knowledge/{resource_id}/document");
        assert_eq!(candidates[4], "/admin/api/dataset/{resource_id}/document");
    }
}
