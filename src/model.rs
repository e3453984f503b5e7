//! Wire types returned by the documentation backend.
//!
//! Field names follow the backend's PascalCase JSON. Every field is
//! defaulted so older or trimmed-down backends still decode.

use serde::{Deserialize, Serialize};

/// A markdown document as listed in the index and in search results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Document {
    pub title: String,
    /// Path relative to its source directory, used to fetch the document.
    pub rel_path: String,
    /// Sub-directory the document lives in, empty at the source root.
    pub dir_name: String,
    /// Display name of the configured source directory.
    pub source_name: String,
    pub abs_path: String,
    /// Leading excerpt of the document body.
    pub overview: String,
}

/// Documents sharing one source directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DirectoryGroup {
    pub name: String,
    pub documents: Vec<Document>,
}

/// Payload of `GET /api/index`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct IndexData {
    pub title: String,
    pub groups: Vec<DirectoryGroup>,
    pub total_documents: usize,
}

impl IndexData {
    /// Iterate every document across all groups, in group order.
    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.groups.iter().flat_map(|g| g.documents.iter())
    }
}

/// Payload of `GET /api/doc/{path}`: metadata plus the rendered body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentPage {
    #[serde(flatten)]
    pub document: Document,
    /// Raw markdown source, when the backend sends it.
    #[serde(rename = "Content", default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Rendered HTML, when the backend sends it.
    #[serde(rename = "HTML", default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

impl DocumentPage {
    /// The best available body: markdown source first, then HTML.
    pub fn body(&self) -> Option<&str> {
        self.content.as_deref().or(self.html.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_decodes_backend_field_names() {
        let json = r#"{
            "Title": "Notes",
            "Groups": [
                {"Name": "docs", "Documents": [
                    {"Title": "Intro", "RelPath": "intro.md", "DirName": "",
                     "SourceName": "docs", "AbsPath": "/srv/docs/intro.md",
                     "Overview": "Start here"}
                ]},
                {"Name": "blog", "Documents": []}
            ],
            "TotalDocuments": 1
        }"#;
        let index: IndexData = serde_json::from_str(json).unwrap();
        assert_eq!(index.title, "Notes");
        assert_eq!(index.total_documents, 1);
        assert_eq!(index.groups.len(), 2);

        let docs: Vec<_> = index.documents().collect();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].rel_path, "intro.md");
        assert_eq!(docs[0].overview, "Start here");
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let doc: Document = serde_json::from_str(r#"{"Title": "Bare"}"#).unwrap();
        assert_eq!(doc.title, "Bare");
        assert!(doc.rel_path.is_empty());

        let index: IndexData = serde_json::from_str("{}").unwrap();
        assert!(index.groups.is_empty());
    }

    #[test]
    fn document_page_flattens_metadata() {
        let json = r#"{"Title": "Guide", "RelPath": "a/guide.md", "Content": "hello"}"#;
        let page: DocumentPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.document.title, "Guide");
        assert_eq!(page.document.rel_path, "a/guide.md");
        assert_eq!(page.body(), Some("hello"));
        assert!(page.html.is_none());
    }

    #[test]
    fn document_page_falls_back_to_html_body() {
        let page: DocumentPage = serde_json::from_str(r#"{"HTML": "<p>hi</p>"}"#).unwrap();
        assert_eq!(page.body(), Some("<p>hi</p>"));
    }
}
