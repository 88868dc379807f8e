use serde::{Deserialize, Serialize};

/// A named, located fragment of source code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CodeChunk {
    /// Producer-assigned identifier, unique within a store
    pub id: String,

    /// Source file path
    pub filepath: String,

    /// The actual code content
    pub content: String,

    /// Chunk type (function, class, module, etc.)
    #[serde(rename = "type")]
    pub chunk_type: ChunkType,

    /// Symbol name (function name, class name, etc.)
    pub name: String,

    /// Start line (0-indexed)
    pub start_line: usize,

    /// End line (0-indexed, inclusive)
    pub end_line: usize,

    /// Programming language
    pub language: String,

    /// Enclosing chunk, if any. Not checked against the store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    #[serde(default)]
    pub metadata: ChunkMetadata,
}

impl CodeChunk {
    /// Create a new code chunk spanning a single line at 0
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        filepath: impl Into<String>,
        chunk_type: ChunkType,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            filepath: filepath.into(),
            content: content.into(),
            chunk_type,
            name: name.into(),
            start_line: 0,
            end_line: 0,
            language: String::new(),
            parent_id: None,
            metadata: ChunkMetadata::default(),
        }
    }

    /// Builder: set line span
    #[must_use]
    pub const fn lines(mut self, start_line: usize, end_line: usize) -> Self {
        self.start_line = start_line;
        self.end_line = end_line;
        self
    }

    /// Builder: set language
    #[must_use]
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Builder: set parent chunk id
    #[must_use]
    pub fn parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Builder: replace metadata
    #[must_use]
    pub fn with_metadata(mut self, metadata: ChunkMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// File name component of `filepath`, accepting both separators.
    #[must_use]
    pub fn basename(&self) -> &str {
        self.filepath
            .rsplit(|c| c == '/' || c == '\\')
            .next()
            .unwrap_or(self.filepath.as_str())
    }

    /// Text used to embed this chunk.
    ///
    /// Searching with this exact string ranks the chunk first, so it must stay stable across
    /// releases: the store re-embeds from it on add, update and related-chunk lookups.
    #[must_use]
    pub fn canonical_text(&self) -> String {
        let mut parts = vec![
            format!("{} {}", self.chunk_type.as_str(), self.name),
            format!("Language: {}", self.language),
            format!("File: {}", self.filepath),
        ];
        if let Some(signature) = &self.metadata.signature {
            parts.push(format!("Signature: {signature}"));
        }
        if let Some(docstring) = &self.metadata.docstring {
            parts.push(format!("Documentation: {docstring}"));
        }
        parts.push(self.content.clone());
        parts.join("\n")
    }
}

/// Optional facts a producer may attach to a chunk. Every field defaults to absent/empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    /// Declaration line as written, e.g. `fn login(user: &str) -> bool`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,

    /// Documentation/docstring if available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,

    /// Names this chunk depends on (imports, called symbols)
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Producer-computed complexity score
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<u32>,

    /// Source modification time, Unix milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<u64>,
}

impl ChunkMetadata {
    /// Builder: set signature
    #[must_use]
    pub fn signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    /// Builder: set docstring
    #[must_use]
    pub fn docstring(mut self, docstring: impl Into<String>) -> Self {
        self.docstring = Some(docstring.into());
        self
    }

    /// Builder: add dependency
    #[must_use]
    pub fn add_dependency(mut self, dependency: impl Into<String>) -> Self {
        self.dependencies.push(dependency.into());
        self
    }

    /// Builder: set complexity
    #[must_use]
    pub const fn complexity(mut self, complexity: u32) -> Self {
        self.complexity = Some(complexity);
        self
    }

    /// Builder: set modification time
    #[must_use]
    pub const fn last_modified(mut self, unix_ms: u64) -> Self {
        self.last_modified = Some(unix_ms);
        self
    }
}

/// Type of code chunk based on semantic meaning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ChunkType {
    /// Standalone function
    Function,
    /// Class definition
    Class,
    /// Method inside a class
    Method,
    /// Module or file-level unit
    Module,
    /// Variable declaration
    Variable,
    /// Import/use statement
    Import,
}

impl ChunkType {
    /// Get human-readable name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Class => "class",
            Self::Method => "method",
            Self::Module => "module",
            Self::Variable => "variable",
            Self::Import => "import",
        }
    }
}

impl std::fmt::Display for ChunkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> CodeChunk {
        CodeChunk::new(
            "auth.ts#login",
            "src/auth/login.ts",
            ChunkType::Function,
            "login",
            "function login(user, pass) { return check(user, pass); }",
        )
        .lines(10, 15)
        .language("typescript")
    }

    #[test]
    fn basename_handles_both_separators() {
        assert_eq!(sample().basename(), "login.ts");
        let mut chunk = sample();
        chunk.filepath = r"src\win\main.rs".to_string();
        assert_eq!(chunk.basename(), "main.rs");
        chunk.filepath = "plain.py".to_string();
        assert_eq!(chunk.basename(), "plain.py");
    }

    #[test]
    fn canonical_text_includes_optional_metadata_only_when_present() {
        let plain = sample().canonical_text();
        assert!(plain.starts_with("function login\nLanguage: typescript\nFile: src/auth/login.ts"));
        assert!(!plain.contains("Signature:"));
        assert!(!plain.contains("Documentation:"));

        let documented = sample()
            .with_metadata(
                ChunkMetadata::default()
                    .signature("login(user, pass)")
                    .docstring("Checks credentials"),
            )
            .canonical_text();
        assert!(documented.contains("Signature: login(user, pass)\n"));
        assert!(documented.contains("Documentation: Checks credentials\n"));
        assert!(documented.ends_with("return check(user, pass); }"));
    }

    #[test]
    fn serializes_with_camel_case_and_type_field() {
        let chunk = sample()
            .parent("auth.ts")
            .with_metadata(ChunkMetadata::default().last_modified(42));
        let value = serde_json::to_value(&chunk).unwrap();
        assert_eq!(value["type"], "function");
        assert_eq!(value["startLine"], 10);
        assert_eq!(value["endLine"], 15);
        assert_eq!(value["parentId"], "auth.ts");
        assert_eq!(value["metadata"]["lastModified"], 42);

        let back: CodeChunk = serde_json::from_value(value).unwrap();
        assert_eq!(back, chunk);
    }

    #[test]
    fn metadata_fields_default_when_missing() {
        let raw = r#"{
            "id": "x", "filepath": "a.py", "content": "x = 1", "type": "variable",
            "name": "x", "startLine": 0, "endLine": 0, "language": "python"
        }"#;
        let chunk: CodeChunk = serde_json::from_str(raw).unwrap();
        assert_eq!(chunk.metadata, ChunkMetadata::default());
        assert_eq!(chunk.parent_id, None);
    }

    #[test]
    fn test_metadata_builder() {
        let metadata = ChunkMetadata::default()
            .signature("fn run()")
            .add_dependency("tokio")
            .complexity(3);
        assert_eq!(metadata.signature.as_deref(), Some("fn run()"));
        assert_eq!(metadata.dependencies, vec!["tokio".to_string()]);
        assert_eq!(metadata.complexity, Some(3));
        assert_eq!(metadata.docstring, None);
    }
}
