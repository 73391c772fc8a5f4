use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Kind of file an artifact is, as far as ordering is concerned.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Category {
    Markup,
    Stylesheet,
    Script,
    Python,
    Data,
    Documentation,
    Unknown,
}

impl Category {
    /// Classify by file extension. Unrecognized extensions are `Unknown`.
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        let extension = Utf8Path::new(path)
            .extension()
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "html" | "htm" | "xhtml" | "svg" => Self::Markup,
            "css" | "scss" | "sass" | "less" => Self::Stylesheet,
            "js" | "mjs" | "cjs" | "jsx" | "ts" | "tsx" => Self::Script,
            "py" => Self::Python,
            "json" | "yaml" | "yml" | "toml" | "csv" => Self::Data,
            "md" | "rst" | "txt" => Self::Documentation,
            _ => Self::Unknown,
        }
    }
}

/// One requested output, identified by its path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Artifact {
    pub path: String,
    pub category: Category,
}

impl Artifact {
    /// Artifact whose category is derived from the path's extension.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let category = Category::from_path(&path);
        Self { path, category }
    }

    #[must_use]
    pub fn with_category(path: impl Into<String>, category: Category) -> Self {
        Self {
            path: path.into(),
            category,
        }
    }

    /// Artifact with an external category hint; an unparseable hint falls
    /// back to extension-based classification.
    #[must_use]
    pub fn with_hint(path: impl Into<String>, hint: &str) -> Self {
        let path = path.into();
        let category =
            Category::from_str(hint.trim()).unwrap_or_else(|_| Category::from_path(&path));
        Self { path, category }
    }

    /// File name without directories or extension.
    #[must_use]
    pub fn stem(&self) -> Option<&str> {
        Utf8Path::new(&self.path).file_stem()
    }
}
