//! Docset build manifest (`docset.toml`) parsing and validation.

use docset_core::metadata::{is_valid_table_name, DEFAULT_TABLE};
use docset_core::{BundleInfo, LanguageSource};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Conventional manifest file name.
pub const MANIFEST_FILE: &str = "docset.toml";

/// Errors that can occur when working with manifests.
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("failed to read manifest file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse manifest: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid docset name '{0}': {1}")]
    InvalidName(String, &'static str),

    #[error("invalid identifier '{0}': {1}")]
    InvalidIdentifier(String, &'static str),

    #[error("no languages configured")]
    EmptyLanguages,

    #[error("invalid language code '{0}'")]
    InvalidLanguage(String),

    #[error("invalid metadata table name '{0}'")]
    InvalidTable(String),
}

/// The complete docset.toml manifest.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Bundle attributes (required).
    pub docset: DocsetSection,

    /// Where the rendered inputs live.
    #[serde(default)]
    pub source: SourceSection,
}

/// Bundle attributes section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DocsetSection {
    /// Display name, also the prefix of every bundle directory.
    #[serde(default)]
    pub name: String,

    /// Bundle identifier.
    #[serde(default)]
    pub identifier: String,

    /// Search keyword family; the identifier when absent.
    #[serde(default, rename = "platform-family")]
    pub platform_family: Option<String>,

    /// Page opened when the docset is selected.
    #[serde(default = "default_index_page", rename = "index-page")]
    pub index_page: String,

    /// Icon copied into each bundle.
    #[serde(default)]
    pub icon: Option<PathBuf>,

    #[serde(default = "default_true", rename = "javascript-enabled")]
    pub javascript_enabled: bool,

    /// Directory the bundles are written to.
    #[serde(default = "default_output")]
    pub output: PathBuf,
}

/// Rendered input section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceSection {
    /// Directory holding one subdirectory per language.
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Metadata database, relative to the language directory.
    #[serde(default = "default_metadata")]
    pub metadata: PathBuf,

    /// Metadata table name.
    #[serde(default = "default_table")]
    pub table: String,

    /// Rendered pages, relative to the language directory.
    #[serde(default = "default_documents")]
    pub documents: PathBuf,

    /// Languages to build, in order.
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,

    /// Whether the pages were rendered with user notes.
    #[serde(default)]
    pub notes: bool,
}

fn default_true() -> bool {
    true
}

fn default_index_page() -> String {
    String::from("index.html")
}

fn default_output() -> PathBuf {
    PathBuf::from(".")
}

fn default_root() -> PathBuf {
    PathBuf::from("output")
}

fn default_metadata() -> PathBuf {
    PathBuf::from("index.sqlite")
}

fn default_table() -> String {
    String::from(DEFAULT_TABLE)
}

fn default_documents() -> PathBuf {
    PathBuf::from("php-chunked-xhtml")
}

fn default_languages() -> Vec<String> {
    vec![String::from("en")]
}

impl Default for SourceSection {
    fn default() -> Self {
        Self {
            root: default_root(),
            metadata: default_metadata(),
            table: default_table(),
            documents: default_documents(),
            languages: default_languages(),
            notes: false,
        }
    }
}

impl Manifest {
    /// Load a manifest from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse a manifest from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or fails validation.
    pub fn parse(content: &str) -> Result<Self, ManifestError> {
        let manifest: Self = toml::from_str(content)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Validate the manifest.
    ///
    /// Call again after overriding fields.
    pub fn validate(&self) -> Result<(), ManifestError> {
        self.validate_name()?;
        self.validate_identifier()?;
        self.validate_languages()?;

        if !is_valid_table_name(&self.source.table) {
            return Err(ManifestError::InvalidTable(self.source.table.clone()));
        }
        Ok(())
    }

    fn validate_name(&self) -> Result<(), ManifestError> {
        let name = &self.docset.name;

        if name.trim().is_empty() {
            return Err(ManifestError::MissingField("docset.name"));
        }

        // The name becomes part of a directory name
        if name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(ManifestError::InvalidName(
                name.clone(),
                "name cannot contain path separators",
            ));
        }

        Ok(())
    }

    fn validate_identifier(&self) -> Result<(), ManifestError> {
        let identifier = &self.docset.identifier;

        if identifier.is_empty() {
            return Err(ManifestError::MissingField("docset.identifier"));
        }

        for c in identifier.chars() {
            if !c.is_ascii_alphanumeric() && !matches!(c, '.' | '_' | '-') {
                return Err(ManifestError::InvalidIdentifier(
                    identifier.clone(),
                    "identifier can only contain letters, numbers, dots, hyphens, and underscores",
                ));
            }
        }

        Ok(())
    }

    fn validate_languages(&self) -> Result<(), ManifestError> {
        if self.source.languages.is_empty() {
            return Err(ManifestError::EmptyLanguages);
        }

        for language in &self.source.languages {
            if !is_language_code(language) {
                return Err(ManifestError::InvalidLanguage(language.clone()));
            }
        }

        Ok(())
    }

    /// Search keyword family of the bundles.
    #[must_use]
    pub fn platform_family(&self) -> &str {
        self.docset
            .platform_family
            .as_deref()
            .filter(|family| !family.is_empty())
            .unwrap_or(&self.docset.identifier)
    }

    /// Bundle attributes, with the icon resolved against `base_dir`.
    #[must_use]
    pub fn bundle_info(&self, base_dir: &Path) -> BundleInfo {
        BundleInfo {
            name: self.docset.name.clone(),
            identifier: self.docset.identifier.clone(),
            platform_family: self.platform_family().to_string(),
            index_page: self.docset.index_page.clone(),
            javascript_enabled: self.docset.javascript_enabled,
            icon: self.docset.icon.as_ref().map(|icon| base_dir.join(icon)),
        }
    }

    /// Inputs for one language, resolved against `base_dir`.
    #[must_use]
    pub fn language_source(&self, base_dir: &Path, language: &str) -> LanguageSource {
        let dir = base_dir.join(&self.source.root).join(language);
        LanguageSource {
            language: language.to_string(),
            metadata: dir.join(&self.source.metadata),
            table: self.source.table.clone(),
            documents: dir.join(&self.source.documents),
            notes: self.source.notes,
        }
    }

    /// Every configured language's inputs, in order.
    pub fn language_sources<'a>(
        &'a self,
        base_dir: &'a Path,
    ) -> impl Iterator<Item = LanguageSource> + 'a {
        self.source
            .languages
            .iter()
            .map(move |language| self.language_source(base_dir, language))
    }

    /// Output directory, resolved against `base_dir`.
    #[must_use]
    pub fn output_dir(&self, base_dir: &Path) -> PathBuf {
        base_dir.join(&self.docset.output)
    }
}

/// `en`, `pt_BR`, `zh-TW` style codes.
fn is_language_code(code: &str) -> bool {
    let (lang, region) = match code.split_once(['_', '-']) {
        Some((lang, region)) => (lang, Some(region)),
        None => (code, None),
    };

    let lang_ok = (2..=3).contains(&lang.len()) && lang.chars().all(|c| c.is_ascii_alphabetic());
    let region_ok = region.map_or(true, |r| {
        (2..=4).contains(&r.len()) && r.chars().all(|c| c.is_ascii_alphanumeric())
    });
    lang_ok && region_ok
}
