//! Docset bundle assembly
//!
//! A docset is a directory bundle:
//! ```text
//! PHP_en.docset/
//! ├── icon.png                      # optional
//! └── Contents/
//!     ├── Info.plist
//!     └── Resources/
//!         ├── docSet.dsidx          # search index
//!         └── Documents/            # rendered pages
//! ```
//!
//! Bundles are assembled in a staging directory beside their destination
//! and renamed into place once the index is complete, so a failed build
//! never leaves a half-written bundle behind. An existing bundle with the
//! same name is replaced.

use std::fmt::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::builder::{BuildError, BuildSummary, IndexBuilder};
use crate::diagnostics::BuildObserver;
use crate::document::DocumentStore;
use crate::index::{IndexWriter, INDEX_FILE};
use crate::metadata::SqliteMetadataStore;

/// Bundle directory extension
pub const BUNDLE_EXT: &str = "docset";

/// Errors raised while assembling a docset
#[derive(Error, Debug)]
pub enum DocsetError {
    #[error("source not found: {0}")]
    MissingSource(PathBuf),

    #[error("I/O error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Build(#[from] BuildError),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> DocsetError + '_ {
    move |source| DocsetError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Bundle attributes written to `Info.plist`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleInfo {
    /// Display name, e.g. `PHP`
    pub name: String,
    /// Bundle identifier
    pub identifier: String,
    /// Keyword the host application uses to scope searches
    pub platform_family: String,
    /// Page opened when the docset is selected
    pub index_page: String,
    pub javascript_enabled: bool,
    /// Icon copied to the bundle root
    pub icon: Option<PathBuf>,
}

/// Inputs rendered for one language
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageSource {
    pub language: String,
    /// Renderer metadata database
    pub metadata: PathBuf,
    /// Metadata table name
    pub table: String,
    /// Directory of rendered pages
    pub documents: PathBuf,
    /// Whether the pages include user-contributed notes
    pub notes: bool,
}

impl LanguageSource {
    /// Directory name of the bundle built from this source
    pub fn bundle_name(&self, info: &BundleInfo) -> String {
        let mut name = format!("{}_{}", info.name, self.language);
        if self.notes {
            name.push_str("_notes");
        }
        format!("{name}.{BUNDLE_EXT}")
    }

    /// Bundle display name
    pub fn display_name(&self, info: &BundleInfo) -> String {
        if self.notes {
            format!("{} ({}, with notes)", info.name, self.language)
        } else {
            format!("{} ({})", info.name, self.language)
        }
    }
}

/// Paths inside a bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocsetLayout {
    root: PathBuf,
}

impl DocsetLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn contents(&self) -> PathBuf {
        self.root.join("Contents")
    }

    pub fn resources(&self) -> PathBuf {
        self.contents().join("Resources")
    }

    pub fn documents(&self) -> PathBuf {
        self.resources().join("Documents")
    }

    pub fn index(&self) -> PathBuf {
        self.resources().join(INDEX_FILE)
    }

    pub fn info_plist(&self) -> PathBuf {
        self.contents().join("Info.plist")
    }

    pub fn icon(&self) -> PathBuf {
        self.root.join("icon.png")
    }
}

/// Render the bundle's `Info.plist`
pub fn info_plist(info: &BundleInfo, source: &LanguageSource) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str(
        "<!DOCTYPE plist PUBLIC \"-//Apple//DTD PLIST 1.0//EN\" \
         \"http://www.apple.com/DTDs/PropertyList-1.0.dtd\">\n",
    );
    out.push_str("<plist version=\"1.0\">\n<dict>\n");

    let strings = [
        ("CFBundleIdentifier", info.identifier.clone()),
        ("CFBundleName", source.display_name(info)),
        ("DocSetPlatformFamily", info.platform_family.clone()),
        ("dashIndexFilePath", info.index_page.clone()),
    ];
    for (key, value) in &strings {
        let _ = writeln!(
            out,
            "\t<key>{key}</key>\n\t<string>{}</string>",
            escape_xml(value)
        );
    }

    let flags = [
        ("isDashDocset", true),
        ("isJavaScriptEnabled", info.javascript_enabled),
    ];
    for (key, value) in flags {
        let _ = writeln!(out, "\t<key>{key}</key>\n\t<{value}/>");
    }

    out.push_str("</dict>\n</plist>\n");
    out
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Recursively copy `src` into `dst`, returning the number of files copied
pub fn copy_tree(src: &Path, dst: &Path) -> Result<u64, DocsetError> {
    std::fs::create_dir_all(dst).map_err(io_error(dst))?;

    let mut copied = 0;
    for entry in std::fs::read_dir(src).map_err(io_error(src))? {
        let entry = entry.map_err(io_error(src))?;
        let path = entry.path();
        let target = dst.join(entry.file_name());
        let file_type = entry.file_type().map_err(io_error(&path))?;

        // Symlinked files are copied by content; symlinked directories are
        // not followed
        if file_type.is_dir() {
            copied += copy_tree(&path, &target)?;
        } else if file_type.is_file() || (file_type.is_symlink() && path.is_file()) {
            std::fs::copy(&path, &target).map_err(io_error(&path))?;
            copied += 1;
        }
    }

    Ok(copied)
}

/// Move `staged` to `destination`, replacing any existing directory.
///
/// A previous directory is first moved aside into `scratch_dir` and only
/// deleted once the new one is in place; if the final rename fails it is
/// moved back.
fn replace_dir(staged: &Path, destination: &Path, scratch_dir: &Path) -> Result<(), DocsetError> {
    if !destination.exists() {
        return std::fs::rename(staged, destination).map_err(io_error(destination));
    }

    let previous = tempfile::Builder::new()
        .prefix(".docset-previous")
        .tempdir_in(scratch_dir)
        .map_err(io_error(scratch_dir))?;
    let aside = previous.path().join("bundle");
    std::fs::rename(destination, &aside).map_err(io_error(destination))?;

    if let Err(source) = std::fs::rename(staged, destination) {
        if let Err(e) = std::fs::rename(&aside, destination) {
            tracing::warn!(
                previous = %aside.display(),
                error = %e,
                "failed to restore previous bundle"
            );
            // Leave the scratch dir, and the old bundle in it, on disk
            std::mem::forget(previous);
        }
        return Err(DocsetError::Io {
            path: destination.to_path_buf(),
            source,
        });
    }

    Ok(())
}

/// Outcome of a docset build
#[derive(Debug, Clone)]
pub struct DocsetReport {
    /// Location of the finished bundle
    pub bundle: PathBuf,
    /// Pages copied into the bundle
    pub documents: u64,
    pub summary: BuildSummary,
}

/// Assemble the docset for one language under `output_dir`
pub fn build_docset(
    info: &BundleInfo,
    source: &LanguageSource,
    output_dir: &Path,
    observer: &dyn BuildObserver,
) -> Result<DocsetReport, DocsetError> {
    for required in [&source.metadata, &source.documents] {
        if !required.exists() {
            return Err(DocsetError::MissingSource(required.clone()));
        }
    }
    if let Some(icon) = &info.icon {
        if !icon.is_file() {
            return Err(DocsetError::MissingSource(icon.clone()));
        }
    }

    let store = SqliteMetadataStore::open(&source.metadata, &source.table)
        .map_err(BuildError::from)?;

    std::fs::create_dir_all(output_dir).map_err(io_error(output_dir))?;
    let bundle = output_dir.join(source.bundle_name(info));
    let staging = tempfile::Builder::new()
        .prefix(".docset-staging")
        .tempdir_in(output_dir)
        .map_err(io_error(output_dir))?;
    let layout = DocsetLayout::new(staging.path());

    tracing::info!(
        language = %source.language,
        bundle = %bundle.display(),
        "building docset"
    );

    let documents = copy_tree(&source.documents, &layout.documents())?;
    tracing::debug!(documents, "copied rendered pages");

    let plist = layout.info_plist();
    std::fs::write(&plist, info_plist(info, source)).map_err(io_error(&plist))?;
    if let Some(icon) = &info.icon {
        std::fs::copy(icon, layout.icon()).map_err(io_error(icon))?;
    }

    let pages = DocumentStore::new(layout.documents());
    let mut writer = IndexWriter::create(layout.index()).map_err(BuildError::from)?;
    let summary = IndexBuilder::new(&store, &pages)
        .with_observer(observer)
        .build(&mut writer)?;
    writer.finish().map_err(BuildError::from)?;

    replace_dir(staging.path(), &bundle, output_dir)?;

    tracing::info!(
        language = %source.language,
        inserted = summary.load.inserted,
        candidates = summary.load.candidates,
        "docset complete"
    );

    Ok(DocsetReport {
        bundle,
        documents,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> BundleInfo {
        BundleInfo {
            name: "PHP".to_string(),
            identifier: "php".to_string(),
            platform_family: "php".to_string(),
            index_page: "index.html".to_string(),
            javascript_enabled: true,
            icon: None,
        }
    }

    fn source(notes: bool) -> LanguageSource {
        LanguageSource {
            language: "en".to_string(),
            metadata: PathBuf::from("output/en/index.sqlite"),
            table: "ids".to_string(),
            documents: PathBuf::from("output/en/php-chunked-xhtml"),
            notes,
        }
    }

    #[test]
    fn test_bundle_names() {
        assert_eq!(source(false).bundle_name(&info()), "PHP_en.docset");
        assert_eq!(source(true).bundle_name(&info()), "PHP_en_notes.docset");
        assert_eq!(source(true).display_name(&info()), "PHP (en, with notes)");
    }

    #[test]
    fn test_layout_paths() {
        let layout = DocsetLayout::new("out/PHP_en.docset");
        assert_eq!(
            layout.index(),
            PathBuf::from("out/PHP_en.docset/Contents/Resources/docSet.dsidx")
        );
        assert_eq!(
            layout.documents(),
            PathBuf::from("out/PHP_en.docset/Contents/Resources/Documents")
        );
        assert_eq!(
            layout.info_plist(),
            PathBuf::from("out/PHP_en.docset/Contents/Info.plist")
        );
    }

    #[test]
    fn test_info_plist() {
        let mut info = info();
        info.name = "PHP & Friends".to_string();
        info.javascript_enabled = false;
        let plist = info_plist(&info, &source(false));

        assert!(plist.contains("<key>CFBundleIdentifier</key>\n\t<string>php</string>"));
        assert!(plist.contains("<string>PHP &amp; Friends (en)</string>"));
        assert!(plist.contains("<key>isDashDocset</key>\n\t<true/>"));
        assert!(plist.contains("<key>isJavaScriptEnabled</key>\n\t<false/>"));
        assert!(plist.contains("<key>dashIndexFilePath</key>\n\t<string>index.html</string>"));
    }

    #[test]
    fn test_copy_tree() {
        let src = tempfile::tempdir().unwrap();
        std::fs::write(src.path().join("index.html"), "<html/>").unwrap();
        std::fs::create_dir(src.path().join("images")).unwrap();
        std::fs::write(src.path().join("images").join("logo.png"), [0u8; 4]).unwrap();

        let dst = tempfile::tempdir().unwrap();
        let target = dst.path().join("Documents");
        assert_eq!(copy_tree(src.path(), &target).unwrap(), 2);
        assert!(target.join("images").join("logo.png").is_file());
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_tree_does_not_follow_directory_symlinks() {
        let src = tempfile::tempdir().unwrap();
        std::fs::create_dir(src.path().join("nested")).unwrap();
        std::fs::write(src.path().join("nested").join("page.html"), "<html/>").unwrap();
        std::os::unix::fs::symlink(src.path(), src.path().join("nested").join("loop")).unwrap();
        std::os::unix::fs::symlink(
            src.path().join("nested").join("page.html"),
            src.path().join("alias.html"),
        )
        .unwrap();

        let dst = tempfile::tempdir().unwrap();
        let target = dst.path().join("Documents");
        assert_eq!(copy_tree(src.path(), &target).unwrap(), 2);
        assert!(target.join("alias.html").is_file());
        assert!(!target.join("nested").join("loop").exists());
    }

    #[test]
    fn test_replace_dir_swaps_contents() {
        let out = tempfile::tempdir().unwrap();
        let bundle = out.path().join("PHP_en.docset");
        std::fs::create_dir(&bundle).unwrap();
        std::fs::write(bundle.join("old"), "").unwrap();
        let staged = out.path().join("staged");
        std::fs::create_dir(&staged).unwrap();
        std::fs::write(staged.join("new"), "").unwrap();

        replace_dir(&staged, &bundle, out.path()).unwrap();

        assert!(bundle.join("new").is_file());
        assert!(!bundle.join("old").exists());
        assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_replace_dir_failure_keeps_previous_bundle() {
        let out = tempfile::tempdir().unwrap();
        let bundle = out.path().join("PHP_en.docset");
        std::fs::create_dir(&bundle).unwrap();
        std::fs::write(bundle.join("old"), "").unwrap();

        let result = replace_dir(&out.path().join("never-staged"), &bundle, out.path());

        assert!(matches!(result, Err(DocsetError::Io { .. })));
        assert!(bundle.join("old").is_file());
        assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_missing_source() {
        let out = tempfile::tempdir().unwrap();
        let err = build_docset(&info(), &source(false), out.path(), &()).unwrap_err();
        assert!(matches!(err, DocsetError::MissingSource(_)));
    }
}
