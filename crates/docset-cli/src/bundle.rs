//! Implementation of the `docset build` command.

use anyhow::{bail, Context, Result};
use docset_core::{build_docset, DocsetReport, DropLog};
use docset_manifest::Manifest;
use std::path::{Path, PathBuf};

/// Options for the build command.
#[derive(Debug)]
pub struct BuildOptions {
    /// Path to docset.toml.
    pub manifest: PathBuf,
    /// Languages replacing the manifest's list, if any.
    pub languages: Vec<String>,
    /// Force the notes variant.
    pub notes: bool,
    /// Output directory replacing the manifest's.
    pub output: Option<PathBuf>,
    pub verbose: bool,
}

/// Load the manifest and apply command-line overrides.
fn load_manifest(options: &BuildOptions) -> Result<Manifest> {
    let mut manifest = Manifest::from_path(&options.manifest)
        .with_context(|| format!("Failed to load '{}'", options.manifest.display()))?;

    if !options.languages.is_empty() {
        manifest.source.languages = options.languages.clone();
    }
    if options.notes {
        manifest.source.notes = true;
    }
    manifest
        .validate()
        .with_context(|| format!("Invalid overrides for '{}'", options.manifest.display()))?;

    Ok(manifest)
}

/// Build every configured language.
///
/// A failing language is reported and skipped; the command fails once all
/// languages have been attempted.
pub fn build_bundles(options: BuildOptions) -> Result<()> {
    let manifest = load_manifest(&options)?;
    let base_dir = match options.manifest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let output = options
        .output
        .clone()
        .unwrap_or_else(|| manifest.output_dir(&base_dir));
    let info = manifest.bundle_info(&base_dir);
    let total = manifest.source.languages.len();

    println!(
        "Building {} docset(s) for {} into {}\n",
        total,
        info.name,
        output.display()
    );

    let mut failed = Vec::new();
    for source in manifest.language_sources(&base_dir) {
        let log = DropLog::new(options.verbose);
        let result = build_docset(&info, &source, &output, &log)
            .with_context(|| format!("Failed to build docset for '{}'", source.language));

        match result {
            Ok(report) => print_report(&source.language, &report, &log, &output),
            Err(e) => {
                println!("  FAIL {}", source.language);
                eprintln!("error: {e:#}");
                failed.push(source.language);
            }
        }
    }

    println!();
    println!(
        "Build result: {} succeeded, {} failed, {} total",
        total - failed.len(),
        failed.len(),
        total
    );

    if failed.is_empty() {
        Ok(())
    } else {
        bail!("Failed languages: {}", failed.join(", "))
    }
}

fn print_report(language: &str, report: &DocsetReport, log: &DropLog, output: &Path) {
    let bundle = report
        .bundle
        .strip_prefix(output)
        .unwrap_or(&report.bundle);

    println!(
        "  OK   {} -> {} ({} entries, {} candidates, {} dropped, {} pages)",
        language,
        bundle.display(),
        report.summary.load.inserted,
        report.summary.load.candidates,
        log.total(),
        report.documents
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(manifest: PathBuf) -> BuildOptions {
        BuildOptions {
            manifest,
            languages: Vec::new(),
            notes: false,
            output: None,
            verbose: false,
        }
    }

    fn write_manifest(dir: &Path, source: &str) -> PathBuf {
        let path = dir.join("docset.toml");
        std::fs::write(&path, source).unwrap();
        path
    }

    #[test]
    fn test_overrides_replace_manifest_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(
            dir.path(),
            "[docset]\nname = \"PHP\"\nidentifier = \"php\"\n\n[source]\nlanguages = [\"en\"]\n",
        );

        let mut options = options(path);
        options.languages = vec!["de".to_string(), "ja".to_string()];
        options.notes = true;

        let manifest = load_manifest(&options).unwrap();
        assert_eq!(manifest.source.languages, vec!["de", "ja"]);
        assert!(manifest.source.notes);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(dir.path(), "[docset]\nname = \"PHP\"\nidentifier = \"php\"\n");

        let mut options = options(path);
        options.languages = vec!["../../etc".to_string()];
        assert!(load_manifest(&options).is_err());
    }

    #[test]
    fn test_failed_language_does_not_stop_others() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(
            dir.path(),
            "[docset]\nname = \"PHP\"\nidentifier = \"php\"\noutput = \"dist\"\n\n\
             [source]\nlanguages = [\"en\", \"de\"]\n",
        );

        // Neither language has rendered inputs
        let err = build_bundles(options(path)).unwrap_err();
        assert!(err.to_string().contains("en, de"));
        assert!(dir.path().join("dist").read_dir().map_or(true, |mut d| d.next().is_none()));
    }
}
