//! Docset CLI - builds searchable docsets from rendered manuals

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod bundle;
mod index;

#[derive(Parser)]
#[command(name = "docset")]
#[command(version = docset_core::VERSION)]
#[command(about = "Build searchable docsets from rendered manuals", long_about = None)]
struct Cli {
    /// Log every dropped candidate and per-job counts
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build one docset bundle per configured language
    Build {
        /// Path to the build manifest
        #[arg(long, default_value = docset_manifest::MANIFEST_FILE)]
        manifest: PathBuf,

        /// Languages to build (overrides the manifest; repeatable)
        #[arg(long = "lang", value_name = "LANG")]
        languages: Vec<String>,

        /// The pages include user-contributed notes
        #[arg(long)]
        notes: bool,

        /// Directory to write bundles to (overrides the manifest)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Build only the search index
    Index {
        /// Renderer metadata database
        #[arg(long)]
        metadata: PathBuf,

        /// Directory of rendered pages
        #[arg(long)]
        documents: PathBuf,

        /// Index file to write
        #[arg(long)]
        output: PathBuf,

        /// Metadata table name
        #[arg(long, default_value = docset_core::metadata::DEFAULT_TABLE)]
        table: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Build {
            manifest,
            languages,
            notes,
            output,
        } => {
            let options = bundle::BuildOptions {
                manifest,
                languages,
                notes,
                output,
                verbose: cli.verbose,
            };
            bundle::build_bundles(options)?;
        }

        Commands::Index {
            metadata,
            documents,
            output,
            table,
        } => {
            let options = index::IndexOptions {
                metadata,
                documents,
                output,
                table,
                verbose: cli.verbose,
            };
            index::build_index(options)?;
        }
    }

    Ok(())
}

/// Log to stderr; `RUST_LOG` wins over `--verbose`
fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("docset_core=debug,info")
        } else {
            EnvFilter::new("warn,docset_core=info")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_build_defaults() {
        let cli = Cli::try_parse_from(["docset", "build"]).unwrap();
        assert!(!cli.verbose);
        match cli.command {
            Commands::Build {
                manifest,
                languages,
                notes,
                output,
            } => {
                assert_eq!(manifest, PathBuf::from("docset.toml"));
                assert!(languages.is_empty());
                assert!(!notes);
                assert!(output.is_none());
            }
            _ => panic!("Expected Build command"),
        }
    }

    #[test]
    fn test_build_overrides() {
        let cli = Cli::try_parse_from([
            "docset",
            "build",
            "--manifest",
            "manual/docset.toml",
            "--lang",
            "en",
            "--lang",
            "pt_BR",
            "--notes",
            "--output",
            "dist",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Build {
                manifest,
                languages,
                notes,
                output,
            } => {
                assert_eq!(manifest, PathBuf::from("manual/docset.toml"));
                assert_eq!(languages, vec!["en", "pt_BR"]);
                assert!(notes);
                assert_eq!(output, Some(PathBuf::from("dist")));
            }
            _ => panic!("Expected Build command"),
        }
    }

    #[test]
    fn test_index_command() {
        let cli = Cli::try_parse_from([
            "docset",
            "--verbose",
            "index",
            "--metadata",
            "index.sqlite",
            "--documents",
            "html",
            "--output",
            "docSet.dsidx",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Index {
                metadata,
                documents,
                output,
                table,
            } => {
                assert_eq!(metadata, PathBuf::from("index.sqlite"));
                assert_eq!(documents, PathBuf::from("html"));
                assert_eq!(output, PathBuf::from("docSet.dsidx"));
                assert_eq!(table, "ids");
            }
            _ => panic!("Expected Index command"),
        }
    }

    #[test]
    fn test_index_requires_paths() {
        let result = Cli::try_parse_from(["docset", "index", "--metadata", "index.sqlite"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["docset"]).is_err());
    }
}
