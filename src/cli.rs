// Command-line interface for blocksync.
//
// One subcommand per engine operation, file-based: `fingerprint` runs on
// the destination host, `patch` on the source host, `apply` back on the
// destination. `merge` and `suggest` round out the surface.

use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::io::{self, IoError};

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// Block-fingerprint delta tool.
#[derive(Parser, Debug)]
#[command(
    name = "blocksync",
    version,
    about = "rsync-style block fingerprint and patch tool",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Force overwrite existing output files.
    #[arg(short = 'f', long, global = true)]
    force: bool,

    /// Quiet mode (suppress non-error output).
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose mode (use multiple times for more detail).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Output stats as JSON to stderr.
    #[arg(long = "json", global = true)]
    json_output: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Fingerprint a destination file.
    Fingerprint(FingerprintArgs),
    /// Build a patch from a fingerprint document and a source file.
    Patch(PatchArgs),
    /// Reconstruct a source file from a destination file and a patch.
    Apply(ApplyArgs),
    /// Merge fingerprint documents sharing one block size.
    Merge(MergeArgs),
    /// Print the suggested block size for a file.
    Suggest(SuggestArgs),
}

#[derive(Args, Debug)]
struct FingerprintArgs {
    /// Destination file to fingerprint.
    input: PathBuf,
    /// Output fingerprint document.
    document: PathBuf,
    /// Block size in bytes (default: suggested from the file size).
    #[arg(short = 'b', long)]
    block_size: Option<u32>,
}

#[derive(Args, Debug)]
struct PatchArgs {
    /// Fingerprint document received from the destination.
    document: PathBuf,
    /// Source file to encode.
    source: PathBuf,
    /// Output patch document.
    patch: PathBuf,
}

#[derive(Args, Debug)]
struct ApplyArgs {
    /// Local destination file the patch was built against.
    dest: PathBuf,
    /// Patch document received from the source.
    patch: PathBuf,
    /// Output file for the reconstructed source.
    output: PathBuf,
}

#[derive(Args, Debug)]
struct MergeArgs {
    /// Fingerprint documents to union (two or more, or one to relabel).
    #[arg(required = true)]
    documents: Vec<PathBuf>,
    /// Output merged document.
    #[arg(short = 'o', long)]
    output: PathBuf,
}

#[derive(Args, Debug)]
struct SuggestArgs {
    /// File to size the blocks for.
    file: PathBuf,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Parse arguments, run the selected command, exit non-zero on failure.
pub fn run() {
    let cli = Cli::parse();
    init_logger(cli.quiet, cli.verbose);

    if let Err(e) = dispatch(&cli) {
        eprintln!("blocksync: {e}");
        process::exit(1);
    }
}

fn init_logger(quiet: bool, verbose: u8) {
    let level = if quiet {
        log::LevelFilter::Error
    } else {
        match verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };
    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(level)
        .format_timestamp(None)
        .init();
}

fn dispatch(cli: &Cli) -> Result<(), IoError> {
    match &cli.command {
        Cmd::Fingerprint(args) => {
            check_overwrite(&args.document, cli.force)?;
            let stats = io::fingerprint_file(&args.input, &args.document, args.block_size)?;
            if cli.json_output {
                emit_json(serde_json::json!({
                    "command": "fingerprint",
                    "input_size": stats.input_size,
                    "block_size": stats.block_size,
                    "block_count": stats.block_count,
                    "document_size": stats.document_size,
                }));
            } else if !cli.quiet {
                eprintln!(
                    "fingerprinted {} bytes into {} blocks of {} ({} byte document)",
                    stats.input_size, stats.block_count, stats.block_size, stats.document_size
                );
            }
        }
        Cmd::Patch(args) => {
            check_overwrite(&args.patch, cli.force)?;
            let stats = io::patch_file(&args.document, &args.source, &args.patch)?;
            if cli.json_output {
                emit_json(serde_json::json!({
                    "command": "patch",
                    "source_size": stats.source_size,
                    "patch_size": stats.patch_size,
                    "match_count": stats.match_count,
                    "patch_count": stats.patch_count,
                    "literal_bytes": stats.literal_bytes,
                }));
            } else if !cli.quiet {
                eprintln!(
                    "patch: {} matches, {} literal runs ({} literal bytes), {} byte document",
                    stats.match_count, stats.patch_count, stats.literal_bytes, stats.patch_size
                );
            }
        }
        Cmd::Apply(args) => {
            check_overwrite(&args.output, cli.force)?;
            let stats = io::apply_file(&args.dest, &args.patch, &args.output)?;
            if cli.json_output {
                emit_json(serde_json::json!({
                    "command": "apply",
                    "dest_size": stats.dest_size,
                    "patch_size": stats.patch_size,
                    "output_size": stats.output_size,
                }));
            } else if !cli.quiet {
                eprintln!("reconstructed {} bytes", stats.output_size);
            }
        }
        Cmd::Merge(args) => {
            check_overwrite(&args.output, cli.force)?;
            let paths: Vec<&Path> = args.documents.iter().map(PathBuf::as_path).collect();
            let stats = io::merge_files(&paths, &args.output)?;
            if cli.json_output {
                emit_json(serde_json::json!({
                    "command": "merge",
                    "input_documents": stats.input_documents,
                    "merged_block_count": stats.merged_block_count,
                    "document_size": stats.document_size,
                }));
            } else if !cli.quiet {
                eprintln!(
                    "merged {} documents into {} blocks ({} byte document)",
                    stats.input_documents, stats.merged_block_count, stats.document_size
                );
            }
        }
        Cmd::Suggest(args) => {
            let size = std::fs::metadata(&args.file)?.len();
            let block_size = crate::config::suggest_block_size(size);
            if cli.json_output {
                emit_json(serde_json::json!({
                    "command": "suggest",
                    "file_size": size,
                    "block_size": block_size,
                }));
            } else {
                println!("{block_size}");
            }
        }
    }
    Ok(())
}

fn check_overwrite(path: &Path, force: bool) -> Result<(), IoError> {
    if !force && path.exists() {
        return Err(IoError::Io(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("output file {} exists (use --force to overwrite)", path.display()),
        )));
    }
    Ok(())
}

fn emit_json(value: serde_json::Value) {
    eprintln!("{value}");
}
