use anyhow::Result;
use clap::Parser;
use mcc_import::cache::CategoryCache;
use mcc_import::cli::{Cli, Commands};
use mcc_import::codes;
use mcc_import::config::{clear_codes_file, resolve_codes_path};
use mcc_import::extend::Extender;
use mcc_import::remote::ReferenceSite;
use mcc_import::statement;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;

fn main() -> Result<()> {
    let cli = parse_cli()?;

    match cli.command.clone() {
        Commands::Extend {
            files,
            out,
            concurrency,
            reference_url,
        } => {
            let codes_path = resolve_codes_path(&cli)?;
            let summary = run_extend(&files, out, concurrency, reference_url, &codes_path)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Stats => {
            let codes_path = resolve_codes_path(&cli)?;
            let stats = codes_stats(&codes_path)?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Clear => {
            let codes_path = resolve_codes_path(&cli)?;
            clear_codes_file(&codes_path)?;
        }
    }

    Ok(())
}

fn parse_cli() -> Result<Cli> {
    let args: Vec<String> = std::env::args().collect();
    Ok(Cli::parse_from(rewrite_args_for_implicit_extend(args)))
}

/// Allow `mcc-import statement.csv` without the `extend` token, the same
/// way bare class names imply a lookup.
fn rewrite_args_for_implicit_extend(mut args: Vec<String>) -> Vec<String> {
    if args.len() <= 1 {
        return args;
    }

    let subcommands = ["extend", "stats", "clear", "help"];

    let mut idx = 1usize;
    while idx < args.len() {
        let a = args[idx].as_str();
        if a == "--" {
            idx += 1;
            break;
        }

        if a == "--codes" {
            idx += 2;
            continue;
        }

        if a.starts_with("--codes=") {
            idx += 1;
            continue;
        }

        if a.starts_with('-') {
            idx += 1;
            continue;
        }

        break;
    }

    if idx < args.len() {
        let token = args[idx].as_str();
        if !subcommands.contains(&token) {
            args.insert(idx, "extend".to_string());
        }
    }

    args
}

#[derive(Debug, Serialize)]
struct ExtendSummary {
    input_files: Vec<String>,
    records: usize,
    out_file: String,
    codes_file: String,
    cache_hits: u64,
    cache_misses: u64,
    codes_learned: usize,
    duration_ms: u64,
}

#[derive(Debug, Serialize)]
struct CodesStats {
    codes_file: String,
    entries: usize,
}

fn run_extend(
    files: &[PathBuf],
    out: Option<PathBuf>,
    concurrency: usize,
    reference_url: Option<String>,
    codes_path: &Path,
) -> Result<ExtendSummary> {
    let start = Instant::now();

    let codes_file = codes::load(codes_path)?;
    let header = codes_file.header.clone();

    let site = match reference_url {
        Some(url) => ReferenceSite::with_base_url(url)?,
        None => ReferenceSite::new()?,
    };
    let cache = CategoryCache::new(codes_file.entries, Box::new(site));

    let input = statement::load_merged(files)?;
    eprintln!(
        "[mcc-import] extending {} records from {} file(s)",
        input.records.len(),
        files.len()
    );

    let extender = Extender::new(cache, concurrency);
    let extended = extender.extend(&input.records)?;

    let out_path = out.unwrap_or_else(|| statement::default_output_path(&files[0]));
    statement::write_extended(&out_path, &input.headers, &extended)?;

    let cache = extender.cache();
    codes::save(codes_path, &header, &cache.snapshot())?;

    Ok(ExtendSummary {
        input_files: files.iter().map(|p| p.display().to_string()).collect(),
        records: extended.len(),
        out_file: out_path.display().to_string(),
        codes_file: codes_path.display().to_string(),
        cache_hits: cache.hits(),
        cache_misses: cache.misses(),
        codes_learned: cache.learned(),
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

fn codes_stats(codes_path: &Path) -> Result<CodesStats> {
    let codes_file = codes::load(codes_path)?;
    Ok(CodesStats {
        codes_file: codes_path.display().to_string(),
        entries: codes_file.entries.len(),
    })
}
