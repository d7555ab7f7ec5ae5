use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use compendium_core::config::{resolve_with_base, CompendiumSettings, Config, SourceSettings};
use compendium_core::dump::{dump_files, read_dump};
use compendium_core::{GameQuery, GameRecord};
use compendium_fusion::{Aggregator, Source};
use compendium_resolve::EntityResolver;
use compendium_text::tantivy_utils::{NAME, STORYLINE, SUMMARY};
use compendium_text::GameIndex;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "<ingest [--force] [--only NAME] | query <text> [--limit N] [--only NAME]>";

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().collect();
    let prog = args.remove(0);
    if args.is_empty() { eprintln!("Usage: {} {}", prog, USAGE); std::process::exit(1); }
    let cmd = args.remove(0);
    (cmd, args)
}

/// Pulls `--only NAME` out of `args`, leaving the remaining arguments.
fn take_only(args: &mut Vec<String>) -> anyhow::Result<Option<String>> {
    let Some(i) = args.iter().position(|a| a == "--only" || a == "-o") else { return Ok(None) };
    if i + 1 >= args.len() { bail!("--only requires a source name"); }
    let name = args.remove(i + 1);
    args.remove(i);
    Ok(Some(name))
}

/// Position of the named source in commit order.
fn source_position(sources: &[SourceSettings], name: &str) -> anyhow::Result<usize> {
    match sources.iter().position(|s| s.name == name) {
        Some(i) => Ok(i),
        None => {
            let known: Vec<&str> = sources.iter().map(|s| s.name.as_str()).collect();
            bail!("unknown source '{}'; configured: {}", name, known.join(", "))
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let mut settings = config.settings()?;
    let (cmd, mut args) = parse_args();
    let only = take_only(&mut args)?;
    let selected = only.as_deref().map(|name| source_position(&settings.sources, name)).transpose()?;
    match cmd.as_str() {
        "ingest" => {
            // Earlier sources stay as resolution context; later ones are left alone.
            if let Some(i) = selected { settings.sources.truncate(i + 1); }
            ingest(&settings, args.iter().any(|a| a == "--force" || a == "-f"), selected.is_some())?
        }
        "query" => {
            if let Some(i) = selected { settings.sources = vec![settings.sources.swap_remove(i)]; }
            let mut limit = settings.search.default_limit;
            let mut words = Vec::new();
            let mut i = 0; while i < args.len() { match args[i].as_str() {
                "--limit" | "-n" => { match args.get(i + 1).and_then(|v| v.parse::<usize>().ok()) { Some(n) => { limit = n; i += 1; } None => { eprintln!("Error: --limit requires a number"); std::process::exit(1); } } }
                word => words.push(word.to_string()) } i += 1; }
            if words.is_empty() { eprintln!("Usage: compendium query \"<text>\" [--limit N] [--only NAME]"); std::process::exit(1); }
            query(&settings, &words.join(" "), limit)?;
        }
        _ => { eprintln!("Unknown command: {}", cmd); std::process::exit(1); }
    }
    Ok(())
}

fn index_root(settings: &CompendiumSettings) -> PathBuf { resolve_with_base(Path::new("."), &settings.data.index_dir) }

/// Commits every configured source in order, resolving each against the ones
/// committed before it. With `last_only`, every source but the last is only
/// opened as context and never rebuilt.
fn ingest(settings: &CompendiumSettings, force: bool, last_only: bool) -> anyhow::Result<()> {
    if settings.sources.is_empty() { bail!("no sources configured; add [[sources]] entries to config.toml"); }
    let index_root = index_root(settings);
    let dump_root = resolve_with_base(Path::new("."), &settings.data.dump_dir);
    let mut resolver = EntityResolver::new(Vec::new(), settings.resolver.clone());
    let last = settings.sources.len() - 1;

    for (i, source) in settings.sources.iter().enumerate() {
        let dir = index_root.join(&source.name);
        if last_only && i < last {
            if !GameIndex::exists_in_dir(&dir) {
                tracing::warn!(source = %source.name, "no committed index, not used for resolution");
                continue;
            }
            resolver.add_committed(Source::new(source.name.clone(), Arc::new(GameIndex::open_in_dir(&source.name, &dir)?)));
            continue;
        }
        let index = if !force && GameIndex::exists_in_dir(&dir) {
            tracing::info!(source = %source.name, dir = %dir.display(), "index already committed");
            GameIndex::open_in_dir(&source.name, &dir)?
        } else {
            let records = load_records(&resolve_with_base(&dump_root, &source.dump))?;
            tracing::info!(source = %source.name, records = records.len(), committed = resolver.committed().len(), "resolving source");
            let index = GameIndex::create_in_dir(&source.name, &dir)?;
            let mut writer = index.writer()?;
            let stats = resolver.resolve_and_commit(&records, &mut writer)?;
            drop(writer);
            println!(
                "✅ {}: {} records ({} reused, {} new, {} conflicts, {} failed)",
                source.name, records.len(), stats.reused, stats.generated, stats.conflicts, stats.failed
            );
            index
        };
        resolver.add_committed(Source::new(source.name.clone(), Arc::new(index)));
    }
    Ok(())
}

fn load_records(path: &Path) -> anyhow::Result<Vec<GameRecord>> {
    let files = dump_files(path)?;
    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} shards {msg}")?.progress_chars("#>-"));
    pb.set_message(path.display().to_string());
    let mut records = Vec::new();
    for file in &files {
        records.extend(read_dump(file).with_context(|| format!("reading {}", file.display()))?);
        pb.inc(1);
    }
    pb.finish_and_clear();
    Ok(records)
}

fn query(settings: &CompendiumSettings, text: &str, limit: usize) -> anyhow::Result<()> {
    let index_root = index_root(settings);
    let mut sources = Vec::new();
    for source in &settings.sources {
        let dir = index_root.join(&source.name);
        if !GameIndex::exists_in_dir(&dir) {
            tracing::warn!(source = %source.name, "no committed index, skipping");
            continue;
        }
        sources.push(Source::new(source.name.clone(), Arc::new(GameIndex::open_in_dir(&source.name, &dir)?)));
    }
    if sources.is_empty() { bail!("no committed indexes under {}; run `compendium ingest` first", index_root.display()); }

    let aggregator = Aggregator::new(sources);
    let hits = aggregator.query(&GameQuery::text(&[NAME, STORYLINE, SUMMARY], text), limit)?;
    if hits.is_empty() { println!("No results for '{}'", text); }
    for (rank, hit) in hits.iter().enumerate() {
        println!("{:>3}. {} [{:.3}]", rank + 1, hit.name(), hit.total_score);
        for source_hit in &hit.hits {
            println!("       {:<12} {:<12} {:.3}", source_hit.source, source_hit.hit.game.local_id, source_hit.hit.score);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> { list.iter().map(|s| s.to_string()).collect() }

    fn sources() -> Vec<SourceSettings> {
        ["igdb", "steam", "gog"].iter().map(|n| SourceSettings { name: n.to_string(), dump: format!("{n}.jsonl") }).collect()
    }

    #[test]
    fn only_flag_is_taken_from_anywhere() {
        let mut rest = args(&["portal", "-o", "steam", "--limit", "3"]);
        assert_eq!(take_only(&mut rest).expect("parse").as_deref(), Some("steam"));
        assert_eq!(rest, args(&["portal", "--limit", "3"]));

        let mut rest = args(&["--force"]);
        assert_eq!(take_only(&mut rest).expect("parse"), None);
        assert_eq!(rest, args(&["--force"]));
    }

    #[test]
    fn only_flag_needs_a_name() {
        assert!(take_only(&mut args(&["portal", "--only"])).is_err());
    }

    #[test]
    fn named_source_is_found_in_commit_order() {
        assert_eq!(source_position(&sources(), "steam").expect("known"), 1);
        let err = source_position(&sources(), "epic").unwrap_err().to_string();
        assert!(err.contains("epic") && err.contains("igdb, steam, gog"), "{err}");
    }
}
