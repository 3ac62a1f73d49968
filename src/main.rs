mod catalog;
mod check;
mod codec;
mod collection;
mod config;
mod error;
mod export;
mod identity;
mod import;
mod init;
mod note;
mod store;
mod tree;
mod views;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::collection::{Collection, LabelKind};
use crate::config::Config;
use crate::error::{ImportFailure, StoreError};
use crate::note::Identity;
use crate::store::FsStore;

/// zet - Zettelkasten whose note metadata lives in the filenames
#[derive(Parser)]
#[command(name = "zet")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Collection root (the folder holding zettel/, index.txt and references.bib)
    #[arg(short = 'C', long, global = true, default_value = ".")]
    dir: PathBuf,

    /// Config file path, relative to the collection root
    #[arg(short, long, global = true, default_value = ".zet.toml")]
    config: PathBuf,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new collection in ./zettelkasten
    Init {
        /// Download the example collection instead of creating an empty one
        #[arg(long)]
        example: bool,

        /// Parent folder of the new collection
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Turn text files into notes with generated filenames
    Import {
        /// Folder with the text files
        path: PathBuf,
    },

    /// List inconsistencies of the collection
    Validate {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Link the follow-up trees of every index topic into INDEX/
    Index,

    /// Link notes by keyword, context and reference into VIEWS/
    Views,

    /// Write statistics and a JSON dump into EXPORT/
    Export,

    /// Show collection statistics
    Stats {
        /// Number of top keywords to show
        #[arg(short = 'n', long, default_value = "10")]
        top_keywords: usize,
    },

    /// Show one note with its follow-ups
    Show {
        /// Identity of the note, e.g. 170224a
        identity: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();

    let config_path = cli.dir.join(&cli.config);
    let result = match Config::load(&config_path) {
        Err(e) => Err(e.into()),
        Ok(config) => match cli.command {
            Commands::Init { example, path } => cmd_init(&path, example, &config, cli.quiet),
            Commands::Import { path } => cmd_import(&cli.dir, &path, &config, cli.quiet),
            Commands::Validate { json } => cmd_validate(&cli.dir, &config, json),
            Commands::Index => cmd_index(&cli.dir, &config, cli.quiet),
            Commands::Views => cmd_views(&cli.dir, &config, cli.quiet),
            Commands::Export => cmd_export(&cli.dir, &config, cli.quiet),
            Commands::Stats { top_keywords } => cmd_stats(&cli.dir, &config, top_keywords),
            Commands::Show { identity, json } => cmd_show(&cli.dir, &config, &identity, json),
        },
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn open(dir: &Path, config: &Config) -> Result<(FsStore, Collection), Box<dyn std::error::Error>> {
    let store = FsStore::open(dir, config)?;
    let collection = store::load(&store)?;
    Ok((store, collection))
}

/// Points at `validate` when the collection has defects; the link output
/// skips whatever could not be decoded.
fn hint_inconsistencies(collection: &Collection, quiet: bool) {
    let found = check::check(collection);
    if !found.is_empty() && !quiet {
        println!(
            "{} {} inconsistencies, run {} for details",
            "Note:".yellow().bold(),
            found.len(),
            "zet validate".cyan()
        );
    }
}

fn cmd_init(
    parent: &Path,
    example: bool,
    config: &Config,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let target = if example {
        if !quiet {
            println!("{} {}", "Downloading".cyan().bold(), config.init.example_url);
        }
        init::init_example(parent, &config.init.example_url)?
    } else {
        init::init_empty(parent, &config.layout)?
    };
    if !quiet {
        println!("{} {}", "Created".green().bold(), target.display());
    }
    Ok(())
}

fn cmd_import(
    dir: &Path,
    sources_dir: &Path,
    config: &Config,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = FsStore::open(dir, config)?;
    let sources = import::read_sources(sources_dir, &config.import.extensions)?;
    if sources.is_empty() {
        if !quiet {
            println!("{}", "No files to import".yellow());
        }
        return Ok(());
    }

    let imported = match import::import(&store, &sources) {
        Ok(imported) => imported,
        Err(ImportFailure::Rejected(errors)) => {
            for e in &errors {
                eprintln!("  {} {}", "x".red(), e);
            }
            return Err(ImportFailure::Rejected(errors).into());
        }
        Err(e) => return Err(e.into()),
    };

    for warning in &imported.warnings {
        eprintln!("{}: {}", "warning".yellow().bold(), warning);
    }
    if !quiet {
        for name in &imported.names {
            println!("  {} {}", "+".green(), name);
        }
        println!(
            "{} {} notes",
            "Imported".green().bold(),
            imported.names.len().to_string().cyan()
        );
    }
    Ok(())
}

fn cmd_validate(dir: &Path, config: &Config, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let (_, collection) = open(dir, config)?;
    let found = check::check(&collection);

    if json {
        println!("{}", serde_json::to_string_pretty(&found)?);
        return Ok(());
    }

    if found.is_empty() {
        println!("{}", "No inconsistencies found".green());
        return Ok(());
    }
    println!(
        "{} {}",
        found.len().to_string().yellow().bold(),
        "inconsistencies".yellow().bold()
    );
    println!();
    for inconsistency in &found {
        println!("  {}", inconsistency);
    }
    Ok(())
}

fn cmd_index(dir: &Path, config: &Config, quiet: bool) -> Result<(), Box<dyn std::error::Error>> {
    let (store, collection) = open(dir, config)?;
    let index_dir = &config.layout.index_dir;
    let n = views::create_index(&store, &collection, &config.tree, index_dir)?;
    if !quiet {
        println!(
            "{} {} links in {}",
            "Created".green().bold(),
            n.to_string().cyan(),
            store.root().join(index_dir).display()
        );
    }
    hint_inconsistencies(&collection, quiet);
    Ok(())
}

fn cmd_views(dir: &Path, config: &Config, quiet: bool) -> Result<(), Box<dyn std::error::Error>> {
    let (store, collection) = open(dir, config)?;
    let views_dir = &config.layout.views_dir;
    let n = views::create_views(&store, &collection, views_dir)?;
    if !quiet {
        println!(
            "{} {} links in {}",
            "Created".green().bold(),
            n.to_string().cyan(),
            store.root().join(views_dir).display()
        );
    }
    hint_inconsistencies(&collection, quiet);
    Ok(())
}

fn cmd_export(dir: &Path, config: &Config, quiet: bool) -> Result<(), Box<dyn std::error::Error>> {
    let (store, collection) = open(dir, config)?;
    let written = export::export(&store, &collection, &config.layout.export_dir)?;
    if !quiet {
        for path in &written {
            println!("  {}", store.root().join(path).display());
        }
        println!("{} {} files", "Exported".green().bold(), written.len().to_string().cyan());
    }
    hint_inconsistencies(&collection, quiet);
    Ok(())
}

fn cmd_stats(dir: &Path, config: &Config, top_keywords: usize) -> Result<(), Box<dyn std::error::Error>> {
    let (_, collection) = open(dir, config)?;

    let mut keyword_counts: Vec<(String, usize)> = collection
        .notes_by_label(LabelKind::Keyword)
        .into_iter()
        .map(|(k, ids)| (k, ids.len()))
        .collect();
    keyword_counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let notes = collection.all_notes();
    let follow_ups = notes.iter().filter(|n| n.predecessor.is_some()).count();
    let chain_starts = notes
        .iter()
        .filter(|n| n.predecessor.is_none() && !collection.forward_links(&n.identity).is_empty())
        .count();
    let contexts = collection.notes_by_label(LabelKind::Context).len();
    let cited = collection.notes_by_label(LabelKind::Reference).len();

    println!("{}", "Collection Statistics".green().bold());
    println!();
    println!("  Notes:             {}", notes.len().to_string().cyan());
    println!("  Keywords:          {}", keyword_counts.len().to_string().cyan());
    println!("  Context entries:   {}", contexts.to_string().cyan());
    println!(
        "  Cited bibkeys:     {} of {}",
        cited.to_string().cyan(),
        collection.bibkeys().len()
    );
    println!("  Index topics:      {}", collection.topics().count().to_string().cyan());
    println!("  Follow-up notes:   {}", follow_ups.to_string().cyan());
    println!("  Chains:            {}", chain_starts.to_string().cyan());
    println!(
        "  Inconsistencies:   {}",
        check::check(&collection).len().to_string().dimmed()
    );
    println!();
    println!("{}", format!("Top {} Keywords", top_keywords).green().bold());
    println!();

    for (keyword, count) in keyword_counts.iter().take(top_keywords) {
        let bar = "=".repeat((*count).min(40));
        println!("  {:>20} {:>4} {}", keyword.cyan(), count, bar.dimmed());
    }

    Ok(())
}

fn cmd_show(
    dir: &Path,
    config: &Config,
    identity: &str,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let identity =
        Identity::parse(identity).ok_or_else(|| format!("{identity:?} is not an identity"))?;
    let (_, collection) = open(dir, config)?;
    let note = collection
        .lookup(&identity)
        .ok_or_else(|| StoreError::UnknownIdentity(identity.clone()))?;
    let follow_ups = collection.forward_links(&identity);
    let topics: Vec<&str> = collection
        .index()
        .iter()
        .filter(|(_, roots)| roots.contains(&identity))
        .map(|(topic, _)| topic.as_str())
        .collect();

    if json {
        let mut out = BTreeMap::new();
        out.insert("note", serde_json::to_value(note)?);
        out.insert("folgezettel", serde_json::to_value(follow_ups)?);
        out.insert("topics", serde_json::to_value(&topics)?);
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("{}", note.name.green().bold());
    println!();
    println!("  Keywords:     {}", note.keywords.join(", ").cyan());
    if !note.context.is_empty() {
        println!("  Context:      {}", note.context.join(", "));
    }
    if !note.references.is_empty() {
        let refs: Vec<String> = note.references.iter().map(ToString::to_string).collect();
        println!("  References:   {}", refs.join(", "));
    }
    if let Some(predecessor) = &note.predecessor {
        let marker = if collection.contains(predecessor) {
            predecessor.to_string().normal()
        } else {
            format!("{predecessor} (missing)").red()
        };
        println!("  Predecessor:  {}", marker);
    }
    if let Some((root, depth)) = collection.chain_root(&identity) {
        if depth > 0 {
            println!("  Chain root:   {} ({} steps up)", root, depth);
        }
    }
    if !topics.is_empty() {
        println!("  Index:        {}", topics.join(", "));
    }
    if !follow_ups.is_empty() {
        println!();
        println!("{}", "Follow-ups".green().bold());
        for id in follow_ups {
            match collection.lookup(id) {
                Some(next) => println!("  {}", next.name),
                None => println!("  {}", id),
            }
        }
    }
    Ok(())
}
