use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli_style;

use cli_style::{
    get_prompt, get_styles, print_empty_list, print_error, print_goodbye, print_info,
    print_key_value, print_list_item, print_success, print_warning, print_welcome, TableBuilder,
};
use media_catalog::catalog_store::{
    parse_label_list, CatalogStore, DeleteOutcome, InsertOutcome, Item, ItemCandidate, ItemId,
    QueryEngine, SqliteCatalogStore, TagRegistry,
};
use media_catalog::config::{AppConfig, CliConfig, FileConfig};

use rustyline::{
    completion::Completer, highlight::Highlighter, history::FileHistory, validate::Validator,
    CompletionType, Config, Editor, Helper,
};

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(styles=get_styles())]
struct CliArgs {
    /// Path to the catalog database file, created if missing.
    #[clap(value_parser = parse_path)]
    pub db_path: Option<PathBuf>,

    /// TOML config file, its values override the command line.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory for database snapshots. Defaults to the database directory.
    #[clap(long, value_parser = parse_path)]
    pub backup_dir: Option<PathBuf>,

    /// Number of snapshots to keep after each backup.
    #[clap(long)]
    pub max_backups: Option<usize>,
}

#[derive(Parser)]
#[command(styles=get_styles(),name = "")]
struct InnerCli {
    #[command(subcommand)]
    command: InnerCommand,
}

#[derive(Subcommand)]
enum InnerCommand {
    /// Adds an item. Nothing changes if an item with the same URL exists.
    Add {
        #[clap(long)]
        artist: String,
        #[clap(long)]
        name: String,
        #[clap(long)]
        url: String,
        #[clap(long)]
        release_date: Option<String>,
        #[clap(long = "type")]
        item_type: Option<String>,
        /// Comma separated labels, e.g. "rock,90s".
        #[clap(long, default_value = "")]
        tags: String,
    },

    /// Deletes an item and the tags only it was using.
    Delete { id: i64 },

    /// Lists all items by artist.
    List,

    /// Shows an item and its tags.
    Show {
        id: i64,
        /// Print as JSON.
        #[clap(long)]
        json: bool,
    },

    /// Lists all artists.
    Artists,

    /// Lists all tags.
    Tags,

    /// Lists all item types.
    Types,

    /// Items of an artist, most recent first.
    ByArtist { artist: String },

    /// Items carrying a tag.
    ByTag { tag: String },

    /// Artists having items with a tag.
    ArtistsByTag { tag: String },

    /// Items of a type.
    ByType { item_type: String },

    /// Item types of an artist.
    TypesByArtist { artist: String },

    /// Removes tags that no item uses.
    PruneTags,

    /// Writes a snapshot of the catalog and drops the oldest ones.
    Backup,

    /// Lists available snapshots, most recent first.
    Backups {
        #[clap(long, default_value_t = 10)]
        limit: usize,
    },

    /// Replaces the catalog with a snapshot, the most recent one if no path is given.
    Restore {
        #[clap(value_parser = parse_path)]
        snapshot: Option<PathBuf>,
    },

    /// Shows the path of the current catalog db.
    Where,

    /// Close this program.
    Exit,
}

enum CommandExecutionResult {
    Ok,
    Exit,
    Error(String),
}

struct Session {
    store: SqliteCatalogStore,
    config: AppConfig,
}

fn print_items(items: &[Item], empty_message: &str) {
    if items.is_empty() {
        print_empty_list(empty_message);
        return;
    }
    let mut table = TableBuilder::new(&["ID", "Artist", "Name", "Released", "Type", "URL"]);
    for item in items {
        let released = item
            .release_date
            .clone()
            .or_else(|| item.release_year.map(|y| y.to_string()))
            .unwrap_or_default();
        table.add_row(vec![
            item.id.to_string(),
            item.artist.clone(),
            item.name.clone(),
            released,
            item.item_type.clone().unwrap_or_default(),
            item.source_url.clone(),
        ]);
    }
    table.print();
}

fn print_strings(values: &[String], empty_message: &str) {
    if values.is_empty() {
        print_empty_list(empty_message);
    }
    for value in values {
        print_list_item(value);
    }
}

fn show_item(session: &Session, id: ItemId, json: bool) -> Result<()> {
    let item = match session.store.get(id)? {
        Some(item) => item,
        None => {
            print_info(&format!("No item with id {}", id));
            return Ok(());
        }
    };
    let tags = session.store.tags_for_item(id)?;

    if json {
        let value = serde_json::json!({ "item": item, "tags": tags });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    print_key_value("ID", &item.id.to_string());
    print_key_value("Artist", &item.artist);
    print_key_value("Name", &item.name);
    print_key_value("Release date", item.release_date.as_deref().unwrap_or("-"));
    print_key_value(
        "Release year",
        &item
            .release_year
            .map(|y| y.to_string())
            .unwrap_or_else(|| "-".to_string()),
    );
    print_key_value("Type", item.item_type.as_deref().unwrap_or("-"));
    print_key_value("URL", &item.source_url);
    print_key_value("Tags", &tags.join(", "));
    Ok(())
}

fn backup(session: &Session) -> Result<()> {
    let path = session.store.snapshot(&session.config.backup_dir)?;
    print_success(&format!("Snapshot written to {}", path.display()));
    let removed =
        SqliteCatalogStore::prune_snapshots(&session.config.backup_dir, session.config.max_backups)?;
    if removed > 0 {
        print_info(&format!("Removed {} old snapshots", removed));
    }
    Ok(())
}

fn restore(session: &Session, snapshot: Option<PathBuf>) -> Result<()> {
    let snapshot = match snapshot {
        Some(path) => path,
        None => match SqliteCatalogStore::list_snapshots(&session.config.backup_dir, 1)?
            .into_iter()
            .next()
        {
            Some(path) => path,
            None => {
                print_info(&format!(
                    "No snapshots in {}",
                    session.config.backup_dir.display()
                ));
                return Ok(());
            }
        },
    };
    session.store.restore(&snapshot)?;
    let (items, tags) = session.store.counts()?;
    print_success(&format!(
        "Restored {} ({} items, {} tags)",
        snapshot.display(),
        items,
        tags
    ));
    Ok(())
}

fn run_command(session: &Session, command: InnerCommand) -> Result<CommandExecutionResult> {
    let store = &session.store;
    match command {
        InnerCommand::Add {
            artist,
            name,
            url,
            release_date,
            item_type,
            tags,
        } => {
            let mut candidate = ItemCandidate::new(artist, name, url);
            candidate.release_date = release_date;
            candidate.item_type = item_type;
            match store.insert(&candidate, &parse_label_list(&tags))? {
                InsertOutcome::Inserted(id) => print_success(&format!("Added item {}", id)),
                InsertOutcome::AlreadyExists(id) => {
                    print_info(&format!("Already cataloged as item {}", id))
                }
            }
        }
        InnerCommand::Delete { id } => match store.delete(ItemId(id))? {
            DeleteOutcome::Deleted => print_success(&format!("Deleted item {}", id)),
            DeleteOutcome::NotFound => print_info(&format!("No item with id {}", id)),
        },
        InnerCommand::List => print_items(&store.list()?, "The catalog is empty"),
        InnerCommand::Show { id, json } => show_item(session, ItemId(id), json)?,
        InnerCommand::Artists => print_strings(&store.list_artists()?, "No artists"),
        InnerCommand::Tags => print_strings(&store.list_labels()?, "No tags"),
        InnerCommand::Types => print_strings(&store.list_types()?, "No types"),
        InnerCommand::ByArtist { artist } => print_items(
            &store.items_by_artist(&artist)?,
            &format!("No items by '{}'", artist),
        ),
        InnerCommand::ByTag { tag } => print_items(
            &store.items_by_tag(&tag)?,
            &format!("No items tagged '{}'", tag),
        ),
        InnerCommand::ArtistsByTag { tag } => print_strings(
            &store.artists_by_tag(&tag)?,
            &format!("No artists tagged '{}'", tag),
        ),
        InnerCommand::ByType { item_type } => print_items(
            &store.items_by_type(&item_type)?,
            &format!("No items of type '{}'", item_type),
        ),
        InnerCommand::TypesByArtist { artist } => print_strings(
            &store.types_by_artist(&artist)?,
            &format!("No types for '{}'", artist),
        ),
        InnerCommand::PruneTags => {
            let pruned = store.prune_orphans()?;
            print_success(&format!("Removed {} unused tags", pruned));
        }
        InnerCommand::Backup => backup(session)?,
        InnerCommand::Backups { limit } => {
            let snapshots =
                SqliteCatalogStore::list_snapshots(&session.config.backup_dir, limit)?;
            let names: Vec<String> = snapshots.iter().map(|p| p.display().to_string()).collect();
            print_strings(&names, "No snapshots");
        }
        InnerCommand::Restore { snapshot } => restore(session, snapshot)?,
        InnerCommand::Where => {
            print_key_value("Database", &session.config.db_path.display().to_string());
            print_key_value("Backups", &session.config.backup_dir.display().to_string());
        }
        InnerCommand::Exit => return Ok(CommandExecutionResult::Exit),
    }
    Ok(CommandExecutionResult::Ok)
}

fn execute_command(line: String, session: &Session) -> CommandExecutionResult {
    if line.trim().is_empty() {
        return CommandExecutionResult::Ok;
    }

    let args =
        shlex::split(&line).unwrap_or_else(|| line.split_whitespace().map(String::from).collect());

    let cli = InnerCli::try_parse_from(std::iter::once(" ").chain(args.iter().map(String::as_str)));

    match cli {
        Ok(cli) => match run_command(session, cli.command) {
            Ok(result) => result,
            Err(err) => CommandExecutionResult::Error(format!("{:#}", err)),
        },
        Err(e) => {
            if e.print().is_err() {
                println!("{}", e);
            }
            CommandExecutionResult::Ok
        }
    }
}

#[derive(rustyline_derive::Hinter)]
struct CommandHelper {
    commands_names: Vec<String>,
}

impl CommandHelper {
    pub fn new() -> Self {
        let commands_names: Vec<String> = InnerCli::command()
            .get_subcommands()
            .map(|sc| sc.get_name().to_string())
            .collect();

        CommandHelper { commands_names }
    }
}

impl Completer for CommandHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        _pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        if line.contains(' ') {
            return Ok((0, Vec::with_capacity(0)));
        }
        let matches = self
            .commands_names
            .iter()
            .filter(|c| c.starts_with(line))
            .cloned()
            .collect::<Vec<_>>();

        Ok((0, matches))
    }
}

impl Highlighter for CommandHelper {}
impl Validator for CommandHelper {}
impl Helper for CommandHelper {}

fn resolve_config(cli_args: CliArgs) -> Result<AppConfig> {
    let file_config = cli_args
        .config
        .as_deref()
        .map(FileConfig::load)
        .transpose()?;
    let cli_config = CliConfig {
        db_path: cli_args.db_path,
        backup_dir: cli_args.backup_dir,
        max_backups: cli_args.max_backups,
    };
    AppConfig::resolve(&cli_config, file_config)
}

fn open_store(db_path: &Path) -> Result<SqliteCatalogStore> {
    SqliteCatalogStore::open(db_path)
        .with_context(|| format!("Could not open catalog at {:?}", db_path))
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    let config = resolve_config(cli_args)?;
    let store = open_store(&config.db_path)?;
    let session = Session { store, config };

    let (item_count, tag_count) = session.store.counts()?;
    print_welcome(
        &session.config.db_path.display().to_string(),
        item_count,
        tag_count,
    );

    let rl_config = Config::builder()
        .completion_type(CompletionType::List)
        .build();

    let mut rl = Editor::<CommandHelper, FileHistory>::with_config(rl_config)?;
    rl.set_helper(Some(CommandHelper::new()));

    let prompt = get_prompt();
    loop {
        match rl.readline(&prompt) {
            Ok(line) => {
                let _ = rl.add_history_entry(&line);
                match execute_command(line, &session) {
                    CommandExecutionResult::Ok => {}
                    CommandExecutionResult::Exit => break,
                    CommandExecutionResult::Error(err) => print_error(&err),
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                print_warning("CTRL-C");
                break;
            }
            Err(rustyline::error::ReadlineError::Eof) => break,
            Err(e) => {
                print_error(&format!("{:?}", e));
                break;
            }
        }
    }

    session.store.close()?;
    print_goodbye();
    Ok(())
}
