use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use syncednotes_session::{DispatchOutcome, EditSessionManager, FsShell};
use syncednotes_settings::{Preferences, PreferencesStore};
use syncednotes_tree::{
    visible_children, Base64Codec, ChildFilter, Codec, ItemIcon, NoteNode, NoteTree,
    NoteTreeStore, TreeItemView, TreeOwner,
};

const CONFIG_DIR: &str = ".syncednotes";
const PREFERENCES_FILE: &str = "preferences.json";
const POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Parser)]
#[command(
    name = "syncednotes",
    about = "Manage a tree of encoded notes and edit them in your editor",
    author,
    version
)]
struct Cli {
    /// 指定工作區根目錄；預設為目前目錄。 / Workspace root (defaults to current directory).
    #[arg(long, global = true, value_name = "PATH")]
    workspace: Option<PathBuf>,
    /// Note tree file; overrides the configured one.
    #[arg(long, global = true, value_name = "PATH")]
    store: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 列出筆記樹。 / Print the note tree.
    List(ListArgs),
    /// 新增資料夾。 / Add an empty folder.
    AddFolder(AddFolderArgs),
    /// 新增筆記。 / Add a note.
    AddNote(AddNoteArgs),
    /// 顯示筆記內容。 / Print a note's decoded text.
    Show(ShowArgs),
    /// 匯出 JSON 投影。 / Print the JSON projection of the tree.
    ExportJson(ExportArgs),
    /// 以外部編輯器編輯筆記。 / Edit a note in an external editor until it is closed.
    Edit(EditArgs),
}

#[derive(Args)]
struct ListArgs {
    /// Only show notes.
    #[arg(long, conflicts_with = "folders_only")]
    notes_only: bool,
    /// Only show folders.
    #[arg(long)]
    folders_only: bool,
    /// Hide folders without children.
    #[arg(long)]
    hide_empty: bool,
    /// Hide folders that contain no note anywhere below them.
    #[arg(long)]
    hide_noteless: bool,
    /// Print a short preview next to each note.
    #[arg(long)]
    preview: bool,
}

#[derive(Args)]
struct AddFolderArgs {
    /// Full path of the parent folder.
    parent: String,
    label: String,
}

#[derive(Args)]
struct AddNoteArgs {
    /// Full path of the parent folder.
    parent: String,
    label: String,
    /// Initial text.
    #[arg(long, conflicts_with = "file")]
    text: Option<String>,
    /// Read the initial text from a file.
    #[arg(long, value_name = "PATH")]
    file: Option<PathBuf>,
}

#[derive(Args)]
struct ShowArgs {
    /// Full path of the note.
    path: String,
    /// Print only the first N characters.
    #[arg(long, value_name = "N")]
    truncate: Option<usize>,
}

#[derive(Args)]
struct ExportArgs {
    /// Re-indent the output.
    #[arg(long)]
    pretty: bool,
}

#[derive(Args)]
struct EditArgs {
    /// Full path of the note.
    path: String,
    /// Editor command line, e.g. "code --wait".
    #[arg(long, value_name = "COMMAND")]
    editor: Option<String>,
}

struct AppState {
    preferences: Preferences,
    store: NoteTreeStore,
}

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let Cli {
        workspace,
        store,
        command,
    } = Cli::parse();
    let workspace_root = resolve_workspace(workspace)?;
    let mut ctx = load_context(&workspace_root, store)?;
    let codec = Base64Codec;

    match command {
        Commands::List(args) => execute_list(&ctx, &codec, args),
        Commands::AddFolder(args) => execute_add_folder(&mut ctx, args),
        Commands::AddNote(args) => execute_add_note(&mut ctx, &codec, args),
        Commands::Show(args) => execute_show(&ctx, &codec, args),
        Commands::ExportJson(args) => execute_export(&ctx, args),
        Commands::Edit(args) => execute_edit(&mut ctx, &codec, args),
    }
}

fn load_context(workspace_root: &Path, store_override: Option<PathBuf>) -> Result<AppState> {
    let prefs_path = workspace_root.join(CONFIG_DIR).join(PREFERENCES_FILE);
    let prefs = PreferencesStore::load(&prefs_path)
        .with_context(|| format!("failed to load {}", prefs_path.display()))?;
    let tree_file = match store_override {
        Some(path) if path.is_absolute() => path,
        Some(path) => workspace_root.join(path),
        None => prefs.tree_file(),
    };
    log::debug!("using note tree {}", tree_file.display());
    let store = NoteTreeStore::load(&tree_file)
        .with_context(|| format!("failed to load notes from {}", tree_file.display()))?;
    Ok(AppState {
        preferences: prefs.preferences().clone(),
        store,
    })
}

fn execute_list(ctx: &AppState, codec: &dyn Codec, args: ListArgs) -> Result<()> {
    let filter = ChildFilter::new(
        !args.folders_only,
        !args.notes_only,
        !args.hide_empty,
    );
    let root = ctx.store.tree().root();
    println!("{}/", root.label());
    let preview = args
        .preview
        .then_some(ctx.preferences.editing.preview_length);
    print_children(root, filter, args.hide_noteless, preview, codec, 1)
}

fn print_children(
    node: &NoteNode,
    filter: ChildFilter,
    hide_noteless: bool,
    preview: Option<usize>,
    codec: &dyn Codec,
    depth: usize,
) -> Result<()> {
    for child in visible_children(node, filter, hide_noteless) {
        let view = TreeItemView::from(child);
        let indent = "  ".repeat(depth);
        match view.icon {
            ItemIcon::Folder => println!("{indent}{}/", view.label),
            ItemIcon::File => match preview {
                Some(limit) => {
                    let text = child
                        .decoded_content(codec, Some(limit))
                        .with_context(|| format!("failed to decode {}", view.full_path))?;
                    println!("{indent}{}  {}", view.label, text.replace('\n', " "));
                }
                None => println!("{indent}{}", view.label),
            },
        }
        print_children(child, filter, hide_noteless, preview, codec, depth + 1)?;
    }
    Ok(())
}

fn execute_add_folder(ctx: &mut AppState, args: AddFolderArgs) -> Result<()> {
    let path = NoteTree::child_path(&args.parent, &args.label);
    ctx.store
        .tree_mut()
        .add_child(&args.parent, NoteNode::folder(&args.label, &path))
        .with_context(|| format!("failed to add folder {path}"))?;
    ctx.store.save().context("failed to save notes")?;
    println!("Added folder {path}");
    Ok(())
}

fn execute_add_note(ctx: &mut AppState, codec: &dyn Codec, args: AddNoteArgs) -> Result<()> {
    let text = match (args.text, args.file) {
        (Some(text), _) => text,
        (None, Some(file)) => fs::read_to_string(&file)
            .with_context(|| format!("failed to read {}", file.display()))?,
        (None, None) => String::new(),
    };
    let path = NoteTree::child_path(&args.parent, &args.label);
    let blob = codec.encode(&text).context("failed to encode note")?;
    ctx.store
        .tree_mut()
        .add_child(&args.parent, NoteNode::note(&args.label, &path, blob))
        .with_context(|| format!("failed to add note {path}"))?;
    ctx.store.save().context("failed to save notes")?;
    println!("Added note {path}");
    Ok(())
}

fn execute_show(ctx: &AppState, codec: &dyn Codec, args: ShowArgs) -> Result<()> {
    let node = ctx
        .store
        .tree()
        .find(&args.path)
        .ok_or_else(|| anyhow!("no note at {}", args.path))?;
    let text = node
        .decoded_content(codec, args.truncate)
        .with_context(|| format!("failed to decode {}", args.path))?;
    println!("{text}");
    Ok(())
}

fn execute_export(ctx: &AppState, args: ExportArgs) -> Result<()> {
    let json = ctx.store.tree().get_json();
    if args.pretty {
        let value: serde_json::Value =
            serde_json::from_str(&json).context("export is not valid JSON")?;
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{json}");
    }
    Ok(())
}

fn execute_edit(ctx: &mut AppState, codec: &dyn Codec, args: EditArgs) -> Result<()> {
    let editing = &ctx.preferences.editing;
    let editor = args
        .editor
        .or_else(|| editing.editor_command.clone())
        .or_else(|| std::env::var("VISUAL").ok())
        .or_else(|| std::env::var("EDITOR").ok())
        .filter(|command| !command.trim().is_empty())
        .ok_or_else(|| anyhow!("no editor configured; pass --editor or set $EDITOR"))?;

    let scratch = editing.scratch_dir();
    let mut shell = FsShell::new(&scratch, Some(editor.as_str()))
        .with_context(|| format!("failed to prepare {}", scratch.display()))?;
    let mut manager = EditSessionManager::new(editing.resource_namer());
    manager
        .open_editor(&args.path, &mut shell, &ctx.store, codec)
        .with_context(|| format!("failed to open {}", args.path))?;
    println!("Editing {} (close the editor to finish)", args.path);

    while !manager.is_empty() {
        let events = match shell.poll_events(POLL_INTERVAL) {
            Ok(events) => events,
            Err(err) => {
                manager.close_all(&mut shell);
                return Err(err).with_context(|| format!("stopped editing {}", args.path));
            }
        };
        for event in events {
            match manager.dispatch(&event, &mut shell, &mut ctx.store, codec) {
                Ok(DispatchOutcome::Saved { saves, .. }) => {
                    println!("Saved {} ({saves})", args.path)
                }
                Ok(DispatchOutcome::Closed { .. }) => println!("Closed {}", args.path),
                Ok(DispatchOutcome::Ignored) => {}
                Err(err) => eprintln!("warning: {}: {err}", args.path),
            }
        }
    }
    Ok(())
}

fn resolve_workspace(workspace: Option<PathBuf>) -> Result<PathBuf> {
    match workspace {
        Some(path) => {
            if path.is_absolute() {
                Ok(path)
            } else {
                Ok(std::env::current_dir()
                    .context("determine current directory")?
                    .join(path))
            }
        }
        None => std::env::current_dir().context("determine current directory"),
    }
}
