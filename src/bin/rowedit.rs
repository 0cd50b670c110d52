use anyhow::{Context, Result};
use clap::{ArgGroup, Parser, Subcommand, ValueEnum};
use rowedit::richtext::range::{Boundary, Range};
use rowedit::{EditorConfig, ListKind, RowEditor, StaticPayload, TitleLevel};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rowedit")]
#[command(about = "Apply rich-text editing commands to a markup document", long_about = None)]
struct Args {
    /// TOML file with editor settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Paste markup or plain text at a position
    Paste {
        /// Document to edit
        file: PathBuf,
        /// Caret position
        #[arg(long)]
        at: RowOffset,
        /// Clipboard markup
        #[arg(long, conflicts_with = "text", required_unless_present = "text")]
        markup: Option<String>,
        /// Clipboard plain text
        #[arg(long)]
        text: Option<String>,
    },
    /// Change the character style of a selection
    #[command(group(
        ArgGroup::new("property")
            .required(true)
            .args(["bold", "italic", "underline", "strikethrough"])
    ))]
    Style {
        file: PathBuf,
        #[arg(long)]
        from: RowOffset,
        #[arg(long)]
        to: RowOffset,
        #[arg(long)]
        bold: bool,
        #[arg(long)]
        italic: bool,
        #[arg(long)]
        underline: bool,
        #[arg(long)]
        strikethrough: bool,
        /// Remove the style instead of applying it
        #[arg(long)]
        off: bool,
    },
    /// Turn the selected rows into a list, or list items back into rows
    List {
        file: PathBuf,
        #[arg(long)]
        from: RowOffset,
        #[arg(long)]
        to: RowOffset,
        #[arg(long, value_enum, default_value = "ul")]
        kind: ListArg,
        /// Turn list items back into rows
        #[arg(long)]
        off: bool,
    },
    /// Set the title level of the selected rows
    Title {
        file: PathBuf,
        #[arg(long)]
        from: RowOffset,
        #[arg(long)]
        to: RowOffset,
        #[arg(long, value_enum)]
        level: LevelArg,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ListArg {
    Ul,
    Ol,
}

impl From<ListArg> for ListKind {
    fn from(arg: ListArg) -> Self {
        match arg {
            ListArg::Ul => ListKind::Unordered,
            ListArg::Ol => ListKind::Ordered,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LevelArg {
    None,
    H1,
    H2,
    H3,
}

impl From<LevelArg> for Option<TitleLevel> {
    fn from(arg: LevelArg) -> Self {
        match arg {
            LevelArg::None => None,
            LevelArg::H1 => Some(TitleLevel::H1),
            LevelArg::H2 => Some(TitleLevel::H2),
            LevelArg::H3 => Some(TitleLevel::H3),
        }
    }
}

/// `ROW:OFFSET`, a character offset within a row's text
#[derive(Clone, Copy, Debug)]
struct RowOffset {
    row: usize,
    offset: usize,
}

impl FromStr for RowOffset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (row, offset) = s
            .split_once(':')
            .ok_or_else(|| format!("expected ROW:OFFSET, got '{}'", s))?;
        let row = row.trim().parse().map_err(|_| format!("invalid row in '{}'", s))?;
        let offset = offset
            .trim()
            .parse()
            .map_err(|_| format!("invalid offset in '{}'", s))?;
        Ok(RowOffset { row, offset })
    }
}

fn load_editor(file: &Path, config: &EditorConfig) -> Result<RowEditor> {
    let markup = fs::read_to_string(file)
        .with_context(|| format!("failed to read document {}", file.display()))?;
    Ok(RowEditor::from_markup(&markup).with_config(config))
}

fn boundary(editor: &RowEditor, at: RowOffset) -> Result<Boundary> {
    editor
        .document()
        .boundary_at(at.row, at.offset)
        .with_context(|| format!("no position {}:{} in document", at.row, at.offset))
}

fn select(editor: &mut RowEditor, from: RowOffset, to: RowOffset) -> Result<()> {
    let range = Range::from_boundaries(boundary(editor, from)?, boundary(editor, to)?);
    editor.select(range);
    Ok(())
}

fn run(command: Commands, config: &EditorConfig) -> Result<String> {
    let editor = match command {
        Commands::Paste {
            file,
            at,
            markup,
            text,
        } => {
            let mut editor = load_editor(&file, config)?;
            let caret = boundary(&editor, at)?;
            editor.select(Range::collapsed_at(caret));
            let payload = StaticPayload {
                markup: markup.unwrap_or_default(),
                plain_text: text.unwrap_or_default(),
            };
            editor.paste(&payload)?;
            editor
        }
        Commands::Style {
            file,
            from,
            to,
            bold,
            italic,
            underline,
            strikethrough,
            off,
        } => {
            let mut editor = load_editor(&file, config)?;
            select(&mut editor, from, to)?;
            if bold {
                editor.bold(!off)?;
            }
            if italic {
                editor.italic(!off)?;
            }
            if underline {
                editor.underline(!off)?;
            }
            if strikethrough {
                editor.strikethrough(!off)?;
            }
            editor
        }
        Commands::List {
            file,
            from,
            to,
            kind,
            off,
        } => {
            let mut editor = load_editor(&file, config)?;
            select(&mut editor, from, to)?;
            if off {
                editor.un_toggle_list(kind.into());
            } else {
                editor.toggle_list(kind.into());
            }
            editor
        }
        Commands::Title {
            file,
            from,
            to,
            level,
        } => {
            let mut editor = load_editor(&file, config)?;
            select(&mut editor, from, to)?;
            editor.title(level.into());
            editor
        }
    };
    Ok(editor.to_markup())
}

/// Filter from `RUST_LOG` directives, warnings only when unset or invalid
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"))
}

fn main() -> Result<()> {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(directives.as_deref()))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => EditorConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => EditorConfig::default(),
    };

    let markup = run(args.command, &config)?;
    println!("{}", markup);
    Ok(())
}
