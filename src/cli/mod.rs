use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use uuid::Uuid;

use crate::app::App;
use crate::auth::{AuthClient, AuthEvent, GoogleProvider, IdentityProvider, Subscription};
use crate::canvas::{AppState, SpawnWindow};
use crate::config::{AppConfig, BackendKind};
use crate::db::Database;
use crate::models::Session;
use crate::store::{LocalStore, RemoteStore};

pub mod auth;
pub mod board;
pub mod card;
pub mod organize;
pub mod tag;
pub mod ui;

pub use auth::{run_login, run_logout, run_whoami};
pub use board::{run_board, BoardExit};
pub use card::run_card;
pub use organize::run_organize;
pub use tag::run_tag;

#[derive(Parser)]
#[command(name = "ideacanvas")]
#[command(about = "Cards, tags and a free-form canvas in the terminal")]
#[command(version)]
pub struct Cli {
    /// Keep data on this device instead of the signed-in store
    #[arg(long, global = true)]
    pub local: bool,
    /// Use this config file instead of the default one
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create, edit and delete cards
    Card {
        #[command(subcommand)]
        command: CardCommand,
    },
    /// Create tags and attach them to cards
    Tag {
        #[command(subcommand)]
        command: TagCommand,
    },
    /// Print the cards grouped by type
    Organize,
    /// Open the interactive board (default)
    Board,
    /// Sign in with Google
    Login,
    /// Sign out and forget the stored session
    Logout,
    /// Show who is signed in
    Whoami,
}

#[derive(Subcommand)]
pub enum CardCommand {
    /// Create a card: note, idea, task or project
    New(CardNewArgs),
    /// List cards, newest first
    List,
    /// Change a card's title
    Rename(CardRenameArgs),
    /// Change a card's content (prompts when omitted)
    Write(CardWriteArgs),
    /// Place a card on the canvas
    Move(CardMoveArgs),
    /// Flip a card between active and inactive
    Toggle(CardIdArgs),
    /// Delete a card
    Delete(CardDeleteArgs),
}

#[derive(Subcommand)]
pub enum TagCommand {
    /// Create a tag with a random color
    New(TagNewArgs),
    /// List tags
    List,
    /// Attach a tag to a card, or detach it if already attached
    Toggle(TagToggleArgs),
}

#[derive(Args)]
pub struct CardNewArgs {
    /// note, idea, task or project
    pub card_type: String,
}

#[derive(Args)]
pub struct CardIdArgs {
    /// Card id or unique id prefix
    pub id: String,
}

#[derive(Args)]
pub struct CardRenameArgs {
    /// Card id or unique id prefix
    pub id: String,
    pub title: String,
}

#[derive(Args)]
pub struct CardWriteArgs {
    /// Card id or unique id prefix
    pub id: String,
    pub content: Option<String>,
}

#[derive(Args)]
pub struct CardMoveArgs {
    /// Card id or unique id prefix
    pub id: String,
    #[arg(allow_negative_numbers = true)]
    pub x: f64,
    #[arg(allow_negative_numbers = true)]
    pub y: f64,
}

#[derive(Args)]
pub struct CardDeleteArgs {
    /// Card id or unique id prefix
    pub id: String,
    /// Skip confirmation
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args)]
pub struct TagNewArgs {
    pub name: String,
}

#[derive(Args)]
pub struct TagToggleArgs {
    /// Card id or unique id prefix
    pub card: String,
    /// Tag id, id prefix or name
    pub tag: String,
}

/// The loaded organizer and whoever it belongs to
pub struct Workspace {
    pub app: App,
    pub session: Option<Session>,
    auth: Option<AuthClient>,
    provider: Option<GoogleProvider>,
    subscription: Option<Subscription>,
    signed_out: Rc<Cell<bool>>,
}

impl Workspace {
    /// Open the configured backend. The remote backend requires a session.
    pub fn open(config: &AppConfig) -> Result<Self> {
        match config.backend {
            BackendKind::Local => Self::local(config.local_storage_dir()?, config.spawn),
            BackendKind::Remote => {
                // Without credentials sign-out still works, only revocation is skipped
                let provider = GoogleProvider::from_config(&config.google).ok();
                Self::remote(open_database(config)?, provider, config.spawn)
            }
        }
    }

    pub fn local(dir: PathBuf, spawn: SpawnWindow) -> Result<Self> {
        let app = App::new(Box::new(LocalStore::new(dir)), None, spawn)?;
        Ok(Self {
            app,
            session: None,
            auth: None,
            provider: None,
            subscription: None,
            signed_out: Rc::new(Cell::new(false)),
        })
    }

    pub fn remote(
        db: Rc<Database>,
        provider: Option<GoogleProvider>,
        spawn: SpawnWindow,
    ) -> Result<Self> {
        let auth = AuthClient::new(db.clone());
        let session = auth.require_session()?;
        let store = RemoteStore::new(db, session.user_id);
        let app = App::new(Box::new(store), Some(session.user_id), spawn)?;

        let signed_out = Rc::new(Cell::new(false));
        let flag = signed_out.clone();
        let subscription = auth.on_auth_state_change(move |event| {
            flag.set(matches!(event, AuthEvent::SignedOut));
        });

        Ok(Self {
            app,
            session: Some(session),
            auth: Some(auth),
            provider,
            subscription: Some(subscription),
            signed_out,
        })
    }

    /// Who the board header names
    pub fn owner_label(&self) -> String {
        match &self.session {
            Some(session) => session.email.clone(),
            None => "local".to_string(),
        }
    }

    /// Sign out through the shared client. False when nobody was signed in.
    pub fn sign_out(&mut self) -> Result<bool> {
        let Some(auth) = &self.auth else {
            return Ok(false);
        };
        let provider = self.provider.as_ref().map(|p| p as &dyn IdentityProvider);
        Ok(auth.sign_out(provider)?)
    }

    /// True once a sign-out has been announced. The organizer is cleared
    /// the first time this sees it.
    pub fn take_signed_out(&mut self) -> bool {
        if !self.signed_out.replace(false) {
            return false;
        }
        self.app.clear();
        self.session = None;
        true
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }
}

pub fn open_database(config: &AppConfig) -> Result<Rc<Database>> {
    let path = config.database_path()?;
    Ok(Rc::new(Database::open_at(&path)?))
}

/// Execute a parsed command line
pub fn run(command: Option<Commands>, config: &AppConfig) -> Result<()> {
    match command {
        None | Some(Commands::Board) => {
            let mut workspace = Workspace::open(config)?;
            if run_board(&mut workspace)? == BoardExit::SignedOut {
                ui::status("Signed out.");
            }
        }
        Some(Commands::Card { command }) => {
            let mut workspace = Workspace::open(config)?;
            run_card(&mut workspace.app, command)?;
        }
        Some(Commands::Tag { command }) => {
            let mut workspace = Workspace::open(config)?;
            run_tag(&mut workspace.app, command)?;
        }
        Some(Commands::Organize) => {
            let workspace = Workspace::open(config)?;
            run_organize(workspace.app.state());
        }
        Some(Commands::Login) => run_login(config)?,
        Some(Commands::Logout) => run_logout(config)?,
        Some(Commands::Whoami) => run_whoami(config)?,
    }
    Ok(())
}

// ==================== IDENTIFIERS ====================

const MIN_PREFIX: usize = 4;

/// Match a full id or a unique prefix of one
fn resolve_id<I>(ids: I, identifier: &str, kind: &str) -> Result<Uuid>
where
    I: IntoIterator<Item = Uuid>,
{
    let identifier = identifier.trim().to_lowercase();
    if identifier.is_empty() {
        bail!("{} id cannot be empty.", kind);
    }

    let ids: Vec<Uuid> = ids.into_iter().collect();
    if let Ok(id) = Uuid::parse_str(&identifier) {
        if ids.contains(&id) {
            return Ok(id);
        }
        bail!("No {} found with ID: {}", kind, identifier);
    }

    let needle = identifier.replace('-', "");
    if needle.len() < MIN_PREFIX {
        bail!("{} id prefix must be at least {} characters.", kind, MIN_PREFIX);
    }
    let matches: Vec<Uuid> = ids
        .into_iter()
        .filter(|id| id.simple().to_string().starts_with(&needle))
        .collect();
    match matches.as_slice() {
        [] => bail!("No {} matches `{}`.", kind, identifier),
        [id] => Ok(*id),
        many => bail!(
            "`{}` matches {} {}s. Use more characters.",
            identifier,
            many.len(),
            kind
        ),
    }
}

pub fn resolve_card(state: &AppState, identifier: &str) -> Result<Uuid> {
    resolve_id(state.cards.iter().map(|c| c.id), identifier, "card")
}

/// Tags resolve by id first, then by name (case-insensitive)
pub fn resolve_tag(state: &AppState, identifier: &str) -> Result<Uuid> {
    if let Ok(id) = resolve_id(state.tags.iter().map(|t| t.id), identifier, "tag") {
        return Ok(id);
    }

    let name = identifier.trim().to_lowercase();
    let matches: Vec<Uuid> = state
        .tags
        .iter()
        .filter(|t| t.name.to_lowercase() == name)
        .map(|t| t.id)
        .collect();
    match matches.as_slice() {
        [] => bail!("No tag named `{}`.", identifier.trim()),
        [id] => Ok(*id),
        many => bail!(
            "{} tags are named `{}`. Use the tag id instead.",
            many.len(),
            identifier.trim()
        ),
    }
}
