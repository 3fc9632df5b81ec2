//! Command handlers.
//!
//! Each handler writes its user-facing output to `out`; diagnostics go through
//! `tracing`.

use std::future::Future;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info};

use crate::cli::Command;
use crate::config::Config;
use crate::db::{Database, NewUser, User, UserRepository};
use crate::feed::{
    parse_interval, validate_url, FeedFollowRepository, FeedRepository, Ingestor, NewFeed,
    PostRepository, RssFetcher, Scheduler, SqlFeedStore,
};
use crate::{GatorError, Result};

/// Everything a command needs.
#[derive(Debug)]
pub struct State {
    /// Open database.
    pub db: Database,
    /// Loaded configuration.
    pub config: Config,
    /// Where the configuration is saved.
    pub config_path: PathBuf,
}

impl State {
    /// Create command state.
    pub fn new(db: Database, config: Config, config_path: PathBuf) -> Self {
        Self {
            db,
            config,
            config_path,
        }
    }

    fn set_current_user(&mut self, name: &str) -> Result<()> {
        self.config.set_user(name);
        self.config.save(&self.config_path)
    }

    /// Resolve the logged-in user.
    pub async fn current_user(&self) -> Result<User> {
        let not_found = || GatorError::Validation("couldn't find current user".to_string());

        let name = self
            .config
            .session
            .current_user
            .as_deref()
            .ok_or_else(not_found)?;

        UserRepository::new(self.db.pool())
            .get_by_name(name)
            .await?
            .ok_or_else(not_found)
    }
}

/// Run a command. `agg` stops on Ctrl-C.
pub async fn execute<W: Write>(command: Command, state: &mut State, out: &mut W) -> Result<()> {
    match command {
        Command::Register { name } => register(state, &name, out).await,
        Command::Login { name } => login(state, &name, out).await,
        Command::Reset => reset(state, out).await,
        Command::Users => users(state, out).await,
        Command::Agg { interval } => {
            agg(state, &interval, shutdown_on(tokio::signal::ctrl_c())).await
        }
        Command::AddFeed { name, url } => add_feed(state, &name, &url, out).await,
        Command::Feeds => feeds(state, out).await,
        Command::Follow { url } => follow(state, &url, out).await,
        Command::Following => following(state, out).await,
        Command::Unfollow { url } => unfollow(state, &url, out).await,
        Command::Browse { limit } => browse(state, limit, out).await,
    }
}

/// Resolve once `signal` fires.
///
/// If the signal cannot be watched, the error is logged and the returned
/// future never resolves.
async fn shutdown_on<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        error!("Cannot listen for shutdown signal, stop with a kill instead: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Create a user and make them the current user.
pub async fn register<W: Write>(state: &mut State, name: &str, out: &mut W) -> Result<()> {
    let user = UserRepository::new(state.db.pool())
        .create(&NewUser::new(name))
        .await?;
    state.set_current_user(&user.name)?;

    writeln!(
        out,
        "User {} registered successfully with ID {}.",
        user.name, user.id
    )?;
    Ok(())
}

/// Switch the current user.
pub async fn login<W: Write>(state: &mut State, name: &str, out: &mut W) -> Result<()> {
    let user = UserRepository::new(state.db.pool())
        .get_by_name(name)
        .await?
        .ok_or_else(|| GatorError::NotFound(format!("user {name}")))?;
    state.set_current_user(&user.name)?;

    writeln!(out, "User {} logged in successfully.", user.name)?;
    Ok(())
}

/// Delete all users; everything else cascades.
pub async fn reset<W: Write>(state: &State, out: &mut W) -> Result<()> {
    let removed = UserRepository::new(state.db.pool()).delete_all().await?;
    info!("Reset removed {} user(s)", removed);

    writeln!(out, "Database has been reset to its initial state.")?;
    Ok(())
}

/// List users, marking the current one.
pub async fn users<W: Write>(state: &State, out: &mut W) -> Result<()> {
    let current = state.config.session.current_user.as_deref();
    for user in UserRepository::new(state.db.pool()).list().await? {
        if Some(user.name.as_str()) == current {
            writeln!(out, "* {} (current)", user.name)?;
        } else {
            writeln!(out, "* {}", user.name)?;
        }
    }
    Ok(())
}

/// Poll feeds at `interval` until `shutdown` resolves.
pub async fn agg<F>(state: &State, interval: &str, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    let period = parse_interval(interval)?;
    let fetcher = RssFetcher::new(&state.config.fetcher)?;
    let store = SqlFeedStore::new(state.db.clone());
    let scheduler = Scheduler::new(Ingestor::new(Arc::new(store), Arc::new(fetcher)), period)?;

    info!("Collecting feeds every {}", interval.trim());
    let ticks = scheduler.run(shutdown).await;
    info!("Stopped collecting feeds after {} tick(s)", ticks);
    Ok(())
}

/// Add a feed owned by the current user and follow it.
pub async fn add_feed<W: Write>(state: &State, name: &str, url: &str, out: &mut W) -> Result<()> {
    let user = state.current_user().await?;
    validate_url(url).map_err(|e| GatorError::Validation(e.to_string()))?;

    let feed = FeedRepository::new(state.db.pool())
        .create(&NewFeed::new(name, url, user.id))
        .await?;
    writeln!(
        out,
        "Feed {} created successfully with ID {}.",
        feed.name, feed.id
    )?;

    let follow = FeedFollowRepository::new(state.db.pool())
        .create(user.id, feed.id)
        .await?;
    writeln!(
        out,
        "User {} is now following feed {}.",
        follow.user_name, follow.feed_name
    )?;
    Ok(())
}

/// List every feed with its owner.
pub async fn feeds<W: Write>(state: &State, out: &mut W) -> Result<()> {
    for entry in FeedRepository::new(state.db.pool()).list_with_owner().await? {
        writeln!(
            out,
            "* {} ({}) by {}",
            entry.feed.name, entry.feed.url, entry.owner_name
        )?;
    }
    Ok(())
}

/// Follow an existing feed.
pub async fn follow<W: Write>(state: &State, url: &str, out: &mut W) -> Result<()> {
    let user = state.current_user().await?;
    let feed = FeedRepository::new(state.db.pool())
        .get_by_url(url)
        .await?
        .ok_or_else(|| GatorError::NotFound(format!("feed {url}")))?;

    let follow = FeedFollowRepository::new(state.db.pool())
        .create(user.id, feed.id)
        .await?;
    writeln!(
        out,
        "User {} is now following feed {}.",
        follow.user_name, follow.feed_name
    )?;
    Ok(())
}

/// List the feeds the current user follows.
pub async fn following<W: Write>(state: &State, out: &mut W) -> Result<()> {
    let user = state.current_user().await?;
    for follow in FeedFollowRepository::new(state.db.pool())
        .list_for_user(user.id)
        .await?
    {
        writeln!(out, "* {}", follow.feed_name)?;
    }
    Ok(())
}

/// Stop following a feed.
pub async fn unfollow<W: Write>(state: &State, url: &str, out: &mut W) -> Result<()> {
    let user = state.current_user().await?;
    let feed = FeedRepository::new(state.db.pool())
        .get_by_url(url)
        .await?
        .ok_or_else(|| GatorError::NotFound(format!("feed {url}")))?;

    let removed = FeedFollowRepository::new(state.db.pool())
        .delete(user.id, feed.id)
        .await?;
    if !removed {
        return Err(GatorError::Validation(format!(
            "user {} is not following feed {}",
            user.name, feed.name
        )));
    }

    writeln!(out, "User {} unfollowed feed {}.", user.name, feed.name)?;
    Ok(())
}

/// Show the newest posts from followed feeds.
pub async fn browse<W: Write>(state: &State, limit: i64, out: &mut W) -> Result<()> {
    if limit < 1 {
        return Err(GatorError::Validation(
            "post limit must be a positive integer".to_string(),
        ));
    }
    let user = state.current_user().await?;

    let posts = PostRepository::new(state.db.pool())
        .list_for_user(user.id, limit)
        .await?;
    if posts.is_empty() {
        writeln!(out, "No posts yet. Run `gator agg <interval>` to collect some.")?;
        return Ok(());
    }

    for post in posts {
        writeln!(out, "* {} ({})", post.title, post.url)?;
        if let Some(published_at) = post.published_at {
            writeln!(out, "  published {}", published_at.format("%Y-%m-%d %H:%M UTC"))?;
        }
        if let Some(description) = post.description {
            writeln!(out, "  {}", description)?;
        }
    }
    Ok(())
}
