//! Interactive list browsing.
//!
//! Plain lines are search input and go through the debounced search
//! coordinator. Lines starting with `:` are commands (`:page N`, `:next`,
//! `:prev`, `:type T|all`, `:clear`, `:refresh`, `:quit`). Every rendered page
//! is written as one JSON document.

use std::io::Write;
use std::str::FromStr;

use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

use marginalia::application::error::AppError;
use marginalia::application::search::{SearchHandle, spawn_search};
use marginalia::application::session::{ListResource, ListSession};
use marginalia::application::sync::ReadingSync;
use marginalia::cache::{CacheSnapshot, CacheStatus, Subscription};
use marginalia::config::{BrowseArgs, BrowseTarget};
use marginalia::domain::entities::{NoteType, QueryData};
use marginalia::infra::error::InfraError;

use crate::context::Ctx;
use crate::print::write_json;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowseInput {
    Search(String),
    Clear,
    Page(u32),
    Next,
    Previous,
    Type(Option<NoteType>),
    Refresh,
    Quit,
}

impl FromStr for BrowseInput {
    type Err = AppError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let Some(command) = line.strip_prefix(':') else {
            return Ok(BrowseInput::Search(line.to_string()));
        };
        let mut parts = command.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let argument = parts.next();

        match (name, argument) {
            ("page", Some(value)) => value
                .parse()
                .map(BrowseInput::Page)
                .map_err(|_| AppError::validation(format!("invalid page `{value}`"))),
            ("next", None) => Ok(BrowseInput::Next),
            ("prev", None) => Ok(BrowseInput::Previous),
            ("type", Some("all")) => Ok(BrowseInput::Type(None)),
            ("type", Some(value)) => value
                .parse::<NoteType>()
                .map(|note_type| BrowseInput::Type(Some(note_type)))
                .map_err(|err| AppError::validation(err.to_string())),
            ("clear", None) => Ok(BrowseInput::Clear),
            ("refresh", None) => Ok(BrowseInput::Refresh),
            ("quit" | "q", None) => Ok(BrowseInput::Quit),
            _ => Err(AppError::validation(format!(
                "unknown command `:{}`",
                command.trim()
            ))),
        }
    }
}

pub async fn handle(ctx: &Ctx, args: BrowseArgs) -> Result<(), AppError> {
    let input = BufReader::new(tokio::io::stdin());
    let mut out = std::io::stdout();
    run(ctx, &args, input, &mut out).await
}

/// Drive one browse session until `:quit` or end of input.
///
/// On end of input, a search term still inside its debounce window is
/// committed and rendered before returning.
pub async fn run<R, W>(ctx: &Ctx, args: &BrowseArgs, input: R, out: &mut W) -> Result<(), AppError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let resource = resource_for(args)?;
    let pagination = &ctx.settings.pagination;
    let mut view = BrowseView {
        session: ListSession::new(resource, pagination.per_page, pagination.empty_page_policy),
        watch: None,
    };

    let (handle, mut terms, _search_task) = spawn_search(ctx.settings.search.debounce);
    let mut search = Some(handle);
    let collector = ctx.sync.cache().spawn_collector(ctx.settings.cache.gc_time);
    let mut lines = input.lines();

    view.render(&ctx.sync, out).await?;

    loop {
        tokio::select! {
            line = lines.next_line(), if search.is_some() => {
                let Some(line) = line.map_err(InfraError::from)? else {
                    debug!("browse input closed");
                    search = None;
                    continue;
                };
                let command = match line.parse::<BrowseInput>() {
                    Ok(command) => command,
                    Err(err) => {
                        write_error(out, &err)?;
                        continue;
                    }
                };
                if command == BrowseInput::Quit {
                    break;
                }
                if let Some(handle) = search.as_ref() {
                    view.apply(ctx, handle, command, out).await?;
                }
            }
            term = terms.recv() => {
                let Some(term) = term else {
                    break;
                };
                view.session.apply_search(&term);
                view.render(&ctx.sync, out).await?;
            }
            snapshot = next_snapshot(&mut view.watch) => match snapshot {
                Some(snapshot) => {
                    if snapshot.status == CacheStatus::Stale && view.is_stale(&ctx.sync) {
                        view.render(&ctx.sync, out).await?;
                    }
                }
                None => view.watch = None,
            },
        }
    }

    collector.abort();
    if let Some(subscription) = view.watch.take() {
        ctx.sync.unsubscribe(subscription);
    }
    Ok(())
}

fn resource_for(args: &BrowseArgs) -> Result<ListResource, AppError> {
    match (args.target, args.book_id) {
        (BrowseTarget::Books, None) => Ok(ListResource::Books),
        (BrowseTarget::Tags, None) => Ok(ListResource::Tags),
        (BrowseTarget::Notes, None) => Ok(ListResource::Notes),
        (BrowseTarget::Notes, Some(book_id)) => Ok(ListResource::BookNotes(book_id)),
        (_, Some(_)) => Err(AppError::validation("--book only applies to notes")),
    }
}

async fn next_snapshot(
    watch: &mut Option<Subscription<QueryData>>,
) -> Option<CacheSnapshot<QueryData>> {
    match watch {
        Some(subscription) => subscription.recv().await,
        None => std::future::pending().await,
    }
}

fn write_error<W: Write>(out: &mut W, err: &AppError) -> Result<(), AppError> {
    writeln!(out, "error: {err}").map_err(InfraError::from)?;
    Ok(())
}

#[derive(Serialize)]
struct PageView<'a> {
    list: String,
    page: u32,
    total_pages: Option<u32>,
    total: Option<u64>,
    search: Option<&'a str>,
    note_type: Option<NoteType>,
    items: &'a QueryData,
}

struct BrowseView {
    session: ListSession,
    watch: Option<Subscription<QueryData>>,
}

impl BrowseView {
    async fn apply<W: Write>(
        &mut self,
        ctx: &Ctx,
        search: &SearchHandle,
        command: BrowseInput,
        out: &mut W,
    ) -> Result<(), AppError> {
        match command {
            BrowseInput::Search(value) => {
                search.input(value);
                Ok(())
            }
            BrowseInput::Clear => {
                search.clear();
                Ok(())
            }
            BrowseInput::Page(page) => match self.session.set_page(page) {
                Ok(()) => self.render(&ctx.sync, out).await,
                Err(err) => write_error(out, &AppError::from(err)),
            },
            BrowseInput::Next => {
                self.session.next_page();
                self.render(&ctx.sync, out).await
            }
            BrowseInput::Previous => {
                self.session.previous_page();
                self.render(&ctx.sync, out).await
            }
            BrowseInput::Type(note_type) => match self.session.set_note_type(note_type) {
                Ok(()) => self.render(&ctx.sync, out).await,
                Err(err) => write_error(out, &err),
            },
            BrowseInput::Refresh => {
                let current = self.session.fingerprint();
                ctx.sync.cache().invalidate(|fingerprint| fingerprint == &current);
                self.render(&ctx.sync, out).await
            }
            BrowseInput::Quit => Ok(()),
        }
    }

    /// Read the current page and write it out. Read failures are reported
    /// inline and leave the session as it was.
    async fn render<W: Write>(&mut self, sync: &ReadingSync, out: &mut W) -> Result<(), AppError> {
        match self.session.load(sync).await {
            Ok(data) => {
                self.watch_current(sync);
                let pagination = self.session.pagination();
                let view = PageView {
                    list: self.session.fingerprint().to_string(),
                    page: pagination.displayed_page(),
                    total_pages: pagination.total_pages(),
                    total: pagination.total_items(),
                    search: pagination.filters().search.as_deref(),
                    note_type: pagination.filters().note_type,
                    items: data.as_ref(),
                };
                write_json(out, &view)
            }
            Err(err) => {
                warn!(list = %self.session.fingerprint(), error = %err, "browse read failed");
                write_error(out, &AppError::from(err))
            }
        }
    }

    fn watch_current(&mut self, sync: &ReadingSync) {
        let fingerprint = self.session.fingerprint();
        if self
            .watch
            .as_ref()
            .is_some_and(|subscription| subscription.fingerprint() == &fingerprint)
        {
            return;
        }
        if let Some(previous) = self.watch.take() {
            sync.unsubscribe(previous);
        }
        self.watch = Some(sync.subscribe(&fingerprint));
    }

    fn is_stale(&self, sync: &ReadingSync) -> bool {
        self.watch.as_ref().is_some_and(|subscription| {
            sync.cache().status(subscription.fingerprint()) == Some(CacheStatus::Stale)
        })
    }
}
