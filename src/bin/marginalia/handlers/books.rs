use marginalia::application::error::AppError;
use marginalia::application::sync::Mutation;
use marginalia::cache::Fingerprint;
use marginalia::config::{BookCreateArgs, BookNotesArgs, BookUpdateArgs, BooksCmd, ListArgs};
use marginalia::domain::entities::{CreateBookRequest, UpdateBookRequest};

use crate::context::Ctx;
use crate::print::print_json;

pub async fn handle(ctx: &Ctx, cmd: BooksCmd) -> Result<(), AppError> {
    match cmd {
        BooksCmd::List(args) => list(ctx, &args).await,
        BooksCmd::Show { id } => show(ctx, id).await,
        BooksCmd::Notes(args) => notes(ctx, args).await,
        BooksCmd::Create(args) => create(ctx, args).await,
        BooksCmd::Update(args) => update(ctx, args).await,
        BooksCmd::Delete { id } => delete(ctx, id).await,
    }
}

async fn list(ctx: &Ctx, args: &ListArgs) -> Result<(), AppError> {
    let fingerprint = Fingerprint::BookList(ctx.list_query(args));
    let data = ctx.sync.query(&fingerprint).await?;
    print_json(data.as_ref())
}

async fn show(ctx: &Ctx, id: i64) -> Result<(), AppError> {
    let data = ctx.sync.query(&Fingerprint::Book(id)).await?;
    print_json(data.as_ref())
}

async fn notes(ctx: &Ctx, args: BookNotesArgs) -> Result<(), AppError> {
    let fingerprint = Fingerprint::BookNotes {
        book_id: args.id,
        query: ctx.list_query(&args.list).with_note_type(args.note_type),
    };
    let data = ctx.sync.query(&fingerprint).await?;
    print_json(data.as_ref())
}

async fn create(ctx: &Ctx, args: BookCreateArgs) -> Result<(), AppError> {
    let request = CreateBookRequest {
        title: args.title,
        author: args.author,
        isbn: args.isbn,
        publisher: args.publisher,
        page_count: args.page_count,
        description: args.description,
    };
    let outcome = ctx.sync.mutate(Mutation::CreateBook(request)).await?;
    print_json(&outcome)
}

async fn update(ctx: &Ctx, args: BookUpdateArgs) -> Result<(), AppError> {
    let request = UpdateBookRequest {
        title: args.title,
        author: args.author,
        isbn: args.isbn,
        publisher: args.publisher,
        page_count: args.page_count,
        description: args.description,
    };
    if request.is_empty() {
        return Err(AppError::validation("no fields to update"));
    }
    let outcome = ctx
        .sync
        .mutate(Mutation::UpdateBook {
            id: args.id,
            request,
        })
        .await?;
    print_json(&outcome)
}

async fn delete(ctx: &Ctx, id: i64) -> Result<(), AppError> {
    let outcome = ctx.sync.mutate(Mutation::DeleteBook { id }).await?;
    print_json(&outcome)
}
