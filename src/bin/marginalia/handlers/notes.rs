use marginalia::application::error::AppError;
use marginalia::application::sync::Mutation;
use marginalia::cache::Fingerprint;
use marginalia::config::{NoteCreateArgs, NoteListArgs, NoteTagsArgs, NoteUpdateArgs, NotesCmd};
use marginalia::domain::entities::{CreateNoteRequest, UpdateNoteRequest};

use crate::context::Ctx;
use crate::print::print_json;

pub async fn handle(ctx: &Ctx, cmd: NotesCmd) -> Result<(), AppError> {
    match cmd {
        NotesCmd::List(args) => list(ctx, args).await,
        NotesCmd::Show { id } => show(ctx, id).await,
        NotesCmd::Create(args) => create(ctx, args).await,
        NotesCmd::Update(args) => update(ctx, args).await,
        NotesCmd::Tags(args) => set_tags(ctx, args).await,
        NotesCmd::Delete { id } => delete(ctx, id).await,
    }
}

async fn list(ctx: &Ctx, args: NoteListArgs) -> Result<(), AppError> {
    let query = ctx
        .list_query(&args.list)
        .with_note_type(args.note_type)
        .with_book(args.book_id);
    let data = ctx.sync.query(&Fingerprint::NoteList(query)).await?;
    print_json(data.as_ref())
}

async fn show(ctx: &Ctx, id: i64) -> Result<(), AppError> {
    let data = ctx.sync.query(&Fingerprint::Note(id)).await?;
    print_json(data.as_ref())
}

async fn create(ctx: &Ctx, args: NoteCreateArgs) -> Result<(), AppError> {
    if args.content.trim().is_empty() {
        return Err(AppError::validation("note content must not be empty"));
    }
    let request = CreateNoteRequest {
        book_id: args.book_id,
        note_type: args.note_type,
        title: args.title,
        content: args.content,
        page_reference: args.page_reference,
        is_favorite: args.favorite.then_some(true),
        tags: (!args.tags.is_empty()).then_some(args.tags),
    };
    let outcome = ctx.sync.mutate(Mutation::CreateNote(request)).await?;
    print_json(&outcome)
}

async fn update(ctx: &Ctx, args: NoteUpdateArgs) -> Result<(), AppError> {
    let request = UpdateNoteRequest {
        book_id: args.book_id,
        note_type: args.note_type,
        title: args.title,
        content: args.content,
        page_reference: args.page_reference,
        is_favorite: args.favorite,
        tags: None,
    };
    if request == UpdateNoteRequest::default() {
        return Err(AppError::validation("no fields to update"));
    }
    let outcome = ctx
        .sync
        .mutate(Mutation::UpdateNote {
            id: args.id,
            request,
        })
        .await?;
    print_json(&outcome)
}

async fn set_tags(ctx: &Ctx, args: NoteTagsArgs) -> Result<(), AppError> {
    let outcome = ctx
        .sync
        .mutate(Mutation::UpdateNoteTags {
            id: args.id,
            tags: args.tags,
        })
        .await?;
    print_json(&outcome)
}

async fn delete(ctx: &Ctx, id: i64) -> Result<(), AppError> {
    let outcome = ctx.sync.mutate(Mutation::DeleteNote { id }).await?;
    print_json(&outcome)
}
