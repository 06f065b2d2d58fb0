use marginalia::application::error::AppError;
use marginalia::application::sync::Mutation;
use marginalia::cache::Fingerprint;
use marginalia::config::{ListArgs, TagsCmd};
use marginalia::domain::entities::{CreateTagRequest, UpdateTagRequest};

use crate::context::Ctx;
use crate::print::print_json;

pub async fn handle(ctx: &Ctx, cmd: TagsCmd) -> Result<(), AppError> {
    match cmd {
        TagsCmd::List(args) => list(ctx, &args).await,
        TagsCmd::Popular { limit } => popular(ctx, limit).await,
        TagsCmd::Show { id } => show(ctx, id).await,
        TagsCmd::Create { name } => create(ctx, name).await,
        TagsCmd::Update { id, name } => update(ctx, id, name).await,
        TagsCmd::Delete { id } => delete(ctx, id).await,
    }
}

async fn list(ctx: &Ctx, args: &ListArgs) -> Result<(), AppError> {
    let data = ctx
        .sync
        .query(&Fingerprint::TagList(ctx.list_query(args)))
        .await?;
    print_json(data.as_ref())
}

async fn popular(ctx: &Ctx, limit: Option<u32>) -> Result<(), AppError> {
    let data = ctx.sync.query(&Fingerprint::popular_tags(limit)).await?;
    print_json(data.as_ref())
}

async fn show(ctx: &Ctx, id: i64) -> Result<(), AppError> {
    let data = ctx.sync.query(&Fingerprint::Tag(id)).await?;
    print_json(data.as_ref())
}

async fn create(ctx: &Ctx, name: String) -> Result<(), AppError> {
    let name = validated_name(name)?;
    let outcome = ctx
        .sync
        .mutate(Mutation::CreateTag(CreateTagRequest { name }))
        .await?;
    print_json(&outcome)
}

async fn update(ctx: &Ctx, id: i64, name: String) -> Result<(), AppError> {
    let request = UpdateTagRequest {
        name: Some(validated_name(name)?),
    };
    let outcome = ctx.sync.mutate(Mutation::UpdateTag { id, request }).await?;
    print_json(&outcome)
}

async fn delete(ctx: &Ctx, id: i64) -> Result<(), AppError> {
    let outcome = ctx.sync.mutate(Mutation::DeleteTag { id }).await?;
    print_json(&outcome)
}

fn validated_name(name: String) -> Result<String, AppError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("tag name must not be empty"));
    }
    Ok(trimmed.to_string())
}
