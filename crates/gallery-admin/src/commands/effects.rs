//! Effect browsing and moderation commands.

use super::Context;
use crate::output::{self, OutputFormat};
use anyhow::{Context as _, Result};
use gallery_store::{AsyncEffects, Effect};
use tracing::info;

/// Show one effect and the code of its latest (or requested) version.
pub async fn show(ctx: &Context, id: i64, version: Option<i64>) -> Result<()> {
    let store = ctx.effects().await?;
    let effect = store.get_effect(id).await?;

    let number = version.or(effect.latest_version_number()).unwrap_or(0);
    let selected = effect
        .version(number)
        .with_context(|| format!("effect {id} has no version {number}"))?;

    match ctx.format {
        OutputFormat::Json => output::print_json(&effect),
        OutputFormat::Text => {
            output::print_heading(&format!("Effect {}", effect.id));
            output::print_row("Owner", &effect.owner);
            output::print_row("Created", &effect.created_at.to_rfc3339());
            output::print_row("Modified", &effect.modified_at.to_rfc3339());
            output::print_row(
                "Parent",
                &effect
                    .parent
                    .map(|p| format!("{} (version {})", p.id, p.version))
                    .unwrap_or_else(|| "none".to_string()),
            );
            output::print_row("Hidden", &effect.hidden.to_string());
            output::print_row("Versions", &effect.versions.len().to_string());
            output::print_row("Thumbnail", &effect.image_name());
            output::print_heading(&format!("Version {number}"));
            println!("{}", selected.code);
        }
    }
    Ok(())
}

/// Page through the gallery.
pub async fn list(ctx: &Context, page: usize, size: usize, all: bool) -> Result<()> {
    let store = ctx.effects().await?;
    let effects = store.page(page, size, all).await?;
    let total = store.count(all).await?;
    print_page(ctx, &effects, page, size, total);
    Ok(())
}

/// Page through an effect and its forks.
pub async fn siblings(ctx: &Context, id: i64, page: usize, size: usize) -> Result<()> {
    let store = ctx.effects().await?;
    let (effects, total) = sibling_page(&store, id, page, size).await?;
    print_page(ctx, &effects, page, size, total);
    Ok(())
}

/// One page of siblings plus the size of the whole family.
async fn sibling_page(
    store: &AsyncEffects,
    id: i64,
    page: usize,
    size: usize,
) -> Result<(Vec<Effect>, u64)> {
    let total = store.count_siblings(id).await?;
    if total == 0 {
        anyhow::bail!("effect {id} does not exist");
    }
    let effects = store.page_siblings(page, size, id).await?;
    Ok((effects, total))
}

/// Hide or reveal an effect.
pub async fn set_hidden(ctx: &Context, id: i64, hidden: bool) -> Result<()> {
    ctx.ensure_writable(if hidden { "hide effects" } else { "unhide effects" })?;
    let store = ctx.effects().await?;
    store.set_hidden(id, hidden).await?;
    info!(effect_id = id, hidden, "Moderation flag changed");

    let verb = if hidden { "hidden" } else { "visible" };
    output::print_success(&format!("effect {id} is now {verb}"), &ctx.format);
    Ok(())
}

fn print_page(ctx: &Context, effects: &[Effect], page: usize, size: usize, total: u64) {
    match ctx.format {
        OutputFormat::Json => output::print_json(&serde_json::json!({
            "page": page,
            "size": size,
            "total": total,
            "effects": effects,
        })),
        OutputFormat::Text => {
            for effect in effects {
                println!("{}", output::effect_line(effect));
            }
            output::print_divider();
            println!("page {page} ({} shown, {total} total)", effects.len());
        }
    }
}
