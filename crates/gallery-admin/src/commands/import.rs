//! Dump import command.

use super::Context;
use crate::output::{self, OutputFormat};
use anyhow::{Context as _, Result};
use gallery_store::{ImportConfig, ImportReport, Importer, SqliteEffects};
use std::fs::File;
use std::path::PathBuf;
use tracing::info;

/// Import `file` into the data directory's database.
pub async fn run(ctx: &Context, file: PathBuf) -> Result<()> {
    ctx.ensure_writable("import")?;

    let input = File::open(&file).with_context(|| format!("could not open {}", file.display()))?;
    let store = SqliteEffects::with_pool(ctx.pool()?);
    let importer = Importer::new(ImportConfig::with_max_line_bytes(
        ctx.config.import_max_line_bytes,
    ));

    info!(file = %file.display(), "Importing dump");
    // Parsing multi-megabyte lines is blocking work.
    let report: ImportReport = tokio::task::spawn_blocking(move || importer.import(input, &store))
        .await
        .context("import task panicked")?
        .with_context(|| format!("could not import {}", file.display()))?;

    match ctx.format {
        OutputFormat::Json => output::print_json(&serde_json::json!({
            "imported": report.imported,
            "skipped": report.skipped,
        })),
        OutputFormat::Text => println!(
            "imported {} effects ({} blank lines skipped)",
            report.imported, report.skipped
        ),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_context;

    const DUMP: &str = concat!(
        r#"{"_id":1,"created_at":{"$date":1000},"modified_at":{"$date":1000},"parent":0,"user":"a","versions":[{"created_at":{"$date":1000},"code":"x"}]}"#,
        "\n",
        r#"{"_id":2,"created_at":{"$date":2000},"modified_at":{"$date":2000},"parent":1,"parent_version":0,"user":"b","versions":[{"created_at":{"$date":2000},"code":"y"}]}"#,
        "\n",
    );

    #[tokio::test]
    async fn imports_into_data_dir() {
        let (dir, ctx) = test_context(false);
        let file = dir.path().join("dump.json");
        std::fs::write(&file, DUMP).unwrap();

        run(&ctx, file).await.unwrap();

        let store = ctx.effects().await.unwrap();
        assert_eq!(store.count(true).await.unwrap(), 2);
        let fork = store.get_effect(2).await.unwrap();
        assert_eq!(fork.parent.map(|p| p.id), Some(1));
    }

    #[tokio::test]
    async fn reimport_reports_line() {
        let (dir, ctx) = test_context(false);
        let file = dir.path().join("dump.json");
        std::fs::write(&file, DUMP).unwrap();

        run(&ctx, file.clone()).await.unwrap();
        let err = run(&ctx, file).await.unwrap_err();
        assert!(format!("{err:#}").contains("line 1"));
    }

    #[tokio::test]
    async fn read_only_refuses_import() {
        let (dir, ctx) = test_context(true);
        let file = dir.path().join("dump.json");
        std::fs::write(&file, DUMP).unwrap();

        assert!(run(&ctx, file).await.is_err());
        assert!(!ctx.paths.database_file().exists());
    }
}
