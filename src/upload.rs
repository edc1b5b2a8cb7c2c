use crate::config::Config;
use crate::indexer::{ESSAYS_DATA_FILE, FILE_LIST_FILE};
use anyhow::{Context, Result};
use colored::*;

/// Push both index artifacts to the configured S3 bucket.
///
/// Failures here are the caller's to report; the locally written artifacts
/// are already on disk and stay valid either way.
pub async fn upload_artifacts(
    config: &Config,
    essays_json: &str,
    file_list_json: &str,
) -> Result<()> {
    println!(
        "{}",
        format!(
            "Uploading artifacts to s3://{} ({})...",
            config.s3_bucket, config.s3_region
        )
        .blue()
    );

    let client = reqwest::Client::new();
    put_object(&client, config, ESSAYS_DATA_FILE, essays_json).await?;
    put_object(&client, config, FILE_LIST_FILE, file_list_json).await?;

    Ok(())
}

async fn put_object(
    client: &reqwest::Client,
    config: &Config,
    key: &str,
    body: &str,
) -> Result<()> {
    let url = object_url(config, key);
    let response = client
        .put(&url)
        .header("Content-Type", "application/json")
        .body(body.to_string())
        .send()
        .await
        .with_context(|| format!("Failed to upload {}", key))?;

    let status = response.status();
    if !status.is_success() {
        let detail = response.text().await.unwrap_or_default();
        anyhow::bail!("Upload of {} failed with status {}: {}", key, status, detail);
    }

    println!("  {} Uploaded: {}", "✓".green(), key);
    Ok(())
}

fn object_url(config: &Config, key: &str) -> String {
    format!(
        "https://{}.s3.{}.amazonaws.com/{}",
        config.s3_bucket, config.s3_region, key
    )
}
