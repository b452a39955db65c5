//! # Bulk Import
//!
//! Loads spreadsheet exports into a running server.
//!
//! ## Flow
//! 1. Sign in with the admin password, the session cookie is kept for the whole run.
//!
//! 2. For each `<resource>=<path>` argument, read the file and send it to `/api/import/<resource>`
//!    as `text/csv`.
//!
//! 3. The server upserts by id, so re-running the same export updates rows instead of duplicating them.
//!
//! 4. A refused file does not stop the run. Failures are listed at the end and the exit code is non-zero.
//!
//! ## Notes
//! - Files are sent as-is, all column mapping and `NULL` handling happens on the server.
//! - Each file is one batch. If the server refuses it, none of its rows are written.
use std::fs;

use anyhow::{Context, Error};
use indicatif::{ProgressBar, ProgressStyle};
use tutor::client::AdminClient;

pub mod models;
pub mod utils;

use models::{Summary, Upload};

pub async fn load_csvs(server: &str, password: &str, uploads: &[Upload]) -> Result<Summary, Error> {
    let client = AdminClient::new(server)?;
    client
        .login(password)
        .await
        .with_context(|| format!("signing in to {server}"))?;

    println!("Signed in to {server}");
    println!("Files queued: {}\n", uploads.len());

    let summary = upload_all(&client, uploads).await?;

    println!("Total Rows: {}", summary.rows);
    println!("Files Imported: {}", summary.files);

    if !summary.failed.is_empty() {
        println!("Files Refused: {}\n", summary.failed.len());
        for (upload, reason) in &summary.failed {
            println!("  {upload}: {reason}");
        }
    }

    client.logout().await?;
    Ok(summary)
}

async fn upload_all(client: &AdminClient, uploads: &[Upload]) -> Result<Summary, Error> {
    let pb = ProgressBar::new(uploads.len() as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        )?
        .progress_chars("=> "),
    );

    let mut summary = Summary::default();

    for upload in uploads {
        pb.set_message(format!("Uploading {upload}"));

        let csv = fs::read(&upload.path)
            .with_context(|| format!("reading {}", upload.path.display()))?;

        match client.import(upload.resource, csv).await {
            Ok(rows) => {
                pb.println(format!(
                    "{}: {rows} rows from {}",
                    upload.resource.label(),
                    upload.path.display()
                ));
                summary.rows += rows;
                summary.files += 1;
            }
            Err(e) => {
                pb.println(format!(
                    "{}: refused {}",
                    upload.resource.label(),
                    upload.path.display()
                ));
                summary.failed.push((upload.clone(), e.to_string()));
            }
        }

        pb.inc(1);
    }

    pb.finish_with_message("Done");
    Ok(summary)
}
