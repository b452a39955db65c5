use std::process::ExitCode;

use clap::Parser;
use process::models::Upload;

#[derive(Parser, Debug)]
#[command(author, version, about = "Bulk load CSV files into the tutoring site")]
struct Args {
    /// Uploads as `<resource>=<path>`, e.g. `courses=courses.csv`
    #[arg(required = true)]
    uploads: Vec<Upload>,

    #[arg(long, env = "TUTOR_URL", default_value = "http://localhost:1111")]
    server: String,

    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    password: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match process::load_csvs(&args.server, &args.password, &args.uploads).await {
        Ok(summary) if summary.failed.is_empty() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Import aborted: {e:#}");
            ExitCode::FAILURE
        }
    }
}
