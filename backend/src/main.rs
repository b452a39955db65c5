#[tokio::main]
async fn main() {
    if let Err(e) = tutor::start_server().await {
        eprintln!("Server failed: {e}");
        std::process::exit(1);
    }
}
