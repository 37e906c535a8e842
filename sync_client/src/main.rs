#[tokio::main]
async fn main() -> std::io::Result<()> {
    sync_client::run_with_config().await
}
