#[tokio::main]
async fn main() -> std::io::Result<()> {
    relay_server::run_with_config().await
}
