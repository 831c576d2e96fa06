use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    chunkit_cli::main_entry().await
}
