#[tokio::main]
async fn main() -> anyhow::Result<()> {
    confresolve::cli::run_cli().await
}
