#[tokio::main]
async fn main() -> anyhow::Result<()> {
    review_scheduler_backend::run().await
}
