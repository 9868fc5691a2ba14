mod adapters;
mod cycle;
mod history;
mod host;
mod mqtt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    host::run().await
}
