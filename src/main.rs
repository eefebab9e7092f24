#[tokio::main]
async fn main() -> anyhow::Result<()> {
    directus_edge_lib::run().await
}
