#![allow(missing_docs)]

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    list_crosscheck::run().await
}
