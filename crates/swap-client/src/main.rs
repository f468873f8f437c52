#[tokio::main]
async fn main() {
    swap_client::main().await;
}
