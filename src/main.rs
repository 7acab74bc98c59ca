#[tokio::main]
async fn main() {
    if let Err(e) = rx_handoff::run().await {
        eprintln!("rx-handoff: {e}");
        std::process::exit(1);
    }
}
