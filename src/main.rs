//! Portfolio Builder - binary entry point
//! Delegates to the library for all app logic.

#[tokio::main]
async fn main() {
    if let Err(e) = portfolio_builder::run().await {
        eprintln!("portfolio-builder failed to start: {}", e);
        std::process::exit(1);
    }
}
