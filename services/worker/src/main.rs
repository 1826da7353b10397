use talent_match_worker::run;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("worker error: {err}");
        std::process::exit(1);
    }
}
