use std::env;

#[tokio::main]
async fn main() {
    payoff::init_tracing();

    let raw_args: Vec<String> = env::args().collect();
    match raw_args.get(1).map(|s| s.as_str()) {
        Some("serve") => {
            let port = raw_args
                .get(2)
                .and_then(|s| s.parse::<u16>().ok())
                .unwrap_or(8080);
            if let Err(e) = payoff::api::run_http_server(port).await {
                eprintln!("Server error: {e}");
                std::process::exit(1);
            }
        }
        Some("plan") => {
            if let Err(e) = payoff::api::run_cli(raw_args.iter().skip(1)) {
                eprintln!("{e}");
                std::process::exit(1);
            }
        }
        _ => {
            eprintln!("Usage: payoff serve [port] | payoff plan --debts <file.json> [options]");
            std::process::exit(1);
        }
    }
}
