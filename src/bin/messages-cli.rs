use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "messages-cli")]
#[command(about = "Client for the message API", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:6060")]
    url: String,

    /// Bearer token sent with the request
    #[arg(short, long, env = "API_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the public message
    Public,
    /// Fetch the protected message
    Protected,
    /// Fetch the admin message
    Admin,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    if let Some(token) = &cli.token {
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}"))?,
        );
    }

    let path = match cli.command {
        Commands::Public => "public",
        Commands::Protected => "protected",
        Commands::Admin => "admin",
    };

    let res = client
        .get(format!("{}/api/messages/{path}", cli.url.trim_end_matches('/')))
        .headers(headers)
        .send()
        .await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
