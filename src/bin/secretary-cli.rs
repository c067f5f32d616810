use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "secretary-cli")]
#[command(about = "Management CLI for the secretary backend", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check server health and startup phase
    Status,
    /// Change the default VOICEVOX speaker
    Speaker { id: u32 },
    /// Ask connected clients to speak a line
    Say {
        text: String,
        #[arg(short, long, default_value = "normal")]
        emotion: String,
    },
    /// Read or change feature settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Stop the server
    Shutdown,
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Show all feature settings
    Get,
    /// Change one feature setting
    Set { key: String, value: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let request = match cli.command {
        Commands::Status => client.get(format!("{base}/health")),
        Commands::Speaker { id } => client
            .post(format!("{base}/api/voice/speaker"))
            .query(&[("speaker_id", id)]),
        Commands::Say { text, emotion } => client
            .post(format!("{base}/api/voice/speak"))
            .json(&json!({ "text": text, "emotion": emotion })),
        Commands::Settings {
            action: SettingsAction::Get,
        } => client.get(format!("{base}/api/settings/all")),
        Commands::Settings {
            action: SettingsAction::Set { key, value },
        } => client
            .post(format!("{base}/api/settings/update"))
            .json(&json!({ "key": key, "value": parse_value(&value) })),
        Commands::Shutdown => client.post(format!("{base}/shutdown")),
    };

    print_response(request.send().await?).await
}

/// Numbers and booleans are sent as JSON values, anything else as a string.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str::<Value>(raw)
        .ok()
        .filter(|v| v.is_number() || v.is_boolean())
        .unwrap_or_else(|| Value::String(raw.to_string()))
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: server returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
