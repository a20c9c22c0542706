use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::fs;

const TOKEN_FILE: &str = ".waste_token";

#[derive(Parser)]
#[command(name = "waste-cli")]
#[command(about = "CLI for the waste records API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, env = "WASTE_API_URL", default_value = "http://localhost:3001")]
    url: String,
}

#[derive(Subcommand)]
enum Commands {
    Health,
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        password: String,
    },
    List,
    Get {
        #[arg(short, long)]
        id: String,
    },
    Create {
        #[arg(short = 't', long = "type")]
        kind: String,
        #[arg(short, long)]
        quantity: i64,
        #[arg(short, long, default_value = "kg")]
        unit: String,
        #[arg(short, long)]
        location: String,
        #[arg(long)]
        client_id: String,
        #[arg(long)]
        client_name: String,
        #[arg(short = 'd', long)]
        collection_date: Option<String>,
    },
    Update {
        #[arg(short, long)]
        id: String,
        #[command(flatten)]
        fields: UpdateFields,
    },
    Delete {
        #[arg(short, long)]
        id: String,
    },
    Logout,
}

#[derive(Args)]
struct UpdateFields {
    #[arg(short = 't', long = "type")]
    kind: Option<String>,
    #[arg(short, long)]
    quantity: Option<i64>,
    #[arg(short, long)]
    unit: Option<String>,
    #[arg(short, long)]
    location: Option<String>,
    #[arg(long)]
    client_id: Option<String>,
    #[arg(long)]
    client_name: Option<String>,
    #[arg(short, long)]
    status: Option<String>,
    #[arg(short = 'd', long)]
    collection_date: Option<String>,
    /// Send `collectionDate: null`
    #[arg(long, conflicts_with = "collection_date")]
    clear_collection_date: bool,
}

impl UpdateFields {
    // only flags that were given end up in the body
    fn into_body(self) -> Value {
        let mut body = Map::new();
        let strings = [
            ("type", self.kind),
            ("unit", self.unit),
            ("location", self.location),
            ("clientId", self.client_id),
            ("clientName", self.client_name),
            ("status", self.status),
            ("collectionDate", self.collection_date),
        ];
        for (key, value) in strings {
            if let Some(value) = value {
                body.insert(key.to_string(), Value::String(value));
            }
        }
        if let Some(quantity) = self.quantity {
            body.insert("quantity".to_string(), json!(quantity));
        }
        if self.clear_collection_date {
            body.insert("collectionDate".to_string(), Value::Null);
        }
        Value::Object(body)
    }
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
    user: Value,
}

fn authed(builder: RequestBuilder) -> RequestBuilder {
    let token = fs::read_to_string(TOKEN_FILE).unwrap_or_default();
    builder.bearer_auth(token.trim())
}

async fn print_response(res: reqwest::Response) -> anyhow::Result<()> {
    let status = res.status();
    let text = res.text().await?;
    let pretty = serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|v| serde_json::to_string_pretty(&v).ok())
        .unwrap_or(text);
    println!("{status}\n{pretty}");

    // a rejected token is useless; make the user log in again
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        let _ = fs::remove_file(TOKEN_FILE);
        eprintln!("Token cleared; run `waste-cli login` again.");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Health => {
            let res = client.get(format!("{base}/api/health")).send().await?;
            print_response(res).await?;
        }
        Commands::Login { username, password } => {
            let res = client
                .post(format!("{base}/api/login"))
                .json(&json!({ "username": username, "password": password }))
                .send()
                .await?;
            if res.status().is_success() {
                let body: LoginResponse = res.json().await?;
                fs::write(TOKEN_FILE, &body.token)
                    .with_context(|| format!("writing {TOKEN_FILE}"))?;
                println!("Logged in as {}. Token saved to {TOKEN_FILE}", body.user["username"]);
            } else {
                println!("Login failed: {}", res.text().await?);
            }
        }
        Commands::List => {
            let res = authed(client.get(format!("{base}/api/items"))).send().await?;
            print_response(res).await?;
        }
        Commands::Get { id } => {
            let res = authed(client.get(format!("{base}/api/items/{id}"))).send().await?;
            print_response(res).await?;
        }
        Commands::Create {
            kind,
            quantity,
            unit,
            location,
            client_id,
            client_name,
            collection_date,
        } => {
            let res = authed(client.post(format!("{base}/api/items")))
                .json(&json!({
                    "type": kind,
                    "quantity": quantity,
                    "unit": unit,
                    "location": location,
                    "clientId": client_id,
                    "clientName": client_name,
                    "collectionDate": collection_date,
                }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Update { id, fields } => {
            let res = authed(client.put(format!("{base}/api/items/{id}")))
                .json(&fields.into_body())
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Delete { id } => {
            let res = authed(client.delete(format!("{base}/api/items/{id}"))).send().await?;
            print_response(res).await?;
        }
        Commands::Logout => {
            let _ = fs::remove_file(TOKEN_FILE);
            println!("Logged out (token removed).");
        }
    }

    Ok(())
}
