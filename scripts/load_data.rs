//! Load data script for the waste records API
//!
//! Logs in and posts a batch of sample waste items to a running server
//! through the public API, then walks a few of them through the status
//! lifecycle so the dashboard has something to show.
//! Run: cargo run --bin load_data -- [--url http://localhost:3001] [--count 10]

use anyhow::{bail, Context};
use clap::Parser;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::info;

const WASTE_TYPES: [&str; 5] = [
    "General Waste",
    "Recycling",
    "Hazardous",
    "Organic",
    "Electronic",
];
const UNITS: [&str; 3] = ["kg", "tonnes", "bags"];
const LOCATIONS: [&str; 4] = [
    "Manchester Office",
    "Birmingham Warehouse",
    "Leeds Depot",
    "London HQ",
];
const STATUSES: [&str; 3] = ["collected", "processing", "completed"];

#[derive(Parser)]
#[command(name = "load_data", about = "Populate a running server with sample items")]
struct Args {
    #[arg(short, long, env = "WASTE_API_URL", default_value = "http://localhost:3001")]
    url: String,
    #[arg(long, default_value = "admin")]
    username: String,
    #[arg(long, default_value = "password123")]
    password: String,
    #[arg(short, long, default_value_t = 10)]
    count: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let args = Args::parse();
    let base = args.url.trim_end_matches('/');
    let client = Client::new();

    let login = client
        .post(format!("{base}/api/login"))
        .json(&json!({ "username": args.username, "password": args.password }))
        .send()
        .await
        .with_context(|| format!("connecting to {base}"))?;
    if !login.status().is_success() {
        bail!("login failed: {}", login.text().await?);
    }
    let body: Value = login.json().await?;
    let token = body["token"].as_str().context("login response has no token")?.to_string();

    let mut created = Vec::with_capacity(args.count);
    for i in 0..args.count {
        let item = json!({
            "type": WASTE_TYPES[i % WASTE_TYPES.len()],
            "quantity": 25 * (i as i64 + 1),
            "unit": UNITS[i % UNITS.len()],
            "location": LOCATIONS[i % LOCATIONS.len()],
            "clientId": format!("CLIENT-{:03}", 100 + i),
            "clientName": format!("Sample Client {}", i + 1),
            "collectionDate": format!("2024-02-{:02}", (i % 28) + 1),
        });
        let res = client
            .post(format!("{base}/api/items"))
            .bearer_auth(&token)
            .json(&item)
            .send()
            .await?;
        if !res.status().is_success() {
            bail!("create failed ({}): {}", res.status(), res.text().await?);
        }
        let item: Value = res.json().await?;
        created.push(item["id"].as_str().unwrap_or_default().to_string());
    }
    info!(count = created.len(), "created sample items");

    // every other item moves past `pending`
    for (i, id) in created.iter().enumerate().filter(|(i, _)| i % 2 == 1) {
        let status = STATUSES[(i / 2) % STATUSES.len()];
        let res = client
            .put(format!("{base}/api/items/{id}"))
            .bearer_auth(&token)
            .json(&json!({ "status": status }))
            .send()
            .await?;
        if !res.status().is_success() {
            bail!("update of {id} failed: {}", res.text().await?);
        }
    }

    let list: Value = client
        .get(format!("{base}/api/items"))
        .bearer_auth(&token)
        .send()
        .await?
        .json()
        .await?;
    info!(total = %list["total"], "server now holds items");

    Ok(())
}
