//! Manual smoke tester for a running Meal Ping server.

use clap::{Parser, Subcommand};
use serde_json::json;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Base URL of the server
    #[arg(long, default_value = "http://localhost:8000")]
    server: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check server health and store connectivity
    Health,
    /// Register a member, optionally with a push token
    Register {
        name: String,
        #[arg(long)]
        push_token: Option<String>,
    },
    /// Start a meal event as the given creator
    Meal {
        meal_type: String,
        creator_name: String,
    },
    /// Show the active meal event
    Current,
    /// RSVP to the active meal ("join" or "not_coming")
    Rsvp { name: String, status: String },
}

#[tokio::main]
async fn main() -> Result<(), reqwest::Error> {
    let args = Args::parse();
    let client = reqwest::Client::new();

    let response = match args.command {
        Command::Health => client.get(format!("{}/", args.server)).send().await?,
        Command::Register { name, push_token } => {
            client
                .post(format!("{}/register", args.server))
                .json(&json!({ "name": name, "push_token": push_token }))
                .send()
                .await?
        }
        Command::Meal {
            meal_type,
            creator_name,
        } => {
            client
                .post(format!("{}/meal", args.server))
                .json(&json!({ "meal_type": meal_type, "creator_name": creator_name }))
                .send()
                .await?
        }
        Command::Current => {
            client
                .get(format!("{}/meal/current", args.server))
                .send()
                .await?
        }
        Command::Rsvp { name, status } => {
            client
                .post(format!("{}/meal/rsvp", args.server))
                .json(&json!({ "name": name, "status": status }))
                .send()
                .await?
        }
    };

    println!("{}", response.status());
    println!("{}", response.text().await?);

    Ok(())
}
