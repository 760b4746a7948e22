//! Simple IRC client example
//!
//! Connects, waits for registration to finish, lists the members of the
//! first configured channel, greets it and quits.
//!
//! ```text
//! RUST_LOG=slirc_client=debug cargo run --example simple_client -- client.toml
//! ```
//!
//! Without a config file it connects to irc.libera.chat over TLS.

use slirc_client::{Client, ClientOptions, Config, Emitter, Event};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let options = match std::env::args().nth(1) {
        Some(path) => ClientOptions::load(path)?,
        None => ClientOptions {
            host: Some("irc.libera.chat".to_string()),
            secure: Some(true),
            nick: Some("slirc_demo".to_string()),
            username: Some("slirc".to_string()),
            real_name: Some("slirc-client demo".to_string()),
            channels: Some(vec!["#slirc-demo".to_string()]),
            ..Default::default()
        },
    };
    let config = Config::from(options);
    let channel = config.channels.first().cloned();

    let events = Emitter::new();
    let mut all = events.subscribe_all();
    let client = Client::connect(config, events).await?;

    while let Some(event) = all.recv().await {
        match event {
            Event::Ready => {
                println!("✓ Registered as {}", client.nick());
                if let Some(channel) = &channel {
                    let client = client.clone();
                    let channel = channel.clone();
                    tokio::spawn(async move {
                        match client.names(&channel).await {
                            Ok(nicks) => {
                                println!("{} members in {}", nicks.len(), channel);
                                let _ = client.say(&channel, "Hello from slirc-client!").await;
                                let _ = client.end(Some("Goodbye!")).await;
                            }
                            Err(e) => eprintln!("names failed: {e}"),
                        }
                    });
                }
            }
            Event::Message { from, target, text } => println!("<{from}> {target}: {text}"),
            Event::Motd(Some(motd)) => println!("{motd}"),
            Event::Error(e) => eprintln!("error: {e}"),
            Event::Close { had_error } => {
                println!("connection closed (error: {had_error})");
                break;
            }
            other => println!("← {}", other.name()),
        }
    }

    Ok(())
}
