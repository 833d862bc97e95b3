//! Terminal chat demo
//!
//! Drives a published chatbot from stdin: `ADRENAL_PUBLISH_ID` selects
//! the chatbot, `ADRENAL_BASE_URL` optionally points at a self-hosted
//! deployment. Assistant turns render incrementally from controller
//! snapshots as the response streams.

use adrenal::{ChatConfig, ChatController, Role, SessionState};
use std::io::{BufRead, Write};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "adrenal=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let publish_id = std::env::var("ADRENAL_PUBLISH_ID")
        .map_err(|_| "ADRENAL_PUBLISH_ID must be set to a chatbot publish id")?;
    let mut config = ChatConfig::new(publish_id);
    if let Ok(base_url) = std::env::var("ADRENAL_BASE_URL") {
        config = config.with_base_url(base_url);
    }

    let controller = ChatController::new(config);
    controller.load_chatbot().await;

    match &controller.snapshot().session {
        SessionState::Ready(chatbot) => {
            println!("Connected to \"{}\"", chatbot.title);
            if !chatbot.live {
                println!("This chatbot is not live; messages cannot be sent.");
            }
        }
        SessionState::Offline(e) => return Err(e.clone().into()),
        SessionState::Loading => unreachable!("load_chatbot resolves the session"),
    }
    if let Some(greeting) = controller.messages().last() {
        println!("assistant: {}", greeting.content);
    }

    // Render incremental assistant content from snapshots while the
    // prompt loop below blocks on stdin.
    let mut updates = controller.subscribe();
    let renderer = tokio::spawn(async move {
        let mut printed = 0usize;
        while updates.changed().await.is_ok() {
            let snapshot = updates.borrow_and_update().clone();
            let Some(last) = snapshot.messages.last() else {
                continue;
            };
            match last.role {
                Role::Assistant if !last.id.is_initial() => {
                    if printed == 0 && !last.content.is_empty() {
                        print!("assistant: ");
                    }
                    if last.content.len() > printed {
                        print!("{}", &last.content[printed..]);
                        let _ = std::io::stdout().flush();
                    }
                    printed = last.content.len();
                    if !snapshot.loading && printed > 0 {
                        println!();
                        printed = 0;
                    }
                }
                Role::Error => {
                    println!("error: {}", last.content);
                    printed = 0;
                }
                _ => {}
            }
        }
    });

    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/quit" {
            break;
        }

        controller.set_input(line);
        controller.submit().await;
    }

    renderer.abort();
    Ok(())
}
