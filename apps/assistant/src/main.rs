use std::sync::Arc;

use dotenv::dotenv;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chat_cell::models::{ChatInput, ChatReply};
use chat_cell::services::intent::IntentClassifier;
use chat_cell::services::session::ChatSession;
use identity_cell::services::auth::AuthService;
use shared_backend::ClinicApiClient;
use shared_config::AppConfig;
use shared_models::auth::{InvalidationReason, SessionStore};

#[tokio::main]
async fn main() {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Sunrise Clinic booking assistant");

    // Load configuration
    let config = AppConfig::from_env();

    let sessions = SessionStore::new();
    let hook_store = sessions.clone();
    let client = Arc::new(ClinicApiClient::new(&config).with_on_unauthorized(Arc::new(
        move || hook_store.invalidate(InvalidationReason::Expired),
    )));

    let auth = AuthService::new(Arc::clone(&client), sessions.clone());
    let classifier = IntentClassifier::from_config(&config);
    let mut chat = ChatSession::new(client, sessions.clone(), classifier);

    let mut stdout = io::stdout();
    let mut lines = BufReader::new(io::stdin()).lines();

    print_reply(&mut stdout, &chat.greet()).await;
    print_help(&mut stdout).await;

    loop {
        stdout.write_all(b"> ").await.ok();
        stdout.flush().await.ok();

        let Ok(Some(line)) = lines.next_line().await else {
            break;
        };
        let line = line.trim().to_string();

        match line.as_str() {
            "/quit" | "/exit" => break,
            "/reset" => {
                chat.reset();
                print_reply(&mut stdout, &chat.greet()).await;
                continue;
            }
            "/help" => {
                print_help(&mut stdout).await;
                continue;
            }
            _ => {}
        }

        if let Some(rest) = line.strip_prefix("/login ") {
            let mut parts = rest.split_whitespace();
            match (parts.next(), parts.next()) {
                (Some(email), Some(password)) => match auth.login(email, password).await {
                    Ok(session) => {
                        println(&mut stdout, &format!("Logged in as {}", session.user.email)).await;
                    }
                    Err(e) => println(&mut stdout, &e.user_message()).await,
                },
                _ => println(&mut stdout, "Usage: /login <email> <password>").await,
            }
            continue;
        }

        let input = parse_input(&line);
        let reply = chat.handle(input).await;
        print_reply(&mut stdout, &reply).await;
    }

    info!("Assistant session ended");
}

/// Numbered answers select from the last reply's options; `n`/`p` page
/// through them; anything else is a chat message.
fn parse_input(line: &str) -> ChatInput {
    match line {
        "n" | "next" => ChatInput::NextPage,
        "p" | "prev" => ChatInput::PrevPage,
        "b" | "back" => ChatInput::BackToDates,
        _ => match line.parse::<usize>() {
            Ok(number) if number >= 1 => ChatInput::Select(number - 1),
            _ => ChatInput::Text(line.to_string()),
        },
    }
}

async fn print_reply(stdout: &mut io::Stdout, reply: &ChatReply) {
    for message in &reply.messages {
        println(stdout, &format!("\n{}\n", message)).await;
    }
    for (index, option) in reply.options.iter().enumerate() {
        println(stdout, &format!("  {}. {}", index + 1, option)).await;
    }
    if reply.has_prev_page || reply.has_next_page {
        let mut hints = Vec::new();
        if reply.has_prev_page {
            hints.push("p = previous page");
        }
        if reply.has_next_page {
            hints.push("n = next page");
        }
        println(stdout, &format!("  ({})", hints.join(", "))).await;
    }
}

async fn print_help(stdout: &mut io::Stdout) {
    println(
        stdout,
        "Commands: /login <email> <password>, /reset, /help, /quit. Answer option lists by number.",
    )
    .await;
}

async fn println(stdout: &mut io::Stdout, text: &str) {
    stdout.write_all(text.as_bytes()).await.ok();
    stdout.write_all(b"\n").await.ok();
}
