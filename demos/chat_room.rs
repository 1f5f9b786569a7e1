use moneytalk_chat::types::{DEFAULT_API_BASE, DEFAULT_ENDPOINT};
use moneytalk_chat::{
    ApiClient, ChatCallbacks, ChatClient, ChatClientOptions, ConnectionStatus, MessageType,
    OutgoingChatMessage,
};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Joins one chat room: prints the history, then relays stdin lines into
/// the room until Ctrl-C.
///
/// Reads MONEYTALK_EMAIL, MONEYTALK_PASSWORD and MONEYTALK_ROOM_ID from the
/// environment (or `.env`). MONEYTALK_API_BASE and MONEYTALK_ENDPOINT
/// override the local backend addresses. Set
/// MONEYTALK_PUBLISH_DESTINATION=/pub/chat/pub when the backend maps its
/// message handler to `/chat/pub`; otherwise sends go unrouted.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "moneytalk_chat=info".into()),
        )
        .init();

    let email = std::env::var("MONEYTALK_EMAIL")?;
    let password = std::env::var("MONEYTALK_PASSWORD")?;
    let room_id: u64 = std::env::var("MONEYTALK_ROOM_ID")?.parse()?;
    let api_base =
        std::env::var("MONEYTALK_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
    let endpoint =
        std::env::var("MONEYTALK_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());

    let api = ApiClient::new(&api_base)?;
    api.login(&email, &password).await?;
    let me = api.me().await?;
    println!("Signed in as {} (#{})", me.nickname, me.user_id);

    for message in api.chat_messages(room_id).await? {
        let text = match message.kind {
            MessageType::Image => message.image_url.unwrap_or_default(),
            _ => message.message.unwrap_or_default(),
        };
        println!(
            "[{}] {}: {}",
            message.sent_at,
            message.sender_nickname.unwrap_or_default(),
            text
        );
    }
    api.mark_as_read(room_id).await?;

    let mut options = ChatClientOptions::from_env();
    if options.cookie.is_none() {
        options.cookie = api.session_cookie();
    }
    let client = ChatClient::new(endpoint, options)?;

    let connection = client.open(
        room_id,
        ChatCallbacks::new(|message| {
            println!(
                "[{}] {}: {}",
                message.sent_at.as_deref().unwrap_or("now"),
                message.sender_nickname,
                message.message
            )
        })
        .on_status_change(|status| println!("* {}", status))
        .on_reconnected(|| println!("* back online"))
        .on_forced_disconnect(|| println!("* session lost, log in again if this persists")),
    )?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                if connection.status() != ConnectionStatus::Connected {
                    println!("* not connected, message dropped");
                    continue;
                }
                connection.send(OutgoingChatMessage::text(room_id, me.user_id, &me.nickname, line));
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    connection.teardown().await;
    println!("Disconnected");
    Ok(())
}
