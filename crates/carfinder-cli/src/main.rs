//! carfinder - terminal client for the Car Finder shopping assistant

mod commands;
mod config;
mod ui;
mod utils;

use clap::Parser;
use std::collections::HashSet;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use carfinder_api::{ChatClient, ConversationId, FeedQuery};
use carfinder_chat::{
    AlertPoller, ChatEvent, ChatSession, HttpTransport, ProgressFlags, RetryConfig,
    SessionHandle, Transport,
};
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;

use commands::{CommandResult, Menu};

/// carfinder - chat with the Car Finder assistant and follow your alerts
#[derive(Parser, Debug)]
#[command(name = "carfinder")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server URL (overrides CARFINDER_SERVER_URL and the config file)
    #[arg(long)]
    server: Option<String>,

    /// Send a single message, print the reply and exit
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Print the alerts feed and exit
    #[arg(long)]
    alerts: bool,

    /// Poll the alerts feed and print new matches until Ctrl-C
    #[arg(long)]
    watch_alerts: bool,

    /// Only include alerts that have not been viewed
    #[arg(long)]
    unseen: bool,

    /// Number of alerts to fetch (1-200)
    #[arg(long, default_value_t = 50)]
    limit: u32,

    /// User whose alerts are shown (overrides the config file)
    #[arg(long)]
    user: Option<String>,

    /// Mark an alert as viewed and exit
    #[arg(long, value_name = "ALERT_ID")]
    mark_viewed: Option<String>,

    /// Continue an existing conversation by id
    #[arg(long, value_name = "CONVERSATION_ID")]
    resume: Option<String>,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Setup tracing
    if args.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("carfinder=debug")
            .with_writer(io::stderr)
            .init();
    }

    // Initialize config and exit
    if args.init_config {
        match config::Config::init() {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let cfg = config::Config::load();

    // CLI takes precedence over environment and config
    let server_url = args.server.clone().unwrap_or_else(|| cfg.server_url.clone());
    let client = ChatClient::new(server_url.as_str())?;

    let query = FeedQuery {
        user_id: args.user.clone().or_else(|| cfg.user_id.clone()),
        limit: args.limit,
        offset: 0,
        only_unseen: args.unseen,
    }
    .normalized();

    if let Some(ref alert_id) = args.mark_viewed {
        let marked = client.mark_alert_viewed(alert_id).await?;
        println!("Alert {}: {}", alert_id, marked.status);
        return Ok(());
    }

    if args.alerts {
        return show_alerts(&client, &query, true).await;
    }

    if args.watch_alerts {
        return watch_alerts(client, query, cfg.alerts_interval()).await;
    }

    let transport: Arc<dyn Transport> = Arc::new(
        HttpTransport::new(client.clone()).with_retry_config(RetryConfig {
            max_retries: cfg.max_retries,
            ..Default::default()
        }),
    );

    let mut session = ChatSession::new(Arc::clone(&transport));
    if let Some(ref id) = args.resume {
        let id = ConversationId::new(id.as_str())
            .ok_or_else(|| anyhow::anyhow!("Conversation id must not be empty"))?;
        print_history(&client, &id).await;
        session = session.with_conversation_id(id);
    }

    let (handle_tx, handle_rx) = watch::channel(session.handle());
    spawn_ctrl_c_handler(handle_rx);

    // Non-interactive mode
    if let Some(command) = args.command {
        return run_command(&mut session, &command).await;
    }

    if io::IsTerminal::is_terminal(&io::stderr()) {
        eprintln!("carfinder ({})", client.base_url());
        eprintln!("Type /starters for ideas or /help for commands.");
        eprintln!();
    }

    run_interactive(session, transport, handle_tx, &client, &query).await
}

/// Ctrl-C stops a streaming reply; when idle it exits
fn spawn_ctrl_c_handler(handles: watch::Receiver<SessionHandle>) {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            let handle = handles.borrow().clone();
            if handle.is_streaming() {
                handle.abort();
            } else {
                eprintln!();
                std::process::exit(130);
            }
        }
    });
}

async fn run_command(session: &mut ChatSession, command: &str) -> anyhow::Result<()> {
    println!("carfinder> {}", command);
    println!();

    send_turn(session, command).await?;

    if let Some(id) = session.conversation_id() {
        eprintln!("[conversation {} | resume with --resume {}]", id, id);
    }
    Ok(())
}

async fn run_interactive(
    mut session: ChatSession,
    transport: Arc<dyn Transport>,
    handles: watch::Sender<SessionHandle>,
    client: &ChatClient,
    query: &FeedQuery,
) -> anyhow::Result<()> {
    let mut menu: Option<Menu> = None;

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            // EOF
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        // A number right after a menu picks from it
        if let Some(message) = menu.take().and_then(|m| m.choose(input)) {
            println!("> {}", message);
            if let Err(e) = send_turn(&mut session, message).await {
                eprintln!("Error: {}", e);
            }
            continue;
        }

        if let Some(result) = commands::execute_command(input) {
            match result {
                CommandResult::OpenMenu(m) => {
                    println!("{}", m.render());
                    menu = Some(m);
                }
                CommandResult::ShowProgress => {
                    println!("{}", ui::render_progress(&session.progress()));
                }
                CommandResult::ShowAlerts => {
                    if let Err(e) = show_alerts(client, query, false).await {
                        eprintln!("Error: {}", e);
                    }
                }
                CommandResult::ShowHistory => match session.conversation_id() {
                    Some(id) => print_history(client, id).await,
                    None => println!("No conversation yet."),
                },
                CommandResult::Clear => {
                    session = ChatSession::new(Arc::clone(&transport));
                    let _ = handles.send(session.handle());
                    println!("Started a new conversation.");
                }
                CommandResult::Message(msg) => {
                    println!("{}", msg);
                }
                CommandResult::Exit => {
                    break;
                }
                CommandResult::Unknown(cmd) => {
                    println!("Unknown command: /{}", cmd);
                    println!("Type /help for available commands.");
                }
            }
            continue;
        }

        if let Err(e) = send_turn(&mut session, input).await {
            eprintln!("Error: {}", e);
        }
    }

    Ok(())
}

/// Send one message and print the reply as it streams
async fn send_turn(session: &mut ChatSession, text: &str) -> anyhow::Result<()> {
    let printer = tokio::spawn(print_turn(session.subscribe()));

    match session.send(text).await {
        Ok(outcome) => {
            let _ = printer.await;
            tracing::debug!("Turn finished: {:?}", outcome);
            Ok(())
        }
        Err(e) => {
            printer.abort();
            Err(e.into())
        }
    }
}

/// Print session events for a single turn, returning at its terminal event
async fn print_turn(mut events: broadcast::Receiver<ChatEvent>) {
    let mut printed = 0usize;
    let mut progress: Option<ProgressFlags> = None;

    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!("Display fell behind by {} events", n);
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        match event {
            ChatEvent::TurnStart { .. } => {}
            ChatEvent::ConversationAssigned { conversation_id } => {
                tracing::debug!("Conversation {}", conversation_id);
            }
            ChatEvent::MessageUpdate { message } => {
                print!("{}", utils::unseen_suffix(&message.content, printed));
                printed = message.content.len();
                let _ = io::stdout().flush();
            }
            ChatEvent::ProgressChanged { flags } => {
                progress = Some(flags);
            }
            ChatEvent::MessageEnd { message } => {
                println!("{}", utils::unseen_suffix(&message.content, printed));
                break;
            }
            ChatEvent::TurnFailed { message, error } => {
                if printed > 0 {
                    println!();
                }
                println!("{}", message.content);
                tracing::debug!("Turn failed: {}", error);
                break;
            }
            ChatEvent::TurnCancelled { .. } => {
                println!("\n[stopped]");
                break;
            }
        }
    }

    if let Some(flags) = progress {
        eprintln!("{}", ui::progress_line(&flags));
    }
    println!();
}

async fn show_alerts(client: &ChatClient, query: &FeedQuery, with_stats: bool) -> anyhow::Result<()> {
    let alerts = client.alerts_feed(query).await?;
    println!("{}", ui::render_alerts(&alerts));

    if with_stats {
        match client.alert_stats(query.user_id.as_deref()).await {
            Ok(stats) => println!("\n{}", ui::render_stats(&stats)),
            Err(e) => tracing::warn!("Could not load alert stats: {}", e),
        }
    }
    Ok(())
}

async fn watch_alerts(client: ChatClient, query: FeedQuery, interval: Duration) -> anyhow::Result<()> {
    let poller = AlertPoller::new(Arc::new(client), interval).with_query(query);
    let cancel = CancellationToken::new();
    let (mut snapshots, task) = poller.spawn(cancel.clone());
    let mut shown: HashSet<String> = HashSet::new();

    eprintln!(
        "Watching alerts every {}s (Ctrl-C to stop)",
        interval.as_secs()
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                if let Some(ref error) = snapshot.last_error {
                    eprintln!("[poll failed: {}; showing last known alerts]", error);
                }
                for alert in snapshot.alerts.iter().filter(|a| shown.insert(a.id.clone())) {
                    println!("{}\n", ui::render_alert(alert));
                }
            }
        }
    }

    cancel.cancel();
    task.await?;
    Ok(())
}

async fn print_history(client: &ChatClient, id: &ConversationId) {
    match client.chat_history(id).await {
        Ok(entries) if entries.is_empty() => println!("No stored messages for {}", id),
        Ok(entries) => {
            for entry in &entries {
                println!("{}", ui::render_history_entry(entry));
            }
            println!();
        }
        Err(e) => eprintln!("Could not load history for {}: {}", id, e),
    }
}
