//! Remuco terminal remote, entry point.
//!
//! ```text
//! remuco-client                         Connect with defaults
//! remuco-client --host 10.0.0.5         Override the server host
//! remuco-client --config <path>         Use custom config TOML
//! remuco-client --gen-config            Dump default config and exit
//! remuco-client --json                  One JSON object per event
//! ```

use std::path::PathBuf;

use clap::Parser;
use remuco_core::{
    Connection, ConnectionEvent, DisconnectReason, Payload, RemucoError, Request,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use remuco_client::command::{self, HELP, UserCommand};
use remuco_client::config::ClientConfig;
use remuco_client::view::{self, PlayerView};

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "remuco-client", about = "Remote control for a Remuco media player server")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "remuco-client.toml")]
    config: PathBuf,

    /// Server host (overrides config).
    #[arg(short = 'H', long)]
    host: Option<String>,

    /// Server port (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,

    /// Print events as JSON lines instead of text.
    #[arg(long)]
    json: bool,
}

type Reply = (Request, Result<Payload, RemucoError>);

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        println!("{}", ClientConfig::default_toml()?);
        return Ok(());
    }

    let mut config = ClientConfig::load(&cli.config);
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    // Init tracing. Logs go to stderr so stdout stays parseable.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("remuco-client v{}", env!("CARGO_PKG_VERSION"));

    // ── 1. Connect ──────────────────────────────────────────────

    let endpoint = config.endpoint();
    info!("connecting to {endpoint}");
    let (conn, mut events) = Connection::connect(endpoint, config.to_connection_config());

    // ── 2. Read commands from stdin ─────────────────────────────

    let (line_tx, mut line_rx) = mpsc::unbounded_channel::<String>();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if line_tx.send(line).is_err() {
                break;
            }
        }
    });

    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<Reply>();
    let mut view = PlayerView::new();

    // ── 3. Event loop ───────────────────────────────────────────

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                if cli.json {
                    println!("{}", view::event_json(&event));
                }
                match event {
                    ConnectionEvent::Connected(player) => {
                        if !cli.json {
                            println!("connected to {} (type `help` for commands)", player.name);
                        }
                        view.connected(player);
                    }
                    ConnectionEvent::Message { id, payload } => {
                        if view.apply(id, payload) && !cli.json {
                            println!("{}", view.status_line());
                        }
                    }
                    ConnectionEvent::Disconnected(reason) => {
                        return finish(reason, cli.json);
                    }
                }
            }

            Some(line) = line_rx.recv() => {
                if line.trim().is_empty() {
                    continue;
                }
                match command::parse(&line) {
                    Ok(cmd) => execute(cmd, &conn, &view, &reply_tx, cli.json).await,
                    Err(e) => eprintln!("{e}"),
                }
            }

            Some((request, result)) = reply_rx.recv() => {
                print_reply(&request, result, cli.json);
            }
        }
    }

    Ok(())
}

async fn execute(
    cmd: UserCommand,
    conn: &Connection,
    view: &PlayerView,
    replies: &mpsc::UnboundedSender<Reply>,
    json: bool,
) {
    match cmd {
        UserCommand::Control(control) => {
            if let Some(player) = &view.player {
                if !player.supports(&control) {
                    eprintln!("{} does not support {}", player.name, control.id());
                    return;
                }
            }
            if let Err(e) = conn.control(control).await {
                warn!("control failed: {e}");
            }
        }
        UserCommand::Activate(activation) => {
            if let Err(e) = conn.activate(activation).await {
                warn!("activation failed: {e}");
            }
        }
        UserCommand::Request(request) => {
            // Await in a task so pushes keep flowing while the server answers.
            let conn = conn.clone();
            let replies = replies.clone();
            tokio::spawn(async move {
                let result = conn.request(request.clone()).await;
                let _ = replies.send((request, result));
            });
        }
        UserCommand::Status => {
            if json {
                match serde_json::to_string(view) {
                    Ok(text) => println!("{text}"),
                    Err(e) => warn!("cannot serialize status: {e}"),
                }
            } else {
                println!("{}", view.render());
            }
        }
        UserCommand::Help => println!("{HELP}"),
        UserCommand::Quit => conn.disconnect(),
    }
}

fn print_reply(request: &Request, result: Result<Payload, RemucoError>, json: bool) {
    let what = request_label(request);
    if json {
        let value = view::reply_json(&what, result.as_ref().map_err(ToString::to_string));
        println!("{value}");
        return;
    }
    match result {
        Ok(Payload::ItemList(list)) => println!("{}", view::render_list(&what, &list)),
        Ok(Payload::Item(item)) => println!("{}", view::render_item(&item)),
        Ok(other) => warn!("unexpected {} reply to {what}", other.kind()),
        Err(e) => eprintln!("{what}: {e}"),
    }
}

fn request_label(request: &Request) -> String {
    match request {
        Request::Item(id) => format!("item {id}"),
        Request::Playlist => "playlist".into(),
        Request::Queue => "queue".into(),
        Request::MediaLib(_) => "mlib".into(),
        Request::Files(_) => "files".into(),
    }
}

fn finish(reason: DisconnectReason, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    match reason {
        DisconnectReason::Error(e) => Err(e.into()),
        reason => {
            if !json {
                println!("disconnected: {reason}");
            }
            Ok(())
        }
    }
}
