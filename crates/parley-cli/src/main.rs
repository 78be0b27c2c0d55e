mod commands;
mod render;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use parley_sync::{
    Collaborator, Config, HttpCollaborator, IdentityHolder, SqliteStore, Synchronizer,
};
use parley_types::events::SyncEvent;

use crate::commands::Command;
use crate::render::Transcript;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Logs go to stderr so they don't interleave with the chat on stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parley=info,parley_sync=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env()?;

    let store = SqliteStore::open(&config.state_path)?;
    let identity = IdentityHolder::new(store).resolve()?;
    info!("Local identity {}", identity);

    let collaborator = HttpCollaborator::new(&config.client)?;
    let sync = Synchronizer::new(collaborator, identity, config.sync.clone());
    let mut events = sync.subscribe();
    sync.start();

    println!("{}", commands::HELP);

    let mut transcript = Transcript::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            event = events.recv() => match event {
                Ok(event) => show_event(&sync, &mut transcript, event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Display fell behind, skipped {} events", skipped)
                }
                Err(RecvError::Closed) => break,
            },
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match commands::parse(&line) {
                    Ok(Command::Quit) => break,
                    Ok(command) => {
                        if let Err(e) = run(&sync, command).await {
                            println!("! {}", e);
                        }
                    }
                    Err(e) => println!("! {}", e),
                }
            }
        }
    }

    sync.shutdown();
    Ok(())
}

async fn run<C: Collaborator>(sync: &Synchronizer<C>, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Users => {
            let others = sync.others();
            if others.is_empty() {
                println!("nobody else is online");
            }
            for user in &others {
                println!("{}", render::user_line(user));
            }
        }
        Command::Open(id) => {
            let partner = sync
                .others()
                .into_iter()
                .find(|u| u.id == id)
                .ok_or_else(|| anyhow::anyhow!("user {} is not online", id))?;
            sync.select_user(&partner).await?;
        }
        Command::Close => sync.deselect(),
        Command::Photo(path) => sync.send_media(path.as_deref()).await?,
        Command::Profile { name, avatar_url } => {
            let user = sync.update_profile(&name, avatar_url).await?;
            println!("profile updated: {}", user.display_name());
        }
        Command::Help => println!("{}", commands::HELP),
        Command::Say(text) => {
            sync.set_draft(text);
            sync.submit_draft().await?;
        }
        Command::Quit => {}
    }
    Ok(())
}

fn show_event<C: Collaborator>(
    sync: &Synchronizer<C>,
    transcript: &mut Transcript,
    event: SyncEvent,
) {
    match event {
        SyncEvent::ProfileResolved { profile } => {
            println!("* you are {} (id {})", profile.name, profile.id);
        }
        SyncEvent::ConversationOpened {
            conversation,
            partner_id,
        } => {
            transcript.reset(Some(conversation.id));
            println!("* conversation with user {} opened", partner_id);
        }
        SyncEvent::ConversationClosed { .. } => {
            transcript.reset(None);
            println!("* conversation closed");
        }
        SyncEvent::MessagesUpdated { .. } => {
            let me = sync.profile().map(|p| p.id);
            let partner = sync
                .selected_partner()
                .map(|u| u.display_name())
                .unwrap_or_default();
            let messages = sync.messages();
            for message in transcript.unseen(&messages) {
                println!("{}", render::message_line(message, me, &partner));
            }
        }
        SyncEvent::SendFailed { reason } => println!("! not sent: {}", reason),
        SyncEvent::RosterUpdated { .. } | SyncEvent::MessageSent { .. } => {}
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Cannot install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
