use std::sync::Arc;

use {
    anyhow::{Result, bail},
    duplex_config::Configuration,
    duplex_telegram::{
        BotApi, ChannelMessage, Direction, HttpBotApi, Relay, SendOutcome, Synchronizer,
        history::load_history,
    },
    time::{OffsetDateTime, macros::format_description},
    tokio::sync::mpsc,
    tokio_util::sync::CancellationToken,
    tracing::{info, warn},
};

use crate::Context;

pub fn history(ctx: &Context) -> Result<()> {
    let messages = load_history(ctx.store.as_ref());
    if messages.is_empty() {
        println!("No messages yet.");
    }
    for message in &messages {
        println!("{}", render(message));
    }
    Ok(())
}

pub async fn watch(ctx: &Context) -> Result<()> {
    let config = complete_config(ctx)?;
    let api: Arc<dyn BotApi> = Arc::new(HttpBotApi::from_settings(&ctx.settings)?);

    let (tx, mut rx) = mpsc::unbounded_channel::<ChannelMessage>();
    let mut sync = Synchronizer::for_config(api, Arc::clone(&ctx.store), &config)?
        .with_poll_timeout(ctx.settings.poll_timeout_secs)
        .with_failure_backoff(ctx.settings.failure_backoff())
        .with_listener(tx);
    sync.load_history();

    for message in sync.history() {
        println!("{}", render(message));
    }

    let printer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            println!("{}", render(&message));
        }
    });

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("interrupt received, stopping"),
            Err(e) => warn!(error = %e, "failed to listen for ctrl-c"),
        }
        on_interrupt.cancel();
    });

    sync.run(cancel).await?;

    // Closes the listener so the printer drains and exits.
    drop(sync);
    let _ = printer.await;
    Ok(())
}

pub async fn send(ctx: &Context, message: &str) -> Result<()> {
    let config = complete_config(ctx)?;
    let api: Arc<dyn BotApi> = Arc::new(HttpBotApi::from_settings(&ctx.settings)?);

    match Relay::new(api).send(&config, message).await {
        Ok(SendOutcome::Skipped) => {
            eprintln!("Nothing to send.");
            Ok(())
        },
        Ok(SendOutcome::Sent { .. }) => Ok(()),
        Err(e @ duplex_telegram::Error::SendFailed { .. }) => {
            eprintln!("{e}");
            std::process::exit(1);
        },
        Err(e) => Err(e.into()),
    }
}

fn complete_config(ctx: &Context) -> Result<Configuration> {
    let manager = ctx.config_manager();
    if !manager.is_complete() {
        bail!("configuration is incomplete; run `duplex config show`");
    }
    Ok(manager.config().clone())
}

fn render(message: &ChannelMessage) -> String {
    let when = OffsetDateTime::from_unix_timestamp(message.timestamp)
        .ok()
        .and_then(|t| {
            t.format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
                .ok()
        })
        .unwrap_or_default();
    let arrow = match message.direction {
        Direction::Outgoing => ">>",
        Direction::Incoming => "<<",
    };
    format!("{when} {arrow} {}: {}", message.sender_label, message.body)
}
