use super::commands::{Cli, Commands, SessionCommands};
use super::repl;
use anyhow::{Context, Result, bail};
use graphmind::Config;
use graphmind::app::{AppContext, BlogReport, transcript_of};
use graphmind::session::WorkflowKind;
use graphmind::ui::style as ui;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

async fn run_blog(ctx: &AppContext, topic: &str, output: Option<&Path>) -> Result<()> {
    let blog = ctx.blog_service()?;
    println!("{}", ui::dim(format!("Writing about \"{topic}\"...")));
    let report = blog.generate(topic).await?;
    let markdown = report.to_markdown();

    match output {
        Some(path) => {
            tokio::fs::write(path, &markdown)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), session_id = %report.session_id, "blog written");
            println!("{} {}", ui::success("Saved"), path.display());
        }
        None => println!("{markdown}"),
    }
    println!(
        "{} {:.1}/10 ({}) after {} draft(s), session {}",
        ui::header("Score:"),
        report.score,
        report.quality,
        report.revisions,
        ui::dim(&report.session_id)
    );
    Ok(())
}

async fn run_sessions(ctx: &AppContext, command: SessionCommands) -> Result<()> {
    let sessions = ctx.sessions();
    match command {
        SessionCommands::List => {
            let ids = sessions.list().await?;
            if ids.is_empty() {
                println!("{}", ui::dim("No sessions stored."));
                return Ok(());
            }
            for id in ids {
                let Some(record) = sessions.load(&id).await? else {
                    continue;
                };
                let marker = if record.is_awaiting() {
                    ui::warn(" (awaiting confirmation)")
                } else {
                    String::new()
                };
                println!(
                    "{} {:<8} {}{marker}",
                    ui::accent(&record.id),
                    record.kind,
                    ui::dim(record.updated_at.format("%Y-%m-%d %H:%M:%S"))
                );
            }
            Ok(())
        }
        SessionCommands::Show { id } => {
            let Some(record) = sessions.load(&id).await? else {
                bail!("session not found: {id}");
            };
            match record.kind {
                WorkflowKind::Blog => println!("{}", BlogReport::from_record(record)?.to_markdown()),
                WorkflowKind::Chatbot | WorkflowKind::Stocks => {
                    let transcript = transcript_of(record)?;
                    for message in &transcript.messages {
                        println!("{}", repl::render_message(message));
                    }
                    if let Some(pending) = transcript.pending.filter(|p| p.awaiting) {
                        println!("{} {}", ui::speaker("?"), ui::warn(pending.prompt));
                    }
                }
            }
            Ok(())
        }
        SessionCommands::Delete { id } => {
            if sessions.delete(&id).await? {
                println!("{} {id}", ui::success("Deleted"));
                Ok(())
            } else {
                bail!("session not found: {id}")
            }
        }
    }
}

pub async fn dispatch(cli: Cli, config: Arc<Config>) -> Result<()> {
    let ctx = AppContext::from_config(config).await?;

    match cli.command {
        Commands::Chat { profile, session } => repl::run_chat(&ctx, profile, session).await,
        Commands::Blog { topic, output } => run_blog(&ctx, &topic, output.as_deref()).await,
        Commands::Sessions { command } => run_sessions(&ctx, command).await,
    }
}
