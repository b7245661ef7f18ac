//! Interactive chat loop. Free-text input is replaced by a yes/no select
//! while the session waits on a confirmation.

use anyhow::{Context, Result};
use dialoguer::{Input, Select};
use graphmind::app::{AppContext, ChatReply, ChatService, DisplayMessage, DisplayRole};
use graphmind::error::{GraphmindError, SessionError};
use graphmind::ui::style as ui;
use graphmind::workflows::AgentProfile;
use std::collections::BTreeMap;

const CLEAR: &str = "/clear";
const POSITIONS: &str = "/positions";
const EXIT_COMMANDS: &[&str] = &["/exit", "/quit"];

enum Line {
    Message(String),
    Clear,
    Positions,
    Exit,
    Empty,
}

fn classify(input: &str) -> Line {
    let input = input.trim();
    if input.is_empty() {
        Line::Empty
    } else if input.eq_ignore_ascii_case(CLEAR) {
        Line::Clear
    } else if input.eq_ignore_ascii_case(POSITIONS) {
        Line::Positions
    } else if EXIT_COMMANDS.iter().any(|c| input.eq_ignore_ascii_case(c)) {
        Line::Exit
    } else {
        Line::Message(input.to_string())
    }
}

pub(crate) fn render_message(message: &DisplayMessage) -> String {
    let label = match message.role {
        DisplayRole::User => "You",
        DisplayRole::Agent => "Agent",
    };
    format!("{} {}", ui::speaker(label), message.content)
}

fn print_reply(reply: &ChatReply, include_user: bool) {
    for message in &reply.messages {
        if include_user || message.role == DisplayRole::Agent {
            println!("{}", render_message(message));
        }
    }
    if let Some(pending) = reply.pending.as_ref().filter(|p| p.awaiting) {
        println!("{} {}", ui::speaker("?"), ui::warn(&pending.prompt));
    }
}

/// Net shares booked by this process; the paper ledger is not persisted.
pub(crate) fn render_positions(positions: &BTreeMap<String, i64>) -> Vec<String> {
    if positions.is_empty() {
        return vec![ui::dim("No trades booked in this run.")];
    }
    positions
        .iter()
        .map(|(ticker, shares)| format!("{} {ticker}: {shares} shares", ui::accent("•")))
        .collect()
}

fn report_failure(error: &GraphmindError) {
    eprintln!("{} {error}", ui::error("error:"));
    if error.is_retryable() {
        eprintln!("{}", ui::dim("The model could not be reached. Send the message again to retry."));
    }
}

fn ask_confirmation(prompt: &str) -> Result<bool> {
    let choice = Select::new()
        .with_prompt(prompt)
        .items(&["Yes", "No"])
        .default(0)
        .interact()
        .context("Failed to read confirmation from terminal")?;
    Ok(choice == 0)
}

async fn open_session(chat: &ChatService, requested: Option<String>) -> Result<(String, ChatReply)> {
    if let Some(id) = requested {
        match chat.transcript(&id).await {
            Ok(reply) => {
                print_reply(&reply, true);
                return Ok((id, reply));
            }
            Err(GraphmindError::Session(SessionError::NotFound(_))) => {
                println!("{}", ui::dim(format!("No session {id} yet; starting it fresh.")));
                let reply = ChatReply {
                    session_id: id.clone(),
                    messages: Vec::new(),
                    pending: None,
                };
                return Ok((id, reply));
            }
            Err(e) => return Err(e.into()),
        }
    }
    let id = chat.start_session().await?;
    let reply = ChatReply {
        session_id: id.clone(),
        messages: Vec::new(),
        pending: None,
    };
    Ok((id, reply))
}

pub async fn run_chat(ctx: &AppContext, profile: AgentProfile, session: Option<String>) -> Result<()> {
    let chat = ctx.chat_service(profile)?;
    let (mut session_id, mut last) = open_session(&chat, session).await?;

    println!(
        "{} {}",
        ui::header(format!("graphmind {profile}")),
        ui::dim(format!("session {session_id}"))
    );
    println!("{}", ui::dim("Type /clear for a new session, /exit to leave."));
    if profile == AgentProfile::StockTrader {
        println!("{}", ui::dim("Type /positions to list shares booked in this run."));
    }

    loop {
        if let Some(pending) = last.pending.clone().filter(|p| p.awaiting) {
            let approve = ask_confirmation(&pending.prompt)?;
            match chat.confirm(&session_id, approve).await {
                Ok(reply) => {
                    print_reply(&reply, false);
                    last = reply;
                }
                Err(e) => {
                    report_failure(&e);
                    // the answer may already be stored; only ask again if the
                    // session still waits on it
                    last.pending = chat.transcript(&session_id).await?.pending;
                }
            }
            continue;
        }

        let input: String = Input::new()
            .with_prompt(ui::speaker("You"))
            .allow_empty(true)
            .interact_text()
            .context("Failed to read input from terminal")?;

        match classify(&input) {
            Line::Empty => {}
            Line::Exit => break,
            Line::Clear => {
                session_id = chat.start_session().await?;
                last = ChatReply {
                    session_id: session_id.clone(),
                    messages: Vec::new(),
                    pending: None,
                };
                println!("{}", ui::dim(format!("Started session {session_id}")));
            }
            Line::Positions if profile == AgentProfile::StockTrader => {
                for line in render_positions(&ctx.ledger().positions()) {
                    println!("{line}");
                }
            }
            Line::Positions => println!("{}", ui::dim("Only the stocks agent books trades.")),
            Line::Message(text) => match chat.submit(&session_id, &text).await {
                Ok(reply) => {
                    print_reply(&reply, false);
                    last = reply;
                }
                Err(e) => report_failure(&e),
            },
        }
    }

    println!("{}", ui::dim(format!("Session {session_id} saved.")));
    Ok(())
}
