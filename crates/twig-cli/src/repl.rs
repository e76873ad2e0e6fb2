use std::error::Error;
use std::future::Future;
use std::io::{self, Write};

use tokio::io::{AsyncBufReadExt, BufReader};
use twig_core::{ChatSession, Direction, SessionError, TurnOutcome};
use twig_tree::{Attachment, NodeId};

use crate::command::{self, Command, HELP};
use crate::{attach, render};

/// Read commands from stdin until `/quit`, end of input, or Ctrl-C at the
/// prompt.
pub async fn run(session: &ChatSession) -> Result<(), Box<dyn Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut staged: Vec<Attachment> = Vec::new();

    print_conversation(session);
    println!("Type /help for commands.");

    loop {
        prompt(&staged)?;
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            println!();
            break;
        };

        let command = match command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                eprintln!("{err}");
                continue;
            }
        };

        match command {
            Command::Send(text) => {
                let attachments = std::mem::take(&mut staged);
                let result = drive(session, session.submit(text, attachments.clone())).await;
                if matches!(result, Err(SessionError::EmptyMessage | SessionError::Busy)) {
                    staged = attachments;
                }
                report(session, result);
            }
            Command::Edit { index, text } => match message_id(session, index) {
                Some(id) => {
                    let result = drive(session, session.edit_and_resubmit(id, text)).await;
                    report(session, result);
                }
                None => no_such_message(index),
            },
            Command::Regen { index } => {
                let result = drive(session, session.regenerate(index)).await;
                report(session, result);
            }
            Command::Prev { index } => navigate(session, index, Direction::Previous),
            Command::Next { index } => navigate(session, index, Direction::Next),
            Command::Attach(path) => match attach::load(&path) {
                Ok(attachment) => {
                    println!("staged {} for the next message", attachment.name);
                    staged.push(attachment);
                }
                Err(err) => eprintln!("cannot attach {}: {err}", path.display()),
            },
            Command::Detach => {
                let dropped = staged.len();
                staged.clear();
                println!("dropped {dropped} staged attachment(s)");
            }
            Command::Clear => {
                session.clear_chat();
                staged.clear();
                print_conversation(session);
            }
            Command::Help => println!("{HELP}"),
            Command::Quit => break,
        }
    }

    Ok(())
}

/// Await a request-issuing intent. Ctrl-C while it runs stops the request
/// instead of exiting.
async fn drive<F>(session: &ChatSession, turn: F) -> Result<TurnOutcome, SessionError>
where
    F: Future<Output = Result<TurnOutcome, SessionError>>,
{
    tokio::pin!(turn);
    tokio::select! {
        biased;
        result = &mut turn => return result,
        _ = std::future::ready(()) => eprintln!("waiting for reply... (Ctrl-C to stop)"),
    }
    loop {
        tokio::select! {
            result = &mut turn => return result,
            _ = tokio::signal::ctrl_c() => session.stop(),
        }
    }
}

fn report(session: &ChatSession, result: Result<TurnOutcome, SessionError>) {
    match result {
        Ok(TurnOutcome::Completed { .. }) => print_conversation(session),
        Ok(TurnOutcome::Failed { error, .. }) => {
            tracing::warn!(%error, "completion failed");
            print_conversation(session);
        }
        Ok(TurnOutcome::Cancelled { .. }) => {
            println!("(stopped)");
            print_conversation(session);
        }
        Err(err) => eprintln!("{err}"),
    }
}

fn navigate(session: &ChatSession, index: usize, direction: Direction) {
    let Some(id) = message_id(session, index) else {
        no_such_message(index);
        return;
    };
    match session.navigate_message(id, direction) {
        Ok(Some(_)) => print_conversation(session),
        Ok(None) => {
            let edge = match direction {
                Direction::Previous => "first",
                Direction::Next => "last",
            };
            println!("message {} is already the {edge} branch", index + 1);
        }
        Err(err) => eprintln!("{err}"),
    }
}

fn message_id(session: &ChatSession, index: usize) -> Option<NodeId> {
    session.messages().get(index).map(|m| m.id())
}

fn no_such_message(index: usize) {
    eprintln!("no message {}", index + 1);
}

fn print_conversation(session: &ChatSession) {
    println!();
    print!("{}", render::conversation(&session.messages()));
}

fn prompt(staged: &[Attachment]) -> io::Result<()> {
    let mut stdout = io::stdout();
    if staged.is_empty() {
        write!(stdout, "> ")?;
    } else {
        write!(stdout, "({} attached) > ", staged.len())?;
    }
    stdout.flush()
}
