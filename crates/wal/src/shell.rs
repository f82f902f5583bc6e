//! Interactive session: one controller stays alive, so deletes can be undone
//! within the undo window and extractions run in the background.

use std::{io::Write, sync::Arc};

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use wal_core::{
    phone::country_code_digits,
    session::{route_input, ChatSession, SubmitRoute},
};

use crate::render::{history_lines, resolve_target};

const HELP: &str = "\
commands:
  <text>            open a number, or extract one from messy text
  open <text>       open a chat with a typed or pasted number
  country [code]    set the country code for `open` (empty = automatic)
  extract <text>    let the AI find a number in messy text
  reuse <n|id>      open a number from the history again
  ls                show recent numbers
  rm <n|id>         delete a history entry
  undo              bring back the last deleted entry
  dismiss           drop the undo offer, keep the entry deleted
  clear             forget all recent numbers
  help              this text
  quit              leave";

#[derive(Debug, PartialEq, Eq)]
enum ShellCommand<'a> {
    Open(&'a str),
    Country(&'a str),
    Extract(&'a str),
    Reuse(&'a str),
    List,
    Remove(&'a str),
    Undo,
    Dismiss,
    Clear,
    Help,
    Quit,
    Submit(&'a str),
}

fn parse_command(line: &str) -> Option<ShellCommand<'_>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let (cmd, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();
    Some(match cmd.to_lowercase().as_str() {
        "open" | "o" => ShellCommand::Open(rest),
        "country" | "cc" => ShellCommand::Country(rest),
        "extract" | "x" => ShellCommand::Extract(rest),
        "reuse" | "r" => ShellCommand::Reuse(rest),
        "ls" | "list" | "history" => ShellCommand::List,
        "rm" | "delete" => ShellCommand::Remove(rest),
        "undo" | "u" => ShellCommand::Undo,
        "dismiss" | "ok" => ShellCommand::Dismiss,
        "clear" => ShellCommand::Clear,
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" | "q" => ShellCommand::Quit,
        _ => ShellCommand::Submit(line),
    })
}

pub async fn run(session: Arc<ChatSession>, print_only: bool) -> Result<()> {
    let mut country = session.config().default_country_code.clone();
    let undo_secs = session.config().undo_window.as_secs_f64();

    println!("WhatsaLink shell. Type `help` for commands.");
    if !session.config().extraction_available() {
        println!("(AI extraction is not configured: set GEMINI_API_KEY)");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt(&country);
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let Some(cmd) = parse_command(&line) else {
            continue;
        };

        match cmd {
            ShellCommand::Submit(text) if route_input(text) == SubmitRoute::Extraction => {
                spawn_extraction(&session, text, print_only);
            }
            ShellCommand::Submit(text) => {
                let cc = Some(country.as_str()).filter(|c| !c.is_empty());
                match session.submit(text, cc).await {
                    Ok(opened) if !print_only => println!("Opened {}", opened.url),
                    Ok(_) => {}
                    Err(e) => println!("{}", e.user_message()),
                }
            }
            ShellCommand::Open(text) => {
                let cc = Some(country.as_str()).filter(|c| !c.is_empty());
                match session.submit_direct(text, cc).await {
                    Ok(opened) if !print_only => println!("Opened {}", opened.url),
                    Ok(_) => {}
                    Err(e) => println!("{}", e.user_message()),
                }
            }
            ShellCommand::Country(code) => {
                country = country_code_digits(code);
                if country.is_empty() {
                    println!("Country code: automatic");
                } else {
                    println!("Country code: +{country}");
                }
            }
            ShellCommand::Extract(text) => spawn_extraction(&session, text, print_only),
            ShellCommand::Reuse(target) => {
                let entries = session.entries().await;
                let Some(id) = resolve_target(&entries, target) else {
                    println!("No such entry: {target}");
                    continue;
                };
                let Some(entry) = entries.iter().find(|e| e.id == id) else {
                    continue;
                };
                match session.submit_from_history(entry.number.as_str()).await {
                    Ok(opened) if !print_only => println!("Opened {}", opened.url),
                    Ok(_) => {}
                    Err(e) => println!("{}", e.user_message()),
                }
            }
            ShellCommand::List => {
                for line in history_lines(&session.entries().await) {
                    println!("{line}");
                }
            }
            ShellCommand::Remove(target) => {
                let entries = session.entries().await;
                let removed = match resolve_target(&entries, target) {
                    Some(id) => session.delete(&id).await,
                    None => None,
                };
                match removed {
                    Some(entry) => println!(
                        "Deleted +{}. Type `undo` within {undo_secs:.0}s to restore.",
                        entry.number
                    ),
                    None => println!("No such entry: {target}"),
                }
            }
            ShellCommand::Undo => match session.undo().await {
                Some(entry) => println!("Restored +{}", entry.number),
                None => println!("Nothing to undo."),
            },
            ShellCommand::Dismiss => {
                session.dismiss_undo().await;
            }
            ShellCommand::Clear => {
                session.clear().await;
                println!("History cleared.");
            }
            ShellCommand::Help => println!("{HELP}"),
            ShellCommand::Quit => break,
        }
    }

    Ok(())
}

/// Extraction runs in the background so the prompt stays usable.
fn spawn_extraction(session: &Arc<ChatSession>, text: &str, print_only: bool) {
    let session = Arc::clone(session);
    let text = text.to_string();
    println!("Looking for a number...");
    tokio::spawn(async move {
        match session.submit_via_extraction(&text).await {
            Ok(opened) => {
                println!("\nNumber extracted successfully: +{}", opened.entry.number);
                if !print_only {
                    println!("Opened {}", opened.url);
                }
            }
            Err(e) => println!("\n{}", e.user_message()),
        }
    });
}

fn prompt(country: &str) {
    if country.is_empty() {
        print!("wal> ");
    } else {
        print!("wal +{country}> ");
    }
    let _ = std::io::stdout().flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_with_arguments() {
        assert_eq!(
            parse_command("open  050 123 4567 "),
            Some(ShellCommand::Open("050 123 4567"))
        );
        assert_eq!(parse_command("cc +44"), Some(ShellCommand::Country("+44")));
        assert_eq!(parse_command("country"), Some(ShellCommand::Country("")));
        assert_eq!(
            parse_command("x Dana\tmobile 050"),
            Some(ShellCommand::Extract("Dana\tmobile 050"))
        );
    }

    #[test]
    fn bare_input_is_submitted_whole() {
        assert_eq!(
            parse_command(" 050 123 4567 "),
            Some(ShellCommand::Submit("050 123 4567"))
        );
        assert_eq!(
            parse_command("Dana Levi | Sales | +44 7700 900123"),
            Some(ShellCommand::Submit("Dana Levi | Sales | +44 7700 900123"))
        );
    }

    #[test]
    fn parses_bare_commands() {
        assert_eq!(parse_command("LS"), Some(ShellCommand::List));
        assert_eq!(parse_command("undo"), Some(ShellCommand::Undo));
        assert_eq!(parse_command("q"), Some(ShellCommand::Quit));
        assert_eq!(parse_command("   "), None);
        assert_eq!(parse_command("ok"), Some(ShellCommand::Dismiss));
    }
}
