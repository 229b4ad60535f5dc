use crate::circle::Circle;
use crate::config::Config;
use crate::error::CircleError;
use crate::events::CircleEvent;
use crate::storage::{KeyValueStore, SledStore};
use chrono::{Local, TimeZone};
use colored::*;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Command-line front end over a sled-backed Circle.
pub async fn run(args: Vec<String>) -> anyhow::Result<()> {
    let bin = args
        .first()
        .map(|s| s.as_str())
        .unwrap_or("circle")
        .to_string();

    let (config, command) = Config::from_args(&args)?;
    if command.is_empty() {
        print_usage(&bin);
        return Ok(());
    }

    let store: Arc<dyn KeyValueStore> = Arc::new(SledStore::new(&config.data_dir)?);
    let mut circle = Circle::open(store, config).await;
    let mut events = circle.subscribe();

    let outcome = dispatch(&bin, &mut circle, &command).await;

    circle.flush().await;
    report_unsaved(&mut events);

    match outcome {
        Err(e) if e.is_validation() => {
            eprintln!("{} {}", "!".yellow().bold(), e.to_string().yellow());
            Ok(())
        }
        other => other.map_err(Into::into),
    }
}

async fn dispatch(bin: &str, circle: &mut Circle, command: &[String]) -> Result<(), CircleError> {
    let rest = command[1..].join(" ");
    let needs_name = matches!(command[0].as_str(), "remove" | "thread" | "clear");
    if needs_name && rest.trim().is_empty() {
        eprintln!("{}", format!("Usage: {} {} <name>", bin, command[0]).yellow());
        return Ok(());
    }

    match command[0].as_str() {
        "contacts" => list_contacts(circle),
        "add" => {
            let name = circle.add_contact(&rest).await?;
            println!(
                "{} Added {} ({}/{})",
                "✓".green().bold(),
                name.cyan(),
                circle.list_contacts().len(),
                crate::contact_registry::MAX_CONTACTS
            );
        }
        "remove" => {
            if circle.remove_contact(&rest) {
                println!("{} Removed {}", "✓".green().bold(), rest.trim().cyan());
            } else {
                eprintln!("{} No contact named {}", "✗".red().bold(), rest.trim().red());
            }
        }
        "send" => {
            if command.len() < 3 {
                eprintln!("{}", format!("Usage: {} send <name> <message>", bin).yellow());
                return Ok(());
            }
            let (name, text) = split_recipient(circle.list_contacts(), &command[1..])
                .ok_or_else(|| CircleError::UnknownContact(rest.trim().to_string()))?;
            let message = circle.send_message(&name, &text).await?;
            println!(
                "{} {} {}",
                format_time(message.timestamp).dimmed(),
                "→".green(),
                message.text
            );
        }
        "thread" => {
            let name = rest.trim().to_string();
            let thread = circle.open_thread(&name).await;
            if thread.is_empty() {
                println!("{}", format!("No messages with {}", name).dimmed());
            }
            for message in thread {
                println!("{} {}", format_time(message.timestamp).dimmed(), message.text);
            }
        }
        "clear" => {
            circle.clear_thread(&rest);
            println!("{} Cleared chat with {}", "✓".green().bold(), rest.trim().cyan());
        }
        other => {
            eprintln!("{} Unknown command: {}", "✗".red().bold(), other.red());
            print_usage(bin);
        }
    }

    Ok(())
}

/// Split `<name words...> <message words...>` on the longest leading run of
/// words that names a contact, so multi-word names work without quoting.
fn split_recipient(contacts: &[String], words: &[String]) -> Option<(String, String)> {
    (1..words.len()).rev().find_map(|split| {
        let name = words[..split].join(" ");
        contacts
            .iter()
            .any(|c| *c == name)
            .then(|| (name, words[split..].join(" ")))
    })
}

fn list_contacts(circle: &Circle) {
    let contacts = circle.list_contacts();
    println!(
        "{} ({}/{})",
        "Your Circle".bold(),
        contacts.len(),
        crate::contact_registry::MAX_CONTACTS
    );
    if contacts.is_empty() {
        println!("  {}", "(empty)".dimmed());
    }
    for name in contacts {
        match circle.get_preview(name) {
            Some(preview) => println!("  {}  {}", name.cyan(), preview.dimmed()),
            None => println!("  {}", name.cyan()),
        }
    }
}

/// Durability gaps don't fail the command; just point them out.
fn report_unsaved(events: &mut broadcast::Receiver<CircleEvent>) {
    while let Ok(event) = events.try_recv() {
        if let CircleEvent::WriteFailed { key, error } = event {
            eprintln!("{} not saved ({}): {}", "⚠".yellow(), key, error.dimmed());
        }
    }
}

fn format_time(millis: i64) -> String {
    Local
        .timestamp_millis_opt(millis)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "----------------".to_string())
}

fn print_usage(bin: &str) {
    println!("{}", "Circle".bold());
    println!();
    println!("Usage: {} [--data-dir <path>] [--keep-threads] <command> [args]", bin);
    println!();
    println!("Commands:");
    println!("  contacts                    List contacts with their last message");
    println!("  add <name>                  Add a contact (max 10)");
    println!("  remove <name>               Remove a contact");
    println!("  send <name> <message>       Send a message to a contact");
    println!("  thread <name>               Show the chat with a contact");
    println!("  clear <name>                Clear the chat with a contact");
}
