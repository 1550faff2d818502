use colored::*;

use crate::bus::{Event, EventPayload};
use crate::chat_room::{ContactView, RoomSnapshot};
use crate::chat_types::{Message, RelationshipState};
use crate::directory::{status_badge, Highlight};

/// One-line summary of an outbound event, as handed to the transport
pub fn outbound_line(event: &Event) -> String {
    let detail = match &event.payload {
        EventPayload::StatusRequest(s) => {
            format!("{} -> {} {}", s.from_user_name, s.contact_name, s.status)
        }
        EventPayload::Identity(identity) => identity.clone(),
        EventPayload::Selection(s) => match s.contact_status {
            Some(status) => format!("{} ({})", s.contact_name, status),
            None => s.contact_name.clone(),
        },
        other => serde_json::to_string(other).unwrap_or_default(),
    };
    format!(
        "{} {} {}",
        "→".bright_cyan(),
        event.name.as_str().cyan(),
        detail
    )
}

fn badge(state: RelationshipState) -> ColoredString {
    let label = format!(" {} ", state);
    match state {
        RelationshipState::Pending => label.black().on_yellow(),
        RelationshipState::Rejected => label.white().on_red(),
        RelationshipState::Accepted => label.normal(),
    }
}

pub fn contact_line(view: &ContactView) -> String {
    let contact = &view.contact;
    let marker = if contact.is_group { "#" } else { "@" };
    let name = format!("{}{}", marker, contact.identity);
    let name = match view.highlight {
        Highlight::Selected => name.bold().reversed(),
        Highlight::Pending => name.bright_magenta(),
        Highlight::Rejected => name.red(),
        Highlight::Plain => name.normal(),
    };
    match status_badge(contact.relationship) {
        Some(state) => format!("  {} {}", name, badge(state)),
        None => format!("  {}", name),
    }
}

pub fn message_line(message: &Message, outgoing: bool) -> String {
    let time = message.timestamp.format("%H:%M").to_string();
    let who = message.sender.as_deref().unwrap_or("?");
    if outgoing {
        format!("  {} {} {}", time.dimmed(), "me".green().bold(), message.text)
    } else {
        format!("  {} {} {}", time.dimmed(), who.blue().bold(), message.text)
    }
}

/// Print the whole room to stdout
pub fn print_room(snapshot: &RoomSnapshot) {
    let me = snapshot
        .current_user
        .as_ref()
        .map(|u| u.nickname.as_str());

    println!("{}", "💬 Chat room".bright_cyan().bold());
    if let Some(me) = me {
        println!("   signed in as {}", me.green());
    }
    println!();

    let title = if snapshot.search_term.is_empty() {
        "Contacts:".to_string()
    } else {
        format!("Contacts matching \"{}\":", snapshot.search_term)
    };
    println!("{}", title.bright_white().bold());
    let visible: Vec<_> = snapshot.contacts.iter().filter(|c| c.visible).collect();
    if visible.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for view in visible {
        println!("{}", contact_line(view));
    }
    println!();

    if let Some(prompt) = &snapshot.pending_request {
        println!("{} {}", "✉".yellow(), prompt);
        println!();
    }

    println!("{}", "Messages:".bright_white().bold());
    if snapshot.messages.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for message in &snapshot.messages {
        let outgoing = me.is_some() && message.sender.as_deref() == me;
        println!("{}", message_line(message, outgoing));
    }

    if !snapshot.unacknowledged.is_empty() {
        println!();
        let names: Vec<_> = snapshot.unacknowledged.iter().map(|n| n.as_str()).collect();
        println!(
            "{} unacknowledged: {}",
            "⚠".yellow(),
            names.join(", ").yellow()
        );
    }
}
