use crate::memory::{Conversation, Message, Role, Topic};
use crate::render::{Block, DiagramOutput, Document};
use colored::*;

pub fn print_header(text: &str) {
    println!("\n{}", text.bright_cyan().bold());
    println!("{}", "=".repeat(text.chars().count()).bright_cyan());
}

pub fn print_success(text: &str) {
    println!("{}", text.green());
}

pub fn print_error(text: &str) {
    eprintln!("{}", text.red().bold());
}

pub fn print_info(text: &str) {
    println!("{}", text.blue());
}

pub fn print_prompt(text: &str) {
    print!("{}", text.yellow().bold());
}

pub fn role_label(role: Role) -> ColoredString {
    match role {
        Role::User => "You".yellow().bold(),
        Role::Assistant => "Assistant".cyan().bold(),
        Role::System => "System".red().bold(),
    }
}

pub fn print_message(message: &Message) {
    println!("{}: {}", role_label(message.role), message.content);
}

pub fn print_conversation_line(conversation: &Conversation) {
    println!(
        "  {}  {} {}",
        conversation.id.dimmed(),
        conversation.summary,
        format!("({} messages)", conversation.messages.len()).dimmed()
    );
}

pub fn print_topic(topic: &Topic) {
    println!(
        "  {} [{}]\n    {}",
        topic.key.bright_cyan(),
        topic.keywords.join(", "),
        topic.summary.dimmed()
    );
}

/// Print a rendered reply; code blocks are boxed by rules, diagram failures
/// show the error and the source in place.
pub fn print_document(document: &Document) {
    for block in &document.blocks {
        match block {
            Block::Text { markdown, .. } => println!("{}\n", markdown),
            Block::Code {
                language,
                source,
                highlighted,
            } => {
                let rule = format!("--- {} ", language.as_deref().unwrap_or("code"));
                println!("{}", rule.dimmed());
                println!("{}", highlighted.as_deref().unwrap_or(source.as_str()));
                println!("{}\n", "---".dimmed());
            }
            Block::Diagram { output, .. } => match output {
                DiagramOutput::Rendered(markup) => println!("{}\n", markup),
                DiagramOutput::Failed { error, source } => {
                    println!("{}", format!("Diagram error: {}", error).red());
                    println!("{}\n", source.dimmed());
                }
            },
        }
    }
}
