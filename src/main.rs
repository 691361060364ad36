use anyhow::Result;
use chatmind::cli::{Cli, Commands};
use chatmind::config::KeywordStrategy;
use chatmind::core::{CompletionService, LLMClient};
use chatmind::memory::extractor::extract_clean_keywords;
use chatmind::memory::history::group_by_period;
use chatmind::memory::{ConversationStore, KeywordExtractor, LocalKeywordExtractor, TopicStore};
use chatmind::render::{render_markdown, RenderServices, TerminalHighlighter};
use chatmind::storage::{open_backend, KeyValueStore};
use chatmind::utils::TurnInterrupts;
use chatmind::{build_extractor, utils, ChatController, Role, SendOutcome, Settings};
use clap::Parser;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let mut settings = Settings::new()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Chat { system, new } => {
            if system.is_some() {
                settings.llm.system_prompt = system;
            }
            handle_chat(&settings, new).await
        }
        Commands::Ask { prompt, system } => {
            if system.is_some() {
                settings.llm.system_prompt = system;
            }
            handle_ask(&settings, prompt).await
        }
        Commands::History => handle_history(&settings).await,
        Commands::Show { id } => handle_show(&settings, id).await,
        Commands::Topics => handle_topics(&settings).await,
        Commands::Related { query } => handle_related(&settings, query).await,
        Commands::Keywords { text, local } => handle_keywords(&settings, text, local).await,
        Commands::Clear { yes } => handle_clear(&settings, yes).await,
    }
}

fn completion_client(settings: &Settings) -> Result<Arc<dyn CompletionService>> {
    let api_key = Settings::api_key()?;
    Ok(Arc::new(LLMClient::new(api_key, settings.llm.clone())?))
}

/// Only the remote strategy needs an API key
fn extractor(settings: &Settings, force_local: bool) -> Result<Arc<dyn KeywordExtractor>> {
    if force_local || settings.keywords.strategy == KeywordStrategy::Local {
        return Ok(Arc::new(LocalKeywordExtractor::new(
            settings.keywords.max_local_keywords,
        )));
    }
    Ok(build_extractor(settings, completion_client(settings)?))
}

async fn storage(settings: &Settings) -> Result<Arc<dyn KeyValueStore>> {
    Ok(open_backend(&settings.storage).await?)
}

async fn controller(settings: &Settings) -> Result<ChatController> {
    chatmind::init(settings, Settings::api_key()?).await
}

/// Stream one turn to stdout. Ctrl+C stops the reply but keeps what arrived.
async fn stream_turn(
    controller: &mut ChatController,
    interrupts: &TurnInterrupts,
    input: &str,
) -> Result<()> {
    let cancel = interrupts.begin();

    utils::print_prompt("Assistant: ");
    let mut printed = 0;
    let outcome = controller
        .send_message_with_cancel(input, cancel, |messages| {
            let Some(last) = messages.last().filter(|m| m.role == Role::Assistant) else {
                return;
            };
            if last.content.len() > printed {
                print!("{}", &last.content[printed..]);
                std::io::stdout().flush().ok();
                printed = last.content.len();
            }
        })
        .await;
    interrupts.end();

    match outcome {
        SendOutcome::Completed(_) | SendOutcome::Ignored => println!("\n"),
        SendOutcome::Cancelled(_) => {
            println!();
            utils::print_info("[stopped]\n");
        }
        SendOutcome::Failed(text) => {
            println!();
            utils::print_error(&text);
            println!();
        }
    }
    Ok(())
}

async fn handle_chat(settings: &Settings, new: bool) -> Result<()> {
    let mut controller = controller(settings).await?;
    if new {
        controller.new_conversation().await?;
    }

    utils::print_header("Chatmind");
    utils::print_info("Type your messages (/help for commands, Ctrl+D to exit)");

    if controller.messages().is_empty() {
        utils::print_success("New conversation\n");
    } else {
        utils::print_success(&format!(
            "Resumed conversation with {} messages\n",
            controller.messages().len()
        ));
        for message in controller.messages() {
            utils::print_message(message);
        }
        println!();
    }

    let interrupts = TurnInterrupts::install();
    let mut reader = BufReader::new(io::stdin());

    loop {
        utils::print_prompt("You: ");
        std::io::stdout().flush().ok();

        let mut input = String::new();
        if reader.read_line(&mut input).await? == 0 {
            break;
        }

        match input.trim() {
            "" => continue,
            "/exit" | "/quit" => break,
            "/new" => {
                controller.new_conversation().await?;
                utils::print_success("Started a new conversation\n");
            }
            "/topics" => {
                for topic in controller.topics().topics() {
                    utils::print_topic(topic);
                }
                println!();
            }
            "/help" => {
                println!("Special commands:");
                println!("  /new     - Start a new conversation");
                println!("  /topics  - List stored topics");
                println!("  /exit    - Leave the session");
                println!("  Ctrl+C   - Stop the current reply, or exit when idle");
                println!("  Ctrl+D   - Exit\n");
            }
            text => stream_turn(&mut controller, &interrupts, text).await?,
        }
    }

    Ok(())
}

async fn handle_ask(settings: &Settings, prompt: String) -> Result<()> {
    let mut controller = controller(settings).await?;
    controller.new_conversation().await?;
    stream_turn(&mut controller, &TurnInterrupts::install(), &prompt).await
}

async fn handle_history(settings: &Settings) -> Result<()> {
    let store = ConversationStore::load(storage(settings).await?, &settings.conversations).await;
    if store.is_empty() {
        utils::print_info("No saved conversations");
        return Ok(());
    }

    let now = chrono::Local::now();
    for (period, conversations) in group_by_period(store.list(), &now) {
        utils::print_header(period.label());
        for conversation in conversations {
            utils::print_conversation_line(conversation);
        }
    }
    println!();
    Ok(())
}

async fn handle_show(settings: &Settings, id: String) -> Result<()> {
    let store = ConversationStore::load(storage(settings).await?, &settings.conversations).await;
    let Some(conversation) = store.get(&id) else {
        utils::print_error(&format!("Conversation '{}' not found", id));
        return Ok(());
    };

    utils::print_header(&conversation.summary);
    if !conversation.keywords.is_empty() {
        utils::print_info(&format!("Keywords: {}\n", conversation.keywords.join(", ")));
    }

    let highlighter = TerminalHighlighter;
    let services = RenderServices {
        diagrams: None,
        highlighter: Some(&highlighter),
    };

    for message in &conversation.messages {
        if message.role == Role::Assistant {
            println!("{}:", utils::role_label(message.role));
            utils::print_document(&render_markdown(&message.content, &services));
        } else {
            utils::print_message(message);
            println!();
        }
    }
    Ok(())
}

async fn handle_topics(settings: &Settings) -> Result<()> {
    let store = TopicStore::load(storage(settings).await?, &settings.topics).await;
    if store.is_empty() {
        utils::print_info("No topics yet");
        return Ok(());
    }

    utils::print_header(&format!("Topics ({})", store.len()));
    for topic in store.topics() {
        utils::print_topic(topic);
    }
    Ok(())
}

async fn handle_related(settings: &Settings, query: String) -> Result<()> {
    let extractor = extractor(settings, false)?;
    let store = TopicStore::load(storage(settings).await?, &settings.topics).await;

    let related = store.find_related_topics(extractor.as_ref(), &query).await;
    if related.is_empty() {
        utils::print_info("No related topics");
        return Ok(());
    }

    utils::print_header("Related topics");
    for topic in &related {
        utils::print_topic(topic);
    }
    Ok(())
}

async fn handle_keywords(settings: &Settings, text: String, local: bool) -> Result<()> {
    let extractor = extractor(settings, local)?;

    let keywords = extract_clean_keywords(extractor.as_ref(), &text).await;
    if keywords.is_empty() {
        utils::print_info("No keywords");
    } else {
        utils::print_success(&keywords.join(", "));
    }
    Ok(())
}

async fn handle_clear(settings: &Settings, yes: bool) -> Result<()> {
    if !yes {
        utils::print_prompt("Delete all conversations and topics? [y/N] ");
        std::io::stdout().flush().ok();

        let mut answer = String::new();
        BufReader::new(io::stdin()).read_line(&mut answer).await?;
        if !answer.trim().eq_ignore_ascii_case("y") {
            utils::print_info("Aborted");
            return Ok(());
        }
    }

    let storage = storage(settings).await?;
    let mut conversations = ConversationStore::new(storage.clone(), &settings.conversations);
    let mut topics = TopicStore::new(storage, &settings.topics);
    conversations.clear_all().await?;
    topics.clear().await?;

    utils::print_success("Cleared all conversations and topics");
    Ok(())
}
