//! mcp-chat — line-oriented chat client for MCP tool servers
//!
//! Usage:
//!   mcp-chat [--local] [--no-plan] [--url <mcp-url>]
//!
//! Inside the session:
//!   /tool <name> <jsonArgs>    Call a tool directly
//!   /tools                     Refresh and list the tool catalog
//!   /reset                     Clear the conversation
//!   /quit                      Exit
//!   anything else              Planned into a tool call

use anyhow::Context;
use mcp_chat_rust::tools::BuiltinToolServer;
use mcp_chat_rust::{ChatConfig, Conversation, MessageId, MessageRole, Orchestrator};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

struct Options {
    local: bool,
    no_plan: bool,
    url: Option<String>,
}

fn parse_args(args: &[String]) -> anyhow::Result<Option<Options>> {
    let mut opts = Options {
        local: false,
        no_plan: false,
        url: None,
    };
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--local" => opts.local = true,
            "--no-plan" => opts.no_plan = true,
            "--url" => {
                let url = iter.next().context("--url needs a value")?;
                opts.url = Some(url.clone());
            }
            "help" | "--help" | "-h" => {
                print_usage();
                return Ok(None);
            }
            "version" | "--version" | "-V" => {
                println!("mcp-chat {}", env!("CARGO_PKG_VERSION"));
                return Ok(None);
            }
            other => anyhow::bail!("Unknown argument: {other}"),
        }
    }
    Ok(Some(opts))
}

fn print_usage() {
    println!(
        r#"mcp-chat — chat with an MCP tool server

USAGE:
    mcp-chat [OPTIONS]

OPTIONS:
    --local             Use the built-in tools instead of a server
    --no-plan           Only run explicit /tool directives
    --url <mcp-url>     Tool endpoint (overrides MCP_HTTP_URL)

ENVIRONMENT:
    MCP_HTTP_URL, MCP_API_BASE, MCP_INVOKE_TIMEOUT_MS, MCP_AUTO_PLAN,
    MCP_REMOTE_LLM, LLM_BASE_URL, LLM_MODEL, LLM_API_KEY, LLM_TIMEOUT_MS,
    RUST_LOG"#
    );
}

/// Print messages that became terminal since the last call.
fn flush(conversation: &Conversation, printed: &mut HashSet<MessageId>) {
    for msg in conversation.messages() {
        if msg.loading || msg.role == MessageRole::User || !printed.insert(msg.id) {
            continue;
        }
        for step in &msg.steps {
            println!("  · {step}");
        }
        match msg.error {
            Some(ref err) => println!("[{} !] {}", msg.role, err),
            None => println!("[{}] {}", msg.role, msg.text),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(opts) = parse_args(&args)? else {
        return Ok(());
    };

    let mut config = ChatConfig::from_env().context("loading configuration")?;
    if let Some(url) = opts.url {
        config = config.with_mcp_url(url);
        config.validate()?;
    }
    if opts.no_plan {
        config = config.with_auto_plan(false);
    }

    let orchestrator = if opts.local {
        Orchestrator::from_config_with_transport(&config, Arc::new(BuiltinToolServer::new()))?
    } else {
        Orchestrator::from_config(&config)?
    };

    let mut printed = HashSet::new();
    // A failed connect is already recorded in the conversation.
    let _ = orchestrator.start().await;
    flush(orchestrator.conversation(), &mut printed);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/reset" => {
                orchestrator.conversation().reset();
                printed.clear();
                println!("(conversation cleared)");
                continue;
            }
            "/tools" => {
                let _ = orchestrator.refresh_tools().await;
                flush(orchestrator.conversation(), &mut printed);
                let hint = orchestrator.tool_hint();
                if !hint.is_empty() {
                    println!("{hint}");
                }
                continue;
            }
            text => {
                orchestrator.handle_turn(text).await;
            }
        }
        flush(orchestrator.conversation(), &mut printed);
    }

    Ok(())
}
