//! Conversation facade mode: prints every event as it arrives.

use std::io::{self, Write};

use futures::StreamExt;

use aiagent_agent::{AgentEvent, AgentFactory, StreamItem};

use crate::AppContext;

pub async fn run(
    ctx: &AppContext,
    prompt: &str,
    user_id: u64,
    conversation_id: u64,
) -> anyhow::Result<()> {
    let factory = AgentFactory::with_provider(ctx.provider()?, ctx.settings.agent_max_iterations);
    let executor = factory.create_agent_executor(user_id, conversation_id)?;

    let mut items =
        factory.stream_agent_response(&executor, prompt, Vec::new(), user_id, conversation_id, 1);

    let mut stdout = io::stdout();
    while let Some(item) = items.next().await {
        match &item {
            StreamItem::Chunk(AgentEvent::TextDelta(text)) => {
                print!("{}", text);
                stdout.flush()?;
            }
            StreamItem::Chunk(AgentEvent::MessageOutput(_)) => println!(),
            _ => println!("{}", item),
        }
    }

    Ok(())
}
