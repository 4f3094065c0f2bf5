//! Streamed joker agent.

use std::io::{self, Write};
use std::sync::Arc;

use futures::StreamExt;

use aiagent_agent::{Agent, AgentEvent, AgentExecutor, EventSource};
use aiagent_tools::HowManyJokesTool;

use crate::AppContext;

pub async fn run(ctx: &AppContext, prompt: &str) -> anyhow::Result<()> {
    let provider = ctx.provider()?;

    let agent = Agent::builder("Joker")
        .instructions("You are a helpful assistant.")
        .model(provider.get_model())
        .tool(Arc::new(HowManyJokesTool))
        .build()?;
    let executor = AgentExecutor::new(agent, ctx.settings.agent_max_iterations);

    let mut events = executor.astream(prompt, Vec::new());
    let mut stdout = io::stdout();
    while let Some(event) = events.next().await {
        match event? {
            AgentEvent::TextDelta(text) => {
                print!("{}", text);
                stdout.flush()?;
            }
            AgentEvent::RunComplete(_) => println!(),
            other => tracing::debug!("{}", other),
        }
    }

    Ok(())
}
