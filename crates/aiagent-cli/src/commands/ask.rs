//! Single-answer mode.

use aiagent_agent::{Agent, AgentExecutor, ModelSettings};

use crate::AppContext;

pub async fn run(ctx: &AppContext, prompt: &str) -> anyhow::Result<()> {
    let provider = ctx.provider()?;

    let agent = Agent::builder("Assistant")
        .instructions("Replay in one sentence")
        .model(provider.get_model())
        .model_settings(ModelSettings::with_temperature(0.5))
        .build()?;

    let result = AgentExecutor::new(agent, ctx.settings.agent_max_iterations)
        .run(prompt)
        .await?;

    println!("{}", result.final_output);
    Ok(())
}
