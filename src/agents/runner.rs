use anyhow::{Context, Result};
use tokio::time::{Duration, sleep};
use tracing::{debug, info};

use crate::llm::{LlmProvider, Message, ToolCall};
use crate::tools::ToolRegistry;

/// Pause between round-trips so consecutive calls don't hammer the API
const ROUND_TRIP_DELAY: Duration = Duration::from_millis(100);

/// Drive one prompt through the provider until it stops requesting tools.
///
/// Tool failures and unknown tools are reported back to the model as text
/// rather than aborting the loop. Provider failures abort immediately.
pub async fn tool_loop(
    system_prompt: &str,
    prompt: &str,
    provider: &dyn LlmProvider,
    tools: &ToolRegistry,
    max_iterations: usize,
) -> Result<String> {
    let mut messages = vec![Message::user(prompt)];
    let tool_refs = tools.all();

    for iteration in 0..max_iterations {
        debug!(provider = provider.name(), iteration, "tool loop iteration");

        if iteration > 0 {
            sleep(ROUND_TRIP_DELAY).await;
        }

        // Call the LLM
        let response = provider
            .chat(system_prompt, &messages, &tool_refs)
            .await
            .with_context(|| format!("{} chat failed", provider.name()))?;

        debug!(content = %response.message.content, "llm response");

        // No tool calls means the model has answered
        let tool_calls = response.tool_calls;
        if tool_calls.is_empty() {
            info!(iterations = iteration + 1, "generation completed");
            return Ok(response.message.content);
        }

        // Execute tool calls
        let mut results = Vec::with_capacity(tool_calls.len());
        for call in &tool_calls {
            info!(tool = %call.name, "executing tool");
            let result = execute_tool_call(tools, call).await;
            debug!(tool = %call.name, result = %result, "tool result");
            results.push((call.id.clone(), result));
        }

        // Feed the calls and their results back for the next round
        messages.push(Message::assistant_with_tools(
            response.message.content,
            tool_calls,
        ));
        messages.extend(
            results
                .into_iter()
                .map(|(id, result)| Message::tool_result(id, result)),
        );
    }

    anyhow::bail!("generation exceeded maximum tool iterations ({})", max_iterations);
}

async fn execute_tool_call(tools: &ToolRegistry, call: &ToolCall) -> String {
    match tools.get(&call.name) {
        Some(tool) => match tool.execute(call.arguments.clone()).await {
            Ok(output) => output,
            Err(e) => format!("Error: {}", e),
        },
        None => format!("Error: unknown tool '{}'", call.name),
    }
}
