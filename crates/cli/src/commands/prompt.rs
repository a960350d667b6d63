//! `contextkeeper prompt`: Synthesize the prompt for the main model.

use contextkeeper_core::session::SessionId;

use super::{CommandResult, tools};

pub async fn run(session: &str, message: &str, debug: bool) -> CommandResult {
    let tools = tools().await?;
    let id = SessionId::from(session);

    if debug {
        let info = tools.pipeline().prompt_debug_info(&id, message).await?;
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!("{}", tools.pipeline().synthesize_prompt(&id, message).await?);
    }
    Ok(())
}
