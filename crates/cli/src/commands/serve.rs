//! `contextkeeper serve`: Answer JSON-lines tool requests on stdin.
//!
//! One runtime serves every request, so the keyword corpus keeps growing for
//! as long as the process runs. One-shot commands start from an empty corpus
//! each time.

use tokio::io::{BufReader, stdin, stdout};
use tracing::info;

use super::{CommandResult, build_tools, label_classifier, load_config};

pub async fn run(labels: &[String]) -> CommandResult {
    let config = load_config()?;
    let tools = build_tools(&config, label_classifier(labels)).await;

    info!("Reading tool requests from stdin");
    tools.serve(BufReader::new(stdin()), stdout()).await?;
    Ok(())
}
