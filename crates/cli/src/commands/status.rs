//! `contextkeeper status`: Show configuration and session counts.

use contextkeeper_agent::SessionManager;
use contextkeeper_config::AppConfig;

use super::CommandResult;

pub async fn run() -> CommandResult {
    let config = super::load_config()?;
    let sessions = SessionManager::load(super::snapshot_backend(&config), config.context.max_turns).await;

    println!("contextkeeper Status");
    println!("====================");
    println!("  Config dir:     {}", AppConfig::config_dir().display());
    println!(
        "  Persistence:    {}",
        if config.sessions.persist { "enabled" } else { "disabled" }
    );
    println!("  Sessions dir:   {}", config.sessions_dir().display());
    println!("  Backend:        {}", sessions.backend_name());
    println!("  Max turns:      {}", config.context.max_turns);
    println!(
        "  Keywords:       top_k={}, per message={}",
        config.keywords.top_k, config.keywords.message_top_k
    );
    println!("  Sessions:       {}", sessions.session_count().await);

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  ✅ Config file found");
    } else {
        println!("\n  ⚠️  No config file, run `contextkeeper init` first");
    }
    if !config.sessions.persist {
        println!("  ⚠️  Sessions do not survive between commands while persistence is disabled");
    }

    Ok(())
}
