//! `contextkeeper init`: First-time setup.

use contextkeeper_config::AppConfig;

use super::CommandResult;

pub async fn run() -> CommandResult {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("contextkeeper: First-Time Setup");
    println!("================================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run init.\n");
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("✅ Created config.toml at: {}", config_path.display());
    }

    // Honour an existing config's sessions directory.
    let config = super::load_config()?;
    let sessions_dir = config.sessions_dir();
    if config.sessions.persist && !sessions_dir.exists() {
        std::fs::create_dir_all(&sessions_dir)?;
        println!("✅ Created sessions directory: {}", sessions_dir.display());
    }

    println!("\n📝 Next steps:");
    println!("   1. contextkeeper session start");
    println!("   2. contextkeeper process \"<message>\" --session <id> --label PROBLEM_DEFINITION");
    println!("   3. contextkeeper prompt \"<message>\" --session <id>\n");

    Ok(())
}
