//!
//! authhub console
//! ---------------
//! Loads a hub configuration and runs an interactive operator console against it.
//! Usage: authhub [config.json]   (or set AUTHHUB_CONFIG)

use std::env;
use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::info;

use authhub::backends::BackendRegistry;
use authhub::config::Config;
use authhub::console::{self, Outcome};
use authhub::hub::Hub;

fn main() -> Result<()> {
    let config_path = env::args().nth(1).or_else(|| env::var("AUTHHUB_CONFIG").ok());
    let config = match &config_path {
        Some(p) => Config::load(p).with_context(|| format!("loading config '{}'", p))?,
        None => Config::default(),
    };
    let hub = Hub::from_config(&config, &BackendRegistry::default()).context("starting hub")?;
    info!(
        target: "authhub",
        "console starting: config='{}', authenticator='{}', max_active_sessions={}",
        config_path.as_deref().unwrap_or("<defaults>"),
        config.authenticator.kind,
        config.session_db.max_active_sessions
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut input = String::new();
    println!("authhub console. Type 'help' for commands.");
    loop {
        input.clear();
        print!("> ");
        let _ = stdout.flush();
        match stdin.read_line(&mut input) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        match console::execute(&hub, input.trim()) {
            Ok(Outcome::Quit) => break,
            Ok(Outcome::Output(text)) => {
                if !text.is_empty() {
                    println!("{}", text);
                }
            }
            Err(msg) => eprintln!("error: {}", msg),
        }
    }
    hub.close();
    Ok(())
}
