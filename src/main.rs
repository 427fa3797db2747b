use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use webpilot::{ChromeTransport, Engine, EngineConfig};

#[derive(Parser)]
#[command(name = "webpilot", about = "Instruction-driven browser automation")]
struct Args {
    /// Run with a visible browser window
    #[arg(long)]
    headed: bool,

    /// Instructions to execute instead of the built-in demo pair
    instructions: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut config = EngineConfig::default();
    config.browser.headless = !args.headed;

    let mut engine = Engine::new(ChromeTransport::new(), config);

    let instructions = if args.instructions.is_empty() {
        vec![
            "Log into SauceDemo with username standard_user and password secret_sauce, \
             search for backpack, add the first result to cart, go to cart and checkout"
                .to_string(),
            "Log into GitHub with username your_username and password your_password, \
             search for xAI repository, star the first result"
                .to_string(),
        ]
    } else {
        args.instructions
    };

    for instruction in &instructions {
        // A failed instruction is logged and abandoned; the session stays
        // usable for the next one.
        if let Err(err) = engine.run(instruction, true).await {
            error!(error = %err, "instruction failed");
        }
    }

    engine.shutdown().await;
    info!("done");
    Ok(())
}
