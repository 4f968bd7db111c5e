use super_agent_router::{config::AppConfig, executor::build_default_executor};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Quiet by default so log lines do not interleave with the transcript
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    dotenv::dotenv().ok();

    let config = AppConfig::from_env()?;
    let executor = build_default_executor(&config)?;
    let conversation_id = Uuid::new_v4();

    println!("Welcome to the Super Agent! Type 'exit' to quit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("You: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            println!("Goodbye!");
            break;
        };

        if line.trim().eq_ignore_ascii_case("exit") {
            println!("Goodbye!");
            break;
        }

        match executor.run_turn(conversation_id, &line).await {
            Ok(outcome) => {
                for reply in outcome.replies {
                    println!("Assistant: {}", reply.content);
                }
            }
            Err(e) => {
                println!("Sorry, that turn failed ({}). Please try again.", e);
            }
        }
    }

    Ok(())
}
