//! Queue Tester CLI Tool
//!
//! Command-line tool that drives an in-process matchmaker and reports what
//! it publishes.
//!
//! Usage:
//!   cargo run --bin queue-tester -- --help
//!   cargo run --bin queue-tester queue --id "player1" --key duo --size 2 --monitor 5
//!   cargo run --bin queue-tester room --guest alice bob --key trio --size 3
//!   cargo run --bin queue-tester run-scenario --scenario "bot-fill"
//!   cargo run --bin queue-tester run-all-scenarios

use std::time::Duration;

use anteroom::config::MatchmakerConfig;
use anteroom::types::QueueLabel;
use anyhow::Result;
use clap::{Parser, Subcommand};

#[path = "../../tests/queue_tester.rs"]
mod queue_tester;

use queue_tester::{QueueTestConfig, QueueTester, TestScenarios};

#[derive(Parser)]
#[command(name = "queue-tester")]
#[command(about = "Queue testing tool for the anteroom matchmaking engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Maximum wait before under-full groups are bot-filled or timed out
    #[arg(long, default_value = "500")]
    max_wait_ms: u64,

    /// Interval between sweeps
    #[arg(long, default_value = "50")]
    sweep_interval_ms: u64,

    /// Time out under-full groups instead of bot-filling them
    #[arg(long)]
    no_bot_fill: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Queue participants and watch the outcome
    Queue {
        /// Participant IDs
        #[arg(short, long, required = true, num_args = 1..)]
        id: Vec<String>,
        /// Grouping key
        #[arg(short, long, default_value = "casual")]
        key: String,
        /// Participants per match
        #[arg(short, long, default_value = "2")]
        size: usize,
        /// Seconds to monitor afterwards
        #[arg(short, long, default_value = "3")]
        monitor: u64,
    },
    /// Open a room, seat guests and start it
    Room {
        /// Host ID
        #[arg(long, default_value = "host")]
        host: String,
        /// Guest IDs
        #[arg(short, long, num_args = 0..)]
        guest: Vec<String>,
        /// Grouping key for the room label
        #[arg(short, long)]
        key: Option<String>,
        /// Participants the label requires
        #[arg(short, long, default_value = "2")]
        size: usize,
        /// Start even when the member count does not match
        #[arg(short, long)]
        force: bool,
    },
    /// Run a predefined test scenario
    RunScenario {
        /// Scenario name (full-pair, bot-fill, multiple-keys, lone-timeout)
        #[arg(short, long)]
        scenario: String,
    },
    /// Run all test scenarios
    RunAllScenarios,
}

fn scenario_by_name(name: &str) -> Option<QueueTestConfig> {
    match name.to_lowercase().as_str() {
        "full-pair" => Some(TestScenarios::full_pair()),
        "bot-fill" => Some(TestScenarios::bot_fill()),
        "multiple-keys" => Some(TestScenarios::multiple_keys()),
        "lone-timeout" => Some(TestScenarios::lone_timeout()),
        _ => None,
    }
}

fn engine_config(cli: &Cli, bot_fill: bool) -> MatchmakerConfig {
    MatchmakerConfig::immediate()
        .with_wait_times(Duration::ZERO, Duration::from_millis(cli.max_wait_ms))
        .with_sweep_interval(Duration::from_millis(cli.sweep_interval_ms.max(1)))
        .with_bot_fill(bot_fill)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Queue {
            id,
            key,
            size,
            monitor,
        } => {
            let tester =
                QueueTester::new_with_config(engine_config(&cli, !cli.no_bot_fill)).await?;

            for participant in id {
                match tester.queue(participant, key, *size) {
                    Ok(()) => println!("✅ Queued '{}' under '{}'", participant, key),
                    Err(e) => eprintln!("❌ Failed to queue '{}': {}", participant, e),
                }
            }

            println!("🔍 Monitoring for {} seconds...", monitor);
            tester.monitor_queues(Duration::from_secs(*monitor)).await?;

            let timed_out = tester.timed_out();
            if !timed_out.is_empty() {
                println!("⏰ Timed out: {:?}", timed_out);
            }
            print_stats(&tester);
            tester.shutdown().await;
        }

        Commands::Room {
            host,
            guest,
            key,
            size,
            force,
        } => {
            let tester = QueueTester::new_with_config(engine_config(&cli, true)).await?;
            let label = key.as_ref().map(|key| QueueLabel::new(key.as_str(), *size));

            let outcome = tester.run_room_scenario(host, guest, label, *force);
            tester.shutdown().await;

            match outcome {
                Ok(found) => {
                    println!("🎮 Room started as match {}", found.match_id);
                    println!(
                        "    Participants: {:?}",
                        found.participants.iter().map(|p| &p.id).collect::<Vec<_>>()
                    );
                    println!("    Open slots: {}", found.open_slots);
                }
                Err(e) => {
                    eprintln!("❌ Room could not start: {}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::RunScenario { scenario } => {
            let Some(config) = scenario_by_name(scenario) else {
                eprintln!(
                    "❌ Unknown scenario '{}'. Available: full-pair, bot-fill, multiple-keys, lone-timeout",
                    scenario
                );
                std::process::exit(1);
            };

            let bot_fill = config.expected_timeouts == 0 && !cli.no_bot_fill;
            let tester = QueueTester::new_with_config(engine_config(&cli, bot_fill)).await?;

            println!("🧪 Running scenario: {}", config.scenario_name);
            let outcome = tester.run_test_scenario(config).await;
            tester.shutdown().await;

            match outcome {
                Ok(true) => println!("✅ Scenario completed successfully!"),
                Ok(false) => {
                    println!("❌ Scenario failed or timed out.");
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("❌ Error running scenario: {}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::RunAllScenarios => {
            let scenarios = ["full-pair", "bot-fill", "multiple-keys", "lone-timeout"];

            let mut passed = 0;
            let mut failed = 0;

            println!("🧪 Running all test scenarios...\n");

            for name in scenarios {
                let Some(config) = scenario_by_name(name) else {
                    continue;
                };
                let bot_fill = config.expected_timeouts == 0;
                let tester = QueueTester::new_with_config(engine_config(&cli, bot_fill)).await?;

                print!("Running '{}' scenario... ", name);
                match tester.run_test_scenario(config).await {
                    Ok(true) => {
                        println!("✅ PASSED");
                        passed += 1;
                    }
                    Ok(false) => {
                        println!("❌ FAILED (timeout)");
                        failed += 1;
                    }
                    Err(e) => {
                        println!("❌ FAILED ({})", e);
                        failed += 1;
                    }
                }
                tester.shutdown().await;
            }

            println!("\n📊 Results: {} passed, {} failed", passed, failed);
            if failed > 0 {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn print_stats(tester: &QueueTester) {
    let stats = tester.get_stats();
    println!("📊 Queue Statistics:");
    println!("  Total requests: {}", stats.total_requests);
    println!("  Rejected requests: {}", stats.rejected_requests);
    println!("  Matches: {}", stats.successful_matches);
    println!("  Bot-filled matches: {}", stats.bot_filled_matches);
    println!("  Timed out: {}", stats.timed_out);
}
