use clap::Parser;
use log::{info, warn};

use client::network;
use client::state::BoardView;

/// Command line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to connect to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port to connect to
    #[clap(short, long, default_value = "8080")]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();
    let addr = format!("{}:{}", args.host, args.port);

    let (lobby, mut view) = network::connect(&addr).await?;
    log_roster(&view);

    let mut session = lobby.wait_for_start().await?;
    let mut last_creatures = view.creatures().len();

    loop {
        tokio::select! {
            frame = session.next_frame() => {
                match frame {
                    Ok(Some(update)) => {
                        if let Err(err) = view.apply_update(&update) {
                            warn!("dropping unparseable frame: {}", err);
                            continue;
                        }
                        let creatures = view.creatures().len();
                        if creatures != last_creatures {
                            info!("creature count changed: {} -> {}", last_creatures, creatures);
                            last_creatures = creatures;
                        }
                        let damage = view.total_displayed_damage();
                        if damage > 0 {
                            info!("combat: {} damage on display", damage);
                        }
                    }
                    Ok(None) => {
                        info!("server closed the session");
                        break;
                    }
                    Err(err) => {
                        warn!("frame error: {}", err);
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("received Ctrl+C, leaving the match");
                break;
            }
        }
    }

    Ok(())
}

fn log_roster(view: &BoardView) {
    info!(
        "joined a {}x{} board with {} creatures and {} buildings",
        view.width(),
        view.height(),
        view.creatures().len(),
        view.buildings().len()
    );
    for creature in view.creatures() {
        info!(
            "  seat {} {:?} at ({}, {}) hp {}/{}",
            creature.controller,
            creature.race,
            creature.x,
            creature.y,
            creature.health,
            creature.max_health
        );
    }
}
