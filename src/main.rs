use std::fs::File;
use std::process::exit;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use env_logger::{Env, Target};
use log::{error, info, warn};

use gridsnake::config::{Config, LoggingConfig};
use gridsnake::term::{read_command, read_key_blocking, Command, TermManager, TermPrinter};
use gridsnake::{cancellation, Game, Outcome};

const INPUT_POLL_INTERVAL: Duration = Duration::from_millis(50);

fn main() {
    let config = match Config::load_or_default() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {:#}", e);
            exit(2);
        }
    };

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("error: {:#}", e);
        exit(2);
    }

    if let Err(e) = run(&config) {
        error!("{:#}", e);
        eprintln!("error: {:#}", e);
        exit(1);
    }
}

/// Logs go to the configured file only, stderr would tear the raw screen.
fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let path = match &logging.file {
        Some(path) => path,
        None => return Ok(()),
    };

    let file = File::create(path)
        .with_context(|| format!("failed to create log file {}", path.display()))?;

    env_logger::Builder::from_env(Env::default().default_filter_or(logging.level.as_str()))
        .target(Target::Pipe(Box::new(file)))
        .init();

    Ok(())
}

fn run(config: &Config) -> Result<()> {
    let mut term = TermManager::new();
    term.check_fits(config.game.dimension)?;
    term.setup()?;

    // The terminal is restored even when the game itself failed.
    let res = play(config);
    term.restore()?;
    res
}

fn play(config: &Config) -> Result<()> {
    let dimension = config.game.dimension;
    let mut game = Game::new(dimension, config.game.tick_interval(), TermPrinter::new(dimension))?;

    let (canceller, signal) = cancellation();
    let outcomes = game.start(signal)?;

    // The input thread owns the only canceller: if it stops for any reason
    // the game is cancelled as well.
    let done = Arc::new(AtomicBool::new(false));
    let input = {
        let done = Arc::clone(&done);
        let steering = game.steering();
        thread::spawn(move || -> Result<()> {
            while !done.load(Ordering::Relaxed) {
                match read_command(INPUT_POLL_INTERVAL)? {
                    Some(Command::Steer(direction)) => steering.steer(direction),
                    Some(Command::Quit) => {
                        info!("quit requested");
                        canceller.cancel();
                        break;
                    }
                    None => {}
                }
            }
            Ok(())
        })
    };

    let mut finished = false;
    let mut failure = None;

    for outcome in outcomes.iter() {
        match outcome {
            Outcome::PrinterFailed(e) => warn!("{}", e),
            Outcome::GameOver => {
                info!("game over");
                finished = true;
            }
            Outcome::Won => {
                info!("game won");
                finished = true;
            }
            Outcome::Failed(e) => failure = Some(e),
        }
    }

    done.store(true, Ordering::Relaxed);
    let input_res = input.join().map_err(|_| anyhow!("input thread panicked"))?;
    game.join();

    if let Some(e) = failure {
        return Err(e).context("game failed");
    }
    input_res.context("failed to read keyboard input")?;

    if finished {
        read_key_blocking()?;
    }

    Ok(())
}
