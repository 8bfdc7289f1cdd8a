use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::arena::{Arena, Direction};
use crate::cancel::CancelSignal;
use crate::error::Error;

/// Receives the state of the game as the loop advances.
///
/// Callbacks run on the game thread while the game lock is held, so a slow
/// printer also delays `Game::steer` until the current step is done. The lock
/// is released before the resulting outcome is sent, so steering never waits
/// on the outcome receiver.
pub trait Printer {
    /// Renders one frame, called after every successful step.
    fn arena(&mut self, arena: &Arena) -> anyhow::Result<()>;

    /// Called once when the snake hits a wall or itself.
    fn game_over(&mut self) -> anyhow::Result<()>;

    /// Called once when the snake fills the whole grid.
    fn won(&mut self) -> anyhow::Result<()> {
        self.game_over()
    }

    /// Called once for any other failure, right before the loop stops.
    fn error(&mut self, err: &Error) -> anyhow::Result<()>;
}

/// What the game loop reports on its outcome channel.
#[derive(Debug)]
pub enum Outcome {
    /// Rendering a frame failed; the game keeps running.
    PrinterFailed(Error),
    GameOver,
    Won,
    Failed(Error),
}

impl Outcome {
    /// No more outcomes follow a terminal one.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Outcome::PrinterFailed(_))
    }
}

struct State<P, R> {
    arena: Arena,
    rng: R,
    direction: Direction,
    printer: P,
}

impl<P: Printer, R: Rng> State<P, R> {
    /// One tick: move, then tell the printer about it.
    fn step(&mut self) -> Option<Outcome> {
        // Reached when the frame of the filling move failed to render.
        if self.arena.is_full() {
            return Some(self.win());
        }

        let mut res = self.arena.move_step(self.direction, &mut self.rng);
        if let Err(Error::ReverseDirection) = res {
            let forward = self.direction.reverse();
            debug!("{:?} is a reverse turn, continuing {:?}", self.direction, forward);
            res = self.arena.move_step(forward, &mut self.rng);
        }

        match res {
            Ok(moved) => {
                debug!("head {} -> {}", moved.old_head, moved.new_head);
                if let Err(e) = self.printer.arena(&self.arena) {
                    warn!("printer failed to render frame: {:#}", e);
                    return Some(Outcome::PrinterFailed(Error::Printer(e)));
                }
                if self.arena.is_full() {
                    return Some(self.win());
                }
                None
            }
            Err(Error::ObstacleHit) => {
                info!("obstacle hit, snake length {}", self.arena.len());
                Some(match self.printer.game_over() {
                    Ok(()) => Outcome::GameOver,
                    Err(report) => Outcome::Failed(Error::Unreported {
                        cause: Box::new(Error::ObstacleHit),
                        report,
                    }),
                })
            }
            Err(err) => Some(Outcome::Failed(report(&mut self.printer, err))),
        }
    }

    fn win(&mut self) -> Outcome {
        info!("grid filled, snake length {}", self.arena.len());
        match self.printer.won() {
            Ok(()) => Outcome::Won,
            Err(report) => Outcome::Failed(Error::Unreported {
                cause: Box::new(Error::GridFull),
                report,
            }),
        }
    }
}

/// Hands `err` to the printer, folding a failing notification into it.
fn report<P: Printer>(printer: &mut P, err: Error) -> Error {
    match printer.error(&err) {
        Ok(()) => err,
        Err(report) => Error::Unreported { cause: Box::new(err), report },
    }
}

/// Fixed period timer. Ticks missed while a step overran are dropped.
struct Ticker {
    interval: Duration,
    next: Instant,
}

impl Ticker {
    fn new(interval: Duration) -> Self {
        Ticker { interval, next: Instant::now() + interval }
    }

    /// Sleeps until the next tick; returns `false` if cancelled meanwhile.
    fn wait(&mut self, cancel: &mut CancelSignal) -> bool {
        let timeout = self.next.saturating_duration_since(Instant::now());
        if cancel.wait_timeout(timeout) {
            return false;
        }

        self.next += self.interval;
        let now = Instant::now();
        if self.next <= now {
            self.next = now + self.interval;
        }
        true
    }
}

/// Changes the direction of a running game from another thread.
pub struct Steering<P, R> {
    state: Arc<Mutex<State<P, R>>>,
}

impl<P, R> Clone for Steering<P, R> {
    fn clone(&self) -> Self {
        Steering { state: Arc::clone(&self.state) }
    }
}

impl<P, R> Steering<P, R> {
    /// Applied on the next tick. Only the last call between two ticks counts.
    pub fn steer(&self, direction: Direction) {
        self.state.lock().direction = direction;
    }
}

/// One game instance: an arena advanced by a background tick loop.
pub struct Game<P, R = StdRng> {
    state: Arc<Mutex<State<P, R>>>,
    tick: Duration,
    worker: Option<JoinHandle<()>>,
}

impl<P> Game<P, StdRng>
where
    P: Printer + Send + 'static,
{
    pub fn new(dimension: u16, tick: Duration, printer: P) -> Result<Self, Error> {
        Game::with_rng(dimension, tick, printer, StdRng::from_entropy())
    }
}

impl<P, R> Game<P, R>
where
    P: Printer + Send + 'static,
    R: Rng + Send + 'static,
{
    pub fn with_rng(dimension: u16, tick: Duration, printer: P, mut rng: R) -> Result<Self, Error> {
        let arena = Arena::new(dimension, &mut rng)?;
        let state = State { arena, rng, direction: Direction::default(), printer };

        Ok(Game { state: Arc::new(Mutex::new(state)), tick, worker: None })
    }

    pub fn steer(&self, direction: Direction) {
        self.state.lock().direction = direction;
    }

    pub fn steering(&self) -> Steering<P, R> {
        Steering { state: Arc::clone(&self.state) }
    }

    /// Locked read access to the arena. Blocks while a step is running.
    pub fn with_arena<T>(&self, f: impl FnOnce(&Arena) -> T) -> T {
        f(&self.state.lock().arena)
    }

    /// Spawns the tick loop. The returned channel is unbuffered and closes
    /// after a terminal outcome or once `cancel` fires; it must be drained.
    ///
    /// Each step holds the game lock through the printer callbacks, then
    /// releases it before blocking on the outcome send.
    pub fn start(&mut self, cancel: CancelSignal) -> Result<Receiver<Outcome>, Error> {
        if self.worker.is_some() {
            return Err(Error::AlreadyStarted);
        }

        let (tx, rx) = sync_channel(0);
        let state = Arc::clone(&self.state);
        let tick = self.tick;

        info!("starting game, tick every {:?}", tick);
        self.worker = Some(thread::spawn(move || run(state, tick, cancel, tx)));

        Ok(rx)
    }

    /// Waits for the tick loop to exit.
    pub fn join(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("game loop panicked");
            }
        }
    }
}

fn run<P: Printer, R: Rng>(
    state: Arc<Mutex<State<P, R>>>,
    tick: Duration,
    mut cancel: CancelSignal,
    outcomes: SyncSender<Outcome>,
) {
    let mut ticker = Ticker::new(tick);

    loop {
        if !ticker.wait(&mut cancel) {
            debug!("game cancelled");
            return;
        }

        // The lock spans the whole step, printer included.
        let outcome = state.lock().step();

        if let Some(outcome) = outcome {
            let terminal = outcome.is_terminal();
            if outcomes.send(outcome).is_err() {
                debug!("outcome receiver dropped, stopping");
                return;
            }
            if terminal {
                return;
            }
        }
    }
}
