use std::io::{stdout, Stdout, Write};
use std::time::Duration;

use anyhow::{bail, Context};
use crossterm::event::{poll, read, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute, queue, style, terminal};

use crate::arena::{Arena, Direction, Field};
use crate::error::Error;
use crate::game::Printer;

const BORDER_CHAR: char = '░';
const UPPER_FOOD_CHAR: char = '⁰';
const LOWER_FOOD_CHAR: char = 'ₒ';
const FULL_BLOCK_CHAR: char = '█';
const UPPER_HALF_CHAR: char = '▀';
const LOWER_HALF_CHAR: char = '▄';
const FOOTER: &str = "Exit: ESC";

/// What a key press asks the game to do.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Steer(Direction),
    Quit,
}

impl Command {
    pub fn from_key_event(ev: &KeyEvent) -> Option<Command> {
        if ev.kind == KeyEventKind::Release {
            return None;
        }
        if is_ctrl_c(ev) {
            return Some(Command::Quit);
        }

        match ev.code {
            KeyCode::Char('w') | KeyCode::Up => Some(Command::Steer(Direction::Up)),
            KeyCode::Char('a') | KeyCode::Left => Some(Command::Steer(Direction::Left)),
            KeyCode::Char('s') | KeyCode::Down => Some(Command::Steer(Direction::Down)),
            KeyCode::Char('d') | KeyCode::Right => Some(Command::Steer(Direction::Right)),
            KeyCode::Esc | KeyCode::Char('q') => Some(Command::Quit),
            _ => None,
        }
    }
}

fn is_ctrl_c(ev: &KeyEvent) -> bool {
    ev.code == KeyCode::Char('c') && ev.modifiers.contains(KeyModifiers::CONTROL)
}

/// Terminal columns and rows needed to draw a grid of `dimension` cells.
pub fn frame_size(dimension: u16) -> (u16, u16) {
    let rows = (dimension + 1) / 2;
    (dimension + 4, rows + 3)
}

/// Draws the arena two grid rows per line with half blocks, inside a border.
pub fn render_rows(arena: &Arena) -> Vec<String> {
    let dim = arena.dimension();
    let (width, _) = frame_size(dim);
    let border: String = std::iter::repeat(BORDER_CHAR).take(width as usize).collect();

    let mut rows = vec![border.clone()];

    for y in (0..dim).step_by(2) {
        let mut line = String::new();
        line.push(BORDER_CHAR);
        line.push(BORDER_CHAR);
        for x in 0..dim {
            line.push(glyph(arena.field_at(x, y), arena.field_at(x, y + 1)));
        }
        line.push(BORDER_CHAR);
        line.push(BORDER_CHAR);
        rows.push(line);
    }

    rows.push(border);
    rows.push(FOOTER.to_string());
    rows
}

fn glyph(upper: Field, lower: Field) -> char {
    match (upper, lower) {
        (Field::Food, _) => UPPER_FOOD_CHAR,
        (_, Field::Food) => LOWER_FOOD_CHAR,
        (Field::Snake, Field::Snake) => FULL_BLOCK_CHAR,
        (Field::Snake, _) => UPPER_HALF_CHAR,
        (_, Field::Snake) => LOWER_HALF_CHAR,
        _ => ' ',
    }
}

/// Owns the terminal modes for the lifetime of the game.
pub struct TermManager {
    stdout: Stdout,
}

impl TermManager {
    pub fn new() -> Self {
        TermManager { stdout: stdout() }
    }

    /// Fails early when the grid would not fit on screen.
    pub fn check_fits(&self, dimension: u16) -> anyhow::Result<()> {
        let (cols, rows) = terminal::size().context("failed to read terminal size")?;
        let (need_cols, need_rows) = frame_size(dimension);
        if cols < need_cols || rows < need_rows {
            bail!(
                "terminal is {}x{}, a grid of side {} needs at least {}x{}",
                cols,
                rows,
                dimension,
                need_cols,
                need_rows
            );
        }
        Ok(())
    }

    pub fn setup(&mut self) -> anyhow::Result<()> {
        execute!(self.stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        terminal::enable_raw_mode().context("failed to enable raw mode")?;
        execute!(self.stdout, cursor::Hide, cursor::DisableBlinking)?;
        Ok(())
    }

    pub fn restore(&mut self) -> anyhow::Result<()> {
        terminal::disable_raw_mode().context("failed to disable raw mode")?;
        execute!(self.stdout, cursor::Show, cursor::EnableBlinking, LeaveAlternateScreen)
            .context("failed to leave alternate screen")?;
        Ok(())
    }
}

impl Default for TermManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Waits up to `timeout` for a key that maps to a command.
pub fn read_command(timeout: Duration) -> anyhow::Result<Option<Command>> {
    if !poll(timeout)? {
        return Ok(None);
    }

    match read()? {
        Event::Key(ev) => Ok(Command::from_key_event(&ev)),
        _ => Ok(None),
    }
}

pub fn read_key_blocking() -> anyhow::Result<KeyEvent> {
    loop {
        if let Event::Key(ev) = read()? {
            if ev.kind != KeyEventKind::Release {
                return Ok(ev);
            }
        }
    }
}

/// Renders frames and end-of-game messages to stdout.
pub struct TermPrinter {
    stdout: Stdout,
    dimension: u16,
}

impl TermPrinter {
    pub fn new(dimension: u16) -> Self {
        TermPrinter { stdout: stdout(), dimension }
    }

    fn print_lines(&mut self, top: u16, left: u16, lines: &[String]) -> anyhow::Result<()> {
        for (i, line) in lines.iter().enumerate() {
            queue!(self.stdout, cursor::MoveTo(left, top + i as u16), style::Print(line))?;
        }
        self.stdout.flush()?;
        Ok(())
    }

    /// Boxed message centred over the grid.
    fn show_message(&mut self, lines: &[&str]) -> anyhow::Result<()> {
        let (frame_w, frame_h) = frame_size(self.dimension);
        let msg_width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) + 2;
        let msg_height = lines.len() as u16 + 2;

        let top = (frame_h / 2).saturating_sub(msg_height / 2);
        let left = (frame_w / 2).saturating_sub(msg_width as u16 / 2);

        let blank = " ".repeat(msg_width);
        let mut boxed = vec![blank.clone()];
        boxed.extend(lines.iter().map(|line| format!("{: ^width$}", line, width = msg_width)));
        boxed.push(blank);

        self.print_lines(top, left, &boxed)
    }
}

impl Printer for TermPrinter {
    fn arena(&mut self, arena: &Arena) -> anyhow::Result<()> {
        queue!(self.stdout, terminal::Clear(ClearType::All))?;
        self.print_lines(0, 0, &render_rows(arena))
    }

    fn game_over(&mut self) -> anyhow::Result<()> {
        self.show_message(&["Game over!", "", "Press any key to exit"])
    }

    fn won(&mut self) -> anyhow::Result<()> {
        self.show_message(&["You won!", "", "Press any key to exit"])
    }

    fn error(&mut self, err: &Error) -> anyhow::Result<()> {
        let msg = err.to_string();
        self.show_message(&["Error", &msg])
    }
}
