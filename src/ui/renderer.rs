/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// A push touches at most three board cells, so a typical frame writes
/// only those cells plus the HUD counters.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::tile::{Cell as Tile, Position};
use crate::sim::engine::Phase;
use crate::sim::save::Storage;
use crate::sim::session::{format_time, Completion, GameSession};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Sentinel cell used to invalidate the back buffer.
    /// Different from any real cell, so every position will be diff'd.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        let bg = match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        };
        Cell { ch, fg, bg }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width {
                break;
            }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', Color::White, bg));
        }
    }
}

// ── Theme palettes ──

struct Palette {
    wall: (char, Color, Color),
    floor: Color,
    target: Color,
    crate_: Color,
    crate_done: Color,
    player: Color,
    hud_bg: Color,
}

const CLASSIC: Palette = Palette {
    wall: ('█', Color::Rgb { r: 150, g: 90, b: 50 }, Color::Rgb { r: 100, g: 60, b: 30 }),
    floor: Color::Rgb { r: 40, g: 40, b: 55 },
    target: Color::Rgb { r: 255, g: 80, b: 80 },
    crate_: Color::Rgb { r: 230, g: 170, b: 60 },
    crate_done: Color::Rgb { r: 80, g: 220, b: 80 },
    player: Color::Rgb { r: 100, g: 200, b: 255 },
    hud_bg: Color::Rgb { r: 20, g: 20, b: 60 },
};

const DARK: Palette = Palette {
    wall: ('▓', Color::Rgb { r: 90, g: 90, b: 100 }, Color::Rgb { r: 50, g: 50, b: 60 }),
    floor: Color::Rgb { r: 28, g: 28, b: 32 },
    target: Color::Rgb { r: 200, g: 60, b: 200 },
    crate_: Color::Rgb { r: 180, g: 180, b: 180 },
    crate_done: Color::Rgb { r: 60, g: 200, b: 160 },
    player: Color::Rgb { r: 255, g: 220, b: 50 },
    hud_bg: Color::Rgb { r: 35, g: 35, b: 35 },
};

/// Theme names accepted by the settings. Unknown names render as classic.
pub const THEMES: &[&str] = &["classic", "dark"];

fn palette(theme: &str) -> &'static Palette {
    match theme {
        "dark" => &DARK,
        _ => &CLASSIC,
    }
}

// ── Overlay state owned by the frontend loop ──

#[derive(Default)]
pub struct Overlay {
    /// One-line status message under the board.
    pub message: String,
    /// Shown once the celebration delay has passed.
    pub completion: Option<Completion>,
    /// The final level was solved and `next` found nothing.
    pub all_done: bool,
    /// First-run controls card, dismissed by any key.
    pub tutorial: bool,
}

// ── Renderer ──

/// Each board cell is 2 terminal columns.
const CELL_W: usize = 2;

const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_level: Option<u32>,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_level: None,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        self.back.cells.fill(Cell::INVALID);

        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(self.writer, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    pub fn render<S: Storage>(&mut self, session: &GameSession<S>, overlay: &Overlay) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        // Level switch: board size may shrink, repaint everything
        let level = session.engine().level_id();
        if level != self.last_level {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_level = level;
        }

        self.front.clear();
        self.compose_game(session, overlay);

        if overlay.tutorial {
            self.compose_box(&[
                "HOW TO PLAY",
                "",
                "Push every box [] onto a target ·",
                "Boxes can be pushed, never pulled",
                "",
                "Arrows/WASD  Move",
                "Z            Undo",
                "R            Reset level",
                "Space/P/Esc  Pause",
                "",
                "Press any key to start",
            ]);
        } else {
            match session.engine().phase() {
                Phase::Paused => self.compose_box(&["PAUSED", "", "Space/P/Esc  Resume"]),
                Phase::Complete => {
                    if let Some(c) = &overlay.completion {
                        self.compose_completion(session, c, overlay.all_done);
                    }
                }
                _ => {}
            }
        }

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        queue!(self.writer, SetForegroundColor(Color::White), SetBackgroundColor(Cell::BASE_BG))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                last_x = x;
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose_game<S: Storage>(&mut self, session: &GameSession<S>, overlay: &Overlay) {
        let pal = palette(&session.settings().theme);
        let engine = session.engine();
        let (Some(id), Some(state)) = (engine.level_id(), engine.state()) else {
            self.front.put_str(2, MAP_ROW, "No level loaded.", Color::White, Color::Reset);
            return;
        };

        // ── HUD row ──
        let name = engine.catalog().get(id).map(|d| d.name.as_str()).unwrap_or("");
        let best = session.current_best();
        let best_str = match (best.best_moves, best.best_time) {
            (Some(m), Some(t)) => format!("Best {m} / {}", format_time(t)),
            (Some(m), None) => format!("Best {m}"),
            _ => "Best -".to_string(),
        };
        let done = if session.is_completed(id) { " ✓" } else { "" };
        let hud = format!(
            " Level {id}: {name}{done}   Moves {:<5} Time {}   {best_str} ",
            state.move_count,
            format_time(state.elapsed_seconds),
        );
        self.front.fill_row(HUD_ROW, pal.hud_bg);
        self.front.put_str(0, HUD_ROW, &hud, Color::White, pal.hud_bg);

        // ── Board ──
        for gy in 0..state.height {
            let row = MAP_ROW + gy;
            if row >= self.front.height {
                break;
            }
            for gx in 0..state.width {
                let col = gx * CELL_W;
                if col + 1 >= self.front.width {
                    break;
                }
                let tile = state.cell_at(Position::new(gx as i32, gy as i32));
                self.compose_tile(pal, tile, col, row);
            }
        }

        // ── Message bar ──
        let msg_row = MAP_ROW + state.height + 1;
        if !overlay.message.is_empty() && msg_row < self.front.height {
            let msg = format!(" {} ", overlay.message);
            self.front.fill_row(msg_row, Color::Rgb { r: 200, g: 180, b: 50 });
            self.front.put_str(0, msg_row, &msg, Color::Black, Color::Rgb { r: 200, g: 180, b: 50 });
        }

        // ── Help bar ──
        let help_row = MAP_ROW + state.height + 3;
        if help_row < self.front.height {
            let sound = if session.settings().sound { "on" } else { "off" };
            let help = format!(
                " Arrows/WASD:Move  Z:Undo  R:Reset  P:Pause  [ ]:Level  T:Theme  M:Sound({sound})  Q:Quit"
            );
            self.front.put_str(0, help_row, &help, Color::DarkGrey, Color::Reset);
        }
    }

    fn compose_tile(&mut self, pal: &Palette, tile: Tile, col: usize, row: usize) {
        let (c0, c1, fg, bg) = match tile {
            Tile::Floor => (' ', ' ', Color::Reset, pal.floor),
            Tile::Wall => (pal.wall.0, pal.wall.0, pal.wall.1, pal.wall.2),
            Tile::Target => ('·', '·', pal.target, pal.floor),
            Tile::Player => ('@', ' ', pal.player, pal.floor),
            Tile::PlayerOnTarget => ('@', '·', pal.player, pal.floor),
            Tile::Box => ('[', ']', pal.crate_, pal.floor),
            Tile::BoxOnTarget => ('[', ']', pal.crate_done, pal.floor),
        };
        self.front.set(col, row, Cell::new(c0, fg, bg));
        self.front.set(col + 1, row, Cell::new(c1, fg, bg));
    }

    fn compose_completion<S: Storage>(&mut self, session: &GameSession<S>, c: &Completion, all_done: bool) {
        let best = session.current_best();
        let moves = format!(
            "Moves {}{}",
            c.moves,
            if c.new_best.new_best_moves { "  NEW BEST!" } else { "" }
        );
        let time = format!(
            "Time  {}{}",
            format_time(c.seconds),
            if c.new_best.new_best_time { "  NEW BEST!" } else { "" }
        );
        let record = format!(
            "Record {} / {}",
            best.best_moves.map_or("-".to_string(), |m| m.to_string()),
            best.best_time.map_or("-".to_string(), format_time),
        );
        let title = format!("LEVEL {} COMPLETE", c.level_id);
        let footer = if all_done {
            "All levels solved!  R: Replay"
        } else {
            "Enter/N: Next  R: Replay"
        };
        self.compose_box(&[&title, "", &moves, &time, &record, "", footer]);
    }

    /// Centered dialog box over the board.
    fn compose_box(&mut self, lines: &[&str]) {
        let bg = Color::Rgb { r: 40, g: 40, b: 40 };
        let hdr = Color::Rgb { r: 255, g: 220, b: 50 };
        let body = Color::Rgb { r: 200, g: 200, b: 200 };

        let inner_w = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        let box_w = (inner_w + 6).min(self.front.width);
        let box_h = (lines.len() + 2).min(self.front.height.saturating_sub(MAP_ROW));
        let box_x = self.front.width.saturating_sub(box_w) / 2;
        let box_y = MAP_ROW + self.front.height.saturating_sub(MAP_ROW + box_h) / 2;

        for y in box_y..box_y + box_h {
            for x in box_x..box_x + box_w {
                self.front.set(x, y, Cell::new(' ', Color::Reset, bg));
            }
        }
        for (i, line) in lines.iter().enumerate() {
            let y = box_y + 1 + i;
            if y >= box_y + box_h {
                break;
            }
            let x = box_x + (box_w.saturating_sub(line.chars().count())) / 2;
            let fg = if i == 0 { hdr } else { body };
            self.front.put_str(x, y, line, fg, bg);
        }
    }
}
