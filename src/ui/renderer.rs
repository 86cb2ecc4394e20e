//! Presentation layer: double-buffered, diff-based terminal renderer.
//!
//! How it works:
//!   1. Build the next frame into `front` buffer (array of Cell)
//!   2. Compare each cell with `back` buffer (previous frame)
//!   3. Only emit terminal commands for cells that changed
//!   4. All commands are batched with `queue!`, flushed once at the end
//!   5. Swap front/back

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::tile::{Coord, Tile, TileId};
use crate::sim::board::Board;
use crate::sim::detector::BoardStatus;
use crate::sim::level::LevelState;

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
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };
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
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell { ch, fg, bg });
        }
    }
}

// ── What to draw ──

/// Everything a board frame needs.
pub struct View<'a> {
    pub board: &'a Board,
    pub level: &'a LevelState,
    pub status: BoardStatus,
    pub cursor: Coord,
    pub held: Option<TileId>,
    pub can_drop: bool,
    /// Active tiles shown so far during a deal-in; `None` once done.
    pub revealed: Option<usize>,
    pub message: &'a str,
}

/// A modal box drawn over a hidden grid.
pub struct Overlay<'a> {
    pub title: &'a str,
    pub lines: Vec<String>,
    pub footer: &'a str,
}

// ── Renderer ──

/// Terminal columns per board cell.
const CELL_W: usize = 5;

const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;
const MAP_COL: usize = 2;

const HELP: &str = "arrows/hjkl move  space pick/drop  esc cancel  o open  w wild  r rebuild  q quit";

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
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
        self.sync_size()?;
        // Force full repaint on first frame.
        self.back.cells.fill(Cell::INVALID);
        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(
            self.writer,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    pub fn render(&mut self, view: &View) -> io::Result<()> {
        self.sync_size()?;
        self.front.clear();
        self.compose_hud(view);
        self.compose_board(view);

        let foot = MAP_ROW + view.board.rows() + 1;
        self.front.put_str(MAP_COL, foot, view.message, Color::Yellow, Cell::BASE_BG);
        self.front.put_str(MAP_COL, foot + 2, HELP, Color::DarkGrey, Cell::BASE_BG);
        self.present()
    }

    pub fn render_overlay(&mut self, overlay: &Overlay) -> io::Result<()> {
        self.sync_size()?;
        self.front.clear();

        let width = overlay.lines.iter()
            .map(|l| l.chars().count())
            .chain([overlay.title.chars().count(), overlay.footer.chars().count()])
            .max()
            .unwrap_or(0) + 4;
        let height = overlay.lines.len() + 4;
        let x0 = self.term_w.saturating_sub(width) / 2;
        let y0 = self.term_h.saturating_sub(height) / 2;
        let bg = Color::Rgb { r: 40, g: 40, b: 70 };

        for y in 0..height {
            self.front.put_str(x0, y0 + y, &" ".repeat(width), Color::White, bg);
        }
        self.front.put_str(x0 + 2, y0, overlay.title, Color::Yellow, bg);
        for (i, line) in overlay.lines.iter().enumerate() {
            self.front.put_str(x0 + 2, y0 + 2 + i, line, Color::White, bg);
        }
        self.front.put_str(x0 + 2, y0 + height - 1, overlay.footer, Color::Grey, bg);
        self.present()
    }

    /// Blank screen, used while the grid is hidden between steps.
    pub fn render_blank(&mut self) -> io::Result<()> {
        self.sync_size()?;
        self.front.clear();
        self.present()
    }

    // ── Composition ──

    fn compose_hud(&mut self, v: &View) {
        let status = match v.status {
            BoardStatus::Playing => "",
            BoardStatus::Clean => "  CLEAN!",
            BoardStatus::Stuck => "  no moves",
        };
        let hud = format!(
            "Level {}   Score {}   Moves {}   Board {}{status}",
            v.level.level, v.level.score, v.level.moves, v.level.board,
        );
        self.front.put_str(MAP_COL, HUD_ROW, &hud, Color::White, Cell::BASE_BG);
    }

    fn compose_board(&mut self, v: &View) {
        // Deal-in: the first `revealed` active tiles (by id) are visible.
        let hidden: Vec<TileId> = match v.revealed {
            Some(n) => v.board.active_tiles().skip(n).map(|t| t.id).collect(),
            None => Vec::new(),
        };

        for at in v.board.grid().coords() {
            let tile = v.board.tile_at(at);
            let concealed = tile.map_or(false, |t| hidden.contains(&t.id));
            let (label, mut fg) = match tile {
                Some(_) if concealed => (" ··· ".to_string(), Color::DarkGrey),
                Some(t) => (tile_label(t), tile_color(t)),
                None => ("     ".to_string(), Color::DarkGrey),
            };

            let held = tile.map_or(false, |t| Some(t.id) == v.held);
            let bg = if at == v.cursor && v.held.is_some() {
                if v.can_drop { Color::DarkGreen } else { Color::DarkRed }
            } else if at == v.cursor {
                Color::Rgb { r: 60, g: 60, b: 90 }
            } else if held {
                Color::Rgb { r: 90, g: 70, b: 20 }
            } else {
                Cell::BASE_BG
            };
            if held { fg = Color::White; }

            let x = MAP_COL + at.col * CELL_W;
            self.front.put_str(x, MAP_ROW + at.row, &label, fg, bg);
        }
    }

    // ── Output ──

    fn sync_size(&mut self) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }
        Ok(())
    }

    fn present(&mut self) -> io::Result<()> {
        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    /// Only write changed cells.
    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let mut last = (0usize, 0usize);

        // Explicit base colors; ResetColor would fall back to the
        // terminal's own default background.
        queue!(self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }
                if need_move || x != last.0 + 1 || y != last.1 {
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
                last = (x, y);
            }
        }
        self.writer.flush()
    }
}

impl Default for Renderer {
    fn default() -> Self { Self::new() }
}

/// Five-column label for a tile.
pub fn tile_label(t: &Tile) -> String {
    if t.is_ghost() {
        " ░░░ ".to_string()
    } else if t.is_wild() {
        "  ★  ".to_string()
    } else if t.locked {
        "  ·  ".to_string()
    } else if t.stack > 1 {
        format!(" {}x{} ", t.value, t.stack)
    } else {
        format!("  {}  ", t.value)
    }
}

fn tile_color(t: &Tile) -> Color {
    if t.is_inert() {
        return Color::DarkGrey;
    }
    if t.is_wild() {
        return Color::Magenta;
    }
    match t.value {
        1 => Color::Cyan,
        2 => Color::Green,
        3 => Color::Yellow,
        4 => Color::Rgb { r: 255, g: 150, b: 40 },
        5 => Color::Red,
        _ => Color::White,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tile::Special;

    #[test]
    fn labels_are_five_columns() {
        let mut t = Tile::ghost(TileId(1), Coord::new(0, 0));
        assert_eq!(tile_label(&t).chars().count(), CELL_W);
        t.unlock(4);
        assert_eq!(tile_label(&t), "  4  ");
        t.stack = 3;
        assert_eq!(tile_label(&t), " 4x3 ");
        t.special = Some(Special::Wild);
        assert_eq!(tile_label(&t).chars().count(), CELL_W);
    }
}
