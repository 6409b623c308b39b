use clap::builder::styling::{AnsiColor, Color, Style};
use clap::builder::Styles;
use crossterm::style::{Attribute, Color as CtColor, Stylize};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Help output colors for the command line parser.
pub fn get_styles() -> Styles {
    let ansi = |c: AnsiColor| Style::new().fg_color(Some(Color::Ansi(c)));
    let heading = ansi(AnsiColor::Yellow).bold().underline();
    let good = ansi(AnsiColor::Green).bold();
    let bad = ansi(AnsiColor::Red).bold();

    Styles::styled()
        .usage(heading)
        .header(heading)
        .literal(good)
        .valid(good)
        .invalid(bad)
        .error(bad)
        .placeholder(ansi(AnsiColor::BrightBlack))
}

const fn rgb(r: u8, g: u8, b: u8) -> CtColor {
    CtColor::Rgb { r, g, b }
}

// Palette
const ACCENT: CtColor = rgb(255, 191, 0);
const HIGHLIGHT: CtColor = rgb(0, 200, 180);
const OK: CtColor = rgb(120, 220, 120);
const WARN: CtColor = rgb(255, 140, 60);
const FAIL: CtColor = rgb(255, 85, 85);
const NOTE: CtColor = rgb(110, 160, 240);
const MUTED: CtColor = rgb(128, 128, 128);
const TEXT: CtColor = rgb(240, 240, 240);

/// One horizontal rule of a table: left corner, column junction, right corner.
struct Frame {
    left: char,
    junction: char,
    right: char,
}

const FRAME_TOP: Frame = Frame { left: '╭', junction: '┬', right: '╮' };
const FRAME_MIDDLE: Frame = Frame { left: '├', junction: '┼', right: '┤' };
const FRAME_BOTTOM: Frame = Frame { left: '╰', junction: '┴', right: '╯' };
const RULE: char = '─';
const SEPARATOR: char = '│';

fn print_status(symbol: char, message: &str, color: CtColor) {
    println!(" {} {}", symbol.with(color).bold(), message.with(color));
}

pub fn print_success(message: &str) {
    print_status('✓', message, OK);
}

pub fn print_error(message: &str) {
    print_status('✗', message, FAIL);
}

pub fn print_warning(message: &str) {
    print_status('⚠', message, WARN);
}

pub fn print_info(message: &str) {
    print_status('ℹ', message, NOTE);
}

/// A labelled field, e.g. one attribute of an item.
pub fn print_key_value(key: &str, value: &str) {
    let key = format!("{}:", key);
    println!("  {} {} {}", '●'.with(HIGHLIGHT), key.with(MUTED), value.with(TEXT));
}

pub fn print_list_item(item: &str) {
    println!("  {}  {}", '▶'.with(ACCENT), item.with(TEXT));
}

pub fn print_empty_list(message: &str) {
    let message = message.with(MUTED).attribute(Attribute::Italic);
    println!("  {} {}", '○'.with(MUTED), message);
}

/// Cells wider than this are cut with an ellipsis.
const MAX_CELL_WIDTH: usize = 48;

/// Collects rows first so every column can be sized to its widest cell.
pub struct TableBuilder {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    col_widths: Vec<usize>,
}

impl TableBuilder {
    pub fn new(headers: &[&str]) -> Self {
        let headers: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
        let col_widths = headers.iter().map(|h| h.width()).collect();
        TableBuilder { headers, rows: Vec::new(), col_widths }
    }

    pub fn add_row(&mut self, row: Vec<String>) {
        let row: Vec<String> = row.iter().map(|c| truncate(c, MAX_CELL_WIDTH)).collect();
        for (width, cell) in self.col_widths.iter_mut().zip(&row) {
            *width = (*width).max(cell.width());
        }
        self.rows.push(row);
    }

    pub fn print(&self) {
        println!("{}", self.rule(&FRAME_TOP).with(ACCENT));
        println!("{}", self.line(&self.headers, true));
        println!("{}", self.rule(&FRAME_MIDDLE).with(ACCENT));
        for row in &self.rows {
            println!("{}", self.line(row, false));
        }
        println!("{}", self.rule(&FRAME_BOTTOM).with(ACCENT));
    }

    fn rule(&self, frame: &Frame) -> String {
        let mut out = String::from(frame.left);
        for (i, width) in self.col_widths.iter().enumerate() {
            if i > 0 {
                out.push(frame.junction);
            }
            out.extend(std::iter::repeat(RULE).take(width + 2));
        }
        out.push(frame.right);
        out
    }

    fn line(&self, cells: &[String], header: bool) -> String {
        let separator = SEPARATOR.with(ACCENT).to_string();
        let mut out = separator.clone();
        for (i, width) in self.col_widths.iter().enumerate() {
            let cell = cells.get(i).map(String::as_str).unwrap_or("");
            let padding = " ".repeat(width.saturating_sub(cell.width()));
            let styled = if header {
                cell.with(ACCENT).bold().to_string()
            } else {
                cell.with(TEXT).to_string()
            };
            out.push_str(&format!(" {}{} {}", styled, padding, separator));
        }
        out
    }
}

/// Cut `s` to at most `max` display columns.
fn truncate(s: &str, max: usize) -> String {
    if s.width() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > max {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

pub fn get_prompt() -> String {
    format!("{}{} ", "catalog".with(ACCENT).bold(), "❯".with(HIGHLIGHT).bold())
}

pub fn print_welcome(db_path: &str, item_count: usize, tag_count: usize) {
    println!();
    println!("  {} {}", '◆'.with(ACCENT), "MEDIA CATALOG".with(ACCENT).bold());
    print_key_value("Database", db_path);
    print_key_value("Version", env!("APP_VERSION"));
    print_key_value("Contents", &format!("{} items, {} tags", item_count, tag_count));
    let hint = "Type 'help' for available commands";
    println!("  {}\n", hint.with(MUTED).attribute(Attribute::Italic));
}

pub fn print_goodbye() {
    println!("\n  {}\n", "Catalog closed.".with(HIGHLIGHT).bold());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_keeps_short_text() {
        assert_eq!(truncate("rock", 10), "rock");
    }

    #[test]
    fn test_truncate_cuts_long_text() {
        let cut = truncate("https://open.spotify.com/album/abcdef", 12);
        assert_eq!(cut.width(), 12);
        assert!(cut.ends_with('…'));
    }

    #[test]
    fn test_table_widths_follow_cells() {
        let mut table = TableBuilder::new(&["ID", "Artist"]);
        table.add_row(vec!["1".to_string(), "Boards of Canada".to_string()]);
        assert_eq!(table.col_widths, vec![2, 16]);
    }

    #[test]
    fn test_table_rule_spans_padded_columns() {
        let mut table = TableBuilder::new(&["ID", "Tag"]);
        table.add_row(vec!["12".to_string(), "shoegaze".to_string()]);
        assert_eq!(table.rule(&FRAME_TOP), "╭────┬──────────╮");
        assert_eq!(table.rule(&FRAME_BOTTOM).width(), 17);
    }
}
