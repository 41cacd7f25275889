//! Shared help overlay. Content is per-view, toggled from any view with
//! `?` and dismissed with `?`, Esc, or `q`.

use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Style};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

pub struct HelpOverlay {
    lines: Vec<&'static str>,
}

const GLOBAL: &[&str] = &["Q  quit", "?  toggle this help"];

fn lines_for(view: &str) -> Vec<&'static str> {
    let mut lines = match view {
        "dashboard" => vec![
            "j/k        move within column",
            "h/l, Tab   move between columns",
            "Enter      open selection / move right",
            "Backspace  move left",
            "gg / G     first / last",
            "y          copy focused row",
            "o          open URL",
            "r          refresh",
            "Shift-L    cycle layout",
            "n          new run",
            "b          bulk runs",
            "s          status",
        ],
        "details" => vec![
            "j/k/g/G    move between fields",
            "y          copy field",
            "Y          copy all fields",
            "o          open URL",
            "r          force refresh",
            "q/Esc/Backspace  back to dashboard",
        ],
        "create" => vec![
            "i          enter insert mode",
            "j/k        move between fields (normal mode)",
            "d          clear field",
            "c          clear and insert",
            "Enter      activate toggle/button/picker",
            "Ctrl-S     submit",
            "r          reset form (y/n confirm)",
        ],
        "bulk" => vec![
            "f          open file browser",
            "space      toggle run selection",
            "Ctrl-S     submit selected runs",
            "Esc        cancel in-flight submission",
        ],
        "status" => vec!["j/k  move", "h/l  scroll value", "y  copy cell", "Y  copy all", "r  refresh"],
        _ => Vec::new(),
    };
    lines.push("");
    lines.extend_from_slice(GLOBAL);
    lines
}

impl HelpOverlay {
    pub fn for_view(view: &str) -> Self {
        Self { lines: lines_for(view) }
    }

    pub fn render(&mut self, frame: &mut Frame) {
        let area = frame.area();
        let w = area.width.min(60);
        let h = (self.lines.len() as u16 + 2).min(area.height.saturating_sub(2)).max(3);
        let popup = Rect {
            x: area.width.saturating_sub(w) / 2,
            y: area.height.saturating_sub(h) / 2,
            width: w,
            height: h,
        };
        frame.render_widget(Clear, popup);
        let text = self.lines.join("\n");
        let block = Block::default().borders(Borders::ALL).title(" Help (? to close) ").style(Style::default().fg(Color::Cyan));
        frame.render_widget(Paragraph::new(text).block(block).alignment(Alignment::Left).wrap(Wrap { trim: false }), popup);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dashboard_help_includes_global_bindings() {
        let lines = lines_for("dashboard");
        assert!(lines.iter().any(|l| l.contains("quit")));
        assert!(lines.iter().any(|l| l.contains("Shift-L")));
    }

    #[test]
    fn unknown_view_still_gets_global_bindings() {
        let lines = lines_for("mystery");
        assert!(lines.iter().any(|l| l.contains("quit")));
    }
}
