//! C4 (part 1): window layout math and the shared status line. Every view
//! renders through these so insets and chrome stay identical across
//! Dashboard/Details/Create/Bulk/Status.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders};
use std::time::{Duration, Instant};

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

#[derive(Debug, Clone, Copy)]
pub struct WindowLayout {
    pub width: u16,
    pub height: u16,
}

impl WindowLayout {
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    pub fn is_valid_dimensions(&self) -> bool {
        self.width >= 20 && self.height >= 5
    }

    /// The single outer bordered box every view renders inside.
    pub fn outer_area(&self) -> Rect {
        Rect {
            x: 0,
            y: 0,
            width: self.width,
            height: self.height,
        }
    }

    /// Content area inside the border, minus one line reserved for the
    /// status line at the bottom.
    pub fn content_area(&self) -> Rect {
        let inner_w = self.width.saturating_sub(2);
        let inner_h = self.height.saturating_sub(2).saturating_sub(1);
        Rect {
            x: 1,
            y: 1,
            width: inner_w,
            height: inner_h,
        }
    }

    pub fn status_line_area(&self) -> Rect {
        Rect {
            x: 1,
            y: self.height.saturating_sub(2),
            width: self.width.saturating_sub(2),
            height: 1,
        }
    }

    pub fn bordered_box(title: &str) -> Block<'static> {
        Block::default()
            .borders(Borders::ALL)
            .title(title.to_string())
            .title_style(Self::title_style())
    }

    pub fn title_style() -> Style {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    fn color(self) -> Color {
        match self {
            Severity::Info => Color::Cyan,
            Severity::Warning => Color::Yellow,
            Severity::Error => Color::Red,
        }
    }
}

/// A time-bounded overlay message (e.g. "✗ Failed to copy") that expires
/// on its own without a view needing to track a timer.
#[derive(Debug, Clone)]
struct Overlay {
    text: String,
    severity: Severity,
    expires_at: Instant,
}

pub struct StatusLine {
    tag: String,
    help: String,
    overlay: Option<Overlay>,
    spinner_frame: usize,
}

impl StatusLine {
    pub fn new(tag: &str, help: &str) -> Self {
        Self {
            tag: tag.to_string(),
            help: help.to_string(),
            overlay: None,
            spinner_frame: 0,
        }
    }

    pub fn show_message(&mut self, text: &str, severity: Severity, duration: Duration) {
        self.overlay = Some(Overlay {
            text: text.to_string(),
            severity,
            expires_at: Instant::now() + duration,
        });
    }

    pub fn tick_spinner(&mut self) {
        self.spinner_frame = (self.spinner_frame + 1) % SPINNER_FRAMES.len();
    }

    fn current_overlay(&mut self) -> Option<(String, Severity)> {
        if let Some(overlay) = &self.overlay {
            if Instant::now() >= overlay.expires_at {
                self.overlay = None;
            }
        }
        self.overlay.as_ref().map(|o| (o.text.clone(), o.severity))
    }

    /// Renders the line: `[TAG] overlay-or-right-text ... help`. When
    /// `loading` is true the right-hand text is replaced by a spinner.
    pub fn render(&mut self, right_text: Option<&str>, loading: bool) -> Line<'static> {
        let tag_span = Span::styled(
            format!("[{}]", self.tag),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        );

        let overlay = self.current_overlay();
        let right_span = if loading {
            Span::styled(
                format!(" {} ", SPINNER_FRAMES[self.spinner_frame]),
                Style::default().fg(Color::Yellow),
            )
        } else if let Some((text, severity)) = overlay {
            Span::styled(format!(" {text} "), Style::default().fg(severity.color()))
        } else if let Some(text) = right_text {
            Span::raw(format!(" {text} "))
        } else {
            Span::raw(" ")
        };

        let help_span = Span::styled(
            self.help.clone(),
            Style::default().fg(Color::DarkGray),
        );

        Line::from(vec![tag_span, right_span, help_span])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_dimensions_threshold() {
        assert!(WindowLayout::new(20, 5).is_valid_dimensions());
        assert!(!WindowLayout::new(19, 5).is_valid_dimensions());
        assert!(!WindowLayout::new(20, 4).is_valid_dimensions());
    }

    #[test]
    fn overlay_expires_after_duration() {
        let mut status = StatusLine::new("DETAILS", "q:quit");
        status.show_message("✗ Failed to copy", Severity::Error, Duration::from_millis(5));
        assert!(status.current_overlay().is_some());
        std::thread::sleep(Duration::from_millis(10));
        assert!(status.current_overlay().is_none());
    }
}
