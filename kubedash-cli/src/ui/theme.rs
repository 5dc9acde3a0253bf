//! UI Theme - color palette and style helpers
//!
//! The renderer receives a [`Theme`] value; nothing here is global. Semantic
//! [`Tone`]s produced by the core text builders are mapped to styles in one
//! place so palettes can change without touching layout code.

use ratatui::style::{Color, Modifier, Style};

use kubedash_core::config::ThemeChoice;
use kubedash_core::text::Tone;

/// Color palette tokens
#[derive(Clone, Debug, PartialEq)]
pub struct Palette {
    /// Pane border when not focused
    pub panel_border: Color,
    /// Primary text
    pub text: Color,
    /// Labels and secondary info
    pub text_dim: Color,
    /// Timestamps, hints, disabled
    pub text_muted: Color,
    /// Focus, headers, active tab
    pub accent: Color,
    pub success: Color,
    pub warn: Color,
    pub error: Color,
    pub info: Color,
    pub selection_bg: Color,
    pub selection_fg: Color,
    /// Key names in the footer
    pub key_hint: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self::dark()
    }
}

impl Palette {
    pub fn dark() -> Self {
        Self {
            panel_border: Color::Rgb(60, 60, 60),
            text: Color::Rgb(212, 212, 212),
            text_dim: Color::Rgb(150, 150, 150),
            text_muted: Color::Rgb(100, 100, 100),
            accent: Color::Rgb(79, 193, 255),
            success: Color::Rgb(78, 201, 176),
            warn: Color::Rgb(220, 180, 100),
            error: Color::Rgb(244, 135, 113),
            info: Color::Rgb(156, 220, 254),
            selection_bg: Color::Rgb(38, 79, 120),
            selection_fg: Color::White,
            key_hint: Color::Rgb(206, 145, 120),
        }
    }

    pub fn high_contrast() -> Self {
        Self {
            panel_border: Color::White,
            text: Color::White,
            text_dim: Color::Rgb(200, 200, 200),
            text_muted: Color::Rgb(150, 150, 150),
            accent: Color::Cyan,
            success: Color::Green,
            warn: Color::Yellow,
            error: Color::Red,
            info: Color::Cyan,
            selection_bg: Color::Blue,
            selection_fg: Color::White,
            key_hint: Color::Yellow,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Theme {
    pub palette: Palette,
}

impl Theme {
    pub fn new(palette: Palette) -> Self {
        Self { palette }
    }

    pub fn from_choice(choice: ThemeChoice) -> Self {
        match choice {
            ThemeChoice::Dark => Self::new(Palette::dark()),
            ThemeChoice::HighContrast => Self::new(Palette::high_contrast()),
        }
    }

    fn fg(&self, color: Color) -> Style {
        Style::default().fg(color)
    }

    /// Style for a semantic tone from the text builders
    pub fn tone(&self, tone: Tone) -> Style {
        let p = &self.palette;
        match tone {
            Tone::Plain => self.fg(p.text),
            Tone::Header => self.fg(p.accent).add_modifier(Modifier::BOLD),
            Tone::Section => self.fg(p.accent).add_modifier(Modifier::BOLD),
            Tone::Muted => self.fg(p.text_muted),
            Tone::Label => self.fg(p.text_dim),
            Tone::Success => self.fg(p.success),
            Tone::Warning => self.fg(p.warn).add_modifier(Modifier::BOLD),
            Tone::Critical => self.fg(p.error).add_modifier(Modifier::BOLD),
            Tone::Info => self.fg(p.info),
            Tone::Remediation => self.fg(p.text_dim).add_modifier(Modifier::ITALIC),
        }
    }

    /// Style for a resource status label in the list
    pub fn status(&self, label: &str) -> Style {
        let p = &self.palette;
        match label {
            "Running" | "Succeeded" | "Completed" => self.fg(p.success),
            "Failed" | "Error" | "CrashLoopBackOff" | "PipelineRunTimeout" | "Cancelled" => {
                self.fg(p.error)
            }
            "Pending" | "Started" => self.fg(p.warn),
            _ => self.fg(p.text_muted),
        }
    }

    pub fn status_icon(&self, label: &str) -> &'static str {
        match label {
            "Running" | "Started" => "●",
            "Succeeded" | "Completed" => "✓",
            "Failed" | "Error" | "CrashLoopBackOff" | "PipelineRunTimeout" | "Cancelled" => "✗",
            "Pending" => "◐",
            _ => "?",
        }
    }

    pub fn tab(&self, active: bool) -> Style {
        if active {
            self.fg(self.palette.accent)
                .add_modifier(Modifier::BOLD | Modifier::REVERSED)
        } else {
            self.fg(self.palette.text_dim)
        }
    }

    pub fn border(&self, focused: bool) -> Style {
        if focused {
            self.fg(self.palette.accent)
        } else {
            self.fg(self.palette.panel_border)
        }
    }

    pub fn selection(&self) -> Style {
        Style::default()
            .bg(self.palette.selection_bg)
            .fg(self.palette.selection_fg)
            .add_modifier(Modifier::BOLD)
    }

    pub fn key_hint(&self) -> Style {
        self.fg(self.palette.key_hint)
    }

    pub fn text(&self) -> Style {
        self.fg(self.palette.text)
    }

    pub fn text_muted(&self) -> Style {
        self.fg(self.palette.text_muted)
    }

    pub fn error(&self) -> Style {
        self.fg(self.palette.error)
    }

    pub fn title(&self) -> Style {
        self.fg(self.palette.text).add_modifier(Modifier::BOLD)
    }
}
