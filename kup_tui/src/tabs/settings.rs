use crossterm::event::{KeyCode, KeyEvent};
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Wrap};

use crate::config::{Settings, expand_tilde};
use crate::theme::{self, Theme};

const ARCHITECTURES: &[&str] = &["auto", "amd64", "arm64"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    BinPath,
    Architecture,
    ShowExplanation,
    Theme,
    Timeout,
    ProxyUrl,
}

const FIELDS: &[Field] = &[
    Field::BinPath,
    Field::Architecture,
    Field::ShowExplanation,
    Field::Theme,
    Field::Timeout,
    Field::ProxyUrl,
];

impl Field {
    fn label(self) -> &'static str {
        match self {
            Field::BinPath => "Binary Path",
            Field::Architecture => "Architecture",
            Field::ShowExplanation => "Show Command Explanation",
            Field::Theme => "Theme",
            Field::Timeout => "Download Timeout (seconds)",
            Field::ProxyUrl => "Proxy URL",
        }
    }

    fn description(self) -> &'static str {
        match self {
            Field::BinPath => "Directory where binaries will be downloaded",
            Field::Architecture => "Target architecture for downloads (auto, amd64, arm64)",
            Field::ShowExplanation => "Show command explanation before execution",
            Field::Theme => "UI color theme (default, dark, light)",
            Field::Timeout => "Timeout for download operations in seconds",
            Field::ProxyUrl => "HTTP proxy URL for downloads (leave empty for direct)",
        }
    }

    /// Text fields open an edit buffer; the rest cycle in place.
    fn is_text(self) -> bool {
        matches!(self, Field::BinPath | Field::Timeout | Field::ProxyUrl)
    }
}

/// The settings tab: field-by-field editing of the configuration.
pub struct SettingsTab {
    selected: usize,
    editing: Option<String>,
    status: Option<(String, bool)>,
}

impl SettingsTab {
    pub fn new() -> Self {
        Self {
            selected: 0,
            editing: None,
            status: None,
        }
    }

    pub fn is_editing(&self) -> bool {
        self.editing.is_some()
    }

    pub fn handle_key(&mut self, key: &KeyEvent, settings: &mut Settings) {
        let field = FIELDS[self.selected];

        if let Some(buffer) = &mut self.editing {
            match key.code {
                KeyCode::Esc => {
                    self.editing = None;
                    self.status = None;
                }
                KeyCode::Enter => {
                    let value = buffer.clone();
                    self.editing = None;
                    self.commit(field, value, settings);
                }
                KeyCode::Backspace => {
                    buffer.pop();
                }
                KeyCode::Char(c) => buffer.push(c),
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = (self.selected + FIELDS.len() - 1) % FIELDS.len();
                self.status = None;
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.selected = (self.selected + 1) % FIELDS.len();
                self.status = None;
            }
            KeyCode::Enter => {
                if field.is_text() {
                    self.editing = Some(edit_value(field, settings));
                } else {
                    cycle(field, settings, 1);
                }
            }
            KeyCode::Right | KeyCode::Char('l') => {
                if !field.is_text() {
                    cycle(field, settings, 1);
                }
            }
            KeyCode::Left | KeyCode::Char('h') => {
                if !field.is_text() {
                    cycle(field, settings, -1);
                }
            }
            KeyCode::Char('s') => match settings.save() {
                Ok(()) => {
                    self.status = Some(("Settings saved".to_string(), false));
                }
                Err(err) => {
                    self.status = Some((format!("Save failed: {err:#}"), true));
                }
            },
            _ => {}
        }
    }

    fn commit(&mut self, field: Field, value: String, settings: &mut Settings) {
        match field {
            Field::BinPath => {
                settings.bin_path = expand_tilde(value.trim());
            }
            Field::ProxyUrl => {
                settings.proxy_url = value.trim().to_string();
            }
            Field::Timeout => match value.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => settings.timeout_secs = secs,
                _ => {
                    self.status = Some((format!("Invalid timeout: {value:?}"), true));
                    return;
                }
            },
            _ => {}
        }
        self.status = Some(("Edited (press s to save)".to_string(), false));
    }

    pub fn view(&self, frame: &mut Frame, area: Rect, settings: &Settings, theme: &Theme) {
        let mut lines = vec![
            Line::from(Span::styled(
                "Settings",
                Style::default()
                    .fg(theme.primary)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
        ];

        for (i, field) in FIELDS.iter().enumerate() {
            let selected = i == self.selected;
            let cursor = if selected { "> " } else { "  " };
            let label_style = if selected {
                Style::default()
                    .fg(theme.primary)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(theme.foreground)
            };

            let value = if selected && self.is_editing() {
                format!("{}█", self.editing.as_deref().unwrap_or(""))
            } else {
                current_value(*field, settings)
            };
            let value_style = if selected && self.is_editing() {
                Style::default().fg(theme.accent)
            } else {
                Style::default().fg(theme.secondary)
            };

            lines.push(Line::from(vec![
                Span::raw(cursor),
                Span::styled(format!("{:<28}", field.label()), label_style),
                Span::styled(value, value_style),
            ]));
        }

        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            FIELDS[self.selected].description(),
            Style::default().fg(theme.muted),
        )));
        lines.push(Line::from(""));

        if let Some((message, is_error)) = &self.status {
            let style = if *is_error {
                Style::default().fg(theme.error)
            } else {
                Style::default().fg(theme.success)
            };
            lines.push(Line::from(Span::styled(message.clone(), style)));
            lines.push(Line::from(""));
        }

        let hint = if self.is_editing() {
            "enter: apply  esc: discard"
        } else {
            "enter: edit/cycle  left/right: cycle  s: save"
        };
        lines.push(Line::from(Span::styled(
            hint,
            Style::default().fg(theme.muted),
        )));

        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), area);
    }
}

/// Raw value used to seed the edit buffer (no display placeholders).
fn edit_value(field: Field, settings: &Settings) -> String {
    match field {
        Field::BinPath => settings.bin_path.clone(),
        Field::Timeout => settings.timeout_secs.to_string(),
        Field::ProxyUrl => settings.proxy_url.clone(),
        _ => current_value(field, settings),
    }
}

fn current_value(field: Field, settings: &Settings) -> String {
    match field {
        Field::BinPath => settings.bin_path.clone(),
        Field::Architecture => settings.architecture.clone(),
        Field::ShowExplanation => if settings.show_explanation { "yes" } else { "no" }.to_string(),
        Field::Theme => settings.theme.clone(),
        Field::Timeout => settings.timeout_secs.to_string(),
        Field::ProxyUrl => {
            if settings.proxy_url.is_empty() {
                "(direct)".to_string()
            } else {
                settings.proxy_url.clone()
            }
        }
    }
}

fn cycle(field: Field, settings: &mut Settings, step: isize) {
    match field {
        Field::Architecture => {
            settings.architecture = cycled(ARCHITECTURES, &settings.architecture, step);
        }
        Field::Theme => {
            settings.theme = cycled(theme::THEME_NAMES, &settings.theme, step);
        }
        Field::ShowExplanation => {
            settings.show_explanation = !settings.show_explanation;
        }
        _ => {}
    }
}

fn cycled(values: &[&str], current: &str, step: isize) -> String {
    let len = values.len() as isize;
    let index = values
        .iter()
        .position(|v| *v == current)
        .map(|i| i as isize)
        .unwrap_or(0);
    values[((index + step + len) % len) as usize].to_string()
}
