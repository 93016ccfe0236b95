use std::path::PathBuf;
use std::sync::mpsc::Sender;

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph, Wrap};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use kup_core::catalog::{self, ToolSpec};
use kup_core::{Error, Platform};
use kup_io::{InstallEvent, InstallRequest};

use crate::config::Settings;
use crate::msg::Msg;
use crate::theme::Theme;

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    List,
    Confirm,
    Installing,
    Done,
    Failed,
}

/// The install tab: catalog list → confirmation → live progress → outcome.
pub struct InstallTab {
    handle: Handle,
    tx: Sender<Msg>,

    tools: Vec<ToolSpec>,
    selected: usize,
    state: State,

    // Active install bookkeeping
    cancel: Option<CancellationToken>,
    downloaded: u64,
    total: Option<u64>,
    placing: bool,
    spinner_frame: usize,

    // Outcome of the last attempt
    installed_path: Option<PathBuf>,
    error: Option<Error>,
    warning: Option<String>,

    // Captured at confirmation time so the failure screen can show it
    manual_command: String,
}

impl InstallTab {
    pub fn new(handle: Handle, tx: Sender<Msg>) -> Self {
        Self {
            handle,
            tx,
            tools: catalog::all_tools(),
            selected: 0,
            state: State::List,
            cancel: None,
            downloaded: 0,
            total: None,
            placing: false,
            spinner_frame: 0,
            installed_path: None,
            error: None,
            warning: None,
            manual_command: String::new(),
        }
    }

    pub fn handle_key(&mut self, key: &KeyEvent, settings: &Settings) {
        match self.state {
            State::List => match key.code {
                KeyCode::Up | KeyCode::Char('k') => {
                    self.selected = self.selected.saturating_sub(1);
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    if self.selected + 1 < self.tools.len() {
                        self.selected += 1;
                    }
                }
                KeyCode::Enter | KeyCode::Char(' ') => {
                    let platform = Platform::resolve(&settings.architecture);
                    self.manual_command =
                        self.tools[self.selected].manual_command(&platform, &settings.bin_dir());
                    self.state = State::Confirm;
                }
                _ => {}
            },
            State::Confirm => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    self.start_install(settings);
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    self.state = State::List;
                }
                _ => {}
            },
            State::Installing => match key.code {
                KeyCode::Char('c') | KeyCode::Esc => self.cancel_active(),
                _ => {}
            },
            State::Done => match key.code {
                KeyCode::Enter | KeyCode::Esc => self.reset(),
                _ => {}
            },
            State::Failed => match key.code {
                // Retry is a fresh request; nothing below the UI retries.
                KeyCode::Char('r') => self.start_install(settings),
                KeyCode::Enter | KeyCode::Esc => self.reset(),
                _ => {}
            },
        }
    }

    fn start_install(&mut self, settings: &Settings) {
        let tool = self.tools[self.selected].clone();
        let platform = Platform::resolve(&settings.architecture);
        let resolved = catalog::resolve(&tool, &platform, &settings.bin_dir());
        self.manual_command = resolved.command;

        let request = InstallRequest {
            tool,
            url: resolved.url,
            dest_dir: settings.bin_dir(),
            timeout: settings.timeout(),
            proxy: settings.proxy(),
        };

        let cancel = CancellationToken::new();
        let mut events = {
            let _guard = self.handle.enter();
            kup_io::install(request, cancel.clone())
        };

        // Forward engine events into the UI loop.
        let tx = self.tx.clone();
        self.handle.spawn(async move {
            while let Some(event) = events.recv().await {
                if tx.send(Msg::Install(event)).is_err() {
                    break;
                }
            }
        });

        self.cancel = Some(cancel);
        self.downloaded = 0;
        self.total = None;
        self.placing = false;
        self.installed_path = None;
        self.error = None;
        self.warning = None;
        self.state = State::Installing;
    }

    pub fn cancel_active(&mut self) {
        if let Some(cancel) = &self.cancel {
            cancel.cancel();
        }
    }

    pub fn handle_event(&mut self, event: InstallEvent) {
        match event {
            InstallEvent::DownloadStarted { total_bytes, .. } => {
                self.total = total_bytes;
            }
            InstallEvent::DownloadProgress {
                downloaded,
                total_bytes,
                ..
            } => {
                self.downloaded = downloaded.max(self.downloaded);
                self.total = total_bytes.or(self.total);
            }
            InstallEvent::DownloadCompleted { total_bytes, .. } => {
                self.downloaded = total_bytes;
                self.total = Some(total_bytes);
            }
            InstallEvent::Placing { .. } => {
                self.placing = true;
            }
            InstallEvent::PostInstallFailed { message, .. } => {
                self.warning = Some(message);
            }
            InstallEvent::Done { path, .. } => {
                self.installed_path = Some(path);
                self.state = State::Done;
                self.cancel = None;
            }
            InstallEvent::Failed { error, .. } => {
                self.error = Some(error);
                self.state = State::Failed;
                self.cancel = None;
            }
        }
    }

    pub fn tick(&mut self) {
        if self.state == State::Installing {
            self.spinner_frame = (self.spinner_frame + 1) % SPINNER_FRAMES.len();
        }
    }

    fn reset(&mut self) {
        self.state = State::List;
        self.installed_path = None;
        self.error = None;
        self.warning = None;
    }

    fn selected_tool(&self) -> &ToolSpec {
        &self.tools[self.selected]
    }

    pub fn view(&self, frame: &mut Frame, area: Rect, settings: &Settings, theme: &Theme) {
        match self.state {
            State::List => self.view_list(frame, area, settings, theme),
            State::Confirm => self.view_confirm(frame, area, settings, theme),
            State::Installing => self.view_installing(frame, area, theme),
            State::Done => self.view_done(frame, area, settings, theme),
            State::Failed => self.view_failed(frame, area, settings, theme),
        }
    }

    fn view_list(&self, frame: &mut Frame, area: Rect, settings: &Settings, theme: &Theme) {
        let platform = Platform::resolve(&settings.architecture);
        let bin_dir = settings.bin_dir();

        let mut lines = vec![
            Line::from(Span::styled(
                "Install Kubernetes Tools",
                Style::default()
                    .fg(theme.primary)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(Span::styled(
                format!(
                    "System: {}/{}  |  Target: {}",
                    platform.os,
                    platform.arch,
                    bin_dir.display()
                ),
                Style::default().fg(theme.muted),
            )),
            Line::from(""),
        ];

        for (i, tool) in self.tools.iter().enumerate() {
            let cursor = if i == self.selected { "> " } else { "  " };
            let name_style = if i == self.selected {
                Style::default()
                    .fg(theme.primary)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(theme.foreground)
            };

            let (status, status_style) = if kup_io::is_installed(tool, &bin_dir) {
                ("[installed]", Style::default().fg(theme.success))
            } else {
                ("[not installed]", Style::default().fg(theme.muted))
            };

            lines.push(Line::from(vec![
                Span::raw(cursor),
                Span::styled(tool.name, name_style),
                Span::raw(" "),
                Span::styled(status, status_style),
            ]));
            lines.push(Line::from(Span::styled(
                format!("    {}", tool.description),
                Style::default().fg(theme.muted),
            )));
            lines.push(Line::from(""));
        }

        lines.push(Line::from(Span::styled(
            "up/down: select  enter: install",
            Style::default().fg(theme.muted),
        )));

        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), area);
    }

    fn view_confirm(&self, frame: &mut Frame, area: Rect, settings: &Settings, theme: &Theme) {
        let tool = self.selected_tool();

        let mut lines = vec![
            Line::from(Span::styled(
                format!("Install {}?", tool.name),
                Style::default()
                    .fg(theme.accent)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
        ];

        if settings.show_explanation {
            lines.push(Line::from(Span::styled(
                "Command to execute:",
                Style::default()
                    .fg(theme.secondary)
                    .add_modifier(Modifier::BOLD),
            )));
            for command_line in self.manual_command.lines() {
                lines.push(Line::from(Span::styled(
                    command_line.to_string(),
                    Style::default().fg(theme.success),
                )));
            }
            lines.push(Line::from(""));
            for explanation_line in tool.explanation.lines() {
                lines.push(Line::from(Span::styled(
                    explanation_line.trim_start().to_string(),
                    Style::default().fg(theme.foreground),
                )));
            }
            lines.push(Line::from(""));
        }

        lines.push(Line::from(vec![
            Span::styled(
                "[Y] Yes, install",
                Style::default()
                    .fg(theme.success)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled("[N] Cancel", Style::default().fg(theme.muted)),
        ]));

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.accent));
        frame.render_widget(
            Paragraph::new(lines).wrap(Wrap { trim: false }).block(block),
            area,
        );
    }

    fn view_installing(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(0),
            ])
            .split(area);

        let spinner = SPINNER_FRAMES[self.spinner_frame];
        let phase = if self.placing {
            "Placing binary..."
        } else {
            "Downloading..."
        };
        let header = Paragraph::new(vec![
            Line::from(Span::styled(
                format!("Installing {}...", self.selected_tool().name),
                Style::default()
                    .fg(theme.secondary)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(format!("{spinner} {phase}")),
        ]);
        frame.render_widget(header, chunks[0]);

        match self.total {
            Some(total) if total > 0 => {
                let ratio = (self.downloaded as f64 / total as f64).clamp(0.0, 1.0);
                let gauge = Gauge::default()
                    .gauge_style(Style::default().fg(theme.primary))
                    .ratio(ratio)
                    .label(format!(
                        "{:.1}% ({} / {} bytes)",
                        ratio * 100.0,
                        self.downloaded,
                        total
                    ));
                frame.render_widget(gauge, chunks[1]);
            }
            _ => {
                // Unknown total: indeterminate, show the running byte count.
                let progress = Paragraph::new(Span::styled(
                    format!("{} bytes downloaded", self.downloaded),
                    Style::default().fg(theme.foreground),
                ));
                frame.render_widget(progress, chunks[1]);
            }
        }

        let hint = Paragraph::new(Span::styled(
            "esc/c: cancel",
            Style::default().fg(theme.muted),
        ));
        frame.render_widget(hint, chunks[2]);
    }

    fn view_done(&self, frame: &mut Frame, area: Rect, settings: &Settings, theme: &Theme) {
        let mut lines = vec![
            Line::from(Span::styled(
                "Installation Complete!",
                Style::default()
                    .fg(theme.success)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(format!(
                "{} installed successfully!",
                self.selected_tool().name
            )),
            Line::from(""),
            Line::from(Span::styled(
                format!("Binary installed to: {}", settings.bin_dir().display()),
                Style::default().fg(theme.muted),
            )),
        ];

        if let Some(path) = &self.installed_path {
            lines.push(Line::from(Span::styled(
                format!("Path: {}", path.display()),
                Style::default().fg(theme.muted),
            )));
        }
        if let Some(warning) = &self.warning {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                format!("Warning: post-install step failed: {warning}"),
                Style::default().fg(theme.warning),
            )));
        }

        lines.push(Line::from(""));
        lines.push(Line::from("Press Enter to continue..."));

        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), area);
    }

    fn view_failed(&self, frame: &mut Frame, area: Rect, settings: &Settings, theme: &Theme) {
        let cancelled = matches!(self.error, Some(Error::Cancelled));
        let title = if cancelled {
            "Installation Cancelled"
        } else {
            "Installation Failed"
        };

        let mut lines = vec![
            Line::from(Span::styled(
                title,
                Style::default().fg(theme.error).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
        ];

        if let Some(error) = &self.error {
            lines.push(Line::from(Span::styled(
                error.to_string(),
                Style::default().fg(theme.error),
            )));
            lines.push(Line::from(""));
        }

        if !cancelled && settings.show_explanation {
            lines.push(Line::from(Span::styled(
                "You can try running the command manually:",
                Style::default().fg(theme.muted),
            )));
            lines.push(Line::from(""));
            for command_line in self.manual_command.lines() {
                lines.push(Line::from(Span::styled(
                    command_line.to_string(),
                    Style::default().fg(theme.success),
                )));
            }
            lines.push(Line::from(""));
        }

        lines.push(Line::from("r: retry  enter: continue"));

        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), area);
    }
}
