use std::sync::mpsc::Sender;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use tokio::runtime::Handle;

use crate::config::Settings;
use crate::msg::Msg;
use crate::tabs::install::InstallTab;
use crate::tabs::settings::SettingsTab;
use crate::theme::{self, Theme};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Install,
    Settings,
}

impl Tab {
    fn title(self) -> &'static str {
        match self {
            Tab::Install => " Install ",
            Tab::Settings => " Settings ",
        }
    }

    fn next(self) -> Self {
        match self {
            Tab::Install => Tab::Settings,
            Tab::Settings => Tab::Install,
        }
    }
}

pub struct App {
    settings: Settings,
    theme: Theme,
    active_tab: Tab,
    install: InstallTab,
    settings_tab: SettingsTab,
    show_help: bool,
    pub should_quit: bool,
}

impl App {
    pub fn new(settings: Settings, handle: Handle, tx: Sender<Msg>) -> Self {
        let theme = theme::by_name(&settings.theme);
        Self {
            theme,
            active_tab: Tab::Install,
            install: InstallTab::new(handle, tx),
            settings_tab: SettingsTab::new(),
            show_help: false,
            should_quit: false,
            settings,
        }
    }

    pub fn update(&mut self, msg: Msg) {
        match msg {
            Msg::Key(key) => {
                if key.kind != KeyEventKind::Press {
                    return;
                }
                if self.handle_global_key(&key) {
                    return;
                }
                match self.active_tab {
                    Tab::Install => self.install.handle_key(&key, &self.settings),
                    Tab::Settings => {
                        self.settings_tab.handle_key(&key, &mut self.settings);
                        self.theme = theme::by_name(&self.settings.theme);
                    }
                }
            }
            Msg::Install(event) => self.install.handle_event(event),
            Msg::Tick => self.install.tick(),
            Msg::Resize => {}
        }
    }

    fn handle_global_key(&mut self, key: &KeyEvent) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.install.cancel_active();
            self.should_quit = true;
            return true;
        }

        // While a text field is being edited, keys belong to the editor.
        let editing = self.active_tab == Tab::Settings && self.settings_tab.is_editing();
        if editing {
            return false;
        }

        match key.code {
            KeyCode::Char('q') => {
                self.install.cancel_active();
                self.should_quit = true;
                true
            }
            KeyCode::Tab | KeyCode::BackTab => {
                self.active_tab = self.active_tab.next();
                true
            }
            KeyCode::Char('?') => {
                self.show_help = !self.show_help;
                true
            }
            _ => false,
        }
    }

    pub fn view(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(frame.area());

        self.render_tab_bar(frame, chunks[0]);

        match self.active_tab {
            Tab::Install => self
                .install
                .view(frame, chunks[1], &self.settings, &self.theme),
            Tab::Settings => self
                .settings_tab
                .view(frame, chunks[1], &self.settings, &self.theme),
        }

        self.render_help(frame, chunks[2]);
    }

    fn render_tab_bar(&self, frame: &mut Frame, area: ratatui::layout::Rect) {
        let spans: Vec<Span> = [Tab::Install, Tab::Settings]
            .iter()
            .map(|tab| {
                let style = if *tab == self.active_tab {
                    Style::default()
                        .fg(self.theme.tab_active)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(self.theme.tab_inactive)
                };
                Span::styled(tab.title(), style)
            })
            .collect();

        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn render_help(&self, frame: &mut Frame, area: ratatui::layout::Rect) {
        let key_style = Style::default().fg(self.theme.accent);
        let desc_style = Style::default().fg(self.theme.muted);

        let line = if self.show_help {
            Line::from(vec![
                Span::styled("tab", key_style),
                Span::styled(" switch tabs  ", desc_style),
                Span::styled("up/down", key_style),
                Span::styled(" navigate  ", desc_style),
                Span::styled("enter", key_style),
                Span::styled(" select  ", desc_style),
                Span::styled("esc", key_style),
                Span::styled(" back  ", desc_style),
                Span::styled("q", key_style),
                Span::styled(" quit  ", desc_style),
                Span::styled("?", key_style),
                Span::styled(" toggle help", desc_style),
            ])
        } else {
            Line::from(vec![
                Span::styled("?", key_style),
                Span::styled(" help  ", desc_style),
                Span::styled("q", key_style),
                Span::styled(" quit", desc_style),
            ])
        };

        frame.render_widget(Paragraph::new(line), area);
    }
}
