use ratatui::style::Color;

/// Color palette for the TUI. Built once from the theme setting and passed
/// into the app; a theme change in settings rebuilds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub primary: Color,
    pub secondary: Color,
    pub accent: Color,
    pub foreground: Color,
    pub muted: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub border: Color,
    pub tab_active: Color,
    pub tab_inactive: Color,
}

pub const THEME_NAMES: &[&str] = &["default", "dark", "light"];

/// Look up a theme by its settings name; unknown names get the default.
pub fn by_name(name: &str) -> Theme {
    match name {
        "dark" => DARK,
        "light" => LIGHT,
        _ => DEFAULT,
    }
}

pub const DEFAULT: Theme = Theme {
    primary: Color::Rgb(0x7c, 0x3a, 0xed),
    secondary: Color::Rgb(0x06, 0xb6, 0xd4),
    accent: Color::Rgb(0xf5, 0x9e, 0x0b),
    foreground: Color::Rgb(0xcd, 0xd6, 0xf4),
    muted: Color::Rgb(0x6c, 0x70, 0x86),
    success: Color::Rgb(0xa6, 0xe3, 0xa1),
    warning: Color::Rgb(0xf9, 0xe2, 0xaf),
    error: Color::Rgb(0xf3, 0x8b, 0xa8),
    border: Color::Rgb(0x45, 0x47, 0x5a),
    tab_active: Color::Rgb(0x7c, 0x3a, 0xed),
    tab_inactive: Color::Rgb(0x45, 0x47, 0x5a),
};

pub const DARK: Theme = Theme {
    primary: Color::Rgb(0xbb, 0x86, 0xfc),
    secondary: Color::Rgb(0x03, 0xda, 0xc6),
    accent: Color::Rgb(0xcf, 0x66, 0x79),
    foreground: Color::Rgb(0xe1, 0xe1, 0xe1),
    muted: Color::Rgb(0x88, 0x88, 0x88),
    success: Color::Rgb(0x4c, 0xaf, 0x50),
    warning: Color::Rgb(0xff, 0xc1, 0x07),
    error: Color::Rgb(0xcf, 0x66, 0x79),
    border: Color::Rgb(0x33, 0x33, 0x33),
    tab_active: Color::Rgb(0xbb, 0x86, 0xfc),
    tab_inactive: Color::Rgb(0x33, 0x33, 0x33),
};

pub const LIGHT: Theme = Theme {
    primary: Color::Rgb(0x62, 0x00, 0xee),
    secondary: Color::Rgb(0x03, 0xda, 0xc6),
    accent: Color::Rgb(0xff, 0x57, 0x22),
    foreground: Color::Rgb(0x1e, 0x1e, 0x1e),
    muted: Color::Rgb(0x75, 0x75, 0x75),
    success: Color::Rgb(0x4c, 0xaf, 0x50),
    warning: Color::Rgb(0xff, 0x98, 0x00),
    error: Color::Rgb(0xb0, 0x00, 0x20),
    border: Color::Rgb(0xcc, 0xcc, 0xcc),
    tab_active: Color::Rgb(0x62, 0x00, 0xee),
    tab_inactive: Color::Rgb(0xcc, 0xcc, 0xcc),
};
