use ratatui::style::Color;

pub struct Theme {
    pub name: &'static str,
    /// Sung words and the progress fill.
    pub accent: Color,
    /// Key labels in the controls bar.
    pub secondary: Color,
    pub text: Color,
    pub dimmed: Color,
}

pub const THEMES: &[Theme] = &[
    Theme {
        name: "Default",
        accent: Color::Blue,
        secondary: Color::Yellow,
        text: Color::White,
        dimmed: Color::DarkGray,
    },
    Theme {
        name: "Dracula",
        accent: Color::Rgb(189, 147, 249),
        secondary: Color::Rgb(255, 121, 198),
        text: Color::White,
        dimmed: Color::DarkGray,
    },
    Theme {
        name: "Nord",
        accent: Color::Rgb(136, 192, 208),
        secondary: Color::Rgb(235, 203, 139),
        text: Color::White,
        dimmed: Color::DarkGray,
    },
    Theme {
        name: "Gruvbox",
        accent: Color::Rgb(214, 153, 62),
        secondary: Color::Rgb(250, 189, 47),
        text: Color::White,
        dimmed: Color::DarkGray,
    },
    Theme {
        name: "Catppuccin",
        accent: Color::Rgb(203, 166, 247),
        secondary: Color::Rgb(249, 226, 175),
        text: Color::White,
        dimmed: Color::DarkGray,
    },
    Theme {
        name: "Tokyo Night",
        accent: Color::Rgb(122, 162, 247),
        secondary: Color::Rgb(224, 175, 104),
        text: Color::White,
        dimmed: Color::DarkGray,
    },
];

/// Look a theme up by name, ignoring case. Unknown names get the first theme.
pub fn theme_by_name(name: &str) -> &'static Theme {
    THEMES
        .iter()
        .find(|t| t.name.eq_ignore_ascii_case(name.trim()))
        .unwrap_or_else(|| {
            tracing::warn!(theme = name, "unknown theme, using {}", THEMES[0].name);
            &THEMES[0]
        })
}
