use ratatui::style::Color;

pub struct ThemeColors {
    pub primary: Color,
    pub secondary: Color,
    pub accent: Color,
    pub text: Color,
    pub text_dim: Color,
    pub background: Color,
    pub border: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub highlight_bg: Color,
}

/// Teahouse palette: warm brick and cream on a dark roast background
pub fn get_theme_colors() -> ThemeColors {
    ThemeColors {
        primary: Color::Rgb(196, 78, 56),    // Brick red
        secondary: Color::Rgb(212, 160, 90), // Honey
        accent: Color::Rgb(120, 180, 110),   // Mint
        text: Color::Rgb(240, 230, 215),     // Cream
        text_dim: Color::Rgb(150, 135, 120),
        background: Color::Rgb(28, 22, 20),
        border: Color::Rgb(110, 80, 65),
        success: Color::Rgb(120, 180, 110),
        warning: Color::Rgb(230, 190, 90),
        error: Color::Rgb(235, 90, 80),
        highlight_bg: Color::Rgb(60, 40, 34),
    }
}
