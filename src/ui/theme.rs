use ratatui::style::Color;

// Dark surfaces with a single teal accent. Add roles here rather than
// using literal colors in the render functions.
pub const BG: Color = Color::Rgb(12, 14, 18);
pub const SURFACE: Color = Color::Rgb(20, 24, 31);
pub const BAR_BG: Color = Color::Rgb(16, 20, 27);

pub const FG: Color = Color::Rgb(226, 232, 240);
pub const MUTED: Color = Color::Rgb(148, 163, 184);
pub const DIM: Color = Color::Rgb(100, 116, 139);
pub const BORDER: Color = Color::Rgb(51, 65, 85);

pub const ACCENT: Color = Color::Rgb(45, 212, 191);
pub const ACCENT_BG: Color = Color::Rgb(17, 46, 46);

// Delivery status, session badge and form errors.
pub const SUCCESS: Color = Color::Rgb(134, 239, 172);
pub const ERROR: Color = Color::Rgb(248, 113, 113);
