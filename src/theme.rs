use ratatui::style::Color;

pub struct Theme {
  pub name: &'static str,
  pub bg: Color,
  pub fg: Color,
  pub accent: Color,
  pub muted: Color,
  pub border: Color,
  pub highlight_fg: Color,
  pub highlight_bg: Color,
  pub stripe_bg: Color,
  pub status: Color,
  pub error: Color,
  pub key_fg: Color,
  pub key_bg: Color,
}

pub const THEMES: [Theme; 3] = [
  Theme {
    name: "Porchlight",
    bg: Color::Rgb(28, 24, 22),
    fg: Color::Rgb(236, 226, 210),
    accent: Color::Rgb(245, 176, 65),
    muted: Color::Rgb(140, 128, 114),
    border: Color::Rgb(78, 68, 60),
    highlight_fg: Color::Rgb(28, 24, 22),
    highlight_bg: Color::Rgb(245, 176, 65),
    stripe_bg: Color::Rgb(36, 31, 28),
    status: Color::Rgb(152, 195, 121),
    error: Color::Rgb(224, 108, 117),
    key_fg: Color::Rgb(28, 24, 22),
    key_bg: Color::Rgb(140, 128, 114),
  },
  Theme {
    name: "Dusk",
    bg: Color::Rgb(24, 26, 38),
    fg: Color::Rgb(214, 218, 240),
    accent: Color::Rgb(187, 154, 247),
    muted: Color::Rgb(110, 116, 150),
    border: Color::Rgb(58, 62, 90),
    highlight_fg: Color::Rgb(24, 26, 38),
    highlight_bg: Color::Rgb(187, 154, 247),
    stripe_bg: Color::Rgb(30, 32, 46),
    status: Color::Rgb(125, 207, 255),
    error: Color::Rgb(247, 118, 142),
    key_fg: Color::Rgb(24, 26, 38),
    key_bg: Color::Rgb(110, 116, 150),
  },
  Theme {
    name: "Daylight",
    bg: Color::Rgb(250, 248, 242),
    fg: Color::Rgb(48, 44, 40),
    accent: Color::Rgb(200, 90, 40),
    muted: Color::Rgb(130, 124, 116),
    border: Color::Rgb(210, 204, 192),
    highlight_fg: Color::Rgb(250, 248, 242),
    highlight_bg: Color::Rgb(200, 90, 40),
    stripe_bg: Color::Rgb(242, 238, 228),
    status: Color::Rgb(60, 130, 80),
    error: Color::Rgb(190, 40, 50),
    key_fg: Color::Rgb(250, 248, 242),
    key_bg: Color::Rgb(130, 124, 116),
  },
];
