//! Shared help styling of the command line tools.

use clap::builder::styling::{AnsiColor, Color, Style};
use clap::builder::Styles;

fn accent(color: AnsiColor) -> Style {
    Style::new().bold().fg_color(Some(Color::Ansi(color)))
}

pub fn get_styles() -> Styles {
    Styles::styled()
        .usage(accent(AnsiColor::Cyan).underline())
        .header(accent(AnsiColor::Cyan).underline())
        .literal(accent(AnsiColor::Green))
        .invalid(accent(AnsiColor::Red))
        .error(accent(AnsiColor::Red))
        .valid(accent(AnsiColor::Green))
        .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightBlack))))
}
