//! Style roles mapping logical names to `colored::Color`
//!
//! Colouring is applied only when the `enabled` flag passed to [`StyleRole::paint`]
//! is true, so the same call sites serve terminals and redirected output.
//!
//! ```
//! use plughost::core::styles::StyleRole;
//! assert_eq!(StyleRole::Header.paint("Plugins", false), "Plugins");
//! assert!(StyleRole::Header.paint("Plugins", true).starts_with("\x1b[33m"));
//! ```

use clap::builder::styling::AnsiColor;
use colored::Color;

macro_rules! style {
    ( $( $variant:ident => $color:expr ),+ $(,)? ) => {
        #[derive(Copy, Clone, Debug, PartialEq, Eq)]
        pub enum StyleRole { $( $variant ),+ }

        impl StyleRole {
            pub fn color(self) -> Option<Color> {
                match self { $( StyleRole::$variant => $color ),+ }
            }
        }
    }
}

style! {
    Header      => Some(Color::Yellow),
    Literal     => Some(Color::Cyan),
    Placeholder => Some(Color::Green),
    Name        => Some(Color::BrightGreen),
    Flag        => Some(Color::Blue),
    Error       => Some(Color::BrightRed),
    Value       => None,
}

impl StyleRole {
    pub fn ansi_code(self) -> Option<&'static str> {
        Some(match self.color()? {
            Color::Black => "30",
            Color::Red => "31",
            Color::Green => "32",
            Color::Yellow => "33",
            Color::Blue => "34",
            Color::Magenta => "35",
            Color::Cyan => "36",
            Color::White => "37",
            Color::BrightBlack => "90",
            Color::BrightRed => "91",
            Color::BrightGreen => "92",
            Color::BrightYellow => "93",
            Color::BrightBlue => "94",
            Color::BrightMagenta => "95",
            Color::BrightCyan => "96",
            Color::BrightWhite => "97",
            _ => return None,
        })
    }

    pub fn paint(self, text: &str, enabled: bool) -> String {
        match self.ansi_code().filter(|_| enabled) {
            Some(code) => format!("\x1b[{}m{}\x1b[0m", code, text),
            None => text.to_string(),
        }
    }

    /// prettytable `style_spec` foreground for this role
    pub fn table_spec(self) -> Option<&'static str> {
        Some(match self.color()? {
            Color::Black => "Fk",
            Color::Red => "Fr",
            Color::Green => "Fg",
            Color::Yellow => "Fy",
            Color::Blue => "Fb",
            Color::Magenta => "Fm",
            Color::Cyan => "Fc",
            Color::White => "Fw",
            Color::BrightBlack => "FK",
            Color::BrightRed => "FR",
            Color::BrightGreen => "FG",
            Color::BrightYellow => "FY",
            Color::BrightBlue => "FB",
            Color::BrightMagenta => "FM",
            Color::BrightCyan => "FC",
            Color::BrightWhite => "FW",
            _ => return None,
        })
    }

    fn ansi(self) -> Option<AnsiColor> {
        use AnsiColor as A;
        Some(match self.color()? {
            Color::Black => A::Black,
            Color::Red => A::Red,
            Color::Green => A::Green,
            Color::Yellow => A::Yellow,
            Color::Blue => A::Blue,
            Color::Magenta => A::Magenta,
            Color::Cyan => A::Cyan,
            Color::White => A::White,
            Color::BrightBlack => A::BrightBlack,
            Color::BrightRed => A::BrightRed,
            Color::BrightGreen => A::BrightGreen,
            Color::BrightYellow => A::BrightYellow,
            Color::BrightBlue => A::BrightBlue,
            Color::BrightMagenta => A::BrightMagenta,
            Color::BrightCyan => A::BrightCyan,
            Color::BrightWhite => A::BrightWhite,
            _ => return None,
        })
    }
}

/// Clap help styles built from the roles
pub fn help_styles(enabled: bool) -> clap::builder::Styles {
    use clap::builder::styling::{Color as ClapColor, Style};
    if !enabled {
        return clap::builder::Styles::plain();
    }

    let style = |role: StyleRole, bold: bool| {
        let mut s = Style::new().fg_color(role.ansi().map(ClapColor::Ansi));
        if bold {
            s = s.bold();
        }
        s
    };

    clap::builder::Styles::styled()
        .header(style(StyleRole::Header, true))
        .usage(style(StyleRole::Header, true))
        .literal(style(StyleRole::Literal, false))
        .placeholder(style(StyleRole::Placeholder, false))
        .error(style(StyleRole::Error, true))
}
