use iced_core::{
    Color,
    theme::{Custom, Palette},
};
use palette::{
    FromColor, Hsva,
    rgb::{Rgb, Rgba},
};
use serde::{Deserialize, Serialize};

/// Categorical colors handed out to text sources, in order.
pub const CATEGORY_COLORS: [&str; 8] = [
    "#66c2a5", "#fc8d62", "#8da0cb", "#e78ac3", "#a6d854", "#ffd92f", "#e5c494", "#b3b3b3",
];

const DEFAULT_NAME: &str = "Paper";

#[derive(Debug, Clone)]
pub struct Theme(pub iced_core::Theme);

#[derive(Serialize, Deserialize)]
struct SerTheme {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    palette: Option<Palette>,
}

impl Default for Theme {
    fn default() -> Self {
        Self(iced_core::Theme::Custom(default_theme().into()))
    }
}

impl From<Theme> for iced_core::Theme {
    fn from(val: Theme) -> Self {
        val.0
    }
}

/// Light, low-saturation palette so the black series line and the
/// translucent selection fills read well.
pub fn default_theme() -> Custom {
    Custom::new(
        DEFAULT_NAME.to_string(),
        Palette {
            background: Color::from_rgb8(250, 250, 250),
            text: Color::from_rgb8(34, 34, 34),
            primary: Color::from_rgb8(24, 144, 255),
            success: Color::from_rgb8(0, 128, 0),
            danger: Color::from_rgb8(255, 77, 79),
            warning: Color::from_rgb8(250, 173, 20),
        },
    )
}

fn named(name: &str) -> Option<iced_core::Theme> {
    Some(match name {
        "light" => iced_core::Theme::Light,
        "dark" => iced_core::Theme::Dark,
        "dracula" => iced_core::Theme::Dracula,
        "nord" => iced_core::Theme::Nord,
        "solarized_light" => iced_core::Theme::SolarizedLight,
        "solarized_dark" => iced_core::Theme::SolarizedDark,
        "gruvbox_light" => iced_core::Theme::GruvboxLight,
        "gruvbox_dark" => iced_core::Theme::GruvboxDark,
        "catppuccino_latte" => iced_core::Theme::CatppuccinLatte,
        "tokyo_night_light" => iced_core::Theme::TokyoNightLight,
        "kanagawa_lotus" => iced_core::Theme::KanagawaLotus,
        "paper" => Theme::default().0,
        _ => return None,
    })
}

fn name_of(theme: &iced_core::Theme) -> Option<&'static str> {
    Some(match theme {
        iced_core::Theme::Light => "light",
        iced_core::Theme::Dark => "dark",
        iced_core::Theme::Dracula => "dracula",
        iced_core::Theme::Nord => "nord",
        iced_core::Theme::SolarizedLight => "solarized_light",
        iced_core::Theme::SolarizedDark => "solarized_dark",
        iced_core::Theme::GruvboxLight => "gruvbox_light",
        iced_core::Theme::GruvboxDark => "gruvbox_dark",
        iced_core::Theme::CatppuccinLatte => "catppuccino_latte",
        iced_core::Theme::TokyoNightLight => "tokyo_night_light",
        iced_core::Theme::KanagawaLotus => "kanagawa_lotus",
        _ => return None,
    })
}

impl Serialize for Theme {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        if let iced_core::Theme::Custom(custom) = &self.0 {
            if custom.to_string() == DEFAULT_NAME {
                return "paper".serialize(serializer);
            }
            SerTheme {
                name: "custom".to_string(),
                palette: Some(self.0.palette()),
            }
            .serialize(serializer)
        } else {
            name_of(&self.0).unwrap_or("paper").serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Theme {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value =
            serde_json::Value::deserialize(deserializer).map_err(serde::de::Error::custom)?;

        if let Some(s) = value.as_str() {
            return named(s)
                .map(Theme)
                .ok_or_else(|| serde::de::Error::custom(format!("Invalid theme: {s}")));
        }

        let serialized = SerTheme::deserialize(value).map_err(serde::de::Error::custom)?;

        match (serialized.name.as_str(), serialized.palette) {
            ("custom", Some(palette)) => Ok(Theme(iced_core::Theme::Custom(
                Custom::new("Custom".to_string(), palette).into(),
            ))),
            ("custom", None) => Err(serde::de::Error::custom(
                "Custom theme missing palette data",
            )),
            (name, _) => named(name)
                .map(Theme)
                .ok_or_else(|| serde::de::Error::custom("Invalid theme")),
        }
    }
}

/// Color for the `index`-th text source, cycling through [`CATEGORY_COLORS`].
pub fn category_color(index: usize) -> Color {
    hex_to_color(CATEGORY_COLORS[index % CATEGORY_COLORS.len()]).unwrap_or(Color::BLACK)
}

/// Accepts `#rgb`, `#rgba`, `#rrggbb` and `#rrggbbaa`.
pub fn hex_to_color(hex: &str) -> Option<Color> {
    let digits = hex.strip_prefix('#')?;
    if !digits.is_ascii() {
        return None;
    }

    let expanded: String = match digits.len() {
        3 | 4 => digits.chars().flat_map(|c| [c, c]).collect(),
        6 | 8 => digits.to_string(),
        _ => return None,
    };

    let channel = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).ok();
    let (r, g, b) = (channel(0)?, channel(2)?, channel(4)?);
    let a = if expanded.len() == 8 { channel(6)? } else { u8::MAX };

    Some(Color::from_rgba8(r, g, b, f32::from(a) / 255.0))
}

pub fn color_to_hex(color: Color) -> String {
    use std::fmt::Write;

    let mut hex = String::with_capacity(9);
    let [r, g, b, a] = color.into_rgba8();

    let _ = write!(&mut hex, "#{r:02X}{g:02X}{b:02X}");
    if a < u8::MAX {
        let _ = write!(&mut hex, "{a:02X}");
    }

    hex
}

pub fn from_hsva(color: Hsva) -> Color {
    let rgba = palette::Srgba::from_color(color);
    Color {
        r: rgba.color.red,
        g: rgba.color.green,
        b: rgba.color.blue,
        a: rgba.alpha,
    }
}

pub fn to_hsva(color: Color) -> Hsva {
    Hsva::from_color(Rgba {
        alpha: color.a,
        color: Rgb {
            red: color.r,
            green: color.g,
            blue: color.b,
            ..Rgb::default()
        },
    })
}

/// Lowers brightness in HSV space, keeping hue and alpha.
pub fn darken(color: Color, amount: f32) -> Color {
    let mut hsva = to_hsva(color);
    hsva.value = (hsva.value - amount).max(0.0);
    from_hsva(hsva)
}
