use crate::settings::ThemeMode;
use eframe::egui;

pub fn apply(ctx: &egui::Context, mode: ThemeMode) {
    let flavor = match mode {
        ThemeMode::Latte => catppuccin_egui::LATTE,
        ThemeMode::Frappe => catppuccin_egui::FRAPPE,
        ThemeMode::Macchiato => catppuccin_egui::MACCHIATO,
        ThemeMode::Mocha => catppuccin_egui::MOCHA,
    };
    catppuccin_egui::set_theme(ctx, flavor);
}

/// Parses a "#rrggbb" color token, falling back to slate for anything
/// malformed so a bad stored token never breaks rendering.
pub fn parse_color_token(token: &str) -> egui::Color32 {
    let fallback = egui::Color32::from_rgb(0x33, 0x41, 0x55);
    let hex = token.strip_prefix('#').unwrap_or(token);
    // Length alone is not enough: 6 bytes of multi-byte UTF-8 would pass and
    // the digit slices below would split a char boundary.
    if hex.len() != 6 || !hex.is_ascii() {
        return fallback;
    }
    match (
        u8::from_str_radix(&hex[0..2], 16),
        u8::from_str_radix(&hex[2..4], 16),
        u8::from_str_radix(&hex[4..6], 16),
    ) {
        (Ok(r), Ok(g), Ok(b)) => egui::Color32::from_rgb(r, g, b),
        _ => fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_tokens() {
        assert_eq!(
            parse_color_token("#ff0000"),
            egui::Color32::from_rgb(255, 0, 0)
        );
        assert_eq!(
            parse_color_token("00ff00"),
            egui::Color32::from_rgb(0, 255, 0)
        );
    }

    #[test]
    fn malformed_tokens_fall_back() {
        let fallback = egui::Color32::from_rgb(0x33, 0x41, 0x55);
        assert_eq!(parse_color_token(""), fallback);
        assert_eq!(parse_color_token("#12"), fallback);
        assert_eq!(parse_color_token("#zzzzzz"), fallback);
    }

    #[test]
    fn multibyte_tokens_fall_back_instead_of_panicking() {
        let fallback = egui::Color32::from_rgb(0x33, 0x41, 0x55);
        // Six bytes but two chars; tokens come from a shared store, so
        // anything another client wrote must render as the fallback.
        assert_eq!(parse_color_token("€€"), fallback);
        assert_eq!(parse_color_token("#€€"), fallback);
        assert_eq!(parse_color_token("#ффф"), fallback);
    }
}
