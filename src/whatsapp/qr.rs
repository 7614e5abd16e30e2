// src/whatsapp/qr.rs

use qrcode::{
    render::{svg, unicode},
    QrCode,
};

/// QR em blocos unicode para aparecer no log do terminal.
pub fn render_terminal(payload: &str) -> Option<String> {
    let code = QrCode::new(payload.as_bytes())
        .map_err(|e| tracing::warn!("⚠️ Não foi possível gerar o QR Code: {}", e))
        .ok()?;

    Some(
        code.render::<unicode::Dense1x2>()
            .dark_color(unicode::Dense1x2::Light)
            .light_color(unicode::Dense1x2::Dark)
            .build(),
    )
}

/// QR em SVG para a página de login.
pub fn render_svg(payload: &str) -> Option<String> {
    let code = QrCode::new(payload.as_bytes()).ok()?;
    Some(
        code.render::<svg::Color>()
            .min_dimensions(256, 256)
            .dark_color(svg::Color("#000000"))
            .light_color(svg::Color("#ffffff"))
            .build(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_login_payload() {
        let payload = "2@Vh1x+abc,def,ghi==";
        assert!(render_terminal(payload).unwrap().contains('█'));
        assert!(render_svg(payload).unwrap().starts_with("<?xml"));
    }
}
