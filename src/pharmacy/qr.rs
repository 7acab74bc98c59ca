use qrcode::render::svg;
use qrcode::types::QrError;
use qrcode::QrCode;

/// Render the pharmacist share link as an SVG QR code.
pub fn render_svg(url: &str) -> Result<String, QrError> {
    let code = QrCode::new(url.as_bytes())?;

    Ok(code
        .render::<svg::Color>()
        .min_dimensions(200, 200)
        .max_dimensions(300, 300)
        .dark_color(svg::Color("#1c1917"))
        .light_color(svg::Color("#ffffff"))
        .quiet_zone(true)
        .build())
}
