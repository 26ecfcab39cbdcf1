use std::str::FromStr;
use url::form_urlencoded;

use super::BatchRequest;
use crate::watermark::{StyleError, WatermarkStyle};

impl BatchRequest {
    /// Parses the batch endpoint's query string. Missing style parameters
    /// keep their defaults; the resulting style is validated.
    pub fn from_query(query: &str) -> Result<Self, StyleError> {
        let mut request = BatchRequest::default();
        let style = &mut request.style;

        for (key, value) in form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
            match key.as_ref() {
                "cursor" => {
                    let cursor = value.trim();
                    request.cursor = (!cursor.is_empty()).then(|| cursor.to_string());
                }
                "processedCount" => request.processed_count = number("processedCount", &value)?,
                "collectionIds" | "collectionIds[]" => {
                    if !value.trim().is_empty() {
                        request.collection_ids.push(value.trim().to_string());
                    }
                }
                "text" => style.text = value.into_owned(),
                "angle" => style.angle_degrees = number("angle", &value)?,
                "color" => style.color_hex = value.into_owned(),
                "opacity" => style.max_opacity = number("opacity", &value)?,
                "cutoff" => style.cutoff_radius_px = pixels("cutoff", &value)?,
                "fontSize" => style.base_font_size_px = pixels("fontSize", &value)?,
                _ => {}
            }
        }

        request.style.validate()?;
        Ok(request)
    }

    /// The caller's progress, read on its own so a rejected request can
    /// still echo it. Unparseable or missing counts read as zero.
    pub fn processed_count_from_query(query: &str) -> u64 {
        form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
            .find(|(key, _)| key == "processedCount")
            .and_then(|(_, value)| value.trim().parse().ok())
            .unwrap_or(0)
    }
}

fn invalid(name: &'static str, value: &str) -> StyleError {
    StyleError::InvalidParameter {
        name,
        value: value.to_string(),
    }
}

fn number<T: FromStr>(name: &'static str, value: &str) -> Result<T, StyleError> {
    value.trim().parse().map_err(|_| invalid(name, value))
}

/// Pixel values accept fractional input and round to the nearest pixel.
fn pixels(name: &'static str, value: &str) -> Result<u32, StyleError> {
    let trimmed = value.trim();
    if let Ok(px) = trimmed.parse::<u32>() {
        return Ok(px);
    }
    match trimmed.parse::<f64>() {
        Ok(px) if px.is_finite() && px >= 0.0 && px <= u32::MAX as f64 => Ok(px.round() as u32),
        _ => Err(invalid(name, value)),
    }
}
