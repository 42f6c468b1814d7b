//! Conversions between platform annotations and QuPath-style GeoJSON.
//!
//! The platform stores annotation geometry in viewport coordinates spanning
//! 0..10000 along the image width, while GeoJSON tooling works in pixels;
//! conversion scales by `10000 / img_width`. Colors translate between
//! `#rrggbb` strings and the signed 32-bit ARGB integers QuPath writes.
//!
//! Only polygons (the platform's `free` shape) are supported; other
//! geometry types surface as [`ClientError::Geometry`].

use serde_json::{Value, json};

use concentriq_model::{Annotation, Image};

use crate::error::ClientError;

/// Fallback classification color used when a feature carries none
/// (QuPath's default red, `#c80000`, as signed ARGB).
const DEFAULT_COLOR_RGB: i32 = -3_670_016;

/// Build a platform annotation from one GeoJSON feature.
///
/// # Errors
///
/// Returns [`ClientError::Geometry`] for non-polygon geometry or a feature
/// that does not look like a QuPath annotation.
pub fn annotation_from_geojson(feature: &Value, image: &Image) -> Result<Annotation, ClientError> {
    let geometry = feature
        .get("geometry")
        .ok_or_else(|| ClientError::Geometry("feature has no geometry member".to_owned()))?;
    let geometry_type = geometry
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if geometry_type != "Polygon" {
        return Err(ClientError::Geometry(format!(
            "geometry type {geometry_type:?} is not supported"
        )));
    }

    // Platform annotations live in viewport coordinates.
    #[allow(clippy::cast_precision_loss)]
    let scale_px_to_vp = 10_000.0 / image.img_width as f64;

    let ring = geometry
        .get("coordinates")
        .and_then(|coords| coords.get(0))
        .and_then(Value::as_array)
        .ok_or_else(|| ClientError::Geometry("polygon has no exterior ring".to_owned()))?;

    let mut points = Vec::with_capacity(ring.len());
    for point in ring {
        let x = point.get(0).and_then(Value::as_f64);
        let y = point.get(1).and_then(Value::as_f64);
        let (Some(x), Some(y)) = (x, y) else {
            return Err(ClientError::Geometry(format!(
                "malformed polygon coordinate: {point}"
            )));
        };
        points.push(format!(
            "{:.6},{:.6}",
            x * scale_px_to_vp,
            y * scale_px_to_vp
        ));
    }
    let shape_string = points.join(" ");

    let classification = feature
        .get("properties")
        .and_then(|properties| properties.get("classification"));
    let text = classification
        .and_then(|c| c.get("name"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();
    let color_rgb = classification
        .and_then(|c| c.get("colorRGB"))
        .and_then(Value::as_i64)
        .map_or(Ok(DEFAULT_COLOR_RGB), i32::try_from)
        .map_err(|_| ClientError::Geometry("colorRGB out of range".to_owned()))?;

    let [_, r, g, b] = color_rgb.to_be_bytes();

    Ok(Annotation {
        id: None,
        text,
        shape: "free".to_owned(),
        shape_string,
        capture_bounds: Some("0.0 0.0 10000.0 10000.0".to_owned()),
        image_id: image.id,
        color: format!("#{r:02x}{g:02x}{b:02x}"),
        is_negative: false,
        is_segmenting: false,
        label_order_x: None,
        label_order_y: None,
        size: None,
        bounds_string: None,
        user_id: None,
        creator_name: None,
        created: None,
        share_permissions: None,
    })
}

/// Render a platform annotation as a GeoJSON feature.
///
/// # Errors
///
/// Returns [`ClientError::Geometry`] for shapes other than `free` or a
/// malformed shape string or color.
pub fn annotation_to_geojson(annotation: &Annotation, image: &Image) -> Result<Value, ClientError> {
    if annotation.shape != "free" {
        return Err(ClientError::Geometry(format!(
            "shape {:?} is not supported",
            annotation.shape
        )));
    }

    #[allow(clippy::cast_precision_loss)]
    let scale_vp_to_px = image.img_width as f64 / 10_000.0;

    let mut ring = Vec::new();
    for point in annotation.shape_string.split_whitespace() {
        let Some((x, y)) = point.split_once(',') else {
            return Err(ClientError::Geometry(format!(
                "malformed shape point: {point:?}"
            )));
        };
        let (Ok(x), Ok(y)) = (x.parse::<f64>(), y.parse::<f64>()) else {
            return Err(ClientError::Geometry(format!(
                "malformed shape point: {point:?}"
            )));
        };
        ring.push(json!([x * scale_vp_to_px, y * scale_vp_to_px]));
    }

    let color_rgb = parse_color(&annotation.color)?;

    Ok(json!({
        "type": "Feature",
        "id": "PathAnnotationObject",
        "geometry": {
            "type": "Polygon",
            "coordinates": [ring],
        },
        "properties": {
            "classification": {
                "name": annotation.text,
                "colorRGB": color_rgb,
            },
            "isLocked": false,
            "measurements": [],
        },
    }))
}

/// Pack a `#rrggbb` color into QuPath's signed ARGB integer.
fn parse_color(color: &str) -> Result<i32, ClientError> {
    let malformed = || ClientError::Geometry(format!("malformed color: {color:?}"));

    let hex = color.strip_prefix('#').ok_or_else(malformed)?;
    if hex.len() != 6 {
        return Err(malformed());
    }
    let r = u8::from_str_radix(&hex[0..2], 16).map_err(|_| malformed())?;
    let g = u8::from_str_radix(&hex[2..4], 16).map_err(|_| malformed())?;
    let b = u8::from_str_radix(&hex[4..6], 16).map_err(|_| malformed())?;

    Ok(i32::from_be_bytes([255, r, g, b]))
}
