//! Text shape.

use super::{NodeTransform, ShapeId, ShapeStyle, ShapeTrait, number};
use crate::scene::SceneError;
use kurbo::{BezPath, Point, Rect, Shape as KurboShape};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Average glyph advance relative to font size, used when no width is fixed.
const AVERAGE_CHAR_WIDTH: f64 = 0.6;

/// A text label anchored at its top-left corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Text {
    pub(crate) id: ShapeId,
    /// The text content.
    pub text: String,
    /// Font size in pixels.
    pub font_size: f64,
    #[serde(default = "default_font_family")]
    pub font_family: String,
    /// Line height as a multiple of the font size.
    #[serde(default = "default_line_height")]
    pub line_height: f64,
    /// Fixed wrap width. `None` sizes the box to the content.
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(flatten)]
    pub transform: NodeTransform,
    #[serde(flatten)]
    pub style: ShapeStyle,
}

fn default_font_family() -> String {
    "Arial".to_string()
}

fn default_line_height() -> f64 {
    1.2
}

impl Text {
    pub fn new(position: Point, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            font_size: 16.0,
            font_family: default_font_family(),
            line_height: default_line_height(),
            width: None,
            transform: NodeTransform::at(position),
            style: ShapeStyle {
                fill: Some(super::SerializableColor::black()),
                stroke_width: 0.0,
                ..ShapeStyle::default()
            },
        }
    }

    /// Approximate layout size without a font engine.
    pub fn measure(&self) -> kurbo::Size {
        let lines = self.text.lines().count().max(1);
        let longest = self.text.lines().map(|l| l.chars().count()).max().unwrap_or(0);
        let width = self
            .width
            .unwrap_or(longest as f64 * self.font_size * AVERAGE_CHAR_WIDTH);
        kurbo::Size::new(width, lines as f64 * self.font_size * self.line_height)
    }
}

impl ShapeTrait for Text {
    fn id(&self) -> ShapeId {
        self.id
    }

    fn local_path(&self) -> BezPath {
        self.local_bounds().to_path(0.1)
    }

    fn local_bounds(&self) -> Rect {
        Rect::from_origin_size(Point::ZERO, self.measure())
    }

    fn node_transform(&self) -> &NodeTransform {
        &self.transform
    }

    fn node_transform_mut(&mut self) -> &mut NodeTransform {
        &mut self.transform
    }

    fn style(&self) -> &ShapeStyle {
        &self.style
    }

    fn style_mut(&mut self) -> &mut ShapeStyle {
        &mut self.style
    }

    fn set_geometry_attr(&mut self, key: &str, value: &Value) -> Result<bool, SceneError> {
        match key {
            "text" => {
                self.text = value
                    .as_str()
                    .ok_or_else(|| SceneError::invalid(key, value))?
                    .to_string()
            }
            "fontSize" => {
                let size = number(key, value)?;
                if size <= 0.0 {
                    return Err(SceneError::invalid(key, value));
                }
                self.font_size = size;
            }
            "fontFamily" => {
                self.font_family = value
                    .as_str()
                    .ok_or_else(|| SceneError::invalid(key, value))?
                    .to_string()
            }
            "lineHeight" => self.line_height = number(key, value)?.max(0.0),
            "width" => {
                self.width = match value {
                    Value::Null => None,
                    _ => Some(number(key, value)?.max(0.0)),
                }
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn geometry_attr(&self, key: &str) -> Option<Value> {
        match key {
            "text" => Some(self.text.clone().into()),
            "fontSize" => Some(self.font_size.into()),
            "fontFamily" => Some(self.font_family.clone().into()),
            "lineHeight" => Some(self.line_height.into()),
            "width" => Some(self.measure().width.into()),
            "height" => Some(self.measure().height.into()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measure_uses_longest_line() {
        let text = Text::new(Point::ZERO, "ab\nabcd");
        let size = text.measure();
        assert!((size.width - 4.0 * 16.0 * AVERAGE_CHAR_WIDTH).abs() < 1e-9);
        assert!((size.height - 2.0 * 16.0 * 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_fixed_width_wins() {
        let mut text = Text::new(Point::ZERO, "hello");
        text.set_geometry_attr("width", &Value::from(200.0)).unwrap();
        assert!((text.measure().width - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_non_positive_font_size() {
        let mut text = Text::new(Point::ZERO, "x");
        assert!(text.set_geometry_attr("fontSize", &Value::from(0)).is_err());
    }
}
