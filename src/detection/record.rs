use crate::error::DetectorError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One recognized object returned by the detection service.
///
/// Records are produced only by [`DetectionResponse::from_json`] and never
/// modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub name: String,
    pub confidence: f64,
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

/// Three-state summary of where the cat was last seen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorColor {
    #[default]
    Black,
    Red,
    Green,
}

impl IndicatorColor {
    /// Map the service's `cat_stay` field onto a color.
    pub fn from_cat_stay(cat_stay: Option<&str>) -> Self {
        match cat_stay {
            Some("sofa") => IndicatorColor::Red,
            Some("table") => IndicatorColor::Green,
            _ => IndicatorColor::Black,
        }
    }

    /// CSS color name
    pub fn as_str(&self) -> &'static str {
        match self {
            IndicatorColor::Black => "black",
            IndicatorColor::Red => "red",
            IndicatorColor::Green => "green",
        }
    }
}

/// Fully parsed body of a successful `/detect` reply
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionResponse {
    pub detections: Vec<Detection>,
    pub cat_stay: Option<String>,
}

#[derive(Deserialize)]
struct RawResponse {
    detections: Value,
    #[serde(default)]
    cat_stay: Option<Value>,
}

impl DetectionResponse {
    /// Parse a response body.
    ///
    /// `detections` is a string holding a JSON array, so the body is decoded
    /// twice. Any failure rejects the whole body.
    pub fn from_json(body: &str) -> Result<Self, DetectorError> {
        let raw: RawResponse =
            serde_json::from_str(body).map_err(|e| DetectorError::Malformed {
                details: format!("invalid JSON body: {}", e),
            })?;

        let encoded = match raw.detections {
            Value::String(encoded) => encoded,
            other => {
                return Err(DetectorError::Malformed {
                    details: format!("'detections' must be a string, got {}", json_kind(&other)),
                })
            }
        };

        let detections: Vec<Detection> =
            serde_json::from_str(&encoded).map_err(|e| DetectorError::Malformed {
                details: format!("invalid 'detections' payload: {}", e),
            })?;

        // Non-string values are treated like a missing field
        let cat_stay = match raw.cat_stay {
            Some(Value::String(place)) => Some(place),
            _ => None,
        };

        Ok(Self {
            detections,
            cat_stay,
        })
    }

    pub fn indicator(&self) -> IndicatorColor {
        IndicatorColor::from_cat_stay(self.cat_stay.as_deref())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAT_ON_SOFA: &str = r#"{"detections":"[{\"name\":\"cat\",\"confidence\":0.87,\"xmin\":10,\"ymin\":20,\"xmax\":100,\"ymax\":200}]","cat_stay":"sofa"}"#;

    #[test]
    fn test_parse_single_detection() {
        let response = DetectionResponse::from_json(CAT_ON_SOFA).unwrap();

        assert_eq!(
            response.detections,
            vec![Detection {
                name: "cat".to_string(),
                confidence: 0.87,
                xmin: 10.0,
                ymin: 20.0,
                xmax: 100.0,
                ymax: 200.0,
            }]
        );
        assert_eq!(response.cat_stay.as_deref(), Some("sofa"));
        assert_eq!(response.indicator(), IndicatorColor::Red);
    }

    #[test]
    fn test_parse_ignores_extra_fields() {
        let body = r#"{
            "detections": "[{\"xmin\":1.5,\"ymin\":2.5,\"xmax\":3.5,\"ymax\":4.5,\"confidence\":0.5,\"class\":15,\"name\":\"cat\"}]",
            "image_path": "img/captured/20240101_120000.jpg",
            "processed_image_path": "img/processed/processed_20240101_120000.jpg",
            "cat_stay": "table"
        }"#;

        let response = DetectionResponse::from_json(body).unwrap();
        assert_eq!(response.detections.len(), 1);
        assert_eq!(response.detections[0].xmin, 1.5);
        assert_eq!(response.indicator(), IndicatorColor::Green);
    }

    #[test]
    fn test_parse_empty_detections() {
        let response =
            DetectionResponse::from_json(r#"{"detections":"[]","cat_stay":"none"}"#).unwrap();
        assert!(response.detections.is_empty());
        assert_eq!(response.indicator(), IndicatorColor::Black);
    }

    #[test]
    fn test_indicator_mapping() {
        assert_eq!(IndicatorColor::from_cat_stay(Some("sofa")), IndicatorColor::Red);
        assert_eq!(IndicatorColor::from_cat_stay(Some("table")), IndicatorColor::Green);
        assert_eq!(IndicatorColor::from_cat_stay(Some("elsewhere")), IndicatorColor::Black);
        assert_eq!(IndicatorColor::from_cat_stay(Some("Sofa")), IndicatorColor::Black);
        assert_eq!(IndicatorColor::from_cat_stay(None), IndicatorColor::Black);
    }

    #[test]
    fn test_missing_or_non_string_cat_stay_is_black() {
        let missing = DetectionResponse::from_json(r#"{"detections":"[]"}"#).unwrap();
        assert_eq!(missing.indicator(), IndicatorColor::Black);

        let numeric = DetectionResponse::from_json(r#"{"detections":"[]","cat_stay":3}"#).unwrap();
        assert_eq!(numeric.cat_stay, None);
        assert_eq!(numeric.indicator(), IndicatorColor::Black);
    }

    #[test]
    fn test_malformed_bodies_are_rejected() {
        let bodies = [
            "not json",
            r#"{"error":"No image part in the request"}"#,
            r#"{"detections":[],"cat_stay":"sofa"}"#,
            r#"{"detections":"not an array","cat_stay":"sofa"}"#,
            r#"{"detections":"[{\"name\":\"cat\"}]","cat_stay":"sofa"}"#,
        ];

        for body in bodies {
            match DetectionResponse::from_json(body) {
                Err(DetectorError::Malformed { .. }) => {}
                other => panic!("Expected malformed error for {body}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_indicator_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&IndicatorColor::Green).unwrap(), "\"green\"");
        assert_eq!(IndicatorColor::default(), IndicatorColor::Black);
    }
}
