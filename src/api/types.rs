//! Request and response shapes for the Vizzle backend.
//!
//! Field names follow the backend's JSON exactly. Optional request fields
//! are omitted when unset rather than sent as `null`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Garment category understood by the try-on model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GarmentCategory {
    #[default]
    UpperBody,
    LowerBody,
    Dresses,
    Accessories,
}

impl GarmentCategory {
    pub const ALL: [GarmentCategory; 4] = [
        GarmentCategory::UpperBody,
        GarmentCategory::LowerBody,
        GarmentCategory::Dresses,
        GarmentCategory::Accessories,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            GarmentCategory::UpperBody => "upper_body",
            GarmentCategory::LowerBody => "lower_body",
            GarmentCategory::Dresses => "dresses",
            GarmentCategory::Accessories => "accessories",
        }
    }
}

impl fmt::Display for GarmentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GarmentCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown garment category: {s}"))
    }
}

/// Closed vocabulary of garment types. `AutoDetect` lets the backend decide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GarmentType {
    #[serde(rename = "shirt")]
    Shirt,
    #[serde(rename = "t-shirt")]
    TShirt,
    #[serde(rename = "blouse")]
    Blouse,
    #[serde(rename = "sweater")]
    Sweater,
    #[serde(rename = "hoodie")]
    Hoodie,
    #[serde(rename = "jacket")]
    Jacket,
    #[serde(rename = "coat")]
    Coat,
    #[serde(rename = "blazer")]
    Blazer,
    #[serde(rename = "cardigan")]
    Cardigan,
    #[serde(rename = "tank_top")]
    TankTop,
    #[serde(rename = "crop_top")]
    CropTop,
    #[serde(rename = "pants")]
    Pants,
    #[serde(rename = "jeans")]
    Jeans,
    #[serde(rename = "trousers")]
    Trousers,
    #[serde(rename = "shorts")]
    Shorts,
    #[serde(rename = "skirt")]
    Skirt,
    #[serde(rename = "leggings")]
    Leggings,
    #[serde(rename = "dress")]
    Dress,
    #[serde(rename = "jumpsuit")]
    Jumpsuit,
    #[serde(rename = "overalls")]
    Overalls,
    #[serde(rename = "hat")]
    Hat,
    #[serde(rename = "glasses")]
    Glasses,
    #[serde(rename = "necklace")]
    Necklace,
    #[serde(rename = "earrings")]
    Earrings,
    #[serde(rename = "watch")]
    Watch,
    #[serde(rename = "bracelet")]
    Bracelet,
    #[serde(rename = "ring")]
    Ring,
    #[serde(rename = "bag")]
    Bag,
    #[serde(rename = "scarf")]
    Scarf,
    #[serde(rename = "accessory")]
    Accessory,
    #[default]
    #[serde(rename = "auto_detect")]
    AutoDetect,
}

const GARMENT_TYPES: &[(GarmentType, &str)] = &[
    (GarmentType::Shirt, "shirt"),
    (GarmentType::TShirt, "t-shirt"),
    (GarmentType::Blouse, "blouse"),
    (GarmentType::Sweater, "sweater"),
    (GarmentType::Hoodie, "hoodie"),
    (GarmentType::Jacket, "jacket"),
    (GarmentType::Coat, "coat"),
    (GarmentType::Blazer, "blazer"),
    (GarmentType::Cardigan, "cardigan"),
    (GarmentType::TankTop, "tank_top"),
    (GarmentType::CropTop, "crop_top"),
    (GarmentType::Pants, "pants"),
    (GarmentType::Jeans, "jeans"),
    (GarmentType::Trousers, "trousers"),
    (GarmentType::Shorts, "shorts"),
    (GarmentType::Skirt, "skirt"),
    (GarmentType::Leggings, "leggings"),
    (GarmentType::Dress, "dress"),
    (GarmentType::Jumpsuit, "jumpsuit"),
    (GarmentType::Overalls, "overalls"),
    (GarmentType::Hat, "hat"),
    (GarmentType::Glasses, "glasses"),
    (GarmentType::Necklace, "necklace"),
    (GarmentType::Earrings, "earrings"),
    (GarmentType::Watch, "watch"),
    (GarmentType::Bracelet, "bracelet"),
    (GarmentType::Ring, "ring"),
    (GarmentType::Bag, "bag"),
    (GarmentType::Scarf, "scarf"),
    (GarmentType::Accessory, "accessory"),
    (GarmentType::AutoDetect, "auto_detect"),
];

impl GarmentType {
    pub fn as_str(self) -> &'static str {
        GARMENT_TYPES
            .iter()
            .find(|(t, _)| *t == self)
            .map(|(_, s)| *s)
            .unwrap_or("auto_detect")
    }

    /// Every token in wire order, for help text.
    pub fn tokens() -> impl Iterator<Item = &'static str> {
        GARMENT_TYPES.iter().map(|(_, s)| *s)
    }
}

impl fmt::Display for GarmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GarmentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GARMENT_TYPES
            .iter()
            .find(|(_, token)| *token == s)
            .map(|(t, _)| *t)
            .ok_or_else(|| format!("unknown garment type: {s}"))
    }
}

/// Fine-tune parameters for the IDM-VTON model, passed through as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdmVtonParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub garment_des: Option<String>,
    pub category: GarmentCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask_img: Option<String>,
    pub crop: bool,
    pub force_dc: bool,
    pub mask_only: bool,
    pub steps: u32,
    pub seed: i64,
}

impl IdmVtonParams {
    /// Defaults used by the try-on screens: dresses force DC mode.
    pub fn for_category(category: GarmentCategory) -> Self {
        Self {
            garment_des: None,
            category,
            mask_img: None,
            crop: false,
            force_dc: category == GarmentCategory::Dresses,
            mask_only: false,
            steps: 20,
            seed: 42,
        }
    }
}

impl Default for IdmVtonParams {
    fn default() -> Self {
        Self::for_category(GarmentCategory::default())
    }
}

/// Result of a human or garment upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUploadResponse {
    pub url: String,
    pub public_id: String,
    #[serde(default)]
    pub message: String,
}

/// An uploaded image kept in memory until the session is reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedAsset {
    pub url: String,
    pub public_id: String,
}

impl From<ImageUploadResponse> for UploadedAsset {
    fn from(r: ImageUploadResponse) -> Self {
        Self {
            url: r.url,
            public_id: r.public_id,
        }
    }
}

/// Backend job status token. Compared for equality only, never parsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobStatus(pub String);

impl JobStatus {
    pub const SUCCEEDED: &'static str = "succeeded";
    pub const FAILED: &'static str = "failed";

    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_succeeded(&self) -> bool {
        self.0 == Self::SUCCEEDED
    }

    pub fn is_failed(&self) -> bool {
        self.0 == Self::FAILED
    }

    pub fn is_terminal(&self) -> bool {
        self.is_succeeded() || self.is_failed()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The loosely-typed `output` field: one URL or a list of candidates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobOutput {
    Single(String),
    Multiple(Vec<Value>),
}

impl JobOutput {
    /// The representative artifact URL: the value itself, or the first
    /// string element of a list.
    pub fn primary(&self) -> Option<&str> {
        let url = match self {
            JobOutput::Single(url) => Some(url.as_str()),
            JobOutput::Multiple(items) => items.first().and_then(Value::as_str),
        };
        url.filter(|url| !url.is_empty())
    }
}

/// Snapshot of a try-on or layered try-on job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformResponse {
    pub id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub output: Option<JobOutput>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub model_used: String,
}

/// Snapshot of a video generation job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoResponse {
    pub id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub estimated_time: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualTryOnRequest {
    pub human_img: String,
    pub garm_img: String,
    pub garment_type: GarmentType,
    pub use_vision: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<IdmVtonParams>,
}

/// Composites another garment onto a previous result image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayeredTryOnRequest {
    pub result_img: String,
    pub garm_img: String,
    pub garment_type: GarmentType,
    pub use_vision: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<IdmVtonParams>,
}

pub const MIN_VIDEO_DURATION: u32 = 2;
pub const MAX_VIDEO_DURATION: u32 = 10;
pub const MIN_VIDEO_FPS: u32 = 12;
pub const MAX_VIDEO_FPS: u32 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoGenerationRequest {
    pub image_url: String,
    pub motion_type: String,
    /// Seconds, within [2, 10].
    pub duration: u32,
    /// Frames per second, within [12, 30].
    pub fps: u32,
}

impl VideoGenerationRequest {
    /// Check the numeric bounds the backend documents.
    pub fn validate(&self) -> Result<(), String> {
        if self.image_url.trim().is_empty() {
            return Err("Please complete a try-on first".to_string());
        }
        if !(MIN_VIDEO_DURATION..=MAX_VIDEO_DURATION).contains(&self.duration) {
            return Err(format!(
                "duration must be between {MIN_VIDEO_DURATION} and {MAX_VIDEO_DURATION} seconds, got {}",
                self.duration
            ));
        }
        if !(MIN_VIDEO_FPS..=MAX_VIDEO_FPS).contains(&self.fps) {
            return Err(format!(
                "fps must be between {MIN_VIDEO_FPS} and {MAX_VIDEO_FPS}, got {}",
                self.fps
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub app_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GarmentSafetyResponse {
    pub allowed: bool,
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn garment_type_tokens_match_serde() {
        for token in GarmentType::tokens() {
            let parsed: GarmentType = token.parse().unwrap();
            assert_eq!(serde_json::to_value(parsed).unwrap(), json!(token));
            assert_eq!(parsed.to_string(), token);
        }
        assert_eq!(GarmentType::tokens().count(), 31);
    }

    #[test]
    fn garment_type_rejects_unknown() {
        assert!("poncho".parse::<GarmentType>().is_err());
    }

    #[test]
    fn category_parses_and_serializes() {
        let c: GarmentCategory = "lower_body".parse().unwrap();
        assert_eq!(c, GarmentCategory::LowerBody);
        assert_eq!(serde_json::to_value(c).unwrap(), json!("lower_body"));
        assert!("hats".parse::<GarmentCategory>().is_err());
    }

    #[test]
    fn params_defaults_force_dc_for_dresses() {
        let p = IdmVtonParams::for_category(GarmentCategory::Dresses);
        assert!(p.force_dc);
        assert_eq!(p.steps, 20);
        assert_eq!(p.seed, 42);
        assert!(!IdmVtonParams::default().force_dc);
    }

    #[test]
    fn optional_fields_are_omitted() {
        let req = VirtualTryOnRequest {
            human_img: "h.jpg".into(),
            garm_img: "g.jpg".into(),
            garment_type: GarmentType::TShirt,
            use_vision: true,
            params: None,
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(
            v,
            json!({
                "human_img": "h.jpg",
                "garm_img": "g.jpg",
                "garment_type": "t-shirt",
                "use_vision": true
            })
        );

        let p = serde_json::to_value(IdmVtonParams::default()).unwrap();
        assert!(p.get("garment_des").is_none());
        assert!(p.get("mask_img").is_none());
        assert_eq!(p["category"], "upper_body");
    }

    #[test]
    fn output_single_or_multiple() {
        let single: TransformResponse = serde_json::from_value(json!({
            "id": "j", "status": "succeeded", "output": "result.jpg", "model_used": "idm"
        }))
        .unwrap();
        assert_eq!(single.output.unwrap().primary(), Some("result.jpg"));

        let many: TransformResponse = serde_json::from_value(json!({
            "id": "j", "status": "succeeded", "output": ["urlA", "urlB"], "model_used": "idm"
        }))
        .unwrap();
        assert_eq!(many.output.unwrap().primary(), Some("urlA"));
    }

    #[test]
    fn output_missing_or_empty() {
        let none: TransformResponse =
            serde_json::from_value(json!({"id": "j", "status": "processing"})).unwrap();
        assert!(none.output.is_none());
        assert_eq!(JobOutput::Multiple(vec![]).primary(), None);
        assert_eq!(JobOutput::Multiple(vec![json!(7)]).primary(), None);
        assert_eq!(JobOutput::Single(String::new()).primary(), None);
    }

    #[test]
    fn status_tokens_compare_by_equality() {
        assert!(JobStatus::new("succeeded").is_terminal());
        assert!(JobStatus::new("failed").is_failed());
        assert!(!JobStatus::new("processing").is_terminal());
        assert!(!JobStatus::new("Succeeded").is_succeeded());
    }

    #[test]
    fn video_bounds() {
        let mut req = VideoGenerationRequest {
            image_url: "r.jpg".into(),
            motion_type: "subtle_walk".into(),
            duration: 3,
            fps: 24,
        };
        assert!(req.validate().is_ok());
        req.duration = 15;
        assert!(req.validate().unwrap_err().contains("duration"));
        req.duration = 10;
        req.fps = 11;
        assert!(req.validate().unwrap_err().contains("fps"));
        req.fps = 30;
        req.image_url = " ".into();
        assert!(req.validate().is_err());
    }

    #[test]
    fn video_response_nullable_fields() {
        let v: VideoResponse = serde_json::from_value(json!({
            "id": "v1", "status": "processing", "video_url": null, "progress": 40.5, "estimated_time": null
        }))
        .unwrap();
        assert_eq!(v.progress, Some(40.5));
        assert!(v.video_url.is_none());
        assert!(v.estimated_time.is_none());
    }
}
