pub mod endpoints;
pub mod error;
pub mod transport;
pub mod types;

pub use error::ApiError;
pub use transport::{ApiClient, RequestParams, UploadFile};
pub use types::{
    GarmentCategory, GarmentSafetyResponse, GarmentType, HealthResponse, IdmVtonParams,
    ImageUploadResponse, JobOutput, JobStatus, LayeredTryOnRequest, TransformResponse,
    UploadedAsset, VideoGenerationRequest, VideoResponse, VirtualTryOnRequest,
};
