//! Typed bindings for every backend endpoint.
//!
//! The job endpoints are generic over [`JobFamily`]; the named methods
//! below are thin wrappers that fix the family.

use tracing::info;

use super::error::ApiError;
use super::transport::{ApiClient, RequestParams, UploadFile};
use super::types::{
    GarmentSafetyResponse, HealthResponse, ImageUploadResponse, LayeredTryOnRequest,
    TransformResponse, VideoGenerationRequest, VideoResponse, VirtualTryOnRequest,
};
use crate::jobs::{JobFamily, JobSnapshot, LayeredTryOn, TryOn, VideoGeneration};

pub const HEALTH_PATH: &str = "/health";
pub const UPLOAD_HUMAN_PATH: &str = "/api/upload/human/";
pub const UPLOAD_GARMENT_PATH: &str = "/api/upload/tryonitem/";
pub const GARMENT_SAFETY_PATH: &str = "/api/check-garment-safety/";

const JOB_ID: &str = "prediction_id";

impl ApiClient {
    /// Submit a job of family `F`, returning the backend's first snapshot.
    pub async fn submit_job<F: JobFamily>(
        &self,
        request: &F::Request,
    ) -> Result<F::Response, ApiError> {
        let snapshot: F::Response = self.post(F::SUBMIT_PATH, request).await?;
        info!(family = F::NAME, job_id = snapshot.id(), status = %snapshot.status(), "job submitted");
        Ok(snapshot)
    }

    /// Non-blocking status snapshot.
    pub async fn job_status<F: JobFamily>(&self, job_id: &str) -> Result<F::Response, ApiError> {
        self.get(F::STATUS_PATH, &RequestParams::path(JOB_ID, job_id))
            .await
    }

    /// Server-side long-poll until the job is terminal or the backend's own
    /// timeout elapses.
    pub async fn wait_job<F: JobFamily>(&self, job_id: &str) -> Result<F::Response, ApiError> {
        self.get(F::WAIT_PATH, &RequestParams::path(JOB_ID, job_id))
            .await
    }

    pub async fn check_health(&self) -> Result<HealthResponse, ApiError> {
        self.get(HEALTH_PATH, &RequestParams::default()).await
    }

    pub async fn upload_human_image(
        &self,
        file: &UploadFile,
    ) -> Result<ImageUploadResponse, ApiError> {
        self.upload(UPLOAD_HUMAN_PATH, file, "Failed to upload human image")
            .await
    }

    pub async fn upload_garment_image(
        &self,
        file: &UploadFile,
    ) -> Result<ImageUploadResponse, ApiError> {
        self.upload(UPLOAD_GARMENT_PATH, file, "Failed to upload garment image")
            .await
    }

    pub async fn perform_virtual_try_on(
        &self,
        request: &VirtualTryOnRequest,
    ) -> Result<TransformResponse, ApiError> {
        self.submit_job::<TryOn>(request).await
    }

    pub async fn get_virtual_try_on_status(
        &self,
        job_id: &str,
    ) -> Result<TransformResponse, ApiError> {
        self.job_status::<TryOn>(job_id).await
    }

    pub async fn wait_for_virtual_try_on(
        &self,
        job_id: &str,
    ) -> Result<TransformResponse, ApiError> {
        self.wait_job::<TryOn>(job_id).await
    }

    pub async fn perform_layered_try_on(
        &self,
        request: &LayeredTryOnRequest,
    ) -> Result<TransformResponse, ApiError> {
        self.submit_job::<LayeredTryOn>(request).await
    }

    pub async fn get_layered_try_on_status(
        &self,
        job_id: &str,
    ) -> Result<TransformResponse, ApiError> {
        self.job_status::<LayeredTryOn>(job_id).await
    }

    pub async fn wait_for_layered_try_on(
        &self,
        job_id: &str,
    ) -> Result<TransformResponse, ApiError> {
        self.wait_job::<LayeredTryOn>(job_id).await
    }

    pub async fn generate_video(
        &self,
        request: &VideoGenerationRequest,
    ) -> Result<VideoResponse, ApiError> {
        self.submit_job::<VideoGeneration>(request).await
    }

    pub async fn get_video_status(&self, job_id: &str) -> Result<VideoResponse, ApiError> {
        self.job_status::<VideoGeneration>(job_id).await
    }

    pub async fn wait_for_video(&self, job_id: &str) -> Result<VideoResponse, ApiError> {
        self.wait_job::<VideoGeneration>(job_id).await
    }

    /// Content-policy check for a free-text garment description.
    pub async fn check_garment_safety(
        &self,
        garment_description: &str,
    ) -> Result<GarmentSafetyResponse, ApiError> {
        self.get(
            GARMENT_SAFETY_PATH,
            &RequestParams::query("garment_description", garment_description),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::{GarmentType, IdmVtonParams, JobOutput};
    use serde_json::json;
    use wiremock::matchers::{body_json, body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client(server: &MockServer) -> ApiClient {
        ApiClient::with_base_url(server.uri()).unwrap()
    }

    #[tokio::test]
    async fn health_check() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "healthy", "message": "ok", "app_name": "Vizzle"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let health = client(&server).await.check_health().await.unwrap();
        assert_eq!(health.status, "healthy");
        assert_eq!(health.app_name, "Vizzle");
    }

    #[tokio::test]
    async fn http_500_with_detail_surfaces_detail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/virtual-try-on/"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "boom"})))
            .mount(&server)
            .await;

        let req = VirtualTryOnRequest {
            human_img: "h.jpg".into(),
            garm_img: "g.jpg".into(),
            garment_type: GarmentType::AutoDetect,
            use_vision: true,
            params: None,
        };
        let err = client(&server)
            .await
            .perform_virtual_try_on(&req)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[tokio::test]
    async fn http_500_with_garbage_uses_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/virtual-try-on/status/job1"))
            .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
            .mount(&server)
            .await;

        let err = client(&server)
            .await
            .get_virtual_try_on_status("job1")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Request failed");
        assert_eq!(err.status(), Some(500));
    }

    #[tokio::test]
    async fn try_on_submit_sends_full_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/virtual-try-on/"))
            .and(body_json(json!({
                "human_img": "h.jpg",
                "garm_img": "g.jpg",
                "garment_type": "dress",
                "use_vision": false,
                "params": {
                    "category": "dresses",
                    "crop": false,
                    "force_dc": true,
                    "mask_only": false,
                    "steps": 20,
                    "seed": 42
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "job1", "status": "processing", "model_used": "idm-vton"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let req = VirtualTryOnRequest {
            human_img: "h.jpg".into(),
            garm_img: "g.jpg".into(),
            garment_type: GarmentType::Dress,
            use_vision: false,
            params: Some(IdmVtonParams::for_category(
                crate::api::types::GarmentCategory::Dresses,
            )),
        };
        let resp = client(&server)
            .await
            .perform_virtual_try_on(&req)
            .await
            .unwrap();
        assert_eq!(resp.id, "job1");
        assert_eq!(resp.status.as_str(), "processing");
    }

    #[tokio::test]
    async fn wait_endpoints_use_job_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/layered-try-on/wait/L9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "L9", "status": "succeeded", "output": ["a.png"], "model_used": "m"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/generate-video/wait/V1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "V1", "status": "succeeded", "video_url": "v.mp4"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let api = client(&server).await;
        let layered = api.wait_for_layered_try_on("L9").await.unwrap();
        assert_eq!(layered.output, Some(JobOutput::Multiple(vec![json!("a.png")])));
        let video = api.wait_for_video("V1").await.unwrap();
        assert_eq!(video.video_url.as_deref(), Some("v.mp4"));
    }

    #[tokio::test]
    async fn video_status_reports_progress() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/generate-video/status/V1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "V1", "status": "processing", "progress": 55, "estimated_time": 12
            })))
            .mount(&server)
            .await;

        let snap = client(&server).await.get_video_status("V1").await.unwrap();
        assert_eq!(snap.progress, Some(55.0));
        assert_eq!(snap.estimated_time, Some(12.0));
    }

    #[tokio::test]
    async fn garment_safety_encodes_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/check-garment-safety/"))
            .and(query_param("garment_description", "red silk dress"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"allowed": true, "message": "Garment is allowed"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let resp = client(&server)
            .await
            .check_garment_safety("red silk dress")
            .await
            .unwrap();
        assert!(resp.allowed);
    }

    #[tokio::test]
    async fn uploads_are_multipart_file_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/upload/human/"))
            .and(body_string_contains("name=\"file\""))
            .and(body_string_contains("filename=\"me.png\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "url": "h.jpg", "public_id": "h1", "message": "uploaded"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let file = UploadFile::new("me.png", b"fakepng".to_vec());
        let resp = client(&server)
            .await
            .upload_human_image(&file)
            .await
            .unwrap();
        assert_eq!(resp.url, "h.jpg");
        assert_eq!(resp.public_id, "h1");
    }

    #[tokio::test]
    async fn garment_upload_failure_uses_endpoint_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/upload/tryonitem/"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "nope"})))
            .mount(&server)
            .await;

        let file = UploadFile::new("shirt.jpg", vec![1, 2, 3]);
        let err = client(&server)
            .await
            .upload_garment_image(&file)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to upload garment image");
    }
}
