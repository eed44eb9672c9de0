//! Orchestration of a try-on session.
//!
//! A [`TryOnSession`] owns the uploaded assets and one [`JobTracker`] per
//! job family, and sequences upload → submit → wait → result for each.
//! Methods take `&self` so uploads can run concurrently and a reset can
//! land while a `wait` is still outstanding. In-flight calls are never
//! cancelled on the backend; a reset bumps the session epoch, stops
//! listening to outstanding calls (the progress poller included) and any
//! result that comes back for an older epoch is discarded.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info};
use uuid::Uuid;

use crate::api::{
    ApiClient, GarmentCategory, GarmentType, IdmVtonParams, LayeredTryOnRequest, UploadFile,
    UploadedAsset, VideoGenerationRequest, VideoResponse, VirtualTryOnRequest,
};
use crate::jobs::{
    Event, JobError, JobFamily, JobFlags, JobRecord, JobSnapshot, JobTracker, LayeredTryOn,
    MIN_POLL_INTERVAL, Stage, Transition, TryOn, VideoGeneration, resolve, wait_with_progress,
};
use crate::store::Handoff;

/// Default period of the advisory video progress poller.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(2);

const NEEDS_RESULT: &str = "Please complete a try-on first";
const NEEDS_LAYER_INPUTS: &str = "Please complete a try-on first and upload another garment";

/// User choices for a try-on or layering request.
#[derive(Debug, Clone, PartialEq)]
pub struct TryOnOptions {
    pub garment_type: GarmentType,
    pub use_vision: bool,
    pub params: Option<IdmVtonParams>,
}

impl TryOnOptions {
    pub fn new(garment_type: GarmentType, category: GarmentCategory) -> Self {
        Self {
            garment_type,
            use_vision: true,
            params: Some(IdmVtonParams::for_category(category)),
        }
    }

    /// Layering defaults to vision assist off.
    pub fn for_layering(garment_type: GarmentType, category: GarmentCategory) -> Self {
        Self {
            use_vision: false,
            ..Self::new(garment_type, category)
        }
    }
}

impl Default for TryOnOptions {
    fn default() -> Self {
        Self::new(GarmentType::AutoDetect, GarmentCategory::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoOptions {
    pub motion_type: String,
    pub duration: u32,
    pub fps: u32,
}

impl Default for VideoOptions {
    fn default() -> Self {
        Self {
            motion_type: "subtle_walk".to_string(),
            duration: 3,
            fps: 24,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Human,
    Garment,
}

#[derive(Debug, Clone, Default)]
struct UploadSlot {
    uploading: bool,
    asset: Option<UploadedAsset>,
    error: Option<String>,
}

#[derive(Debug, Default)]
struct SessionState {
    epoch: u64,
    human: UploadSlot,
    garment: UploadSlot,
    try_on: JobTracker<TryOn>,
    layered: JobTracker<LayeredTryOn>,
    video: JobTracker<VideoGeneration>,
    result_image: Option<String>,
    result_garment: Option<String>,
    video_url: Option<String>,
}

impl SessionState {
    fn slot_mut(&mut self, slot: Slot) -> &mut UploadSlot {
        match slot {
            Slot::Human => &mut self.human,
            Slot::Garment => &mut self.garment,
        }
    }

    fn uploading(&self) -> bool {
        self.human.uploading || self.garment.uploading
    }

    // A garment uploaded on top of an existing composite is for layering.
    fn note_upload_started(&mut self, slot: Slot) -> Transition {
        if slot == Slot::Garment && self.result_image.is_some() {
            self.layered.next(Event::UploadStarted)
        } else {
            self.try_on.next(Event::UploadStarted)
        }
    }

    fn note_upload_failed(&mut self, reason: &str) {
        if self.try_on.stage == Stage::UploadingAssets {
            self.try_on.next(Event::Errored(reason.to_string()));
        }
        if self.layered.stage == Stage::UploadingAssets {
            self.layered.next(Event::Errored(reason.to_string()));
        }
    }
}

/// Snapshot of session state for a presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionView {
    pub session_id: String,
    pub uploading: bool,
    pub upload_error: Option<String>,
    pub human: Option<UploadedAsset>,
    pub garment: Option<UploadedAsset>,
    pub try_on: JobFlags,
    pub layered: JobFlags,
    pub video: JobFlags,
    pub result_image: Option<String>,
    pub video_url: Option<String>,
}

impl SessionView {
    /// True while any upload, submission or wait is outstanding.
    pub fn busy(&self) -> bool {
        self.uploading
            || [&self.try_on, &self.layered, &self.video]
                .iter()
                .any(|f| f.processing || f.polling)
    }
}

/// One user's try-on session against the backend.
#[derive(Debug)]
pub struct TryOnSession {
    client: ApiClient,
    id: String,
    progress_interval: Duration,
    state: Mutex<SessionState>,
    // Current epoch, published so outstanding calls can stop on reset.
    resets: watch::Sender<u64>,
}

impl TryOnSession {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            id: Uuid::new_v4().to_string(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            state: Mutex::new(SessionState::default()),
            resets: watch::Sender::new(0),
        }
    }

    /// Period of the video progress poller, raised to at least
    /// [`MIN_POLL_INTERVAL`].
    pub fn with_progress_interval(mut self, every: Duration) -> Self {
        self.progress_interval = every.max(MIN_POLL_INTERVAL);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `call` unless the session is reset first. On reset the call is
    /// dropped and [`JobError::Superseded`] returned.
    async fn until_reset<T>(&self, epoch: u64, call: impl Future<Output = T>) -> Result<T, JobError> {
        let mut resets = self.resets.subscribe();
        if *resets.borrow_and_update() != epoch {
            return Err(JobError::Superseded);
        }
        tokio::select! {
            out = call => Ok(out),
            _ = resets.changed() => {
                debug!(session = %self.id, epoch, "stopped listening after reset");
                Err(JobError::Superseded)
            }
        }
    }

    pub async fn upload_human(&self, file: &UploadFile) -> Result<UploadedAsset, JobError> {
        self.upload(Slot::Human, file).await
    }

    pub async fn upload_garment(&self, file: &UploadFile) -> Result<UploadedAsset, JobError> {
        self.upload(Slot::Garment, file).await
    }

    async fn upload(&self, slot: Slot, file: &UploadFile) -> Result<UploadedAsset, JobError> {
        let epoch = {
            let mut s = self.lock();
            let target = s.slot_mut(slot);
            target.uploading = true;
            target.error = None;
            if let Transition::Rejected { from, event } = s.note_upload_started(slot) {
                debug!(%from, event, "upload started while a job is in flight");
            }
            s.epoch
        };

        let response = match slot {
            Slot::Human => {
                self.until_reset(epoch, self.client.upload_human_image(file))
                    .await?
            }
            Slot::Garment => {
                self.until_reset(epoch, self.client.upload_garment_image(file))
                    .await?
            }
        };

        let mut s = self.lock();
        if s.epoch != epoch {
            return Err(JobError::Superseded);
        }
        let target = s.slot_mut(slot);
        target.uploading = false;
        match response {
            Ok(response) => {
                let asset = UploadedAsset::from(response);
                info!(?slot, url = %asset.url, "image uploaded");
                target.asset = Some(asset.clone());
                Ok(asset)
            }
            Err(e) => {
                let reason = e.to_string();
                target.error = Some(reason.clone());
                s.note_upload_failed(&reason);
                Err(e.into())
            }
        }
    }

    /// Submit a try-on with the uploaded human and garment images and wait
    /// for the composite.
    pub async fn try_on(&self, options: &TryOnOptions) -> Result<String, JobError> {
        let (epoch, request) = {
            let mut s = self.lock();
            ensure_not_running(&s.try_on)?;
            let assets = match (&s.human.asset, &s.garment.asset) {
                (Some(h), Some(g)) if !s.uploading() => Some((h.url.clone(), g.url.clone())),
                _ => None,
            };
            let Some((human_img, garm_img)) = assets else {
                return Err(fail_precondition(
                    &mut s.try_on,
                    "Please upload both human and garment images",
                ));
            };
            start_submit(&mut s.try_on)?;
            let request = VirtualTryOnRequest {
                human_img,
                garm_img,
                garment_type: options.garment_type,
                use_vision: options.use_vision,
                params: options.params.clone(),
            };
            (s.epoch, request)
        };

        let garment = request.garm_img.clone();
        let url = self
            .drive::<TryOn, _>(epoch, &request, |s| &mut s.try_on, None, |_| {})
            .await?;
        self.adopt_composite(epoch, &url, garment)?;
        Ok(url)
    }

    /// Composite a newly uploaded garment onto the current result image.
    pub async fn layer(&self, options: &TryOnOptions) -> Result<String, JobError> {
        let (epoch, request) = {
            let mut s = self.lock();
            ensure_not_running(&s.layered)?;
            let inputs = match (&s.result_image, &s.garment.asset) {
                (Some(result), Some(g))
                    if !s.garment.uploading && s.result_garment.as_deref() != Some(g.url.as_str()) =>
                {
                    Some((result.clone(), g.url.clone()))
                }
                _ => None,
            };
            let Some((result_img, garm_img)) = inputs else {
                return Err(fail_precondition(&mut s.layered, NEEDS_LAYER_INPUTS));
            };
            start_submit(&mut s.layered)?;
            let request = LayeredTryOnRequest {
                result_img,
                garm_img,
                garment_type: options.garment_type,
                use_vision: options.use_vision,
                params: options.params.clone(),
            };
            (s.epoch, request)
        };

        let garment = request.garm_img.clone();
        let url = self
            .drive::<LayeredTryOn, _>(epoch, &request, |s| &mut s.layered, None, |_| {})
            .await?;
        self.adopt_composite(epoch, &url, garment)?;
        Ok(url)
    }

    /// Animate the current result image. `on_progress` receives each
    /// advisory status snapshot while the wait is outstanding.
    pub async fn generate_video<P>(
        &self,
        options: &VideoOptions,
        on_progress: P,
    ) -> Result<String, JobError>
    where
        P: FnMut(&VideoResponse),
    {
        let (epoch, request) = {
            let mut s = self.lock();
            ensure_not_running(&s.video)?;
            let Some(image_url) = s.result_image.clone() else {
                return Err(fail_precondition(&mut s.video, NEEDS_RESULT));
            };
            let request = VideoGenerationRequest {
                image_url,
                motion_type: options.motion_type.clone(),
                duration: options.duration,
                fps: options.fps,
            };
            if let Err(reason) = request.validate() {
                return Err(fail_precondition(&mut s.video, &reason));
            }
            start_submit(&mut s.video)?;
            (s.epoch, request)
        };

        let every = self.progress_interval;
        let url = self
            .drive::<VideoGeneration, _>(
                epoch,
                &request,
                |s| &mut s.video,
                Some(every),
                on_progress,
            )
            .await?;

        let mut s = self.lock();
        if s.epoch != epoch {
            return Err(JobError::Superseded);
        }
        s.video_url = Some(url.clone());
        Ok(url)
    }

    /// Submit, wait and resolve one job. The tracker must already be in
    /// SUBMITTED.
    async fn drive<F, P>(
        &self,
        epoch: u64,
        request: &F::Request,
        tracker: fn(&mut SessionState) -> &mut JobTracker<F>,
        poll_every: Option<Duration>,
        mut on_progress: P,
    ) -> Result<String, JobError>
    where
        F: JobFamily,
        P: FnMut(&F::Response),
    {
        let submitted = self
            .until_reset(epoch, self.client.submit_job::<F>(request))
            .await?;
        let job_id = {
            let mut s = self.lock();
            if s.epoch != epoch {
                return Err(JobError::Superseded);
            }
            match submitted {
                Ok(snapshot) => {
                    let job_id = snapshot.id().to_string();
                    tracker(&mut s).next(Event::Accepted(snapshot));
                    job_id
                }
                Err(e) => {
                    tracker(&mut s).next(Event::Errored(e.to_string()));
                    return Err(e.into());
                }
            }
        };

        let waited = match poll_every {
            Some(every) => {
                let waiting =
                    wait_with_progress::<F, _>(&self.client, &job_id, every, |snapshot| {
                        {
                            let mut s = self.lock();
                            if s.epoch != epoch {
                                return;
                            }
                            tracker(&mut s).next(Event::Progress(snapshot.clone()));
                        }
                        on_progress(snapshot);
                    });
                self.until_reset(epoch, waiting).await?
            }
            None => {
                self.until_reset(epoch, self.client.wait_job::<F>(&job_id))
                    .await?
            }
        };

        let mut s = self.lock();
        if s.epoch != epoch {
            debug!(family = F::NAME, %job_id, "discarding result after reset");
            return Err(JobError::Superseded);
        }
        match waited {
            Ok(snapshot) => {
                let resolved = resolve::<F>(&snapshot);
                tracker(&mut s).next(Event::Finished(snapshot));
                match &resolved {
                    Ok(url) => info!(family = F::NAME, %job_id, %url, "job succeeded"),
                    Err(e) => info!(family = F::NAME, %job_id, error = %e, "job failed"),
                }
                resolved
            }
            Err(e) => {
                tracker(&mut s).next(Event::Errored(e.to_string()));
                Err(e.into())
            }
        }
    }

    fn adopt_composite(&self, epoch: u64, url: &str, garment: String) -> Result<(), JobError> {
        let mut s = self.lock();
        if s.epoch != epoch {
            return Err(JobError::Superseded);
        }
        s.result_image = Some(url.to_string());
        s.result_garment = Some(garment);
        s.video_url = None;
        Ok(())
    }

    /// Return every job family and upload to its initial state. Outstanding
    /// calls stop being listened to and resolve to [`JobError::Superseded`].
    pub fn reset(&self) {
        let mut s = self.lock();
        let epoch = s.epoch + 1;
        *s = SessionState {
            epoch,
            ..SessionState::default()
        };
        self.resets.send_replace(epoch);
        info!(session = %self.id, epoch, "session reset");
    }

    /// Fail fast when there is no result image to layer onto, so callers
    /// can skip uploading a garment that cannot be used.
    pub fn ensure_layer_base(&self) -> Result<(), JobError> {
        let mut s = self.lock();
        if s.result_image.is_some() {
            return Ok(());
        }
        Err(fail_precondition(&mut s.layered, NEEDS_LAYER_INPUTS))
    }

    /// Continue from results produced earlier (another run or screen).
    pub fn resume(&self, handoff: &Handoff) {
        let mut s = self.lock();
        s.result_image = handoff.result_image.clone();
        s.result_garment = handoff.garment_image.clone();
        s.video_url = handoff.video_url.clone();
    }

    pub fn handoff(&self) -> Handoff {
        let s = self.lock();
        Handoff {
            result_image: s.result_image.clone(),
            garment_image: s.result_garment.clone(),
            video_url: s.video_url.clone(),
        }
    }

    pub fn view(&self) -> SessionView {
        let s = self.lock();
        SessionView {
            session_id: self.id.clone(),
            uploading: s.uploading(),
            upload_error: s.human.error.clone().or_else(|| s.garment.error.clone()),
            human: s.human.asset.clone(),
            garment: s.garment.asset.clone(),
            try_on: s.try_on.flags(),
            layered: s.layered.flags(),
            video: s.video.flags(),
            result_image: s.result_image.clone(),
            video_url: s.video_url.clone(),
        }
    }

    /// Records for every job family that has left IDLE.
    pub fn records(&self) -> Vec<JobRecord> {
        let s = self.lock();
        [
            (s.try_on.stage, JobRecord::from_tracker(&s.try_on)),
            (s.layered.stage, JobRecord::from_tracker(&s.layered)),
            (s.video.stage, JobRecord::from_tracker(&s.video)),
        ]
        .into_iter()
        .filter(|(stage, _)| *stage != Stage::Idle)
        .map(|(_, record)| record)
        .collect()
    }
}

fn fail_precondition<F: JobFamily>(tracker: &mut JobTracker<F>, reason: &str) -> JobError {
    tracker.next(Event::Errored(reason.to_string()));
    JobError::Precondition(reason.to_string())
}

// One attempt per family at a time; the running attempt keeps its tracker.
fn ensure_not_running<F: JobFamily>(tracker: &JobTracker<F>) -> Result<(), JobError> {
    match tracker.stage {
        Stage::Submitted | Stage::Waiting => {
            debug!(family = F::NAME, stage = %tracker.stage, "submission refused, attempt in flight");
            Err(already_running::<F>())
        }
        _ => Ok(()),
    }
}

fn start_submit<F: JobFamily>(tracker: &mut JobTracker<F>) -> Result<(), JobError> {
    match tracker.next(Event::SubmitStarted) {
        Transition::Rejected { .. } => Err(already_running::<F>()),
        _ => Ok(()),
    }
}

fn already_running<F: JobFamily>() -> JobError {
    JobError::Precondition(format!("A {} job is already in progress", F::NAME))
}
