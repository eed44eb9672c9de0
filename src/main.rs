mod cli;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command, FamilyArg, GarmentArgs, VideoArgs};
use ui::JobProgress;
use vizzle::api::{ApiClient, IdmVtonParams, UploadFile};
use vizzle::config::VizzleConfig;
use vizzle::jobs::{LayeredTryOn, TryOn, VideoGeneration};
use vizzle::session::{TryOnOptions, TryOnSession, VideoOptions};
use vizzle::store::{Handoff, JsonFileStore};
use vizzle::VizzleError;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = VizzleConfig::load()?;
    if let Some(url) = &cli.base_url {
        config.apply_base_url(url)?;
    }
    let store = JsonFileStore::new(&config.state_file);
    let client = config.client()?;

    match cli.command {
        Command::Health => {
            let health = client.check_health().await?;
            println!("{} is {}: {}", health.app_name, health.status, health.message);
        }
        Command::Safety { description } => {
            let verdict = client.check_garment_safety(&description).await?;
            let label = if verdict.allowed { "allowed" } else { "not allowed" };
            println!("{label}: {}", verdict.message);
        }
        Command::Status { family, id } => print_status(&client, family, &id).await?,
        Command::Reset => {
            Handoff::clear(&store, &config.user_id)?;
            println!("Cleared saved results in {}", store.path().display());
        }
        Command::TryOn {
            human,
            garment,
            garment_args,
            no_vision,
            video,
            video_args,
        } => {
            let session = new_session(client, &config);
            let progress = JobProgress::start("Uploading images");

            let human = UploadFile::read(&human)
                .await
                .with_context(|| format!("reading {}", human.display()))?;
            let garment = UploadFile::read(&garment)
                .await
                .with_context(|| format!("reading {}", garment.display()))?;
            let uploaded = tokio::try_join!(
                session.upload_human(&human),
                session.upload_garment(&garment)
            );
            if let Err(e) = uploaded {
                progress.finish(Err(&e.to_string()));
                return Err(e.into());
            }
            progress.show("Try-on", &session.view());

            let mut options = try_on_options(&garment_args, false);
            options.use_vision = !no_vision;
            progress.message("Try-on: processing, this may take 30-60 seconds");
            match session.try_on(&options).await {
                Ok(url) => progress.success(&format!("Try-on result: {url}")),
                Err(e) => {
                    progress.finish(Err(&e.to_string()));
                    return Err(e.into());
                }
            }
            session.handoff().save(&store, &config.user_id)?;

            if video {
                run_video(&session, &progress, &video_args).await?;
                session.handoff().save(&store, &config.user_id)?;
            }
            progress.finish(Ok("Done"));
            if cli.json {
                progress.print_records(&session.records())?;
            }
        }
        Command::Layer {
            garment,
            result,
            garment_args,
            vision,
        } => {
            let session = new_session(client, &config);
            resume(&session, &store, &config, result)?;
            session.ensure_layer_base().map_err(VizzleError::from)?;
            let progress = JobProgress::start("Uploading garment");

            let garment = UploadFile::read(&garment)
                .await
                .with_context(|| format!("reading {}", garment.display()))?;
            let outcome = match session.upload_garment(&garment).await {
                Ok(_) => {
                    progress.message("Layering: processing");
                    session.layer(&try_on_options(&garment_args, vision)).await
                }
                Err(e) => Err(e),
            };
            match outcome {
                Ok(url) => progress.finish(Ok(&format!("Layered result: {url}"))),
                Err(e) => {
                    progress.finish(Err(&e.to_string()));
                    return Err(e.into());
                }
            }
            session.handoff().save(&store, &config.user_id)?;
            if cli.json {
                progress.print_records(&session.records())?;
            }
        }
        Command::Video { image, video_args } => {
            let session = new_session(client, &config);
            resume(&session, &store, &config, image)?;
            let progress = JobProgress::start("Generating video");
            run_video(&session, &progress, &video_args).await?;
            session.handoff().save(&store, &config.user_id)?;
            progress.finish(Ok("Done"));
            if cli.json {
                progress.print_records(&session.records())?;
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "warn,vizzle=debug"
    } else {
        "warn,vizzle=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .init();
}

fn new_session(client: ApiClient, config: &VizzleConfig) -> TryOnSession {
    let session = TryOnSession::new(client).with_progress_interval(config.progress_interval());
    debug!(session = session.id(), user = %config.user_id, "session started");
    session
}

/// Pick up the saved handoff, with `image` replacing the saved result.
fn resume(
    session: &TryOnSession,
    store: &JsonFileStore,
    config: &VizzleConfig,
    image: Option<String>,
) -> Result<(), VizzleError> {
    let mut handoff = Handoff::load(store, &config.user_id)?;
    if let Some(image) = image {
        handoff.result_image = Some(image);
        handoff.garment_image = None;
    }
    session.resume(&handoff);
    Ok(())
}

fn try_on_options(args: &GarmentArgs, use_vision: bool) -> TryOnOptions {
    let mut params = IdmVtonParams::for_category(args.category);
    params.steps = args.steps;
    params.seed = args.seed;
    params.garment_des = args.description.clone();
    TryOnOptions {
        garment_type: args.garment_type,
        use_vision,
        params: Some(params),
    }
}

async fn run_video(
    session: &TryOnSession,
    progress: &JobProgress,
    args: &VideoArgs,
) -> Result<(), VizzleError> {
    let options = VideoOptions {
        motion_type: args.motion.clone(),
        duration: args.duration,
        fps: args.fps,
    };
    progress.message("Generating video");
    match session
        .generate_video(&options, |snapshot| progress.video_progress(snapshot))
        .await
    {
        Ok(url) => {
            progress.success(&format!("Video: {url}"));
            Ok(())
        }
        Err(e) => {
            progress.note("The try-on result is kept; run `vizzle video` to try again.");
            progress.finish(Err(&e.to_string()));
            Err(e.into())
        }
    }
}

async fn print_status(client: &ApiClient, family: FamilyArg, id: &str) -> Result<()> {
    let json = match family {
        FamilyArg::TryOn => serde_json::to_string_pretty(&client.job_status::<TryOn>(id).await?)?,
        FamilyArg::Layered => {
            serde_json::to_string_pretty(&client.job_status::<LayeredTryOn>(id).await?)?
        }
        FamilyArg::Video => {
            serde_json::to_string_pretty(&client.job_status::<VideoGeneration>(id).await?)?
        }
    };
    println!("{json}");
    Ok(())
}
