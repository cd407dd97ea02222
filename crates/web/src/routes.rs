//! HTTP routes: upload page, upload endpoint, job status and downloads.

use bytes::BufMut;
use futures_util::TryStreamExt;
use serde::Serialize;
use songdeck_pptx::{GenerateOptions, DEFAULT_OUTPUT};
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;
use warp::http::{header, Response, StatusCode};
use warp::multipart::{FormData, Part};
use warp::{Filter, Rejection, Reply};

use crate::config::ServiceConfig;
use crate::error::{recover_fn, ApiError};
use crate::files::{
    cleanup_old_files, display_name, has_extension, resolve_download, secure_filename, stored_name,
};
use crate::jobs::JobRegistry;

const INDEX_HTML: &str = include_str!("../static/index.html");

const PPTX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";

const TEXT_EXTENSIONS: &[&str] = &["txt"];
const PPTX_EXTENSIONS: &[&str] = &["pptx"];

/// State shared by every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub jobs: JobRegistry,
}

impl AppState {
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            config: Arc::new(config),
            jobs: JobRegistry::new(),
        }
    }

    /// Remove expired files and forget the jobs that produced them.
    pub async fn cleanup(&self) {
        let config = self.config.clone();
        let removed = tokio::task::spawn_blocking(move || {
            cleanup_old_files(
                &[config.upload_dir.as_path(), config.generated_dir.as_path()],
                config.retention(),
            )
        })
        .await
        .unwrap_or_else(|e| {
            log::warn!("Cleanup task failed: {}", e);
            0
        });
        let pruned = self.jobs.prune(self.config.retention()).await;
        if removed > 0 || pruned > 0 {
            log::info!("Cleanup removed {} files and {} jobs", removed, pruned);
        }
    }
}

fn with_arg<T: Clone + Send>(arg: T) -> impl Filter<Extract = (T,), Error = Infallible> + Clone {
    warp::any().map(move || arg.clone())
}

/// Every route, with rejections turned into JSON errors.
pub fn routes(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let max_upload_mb = state.config.max_upload_mb;
    index_filter(state.clone())
        .or(upload_filter(state.clone()))
        .or(status_filter(state.jobs.clone()))
        .or(download_filter(state))
        .recover(move |rejection| recover_fn(rejection, max_upload_mb))
        .with(warp::log("songdeck_web"))
}

fn index_filter(
    state: AppState,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path::end()
        .and(warp::get())
        .and(with_arg(state))
        .then(index_page)
}

fn upload_filter(
    state: AppState,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let limit = state.config.max_upload_bytes();
    warp::path!("upload")
        .and(warp::post())
        .and(warp::body::content_length_limit(limit))
        .and(warp::multipart::form().max_length(limit))
        .and(with_arg(state))
        .and_then(upload)
}

fn status_filter(
    jobs: JobRegistry,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path!("status" / String)
        .and(warp::get())
        .and(with_arg(jobs))
        .then(job_status)
}

fn download_filter(
    state: AppState,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::path!("download" / String)
        .and(warp::get())
        .and(with_arg(state))
        .and_then(download)
}

async fn index_page(state: AppState) -> impl Reply {
    state.cleanup().await;
    warp::reply::html(INDEX_HTML)
}

/// Fields of the upload form.
#[derive(Debug, Default)]
struct UploadForm {
    song: Option<(String, Vec<u8>)>,
    template: Option<(String, Vec<u8>)>,
    generate_toc: bool,
    output_filename: Option<String>,
}

async fn read_part(part: Part) -> Result<Vec<u8>, ApiError> {
    part.stream()
        .try_fold(Vec::new(), |mut data, buf| async move {
            data.put(buf);
            Ok(data)
        })
        .await
        .map_err(|e| ApiError::InvalidUpload(e.to_string()))
}

async fn read_form(mut form: FormData) -> Result<UploadForm, ApiError> {
    let mut upload = UploadForm::default();

    while let Some(part) = form
        .try_next()
        .await
        .map_err(|e| ApiError::InvalidUpload(e.to_string()))?
    {
        let name = part.name().to_string();
        let filename = part.filename().map(|f| f.to_string());
        let data = read_part(part).await?;

        match name.as_str() {
            "song_file" => upload.song = filename.filter(|f| !f.is_empty()).map(|f| (f, data)),
            "template_file" => {
                upload.template = filename.filter(|f| !f.is_empty()).map(|f| (f, data))
            }
            "generate_toc" => upload.generate_toc = true,
            "output_filename" => {
                let value = String::from_utf8_lossy(&data).trim().to_string();
                upload.output_filename = Some(value).filter(|v| !v.is_empty());
            }
            other => log::debug!("Ignoring form field '{}'", other),
        }
    }

    Ok(upload)
}

/// Sanitized output name requested by the client, with `.pptx` enforced.
fn output_name(requested: Option<&str>) -> String {
    let mut name = secure_filename(requested.unwrap_or(DEFAULT_OUTPUT));
    if name.is_empty() {
        return DEFAULT_OUTPUT.to_string();
    }
    if !name.ends_with(".pptx") {
        name.push_str(".pptx");
    }
    name
}

#[derive(Debug, Serialize)]
struct UploadResponse {
    job_id: Uuid,
    status_url: String,
}

async fn save_upload(
    dir: &Path,
    client_name: &str,
    fallback: &str,
    data: &[u8],
) -> Result<PathBuf, ApiError> {
    let path = dir.join(stored_name(Uuid::new_v4(), client_name, fallback));
    tokio::fs::write(&path, data).await?;
    log::debug!("Saved upload {} ({} bytes)", path.display(), data.len());
    Ok(path)
}

async fn start_job(form: UploadForm, state: AppState) -> Result<UploadResponse, ApiError> {
    let (song_name, song_data) = form.song.ok_or(ApiError::MissingSongFile)?;
    if !has_extension(&song_name, TEXT_EXTENSIONS) {
        return Err(ApiError::InvalidSongFile);
    }
    if let Some((template_name, _)) = &form.template {
        if !has_extension(template_name, PPTX_EXTENSIONS) {
            return Err(ApiError::InvalidTemplateFile);
        }
    }

    let config = &state.config;
    let template_path = match &form.template {
        Some((name, data)) => {
            Some(save_upload(&config.upload_dir, name, "template.pptx", data).await?)
        }
        None => None,
    };
    let song_path = save_upload(&config.upload_dir, &song_name, "songs.txt", &song_data).await?;

    let job_id = state.jobs.create().await;
    let output_file = stored_name(
        job_id,
        &output_name(form.output_filename.as_deref()),
        DEFAULT_OUTPUT,
    );

    let mut options = GenerateOptions::new(song_path, config.generated_dir.join(&output_file))
        .with_index(form.generate_toc);
    if let Some(template) = template_path {
        options = options.with_template(template);
    }

    log::info!(
        "Job {} queued for '{}' (index: {})",
        job_id,
        song_name,
        form.generate_toc
    );
    let jobs = state.jobs.clone();
    tokio::spawn(async move { jobs.run(job_id, options, output_file).await });

    Ok(UploadResponse {
        job_id,
        status_url: format!("/status/{}", job_id),
    })
}

async fn upload(form: FormData, state: AppState) -> Result<impl Reply, Rejection> {
    let form = read_form(form).await.map_err(warp::reject::custom)?;
    let response = start_job(form, state).await.map_err(warp::reject::custom)?;
    Ok(warp::reply::json(&response))
}

#[derive(Debug, Serialize)]
struct NotFoundBody {
    status: &'static str,
    message: &'static str,
}

async fn job_status(job_id: String, jobs: JobRegistry) -> warp::reply::Response {
    let job = match Uuid::parse_str(&job_id) {
        Ok(id) => jobs.get(&id).await,
        Err(_) => None,
    };
    match job {
        Some(job) => warp::reply::json(&job.status_response()).into_response(),
        None => warp::reply::with_status(
            warp::reply::json(&NotFoundBody {
                status: "not_found",
                message: "Job not found",
            }),
            StatusCode::NOT_FOUND,
        )
        .into_response(),
    }
}

async fn download(filename: String, state: AppState) -> Result<impl Reply, Rejection> {
    let path = resolve_download(&state.config.generated_dir, &filename)
        .ok_or_else(|| warp::reject::custom(ApiError::FileNotFound))?;
    let data = tokio::fs::read(&path).await.map_err(|e| {
        log::warn!("Could not read {}: {}", path.display(), e);
        warp::reject::custom(ApiError::FileNotFound)
    })?;

    Response::builder()
        .header(header::CONTENT_TYPE, PPTX_CONTENT_TYPE)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", display_name(&filename)),
        )
        .body(data)
        .map_err(|e| warp::reject::custom(ApiError::Internal(e.to_string())))
}
