use futures::FutureExt;
use futures::future::LocalBoxFuture;
use gloo_net::http::{Request, Response};
use log::{debug, warn};

use super::{DocumentFile, PipelineApi, PipelineStatus, UploadReceipt, body};
use crate::error::ApiError;

const RESET_FAILED: &str = "Failed to reset pipeline state";
const UPLOAD_FAILED: &str = "Upload failed";
const STATUS_FAILED: &str = "Failed to fetch pipeline status";
const SUMMARY_FAILED: &str = "Failed to load concept summary";

const UPLOAD_FIELD: &str = "documents";

/// Live transport against the pipeline server.
#[derive(Clone, Debug)]
pub struct HttpApi {
	base: String,
}

struct Reply {
	status: u16,
	ok: bool,
	body: String,
}

impl HttpApi {
	pub fn new(base: &str) -> Self {
		Self {
			base: base.trim_end_matches('/').to_string(),
		}
	}

	fn url(&self, path: &str) -> String {
		format!("{}{}", self.base, path)
	}
}

async fn reply(sent: Result<Response, gloo_net::Error>) -> Result<Reply, ApiError> {
	let response = sent.map_err(|e| {
		warn!("request failed: {e}");
		ApiError::Network(e.to_string())
	})?;
	let (status, ok) = (response.status(), response.ok());
	// An unreadable body is an absent body.
	let body = response.text().await.unwrap_or_default();
	debug!("{} {} ({} bytes)", response.url(), status, body.len());
	Ok(Reply { status, ok, body })
}

fn form_data(files: &[DocumentFile]) -> Result<web_sys::FormData, ApiError> {
	let browser = |what: &str| ApiError::Browser(what.to_string());
	let form = web_sys::FormData::new().map_err(|_| browser("FormData::new failed"))?;
	for file in files {
		let parts = js_sys::Array::new();
		parts.push(&js_sys::Uint8Array::from(file.bytes.as_slice()).buffer());
		let blob = web_sys::Blob::new_with_u8_array_sequence(&parts)
			.map_err(|_| browser("blob: failed to create"))?;
		form.append_with_blob_and_filename(UPLOAD_FIELD, &blob, &file.name)
			.map_err(|_| browser("FormData::append failed"))?;
	}
	Ok(form)
}

impl PipelineApi for HttpApi {
	fn reset(&self) -> LocalBoxFuture<'_, Result<(), ApiError>> {
		async move {
			let r = reply(Request::post(&self.url("/status/reset")).send().await).await?;
			if !r.ok {
				return Err(ApiError::server(r.status, &r.body, RESET_FAILED));
			}
			Ok(())
		}
		.boxed_local()
	}

	fn upload(
		&self,
		files: Vec<DocumentFile>,
	) -> LocalBoxFuture<'_, Result<UploadReceipt, ApiError>> {
		async move {
			let form = form_data(&files)?;
			let request = Request::post(&self.url("/upload"))
				.body(form)
				.map_err(|e| ApiError::Browser(e.to_string()))?;
			let r = reply(request.send().await).await?;
			if !r.ok {
				return Err(ApiError::server(r.status, &r.body, UPLOAD_FAILED));
			}
			Ok(UploadReceipt::from_body(&r.body))
		}
		.boxed_local()
	}

	fn fetch_status(&self) -> LocalBoxFuture<'_, Result<PipelineStatus, ApiError>> {
		async move {
			let r = reply(Request::get(&self.url("/status")).send().await).await?;
			if !r.ok {
				return Err(ApiError::server(r.status, &r.body, STATUS_FAILED));
			}
			PipelineStatus::from_body(&r.body)
				.ok_or_else(|| ApiError::Payload(STATUS_FAILED.into()))
		}
		.boxed_local()
	}

	fn fetch_summary<'a>(
		&'a self,
		concept: &'a str,
	) -> LocalBoxFuture<'a, Result<String, ApiError>> {
		async move {
			let escaped = String::from(js_sys::encode_uri_component(concept));
			let url = self.url(&format!("/concepts/{escaped}"));
			let r = reply(Request::get(&url).send().await).await?;
			if !r.ok {
				return Err(ApiError::server(r.status, &r.body, SUMMARY_FAILED));
			}
			Ok(body::summary_text(&r.body))
		}
		.boxed_local()
	}
}
