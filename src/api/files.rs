use std::collections::HashSet;

use log::warn;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

/// A picked document, already read into memory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentFile {
	pub name: String,
	pub bytes: Vec<u8>,
}

impl DocumentFile {
	pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
		Self {
			name: name.into(),
			bytes: bytes.into(),
		}
	}

	pub fn size(&self) -> usize {
		self.bytes.len()
	}
}

/// Drop repeats of the same (name, size) pair, keeping the first occurrence.
pub fn dedupe_files(files: impl IntoIterator<Item = DocumentFile>) -> Vec<DocumentFile> {
	let mut seen = HashSet::new();
	files
		.into_iter()
		.filter(|file| seen.insert((file.name.clone(), file.size())))
		.collect()
}

/// Read every file of an `<input type="file">` selection. Files the browser
/// cannot read are skipped with a warning.
pub async fn read_file_list(list: web_sys::FileList) -> Vec<DocumentFile> {
	let mut out = Vec::with_capacity(list.length() as usize);
	for i in 0..list.length() {
		let Some(file) = list.get(i) else {
			continue;
		};
		let name = file.name();
		match read_file_bytes(file).await {
			Ok(bytes) => out.push(DocumentFile::new(name, bytes)),
			Err(e) => warn!("skipping {name}: {e}"),
		}
	}
	out
}

async fn read_file_bytes(file: web_sys::File) -> Result<Vec<u8>, String> {
	let promise = file_reader_promise(file)?;
	let value = wasm_bindgen_futures::JsFuture::from(promise)
		.await
		.map_err(|_| "file: read failed".to_string())?;
	let buf = value
		.dyn_into::<js_sys::ArrayBuffer>()
		.map_err(|_| "file: expected ArrayBuffer".to_string())?;
	Ok(js_sys::Uint8Array::new(&buf).to_vec())
}

fn file_reader_promise(file: web_sys::File) -> Result<js_sys::Promise, String> {
	let reader =
		web_sys::FileReader::new().map_err(|_| "file: FileReader::new failed".to_string())?;
	reader
		.read_as_array_buffer(&file)
		.map_err(|_| "file: read_as_array_buffer failed".to_string())?;

	Ok(js_sys::Promise::new(&mut |resolve, reject| {
		let reject_err = reject.clone();
		let reader_ok = reader.clone();
		let onload = Closure::wrap(Box::new(move |_ev: web_sys::ProgressEvent| {
			match reader_ok.result() {
				Ok(v) if !v.is_null() && !v.is_undefined() => {
					let _ = resolve.call1(&JsValue::UNDEFINED, &v);
				}
				_ => {
					let missing = JsValue::from_str("file: missing result");
					let _ = reject.call1(&JsValue::UNDEFINED, &missing);
				}
			}
		}) as Box<dyn FnMut(_)>);
		reader.set_onload(Some(onload.as_ref().unchecked_ref()));
		onload.forget();

		let onerror = Closure::wrap(Box::new(move |_ev: web_sys::ProgressEvent| {
			let _ = reject_err.call1(&JsValue::UNDEFINED, &JsValue::from_str("file: read error"));
		}) as Box<dyn FnMut(_)>);
		reader.set_onerror(Some(onerror.as_ref().unchecked_ref()));
		onerror.forget();
	}))
}
