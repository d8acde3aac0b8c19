use std::fs;

pub fn files_dir() -> String {
    std::env::var("FILES_DIR").unwrap_or_else(|_| String::from("./files"))
}

pub fn photo_locator(job_id: &str, photo_id: &str, extension: &str) -> String {
    format!("{}/jobs/{}/{}.{}", files_dir(), job_id, photo_id, extension)
}

/// Best-effort removal of the object behind a stored locator. Callers treat
/// a failure as a warning, never as a reason to keep the metadata row.
pub fn release(locator: &str) -> Result<(), String> {
    fs::remove_file(locator).map_err(|_| "STORAGE_RELEASE_FAILED".to_string())
}
