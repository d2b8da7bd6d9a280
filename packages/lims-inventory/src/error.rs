use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Failed to read snapshot at {path:?}.")]
	ReadSnapshot { path: PathBuf, source: std::io::Error },
	#[error("Failed to parse snapshot at {path:?}.")]
	ParseSnapshot { path: PathBuf, source: serde_json::Error },
	#[error("Invalid snapshot: {message}")]
	Snapshot { message: String },
}
