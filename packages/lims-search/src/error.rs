pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Remote error: {message}")]
	Remote { message: String },
	#[error("Malformed entity: {message}")]
	MalformedEntity { message: String },
	#[error("Encoding error: {message}")]
	Encoding { message: String },
}
impl From<serde_json::Error> for Error {
	fn from(err: serde_json::Error) -> Self {
		Self::Encoding { message: err.to_string() }
	}
}
