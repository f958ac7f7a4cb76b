use thiserror::Error;

use super::types::ScenarioDocument;

/// Failure at the persistence boundary. The editor surfaces these as
/// notifications and leaves the in-memory graph untouched.
#[derive(Debug, Error)]
pub enum StoreError {
	#[error("scenario '{0}' not found")]
	NotFound(String),
	#[error("storage unavailable: {0}")]
	Unavailable(String),
	#[error("bad scenario payload: {0}")]
	Payload(#[from] serde_json::Error),
}

/// Where scenario documents live. The backing service is an external
/// collaborator; this trait is the seam where a real transport would attach.
pub trait ScenarioStore {
	fn load(&self, id: &str) -> Result<ScenarioDocument, StoreError>;
	fn save(&self, id: &str, doc: &ScenarioDocument) -> Result<(), StoreError>;
}

/// Keeps documents as JSON in `window.localStorage`, keyed by scenario id.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalStore;

impl LocalStore {
	fn storage() -> Result<web_sys::Storage, StoreError> {
		web_sys::window()
			.and_then(|w| w.local_storage().ok().flatten())
			.ok_or_else(|| StoreError::Unavailable("no localStorage".to_string()))
	}

	fn key(id: &str) -> String {
		format!("scenario:{id}")
	}
}

impl ScenarioStore for LocalStore {
	fn load(&self, id: &str) -> Result<ScenarioDocument, StoreError> {
		let raw = Self::storage()?
			.get_item(&Self::key(id))
			.map_err(|e| StoreError::Unavailable(format!("{e:?}")))?
			.ok_or_else(|| StoreError::NotFound(id.to_string()))?;
		Ok(serde_json::from_str(&raw)?)
	}

	fn save(&self, id: &str, doc: &ScenarioDocument) -> Result<(), StoreError> {
		let json = serde_json::to_string(doc)?;
		Self::storage()?
			.set_item(&Self::key(id), &json)
			.map_err(|e| StoreError::Unavailable(format!("{e:?}")))
	}
}
