//! JSON file-backed [`SessionProvider`] that survives process restarts.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::{SessionCredentials, TokenRotation},
	error::SessionError,
	session::{SessionFuture, SessionProvider, TokenUpdate},
};

/// Persists the session to a JSON file after each mutation.
#[derive(Clone, Debug)]
pub struct FileSession {
	path: PathBuf,
	inner: Arc<RwLock<Option<SessionCredentials>>>,
}
impl FileSession {
	/// Opens (or creates) a session at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, SessionError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Location of the session file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Stores fresh credentials (login) and persists them.
	pub fn replace(&self, credentials: SessionCredentials) -> Result<(), SessionError> {
		let mut guard = self.inner.write();

		*guard = Some(credentials);

		self.persist_locked(guard.as_ref())
	}

	fn load_snapshot(path: &Path) -> Result<Option<SessionCredentials>, SessionError> {
		if !path.exists() {
			return Ok(None);
		}

		let bytes = fs::read(path).map_err(|e| SessionError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		if bytes.iter().all(u8::is_ascii_whitespace) {
			return Ok(None);
		}

		let credentials: Option<SessionCredentials> =
			serde_json::from_slice(&bytes).map_err(|e| SessionError::Serialization {
				message: format!("Failed to parse {}: {e}", path.display()),
			})?;

		if let Some(credentials) = credentials.as_ref() {
			credentials.validate().map_err(|e| SessionError::Serialization {
				message: format!("Invalid credentials in {}: {e}", path.display()),
			})?;
		}

		Ok(credentials)
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), SessionError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| SessionError::Backend {
				message: format!("Failed to create session directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist_locked(&self, contents: Option<&SessionCredentials>) -> Result<(), SessionError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized =
			serde_json::to_vec_pretty(&contents).map_err(|e| SessionError::Serialization {
				message: format!("Failed to serialize session snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| SessionError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| SessionError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| SessionError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| SessionError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl TokenUpdate for FileSession {
	fn update_session(&self, rotation: TokenRotation) -> SessionFuture<'_, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			*guard = Some(rotation.into_credentials());

			self.persist_locked(guard.as_ref())
		})
	}
}
impl SessionProvider for FileSession {
	fn credentials(&self) -> SessionFuture<'_, Option<SessionCredentials>> {
		Box::pin(async move { Ok(self.inner.read().clone()) })
	}

	fn clear(&self) -> SessionFuture<'_, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			guard.take();

			self.persist_locked(None)
		})
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// self
	use super::*;

	fn temp_path(tag: &str) -> PathBuf {
		let unique = format!(
			"parcel_agent_client_session_{tag}_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	#[tokio::test]
	async fn rotation_survives_reopen() {
		let path = temp_path("rotation");
		let session = FileSession::open(&path).expect("Failed to open file session.");

		session
			.replace(SessionCredentials::new("A1", "R1").expect("Credential fixture should validate."))
			.expect("Failed to persist initial credentials.");
		session
			.update_session(TokenRotation::new("A2", "R2"))
			.await
			.expect("Failed to persist rotated credentials.");
		drop(session);

		let reopened = FileSession::open(&path).expect("Failed to reopen file session.");
		let current = reopened
			.credentials()
			.await
			.expect("File session read should succeed.")
			.expect("File session lost credentials after reopen.");

		assert_eq!(current.access_token.expose(), "A2");
		assert_eq!(current.refresh_token.expose(), "R2");

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary session file {}: {e}", path.display())
		});
	}

	#[tokio::test]
	async fn clear_persists_logout() {
		let path = temp_path("clear");
		let session = FileSession::open(&path).expect("Failed to open file session.");

		session
			.replace(SessionCredentials::new("A1", "R1").expect("Credential fixture should validate."))
			.expect("Failed to persist initial credentials.");
		session.clear().await.expect("File session clear should succeed.");

		let reopened = FileSession::open(&path).expect("Failed to reopen file session.");

		assert!(
			reopened.credentials().await.expect("File session read should succeed.").is_none()
		);

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary session file {}: {e}", path.display())
		});
	}

	#[test]
	fn empty_file_means_no_session() {
		let path = temp_path("empty");

		fs::write(&path, b"\n").expect("Failed to write empty session fixture.");

		let session = FileSession::open(&path).expect("Empty session file should open.");

		assert!(session.inner.read().is_none());

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary session file {}: {e}", path.display())
		});
	}

	#[test]
	fn corrupt_file_is_reported() {
		let path = temp_path("corrupt");

		fs::write(&path, br#"{"access_token":"","refresh_token":"R1"}"#)
			.expect("Failed to write corrupt fixture.");

		let err = FileSession::open(&path).expect_err("Blank access token should be rejected.");

		assert!(matches!(
			err,
			SessionError::Serialization { ref message } if message.starts_with("Invalid credentials")
		));

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary session file {}: {e}", path.display())
		});
	}
}
