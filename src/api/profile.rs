//! Agent profile and avatar endpoints.

// crates.io
use http::header::{ACCEPT, HeaderValue};
// self
use crate::{
	_prelude::*,
	api::AgentApi,
	http::ApiTransport,
	request::{ApiRequest, MultipartForm},
	session::SessionProvider,
};

/// Profile of the signed-in agent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentProfile {
	/// Login name.
	pub username: String,
	/// Given name.
	pub first_name: String,
	/// Family name.
	pub last_name: String,
	/// Contact email.
	pub email: String,
	/// Contact phone number, if any.
	pub phone: Option<String>,
}
impl AgentProfile {
	/// `first last`, falling back to the username when both are blank.
	pub fn display_name(&self) -> String {
		let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
		let full = full.trim();

		if full.is_empty() { self.username.clone() } else { full.to_owned() }
	}
}

/// Partial profile update; unset fields are left untouched by the server.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
	#[serde(skip_serializing_if = "Option::is_none")]
	first_name: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	last_name: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	email: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	phone: Option<String>,
}
impl ProfileUpdate {
	/// Sets the given name.
	pub fn first_name(mut self, value: impl Into<String>) -> Self {
		self.first_name = Some(value.into());

		self
	}

	/// Sets the family name.
	pub fn last_name(mut self, value: impl Into<String>) -> Self {
		self.last_name = Some(value.into());

		self
	}

	/// Sets the contact email.
	pub fn email(mut self, value: impl Into<String>) -> Self {
		self.email = Some(value.into());

		self
	}

	/// Sets the contact phone number.
	pub fn phone(mut self, value: impl Into<String>) -> Self {
		self.phone = Some(value.into());

		self
	}

	/// Returns `true` when no field is set.
	pub fn is_empty(&self) -> bool {
		self == &Self::default()
	}
}

/// Image file to upload as the profile avatar.
#[derive(Clone, PartialEq, Eq)]
pub struct ProfileImage {
	/// File name reported to the server.
	pub file_name: String,
	/// MIME type, such as `image/png`.
	pub mime: String,
	/// Raw image bytes.
	pub bytes: Vec<u8>,
}
impl Debug for ProfileImage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ProfileImage")
			.field("file_name", &self.file_name)
			.field("mime", &self.mime)
			.field("len", &self.bytes.len())
			.finish()
	}
}

impl<C, S> AgentApi<C, S>
where
	C: ?Sized + ApiTransport,
	S: ?Sized + SessionProvider,
{
	/// Fetches the signed-in agent's profile.
	pub async fn profile(&self) -> Result<AgentProfile> {
		let request = ApiRequest::get(self.endpoints().profile.clone());

		self.send(request).await?.error_for_status()?.json()
	}

	/// Applies a partial update and returns the stored profile.
	pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<AgentProfile> {
		let request = ApiRequest::patch(self.endpoints().profile.clone()).json(update)?;

		self.send(request).await?.error_for_status()?.json()
	}

	/// Downloads the avatar, or `None` when the agent has not uploaded one.
	pub async fn profile_image(&self) -> Result<Option<Vec<u8>>> {
		let request = ApiRequest::get(self.endpoints().profile_image.clone())
			.header(ACCEPT, HeaderValue::from_static("image/*"));
		let response = self.send(request).await?;

		if response.is_not_found() {
			return Ok(None);
		}

		Ok(Some(response.error_for_status()?.into_bytes()))
	}

	/// Uploads a new avatar as the multipart field `image`.
	pub async fn upload_profile_image(&self, image: ProfileImage) -> Result<()> {
		let ProfileImage { file_name, mime, bytes } = image;
		let request = ApiRequest::put(self.endpoints().profile_image.clone())
			.multipart(MultipartForm::new().file("image", file_name, mime, bytes));

		self.send(request).await?.error_for_status()?;

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		_preludet::*,
		auth::SessionCredentials,
		error::TransientError,
		request::PartContent,
		session::MemorySession,
	};

	fn api<F>(handler: F) -> (AgentApi<ScriptedTransport, MemorySession>, Arc<ScriptedTransport>)
	where
		F: 'static + Send + Sync + Fn(&PreparedRequest) -> ApiResponse,
	{
		let (client, transport) = scripted_client(handler);
		let session = MemorySession::new(
			SessionCredentials::new("A1", "R1").expect("Credential fixture should validate."),
		);

		(AgentApi::new(client, session), transport)
	}

	#[tokio::test]
	async fn profile_tolerates_missing_and_unknown_fields() {
		let (api, transport) =
			api(|_| json_response(200, r#"{"username":"alice","first_name":"Alice","is_staff":false}"#));
		let profile = api.profile().await.expect("Profile should parse.");

		assert_eq!(profile.username, "alice");
		assert_eq!(profile.phone, None);
		assert_eq!(profile.display_name(), "Alice");
		assert_eq!(transport.requests()[0].url.path(), "/api/auth/profile/");
	}

	#[tokio::test]
	async fn update_profile_sends_only_set_fields() {
		let (api, transport) = api(|request| match &request.body {
			RequestBody::Json(body) => json_response(
				200,
				&format!(r#"{{"username":"alice","phone":{}}}"#, body["phone"]),
			),
			_ => json_response(400, "{}"),
		});
		let profile = api
			.update_profile(&ProfileUpdate::default().phone("+49 30 1234"))
			.await
			.expect("Update should succeed.");
		let sent = transport.requests();

		assert_eq!(profile.phone.as_deref(), Some("+49 30 1234"));
		assert_eq!(sent[0].method, Method::PATCH);
		assert_eq!(sent[0].body, RequestBody::Json(serde_json::json!({ "phone": "+49 30 1234" })));
		assert!(ProfileUpdate::default().is_empty());
	}

	#[tokio::test]
	async fn missing_profile_image_is_none() {
		let (api, _) = api(|_| json_response(404, r#"{"detail":"Not found."}"#));

		assert_eq!(api.profile_image().await.expect("404 should map to None."), None);
	}

	#[tokio::test]
	async fn profile_image_errors_are_transient() {
		let (api, _) = api(|_| json_response(500, "boom"));
		let err = api.profile_image().await.expect_err("500 should surface.");

		assert!(matches!(err, Error::Transient(TransientError::UnexpectedStatus { status: 500, .. })));
	}

	#[tokio::test]
	async fn upload_uses_the_image_field() {
		let (api, transport) = api(|_| json_response(200, "{}"));

		api.upload_profile_image(ProfileImage {
			file_name: "me.png".into(),
			mime: "image/png".into(),
			bytes: vec![137, 80, 78, 71],
		})
		.await
		.expect("Upload should succeed.");

		let sent = transport.requests();
		let RequestBody::Multipart(form) = &sent[0].body else {
			panic!("Upload should send a multipart body.");
		};

		assert_eq!(form.parts.len(), 1);
		assert_eq!(form.parts[0].name, "image");
		assert!(matches!(
			&form.parts[0].content,
			PartContent::File { file_name, bytes, .. } if file_name == "me.png" && bytes.len() == 4
		));
	}
}
