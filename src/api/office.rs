//! Office listing and management endpoints.

// self
use crate::{
	_prelude::*,
	api::{self, AgentApi},
	http::ApiTransport,
	request::ApiRequest,
	session::SessionProvider,
};

/// Office managed by the agent.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Office {
	/// Server-assigned identifier.
	pub id: u64,
	/// Display name.
	pub name: String,
	/// Street address.
	#[serde(default)]
	pub address: String,
	/// City.
	#[serde(default)]
	pub city: String,
	/// Latitude in decimal degrees.
	#[serde(default)]
	pub latitude: Option<f64>,
	/// Longitude in decimal degrees.
	#[serde(default)]
	pub longitude: Option<f64>,
	/// Contact phone number.
	#[serde(default)]
	pub phone: Option<String>,
}

/// Fields used to create or update an [`Office`].
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct OfficeDraft {
	/// Display name.
	pub name: String,
	/// Street address.
	pub address: String,
	/// City.
	pub city: String,
	/// Latitude in decimal degrees.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub latitude: Option<f64>,
	/// Longitude in decimal degrees.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub longitude: Option<f64>,
	/// Contact phone number.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub phone: Option<String>,
}
impl From<&Office> for OfficeDraft {
	fn from(office: &Office) -> Self {
		Self {
			name: office.name.clone(),
			address: office.address.clone(),
			city: office.city.clone(),
			latitude: office.latitude,
			longitude: office.longitude,
			phone: office.phone.clone(),
		}
	}
}

impl<C, S> AgentApi<C, S>
where
	C: ?Sized + ApiTransport,
	S: ?Sized + SessionProvider,
{
	/// Lists the agent's offices.
	pub async fn offices(&self) -> Result<Vec<Office>> {
		let request = ApiRequest::get(self.endpoints().offices.clone());

		self.send(request).await?.error_for_status()?.json()
	}

	/// Creates an office and returns the stored record.
	pub async fn create_office(&self, draft: &OfficeDraft) -> Result<Office> {
		let request = ApiRequest::post(self.endpoints().offices.clone()).json(draft)?;

		self.send(request).await?.error_for_status()?.json()
	}

	/// Updates office `id` and returns the stored record.
	pub async fn update_office(&self, id: u64, draft: &OfficeDraft) -> Result<Office> {
		let request =
			ApiRequest::patch(api::detail_target(&self.endpoints().offices, id)).json(draft)?;

		self.send(request).await?.error_for_status()?.json()
	}

	/// Deletes office `id`.
	pub async fn delete_office(&self, id: u64) -> Result<()> {
		let request = ApiRequest::delete(api::detail_target(&self.endpoints().offices, id));

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
		error::{CredentialsError, TransientError},
		session::MemorySession,
	};

	fn draft() -> OfficeDraft {
		OfficeDraft {
			name: "Mitte".into(),
			address: "Unter den Linden 1".into(),
			city: "Berlin".into(),
			latitude: Some(52.517),
			..Default::default()
		}
	}

	#[tokio::test]
	async fn crud_targets_collection_and_detail_paths() {
		let (client, transport) = scripted_client(|request| {
			if request.method == Method::DELETE {
				json_response(204, "")
			} else if request.method == Method::GET {
				json_response(200, r#"[{"id":3,"name":"Mitte"}]"#)
			} else {
				json_response(200, r#"{"id":3,"name":"Mitte","city":"Berlin"}"#)
			}
		});
		let api: AgentApi<ScriptedTransport, MemorySession> = AgentApi::new(
			client,
			MemorySession::new(
				SessionCredentials::new("A1", "R1").expect("Credential fixture should validate."),
			),
		);

		assert_eq!(api.offices().await.expect("Listing should succeed.")[0].id, 3);
		assert_eq!(api.create_office(&draft()).await.expect("Create should succeed.").city, "Berlin");

		let updated = api.update_office(3, &draft()).await.expect("Update should succeed.");

		api.delete_office(updated.id).await.expect("Delete should succeed.");

		let sent = transport
			.requests()
			.into_iter()
			.map(|request| (request.method, request.url.path().to_owned()))
			.collect::<Vec<_>>();

		assert_eq!(sent, [
			(Method::GET, "/api/offices/".to_owned()),
			(Method::POST, "/api/offices/".to_owned()),
			(Method::PATCH, "/api/offices/3/".to_owned()),
			(Method::DELETE, "/api/offices/3/".to_owned()),
		]);
	}

	#[tokio::test]
	async fn delete_requires_success() {
		let (client, _) = scripted_client(|_| json_response(403, r#"{"detail":"forbidden"}"#));
		let api: AgentApi<ScriptedTransport, MemorySession> = AgentApi::new(
			client,
			MemorySession::new(
				SessionCredentials::new("A1", "R1").expect("Credential fixture should validate."),
			),
		);
		let err = api.delete_office(3).await.expect_err("403 should surface.");

		assert!(matches!(err, Error::Transient(TransientError::UnexpectedStatus { status: 403, .. })));
	}

	#[tokio::test]
	async fn empty_session_short_circuits() {
		let (client, transport) = scripted_client(|_| json_response(200, "[]"));
		let api: AgentApi<ScriptedTransport, MemorySession> =
			AgentApi::new(client, MemorySession::default());
		let err = api.offices().await.expect_err("Empty session should fail.");

		assert!(matches!(err, Error::Credentials(CredentialsError::NoSession)));
		assert!(transport.requests().is_empty());
	}

	#[test]
	fn draft_omits_unset_coordinates() {
		let value = serde_json::to_value(draft()).expect("Draft should serialize.");

		assert_eq!(value["latitude"], 52.517);
		assert!(value.get("longitude").is_none());
		assert_eq!(OfficeDraft::from(&Office { id: 1, ..Default::default() }).name, "");
	}
}
