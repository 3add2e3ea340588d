//! Fetches the agent profile against a mock API whose access token has expired, showing the
//! refresh-and-retry cycle and the rotated pair landing in a file-backed session.

// std
use std::env;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use parcel_agent_client::{
	api::AgentApi,
	auth::SessionCredentials,
	client::ReqwestAuthClient,
	config::ApiDescriptor,
	session::FileSession,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/auth/profile/").header("authorization", "Bearer stale");
			then.status(401)
				.header("content-type", "application/json")
				.body(r#"{"detail":"Given token not valid for any token type"}"#);
		})
		.await;

	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/token/refresh/");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"access":"fresh","refresh":"rotated"}"#);
		})
		.await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/auth/profile/").header("authorization", "Bearer fresh");
			then.status(200).header("content-type", "application/json").body(
				r#"{"username":"demo","first_name":"Dana","last_name":"Agent","email":"dana@example.com"}"#,
			);
		})
		.await;

	let descriptor = ApiDescriptor::builder(Url::parse(&server.url("/api/"))?)
		.allow_insecure_http(true)
		.build()?;
	let session_path = env::temp_dir().join("parcel-agent-demo-session.json");
	let session = FileSession::open(&session_path)?;

	session.replace(SessionCredentials::new("stale", "initial")?)?;

	let api = <AgentApi<_, FileSession>>::new(ReqwestAuthClient::new(descriptor), session);
	let profile = api.profile().await?;

	println!("signed in as {} <{}>", profile.display_name(), profile.email);
	println!("session persisted at {}", session_path.display());
	println!("refreshes performed: {}", api.client().metrics.refreshes());

	refresh.assert_calls_async(1).await;

	Ok(())
}
