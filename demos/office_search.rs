//! Types a query the way a search box would and shows that only the settled query is sent.

// std
use std::time::Duration;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use parcel_agent_client::{
	auth::SessionCredentials,
	client::ReqwestAuthClient,
	config::ApiDescriptor,
	search::{OfficeSearch, SearchOutcome},
	session::MemorySession,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/offices/search/");
			then.status(200).header("content-type", "application/json").body(
				r#"[{"id":1,"name":"Mitte","city":"Berlin"},{"id":2,"name":"Altona","city":"Hamburg"}]"#,
			);
		})
		.await;
	let descriptor = ApiDescriptor::builder(Url::parse(&server.url("/api/"))?)
		.allow_insecure_http(true)
		.build()?;
	let search = OfficeSearch::new(ReqwestAuthClient::new(descriptor));
	let credentials = SessionCredentials::new("demo-access", "demo-refresh")?;
	let session = MemorySession::new(credentials.clone());
	let keystrokes = ["b", "be", "ber", "berl"];
	let typing = async {
		let mut superseded = 0;

		for prefix in keystrokes {
			let pending = search.search(prefix, &credentials, &session);

			tokio::select! {
				outcome = pending => {
					if outcome? == SearchOutcome::Superseded {
						superseded += 1;
					}
				},
				_ = tokio::time::sleep(Duration::from_millis(50)) => superseded += 1,
			}
		}

		Ok::<_, parcel_agent_client::error::Error>(superseded)
	};
	let superseded = typing.await?;

	match search.search("berlin", &credentials, &session).await? {
		SearchOutcome::Results(offices) =>
			for office in offices {
				println!("{:>3}  {} ({})", office.id, office.name, office.city);
			},
		outcome => println!("no results: {outcome:?}"),
	}

	println!("keystrokes dropped before the debounce settled: {superseded}");

	mock.assert_calls_async(1).await;

	Ok(())
}
