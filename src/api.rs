//! Typed helpers for the agent-facing REST endpoints.
//!
//! Every helper goes through [`AuthClient::fetch_with_session`], so rotations are persisted
//! into the bound session and a failed refresh clears it.

pub mod office;
pub mod profile;

pub use office::*;
pub use profile::*;

// self
use crate::{
	_prelude::*,
	client::AuthClient,
	http::{ApiResponse, ApiTransport},
	request::ApiRequest,
	session::SessionProvider,
};

/// Agent API bound to a client and a session.
pub struct AgentApi<C, S>
where
	C: ?Sized + ApiTransport,
	S: ?Sized + SessionProvider,
{
	client: AuthClient<C>,
	session: Arc<S>,
}
impl<C, S> AgentApi<C, S>
where
	C: ?Sized + ApiTransport,
	S: ?Sized + SessionProvider,
{
	/// Binds `client` to `session`.
	pub fn new(client: AuthClient<C>, session: impl Into<Arc<S>>) -> Self {
		Self { client, session: session.into() }
	}

	/// Underlying client.
	pub fn client(&self) -> &AuthClient<C> {
		&self.client
	}

	/// Bound session.
	pub fn session(&self) -> &Arc<S> {
		&self.session
	}

	async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
		self.client.fetch_with_session(&request, &*self.session).await
	}

	fn endpoints(&self) -> &crate::config::ApiEndpoints {
		&self.client.descriptor.endpoints
	}
}
impl<C, S> Clone for AgentApi<C, S>
where
	C: ?Sized + ApiTransport,
	S: ?Sized + SessionProvider,
{
	fn clone(&self) -> Self {
		Self { client: self.client.clone(), session: self.session.clone() }
	}
}
impl<C, S> Debug for AgentApi<C, S>
where
	C: ?Sized + ApiTransport,
	S: ?Sized + SessionProvider,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AgentApi").field("client", &self.client).finish_non_exhaustive()
	}
}

/// Joins a collection endpoint and a resource id into a detail target.
fn detail_target(collection: &str, id: impl Display) -> String {
	format!("{}/{id}/", collection.trim_end_matches('/'))
}
