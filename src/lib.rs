//! Token-refresh-aware REST client core for the parcel agent platform: bearer-authenticated
//! calls that refresh once on 401, session rotation hooks, and cancellable debounced office
//! search.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod obs;
pub mod request;
pub mod search;
pub mod session;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for tests; enabled via `cfg(test)` or the `test`
	//! crate feature.

	pub use crate::_prelude::*;
	pub use crate::{
		http::{ApiResponse, PreparedRequest},
		request::RequestBody,
	};

	// std
	use std::task::{Context, Poll};
	// crates.io
	use http::header::AUTHORIZATION;
	// self
	use crate::{
		client::AuthClient,
		config::ApiDescriptor,
		error::TransportError,
		http::{ApiTransport, TransportFuture},
	};

	type Handler = Box<dyn Fn(&PreparedRequest) -> ApiResponse + Send + Sync>;

	/// In-process transport that answers through a handler and records every request.
	///
	/// Each send yields once before answering so concurrently joined calls interleave.
	#[derive(Default)]
	pub struct ScriptedTransport {
		handler: Option<Handler>,
		requests: Mutex<Vec<PreparedRequest>>,
		refresh_delay: Option<std::time::Duration>,
	}
	impl ScriptedTransport {
		/// Answers every request through `handler`.
		pub fn new<F>(handler: F) -> Self
		where
			F: 'static + Send + Sync + Fn(&PreparedRequest) -> ApiResponse,
		{
			Self { handler: Some(Box::new(handler)), ..Default::default() }
		}

		/// Holds refresh responses back for `delay` after the request is recorded.
		pub fn with_refresh_delay(mut self, delay: std::time::Duration) -> Self {
			self.refresh_delay = Some(delay);

			self
		}

		/// Fails every request with a connection-refused transport error.
		pub fn failing() -> Self {
			Self::default()
		}

		/// Snapshot of the requests sent so far.
		pub fn requests(&self) -> Vec<PreparedRequest> {
			self.requests.lock().clone()
		}

		/// Number of requests sent to the default refresh endpoint.
		pub fn refresh_calls(&self) -> usize {
			self.requests
				.lock()
				.iter()
				.filter(|request| is_refresh(request))
				.count()
		}
	}
	impl ApiTransport for ScriptedTransport {
		fn send(&self, request: PreparedRequest) -> TransportFuture<'_> {
			Box::pin(async move {
				YieldOnce(false).await;
				self.requests.lock().push(request.clone());

				if let Some(delay) = self.refresh_delay.filter(|_| is_refresh(&request)) {
					tokio::time::sleep(delay).await;
				}

				match self.handler.as_ref() {
					Some(handler) => Ok(handler(&request)),
					None => Err(TransportError::network(std::io::Error::new(
						std::io::ErrorKind::ConnectionRefused,
						"scripted transport refuses connections",
					))),
				}
			})
		}
	}

	fn is_refresh(request: &PreparedRequest) -> bool {
		request.url.path().ends_with("/auth/token/refresh/")
	}

	struct YieldOnce(bool);
	impl Future for YieldOnce {
		type Output = ();

		fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
			if self.0 {
				Poll::Ready(())
			} else {
				self.0 = true;
				cx.waker().wake_by_ref();

				Poll::Pending
			}
		}
	}

	/// Descriptor rooted at `https://api.test/api/` with default endpoints.
	pub fn test_descriptor() -> ApiDescriptor {
		ApiDescriptor::builder(
			Url::parse("https://api.test/api/").expect("Failed to parse test base URL."),
		)
		.build()
		.expect("Failed to build test descriptor.")
	}

	/// Builds a client over a [`ScriptedTransport`] driven by `handler`.
	pub fn scripted_client<F>(handler: F) -> (AuthClient<ScriptedTransport>, Arc<ScriptedTransport>)
	where
		F: 'static + Send + Sync + Fn(&PreparedRequest) -> ApiResponse,
	{
		client_over(ScriptedTransport::new(handler))
	}

	/// Builds a client over an already configured [`ScriptedTransport`].
	pub fn client_over(
		transport: ScriptedTransport,
	) -> (AuthClient<ScriptedTransport>, Arc<ScriptedTransport>) {
		let transport = Arc::new(transport);
		let client: AuthClient<ScriptedTransport> =
			AuthClient::with_transport(test_descriptor(), transport.clone());

		(client, transport)
	}

	/// JSON response with the given status.
	pub fn json_response(status: u16, body: &str) -> ApiResponse {
		let mut headers = HeaderMap::new();

		headers.insert(
			http::header::CONTENT_TYPE,
			http::HeaderValue::from_static("application/json"),
		);

		ApiResponse::new(
			StatusCode::from_u16(status).expect("Failed to build test status code."),
			headers,
			body.as_bytes().to_vec(),
		)
	}

	/// `Authorization` header of a recorded request, if any.
	pub fn authorization(request: &PreparedRequest) -> Option<String> {
		request.headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok()).map(str::to_owned)
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use http::{HeaderMap, Method, StatusCode};
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
