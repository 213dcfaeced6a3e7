//! Broadcast observation of workflow outcomes.
//!
//! Every operation resolves through a single production point that fans the
//! identical outcome out to the awaiting caller and to every registered
//! observer, so the two channels can never disagree.

// self
use crate::{_prelude::*, response::Response, token::Token};

/// Long-lived observer receiving every workflow outcome.
///
/// All methods default to no-ops so implementations only override the events
/// they care about.
pub trait FlowObserver
where
	Self: 'static + Send + Sync,
{
	/// A workflow operation produced a new response snapshot.
	fn on_response(&self, response: &Response) {
		let _ = response;
	}

	/// A code exchange or refresh minted a token.
	fn on_token(&self, token: &Token) {
		let _ = token;
	}

	/// A workflow operation failed.
	fn on_error(&self, error: &Error) {
		let _ = error;
	}
}

/// Registry fanning outcomes out to all registered observers.
#[derive(Default)]
pub(crate) struct ObserverRegistry {
	observers: RwLock<Vec<Arc<dyn FlowObserver>>>,
}
impl ObserverRegistry {
	pub(crate) fn register(&self, observer: Arc<dyn FlowObserver>) {
		self.observers.write().push(observer);
	}

	pub(crate) fn publish_response(&self, result: &Result<Response>) {
		for observer in self.observers.read().iter() {
			match result {
				Ok(response) => observer.on_response(response),
				Err(error) => observer.on_error(error),
			}
		}
	}

	pub(crate) fn publish_token(&self, result: &Result<Token>) {
		for observer in self.observers.read().iter() {
			match result {
				Ok(token) => observer.on_token(token),
				Err(error) => observer.on_error(error),
			}
		}
	}
}
impl Debug for ObserverRegistry {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ObserverRegistry")
			.field("observers", &self.observers.read().len())
			.finish()
	}
}
