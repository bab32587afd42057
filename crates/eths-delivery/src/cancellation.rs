//! Explicit cancellation for long running waits.
//!
//! Dropping a future already cancels any RPC in flight. A [`Cancellation`]
//! additionally lets a caller stop a wait it does not own, for example the
//! confirmation waiter of a spawned task.

use tokio::sync::watch;

/// Creates a linked handle and signal.
pub fn cancellation() -> (CancelHandle, Cancellation) {
	let (tx, rx) = watch::channel(false);
	(CancelHandle(tx), Cancellation(rx))
}

/// Triggers the linked [`Cancellation`] signals.
#[derive(Debug)]
pub struct CancelHandle(watch::Sender<bool>);

impl CancelHandle {
	pub fn cancel(&self) {
		self.0.send_replace(true);
	}
}

/// Signal observed by cancellable operations. Clones observe the same handle.
#[derive(Debug, Clone)]
pub struct Cancellation(watch::Receiver<bool>);

impl Cancellation {
	/// A signal that never fires.
	pub fn never() -> Self {
		let (_, rx) = watch::channel(false);
		Self(rx)
	}

	pub fn is_cancelled(&self) -> bool {
		*self.0.borrow()
	}

	/// Resolves once the handle is cancelled.
	///
	/// Never resolves when the handle was dropped without cancelling.
	pub async fn cancelled(&self) {
		let mut rx = self.0.clone();
		if rx.wait_for(|cancelled| *cancelled).await.is_err() {
			std::future::pending::<()>().await;
		}
	}
}

impl Default for Cancellation {
	fn default() -> Self {
		Self::never()
	}
}
