//! Explicit subscription lists.
//!
//! Every observable notification in the host (files found by a directory, plugins
//! reported by a source, modules added to a container) is an [`Event`]. A
//! subscriber receives a [`SubscriptionId`] and can detach itself with it at any
//! time; handlers run on the thread that raised the event.

use std::panic::{ catch_unwind, AssertUnwindSafe };
use std::sync::atomic::{ AtomicU64, Ordering };
use std::sync::{ Arc, Mutex, PoisonError };

type Handler<T> = Arc<dyn Fn( &T ) + Send + Sync>;

/// Handle returned by [`Event::subscribe`], used to detach the handler again.
#[derive( Copy, Clone, Debug, PartialEq, Eq, Hash )]
pub struct SubscriptionId( u64 );

/// A multicast notification carrying a `T`.
pub struct Event<T> {
	handlers: Mutex<Vec<( SubscriptionId, Handler<T> )>>,
	next_id: AtomicU64,
}

impl<T> Event<T> {

	pub fn new() -> Self {
		Self { handlers: Mutex::new( Vec::with_capacity( 0 )), next_id: AtomicU64::new( 0 ) }
	}

	/// Attaches `handler`. Handlers are invoked in subscription order.
	pub fn subscribe( &self, handler: impl Fn( &T ) + Send + Sync + 'static ) -> SubscriptionId {
		let id = SubscriptionId( self.next_id.fetch_add( 1, Ordering::Relaxed ));
		self.handlers.lock().unwrap_or_else( PoisonError::into_inner ).push(( id, Arc::new( handler )));
		id
	}

	/// Detaches a handler. Returns `false` if `id` was not subscribed.
	pub fn unsubscribe( &self, id: SubscriptionId ) -> bool {
		let mut handlers = self.handlers.lock().unwrap_or_else( PoisonError::into_inner );
		let before = handlers.len();
		handlers.retain(|( handler_id, _ )| *handler_id != id );
		handlers.len() != before
	}

	/// Invokes every attached handler with `arg`.
	///
	/// The handler list is snapshotted first, so handlers may subscribe or
	/// unsubscribe (themselves included) without deadlocking. A panicking handler
	/// is logged and does not prevent the remaining handlers from running.
	pub fn raise( &self, arg: &T ) {
		let handlers = self.handlers.lock()
			.unwrap_or_else( PoisonError::into_inner )
			.iter()
			.map(|( id, handler )| ( *id, Arc::clone( handler )))
			.collect::<Vec<_>>();

		handlers.into_iter().for_each(|( id, handler )| {
			if catch_unwind( AssertUnwindSafe(|| handler( arg ))).is_err() {
				tracing::warn!( subscription = ?id, "Event handler panicked" );
			}
		});
	}

	pub fn subscriber_count( &self ) -> usize {
		self.handlers.lock().unwrap_or_else( PoisonError::into_inner ).len()
	}

}

impl<T> Default for Event<T> {
	fn default() -> Self { Self::new() }
}

impl<T> std::fmt::Debug for Event<T> {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "Event" )
			.field( "subscribers", &self.subscriber_count() )
			.finish_non_exhaustive()
	}
}
