//! Isolated execution contexts.
//!
//! An [`IsolatedContext`] is a wasmtime [`Store`] paired with its own core
//! [`Linker`]. Everything loaded into a context (plugin modules and the
//! modules they import from) lives in that context's namespace only: linear
//! memories, globals and tables of one context are unreachable from any other,
//! and a trap inside a context surfaces as an error instead of taking the host down.
//!
//! A context starts out empty. Modules enter it lazily through a [`Resolution`],
//! which asks a [`ModuleRepository`]( crate::ModuleRepository ) for the bytes of
//! every module the context can't find locally.

use std::collections::HashMap ;
use std::sync::atomic::{ AtomicU64, Ordering };
use std::sync::{ Arc, Mutex, MutexGuard, PoisonError, Weak };
use wasmtime::{ Engine, Instance, Linker, Module, Store, StoreLimits, StoreLimitsBuilder };

mod resolution ;

pub use resolution::ResolutionError ;
pub(crate) use resolution::Resolution ;

use crate::ModuleRepository ;



static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new( 1 );

/// Process-unique identity of an [`IsolatedContext`]. Never reused.
#[derive( Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord )]
pub struct ContextId( u64 );

impl std::fmt::Display for ContextId {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		std::fmt::Display::fmt( &self.0, f )
	}
}

/// Resource limits applied to everything running inside a context.
#[derive( Copy, Clone, Debug, Default, PartialEq, Eq )]
pub struct ContextOptions {
	fuel_limit: Option<u64>,
	memory_limit: Option<usize>,
	instance_limit: Option<usize>,
}

impl ContextOptions {

	pub fn new() -> Self { Self::default() }

	/// Fuel granted to every call into the context (instantiation, constructors,
	/// member calls). Remaining fuel is reset to 0 afterwards.
	///
	/// Only has an effect if the engine was created with
	/// [`Config::consume_fuel`]( wasmtime::Config::consume_fuel ).
	pub fn with_fuel_limit( mut self, fuel: u64 ) -> Self {
		self.fuel_limit = Some( fuel );
		self
	}

	/// Maximum size in bytes of any single linear memory in the context.
	pub fn with_memory_limit( mut self, bytes: usize ) -> Self {
		self.memory_limit = Some( bytes );
		self
	}

	/// Maximum number of module instances the context may hold at once.
	///
	/// Every `create` adds an instance, and instances are only released together
	/// with the context. Unlimited unless set.
	pub fn with_instance_limit( mut self, count: usize ) -> Self {
		self.instance_limit = Some( count );
		self
	}

	#[inline] pub fn fuel_limit( &self ) -> Option<u64> { self.fuel_limit }
	#[inline] pub fn memory_limit( &self ) -> Option<usize> { self.memory_limit }
	#[inline] pub fn instance_limit( &self ) -> Option<usize> { self.instance_limit }

	fn store_limits( &self ) -> StoreLimits {
		let instances = self.instance_limit.unwrap_or( usize::MAX );
		let limits = StoreLimitsBuilder::new()
			.instances( instances )
			.memories( usize::MAX )
			.tables( usize::MAX );
		match self.memory_limit {
			Some( bytes ) => limits.memory_size( bytes ).build(),
			None => limits.build(),
		}
	}

}

/// A handle to an isolated execution context.
///
/// Cloning the handle does not create a new context; all clones refer to the same
/// namespace and share its [`ContextId`]. Calls into one context are serialised.
///
/// Instances live as long as the context does. Dropping a [`PluginInstance`]( crate::PluginInstance )
/// does not free its store slot, so a long-lived context grows with every `create`.
#[derive( Clone )]
pub struct IsolatedContext {
	inner: Arc<ContextInner>,
}

/// A handle that does not keep its context alive.
#[derive( Clone, Debug )]
pub(crate) struct WeakContext {
	inner: Weak<ContextInner>,
}

struct ContextInner {
	id: ContextId,
	name: String,
	engine: Engine,
	options: ContextOptions,
	state: Mutex<ContextState>,
}

pub(crate) struct ContextState {
	pub(crate) store: Store<ContextData>,
	pub(crate) linker: Linker<ContextData>,
	/// Compiled modules, by module name
	pub(crate) modules: HashMap<String, Module>,
	/// Instantiated dependency modules registered with the linker, by module name
	pub(crate) dependencies: HashMap<String, Instance>,
}

pub(crate) struct ContextData {
	limits: StoreLimits,
}

impl IsolatedContext {

	/// Creates an empty context without resource limits.
	pub fn new( engine: &Engine, name: impl Into<String> ) -> Self {
		Self::with_options( engine, name, ContextOptions::default() )
	}

	pub fn with_options( engine: &Engine, name: impl Into<String>, options: ContextOptions ) -> Self {

		let mut store = Store::new( engine, ContextData { limits: options.store_limits() });
		store.limiter(| data | &mut data.limits );

		Self { inner: Arc::new( ContextInner {
			id: ContextId( NEXT_CONTEXT_ID.fetch_add( 1, Ordering::Relaxed )),
			name: name.into(),
			engine: engine.clone(),
			options,
			state: Mutex::new( ContextState {
				store,
				linker: Linker::new( engine ),
				modules: HashMap::new(),
				dependencies: HashMap::new(),
			}),
		})}

	}

	#[inline] pub fn id( &self ) -> ContextId { self.inner.id }

	/// Friendly name given at creation, used in log records.
	#[inline] pub fn name( &self ) -> &str { &self.inner.name }

	#[inline] pub fn options( &self ) -> ContextOptions { self.inner.options }

	/// Names of every module compiled into this context so far, sorted.
	pub fn loaded_modules( &self ) -> Vec<String> {
		let state = self.lock();
		let mut names = state.modules.keys().cloned().collect::<Vec<_>>();
		names.sort();
		names
	}

	pub(crate) fn downgrade( &self ) -> WeakContext {
		WeakContext { inner: Arc::downgrade( &self.inner ) }
	}

	/// Runs `scope` with a resolution hook backed by `repository`.
	///
	/// The hook exists for the duration of `scope` only; no reference to the
	/// repository outlives the call.
	pub(crate) fn resolve_with<R>(
		&self,
		repository: &dyn ModuleRepository,
		scope: impl FnOnce( &mut Resolution<'_> ) -> R,
	) -> R {
		let mut state = self.lock();
		self.fuel_up( &mut state );
		let result = scope( &mut Resolution::new( &mut *state, &self.inner.engine, repository ));
		self.drain_fuel( &mut state );
		result
	}

	/// Runs `call` with exclusive access to the context's store.
	pub(crate) fn enter<R>( &self, call: impl FnOnce( &mut ContextState ) -> R ) -> R {
		let mut state = self.lock();
		self.fuel_up( &mut state );
		let result = call( &mut *state );
		self.drain_fuel( &mut state );
		result
	}

	fn lock( &self ) -> MutexGuard<'_, ContextState> {
		self.inner.state.lock().unwrap_or_else( PoisonError::into_inner )
	}

	fn fuel_up( &self, state: &mut ContextState ) {
		let Some( fuel ) = self.inner.options.fuel_limit else { return };
		if let Err( err ) = state.store.set_fuel( fuel ) {
			tracing::warn!( context = %self.inner.name, error = %err, "Fuel limit set but the engine does not consume fuel" );
		}
	}

	fn drain_fuel( &self, state: &mut ContextState ) {
		// Reset fuel to 0 after the call to prevent leakage to subsequent calls
		if self.inner.options.fuel_limit.is_some() { let _ = state.store.set_fuel( 0 ); }
	}

}

impl PartialEq for IsolatedContext {
	fn eq( &self, other: &Self ) -> bool { self.inner.id == other.inner.id }
}
impl Eq for IsolatedContext {}

impl std::fmt::Debug for IsolatedContext {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "IsolatedContext" )
			.field( "id", &self.inner.id )
			.field( "name", &self.inner.name )
			.field( "options", &self.inner.options )
			.finish_non_exhaustive()
	}
}

impl WeakContext {
	pub(crate) fn upgrade( &self ) -> Option<IsolatedContext> {
		self.inner.upgrade().map(| inner | IsolatedContext { inner })
	}
}
