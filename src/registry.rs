//! The plugin registry.
//!
//! A [`PluginRegistry`] listens to any number of [`PluginSource`]s and keeps the
//! set of plugin descriptors they announced. Sources typically sit on top of a
//! [`ModuleContainer`]( crate::ModuleContainer ) and extract descriptors from the
//! modules it reports.

use std::collections::{ HashMap, HashSet };
use std::fmt ;
use std::sync::{ Arc, Mutex, MutexGuard, PoisonError, Weak };
use pipe_trait::Pipe ;
use tracing::{ debug, info };

use crate::{ Event, PluginDescriptor, QualifiedName, RegistrationError, SubscriptionId };



/// Announces plugin descriptors as they appear and disappear.
pub trait PluginSource: Send + Sync {
	fn plugin_added( &self ) -> &Event<PluginDescriptor> ;
	fn plugin_removed( &self ) -> &Event<PluginDescriptor> ;
	/// Human readable kind of source, used in log records.
	fn kind( &self ) -> &str { std::any::type_name::<Self>() }
}

/// Selects plugins out of the registry's current set.
///
/// The [`Display`]( fmt::Display ) form names the filter in log records.
pub trait PluginFilter: fmt::Display + Send + Sync {
	fn filter( &self, descriptors: &HashSet<PluginDescriptor> ) -> Vec<PluginDescriptor> ;
}

/// The set of plugin descriptors announced by the registered sources.
///
/// Descriptors are a set keyed by [`QualifiedName`]: announcing the same type twice
/// keeps the most recent descriptor, and removing it once forgets it.
pub struct PluginRegistry {
	inner: Arc<RegistryInner>,
}

struct RegistryInner {
	plugins: Mutex<HashSet<PluginDescriptor>>,
	sources: Mutex<HashMap<usize, SourceSubscription>>,
}

struct SourceSubscription {
	source: Arc<dyn PluginSource>,
	added: SubscriptionId,
	removed: SubscriptionId,
}

impl PluginRegistry {

	pub fn new() -> Self {
		Self { inner: Arc::new( RegistryInner {
			plugins: Mutex::new( HashSet::new() ),
			sources: Mutex::new( HashMap::new() ),
		})}
	}

	/// Starts listening to `source`.
	///
	/// Fails if this exact source instance is already registered.
	pub fn add_plugin_source( &self, source: Arc<dyn PluginSource> ) -> Result<(), RegistrationError> {

		let key = source_key( &source );
		let mut sources = self.inner.lock_sources();
		if sources.contains_key( &key ) {
			return Err( RegistrationError::SourceAlreadyAdded( source.kind().to_string() ));
		}

		let added = {
			let inner = Arc::downgrade( &self.inner );
			source.plugin_added().subscribe( move | descriptor | with_inner( &inner, | inner | inner.on_plugin_added( key, descriptor )))
		};
		let removed = {
			let inner = Arc::downgrade( &self.inner );
			source.plugin_removed().subscribe( move | descriptor | with_inner( &inner, | inner | inner.on_plugin_removed( key, descriptor )))
		};

		let kind = source.kind().to_string();
		sources.insert( key, SourceSubscription { source, added, removed });
		drop( sources );

		debug!( source = %kind, "Added plugin source {}", kind );
		Ok(())

	}

	/// Stops listening to `source`. Descriptors it announced stay in the registry.
	pub fn remove_plugin_source( &self, source: &Arc<dyn PluginSource> ) -> Result<(), RegistrationError> {

		let subscription = self.inner.lock_sources()
			.remove( &source_key( source ))
			.ok_or_else(|| RegistrationError::UnknownSource( source.kind().to_string() ))?;
		subscription.detach();

		debug!( source = %source.kind(), "Removed plugin source {}", source.kind() );
		Ok(())

	}

	/// A snapshot of the known descriptors, narrowed down by `filter` if one is given.
	///
	/// The filter runs on a copy of the set; sources may keep announcing plugins
	/// while it does.
	pub fn plugins( &self, filter: Option<&dyn PluginFilter> ) -> Vec<PluginDescriptor> {

		match filter {
			Some( filter ) => debug!( filter = %filter, "Returning plugins for {}", filter ),
			None => debug!( filter = "none", "Returning plugins for none" ),
		}

		let snapshot = self.inner.lock_plugins().clone();
		snapshot.pipe(| snapshot | match filter {
			Some( filter ) => filter.filter( &snapshot ),
			None => snapshot.into_iter().collect(),
		})

	}

	pub fn plugin_count( &self ) -> usize { self.inner.lock_plugins().len() }

	/// Whether a descriptor for `qualified_name` is currently known.
	pub fn contains( &self, qualified_name: &QualifiedName ) -> bool {
		self.inner.lock_plugins().iter().any(| descriptor | descriptor.qualified_name() == qualified_name )
	}

}

impl Default for PluginRegistry {
	fn default() -> Self { Self::new() }
}

impl fmt::Debug for PluginRegistry {
	fn fmt( &self, f: &mut fmt::Formatter<'_> ) -> fmt::Result {
		f.debug_struct( "PluginRegistry" )
			.field( "plugins", &self.plugin_count() )
			.field( "sources", &self.inner.lock_sources().len() )
			.finish()
	}
}

impl RegistryInner {

	fn lock_plugins( &self ) -> MutexGuard<'_, HashSet<PluginDescriptor>> {
		self.plugins.lock().unwrap_or_else( PoisonError::into_inner )
	}

	fn lock_sources( &self ) -> MutexGuard<'_, HashMap<usize, SourceSubscription>> {
		self.sources.lock().unwrap_or_else( PoisonError::into_inner )
	}

	fn follows( &self, source: usize ) -> bool {
		self.lock_sources().contains_key( &source )
	}

	fn on_plugin_added( &self, source: usize, descriptor: &PluginDescriptor ) {
		if !self.follows( source ) { return }
		self.lock_plugins().replace( descriptor.clone() );
		info!( plugin = %descriptor.qualified_name(), "Added plugin {}", descriptor.qualified_name() );
	}

	fn on_plugin_removed( &self, source: usize, descriptor: &PluginDescriptor ) {
		if !self.follows( source ) { return }
		if self.lock_plugins().remove( descriptor ) {
			info!( plugin = %descriptor.qualified_name(), "Removed plugin {}", descriptor.qualified_name() );
		}
	}

}

impl Drop for RegistryInner {
	fn drop( &mut self ) {
		self.sources.get_mut()
			.unwrap_or_else( PoisonError::into_inner )
			.drain()
			.for_each(|( _, subscription )| subscription.detach() );
	}
}

impl SourceSubscription {
	fn detach( self ) {
		self.source.plugin_added().unsubscribe( self.added );
		self.source.plugin_removed().unsubscribe( self.removed );
	}
}

fn source_key( source: &Arc<dyn PluginSource> ) -> usize {
	Arc::as_ptr( source ).cast::<()>() as usize
}

fn with_inner( inner: &Weak<RegistryInner>, handle: impl FnOnce( &RegistryInner )) {
	if let Some( inner ) = inner.upgrade() { handle( &inner ) }
}
