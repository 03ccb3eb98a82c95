//! Plugin instantiation.
//!
//! A [`PluginCreator`] builds plugin instances inside one [`IsolatedContext`].
//! Creators are handed out by a [`CreatorCache`], which keeps at most one creator
//! per context alive.

use std::collections::HashMap ;
use std::sync::{ Arc, Mutex, PoisonError };
use thiserror::Error ;
use tracing::Dispatch ;

use crate::{ ContextId, ErrorKind, IsolatedContext, ModuleRepository, PluginDescriptor, PluginInstance, QualifiedName, ResolutionError, SettingError, Settings };
use crate::context::WeakContext ;
use crate::settings::apply as apply_settings ;



/// Everything that can go wrong in [`PluginCreator::create`].
#[derive( Error, Debug )]
pub enum CreateError {
	/// The descriptor does not name both a type and a module.
	#[error( "Invalid Argument: {0}" )] InvalidArgument( &'static str ),
	/// The context the creator belongs to has been dropped.
	#[error( "Context Unavailable: {0}" )] ContextUnavailable( String ),
	/// Construction failed inside the context.
	#[error( "Plugin Error: {plugin}: {cause}" )]
	Plugin { plugin: QualifiedName, #[source] cause: ResolutionError },
	/// The plugin was constructed but its settings could not be applied.
	#[error( "{0}" )] Setting( #[from] SettingError ),
}

impl CreateError {

	pub fn kind( &self ) -> ErrorKind { match self {
		Self::InvalidArgument( _ ) => ErrorKind::InvalidArgument,
		Self::ContextUnavailable( _ ) => ErrorKind::ContextUnavailable,
		Self::Plugin { cause, .. } => cause.kind(),
		Self::Setting( _ ) => ErrorKind::Setting,
	}}

	/// The failure reported from inside the context, if that is where it happened.
	pub fn cause( &self ) -> Option<&ResolutionError> { match self {
		Self::Plugin { cause, .. } => Some( cause ),
		_ => None,
	}}

}

/// Creates plugin instances inside one isolated context.
///
/// A creator holds its context weakly: it does not keep the context alive and
/// fails with [`CreateError::ContextUnavailable`] once the context is gone.
#[derive( Debug )]
pub struct PluginCreator {
	context: WeakContext,
	context_id: ContextId,
	context_name: String,
	dispatch: Option<Dispatch>,
}

impl PluginCreator {

	fn new( context: &IsolatedContext, dispatch: Option<Dispatch> ) -> Self {
		Self {
			context: context.downgrade(),
			context_id: context.id(),
			context_name: context.name().to_string(),
			dispatch,
		}
	}

	#[inline] pub fn context_id( &self ) -> ContextId { self.context_id }
	#[inline] pub fn context_name( &self ) -> &str { &self.context_name }

	/// Constructs the plugin type named by `descriptor` inside the creator's context
	/// and applies `settings` to it.
	///
	/// Every module the context does not have yet is fetched from `repository` while
	/// the call lasts; the repository is not referenced afterwards. `None` settings
	/// are treated as empty.
	///
	/// Failures are logged once, at error level, before being returned.
	pub fn create(
		&self,
		descriptor: &PluginDescriptor,
		repository: &dyn ModuleRepository,
		settings: Option<&Settings>,
	) -> Result<PluginInstance, CreateError> {
		self.logged(|| {
			let plugin = descriptor.qualified_name();
			let result = self.try_create( descriptor, repository, settings );
			match &result {
				Ok( _ ) => tracing::info!( context = %self.context_name, plugin = %plugin, "Created plugin {}", plugin ),
				Err( err ) => tracing::error!(
					context = %self.context_name,
					plugin = %plugin,
					kind = ?err.kind(),
					"Unable to create plugin {}: {}", plugin, err
				),
			}
			result
		})
	}

	fn try_create(
		&self,
		descriptor: &PluginDescriptor,
		repository: &dyn ModuleRepository,
		settings: Option<&Settings>,
	) -> Result<PluginInstance, CreateError> {

		let plugin = descriptor.qualified_name();
		if !plugin.is_complete() {
			return Err( CreateError::InvalidArgument( "descriptor must name both a type and a module" ));
		}
		let context = self.context.upgrade()
			.ok_or_else(|| CreateError::ContextUnavailable( self.context_name.clone() ))?;

		let empty = Settings::new();
		let settings = settings.unwrap_or( &empty );

		let instance = context.resolve_with( repository, | resolution | {
			let instance = resolution.construct( plugin )
				.map_err(| cause | CreateError::Plugin { plugin: plugin.clone(), cause })?;
			apply_settings( &mut resolution.state().store, &instance, descriptor, settings )?;
			Ok::<_, CreateError>( instance )
		})?;

		Ok( PluginInstance::new( context, instance, plugin.clone() ))

	}

	fn logged<R>( &self, scope: impl FnOnce() -> R ) -> R {
		match &self.dispatch {
			Some( dispatch ) => tracing::dispatcher::with_default( dispatch, scope ),
			None => scope(),
		}
	}

}

/// Hands out one [`PluginCreator`] per isolated context.
///
/// Asking twice for the same context yields the same creator. Entries of contexts
/// that no longer exist are pruned whenever a creator is requested.
#[derive( Debug, Default )]
pub struct CreatorCache {
	creators: Mutex<HashMap<ContextId, Arc<PluginCreator>>>,
}

impl CreatorCache {

	pub fn new() -> Self { Self::default() }

	/// The creator for `context`, logging to the default subscriber.
	pub fn get_creator( &self, context: &IsolatedContext ) -> Arc<PluginCreator> {
		self.creator( context, None )
	}

	/// The creator for `context`, logging through `dispatch`.
	///
	/// The dispatch only takes effect if this call is what creates the creator;
	/// an existing creator for the context is returned as it is.
	pub fn get_creator_with_log( &self, context: &IsolatedContext, dispatch: Dispatch ) -> Arc<PluginCreator> {
		self.creator( context, Some( dispatch ))
	}

	/// Forgets the creator of `context`. Returns whether there was one.
	pub fn release( &self, context: &IsolatedContext ) -> bool {
		self.lock().remove( &context.id() ).is_some()
	}

	fn creator( &self, context: &IsolatedContext, dispatch: Option<Dispatch> ) -> Arc<PluginCreator> {

		let mut creators = self.lock();
		creators.retain(| _, creator | creator.context.upgrade().is_some() );
		if let Some( creator ) = creators.get( &context.id() ) { return Arc::clone( creator ) }

		let creator = Arc::new( PluginCreator::new( context, dispatch ));
		creators.insert( context.id(), Arc::clone( &creator ));
		drop( creators );

		creator.logged(|| tracing::info!(
			context = %context.name(),
			context_id = %context.id(),
			"Created plugin creator for context {}", context.name()
		));
		creator

	}

	fn lock( &self ) -> std::sync::MutexGuard<'_, HashMap<ContextId, Arc<PluginCreator>>> {
		self.creators.lock().unwrap_or_else( PoisonError::into_inner )
	}

}
