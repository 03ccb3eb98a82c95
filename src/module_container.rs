//! On-demand module storage.
//!
//! The [`ModuleContainer`] keeps track of where module files live on disk and hands
//! out their bytes when an isolated context asks for them. Nothing is kept in
//! memory but the locations: a module that is removed from disk is simply gone,
//! and a module that is replaced on disk is served in its new form.

use std::collections::HashMap ;
use std::collections::hash_map::Entry ;
use std::path::{ Path, PathBuf };
use std::sync::{ Arc, Mutex, PoisonError, Weak };
use itertools::Itertools ;
use tracing::{ debug, error, info, warn };

mod module_file ;
mod module_record ;
mod plugin_directory ;

pub use module_file::FetchOptions ;
pub use plugin_directory::PluginDirectory ;
use module_file::{ Probe, ReadOutcome };
use module_record::ModuleRecord ;

use crate::{ Event, ModuleRepository, RegistrationError, SubscriptionId };



/// Payload of [`ModuleContainer::module_added`] and [`ModuleContainer::module_removed`].
#[derive( Clone, Debug, PartialEq, Eq )]
pub struct ModuleEvent {
	/// Qualified name of the module.
	pub name: String,
	/// Path whose addition or removal caused the event.
	pub path: PathBuf,
}

/// Tracks known module files and serves their content by qualified module name.
///
/// A module name may be known under several paths (the same module copied into
/// more than one watched directory). [`module_added`]( Self::module_added ) fires
/// when a name becomes known and [`module_removed`]( Self::module_removed ) when
/// its last path is gone, no matter how many paths came and went in between.
///
/// The container is a [`ModuleRepository`] and is usually what gets passed to
/// [`PluginCreator::create`]( crate::PluginCreator::create ).
pub struct ModuleContainer {
	inner: Arc<ContainerInner>,
}

struct ContainerInner {
	records: Mutex<HashMap<String, ModuleRecord>>,
	directories: Mutex<HashMap<usize, DirectorySubscription>>,
	module_added: Event<ModuleEvent>,
	module_removed: Event<ModuleEvent>,
	options: FetchOptions,
}

struct DirectorySubscription {
	directory: Arc<dyn PluginDirectory>,
	found: SubscriptionId,
	lost: SubscriptionId,
}

impl ModuleContainer {

	pub fn new() -> Self { Self::with_options( FetchOptions::default() ) }

	pub fn with_options( options: FetchOptions ) -> Self {
		Self { inner: Arc::new( ContainerInner {
			records: Mutex::new( HashMap::new() ),
			directories: Mutex::new( HashMap::new() ),
			module_added: Event::new(),
			module_removed: Event::new(),
			options,
		})}
	}

	/// Raised when a module name becomes known.
	#[inline] pub fn module_added( &self ) -> &Event<ModuleEvent> { &self.inner.module_added }

	/// Raised when the last known path of a module name is removed.
	#[inline] pub fn module_removed( &self ) -> &Event<ModuleEvent> { &self.inner.module_removed }

	/// Starts tracking the module file at `path`.
	///
	/// Returns `Ok( false )` without raising anything if the file is not a valid
	/// module or is currently locked by a writer.
	///
	/// # Errors
	/// - [`RegistrationError::InvalidArgument`] if `path` is empty
	/// - [`RegistrationError::FileNotFound`] if nothing exists at `path`
	/// - [`RegistrationError::PathAlreadyAdded`] if `path` is already tracked
	pub fn add( &self, path: impl AsRef<Path> ) -> Result<bool, RegistrationError> {
		self.inner.add( path.as_ref() )
	}

	/// Stops tracking `path`. Unknown paths are ignored.
	///
	/// # Errors
	/// Returns [`RegistrationError::InvalidArgument`] if `path` is empty.
	pub fn remove( &self, path: impl AsRef<Path> ) -> Result<(), RegistrationError> {
		self.inner.remove( path.as_ref() )
	}

	/// Follows the file events of `directory` until [`remove_dir`]( Self::remove_dir ) is called.
	///
	/// # Errors
	/// Returns [`RegistrationError::DirectoryAlreadyAdded`] if this directory instance is already followed.
	pub fn add_dir( &self, directory: Arc<dyn PluginDirectory> ) -> Result<(), RegistrationError> {

		let key = directory_key( &directory );
		let mut directories = self.inner.directories.lock().unwrap_or_else( PoisonError::into_inner );
		if directories.contains_key( &key ) {
			return Err( RegistrationError::DirectoryAlreadyAdded( directory.path().to_path_buf() ));
		}

		let found = {
			let inner = Arc::downgrade( &self.inner );
			directory.file_found().subscribe( move | path | with_inner( &inner, | inner | inner.on_file_found( key, path )))
		};
		let lost = {
			let inner = Arc::downgrade( &self.inner );
			directory.file_lost().subscribe( move | path | with_inner( &inner, | inner | inner.on_file_lost( key, path )))
		};

		let path = directory.path().display().to_string();
		directories.insert( key, DirectorySubscription { directory, found, lost });
		drop( directories );

		info!( directory = %path, "Added plugin directory {}", path );
		Ok(())

	}

	/// Stops following `directory`. Events it raises afterwards have no effect.
	///
	/// # Errors
	/// Returns [`RegistrationError::UnknownDirectory`] if this directory instance was never added.
	pub fn remove_dir( &self, directory: &Arc<dyn PluginDirectory> ) -> Result<(), RegistrationError> {

		let subscription = self.inner.directories.lock()
			.unwrap_or_else( PoisonError::into_inner )
			.remove( &directory_key( directory ))
			.ok_or_else(|| RegistrationError::UnknownDirectory( directory.path().to_path_buf() ))?;
		subscription.detach();

		info!( directory = %directory.path().display(), "Removed plugin directory {}", directory.path().display() );
		Ok(())

	}

	/// Returns the content of the module named `name`, or `None` if it can't be read.
	///
	/// Known paths are tried in the order they were added; a path locked by a writer
	/// is retried for the configured [`FetchOptions::lock_timeout`]. Failures are
	/// logged, never returned.
	pub fn fetch( &self, name: &str ) -> Option<Vec<u8>> {
		self.inner.fetch( name )
	}

	/// Names of every module currently known, sorted.
	pub fn known_modules( &self ) -> Vec<String> {
		self.inner.records.lock()
			.unwrap_or_else( PoisonError::into_inner )
			.keys()
			.cloned()
			.sorted()
			.collect()
	}

	/// Paths known for `name`, in the order they were added.
	pub fn paths_of( &self, name: &str ) -> Option<Vec<PathBuf>> {
		self.inner.paths_of( name )
	}

}

impl Default for ModuleContainer {
	fn default() -> Self { Self::new() }
}

impl ModuleRepository for ModuleContainer {
	fn fetch( &self, qualified_module_name: &str ) -> Option<Vec<u8>> {
		self.inner.fetch( qualified_module_name )
	}
}

impl std::fmt::Debug for ModuleContainer {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "ModuleContainer" )
			.field( "modules", &self.known_modules() )
			.field( "options", &self.inner.options )
			.finish_non_exhaustive()
	}
}

impl ContainerInner {

	fn add( &self, path: &Path ) -> Result<bool, RegistrationError> {

		if path.as_os_str().is_empty() { return Err( RegistrationError::InvalidArgument( "path" )) }
		if !path.exists() { return Err( RegistrationError::FileNotFound( path.to_path_buf() )) }
		if self.tracks( path ) { return Err( RegistrationError::PathAlreadyAdded( path.to_path_buf() )) }

		let name = match module_file::probe( path ) {
			Probe::Module( name ) => name,
			Probe::Locked => {
				debug!( path = %path.display(), "Ignoring {}, file is locked", path.display() );
				return Ok( false );
			},
			Probe::Invalid( reason ) => {
				debug!( path = %path.display(), reason = %reason, "Ignoring {}, not a valid module", path.display() );
				return Ok( false );
			},
		};

		let first_path = {
			let mut records = self.records.lock().unwrap_or_else( PoisonError::into_inner );
			if records.values().any(| record | record.contains( path )) {
				return Err( RegistrationError::PathAlreadyAdded( path.to_path_buf() ));
			}
			match records.entry( name.clone() ) {
				Entry::Occupied( mut entry ) => { entry.get_mut().push( path.to_path_buf() ); false },
				Entry::Vacant( entry ) => { entry.insert( ModuleRecord::new( path.to_path_buf() )); true },
			}
		};

		info!( module = %name, path = %path.display(), "Module added {} from {}", name, path.display() );
		if first_path {
			self.module_added.raise( &ModuleEvent { name, path: path.to_path_buf() });
		}
		Ok( true )

	}

	fn remove( &self, path: &Path ) -> Result<(), RegistrationError> {

		if path.as_os_str().is_empty() { return Err( RegistrationError::InvalidArgument( "path" )) }

		let removed = {
			let mut records = self.records.lock().unwrap_or_else( PoisonError::into_inner );
			let name = records.iter()
				.find(|( _, record )| record.contains( path ))
				.map(|( name, _ )| name.clone() );
			name.and_then(| name | records.remove( &name ).map(| record | match record.without( path ) {
				Some( remaining ) => { records.insert( name.clone(), remaining ); ( name, false ) },
				None => ( name, true ),
			}))
		};

		let Some(( name, last_path )) = removed else { return Ok(()) };

		info!( module = %name, path = %path.display(), "Module removed {} from {}", name, path.display() );
		if last_path {
			self.module_removed.raise( &ModuleEvent { name, path: path.to_path_buf() });
		}
		Ok(())

	}

	fn fetch( &self, name: &str ) -> Option<Vec<u8>> {

		let Some( paths ) = self.paths_of( name ) else {
			warn!( module = %name, "Unable to fetch {}, module not known.", name );
			return None ;
		};

		let mut locked = Vec::with_capacity( 0 );
		for path in &paths {
			match module_file::wait_and_read( path, self.options ) {
				Ok( ReadOutcome::Read( bytes )) => {
					debug!( module = %name, path = %path.display(), bytes = bytes.len(),
						"Module fetched {} ({} bytes read from {})", name, bytes.len(), path.display() );
					return Some( bytes );
				},
				Ok( ReadOutcome::Missing ) => {},
				Ok( ReadOutcome::Locked ) => locked.push( path ),
				Err( err ) => {
					error!( module = %name, path = %path.display(), error = %err,
						"Exception while fetching {} ({}) {}", name, path.display(), err );
					return None ;
				},
			}
		}

		let reason = match locked.is_empty() { true => "not found", false => "not readable" };
		error!(
			module = %name,
			paths = %paths.iter().map(| path | path.display() ).join( ", " ),
			"Unable to fetch {}, file {} in these locations:", name, reason
		);
		paths.iter().for_each(| path | match locked.contains( &path ) {
			true => error!( "  --> {} (locked)", path.display() ),
			false => error!( "  --> {}", path.display() ),
		});
		None

	}

	fn paths_of( &self, name: &str ) -> Option<Vec<PathBuf>> {
		self.records.lock()
			.unwrap_or_else( PoisonError::into_inner )
			.get( name )
			.map( ModuleRecord::paths )
	}

	fn tracks( &self, path: &Path ) -> bool {
		self.records.lock()
			.unwrap_or_else( PoisonError::into_inner )
			.values()
			.any(| record | record.contains( path ))
	}

	fn follows( &self, directory: usize ) -> bool {
		self.directories.lock().unwrap_or_else( PoisonError::into_inner ).contains_key( &directory )
	}

	fn on_file_found( &self, directory: usize, path: &Path ) {
		if !self.follows( directory ) { return }
		match self.add( path ) {
			Ok( _ ) => {},
			Err( err @ RegistrationError::PathAlreadyAdded( _ )) => debug!( error = %err, "Ignoring file found event" ),
			Err( err ) => warn!( path = %path.display(), error = %err, "Failed to add found file {}", path.display() ),
		}
	}

	fn on_file_lost( &self, directory: usize, path: &Path ) {
		if !self.follows( directory ) { return }
		if let Err( err ) = self.remove( path ) {
			warn!( path = %path.display(), error = %err, "Failed to remove lost file {}", path.display() );
		}
	}

}

impl Drop for ContainerInner {
	fn drop( &mut self ) {
		self.directories.get_mut()
			.unwrap_or_else( PoisonError::into_inner )
			.drain()
			.for_each(|( _, subscription )| subscription.detach() );
	}
}

impl DirectorySubscription {
	fn detach( self ) {
		self.directory.file_found().unsubscribe( self.found );
		self.directory.file_lost().unsubscribe( self.lost );
	}
}

fn directory_key( directory: &Arc<dyn PluginDirectory> ) -> usize {
	Arc::as_ptr( directory ).cast::<()>() as usize
}

fn with_inner( inner: &Weak<ContainerInner>, handle: impl FnOnce( &ContainerInner )) {
	if let Some( inner ) = inner.upgrade() { handle( &inner ) }
}
