use std::path::{ Path, PathBuf };

use crate::Event ;

/// A watched location that reports module files appearing and disappearing.
///
/// The physical watching mechanism is up to the implementor; the
/// [`ModuleContainer`]( crate::ModuleContainer ) only subscribes to the two events.
/// Events may be raised from any thread.
pub trait PluginDirectory: Send + Sync {

	/// Location being watched. Used to identify the directory in log records.
	fn path( &self ) -> &Path ;

	/// Raised with the path of a file that appeared in the directory.
	fn file_found( &self ) -> &Event<PathBuf> ;

	/// Raised with the path of a file that disappeared from the directory.
	fn file_lost( &self ) -> &Event<PathBuf> ;

}
