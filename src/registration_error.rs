use std::path::PathBuf ;
use thiserror::Error ;

/// Errors returned by the registration calls of the
/// [`ModuleContainer`]( crate::ModuleContainer ) and the
/// [`PluginRegistry`]( crate::PluginRegistry ).
///
/// All of these are caller errors and fail fast, before any state changes.
#[derive( Error, Debug )]
pub enum RegistrationError {
	/// A required argument was empty.
	#[error( "Invalid Argument: {0}" )] InvalidArgument( &'static str ),
	/// The referenced file does not exist.
	#[error( "File Not Found: {}", .0.display() )] FileNotFound( PathBuf ),
	/// The exact path is already tracked.
	#[error( "Path Already Added: {}", .0.display() )] PathAlreadyAdded( PathBuf ),
	/// The directory instance is already registered.
	#[error( "Directory Already Added: {}", .0.display() )] DirectoryAlreadyAdded( PathBuf ),
	/// The directory instance was never registered.
	#[error( "Unknown Directory: {}", .0.display() )] UnknownDirectory( PathBuf ),
	/// The plugin source is already registered.
	#[error( "Source Already Added: {0}" )] SourceAlreadyAdded( String ),
	/// The plugin source was never registered.
	#[error( "Unknown Source: {0}" )] UnknownSource( String ),
}

/// Coarse classification shared by every error family of the crate.
#[derive( Copy, Clone, Debug, PartialEq, Eq, Hash )]
pub enum ErrorKind {
	InvalidArgument,
	NotFound,
	AlreadyExists,
	/// The bytes handed to a context are not a valid module.
	InvalidModule,
	/// A module could not be linked or instantiated inside a context.
	Link,
	/// Code inside a context trapped.
	Trap,
	/// A supplied setting was missing or had the wrong type.
	Setting,
	/// The isolated context no longer exists.
	ContextUnavailable,
}

impl RegistrationError {
	pub fn kind( &self ) -> ErrorKind { match self {
		Self::InvalidArgument( _ ) => ErrorKind::InvalidArgument,
		Self::FileNotFound( _ ) | Self::UnknownDirectory( _ ) | Self::UnknownSource( _ ) => ErrorKind::NotFound,
		Self::PathAlreadyAdded( _ ) | Self::DirectoryAlreadyAdded( _ ) | Self::SourceAlreadyAdded( _ ) => ErrorKind::AlreadyExists,
	}}
}
