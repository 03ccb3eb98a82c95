use std::fs::{ File, TryLockError };
use std::io::{ self, Read };
use std::path::Path ;
use std::time::{ Duration, Instant };



/// Timing of the bounded wait used when a module file is held exclusively by a writer.
#[derive( Copy, Clone, Debug, PartialEq, Eq )]
pub struct FetchOptions {
	lock_timeout: Duration,
	poll_interval: Duration,
}

impl FetchOptions {

	/// How long a fetch keeps retrying one locked path before moving on.
	pub fn with_lock_timeout( mut self, timeout: Duration ) -> Self {
		self.lock_timeout = timeout ;
		self
	}

	/// Pause between two attempts to open a locked path.
	pub fn with_poll_interval( mut self, interval: Duration ) -> Self {
		self.poll_interval = interval ;
		self
	}

	#[inline] pub fn lock_timeout( &self ) -> Duration { self.lock_timeout }
	#[inline] pub fn poll_interval( &self ) -> Duration { self.poll_interval }

}

impl Default for FetchOptions {
	fn default() -> Self {
		Self { lock_timeout: Duration::from_secs( 2 ), poll_interval: Duration::from_millis( 25 ) }
	}
}

/// What a quick look at a candidate module file revealed.
#[derive( Debug )]
pub(super) enum Probe {
	Module( String ),
	Locked,
	Invalid( String ),
}

pub(super) enum ReadOutcome {
	Read( Vec<u8> ),
	Missing,
	Locked,
}

/// Reads the module name of the file at `path` without waiting for locks.
///
/// Core modules carrying no module name in their `name` section are named after
/// their file stem.
pub(super) fn probe( path: &Path ) -> Probe {

	let mut file = match File::open( path ) {
		Ok( file ) => file,
		Err( err ) => return Probe::Invalid( err.to_string() ),
	};
	match file.try_lock_shared() {
		Ok(()) => {},
		Err( TryLockError::WouldBlock ) => return Probe::Locked,
		Err( TryLockError::Error( err )) => return Probe::Invalid( err.to_string() ),
	}

	let mut bytes = Vec::new();
	if let Err( err ) = file.read_to_end( &mut bytes ) { return Probe::Invalid( err.to_string() ) }

	match module_name( &bytes ) {
		Ok( Some( name )) => Probe::Module( name ),
		Ok( None ) => match path.file_stem() {
			Some( stem ) => Probe::Module( stem.to_string_lossy().into_owned() ),
			None => Probe::Invalid( "module has no name".to_string() ),
		},
		Err( err ) => Probe::Invalid( err ),
	}

}

/// Opens and reads `path`, retrying while another handle holds an exclusive lock on it.
pub(super) fn wait_and_read( path: &Path, options: FetchOptions ) -> io::Result<ReadOutcome> {

	let deadline = Instant::now() + options.lock_timeout ;
	loop {

		let mut file = match File::open( path ) {
			Ok( file ) => file,
			Err( err ) if err.kind() == io::ErrorKind::NotFound => return Ok( ReadOutcome::Missing ),
			Err( err ) => return Err( err ),
		};

		match file.try_lock_shared() {
			Ok(()) => {
				let mut bytes = Vec::new();
				file.read_to_end( &mut bytes )?;
				return Ok( ReadOutcome::Read( bytes ));
			},
			Err( TryLockError::WouldBlock ) => {},
			Err( TryLockError::Error( err )) => return Err( err ),
		}

		if Instant::now() >= deadline { return Ok( ReadOutcome::Locked ) }
		std::thread::sleep( options.poll_interval );

	}

}

fn module_name( bytes: &[u8] ) -> Result<Option<String>, String> {

	if !wasmparser::Parser::is_core_wasm( bytes ) { return Err( "not a core wasm module".to_string() ) }
	wasmparser::Validator::new().validate_all( bytes ).map_err(| err | err.to_string() )?;

	for payload in wasmparser::Parser::new( 0 ).parse_all( bytes ) {
		let wasmparser::Payload::CustomSection( section ) = payload.map_err(| err | err.to_string() )? else { continue };
		let wasmparser::KnownCustom::Name( names ) = section.as_known() else { continue };
		for name in names {
			if let wasmparser::Name::Module { name, .. } = name.map_err(| err | err.to_string() )? {
				return Ok( Some( name.to_string() ));
			}
		}
	}

	Ok( None )

}
