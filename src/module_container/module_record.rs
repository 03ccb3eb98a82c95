use std::path::{ Path, PathBuf };
use nonempty_collections::NEVec ;



/// Every physical location known for one logical module name.
///
/// A record can't be empty: the last path leaving a record takes the record with it.
#[derive( Debug, Clone )]
pub(super) struct ModuleRecord {
	paths: NEVec<PathBuf>,
}

impl ModuleRecord {

	pub fn new( path: PathBuf ) -> Self {
		Self { paths: NEVec::new( path ) }
	}

	/// Known paths in the order they were added.
	pub fn paths( &self ) -> Vec<PathBuf> {
		Vec::from( self.paths.clone() )
	}

	pub fn contains( &self, path: &Path ) -> bool {
		self.paths.iter().any(| known | known == path )
	}

	pub fn push( &mut self, path: PathBuf ) {
		self.paths.push( path );
	}

	/// Removes `path`, returning what is left of the record.
	///
	/// `None` means the record became empty and has to be dropped.
	pub fn without( self, path: &Path ) -> Option<Self> {
		let mut remaining = self.paths().into_iter().filter(| known | known != path );
		let head = remaining.next()?;
		let mut paths = NEVec::new( head );
		remaining.for_each(| known | paths.push( known ));
		Some( Self { paths })
	}

}
