use std::collections::HashMap ;
use std::sync::Arc ;

/// A source of raw module bytes, queried by qualified module name.
///
/// Queried by an isolated context whenever code being loaded into it imports from
/// a module the context does not have yet. Absence is a normal answer: return
/// `None` and the import fails to resolve.
pub trait ModuleRepository {
	fn fetch( &self, qualified_module_name: &str ) -> Option<Vec<u8>> ;
}

/// An in-memory repository keyed by module name.
impl ModuleRepository for HashMap<String, Vec<u8>> {
	fn fetch( &self, qualified_module_name: &str ) -> Option<Vec<u8>> {
		self.get( qualified_module_name ).cloned()
	}
}

impl<R: ModuleRepository + ?Sized> ModuleRepository for Arc<R> {
	fn fetch( &self, qualified_module_name: &str ) -> Option<Vec<u8>> {
		( **self ).fetch( qualified_module_name )
	}
}

impl<R: ModuleRepository + ?Sized> ModuleRepository for &R {
	fn fetch( &self, qualified_module_name: &str ) -> Option<Vec<u8>> {
		( **self ).fetch( qualified_module_name )
	}
}
