/// Identifies a type together with the module that defines it.
///
/// This is the universal key of the host: module records are looked up by
/// [`module_name`]( Self::module_name ), plugin descriptors compare by their
/// qualified name and a context reports missing imports as qualified names.
/// Identity is exact string equality, no version matching takes place.
#[derive( Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord )]
pub struct QualifiedName {
	type_name: String,
	module_name: String,
}

impl QualifiedName {

	/// Creates a qualified name from a type name and the name of its defining module.
	pub fn new( type_name: impl Into<String>, module_name: impl Into<String> ) -> Self {
		Self { type_name: type_name.into(), module_name: module_name.into() }
	}

	/// Full name of the type.
	#[inline] pub fn type_name( &self ) -> &str { &self.type_name }

	/// Full name of the module defining the type.
	#[inline] pub fn module_name( &self ) -> &str { &self.module_name }

	pub(crate) fn is_complete( &self ) -> bool {
		!self.type_name.is_empty() && !self.module_name.is_empty()
	}

}

impl std::fmt::Display for QualifiedName {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		write!( f, "{}, {}", self.type_name, self.module_name )
	}
}
