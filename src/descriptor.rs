//! Plugin descriptors.
//!
//! A descriptor is what metadata extraction produces for every plugin type found
//! in a scanned module. It is the currency of the [`PluginRegistry`]( crate::PluginRegistry )
//! and the input of [`PluginCreator::create`]( crate::PluginCreator::create ).

use std::collections::BTreeSet ;
use std::hash::{ Hash, Hasher };

use crate::QualifiedName ;

/// Describes one plugin type: where it lives, what it declares about itself and
/// which settings it cannot be created without.
///
/// Descriptors compare and hash by [`QualifiedName`] only, so two descriptors of the
/// same type collapse into one entry of a set regardless of their metadata.
#[derive( Clone, Debug )]
pub struct PluginDescriptor {
	qualified_name: QualifiedName,
	/// Ordered key/value annotations; a key may occur more than once
	metadata: Vec<( String, String )>,
	required_settings: BTreeSet<String>,
}

impl PluginDescriptor {

	/// Creates a descriptor with no metadata and no required settings.
	pub fn new( qualified_name: QualifiedName ) -> Self {
		Self {
			qualified_name,
			metadata: Vec::with_capacity( 0 ),
			required_settings: BTreeSet::new(),
		}
	}

	/// Appends a metadata annotation. Existing values for the same key are kept.
	pub fn with_metadata( mut self, key: impl Into<String>, value: impl Into<String> ) -> Self {
		self.metadata.push(( key.into(), value.into() ));
		self
	}

	/// Declares a setting that must be supplied when the plugin is created.
	pub fn with_required_setting( mut self, name: impl Into<String> ) -> Self {
		self.required_settings.insert( name.into() );
		self
	}

	#[inline] pub fn qualified_name( &self ) -> &QualifiedName { &self.qualified_name }

	/// All metadata annotations in declaration order.
	#[inline] pub fn metadata( &self ) -> &[( String, String )] { &self.metadata }

	/// Every value annotated under `key`, in declaration order.
	pub fn metadata_values<'a>( &'a self, key: &'a str ) -> impl Iterator<Item = &'a str> + 'a {
		self.metadata.iter()
			.filter( move |( k, _ )| k == key )
			.map(|( _, value )| value.as_str() )
	}

	#[inline] pub fn required_settings( &self ) -> &BTreeSet<String> { &self.required_settings }

}

impl PartialEq for PluginDescriptor {
	fn eq( &self, other: &Self ) -> bool { self.qualified_name == other.qualified_name }
}
impl Eq for PluginDescriptor {}

impl Hash for PluginDescriptor {
	fn hash<H: Hasher>( &self, state: &mut H ) { self.qualified_name.hash( state ) }
}
