//! Plugin settings.
//!
//! Settings are handed to [`PluginCreator::create`]( crate::PluginCreator::create )
//! and written into the writable properties of the freshly constructed plugin.
//! A writable property of plugin type `T` is an exported mutable global named
//! `"T.<setting>"`.

use std::collections::HashMap ;
use itertools::Itertools ;
use thiserror::Error ;
use wasmtime::{ Instance, Mutability, Store, Val, ValType };

use crate::{ PluginDescriptor, QualifiedName };
use crate::plugin_instance::member_export ;

/// Values passed to a plugin at creation, keyed by setting name.
pub type Settings = HashMap<String, SettingValue> ;

/// A single setting value.
///
/// Values are converted to the property's wasm type when applied. Widening is
/// allowed (`I32` into an `i64` property, `F32` into an `f64` property, `Bool`
/// into an `i32` property); anything else is a [`SettingError::WrongType`].
#[derive( Clone, Debug, PartialEq )]
pub enum SettingValue {
	I32( i32 ),
	I64( i64 ),
	F32( f32 ),
	F64( f64 ),
	Bool( bool ),
	String( String ),
}

/// Failures while applying settings to a constructed plugin.
#[derive( Error, Debug )]
pub enum SettingError {
	/// A setting the descriptor declares as required was not supplied.
	#[error( "Missing required setting '{setting}' for plugin {plugin}" )]
	Missing { plugin: QualifiedName, setting: String },
	/// A supplied setting does not fit the type of the property it targets.
	#[error( "Setting '{setting}' of plugin {plugin} expects {expected}, got {actual}" )]
	WrongType { plugin: QualifiedName, setting: String, expected: String, actual: &'static str },
}

impl SettingError {
	pub fn plugin( &self ) -> &QualifiedName { match self {
		Self::Missing { plugin, .. } | Self::WrongType { plugin, .. } => plugin,
	}}
	pub fn setting( &self ) -> &str { match self {
		Self::Missing { setting, .. } | Self::WrongType { setting, .. } => setting,
	}}
}

impl SettingValue {

	/// Name of the variant, as reported in [`SettingError::WrongType`].
	pub fn type_name( &self ) -> &'static str { match self {
		Self::I32( _ ) => "i32",
		Self::I64( _ ) => "i64",
		Self::F32( _ ) => "f32",
		Self::F64( _ ) => "f64",
		Self::Bool( _ ) => "bool",
		Self::String( _ ) => "string",
	}}

	pub(crate) fn to_val( &self, ty: &ValType ) -> Option<Val> {
		match ( ty, self ) {
			( ValType::I32, Self::I32( value )) => Some( Val::I32( *value )),
			( ValType::I32, Self::Bool( value )) => Some( Val::I32( i32::from( *value ))),
			( ValType::I64, Self::I64( value )) => Some( Val::I64( *value )),
			( ValType::I64, Self::I32( value )) => Some( Val::I64( i64::from( *value ))),
			( ValType::F32, Self::F32( value )) => Some( Val::F32( value.to_bits() )),
			( ValType::F64, Self::F64( value )) => Some( Val::F64( value.to_bits() )),
			( ValType::F64, Self::F32( value )) => Some( Val::F64( f64::from( *value ).to_bits() )),
			_ => None,
		}
	}

	pub(crate) fn from_val( val: &Val ) -> Option<Self> {
		match val {
			Val::I32( value ) => Some( Self::I32( *value )),
			Val::I64( value ) => Some( Self::I64( *value )),
			Val::F32( bits ) => Some( Self::F32( f32::from_bits( *bits ))),
			Val::F64( bits ) => Some( Self::F64( f64::from_bits( *bits ))),
			_ => None,
		}
	}

}

impl From<i32> for SettingValue { fn from( value: i32 ) -> Self { Self::I32( value )}}
impl From<i64> for SettingValue { fn from( value: i64 ) -> Self { Self::I64( value )}}
impl From<f32> for SettingValue { fn from( value: f32 ) -> Self { Self::F32( value )}}
impl From<f64> for SettingValue { fn from( value: f64 ) -> Self { Self::F64( value )}}
impl From<bool> for SettingValue { fn from( value: bool ) -> Self { Self::Bool( value )}}
impl From<&str> for SettingValue { fn from( value: &str ) -> Self { Self::String( value.to_string() )}}
impl From<String> for SettingValue { fn from( value: String ) -> Self { Self::String( value )}}

/// Checks required settings, then writes every recognised setting into `instance`.
///
/// Settings without a matching mutable global are ignored. Settings are applied
/// in name order so failures are reported deterministically.
pub(crate) fn apply<T>(
	store: &mut Store<T>,
	instance: &Instance,
	descriptor: &PluginDescriptor,
	settings: &Settings,
) -> Result<(), SettingError> {

	let plugin = descriptor.qualified_name();

	if let Some( missing ) = descriptor.required_settings().iter().find(| name | !settings.contains_key( name.as_str() )) {
		return Err( SettingError::Missing { plugin: plugin.clone(), setting: missing.clone() });
	}

	settings.iter()
		.sorted_by(|( a, _ ), ( b, _ )| a.cmp( b ))
		.try_for_each(|( name, value )| {

			let Some( global ) = instance.get_global( &mut *store, &member_export( plugin, name )) else { return Ok(()) };
			let ty = global.ty( &*store );
			if !matches!( ty.mutability(), Mutability::Var ) { return Ok(()) }

			let wrong_type = || SettingError::WrongType {
				plugin: plugin.clone(),
				setting: name.clone(),
				expected: val_type_name( ty.content() ).to_string(),
				actual: value.type_name(),
			};
			let val = value.to_val( ty.content() ).ok_or_else( wrong_type )?;
			global.set( &mut *store, val ).map_err(| _ | wrong_type() )

		})

}

fn val_type_name( ty: &ValType ) -> &'static str {
	match ty {
		ValType::I32 => "i32",
		ValType::I64 => "i64",
		ValType::F32 => "f32",
		ValType::F64 => "f64",
		ValType::V128 => "v128",
		_ => "reference",
	}
}
