use thiserror::Error ;
use wasmtime::{ Instance, Val };

use crate::{ IsolatedContext, QualifiedName, SettingValue };



/// Name under which a member of `plugin` is exported from its module.
pub(crate) fn member_export( plugin: &QualifiedName, member: &str ) -> String {
	format!( "{}.{}", plugin.type_name(), member )
}

/// A constructed plugin living inside an isolated context.
///
/// Created by [`PluginCreator::create`]( crate::PluginCreator::create ). The handle keeps
/// its context alive; every access goes through the context and is serialised with
/// all other calls into it.
#[derive( Clone )]
pub struct PluginInstance {
	context: IsolatedContext,
	instance: Instance,
	qualified_name: QualifiedName,
}

impl std::fmt::Debug for PluginInstance {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::result::Result<(), std::fmt::Error> {
		f.debug_struct( "PluginInstance" )
			.field( "qualified_name", &self.qualified_name )
			.field( "context", &self.context )
			.finish_non_exhaustive()
	}
}

/// Errors that can occur when calling into a constructed plugin.
#[derive( Error, Debug )]
pub enum DispatchError {
	/// The plugin's module does not export the member as a function.
	#[error( "Invalid Function: {0}" )] InvalidFunction( String ),
	/// The WASM function trapped or the arguments don't match its signature.
	#[error( "Runtime Exception: {0}" )] RuntimeException( wasmtime::Error ),
}

impl PluginInstance {

	pub(crate) fn new( context: IsolatedContext, instance: Instance, qualified_name: QualifiedName ) -> Self {
		Self { context, instance, qualified_name }
	}

	#[inline] pub fn qualified_name( &self ) -> &QualifiedName { &self.qualified_name }

	/// The context this plugin was created in.
	#[inline] pub fn context( &self ) -> &IsolatedContext { &self.context }

	/// Current value of the property `name`, if the plugin exports one with a
	/// numeric type.
	pub fn property( &self, name: &str ) -> Option<SettingValue> {
		let export = member_export( &self.qualified_name, name );
		self.context.enter(| state | {
			let global = self.instance.get_global( &mut state.store, &export )?;
			SettingValue::from_val( &global.get( &mut state.store ))
		})
	}

	/// Calls the member function `member` with `args`.
	///
	/// The context's fuel limit applies to the call.
	pub fn call( &self, member: &str, args: &[Val] ) -> Result<Vec<Val>, DispatchError> {

		let export = member_export( &self.qualified_name, member );
		self.context.enter(| state | {

			let func = self.instance
				.get_func( &mut state.store, &export )
				.ok_or_else(|| DispatchError::InvalidFunction( export.clone() ))?;

			let mut results = func.ty( &state.store ).results()
				.map(| _ | Val::I32( 0 ))
				.collect::<Vec<_>>();
			func.call( &mut state.store, args, &mut results ).map_err( DispatchError::RuntimeException )?;

			Ok( results )

		})

	}

}
