use thiserror::Error ;
use wasmtime::{ Engine, Instance, Module };

use crate::{ ErrorKind, ModuleRepository, QualifiedName };
use super::ContextState ;



/// Why something could not be loaded into an isolated context.
///
/// This is the structured cause carried across the isolation boundary: every
/// variant consists of plain data (names and messages), nothing that refers back
/// into the context it came from.
#[derive( Error, Debug, Clone, PartialEq, Eq )]
pub enum ResolutionError {
	/// Neither the context nor the repository know the module.
	#[error( "Module Not Found: '{}' (required for '{}')", .0.module_name(), .0.type_name() )]
	ModuleNotFound( QualifiedName ),
	/// The module was loaded but does not define the requested type.
	#[error( "Type Not Found: '{}' in module '{}'", .0.type_name(), .0.module_name() )]
	TypeNotFound( QualifiedName ),
	/// The repository returned bytes that don't compile.
	#[error( "Invalid Module '{module}': {message}" )]
	InvalidModule { module: String, message: String },
	/// Imports could not be satisfied, or instantiation failed.
	#[error( "Link Error in '{module}': {message}" )]
	Link { module: String, message: String },
	/// A module (transitively) imports from itself.
	#[error( "Import Cycle Through '{0}'" )]
	Cycle( String ),
	/// Code running inside the context trapped.
	#[error( "Trap in '{module}': {message}" )]
	Trap { module: String, message: String },
}

impl ResolutionError {
	pub fn kind( &self ) -> ErrorKind { match self {
		Self::ModuleNotFound( _ ) | Self::TypeNotFound( _ ) => ErrorKind::NotFound,
		Self::InvalidModule { .. } => ErrorKind::InvalidModule,
		Self::Link { .. } | Self::Cycle( _ ) => ErrorKind::Link,
		Self::Trap { .. } => ErrorKind::Trap,
	}}
}

/// The resolution hook of one context, alive for the duration of one call.
///
/// Whenever something being loaded references a module the context does not
/// have, the hook fetches it from the repository, compiles it, resolves its own
/// imports the same way and registers the instantiated module with the
/// context's linker.
pub(crate) struct Resolution<'a> {
	state: &'a mut ContextState,
	engine: &'a Engine,
	repository: &'a dyn ModuleRepository,
	/// Dependencies currently being linked, innermost last
	pending: Vec<String>,
}

impl<'a> Resolution<'a> {

	pub(super) fn new( state: &'a mut ContextState, engine: &'a Engine, repository: &'a dyn ModuleRepository ) -> Self {
		Self { state, engine, repository, pending: Vec::with_capacity( 0 ) }
	}

	pub fn state( &mut self ) -> &mut ContextState { &mut *self.state }

	/// Instantiates a fresh copy of the module defining `plugin` and runs the type's
	/// default constructor, the export named after the type.
	pub fn construct( &mut self, plugin: &QualifiedName ) -> Result<Instance, ResolutionError> {

		let module = self.module( plugin )?;
		if !module.exports().any(| export | export.name() == plugin.type_name() ) {
			return Err( ResolutionError::TypeNotFound( plugin.clone() ));
		}

		self.pending.push( plugin.module_name().to_string() );
		let linked = self.link_imports( &module );
		self.pending.pop();
		linked?;
		let instance = self.instantiate( plugin.module_name(), &module )?;

		let constructor = instance
			.get_typed_func::<(), ()>( &mut self.state.store, plugin.type_name() )
			.map_err(| err | ResolutionError::Link {
				module: plugin.module_name().to_string(),
				message: format!( "constructor '{}' is not a function of type [] -> []: {}", plugin.type_name(), err ),
			})?;
		constructor.call( &mut self.state.store, () ).map_err(| err | ResolutionError::Trap {
			module: plugin.module_name().to_string(),
			message: err.to_string(),
		})?;

		Ok( instance )

	}

	/// The compiled module named by `requested`, fetched through the hook if
	/// the context has never seen it.
	fn module( &mut self, requested: &QualifiedName ) -> Result<Module, ResolutionError> {

		let name = requested.module_name();
		if let Some( module ) = self.state.modules.get( name ) { return Ok( module.clone() ) }

		tracing::debug!( module = %name, requested_type = %requested.type_name(), "Resolving missing module {}", name );
		let bytes = self.repository.fetch( name ).ok_or_else(|| ResolutionError::ModuleNotFound( requested.clone() ))?;
		let module = Module::new( self.engine, &bytes ).map_err(| err | ResolutionError::InvalidModule {
			module: name.to_string(),
			message: err.to_string(),
		})?;

		self.state.modules.insert( name.to_string(), module.clone() );
		Ok( module )

	}

	/// Makes sure every import of `module` is defined in the linker.
	fn link_imports( &mut self, module: &Module ) -> Result<(), ResolutionError> {

		let imports = module.imports()
			.map(| import | QualifiedName::new( import.name(), import.module() ))
			.collect::<Vec<_>>();

		imports.iter().try_for_each(| import | {
			if self.defines( import ) { return Ok(()) }
			if !self.state.dependencies.contains_key( import.module_name() ) { self.dependency( import )?; }
			match self.defines( import ) {
				true => Ok(()),
				false => Err( ResolutionError::Link {
					module: import.module_name().to_string(),
					message: format!( "module does not export '{}'", import.type_name() ),
				}),
			}
		})

	}

	fn defines( &mut self, import: &QualifiedName ) -> bool {
		let state = &mut *self.state ;
		state.linker.get( &mut state.store, import.module_name(), import.type_name() ).is_some()
	}

	fn dependency( &mut self, requested: &QualifiedName ) -> Result<Instance, ResolutionError> {

		let name = requested.module_name();
		if let Some( instance ) = self.state.dependencies.get( name ) { return Ok( *instance ) }
		if self.pending.iter().any(| pending | pending == name ) {
			return Err( ResolutionError::Cycle( name.to_string() ));
		}

		self.pending.push( name.to_string() );
		let result = self.load_dependency( requested );
		self.pending.pop();
		result

	}

	fn load_dependency( &mut self, requested: &QualifiedName ) -> Result<Instance, ResolutionError> {

		let name = requested.module_name();
		let module = self.module( requested )?;
		self.link_imports( &module )?;
		let instance = self.instantiate( name, &module )?;

		self.state.linker.instance( &mut self.state.store, name, instance ).map_err(| err | ResolutionError::Link {
			module: name.to_string(),
			message: err.to_string(),
		})?;
		self.state.dependencies.insert( name.to_string(), instance );
		tracing::debug!( module = %name, "Linked dependency {}", name );
		Ok( instance )

	}

	fn instantiate( &mut self, name: &str, module: &Module ) -> Result<Instance, ResolutionError> {
		self.state.linker.instantiate( &mut self.state.store, module ).map_err(| err | match err.downcast_ref::<wasmtime::Trap>() {
			Some( _ ) => ResolutionError::Trap { module: name.to_string(), message: err.to_string() },
			None => ResolutionError::Link { module: name.to_string(), message: err.to_string() },
		})
	}

}
