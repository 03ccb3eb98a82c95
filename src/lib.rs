//! A plugin host for WebAssembly modules.
//!
//! Plugins are types defined by core WASM modules. A module file may show up on
//! disk at any time; the host keeps track of where modules live, knows which
//! plugin types exist and builds instances of them inside isolated contexts,
//! pulling in whatever other modules a plugin imports from on demand.
//!
//! # Core Concepts
//!
//! - [`ModuleContainer`]: Tracks module files by their qualified module name and
//! 	serves their bytes on request. Files are registered one by one or through a
//! 	watched [`PluginDirectory`]. The container is a [`ModuleRepository`].
//!
//! - [`PluginRegistry`]: The set of [`PluginDescriptor`]s announced by any number of
//! 	[`PluginSource`]s, queried through an optional [`PluginFilter`].
//!
//! - [`IsolatedContext`]: A wasmtime store with its own linker namespace. Memories,
//! 	globals and tables of one context are unreachable from any other, and a trap
//! 	inside a context is reported as an error.
//!
//! - [`PluginCreator`]: Constructs plugins inside one context. Creators are handed
//! 	out by a [`CreatorCache`], one per context.
//!
//! - [`PluginInstance`]: A constructed plugin. Its properties and member functions
//! 	are only reachable through the context it lives in.
//!
//! # Plugins in WebAssembly
//!
//! A plugin type `T` of a module is an exported function `T` of type `[] -> []`, its
//! default constructor. Members of the type are exports prefixed with `T.`:
//! writable properties (the targets of [`Settings`]) are exported mutable globals,
//! member functions are exported functions. The module's qualified name is the
//! module name of its `name` custom section, falling back to the file stem.
//!
//! Imports name the module they are satisfied by. When a context meets an import
//! from a module it doesn't have, it fetches that module from the repository passed
//! to [`PluginCreator::create`], instantiates it once as a shared dependency of the
//! context and links against it.
//!
//! # Re-exports
//!
//! `wasm_plugin_host` re-exports `Engine` and `Val` from `wasmtime` for convenience.
//! See the [wasmtime docs](https://docs.rs/wasmtime/latest/wasmtime/) for details.
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap ;
//! use wasm_plugin_host::{ CreatorCache, Engine, IsolatedContext, PluginDescriptor, QualifiedName, SettingValue, Settings, Val };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Any `ModuleRepository` will do. A `ModuleContainer` serves files from disk,
//! // a map serves modules from memory.
//! let repository = HashMap::from([( "calc".to_string(), br#"(module $calc
//! 	(global (export "Adder.offset") (mut i32) (i32.const 0))
//! 	(func (export "Adder"))
//! 	(func (export "Adder.add") (param i32) (result i32)
//! 		local.get 0
//! 		global.get 0
//! 		i32.add)
//! )"#.to_vec() )]);
//!
//! // The engine is yours; its configuration applies to every context created with it.
//! let engine = Engine::default();
//! let context = IsolatedContext::new( &engine, "sandbox" );
//!
//! let creators = CreatorCache::new();
//! let descriptor = PluginDescriptor::new( QualifiedName::new( "Adder", "calc" ))
//! 	.with_required_setting( "offset" );
//! let settings = Settings::from([( "offset".to_string(), SettingValue::I32( 40 ))]);
//!
//! let adder = creators.get_creator( &context ).create( &descriptor, &repository, Some( &settings ))?;
//! let sum = adder.call( "add", &[ Val::I32( 2 )])?;
//! assert_eq!( sum.first().and_then( Val::i32 ), Some( 42 ));
//! # Ok(())
//! # }
//! ```
//!
//! # Resource Limits
//!
//! Plugins may run untrusted code. Limits are set per context with [`ContextOptions`]:
//!
//! - **Fuel** counts WebAssembly instructions. Every call into the context (loading
//! 	modules, running constructors, member calls) is granted the configured amount
//! 	and whatever is left is reset to 0 afterwards. Requires
//! 	[`Config::consume_fuel`]( wasmtime::Config::consume_fuel ).
//!
//! - **Memory** caps the size of every linear memory in the context. No engine
//! 	configuration is required.
//!
//! - **Instances** caps how many module instances the context holds. Instances are
//! 	freed with the context only, so the count never goes down. Unlimited by default.
//!
//! ```
//! # use wasm_plugin_host::{ ContextOptions, Engine, IsolatedContext };
//! # use wasmtime::Config ;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = Config::new();
//! config.consume_fuel( true );
//! let engine = Engine::new( &config )?;
//!
//! let context = IsolatedContext::with_options( &engine, "untrusted", ContextOptions::new()
//! 	.with_fuel_limit( 100_000 )
//! 	.with_memory_limit( 10 * 1024 * 1024 ) // 10 MiB
//! );
//! # let _ = context ;
//! # Ok(())
//! # }
//! ```

mod qualified_name ;
mod descriptor ;
mod event ;
mod registration_error ;
mod module_container ;
mod repository ;
mod settings ;
mod context ;
mod plugin_instance ;
mod creator ;
mod registry ;

#[doc( no_inline )]
pub use wasmtime::{ Engine, Val };

pub use qualified_name::QualifiedName ;
pub use descriptor::PluginDescriptor ;
pub use event::{ Event, SubscriptionId };
pub use registration_error::{ RegistrationError, ErrorKind };
pub use module_container::{ ModuleContainer, ModuleEvent, FetchOptions, PluginDirectory };
pub use repository::ModuleRepository ;
pub use settings::{ Settings, SettingValue, SettingError };
pub use context::{ IsolatedContext, ContextId, ContextOptions, ResolutionError };
pub use plugin_instance::{ PluginInstance, DispatchError };
pub use creator::{ PluginCreator, CreatorCache, CreateError };
pub use registry::{ PluginRegistry, PluginSource, PluginFilter };
