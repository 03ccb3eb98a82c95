use wasm_plugin_host::{ ContextOptions, CreatorCache, DispatchError, Engine, ErrorKind, IsolatedContext, PluginDescriptor, QualifiedName, Val };
use wasmtime::Config ;
use crate::fixtures ;

fn fuel_engine() -> Engine {
    let mut config = Config::new();
    config.consume_fuel( true );
    Engine::new( &config ).expect( "failed to create engine" )
}

#[test]
fn runaway_member_runs_out_of_fuel() {

    let engine = fuel_engine();
    let context = IsolatedContext::with_options( &engine, "ctx", ContextOptions::new().with_fuel_limit( 10_000 ));
    let repository = fixtures::repository( &[( "spinner", fixtures::SPINNER )]);
    let plugin = CreatorCache::new().get_creator( &context )
        .create( &PluginDescriptor::new( QualifiedName::new( "Spinner", "spinner" )), &repository, None )
        .expect( "create failed" );

    match plugin.call( "spin", &[] ) {
        Err( DispatchError::RuntimeException( _ )) => {},
        other => panic!( "Expected RuntimeException, got: {:?}", other ),
    }

    // If fuel were not granted anew per call, this call would trap immediately
    let answer = plugin.call( "answer", &[] ).expect( "fuel must be granted per call" );
    assert_eq!( answer.first().and_then( Val::i32 ), Some( 42 ));

}

#[test]
fn oversized_memory_is_rejected() {

    let engine = Engine::default();
    let context = IsolatedContext::with_options( &engine, "ctx", ContextOptions::new().with_memory_limit( 64 * 1024 ));
    let repository = fixtures::repository( &[
        ( "small", r#"(module $small (memory 1) (func (export "Small")))"# ),
        ( "large", r#"(module $large (memory 4) (func (export "Large")))"# ),
    ]);
    let creator = CreatorCache::new().get_creator( &context );

    creator.create( &PluginDescriptor::new( QualifiedName::new( "Small", "small" )), &repository, None )
        .expect( "one page fits the limit" );

    match creator.create( &PluginDescriptor::new( QualifiedName::new( "Large", "large" )), &repository, None ) {
        Err( err ) => assert!( matches!( err.kind(), ErrorKind::Link | ErrorKind::Trap ), "{}", err ),
        other => panic!( "Expected the memory limit to be enforced, got: {:?}", other ),
    }

}

#[test]
fn options_are_reported() {

    let engine = Engine::default();
    let options = ContextOptions::new().with_fuel_limit( 5 ).with_memory_limit( 1024 ).with_instance_limit( 3 );
    let context = IsolatedContext::with_options( &engine, "ctx", options );

    assert_eq!( context.options(), options );
    assert_eq!( context.options().fuel_limit(), Some( 5 ));
    assert_eq!( context.options().memory_limit(), Some( 1024 ));
    assert_eq!( context.options().instance_limit(), Some( 3 ));
    assert_eq!( ContextOptions::default().instance_limit(), None );
    assert_eq!( IsolatedContext::new( &engine, "plain" ).options(), ContextOptions::default() );

}

#[test]
fn long_lived_context_outlasts_the_default_store_limits() {

    let engine = Engine::default();
    let context = IsolatedContext::new( &engine, "ctx" );
    let repository = fixtures::repository( &[( "greeter", fixtures::GREETER )]);
    let creator = CreatorCache::new().get_creator( &context );
    let descriptor = PluginDescriptor::new( QualifiedName::new( "Greeter", "greeter" ));

    for round in 0..10_050 {
        if let Err( err ) = creator.create( &descriptor, &repository, None ) {
            panic!( "create #{} failed: {}", round, err );
        }
    }

}

#[test]
fn instance_limit_is_enforced() {

    let engine = Engine::default();
    let context = IsolatedContext::with_options( &engine, "ctx", ContextOptions::new().with_instance_limit( 2 ));
    let repository = fixtures::repository( &[( "greeter", fixtures::GREETER )]);
    let creator = CreatorCache::new().get_creator( &context );
    let descriptor = PluginDescriptor::new( QualifiedName::new( "Greeter", "greeter" ));

    creator.create( &descriptor, &repository, None ).expect( "first instance fits the limit" );
    creator.create( &descriptor, &repository, None ).expect( "second instance fits the limit" );

    match creator.create( &descriptor, &repository, None ) {
        Err( err ) => assert_eq!( err.kind(), ErrorKind::Link, "{}", err ),
        other => panic!( "Expected the instance limit to be enforced, got: {:?}", other ),
    }

}
