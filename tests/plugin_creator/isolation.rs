use wasm_plugin_host::{ CreatorCache, Engine, IsolatedContext, PluginDescriptor, QualifiedName, SettingValue, Settings, Val };
use crate::fixtures ;

fn calls( plugin: &wasm_plugin_host::PluginInstance ) -> Option<i32> {
    plugin.call( "calls", &[] ).expect( "call failed" ).first().and_then( Val::i32 )
}

#[test]
fn dependencies_are_shared_within_a_context_only() {

    let engine = Engine::default();
    let a = IsolatedContext::new( &engine, "a" );
    let b = IsolatedContext::new( &engine, "b" );
    let repository = fixtures::repository( &[( "app", fixtures::APP ), ( "math", fixtures::MATH )]);
    let descriptor = PluginDescriptor::new( QualifiedName::new( "Doubler", "app" ));
    let cache = CreatorCache::new();

    let first = cache.get_creator( &a ).create( &descriptor, &repository, None ).expect( "create failed" );
    let second = cache.get_creator( &a ).create( &descriptor, &repository, None ).expect( "create failed" );
    let other = cache.get_creator( &b ).create( &descriptor, &repository, None ).expect( "create failed" );

    first.call( "run", &[ Val::I32( 1 )]).expect( "call failed" );
    first.call( "run", &[ Val::I32( 2 )]).expect( "call failed" );

    assert_eq!( calls( &first ), Some( 2 ));
    assert_eq!( calls( &second ), Some( 2 ));
    assert_eq!( calls( &other ), Some( 0 ));

}

#[test]
fn every_create_builds_a_fresh_instance() {

    let engine = Engine::default();
    let context = IsolatedContext::new( &engine, "ctx" );
    let repository = fixtures::repository( &[( "counter", fixtures::COUNTER )]);
    let descriptor = PluginDescriptor::new( QualifiedName::new( "Counter", "counter" ));
    let creator = CreatorCache::new().get_creator( &context );

    let one = Settings::from([( "NamedSetting".to_string(), SettingValue::I32( 1 ))]);
    let two = Settings::from([( "NamedSetting".to_string(), SettingValue::I32( 2 ))]);
    let first = creator.create( &descriptor, &repository, Some( &one )).expect( "create failed" );
    let second = creator.create( &descriptor, &repository, Some( &two )).expect( "create failed" );

    assert_eq!( first.property( "NamedSetting" ), Some( SettingValue::I32( 1 )));
    assert_eq!( second.property( "NamedSetting" ), Some( SettingValue::I32( 2 )));

}

#[test]
fn trap_does_not_poison_the_context() {

    let engine = Engine::default();
    let context = IsolatedContext::new( &engine, "ctx" );
    let repository = fixtures::repository( &[( "faulty", fixtures::FAULTY ), ( "greeter", fixtures::GREETER )]);
    let creator = CreatorCache::new().get_creator( &context );

    creator.create( &PluginDescriptor::new( QualifiedName::new( "Faulty", "faulty" )), &repository, None )
        .expect_err( "constructor traps" );
    creator.create( &PluginDescriptor::new( QualifiedName::new( "Greeter", "greeter" )), &repository, None )
        .expect( "context must stay usable after a trap" );

}

#[test]
fn contexts_create_concurrently() {

    let engine = Engine::default();
    let cache = CreatorCache::new();
    let repository = fixtures::repository( &[( "app", fixtures::APP ), ( "math", fixtures::MATH )]);
    let descriptor = PluginDescriptor::new( QualifiedName::new( "Doubler", "app" ));

    std::thread::scope(| scope | {
        let handles = ( 0..4 ).map(| index | {
            let ( engine, cache, repository, descriptor ) = ( &engine, &cache, &repository, &descriptor );
            scope.spawn( move || {
                let context = IsolatedContext::new( engine, format!( "ctx-{}", index ));
                let plugin = cache.get_creator( &context ).create( descriptor, repository, None ).expect( "create failed" );
                plugin.call( "run", &[ Val::I32( index )]).expect( "call failed" ).first().and_then( Val::i32 )
            })
        }).collect::<Vec<_>>();

        handles.into_iter().zip( 0.. ).for_each(|( handle, index )| {
            assert_eq!( handle.join().expect( "thread panicked" ), Some( index * 2 ));
        });
    });

}
