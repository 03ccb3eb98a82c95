use wasm_plugin_host::{ CreatorCache, Engine, IsolatedContext, PluginDescriptor, QualifiedName };
use crate::captured_logs::CapturedLogs ;
use crate::fixtures ;

#[test]
fn success_is_logged_with_the_full_name() {

    let engine = Engine::default();
    let context = IsolatedContext::new( &engine, "ctx" );
    let logs = CapturedLogs::new();
    let creator = CreatorCache::new().get_creator_with_log( &context, logs.dispatch() );

    creator.create(
        &PluginDescriptor::new( QualifiedName::new( "Greeter", "greeter" )),
        &fixtures::repository( &[( "greeter", fixtures::GREETER )]),
        None,
    ).expect( "create failed" );

    let info = logs.lines_at( "INFO" );
    assert!( info.iter().any(| line | line.contains( "Created plugin Greeter, greeter" )), "{}", logs.contents() );
    assert!( logs.lines_at( "ERROR" ).is_empty() );

}

#[test]
fn missing_module_is_logged_once_with_its_cause() {

    let engine = Engine::default();
    let context = IsolatedContext::new( &engine, "ctx" );
    let logs = CapturedLogs::new();
    let creator = CreatorCache::new().get_creator_with_log( &context, logs.dispatch() );

    creator.create(
        &PluginDescriptor::new( QualifiedName::new( "Doubler", "app" )),
        &fixtures::repository( &[( "app", fixtures::APP )]),
        None,
    ).expect_err( "math is missing" );

    let errors = logs.lines_at( "ERROR" );
    assert_eq!( errors.len(), 1, "{}", logs.contents() );
    assert!( errors[0].contains( "Module Not Found: 'math'" ), "{}", errors[0] );
    assert!( logs.contents().contains( "Resolving missing module math" ));

}

#[test]
fn setting_failure_is_logged_once() {

    let engine = Engine::default();
    let context = IsolatedContext::new( &engine, "ctx" );
    let logs = CapturedLogs::new();
    let creator = CreatorCache::new().get_creator_with_log( &context, logs.dispatch() );

    creator.create(
        &PluginDescriptor::new( QualifiedName::new( "Counter", "counter" )).with_required_setting( "NamedSetting" ),
        &fixtures::repository( &[( "counter", fixtures::COUNTER )]),
        None,
    ).expect_err( "setting is missing" );

    let errors = logs.lines_at( "ERROR" );
    assert_eq!( errors.len(), 1, "{}", logs.contents() );
    assert!( errors[0].contains( "Missing required setting 'NamedSetting' for plugin Counter, counter" ), "{}", errors[0] );

}

#[test]
fn default_creator_logs_to_the_current_default() {

    let engine = Engine::default();
    let context = IsolatedContext::new( &engine, "ctx" );
    let cache = CreatorCache::new();
    let creator = cache.get_creator( &context );
    let logs = CapturedLogs::new();

    // Creators without a dispatch of their own log to whatever is the default where they run
    logs.capture(|| creator.create(
        &PluginDescriptor::new( QualifiedName::new( "Greeter", "nowhere" )),
        &fixtures::repository( &[]),
        None,
    )).expect_err( "module is missing" );

    assert_eq!( logs.lines_at( "ERROR" ).len(), 1, "{}", logs.contents() );

}
