use wasm_plugin_host::{
    CreateError, CreatorCache, Engine, ErrorKind, IsolatedContext, PluginDescriptor,
    PluginInstance, QualifiedName, SettingError, SettingValue, Settings,
};
use crate::fixtures ;

fn descriptor() -> PluginDescriptor {
    PluginDescriptor::new( QualifiedName::new( "Counter", "counter" )).with_required_setting( "NamedSetting" )
}

fn create( descriptor: &PluginDescriptor, settings: Option<&Settings> ) -> Result<PluginInstance, CreateError> {
    let engine = Engine::default();
    let context = IsolatedContext::new( &engine, "ctx" );
    let repository = fixtures::repository( &[( "counter", fixtures::COUNTER )]);
    CreatorCache::new().get_creator( &context ).create( descriptor, &repository, settings )
}

fn settings( values: &[( &str, SettingValue )]) -> Settings {
    values.iter().map(|( name, value )| ( name.to_string(), value.clone() )).collect()
}

#[test]
fn missing_required_setting_fails() {

    match create( &descriptor(), None ) {
        Err( CreateError::Setting( err @ SettingError::Missing { .. })) => {
            assert_eq!( err.plugin(), &QualifiedName::new( "Counter", "counter" ));
            assert_eq!( err.setting(), "NamedSetting" );
            assert_eq!( err.to_string(), "Missing required setting 'NamedSetting' for plugin Counter, counter" );
        },
        other => panic!( "Expected Missing, got: {:?}", other ),
    }

}

#[test]
fn supplied_setting_is_written_into_the_plugin() {

    let plugin = create( &descriptor(), Some( &settings( &[( "NamedSetting", 42_i32.into() )])))
        .expect( "create failed" );

    assert_eq!( plugin.property( "NamedSetting" ), Some( SettingValue::I32( 42 )));
    let result = plugin.call( "get", &[] ).expect( "call failed" );
    assert_eq!( result.first().and_then( wasm_plugin_host::Val::i32 ), Some( 42 ));

}

#[test]
fn setting_of_wrong_type_fails() {

    match create( &descriptor(), Some( &settings( &[( "NamedSetting", "not int".into() )]))) {
        Err( err @ CreateError::Setting( SettingError::WrongType { .. })) => {
            assert_eq!( err.kind(), ErrorKind::Setting );
            let CreateError::Setting( SettingError::WrongType { setting, expected, actual, .. }) = err else { unreachable!() };
            assert_eq!( setting, "NamedSetting" );
            assert_eq!( expected, "i32" );
            assert_eq!( actual, "string" );
        },
        other => panic!( "Expected WrongType, got: {:?}", other ),
    }

}

#[test]
fn compatible_values_are_widened() {

    let plugin = create( &descriptor(), Some( &settings( &[
        ( "NamedSetting", true.into() ),
        ( "Ratio", 0.5_f32.into() ),
    ]))).expect( "create failed" );

    assert_eq!( plugin.property( "NamedSetting" ), Some( SettingValue::I32( 1 )));
    assert_eq!( plugin.property( "Ratio" ), Some( SettingValue::F64( 0.5 )));

}

#[test]
fn narrowing_is_rejected() {

    match create( &descriptor(), Some( &settings( &[( "NamedSetting", 1_i64.into() )]))) {
        Err( CreateError::Setting( SettingError::WrongType { expected, actual, .. })) => {
            assert_eq!( expected, "i32" );
            assert_eq!( actual, "i64" );
        },
        other => panic!( "Expected WrongType, got: {:?}", other ),
    }

}

#[test]
fn unrecognised_settings_are_ignored() {

    let plugin = create( &descriptor(), Some( &settings( &[
        ( "NamedSetting", 1_i32.into() ),
        ( "NoSuchProperty", "whatever".into() ),
        ( "Limit", 100_i32.into() ),
    ]))).expect( "create failed" );

    // `Limit` is immutable
    assert_eq!( plugin.property( "Limit" ), Some( SettingValue::I32( 7 )));
    assert_eq!( plugin.property( "NoSuchProperty" ), None );

}

#[test]
fn settings_are_optional_without_requirements() {

    let descriptor = PluginDescriptor::new( QualifiedName::new( "Counter", "counter" ));
    let plugin = create( &descriptor, None ).expect( "create failed" );
    assert_eq!( plugin.property( "NamedSetting" ), Some( SettingValue::I32( 0 )));

}
