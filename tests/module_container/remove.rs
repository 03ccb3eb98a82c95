use wasm_plugin_host::{ ErrorKind, ModuleContainer };
use crate::captured_logs::CapturedLogs ;
use crate::fixtures::{ self, ModuleDir };
use crate::mocks::Counter ;

#[test]
fn removing_unknown_path_is_silent() {

    let dir = ModuleDir::new();
    let container = ModuleContainer::new();
    let removed = Counter::on( container.module_removed() );

    container.remove( dir.missing( "never-added.wasm" )).expect( "removing an unknown path must not fail" );
    assert_eq!( removed.count(), 0 );

}

#[test]
fn empty_path_is_invalid_argument() {
    let container = ModuleContainer::new();
    match container.remove( "" ) {
        Err( err ) => assert_eq!( err.kind(), ErrorKind::InvalidArgument ),
        Ok(()) => panic!( "Expected InvalidArgument" ),
    }
}

#[test]
fn removing_last_path_forgets_module() {

    let dir = ModuleDir::new();
    let path = dir.module( "greeter.wasm", fixtures::GREETER );
    let container = ModuleContainer::new();
    let removed = Counter::on( container.module_removed() );

    container.add( &path ).expect( "add failed" );
    container.remove( &path ).expect( "remove failed" );

    assert_eq!( removed.count(), 1 );
    assert!( container.known_modules().is_empty() );
    assert_eq!( container.paths_of( "greeter" ), None );

}

#[test]
fn module_stays_known_while_any_path_remains() {

    let first = ModuleDir::new();
    let second = ModuleDir::new();
    let a = first.module( "greeter.wasm", fixtures::GREETER );
    let b = second.module( "greeter.wasm", fixtures::GREETER );

    let container = ModuleContainer::new();
    let removed = Counter::on( container.module_removed() );
    container.add( &a ).expect( "add failed" );
    container.add( &b ).expect( "add failed" );

    container.remove( &a ).expect( "remove failed" );
    assert_eq!( removed.count(), 0 );
    assert_eq!( container.paths_of( "greeter" ), Some( vec![ b.clone() ]));

    container.remove( &b ).expect( "remove failed" );
    assert_eq!( removed.count(), 1 );

}

#[test]
fn removed_path_can_be_added_again() {

    let dir = ModuleDir::new();
    let path = dir.module( "greeter.wasm", fixtures::GREETER );
    let container = ModuleContainer::new();
    let added = Counter::on( container.module_added() );

    container.add( &path ).expect( "add failed" );
    container.remove( &path ).expect( "remove failed" );
    assert!( container.add( &path ).expect( "second add failed" ));
    assert_eq!( added.count(), 2 );

}

#[test]
fn removal_is_logged_at_info() {

    let dir = ModuleDir::new();
    let path = dir.module( "greeter.wasm", fixtures::GREETER );
    let container = ModuleContainer::new();
    container.add( &path ).expect( "add failed" );

    let logs = CapturedLogs::new();
    logs.capture(|| container.remove( &path )).expect( "remove failed" );

    let info = logs.lines_at( "INFO" );
    assert_eq!( info.len(), 1, "{}", logs.contents() );
    assert!( info[0].contains( &format!( "Module removed greeter from {}", path.display() )), "{}", info[0] );

}
