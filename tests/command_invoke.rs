//! Integration tests for invoking baked commands as processes.

use shrun::{Command, KwargsSep, Redirect};

#[test]
fn invoke_returns_started_process() {
    let mut process = Command::new("echo")
        .unwrap()
        .bake()
        .arg("hi")
        .done()
        .invoke()
        .unwrap();

    assert!(process.pid().is_some() || !process.is_running());
    process.wait(None);
    assert_eq!(process.exit_code(), Some(0));
    assert_eq!(process.read().unwrap(), "hi\n");
}

#[test]
fn invoke_renders_kwargs_before_spawning() {
    let echo = Command::new("echo").unwrap();

    let mut spaced = echo.bake().kwarg("key", "value").done().invoke().unwrap();
    spaced.wait(None);
    assert_eq!(spaced.read().unwrap(), "--key value\n");

    let mut joined = echo
        .bake()
        .kwarg("key", "value")
        .kwargs_sep(KwargsSep::Equals)
        .done()
        .invoke()
        .unwrap();
    joined.wait(None);
    assert_eq!(joined.read().unwrap(), "--key=value\n");
}

#[test]
fn invoke_honors_file_redirection_option() {
    let dir = tempfile::tempdir().unwrap();
    let out_path = dir.path().join("echo.log");

    let mut process = Command::new("echo")
        .unwrap()
        .bake()
        .arg("to-file")
        .stdout(Redirect::File(out_path.clone()))
        .done()
        .invoke()
        .unwrap();
    process.wait(None);

    assert_eq!(process.read().unwrap(), "to-file\n");
    assert_eq!(std::fs::read_to_string(&out_path).unwrap(), "to-file\n");
}

#[test]
fn invoke_foreground_inherits_streams() {
    let mut process = Command::new("true")
        .unwrap()
        .bake()
        .foreground(true)
        .done()
        .invoke()
        .unwrap();
    process.wait(None);

    assert_eq!(process.exit_code(), Some(0));
    // Nothing captured in foreground mode.
    assert_eq!(process.read().unwrap(), "");
    assert_eq!(process.eread().unwrap(), "");
}
