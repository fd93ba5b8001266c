//! End-to-end tests: declarations classified, parsed by clap and dispatched.

use argbind::{
    Annotation, App, BoundArgs, Choice, CliError, CliResult, CommandDecl, Engine, EnvMeta,
    OptionMeta, Output, ParamDecl, ParamMeta, Registry, ScriptedPrompter, SerdeMolder, Value,
};
use serde::Deserialize;
use std::io::Write;

#[allow(dead_code)]
#[derive(Choice)]
enum Color {
    Red,
    Blue,
}

#[derive(Debug, Deserialize, PartialEq)]
struct Point {
    x: i64,
    y: i64,
}

fn app_with(engine: &Engine, decls: Vec<CommandDecl>) -> App {
    let mut registry = Registry::new();
    for decl in decls {
        engine.register(&mut registry, decl).expect("Failed to register command");
    }
    App::new("demo", registry)
}

fn text(output: &Output) -> &str {
    match output {
        Output::Text(s) | Output::Json(s) => s,
        Output::Silent => "",
    }
}

#[test]
fn test_enum_choice_accepts_member_values() {
    let app = app_with(
        &Engine::new(),
        vec![CommandDecl::new("paint", |args| args.str("color").unwrap_or_default())
            .param(ParamDecl::new("color", Annotation::enumeration::<Color>()))],
    );

    let value = app.try_run_from(["demo", "paint", "--color", "red"]).unwrap();
    assert_eq!(value, Value::from("red"));

    let response = app.run_from(["demo", "paint", "--color", "yellow"]);
    assert_eq!(response.exit_code, 2);
    assert!(text(&response.output).contains("yellow"));
}

#[test]
fn test_enum_default_is_reduced_to_its_value() {
    let app = app_with(
        &Engine::new(),
        vec![
            CommandDecl::new("paint", |args| args.str("color").unwrap_or_default()).param(
                ParamDecl::new("color", Annotation::enumeration::<Color>())
                    .default(Color::Blue.member()),
            ),
        ],
    );
    assert_eq!(app.try_run_from(["demo", "paint"]).unwrap(), Value::from("blue"));
}

#[test]
fn test_flag_and_yes_token() {
    let app = app_with(
        &Engine::new(),
        vec![CommandDecl::new("build", |args| {
            format!("{} {}", args.flag("release"), args.flag("confirm"))
        })
        .param(ParamDecl::new("release", Annotation::Bool))
        .param(ParamDecl::new(
            "confirm",
            Annotation::Bool.with(OptionMeta::new().is_flag(false).default(false)),
        ))],
    );

    assert_eq!(app.try_run_from(["demo", "build"]).unwrap(), Value::from("false false"));
    assert_eq!(
        app.try_run_from(["demo", "build", "--release", "--confirm", "yes"]).unwrap(),
        Value::from("true true")
    );
}

#[test]
fn test_map_option_collects_key_value_pairs() {
    let app = app_with(
        &Engine::new(),
        vec![CommandDecl::new("tag", |args| {
            let labels = args.get("labels").cloned().unwrap_or(Value::None);
            let a = labels.get(&Value::from("a")).cloned().unwrap_or(Value::None);
            let b = labels.get(&Value::from("b")).cloned().unwrap_or(Value::None);
            Value::List(vec![a, b])
        })
        .param(ParamDecl::new("labels", Annotation::map(Annotation::Str, Annotation::Int)))],
    );

    let value = app
        .try_run_from(["demo", "tag", "--labels", "a=1", "--labels", "b=2"])
        .unwrap();
    assert_eq!(value, Value::List(vec![Value::Int(1), Value::Int(2)]));

    let response = app.run_from(["demo", "tag", "--labels", "oops"]);
    assert_eq!(response.exit_code, 1);
    assert!(text(&response.output).contains("oops"));
}

#[test]
fn test_env_option_reads_variable_at_call_time() {
    let app = app_with(
        &Engine::new(),
        vec![CommandDecl::new("deploy", |args| args.str("region").unwrap_or_default())
            .param(ParamDecl::new(
                "region",
                Annotation::Str.with(EnvMeta::new("ARGBIND_TEST_DEPLOY_REGION")),
            ))],
    );

    let response = app.run_from(["demo", "deploy"]);
    assert_eq!(response.exit_code, 2);
    assert!(text(&response.output).contains("--region <REGION>"));

    std::env::set_var("ARGBIND_TEST_DEPLOY_REGION", "eu-west-1");
    assert_eq!(app.try_run_from(["demo", "deploy"]).unwrap(), Value::from("eu-west-1"));
    assert_eq!(
        app.try_run_from(["demo", "deploy", "--region", "us-east-2"]).unwrap(),
        Value::from("us-east-2")
    );
    std::env::remove_var("ARGBIND_TEST_DEPLOY_REGION");
}

#[test]
fn test_structured_parameter_is_molded_from_json() {
    let engine = Engine::builder().molder(SerdeMolder::new().with::<Point>()).build();
    let app = app_with(
        &engine,
        vec![CommandDecl::new("plot", |args| {
            args.object::<Point>("point").map(|p| p.x + p.y).unwrap_or(-1)
        })
        .param(ParamDecl::new("point", Annotation::structured::<Point>()))],
    );

    assert_eq!(
        app.try_run_from(["demo", "plot", "--point", r#"{"x": 40, "y": 2}"#]).unwrap(),
        Value::Int(42)
    );

    let response = app.run_from(["demo", "plot", "--point", "{not json"]);
    assert_eq!(response.exit_code, 1);
    assert!(text(&response.output).contains("Invalid JSON for '--point <POINT>'"));
}

#[test]
fn test_prompted_secret_with_confirmation() {
    let engine = Engine::builder()
        .prompter(ScriptedPrompter::new(["s3cret", "s3cret", "one", "two"]))
        .build();
    let app = app_with(
        &engine,
        vec![CommandDecl::new("login", |args| {
            args.str("password").map(|p| p.len() as i64).unwrap_or(0)
        })
        .param(ParamDecl::new(
            "password",
            Annotation::Str.with(
                ParamMeta::new()
                    .prompt("Password")
                    .confirmation_prompt()
                    .hide_input(),
            ),
        ))],
    );

    assert_eq!(app.try_run_from(["demo", "login"]).unwrap(), Value::Int(6));

    let response = app.run_from(["demo", "login"]);
    assert_eq!(response.exit_code, 1);
    assert!(text(&response.output).contains("do not match"));

    // A value on the command line skips the prompt.
    assert_eq!(app.try_run_from(["demo", "login", "--password", "abc"]).unwrap(), Value::Int(3));
}

#[test]
fn test_file_parameter_opens_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "line one\nline two\n").unwrap();
    let path = file.path().to_string_lossy().to_string();

    let app = app_with(
        &Engine::new(),
        vec![CommandDecl::new("count_lines", |args: BoundArgs| -> CliResult<i64> {
            match args.get("source") {
                Some(Value::File(source)) => Ok(source.read_to_string()?.lines().count() as i64),
                _ => Err(CliError::user("no source")),
            }
        })
        .param(ParamDecl::new("source", Annotation::File))],
    );

    assert_eq!(app.try_run_from(["demo", "count-lines", path.as_str()]).unwrap(), Value::Int(2));

    let response = app.run_from(["demo", "count-lines", "/definitely/not/here.txt"]);
    assert_eq!(response.exit_code, 101);
}

#[test]
fn test_grouped_commands_dispatch_by_path() {
    let engine = Engine::new();
    let mut registry = Registry::new();
    let db = registry.group("db", Some("Database commands")).unwrap();
    engine
        .attach(
            db,
            CommandDecl::new("migrate", |args| format!("to {}", args.int("version").unwrap_or(0)))
                .param(ParamDecl::new("version", Annotation::Int).default(7i64)),
        )
        .unwrap();
    let app = App::new("demo", registry).version("1.2.3");

    assert_eq!(app.try_run_from(["demo", "db", "migrate"]).unwrap(), Value::from("to 7"));
    assert_eq!(app.try_run_from(["demo", "db", "migrate", "9"]).unwrap(), Value::from("to 9"));

    let response = app.run_from(["demo", "--version"]);
    assert_eq!(response.exit_code, 0);
    assert!(text(&response.output).contains("1.2.3"));
}

#[test]
fn test_option_help_shows_default() {
    let app = app_with(
        &Engine::new(),
        vec![CommandDecl::new("serve", |_| ()).param(ParamDecl::new(
            "port",
            Annotation::Int.with(OptionMeta::new().default(8080i64).help("Port to bind")),
        ))],
    );
    let response = app.run_from(["demo", "serve", "--help"]);
    assert_eq!(response.exit_code, 0);
    assert!(text(&response.output).contains("Port to bind [default: 8080]"));
}

#[test]
fn test_optional_parameter_without_default_is_an_option() {
    let app = app_with(
        &Engine::new(),
        vec![CommandDecl::new("nick", |args| {
            args.str("nickname").unwrap_or_else(|| "anonymous".to_string())
        })
        .param(ParamDecl::new(
            "nickname",
            Annotation::Str.with(ParamMeta::new().required(false)),
        ))],
    );

    assert_eq!(
        app.try_run_from(["demo", "nick", "--nickname", "bob"]).unwrap(),
        Value::from("bob")
    );
    assert_eq!(app.try_run_from(["demo", "nick"]).unwrap(), Value::from("anonymous"));
}
