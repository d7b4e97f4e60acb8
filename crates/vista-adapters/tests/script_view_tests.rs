//! Script view tests against real files.

use std::fs;
use std::path::Path;

use http::header::CONTENT_TYPE;
use serde_json::json;
use tempfile::TempDir;
use vista_adapters::ScriptView;
use vista_adapters::script::capture;
use vista_core::config::ScriptConfig;
use vista_core::prelude::*;

fn views(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, content) in files {
        let path = dir.path().join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    dir
}

fn empty_response() -> Response {
    Response::new(Body::new())
}

#[test]
fn renders_context_into_body() {
    let dir = views(&[("foo.tpl", "Hello! <%= color %> and <%= answer %>")]);
    let view = ScriptView::new(ScriptConfig::new(dir.path()));

    let context = Context::new().with("color", "blue").with("answer", 42);
    let response = view.render(empty_response(), "foo", context).unwrap();

    assert_eq!(response.body().to_string_lossy(), "Hello! blue and 42");
    assert_eq!(response.body().chunks().len(), 1);
    assert_eq!(response.headers()[CONTENT_TYPE], "text/html");
}

#[test]
fn keeps_existing_content_type() {
    let dir = views(&[("feed.xml", "<feed><%= title %></feed>")]);
    let view = ScriptView::new(ScriptConfig::new(dir.path()));

    let response = http::Response::builder()
        .header(CONTENT_TYPE, "application/atom+xml")
        .body(Body::new())
        .unwrap();
    let response = view
        .render(response, "feed.xml", Context::new().with("title", "News"))
        .unwrap();

    assert_eq!(response.headers()[CONTENT_TYPE], "application/atom+xml");
    assert_eq!(response.body().to_string_lossy(), "<feed>News</feed>");
}

#[test]
fn directory_names_render_index() {
    let dir = views(&[("users/index.tpl", "all users")]);
    let view = ScriptView::new(ScriptConfig::new(dir.path()));

    let response = view.render(empty_response(), "users/", Context::new()).unwrap();
    assert_eq!(response.body().to_string_lossy(), "all users");
}

#[test]
fn custom_extension() {
    let dir = views(&[("page.phtml", "custom")]);
    let view = ScriptView::new(ScriptConfig::new(dir.path()).with_ext("phtml"));

    let response = view.render(empty_response(), "page", Context::new()).unwrap();
    assert_eq!(response.body().to_string_lossy(), "custom");
}

#[test]
fn missing_file_fails_before_writing() {
    let dir = views(&[]);
    let view = ScriptView::new(ScriptConfig::new(dir.path()));

    let err = view
        .render(empty_response(), "nope", Context::new())
        .unwrap_err();

    match err {
        ViewError::FileNotFound { path } => assert_eq!(path, dir.path().join("nope.tpl")),
        other => panic!("expected FileNotFound, got {other:?}"),
    }
}

#[test]
fn traversal_is_rejected_even_if_target_exists() {
    let dir = views(&[("secret.yml", "password: hunter2"), ("views/page.tpl", "ok")]);
    let view = ScriptView::new(ScriptConfig::new(dir.path().join("views")));

    for name in ["../secret.yml", "../views/page", "a/../page"] {
        let err = view.render(empty_response(), name, Context::new()).unwrap_err();
        assert!(matches!(err, ViewError::InvalidName { .. }), "name = {name}");
    }
}

#[test]
fn failing_script_releases_capture() {
    let dir = views(&[("broken.tpl", "before <%= missing %> after")]);
    let view = ScriptView::new(ScriptConfig::new(dir.path()));

    let err = view
        .render(empty_response(), "broken", Context::new())
        .unwrap_err();

    assert!(matches!(err, ViewError::Script { .. }));
    assert!(err.to_string().contains("undefined variable 'missing'"));
    assert_eq!(capture::depth(), 0);
}

#[test]
fn scripts_only_see_context() {
    let dir = views(&[
        ("name.tpl", "<%= name %>"),
        ("context.tpl", "<%= context %>"),
        ("this.tpl", "<%= this %>"),
    ]);
    let view = ScriptView::new(ScriptConfig::new(dir.path()));
    let context = Context::new().with("answer", 42);

    for template in ["name", "context", "this"] {
        let err = view
            .render(empty_response(), template, context.clone())
            .unwrap_err();
        assert!(matches!(err, ViewError::Script { .. }), "template = {template}");
    }
}

#[test]
fn ambient_functions_are_callable() {
    let dir = views(&[("fn.tpl", "<%= upper(user.name) %> (<%= strlen(user.name) %>)")]);
    let view = ScriptView::new(ScriptConfig::new(dir.path()));

    let context = Context::new().with("user", json!({ "name": "ada" }));
    let response = view.render(empty_response(), "fn", context).unwrap();
    assert_eq!(response.body().to_string_lossy(), "ADA (3)");
}

#[test]
fn expose_follows_registry() {
    let mut view = ScriptView::new(ScriptConfig::new(Path::new("unused")));

    assert!(view.expose("strlen", None).is_ok());
    assert!(matches!(
        view.expose("custom", Some("strlen".into())).unwrap_err(),
        ViewError::UnsupportedOperation(_)
    ));
}

#[test]
fn loads_from_options() {
    let dir = views(&[("home.tpl", "home")]);
    let options = ViewOptions::with_path(dir.path());

    let view = ScriptView::from_options(&options).unwrap();
    assert_eq!(view.path(), dir.path());
    assert_eq!(view.ext(), "tpl");
}
