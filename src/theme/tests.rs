//! Tests for the theme engine

use super::*;
use serde_json::json;
use std::fs;
use tempfile::TempDir;
use tera::Context as TeraContext;

fn standard_vars() -> StandardTemplateVars {
    StandardTemplateVars::new("Daily Test", "All the news that fits", "/")
}

fn empty_sidebar() -> serde_json::Value {
    json!({
        "categories": [{"id": 1, "name": "Politics"}],
        "tags": [{"id": 2, "name": "elections"}],
        "popular_posts": [],
        "advertisement": null
    })
}

fn sample_post(id: i64, title: &str) -> serde_json::Value {
    json!({
        "id": id,
        "title": title,
        "content": "<b>Body</b> text",
        "featured_image": null,
        "views_count": 3,
        "published_at": "2024-03-05T10:00:00Z"
    })
}

fn home_context() -> TeraContext {
    let mut context = TeraContext::new();
    context.insert("posts", &vec![sample_post(1, "First story")]);
    context.insert("featured_post", &sample_post(1, "First story"));
    context.insert("popular_posts", &Vec::<serde_json::Value>::new());
    context.insert("weekly_top_posts", &vec![sample_post(1, "First story")]);
    context.insert("sidebar", &empty_sidebar());
    context
}

/// Write an override template into the given directory
fn write_override(dir: &Path, name: &str, content: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

#[test]
fn test_embedded_templates_load_without_override_dir() {
    let temp_dir = TempDir::new().unwrap();
    let engine = ThemeEngine::new(&temp_dir.path().join("missing")).unwrap();

    for name in [
        "base.html",
        "index.html",
        "post_list.html",
        "post_detail.html",
        "about.html",
        "contact.html",
        "message.html",
        "error.html",
    ] {
        assert!(engine.has_template(name), "missing embedded template {}", name);
    }
    assert!(engine.overridden_templates().is_empty());
}

#[test]
fn test_render_home_with_standard_vars() {
    let temp_dir = TempDir::new().unwrap();
    let engine = ThemeEngine::new(temp_dir.path()).unwrap();

    let html = engine
        .render_with_standard_vars("index.html", &home_context(), &standard_vars())
        .unwrap();

    assert!(html.contains("Daily Test"));
    assert!(html.contains("First story"));
    assert!(html.contains("/category/1"));
    assert!(html.contains("#elections"));
    assert!(html.contains("March 05, 2024"));
}

#[test]
fn test_post_content_is_escaped_in_cards() {
    let temp_dir = TempDir::new().unwrap();
    let engine = ThemeEngine::new(temp_dir.path()).unwrap();

    let mut context = home_context();
    context.insert("posts", &vec![json!({
        "id": 9,
        "title": "<script>alert(1)</script>",
        "content": "plain",
        "featured_image": null,
        "views_count": 0,
        "published_at": null
    })]);

    let html = engine
        .render_with_standard_vars("index.html", &context, &standard_vars())
        .unwrap();
    assert!(!html.contains("<script>alert(1)</script>"));
    assert!(html.contains("&lt;script&gt;"));
}

#[test]
fn test_current_user_is_shown() {
    let temp_dir = TempDir::new().unwrap();
    let engine = ThemeEngine::new(temp_dir.path()).unwrap();

    let vars = standard_vars().with_user(CurrentUser {
        id: 1,
        username: "editor".to_string(),
        is_staff: true,
    });
    let html = engine
        .render_with_standard_vars("index.html", &home_context(), &vars)
        .unwrap();
    assert!(html.contains("Signed in as editor"));

    let anonymous = engine
        .render_with_standard_vars("index.html", &home_context(), &standard_vars())
        .unwrap();
    assert!(!anonymous.contains("Signed in as"));
}

#[test]
fn test_override_replaces_embedded_template() {
    let temp_dir = TempDir::new().unwrap();
    write_override(
        temp_dir.path(),
        "about.html",
        r#"{% extends "base.html" %}{% block content %}<p>Custom about for {{ site_name }}</p>{% endblock content %}"#,
    );

    let engine = ThemeEngine::new(temp_dir.path()).unwrap();
    assert_eq!(engine.overridden_templates(), &["about.html".to_string()]);

    let mut context = TeraContext::new();
    context.insert("sidebar", &empty_sidebar());
    let html = engine
        .render_with_standard_vars("about.html", &context, &standard_vars())
        .unwrap();
    assert!(html.contains("Custom about for Daily Test"));
}

#[test]
fn test_override_can_add_new_templates_in_subdirectories() {
    let temp_dir = TempDir::new().unwrap();
    write_override(temp_dir.path(), "partials/extra.html", "<p>{{ site_name }}</p>");
    write_override(temp_dir.path(), "notes.txt", "ignored");

    let engine = ThemeEngine::new(temp_dir.path()).unwrap();
    assert!(engine.has_template("partials/extra.html"));
    assert!(!engine.has_template("notes.txt"));

    let html = engine
        .render_with_standard_vars("partials/extra.html", &TeraContext::new(), &standard_vars())
        .unwrap();
    assert!(html.contains("<p>Daily Test</p>"));
}

#[test]
fn test_broken_override_fails_to_load() {
    let temp_dir = TempDir::new().unwrap();
    write_override(temp_dir.path(), "index.html", "{% if %}");

    assert!(ThemeEngine::new(temp_dir.path()).is_err());
}

#[test]
fn test_reload_picks_up_new_override() {
    let temp_dir = TempDir::new().unwrap();
    let mut engine = ThemeEngine::new(temp_dir.path()).unwrap();
    assert!(!engine.has_template("late.html"));

    write_override(temp_dir.path(), "late.html", "late");
    engine.reload_templates().unwrap();
    assert!(engine.has_template("late.html"));
    assert_eq!(engine.render("late.html", &TeraContext::new()).unwrap(), "late");
}

#[test]
fn test_render_unknown_template_is_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let engine = ThemeEngine::new(temp_dir.path()).unwrap();

    let err = engine.render("nope.html", &TeraContext::new()).unwrap_err();
    assert!(matches!(err.downcast_ref::<ThemeError>(), Some(ThemeError::NotFound(_))));
}

#[test]
fn test_render_with_fallback_uses_error_template() {
    let temp_dir = TempDir::new().unwrap();
    let engine = ThemeEngine::new(temp_dir.path()).unwrap();

    let mut context = TeraContext::new();
    context.insert("site_name", "Daily Test");
    context.insert("site_description", "desc");
    context.insert("year", &2024);
    context.insert("current_user", &Option::<CurrentUser>::None);
    context.insert("sidebar", &Option::<serde_json::Value>::None);
    let html = engine.render_with_fallback("nope.html", &context);
    assert!(html.contains("500"));
    assert!(html.contains("could not be displayed"));
}

#[test]
fn test_render_with_fallback_last_resort() {
    let temp_dir = TempDir::new().unwrap();
    write_override(temp_dir.path(), "error.html", "{{ missing_variable.field }}");
    let engine = ThemeEngine::new(temp_dir.path()).unwrap();

    let html = engine.render_with_fallback("nope.html", &TeraContext::new());
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("Error 500"));
}

#[test]
fn test_simple_error_page_escapes_message() {
    let html = ThemeEngine::simple_error_page(404, "<b>gone</b>");
    assert!(html.contains("Error 404"));
    assert!(html.contains("&lt;b&gt;gone&lt;/b&gt;"));
}

#[test]
fn test_template_names_sorted() {
    let temp_dir = TempDir::new().unwrap();
    let engine = ThemeEngine::new(temp_dir.path()).unwrap();
    let names = engine.template_names();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
    assert!(names.contains(&"sidebar.html".to_string()));
}
