mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};

use common::{MultipartForm, TestApp};

#[tokio::test]
async fn create_asset_round_trips_fields() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.user_token("alice").await?;

    let asset = app
        .create_asset(&token, &MultipartForm::asset("Sword").text("tags", "weapon,medieval"))
        .await?;

    assert_eq!(asset["id"], 1);
    assert_eq!(asset["name"], "Sword");
    assert_eq!(asset["category"], "3D Model");
    assert_eq!(asset["license_type"], "Paid");
    assert_eq!(asset["source_url"], "http://x");
    assert_eq!(asset["tags"], serde_json::json!(["weapon", "medieval"]));
    assert!(asset["description"].is_null());
    assert!(asset["file_path"].is_null());

    Ok(())
}

#[tokio::test]
async fn tags_are_trimmed_and_empties_dropped() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.user_token("alice").await?;

    let asset = app
        .create_asset(&token, &MultipartForm::asset("Sword").text("tags", " weapon , ,medieval, "))
        .await?;
    assert_eq!(asset["tags"], serde_json::json!(["weapon", "medieval"]));

    Ok(())
}

#[tokio::test]
async fn get_returns_own_asset() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.user_token("alice").await?;
    let created = app
        .create_asset(&token, &MultipartForm::asset("Sword").text("description", "Sharp"))
        .await?;

    let res = app.get(&format!("/api/assets/{}", created["id"]), Some(&token)).await?;
    assert_eq!(res.status, StatusCode::OK);
    let body = res.json()?;
    assert_eq!(body["name"], "Sword");
    assert_eq!(body["description"], "Sharp");

    Ok(())
}

#[tokio::test]
async fn update_replaces_fields_but_keeps_owner_and_id() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.user_token("alice").await?;
    let created = app.create_asset(&token, &MultipartForm::asset("Sword")).await?;
    let path = format!("/api/assets/{}", created["id"]);

    let replacement = MultipartForm::new()
        .text("name", "Theme")
        .text("category", "Music")
        .text("license_type", "CC0")
        .text("source_url", "http://y")
        .text("tags", "loop")
        .text("owner_id", "999")
        .text("id", "42");
    let res = app.send_form(Method::PUT, &path, &token, &replacement).await?;
    assert_eq!(res.status, StatusCode::OK);

    let updated = res.json()?;
    assert_eq!(updated["id"], created["id"]);
    assert_eq!(updated["owner_id"], created["owner_id"]);
    assert_eq!(updated["created_at"], created["created_at"]);
    assert_eq!(updated["name"], "Theme");
    assert_eq!(updated["category"], "Music");
    assert_eq!(updated["tags"], serde_json::json!(["loop"]));

    Ok(())
}

#[tokio::test]
async fn delete_then_get_is_forbidden() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.user_token("alice").await?;
    let created = app.create_asset(&token, &MultipartForm::asset("To Delete")).await?;
    let path = format!("/api/assets/{}", created["id"]);

    let res = app.delete(&path, Some(&token)).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.json()?["message"].is_string());

    let res = app.get(&path, Some(&token)).await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.error_code()?, "FORBIDDEN");

    Ok(())
}

#[tokio::test]
async fn ids_are_not_reused_after_delete() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.user_token("alice").await?;

    let first = app.create_asset(&token, &MultipartForm::asset("A")).await?;
    app.delete(&format!("/api/assets/{}", first["id"]), Some(&token)).await?;
    let second = app.create_asset(&token, &MultipartForm::asset("B")).await?;

    assert!(second["id"].as_i64() > first["id"].as_i64());

    Ok(())
}

#[tokio::test]
async fn invalid_category_is_rejected_before_any_file_write() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.user_token("alice").await?;

    let form = MultipartForm::asset("Ship")
        .text("category", "Spaceship")
        .file("img.png", b"fake image content", "image/png");
    let res = app.send_form(Method::POST, "/api/assets", &token, &form).await?;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.error_code()?, "INVALID_CATEGORY");
    assert_eq!(app.upload_count(), 0);
    assert!(app.list_assets(&token, "").await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn invalid_category_on_update_keeps_existing_record() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.user_token("alice").await?;
    let created = app.create_asset(&token, &MultipartForm::asset("Sword")).await?;
    let path = format!("/api/assets/{}", created["id"]);

    let form = MultipartForm::asset("Renamed")
        .text("category", "Nope")
        .file("new.png", b"new", "image/png");
    let res = app.send_form(Method::PUT, &path, &token, &form).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.upload_count(), 0);

    let current = app.get(&path, Some(&token)).await?.json()?;
    assert_eq!(current["name"], "Sword");

    Ok(())
}

#[tokio::test]
async fn missing_required_field_is_a_validation_error() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.user_token("alice").await?;

    for field in ["name", "category", "license_type", "source_url"] {
        let form = MultipartForm::asset("Sword").without(field);
        let res = app.send_form(Method::POST, "/api/assets", &token, &form).await?;
        assert_eq!(res.status, StatusCode::BAD_REQUEST, "{}", field);
        assert_eq!(res.error_code()?, "VALIDATION_ERROR");
        assert!(res.json()?["field_errors"][field].is_string(), "{}", field);
    }

    Ok(())
}

#[tokio::test]
async fn every_category_is_accepted() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.user_token("alice").await?;

    for category in [
        "3D Model",
        "2D Sprite",
        "Texture",
        "Tilemap",
        "Music",
        "Sound Effect",
        "Script",
        "Other",
    ] {
        let asset = app
            .create_asset(&token, &MultipartForm::asset(category).text("category", category))
            .await?;
        assert_eq!(asset["category"], category);
    }

    Ok(())
}

#[tokio::test]
async fn oversized_upload_is_413() -> Result<()> {
    let app = TestApp::spawn_with(|config| config.api.max_request_size_bytes = 1024).await?;
    let token = app.user_token("alice").await?;

    let form = MultipartForm::asset("Huge").file("huge.bin", &[7u8; 4096], "application/octet-stream");
    let res = app.send_form(Method::POST, "/api/assets", &token, &form).await?;

    assert_eq!(res.status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(res.error_code()?, "PAYLOAD_TOO_LARGE");
    assert_eq!(app.upload_count(), 0);
    assert!(app.list_assets(&token, "").await?.is_empty());

    Ok(())
}
