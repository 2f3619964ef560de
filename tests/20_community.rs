mod common;

use anyhow::Result;
use chrono::{Duration, Utc};
use serde_json::json;

use common::{json_of, spawn_app};

#[tokio::test]
async fn private_projects_are_owner_only() -> Result<()> {
    let Some(app) = spawn_app().await? else { return Ok(()) };
    let (owner, _) = app.register("Owner").await?;
    let (other, _) = app.register("Other").await?;

    let (status, project) = json_of(
        app.post(
            "/api/projects",
            Some(&owner),
            json!({ "title": "Stealth", "description": "Not ready yet", "is_public": false }),
        )
        .send()
        .await?,
    )
    .await?;
    assert_eq!(status, 201);
    let path = format!("/api/projects/{}", project["id"].as_str().unwrap_or_default());

    let (status, body) = json_of(app.get(&path, None).send().await?).await?;
    assert_eq!(status, 404);
    assert_eq!(body["message"], "Project not found");
    assert_eq!(json_of(app.get(&path, Some(&owner)).send().await?).await?.0, 200);

    let (status, _) = json_of(app.put(&path, Some(&other), json!({ "title": "Mine now" })).send().await?).await?;
    assert_eq!(status, 403);

    let (status, updated) = json_of(app.put(&path, Some(&owner), json!({ "status": "in-progress" })).send().await?).await?;
    assert_eq!(status, 200);
    assert_eq!(updated["status"], "in-progress");
    assert_eq!(updated["title"], "Stealth");

    let (status, mine) = json_of(app.get("/api/projects/my-projects", Some(&owner)).send().await?).await?;
    assert_eq!(status, 200);
    assert_eq!(mine["projects"].as_array().map(Vec::len), Some(1));

    assert_eq!(json_of(app.delete(&path, Some(&owner)).send().await?).await?.0, 200);
    assert_eq!(json_of(app.get(&path, Some(&owner)).send().await?).await?.0, 404);

    let (status, _) = json_of(app.get("/api/projects/not-a-uuid", None).send().await?).await?;
    assert_eq!(status, 404);
    Ok(())
}

#[tokio::test]
async fn project_listing_is_paginated() -> Result<()> {
    let Some(app) = spawn_app().await? else { return Ok(()) };
    let (builder, user) = app.register("Prolific").await?;
    for title in ["First", "Second", "Third"] {
        app.create_project(&builder, title).await?;
    }

    let path = format!(
        "/api/projects?builder_id={}&limit=2&page=2",
        user["id"].as_str().unwrap_or_default()
    );
    let (status, body) = json_of(app.get(&path, None).send().await?).await?;
    assert_eq!(status, 200);
    assert_eq!(body["pagination"], json!({ "page": 2, "limit": 2, "total": 3, "pages": 2 }));
    // Newest first, so the last page holds the oldest project
    assert_eq!(body["projects"][0]["title"], "First");

    let (_, portfolio) = json_of(
        app.get(&format!("/api/users/{}", user["id"].as_str().unwrap_or_default()), None)
            .send()
            .await?,
    )
    .await?;
    assert_eq!(portfolio["projects"].as_array().map(Vec::len), Some(3));
    Ok(())
}

#[tokio::test]
async fn progress_logs_require_project_ownership() -> Result<()> {
    let Some(app) = spawn_app().await? else { return Ok(()) };
    let (owner, _) = app.register("Logger").await?;
    let (other, _) = app.register("Intruder").await?;
    let project = app.create_project(&owner, "Daily Build").await?;

    let log = json!({ "project_id": project["id"], "title": "Day 1", "content": "Set up CI", "hours_spent": 2.5 });
    assert_eq!(json_of(app.post("/api/progress-logs", Some(&other), log.clone()).send().await?).await?.0, 403);

    let (status, created) = json_of(app.post("/api/progress-logs", Some(&owner), log).send().await?).await?;
    assert_eq!(status, 201);
    assert_eq!(created["hours_spent"], 2.5);

    let path = format!("/api/progress-logs/project/{}", project["id"].as_str().unwrap_or_default());
    let (status, body) = json_of(app.get(&path, None).send().await?).await?;
    assert_eq!(status, 200);
    assert_eq!(body["logs"].as_array().map(Vec::len), Some(1));
    Ok(())
}

#[tokio::test]
async fn challenge_registration_respects_capacity() -> Result<()> {
    let Some(app) = spawn_app().await? else { return Ok(()) };
    let admin = app.admin_token().await?;

    let (status, body) = json_of(
        app.post(
            "/api/challenges",
            Some(&admin),
            json!({
                "title": "Ship in a week",
                "description": "Build and ship something small",
                "category": "web",
                "start_date": Utc::now().to_rfc3339(),
                "end_date": (Utc::now() - Duration::days(1)).to_rfc3339(),
            }),
        )
        .send()
        .await?,
    )
    .await?;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "End date must be after start date");

    let (status, challenge) = json_of(
        app.post(
            "/api/challenges",
            Some(&admin),
            json!({
                "title": "Ship in a week",
                "description": "Build and ship something small",
                "category": "web",
                "start_date": (Utc::now() - Duration::days(1)).to_rfc3339(),
                "end_date": (Utc::now() + Duration::days(6)).to_rfc3339(),
                "max_participants": 1,
            }),
        )
        .send()
        .await?,
    )
    .await?;
    assert_eq!(status, 201);
    let id = challenge["id"].as_str().unwrap_or_default().to_string();
    let register = format!("/api/challenges/{}/register", id);

    let (first, first_user) = app.register("Early").await?;
    let (second, _) = app.register("Late").await?;

    assert_eq!(json_of(app.post(&register, Some(&first), json!({})).send().await?).await?.0, 200);

    let (status, body) = json_of(app.post(&register, Some(&first), json!({})).send().await?).await?;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "Already registered for this challenge");

    let (status, body) = json_of(app.post(&register, Some(&second), json!({})).send().await?).await?;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "This challenge is full");

    let (status, summary) = json_of(app.get(&format!("/api/challenges/{}", id), None).send().await?).await?;
    assert_eq!(status, 200);
    assert_eq!(summary["participant_count"], 1);
    assert_eq!(summary["status"], "running");

    let winners = format!("/api/challenges/{}/winners", id);
    let (status, body) = json_of(
        app.put(&winners, Some(&admin), json!({ "winners": [{ "user_id": uuid::Uuid::new_v4(), "position": 1 }] }))
            .send()
            .await?,
    )
    .await?;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "Winners must be registered participants");

    let (status, updated) = json_of(
        app.put(&winners, Some(&admin), json!({ "winners": [{ "user_id": first_user["id"], "position": 1 }] }))
            .send()
            .await?,
    )
    .await?;
    assert_eq!(status, 200);
    assert_eq!(updated["winners"][0]["user_id"], first_user["id"]);

    assert_eq!(json_of(app.delete(&register, Some(&first)).send().await?).await?.0, 200);
    assert_eq!(json_of(app.post(&register, Some(&second), json!({})).send().await?).await?.0, 200);
    Ok(())
}

#[tokio::test]
async fn events_close_registration_at_start() -> Result<()> {
    let Some(app) = spawn_app().await? else { return Ok(()) };
    let admin = app.admin_token().await?;
    let (member, _) = app.register("Attendee").await?;

    let (status, event) = json_of(
        app.post(
            "/api/events",
            Some(&admin),
            json!({
                "title": "Rust meetup",
                "description": "Lightning talks",
                "event_type": "meetup",
                "is_virtual": true,
                "meeting_url": "https://meet.example.com/rust",
                "start_time": (Utc::now() - Duration::hours(1)).to_rfc3339(),
                "end_time": (Utc::now() + Duration::hours(1)).to_rfc3339(),
            }),
        )
        .send()
        .await?,
    )
    .await?;
    assert_eq!(status, 201);

    let register = format!("/api/events/{}/register", event["id"].as_str().unwrap_or_default());
    let (status, body) = json_of(app.post(&register, Some(&member), json!({})).send().await?).await?;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "Registration for this event has closed");
    Ok(())
}

#[tokio::test]
async fn malformed_query_strings_get_json_errors() -> Result<()> {
    let Some(app) = spawn_app().await? else { return Ok(()) };

    for path in ["/api/projects?page=abc", "/api/grant-programs?status=bogus", "/api/events?limit=ten"] {
        let res = app.get(path, None).send().await?;
        let content_type = res
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let (status, body) = json_of(res).await?;
        assert_eq!(status, 400, "{}", path);
        assert!(content_type.starts_with("application/json"), "{} -> {}", path, content_type);
        assert!(body["message"].as_str().is_some_and(|m| m.contains("Failed to deserialize")), "{}", body);
    }
    Ok(())
}

#[tokio::test]
async fn tags_that_look_like_ids_or_dates_filter_as_text() -> Result<()> {
    let Some(app) = spawn_app().await? else { return Ok(()) };
    let (builder, user) = app.register("Tagger").await?;
    let id_tag = uuid::Uuid::new_v4().to_string();
    let date_tag = "2024-01-01T00:00:00Z";

    let (status, _) = json_of(
        app.post(
            "/api/projects",
            Some(&builder),
            json!({ "title": "Odd tags", "description": "Tags that look like other types", "tags": [id_tag, date_tag] }),
        )
        .send()
        .await?,
    )
    .await?;
    assert_eq!(status, 201);

    let (status, body) = json_of(app.get(&format!("/api/projects?tags={}", id_tag), None).send().await?).await?;
    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["projects"][0]["title"], "Odd tags");

    let path = format!(
        "/api/projects?builder_id={}&tags={}",
        user["id"].as_str().unwrap_or_default(),
        date_tag
    );
    let (status, body) = json_of(app.get(&path, None).send().await?).await?;
    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["pagination"]["total"], 1);

    let (status, _) = json_of(app.get(&format!("/api/challenges?category={}", id_tag), None).send().await?).await?;
    assert_eq!(status, 200);
    Ok(())
}

#[tokio::test]
async fn logs_of_private_projects_stay_private() -> Result<()> {
    let Some(app) = spawn_app().await? else { return Ok(()) };
    let (owner, _) = app.register("Quiet").await?;
    let marker = uuid::Uuid::new_v4().simple().to_string();

    let (_, project) = json_of(
        app.post(
            "/api/projects",
            Some(&owner),
            json!({ "title": "Hidden build", "description": "Not public yet", "is_public": false }),
        )
        .send()
        .await?,
    )
    .await?;
    let (status, log) = json_of(
        app.post(
            "/api/progress-logs",
            Some(&owner),
            json!({ "project_id": project["id"], "title": format!("Day {}", marker), "content": "Quiet progress" }),
        )
        .send()
        .await?,
    )
    .await?;
    assert_eq!(status, 201);
    assert_eq!(log["is_public"], true);

    let (status, body) = json_of(app.get(&format!("/api/progress-logs?search={}", marker), None).send().await?).await?;
    assert_eq!(status, 200);
    assert_eq!(body["pagination"]["total"], 0);

    let log_path = format!("/api/progress-logs/{}", log["id"].as_str().unwrap_or_default());
    assert_eq!(json_of(app.get(&log_path, None).send().await?).await?.0, 404);
    assert_eq!(json_of(app.get(&log_path, Some(&owner)).send().await?).await?.0, 200);

    // Publishing the project publishes its public logs
    let project_path = format!("/api/projects/{}", project["id"].as_str().unwrap_or_default());
    assert_eq!(json_of(app.put(&project_path, Some(&owner), json!({ "is_public": true })).send().await?).await?.0, 200);
    let (_, body) = json_of(app.get(&format!("/api/progress-logs?search={}", marker), None).send().await?).await?;
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(json_of(app.get(&log_path, None).send().await?).await?.0, 200);
    Ok(())
}

#[tokio::test]
async fn deleting_a_project_deletes_its_logs() -> Result<()> {
    let Some(app) = spawn_app().await? else { return Ok(()) };
    let (owner, _) = app.register("Tidy").await?;
    let project = app.create_project(&owner, "Short lived").await?;
    let project_id = project["id"].as_str().unwrap_or_default().to_string();

    let mut log_ids = Vec::new();
    for day in 1..=2 {
        let (status, log) = json_of(
            app.post(
                "/api/progress-logs",
                Some(&owner),
                json!({ "project_id": project_id, "title": format!("Day {}", day), "content": "Work" }),
            )
            .send()
            .await?,
        )
        .await?;
        assert_eq!(status, 201);
        log_ids.push(log["id"].as_str().unwrap_or_default().to_string());
    }

    assert_eq!(json_of(app.delete(&format!("/api/projects/{}", project_id), Some(&owner)).send().await?).await?.0, 200);

    for id in &log_ids {
        let (status, _) = json_of(app.get(&format!("/api/progress-logs/{}", id), Some(&owner)).send().await?).await?;
        assert_eq!(status, 404);
    }
    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM progress_logs WHERE project_id = $1")
        .bind(uuid::Uuid::parse_str(&project_id)?)
        .fetch_one(&app.pool)
        .await?;
    assert_eq!(remaining, 0);
    Ok(())
}

#[tokio::test]
async fn challenge_registration_rejects_malformed_body() -> Result<()> {
    let Some(app) = spawn_app().await? else { return Ok(()) };
    let admin = app.admin_token().await?;
    let (member, _) = app.register("Careful").await?;

    let (status, challenge) = json_of(
        app.post(
            "/api/challenges",
            Some(&admin),
            json!({
                "title": "Weekend build",
                "description": "Anything goes",
                "category": "open",
                "start_date": Utc::now().to_rfc3339(),
                "end_date": (Utc::now() + Duration::days(2)).to_rfc3339(),
            }),
        )
        .send()
        .await?,
    )
    .await?;
    assert_eq!(status, 201);
    let id = challenge["id"].as_str().unwrap_or_default().to_string();
    let register = format!("/api/challenges/{}/register", id);

    let (status, body) = json_of(
        app.post(&register, Some(&member), json!({ "project_id": "not-a-uuid" }))
            .send()
            .await?,
    )
    .await?;
    assert_eq!(status, 400);
    assert!(body["message"].as_str().is_some_and(|m| m.starts_with("Invalid request body")));

    let participants = format!("/api/challenges/{}/participants", id);
    let (_, list) = json_of(app.get(&participants, Some(&admin)).send().await?).await?;
    assert_eq!(list.as_array().map(Vec::len), Some(0));

    // No body at all is a plain registration
    let res = app
        .client
        .post(app.url(&register))
        .bearer_auth(&member)
        .send()
        .await?;
    assert_eq!(res.status().as_u16(), 200);
    let (_, list) = json_of(app.get(&participants, Some(&admin)).send().await?).await?;
    assert_eq!(list[0]["project_id"], serde_json::Value::Null);
    Ok(())
}
