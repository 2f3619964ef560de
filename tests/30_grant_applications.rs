mod common;

use anyhow::Result;
use chrono::{Duration, Utc};
use serde_json::{json, Value};

use common::{json_of, spawn_app, TestApp};

async fn create_program(app: &TestApp, admin: &str, status: &str) -> Result<Value> {
    let (code, program) = json_of(
        app.post(
            "/api/grant-programs",
            Some(admin),
            json!({
                "title": "Women Builders Fund",
                "description": "Seed funding for women-led projects",
                "grant_amount": 5000.0,
                "eligibility_criteria": {
                    "women_leadership_percentage": 60,
                    "progress_duration_months": 3,
                    "working_prototype": true,
                },
                "application_requirements": { "team_details": false },
                "important_dates": { "deadline": (Utc::now() + Duration::days(30)).to_rfc3339() },
                "status": status,
            }),
        )
        .send()
        .await?,
    )
    .await?;
    anyhow::ensure!(code == 201, "create program failed: {} {}", code, program);
    Ok(program)
}

fn application(program: &Value, project: &Value) -> Value {
    json!({
        "program_id": program["id"],
        "project_id": project["id"],
        "proposal": "We are building an open mentorship platform. ".repeat(4),
        "budget_breakdown": "Hosting 40%, design 30%, outreach and events 30% of the total.",
        "timeline": "Three months to a public beta.",
        "pitch_video_url": "https://video.example.com/pitch",
        "presentation_url": "https://slides.example.com/deck",
        "women_leadership_percentage": 75,
        "working_prototype": true,
        "progress_duration_months": 6,
    })
}

async fn program_counts(app: &TestApp, admin: &str, id: &Value) -> Result<(i64, i64)> {
    let id = id.as_str().unwrap_or_default();
    let (_, program) = json_of(app.get(&format!("/api/grant-programs/{}", id), Some(admin)).send().await?).await?;
    Ok((
        program["applications_count"].as_i64().unwrap_or(-1),
        program["approved_applications_count"].as_i64().unwrap_or(-1),
    ))
}

#[tokio::test]
async fn submit_then_review() -> Result<()> {
    let Some(app) = spawn_app().await? else { return Ok(()) };
    let admin = app.admin_token().await?;
    let program = create_program(&app, &admin, "active").await?;
    let (builder, _) = app.register("Ada").await?;
    let project = app.create_project(&builder, "Mentor Match").await?;

    let (status, created) = json_of(
        app.post("/api/grant-applications", Some(&builder), application(&program, &project))
            .send()
            .await?,
    )
    .await?;
    assert_eq!(status, 201, "{}", created);
    assert_eq!(created["status"], "submitted");
    assert_eq!(program_counts(&app, &admin, &program["id"]).await?, (1, 0));

    let (status, body) = json_of(
        app.post("/api/grant-applications", Some(&builder), application(&program, &project))
            .send()
            .await?,
    )
    .await?;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "You already have an active application for this grant program");

    let id = created["id"].as_str().unwrap();
    let status_path = format!("/api/grant-applications/{}/status", id);

    let (status, reviewed) = json_of(
        app.put(&status_path, Some(&admin), json!({ "status": "approved" }))
            .send()
            .await?,
    )
    .await?;
    assert_eq!(status, 200);
    assert_eq!(reviewed["status"], "approved");
    assert_eq!(reviewed["review_notes"], "");
    assert!(reviewed["reviewed_date"].is_string());
    assert_eq!(program_counts(&app, &admin, &program["id"]).await?, (1, 1));

    // Same status again is a no-op
    let (status, _) = json_of(
        app.put(&status_path, Some(&admin), json!({ "status": "approved" }))
            .send()
            .await?,
    )
    .await?;
    assert_eq!(status, 200);
    assert_eq!(program_counts(&app, &admin, &program["id"]).await?, (1, 1));

    let (status, body) = json_of(
        app.put(&status_path, Some(&admin), json!({ "status": "in-review" }))
            .send()
            .await?,
    )
    .await?;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "Cannot change application status from approved to in-review");

    let (status, body) = json_of(
        app.delete(&format!("/api/grant-applications/{}", id), Some(&builder))
            .send()
            .await?,
    )
    .await?;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "Only submitted applications can be withdrawn");
    Ok(())
}

#[tokio::test]
async fn submission_rules() -> Result<()> {
    let Some(app) = spawn_app().await? else { return Ok(()) };
    let admin = app.admin_token().await?;
    let program = create_program(&app, &admin, "active").await?;
    let (builder, _) = app.register("Lin").await?;
    let project = app.create_project(&builder, "Open Ledger").await?;

    // Field validation reports every problem at once
    let mut payload = application(&program, &project);
    payload["proposal"] = json!("too short");
    payload["pitch_video_url"] = json!("ftp://video.example.com");
    let (status, body) = json_of(app.post("/api/grant-applications", Some(&builder), payload).send().await?).await?;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "Validation failed");
    assert_eq!(body["errors"].as_array().map(Vec::len), Some(2));

    let mut payload = application(&program, &project);
    payload["women_leadership_percentage"] = json!(40);
    let (status, body) = json_of(app.post("/api/grant-applications", Some(&builder), payload).send().await?).await?;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "This program requires at least 60% women in leadership positions");

    let mut payload = application(&program, &project);
    payload["working_prototype"] = json!(false);
    let (status, body) = json_of(app.post("/api/grant-applications", Some(&builder), payload).send().await?).await?;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "This program requires a working prototype");

    // Someone else's project
    let (other, _) = app.register("Mallory").await?;
    let (status, _) = json_of(
        app.post("/api/grant-applications", Some(&other), application(&program, &project))
            .send()
            .await?,
    )
    .await?;
    assert_eq!(status, 403);

    // Drafts do not accept applications and stay hidden from the public
    let draft = create_program(&app, &admin, "draft").await?;
    let (status, body) = json_of(
        app.post("/api/grant-applications", Some(&builder), application(&draft, &project))
            .send()
            .await?,
    )
    .await?;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "This grant program is not accepting applications");
    let draft_path = format!("/api/grant-programs/{}", draft["id"].as_str().unwrap_or_default());
    let (status, _) = json_of(app.get(&draft_path, None).send().await?).await?;
    assert_eq!(status, 404);

    assert_eq!(program_counts(&app, &admin, &program["id"]).await?, (0, 0));
    Ok(())
}

#[tokio::test]
async fn withdraw_and_reapply() -> Result<()> {
    let Some(app) = spawn_app().await? else { return Ok(()) };
    let admin = app.admin_token().await?;
    let program = create_program(&app, &admin, "active").await?;
    let (builder, _) = app.register("Rosa").await?;
    let project = app.create_project(&builder, "Care Circle").await?;

    let (_, created) = json_of(
        app.post("/api/grant-applications", Some(&builder), application(&program, &project))
            .send()
            .await?,
    )
    .await?;
    let path = format!("/api/grant-applications/{}", created["id"].as_str().unwrap_or_default());

    let (stranger, _) = app.register("Eve").await?;
    let (status, _) = json_of(app.get(&path, Some(&stranger)).send().await?).await?;
    assert_eq!(status, 403);

    let (status, detail) = json_of(app.get(&path, Some(&builder)).send().await?).await?;
    assert_eq!(status, 200);
    assert_eq!(detail["project_title"], "Care Circle");

    let (status, mine) = json_of(
        app.get("/api/grant-applications/my-applications", Some(&builder))
            .send()
            .await?,
    )
    .await?;
    assert_eq!(status, 200);
    assert_eq!(mine["applications"].as_array().map(Vec::len), Some(1));
    assert_eq!(mine["pagination"]["total"], 1);

    let (status, _) = json_of(app.delete(&path, Some(&builder)).send().await?).await?;
    assert_eq!(status, 200);
    assert_eq!(program_counts(&app, &admin, &program["id"]).await?, (0, 0));

    let (status, _) = json_of(
        app.post("/api/grant-applications", Some(&builder), application(&program, &project))
            .send()
            .await?,
    )
    .await?;
    assert_eq!(status, 201);
    Ok(())
}

async fn stored_applications(app: &TestApp, project: &Value) -> Result<i64> {
    let project_id = uuid::Uuid::parse_str(project["id"].as_str().unwrap_or_default())?;
    Ok(sqlx::query_scalar("SELECT COUNT(*) FROM grant_applications WHERE project_id = $1")
        .bind(project_id)
        .fetch_one(&app.pool)
        .await?)
}

#[tokio::test]
async fn rejected_applicants_may_reapply() -> Result<()> {
    let Some(app) = spawn_app().await? else { return Ok(()) };
    let admin = app.admin_token().await?;
    let program = create_program(&app, &admin, "active").await?;
    let (builder, _) = app.register("Grace").await?;
    let project = app.create_project(&builder, "Second Chance").await?;

    let (status, first) = json_of(
        app.post("/api/grant-applications", Some(&builder), application(&program, &project))
            .send()
            .await?,
    )
    .await?;
    assert_eq!(status, 201);

    let status_path = format!("/api/grant-applications/{}/status", first["id"].as_str().unwrap_or_default());
    let (status, reviewed) = json_of(
        app.put(&status_path, Some(&admin), json!({ "status": "rejected", "review_notes": "Needs more traction" }))
            .send()
            .await?,
    )
    .await?;
    assert_eq!(status, 200);
    assert_eq!(reviewed["status"], "rejected");
    assert_eq!(reviewed["review_notes"], "Needs more traction");

    let (status, second) = json_of(
        app.post("/api/grant-applications", Some(&builder), application(&program, &project))
            .send()
            .await?,
    )
    .await?;
    assert_eq!(status, 201, "{}", second);
    assert_ne!(second["id"], first["id"]);
    assert_eq!(stored_applications(&app, &project).await?, 2);
    assert_eq!(program_counts(&app, &admin, &program["id"]).await?, (2, 0));
    Ok(())
}

#[tokio::test]
async fn concurrent_duplicates_store_one_application() -> Result<()> {
    let Some(app) = spawn_app().await? else { return Ok(()) };
    let admin = app.admin_token().await?;
    let program = create_program(&app, &admin, "active").await?;
    let (builder, _) = app.register("Hasty").await?;
    let project = app.create_project(&builder, "Double Click").await?;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let request = app.post("/api/grant-applications", Some(&builder), application(&program, &project));
        handles.push(tokio::spawn(async move { json_of(request.send().await?).await }));
    }

    let mut created = 0;
    for handle in handles {
        let (status, body) = handle.await??;
        match status {
            201 => created += 1,
            400 => assert!(
                body["message"] == "You already have an active application for this grant program"
                    || body["message"] == "An active application for this project already exists in this program",
                "{}",
                body
            ),
            other => panic!("unexpected status {} {}", other, body),
        }
    }
    assert_eq!(created, 1);
    assert_eq!(stored_applications(&app, &project).await?, 1);
    Ok(())
}
