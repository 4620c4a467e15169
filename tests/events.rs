mod common;

use serde_json::json;

use common::*;

#[actix_rt::test]
async fn category_crud() {
    let ctx = TestContext::new();
    let app = ctx.app().await;

    let category = create_category(&app, "  Music ").await;
    assert_eq!(category["name"], "Music");

    let err = expect(post(&app, "/categories", json!({"name": " "})).await, 422).await;
    assert_eq!(err["detail"], "Category name cannot be empty");

    let id = id_of(&category);
    let updated = expect(
        patch(&app, "/categories", replace(&id, "/description", json!("Live shows"))).await,
        200,
    )
    .await;
    assert_eq!(updated[&id]["description"], "Live shows");

    let page = expect(get(&app, "/categories?filter_expression=name:eq:Music").await, 200).await;
    assert_eq!(page["total"], 1);

    expect(delete(&app, &format!("/categories/{id}")).await, 200).await;
    expect(delete(&app, &format!("/categories/{id}")).await, 404).await;
}

#[actix_rt::test]
async fn create_event_with_naive_timestamps() {
    let ctx = TestContext::new();
    let app = ctx.app().await;
    let event = create_event(
        &app,
        json!({
            "start_datetime": "2030-06-01T09:00:00",
            "end_datetime": "2030-06-01T17:00:00+02:00",
            "capacity": 50,
            "price": 2500,
            "location": "  "
        }),
    )
    .await;
    assert_eq!(event["start_datetime"], "2030-06-01T09:00:00Z");
    assert_eq!(event["end_datetime"], "2030-06-01T15:00:00Z");
    assert_eq!(event["capacity"], 50);
    assert_eq!(event["price"], 2500);
    assert!(event["location"].is_null());
}

#[actix_rt::test]
async fn event_rules_are_unprocessable() {
    let ctx = TestContext::new();
    let app = ctx.app().await;
    let owner = create_user(&app, "owner@example.com").await;
    let category = create_category(&app, "Tech").await;
    let base = json!({
        "name": "Meetup",
        "start_datetime": "2030-06-01T09:00:00Z",
        "end_datetime": "2030-06-01T17:00:00Z",
        "user_id": owner["id"],
        "category_id": category["id"]
    });

    let cases = [
        ("end_datetime", json!("2030-06-01T09:00:00Z"), "Event end time must be after start time"),
        ("name", json!("   "), "Event name cannot be empty"),
        ("capacity", json!(0), "Capacity must be positive"),
        ("price", json!(-1), "Price cannot be negative"),
    ];
    for (field, value, detail) in cases {
        let mut body = base.clone();
        body[field] = value;
        let err = expect(post(&app, "/events", body).await, 422).await;
        assert_eq!(err["detail"], detail);
    }
}

#[actix_rt::test]
async fn event_references_must_exist() {
    let ctx = TestContext::new();
    let app = ctx.app().await;
    let owner = create_user(&app, "owner@example.com").await;
    let missing = uuid::Uuid::new_v4();

    let resp = post(
        &app,
        "/events",
        json!({
            "name": "Orphan",
            "start_datetime": "2030-06-01T09:00:00Z",
            "end_datetime": "2030-06-01T17:00:00Z",
            "user_id": owner["id"],
            "category_id": missing
        }),
    )
    .await;
    let err = expect(resp, 404).await;
    assert_eq!(err["detail"], format!("Category {missing} not found"));
}

#[actix_rt::test]
async fn patch_keeps_time_invariant() {
    let ctx = TestContext::new();
    let app = ctx.app().await;
    let event = create_event(&app, json!({})).await;
    let id = id_of(&event);

    let err = expect(
        patch(&app, "/events", replace(&id, "/end_datetime", json!("2030-05-31T00:00:00Z"))).await,
        422,
    )
    .await;
    assert_eq!(err["detail"], "Event end time must be after start time");

    ctx.clock.advance(chrono::Duration::minutes(5));
    let updated = expect(
        patch(&app, "/events", replace(&id, "/end_datetime", json!("2030-06-02T00:00:00Z"))).await,
        200,
    )
    .await;
    assert_eq!(updated[&id]["end_datetime"], "2030-06-02T00:00:00Z");
    assert_eq!(updated[&id]["updated_at"], "2030-05-01T12:05:00Z");
    assert_eq!(updated[&id]["created_at"], "2030-05-01T12:00:00Z");
}

#[actix_rt::test]
async fn list_events_by_owner_and_time() {
    let ctx = TestContext::new();
    let app = ctx.app().await;
    let first = create_event(&app, json!({})).await;
    create_event(&app, json!({"start_datetime": "2030-07-01T09:00:00Z", "end_datetime": "2030-07-01T10:00:00Z"})).await;

    let uri = format!("/events?filter_expression=user_id:eq:{}", first["user_id"].as_str().unwrap());
    let page = expect(get(&app, &uri).await, 200).await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["id"], first["id"]);

    let page = expect(
        get(&app, "/events?filter_expression=start_datetime:gte:2030-06-15").await,
        200,
    )
    .await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["start_datetime"], "2030-07-01T09:00:00Z");

    let err = expect(get(&app, "/events?filter_expression=capacity:like:5").await, 400).await;
    assert!(err["detail"].as_str().unwrap().contains("only supported on text columns"));
}
