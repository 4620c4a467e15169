mod common;

use std::collections::BTreeSet;

use serde_json::json;

use common::*;

#[actix_rt::test]
async fn create_normalizes_and_lists_user() {
    let ctx = TestContext::new();
    let app = ctx.app().await;

    let resp = post(
        &app,
        "/users",
        json!({
            "first_name": "  Grace ",
            "last_name": "Hopper",
            "email": "Grace@Example.COM",
            "date_of_birth": "1906-12-09",
            "color": "   "
        }),
    )
    .await;
    let user = expect(resp, 201).await;
    assert_eq!(user["first_name"], "Grace");
    assert_eq!(user["email"], "grace@example.com");
    assert!(user["color"].is_null());
    assert_eq!(user["created_at"], "2030-05-01T12:00:00Z");

    let page = expect(get(&app, "/users").await, 200).await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["offset"], 0);
    assert_eq!(page["limit"], 100);
    assert_eq!(page["items"][0]["id"], user["id"]);
}

#[actix_rt::test]
async fn duplicate_email_conflicts() {
    let ctx = TestContext::new();
    let app = ctx.app().await;
    create_user(&app, "ada@example.com").await;

    let resp = post(
        &app,
        "/users",
        json!({
            "first_name": "Other",
            "last_name": "Person",
            "email": "ADA@example.com",
            "date_of_birth": "1980-01-01"
        }),
    )
    .await;
    let err = expect(resp, 409).await;
    assert_eq!(err["detail"], "A user with this email already exists");
}

#[actix_rt::test]
async fn field_rules_are_unprocessable() {
    let ctx = TestContext::new();
    let app = ctx.app().await;

    let cases = [
        json!({"first_name": "", "last_name": "X", "email": "a@b.co", "date_of_birth": "1990-01-01"}),
        json!({"first_name": "A", "last_name": "X", "email": "not-an-email", "date_of_birth": "1990-01-01"}),
        json!({"first_name": "A", "last_name": "X", "email": "a@b.co", "date_of_birth": "2031-01-01"}),
        json!({"first_name": "A", "last_name": "X", "email": "a@b.co"}),
    ];
    for body in cases {
        let resp = post(&app, "/users", body.clone()).await;
        assert_eq!(resp.status().as_u16(), 422, "{body}");
    }
    assert_eq!(expect(get(&app, "/users").await, 200).await["total"], 0);
}

#[actix_rt::test]
async fn filters_and_pagination() {
    let ctx = TestContext::new();
    let app = ctx.app().await;
    for n in 0..5 {
        create_user(&app, &format!("user{n}@example.com")).await;
    }
    let resp = post(
        &app,
        "/users",
        json!({
            "first_name": "Linus",
            "last_name": "Torvalds",
            "email": "linus@kernel.org",
            "date_of_birth": "1969-12-28"
        }),
    )
    .await;
    let linus = expect(resp, 201).await;

    let page = expect(get(&app, "/users?filter_expression=first_name:eq:Linus").await, 200).await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["id"], linus["id"]);

    let page = expect(
        get(
            &app,
            "/users?filter_expression=first_name:eq:Ada&filter_expression=email:like:user%251%25",
        )
        .await,
        200,
    )
    .await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["email"], "user1@example.com");

    let page = expect(get(&app, "/users?filter_expression=email:ilike:%25EXAMPLE%25").await, 200).await;
    assert_eq!(page["total"], 5);

    let page = expect(get(&app, "/users?offset=4&limit=10").await, 200).await;
    assert_eq!(page["total"], 6);
    assert_eq!(page["items"].as_array().unwrap().len(), 2);

    let page = expect(get(&app, "/users?limit=2").await, 200).await;
    assert_eq!(page["items"].as_array().unwrap().len(), 2);
    assert_eq!(page["limit"], 2);

    let page = expect(
        get(&app, "/users?filter_expression=date_of_birth:lt:1970-01-01").await,
        200,
    )
    .await;
    assert_eq!(page["total"], 1);
}

#[actix_rt::test]
async fn malformed_list_queries_are_bad_requests() {
    let ctx = TestContext::new();
    let app = ctx.app().await;

    let cases = [
        ("/users?filter_expression=first_name:eq", "Invalid filter_expression format"),
        ("/users?filter_expression=first_name:between:a", "Invalid filter operator"),
        ("/users?filter_expression=password:eq:x", "Invalid column name: password"),
        ("/users?filter_expression=id:eq:not-a-uuid", "Invalid UUID format for id"),
        ("/users?filter_expression=date_of_birth:gt:yesterday", "Invalid value for date_of_birth"),
        ("/users?limit=0", "Limit must be a positive integer"),
        ("/users?limit=1001", "Limit must not exceed 1000"),
        ("/users?offset=-1", "Offset must be non-negative"),
    ];
    for (uri, detail) in cases {
        let err = expect(get(&app, uri).await, 400).await;
        let message = err["detail"].as_str().unwrap();
        assert!(message.starts_with(detail), "{uri}: {message}");
    }
}

#[actix_rt::test]
async fn delete_returns_row_then_404() {
    let ctx = TestContext::new();
    let app = ctx.app().await;
    let user = create_user(&app, "gone@example.com").await;
    let uri = format!("/users/{}", id_of(&user));

    let deleted = expect(delete(&app, &uri).await, 200).await;
    assert_eq!(deleted["id"], user["id"]);

    let err = expect(delete(&app, &uri).await, 404).await;
    assert_eq!(err["detail"], format!("User {} not found", id_of(&user)));
}

#[actix_rt::test]
async fn malformed_body_is_unprocessable() {
    let ctx = TestContext::new();
    let app = ctx.app().await;
    let err = expect(post(&app, "/users", json!({"first_name": 5})).await, 422).await;
    assert!(err["detail"]
        .as_str()
        .unwrap()
        .starts_with("Invalid request body"));
}

#[actix_rt::test]
async fn pages_partition_the_result_set() {
    let ctx = TestContext::new();
    let app = ctx.app().await;
    let mut created = BTreeSet::new();
    for n in 0..7 {
        created.insert(id_of(&create_user(&app, &format!("user{n}@example.com")).await));
    }

    let limit = 3;
    let mut seen = Vec::new();
    for offset in (0..created.len()).step_by(limit) {
        let page = expect(get(&app, &format!("/users?limit={limit}&offset={offset}")).await, 200).await;
        assert_eq!(page["total"], created.len());
        let items = page["items"].as_array().unwrap();
        assert_eq!(items.len(), limit.min(created.len() - offset));
        seen.extend(items.iter().map(id_of));
    }

    let past_end = expect(get(&app, "/users?limit=3&offset=7").await, 200).await;
    assert_eq!(past_end["total"], 7);
    assert!(past_end["items"].as_array().unwrap().is_empty());

    let unique: BTreeSet<String> = seen.iter().cloned().collect();
    assert_eq!(unique.len(), seen.len(), "pages overlap");
    assert_eq!(unique, created);

    let whole = expect(get(&app, "/users").await, 200).await;
    let in_order: Vec<String> = whole["items"].as_array().unwrap().iter().map(id_of).collect();
    assert_eq!(in_order, seen);
}

#[actix_rt::test]
async fn malformed_path_id_is_unprocessable() {
    let ctx = TestContext::new();
    let app = ctx.app().await;

    let resp = delete(&app, "/users/not-a-uuid").await;
    assert_eq!(resp.status().as_u16(), 422);
    let err = body(resp).await;
    assert!(err["detail"]
        .as_str()
        .unwrap()
        .starts_with("Invalid path parameter"));

    expect(delete(&app, "/events/12345").await, 422).await;
}
