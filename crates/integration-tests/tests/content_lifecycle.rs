//! Create, update, archive, restore and destroy over HTTP for categories,
//! threads and replies, as guests, owners, strangers and moderators.

use axum::http::StatusCode;
use serde_json::json;

use domains::{Category, CategoryRepository, Reply, ResourceStore, Scope, Thread};
use integration_tests::TestApp;

async fn find_thread(app: &TestApp, thread: &Thread, scope: Scope) -> Option<Thread> {
    ResourceStore::<Thread>::find(app.store.as_ref(), thread.id, scope)
        .await
        .unwrap()
}

async fn find_reply(app: &TestApp, reply: &Reply, scope: Scope) -> Option<Reply> {
    ResourceStore::<Reply>::find(app.store.as_ref(), reply.id, scope)
        .await
        .unwrap()
}

async fn active_categories(app: &TestApp) -> usize {
    CategoryRepository::list(app.store.as_ref()).await.unwrap().len()
}

async fn find_category(app: &TestApp, category: &Category, scope: Scope) -> Option<Category> {
    ResourceStore::<Category>::find(app.store.as_ref(), category.id, scope)
        .await
        .unwrap()
}

// ── Guests ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn guests_are_sent_to_login_and_change_nothing() {
    let app = TestApp::new().await;
    let owner = app.member("owner").await;
    let category = app.category("general").await;
    let thread = app.thread(&owner, &category, "first-thread").await;
    let reply = app.reply(&owner, &thread).await;
    let thread_path = thread.path(&category.slug);

    let attempts = [
        app.get("/community/categories/create", None).await,
        app.post_json(
            "/community/categories",
            None,
            json!({ "name": "News", "slug": "news" }),
        )
        .await,
        app.patch_json(
            "/community/categories/general",
            None,
            json!({ "name": "Renamed", "slug": "general" }),
        )
        .await,
        app.post(&format!("/community/categories/{}/archive", category.id), None)
            .await,
        app.delete(&format!("/community/categories/{}", category.id), None)
            .await,
        app.get("/community/threads/create", None).await,
        app.post_json(
            "/community/threads",
            None,
            json!({ "category_id": category.id, "title": "Hi", "slug": "hi", "body": "..." }),
        )
        .await,
        app.patch_json(
            &thread_path,
            None,
            json!({ "category_id": category.id, "title": "Hijacked", "slug": "first-thread", "body": "x" }),
        )
        .await,
        app.post(&format!("/community/threads/{}/archive", thread.id), None)
            .await,
        app.post(&format!("/community/threads/{}/restore", thread.id), None)
            .await,
        app.delete(&format!("/community/threads/{}", thread.id), None)
            .await,
        app.post_json(&format!("{thread_path}/replies"), None, json!({ "body": "hello" }))
            .await,
        app.post(&format!("/community/replies/{}/archive", reply.id), None)
            .await,
        app.delete(&format!("/community/replies/{}", reply.id), None)
            .await,
    ];
    for response in &attempts {
        response.assert_redirect("/login");
    }

    assert_eq!(active_categories(&app).await, 1);
    assert_eq!(find_thread(&app, &thread, Scope::Active).await, Some(thread.clone()));
    assert_eq!(find_reply(&app, &reply, Scope::Active).await, Some(reply));
    assert_eq!(
        find_category(&app, &category, Scope::Active).await,
        Some(category)
    );
}

// ── Categories ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn moderators_create_categories_and_members_cannot() {
    let app = TestApp::new().await;
    let moderator = app.moderator("mod").await;
    let member = app.member("member").await;

    let created = app
        .post_json(
            "/community/categories",
            Some(&moderator),
            json!({ "name": "General", "slug": "general", "description": "Anything goes" }),
        )
        .await;
    created.assert_redirect("/community/categories/general");

    let index = app.get("/community/categories", None).await;
    assert_eq!(index.status, StatusCode::OK);
    let slugs: Vec<_> = index
        .json()
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["slug"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(slugs, ["general"]);

    let denied = app
        .post_json(
            "/community/categories",
            Some(&member),
            json!({ "name": "Off topic", "slug": "off-topic" }),
        )
        .await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);
    assert_eq!(
        app.get("/community/categories/create", Some(&member)).await.status,
        StatusCode::FORBIDDEN
    );
    assert_eq!(active_categories(&app).await, 1);
}

#[tokio::test]
async fn category_validation_reports_every_field() {
    let app = TestApp::new().await;
    let moderator = app.moderator("mod").await;
    app.category("general").await;

    let response = app
        .post_json(
            "/community/categories",
            Some(&moderator),
            json!({ "name": "", "slug": "general" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    let body = response.json();
    assert!(body["errors"]["name"].is_array());
    assert_eq!(
        body["errors"]["slug"][0],
        "The slug has already been taken."
    );
    assert_eq!(body["old"]["slug"], "general");
}

#[tokio::test]
async fn archived_categories_disappear_until_restored() {
    let app = TestApp::new().await;
    let moderator = app.moderator("mod").await;
    let category = app.category("general").await;

    let archived = app
        .post(&format!("/community/categories/{}/archive", category.id), Some(&moderator))
        .await;
    assert_eq!(archived.status, StatusCode::OK);
    assert_eq!(archived.json()["lifecycle"]["state"], "soft_deleted");
    assert_eq!(
        app.get("/community/categories/general", None).await.status,
        StatusCode::NOT_FOUND
    );
    assert_eq!(active_categories(&app).await, 0);

    let restored = app
        .post(&format!("/community/categories/{}/restore", category.id), Some(&moderator))
        .await;
    assert_eq!(restored.status, StatusCode::OK);
    assert_eq!(
        find_category(&app, &category, Scope::Active).await,
        Some(category)
    );
}

#[tokio::test]
async fn members_cannot_manage_categories() {
    let app = TestApp::new().await;
    let moderator = app.moderator("mod").await;
    let member = app.member("member").await;
    let category = app.category("general").await;
    let archive_path = format!("/community/categories/{}/archive", category.id);
    let restore_path = format!("/community/categories/{}/restore", category.id);
    let destroy_path = format!("/community/categories/{}", category.id);

    let denied = [
        app.get("/community/categories/general/edit", Some(&member)).await,
        app.patch_json(
            "/community/categories/general",
            Some(&member),
            json!({ "name": "Renamed", "slug": "general" }),
        )
        .await,
        app.post(&archive_path, Some(&member)).await,
        app.delete(&destroy_path, Some(&member)).await,
    ];
    for response in &denied {
        assert_eq!(response.status, StatusCode::FORBIDDEN);
    }
    assert_eq!(
        find_category(&app, &category, Scope::Active).await,
        Some(category.clone())
    );

    app.post(&archive_path, Some(&moderator)).await;
    assert_eq!(
        app.post(&restore_path, Some(&member)).await.status,
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        app.delete(&destroy_path, Some(&member)).await.status,
        StatusCode::FORBIDDEN
    );
    let archived = find_category(&app, &category, Scope::OnlyTrashed).await;
    assert!(archived.is_some_and(|c| c.lifecycle.is_soft_deleted()));
}

#[tokio::test]
async fn destroying_a_category_removes_its_threads_and_replies() {
    let app = TestApp::new().await;
    let moderator = app.moderator("mod").await;
    let owner = app.member("owner").await;
    let category = app.category("general").await;
    let other = app.category("news").await;
    let thread = app.thread(&owner, &category, "doomed").await;
    let reply = app.reply(&owner, &thread).await;
    let survivor = app.thread(&owner, &other, "survivor").await;

    let response = app
        .delete(&format!("/community/categories/{}", category.id), Some(&moderator))
        .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    assert_eq!(find_category(&app, &category, Scope::Active).await, None);
    assert_eq!(find_category(&app, &category, Scope::WithTrashed).await, None);
    assert_eq!(find_thread(&app, &thread, Scope::WithTrashed).await, None);
    assert_eq!(find_reply(&app, &reply, Scope::WithTrashed).await, None);
    assert!(find_thread(&app, &survivor, Scope::Active).await.is_some());

    let again = app
        .delete(&format!("/community/categories/{}", category.id), Some(&moderator))
        .await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
    assert_eq!(
        app.post(&format!("/community/categories/{}/restore", category.id), Some(&moderator))
            .await
            .status,
        StatusCode::NOT_FOUND
    );
}

// ── Threads ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn members_open_threads_in_active_categories() {
    let app = TestApp::new().await;
    let member = app.member("alice").await;
    let category = app.category("general").await;

    let response = app
        .post_form(
            "/community/threads",
            Some(&member),
            &format!(
                "category_id={}&title=Hello+there&slug=hello-there&body=First+post",
                category.id
            ),
        )
        .await;
    response.assert_redirect("/community/categories/general/threads/hello-there");

    let shown = app
        .get("/community/categories/general/threads/hello-there", None)
        .await;
    assert_eq!(shown.status, StatusCode::OK);
    let body = shown.json();
    assert_eq!(body["title"], "Hello there");
    assert_eq!(body["owner_id"], member.user.id.0);
    assert_eq!(body["replies"], json!([]));
}

#[tokio::test]
async fn threads_are_only_reachable_through_their_category() {
    let app = TestApp::new().await;
    let member = app.member("alice").await;
    let general = app.category("general").await;
    app.category("news").await;
    app.thread(&member, &general, "hello").await;

    let wrong = app.get("/community/categories/news/threads/hello", None).await;
    assert_eq!(wrong.status, StatusCode::NOT_FOUND);
    let right = app.get("/community/categories/general/threads/hello", None).await;
    assert_eq!(right.status, StatusCode::OK);
}

#[tokio::test]
async fn thread_owner_archives_and_restores_but_cannot_destroy() {
    let app = TestApp::new().await;
    let owner = app.member("owner").await;
    let category = app.category("general").await;
    let thread = app.thread(&owner, &category, "my-thread").await;
    let before = find_thread(&app, &thread, Scope::Active).await.unwrap();

    let archived = app
        .post(&format!("/community/threads/{}/archive", thread.id), Some(&owner))
        .await;
    assert_eq!(archived.status, StatusCode::OK);
    assert!(find_thread(&app, &thread, Scope::Active).await.is_none());
    assert!(find_thread(&app, &thread, Scope::OnlyTrashed).await.is_some());
    assert_eq!(
        app.get(&thread.path(&category.slug), None).await.status,
        StatusCode::NOT_FOUND
    );

    let restored = app
        .post(&format!("/community/threads/{}/restore", thread.id), Some(&owner))
        .await;
    assert_eq!(restored.status, StatusCode::OK);
    assert_eq!(find_thread(&app, &thread, Scope::Active).await, Some(before));

    let destroy = app
        .delete(&format!("/community/threads/{}", thread.id), Some(&owner))
        .await;
    assert_eq!(destroy.status, StatusCode::FORBIDDEN);
    assert!(find_thread(&app, &thread, Scope::Active).await.is_some());
}

#[tokio::test]
async fn strangers_cannot_touch_someone_elses_thread() {
    let app = TestApp::new().await;
    let owner = app.member("owner").await;
    let stranger = app.member("stranger").await;
    let category = app.category("general").await;
    let thread = app.thread(&owner, &category, "mine").await;
    let path = thread.path(&category.slug);

    assert_eq!(
        app.get(&format!("{path}/edit"), Some(&stranger)).await.status,
        StatusCode::FORBIDDEN
    );
    let update = app
        .patch_json(
            &path,
            Some(&stranger),
            json!({ "category_id": category.id, "title": "Mine now", "slug": "mine", "body": "x" }),
        )
        .await;
    assert_eq!(update.status, StatusCode::FORBIDDEN);
    let archive = app
        .post(&format!("/community/threads/{}/archive", thread.id), Some(&stranger))
        .await;
    assert_eq!(archive.status, StatusCode::FORBIDDEN);
    assert_eq!(find_thread(&app, &thread, Scope::Active).await, Some(thread));
}

#[tokio::test]
async fn moderators_destroy_archived_threads_for_good() {
    let app = TestApp::new().await;
    let owner = app.member("owner").await;
    let moderator = app.moderator("mod").await;
    let category = app.category("general").await;
    let thread = app.thread(&owner, &category, "doomed").await;

    app.post(&format!("/community/threads/{}/archive", thread.id), Some(&owner))
        .await;
    let destroyed = app
        .delete(&format!("/community/threads/{}", thread.id), Some(&moderator))
        .await;
    assert_eq!(destroyed.status, StatusCode::NO_CONTENT);
    assert!(find_thread(&app, &thread, Scope::WithTrashed).await.is_none());

    let restore = app
        .post(&format!("/community/threads/{}/restore", thread.id), Some(&moderator))
        .await;
    assert_eq!(restore.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn restoring_an_active_thread_is_not_found() {
    let app = TestApp::new().await;
    let owner = app.member("owner").await;
    let category = app.category("general").await;
    let thread = app.thread(&owner, &category, "live").await;

    let response = app
        .post(&format!("/community/threads/{}/restore", thread.id), Some(&owner))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn thread_slugs_are_unique() {
    let app = TestApp::new().await;
    let member = app.member("alice").await;
    let category = app.category("general").await;
    app.thread(&member, &category, "taken").await;

    let response = app
        .post_json(
            "/community/threads",
            Some(&member),
            json!({ "category_id": category.id, "title": "Again", "slug": "taken", "body": "..." }),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        response.json()["errors"]["slug"][0],
        "The slug has already been taken."
    );
}

// ── Replies ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn members_reply_and_edit_their_replies() {
    let app = TestApp::new().await;
    let author = app.member("author").await;
    let replier = app.member("replier").await;
    let category = app.category("general").await;
    let thread = app.thread(&author, &category, "talk").await;
    let path = thread.path(&category.slug);

    let created = app
        .post_json(&format!("{path}/replies"), Some(&replier), json!({ "body": "First!" }))
        .await;
    assert_eq!(created.status, StatusCode::SEE_OTHER);
    let location = created.location().unwrap().to_string();
    assert!(location.starts_with(&format!("{path}/replies/")));

    let updated = app
        .patch_json(&location, Some(&replier), json!({ "body": "Second, actually" }))
        .await;
    updated.assert_redirect(&location);

    let detail = app.get(&path, None).await.json();
    assert_eq!(detail["replies_count"], 1);
    assert_eq!(detail["replies"][0]["body"], "Second, actually");

    let empty = app
        .post_json(&format!("{path}/replies"), Some(&replier), json!({ "body": "  " }))
        .await;
    assert_eq!(empty.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(empty.json()["errors"]["body"].is_array());
}

#[tokio::test]
async fn reply_owner_cannot_destroy_their_reply() {
    let app = TestApp::new().await;
    let owner = app.member("owner").await;
    let category = app.category("general").await;
    let thread = app.thread(&owner, &category, "talk").await;
    let reply = app.reply(&owner, &thread).await;

    let response = app
        .delete(&format!("/community/replies/{}", reply.id), Some(&owner))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(find_reply(&app, &reply, Scope::Active).await, Some(reply));
}

#[tokio::test]
async fn archived_replies_drop_out_of_the_thread() {
    let app = TestApp::new().await;
    let owner = app.member("owner").await;
    let moderator = app.moderator("mod").await;
    let category = app.category("general").await;
    let thread = app.thread(&owner, &category, "talk").await;
    let kept = app.reply(&owner, &thread).await;
    let hidden = app.reply(&owner, &thread).await;
    let path = thread.path(&category.slug);

    let archived = app
        .post(&format!("/community/replies/{}/archive", hidden.id), Some(&owner))
        .await;
    assert_eq!(archived.status, StatusCode::OK);

    let detail = app.get(&path, None).await.json();
    assert_eq!(detail["replies_count"], 1);
    assert_eq!(detail["replies"][0]["id"], kept.id.0);
    assert_eq!(
        app.get(&format!("{path}/replies/{}", hidden.id), None).await.status,
        StatusCode::NOT_FOUND
    );

    let destroyed = app
        .delete(&format!("/community/replies/{}", hidden.id), Some(&moderator))
        .await;
    assert_eq!(destroyed.status, StatusCode::NO_CONTENT);
    assert!(find_reply(&app, &hidden, Scope::WithTrashed).await.is_none());
}

#[tokio::test]
async fn non_numeric_ids_are_not_found() {
    let app = TestApp::new().await;
    let moderator = app.moderator("mod").await;

    let response = app
        .post("/community/threads/not-a-number/archive", Some(&moderator))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
