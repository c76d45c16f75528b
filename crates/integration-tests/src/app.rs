//! In-process application for request-level tests.

use axum::body::{to_bytes, Body, Bytes};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, LOCATION, SET_COOKIE};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::Router;
use fake::faker::lorem::en::{Paragraph, Sentence};
use fake::Fake;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use api_adapters::{router, AppState};
use domains::{
    Category, CategoryFields, CategoryRepository, NewReply, NewThread, Reply, ReplyRepository,
    RoleStore, Thread, ThreadFields, ThreadRepository, User,
};
use services::roles::{ADMIN, MODERATOR};
use services::{ForumServices, RegisterInput};
use storage_adapters::MemoryStore;

use crate::outbox::Outbox;
use crate::wiring::forum_services;
use crate::PASSWORD;

/// A registered user and a bearer credential for them.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub token: String,
}

/// Status, headers and the fully read body of one response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn location(&self) -> Option<&str> {
        self.headers.get(LOCATION).and_then(|v| v.to_str().ok())
    }

    pub fn set_cookie(&self) -> Option<&str> {
        self.headers.get(SET_COOKIE).and_then(|v| v.to_str().ok())
    }

    /// The session credential carried by `Set-Cookie`, if one was issued.
    pub fn session_token(&self) -> Option<String> {
        let cookie = self.set_cookie()?;
        let (pair, _) = cookie.split_once(';').unwrap_or((cookie, ""));
        let (_, value) = pair.split_once('=')?;
        (!value.is_empty()).then(|| value.to_string())
    }

    /// Asserts a `303` to `path` and returns `self` for chaining.
    #[track_caller]
    pub fn assert_redirect(&self, path: &str) -> &Self {
        assert_eq!(self.status, StatusCode::SEE_OTHER, "body: {}", self.text());
        assert_eq!(self.location(), Some(path));
        self
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub services: ForumServices,
    pub outbox: Arc<Outbox>,
}

impl TestApp {
    pub async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let outbox = Arc::new(Outbox::new());
        let services = forum_services(store.clone(), outbox.clone()).await;
        Self {
            router: router(AppState::new(services.clone(), "Agora")),
            store,
            services,
            outbox,
        }
    }

    // ── Accounts ────────────────────────────────────────────────────────────

    /// Registers `username` with [`PASSWORD`] and signs them in.
    pub async fn member(&self, username: &str) -> Session {
        let auth = self
            .services
            .accounts
            .register(&RegisterInput {
                username: Some(username.into()),
                email: Some(format!("{username}@example.com")),
                password: Some(PASSWORD.into()),
                password_confirmation: Some(PASSWORD.into()),
            })
            .await
            .expect("registration succeeds");
        Session {
            user: auth.user,
            token: auth.session.token,
        }
    }

    pub async fn moderator(&self, username: &str) -> Session {
        let session = self.member(username).await;
        self.store
            .assign_role(session.user.id, MODERATOR)
            .await
            .expect("moderator role assigned");
        session
    }

    pub async fn admin(&self, username: &str) -> Session {
        let session = self.member(username).await;
        self.store
            .assign_role(session.user.id, ADMIN)
            .await
            .expect("admin role assigned");
        session
    }

    // ── Content factories ───────────────────────────────────────────────────

    pub async fn category(&self, slug: &str) -> Category {
        CategoryRepository::insert(
            self.store.as_ref(),
            CategoryFields {
                name: slug.replace('-', " "),
                slug: slug.into(),
                description: Some(Sentence(4..8).fake()),
            },
        )
        .await
        .expect("category inserted")
    }

    pub async fn thread(&self, owner: &Session, category: &Category, slug: &str) -> Thread {
        ThreadRepository::insert(
            self.store.as_ref(),
            NewThread {
                owner_id: owner.user.id,
                fields: ThreadFields {
                    category_id: category.id,
                    title: Sentence(3..6).fake(),
                    slug: slug.into(),
                    body: Paragraph(1..3).fake(),
                },
            },
        )
        .await
        .expect("thread inserted")
    }

    pub async fn reply(&self, owner: &Session, thread: &Thread) -> Reply {
        ReplyRepository::insert(
            self.store.as_ref(),
            NewReply {
                owner_id: owner.user.id,
                thread_id: thread.id,
                body: Sentence(4..10).fake(),
            },
        )
        .await
        .expect("reply inserted")
    }

    // ── Requests ────────────────────────────────────────────────────────────

    pub async fn request(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("response body readable");
        TestResponse {
            status,
            headers,
            body,
        }
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        session: Option<&Session>,
        content_type: Option<&str>,
        body: Body,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(session) = session {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", session.token));
        }
        if let Some(content_type) = content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        self.request(builder.body(body).expect("valid request")).await
    }

    pub async fn get(&self, path: &str, session: Option<&Session>) -> TestResponse {
        self.send(Method::GET, path, session, None, Body::empty()).await
    }

    /// A bodiless `POST`, as sent by the archive and restore buttons.
    pub async fn post(&self, path: &str, session: Option<&Session>) -> TestResponse {
        self.send(Method::POST, path, session, None, Body::empty()).await
    }

    pub async fn post_json(&self, path: &str, session: Option<&Session>, body: Value) -> TestResponse {
        self.send(
            Method::POST,
            path,
            session,
            Some("application/json"),
            Body::from(body.to_string()),
        )
        .await
    }

    pub async fn post_form(&self, path: &str, session: Option<&Session>, body: &str) -> TestResponse {
        self.send(
            Method::POST,
            path,
            session,
            Some("application/x-www-form-urlencoded"),
            Body::from(body.to_string()),
        )
        .await
    }

    pub async fn patch_json(&self, path: &str, session: Option<&Session>, body: Value) -> TestResponse {
        self.send(
            Method::PATCH,
            path,
            session,
            Some("application/json"),
            Body::from(body.to_string()),
        )
        .await
    }

    pub async fn delete(&self, path: &str, session: Option<&Session>) -> TestResponse {
        self.send(Method::DELETE, path, session, None, Body::empty()).await
    }
}
