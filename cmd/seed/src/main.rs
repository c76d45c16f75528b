//! # Seeder
//!
//! Fills a Postgres database with the default roles, an admin and a
//! moderator account, and fake members, categories, threads and replies.
//! Every seeded account uses the password `password`.

use anyhow::{bail, Context};
use chrono::Utc;
use fake::faker::internet::en::{SafeEmail, Username};
use fake::faker::lorem::en::{Paragraph, Sentence, Words};
use fake::Fake;
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;

use auth_adapters::Argon2Hasher;
use configs::Settings;
use domains::{
    CategoryFields, CategoryRepository, NewReply, NewThread, NewUser, PasswordHasher,
    ReplyRepository, RoleStore, ThreadFields, ThreadRepository, User, UserRepository,
};
use services::roles::{ADMIN, MODERATOR};
use services::{Policy, RoleService};
use storage_adapters::PgStore;

const MEMBERS: usize = 10;
const CATEGORIES: usize = 4;
const THREADS_PER_CATEGORY: usize = 6;
const MAX_REPLIES: usize = 5;
const PASSWORD: &str = "password";

fn slugify(text: &str, n: usize) -> String {
    let words: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect();
    format!("{}-{n}", words.join("-"))
}

async fn create_user(
    store: &PgStore,
    username: String,
    email: String,
    hash: &str,
) -> anyhow::Result<User> {
    let user = store
        .create(NewUser {
            username,
            email,
            password_hash: hash.to_string(),
        })
        .await?;
    store.mark_email_verified(user.id, Utc::now()).await?;
    Ok(user)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = Settings::load().context("failed to load settings")?;
    let Some(url) = &settings.database.url else {
        bail!("set database.url (AGORA__DATABASE__URL) to seed a database");
    };
    let pool = PgPoolOptions::new()
        .max_connections(settings.database.max_connections)
        .connect(url.expose_secret())
        .await
        .context("failed to connect to Postgres")?;
    let store = Arc::new(PgStore::new(pool));
    store.migrate().await.context("failed to run migrations")?;

    let roles = RoleService::new(store.clone(), store.clone(), Policy::new(store.clone()));
    roles.install_defaults().await?;

    let hash = Argon2Hasher::new().hash(PASSWORD)?;

    let admin = create_user(&store, "admin".into(), "admin@example.com".into(), &hash).await?;
    store.assign_role(admin.id, ADMIN).await?;
    let moderator =
        create_user(&store, "moderator".into(), "moderator@example.com".into(), &hash).await?;
    store.assign_role(moderator.id, MODERATOR).await?;

    let mut members = Vec::with_capacity(MEMBERS);
    for n in 0..MEMBERS {
        let handle: String = Username().fake();
        let username = format!("{}{n}", handle.replace(|c: char| !c.is_alphanumeric(), ""));
        let email = format!("{n}.{}", SafeEmail().fake::<String>());
        members.push(create_user(&store, username, email, &hash).await?);
    }
    tracing::info!(members = members.len(), "users seeded");

    let mut threads = 0usize;
    let mut replies = 0usize;
    for c in 0..CATEGORIES {
        let name = Words(1..3).fake::<Vec<String>>().join(" ");
        let category = CategoryRepository::insert(
            store.as_ref(),
            CategoryFields {
                slug: slugify(&name, c),
                name,
                description: Some(Sentence(6..12).fake()),
            },
        )
        .await?;

        for t in 0..THREADS_PER_CATEGORY {
            let owner = &members[(c * THREADS_PER_CATEGORY + t) % members.len()];
            let title: String = Sentence(3..8).fake();
            let thread = ThreadRepository::insert(
                store.as_ref(),
                NewThread {
                    owner_id: owner.id,
                    fields: ThreadFields {
                        category_id: category.id,
                        slug: slugify(&title, c * THREADS_PER_CATEGORY + t),
                        title,
                        body: Paragraph(2..5).fake(),
                    },
                },
            )
            .await?;
            threads += 1;

            for r in 0..(t % (MAX_REPLIES + 1)) {
                let author = &members[(t + r + 1) % members.len()];
                ReplyRepository::insert(
                    store.as_ref(),
                    NewReply {
                        owner_id: author.id,
                        thread_id: thread.id,
                        body: Paragraph(1..3).fake(),
                    },
                )
                .await?;
                replies += 1;
            }
        }
    }

    tracing::info!(categories = CATEGORIES, threads, replies, "content seeded");
    Ok(())
}
