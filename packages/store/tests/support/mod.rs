#![allow(dead_code)]

use common::{JobInput, SourceInput, SourceType, SummaryOptions};
use sea_orm::DatabaseConnection;
use store::entity::{job, user};
use store::jobs::NewSummary;

pub async fn setup() -> DatabaseConnection {
    store::init_db("sqlite::memory:", 1)
        .await
        .expect("Failed to initialize in-memory database")
}

pub async fn create_user(db: &DatabaseConnection, email: &str) -> user::Model {
    store::users::create_user(db, email, "$argon2id$test".into())
        .await
        .expect("Failed to create user")
}

pub fn text_input(text: &str) -> JobInput {
    JobInput {
        source: SourceInput::Text { text: text.into() },
        options: SummaryOptions {
            num_sentences: 2,
            keep_citations: false,
            model: "extractive".into(),
            provider: "local".into(),
        },
    }
}

pub async fn create_job(db: &DatabaseConnection, user: &user::Model) -> job::Model {
    store::jobs::create(db, user.id, &text_input("Attention is all you need."))
        .await
        .expect("Failed to create job")
}

pub fn new_summary(content: &str) -> NewSummary {
    NewSummary {
        title: "Text summary".into(),
        source_type: SourceType::Text,
        source_value: "Attention is all you need.".into(),
        content: content.into(),
        model: "extractive".into(),
        provider: "local".into(),
        num_sentences: 2,
    }
}
