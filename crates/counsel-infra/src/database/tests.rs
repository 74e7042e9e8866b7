use chrono::{TimeZone, Utc};
use counsel_core::domain::MessageStatus;
use counsel_core::error::RepoError;
use counsel_core::ports::{ConversationStore, MessageStore};
use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
use uuid::Uuid;

use crate::database::entity::message;
use crate::database::{PostgresConversationStore, PostgresMessageStore};

fn message_row(conversation_id: Uuid, minute: u32, status: &str) -> message::Model {
    message::Model {
        id: Uuid::new_v4(),
        conversation_id,
        sender_id: Uuid::new_v4(),
        content: Some(format!("minute {minute}")),
        status: status.to_owned(),
        attachment_path: None,
        attachment_name: None,
        attachment_mime_type: None,
        attachment_size: None,
        created_at: Utc
            .with_ymd_and_hms(2024, 5, 2, 14, minute, 0)
            .unwrap()
            .fixed_offset(),
    }
}

#[tokio::test]
async fn test_fetch_page_maps_rows() {
    let conversation_id = Uuid::new_v4();
    let mut with_attachment = message_row(conversation_id, 2, "delivered");
    with_attachment.attachment_path = Some(format!("{conversation_id}/nda.pdf"));

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![with_attachment, message_row(conversation_id, 1, "read")]])
        .into_connection();

    let store = PostgresMessageStore::new(db);
    let page = store.fetch_page(conversation_id, None, 50).await.unwrap();

    assert_eq!(page.len(), 2);
    assert_eq!(page[0].status, MessageStatus::Delivered);
    assert_eq!(page[0].attachment.as_ref().unwrap().file_name, "nda.pdf");
    assert_eq!(page[1].status, MessageStatus::Read);
}

#[tokio::test]
async fn test_unknown_status_is_a_query_error() {
    let conversation_id = Uuid::new_v4();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![message_row(conversation_id, 0, "seen")]])
        .into_connection();

    let store = PostgresMessageStore::new(db);
    let result = store.fetch_page(conversation_id, None, 50).await;

    assert!(matches!(result, Err(RepoError::Query(_))));
}

#[tokio::test]
async fn test_mark_read_reports_rows_affected() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 4,
        }])
        .into_connection();

    let store = PostgresMessageStore::new(db);
    let updated = store
        .mark_read(Uuid::new_v4(), Uuid::new_v4())
        .await
        .unwrap();

    assert_eq!(updated, 4);
}

#[tokio::test]
async fn test_delete_missing_conversation_is_not_found() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 0,
        }])
        .into_connection();

    let store = PostgresConversationStore::new(db);

    assert!(matches!(
        store.delete(Uuid::new_v4()).await,
        Err(RepoError::NotFound)
    ));
}
