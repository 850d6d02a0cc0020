//! Integration tests for [`storage::UserRepository`] and [`storage::StorageHandle`].
//!
//! Covers merge semantics of [`storage::UserPatch`], deactivation/reactivation and active listing.

use chrono::Utc;
use storage::{FieldPatch, StorageHandle, UserPatch, UserRepository, UserSource, UserStore};
use tempfile::TempDir;

async fn setup() -> (TempDir, UserRepository) {
    let dir = TempDir::new().expect("TempDir::new must succeed");
    let path = dir.path().join("users.db");
    let repo = UserRepository::new(path.to_str().unwrap())
        .await
        .expect("Failed to create repository");
    (dir, repo)
}

fn member_patch(user_id: &str, name: &str, chat_id: &str) -> UserPatch {
    UserPatch {
        display_name: FieldPatch::Set(name.to_string()),
        chat_id: FieldPatch::Set(chat_id.to_string()),
        username: FieldPatch::Set(format!("{}_handle", name.to_lowercase())),
        first_name: FieldPatch::Set(name.to_string()),
        last_name: FieldPatch::Clear,
        status: FieldPatch::Set("member".to_string()),
        is_active: FieldPatch::Set(true),
        source: FieldPatch::Set(UserSource::TelegramMessage),
        ..UserPatch::new(user_id)
    }
}

/// **Test: Unchanged fields keep their stored values.**
///
/// **Setup:** Full member patch for user 7.
/// **Action:** Second patch that only sets `status`.
/// **Expected:** Status updated; name, username and chat id untouched; created_at stable.
#[tokio::test]
async fn test_partial_patch_preserves_other_fields() {
    let (_dir, repo) = setup().await;
    repo.upsert_user(&member_patch("7", "Ann", "-100123")).await.unwrap();
    let first = repo.get_user("7").await.unwrap().expect("user exists");

    let patch = UserPatch {
        status: FieldPatch::Set("administrator".to_string()),
        ..UserPatch::new("7")
    };
    repo.upsert_user(&patch).await.unwrap();

    let user = repo.get_user("7").await.unwrap().expect("user exists");
    assert_eq!(user.status.as_deref(), Some("administrator"));
    assert_eq!(user.display_name.as_deref(), Some("Ann"));
    assert_eq!(user.username.as_deref(), Some("ann_handle"));
    assert_eq!(user.chat_id.as_deref(), Some("-100123"));
    assert_eq!(user.source.as_deref(), Some("telegram_message"));
    assert_eq!(user.created_at, first.created_at);
    assert!(user.updated_at >= first.updated_at);
}

/// **Test: Clear writes NULL.**
#[tokio::test]
async fn test_clear_nulls_field() {
    let (_dir, repo) = setup().await;
    let mut patch = member_patch("7", "Ann", "-100123");
    patch.last_name = FieldPatch::Set("Lee".to_string());
    repo.upsert_user(&patch).await.unwrap();

    let clear = UserPatch {
        last_name: FieldPatch::Clear,
        ..UserPatch::new("7")
    };
    repo.upsert_user(&clear).await.unwrap();

    let user = repo.get_user("7").await.unwrap().unwrap();
    assert!(user.last_name.is_none());
    assert_eq!(user.first_name.as_deref(), Some("Ann"));
}

/// **Test: Deactivation and reactivation toggle each other's timestamps.**
#[tokio::test]
async fn test_deactivate_then_reactivate() {
    let (_dir, repo) = setup().await;
    repo.upsert_user(&member_patch("7", "Ann", "-100123")).await.unwrap();

    repo.upsert_user(&UserPatch::deactivate("7", "manual_remove", Utc::now()))
        .await
        .unwrap();
    let off = repo.get_user("7").await.unwrap().unwrap();
    assert!(!off.is_active);
    assert_eq!(off.status.as_deref(), Some("left"));
    assert_eq!(off.deactivated_reason.as_deref(), Some("manual_remove"));
    assert!(off.deactivated_at.is_some());
    assert!(off.reactivated_at.is_none());

    repo.upsert_user(&UserPatch::reactivate("7", Utc::now()))
        .await
        .unwrap();
    let on = repo.get_user("7").await.unwrap().unwrap();
    assert!(on.is_active);
    assert_eq!(on.status.as_deref(), Some("member"));
    assert!(on.deactivated_reason.is_none());
    assert!(on.deactivated_at.is_none());
    assert!(on.reactivated_at.is_some());
    assert_eq!(on.display_name.as_deref(), Some("Ann"));
}

/// **Test: Active listing filters by chat id forms and inactivity, sorted by name.**
///
/// **Setup:** Three users in chat `-100123` (one deactivated), one in another chat, one in the short form `-123`.
/// **Action:** `list_active_users(["-100123", "-123"])`.
/// **Expected:** Active users of both forms, sorted by name.
#[tokio::test]
async fn test_list_active_users_filters_and_sorts() {
    let (_dir, repo) = setup().await;
    repo.upsert_user(&member_patch("1", "Chris", "-100123")).await.unwrap();
    repo.upsert_user(&member_patch("2", "Ann", "-100123")).await.unwrap();
    repo.upsert_user(&member_patch("3", "Bea", "-100123")).await.unwrap();
    repo.upsert_user(&member_patch("4", "Dan", "-100999")).await.unwrap();
    repo.upsert_user(&member_patch("5", "Eve", "-123")).await.unwrap();
    repo.upsert_user(&UserPatch::deactivate("3", "manual_remove", Utc::now()))
        .await
        .unwrap();

    let users = repo
        .list_active_users(&["-100123".to_string(), "-123".to_string()])
        .await
        .unwrap();
    let names: Vec<String> = users.iter().map(|u| u.name()).collect();
    assert_eq!(names, vec!["Ann", "Chris", "Eve"]);

    let all = repo.list_active_users(&[]).await.unwrap();
    assert_eq!(all.len(), 4);
}

/// **Test: A user created by deactivation alone gets the `user_<id>` fallback name.**
#[tokio::test]
async fn test_blank_name_falls_back_to_user_id() {
    let (_dir, repo) = setup().await;
    let patch = UserPatch {
        display_name: FieldPatch::Set("   ".to_string()),
        is_active: FieldPatch::Set(true),
        ..UserPatch::new("99")
    };
    repo.upsert_user(&patch).await.unwrap();

    let user = repo.get_user("99").await.unwrap().unwrap();
    assert_eq!(user.display_name.as_deref(), Some("user_99"));
    assert_eq!(user.name(), "user_99");
}

/// **Test: StorageHandle connects once and returns the same storage afterwards.**
#[tokio::test]
async fn test_storage_handle_init_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("handle.db");
    let handle = StorageHandle::new(path.to_str().unwrap());
    assert!(!handle.is_initialized());

    let first = handle.get().await.expect("first init") as *const _;
    let second = handle.get().await.expect("second init") as *const _;

    assert!(handle.is_initialized());
    assert_eq!(first, second);
}
