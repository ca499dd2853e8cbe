/// Integration tests for the database models
///
/// Each test gets a migrated SQLite file in its own temporary directory.

use chrono::Duration;
use kutubxona_shared::auth::middleware::resolve_auth_context;
use kutubxona_shared::auth::password::verify_password;
use kutubxona_shared::auth::session::{generate_session_token, SESSION_COOKIE};
use kutubxona_shared::db::bootstrap::ensure_bootstrap_admin;
use kutubxona_shared::db::migrations::run_migrations;
use kutubxona_shared::db::pool::{create_pool, DatabaseConfig};
use kutubxona_shared::models::material::{
    CreateMaterial, Material, MaterialFilter, MaterialType, UpdateMaterial,
};
use kutubxona_shared::models::notification::{CreateNotification, Notification};
use kutubxona_shared::models::session::Session;
use kutubxona_shared::models::user::{CreateUser, Role, User};
use kutubxona_shared::models::view_history::ViewRecord;
use sqlx::SqlitePool;
use tempfile::TempDir;

const SECRET: &str = "test-secret";

async fn setup() -> (SqlitePool, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = DatabaseConfig {
        url: format!("sqlite://{}", dir.path().join("test.db").display()),
        ..Default::default()
    };
    let pool = create_pool(config).await.expect("Failed to create pool");
    run_migrations(&pool).await.expect("Migrations failed");
    (pool, dir)
}

async fn create_user(pool: &SqlitePool, name: &str, role: Role) -> User {
    User::create(
        pool,
        CreateUser {
            name: name.to_string(),
            email: format!("{}@x.com", name.to_lowercase()),
            password_hash: "$argon2id$not-a-real-hash".to_string(),
            role,
        },
    )
    .await
    .expect("Failed to create user")
}

async fn create_material(
    pool: &SqlitePool,
    title: &str,
    material_type: MaterialType,
    uploaded_by: i64,
) -> Material {
    Material::create(
        pool,
        CreateMaterial {
            title: title.to_string(),
            author: "Author".to_string(),
            description: String::new(),
            filename: None,
            material_type,
            uploaded_by,
        },
    )
    .await
    .expect("Failed to create material")
}

#[tokio::test]
async fn test_user_create_and_find() {
    let (pool, _dir) = setup().await;

    let alice = create_user(&pool, "Alice", Role::User).await;
    assert_eq!(alice.role, Role::User);

    let by_id = User::find_by_id(&pool, alice.id).await.unwrap().unwrap();
    assert_eq!(by_id.email, "alice@x.com");

    let by_email = User::find_by_email(&pool, "  ALICE@x.com ").await.unwrap();
    assert_eq!(by_email.map(|u| u.id), Some(alice.id));

    assert!(User::find_by_id(&pool, 999).await.unwrap().is_none());
}

#[tokio::test]
async fn test_user_duplicate_email_is_unique_violation() {
    let (pool, _dir) = setup().await;
    create_user(&pool, "Alice", Role::User).await;

    let err = User::create(
        &pool,
        CreateUser {
            name: "Other".to_string(),
            email: "alice@x.com".to_string(),
            password_hash: "h".to_string(),
            role: Role::User,
        },
    )
    .await
    .unwrap_err();

    let is_unique = err
        .as_database_error()
        .map(|e| e.is_unique_violation())
        .unwrap_or(false);
    assert!(is_unique, "Expected unique violation, got {:?}", err);
    assert_eq!(User::count(&pool).await.unwrap(), 1);
}

#[tokio::test]
async fn test_user_set_role_and_first_created() {
    let (pool, _dir) = setup().await;
    let admin = create_user(&pool, "Admin", Role::SuperAdmin).await;
    let bob = create_user(&pool, "Bob", Role::User).await;

    assert!(User::set_role(&pool, bob.id, Role::MaterialAdmin).await.unwrap());
    assert!(!User::set_role(&pool, 999, Role::MaterialAdmin).await.unwrap());

    let bob = User::find_by_id(&pool, bob.id).await.unwrap().unwrap();
    assert_eq!(bob.role, Role::MaterialAdmin);

    let first = User::first_created(&pool).await.unwrap().unwrap();
    assert_eq!(first.id, admin.id);

    let all = User::list_all(&pool).await.unwrap();
    assert_eq!(all.iter().map(|u| u.id).collect::<Vec<_>>(), vec![admin.id, bob.id]);
}

#[tokio::test]
async fn test_material_list_filters_and_orders_newest_first() {
    let (pool, _dir) = setup().await;
    let admin = create_user(&pool, "Admin", Role::SuperAdmin).await;
    let bob = create_user(&pool, "Bob", Role::MaterialAdmin).await;

    let m1 = create_material(&pool, "One", MaterialType::Book, admin.id).await;
    let m2 = create_material(&pool, "Two", MaterialType::Video, admin.id).await;
    let m3 = create_material(&pool, "Three", MaterialType::Book, bob.id).await;

    let all = Material::list(&pool, MaterialFilter::default()).await.unwrap();
    assert_eq!(all.iter().map(|m| m.id).collect::<Vec<_>>(), vec![m3.id, m2.id, m1.id]);

    let books = Material::list(
        &pool,
        MaterialFilter {
            material_type: Some(MaterialType::Book),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(books.iter().map(|m| m.id).collect::<Vec<_>>(), vec![m3.id, m1.id]);

    let bobs_books = Material::list(
        &pool,
        MaterialFilter {
            material_type: Some(MaterialType::Book),
            uploaded_by: Some(bob.id),
        },
    )
    .await
    .unwrap();
    assert_eq!(bobs_books.len(), 1);
    assert_eq!(bobs_books[0].id, m3.id);

    let counts = Material::counts(&pool).await.unwrap();
    assert_eq!(counts.books, 2);
    assert_eq!(counts.videos, 1);
    assert_eq!(counts.apps, 0);
    assert_eq!(counts.images, 0);
}

#[tokio::test]
async fn test_material_update_keeps_filename_unless_given() {
    let (pool, _dir) = setup().await;
    let admin = create_user(&pool, "Admin", Role::SuperAdmin).await;

    let material = Material::create(
        &pool,
        CreateMaterial {
            title: "Old".to_string(),
            author: String::new(),
            description: String::new(),
            filename: Some("old.pdf".to_string()),
            material_type: MaterialType::Book,
            uploaded_by: admin.id,
        },
    )
    .await
    .unwrap();

    let updated = Material::update(
        &pool,
        material.id,
        UpdateMaterial {
            title: "New".to_string(),
            author: "A".to_string(),
            description: "D".to_string(),
            filename: None,
        },
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(updated.title, "New");
    assert_eq!(updated.filename.as_deref(), Some("old.pdf"));

    let replaced = Material::update(
        &pool,
        material.id,
        UpdateMaterial {
            title: "New".to_string(),
            filename: Some("new.pdf".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(replaced.filename.as_deref(), Some("new.pdf"));
    assert_eq!(replaced.material_type, MaterialType::Book);

    assert!(Material::update(&pool, 999, UpdateMaterial::default())
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_record_view_increments_and_logs() {
    let (pool, _dir) = setup().await;
    let admin = create_user(&pool, "Admin", Role::SuperAdmin).await;
    let alice = create_user(&pool, "Alice", Role::User).await;
    let material = create_material(&pool, "Viewed", MaterialType::Image, admin.id).await;

    Material::record_view(&pool, material.id, None).await.unwrap();
    let after = Material::record_view(&pool, material.id, Some(alice.id))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.view_count, 2);

    let history = ViewRecord::list_for_material(&pool, material.id).await.unwrap();
    assert_eq!(history.len(), 2);
    // Newest first: Alice's view, then the anonymous one
    assert_eq!(history[0].user_id, Some(alice.id));
    assert_eq!(history[0].user_name.as_deref(), Some("Alice"));
    assert_eq!(history[1].user_id, None);
    assert_eq!(history[1].user_name, None);

    assert!(Material::record_view(&pool, 999, None).await.unwrap().is_none());
}

#[tokio::test]
async fn test_material_delete_cascades_view_history() {
    let (pool, _dir) = setup().await;
    let admin = create_user(&pool, "Admin", Role::SuperAdmin).await;
    let doomed = create_material(&pool, "Doomed", MaterialType::App, admin.id).await;
    let kept = create_material(&pool, "Kept", MaterialType::App, admin.id).await;

    for _ in 0..3 {
        Material::record_view(&pool, doomed.id, Some(admin.id)).await.unwrap();
    }
    Material::record_view(&pool, kept.id, None).await.unwrap();

    assert!(Material::delete(&pool, doomed.id).await.unwrap());
    assert!(Material::find_by_id(&pool, doomed.id).await.unwrap().is_none());
    assert_eq!(ViewRecord::count_for_material(&pool, doomed.id).await.unwrap(), 0);
    assert_eq!(ViewRecord::count_for_material(&pool, kept.id).await.unwrap(), 1);

    assert!(!Material::delete(&pool, doomed.id).await.unwrap());
}

#[tokio::test]
async fn test_referenced_filenames() {
    let (pool, _dir) = setup().await;
    let admin = create_user(&pool, "Admin", Role::SuperAdmin).await;

    create_material(&pool, "No file", MaterialType::Book, admin.id).await;
    Material::create(
        &pool,
        CreateMaterial {
            title: "With file".to_string(),
            author: String::new(),
            description: String::new(),
            filename: Some("a.pdf".to_string()),
            material_type: MaterialType::Book,
            uploaded_by: admin.id,
        },
    )
    .await
    .unwrap();

    assert_eq!(
        Material::referenced_filenames(&pool).await.unwrap(),
        vec!["a.pdf".to_string()]
    );
}

#[tokio::test]
async fn test_notifications_newest_first() {
    let (pool, _dir) = setup().await;
    let alice = create_user(&pool, "Alice", Role::User).await;
    let bob = create_user(&pool, "Bob", Role::User).await;

    for title in ["first", "second"] {
        Notification::create(
            &pool,
            CreateNotification {
                user_id: alice.id,
                title: title.to_string(),
                message: "hello".to_string(),
            },
        )
        .await
        .unwrap();
    }

    let inbox = Notification::list_for_user(&pool, alice.id).await.unwrap();
    assert_eq!(
        inbox.iter().map(|n| n.title.as_str()).collect::<Vec<_>>(),
        vec!["second", "first"]
    );
    assert!(inbox.iter().all(|n| !n.is_read));
    assert_eq!(Notification::count_unread(&pool, alice.id).await.unwrap(), 2);

    assert!(Notification::list_for_user(&pool, bob.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_session_resolves_live_role() {
    let (pool, _dir) = setup().await;
    let alice = create_user(&pool, "Alice", Role::User).await;

    let (token, hash) = generate_session_token(SECRET);
    Session::create(&pool, &hash, &alice, Duration::hours(24)).await.unwrap();

    let mut headers = axum::http::HeaderMap::new();
    headers.insert(
        axum::http::header::COOKIE,
        format!("{}={}", SESSION_COOKIE, token).parse().unwrap(),
    );

    let ctx = resolve_auth_context(&pool, SECRET, &headers).await.unwrap().unwrap();
    assert_eq!(ctx.user_id, alice.id);
    assert_eq!(ctx.role, Role::User);

    User::set_role(&pool, alice.id, Role::MaterialAdmin).await.unwrap();
    let ctx = resolve_auth_context(&pool, SECRET, &headers).await.unwrap().unwrap();
    assert_eq!(ctx.role, Role::MaterialAdmin);

    // Same cookie under a different secret matches nothing
    assert!(resolve_auth_context(&pool, "other-secret", &headers)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_session_expiry_and_purge() {
    let (pool, _dir) = setup().await;
    let alice = create_user(&pool, "Alice", Role::User).await;

    let (_, live_hash) = generate_session_token(SECRET);
    let (_, dead_hash) = generate_session_token(SECRET);
    Session::create(&pool, &live_hash, &alice, Duration::hours(1)).await.unwrap();
    Session::create(&pool, &dead_hash, &alice, Duration::seconds(-10)).await.unwrap();

    assert!(Session::resolve(&pool, &live_hash).await.unwrap().is_some());
    assert!(Session::resolve(&pool, &dead_hash).await.unwrap().is_none());

    let (_, other_dead) = generate_session_token(SECRET);
    Session::create(&pool, &other_dead, &alice, Duration::seconds(-10)).await.unwrap();
    assert_eq!(Session::purge_expired(&pool).await.unwrap(), 1);
    assert!(Session::resolve(&pool, &live_hash).await.unwrap().is_some());

    assert!(Session::delete(&pool, &live_hash).await.unwrap());
    assert!(Session::resolve(&pool, &live_hash).await.unwrap().is_none());
}

#[tokio::test]
async fn test_writes_visible_on_other_connections() {
    let (pool, _dir) = setup().await;

    // Held for the whole test, so every write below runs on another connection
    let mut reader = pool.acquire().await.unwrap();

    let alice = create_user(&pool, "Alice", Role::User).await;
    let (_, hash) = generate_session_token(SECRET);
    Session::create(&pool, &hash, &alice, Duration::hours(1)).await.unwrap();
    let material = create_material(&pool, "Book", MaterialType::Book, alice.id).await;
    Material::update(
        &pool,
        material.id,
        UpdateMaterial {
            title: "Renamed".to_string(),
            author: "Author".to_string(),
            description: String::new(),
            filename: None,
        },
    )
    .await
    .unwrap()
    .unwrap();
    Notification::create(
        &pool,
        CreateNotification {
            user_id: alice.id,
            title: "Hello".to_string(),
            message: "Hi".to_string(),
        },
    )
    .await
    .unwrap();

    let email: String = sqlx::query_scalar("SELECT email FROM users WHERE id = ?")
        .bind(alice.id)
        .fetch_one(&mut *reader)
        .await
        .unwrap();
    assert_eq!(email, "alice@x.com");

    let owner: i64 = sqlx::query_scalar("SELECT user_id FROM sessions WHERE token_hash = ?")
        .bind(&hash)
        .fetch_one(&mut *reader)
        .await
        .unwrap();
    assert_eq!(owner, alice.id);

    let title: String = sqlx::query_scalar("SELECT title FROM materials WHERE id = ?")
        .bind(material.id)
        .fetch_one(&mut *reader)
        .await
        .unwrap();
    assert_eq!(title, "Renamed");

    let notifications: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = ?")
            .bind(alice.id)
            .fetch_one(&mut *reader)
            .await
            .unwrap();
    assert_eq!(notifications, 1);

    // And the pool itself, whichever connection it hands out
    for _ in 0..10 {
        assert!(Session::resolve(&pool, &hash).await.unwrap().is_some());
        assert!(User::find_by_email(&pool, "alice@x.com").await.unwrap().is_some());
    }
}

#[tokio::test]
async fn test_bootstrap_admin_seeded_once() {
    let (pool, _dir) = setup().await;

    let seeded = ensure_bootstrap_admin(&pool, "Super Admin", "Admin@Local", "admin123")
        .await
        .unwrap()
        .expect("First run should seed");
    assert_eq!(seeded.role, Role::SuperAdmin);
    assert_eq!(seeded.email, "admin@local");
    assert!(verify_password("admin123", &seeded.password_hash).unwrap());

    let again = ensure_bootstrap_admin(&pool, "Super Admin", "admin@local", "different")
        .await
        .unwrap();
    assert!(again.is_none());
    assert_eq!(User::count(&pool).await.unwrap(), 1);
}
