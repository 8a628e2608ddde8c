//! Tests against a real PostgreSQL database.
//!
//! Skipped unless TEST_DATABASE_URL points at a database the tests may write
//! to. Migrations are applied on connect and every test works on accounts it
//! creates itself.

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use chrono::{Duration, Utc};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use payroll_portal_backend::config::Config;
use payroll_portal_backend::configure_routes;
use payroll_portal_backend::db::account::{self, Duplicate, NewCustomer};
use payroll_portal_backend::errors::AppError;
use payroll_portal_backend::models::user::User;
use payroll_portal_backend::utils::jwt::{self, SessionEvent};

const SECRET: &str = "db-integration-secret";

async fn test_pool() -> Option<PgPool> {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return None;
    };
    let pool = PgPoolOptions::new()
        .max_connections(4)
        .connect(&url)
        .await
        .expect("connect to TEST_DATABASE_URL");
    sqlx::migrate!("./migrations").run(&pool).await.expect("migrations");
    Some(pool)
}

fn test_config() -> Config {
    Config {
        database_url: String::new(),
        database_max_connections: 1,
        host: "127.0.0.1".to_string(),
        port: 0,
        environment: "test".to_string(),
        jwt_secret: SECRET.to_string(),
        public_base_url: "http://localhost:3000".to_string(),
        email_from: "noreply@example.com".to_string(),
        payroll_bucket: "payroll-test".to_string(),
        media_bucket: "media-test".to_string(),
        recaptcha_secret: None,
        realtime: None,
        ingest_batch_size: 50,
    }
}

async fn new_customer(pool: &PgPool) -> (User, String) {
    let tag = Uuid::new_v4().simple().to_string();
    let email = format!("{}@example.com", tag);
    let company = format!("Company {}", tag);
    let (user, token) = account::register_customer(
        pool,
        NewCustomer {
            name: "Customer",
            email: &email,
            company: &company,
            address: None,
            telephone: None,
        },
        Utc::now(),
    )
    .await
    .expect("register customer");
    (user, token.token)
}

async fn count(pool: &PgPool, sql: &str, id: Uuid) -> i64 {
    sqlx::query_scalar::<_, i64>(sql)
        .bind(id)
        .fetch_one(pool)
        .await
        .expect("count query")
}

async fn insert_message(pool: &PgPool, room_id: Uuid, sender_id: Uuid, receiver_id: Option<Uuid>) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO messages (id, room_id, sender_id, receiver_id, content) VALUES ($1, $2, $3, $4, 'hello')",
    )
    .bind(id)
    .bind(room_id)
    .bind(sender_id)
    .bind(receiver_id)
    .execute(pool)
    .await
    .expect("insert message");
    id
}

async fn is_read(pool: &PgPool, message_id: Uuid) -> bool {
    sqlx::query_scalar::<_, bool>("SELECT is_read FROM messages WHERE id = $1")
        .bind(message_id)
        .fetch_one(pool)
        .await
        .expect("message row")
}

#[actix_web::test]
async fn reset_token_redeems_once() {
    let Some(pool) = test_pool().await else { return };
    let (user, token) = new_customer(&pool).await;
    let now = Utc::now();

    assert!(account::redeem_reset_token(&pool, &token, "first-hash", now).await.unwrap());
    assert!(!account::redeem_reset_token(&pool, &token, "second-hash", now).await.unwrap());

    let stored = sqlx::query_scalar::<_, Option<String>>("SELECT password FROM users WHERE id = $1")
        .bind(user.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(stored.as_deref(), Some("first-hash"));
}

#[actix_web::test]
async fn concurrent_redemptions_set_one_password() {
    let Some(pool) = test_pool().await else { return };
    let (_, token) = new_customer(&pool).await;
    let now = Utc::now();

    let (a, b) = tokio::join!(
        account::redeem_reset_token(&pool, &token, "hash-a", now),
        account::redeem_reset_token(&pool, &token, "hash-b", now),
    );
    assert_eq!([a.unwrap(), b.unwrap()].iter().filter(|ok| **ok).count(), 1);
}

#[actix_web::test]
async fn expired_or_unknown_tokens_change_nothing() {
    let Some(pool) = test_pool().await else { return };
    let (user, token) = new_customer(&pool).await;

    let later = Utc::now() + Duration::hours(25);
    assert!(!account::redeem_reset_token(&pool, &token, "late-hash", later).await.unwrap());
    assert!(!account::redeem_reset_token(&pool, &"0".repeat(64), "hash", Utc::now()).await.unwrap());

    let stored = sqlx::query_scalar::<_, Option<String>>("SELECT password FROM users WHERE id = $1")
        .bind(user.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(stored, None);
}

#[actix_web::test]
async fn deleting_an_account_removes_everything_it_owns() {
    let Some(pool) = test_pool().await else { return };
    let (user, _) = new_customer(&pool).await;
    let admin_id = Uuid::new_v4();

    sqlx::query(
        "INSERT INTO employees (employee_code, company_id, year, name) VALUES ('E1', $1, 2024, 'Ann')",
    )
    .bind(user.id)
    .execute(&pool)
    .await
    .unwrap();
    for sql in [
        "INSERT INTO incomes (employee_code, company_id, year, month, salary) VALUES ('E1', $1, 2024, 1, 1000)",
        "INSERT INTO expenses (employee_code, company_id, year, month, loan) VALUES ('E1', $1, 2024, 1, 50)",
        "INSERT INTO taxes (employee_code, company_id, year, month, employee_tax) VALUES ('E1', $1, 2024, 1, 20)",
    ] {
        sqlx::query(sql).bind(user.id).execute(&pool).await.unwrap();
    }
    sqlx::query("INSERT INTO reports (id, user_id, category, description) VALUES ($1, $2, 'bug', 'broken')")
        .bind(Uuid::new_v4())
        .bind(user.id)
        .execute(&pool)
        .await
        .unwrap();
    let room_id = Uuid::new_v4();
    sqlx::query("INSERT INTO rooms (id, customer_id) VALUES ($1, $2)")
        .bind(room_id)
        .bind(user.id)
        .execute(&pool)
        .await
        .unwrap();
    insert_message(&pool, room_id, user.id, None).await;
    insert_message(&pool, room_id, admin_id, Some(user.id)).await;

    assert!(account::delete_account(&pool, user.id).await.unwrap());

    for sql in [
        "SELECT COUNT(*) FROM users WHERE id = $1",
        "SELECT COUNT(*) FROM password_reset_tokens WHERE user_id = $1",
        "SELECT COUNT(*) FROM employees WHERE company_id = $1",
        "SELECT COUNT(*) FROM incomes WHERE company_id = $1",
        "SELECT COUNT(*) FROM expenses WHERE company_id = $1",
        "SELECT COUNT(*) FROM taxes WHERE company_id = $1",
        "SELECT COUNT(*) FROM reports WHERE user_id = $1",
        "SELECT COUNT(*) FROM rooms WHERE customer_id = $1",
        "SELECT COUNT(*) FROM messages WHERE sender_id = $1 OR receiver_id = $1",
    ] {
        assert_eq!(count(&pool, sql, user.id).await, 0, "{}", sql);
    }
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM messages WHERE room_id = $1", room_id).await, 0);

    assert!(!account::delete_account(&pool, user.id).await.unwrap());
}

#[actix_web::test]
async fn racing_registration_reports_the_duplicate_column() {
    let Some(pool) = test_pool().await else { return };
    let (user, _) = new_customer(&pool).await;

    let same_email = account::register_customer(
        &pool,
        NewCustomer {
            name: "Other",
            email: &user.email.to_uppercase(),
            company: &format!("Other {}", Uuid::new_v4()),
            address: None,
            telephone: None,
        },
        Utc::now(),
    )
    .await
    .unwrap_err();
    assert_eq!(Duplicate::from_error(&same_email), Some(Duplicate::Email));

    let same_company = account::register_customer(
        &pool,
        NewCustomer {
            name: "Other",
            email: &format!("{}@example.com", Uuid::new_v4().simple()),
            company: &user.company.to_lowercase(),
            address: None,
            telephone: None,
        },
        Utc::now(),
    )
    .await
    .unwrap_err();
    match account::write_error(same_company) {
        AppError::BadRequest(msg) => assert_eq!(msg, "Company already exists"),
        other => panic!("unexpected {:?}", other),
    }
}

#[actix_web::test]
async fn mark_read_only_touches_messages_addressed_to_the_caller() {
    let Some(pool) = test_pool().await else { return };
    let (customer, _) = new_customer(&pool).await;
    let mut admin = customer.clone();
    admin.id = Uuid::new_v4();
    admin.role = "admin".to_string();

    let room_id = Uuid::new_v4();
    sqlx::query("INSERT INTO rooms (id, customer_id) VALUES ($1, $2)")
        .bind(room_id)
        .bind(customer.id)
        .execute(&pool)
        .await
        .unwrap();
    let question = insert_message(&pool, room_id, customer.id, None).await;
    let reply = insert_message(&pool, room_id, admin.id, Some(customer.id)).await;

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(test_config()))
            .configure(configure_routes),
    )
    .await;
    let mark_as = |user: &User| {
        let claims = jwt::derive_session(None, SessionEvent::InitialLogin(user), Utc::now());
        let token = jwt::generate_token(&claims, SECRET).unwrap();
        test::TestRequest::patch()
            .uri(&format!("/api/chat/{}/read", room_id))
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_request()
    };

    let resp = test::call_service(&app, mark_as(&admin)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"], 1);
    assert!(is_read(&pool, question).await);
    assert!(!is_read(&pool, reply).await);

    let resp = test::call_service(&app, mark_as(&customer)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(is_read(&pool, reply).await);

    account::delete_account(&pool, customer.id).await.unwrap();
}
