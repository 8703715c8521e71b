//! End-to-end repository flow against a real Postgres.
//!
//! Run with: DATABASE_URL=postgres://... cargo test -p library-server -- --ignored
//! The fixture drops and recreates the library tables.

use library_core::schema::{BOOKS, BORROWS, MEMBERS};
use library_core::{parse, DomainErrorKind, Record};
use library_server::db::{create_pool, PgProvider, RepoSettings, ResourceRepo};
use serde_json::{json, Value};

fn record(value: Value) -> Record {
    serde_json::from_value(value).unwrap()
}

#[tokio::test]
#[ignore = "requires database"]
async fn library_flow_against_postgres() {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
    let pool = create_pool(&url).await.expect("pool creation failed");
    sqlx::raw_sql(include_str!("fixtures/schema.sql"))
        .execute(&pool)
        .await
        .expect("fixture failed");

    let settings = RepoSettings::default();
    let provider = PgProvider::new(pool.clone()).with_statement_timeout(settings.statement_timeout);
    let books = ResourceRepo::new(&provider, &BOOKS, &settings);
    let members = ResourceRepo::new(&provider, &MEMBERS, &settings);
    let borrows = ResourceRepo::new(&provider, &BORROWS, &settings);

    // create: generated key, casing rules, defaults
    let book = books
        .create(record(json!({
            "title": "The Dispossessed",
            "author": "Ursula K. Le Guin",
            "publicationYear": 1974,
            "isbn": "978-0-06-051275-0"
        })))
        .await
        .unwrap();
    let book_id = book["bookId"].as_i64().unwrap();
    assert_eq!(book["title"], "the dispossessed");
    assert_eq!(book["isbn"], "978-0-06-051275-0");
    assert_eq!(book["available"], true);

    let member = members
        .create(record(json!({
            "firstName": "Shevek",
            "lastName": "Urras",
            "email": "shevek@anarres.example",
            "state": "or",
            "country": "us"
        })))
        .await
        .unwrap();
    let member_id = member["memberId"].as_i64().unwrap();
    assert_eq!(member["state"], "OR");
    assert_eq!(member["status"], "active");

    let borrow = borrows
        .create(record(json!({
            "bookId": book_id,
            "memberId": member_id,
            "dueDate": "2030-01-15"
        })))
        .await
        .unwrap();
    assert_eq!(borrow["status"], "ongoing");
    assert_eq!(
        borrow["borrowDate"],
        settings.today().format("%Y-%m-%d").to_string()
    );

    // FK violation leaves nothing behind
    let err = borrows
        .create(record(json!({
            "bookId": book_id,
            "memberId": member_id + 1000,
            "dueDate": "2030-01-15"
        })))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), DomainErrorKind::IntegrityViolation);
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM library_api_borrows")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count.0, 1);

    // filters and pagination
    let page = borrows
        .list(&parse([
            ("filter[dueDate][gt]", "01-JAN-30"),
            ("filter[status]", "ongoing"),
        ]))
        .await
        .unwrap();
    assert_eq!(page.total_results, 1);
    assert_eq!(page.items[0]["bookId"], json!(book_id));

    let page = books
        .list(&parse([("filter[title][fuzzy]", "dispossessed")]))
        .await
        .unwrap();
    assert_eq!(page.total_results, 1);

    // update: merge, re-read, missing row
    let updated = books
        .update(&book_id.to_string(), record(json!({"genre": "Science Fiction"})))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated["genre"], "science fiction");
    assert_eq!(updated["title"], "the dispossessed");

    assert!(books
        .update("999999", record(json!({"genre": "x"})))
        .await
        .unwrap()
        .is_none());
    assert!(books.get_by_id("999999").await.unwrap().is_none());
}
