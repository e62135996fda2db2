//! HTTP API tests: auth gating, the JSON error contract, and the upload →
//! view → summarize → delete flow, against a real server on a loopback port.

use serde_json::{json, Value};
use tempfile::TempDir;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use lectern::config::Config;
use lectern::server::run_server;
use lectern::{db, migrate, users};

fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn test_config(tmp: &TempDir, port: u16) -> Config {
    let root = tmp.path();
    let config_content = format!(
        r#"
[db]
path = "{root}/lectern.sqlite"

[chunking]
chunk_size = 200
chunk_overlap = 40

[server]
bind = "127.0.0.1:{port}"

[upload]
dir = "{root}/temp"
"#,
        root = root.display()
    );
    toml::from_str(&config_content).unwrap()
}

async fn start_server(cfg: &Config, port: u16) {
    migrate::run_migrations(cfg).await.unwrap();

    let cfg_clone = cfg.clone();
    tokio::spawn(async move {
        run_server(&cfg_clone).await.ok();
    });

    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/health", port);
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
    }
    panic!("Server did not become ready within 5 seconds");
}

async fn login(client: &reqwest::Client, port: u16, username: &str, password: &str) -> String {
    let resp = client
        .post(format!("http://127.0.0.1:{port}/auth/login"))
        .json(&json!({"username": username, "password": password}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200, "login failed for {username}");
    let body: Value = resp.json().await.unwrap();
    body["token"].as_str().unwrap().to_string()
}

/// Build a minimal single-page PDF containing `lines` of text.
fn make_pdf(lines: &[String]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 12.into()]),
        Operation::new("Td", vec![50.into(), 750.into()]),
    ];
    for line in lines {
        operations.push(Operation::new("Tj", vec![Object::string_literal(line.as_str())]));
        operations.push(Operation::new("Td", vec![0.into(), (-14).into()]));
    }
    operations.push(Operation::new("ET", vec![]));

    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

fn sample_pdf_base64() -> String {
    use base64::Engine;
    let lines: Vec<String> = (1..=40)
        .map(|i| format!("Paragraph {i}: processes are scheduled by the kernel using queues."))
        .collect();
    base64::engine::general_purpose::STANDARD.encode(make_pdf(&lines))
}

fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or("<missing>")
}

#[tokio::test]
async fn test_auth_gating_and_error_contract() {
    let tmp = TempDir::new().unwrap();
    let port = find_free_port();
    let cfg = test_config(&tmp, port);
    start_server(&cfg, port).await;

    // A student account alongside the seeded admin
    let pool = db::connect(&cfg.db).await.unwrap();
    users::add_user(&pool, "amira", "s3cret", "student").await.unwrap();
    pool.close().await;

    let client = reqwest::Client::new();
    let base = format!("http://127.0.0.1:{port}");

    // No token: 401 with the error body shape
    let resp = client.get(format!("{base}/subjects")).send().await.unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(error_code(&body), "unauthorized");
    assert!(body["error"]["message"].is_string());

    // Garbage token: also 401
    let resp = client
        .get(format!("{base}/subjects"))
        .bearer_auth("not-a-token")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    // Wrong password: 401, no role leak
    let resp = client
        .post(format!("{base}/auth/login"))
        .json(&json!({"username": "amira", "password": "wrong"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let student = login(&client, port, "amira", "s3cret").await;
    let admin = login(&client, port, "admin", "admin").await;

    // Student may read subjects
    let resp = client
        .get(format!("{base}/subjects"))
        .bearer_auth(&student)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // ...but not create them
    let resp = client
        .post(format!("{base}/subjects"))
        .bearer_auth(&student)
        .json(&json!({"name": "Databases"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(error_code(&body), "forbidden");

    // Admin creates; duplicate is a 400 bad_request
    let resp = client
        .post(format!("{base}/subjects"))
        .bearer_auth(&admin)
        .json(&json!({"name": "Databases"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = client
        .post(format!("{base}/subjects"))
        .bearer_auth(&admin)
        .json(&json!({"name": "Databases"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(error_code(&body), "bad_request");

    let resp = client
        .get(format!("{base}/subjects"))
        .bearer_auth(&student)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let names: Vec<&str> = body["subjects"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Databases"]);
}

#[tokio::test]
async fn test_upload_view_summarize_delete_flow() {
    let tmp = TempDir::new().unwrap();
    let port = find_free_port();
    let cfg = test_config(&tmp, port);
    start_server(&cfg, port).await;

    let pool = db::connect(&cfg.db).await.unwrap();
    users::add_user(&pool, "amira", "s3cret", "student").await.unwrap();
    pool.close().await;

    let client = reqwest::Client::new();
    let base = format!("http://127.0.0.1:{port}");
    let student = login(&client, port, "amira", "s3cret").await;
    let admin = login(&client, port, "admin", "admin").await;

    client
        .post(format!("{base}/subjects"))
        .bearer_auth(&admin)
        .json(&json!({"name": "Operating Systems"}))
        .send()
        .await
        .unwrap();

    // Students may not upload
    let upload_body = json!({
        "title": "Scheduling",
        "subject": "Operating Systems",
        "filename": "os-week3.pdf",
        "data_base64": sample_pdf_base64(),
    });
    let resp = client
        .post(format!("{base}/lectures"))
        .bearer_auth(&student)
        .json(&upload_body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    // Admin upload ingests and keeps the original document
    let resp = client
        .post(format!("{base}/lectures"))
        .bearer_auth(&admin)
        .json(&upload_body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let lecture_id = body["lecture_id"].as_str().unwrap().to_string();
    assert!(lecture_id.starts_with("scheduling-"));
    assert!(body["chunk_count"].as_i64().unwrap() > 1);

    // The stored document is viewable by a student
    let resp = client
        .get(format!("{base}/lectures/{lecture_id}/file"))
        .bearer_auth(&student)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers()["content-type"].to_str().unwrap(),
        "application/pdf"
    );
    assert!(!resp.bytes().await.unwrap().is_empty());

    // ...but not without a token
    let resp = client
        .get(format!("{base}/lectures/{lecture_id}/file"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = client
        .get(format!("{base}/lectures/{lecture_id}/chunks/count"))
        .bearer_auth(&student)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert!(body["chunk_count"].as_i64().unwrap() > 1);

    // Summarizer is disabled in the test config
    let resp = client
        .post(format!("{base}/lectures/{lecture_id}/summary"))
        .bearer_auth(&student)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(error_code(&body), "summarizer_disabled");

    // Students may not delete; admins may
    let resp = client
        .delete(format!("{base}/lectures/{lecture_id}"))
        .bearer_auth(&student)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    let resp = client
        .delete(format!("{base}/lectures/{lecture_id}"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // Gone from both the database and the upload directory
    let resp = client
        .get(format!("{base}/lectures/{lecture_id}/chunks/count"))
        .bearer_auth(&student)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(error_code(&body), "not_found");

    let resp = client
        .get(format!("{base}/lectures/{lecture_id}/file"))
        .bearer_auth(&student)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}
