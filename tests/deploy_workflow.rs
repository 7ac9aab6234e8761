use ghost_deploy::deploy::render_markdown;
use ghost_deploy::transport::{MockTransport, RequestBody};
use ghost_deploy::{
    ApiClient, ApiRequest, ApiResponse, ClientConfig, DeployMode, GhostError, ResourceKind,
};
use reqwest::Method;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

const SECRET: &str = "00112233445566778899aabbccddeeff00112233445566778899aabbccddeeff";
const IMAGE_URL: &str = "https://blog.example.com/content/images/2024/01/a-1.jpg";

fn client(transport: MockTransport) -> ApiClient<MockTransport> {
    let config = ClientConfig::new("https://blog.example.com", "v3", "client-1", SECRET);
    ApiClient::with_transport(config, transport).expect("client should build")
}

/// Lay out `<parent>/<name>/` with an optional config, markdown body and
/// image files.
fn deploy_dir(
    parent: &Path,
    name: &str,
    config: Option<Value>,
    markdown: Option<&str>,
    images: &[&str],
) -> PathBuf {
    let dir = parent.join(name);
    fs::create_dir(&dir).unwrap();
    if let Some(config) = config {
        fs::write(dir.join(format!("{name}.config")), config.to_string()).unwrap();
    }
    if let Some(markdown) = markdown {
        fs::write(dir.join(format!("{name}.md")), markdown).unwrap();
    }
    if !images.is_empty() {
        fs::create_dir(dir.join("images")).unwrap();
        for image in images {
            fs::write(dir.join("images").join(image), b"image-bytes").unwrap();
        }
    }
    dir
}

fn is_upload(req: &ApiRequest) -> bool {
    req.method == Method::POST && req.url.ends_with("/admin/images/upload/")
}

fn is_create(req: &ApiRequest, collection: &str) -> bool {
    req.method == Method::POST && req.url.ends_with(&format!("/admin/{collection}/"))
}

fn sent_record<'a>(req: &'a ApiRequest, collection: &str) -> Option<&'a Value> {
    match &req.body {
        RequestBody::Json(body) => body.get(collection)?.get(0),
        _ => None,
    }
}

fn read_config(dir: &Path, name: &str) -> Value {
    let raw = fs::read_to_string(dir.join(format!("{name}.config"))).unwrap();
    serde_json::from_str(&raw).unwrap()
}

#[test]
fn test_post_scenario_uploads_image_and_rewrites_references() {
    let tmp = tempdir().unwrap();
    let dir = deploy_dir(
        tmp.path(),
        "test-post",
        Some(json!({"title": "T", "feature_image": "images/a.jpg"})),
        Some("Hello ![x](images/a.jpg)"),
        &["a.jpg"],
    );

    let mut transport = MockTransport::new();
    transport
        .expect_send()
        .withf(|req: &ApiRequest| {
            is_upload(req)
                && matches!(&req.body, RequestBody::Multipart(upload)
                    if upload.file_name == "a.jpg"
                        && upload.mime_type == "image/jpeg"
                        && upload.reference == "images/test-post/a.jpg")
        })
        .times(1)
        .returning(|_| Ok(ApiResponse::new(201, json!({"images": [{"url": IMAGE_URL}]}))));
    transport
        .expect_send()
        .withf(|req: &ApiRequest| {
            let Some(post) = sent_record(req, "posts") else {
                return false;
            };
            let html = post["html"].as_str().unwrap_or_default();
            is_create(req, "posts")
                && req.query_value("source") == Some("html")
                && post["feature_image"] == IMAGE_URL
                && html.contains(IMAGE_URL)
                && !html.contains("images/a.jpg")
        })
        .times(1)
        .returning(|_| {
            Ok(ApiResponse::new(
                201,
                json!({"posts": [{"id": "5f1", "title": "T", "feature_image": IMAGE_URL}]}),
            ))
        });

    let api = client(transport);
    let response = api
        .deploy(ResourceKind::Posts, &dir, DeployMode::Create)
        .unwrap();
    assert_eq!(response["posts"][0]["id"], "5f1");

    let markdown = fs::read_to_string(dir.join("test-post.md")).unwrap();
    assert_eq!(markdown, format!("Hello ![x]({IMAGE_URL})"));

    let config = read_config(&dir, "test-post");
    assert_eq!(config["feature_image"], IMAGE_URL);
    assert_eq!(config["id"], "5f1");
    assert_eq!(config["title"], "T");
    assert!(config.get("html").is_none());
}

#[test]
fn test_sent_html_is_rendered_markdown() {
    let tmp = tempdir().unwrap();
    let body = "# Heading\n\nSome *emphasis* and a [link](https://example.com).\n";
    let dir = deploy_dir(tmp.path(), "plain", Some(json!({"title": "P"})), Some(body), &[]);
    let expected = render_markdown(body);

    let mut transport = MockTransport::new();
    transport
        .expect_send()
        .withf(move |req: &ApiRequest| {
            is_create(req, "pages")
                && sent_record(req, "pages").map(|p| p["html"] == expected.as_str())
                    == Some(true)
        })
        .times(1)
        .returning(|_| Ok(ApiResponse::new(201, json!({"pages": [{"id": "pg1"}]}))));

    let api = client(transport);
    api.deploy(ResourceKind::Pages, &dir, DeployMode::Create)
        .unwrap();

    // Nothing to rewrite, so the markdown is written back unchanged.
    assert_eq!(fs::read_to_string(dir.join("plain.md")).unwrap(), body);
    assert_eq!(read_config(&dir, "plain")["id"], "pg1");
}

#[test]
fn test_unreferenced_image_is_skipped() {
    let tmp = tempdir().unwrap();
    let dir = deploy_dir(
        tmp.path(),
        "lonely",
        Some(json!({"title": "No pictures"})),
        Some("Just text."),
        &["unused.png"],
    );

    let mut transport = MockTransport::new();
    transport
        .expect_send()
        .withf(|req: &ApiRequest| is_upload(req))
        .times(0);
    transport
        .expect_send()
        .withf(|req: &ApiRequest| is_create(req, "posts"))
        .times(1)
        .returning(|_| Ok(ApiResponse::new(201, json!({"posts": [{"id": "p9"}]}))));

    let api = client(transport);
    let response = api
        .deploy(ResourceKind::Posts, &dir, DeployMode::Create)
        .unwrap();
    assert_eq!(response["posts"][0]["id"], "p9");
}

#[test]
fn test_missing_markdown_fails_before_any_request() {
    let tmp = tempdir().unwrap();
    let dir = deploy_dir(
        tmp.path(),
        "broken",
        Some(json!({"title": "T", "feature_image": "images/a.jpg"})),
        None,
        &["a.jpg"],
    );

    let mut transport = MockTransport::new();
    transport.expect_send().times(0);

    let api = client(transport);
    let err = api
        .deploy(ResourceKind::Posts, &dir, DeployMode::Create)
        .unwrap_err();
    assert!(matches!(&err, GhostError::Deploy(msg) if msg.contains("broken.md")));
    assert!(err.is_local_setup());
}

#[test]
fn test_invalid_config_json_fails_before_any_request() {
    let tmp = tempdir().unwrap();
    let dir = deploy_dir(tmp.path(), "badjson", None, Some("text"), &[]);
    fs::write(dir.join("badjson.config"), "{\"title\": ").unwrap();

    let mut transport = MockTransport::new();
    transport.expect_send().times(0);

    let api = client(transport);
    let err = api
        .deploy(ResourceKind::Posts, &dir, DeployMode::Create)
        .unwrap_err();
    assert!(matches!(err, GhostError::InvalidJson { .. }));
}

#[test]
fn test_update_without_stored_id_fails_before_any_request() {
    let tmp = tempdir().unwrap();
    let dir = deploy_dir(
        tmp.path(),
        "fresh",
        Some(json!({"title": "T"})),
        Some("![x](images/a.jpg)"),
        &["a.jpg"],
    );

    let mut transport = MockTransport::new();
    transport.expect_send().times(0);

    let api = client(transport);
    let err = api
        .deploy(ResourceKind::Posts, &dir, DeployMode::Update)
        .unwrap_err();
    assert!(matches!(err, GhostError::Deploy(_)));
}

#[test]
fn test_update_deploy_fetches_then_puts_by_stored_id() {
    let tmp = tempdir().unwrap();
    let dir = deploy_dir(
        tmp.path(),
        "about",
        Some(json!({"id": "pg7", "title": "About", "custom_excerpt": "Please ignore this!"})),
        Some("Updated body"),
        &[],
    );

    let mut transport = MockTransport::new();
    transport
        .expect_send()
        .withf(|req: &ApiRequest| {
            req.method == Method::GET && req.url.ends_with("/admin/pages/pg7/")
        })
        .times(1)
        .returning(|_| {
            Ok(ApiResponse::new(
                200,
                json!({"pages": [{
                    "id": "pg7", "title": "About", "uuid": "u-1", "comment_id": "pg7",
                    "mobiledoc": "{}", "updated_at": "2024-01-01T00:00:00.000Z"
                }]}),
            ))
        });
    transport
        .expect_send()
        .withf(|req: &ApiRequest| {
            let Some(page) = sent_record(req, "pages") else {
                return false;
            };
            req.method == Method::PUT
                && req.url.ends_with("/admin/pages/pg7/")
                && page["custom_excerpt"] == "Please ignore this!"
                && page["updated_at"] == "2024-01-01T00:00:00.000Z"
                && page.get("uuid").is_none()
                && page.get("comment_id").is_none()
                && page.get("mobiledoc").is_none()
                && page["html"] == "<p>Updated body</p>\n"
        })
        .times(1)
        .returning(|_| {
            Ok(ApiResponse::new(
                200,
                json!({"pages": [{"id": "pg7", "custom_excerpt": "Please ignore this!"}]}),
            ))
        });

    let api = client(transport);
    let response = api
        .deploy(ResourceKind::Pages, &dir, DeployMode::Update)
        .unwrap();
    assert_eq!(response["pages"][0]["custom_excerpt"], "Please ignore this!");

    let config = read_config(&dir, "about");
    assert_eq!(config["id"], "pg7");
    assert!(config.get("html").is_none());
}

#[test]
fn test_rejected_create_leaves_files_untouched() {
    let tmp = tempdir().unwrap();
    let original = json!({"title": "T"});
    let dir = deploy_dir(tmp.path(), "rejected", Some(original.clone()), Some("Body"), &[]);

    let mut transport = MockTransport::new();
    transport.expect_send().times(1).returning(|_| {
        Ok(ApiResponse::new(
            422,
            json!({"errors": [{"message": "Validation error, cannot save post."}]}),
        ))
    });

    let api = client(transport);
    let err = api
        .deploy(ResourceKind::Posts, &dir, DeployMode::Create)
        .unwrap_err();
    assert!(err.is_remote());
    assert_eq!(read_config(&dir, "rejected"), original);
}

#[test]
fn test_created_record_without_id_leaves_files_untouched() {
    let tmp = tempdir().unwrap();
    let original = json!({"title": "T", "feature_image": "images/a.jpg"});
    let markdown = "Hi ![x](images/a.jpg)";
    let dir = deploy_dir(
        tmp.path(),
        "no-id",
        Some(original.clone()),
        Some(markdown),
        &["a.jpg"],
    );

    let mut transport = MockTransport::new();
    transport
        .expect_send()
        .withf(|req: &ApiRequest| is_upload(req))
        .times(1)
        .returning(|_| Ok(ApiResponse::new(201, json!({"images": [{"url": IMAGE_URL}]}))));
    transport
        .expect_send()
        .withf(|req: &ApiRequest| is_create(req, "posts"))
        .times(1)
        .returning(|_| Ok(ApiResponse::new(201, json!({"posts": [{"title": "T"}]}))));

    let api = client(transport);
    let err = api
        .deploy(ResourceKind::Posts, &dir, DeployMode::Create)
        .unwrap_err();
    assert!(matches!(err, GhostError::UnexpectedResponse(_)));
    assert_eq!(fs::read_to_string(dir.join("no-id.md")).unwrap(), markdown);
    assert_eq!(read_config(&dir, "no-id"), original);
}

#[test]
fn test_empty_image_dir_deploys_without_uploads() {
    let tmp = tempdir().unwrap();
    let dir = deploy_dir(
        tmp.path(),
        "empty-images",
        Some(json!({"title": "T"})),
        Some("Text only"),
        &[],
    );
    fs::create_dir(dir.join("images")).unwrap();

    let mut transport = MockTransport::new();
    transport
        .expect_send()
        .withf(|req: &ApiRequest| is_upload(req))
        .times(0);
    transport
        .expect_send()
        .withf(|req: &ApiRequest| is_create(req, "posts"))
        .times(1)
        .returning(|_| Ok(ApiResponse::new(201, json!({"posts": [{"id": "e1"}]}))));

    let api = client(transport);
    api.deploy(ResourceKind::Posts, &dir, DeployMode::Create)
        .unwrap();
    assert_eq!(read_config(&dir, "empty-images")["id"], "e1");
}

#[test]
fn test_feature_image_only_reference_is_uploaded() {
    let tmp = tempdir().unwrap();
    let markdown = "No inline pictures here.";
    let dir = deploy_dir(
        tmp.path(),
        "cover-only",
        Some(json!({"title": "T", "feature_image": "images/cover.png"})),
        Some(markdown),
        &["cover.png"],
    );

    let mut transport = MockTransport::new();
    transport
        .expect_send()
        .withf(|req: &ApiRequest| {
            is_upload(req)
                && matches!(&req.body, RequestBody::Multipart(upload)
                    if upload.reference == "images/cover-only/cover.png")
        })
        .times(1)
        .returning(|_| Ok(ApiResponse::new(201, json!({"images": [{"url": IMAGE_URL}]}))));
    transport
        .expect_send()
        .withf(|req: &ApiRequest| {
            is_create(req, "posts")
                && sent_record(req, "posts").map(|p| p["feature_image"] == IMAGE_URL)
                    == Some(true)
        })
        .times(1)
        .returning(|_| Ok(ApiResponse::new(201, json!({"posts": [{"id": "c1"}]}))));

    let api = client(transport);
    api.deploy(ResourceKind::Posts, &dir, DeployMode::Create)
        .unwrap();

    assert_eq!(fs::read_to_string(dir.join("cover-only.md")).unwrap(), markdown);
    let config = read_config(&dir, "cover-only");
    assert_eq!(config["feature_image"], IMAGE_URL);
    assert_eq!(config["id"], "c1");
}
