//! HTTP-level tests driving the full router against an in-memory database.

use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use serde_json::{json, Value};
use tower::ServiceExt;

use stockadoodle_api::auth::{hash_password, Claims, JwtManager, MfaDelivery};
use stockadoodle_api::{build_router, ApiConfig, AppState};
use stockadoodle_core::{NewUser, Role, User};
use stockadoodle_db::{Database, DbConfig};

const PASSWORD: &str = "password123";

/// Keeps every delivered MFA code so tests can complete the second step.
#[derive(Default)]
struct CapturingDelivery {
    codes: Mutex<Vec<(String, String)>>,
}

impl CapturingDelivery {
    fn last_code(&self) -> String {
        self.codes.lock().unwrap().last().unwrap().1.clone()
    }

    fn count(&self) -> usize {
        self.codes.lock().unwrap().len()
    }
}

impl MfaDelivery for CapturingDelivery {
    fn deliver(&self, user: &User, code: &str) {
        self.codes
            .lock()
            .unwrap()
            .push((user.id.clone(), code.to_string()));
    }
}

struct TestApp {
    router: Router,
    db: Database,
    delivery: Arc<CapturingDelivery>,
    config: ApiConfig,
    password_hash: String,
}

impl TestApp {
    async fn new() -> Self {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let delivery = Arc::new(CapturingDelivery::default());
        let config = ApiConfig {
            jwt_secret: "test-secret".to_string(),
            mfa_max_attempts: 3,
            ..ApiConfig::default()
        };
        let state = AppState::new(db.clone(), config.clone(), delivery.clone());

        TestApp {
            router: build_router(state),
            db,
            delivery,
            config,
            password_hash: hash_password(PASSWORD).unwrap(),
        }
    }

    async fn user(&self, username: &str, role: Role) -> User {
        let input = NewUser {
            username: username.to_string(),
            password: PASSWORD.to_string(),
            full_name: format!("{} test", username),
            email: Some(format!("{}@example.com", username)),
            role,
            mfa_enabled: false,
        };
        self.db
            .users()
            .create(&input, &self.password_hash, None)
            .await
            .unwrap()
    }

    async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    /// Logs in a non-MFA account and returns its token.
    async fn login(&self, username: &str) -> String {
        let (status, body) = self
            .post(
                "/api/v1/login",
                None,
                json!({"username": username, "password": PASSWORD}),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(body["mfa_required"], false);
        body["access_token"].as_str().unwrap().to_string()
    }

    /// Logs in an admin through both factors.
    async fn login_admin(&self, username: &str) -> String {
        let (status, body) = self
            .post(
                "/api/v1/login",
                None,
                json!({"username": username, "password": PASSWORD}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["mfa_required"], true);
        let challenge_id = body["challenge_id"].as_str().unwrap().to_string();

        let (status, body) = self
            .post(
                "/api/v1/login/mfa",
                None,
                json!({"challenge_id": challenge_id, "code": self.delivery.last_code()}),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body["access_token"].as_str().unwrap().to_string()
    }

    async fn create_product(&self, token: &str, name: &str, category: &str, qty: i64) -> String {
        let (status, body) = self
            .post(
                "/api/v1/products",
                Some(token),
                json!({
                    "name": name,
                    "category": category,
                    "quantity_on_hand": qty,
                    "reorder_threshold": 5,
                    "price_cents": 250
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["id"].as_str().unwrap().to_string()
    }

    async fn stock_of(&self, token: &str, product_id: &str) -> i64 {
        let (status, body) = self
            .get(&format!("/api/v1/products/{}", product_id), token)
            .await;
        assert_eq!(status, StatusCode::OK);
        body["quantity_on_hand"].as_i64().unwrap()
    }
}

// =============================================================================
// Health & authentication
// =============================================================================

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new().await;
    let (status, body) = app.request(Method::GET, "/api/v1/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "serving");
    assert_eq!(body["database"], true);
}

#[tokio::test]
async fn test_protected_route_requires_token() {
    let app = TestApp::new().await;
    let (status, body) = app
        .request(Method::GET, "/api/v1/products", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "AUTH_ERROR");

    let (status, _) = app.get("/api/v1/products", "not.a.jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wrong_password_never_issues_token() {
    let app = TestApp::new().await;
    app.user("manny", Role::Manager).await;

    let (status, wrong_password) = app
        .post(
            "/api/v1/login",
            None,
            json!({"username": "manny", "password": "not-the-password"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password["code"], "AUTH_ERROR");
    assert!(wrong_password.get("access_token").is_none());

    let (status, unknown_user) = app
        .post(
            "/api/v1/login",
            None,
            json!({"username": "nobody", "password": PASSWORD}),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password["message"], unknown_user["message"]);
}

#[tokio::test]
async fn test_deactivated_user_cannot_log_in_or_use_token() {
    let app = TestApp::new().await;
    let manny = app.user("manny", Role::Manager).await;
    let token = app.login("manny").await;

    app.db.users().deactivate(&manny.id, None).await.unwrap();

    let (status, _) = app.get("/api/v1/products", &token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .post(
            "/api/v1/login",
            None,
            json!({"username": "manny", "password": PASSWORD}),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_login_requires_mfa() {
    let app = TestApp::new().await;
    let admin = app.user("boss", Role::Admin).await;

    let (status, body) = app
        .post(
            "/api/v1/login",
            None,
            json!({"username": "boss", "password": PASSWORD}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mfa_required"], true);
    assert_eq!(body["email"], "boss@example.com");
    assert!(body.get("access_token").is_none());
    assert_eq!(app.delivery.count(), 1);

    // A token the server signed itself, but without the MFA claim.
    let jwt = JwtManager::new(app.config.jwt_secret.clone(), 3600);
    let forged = jwt.generate_access_token(&admin, false).unwrap();
    let (status, _) = app.get("/api/v1/users", &forged).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let challenge_id = body["challenge_id"].as_str().unwrap();
    let (status, body) = app
        .post(
            "/api/v1/login/mfa",
            None,
            json!({"challenge_id": challenge_id, "code": app.delivery.last_code()}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["access_token"].as_str().unwrap();

    let claims = jwt.validate_access_token(token).unwrap();
    assert!(claims.mfa);
    let (status, _) = app.get("/api/v1/users", token).await;
    assert_eq!(status, StatusCode::OK);

    // Single use.
    let (status, _) = app
        .post(
            "/api/v1/login/mfa",
            None,
            json!({"challenge_id": challenge_id, "code": app.delivery.last_code()}),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_mfa_attempt_limit() {
    let app = TestApp::new().await;
    app.user("boss", Role::Admin).await;

    let (_, body) = app
        .post(
            "/api/v1/login",
            None,
            json!({"username": "boss", "password": PASSWORD}),
        )
        .await;
    let challenge_id = body["challenge_id"].as_str().unwrap().to_string();
    let code = app.delivery.last_code();
    let wrong = if code == "000000" { "111111" } else { "000000" };

    for _ in 0..app.config.mfa_max_attempts {
        let (status, _) = app
            .post(
                "/api/v1/login/mfa",
                None,
                json!({"challenge_id": challenge_id, "code": wrong}),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let (status, _) = app
        .post(
            "/api/v1/login/mfa",
            None,
            json!({"challenge_id": challenge_id, "code": code}),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_mfa_resend_is_rate_limited() {
    let app = TestApp::new().await;
    app.user("boss", Role::Admin).await;

    let (_, body) = app
        .post(
            "/api/v1/login",
            None,
            json!({"username": "boss", "password": PASSWORD}),
        )
        .await;
    let challenge_id = body["challenge_id"].as_str().unwrap();

    let (status, body) = app
        .post(
            "/api/v1/login/mfa/resend",
            None,
            json!({"challenge_id": challenge_id}),
        )
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["code"], "RATE_LIMITED");
    assert_eq!(app.delivery.count(), 1);
}

#[tokio::test]
async fn test_role_from_store_wins_over_token_claim() {
    let app = TestApp::new().await;
    let rita = app.user("rita", Role::Retailer).await;

    let jwt = JwtManager::new(app.config.jwt_secret.clone(), 3600);
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: rita.id.clone(),
        username: rita.username.clone(),
        role: Role::Manager,
        mfa: false,
        iat: now,
        exp: now + 600,
        jti: "forged-role".to_string(),
        token_type: "access".to_string(),
    };
    let token = jwt.sign(&claims).unwrap();

    let (status, body) = app
        .post(
            "/api/v1/products",
            Some(&token),
            json!({"name": "Gum", "category": "Snacks", "price_cents": 50}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
}

// =============================================================================
// Sales & stock
// =============================================================================

#[tokio::test]
async fn test_sale_decrements_stock_by_quantity() {
    let app = TestApp::new().await;
    app.user("manny", Role::Manager).await;
    app.user("rita", Role::Retailer).await;
    let manager = app.login("manny").await;
    let retailer = app.login("rita").await;

    let product_id = app.create_product(&manager, "Chips", "Snacks", 10).await;

    let (status, sale) = app
        .post(
            "/api/v1/sales",
            Some(&retailer),
            json!({"product_id": product_id, "quantity": 4}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", sale);
    assert_eq!(sale["quantity"], 4);
    assert_eq!(sale["unit_price_cents"], 250);
    assert_eq!(sale["total_cents"], 1000);

    assert_eq!(app.stock_of(&retailer, &product_id).await, 6);
}

#[tokio::test]
async fn test_oversell_rejected_and_stock_unchanged() {
    let app = TestApp::new().await;
    app.user("manny", Role::Manager).await;
    app.user("rita", Role::Retailer).await;
    let manager = app.login("manny").await;
    let retailer = app.login("rita").await;

    let product_id = app.create_product(&manager, "Chips", "Snacks", 3).await;

    let (status, body) = app
        .post(
            "/api/v1/sales",
            Some(&retailer),
            json!({"product_id": product_id, "quantity": 4}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INSUFFICIENT_STOCK");
    assert_eq!(app.stock_of(&retailer, &product_id).await, 3);

    let (_, sales) = app.get("/api/v1/sales", &manager).await;
    assert_eq!(sales.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_sale_quantity_bounds() {
    let app = TestApp::new().await;
    app.user("manny", Role::Manager).await;
    let manager = app.login("manny").await;
    let product_id = app.create_product(&manager, "Chips", "Snacks", 3).await;

    for quantity in [0, 1000] {
        let (status, body) = app
            .post(
                "/api/v1/sales",
                Some(&manager),
                json!({"product_id": product_id, "quantity": quantity}),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }
}

#[tokio::test]
async fn test_retailer_sales_visibility() {
    let app = TestApp::new().await;
    app.user("manny", Role::Manager).await;
    let ana = app.user("ana", Role::Retailer).await;
    app.user("ben", Role::Retailer).await;
    let manager = app.login("manny").await;
    let ana_token = app.login("ana").await;
    let ben_token = app.login("ben").await;

    let product_id = app.create_product(&manager, "Soda", "Drinks", 20).await;

    let (_, ana_sale) = app
        .post(
            "/api/v1/sales",
            Some(&ana_token),
            json!({"product_id": product_id, "quantity": 1}),
        )
        .await;
    app.post(
        "/api/v1/sales",
        Some(&ben_token),
        json!({"product_id": product_id, "quantity": 2}),
    )
    .await;

    // Retailers cannot credit someone else.
    let (status, _) = app
        .post(
            "/api/v1/sales",
            Some(&ben_token),
            json!({"product_id": product_id, "quantity": 1, "retailer_id": ana.id}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, bens) = app.get("/api/v1/sales", &ben_token).await;
    assert_eq!(bens.as_array().unwrap().len(), 1);

    let ana_sale_id = ana_sale["id"].as_str().unwrap();
    let (status, _) = app
        .get(&format!("/api/v1/sales/{}", ana_sale_id), &ben_token)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, all) = app.get("/api/v1/sales", &manager).await;
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (_, filtered) = app
        .get(&format!("/api/v1/sales?retailer_id={}", ana.id), &manager)
        .await;
    assert_eq!(filtered.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_stock_adjustment_never_goes_negative() {
    let app = TestApp::new().await;
    app.user("manny", Role::Manager).await;
    let manager = app.login("manny").await;
    let product_id = app.create_product(&manager, "Milk", "Dairy", 5).await;
    let uri = format!("/api/v1/products/{}/stock", product_id);

    let (status, body) = app
        .post(&uri, Some(&manager), json!({"delta": -6, "reason": "spoiled"}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INSUFFICIENT_STOCK");
    assert_eq!(app.stock_of(&manager, &product_id).await, 5);

    let (status, _) = app.post(&uri, Some(&manager), json!({"delta": 0})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post(&uri, Some(&manager), json!({"delta": -5, "reason": "expired"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["quantity_on_hand"], 0);

    let (_, body) = app.post(&uri, Some(&manager), json!({"delta": 12})).await;
    assert_eq!(body["quantity_on_hand"], 12);
}

#[tokio::test]
async fn test_stock_adjustment_extreme_deltas() {
    let app = TestApp::new().await;
    app.user("manny", Role::Manager).await;
    let manager = app.login("manny").await;
    let product_id = app.create_product(&manager, "Milk", "Dairy", 5).await;
    let uri = format!("/api/v1/products/{}/stock", product_id);

    for delta in [i64::MIN, i64::MAX, -1_000_000_001, 1_000_000_001] {
        let (status, body) = app.post(&uri, Some(&manager), json!({ "delta": delta })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "delta {}: {}", delta, body);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    // Within the delta bound but past the stock ceiling.
    let (status, _) = app
        .post(&uri, Some(&manager), json!({"delta": 1_000_000_000}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post(&uri, Some(&manager), json!({"delta": -1_000_000_000}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INSUFFICIENT_STOCK");

    assert_eq!(app.stock_of(&manager, &product_id).await, 5);
}

// =============================================================================
// Products & users
// =============================================================================

#[tokio::test]
async fn test_product_crud() {
    let app = TestApp::new().await;
    app.user("manny", Role::Manager).await;
    let manager = app.login("manny").await;

    let (status, body) = app
        .post(
            "/api/v1/products",
            Some(&manager),
            json!({"name": "", "category": "Snacks", "price_cents": 100}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let id = app.create_product(&manager, "Pretzels", "Snacks", 8).await;
    app.create_product(&manager, "Cola", "Drinks", 8).await;

    let (status, body) = app
        .request(
            Method::PUT,
            &format!("/api/v1/products/{}", id),
            Some(&manager),
            Some(json!({"price_cents": 300, "name": "Salted Pretzels"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["price_cents"], 300);
    assert_eq!(body["name"], "Salted Pretzels");

    let (_, snacks) = app.get("/api/v1/products?category=snacks", &manager).await;
    assert_eq!(snacks.as_array().unwrap().len(), 1);

    let (status, _) = app
        .request(
            Method::DELETE,
            &format!("/api/v1/products/{}", id),
            Some(&manager),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app.get(&format!("/api/v1/products/{}", id), &manager).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (_, all) = app.get("/api/v1/products", &manager).await;
    assert_eq!(all.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_product_magnitude_limits() {
    let app = TestApp::new().await;
    app.user("manny", Role::Manager).await;
    let manager = app.login("manny").await;

    let product = |qty: i64, threshold: i64, price: i64| {
        json!({
            "name": "Gold Bar",
            "category": "Valuables",
            "quantity_on_hand": qty,
            "reorder_threshold": threshold,
            "price_cents": price
        })
    };

    for body in [
        product(i64::MAX, 0, 100),
        product(1_000_000_001, 0, 100),
        product(1, i64::MAX, 100),
        product(1, 0, i64::MAX),
        product(1, 0, 1_000_000_001),
    ] {
        let (status, response) = app.post("/api/v1/products", Some(&manager), body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", response);
    }

    let (status, _) = app
        .post("/api/v1/products", Some(&manager), product(1_000_000_000, 0, 1_000_000_000))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let id = app.create_product(&manager, "Silver", "Valuables", 1).await;
    let (status, _) = app
        .request(
            Method::PUT,
            &format!("/api/v1/products/{}", id),
            Some(&manager),
            Some(json!({"price_cents": i64::MAX})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request(
            Method::PUT,
            &format!("/api/v1/products/{}", id),
            Some(&manager),
            Some(json!({"expiration_date": "+262142-12-31"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // The largest allowed stock still produces a category report.
    let (status, report) = app.get("/api/v1/reports/categories", &manager).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["total_stock"], 1_000_000_001i64);
}

#[tokio::test]
async fn test_category_catalog() {
    let app = TestApp::new().await;
    app.user("manny", Role::Manager).await;
    app.user("rita", Role::Retailer).await;
    let manager = app.login("manny").await;
    let retailer = app.login("rita").await;

    let (status, frozen) = app
        .post(
            "/api/v1/categories",
            Some(&manager),
            json!({"name": "Frozen", "description": "Below zero"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(frozen["description"], "Below zero");
    let frozen_id = frozen["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .post("/api/v1/categories", Some(&manager), json!({"name": "frozen"}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");

    let (status, _) = app
        .post("/api/v1/categories", Some(&manager), json!({"name": "  "}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Products join the existing spelling.
    let peas = app.create_product(&manager, "Peas", "FROZEN", 4).await;
    let (_, body) = app.get(&format!("/api/v1/products/{}", peas), &manager).await;
    assert_eq!(body["category"], "Frozen");

    let category_uri = format!("/api/v1/categories/{}", frozen_id);
    let (status, body) = app
        .request(Method::DELETE, &category_uri, Some(&manager), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");

    let (status, renamed) = app
        .request(
            Method::PUT,
            &category_uri,
            Some(&manager),
            Some(json!({"name": "Freezer", "description": ""})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["name"], "Freezer");
    assert_eq!(renamed["description"], Value::Null);

    let (_, body) = app.get(&format!("/api/v1/products/{}", peas), &manager).await;
    assert_eq!(body["category"], "Freezer");

    // Retailers can read the catalog but not change it.
    let (status, list) = app.get("/api/v1/categories", &retailer).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
    let (status, _) = app
        .post("/api/v1/categories", Some(&retailer), json!({"name": "Toys"}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app
        .request(Method::DELETE, &category_uri, Some(&retailer), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    app.request(
        Method::DELETE,
        &format!("/api/v1/products/{}", peas),
        Some(&manager),
        None,
    )
    .await;
    let (status, _) = app
        .request(Method::DELETE, &category_uri, Some(&manager), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.get(&category_uri, &manager).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, report) = app.get("/api/v1/reports/activity", &manager).await;
    let actions: Vec<&str> = report["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["action"].as_str().unwrap())
        .collect();
    assert!(actions.contains(&"category_created"));
    assert!(actions.contains(&"category_updated"));
    assert!(actions.contains(&"category_deleted"));
}

#[tokio::test]
async fn test_retailer_cannot_perform_admin_actions() {
    let app = TestApp::new().await;
    let manny = app.user("manny", Role::Manager).await;
    app.user("rita", Role::Retailer).await;
    let retailer = app.login("rita").await;

    let (status, body) = app
        .request(
            Method::DELETE,
            &format!("/api/v1/users/{}", manny.id),
            Some(&retailer),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
    assert!(app.db.users().get_by_id(&manny.id).await.unwrap().is_some());

    let (status, _) = app
        .post(
            "/api/v1/products",
            Some(&retailer),
            json!({"name": "Gum", "category": "Snacks", "price_cents": 50}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.get("/api/v1/reports/sales", &retailer).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Managers cannot manage users either.
    let manager = app.login("manny").await;
    let (status, _) = app.get("/api/v1/users", &manager).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_user_management() {
    let app = TestApp::new().await;
    let boss = app.user("boss", Role::Admin).await;
    let admin = app.login_admin("boss").await;

    let new_user = json!({
        "username": "newbie",
        "password": "longenough",
        "full_name": "New Bie",
        "role": "retailer"
    });
    let (status, created) = app.post("/api/v1/users", Some(&admin), new_user.clone()).await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    assert_eq!(created["role"], "retailer");
    assert!(created.get("password_hash").is_none());

    let (status, body) = app.post("/api/v1/users", Some(&admin), new_user).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");

    let (status, _) = app
        .post(
            "/api/v1/users",
            Some(&admin),
            json!({
                "username": "admin2",
                "password": "longenough",
                "full_name": "No Mail",
                "role": "admin"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let id = created["id"].as_str().unwrap();
    let (status, updated) = app
        .request(
            Method::PUT,
            &format!("/api/v1/users/{}", id),
            Some(&admin),
            Some(json!({"role": "manager", "full_name": "Promoted Bie"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["role"], "manager");

    let (status, body) = app
        .request(
            Method::DELETE,
            &format!("/api/v1/users/{}", boss.id),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) = app
        .request(
            Method::DELETE,
            &format!("/api/v1/users/{}", id),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get(&format!("/api/v1/users/{}", id), &admin).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, report) = app.get("/api/v1/reports/users", &admin).await;
    assert_eq!(report["total_users"], 2);
    assert_eq!(report["active_users"], 1);
}

#[tokio::test]
async fn test_me_and_password_change() {
    let app = TestApp::new().await;
    app.user("rita", Role::Retailer).await;
    let token = app.login("rita").await;

    let (status, me) = app.get("/api/v1/users/me", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "rita");

    let (status, _) = app
        .request(
            Method::PUT,
            "/api/v1/users/me/password",
            Some(&token),
            Some(json!({"current_password": "wrong-one", "new_password": "brand-new-pass"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .request(
            Method::PUT,
            "/api/v1/users/me/password",
            Some(&token),
            Some(json!({"current_password": PASSWORD, "new_password": "brand-new-pass"})),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .post(
            "/api/v1/login",
            None,
            json!({"username": "rita", "password": "brand-new-pass"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

// =============================================================================
// Reports
// =============================================================================

#[tokio::test]
async fn test_deleted_product_leaves_reports() {
    let app = TestApp::new().await;
    app.user("manny", Role::Manager).await;
    app.user("rita", Role::Retailer).await;
    let manager = app.login("manny").await;
    let retailer = app.login("rita").await;

    let chips = app.create_product(&manager, "Chips", "Snacks", 10).await;
    let milk = app.create_product(&manager, "Milk", "Dairy", 10).await;
    for product_id in [&chips, &milk] {
        let (status, _) = app
            .post(
                "/api/v1/sales",
                Some(&retailer),
                json!({"product_id": product_id, "quantity": 2}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, before) = app.get("/api/v1/reports/sales", &manager).await;
    assert_eq!(before["summary"]["transaction_count"], 2);
    assert_eq!(before["summary"]["total_income_cents"], 1000);

    app.request(
        Method::DELETE,
        &format!("/api/v1/products/{}", chips),
        Some(&manager),
        None,
    )
    .await;

    let (_, sales) = app.get("/api/v1/reports/sales", &manager).await;
    assert_eq!(sales["summary"]["transaction_count"], 1);
    assert_eq!(sales["by_product"][0]["product_name"], "Milk");

    let (_, transactions) = app.get("/api/v1/reports/transactions", &manager).await;
    assert_eq!(transactions["transactions"].as_array().unwrap().len(), 1);

    // Snacks stays in the catalog with nothing on hand.
    let (_, categories) = app.get("/api/v1/reports/categories", &manager).await;
    assert_eq!(categories["total_categories"], 2);
    assert_eq!(categories["categories"][0]["category"], "Dairy");
    assert_eq!(categories["categories"][0]["percentage_share"], 100.0);
    assert_eq!(categories["categories"][1]["category"], "Snacks");
    assert_eq!(categories["categories"][1]["product_count"], 0);
    assert_eq!(categories["categories"][1]["percentage_share"], 0.0);

    let (_, retailers) = app.get("/api/v1/reports/retailers", &manager).await;
    assert_eq!(retailers["retailers"][0]["total_sales_cents"], 500);
    assert_eq!(retailers["retailers"][0]["streak"], 1);
}

#[tokio::test]
async fn test_report_date_validation() {
    let app = TestApp::new().await;
    app.user("manny", Role::Manager).await;
    let manager = app.login("manny").await;

    let (status, body) = app
        .get(
            "/api/v1/reports/sales?start_date=2024-05-10&end_date=2024-05-01",
            &manager,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) = app
        .get("/api/v1/reports/sales?start_date=yesterday", &manager)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.get("/api/v1/reports/alerts?days_ahead=400", &manager).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_extreme_dates_are_rejected() {
    let app = TestApp::new().await;
    app.user("manny", Role::Manager).await;
    let manager = app.login("manny").await;

    for uri in [
        "/api/v1/sales?end_date=%2B262142-12-31",
        "/api/v1/sales?start_date=-262143-01-01",
        "/api/v1/reports/sales?end_date=-262143-01-01",
        "/api/v1/reports/transactions?end_date=%2B262142-12-31",
        "/api/v1/reports/activity?start_date=1899-12-31",
    ] {
        let (status, body) = app.get(uri, &manager).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}: {}", uri, body);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    let (status, _) = app
        .get("/api/v1/sales?start_date=2026-01-01&end_date=9999-12-31", &manager)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_alert_report() {
    let app = TestApp::new().await;
    app.user("manny", Role::Manager).await;
    let manager = app.login("manny").await;

    app.create_product(&manager, "Plenty", "Snacks", 50).await;
    app.create_product(&manager, "Few", "Snacks", 2).await;
    app.create_product(&manager, "None", "Snacks", 0).await;

    let (status, report) = app.get("/api/v1/reports/alerts", &manager).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["days_ahead"], 7);
    assert_eq!(report["total_alerts"], 2);
    assert_eq!(report["critical_alerts"], 1);
    assert_eq!(report["alerts"][0]["product_name"], "None");
    assert_eq!(report["alerts"][0]["statuses"][0], "OUT_OF_STOCK");
    assert_eq!(report["alerts"][1]["statuses"][0], "LOW_STOCK");
}

#[tokio::test]
async fn test_managerial_actions_are_logged() {
    let app = TestApp::new().await;
    app.user("manny", Role::Manager).await;
    app.user("rita", Role::Retailer).await;
    let manager = app.login("manny").await;
    let retailer = app.login("rita").await;

    let product_id = app.create_product(&manager, "Chips", "Snacks", 10).await;
    app.post(
        &format!("/api/v1/products/{}/stock", product_id),
        Some(&manager),
        json!({"delta": 5}),
    )
    .await;
    app.post(
        "/api/v1/sales",
        Some(&manager),
        json!({"product_id": product_id, "quantity": 1}),
    )
    .await;
    // Retailer sales are not managerial activity.
    app.post(
        "/api/v1/sales",
        Some(&retailer),
        json!({"product_id": product_id, "quantity": 1}),
    )
    .await;

    let (status, report) = app.get("/api/v1/reports/activity", &manager).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["total_actions"], 3);
    assert_eq!(report["unique_managers"], 1);

    let actions: Vec<&str> = report["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["action"].as_str().unwrap())
        .collect();
    assert!(actions.contains(&"product_created"));
    assert!(actions.contains(&"stock_adjusted"));
    assert!(actions.contains(&"sale_recorded"));
    assert!(report["entries"]
        .as_array()
        .unwrap()
        .iter()
        .all(|e| e["product_name"] == "Chips"));
}
