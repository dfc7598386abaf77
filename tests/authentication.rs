mod common;

use carlot::app;
use carlot::store::CarRegistry;
use carlot::{BasicAuth, Router, StaticCredentials};
use http::StatusCode;
use serde_json::json;

use common::{delete, get, json, post, put, with_basic};

const REALM: &str = "Access to the '/' path";

fn gated() -> (Router, CarRegistry) {
    let cars = CarRegistry::new();
    let gate = BasicAuth::new(REALM, StaticCredentials::new("user", "pass"));
    (app::crud_with_authentication(cars.clone(), gate), cars)
}

fn new_car() -> serde_json::Value {
    json!({"color": "GREEN", "productionYear": "2018-06-30", "nickName": "Frog"})
}

#[tokio::test]
async fn writes_without_credentials_are_challenged() {
    let (app, cars) = gated();

    let response = app.handle(post("/cars", &new_car())).await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.header("www-authenticate"),
        Some("Basic realm=\"Access to the '/' path\", charset=\"UTF-8\"")
    );
    assert!(response.body().is_empty());
    assert!(cars.is_empty());
}

#[tokio::test]
async fn wrong_credentials_leave_the_store_unchanged() {
    let (app, cars) = gated();
    let car = cars.create(serde_json::from_value(new_car()).unwrap());

    let update = with_basic(put(&format!("/cars/{}", car.id), &json!({"color": "RED", "productionYear": "2018-06-30"})), "user:wrong");
    assert_eq!(app.handle(update).await.status_code(), StatusCode::UNAUTHORIZED);

    let removal = with_basic(delete(&format!("/cars/{}", car.id)), "intruder:pass");
    assert_eq!(app.handle(removal).await.status_code(), StatusCode::UNAUTHORIZED);

    assert_eq!(cars.get(&car.id), Some(car));
}

#[tokio::test]
async fn authentication_runs_before_binding() {
    let (app, _) = gated();
    let response = app.handle(post("/cars", &json!({"color": "PURPLE"}))).await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn valid_credentials_behave_like_the_public_routes() {
    let (app, _) = gated();

    let created = app.handle(with_basic(post("/cars", &new_car()), "user:pass")).await;
    assert_eq!(created.status_code(), StatusCode::OK);
    let created = json(&created);
    let id = created["id"].as_str().unwrap();

    let fetched = app.handle(get(&format!("/cars/{id}"))).await;
    assert_eq!(json(&fetched), created);

    let missing = app.handle(with_basic(delete("/cars/missing"), "user:pass")).await;
    assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);

    let deleted = app.handle(with_basic(delete(&format!("/cars/{id}")), "user:pass")).await;
    assert_eq!(deleted.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn reads_stay_public() {
    let (app, _) = gated();
    assert_eq!(app.handle(get("/cars")).await.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn hello_greets_the_principal() {
    let (app, _) = gated();

    let anonymous = app.handle(get("/hello")).await;
    assert_eq!(anonymous.status_code(), StatusCode::UNAUTHORIZED);

    let greeted = app.handle(with_basic(get("/hello"), "user:pass")).await;
    assert_eq!(greeted.status_code(), StatusCode::OK);
    assert_eq!(greeted.body(), b"Hello, user");
}
