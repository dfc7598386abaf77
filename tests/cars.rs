mod common;

use carlot::app;
use carlot::store::CarRegistry;
use carlot::{Method, Router};
use http::StatusCode;
use serde_json::{Value, json};

use common::{delete, get, json, post, put, request};

fn crud() -> (Router, CarRegistry) {
    let cars = CarRegistry::new();
    (app::crud(cars.clone()), cars)
}

async fn create(app: &Router, body: Value) -> Value {
    let response = app.handle(post("/cars", &body)).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    json(&response)
}

#[tokio::test]
async fn create_read_delete_round_trip() {
    let (app, _) = crud();

    let created = create(&app, json!({"color": "RED", "productionYear": "2020-01-01"})).await;
    let id = created["id"].as_str().unwrap().to_owned();
    assert!(!id.is_empty());
    assert_eq!(
        created,
        json!({"id": id, "color": "RED", "productionYear": "2020-01-01", "nickName": null})
    );

    let fetched = app.handle(get(&format!("/cars/{id}"))).await;
    assert_eq!(fetched.status_code(), StatusCode::OK);
    assert_eq!(json(&fetched), created);

    let deleted = app.handle(delete(&format!("/cars/{id}"))).await;
    assert_eq!(deleted.status_code(), StatusCode::OK);
    assert!(deleted.body().is_empty());

    let gone = app.handle(get(&format!("/cars/{id}"))).await;
    assert_eq!(gone.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(json(&gone), json!({"msg": format!("Car with id {id} not found.")}));
}

#[tokio::test]
async fn update_of_a_missing_car_creates_nothing() {
    let (app, cars) = crud();
    let body = json!({"color": "BLUE", "productionYear": "2001-05-05"});

    let response = app.handle(put("/cars/missing", &body)).await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(json(&response), json!({"msg": "Car not found, cannot update."}));
    assert!(cars.is_empty());
}

#[tokio::test]
async fn update_replaces_the_whole_car() {
    let (app, _) = crud();
    let created = create(&app, json!({"color": "WHITE", "productionYear": "2010-02-03", "nickName": "Snowy"})).await;
    let id = created["id"].as_str().unwrap();

    let body = json!({"color": "BLACK", "productionYear": "2011-02-03"});
    let updated = app.handle(put(&format!("/cars/{id}"), &body)).await;
    assert_eq!(updated.status_code(), StatusCode::OK);
    assert_eq!(
        json(&updated),
        json!({"id": id, "color": "BLACK", "productionYear": "2011-02-03", "nickName": null})
    );
}

#[tokio::test]
async fn listing_filters_by_repeated_color() {
    let (app, _) = crud();
    let red = create(&app, json!({"color": "RED", "productionYear": "2020-01-01"})).await;
    let blue = create(&app, json!({"color": "BLUE", "productionYear": "2020-01-01"})).await;
    let green = create(&app, json!({"color": "GREEN", "productionYear": "2020-01-01"})).await;

    let all = app.handle(get("/cars")).await;
    assert_eq!(json(&all), json!([red, blue, green]));

    let some = app.handle(get("/cars?color=GREEN&color=RED")).await;
    assert_eq!(json(&some), json!([red, green]));

    let none = app.handle(get("/cars?color=BEIGE")).await;
    assert_eq!(json(&none), json!([]));
}

#[tokio::test]
async fn unknown_colors_are_malformed_input() {
    let (app, cars) = crud();

    let query = app.handle(get("/cars?color=PURPLE")).await;
    assert_eq!(query.status_code(), StatusCode::BAD_REQUEST);
    assert!(json(&query)["msg"].as_str().unwrap().starts_with("invalid query"));

    let body = app.handle(post("/cars", &json!({"color": "PURPLE", "productionYear": "2020-01-01"}))).await;
    assert_eq!(body.status_code(), StatusCode::BAD_REQUEST);
    assert!(cars.is_empty());
}

#[tokio::test]
async fn malformed_bodies_never_reach_the_store() {
    let (app, cars) = crud();

    let cases = [
        json!({"productionYear": "2020-01-01"}),
        json!({"color": "RED", "productionYear": "yesterday"}),
        json!({"id": "mine", "color": "RED", "productionYear": "2020-01-01"}),
    ];
    for body in &cases {
        let response = app.handle(post("/cars", body)).await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST, "{body}");
    }

    let empty = app.handle(request(http::Method::POST, "/cars", None)).await;
    assert_eq!(empty.status_code(), StatusCode::BAD_REQUEST);
    assert!(cars.is_empty());
}

#[tokio::test]
async fn variants_share_one_behaviour() {
    for app in [
        app::crud(CarRegistry::new()),
        app::crud_with_status_pages(CarRegistry::new()),
        app::crud_with_scoped_errors(CarRegistry::new()),
    ] {
        let created = create(&app, json!({"color": "YELLOW", "productionYear": "1990-09-09"})).await;
        let id = created["id"].as_str().unwrap();
        assert_eq!(app.handle(delete(&format!("/cars/{id}"))).await.status_code(), StatusCode::OK);
        assert_eq!(app.handle(delete(&format!("/cars/{id}"))).await.status_code(), StatusCode::NOT_FOUND);
    }
}

#[tokio::test]
async fn unknown_routes_are_bare_not_found() {
    let (app, _) = crud();
    let response = app.handle(get("/trucks")).await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert!(response.body().is_empty());

    let patch = app.handle(request(http::Method::PATCH, "/cars", None)).await;
    assert_eq!(patch.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn panicking_handlers_answer_with_the_generic_message() {
    async fn broken() -> String {
        panic!("store exploded at CarRegistry:42")
    }

    let app = Router::new().on(Method::Get, "/broken", broken);
    let response = app.handle(get("/broken")).await;
    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body(), carlot::middleware::errors::INTERNAL_ERROR_MESSAGE.as_bytes());
}

#[tokio::test]
async fn path_parameters_arrive_decoded() {
    let greetings = app::hello_world();
    for uri in ["/pure/John%20Doe", "/openapi/John%20Doe"] {
        let response = greetings.handle(get(uri)).await;
        assert_eq!(response.body(), b"Hello, John Doe!", "{uri}");
    }

    let (app, cars) = crud();
    let payload = serde_json::from_value(json!({"color": "RED", "productionYear": "2020-01-01"})).unwrap();
    let car = cars.upsert(carlot::model::NewCar::with_id(payload, "my car"));

    let fetched = app.handle(get("/cars/my%20car")).await;
    assert_eq!(fetched.status_code(), StatusCode::OK);
    assert_eq!(json(&fetched)["id"], json!(car.id));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_update_and_delete_never_resurrect_a_car() {
    let (app, cars) = crud();
    let app = std::sync::Arc::new(app);
    let body = json!({"color": "BEIGE", "productionYear": "2005-05-05"});

    for _ in 0..50 {
        let created = create(&app, json!({"color": "BLUE", "productionYear": "2005-05-05"})).await;
        let uri = format!("/cars/{}", created["id"].as_str().unwrap());

        let updates: Vec<_> = (0..4)
            .map(|_| {
                let (app, uri, body) = (app.clone(), uri.clone(), body.clone());
                tokio::spawn(async move { app.handle(put(&uri, &body)).await.status_code() })
            })
            .collect();
        let removal = {
            let (app, uri) = (app.clone(), uri.clone());
            tokio::spawn(async move { app.handle(delete(&uri)).await.status_code() })
        };

        assert_eq!(removal.await.unwrap(), StatusCode::OK);
        for update in updates {
            let status = update.await.unwrap();
            assert!(status == StatusCode::OK || status == StatusCode::NOT_FOUND, "{status}");
        }
        assert_eq!(app.handle(get(&uri)).await.status_code(), StatusCode::NOT_FOUND);
    }
    assert!(cars.is_empty());
}
