#![allow(dead_code)]

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use carlot::Response;
use serde_json::Value;

pub fn get(uri: &str) -> http::Request<Bytes> {
    request(http::Method::GET, uri, None)
}

pub fn delete(uri: &str) -> http::Request<Bytes> {
    request(http::Method::DELETE, uri, None)
}

pub fn post(uri: &str, body: &Value) -> http::Request<Bytes> {
    request(http::Method::POST, uri, Some(body))
}

pub fn put(uri: &str, body: &Value) -> http::Request<Bytes> {
    request(http::Method::PUT, uri, Some(body))
}

pub fn request(method: http::Method, uri: &str, body: Option<&Value>) -> http::Request<Bytes> {
    let body = body.map(|b| Bytes::from(b.to_string())).unwrap_or_default();
    http::Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .unwrap()
}

pub fn with_basic(mut req: http::Request<Bytes>, user_pass: &str) -> http::Request<Bytes> {
    let value = format!("Basic {}", STANDARD.encode(user_pass));
    req.headers_mut().insert(http::header::AUTHORIZATION, value.parse().unwrap());
    req
}

pub fn json(response: &Response) -> Value {
    serde_json::from_slice(response.body()).unwrap()
}
