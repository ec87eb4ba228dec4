// apps/hospital_app/src/web/view.rs

//! JSON views. A view is `{"view": name, "messages": [...], ...data}`; a
//! redirect is a 303 with `Location` and the same message list.

use actix_web::http::header;
use actix_web::HttpResponse;
use serde::Serialize;
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
  Info,
  Success,
  Warning,
  Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct Flash {
  pub level: Level,
  pub text: String,
}

impl Flash {
  pub fn info(text: impl Into<String>) -> Self {
    Self { level: Level::Info, text: text.into() }
  }

  pub fn success(text: impl Into<String>) -> Self {
    Self { level: Level::Success, text: text.into() }
  }

  pub fn warning(text: impl Into<String>) -> Self {
    Self { level: Level::Warning, text: text.into() }
  }

  pub fn error(text: impl Into<String>) -> Self {
    Self { level: Level::Error, text: text.into() }
  }
}

fn body(view: Option<&str>, messages: &[Flash], data: Value) -> Value {
  let mut out = match data {
    Value::Object(map) => map,
    Value::Null => Map::new(),
    other => {
      let mut m = Map::new();
      m.insert("data".to_string(), other);
      m
    }
  };
  if let Some(view) = view {
    out.insert("view".to_string(), json!(view));
  }
  out.insert("messages".to_string(), json!(messages));
  Value::Object(out)
}

pub fn render(view: &str, messages: Vec<Flash>, data: Value) -> HttpResponse {
  HttpResponse::Ok().json(body(Some(view), &messages, data))
}

pub fn redirect(location: &str, messages: Vec<Flash>) -> HttpResponse {
  HttpResponse::SeeOther()
    .insert_header((header::LOCATION, location.to_string()))
    .json(body(None, &messages, json!({ "location": location })))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn data_keys_are_merged_next_to_view() {
    let v = body(Some("test-cart"), &[Flash::info("hi")], json!({"total_cents": 5}));
    assert_eq!(v["view"], "test-cart");
    assert_eq!(v["total_cents"], 5);
    assert_eq!(v["messages"][0]["level"], "info");
    assert_eq!(v["messages"][0]["text"], "hi");
  }

  #[test]
  fn redirect_is_303_with_location() {
    let resp = redirect("/login", vec![]);
    assert_eq!(resp.status(), actix_web::http::StatusCode::SEE_OTHER);
    assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/login");
  }
}
