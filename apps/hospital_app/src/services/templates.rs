// apps/hospital_app/src/services/templates.rs

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use tera::{Context, Tera};

use crate::errors::Result as AppResult;

pub const RESET_MAIL_TEMPLATE: &str = "mail_template.html";

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag pattern compiles"));
static BLANK_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n+").expect("blank-run pattern compiles"));

/// What the reset mail template sees under `user`.
#[derive(Debug, Serialize)]
pub struct MailUser<'a> {
  pub username: &'a str,
  pub email: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ResetMailContext<'a> {
  pub email: &'a str,
  pub domain: &'a str,
  pub site_name: &'a str,
  pub uid: &'a str,
  pub user: MailUser<'a>,
  pub token: &'a str,
  pub protocol: &'a str,
}

pub struct Templates {
  tera: Tera,
}

impl Templates {
  pub fn load() -> AppResult<Self> {
    let mut tera = Tera::default();
    tera.add_raw_template(RESET_MAIL_TEMPLATE, include_str!("../../templates/mail_template.html"))?;
    Ok(Self { tera })
  }

  /// Returns `(html, plain_text)`.
  pub fn render_reset_mail(&self, ctx: &ResetMailContext<'_>) -> AppResult<(String, String)> {
    let context = Context::from_serialize(ctx)?;
    let html = self.tera.render(RESET_MAIL_TEMPLATE, &context)?;
    let text = strip_tags(&html);
    Ok((html, text))
  }
}

/// Plain-text rendition of an HTML body: tags dropped, common entities decoded,
/// runs of blank lines collapsed.
pub fn strip_tags(html: &str) -> String {
  let without_tags = TAG_RE.replace_all(html, "");
  let decoded = without_tags
    .replace("&lt;", "<")
    .replace("&gt;", ">")
    .replace("&quot;", "\"")
    .replace("&#x27;", "'")
    .replace("&#x2F;", "/")
    .replace("&amp;", "&");
  let lines: Vec<&str> = decoded.lines().map(str::trim).collect();
  BLANK_RUN_RE.replace_all(lines.join("\n").trim(), "\n\n").into_owned()
}
