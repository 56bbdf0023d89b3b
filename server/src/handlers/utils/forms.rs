use std::collections::HashMap;

use anyhow::{Context, Result};
use http_body_util::BodyExt;
use hyper::Request;

/// Collect a request body and parse it as `application/x-www-form-urlencoded`
/// key/value pairs. Repeated keys keep the last value.
pub async fn parse_form_body(
    req: Request<hyper::body::Incoming>,
) -> Result<HashMap<String, String>> {
    let body = req
        .collect()
        .await
        .context("Failed to read request body")?
        .to_bytes();

    Ok(form_urlencoded::parse(body.as_ref())
        .into_owned()
        .collect::<HashMap<String, String>>())
}

/// Fetch a trimmed, non-empty form field.
pub fn form_field<'a>(params: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    params
        .get(name)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> HashMap<String, String> {
        form_urlencoded::parse(body.as_bytes())
            .into_owned()
            .collect()
    }

    #[test]
    fn fields_decode_with_url_escapes() {
        let params = parse("username=alice&password=p%40ss%20word");
        assert_eq!(form_field(&params, "username"), Some("alice"));
        assert_eq!(params["password"], "p@ss word");
    }

    #[test]
    fn empty_and_missing_fields_are_equivalent() {
        let params = parse("username=&other=1");
        assert_eq!(form_field(&params, "username"), None);
        assert_eq!(form_field(&params, "password"), None);
    }

    #[test]
    fn whitespace_only_fields_are_rejected() {
        let params = parse("username=%20%20");
        assert_eq!(form_field(&params, "username"), None);
    }
}
