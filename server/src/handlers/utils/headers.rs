use hyper::header::HeaderMap;
use tracing::debug;

/// Extract cookie value by name
pub fn get_cookie(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get("cookie")
        .and_then(|v| v.to_str().ok())
        .and_then(|cookies| {
            cookies.split(';').find_map(|cookie| {
                let mut parts = cookie.trim().splitn(2, '=');
                let name = parts.next()?.trim();
                let value = parts.next()?.trim();
                if name == cookie_name {
                    debug!("Cookie found: {}", cookie_name);
                    Some(value.to_string())
                } else {
                    None
                }
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;

    fn headers_with_cookie(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("cookie", HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn finds_a_cookie_among_several() {
        let headers = headers_with_cookie("access=aaa.bbb.ccc; refresh=xxx.yyy.zzz");
        assert_eq!(get_cookie(&headers, "access").as_deref(), Some("aaa.bbb.ccc"));
        assert_eq!(get_cookie(&headers, "refresh").as_deref(), Some("xxx.yyy.zzz"));
    }

    #[test]
    fn missing_cookie_is_none() {
        let headers = headers_with_cookie("other=1");
        assert!(get_cookie(&headers, "access").is_none());
        assert!(get_cookie(&HeaderMap::new(), "access").is_none());
    }

    #[test]
    fn whitespace_around_pairs_is_tolerated() {
        let headers = headers_with_cookie("  access = aaa ;refresh=bbb");
        assert_eq!(get_cookie(&headers, "access").as_deref(), Some("aaa"));
        assert_eq!(get_cookie(&headers, "refresh").as_deref(), Some("bbb"));
    }

    #[test]
    fn value_may_contain_equals_signs() {
        // Base64url-ish token values keep their padding.
        let headers = headers_with_cookie("access=abc==");
        assert_eq!(get_cookie(&headers, "access").as_deref(), Some("abc=="));
    }
}
