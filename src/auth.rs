use axum::http::HeaderMap;

/// 调用方身份。认证本身是外部协作方，这里只保留身份信号。
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub username: String,
}

pub fn local_user() -> AuthUser {
    AuthUser {
        id: "1".to_string(),
        username: "local_learner".to_string(),
    }
}

pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(axum::http::header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ").or_else(|| value.strip_prefix("bearer "))?;
    let trimmed = token.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// 静态令牌校验：与配置中的 `API_AUTH_TOKEN` 相符即视为已登录学习者。
pub fn verify_token(expected: Option<&str>, token: &str) -> Option<AuthUser> {
    let expected = expected?.trim();
    if expected.is_empty() || expected != token {
        return None;
    }
    Some(AuthUser {
        id: "learner-1".to_string(),
        username: "learner".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_token_requires_a_bearer_prefix() {
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::AUTHORIZATION, "Bearer abc123".parse().unwrap());
        assert_eq!(extract_token(&headers).as_deref(), Some("abc123"));

        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::AUTHORIZATION, "abc123".parse().unwrap());
        assert_eq!(extract_token(&headers), None);
    }

    #[test]
    fn verify_token_matches_the_configured_secret() {
        assert!(verify_token(Some("secret"), "secret").is_some());
        assert!(verify_token(Some("secret"), "wrong").is_none());
        assert!(verify_token(None, "anything").is_none());
        assert!(verify_token(Some(""), "").is_none());
    }
}
