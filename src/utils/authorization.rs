use axum::{
    extract::Request,
    http::{header, StatusCode},
    Json,
};

use crate::handlers::ErrorResponse;

/// Credential carried in the `Authorization` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    Bearer(String),
    InitData(String),
}

pub fn extract_credentials_from_request(req: &Request) -> Result<Credentials, (StatusCode, Json<ErrorResponse>)> {
    let credentials = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|auth_header| auth_header.to_str().ok())
        .and_then(parse_authorization);

    credentials.ok_or_else(|| {
        let json_error = ErrorResponse {
            status: "fail",
            message: "You are not logged in, please provide token".to_string(),
        };

        (StatusCode::UNAUTHORIZED, Json(json_error))
    })
}

fn parse_authorization(value: &str) -> Option<Credentials> {
    let (scheme, credential) = value.trim().split_once(' ')?;
    let credential = credential.trim();
    if credential.is_empty() {
        return None;
    }

    match scheme {
        "Bearer" => Some(Credentials::Bearer(credential.to_owned())),
        "initData" => Some(Credentials::InitData(credential.to_owned())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_supported_schemes() {
        assert_eq!(
            parse_authorization("Bearer abc.def"),
            Some(Credentials::Bearer("abc.def".to_string()))
        );
        assert_eq!(
            parse_authorization("initData query_id=1&hash=ff"),
            Some(Credentials::InitData("query_id=1&hash=ff".to_string()))
        );
        assert_eq!(parse_authorization("Basic dXNlcjpwYXNz"), None);
        assert_eq!(parse_authorization("Bearer "), None);
        assert_eq!(parse_authorization("Bearer"), None);
    }
}
