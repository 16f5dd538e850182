//! Cart session token transport.

use atelier_app::secrets::generate_session_token;
use salvo::{
    http::cookie::{Cookie, SameSite},
    prelude::*,
};

pub(crate) const SESSION_COOKIE: &str = "cart_session";

pub(crate) const SESSION_HEADER: &str = "x-cart-session";

/// The session token sent with the request: header first, then cookie.
pub(crate) fn session_token(req: &Request) -> Option<String> {
    req.header::<String>(SESSION_HEADER)
        .or_else(|| req.cookie(SESSION_COOKIE).map(|cookie| cookie.value().to_string()))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// The request's session token, or 404 when there is none: no token means no cart.
pub(crate) fn session_token_or_404(req: &Request) -> Result<String, StatusError> {
    session_token(req).ok_or_else(|| StatusError::not_found().brief("Cart not found"))
}

/// The request's session token, or a fresh one written back as a cookie.
pub(crate) fn session_token_or_issue(req: &Request, res: &mut Response) -> String {
    if let Some(token) = session_token(req) {
        return token;
    }

    let token = generate_session_token();

    set_session_cookie(res, &token);

    token
}

pub(crate) fn set_session_cookie(res: &mut Response, token: &str) {
    res.add_cookie(
        Cookie::build((SESSION_COOKIE, token.to_string()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .build(),
    );
}

#[cfg(test)]
mod tests {
    use salvo::test::{ResponseExt, TestClient};
    use testresult::TestResult;

    use crate::test_helpers::issued_session;

    use super::*;

    #[handler]
    async fn echo(req: &mut Request, res: &mut Response) {
        let token = session_token_or_issue(req, res);

        res.render(token);
    }

    fn make_service() -> Service {
        Service::new(Router::new().get(echo))
    }

    #[tokio::test]
    async fn header_token_wins_over_cookie() -> TestResult {
        let mut res = TestClient::get("http://example.com")
            .add_header(SESSION_HEADER, "from-header", true)
            .add_header("cookie", format!("{SESSION_COOKIE}=from-cookie"), true)
            .send(&make_service())
            .await;

        assert_eq!(res.take_string().await?, "from-header");

        Ok(())
    }

    #[tokio::test]
    async fn cookie_token_is_used() -> TestResult {
        let mut res = TestClient::get("http://example.com")
            .add_header("cookie", format!("{SESSION_COOKIE}=from-cookie"), true)
            .send(&make_service())
            .await;

        assert_eq!(res.take_string().await?, "from-cookie");
        assert!(
            issued_session(&res).is_none(),
            "existing sessions must not be re-issued"
        );

        Ok(())
    }

    #[tokio::test]
    async fn missing_token_is_issued_as_cookie() -> TestResult {
        let mut res = TestClient::get("http://example.com")
            .send(&make_service())
            .await;

        let issued = issued_session(&res).unwrap_or_default();

        assert_eq!(issued.len(), 64);
        assert_eq!(res.take_string().await?, issued);

        Ok(())
    }
}
