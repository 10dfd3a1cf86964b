use actix_cors::Cors;

/// Cross-origin policy for the browser frontend.
///
/// With no configured origins every origin is allowed, otherwise only the
/// listed ones. Methods and headers are not restricted either way.
pub fn cors(allowed_origins: &[String]) -> Cors {
    if allowed_origins.is_empty() {
        return Cors::permissive();
    }

    allowed_origins
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
        .allow_any_method()
        .allow_any_header()
        .max_age(3600)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::http::header::{ACCESS_CONTROL_ALLOW_ORIGIN, ORIGIN};
    use actix_web::{App, test, web};

    use crate::routes::routes;
    use crate::state::AppState;

    const FRONTEND: &str = "http://localhost:5173";

    fn closed_port() -> u16 {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    #[actix_web::test]
    async fn test_any_origin_allowed_by_default() {
        let app = test::init_service(
            App::new()
                .wrap(cors(&[]))
                .app_data(web::Data::new(AppState::default()))
                .configure(routes),
        )
        .await;

        let request = test::TestRequest::get()
            .uri(&format!("/check-port?ip=127.0.0.1&port={}&protocol=tcp", closed_port()))
            .insert_header((ORIGIN, FRONTEND))
            .to_request();
        let response = test::call_service(&app, request).await;

        assert_eq!(response.status(), StatusCode::OK);
        let allowed = response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap();
        assert!(allowed == FRONTEND || allowed == "*", "{allowed:?}");
    }

    #[actix_web::test]
    async fn test_configured_origin_allowed() {
        let app = test::init_service(
            App::new()
                .wrap(cors(&[FRONTEND.to_string()]))
                .app_data(web::Data::new(AppState::default()))
                .configure(routes),
        )
        .await;

        let request = test::TestRequest::get()
            .uri(&format!("/check-port?ip=127.0.0.1&port={}&protocol=tcp", closed_port()))
            .insert_header((ORIGIN, FRONTEND))
            .to_request();
        let response = test::call_service(&app, request).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), FRONTEND);
    }
}
