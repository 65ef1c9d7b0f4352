use http::Method;
use serde_json::json;
use strata_dispatch::{DispatchError, RequestContext, RouteResponse, RouteTable};

/// Routes the gateway answers in-process; everything else falls back to
/// the upstream transport.
pub fn builtin_routes() -> RouteTable {
    RouteTable::new()
        .route(Method::GET, "/health", |_req: RequestContext| async move {
            Ok::<_, DispatchError>(RouteResponse::ok(json!({ "status": "ok" })))
        })
        .route(Method::GET, "/serverInfo", |req: RequestContext| async move {
            Ok::<_, DispatchError>(RouteResponse::ok(json!({
                "applicationId": req.info.application_id,
                "serverURL": req.config.server_url,
                "auth": req.auth.kind(),
                "user": req.auth.user_id(),
            })))
        })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use strata_common::AuthContext;
    use strata_db::MemoryDatabase;
    use strata_dispatch::{AppConfig, RequestInfo, RequestRouter};

    use super::*;

    fn request(auth: AuthContext) -> RequestContext {
        let config =
            AppConfig::new("app", "http://localhost:1337/parse", Arc::new(MemoryDatabase::new()))
                .unwrap();
        RequestContext {
            body: json!({}),
            config: Arc::new(config),
            auth,
            info: RequestInfo {
                application_id: "app".to_string(),
                session_token: None,
                context: Default::default(),
            },
            query: None,
            transaction: None,
        }
    }

    #[tokio::test]
    async fn test_server_info_reports_caller() {
        let routes = builtin_routes();
        let resp = routes
            .try_route(&Method::GET, "/serverInfo", request(AuthContext::master("cloud")))
            .await
            .unwrap();
        assert_eq!(
            resp.response,
            json!({
                "applicationId": "app",
                "serverURL": "http://localhost:1337/parse",
                "auth": "master_key",
                "user": null,
            })
        );
    }

    #[tokio::test]
    async fn test_unknown_path_is_unroutable() {
        let routes = builtin_routes();
        let resp = routes
            .try_route(&Method::GET, "/health", request(AuthContext::anonymous("cloud")))
            .await
            .unwrap();
        assert_eq!(resp.response, json!({"status": "ok"}));

        let err = routes
            .try_route(&Method::POST, "/health", request(AuthContext::anonymous("cloud")))
            .await
            .unwrap_err();
        assert!(err.is_unroutable(&Method::POST, "/health"));
    }
}
