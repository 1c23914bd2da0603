//! Native host: runs the router inside actix-web against a [`MemoryStore`].

use actix_web::{web, HttpRequest, HttpResponse};
use crate::core::db::MemoryStore;
use crate::routes::dispatch;

mod adapter {
    use actix_web::HttpRequest;
    use spin_sdk::http::{Method, Request, Response};

    pub fn actix_to_spin_request(req: &HttpRequest, body: actix_web::web::Bytes) -> Request {
        let method = match req.method().as_str() {
            "GET" => Method::Get,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            "HEAD" => Method::Head,
            "OPTIONS" => Method::Options,
            "PATCH" => Method::Patch,
            other => Method::Other(other.to_string()),
        };

        let uri = req.uri().to_string();

        let mut builder = Request::builder();
        builder.method(method).uri(uri.as_str());

        // Copy headers
        for (name, value) in req.headers() {
            if let Ok(val_str) = value.to_str() {
                builder.header(name.as_str(), val_str);
            }
        }

        builder.body(body.to_vec()).build()
    }

    pub fn spin_to_actix_response(spin_resp: Response) -> actix_web::HttpResponse {
        let status = actix_web::http::StatusCode::from_u16(*spin_resp.status())
            .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR);

        let mut response = actix_web::HttpResponse::build(status);
        let content_type = spin_resp
            .header("content-type")
            .or_else(|| spin_resp.header("Content-Type"))
            .and_then(|v| v.as_str());
        if let Some(ct) = content_type {
            response.content_type(ct.to_string());
        }

        response.body(spin_resp.body().to_vec())
    }
}

/// Sends every request through [`dispatch`]; register with `App::configure`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.default_service(web::route().to(handle_all));
}

async fn handle_all(store: web::Data<MemoryStore>, req: HttpRequest, body: web::Bytes) -> HttpResponse {
    let spin_req = adapter::actix_to_spin_request(&req, body);
    adapter::spin_to_actix_response(dispatch(store.get_ref(), spin_req))
}
