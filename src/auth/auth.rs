use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, error::ErrorUnauthorized};
use futures::future::{Ready, ready};

/// Tenant scope of the current request. Built once by the auth middleware
/// from the verified token; handlers extract it and never touch the token
/// themselves.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub empresa_id: String,
    pub empresa_nome: String,
    pub usuario_id: String,
}

impl FromRequest for TenantContext {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        match req.extensions().get::<TenantContext>() {
            Some(ctx) => ready(Ok(ctx.clone())),
            None => ready(Err(ErrorUnauthorized("Missing tenant context"))),
        }
    }
}
