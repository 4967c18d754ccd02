use crate::{
    api::{attendance, employee, records},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap();
        Governor::new(&cfg)
    }

    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let register_limiter = Arc::new(build_limiter(config.rate_register_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/registrar")
                    .wrap(register_limiter.clone())
                    .route(web::post().to(handlers::register_tenant)),
            )
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            ),
    );

    // Protected routes: the middleware verifies the token once and injects
    // the TenantContext every handler extracts.
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(protected_limiter)
            .service(
                web::scope("/funcionarios")
                    .service(
                        web::resource("")
                            .route(web::post().to(employee::create_employee))
                            .route(web::get().to(employee::list_employees)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(employee::get_employee))
                            .route(web::put().to(employee::update_employee))
                            .route(web::delete().to(employee::delete_employee)),
                    )
                    .service(
                        web::resource("/{id}/registros")
                            .route(web::get().to(records::employee_day_records)),
                    ),
            )
            .service(
                web::scope("/ponto")
                    .service(web::resource("").route(web::post().to(attendance::registrar_ponto))),
            )
            .service(
                web::scope("/registros")
                    .service(
                        web::resource("")
                            .route(web::get().to(records::list_records))
                            .route(web::post().to(records::insert_manual)),
                    )
                    .service(
                        web::resource("/{registro_id}")
                            .route(web::delete().to(records::delete_record)),
                    ),
            )
            .service(
                web::scope("/relatorio").service(
                    web::resource("/horas").route(web::get().to(records::worked_hours)),
                ),
            ),
    );
}
