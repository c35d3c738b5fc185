use crate::{
    api::{attendance, badge, member, month},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::web;

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

    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(build_limiter(config.rate_read_per_min))
            .service(
                web::scope("/months")
                    // /months
                    .service(
                        web::resource("")
                            .route(web::post().to(month::create))
                            .route(web::get().to(month::list)),
                    )
                    // /months/{month}/members
                    .service(
                        web::resource("/{month}/members")
                            .route(web::post().to(member::create_member))
                            .route(web::get().to(member::list_members)),
                    )
                    // /months/{month}/members/{member_id}
                    .service(
                        web::resource("/{month}/members/{member_id}")
                            .route(web::get().to(member::get_member))
                            .route(web::put().to(member::update_member))
                            .route(web::delete().to(member::delete_member)),
                    )
                    // /months/{month}/members/{member_id}/badge
                    .service(
                        web::resource("/{month}/members/{member_id}/badge")
                            .route(web::get().to(badge::member_badge)),
                    )
                    // /months/{month}/members/{member_id}/attendance/{date}
                    .service(
                        web::resource("/{month}/members/{member_id}/attendance/{date}")
                            .route(web::get().to(attendance::member_status)),
                    )
                    // /months/{month}/attendance
                    .service(
                        web::resource("/{month}/attendance")
                            .wrap(build_limiter(config.rate_write_per_min))
                            .route(web::put().to(attendance::mark))
                            .route(web::post().to(attendance::bulk_mark)),
                    )
                    // /months/{month}/attendance/{date}
                    .service(
                        web::resource("/{month}/attendance/{date}")
                            .route(web::get().to(attendance::list_for_date)),
                    )
                    // /months/{month}/sundays
                    .service(
                        web::resource("/{month}/sundays")
                            .route(web::get().to(attendance::sundays_overview)),
                    )
                    // /months/{month}/badges/process
                    .service(
                        web::resource("/{month}/badges/process")
                            .wrap(build_limiter(config.rate_write_per_min))
                            .route(web::post().to(badge::process)),
                    )
                    // /months/{month}/badges/summary
                    .service(
                        web::resource("/{month}/badges/summary")
                            .route(web::get().to(badge::summary)),
                    ),
            ),
    );
}

// MONTH LIFECYCLE
//  ├─ POST /months            → provision (idempotent)
//  └─ GET  /months            → navigation list
//
// SUNDAY FLOW
//  ├─ PUT  /attendance        → one member, one date
//  ├─ POST /attendance        → whole class for one date
//  └─ GET  /sundays           → grid header + month-complete gate
//
// BADGES
//  └─ POST /badges/process    → only after the month is complete
