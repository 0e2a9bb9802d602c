use crate::{
    api::attendance,
    attendance::store::AttendanceStore,
    auth::middleware::auth_middleware,
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

// Helper to build per-route limiter
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let per_ms = (60_000 / u64::from(requests_per_min.max(1))).max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min.max(1))
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .expect("period and burst size are non-zero");
    Governor::new(&cfg)
}

pub fn configure<S: AttendanceStore>(cfg: &mut web::ServiceConfig, config: &Config) {
    let checkin_limiter = Arc::new(build_limiter(config.rate_checkin_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            // authentication
            .wrap(protected_limiter) // rate limiting
            .service(
                web::scope("/attendance")
                    // /attendance/token
                    .service(
                        web::resource("/token")
                            .route(web::post().to(attendance::issue_token::<S>)),
                    )
                    // /attendance/check-in
                    .service(
                        web::resource("/check-in")
                            .wrap(checkin_limiter.clone())
                            .route(web::post().to(attendance::check_in::<S>)),
                    )
                    // /attendance/qr-checkin?token=..&date=..
                    .service(
                        web::resource("/qr-checkin")
                            .wrap(checkin_limiter)
                            .route(web::get().to(attendance::qr_check_in::<S>)),
                    )
                    // /attendance/check-out
                    .service(
                        web::resource("/check-out")
                            .route(web::put().to(attendance::check_out::<S>)),
                    )
                    .service(
                        web::resource("/today").route(web::get().to(attendance::today::<S>)),
                    )
                    .service(
                        web::resource("/mark")
                            .route(web::put().to(attendance::mark_attendance::<S>)),
                    )
                    .service(
                        web::resource("/day").route(web::get().to(attendance::day_sheet::<S>)),
                    )
                    .service(
                        web::resource("/summary").route(web::get().to(attendance::summary::<S>)),
                    )
                    .service(
                        web::resource("/records")
                            .route(web::get().to(attendance::list_records::<S>)),
                    ),
            ),
    );
}

// QR CHECK-IN
//  ├─ HR/Admin: POST /attendance/token  → token + link for today
//  ├─ Employee: POST /attendance/check-in {token, date}
//  │            (or GET the link itself)
//  ├─ Employee: PUT /attendance/check-out
//  └─ HR/Admin: GET /attendance/day?date=..  → everyone's record for that day
