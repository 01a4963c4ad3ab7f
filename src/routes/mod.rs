pub mod attempts;
pub mod health;
pub mod questions;
pub mod registrations;
pub mod subtests;
pub mod tryouts;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
    Router,
};

use crate::middleware::{auth, rate_limit};
use crate::AppState;

/// Every endpoint under `/api/v1`, grouped by who may call it. Groups that
/// share a path (e.g. `GET` public, `PUT` admin) are merged per method.
pub fn api_router(state: AppState) -> Router {
    let config = crate::config::get_config();

    let public_api = Router::new()
        .route("/health", get(health::health))
        .route("/subtests", get(subtests::list_subtests))
        .route("/tryouts", get(tryouts::list_tryouts))
        .route("/tryouts/:id", get(tryouts::get_tryout))
        .route("/tryouts/:id/leaderboard", get(attempts::leaderboard))
        .layer(from_fn(auth::optional_auth))
        .layer(from_fn_with_state(
            rate_limit::new_rps_state(config.public_rps),
            rate_limit::rps_middleware,
        ));

    let user_api = Router::new()
        .route("/tryouts/:id/register", post(registrations::register))
        .route(
            "/users/me/tryout-registrations",
            get(registrations::my_registrations),
        )
        .route(
            "/tryouts/registrations/:id/payment-proof",
            post(registrations::upload_payment_proof),
        )
        .route(
            "/tryouts/registrations/:id/start",
            post(attempts::start_attempt),
        )
        .route(
            "/tryouts/attempts/:attemptId/current",
            get(attempts::current_state),
        )
        .route(
            "/tryouts/attempts/:attemptId/subtests/:subtestId/start",
            get(attempts::start_subtest),
        )
        .route(
            "/tryouts/attempts/:attemptId/subtests/:subtestId/answers",
            put(attempts::save_answers),
        )
        .route(
            "/tryouts/attempts/:attemptId/subtests/:subtestId/submit",
            post(attempts::submit_subtest),
        )
        .route(
            "/tryouts/attempts/:attemptId/finish",
            post(attempts::finish_attempt),
        )
        .route(
            "/tryouts/attempts/:attemptId/results",
            get(attempts::results),
        )
        .route_layer(from_fn(auth::require_auth));

    let staff_api = Router::new()
        .route(
            "/tryouts/:id/subtests",
            get(questions::list_subtests_with_counts),
        )
        .route("/tryouts/:id/questions", get(questions::list_questions))
        .route(
            "/tryouts/:id/subtests/:subtestId/questions",
            get(questions::list_subtest_questions).post(questions::create_question),
        )
        .route(
            "/tryouts/questions/:questionId",
            put(questions::update_question).delete(questions::delete_question),
        )
        .route_layer(from_fn(auth::require_admin_or_tutor));

    let admin_api = Router::new()
        .route("/tryouts", post(tryouts::create_tryout))
        .route(
            "/tryouts/:id",
            put(tryouts::update_tryout).delete(tryouts::delete_tryout),
        )
        .route(
            "/tryouts/:id/tutors",
            get(tryouts::list_tutors).post(tryouts::grant_tutor),
        )
        .route(
            "/tryouts/:id/tutors/:userId",
            axum::routing::delete(tryouts::revoke_tutor),
        )
        .route(
            "/tryouts/:id/registrations",
            get(registrations::tryout_registrations),
        )
        .route(
            "/tryouts/registrations/pending",
            get(registrations::pending_payments),
        )
        .route(
            "/tryouts/registrations/:id/approve",
            put(registrations::approve_payment),
        )
        .route(
            "/tryouts/registrations/:id/reject",
            put(registrations::reject_payment),
        )
        .route_layer(from_fn(auth::require_admin));

    let authenticated_api = user_api
        .merge(staff_api)
        .merge(admin_api)
        .layer(from_fn_with_state(
            rate_limit::new_rps_state(config.api_rps),
            rate_limit::rps_middleware,
        ));

    Router::new()
        .route("/health", get(health::health))
        .nest("/api/v1", public_api.merge(authenticated_api))
        .with_state(state)
}
