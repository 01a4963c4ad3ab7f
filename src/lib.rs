pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use crate::services::{
    attempt_service::AttemptService, question_service::QuestionService,
    registration_service::RegistrationService, subtest_service::SubtestService,
    tryout_service::TryOutService,
};
use crate::utils::time::{Clock, SystemClock};
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub subtest_service: SubtestService,
    pub tryout_service: TryOutService,
    pub question_service: QuestionService,
    pub registration_service: RegistrationService,
    pub attempt_service: AttemptService,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let config = crate::config::get_config();
        Self::with_clock(pool, Arc::new(SystemClock), config.subtest_grace_seconds)
    }

    pub fn with_clock(pool: PgPool, clock: Arc<dyn Clock>, grace_seconds: Option<i64>) -> Self {
        let subtest_service = SubtestService::new(pool.clone());
        let tryout_service = TryOutService::new(pool.clone());
        let question_service = QuestionService::new(
            pool.clone(),
            subtest_service.clone(),
            tryout_service.clone(),
        );
        let registration_service =
            RegistrationService::new(pool.clone(), tryout_service.clone(), clock.clone());
        let attempt_service = AttemptService::new(
            pool,
            subtest_service.clone(),
            question_service.clone(),
            registration_service.clone(),
            tryout_service.clone(),
            clock,
            grace_seconds,
        );

        Self {
            subtest_service,
            tryout_service,
            question_service,
            registration_service,
            attempt_service,
        }
    }
}
