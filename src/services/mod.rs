pub mod attempt_service;
pub mod question_service;
pub mod registration_service;
pub mod scoring_service;
pub mod subtest_service;
pub mod tryout_service;
