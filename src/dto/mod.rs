pub mod attempt_dto;
pub mod question_dto;
pub mod registration_dto;
pub mod response;
pub mod tryout_dto;
