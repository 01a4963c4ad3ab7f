pub mod answer;
pub mod attempt;
pub mod question;
pub mod registration;
pub mod subtest;
pub mod tryout;
