use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::models::question::{DifficultyLevel, OptionLetter, TryOutQuestion};
use crate::models::subtest::Subtest;

/// Decimal places kept for stored scores (`NUMERIC(10, 2)`).
const SCORE_DP: u32 = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct GradedAnswer {
    pub question_id: i64,
    pub selected_option: Option<OptionLetter>,
    /// `None` when the question was left blank.
    pub is_correct: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubtestScore {
    pub correct_count: i32,
    pub wrong_count: i32,
    pub unanswered_count: i32,
    pub raw_score: Decimal,
    pub final_score: Decimal,
    pub answers: Vec<GradedAnswer>,
    pub skipped_question_ids: Vec<i64>,
}

pub struct ScoringService;

impl ScoringService {
    /// Grades a batch of `(question_id, selected_option)` pairs against the
    /// questions of one subtest. Ids outside `questions` are skipped and
    /// reported; a repeated id keeps its last selection.
    pub fn grade_answers(
        questions: &[TryOutQuestion],
        submitted: &[(i64, Option<OptionLetter>)],
    ) -> (Vec<GradedAnswer>, Vec<i64>) {
        let by_id: HashMap<i64, &TryOutQuestion> = questions.iter().map(|q| (q.id, q)).collect();

        let mut graded: Vec<GradedAnswer> = Vec::new();
        let mut skipped: Vec<i64> = Vec::new();

        for &(question_id, selected_option) in submitted {
            let Some(question) = by_id.get(&question_id) else {
                skipped.push(question_id);
                continue;
            };
            let answer = GradedAnswer {
                question_id,
                selected_option,
                is_correct: selected_option.map(|opt| opt == question.correct_option),
            };
            match graded.iter().position(|a| a.question_id == question_id) {
                Some(pos) => graded[pos] = answer,
                None => graded.push(answer),
            }
        }

        (graded, skipped)
    }

    pub fn score_subtest(
        subtest: &Subtest,
        questions: &[TryOutQuestion],
        submitted: &[(i64, Option<OptionLetter>)],
    ) -> SubtestScore {
        let (answers, skipped_question_ids) = Self::grade_answers(questions, submitted);
        let difficulty: HashMap<i64, DifficultyLevel> =
            questions.iter().map(|q| (q.id, q.difficulty_level)).collect();

        let mut correct_count: i32 = 0;
        let mut wrong_count: i32 = 0;
        let mut raw_score = Decimal::ZERO;

        for answer in &answers {
            match answer.is_correct {
                Some(true) => {
                    correct_count += 1;
                    if let Some(level) = difficulty.get(&answer.question_id) {
                        raw_score += level.weight();
                    }
                }
                Some(false) => wrong_count += 1,
                None => {}
            }
        }

        let unanswered_count = (questions.len() as i32 - correct_count - wrong_count).max(0);
        let final_score = Self::normalize(raw_score, subtest.question_count, subtest.max_score);

        SubtestScore {
            correct_count,
            wrong_count,
            unanswered_count,
            raw_score: raw_score.round_dp(SCORE_DP),
            final_score,
            answers,
            skipped_question_ids,
        }
    }

    /// Scales a raw score against the ceiling of every question being hard
    /// and correct, so the result lands in `[0, max_score]`.
    pub fn normalize(raw_score: Decimal, question_count: i32, max_score: Decimal) -> Decimal {
        if question_count <= 0 {
            return Decimal::ZERO;
        }
        let ceiling = Decimal::from(question_count) * DifficultyLevel::max_weight();
        let scaled = (raw_score / ceiling) * max_score;
        scaled.clamp(Decimal::ZERO, max_score).round_dp(SCORE_DP)
    }

    /// Unweighted mean of the given subtest scores; zero for none.
    pub fn aggregate(final_scores: &[Decimal]) -> Decimal {
        if final_scores.is_empty() {
            return Decimal::ZERO;
        }
        let sum: Decimal = final_scores.iter().copied().sum();
        (sum / Decimal::from(final_scores.len())).round_dp(SCORE_DP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn subtest(question_count: i32, max_score: Decimal) -> Subtest {
        Subtest {
            id: 2,
            code: "PBM".into(),
            name: "Pemahaman Bacaan dan Menulis".into(),
            question_count,
            time_limit_seconds: 1500,
            max_score,
        }
    }

    fn question(id: i64, difficulty: DifficultyLevel, correct: OptionLetter) -> TryOutQuestion {
        let now = Utc::now();
        TryOutQuestion {
            id,
            try_out_package_id: 1,
            subtest_id: 2,
            question_text: format!("Question {}", id),
            image_url: None,
            explanation: None,
            difficulty_level: difficulty,
            order_number: id as i32,
            option_a: "a".into(),
            option_b: "b".into(),
            option_c: "c".into(),
            option_d: "d".into(),
            option_e: "e".into(),
            correct_option: correct,
            created_by_user_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn all_hard_and_correct_saturates_at_max_score() {
        let max = Decimal::new(85713, 2);
        let questions: Vec<TryOutQuestion> = (1..=20)
            .map(|id| question(id, DifficultyLevel::Hard, OptionLetter::B))
            .collect();
        let submitted: Vec<(i64, Option<OptionLetter>)> =
            questions.iter().map(|q| (q.id, Some(OptionLetter::B))).collect();

        let score = ScoringService::score_subtest(&subtest(20, max), &questions, &submitted);

        assert_eq!(score.correct_count, 20);
        assert_eq!(score.raw_score, Decimal::new(400, 1));
        assert_eq!(score.final_score, max);
        assert_eq!(score.unanswered_count, 0);
    }

    #[test]
    fn no_correct_answers_scores_zero() {
        let questions = vec![
            question(1, DifficultyLevel::Easy, OptionLetter::A),
            question(2, DifficultyLevel::Hard, OptionLetter::C),
        ];
        let submitted = vec![(1, Some(OptionLetter::E)), (2, None)];

        let score = ScoringService::score_subtest(&subtest(20, Decimal::new(1000, 0)), &questions, &submitted);

        assert_eq!(score.final_score, Decimal::ZERO);
        assert_eq!(score.correct_count, 0);
        assert_eq!(score.wrong_count, 1);
        assert_eq!(score.unanswered_count, 1);
        assert_eq!(score.answers[1].is_correct, None);
    }

    #[test]
    fn correct_answers_are_weighted_by_difficulty() {
        let questions = vec![
            question(1, DifficultyLevel::Easy, OptionLetter::A),
            question(2, DifficultyLevel::Medium, OptionLetter::B),
            question(3, DifficultyLevel::Hard, OptionLetter::C),
            question(4, DifficultyLevel::Hard, OptionLetter::D),
        ];
        let submitted = vec![
            (1, Some(OptionLetter::A)),
            (2, Some(OptionLetter::B)),
            (3, Some(OptionLetter::C)),
            (4, Some(OptionLetter::A)),
        ];

        let score = ScoringService::score_subtest(&subtest(10, Decimal::new(1000, 0)), &questions, &submitted);

        // 1.0 + 1.5 + 2.0 over a ceiling of 10 * 2.0
        assert_eq!(score.raw_score, Decimal::new(45, 1));
        assert_eq!(score.final_score, Decimal::new(225, 0));
        assert_eq!(score.wrong_count, 1);
    }

    #[test]
    fn unknown_question_ids_are_skipped_and_reported() {
        let questions = vec![question(1, DifficultyLevel::Easy, OptionLetter::A)];
        let submitted = vec![(1, Some(OptionLetter::A)), (999, Some(OptionLetter::A))];

        let score = ScoringService::score_subtest(&subtest(20, Decimal::new(1000, 0)), &questions, &submitted);

        assert_eq!(score.answers.len(), 1);
        assert_eq!(score.skipped_question_ids, vec![999]);
        assert_eq!(score.correct_count, 1);
    }

    #[test]
    fn repeated_question_keeps_last_selection() {
        let questions = vec![question(1, DifficultyLevel::Hard, OptionLetter::A)];
        let submitted = vec![(1, Some(OptionLetter::A)), (1, Some(OptionLetter::B))];

        let score = ScoringService::score_subtest(&subtest(20, Decimal::new(1000, 0)), &questions, &submitted);

        assert_eq!(score.answers.len(), 1);
        assert_eq!(score.answers[0].selected_option, Some(OptionLetter::B));
        assert_eq!(score.correct_count, 0);
        assert_eq!(score.wrong_count, 1);
    }

    #[test]
    fn normalize_stays_within_bounds() {
        let max = Decimal::new(88612, 2);
        for raw in [0i64, 7, 30, 60, 90] {
            let score = ScoringService::normalize(Decimal::from(raw), 30, max);
            assert!(score >= Decimal::ZERO && score <= max, "raw {} gave {}", raw, score);
        }
        assert_eq!(ScoringService::normalize(Decimal::TEN, 0, max), Decimal::ZERO);
    }

    #[test]
    fn aggregate_averages_only_given_scores() {
        let scores = [Decimal::new(800, 0), Decimal::new(900, 0)];
        assert_eq!(ScoringService::aggregate(&scores), Decimal::new(850, 0));
        assert_eq!(ScoringService::aggregate(&[]), Decimal::ZERO);
    }
}
