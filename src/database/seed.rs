use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::error::Result;

pub struct SubtestSeed {
    pub code: &'static str,
    pub name: &'static str,
    pub question_count: i32,
    pub time_limit_seconds: i32,
    /// Max score in hundredths.
    pub max_score_cents: i64,
}

impl SubtestSeed {
    pub fn max_score(&self) -> Decimal {
        Decimal::new(self.max_score_cents, 2)
    }
}

/// The seven fixed subtests. Insertion order is the exam order, so the
/// catalog is always read back `ORDER BY id`.
pub const SUBTEST_CATALOG: [SubtestSeed; 7] = [
    SubtestSeed {
        code: "PU",
        name: "Penalaran Umum",
        question_count: 30,
        time_limit_seconds: 1800,
        max_score_cents: 88612,
    },
    SubtestSeed {
        code: "PBM",
        name: "Pemahaman Bacaan dan Menulis",
        question_count: 20,
        time_limit_seconds: 1500,
        max_score_cents: 85713,
    },
    SubtestSeed {
        code: "PPU",
        name: "Pengetahuan dan Pemahaman Umum",
        question_count: 20,
        time_limit_seconds: 900,
        max_score_cents: 87596,
    },
    SubtestSeed {
        code: "PK",
        name: "Pengetahuan Kuantitatif",
        question_count: 20,
        time_limit_seconds: 1200,
        max_score_cents: 100000,
    },
    SubtestSeed {
        code: "LBI",
        name: "Literasi Bahasa Indonesia",
        question_count: 30,
        time_limit_seconds: 2550,
        max_score_cents: 88575,
    },
    SubtestSeed {
        code: "LBE",
        name: "Literasi Bahasa Inggris",
        question_count: 20,
        time_limit_seconds: 1200,
        max_score_cents: 87076,
    },
    SubtestSeed {
        code: "PM",
        name: "Penalaran Matematika",
        question_count: 20,
        time_limit_seconds: 2550,
        max_score_cents: 100000,
    },
];

/// Inserts any missing catalog subtests. Safe to run on every startup.
pub async fn seed_subtests(pool: &PgPool) -> Result<()> {
    for seed in SUBTEST_CATALOG.iter() {
        let inserted = sqlx::query(
            r#"
            INSERT INTO subtests (code, name, question_count, time_limit_seconds, max_score)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (code) DO NOTHING
            "#,
        )
        .bind(seed.code)
        .bind(seed.name)
        .bind(seed.question_count)
        .bind(seed.time_limit_seconds)
        .bind(seed.max_score())
        .execute(pool)
        .await?
        .rows_affected();

        if inserted > 0 {
            tracing::info!(code = seed.code, "Seeded subtest {}", seed.name);
        } else {
            tracing::debug!(code = seed.code, "Subtest already exists");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn catalog_codes_are_unique() {
        let codes: HashSet<&str> = SUBTEST_CATALOG.iter().map(|s| s.code).collect();
        assert_eq!(codes.len(), SUBTEST_CATALOG.len());
    }

    #[test]
    fn catalog_starts_with_penalaran_umum() {
        assert_eq!(SUBTEST_CATALOG[0].code, "PU");
        assert_eq!(SUBTEST_CATALOG[0].max_score(), Decimal::new(88612, 2));
    }
}
