/// Initial data shared by every storage backend
use crate::crypto::PasswordHasher;
use crate::store::models::{
    recount_questions, AnswerOption, BattleStats, Question, QuizTable, Role, User, UserId,
    UserSettings,
};
use chrono::{DateTime, TimeZone, Utc};

/// Seed users, tables and questions
#[derive(Debug, Clone)]
pub struct SeedData {
    pub users: Vec<User>,
    pub tables: Vec<QuizTable>,
    pub questions: Vec<Question>,
}

impl SeedData {
    /// Build the seed with password hashes derived from the configured seed passwords
    pub fn new(hasher: &PasswordHasher, admin_password: &str, student_password: &str) -> Self {
        let created_at = seed_timestamp();

        let users = vec![
            User {
                id: 1,
                username: "admin".to_string(),
                email: Some("admin@quiz.app".to_string()),
                password_hash: hasher.hash(admin_password),
                role: Role::Admin,
                avatar: "👨‍💼".to_string(),
                settings: UserSettings::default(),
                battle_stats: BattleStats::default(),
                created_at,
                last_login: None,
                is_active: true,
            },
            User {
                id: 2,
                username: "student".to_string(),
                email: Some("student@quiz.app".to_string()),
                password_hash: hasher.hash(student_password),
                role: Role::Student,
                avatar: "👨‍🎓".to_string(),
                settings: UserSettings {
                    theme: "blue".to_string(),
                    notifications: true,
                    auto_next: true,
                },
                battle_stats: BattleStats {
                    rating: 1200,
                    wins: 0,
                    losses: 0,
                },
                created_at,
                last_login: None,
                is_active: true,
            },
        ];

        let mut tables = vec![
            QuizTable {
                name: "_00_Official_2203__2015_".to_string(),
                display_name: "Oficiální 2203/2015".to_string(),
                description: "Oficiální otázky podle předpisu 2203/2015".to_string(),
                category: "official".to_string(),
                question_count: 0,
                created_at,
            },
            QuizTable {
                name: "demo_questions".to_string(),
                display_name: "Demo Otázky".to_string(),
                description: "Demonstrační sada otázek pro testování".to_string(),
                category: "demo".to_string(),
                question_count: 0,
                created_at,
            },
        ];

        let questions = vec![
            question(
                1,
                "_00_Official_2203__2015_",
                "01) Souprava hlavních klíčů obsahuje:",
                [
                    "Hlavní klíče od zámků výhybek, výkolejek, od uzamykatelných přenosných výměnových zámků a uzamykatelných podložek.",
                    "Hlavní a náhradní klíče od zámků výhybek a výkolejek.",
                    "Hlavní a náhradní klíče od uzamykatelných přenosných výměnových zámků a uzamykatelných podložek.",
                ],
                AnswerOption::A,
                "Podle předpisů",
                2,
                "official",
            ),
            question(
                2,
                "_00_Official_2203__2015_",
                "02) Kdy a koho musí zpravit zaměstnanec, který zjistil, že na světelném návěstidle výhybky se samovratným přestavníkem není návěst JÍZDA ZAJIŠTĚNA?",
                [
                    "Neprodleně dirigujícího dispečera a strojvedoucí všech vlaků v dopravně D3.",
                    "Neprodleně pouze výpravčího přilehlé stanice.",
                    "Neprodleně pouze udržujícího zaměstnance SSZT.",
                ],
                AnswerOption::A,
                "Bezpečnostní opatření",
                3,
                "official",
            ),
            question(
                3,
                "_00_Official_2203__2015_",
                "03) Jaký tvar mají v soupravě hlavních klíčů štítky od výhybek a výkolejek?",
                ["Kruhový.", "Obdélníkový.", "Čtvercový."],
                AnswerOption::A,
                "Standardní označení",
                1,
                "official",
            ),
            question(
                4,
                "demo_questions",
                "Jaká je maximální rychlost osobního vlaku?",
                ["120 km/h", "160 km/h", "200 km/h"],
                AnswerOption::B,
                "Podle předpisů je maximální rychlost osobního vlaku 160 km/h.",
                2,
                "rychlosti",
            ),
            question(
                5,
                "demo_questions",
                "Co znamená návěst 'Stůj'?",
                [
                    "Vlak může pokračovat v jízdě",
                    "Vlak musí zastavit před návěstidlem",
                    "Vlak může jet pomalu",
                ],
                AnswerOption::B,
                "Návěst 'Stůj' znamená bezpodmínečné zastavení před návěstidlem.",
                1,
                "navesti",
            ),
            question(
                6,
                "demo_questions",
                "Jaká je minimální vzdálenost mezi vlaky?",
                ["500 metrů", "1000 metrů", "Podle brzdné vzdálenosti"],
                AnswerOption::C,
                "Vzdálenost mezi vlaky se řídí brzdnou vzdáleností a dalšími faktory.",
                3,
                "bezpecnost",
            ),
        ];

        recount_questions(&mut tables, &questions);

        Self {
            users,
            tables,
            questions,
        }
    }

    /// Highest user id in the seed
    pub fn max_user_id(&self) -> UserId {
        self.users.iter().map(|u| u.id).max().unwrap_or(0)
    }
}

fn seed_timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 8, 12, 0, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

#[allow(clippy::too_many_arguments)]
fn question(
    id: i64,
    table_name: &str,
    text: &str,
    answers: [&str; 3],
    correct_answer: AnswerOption,
    explanation: &str,
    difficulty: u8,
    category: &str,
) -> Question {
    let [a, b, c] = answers;
    Question {
        id,
        table_name: table_name.to_string(),
        question: text.to_string(),
        answer_a: a.to_string(),
        answer_b: b.to_string(),
        answer_c: c.to_string(),
        correct_answer,
        explanation: explanation.to_string(),
        difficulty,
        category: category.to_string(),
    }
}
