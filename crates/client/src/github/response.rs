//! GitHub API payloads and their constellation records.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Repository object as returned by `/users/{user}/repos` and `/repos/{owner}/{name}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiRepository {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
}

/// Grouping used to colour and cluster repositories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Core,
    Visual,
    Brain,
    Social,
    Accessibility,
    Creative,
    DevTools,
    Portal,
    Hardware,
    Research,
}

/// Keyword table, checked in order.
const KEYWORDS: &[(&str, Category)] = &[
    ("hyperfocus", Category::Core),
    ("constellation", Category::Visual),
    ("adhd", Category::Brain),
    ("social", Category::Social),
    ("accessibility", Category::Accessibility),
    ("creative", Category::Creative),
    ("tool", Category::DevTools),
    ("portal", Category::Portal),
    ("raspberry", Category::Hardware),
    ("research", Category::Research),
];

impl Category {
    /// First keyword found in the name, description, or topics. Defaults to dev-tools.
    pub fn classify(name: &str, description: Option<&str>, topics: &[String]) -> Self {
        let haystack = format!("{name} {} {}", description.unwrap_or_default(), topics.join(" ")).to_lowercase();
        KEYWORDS
            .iter()
            .find(|(keyword, _)| haystack.contains(keyword))
            .map(|(_, category)| *category)
            .unwrap_or(Category::DevTools)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Core => "core",
            Category::Visual => "visual",
            Category::Brain => "brain",
            Category::Social => "social",
            Category::Accessibility => "accessibility",
            Category::Creative => "creative",
            Category::DevTools => "dev-tools",
            Category::Portal => "portal",
            Category::Hardware => "hardware",
            Category::Research => "research",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Category::Core => "#00d9ff",
            Category::Visual => "#7c3aed",
            Category::Brain => "#06ffa5",
            Category::Social => "#f59e0b",
            Category::Accessibility => "#10b981",
            Category::Creative => "#ef4444",
            Category::DevTools => "#8b5cf6",
            Category::Portal => "#ec4899",
            Category::Hardware => "#6366f1",
            Category::Research => "#14b8a6",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point in the constellation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub const ORIGIN: Position = Position { x: 0.0, y: 0.0, z: 0.0 };

    /// Stable placement within ±40 × ±30 × ±20, derived from the repository name.
    pub fn for_name(name: &str) -> Self {
        let digest = Sha256::digest(name.as_bytes());
        let unit = |i: usize| f64::from(u16::from_be_bytes([digest[i], digest[i + 1]])) / 65536.0 - 0.5;
        Position { x: unit(0) * 80.0, y: unit(2) * 60.0, z: unit(4) * 40.0 }
    }
}

/// A repository as the visualization consumes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub category: Category,
    pub stars: u64,
    pub forks: u64,
    pub language: String,
    pub updated: DateTime<Utc>,
    pub url: String,
    pub demo_url: Option<String>,
    pub color: String,
    pub topics: Vec<String>,
    pub position: Position,
}

impl Repository {
    pub fn from_api(repo: ApiRepository, now: DateTime<Utc>) -> Self {
        let category = Category::classify(&repo.name, repo.description.as_deref(), &repo.topics);
        let description = repo
            .description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| format!("Advanced {category} project with neurodivergent-friendly design."));

        Repository {
            id: repo.id,
            position: Position::for_name(&repo.name),
            name: repo.name,
            description,
            category,
            stars: repo.stargazers_count,
            forks: repo.forks_count,
            language: repo.language.unwrap_or_else(|| "Multiple".to_string()),
            updated: repo.updated_at.unwrap_or(now),
            url: repo.html_url,
            demo_url: repo.homepage.filter(|h| !h.trim().is_empty()),
            color: category.color().to_string(),
            topics: repo.topics,
        }
    }
}

/// Convert an API listing, dropping dotfile repositories and the profile repository.
pub fn transform_repositories(raw: Vec<ApiRepository>, username: &str, now: DateTime<Utc>) -> Vec<Repository> {
    raw.into_iter()
        .filter(|repo| !repo.name.starts_with('.') && !repo.name.eq_ignore_ascii_case(username))
        .map(|repo| Repository::from_api(repo, now))
        .collect()
}

/// 0-100 score from recency, stars, forks, and topic count.
pub fn activity_score(repo: &ApiRepository, now: DateTime<Utc>) -> u8 {
    let mut score: u64 = 0;

    if let Some(updated) = repo.updated_at {
        let days = (now - updated).num_seconds() as f64 / 86_400.0;
        score += match days {
            d if d < 7.0 => 50,
            d if d < 30.0 => 30,
            d if d < 90.0 => 10,
            _ => 0,
        };
    }

    score += (repo.stargazers_count * 2).min(30);
    score += (repo.forks_count * 3).min(20);
    score += (repo.topics.len() as u64 * 5).min(25);

    score.min(100) as u8
}

/// Repository object enriched with languages, latest commit, and activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryDetails {
    #[serde(flatten)]
    pub repository: serde_json::Map<String, serde_json::Value>,
    pub languages: BTreeMap<String, u64>,
    pub last_commit: Option<serde_json::Value>,
    pub activity: u8,
}

/// Built-in data served when the API cannot be reached.
pub fn fallback_repositories(now: DateTime<Utc>) -> Vec<Repository> {
    vec![Repository {
        id: 1,
        name: "ULTIMATE-HYPERFOCUS-CONSTELLATION".into(),
        description: "The world's most advanced 3D repository visualization designed for neurodivergent minds".into(),
        category: Category::Core,
        stars: 0,
        forks: 0,
        language: "JavaScript".into(),
        updated: now,
        url: "https://github.com/welshDog/ULTIMATE-HYPERFOCUS-CONSTELLATION".into(),
        demo_url: None,
        color: Category::Core.color().into(),
        topics: Vec::new(),
        position: Position::ORIGIN,
    }]
}
