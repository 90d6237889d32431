//! Keyword skill detection for the Learning Crypt.
//!
//! Patterns run over the analysis and the raw resume together. The first match
//! of each pattern, lowercased, becomes a skill tag in pattern order.

use std::sync::LazyLock;

use regex::Regex;

/// Skill tags offered to the client at most.
pub const MAX_EXTRACTED_SKILLS: usize = 15;
/// Skills a single resources search may ask about.
pub const MAX_SELECTED_SKILLS: usize = 5;
/// Below this many detected skills the general defaults are appended.
const MIN_DETECTED_SKILLS: usize = 5;

const DEFAULT_SKILLS: [&str; 4] = [
    "communication",
    "leadership",
    "problem solving",
    "time management",
];

const SKILL_PATTERNS: &[&str] = &[
    r"javascript",
    r"python",
    r"java\b",
    r"react",
    r"node\.?js",
    r"html",
    r"css",
    r"sql",
    r"mongodb",
    r"aws",
    r"docker",
    r"kubernetes",
    r"git",
    r"typescript",
    r"angular",
    r"vue",
    r"machine learning",
    r"data analysis",
    r"excel",
    r"powerpoint",
    r"communication",
    r"leadership",
    r"project management",
    r"agile",
    r"scrum",
    r"devops",
    r"ci/cd",
    r"linux",
    r"photoshop",
    r"figma",
    r"ui/ux",
    r"design",
    r"marketing",
    r"seo",
    r"content writing",
    r"sales",
    r"c\+\+",
    r"c#",
    r"ruby",
    r"php",
    r"swift",
    r"kotlin",
    r"tensorflow",
    r"pytorch",
    r"nlp",
    r"deep learning",
    r"blockchain",
    r"solidity",
    r"web3",
    r"cloud",
];

static SKILL_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    SKILL_PATTERNS
        .iter()
        .filter_map(|pattern| Regex::new(&format!("(?i){pattern}")).ok())
        .collect()
});

/// Skill tags found in a resume, padded with general skills when few are found.
pub fn extract_skills(analysis: &str, resume_text: &str) -> Vec<String> {
    let combined = format!("{analysis} {resume_text}");

    let mut skills: Vec<String> = Vec::new();
    for re in SKILL_RES.iter() {
        if let Some(found) = re.find(&combined) {
            let skill = found.as_str().to_lowercase();
            if !skills.contains(&skill) {
                skills.push(skill);
            }
        }
    }
    skills.truncate(MAX_EXTRACTED_SKILLS);

    if skills.len() < MIN_DETECTED_SKILLS {
        for default in DEFAULT_SKILLS {
            if !skills.iter().any(|s| s == default) {
                skills.push(default.to_string());
            }
        }
    }
    skills
}
