//! Professor Doom prompt templates and builders.
//!
//! Builders are pure: identical inputs always produce an identical prompt.
//! Every prompt carries the persona and the grounding rules from `llm_client::prompts`.

use crate::llm_client::prompts::{fill_template, DELIVERY_RULES, GROUNDING_RULES};
use crate::session::context::{
    ChatTurn, Role, SectionKey, MAX_CONFESSIONS, MAX_CONFESSION_CHARS,
};

/// Turns of prior conversation included in a chat prompt.
pub const CHAT_HISTORY_WINDOW: usize = 6;
/// Turns of prior conversation included in the summary prompt.
pub const SUMMARY_HISTORY_WINDOW: usize = 10;
/// Longest single turn rendered into a prompt.
pub const MAX_TURN_CHARS: usize = 4000;

const CONCISE_RULE: &str = "Be CONCISE - max 150 words unless listing items. Short and punchy.";
const DETAILED_RULE: &str =
    "Give a DETAILED, comprehensive response. Be thorough with examples and specifics. No word limit.";

/// Replace: {grounding_rules}, {delivery_rules}, {resume_text}
const ANALYSIS_PROMPT_TEMPLATE: &str = r#"You are Professor Doom, a brutally honest career advisor with dark humor.

CRITICAL RULES:
{grounding_rules}
{delivery_rules}
- Speak directly without theatrical descriptions

Analyze this resume and provide a brief summary of:
1. Key skills and experience found
2. Strengths
3. Weaknesses
4. Overall impression

Be dramatic but ONLY reference what's actually written in the resume.

RESUME CONTENT:
{resume_text}"#;

/// Replace: {length_rule}, {grounding_rules}, {delivery_rules}, {resume_text},
///          {history}, {confessions}, {user_prompt}
const CHAT_PROMPT_TEMPLATE: &str = r#"You are Professor Doom, a career advisor with dark humor.

CRITICAL RULES:
- {length_rule}
{grounding_rules}
{delivery_rules}
- Speak directly and dramatically
- If user corrects you, acknowledge and adjust

Resume context:
{resume_text}
{history}
{confessions}

User's message: {user_prompt}

Respond based ONLY on what's in the resume:"#;

/// Replace: {language}, {pronouns}, {grounding_rules}, {resume_text},
///          {chat_context}, {confession_context}
const SUMMARY_PROMPT_TEMPLATE: &str = r#"You are Professor Doom, but now you're like a caring old family member who wants the best for this person.
You're introducing them to the world - like a proud grandfather presenting his grandchild.

TASK: Write a 50-second spoken introduction (approximately 120-150 words) for this person.

CRITICAL RULES:
- Write in {language}
- Use {pronouns} pronouns
- Be ONLY POSITIVE - highlight their strengths, potential, and why someone should hire them
- Sound like a wise, caring mentor who believes in them
- Make it heartfelt and genuine, not sarcastic
- No scene descriptions, sound effects, or stage directions
- Write it as a flowing speech, not bullet points
- This is meant to be spoken aloud, so make it natural and warm
{grounding_rules}

RESUME:
{resume_text}

CONVERSATION CONTEXT (what we discussed):
{chat_context}

{confession_context}

Write the introduction now - remember, you're a proud mentor introducing someone you believe in:"#;

/// Canned instruction for each analysis section.
pub fn section_prompt(key: SectionKey) -> &'static str {
    match key {
        SectionKey::Roast => {
            "Roast this resume in 3-4 punchy sentences. Be brutal, funny, hit the main weaknesses only."
        }
        SectionKey::AiReplace => {
            "AI Replacement Risk: Give a percentage (0-100%) and 2-3 sentences explaining why. Be direct."
        }
        SectionKey::Futureproof => {
            "Futureproof Score: Give a percentage (0-100%) and 2-3 sentences on their resilience. Brief."
        }
        SectionKey::Improve => {
            "List TOP 3 things to improve. One sentence each. Be specific and actionable."
        }
        SectionKey::Jobs => {
            "List 4-5 jobs they're qualified for. Job title + one line explanation each."
        }
    }
}

/// Inputs of a chat prompt. `history` may be longer than the window; only the
/// tail is rendered.
#[derive(Debug, Clone, Copy)]
pub struct ChatPrompt<'a> {
    pub resume_text: &'a str,
    pub user_prompt: &'a str,
    pub elaborate: bool,
    pub history: &'a [ChatTurn],
    pub confessions: &'a [String],
}

pub fn build_analysis_prompt(resume_text: &str) -> String {
    fill_template(
        ANALYSIS_PROMPT_TEMPLATE,
        &[
            ("grounding_rules", GROUNDING_RULES),
            ("delivery_rules", DELIVERY_RULES),
            ("resume_text", resume_text),
        ],
    )
}

pub fn build_chat_prompt(input: &ChatPrompt<'_>) -> String {
    let length_rule = if input.elaborate {
        DETAILED_RULE
    } else {
        CONCISE_RULE
    };
    let confessions = render_confessions(input.confessions);
    let history = render_history(input.history);

    fill_template(
        CHAT_PROMPT_TEMPLATE,
        &[
            ("length_rule", length_rule),
            ("grounding_rules", GROUNDING_RULES),
            ("delivery_rules", DELIVERY_RULES),
            ("resume_text", input.resume_text),
            ("confessions", &confessions),
            ("history", &history),
            ("user_prompt", input.user_prompt),
        ],
    )
}

/// `pronouns` and `language` are written verbatim into the prompt.
pub fn build_summary_prompt(
    resume_text: &str,
    pronouns: &str,
    language: &str,
    chat_context: Option<&str>,
    confession_context: Option<&str>,
) -> String {
    let chat_context = chat_context
        .filter(|c| !c.trim().is_empty())
        .map(|c| clip_chars(c, SUMMARY_HISTORY_WINDOW * MAX_TURN_CHARS))
        .unwrap_or("No previous conversation");
    let confession_context = confession_context
        .filter(|c| !c.trim().is_empty())
        .map(|c| {
            format!(
                "CONFESSIONS (things they want to improve): {}",
                clip_chars(c, MAX_CONFESSIONS * MAX_CONFESSION_CHARS)
            )
        })
        .unwrap_or_default();

    fill_template(
        SUMMARY_PROMPT_TEMPLATE,
        &[
            ("language", language),
            ("pronouns", pronouns),
            ("grounding_rules", GROUNDING_RULES),
            ("resume_text", resume_text),
            ("chat_context", chat_context),
            ("confession_context", &confession_context),
        ],
    )
}

/// User prompt asking the model to expand a previous short answer.
pub fn build_elaborate_prompt(previous_answer: &str) -> String {
    format!(
        "Elaborate in detail on this topic. Give a comprehensive, thorough explanation with \
         examples and specifics. Previous brief answer was: \"{previous_answer}\". \
         Now expand on this significantly."
    )
}

/// User prompt asking for advice on every confession.
pub fn build_absolution_prompt(confessions: &[String]) -> String {
    format!(
        "The user has confessed these resume exaggerations/lies:\n- {}\n\n\
         For EACH confession, provide:\n\
         1. How serious this sin is (mild/moderate/grave)\n\
         2. Specific steps to ACTUALLY achieve this claim legitimately\n\
         3. How to reword it honestly in the meantime\n\n\
         Be dramatic but genuinely helpful. Give them a path to redemption.",
        bounded_confessions(confessions).join("\n- ")
    )
}

/// Last `CHAT_HISTORY_WINDOW` turns as `User:` / `Professor Doom:` lines.
pub fn render_history(history: &[ChatTurn]) -> String {
    if history.is_empty() {
        return String::new();
    }
    let start = history.len().saturating_sub(CHAT_HISTORY_WINDOW);
    let lines: Vec<String> = history[start..]
        .iter()
        .map(|turn| {
            let speaker = match turn.role {
                Role::User => "User",
                Role::Assistant => "Professor Doom",
            };
            format!("{speaker}: {}", clip_chars(&turn.content, MAX_TURN_CHARS))
        })
        .collect();
    format!("\nPrevious conversation:\n{}", lines.join("\n"))
}

/// Confessions as they enter a prompt: the first `MAX_CONFESSIONS`, each clipped.
fn bounded_confessions(confessions: &[String]) -> Vec<&str> {
    confessions
        .iter()
        .take(MAX_CONFESSIONS)
        .map(|c| clip_chars(c, MAX_CONFESSION_CHARS))
        .collect()
}

pub fn render_confessions(confessions: &[String]) -> String {
    if confessions.is_empty() {
        return String::new();
    }
    format!(
        "\nUSER CONFESSIONS (resume exaggerations they admitted to):\n- {}\n\n\
         Use these confessions to give more honest, tailored advice. \
         Help them achieve these claims legitimately.",
        bounded_confessions(confessions).join("\n- ")
    )
}

/// Summary conversation context: last `SUMMARY_HISTORY_WINDOW` turns as `role: content`.
pub fn render_chat_context(history: &[ChatTurn]) -> String {
    let start = history.len().saturating_sub(SUMMARY_HISTORY_WINDOW);
    history[start..]
        .iter()
        .map(|turn| {
            let role = match turn.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            };
            format!("{role}: {}", clip_chars(&turn.content, MAX_TURN_CHARS))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `Confessions: a, b`, or empty when there are none.
pub fn render_confession_context(confessions: &[String]) -> String {
    if confessions.is_empty() {
        String::new()
    } else {
        format!("Confessions: {}", bounded_confessions(confessions).join(", "))
    }
}

/// First `max_chars` characters of `text`, cut on a char boundary.
pub fn clip_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => &text[..cut],
        None => text,
    }
}
