// Shared prompt fragments and the template filler.
// Each feature that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// Anti-hallucination guardrail embedded in every prompt.
pub const GROUNDING_RULES: &str = "\
- ONLY use information that is ACTUALLY in the resume - do NOT invent details
- Do NOT make up page counts, years, numbers, or any facts not explicitly stated";

/// Keeps the persona from narrating itself.
pub const DELIVERY_RULES: &str = "\
- No scene descriptions, stage directions, or sound effects
- No asterisks for actions or parentheses for effects";

/// Fills `{name}` placeholders in a single left-to-right pass.
///
/// Substituted values are never rescanned, so resume or user text that happens
/// to contain `{history}` stays literal. Unknown placeholders are left as-is.
pub fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(
        template.len() + values.iter().map(|(_, v)| v.len()).sum::<usize>(),
    );
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let replaced = after.find('}').and_then(|close| {
            let name = &after[..close];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });
        match replaced {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
