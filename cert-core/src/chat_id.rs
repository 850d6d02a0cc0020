//! Chat identity comparison across the short (`-123`) and supergroup (`-100123`) id forms.
//!
//! Every comparison between an incoming chat id and the configured chat id goes through [`matches`].

use std::collections::BTreeSet;

/// The id itself (trimmed) plus its alternate form when it has one.
pub fn expand_identity_forms(chat_id: &str) -> BTreeSet<String> {
    let trimmed = chat_id.trim();
    let mut forms = BTreeSet::new();
    forms.insert(trimmed.to_string());

    if let Some(rest) = trimmed.strip_prefix("-100") {
        forms.insert(format!("-{}", rest));
    } else if let Some(rest) = trimmed.strip_prefix('-') {
        forms.insert(format!("-100{}", rest));
    }

    forms
}

/// True when the two ids share any identity form.
pub fn matches(a: &str, b: &str) -> bool {
    let b_forms = expand_identity_forms(b);
    expand_identity_forms(a)
        .iter()
        .any(|form| b_forms.contains(form))
}
