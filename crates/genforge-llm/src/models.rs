//! Model name resolution across backend families
//!
//! Callers may ask for a tier (`fast`, `strong`), a concrete model name, or
//! nothing. A model name that belongs to the other family is mapped to the
//! nearest equivalent for the backend serving the call.

use genforge_config::BackendFamily;

/// Coarse capability tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ModelTier {
    Fast,
    Strong,
}

const CHAT_MODELS: &[(ModelTier, &str)] = &[
    (ModelTier::Fast, "gpt-4o-mini"),
    (ModelTier::Strong, "gpt-4o"),
];

const GENERATE_MODELS: &[(ModelTier, &str)] = &[
    (ModelTier::Fast, "gemini-1.5-flash"),
    (ModelTier::Strong, "gemini-1.5-pro"),
];

const FAST_MARKERS: &[&str] = &["mini", "flash", "nano", "haiku", "lite"];

fn table(family: BackendFamily) -> &'static [(ModelTier, &'static str)] {
    match family {
        BackendFamily::Chat => CHAT_MODELS,
        BackendFamily::Generate => GENERATE_MODELS,
    }
}

/// Canonical model for a family and tier.
#[must_use]
pub fn model_for_tier(family: BackendFamily, tier: ModelTier) -> &'static str {
    table(family)
        .iter()
        .find(|(t, _)| *t == tier)
        .map_or(table(family)[0].1, |(_, name)| *name)
}

/// Best guess at the tier of a model name.
#[must_use]
pub fn tier_of_model(model: &str) -> ModelTier {
    let lower = model.to_ascii_lowercase();
    if FAST_MARKERS.iter().any(|marker| lower.contains(marker)) {
        ModelTier::Fast
    } else {
        ModelTier::Strong
    }
}

/// Family a model name appears to belong to, if recognizable.
#[must_use]
pub fn family_of_model(model: &str) -> Option<BackendFamily> {
    let lower = model.to_ascii_lowercase();
    if lower.starts_with("gemini") {
        Some(BackendFamily::Generate)
    } else if lower.starts_with("gpt-")
        || lower.starts_with("o1")
        || lower.starts_with("o3")
        || lower.starts_with("o4")
    {
        Some(BackendFamily::Chat)
    } else {
        None
    }
}

/// Resolve the model a backend should be called with.
///
/// * no request, empty, or `default`: the backend's configured model
/// * a tier: the configured model when it already is that tier, else the
///   family's canonical model for the tier
/// * a model name from the other family: mapped through its tier
/// * anything else: passed through unchanged
#[must_use]
pub fn resolve_model(family: BackendFamily, configured: &str, requested: Option<&str>) -> String {
    let requested = match requested.map(str::trim) {
        None | Some("") => return configured.to_string(),
        Some(name) if name.eq_ignore_ascii_case("default") => return configured.to_string(),
        Some(name) => name,
    };

    let tier = match requested.to_ascii_lowercase().parse::<ModelTier>() {
        Ok(tier) => tier,
        Err(_) => match family_of_model(requested) {
            Some(other) if other != family => tier_of_model(requested),
            _ => return requested.to_string(),
        },
    };

    if tier_of_model(configured) == tier
        && family_of_model(configured) != Some(other_family(family))
    {
        configured.to_string()
    } else {
        model_for_tier(family, tier).to_string()
    }
}

fn other_family(family: BackendFamily) -> BackendFamily {
    match family {
        BackendFamily::Chat => BackendFamily::Generate,
        BackendFamily::Generate => BackendFamily::Chat,
    }
}
