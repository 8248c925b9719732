//! Emitter name inflection.
//!
//! Registered emitters are normalized to singular CamelCase (`"Flight"`,
//! `"AutomobileTrip"`); request paths use the underscored plural
//! (`flights`, `automobile_trips`).

const IRREGULAR: &[(&str, &str)] = &[("person", "people"), ("child", "children")];

/// `AutomobileTrip` -> `automobile_trip`
pub fn underscore(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let chars: Vec<char> = name.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        if c == '-' || c == ' ' {
            out.push('_');
        } else if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.is_some_and(|n| n.is_lowercase()),
                _ => false,
            };
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// `automobile_trip` -> `AutomobileTrip`
pub fn camelize(name: &str) -> String {
    underscore(name)
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// Pluralize the last word of an underscored name.
pub fn pluralize(name: &str) -> String {
    map_last_word(name, pluralize_word)
}

/// Singularize the last word of an underscored name.
pub fn singularize(name: &str) -> String {
    map_last_word(name, singularize_word)
}

/// Path segment used for an emitter: `AutomobileTrip` -> `automobile_trips`
pub fn resource_path(emitter: &str) -> String {
    pluralize(&underscore(emitter))
}

/// Canonical emitter name: `automobile_trips` -> `AutomobileTrip`
pub fn normalize_emitter(emitter: &str) -> String {
    camelize(&singularize(&underscore(emitter.trim())))
}

fn map_last_word(name: &str, f: fn(&str) -> String) -> String {
    match name.rfind('_') {
        Some(idx) => format!("{}{}", &name[..=idx], f(&name[idx + 1..])),
        None => f(name),
    }
}

fn pluralize_word(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }
    let lower = word.to_lowercase();
    if let Some((_, plural)) = IRREGULAR.iter().find(|(s, _)| *s == lower) {
        return (*plural).to_string();
    }
    if let Some(stem) = word.strip_suffix('y') {
        if !stem.ends_with(&['a', 'e', 'i', 'o', 'u'][..]) {
            return format!("{}ies", stem);
        }
    }
    if word.ends_with(&['s', 'x', 'z'][..]) || word.ends_with("ch") || word.ends_with("sh") {
        return format!("{}es", word);
    }
    format!("{}s", word)
}

fn singularize_word(word: &str) -> String {
    let lower = word.to_lowercase();
    if let Some((singular, _)) = IRREGULAR.iter().find(|(_, p)| *p == lower) {
        return (*singular).to_string();
    }
    if let Some(stem) = word.strip_suffix("ies") {
        return format!("{}y", stem);
    }
    for suffix in ["sses", "shes", "ches", "xes", "zes"] {
        if word.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }
    if word.ends_with('s') && !word.ends_with("ss") && !word.ends_with("us") && word.len() > 1 {
        return word[..word.len() - 1].to_string();
    }
    word.to_string()
}
