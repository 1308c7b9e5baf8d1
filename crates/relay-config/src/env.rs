use std::sync::OnceLock;

use regex::Regex;

/// Expand `{{ env.VAR }}` placeholders in a raw TOML string
///
/// An optional fallback can be supplied as
/// `{{ env.VAR | default("value") }}`. Comment lines pass through
/// unchanged, so documented-but-disabled settings never fail expansion.
pub fn expand_env(input: &str) -> Result<String, String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r#"\{\{\s*env\.([A-Za-z0-9_]+)\s*(?:\|\s*default\("([^"]*)"\))?\s*\}\}"#)
            .expect("placeholder regex is valid")
    });

    let mut output = String::with_capacity(input.len());
    let mut missing: Option<String> = None;

    for (i, line) in input.lines().enumerate() {
        if i > 0 {
            output.push('\n');
        }

        if line.trim_start().starts_with('#') {
            output.push_str(line);
            continue;
        }

        let expanded = re.replace_all(line, |caps: &regex::Captures<'_>| {
            let var = &caps[1];
            match std::env::var(var) {
                Ok(value) => value,
                Err(_) => match caps.get(2) {
                    Some(default) => default.as_str().to_owned(),
                    None => {
                        missing.get_or_insert_with(|| var.to_owned());
                        String::new()
                    }
                },
            }
        });
        output.push_str(&expanded);
    }

    if let Some(var) = missing {
        return Err(format!("environment variable not found: `{var}`"));
    }

    if input.ends_with('\n') {
        output.push('\n');
    }

    Ok(output)
}
