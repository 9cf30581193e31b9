// Shared prompt-building utilities.
// Each workflow stage defines its own templates in workflow/prompts.rs;
// this file owns the substitution rule they all share.

/// Fills `{slot}` markers in `template` with the paired values.
///
/// Substitution is literal and single-pass: inserted values are never
/// scanned again, so a transcript containing `{trust_level}` stays verbatim.
/// Braces that do not name a known slot are copied unchanged.
pub fn fill_template(template: &str, slots: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];

        let matched = slots.iter().find_map(|(name, value)| {
            let marker_len = name.len() + 2;
            let is_marker = tail.len() >= marker_len
                && tail[1..].starts_with(name)
                && tail[1 + name.len()..].starts_with('}');
            is_marker.then_some((marker_len, *value))
        });

        match matched {
            Some((marker_len, value)) => {
                out.push_str(value);
                rest = &tail[marker_len..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}
